//! Bounds-checked cursor over a received message.

use anyhow::{bail, ensure};

use crate::domain_name::DomainName;

/// Longest name allowed on the wire, root label included.
const MAX_NAME_WIRE_LEN: usize = 255;

/// A legal name has at most 127 labels, so any longer pointer chain is hostile.
const MAX_POINTER_HOPS: usize = 127;

pub struct DnsMessageReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> DnsMessageReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left after the cursor.
    ///
    /// ```
    /// use lurk_dns::reader::DnsMessageReader;
    ///
    /// let mut reader = DnsMessageReader::new(&[0, 1, 2]);
    /// reader.read_u8().unwrap();
    /// assert_eq!(reader.remaining(), 2);
    /// ```
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn seek(&mut self, pos: usize) -> anyhow::Result<()> {
        ensure!(pos <= self.data.len(), "cannot seek to {} in a {} byte message", pos, self.data.len());
        self.cursor = pos;
        Ok(())
    }

    pub fn read_u8(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_u16(&mut self) -> anyhow::Result<u16> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> anyhow::Result<u32> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, len: usize) -> anyhow::Result<&'a [u8]> {
        self.take(len, "raw bytes")
    }

    /// Read a possibly compressed name.
    ///
    /// The cursor ends up after the name as written at the current offset, not after the
    /// labels a pointer led to. Pointers must point strictly backwards.
    pub fn read_name(&mut self) -> anyhow::Result<DomainName> {
        let mut labels: Vec<&'a [u8]> = Vec::new();
        let mut wire_len = 1;
        let mut hops = 0;
        let mut at = self.cursor;
        let mut resume = None;

        loop {
            let Some(&head) = self.data.get(at) else {
                bail!("name runs past the end of the message at offset {}", at);
            };

            match head >> 6 {
                0b00 if head == 0 => {
                    at += 1;
                    break;
                }
                0b00 => {
                    let start = at + 1;
                    let Some(label) = self.data.get(start..start + usize::from(head)) else {
                        bail!("label at offset {} runs past the end of the message", at);
                    };
                    wire_len += label.len() + 1;
                    ensure!(wire_len <= MAX_NAME_WIRE_LEN, "name at offset {} is longer than {} bytes", self.cursor, MAX_NAME_WIRE_LEN);
                    labels.push(label);
                    at = start + label.len();
                }
                0b11 => {
                    let Some(&low) = self.data.get(at + 1) else {
                        bail!("truncated compression pointer at offset {}", at);
                    };
                    let target = (usize::from(head & 0x3F) << 8) | usize::from(low);
                    ensure!(target < at, "compression pointer at offset {} leads forward to {}", at, target);
                    hops += 1;
                    ensure!(hops <= MAX_POINTER_HOPS, "too many compression pointers in name at offset {}", self.cursor);
                    resume.get_or_insert(at + 2);
                    at = target;
                }
                _ => bail!("reserved label type 0x{:02x} at offset {}", head & 0xC0, at),
            }
        }

        self.cursor = resume.unwrap_or(at);
        Ok(DomainName::from_wire_labels(&labels))
    }

    fn take(&mut self, len: usize, what: &str) -> anyhow::Result<&'a [u8]> {
        let Some(bytes) = self.data.get(self.cursor..).and_then(|rest| rest.get(..len)) else {
            bail!(
                "message ends while reading {} at offset {}: wanted {} bytes, {} left",
                what,
                self.cursor,
                len,
                self.remaining()
            );
        };
        self.cursor += len;
        Ok(bytes)
    }
}
