//! Bounded output buffer with name compression.

use std::collections::HashMap;

use anyhow::{anyhow, bail, ensure};
use bytes::{BufMut, Bytes, BytesMut};

use crate::domain_name::DomainName;

/// Payload limit for peers that did not advertise a larger one through EDNS.
pub const DEFAULT_MAX_LEN: usize = 512;

/// Compression pointers carry a 14 bit offset.
const MAX_POINTER_TARGET: usize = 0x3FFF;

pub struct DnsMessageWriter {
    buf: BytesMut,
    max_len: usize,
    /// Offsets of name suffixes already in `buf`, keyed by their lowercased wire form.
    suffixes: HashMap<Vec<u8>, u16>,
}

impl DnsMessageWriter {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_len.min(DEFAULT_MAX_LEN)),
            max_len,
            suffixes: HashMap::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_u8(&mut self, value: u8) -> anyhow::Result<()> {
        self.reserve(1, "u8")?;
        self.buf.put_u8(value);
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> anyhow::Result<()> {
        self.reserve(2, "u16")?;
        self.buf.put_u16(value);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> anyhow::Result<()> {
        self.reserve(4, "u32")?;
        self.buf.put_u32(value);
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.reserve(data.len(), "raw bytes")?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Write a name, replacing its longest already written suffix with a pointer.
    ///
    /// Every suffix written here becomes a pointer target for later names.
    pub fn write_name(&mut self, name: &DomainName) -> anyhow::Result<()> {
        let labels = name.wire_labels()?;
        let keys: Vec<Vec<u8>> = (0..labels.len()).map(|i| suffix_key(&labels[i..])).collect();

        let shared = keys.iter().position(|key| self.suffixes.contains_key(key));
        let pointer = shared.and_then(|i| self.suffixes.get(&keys[i]).copied());
        let literal = shared.unwrap_or(labels.len());

        let len = labels[..literal].iter().map(|l| l.len() + 1).sum::<usize>()
            + if pointer.is_some() { 2 } else { 1 };
        self.reserve(len, "name")?;

        for (label, key) in labels[..literal].iter().zip(keys) {
            if self.buf.len() <= MAX_POINTER_TARGET {
                self.suffixes.insert(key, self.buf.len() as u16);
            }
            self.buf.put_u8(label.len() as u8);
            self.buf.put_slice(label);
        }

        match pointer {
            Some(offset) => self.buf.put_u16(0xC000 | offset),
            None => self.buf.put_u8(0),
        }
        Ok(())
    }

    /// Write a name label by label, without pointers.
    pub fn write_name_uncompressed(&mut self, name: &DomainName) -> anyhow::Result<()> {
        let labels = name.wire_labels()?;
        let len = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        self.reserve(len, "name")?;

        for label in &labels {
            self.buf.put_u8(label.len() as u8);
            self.buf.put_slice(label);
        }
        self.buf.put_u8(0);
        Ok(())
    }

    /// Write whatever `body` writes, preceded by its length as a u16.
    pub fn write_length_prefixed(
        &mut self,
        body: impl FnOnce(&mut Self) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let at = self.position();
        self.write_u16(0)?;
        body(self)?;

        let len = self.position() - at - 2;
        let len = u16::try_from(len).map_err(|_| anyhow!("{} bytes do not fit a 16 bit length", len))?;
        self.patch_u16(at, len)
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn patch_u16(&mut self, at: usize, value: u16) -> anyhow::Result<()> {
        let Some(slot) = self.buf.get_mut(at..at + 2) else {
            bail!("cannot patch offset {} of a {} byte message", at, self.buf.len());
        };
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn reserve(&mut self, len: usize, what: &str) -> anyhow::Result<()> {
        let used = self.buf.len();
        ensure!(
            len <= self.max_len.saturating_sub(used),
            "no room for {} ({} bytes) at offset {}, limit is {}",
            what,
            len,
            used,
            self.max_len
        );
        self.buf.reserve(len);
        Ok(())
    }
}

impl Default for DnsMessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-folded wire form of a run of labels, without the root label.
fn suffix_key(labels: &[Vec<u8>]) -> Vec<u8> {
    let mut key = Vec::new();
    for label in labels {
        key.push(label.len() as u8);
        key.extend(label.iter().map(u8::to_ascii_lowercase));
    }
    key
}
