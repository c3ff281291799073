//! The OPT pseudo record (RFC 6891).

use anyhow::ensure;

use crate::{
    codes::{EdnsOptionCode, RecordType},
    reader::DnsMessageReader,
    writer::DnsMessageWriter,
};

const DO_BIT: u16 = 0x8000;

/// EDNS parameters of a message.
///
/// The extended response code bits are not stored here; [`crate::DnsMessage`] keeps the
/// full code and splits it when encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edns {
    pub udp_payload_size: u16,
    pub version: u8,
    pub dnssec_ok: bool,
    /// Remaining flag bits, kept as received.
    pub z: u16,
    pub options: Vec<EdnsOption>,
}

impl Default for Edns {
    fn default() -> Self {
        Self {
            udp_payload_size: 4096,
            version: 0,
            dnssec_ok: false,
            z: 0,
            options: vec![],
        }
    }
}

impl Edns {
    /// Read the OPT record after its owner name and type. Returns the extended rcode bits too.
    pub(crate) fn read(reader: &mut DnsMessageReader) -> anyhow::Result<(Self, u8)> {
        let udp_payload_size = reader.read_u16()?;
        let [extended_rcode, version, flags_high, flags_low] = reader.read_u32()?.to_be_bytes();
        let flags = u16::from_be_bytes([flags_high, flags_low]);

        let len = usize::from(reader.read_u16()?);
        ensure!(len <= reader.remaining(), "OPT data of {} bytes runs past the end of the message", len);
        let end = reader.position() + len;

        let mut options = Vec::new();
        while reader.position() < end {
            let code = EdnsOptionCode::from(reader.read_u16()?);
            let data_len = usize::from(reader.read_u16()?);
            options.push(EdnsOption {
                code,
                data: reader.read_bytes(data_len)?.to_vec(),
            });
        }
        ensure!(reader.position() == end, "EDNS option runs past the OPT data");

        let edns = Self {
            udp_payload_size,
            version,
            dnssec_ok: flags & DO_BIT != 0,
            z: flags & !DO_BIT,
            options,
        };
        Ok((edns, extended_rcode))
    }

    pub(crate) fn write(&self, writer: &mut DnsMessageWriter, extended_rcode: u8) -> anyhow::Result<()> {
        let flags = if self.dnssec_ok { self.z | DO_BIT } else { self.z & !DO_BIT };
        let [flags_high, flags_low] = flags.to_be_bytes();

        writer.write_u8(0)?;
        writer.write_u16(RecordType::OPT.code())?;
        writer.write_u16(self.udp_payload_size)?;
        writer.write_u32(u32::from_be_bytes([extended_rcode, self.version, flags_high, flags_low]))?;
        writer.write_length_prefixed(|w| {
            for option in &self.options {
                w.write_u16(option.code.code())?;
                w.write_length_prefixed(|w| w.write_bytes(&option.data))?;
            }
            Ok(())
        })
    }
}

/// EDNS option with its data left undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdnsOption {
    pub code: EdnsOptionCode,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_layout() {
        let edns = Edns {
            udp_payload_size: 1232,
            dnssec_ok: true,
            options: vec![EdnsOption {
                code: EdnsOptionCode::COOKIE,
                data: vec![1, 2, 3, 4, 5, 6, 7, 8],
            }],
            ..Default::default()
        };

        let mut writer = DnsMessageWriter::new();
        edns.write(&mut writer, 1).unwrap();
        let bytes = writer.finish();

        assert_eq!(
            bytes.as_ref(),
            &[
                0, 0x00, 0x29, 0x04, 0xD0, // owner, type, payload size
                0x01, 0x00, 0x80, 0x00, // ext rcode, version, DO
                0x00, 0x0C, 0x00, 0x0A, 0x00, 0x08, 1, 2, 3, 4, 5, 6, 7, 8,
            ]
        );

        let mut reader = DnsMessageReader::new(&bytes[3..]);
        assert_eq!(Edns::read(&mut reader).unwrap(), (edns, 1));
    }

    #[test]
    fn test_option_overrunning_opt_data() {
        // OPT data claims 4 bytes, the option inside claims 2 more.
        let data = [0x10, 0x00, 0, 0, 0, 0, 0x00, 0x04, 0x00, 0x0A, 0x00, 0x02, 0xAA, 0xBB];
        assert!(Edns::read(&mut DnsMessageReader::new(&data)).is_err());
    }
}
