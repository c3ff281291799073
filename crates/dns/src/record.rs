//! Questions, resource records and their data.

use std::net::{Ipv4Addr, Ipv6Addr};

use anyhow::ensure;

use crate::{
    codes::{ClassType, RecordType},
    domain_name::DomainName,
    reader::DnsMessageReader,
    writer::DnsMessageWriter,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub qname: DomainName,
    pub qtype: RecordType,
    pub qclass: ClassType,
}

impl DnsQuestion {
    pub fn new(qname: DomainName, qtype: RecordType, qclass: ClassType) -> Self {
        Self { qname, qtype, qclass }
    }

    pub(crate) fn read(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        Ok(Self {
            qname: reader.read_name()?,
            qtype: RecordType::from(reader.read_u16()?),
            qclass: ClassType::from(reader.read_u16()?),
        })
    }

    pub(crate) fn write(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_name(&self.qname)?;
        writer.write_u16(self.qtype.code())?;
        writer.write_u16(self.qclass.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: DomainName,
    pub record_type: RecordType,
    pub class: ClassType,
    pub ttl: u32,
    pub data: DnsRecordData,
}

impl DnsRecord {
    /// IN-class A record.
    pub fn a(name: DomainName, ttl: u32, addr: Ipv4Addr) -> Self {
        Self {
            name,
            record_type: RecordType::A,
            class: ClassType::IN,
            ttl,
            data: DnsRecordData::Ipv4(addr),
        }
    }

    pub(crate) fn read(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let name = reader.read_name()?;
        let record_type = RecordType::from(reader.read_u16()?);
        let class = ClassType::from(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let len = usize::from(reader.read_u16()?);
        let data = DnsRecordData::read(reader, record_type, len)?;

        Ok(Self {
            name,
            record_type,
            class,
            ttl,
            data,
        })
    }

    pub(crate) fn write(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_name(&self.name)?;
        writer.write_u16(self.record_type.code())?;
        writer.write_u16(self.class.code())?;
        writer.write_u32(self.ttl)?;
        writer.write_length_prefixed(|w| self.data.write(w))
    }
}

/// Decoded RDATA. Types without a variant of their own are kept as `Raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsRecordData {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    /// NS, CNAME, PTR and DNAME.
    Name(DomainName),
    MX {
        preference: u16,
        exchange: DomainName,
    },
    SOA {
        mname: DomainName,
        rname: DomainName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    /// One entry per character-string, invalid UTF-8 replaced.
    Text(Vec<String>),
    Raw(Vec<u8>),
}

impl DnsRecordData {
    /// Decode exactly `len` bytes of data for `record_type`.
    pub(crate) fn read(reader: &mut DnsMessageReader, record_type: RecordType, len: usize) -> anyhow::Result<Self> {
        ensure!(
            len <= reader.remaining(),
            "{} data of {} bytes runs past the end of the message",
            record_type,
            len
        );
        let end = reader.position() + len;

        let data = match record_type {
            RecordType::A => Self::Ipv4(Ipv4Addr::from(read_address::<4>(reader, len)?)),
            RecordType::AAAA => Self::Ipv6(Ipv6Addr::from(read_address::<16>(reader, len)?)),
            RecordType::NS | RecordType::CNAME | RecordType::PTR | RecordType::DNAME => Self::Name(reader.read_name()?),
            RecordType::MX => Self::MX {
                preference: reader.read_u16()?,
                exchange: reader.read_name()?,
            },
            RecordType::SOA => Self::SOA {
                mname: reader.read_name()?,
                rname: reader.read_name()?,
                serial: reader.read_u32()?,
                refresh: reader.read_u32()?,
                retry: reader.read_u32()?,
                expire: reader.read_u32()?,
                minimum: reader.read_u32()?,
            },
            RecordType::SRV => Self::SRV {
                priority: reader.read_u16()?,
                weight: reader.read_u16()?,
                port: reader.read_u16()?,
                target: reader.read_name()?,
            },
            RecordType::TXT | RecordType::SPF => {
                let mut strings = Vec::new();
                while reader.position() < end {
                    let len = usize::from(reader.read_u8()?);
                    strings.push(String::from_utf8_lossy(reader.read_bytes(len)?).into_owned());
                }
                Self::Text(strings)
            }
            _ => Self::Raw(reader.read_bytes(len)?.to_vec()),
        };

        ensure!(
            reader.position() == end,
            "{} data does not fill its declared {} bytes",
            record_type,
            len
        );
        Ok(data)
    }

    /// Names inside record data are written without pointers.
    pub(crate) fn write(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        match self {
            Self::Ipv4(addr) => writer.write_bytes(&addr.octets()),
            Self::Ipv6(addr) => writer.write_bytes(&addr.octets()),
            Self::Name(name) => writer.write_name_uncompressed(name),
            Self::MX { preference, exchange } => {
                writer.write_u16(*preference)?;
                writer.write_name_uncompressed(exchange)
            }
            Self::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                writer.write_name_uncompressed(mname)?;
                writer.write_name_uncompressed(rname)?;
                for value in [serial, refresh, retry, expire, minimum] {
                    writer.write_u32(*value)?;
                }
                Ok(())
            }
            Self::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                writer.write_u16(*priority)?;
                writer.write_u16(*weight)?;
                writer.write_u16(*port)?;
                writer.write_name_uncompressed(target)
            }
            Self::Text(strings) => {
                for s in strings {
                    let len = u8::try_from(s.len())
                        .map_err(|_| anyhow::anyhow!("character-string of {} bytes is too long", s.len()))?;
                    writer.write_u8(len)?;
                    writer.write_bytes(s.as_bytes())?;
                }
                Ok(())
            }
            Self::Raw(data) => writer.write_bytes(data),
        }
    }
}

fn read_address<const N: usize>(reader: &mut DnsMessageReader, len: usize) -> anyhow::Result<[u8; N]> {
    ensure!(len == N, "address data must be {} bytes, got {}", N, len);
    let mut octets = [0u8; N];
    octets.copy_from_slice(reader.read_bytes(N)?);
    Ok(octets)
}
