//! Zone-file style text rendering of messages and records, in the layout `dig` prints.

use std::fmt::{self, Display, Formatter, Write};

use crate::{
    codes::{DnsOpcode, DnsResponseCode},
    edns::{Edns, EdnsOption},
    flags::DnsFlags,
    message::DnsMessage,
    record::{DnsQuestion, DnsRecord, DnsRecordData},
};

impl Display for DnsOpcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            DnsOpcode::Query => "QUERY",
            DnsOpcode::IQuery => "IQUERY",
            DnsOpcode::Status => "STATUS",
            DnsOpcode::Notify => "NOTIFY",
            DnsOpcode::Update => "UPDATE",
            DnsOpcode::Dso => "DSO",
            DnsOpcode::Unknown(code) => return write!(f, "OPCODE{}", code),
        };
        f.write_str(name)
    }
}

impl Display for DnsResponseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            DnsResponseCode::NoError => "NOERROR",
            DnsResponseCode::FormErr => "FORMERR",
            DnsResponseCode::ServFail => "SERVFAIL",
            DnsResponseCode::NxDomain => "NXDOMAIN",
            DnsResponseCode::NotImp => "NOTIMP",
            DnsResponseCode::Refused => "REFUSED",
            DnsResponseCode::YxDomain => "YXDOMAIN",
            DnsResponseCode::YxRrSet => "YXRRSET",
            DnsResponseCode::NxRrSet => "NXRRSET",
            DnsResponseCode::NotAuth => "NOTAUTH",
            DnsResponseCode::NotZone => "NOTZONE",
            DnsResponseCode::DsoTypeNi => "DSOTYPENI",
            DnsResponseCode::BadVers => "BADVERS",
            DnsResponseCode::BadKey => "BADKEY",
            DnsResponseCode::BadTime => "BADTIME",
            DnsResponseCode::BadMode => "BADMODE",
            DnsResponseCode::BadName => "BADNAME",
            DnsResponseCode::BadAlg => "BADALG",
            DnsResponseCode::BadTrunc => "BADTRUNC",
            DnsResponseCode::BadCookie => "BADCOOKIE",
            DnsResponseCode::Unknown(code) => return write!(f, "RCODE{}", code),
        };
        f.write_str(name)
    }
}

impl Display for DnsFlags {
    /// Space separated list of the set header bits.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonics().collect::<Vec<_>>().join(" "))
    }
}

impl Display for DnsQuestion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, ";{}\t{}\t{}", self.qname.fqdn(), self.qclass, self.qtype)
    }
}

impl Display for DnsRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name.fqdn(),
            self.ttl,
            self.class,
            self.record_type,
            self.data
        )
    }
}

impl Display for DnsRecordData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DnsRecordData::Raw(data) => {
                // RFC 3597 generic encoding.
                write!(f, "\\# {}", data.len())?;
                if !data.is_empty() {
                    write!(f, " {}", hex(data))?;
                }
                Ok(())
            }
            DnsRecordData::Ipv4(addr) => write!(f, "{}", addr),
            DnsRecordData::Ipv6(addr) => write!(f, "{}", addr),
            DnsRecordData::Text(strings) => {
                let quoted: Vec<String> = strings.iter().map(|s| quote(s)).collect();
                f.write_str(&quoted.join(" "))
            }
            DnsRecordData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname.fqdn(),
                rname.fqdn(),
                serial,
                refresh,
                retry,
                expire,
                minimum
            ),
            DnsRecordData::MX { preference, exchange } => write!(f, "{} {}", preference, exchange.fqdn()),
            DnsRecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target.fqdn()),
            DnsRecordData::Name(name) => f.write_str(&name.fqdn()),
        }
    }
}

impl Display for EdnsOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "; {}: {}", self.code, hex(&self.data))
    }
}

impl Display for Edns {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let flags = if self.dnssec_ok { " do" } else { "" };
        write!(
            f,
            "; EDNS: version {}; flags:{}; udp: {}",
            self.version, flags, self.udp_payload_size
        )?;
        for option in &self.options {
            write!(f, "\n{}", option)?;
        }
        Ok(())
    }
}

impl Display for DnsMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            ";; opcode: {}, status: {}, id: {}",
            self.flags.opcode,
            self.response_code(),
            self.id
        )?;
        writeln!(
            f,
            ";; flags: {}; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.flags,
            self.questions.len(),
            self.answers.len(),
            self.authority.len(),
            self.additional.len() + usize::from(self.edns().is_some())
        )?;

        if let Some(edns) = self.edns() {
            writeln!(f, "\n;; OPT PSEUDOSECTION:\n{}", edns)?;
        }

        if !self.questions.is_empty() {
            writeln!(f, "\n;; QUESTION SECTION:")?;
            for question in &self.questions {
                writeln!(f, "{}", question)?;
            }
        }

        let sections = [
            ("ANSWER", &self.answers),
            ("AUTHORITY", &self.authority),
            ("ADDITIONAL", &self.additional),
        ];

        for (title, records) in sections {
            if records.is_empty() {
                continue;
            }
            writeln!(f, "\n;; {} SECTION:", title)?;
            for record in records {
                writeln!(f, "{}", record)?;
            }
        }

        Ok(())
    }
}

fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{:02X}", b);
    }
    out
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "\\{:03}", b);
                }
            }
        }
    }
    out.push('"');
    out
}
