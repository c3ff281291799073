use anyhow::{anyhow, ensure};
use bytes::Bytes;

use crate::{
    codes::{DnsOpcode, DnsResponseCode, RecordType},
    edns::Edns,
    flags::DnsFlags,
    reader::DnsMessageReader,
    record::{DnsQuestion, DnsRecord},
    writer::{DEFAULT_MAX_LEN, DnsMessageWriter},
};

/// A decoded DNS message.
///
/// The OPT pseudo record is lifted out of the additional section into `edns`, and the
/// response code is kept whole even when part of it travels in that record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub id: u16,
    pub flags: DnsFlags,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
    pub authority: Vec<DnsRecord>,
    /// Additional records other than OPT.
    pub additional: Vec<DnsRecord>,
    edns: Option<Edns>,
    response_code: DnsResponseCode,
}

impl DnsMessage {
    /// An empty message with the given header.
    pub fn new(id: u16, flags: DnsFlags) -> Self {
        Self {
            id,
            flags,
            questions: vec![],
            answers: vec![],
            authority: vec![],
            additional: vec![],
            edns: None,
            response_code: DnsResponseCode::NoError,
        }
    }

    /// Create the reply envelope for `request`.
    ///
    /// The reply carries the request's transaction id, opcode, RD and CD bits and its first
    /// question. Opcodes other than QUERY and NOTIFY are answered with NOTIMP.
    pub fn reply_to(request: &DnsMessage) -> Self {
        let flags = DnsFlags {
            response: true,
            opcode: request.flags.opcode,
            recursion_desired: request.flags.recursion_desired,
            checking_disabled: request.flags.checking_disabled,
            ..Default::default()
        };

        let mut reply = Self::new(request.id, flags);
        reply.questions.extend(request.questions.first().cloned());

        if !matches!(request.flags.opcode, DnsOpcode::Query | DnsOpcode::Notify) {
            reply.set_response_code(DnsResponseCode::NotImp);
        }
        reply
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = DnsMessageReader::new(data);

        let id = reader.read_u16()?;
        let (flags, rcode_low) = DnsFlags::unpack(reader.read_u16()?);
        let qdcount = reader.read_u16()?;
        let ancount = reader.read_u16()?;
        let nscount = reader.read_u16()?;
        let arcount = reader.read_u16()?;

        let mut message = Self::new(id, flags);
        message.questions = read_section(&mut reader, qdcount, DnsQuestion::read)?;
        message.answers = read_section(&mut reader, ancount, DnsRecord::read)?;
        message.authority = read_section(&mut reader, nscount, DnsRecord::read)?;

        let mut rcode_high = 0;
        for _ in 0..arcount {
            let start = reader.position();
            reader.read_name()?;

            if RecordType::from(reader.read_u16()?) == RecordType::OPT {
                ensure!(message.edns.is_none(), "message carries more than one OPT record");
                let (edns, extended) = Edns::read(&mut reader)?;
                message.edns = Some(edns);
                rcode_high = extended;
            } else {
                reader.seek(start)?;
                message.additional.push(DnsRecord::read(&mut reader)?);
            }
        }

        message.response_code = DnsResponseCode::from_parts(rcode_high, rcode_low);
        Ok(message)
    }

    /// Encode within the classic 512 byte UDP limit.
    pub fn encode(&self) -> anyhow::Result<Bytes> {
        self.encode_with_max(DEFAULT_MAX_LEN)
    }

    pub fn encode_with_max(&self, max_len: usize) -> anyhow::Result<Bytes> {
        let mut writer = DnsMessageWriter::with_max_len(max_len);

        writer.write_u16(self.id)?;
        writer.write_u16(self.flags.pack(self.response_code.header_bits()))?;

        let counts = [
            self.questions.len(),
            self.answers.len(),
            self.authority.len(),
            self.additional.len() + usize::from(self.edns.is_some()),
        ];
        for count in counts {
            let count = u16::try_from(count).map_err(|_| anyhow!("{} entries do not fit a section count", count))?;
            writer.write_u16(count)?;
        }

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for record in self.answers.iter().chain(&self.authority).chain(&self.additional) {
            record.write(&mut writer)?;
        }
        if let Some(edns) = &self.edns {
            edns.write(&mut writer, self.response_code.extended_bits())?;
        }

        Ok(writer.finish())
    }

    pub fn edns(&self) -> Option<&Edns> {
        self.edns.as_ref()
    }

    pub fn response_code(&self) -> DnsResponseCode {
        self.response_code
    }

    /// Codes above 15 need an OPT record, which is added when missing.
    pub fn set_response_code(&mut self, code: DnsResponseCode) {
        self.response_code = code;
        if code.extended_bits() != 0 {
            self.edns.get_or_insert_with(Edns::default);
        }
    }
}

fn read_section<'a, T>(
    reader: &mut DnsMessageReader<'a>,
    count: u16,
    read: impl Fn(&mut DnsMessageReader<'a>) -> anyhow::Result<T>,
) -> anyhow::Result<Vec<T>> {
    // Counts are untrusted; a short message fails on the first missing entry instead.
    let mut entries = Vec::with_capacity(usize::from(count).min(16));
    for _ in 0..count {
        entries.push(read(reader)?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::{
        codes::{ClassType, EdnsOptionCode},
        domain_name::DomainName,
        record::DnsRecordData,
    };

    /// `dig example.com` style query: RD + AD, one question, OPT with a client cookie.
    fn dig_query(qtype: u16) -> Vec<u8> {
        let mut data = vec![
            0xAB, 0xCD, // id
            0x01, 0x20, // flags: rd, ad
            0x00, 0x01, // qdcount
            0x00, 0x00, // ancount
            0x00, 0x00, // nscount
            0x00, 0x01, // arcount
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
        ];
        data.extend_from_slice(&qtype.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x01]);
        data.extend_from_slice(&[
            0x00, // root
            0x00, 0x29, // OPT
            0x04, 0xD0, // udp 1232
            0x00, 0x00, 0x00, 0x00, // ttl
            0x00, 0x0C, // rdlen
            0x00, 0x0A, 0x00, 0x08, 1, 2, 3, 4, 5, 6, 7, 8, // cookie
        ]);
        data
    }

    #[test]
    fn test_decode_dig_query() {
        let message = DnsMessage::decode(&dig_query(1)).unwrap();

        assert_eq!(message.id, 0xABCD);
        assert!(!message.flags.response);
        assert!(message.flags.recursion_desired);
        assert!(message.flags.authentic_data);
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.questions[0].qname.as_str(), "example.com");
        assert_eq!(message.questions[0].qtype, RecordType::A);
        assert!(message.additional.is_empty());

        let edns = message.edns().unwrap();
        assert_eq!(edns.udp_payload_size, 1232);
        assert_eq!(edns.options[0].code, EdnsOptionCode::COOKIE);
    }

    #[test]
    fn test_decode_unknown_type_and_class() {
        let mut data = dig_query(65280);
        let class_at = 12 + 13 + 2;
        data[class_at..class_at + 2].copy_from_slice(&300u16.to_be_bytes());

        let message = DnsMessage::decode(&data).unwrap();
        assert_eq!(message.questions[0].qtype, RecordType::Unknown(65280));
        assert_eq!(message.questions[0].qclass, ClassType::Unknown(300));
    }

    #[test]
    fn test_decode_truncated_message_fails() {
        let data = dig_query(1);
        assert!(DnsMessage::decode(&data[..20]).is_err());
        assert!(DnsMessage::decode(&data[..data.len() - 1]).is_err());
        assert!(DnsMessage::decode(&[0x12]).is_err());
    }

    #[test]
    fn test_second_opt_is_rejected() {
        let mut data = dig_query(1);
        data[11] = 2;
        data.extend_from_slice(&[0x00, 0x00, 0x29, 0x04, 0xD0, 0, 0, 0, 0, 0, 0]);
        assert!(DnsMessage::decode(&data).is_err());
    }

    #[test]
    fn test_reply_to_copies_envelope() {
        let request = DnsMessage::decode(&dig_query(1)).unwrap();
        let reply = DnsMessage::reply_to(&request);

        assert_eq!(reply.id, request.id);
        assert!(reply.flags.response);
        assert!(reply.flags.recursion_desired);
        assert!(!reply.flags.authentic_data);
        assert_eq!(reply.flags.opcode, DnsOpcode::Query);
        assert_eq!(reply.questions, request.questions);
        assert!(reply.answers.is_empty());
        assert!(reply.edns().is_none());
        assert_eq!(reply.response_code(), DnsResponseCode::NoError);
    }

    #[test]
    fn test_reply_to_unsupported_opcode() {
        let flags = DnsFlags {
            opcode: DnsOpcode::Update,
            ..Default::default()
        };
        let reply = DnsMessage::reply_to(&DnsMessage::new(7, flags));

        assert_eq!(reply.response_code(), DnsResponseCode::NotImp);
        assert_eq!(reply.flags.opcode, DnsOpcode::Update);
        assert!(reply.questions.is_empty());
    }

    #[test]
    fn test_answer_owner_points_at_question() {
        let request = DnsMessage::decode(&dig_query(1)).unwrap();
        let mut reply = DnsMessage::reply_to(&request);
        reply.answers.push(DnsRecord::a(
            request.questions[0].qname.clone(),
            60,
            Ipv4Addr::new(1, 1, 1, 1),
        ));

        let bytes = reply.encode().unwrap();
        // header, question, answer: pointer to offset 12, type/class/ttl/rdlen, address
        assert_eq!(bytes.len(), 12 + 17 + 2 + 10 + 4);
        assert_eq!(&bytes[29..31], &[0xC0, 12]);
        assert_eq!(&bytes[bytes.len() - 6..], &[0x00, 0x04, 1, 1, 1, 1]);

        let decoded = DnsMessage::decode(&bytes).unwrap();
        assert_eq!(decoded.answers.len(), 1);
        let answer = &decoded.answers[0];
        assert_eq!(answer.name.fqdn(), "example.com.");
        assert_eq!(answer.record_type, RecordType::A);
        assert_eq!(answer.class, ClassType::IN);
        assert_eq!(answer.ttl, 60);
        assert_eq!(answer.data, DnsRecordData::Ipv4(Ipv4Addr::new(1, 1, 1, 1)));
    }

    #[test]
    fn test_longest_name_fits_one_reply() {
        let label = |c: &str, n: usize| c.repeat(n);
        let qname = format!("{}.{}.{}.{}", label("a", 63), label("a", 63), label("a", 63), label("b", 61));
        let qname = DomainName::from_ascii(&qname).unwrap();

        let mut request = DnsMessage::new(1, DnsFlags::default());
        request.questions.push(DnsQuestion::new(qname.clone(), RecordType::A, ClassType::IN));
        let mut reply = DnsMessage::reply_to(&request);
        for _ in 0..10 {
            reply.answers.push(DnsRecord::a(qname.clone(), 60, Ipv4Addr::LOCALHOST));
        }

        let bytes = reply.encode().unwrap();
        assert_eq!(bytes.len(), 12 + 259 + 10 * 16);
        assert_eq!(DnsMessage::decode(&bytes).unwrap().answers[9].name, qname);
    }

    #[test]
    fn test_extended_rcode_travels_in_opt() {
        let mut message = DnsMessage::new(1, DnsFlags::default());
        message.set_response_code(DnsResponseCode::BadCookie);
        assert!(message.edns().is_some());

        let bytes = message.encode().unwrap();
        // BADCOOKIE is 23: header keeps 7, OPT carries 1.
        assert_eq!(bytes[3] & 0x0F, 7);
        assert_eq!(bytes[12 + 5], 1);

        let decoded = DnsMessage::decode(&bytes).unwrap();
        assert_eq!(decoded.response_code(), DnsResponseCode::BadCookie);
        assert_eq!(decoded.edns().unwrap().udp_payload_size, 4096);
    }
}
