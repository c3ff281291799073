use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use lurk_dns::{ClassType, DnsFlags, DnsOpcode, DnsQuestion, DnsRecordData, DomainName};
use tokio::time::timeout;

use super::*;
use crate::sink::MemorySink;

fn question(name: &str, qtype: RecordType) -> DnsQuestion {
    DnsQuestion::new(DomainName::from_ascii(name).unwrap(), qtype, ClassType::IN)
}

fn encode(id: u16, flags: DnsFlags, questions: Vec<DnsQuestion>) -> Bytes {
    let mut message = DnsMessage::new(id, flags);
    message.questions = questions;
    message.encode().unwrap()
}

/// Query with RD set, as stub resolvers send it.
fn query(id: u16, name: &str, qtype: RecordType) -> Bytes {
    let flags = DnsFlags {
        recursion_desired: true,
        ..Default::default()
    };
    encode(id, flags, vec![question(name, qtype)])
}

fn observer() -> (DnsObserver, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (DnsObserver::new(DnsObserverConfig::default(), sink.clone()), sink)
}

fn peer() -> SocketAddr {
    "10.0.0.5:5353".parse().unwrap()
}

#[test]
fn test_a_query_is_answered() {
    let (observer, sink) = observer();

    let reply = observer
        .handle_datagram(&query(0x1234, "example.com", RecordType::A), peer())
        .expect("A queries get a reply");
    let reply = DnsMessage::decode(&reply).unwrap();

    assert_eq!(reply.id, 0x1234);
    assert!(reply.flags.response);
    assert_eq!(reply.flags.opcode, DnsOpcode::Query);
    assert!(reply.flags.recursion_desired);
    assert_eq!(reply.questions.len(), 1);
    assert_eq!(reply.answers.len(), 1);

    let answer = &reply.answers[0];
    assert_eq!(answer.name.fqdn(), "example.com.");
    assert_eq!(answer.record_type, RecordType::A);
    assert_eq!(answer.class, ClassType::IN);
    assert_eq!(answer.ttl, 60);
    assert_eq!(answer.data, DnsRecordData::Ipv4(Ipv4Addr::new(1, 1, 1, 1)));
    assert_eq!(answer.to_string(), "example.com.\t60\tIN\tA\t1.1.1.1");

    assert_eq!(
        sink.observations(),
        vec![Observation::DnsA {
            from: "10.0.0.5:5353".into(),
            domain: "example.com.".into(),
        }]
    );
}

#[test]
fn test_answer_follows_config() {
    let sink = Arc::new(MemorySink::new());
    let config = DnsObserverConfig {
        answer_ipv4: Ipv4Addr::new(192, 0, 2, 7),
        answer_ttl: 5,
        ..Default::default()
    };
    let observer = DnsObserver::new(config, sink);

    let reply = observer
        .handle_datagram(&query(1, "Mixed.Example.org.", RecordType::A), peer())
        .unwrap();
    let reply = DnsMessage::decode(&reply).unwrap();

    let answer = &reply.answers[0];
    assert_eq!(answer.ttl, 5);
    assert_eq!(answer.data, DnsRecordData::Ipv4(Ipv4Addr::new(192, 0, 2, 7)));
    // Case is preserved from the question.
    assert_eq!(answer.name.as_str(), "Mixed.Example.org");
}

#[test]
fn test_longest_name_is_answered() {
    let (observer, sink) = observer();
    let name = format!("{a}.{a}.{a}.{b}", a = "a".repeat(63), b = "b".repeat(61));

    let raw = query(0x0255, &name, RecordType::A);
    assert_eq!(raw.len(), 12 + 255 + 4);

    let reply = observer
        .handle_datagram(&raw, peer())
        .expect("a 255 byte name still fits a 512 byte reply");
    let reply = DnsMessage::decode(&reply).unwrap();

    assert_eq!(reply.id, 0x0255);
    assert_eq!(reply.answers.len(), 1);
    assert_eq!(reply.answers[0].name, reply.questions[0].qname);
    assert_eq!(reply.answers[0].name.as_str(), name);
    assert_eq!(
        sink.observations(),
        vec![Observation::DnsA {
            from: "10.0.0.5:5353".into(),
            domain: format!("{}.", name),
        }]
    );
}

#[test]
fn test_aaaa_query_is_only_logged() {
    let (observer, sink) = observer();

    let reply = observer.handle_datagram(&query(7, "example.com.", RecordType::AAAA), peer());

    assert!(reply.is_none());
    assert_eq!(
        sink.observations(),
        vec![Observation::DnsAaaa {
            from: "10.0.0.5:5353".into(),
            domain: "example.com.".into(),
        }]
    );
}

#[test]
fn test_other_types_are_rendered() {
    let (observer, sink) = observer();

    let reply = observer.handle_datagram(&query(99, "example.com.", RecordType::MX), peer());
    assert!(reply.is_none());

    let observations = sink.observations();
    assert_eq!(observations.len(), 1);
    match &observations[0] {
        Observation::DnsUnknown { from, as_string } => {
            assert_eq!(from, "10.0.0.5:5353");
            assert!(as_string.contains("id: 99"));
            assert!(as_string.contains(";example.com.\tIN\tMX"));
        }
        other => panic!("unexpected observation: {:?}", other),
    }
}

#[test]
fn test_only_first_question_counts() {
    let (observer, sink) = observer();

    let raw = encode(
        3,
        DnsFlags::default(),
        vec![question("v6.example.", RecordType::AAAA), question("v4.example.", RecordType::A)],
    );

    assert!(observer.handle_datagram(&raw, peer()).is_none());
    assert_eq!(
        sink.observations(),
        vec![Observation::DnsAaaa {
            from: "10.0.0.5:5353".into(),
            domain: "v6.example.".into(),
        }]
    );
}

#[test]
fn test_message_without_question() {
    let (observer, sink) = observer();

    let raw = encode(5, DnsFlags::default(), vec![]);
    assert!(observer.handle_datagram(&raw, peer()).is_none());

    let observations = sink.observations();
    assert_eq!(observations.len(), 1);
    assert!(matches!(observations[0], Observation::DnsNoQuestion { .. }));
}

#[test]
fn test_responses_are_not_answered() {
    let (observer, sink) = observer();

    let flags = DnsFlags {
        response: true,
        ..Default::default()
    };
    let raw = encode(11, flags, vec![question("example.com.", RecordType::A)]);

    assert!(observer.handle_datagram(&raw, peer()).is_none());
    assert!(matches!(sink.observations()[0], Observation::DnsResponse { .. }));
}

#[test]
fn test_garbage_is_contained() {
    let (observer, sink) = observer();

    assert!(observer.handle_datagram(&[0xde, 0xad, 0xbe], peer()).is_none());

    match &sink.observations()[0] {
        Observation::DnsMalformed { from, raw, .. } => {
            assert_eq!(from, "10.0.0.5:5353");
            assert_eq!(raw, "deadbe");
        }
        other => panic!("unexpected observation: {:?}", other),
    }
}

async fn start_observer() -> (SocketAddr, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let observer = DnsObserver::new(DnsObserverConfig::default(), sink.clone());
    tokio::spawn(observer.serve(socket));

    (addr, sink)
}

#[tokio::test]
async fn test_serve_answers_over_udp() {
    let (addr, sink) = start_observer().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let client_addr = client.local_addr().unwrap();

    client
        .send_to(&query(0xBEEF, "example.com.", RecordType::A), addr)
        .await
        .unwrap();

    let mut buf = [0u8; 512];
    let (len, from) = timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .expect("reply in time")
        .unwrap();

    assert_eq!(from, addr);
    let reply = DnsMessage::decode(&buf[..len]).unwrap();
    assert_eq!(reply.id, 0xBEEF);
    assert_eq!(reply.answers.len(), 1);

    assert_eq!(
        sink.observations(),
        vec![Observation::DnsA {
            from: client_addr.to_string(),
            domain: "example.com.".into(),
        }]
    );
}

#[tokio::test]
async fn test_serve_survives_bad_input() {
    let (addr, sink) = start_observer().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    client.send_to(&[1, 2, 3], addr).await.unwrap();
    client
        .send_to(&query(2, "example.com.", RecordType::AAAA), addr)
        .await
        .unwrap();
    client
        .send_to(&query(3, "example.com.", RecordType::A), addr)
        .await
        .unwrap();

    // Only the A query produces a datagram back.
    let mut buf = [0u8; 512];
    let (len, _) = timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .expect("reply in time")
        .unwrap();
    assert_eq!(DnsMessage::decode(&buf[..len]).unwrap().id, 3);

    let observations = sink.observations();
    assert_eq!(observations.len(), 3);
    assert!(matches!(observations[0], Observation::DnsMalformed { .. }));
    assert!(matches!(observations[1], Observation::DnsAaaa { .. }));
    assert!(matches!(observations[2], Observation::DnsA { .. }));
}
