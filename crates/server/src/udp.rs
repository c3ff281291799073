use std::net::{Ipv4Addr, SocketAddr};

use bytes::{Bytes, BytesMut};
use lurk_dns::{DnsMessage, DnsRecord, RecordType, helpers::short_hex};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;

use crate::sink::{Observation, SharedSink};

/// Number of leading datagram bytes kept when a message fails to decode.
const MALFORMED_PREVIEW_LEN: usize = 64;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DnsObserverConfig {
    /// Port to listen on for DNS queries over UDP.
    pub port: u16,
    /// Size of the receive buffer. Longer datagrams are truncated by the kernel.
    pub recv_size: usize,
    /// Address handed out in every A answer.
    pub answer_ipv4: Ipv4Addr,
    /// TTL of the synthetic A answer, in seconds.
    pub answer_ttl: u32,
}

impl Default for DnsObserverConfig {
    fn default() -> Self {
        Self {
            port: 53,
            recv_size: 4096,
            answer_ipv4: Ipv4Addr::new(1, 1, 1, 1),
            answer_ttl: 60,
        }
    }
}

/// Records every DNS query it sees and answers A queries with a fixed address.
pub struct DnsObserver {
    config: DnsObserverConfig,
    sink: SharedSink,
}

impl DnsObserver {
    pub fn new(config: DnsObserverConfig, sink: SharedSink) -> Self {
        Self { config, sink }
    }

    /// Receive datagrams until the socket fails, handling each one before reading the next.
    pub async fn serve(self, socket: UdpSocket) -> anyhow::Result<()> {
        let recv_size = self.config.recv_size.max(12);
        let mut buffer = BytesMut::zeroed(recv_size);

        tracing::info!("DNS observer listening on udp://{}", socket.local_addr()?);

        loop {
            let (len, peer) = match socket.recv_from(&mut buffer[..]).await {
                Ok(received) => received,
                Err(e) => {
                    // ICMP errors from earlier sends surface here on some platforms.
                    tracing::warn!("Failed to receive DNS datagram: {}", e);
                    continue;
                }
            };

            let Some(reply) = self.handle_datagram(&buffer[..len], peer) else {
                continue;
            };

            if let Err(e) = socket.send_to(&reply, peer).await {
                tracing::warn!("Failed to send DNS reply to {}: {}", peer, e);
            }
        }
    }

    /// Record one datagram and build the reply to send back, if any.
    pub fn handle_datagram(&self, raw: &[u8], peer: SocketAddr) -> Option<Bytes> {
        let from = peer.to_string();

        let message = match DnsMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                self.sink.record(Observation::DnsMalformed {
                    from,
                    error: format!("{:#}", e),
                    raw: short_hex(raw, MALFORMED_PREVIEW_LEN),
                });
                return None;
            }
        };

        if message.flags.response {
            self.sink.record(Observation::DnsResponse {
                from,
                as_string: message.to_string(),
            });
            return None;
        }

        let Some(question) = message.questions.first() else {
            self.sink.record(Observation::DnsNoQuestion {
                from,
                as_string: message.to_string(),
            });
            return None;
        };

        match question.qtype {
            RecordType::A => {
                let mut reply = DnsMessage::reply_to(&message);
                reply.answers.push(DnsRecord::a(
                    question.qname.clone(),
                    self.config.answer_ttl,
                    self.config.answer_ipv4,
                ));

                self.sink.record(Observation::DnsA {
                    from,
                    domain: question.qname.fqdn(),
                });

                match reply.encode() {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        tracing::warn!("Failed to encode DNS reply for {}: {:#}", peer, e);
                        None
                    }
                }
            }
            RecordType::AAAA => {
                self.sink.record(Observation::DnsAaaa {
                    from,
                    domain: question.qname.fqdn(),
                });
                None
            }
            _ => {
                self.sink.record(Observation::DnsUnknown {
                    from,
                    as_string: message.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "udp_tests.rs"]
mod udp_tests;
