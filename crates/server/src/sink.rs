//! Observations produced by the listeners and the sinks that record them.

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle every listener records through.
pub type SharedSink = Arc<dyn ObservationSink>;

/// One structured record describing something a client sent us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Query whose first question asks for an A record. It gets answered.
    DnsA { from: String, domain: String },
    /// Query whose first question asks for an AAAA record.
    DnsAaaa { from: String, domain: String },
    /// Query for any other record type, rendered in full.
    DnsUnknown { from: String, as_string: String },
    /// Well formed message carrying no question at all.
    DnsNoQuestion { from: String, as_string: String },
    /// Message with the QR bit set.
    DnsResponse { from: String, as_string: String },
    /// Datagram that could not be decoded as a DNS message.
    DnsMalformed { from: String, error: String, raw: String },
    /// Any HTTP request.
    Http { from: String, request_dump: String },
}

impl Observation {
    /// Fixed message text of the log record.
    pub fn message(&self) -> &'static str {
        match self {
            Observation::DnsA { .. } => "DNS A request",
            Observation::DnsAaaa { .. } => "DNS AAAA request",
            Observation::DnsUnknown { .. } => "Unknown DNS request",
            Observation::DnsNoQuestion { .. } => "DNS request without question",
            Observation::DnsResponse { .. } => "Unexpected DNS response",
            Observation::DnsMalformed { .. } => "Malformed DNS request",
            Observation::Http { .. } => "HTTP request",
        }
    }
}

/// Destination for observations.
///
/// Implementations must be cheap to call from the listener loops, since the DNS
/// listener records inline before it reads the next datagram.
pub trait ObservationSink: Send + Sync {
    fn record(&self, observation: Observation);
}

/// Emits every observation as a `tracing` event on the `lurk::observe` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn record(&self, observation: Observation) {
        let message = observation.message();
        match observation {
            Observation::DnsA { from, domain } => {
                tracing::info!(target: "lurk::observe", from = %from, domain = %domain, "{message}")
            }
            Observation::DnsAaaa { from, domain } => {
                tracing::info!(target: "lurk::observe", from = %from, domain = %domain, "{message}")
            }
            Observation::DnsUnknown { from, as_string } => {
                tracing::info!(target: "lurk::observe", from = %from, as_string = %as_string, "{message}")
            }
            Observation::DnsNoQuestion { from, as_string } => {
                tracing::info!(target: "lurk::observe", from = %from, as_string = %as_string, "{message}")
            }
            Observation::DnsResponse { from, as_string } => {
                tracing::info!(target: "lurk::observe", from = %from, as_string = %as_string, "{message}")
            }
            Observation::DnsMalformed { from, error, raw } => {
                tracing::warn!(target: "lurk::observe", from = %from, error = %error, raw = %raw, "{message}")
            }
            Observation::Http { from, request_dump } => {
                tracing::info!(target: "lurk::observe", from = %from, request_dump = %request_dump, "{message}")
            }
        }
    }
}

/// Keeps observations in memory, in the order they were recorded.
#[derive(Debug, Default)]
pub struct MemorySink {
    observations: Mutex<Vec<Observation>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().clone()
    }
}

impl ObservationSink for MemorySink {
    fn record(&self, observation: Observation) {
        self.observations.lock().push(observation);
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod sink_tests;
