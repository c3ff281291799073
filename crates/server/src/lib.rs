use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use tokio::net::{TcpListener, UdpSocket};

mod http;
mod sink;
mod udp;

pub use crate::http::{HttpObserverConfig, client_address, dump_request, run_http};
pub use crate::sink::{MemorySink, Observation, ObservationSink, SharedSink, TracingSink};
pub use crate::udp::{DnsObserver, DnsObserverConfig};

/// Both observers, sharing one sink.
pub struct ObserverServer {
    ip: IpAddr,
    dns: DnsObserverConfig,
    http: HttpObserverConfig,
    sink: SharedSink,
}

impl ObserverServer {
    pub fn new(ip: IpAddr, dns: DnsObserverConfig, http: HttpObserverConfig, sink: SharedSink) -> Self {
        Self { ip, dns, http, sink }
    }

    /// Bind both listeners, then serve until either of them fails.
    ///
    /// The DNS observer runs on its own task while HTTP is served on the caller's.
    pub async fn run(self) -> anyhow::Result<()> {
        let dns_addr = SocketAddr::new(self.ip, self.dns.port);
        let http_addr = SocketAddr::new(self.ip, self.http.port);

        let socket = UdpSocket::bind(dns_addr)
            .await
            .with_context(|| format!("failed to bind DNS listener on udp://{}", dns_addr))?;
        let listener = TcpListener::bind(http_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on tcp://{}", http_addr))?;

        let observer = DnsObserver::new(self.dns, self.sink.clone());
        let mut dns_task = tokio::spawn(observer.serve(socket));

        let result = tokio::select! {
            joined = &mut dns_task => match joined {
                Ok(Ok(())) => Err(anyhow::anyhow!("DNS listener stopped")),
                Ok(Err(e)) => Err(e.context("DNS listener failed")),
                Err(e) => Err(anyhow::Error::new(e).context("DNS listener task panicked")),
            },
            served = run_http(listener, self.sink) => served.context("HTTP listener failed"),
        };

        dns_task.abort();
        result
    }
}
