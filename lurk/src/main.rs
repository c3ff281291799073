use std::{env, sync::Arc};

use config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, load_config};
use lurk_server::{ObserverServer, SharedSink, TracingSink};
use tokio::signal;

mod config;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = env::var(CONFIG_PATH_ENV).unwrap_or(DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)?;

    let _guard = logging::init_logging(&config.server);

    tracing::info!(
        config = %config_path,
        ip = %config.server.ip,
        dns_port = config.dns.port,
        http_port = config.http.port,
        "Starting lurk {}",
        env!("CARGO_PKG_VERSION")
    );

    let sink: SharedSink = Arc::new(TracingSink);
    let server = ObserverServer::new(config.server.ip, config.dns, config.http, sink);

    tokio::select! {
        r = server.run() => {
            if let Err(e) = r {
                tracing::error!("Listener exited with error: {:#}", e);
                return Err(e);
            }
        },
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        },
    }

    Ok(())
}
