use std::{convert::Infallible, fmt::Write, net::SocketAddr};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    HeaderMap, Request, Response, StatusCode,
    body::{Body, Incoming},
    header::{self, HeaderName, HeaderValue},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::sink::{Observation, SharedSink};

type Res = Response<Full<Bytes>>;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpObserverConfig {
    /// Port to listen on for plain HTTP.
    pub port: u16,
}

impl Default for HttpObserverConfig {
    fn default() -> Self {
        Self { port: 80 }
    }
}

/// Accept HTTP/1 connections forever, recording every request and answering 404.
pub async fn run_http(listener: TcpListener, sink: SharedSink) -> anyhow::Result<()> {
    tracing::info!("HTTP observer listening on {}", listener.local_addr()?);

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Failed to accept HTTP connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let sink = sink.clone();

        tokio::task::spawn(async move {
            let svc = service_fn(move |req: Request<Incoming>| handle_req(req, remote, sink.clone()));

            if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::debug!("h1 conn error from {}: {}", remote, e);
            }
        });
    }
}

async fn handle_req<B>(req: Request<B>, remote: SocketAddr, sink: SharedSink) -> Result<Res, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let from = client_address(req.headers(), remote);

    let request_dump = match dump_request(req).await {
        Ok(dump) => dump,
        Err(e) => {
            tracing::debug!("Failed to dump HTTP request from {}: {:#}", from, e);
            String::new()
        }
    };

    sink.record(Observation::Http { from, request_dump });

    Ok(not_found())
}

/// The first `X-Forwarded-For` value when present and non-empty, else the peer address.
pub fn client_address(headers: &HeaderMap, remote: SocketAddr) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .map(header_value)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| remote.to_string())
}

/// Read the whole body and render the request in wire form.
pub async fn dump_request<B>(req: Request<B>) -> anyhow::Result<String>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let mut dump = render_head(&req);

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read request body: {}", e))?
        .to_bytes();

    dump.push_str(&String::from_utf8_lossy(&body));
    Ok(dump)
}

/// Request line, `Host` first, the other headers sorted by canonical name and the
/// blank line. Framing headers are left out since the body gets dumped decoded.
fn render_head<B>(req: &Request<B>) -> String {
    let mut out = String::new();

    let _ = write!(out, "{} {} {:?}\r\n", req.method(), req.uri(), req.version());

    let host = req
        .headers()
        .get(header::HOST)
        .map(header_value)
        .or_else(|| req.uri().authority().map(|authority| authority.to_string()));
    if let Some(host) = host {
        let _ = write!(out, "Host: {}\r\n", host);
    }

    let skipped = [header::HOST, header::TRANSFER_ENCODING, header::TRAILER];
    let mut names: Vec<&HeaderName> = req.headers().keys().filter(|name| !skipped.contains(*name)).collect();
    names.sort_by_key(|name| canonical_header_name(name.as_str()));

    for name in names {
        let canonical = canonical_header_name(name.as_str());
        for value in req.headers().get_all(name) {
            let _ = write!(out, "{}: {}\r\n", canonical, header_value(value));
        }
    }

    out.push_str("\r\n");
    out
}

fn header_value(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

/// `x-forwarded-for` becomes `X-Forwarded-For`.
fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

fn not_found() -> Res {
    let mut res = Response::new(Full::new(Bytes::from_static(b"404 page not found\n")));
    *res.status_mut() = StatusCode::NOT_FOUND;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res.headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    res
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
