//! A minimal HTTP/1.1 sibling service for liveness, readiness, a health
//! snapshot, and Prometheus scraping (spec.md §6).
//!
//! Grounded on the corpus's general preference for a raw
//! [`tokio::net::TcpListener`] over pulling in a web framework for a
//! handful of read-only routes (mirrors `arcforge/src/server.rs`'s own
//! accept loop shape, just serving HTTP instead of WebSocket frames).

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::metrics::Metrics;

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

pub struct HealthServer {
    listener: TcpListener,
    metrics: Arc<Metrics>,
}

impl HealthServer {
    pub async fn bind(addr: &str, metrics: Arc<Metrics>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, metrics })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the listener errors out, handling each on
    /// its own task. Never returns under normal operation.
    pub async fn run(self) {
        loop {
            let (stream, _) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "health server accept failed");
                    continue;
                }
            };
            let metrics = self.metrics.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_one(stream, metrics).await {
                    tracing::debug!(error = %err, "health connection closed early");
                }
            });
        }
    }
}

async fn serve_one(mut stream: TcpStream, metrics: Arc<Metrics>) -> std::io::Result<()> {
    let mut buf = [0u8; 2048];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request_path(&request).unwrap_or("/");

    let (status, content_type, body) = route(path, &metrics);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn request_path(request: &str) -> Option<&str> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    parts.next()?; // method
    parts.next()
}

fn route(path: &str, metrics: &Metrics) -> (&'static str, &'static str, String) {
    match path {
        "/live" => ("200 OK", "application/json", format!(r#"{{"status":"alive","timestamp":{}}}"#, now_ms())),
        "/ready" => {
            let ready = metrics.clients_current() < metrics.max_clients();
            if ready {
                ("200 OK", "application/json", format!(r#"{{"status":"ready","clients":{},"maxClients":{}}}"#, metrics.clients_current(), metrics.max_clients()))
            } else {
                ("503 Service Unavailable", "application/json", format!(r#"{{"status":"not_ready","clients":{},"maxClients":{}}}"#, metrics.clients_current(), metrics.max_clients()))
            }
        }
        "/health" => (
            "200 OK",
            "application/json",
            format!(
                r#"{{"status":"ok","clients":{},"maxClients":{},"uptimeSeconds":{}}}"#,
                metrics.clients_current(),
                metrics.max_clients(),
                metrics.uptime_seconds()
            ),
        ),
        "/metrics" => ("200 OK", "text/plain; version=0.0.4", metrics.render_prometheus()),
        _ => ("404 Not Found", "application/json", r#"{"status":"not_found"}"#.to_string()),
    }
}
