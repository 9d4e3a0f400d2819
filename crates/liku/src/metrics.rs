//! Hub-wide counters, exposed to operators via [`crate::health`]'s
//! `/metrics` endpoint in Prometheus text-exposition format.
//!
//! `arcforge` has no metrics surface of its own; this follows `rdaum-moor`'s
//! preference for hand-rolled atomic counters over pulling in a metrics
//! crate for a handful of gauges.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub struct Metrics {
    started_at: Instant,
    clients_current: AtomicUsize,
    max_clients: usize,
    connections_total: AtomicU64,
    messages_received_total: AtomicU64,
    messages_sent_total: AtomicU64,
    bytes_received_total: AtomicU64,
    bytes_sent_total: AtomicU64,
    errors_total: AtomicU64,
}

impl Metrics {
    pub fn new(max_clients: usize) -> Self {
        Self {
            started_at: Instant::now(),
            clients_current: AtomicUsize::new(0),
            max_clients,
            connections_total: AtomicU64::new(0),
            messages_received_total: AtomicU64::new(0),
            messages_sent_total: AtomicU64::new(0),
            bytes_received_total: AtomicU64::new(0),
            bytes_sent_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
        }
    }

    pub fn record_connect(&self) {
        self.clients_current.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.clients_current.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.messages_received_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_received_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clients_current(&self) -> usize {
        self.clients_current.load(Ordering::Relaxed)
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Renders every counter as Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        out.push_str("# TYPE liku_clients_current gauge\n");
        out.push_str(&format!("liku_clients_current {}\n", self.clients_current()));
        out.push_str("# TYPE liku_clients_max gauge\n");
        out.push_str(&format!("liku_clients_max {}\n", self.max_clients));
        out.push_str("# TYPE liku_connections_total counter\n");
        out.push_str(&format!("liku_connections_total {}\n", self.connections_total.load(Ordering::Relaxed)));
        out.push_str("# TYPE liku_messages_received_total counter\n");
        out.push_str(&format!("liku_messages_received_total {}\n", self.messages_received_total.load(Ordering::Relaxed)));
        out.push_str("# TYPE liku_messages_sent_total counter\n");
        out.push_str(&format!("liku_messages_sent_total {}\n", self.messages_sent_total.load(Ordering::Relaxed)));
        out.push_str("# TYPE liku_bytes_received_total counter\n");
        out.push_str(&format!("liku_bytes_received_total {}\n", self.bytes_received_total.load(Ordering::Relaxed)));
        out.push_str("# TYPE liku_bytes_sent_total counter\n");
        out.push_str(&format!("liku_bytes_sent_total {}\n", self.bytes_sent_total.load(Ordering::Relaxed)));
        out.push_str("# TYPE liku_errors_total counter\n");
        out.push_str(&format!("liku_errors_total {}\n", self.errors_total.load(Ordering::Relaxed)));
        out.push_str("# TYPE liku_uptime_seconds gauge\n");
        out.push_str(&format!("liku_uptime_seconds {}\n", self.uptime_seconds()));
        out
    }
}
