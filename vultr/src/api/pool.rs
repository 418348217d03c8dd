//! reqwest client construction and per-client request counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const USER_AGENT: &str = concat!("terraform-provider-vultr/", env!("CARGO_PKG_VERSION"));

/// Transport settings for the underlying reqwest client
pub struct ConnectionPoolConfig {
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

impl ConnectionPoolConfig {
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.request_timeout)
            .connect_timeout(self.connection_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_connections);

        match self.tcp_keepalive {
            Some(keepalive) => builder.tcp_keepalive(keepalive),
            None => builder,
        }
        .build()
    }
}

/// Snapshot of a client's request counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Every attempt, retries included
    pub total_requests: u64,
    pub failed_requests: u64,
    /// Attempts answered with 429
    pub rate_limited_requests: u64,
}

/// Counters shared by every clone of a `Client`
#[derive(Debug, Default)]
pub struct RequestCounters {
    total: AtomicU64,
    failed: AtomicU64,
    rate_limited: AtomicU64,
}

impl RequestCounters {
    pub fn record_request(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            total_requests: self.total.load(Ordering::Relaxed),
            failed_requests: self.failed.load(Ordering::Relaxed),
            rate_limited_requests: self.rate_limited.load(Ordering::Relaxed),
        }
    }
}
