//! Relay configuration

use std::time::Duration;

use crate::input::ReadMode;

/// Default listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 21001;

/// Default listen backlog
pub const DEFAULT_BACKLOG: u32 = 5;

/// Default per-read buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Host to listen on (name or IP literal)
    pub host: String,

    /// Port to listen on (0 = pick any free port)
    pub port: u16,

    /// Listen backlog
    pub backlog: u32,

    /// Maximum bytes per read, both from local input and from peers
    pub buffer_size: usize,

    /// Upper bound on how long one poll waits for readiness
    pub poll_interval: Duration,

    /// How local input is split into chunks
    pub read_mode: ReadMode,

    /// Enable TCP_NODELAY on accepted peers
    pub tcp_nodelay: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_interval: Duration::from_millis(500),
            read_mode: ReadMode::Chunk,
            tcp_nodelay: true, // Relayed output is usually interactive
        }
    }
}

impl RelayConfig {
    /// Set host and port
    pub fn listen(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set listen backlog (at least 1)
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog.max(1);
        self
    }

    /// Set per-read buffer size (at least 1 byte)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set local input read mode
    pub fn read_mode(mut self, mode: ReadMode) -> Self {
        self.read_mode = mode;
        self
    }

    /// Disable TCP_NODELAY on accepted peers
    pub fn disable_nodelay(mut self) -> Self {
        self.tcp_nodelay = false;
        self
    }

    /// `host:port` string suitable for address resolution
    ///
    /// IPv6 literals are bracketed.
    pub fn listen_target(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
