//! pipecast binary
//!
//! Run with: some-producer | pipecast [OPTIONS]
//!
//! Examples:
//!   tail -f app.log | pipecast                      # listens on 127.0.0.1:21001
//!   ./game-server | pipecast --host 0.0.0.0 --port 9000
//!   nc 127.0.0.1 21001                              # watch, and type back into the producer
//!
//! Status lines go to stderr; set RUST_LOG to change verbosity.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pipecast::input::{self, ReadMode};
use pipecast::relay::config::{DEFAULT_BACKLOG, DEFAULT_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_PORT};
use pipecast::{Listener, Multiplexer, RelayConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// host to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,

    /// maximum bytes per read
    #[arg(short, long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// longest wait of one poll, in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// relay local input a line at a time
    #[arg(short, long)]
    line_mode: bool,

    /// leave Nagle's algorithm enabled on client sockets
    #[arg(long)]
    no_nodelay: bool,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        let mode = if self.line_mode {
            ReadMode::Line
        } else {
            ReadMode::Chunk
        };

        let config = RelayConfig::default()
            .listen(self.host, self.port)
            .backlog(self.backlog)
            .buffer_size(self.buffer_size)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .read_mode(mode);

        if self.no_nodelay {
            config.disable_nodelay()
        } else {
            config
        }
    }
}

/// Log filter used when RUST_LOG is unset or does not parse
const DEFAULT_LOG_FILTER: &str = "pipecast=info";

/// RUST_LOG wins when set; otherwise info for this crate only
fn log_filter(env: Option<&str>) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config();

    // stdout carries relayed data, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let listener = match Listener::bind(&config).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Closing");
            return Err(e.into());
        }
    };

    // The reader thread is never joined; exiting main does not wait on it
    let queue = input::spawn_reader(std::io::stdin(), config.read_mode, config.buffer_size)?;
    let relay = Multiplexer::new(config, listener, queue, tokio::io::stdout());

    let result = tokio::select! {
        result = relay.run() => result.map(|_| ()),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            tracing::info!("Closing");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Closing");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_prefers_env() {
        let filter = log_filter(Some("pipecast=debug")).to_string();

        assert_eq!(filter, EnvFilter::new("pipecast=debug").to_string());
        assert_ne!(filter, EnvFilter::new(DEFAULT_LOG_FILTER).to_string());
    }

    #[test]
    fn test_log_filter_default() {
        let default = EnvFilter::new(DEFAULT_LOG_FILTER).to_string();

        assert_eq!(log_filter(None).to_string(), default);
        assert_eq!(log_filter(Some("pipecast=[")).to_string(), default);
    }

    #[test]
    fn test_defaults_match_config() {
        let config = Args::parse_from(["pipecast"]).into_config();
        let default = RelayConfig::default();

        assert_eq!(config.listen_target(), default.listen_target());
        assert_eq!(config.backlog, default.backlog);
        assert_eq!(config.buffer_size, default.buffer_size);
        assert_eq!(config.poll_interval, default.poll_interval);
        assert_eq!(config.read_mode, ReadMode::Chunk);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_flags() {
        let config = Args::parse_from([
            "pipecast",
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
            "--backlog",
            "16",
            "-b",
            "1024",
            "--poll-interval-ms",
            "50",
            "--line-mode",
            "--no-nodelay",
        ])
        .into_config();

        assert_eq!(config.listen_target(), "0.0.0.0:9000");
        assert_eq!(config.backlog, 16);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.read_mode, ReadMode::Line);
        assert!(!config.tcp_nodelay);
    }
}
