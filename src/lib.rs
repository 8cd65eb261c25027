//! pipecast: relay a process's standard streams to TCP clients
//!
//! Everything read from local input is broadcast to every connected client,
//! or written to local output when no client is connected. Anything a client
//! sends is written to local output. Clients never see each other's input.
//!
//! ```no_run
//! use pipecast::{input, Listener, Multiplexer, RelayConfig};
//!
//! # async fn example() -> pipecast::Result<()> {
//! let config = RelayConfig::default();
//! let listener = Listener::bind(&config).await?;
//! let queue = input::spawn_reader(std::io::stdin(), config.read_mode, config.buffer_size)?;
//!
//! Multiplexer::new(config, listener, queue, tokio::io::stdout())
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod input;
pub mod registry;
pub mod relay;
pub mod stats;

pub use error::{Error, Result};
pub use relay::{Listener, Multiplexer, RelayConfig};
