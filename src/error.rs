//! Error types
//!
//! Only failures that end the relay are represented here. Per-peer I/O
//! errors never leave the multiplexer; they change the peer's state instead.

use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal relay error
#[derive(Debug)]
pub enum Error {
    /// The configured host/port did not resolve to any address
    Resolve(String),
    /// Binding or listening on the address failed
    Bind {
        /// Address that was being bound
        addr: String,
        /// Underlying I/O error
        source: io::Error,
    },
    /// Writing to local output failed
    Output(io::Error),
    /// Any other I/O error
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Resolve(target) => write!(f, "Could not resolve listen address: {}", target),
            Error::Bind { addr, source } => write!(f, "Failed to listen on {}: {}", addr, source),
            Error::Output(e) => write!(f, "Local output failed: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resolve(_) => None,
            Error::Bind { source, .. } => Some(source),
            Error::Output(e) | Error::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display() {
        let err = Error::Resolve("nowhere:1".into());
        assert_eq!(err.to_string(), "Could not resolve listen address: nowhere:1");

        let err = Error::Bind {
            addr: "127.0.0.1:21001".into(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "Failed to listen on 127.0.0.1:21001: in use");
    }

    #[test]
    fn test_source_chain() {
        let err = Error::Output(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(err.source().is_some());
        assert!(Error::Resolve("x".into()).source().is_none());
    }

    #[test]
    fn test_from_io() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
