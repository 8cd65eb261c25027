//! Listening socket
//!
//! Accept readiness is polled together with every other source, so the
//! listener never blocks the loop. A connection taken off the socket by a
//! poll is held until [`Listener::accept`] collects it.

use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::{Error, Result};

use super::config::RelayConfig;
use super::poll::Pollable;

/// Outcome of one accept attempt
pub type Accepted = io::Result<(TcpStream, SocketAddr)>;

/// The relay's TCP listener
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    pending: Option<Accepted>,
}

impl Listener {
    /// Resolve the configured address, bind with `SO_REUSEADDR` and listen
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let target = config.listen_target();
        let addr = tokio::net::lookup_host(target.as_str())
            .await
            .map_err(|_| Error::Resolve(target.clone()))?
            .next()
            .ok_or_else(|| Error::Resolve(target.clone()))?;

        let inner = listen_on(addr, config.backlog).map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;

        Ok(Self {
            inner,
            pending: None,
        })
    }

    /// Take the connection found by the last poll, if any
    pub fn accept(&mut self) -> Option<Accepted> {
        self.pending.take()
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl Pollable for Listener {
    fn poll_readable(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.pending.is_some() {
            return Poll::Ready(());
        }

        match self.inner.poll_accept(cx) {
            Poll::Ready(accepted) => {
                self.pending = Some(accepted);
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

fn listen_on(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };

    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

/// Apply per-connection socket options
pub(crate) fn configure_socket(socket: &TcpStream, config: &RelayConfig) -> io::Result<()> {
    if config.tcp_nodelay {
        socket.set_nodelay(true)?;
    }
    Ok(())
}
