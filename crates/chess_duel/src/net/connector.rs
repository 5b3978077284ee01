//! Connector seam: produces one raw link per connection attempt.

use std::io;

use async_trait::async_trait;
use derive_more::Display;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument};

use crate::PeerAddress;
use crate::game::Side;

/// Byte stream carrying frames between the two peers.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> LinkStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Boxed link handed from a connector to a session.
pub type BoxedLink = Box<dyn LinkStream>;

/// Which end of the connection this machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Role {
    /// Listens on the address and accepts one peer.
    #[display("host")]
    Host,
    /// Dials the address.
    #[display("join")]
    Join,
}

impl Role {
    /// Side the local player controls: the host plays White and moves first.
    pub fn local_side(self) -> Side {
        match self {
            Role::Host => Side::White,
            Role::Join => Side::Black,
        }
    }
}

/// Makes a single connection attempt.
///
/// The session wraps every attempt in its own timeout and handles retries, so
/// an implementation only has to try once.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Attempts to open a link to the peer at `address`.
    async fn attempt(&self, role: Role, address: &PeerAddress) -> io::Result<BoxedLink>;
}

/// TCP connector: the host binds and accepts, the joiner dials.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    /// Creates a TCP connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    #[instrument(skip(self, address), fields(address = %address))]
    async fn attempt(&self, role: Role, address: &PeerAddress) -> io::Result<BoxedLink> {
        let stream = match role {
            Role::Host => {
                let listener = TcpListener::bind(address.as_tuple()).await?;
                debug!(local = ?listener.local_addr().ok(), "Waiting for peer");
                let (stream, peer) = listener.accept().await?;
                info!(peer = %peer, "Peer connected");
                stream
            }
            Role::Join => {
                let stream = TcpStream::connect(address.as_tuple()).await?;
                info!(peer = ?stream.peer_addr().ok(), "Connected to host");
                stream
            }
        };
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_displays_lower_case_and_picks_side() {
        assert_eq!(Role::Host.to_string(), "host");
        assert_eq!(Role::Join.to_string(), "join");
        assert_eq!(Role::Host.local_side(), Side::White);
        assert_eq!(Role::Join.local_side(), Side::Black);
    }
}
