//! Peer networking: framing, connectors, sessions and move links.

mod connection;
mod connector;
mod framing;
mod link;

pub use connection::{
    ConnectionSession, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, RetryPolicy, SessionError,
    SessionState,
};
pub use connector::{BoxedLink, Connector, LinkStream, Role, TcpConnector};
pub use framing::{FrameError, MAX_FRAME_SIZE, read_frame, write_frame};
pub use link::MoveLink;
