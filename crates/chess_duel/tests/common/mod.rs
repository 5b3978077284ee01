//! Shared helpers: scripted connectors and peer-side frame I/O.

#![allow(dead_code)]

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chess_duel::{
    BoxedLink, Connector, Coordinate, Move, PeerAddress, RetryPolicy, Role, read_frame,
    write_frame,
};
use tokio::io::DuplexStream;
use tokio::time::{Duration, Instant, sleep};

/// Retry policy short enough for tests.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(10), 10)
}

/// Address handed to scripted connectors; never dialled.
pub fn test_address() -> PeerAddress {
    PeerAddress::new("127.0.0.1", 5000)
}

/// Builds a move from `(column, row)` pairs.
pub fn mv(from: (u8, u8), to: (u8, u8)) -> Move {
    Move::new(
        Coordinate::new(from.0, from.1).expect("origin on board"),
        Coordinate::new(to.0, to.1).expect("destination on board"),
    )
}

/// Refuses the first `failures` attempts, then hands out in-memory links.
///
/// The far end of every link is kept so the test can play the peer, or drop
/// it to simulate a lost connection.
pub struct ScriptedConnector {
    failures: u32,
    attempts: AtomicU32,
    peers: Mutex<Vec<DuplexStream>>,
}

impl ScriptedConnector {
    /// Succeeds on attempt `failures + 1`.
    pub fn succeed_after(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
            peers: Mutex::new(Vec::new()),
        }
    }

    /// Never succeeds.
    pub fn refusing() -> Self {
        Self::succeed_after(u32::MAX)
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Takes the far end of the most recent link.
    pub fn take_peer(&self) -> DuplexStream {
        self.peers
            .lock()
            .expect("peers lock")
            .pop()
            .expect("a link was handed out")
    }

    /// Drops the far end of every link.
    pub fn drop_peers(&self) {
        self.peers.lock().expect("peers lock").clear();
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn attempt(&self, _role: Role, _address: &PeerAddress) -> io::Result<BoxedLink> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted refusal",
            ));
        }
        let (local, remote) = tokio::io::duplex(4096);
        self.peers.lock().expect("peers lock").push(remote);
        Ok(Box::new(local))
    }
}

/// Connector whose attempts never complete.
#[derive(Default)]
pub struct StalledConnector {
    attempts: AtomicU32,
}

impl StalledConnector {
    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for StalledConnector {
    async fn attempt(&self, _role: Role, _address: &PeerAddress) -> io::Result<BoxedLink> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Writes a move from the peer's end.
pub async fn peer_send(peer: &mut DuplexStream, mv: Move) {
    write_frame(peer, &mv).await.expect("peer write");
}

/// Reads a move at the peer's end.
pub async fn peer_recv(peer: &mut DuplexStream) -> Move {
    tokio::time::timeout(Duration::from_secs(2), read_frame(peer))
        .await
        .expect("peer read timed out")
        .expect("peer read")
}

/// Polls `condition` every few milliseconds for up to two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}
