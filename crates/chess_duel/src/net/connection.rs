//! Connection session: one transport link to the peer for one match attempt.
//!
//! A session is single-use: `Idle → Connecting → Connected`, and from there
//! either `Failed` (retry budget exhausted, or the link broke) or `Closed`.
//! Neither terminal state is ever left; a later attempt needs a fresh session.
//!
//! Once connected, the link is split between a reader task that decodes frames
//! into an inbound queue and a writer task that drains an outbound queue, so
//! [`ConnectionSession::send`] and [`ConnectionSession::recv`] never block the
//! frame loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use derive_more::{Display, Error};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep_until, timeout};
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::PeerAddress;
use crate::game::Move;
use crate::net::connector::{BoxedLink, Connector, Role};
use crate::net::framing::{read_frame, write_frame};
use crate::net::link::MoveLink;

/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(300);

/// Default number of connection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Bounds for the connect retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on each attempt; also the minimum spacing between attempts.
    pub attempt_timeout: Duration,
    /// Number of attempts before giving up.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a retry policy.
    pub fn new(attempt_timeout: Duration, max_attempts: u32) -> Self {
        Self {
            attempt_timeout,
            max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no attempt made yet.
    Idle,
    /// Retry loop running.
    Connecting,
    /// Link established and alive.
    Connected,
    /// Retry budget exhausted, or the link broke.
    Failed,
    /// Released by `close()`.
    Closed,
}

/// Errors returned by session I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// The session has no live link.
    #[display("session is not connected")]
    NotConnected,
}

/// One peer link for a single online match attempt.
pub struct ConnectionSession {
    connector: Arc<dyn Connector>,
    role: Option<Role>,
    address: Option<PeerAddress>,
    state: SessionState,
    attempts: u32,
    link: Option<MoveLink>,
    tasks: Vec<JoinHandle<()>>,
}

impl ConnectionSession {
    /// Creates an idle session that will open its link through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            role: None,
            address: None,
            state: SessionState::Idle,
            attempts: 0,
            link: None,
            tasks: Vec::new(),
        }
    }

    /// Tries to establish the link, up to `policy.max_attempts` times.
    ///
    /// Each attempt is bounded by `policy.attempt_timeout`; an attempt that
    /// fails sooner is paced out to the end of its window. Returns `true` on
    /// the first success. Returns `false` once every attempt has failed, or
    /// straight away if the session is not `Idle`.
    #[instrument(skip(self, address), fields(address = %address))]
    pub async fn connect(&mut self, role: Role, address: PeerAddress, policy: RetryPolicy) -> bool {
        if self.state != SessionState::Idle {
            warn!(state = ?self.state, "Connect called on a used session");
            return false;
        }

        info!(
            max_attempts = policy.max_attempts,
            attempt_timeout_ms = policy.attempt_timeout.as_millis() as u64,
            "Connecting to peer"
        );
        self.role = Some(role);
        self.state = SessionState::Connecting;
        self.attempts = 0;

        for attempt in 1..=policy.max_attempts {
            self.attempts = attempt;
            let window_end = Instant::now() + policy.attempt_timeout;

            let outcome = timeout(
                policy.attempt_timeout,
                self.connector.attempt(role, &address),
            )
            .await;
            match outcome {
                Ok(Ok(stream)) => {
                    info!(attempt, "Connection established");
                    self.address = Some(address);
                    self.establish(stream);
                    return true;
                }
                Ok(Err(e)) => debug!(attempt, error = %e, "Connection attempt failed"),
                Err(_) => debug!(attempt, "Connection attempt timed out"),
            }

            if attempt < policy.max_attempts {
                sleep_until(window_end).await;
            }
        }

        warn!(attempts = self.attempts, "Could not connect to peer");
        self.address = Some(address);
        self.state = SessionState::Failed;
        false
    }

    /// Splits the link and spawns the reader and writer tasks.
    #[instrument(skip(self, stream))]
    fn establish(&mut self, stream: BoxedLink) {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Move>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Move>();
        let alive = Arc::new(AtomicBool::new(true));

        let reader_alive = alive.clone();
        let reader_task = tokio::spawn(
            async move {
                loop {
                    match read_frame::<_, Move>(&mut reader).await {
                        Ok(mv) => {
                            debug!(mv = %mv, "Frame received");
                            if inbound_tx.send(mv).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.is_eof() => {
                            info!("Peer closed the connection");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to read from peer");
                            break;
                        }
                    }
                }
                reader_alive.store(false, Ordering::SeqCst);
            }
            .instrument(info_span!("link_reader")),
        );

        let writer_alive = alive.clone();
        let writer_task = tokio::spawn(
            async move {
                while let Some(mv) = outbound_rx.recv().await {
                    if let Err(e) = write_frame(&mut writer, &mv).await {
                        warn!(error = %e, "Failed to write to peer");
                        break;
                    }
                    debug!(mv = %mv, "Frame sent");
                }
                writer_alive.store(false, Ordering::SeqCst);
                let _ = writer.shutdown().await;
            }
            .instrument(info_span!("link_writer")),
        );

        self.link = Some(MoveLink::new(outbound_tx, inbound_rx, alive));
        self.tasks = vec![reader_task, writer_task];
        self.state = SessionState::Connected;
    }

    /// Current lifecycle state. A connected session whose link broke reports
    /// `Failed`.
    pub fn state(&self) -> SessionState {
        match (&self.state, &self.link) {
            (SessionState::Connected, Some(link)) if !link.is_alive() => SessionState::Failed,
            (state, _) => *state,
        }
    }

    /// Whether the link is established and not known to have failed.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Number of attempts made by the last `connect` call.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Role given to `connect`, if it was called.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Address given to `connect`, if it was called.
    pub fn address(&self) -> Option<&PeerAddress> {
        self.address.as_ref()
    }

    /// Queues a move for the peer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] unless the session is connected.
    pub fn send(&self, mv: Move) -> Result<(), SessionError> {
        match &self.link {
            Some(link) if self.is_connected() => link.send(mv),
            _ => Err(SessionError::NotConnected),
        }
    }

    /// Returns the peer's next move if one has arrived. Never waits.
    ///
    /// Moves that arrived before the link broke are still returned in order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] once the session is closed, or
    /// the link is down with nothing left to read.
    pub fn recv(&self) -> Result<Option<Move>, SessionError> {
        match &self.link {
            Some(link) if self.state == SessionState::Connected => link.try_recv(),
            _ => Err(SessionError::NotConnected),
        }
    }

    /// Number of received moves waiting to be read.
    pub fn buffered_moves(&self) -> usize {
        self.link.as_ref().map_or(0, MoveLink::buffered)
    }

    /// Hands out a link sharing this session's queues, while connected.
    pub fn move_link(&self) -> Option<MoveLink> {
        match &self.link {
            Some(link) if self.is_connected() => Some(link.clone()),
            _ => None,
        }
    }

    /// Releases the transport. Safe to call any number of times, in any state.
    #[instrument(skip(self))]
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(link) = self.link.take() {
            link.shut();
        }
        info!(previous = ?self.state, "Session closed");
        self.state = SessionState::Closed;
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("state", &self.state())
            .field("attempts", &self.attempts)
            .finish()
    }
}
