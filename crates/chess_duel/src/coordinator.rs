//! Match coordinator: binds a rule engine to a play mode for one match.
//!
//! Phases run `Idle → Connecting → Active → {Completed, Failed}`. Local play
//! skips `Connecting`. Online play connects on a spawned task so the frame loop
//! keeps drawing; [`MatchCoordinator::poll`] picks up the outcome on a later
//! frame. A coordinator serves exactly one match.

use std::sync::Arc;

use derive_more::{Display, Error};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::PeerAddress;
use crate::game::{EngineStatus, GameMode, MatchBinding, RuleEngine, Side};
use crate::net::{ConnectionSession, Connector, RetryPolicy, Role};

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MatchPhase {
    /// Nothing started yet.
    Idle,
    /// Online match waiting for the peer.
    Connecting,
    /// Match being played.
    Active,
    /// Match finished, or ended by the user.
    Completed,
    /// Match aborted by a connection failure.
    Failed,
}

/// Why an online match was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MatchFailure {
    /// No peer reachable within the retry budget.
    #[display("could not reach a peer")]
    ConnectionTimeout,
    /// The link broke during the match.
    #[display("connection to the peer was lost")]
    ConnectionLost,
}

/// An operation was called in a phase that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum CoordinatorError {
    /// The coordinator is in the wrong phase.
    #[display("cannot {operation} while {phase}")]
    InvalidPhase {
        /// Operation that was refused.
        operation: &'static str,
        /// Phase the coordinator was in.
        phase: MatchPhase,
    },
}

/// Something the UI has to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// The engine has been started; the board can be shown.
    Started {
        /// Mode of the match.
        mode: GameMode,
        /// Side played locally; `None` in local play.
        local_side: Option<Side>,
    },
    /// The engine reported the end of the match.
    Finished {
        /// Winning side, `None` for a draw.
        winner: Option<Side>,
    },
    /// The match was aborted. The session is already closed.
    Failed(MatchFailure),
}

type ConnectOutcome = (ConnectionSession, bool);

/// Connect loop running on its own task.
#[derive(Debug)]
struct PendingConnect {
    handle: JoinHandle<()>,
    outcome: oneshot::Receiver<ConnectOutcome>,
}

/// Runs one match: local, or online through a [`ConnectionSession`].
///
/// The coordinator is the only owner of the session. Engines are borrowed per
/// call so the screen layer can keep rendering and feeding moves to them.
pub struct MatchCoordinator {
    connector: Arc<dyn Connector>,
    address: PeerAddress,
    policy: RetryPolicy,
    phase: MatchPhase,
    mode: Option<GameMode>,
    role: Option<Role>,
    session: Option<ConnectionSession>,
    pending: Option<PendingConnect>,
}

impl MatchCoordinator {
    /// Creates an idle coordinator. `connector`, `address` and `policy` are only
    /// used if the match goes online.
    #[instrument(skip(connector, address), fields(address = %address))]
    pub fn new(connector: Arc<dyn Connector>, address: PeerAddress, policy: RetryPolicy) -> Self {
        debug!("Creating MatchCoordinator");
        Self {
            connector,
            address,
            policy,
            phase: MatchPhase::Idle,
            mode: None,
            role: None,
            session: None,
            pending: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Mode of the match, once one has been chosen.
    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    /// Local role in an online match.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Whether the coordinator holds an established session.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Whether a connect task is still running.
    pub fn connect_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn require(&self, expected: MatchPhase, operation: &'static str) -> Result<(), CoordinatorError> {
        if self.phase == expected {
            Ok(())
        } else {
            warn!(operation, phase = %self.phase, "Operation refused");
            Err(CoordinatorError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Starts a local match right away: `Idle → Active`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidPhase`] unless the coordinator is idle.
    #[instrument(skip(self, engine))]
    pub fn start_local(&mut self, engine: &mut dyn RuleEngine) -> Result<MatchEvent, CoordinatorError> {
        self.require(MatchPhase::Idle, "start a local match")?;
        engine.start_match(MatchBinding::local());
        self.mode = Some(GameMode::Local);
        self.phase = MatchPhase::Active;
        info!("Local match started");
        Ok(MatchEvent::Started {
            mode: GameMode::Local,
            local_side: None,
        })
    }

    /// Enters `Connecting` for an online match without touching the network.
    ///
    /// The connect loop itself is started by [`launch_connect`](Self::launch_connect),
    /// which the caller schedules for a later frame.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidPhase`] unless the coordinator is idle.
    #[instrument(skip(self))]
    pub fn begin_online(&mut self, role: Role) -> Result<(), CoordinatorError> {
        self.require(MatchPhase::Idle, "begin an online match")?;
        self.mode = Some(match role {
            Role::Host => GameMode::HostOnline,
            Role::Join => GameMode::JoinOnline,
        });
        self.role = Some(role);
        self.phase = MatchPhase::Connecting;
        info!(role = %role, "Online match waiting for connect");
        Ok(())
    }

    /// Spawns the connect loop on a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidPhase`] unless the coordinator is
    /// `Connecting` with no connect already running.
    #[instrument(skip(self))]
    pub fn launch_connect(&mut self) -> Result<(), CoordinatorError> {
        self.require(MatchPhase::Connecting, "launch connect")?;
        let role = match (self.role, &self.pending) {
            (Some(role), None) => role,
            _ => {
                return Err(CoordinatorError::InvalidPhase {
                    operation: "launch connect twice",
                    phase: self.phase,
                });
            }
        };

        let mut session = ConnectionSession::new(self.connector.clone());
        let address = self.address.clone();
        let policy = self.policy;
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(
            async move {
                let connected = session.connect(role, address, policy).await;
                if tx.send((session, connected)).is_err() {
                    debug!("Coordinator went away before connect finished");
                }
            }
            .instrument(info_span!("connect_task", role = %role)),
        );

        info!(
            address = %self.address,
            max_attempts = policy.max_attempts,
            "Connect task launched"
        );
        self.pending = Some(PendingConnect {
            handle,
            outcome: rx,
        });
        Ok(())
    }

    /// Advances the match by one frame.
    ///
    /// While connecting, checks whether the connect task has finished. While
    /// active, checks the link first and then lets the engine run one update.
    #[instrument(level = "debug", skip(self, engine))]
    pub fn poll(&mut self, engine: &mut dyn RuleEngine) -> Option<MatchEvent> {
        match self.phase {
            MatchPhase::Connecting => self.poll_connect(engine),
            MatchPhase::Active => self.poll_active(engine),
            MatchPhase::Idle | MatchPhase::Completed | MatchPhase::Failed => None,
        }
    }

    fn poll_connect(&mut self, engine: &mut dyn RuleEngine) -> Option<MatchEvent> {
        let pending = self.pending.as_mut()?;
        let (session, connected) = match pending.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => {
                warn!("Connect task ended without reporting");
                self.pending = None;
                return Some(self.fail(engine, MatchFailure::ConnectionTimeout));
            }
        };
        self.pending = None;

        if !connected {
            info!(attempts = session.attempts(), "Connect gave up");
            drop(session);
            return Some(self.fail(engine, MatchFailure::ConnectionTimeout));
        }

        let (Some(role), Some(mode), Some(link)) = (self.role, self.mode, session.move_link())
        else {
            warn!("Session dropped before the match could start");
            drop(session);
            return Some(self.fail(engine, MatchFailure::ConnectionLost));
        };

        let local_side = role.local_side();
        engine.start_match(MatchBinding::online(mode, local_side, Box::new(link)));
        self.session = Some(session);
        self.phase = MatchPhase::Active;
        info!(mode = ?mode, local_side = %local_side.label(), "Online match started");
        Some(MatchEvent::Started {
            mode,
            local_side: Some(local_side),
        })
    }

    fn poll_active(&mut self, engine: &mut dyn RuleEngine) -> Option<MatchEvent> {
        if let Some(session) = &self.session
            && !session.is_connected()
        {
            warn!(state = ?session.state(), "Link to peer is down");
            if let Some(event) = self.drain_after_loss(engine) {
                return Some(event);
            }
            return Some(self.fail(engine, MatchFailure::ConnectionLost));
        }

        self.update_engine(engine)
    }

    /// Lets the engine read the moves that arrived before the link broke.
    /// Stops once the queue is empty or the engine stops taking moves.
    fn drain_after_loss(&mut self, engine: &mut dyn RuleEngine) -> Option<MatchEvent> {
        loop {
            let buffered = self
                .session
                .as_ref()
                .map_or(0, ConnectionSession::buffered_moves);
            if buffered == 0 {
                return None;
            }
            debug!(buffered, "Reading moves left by the peer");
            if let Some(event) = self.update_engine(engine) {
                return Some(event);
            }
            let left = self
                .session
                .as_ref()
                .map_or(0, ConnectionSession::buffered_moves);
            if left >= buffered {
                debug!(left, "Engine left moves unread");
                return None;
            }
        }
    }

    fn update_engine(&mut self, engine: &mut dyn RuleEngine) -> Option<MatchEvent> {
        match engine.update() {
            EngineStatus::Finished { winner } => {
                info!(winner = ?winner, "Match finished");
                self.phase = MatchPhase::Completed;
                Some(MatchEvent::Finished { winner })
            }
            EngineStatus::Idle | EngineStatus::InProgress => None,
        }
    }

    /// Closes the session, clears the engine and enters `Failed`.
    #[instrument(skip(self, engine))]
    fn fail(&mut self, engine: &mut dyn RuleEngine, failure: MatchFailure) -> MatchEvent {
        self.release();
        engine.end_match();
        self.phase = MatchPhase::Failed;
        warn!(failure = %failure, "Match failed");
        MatchEvent::Failed(failure)
    }

    /// Aborts any connect task and closes any session.
    fn release(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("Aborting connect task");
            pending.handle.abort();
        }
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    /// Ends the match from any phase: aborts a running connect, closes the
    /// session and clears the engine. `Connecting` and `Active` end up
    /// `Completed`; other phases are kept.
    #[instrument(skip(self, engine))]
    pub fn teardown(&mut self, engine: &mut dyn RuleEngine) {
        self.release();
        engine.end_match();
        if matches!(self.phase, MatchPhase::Connecting | MatchPhase::Active) {
            self.phase = MatchPhase::Completed;
        }
        info!(phase = %self.phase, "Match torn down");
    }
}

impl Drop for MatchCoordinator {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for MatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCoordinator")
            .field("address", &self.address)
            .field("policy", &self.policy)
            .field("phase", &self.phase)
            .field("mode", &self.mode)
            .field("role", &self.role)
            .field("session", &self.session)
            .field("connect_pending", &self.pending.is_some())
            .finish()
    }
}
