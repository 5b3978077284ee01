//! Chess Duel library - session core of a two-player chess client
//!
//! Plays a match either locally or against a peer over TCP, and returns to
//! the home screen whenever the connection cannot be made or is lost.
//!
//! # Architecture
//!
//! - **Net**: framed move exchange over a [`ConnectionSession`] with bounded
//!   connect retries
//! - **Coordinator**: [`MatchCoordinator`] binds a [`RuleEngine`] to local or
//!   online play and turns transport failures into [`MatchEvent`]s
//! - **UI**: [`ScreenController`] owns the active screen and drives matches
//! - **Settings**: peer address, window size and audio levels in a TOML file
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chess_duel::{SandboxEngine, ScreenController, Settings, TcpConnector};
//!
//! let settings = Settings::load("chess_duel.toml")?;
//! let mut controller = ScreenController::new(
//!     settings,
//!     Some("chess_duel.toml".into()),
//!     Box::new(SandboxEngine::new()),
//!     Arc::new(TcpConnector::new()),
//! );
//! controller.start_game_selection(1);
//! # Ok::<(), chess_duel::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod coordinator;
mod error;
mod game;
mod net;
mod settings;
mod ui;

// Crate-level exports - Errors
pub use error::ConfigError;

// Crate-level exports - Game types and the rule-engine contract
pub use game::{
    BOARD_SIZE, BoardSnapshot, Coordinate, EngineStatus, GameMode, MatchBinding, Move,
    MoveExchange, MoveOutcome, Piece, PieceKind, RuleEngine, SandboxEngine, Side,
};

// Crate-level exports - Networking
pub use net::{
    BoxedLink, ConnectionSession, Connector, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS,
    FrameError, LinkStream, MAX_FRAME_SIZE, MoveLink, RetryPolicy, Role, SessionError,
    SessionState, TcpConnector, read_frame, write_frame,
};

// Crate-level exports - Match coordination
pub use coordinator::{CoordinatorError, MatchCoordinator, MatchEvent, MatchFailure, MatchPhase};

// Crate-level exports - Settings
pub use settings::{
    AudioLevel, DEFAULT_HOST, DEFAULT_PORT, MAX_VOLUME, PeerAddress, Settings, VOLUME_STEP,
    WindowSize,
};

// Crate-level exports - Terminal UI
pub use ui::{
    BoardScreen, CONNECT_DELAY_TICKS, FRAME_INTERVAL, HomeScreen, PopupMessage, Screen,
    ScreenController, ScreenState, ScreenTransition, SettingsScreen, popups,
};
