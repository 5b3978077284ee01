//! Rule-engine contract.
//!
//! The session core never inspects move legality. It hands the engine a
//! [`MatchBinding`] at the start of each match: the mode, which side the local
//! player controls, and for online play a [`MoveExchange`] capability through
//! which the engine sends its own moves and polls for the opponent's.

use std::fmt;

use crate::game::types::{BOARD_SIZE, Coordinate, GameMode, Move, Piece, Side};

/// Move-exchange capability handed to the engine for online matches.
///
/// Both calls are non-blocking. A `false` from [`send_move`](Self::send_move)
/// or a `false` from [`is_connected`](Self::is_connected) means the link is
/// gone; the coordinator notices the same thing on its next poll.
pub trait MoveExchange {
    /// Transmits a local move to the peer. Returns `false` if the link is down.
    fn send_move(&mut self, mv: Move) -> bool;

    /// Returns the peer's next move if one has arrived.
    fn receive_move(&mut self) -> Option<Move>;

    /// Whether the underlying link is still alive.
    fn is_connected(&self) -> bool;
}

/// Everything an engine needs to start one match.
pub struct MatchBinding {
    mode: GameMode,
    local_side: Option<Side>,
    exchange: Option<Box<dyn MoveExchange>>,
}

impl MatchBinding {
    /// Binding for a local match: both sides are played on this machine.
    pub fn local() -> Self {
        Self {
            mode: GameMode::Local,
            local_side: None,
            exchange: None,
        }
    }

    /// Binding for an online match.
    pub fn online(mode: GameMode, local_side: Side, exchange: Box<dyn MoveExchange>) -> Self {
        Self {
            mode,
            local_side: Some(local_side),
            exchange: Some(exchange),
        }
    }

    /// The match mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// The side the local player controls; `None` in local play.
    pub fn local_side(&self) -> Option<Side> {
        self.local_side
    }

    /// Whether a move exchange is attached.
    pub fn has_exchange(&self) -> bool {
        self.exchange.is_some()
    }

    /// Splits the binding into its parts.
    pub fn into_parts(self) -> (GameMode, Option<Side>, Option<Box<dyn MoveExchange>>) {
        (self.mode, self.local_side, self.exchange)
    }
}

impl fmt::Debug for MatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchBinding")
            .field("mode", &self.mode)
            .field("local_side", &self.local_side)
            .field("has_exchange", &self.exchange.is_some())
            .finish()
    }
}

/// Result of submitting a local move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move was applied (and sent to the peer when online).
    Applied,
    /// It is not the local player's turn.
    NotYourTurn,
    /// The move does not carry a piece of the side to move onto a square free
    /// of that side's own pieces.
    Rejected,
    /// The move could not be sent because the link is down.
    LinkDown,
    /// No match is running.
    NoMatch,
}

/// Progress of the running match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    /// No match has been started, or it was ended.
    #[default]
    Idle,
    /// The match is being played.
    InProgress,
    /// The match is over. `winner` is `None` for a draw.
    Finished {
        /// Winning side, if any.
        winner: Option<Side>,
    },
}

/// Read-only view of the board for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    /// Squares in row-major order, row 0 first.
    pub squares: [Option<Piece>; 64],
    /// Side whose turn it is.
    pub to_move: Side,
    /// Side controlled locally; `None` in local play.
    pub local_side: Option<Side>,
    /// Most recent move, if any.
    pub last_move: Option<Move>,
    /// Match progress.
    pub status: EngineStatus,
}

impl BoardSnapshot {
    /// An empty board with no match running.
    pub fn empty() -> Self {
        Self {
            squares: [None; 64],
            to_move: Side::White,
            local_side: None,
            last_move: None,
            status: EngineStatus::Idle,
        }
    }

    /// Returns the piece on `coordinate`, if any.
    pub fn piece_at(&self, coordinate: Coordinate) -> Option<Piece> {
        self.squares[coordinate.to_index()]
    }

    /// Iterates over all rows from White's back rank upward.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Piece>]> {
        self.squares.chunks(usize::from(BOARD_SIZE))
    }
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// A turn-based rule engine.
///
/// The coordinator starts and ends matches; the board screen submits local
/// moves; the coordinator calls [`update`](Self::update) once per frame so the
/// engine can poll its [`MoveExchange`] for the opponent's move.
pub trait RuleEngine {
    /// Starts a new match, discarding any previous one.
    fn start_match(&mut self, binding: MatchBinding);

    /// Submits a move made by the local player.
    fn submit_move(&mut self, mv: Move) -> MoveOutcome;

    /// Advances the match by one frame and reports its status.
    fn update(&mut self) -> EngineStatus;

    /// Returns the current board for rendering.
    fn snapshot(&self) -> BoardSnapshot;

    /// Ends the running match and drops any attached move exchange.
    fn end_match(&mut self);
}
