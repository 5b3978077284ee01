//! Sandbox rule engine: moves pieces without checking chess legality.
//!
//! The side to move may carry any of its pieces to any square not occupied by
//! its own pieces. Pawns reaching the far rank become queens. Capturing a king
//! ends the match. Both peers apply the same moves in the same order, so their
//! boards stay identical without any state sync.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::game::engine::{
    BoardSnapshot, EngineStatus, MatchBinding, MoveExchange, MoveOutcome, RuleEngine,
};
use crate::game::types::{BOARD_SIZE, GameMode, Move, Piece, PieceKind, Side};

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Permissive engine used by the terminal client.
pub struct SandboxEngine {
    board: [Option<Piece>; 64],
    to_move: Side,
    mode: GameMode,
    local_side: Option<Side>,
    last_move: Option<Move>,
    status: EngineStatus,
    exchange: Option<Box<dyn MoveExchange>>,
}

impl SandboxEngine {
    /// Creates an engine with no match running.
    #[instrument]
    pub fn new() -> Self {
        Self {
            board: [None; 64],
            to_move: Side::White,
            mode: GameMode::Local,
            local_side: None,
            last_move: None,
            status: EngineStatus::Idle,
            exchange: None,
        }
    }

    /// Standard chess starting position.
    fn starting_board() -> [Option<Piece>; 64] {
        let mut board = [None; 64];
        let width = usize::from(BOARD_SIZE);
        for (column, kind) in BACK_RANK.iter().enumerate() {
            board[column] = Some(Piece::new(*kind, Side::White));
            board[width + column] = Some(Piece::new(PieceKind::Pawn, Side::White));
            board[6 * width + column] = Some(Piece::new(PieceKind::Pawn, Side::Black));
            board[7 * width + column] = Some(Piece::new(*kind, Side::Black));
        }
        board
    }

    /// Whether `mv` carries a piece of the side to move onto a square free of
    /// that side's own pieces.
    fn is_acceptable(&self, mv: Move) -> bool {
        if mv.origin == mv.destination
            || !mv.origin.is_on_board()
            || !mv.destination.is_on_board()
        {
            return false;
        }
        let carries_own_piece = matches!(
            self.board[mv.origin.to_index()],
            Some(piece) if piece.side == self.to_move
        );
        let lands_on_own_piece = matches!(
            self.board[mv.destination.to_index()],
            Some(piece) if piece.side == self.to_move
        );
        carries_own_piece && !lands_on_own_piece
    }

    /// Applies an already validated move and flips the turn.
    #[instrument(skip(self))]
    fn apply(&mut self, mv: Move) {
        let Some(mut piece) = self.board[mv.origin.to_index()].take() else {
            return;
        };

        let far_rank = match piece.side {
            Side::White => BOARD_SIZE - 1,
            Side::Black => 0,
        };
        if piece.kind == PieceKind::Pawn && mv.destination.row == far_rank {
            debug!(square = %mv.destination, "Promoting pawn");
            piece.kind = PieceKind::Queen;
        }

        let captured = self.board[mv.destination.to_index()].replace(piece);
        self.last_move = Some(mv);

        if matches!(captured, Some(Piece { kind: PieceKind::King, .. })) {
            info!(winner = piece.side.label(), "King captured, match finished");
            self.status = EngineStatus::Finished {
                winner: Some(piece.side),
            };
            return;
        }

        self.to_move = self.to_move.opponent();
        debug!(to_move = self.to_move.label(), "Turn passed");
    }

    fn is_local_turn(&self) -> bool {
        self.local_side.is_none_or(|side| side == self.to_move)
    }
}

impl Default for SandboxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SandboxEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxEngine")
            .field("to_move", &self.to_move)
            .field("mode", &self.mode)
            .field("local_side", &self.local_side)
            .field("last_move", &self.last_move)
            .field("status", &self.status)
            .field("has_exchange", &self.exchange.is_some())
            .finish()
    }
}

impl RuleEngine for SandboxEngine {
    #[instrument(skip(self))]
    fn start_match(&mut self, binding: MatchBinding) {
        let (mode, local_side, exchange) = binding.into_parts();
        info!(mode = ?mode, local_side = ?local_side, "Starting sandbox match");
        self.board = Self::starting_board();
        self.to_move = Side::White;
        self.mode = mode;
        self.local_side = local_side;
        self.last_move = None;
        self.status = EngineStatus::InProgress;
        self.exchange = exchange;
    }

    #[instrument(skip(self))]
    fn submit_move(&mut self, mv: Move) -> MoveOutcome {
        if self.status != EngineStatus::InProgress {
            return MoveOutcome::NoMatch;
        }
        if !self.is_local_turn() {
            debug!(to_move = self.to_move.label(), "Local move outside local turn");
            return MoveOutcome::NotYourTurn;
        }
        if !self.is_acceptable(mv) {
            debug!(mv = %mv, "Move rejected");
            return MoveOutcome::Rejected;
        }

        if let Some(exchange) = self.exchange.as_mut()
            && !exchange.send_move(mv)
        {
            warn!(mv = %mv, "Failed to send move, link is down");
            return MoveOutcome::LinkDown;
        }

        self.apply(mv);
        MoveOutcome::Applied
    }

    #[instrument(skip(self))]
    fn update(&mut self) -> EngineStatus {
        if self.status != EngineStatus::InProgress || self.is_local_turn() {
            return self.status;
        }

        let Some(received) = self.exchange.as_mut().and_then(|e| e.receive_move()) else {
            return self.status;
        };

        if self.is_acceptable(received) {
            info!(mv = %received, "Applying opponent move");
            self.apply(received);
        } else {
            warn!(mv = %received, "Ignoring unacceptable move from peer");
        }
        self.status
    }

    fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            squares: self.board,
            to_move: self.to_move,
            local_side: self.local_side,
            last_move: self.last_move,
            status: self.status,
        }
    }

    #[instrument(skip(self))]
    fn end_match(&mut self) {
        info!("Ending sandbox match");
        self.exchange = None;
        self.local_side = None;
        self.status = EngineStatus::Idle;
    }
}

