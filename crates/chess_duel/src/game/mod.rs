//! Game-side types, the rule-engine contract and the sandbox engine.

mod engine;
mod sandbox;
mod types;

pub use engine::{
    BoardSnapshot, EngineStatus, MatchBinding, MoveExchange, MoveOutcome, RuleEngine,
};
pub use sandbox::SandboxEngine;
pub use types::{BOARD_SIZE, Coordinate, GameMode, Move, Piece, PieceKind, Side};
