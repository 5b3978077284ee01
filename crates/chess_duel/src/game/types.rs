//! Core domain types shared by the engine, the network layer and the UI.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of rows and columns on the board.
pub const BOARD_SIZE: u8 = 8;

/// A square on the board.
///
/// Row 0 is White's back rank; column 0 is the a-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Column (file), `0..8`.
    pub column: u8,
    /// Row (rank), `0..8`.
    pub row: u8,
}

impl Coordinate {
    /// Creates a coordinate, returning `None` if it lies off the board.
    #[instrument]
    pub fn new(column: u8, row: u8) -> Option<Self> {
        (column < BOARD_SIZE && row < BOARD_SIZE).then_some(Self { column, row })
    }

    /// Whether both components lie inside the board. Coordinates decoded from
    /// the wire are not checked on arrival.
    pub fn is_on_board(self) -> bool {
        self.column < BOARD_SIZE && self.row < BOARD_SIZE
    }

    /// Returns the board index in row-major order (`0..64`).
    pub fn to_index(self) -> usize {
        usize::from(self.row) * usize::from(BOARD_SIZE) + usize::from(self.column)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_on_board() {
            return write!(f, "({},{})", self.column, self.row);
        }
        let file = char::from(b'a' + self.column);
        write!(f, "{}{}", file, self.row + 1)
    }
}

/// One board action: a piece travels from `origin` to `destination`.
///
/// The session layer never interprets a move; it only carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Square the piece leaves.
    pub origin: Coordinate,
    /// Square the piece lands on.
    pub destination: Coordinate,
}

impl Move {
    /// Creates a new move.
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

/// Piece colour; White moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Moves first. Played by the host in online matches.
    White,
    /// Moves second. Played by the joiner in online matches.
    Black,
}

impl Side {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Returns the display label.
    pub fn label(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

/// How a match is played. Chosen once per match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    /// Both sides on this machine.
    Local,
    /// This machine listens for a peer and plays White.
    HostOnline,
    /// This machine dials the peer and plays Black.
    JoinOnline,
}

impl GameMode {
    /// Maps a home-menu selection number to a mode: 1 local, 2 host, 3 join.
    #[instrument]
    pub fn from_selection(selection: u8) -> Option<Self> {
        match selection {
            1 => Some(Self::Local),
            2 => Some(Self::HostOnline),
            3 => Some(Self::JoinOnline),
            _ => None,
        }
    }

    /// Returns the home-menu selection number for this mode.
    pub fn selection(self) -> u8 {
        match self {
            Self::Local => 1,
            Self::HostOnline => 2,
            Self::JoinOnline => 3,
        }
    }

    /// Whether this mode needs a network session.
    pub fn is_online(self) -> bool {
        !matches!(self, Self::Local)
    }

    /// Returns the display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Local => "Local match",
            Self::HostOnline => "Host online match",
            Self::JoinOnline => "Join online match",
        }
    }
}

/// Kind of chess piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    /// King; capturing it ends the match.
    King,
    /// Queen.
    Queen,
    /// Rook.
    Rook,
    /// Bishop.
    Bishop,
    /// Knight.
    Knight,
    /// Pawn.
    Pawn,
}

/// A piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    /// What the piece is.
    pub kind: PieceKind,
    /// Who owns it.
    pub side: Side,
}

impl Piece {
    /// Creates a piece.
    pub fn new(kind: PieceKind, side: Side) -> Self {
        Self { kind, side }
    }

    /// Returns a one-character glyph: upper case for White, lower case for Black.
    pub fn glyph(self) -> char {
        let glyph = match self.kind {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        };
        match self.side {
            Side::White => glyph,
            Side::Black => glyph.to_ascii_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_numbers_map_to_modes() {
        assert_eq!(GameMode::from_selection(1), Some(GameMode::Local));
        assert_eq!(GameMode::from_selection(2), Some(GameMode::HostOnline));
        assert_eq!(GameMode::from_selection(3), Some(GameMode::JoinOnline));
        assert_eq!(GameMode::from_selection(0), None);
        assert_eq!(GameMode::from_selection(4), None);
        for mode in [GameMode::Local, GameMode::HostOnline, GameMode::JoinOnline] {
            assert_eq!(GameMode::from_selection(mode.selection()), Some(mode));
        }
    }

    #[test]
    fn coordinates_display_as_squares() {
        assert_eq!(Coordinate::new(0, 0).expect("square on board").to_string(), "a1");
        assert_eq!(Coordinate::new(7, 7).expect("square on board").to_string(), "h8");
        assert_eq!(Coordinate { column: 9, row: 200 }.to_string(), "(9,200)");
        assert!(Coordinate::new(8, 0).is_none());
    }

    #[test]
    fn black_glyphs_are_lower_case() {
        assert_eq!(Piece::new(PieceKind::Knight, Side::White).glyph(), 'N');
        assert_eq!(Piece::new(PieceKind::Knight, Side::Black).glyph(), 'n');
    }
}
