//! Board screen: shows the match and turns cursor or mouse picks into moves.

use std::cell::Cell;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tracing::{debug, info, instrument};

use crate::game::{
    BOARD_SIZE, BoardSnapshot, Coordinate, EngineStatus, Move, MoveOutcome, RuleEngine, Side,
};
use crate::ui::screen::{PopupMessage, Screen, ScreenTransition, center_rect};

/// Terminal columns per square.
const SQUARE_WIDTH: u16 = 3;
/// Columns taken by the rank labels left of the board.
const RANK_LABEL_WIDTH: u16 = 2;

/// State for the board screen.
#[derive(Debug)]
pub struct BoardScreen {
    cursor: Coordinate,
    selected: Option<Coordinate>,
    status: String,
    popup: Option<PopupMessage>,
    squares_area: Cell<Rect>,
    flipped: Cell<bool>,
}

impl Default for BoardScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardScreen {
    /// Creates a board screen with the cursor on e2.
    #[instrument]
    pub fn new() -> Self {
        debug!("Initializing BoardScreen");
        Self {
            cursor: Coordinate { column: 4, row: 1 },
            selected: None,
            status: String::from("Select a piece to move."),
            popup: None,
            squares_area: Cell::new(Rect::default()),
            flipped: Cell::new(false),
        }
    }

    /// Moves the cursor by one square in screen directions.
    fn move_cursor(&mut self, key: KeyCode) {
        let flip = self.flipped.get();
        let max = BOARD_SIZE - 1;
        let Coordinate { column, row } = self.cursor;
        let (column, row) = match (key, flip) {
            (KeyCode::Up, false) | (KeyCode::Down, true) => (column, (row + 1).min(max)),
            (KeyCode::Down, false) | (KeyCode::Up, true) => (column, row.saturating_sub(1)),
            (KeyCode::Right, false) | (KeyCode::Left, true) => ((column + 1).min(max), row),
            (KeyCode::Left, false) | (KeyCode::Right, true) => (column.saturating_sub(1), row),
            _ => (column, row),
        };
        self.cursor = Coordinate { column, row };
    }

    /// Board square under a terminal cell, using the layout of the last render.
    fn square_at(&self, column: u16, row: u16) -> Option<Coordinate> {
        let area = self.squares_area.get();
        if column < area.x || row < area.y {
            return None;
        }
        let display_column = (column - area.x) / SQUARE_WIDTH;
        let display_row = row - area.y;
        let size = u16::from(BOARD_SIZE);
        if display_column >= size || display_row >= size {
            return None;
        }
        let (display_column, display_row) = (display_column as u8, display_row as u8);
        let max = BOARD_SIZE - 1;
        if self.flipped.get() {
            Coordinate::new(max - display_column, display_row)
        } else {
            Coordinate::new(display_column, max - display_row)
        }
    }

    /// Selects a piece, or completes a move from the selected piece.
    #[instrument(skip(self, engine))]
    fn activate(&mut self, square: Coordinate, engine: &mut dyn RuleEngine) {
        match self.selected.take() {
            None => {
                if engine.snapshot().piece_at(square).is_some() {
                    self.selected = Some(square);
                    self.status = format!("Selected {square}.");
                } else {
                    self.status = format!("No piece on {square}.");
                }
            }
            Some(origin) if origin == square => {
                self.status = String::from("Selection cleared.");
            }
            Some(origin) => {
                let mv = Move::new(origin, square);
                let outcome = engine.submit_move(mv);
                info!(mv = %mv, outcome = ?outcome, "Local move submitted");
                self.status = describe_outcome(outcome, mv);
            }
        }
    }

    fn square_style(&self, coordinate: Coordinate, last_move: Option<Move>) -> Style {
        let light = (coordinate.column + coordinate.row) % 2 == 1;
        let mut style = Style::default().bg(if light {
            Color::Rgb(181, 136, 99)
        } else {
            Color::Rgb(110, 80, 55)
        });
        if last_move.is_some_and(|mv| mv.origin == coordinate || mv.destination == coordinate) {
            style = style.bg(Color::Rgb(170, 162, 58));
        }
        if self.selected == Some(coordinate) {
            style = style.bg(Color::Green);
        }
        if self.cursor == coordinate {
            style = style.bg(Color::Cyan);
        }
        style
    }

    fn board_lines(&self, snapshot: &BoardSnapshot, flip: bool) -> Vec<Line<'static>> {
        let max = BOARD_SIZE - 1;
        let mut lines = Vec::with_capacity(usize::from(BOARD_SIZE) + 1);
        for display_row in 0..BOARD_SIZE {
            let row = if flip { display_row } else { max - display_row };
            let mut spans = vec![Span::styled(
                format!("{} ", row + 1),
                Style::default().fg(Color::DarkGray),
            )];
            for display_column in 0..BOARD_SIZE {
                let column = if flip { max - display_column } else { display_column };
                let coordinate = Coordinate { column, row };
                let (glyph, fg) = match snapshot.piece_at(coordinate) {
                    Some(piece) => (
                        piece.glyph(),
                        match piece.side {
                            Side::White => Color::White,
                            Side::Black => Color::Black,
                        },
                    ),
                    None => (' ', Color::Reset),
                };
                spans.push(Span::styled(
                    format!(" {glyph} "),
                    self.square_style(coordinate, snapshot.last_move)
                        .fg(fg)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            lines.push(Line::from(spans));
        }

        let mut files = String::from("  ");
        for display_column in 0..BOARD_SIZE {
            let column = if flip { max - display_column } else { display_column };
            files.push_str(&format!(" {} ", char::from(b'a' + column)));
        }
        lines.push(Line::styled(files, Style::default().fg(Color::DarkGray)));
        lines
    }
}

/// One-line status for the outcome of a local move.
fn describe_outcome(outcome: MoveOutcome, mv: Move) -> String {
    match outcome {
        MoveOutcome::Applied => format!("Played {mv}."),
        MoveOutcome::NotYourTurn => String::from("Waiting for the opponent's move."),
        MoveOutcome::Rejected => format!("{mv} is not allowed."),
        MoveOutcome::LinkDown => String::from("Connection lost."),
        MoveOutcome::NoMatch => String::from("No match is running."),
    }
}

fn turn_line(snapshot: &BoardSnapshot) -> String {
    match snapshot.status {
        EngineStatus::Finished { winner: Some(side) } => format!("{} wins", side.label()),
        EngineStatus::Finished { winner: None } => String::from("Draw"),
        EngineStatus::Idle => String::from("No match"),
        EngineStatus::InProgress => match snapshot.local_side {
            Some(side) if side == snapshot.to_move => {
                format!("Your move ({})", side.label())
            }
            Some(side) => format!("Opponent to move (you play {})", side.label()),
            None => format!("{} to move", snapshot.to_move.label()),
        },
    }
}

impl Screen for BoardScreen {
    #[instrument(skip(self, frame, engine))]
    fn render(&self, frame: &mut Frame, engine: &dyn RuleEngine) {
        let snapshot = engine.snapshot();
        let flip = snapshot.local_side == Some(Side::Black);
        self.flipped.set(flip);

        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(11),
                Constraint::Length(4),
            ])
            .split(area);

        let title = Paragraph::new(turn_line(&snapshot))
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, chunks[0]);

        let size = u16::from(BOARD_SIZE);
        let board_area = center_rect(
            chunks[1],
            RANK_LABEL_WIDTH + size * SQUARE_WIDTH + 2,
            size + 3,
        );
        let block = Block::default().borders(Borders::ALL).title("Board");
        let inner = block.inner(board_area);
        self.squares_area.set(Rect {
            x: inner.x + RANK_LABEL_WIDTH,
            y: inner.y,
            width: inner.width.saturating_sub(RANK_LABEL_WIDTH),
            height: inner.height.min(size),
        });
        frame.render_widget(
            Paragraph::new(self.board_lines(&snapshot, flip)).block(block),
            board_area,
        );

        let last = snapshot
            .last_move
            .map(|mv| format!("Last move: {mv}"))
            .unwrap_or_else(|| String::from("No moves yet"));
        let status = Paragraph::new(vec![
            Line::from(self.status.as_str()),
            Line::styled(
                format!("{last} | Arrows: Move | Enter: Pick | Esc: Home"),
                Style::default().fg(Color::DarkGray),
            ),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, chunks[2]);
    }

    #[instrument(skip(self, key, engine))]
    fn handle_key(&mut self, key: KeyEvent, engine: &mut dyn RuleEngine) -> ScreenTransition {
        match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
                self.move_cursor(key.code);
                ScreenTransition::Stay
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.activate(self.cursor, engine);
                ScreenTransition::Stay
            }
            KeyCode::Esc if self.selected.is_some() => {
                self.selected = None;
                self.status = String::from("Selection cleared.");
                ScreenTransition::Stay
            }
            KeyCode::Esc | KeyCode::Backspace => {
                info!("Leaving board");
                ScreenTransition::GoBack
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => ScreenTransition::Quit,
            _ => ScreenTransition::Stay,
        }
    }

    fn handle_mouse_motion(&mut self, column: u16, row: u16) {
        if let Some(square) = self.square_at(column, row) {
            self.cursor = square;
        }
    }

    #[instrument(skip(self, engine))]
    fn handle_mouse_release(
        &mut self,
        column: u16,
        row: u16,
        engine: &mut dyn RuleEngine,
    ) -> ScreenTransition {
        if let Some(square) = self.square_at(column, row) {
            self.cursor = square;
            self.activate(square, engine);
        }
        ScreenTransition::Stay
    }

    fn set_popup_message(&mut self, popup: PopupMessage) {
        self.popup = Some(popup);
    }

    fn popup_message(&self) -> Option<&PopupMessage> {
        self.popup.as_ref()
    }

    fn clear_popup(&mut self) {
        self.popup = None;
    }
}
