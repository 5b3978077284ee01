//! Screen trait, transitions and the popup overlay.

use crossterm::event::KeyEvent;
use derive_getters::Getters;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::game::{GameMode, RuleEngine};

/// The result of handling an input event on a screen.
///
/// Screens return this from [`Screen::handle_key`] and
/// [`Screen::handle_mouse_release`] to drive the
/// [`ScreenController`](crate::ScreenController) state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTransition {
    /// Stay on the current screen, no state change.
    Stay,
    /// Start a match in the given mode.
    StartGame(GameMode),
    /// End whatever is running and return to the home screen.
    GoBack,
    /// Open the settings screen.
    GoToSettings,
    /// Show the match history.
    ShowHistory,
    /// Show achievements.
    ShowAchievements,
    /// Persist the settings being edited.
    SaveSettings,
    /// Exit the application cleanly.
    Quit,
}

/// Which screen is active. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenState {
    /// Main menu.
    Home,
    /// Match board.
    Board,
    /// Settings editor.
    Settings,
}

/// Popup shown on top of a screen until the next key press.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct PopupMessage {
    title: String,
    subtitle: Option<String>,
}

impl PopupMessage {
    /// Creates a popup with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
        }
    }

    /// Adds a subtitle line.
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

/// Trait implemented by each screen in the controller's state machine.
///
/// Each screen owns its own state and popup, renders its UI, and handles
/// input. The engine is lent per call so the board can show and move pieces.
pub trait Screen {
    /// Renders the screen into the provided [`Frame`]. The controller draws
    /// any popup on top afterwards.
    fn render(&self, frame: &mut Frame, engine: &dyn RuleEngine);

    /// Handles a key event and returns the resulting [`ScreenTransition`].
    fn handle_key(&mut self, key: KeyEvent, engine: &mut dyn RuleEngine) -> ScreenTransition;

    /// Tracks the pointer. Most screens ignore it.
    fn handle_mouse_motion(&mut self, _column: u16, _row: u16) {}

    /// Handles a mouse button release at a terminal cell.
    fn handle_mouse_release(
        &mut self,
        _column: u16,
        _row: u16,
        _engine: &mut dyn RuleEngine,
    ) -> ScreenTransition {
        ScreenTransition::Stay
    }

    /// Shows a popup, replacing any current one.
    fn set_popup_message(&mut self, popup: PopupMessage);

    /// The popup currently shown, if any.
    fn popup_message(&self) -> Option<&PopupMessage>;

    /// Hides the popup.
    fn clear_popup(&mut self);
}

/// Draws `popup` centred over the whole frame.
pub(crate) fn render_popup(frame: &mut Frame, popup: &PopupMessage) {
    let mut lines = vec![Line::styled(
        popup.title().as_str(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(subtitle) = popup.subtitle() {
        lines.push(Line::default());
        lines.push(Line::styled(
            subtitle.as_str(),
            Style::default().fg(Color::White),
        ));
    }

    let height = lines.len() as u16 + 2;
    let area = center_rect(frame.area(), 52, height);
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

/// Returns a `width` × `height` rectangle centred in `area`, clipped to it.
pub(crate) fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height - height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width - width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vert[1])[1]
}
