//! Home screen: mode selection and the entry points to everything else.

use std::cell::Cell;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use strum::{EnumIter, IntoEnumIterator};
use tracing::{debug, info, instrument};

use crate::game::{GameMode, RuleEngine};
use crate::ui::screen::{PopupMessage, Screen, ScreenTransition};

/// Menu options on the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
enum HomeOption {
    LocalMatch,
    HostMatch,
    JoinMatch,
    History,
    Achievements,
    Settings,
    Quit,
}

impl HomeOption {
    fn label(self) -> &'static str {
        match self {
            Self::LocalMatch => "1. Local match",
            Self::HostMatch => "2. Host online match",
            Self::JoinMatch => "3. Join online match",
            Self::History => "History",
            Self::Achievements => "Achievements",
            Self::Settings => "Settings",
            Self::Quit => "Quit",
        }
    }

    fn transition(self) -> ScreenTransition {
        match self {
            Self::LocalMatch => ScreenTransition::StartGame(GameMode::Local),
            Self::HostMatch => ScreenTransition::StartGame(GameMode::HostOnline),
            Self::JoinMatch => ScreenTransition::StartGame(GameMode::JoinOnline),
            Self::History => ScreenTransition::ShowHistory,
            Self::Achievements => ScreenTransition::ShowAchievements,
            Self::Settings => ScreenTransition::GoToSettings,
            Self::Quit => ScreenTransition::Quit,
        }
    }
}

/// State for the home screen.
#[derive(Debug)]
pub struct HomeScreen {
    list_state: ListState,
    popup: Option<PopupMessage>,
    menu_area: Cell<Rect>,
}

impl Default for HomeScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeScreen {
    /// Creates a home screen with the first option selected.
    #[instrument]
    pub fn new() -> Self {
        debug!("Initializing HomeScreen");
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            list_state,
            popup: None,
            menu_area: Cell::new(Rect::default()),
        }
    }

    fn option_count() -> usize {
        HomeOption::iter().count()
    }

    /// Moves selection up.
    #[instrument(skip(self))]
    fn select_previous(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) if i > 0 => i - 1,
            _ => Self::option_count() - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Moves selection down.
    #[instrument(skip(self))]
    fn select_next(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % Self::option_count(),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn selected_option(&self) -> Option<HomeOption> {
        HomeOption::iter().nth(self.list_state.selected().unwrap_or(0))
    }

    /// Menu index under a terminal cell, using the area of the last render.
    fn option_index_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.menu_area.get();
        let inner_top = area.y + 1;
        let inside = column > area.x
            && column < area.x + area.width.saturating_sub(1)
            && row >= inner_top
            && row < area.y + area.height.saturating_sub(1);
        if !inside {
            return None;
        }
        let index = usize::from(row - inner_top);
        (index < Self::option_count()).then_some(index)
    }
}

impl Screen for HomeScreen {
    #[instrument(skip(self, frame, _engine))]
    fn render(&self, frame: &mut Frame, _engine: &dyn RuleEngine) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        let title = Paragraph::new("Chess Duel")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, chunks[0]);

        let items: Vec<ListItem> = HomeOption::iter()
            .map(|opt| ListItem::new(opt.label()))
            .collect();
        let menu = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        self.menu_area.set(chunks[1]);
        let mut list_state = self.list_state;
        frame.render_stateful_widget(menu, chunks[1], &mut list_state);

        let help = Paragraph::new("↑↓: Navigate | Enter: Select | 1-3: Play | q: Quit")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[2]);
    }

    #[instrument(skip(self, key, _engine))]
    fn handle_key(&mut self, key: KeyEvent, _engine: &mut dyn RuleEngine) -> ScreenTransition {
        match key.code {
            KeyCode::Up => {
                self.select_previous();
                ScreenTransition::Stay
            }
            KeyCode::Down => {
                self.select_next();
                ScreenTransition::Stay
            }
            KeyCode::Enter => match self.selected_option() {
                Some(option) => {
                    info!(option = ?option, "Home option selected");
                    option.transition()
                }
                None => ScreenTransition::Stay,
            },
            KeyCode::Char(c @ '1'..='3') => {
                let selection = c as u8 - b'0';
                GameMode::from_selection(selection)
                    .map(ScreenTransition::StartGame)
                    .unwrap_or(ScreenTransition::Stay)
            }
            KeyCode::Esc => ScreenTransition::GoBack,
            KeyCode::Char('q') | KeyCode::Char('Q') => ScreenTransition::Quit,
            _ => ScreenTransition::Stay,
        }
    }

    fn handle_mouse_motion(&mut self, column: u16, row: u16) {
        if let Some(index) = self.option_index_at(column, row) {
            self.list_state.select(Some(index));
        }
    }

    #[instrument(skip(self, _engine))]
    fn handle_mouse_release(
        &mut self,
        column: u16,
        row: u16,
        _engine: &mut dyn RuleEngine,
    ) -> ScreenTransition {
        let Some(index) = self.option_index_at(column, row) else {
            return ScreenTransition::Stay;
        };
        self.list_state.select(Some(index));
        match self.selected_option() {
            Some(option) => {
                info!(option = ?option, "Home option clicked");
                option.transition()
            }
            None => ScreenTransition::Stay,
        }
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
