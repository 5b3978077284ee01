//! Settings screen: edit the peer address and audio levels, then save.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use strum::{EnumIter, IntoEnumIterator};
use tracing::{debug, info, instrument};

use crate::game::RuleEngine;
use crate::settings::Settings;
use crate::ui::screen::{PopupMessage, Screen, ScreenTransition};

/// Longest host name accepted from the keyboard.
const MAX_HOST_LEN: usize = 253;

/// Editable rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
enum SettingsField {
    Host,
    Port,
    Volume,
    Muted,
    Save,
    Back,
}

/// State for the settings screen.
#[derive(Debug)]
pub struct SettingsScreen {
    settings: Settings,
    list_state: ListState,
    popup: Option<PopupMessage>,
}

impl SettingsScreen {
    /// Creates a settings screen pre-populated with the current settings.
    #[instrument(skip(settings))]
    pub fn new(settings: Settings) -> Self {
        debug!("Initializing SettingsScreen");
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            settings,
            list_state,
            popup: None,
        }
    }

    /// Returns the settings being edited (called by the controller on
    /// transition out).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn selected_field(&self) -> SettingsField {
        SettingsField::iter()
            .nth(self.list_state.selected().unwrap_or(0))
            .unwrap_or(SettingsField::Back)
    }

    fn select_offset(&mut self, forward: bool) {
        let count = SettingsField::iter().count();
        let current = self.list_state.selected().unwrap_or(0);
        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        self.list_state.select(Some(next));
    }

    fn field_label(&self, field: SettingsField) -> String {
        let address = self.settings.address();
        let audio = self.settings.audio();
        match field {
            SettingsField::Host => format!("Host      [ {} ]", address.host()),
            SettingsField::Port => format!("Port      [ {} ]", address.port()),
            SettingsField::Volume => format!("Volume    [ {:>3}% ]", audio.volume),
            SettingsField::Muted => {
                format!("Muted     [ {} ]", if audio.muted { "yes" } else { "no" })
            }
            SettingsField::Save => String::from("Save"),
            SettingsField::Back => String::from("Back"),
        }
    }

    #[instrument(skip(self))]
    fn edit_host(&mut self, key: KeyCode) {
        let mut address = self.settings.address().clone();
        let mut host = address.host().clone();
        match key {
            KeyCode::Char(c) if (c.is_ascii_alphanumeric() || c == '.' || c == '-')
                && host.len() < MAX_HOST_LEN =>
            {
                host.push(c)
            }
            KeyCode::Backspace => {
                host.pop();
            }
            _ => return,
        }
        address.set_host(host);
        self.settings.set_address(address);
    }

    #[instrument(skip(self))]
    fn edit_port(&mut self, key: KeyCode) {
        let mut address = self.settings.address().clone();
        let port = *address.port();
        let next = match key {
            KeyCode::Char(c) => match c.to_digit(10) {
                Some(digit) => u32::from(port) * 10 + digit,
                None => return,
            },
            KeyCode::Backspace => u32::from(port) / 10,
            _ => return,
        };
        let Ok(next) = u16::try_from(next) else {
            debug!(next, "Port out of range");
            return;
        };
        address.set_port(next);
        self.settings.set_address(address);
    }

    fn adjust_audio(&mut self, key: KeyCode) {
        let audio = *self.settings.audio();
        let updated = match (self.selected_field(), key) {
            (SettingsField::Volume, KeyCode::Left) => audio.lower(),
            (SettingsField::Volume, KeyCode::Right) => audio.raise(),
            (SettingsField::Muted, _) => audio.toggle_mute(),
            _ => return,
        };
        info!(volume = updated.volume, muted = updated.muted, "Audio changed");
        self.settings.set_audio(updated);
    }
}

impl Screen for SettingsScreen {
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

        let title = Paragraph::new("Settings")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, chunks[0]);

        let items: Vec<ListItem> = SettingsField::iter()
            .map(|field| ListItem::new(self.field_label(field)))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Preferences"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut list_state = self.list_state;
        frame.render_stateful_widget(list, chunks[1], &mut list_state);

        let help = Paragraph::new("↑↓: Navigate | Type: Edit | ←→ / Enter: Change | Esc: Back")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[2]);
    }

    #[instrument(skip(self, key, _engine))]
    fn handle_key(&mut self, key: KeyEvent, _engine: &mut dyn RuleEngine) -> ScreenTransition {
        match (key.code, self.selected_field()) {
            (KeyCode::Esc, _) => {
                info!("Leaving settings screen");
                ScreenTransition::GoBack
            }
            (KeyCode::Up, _) => {
                self.select_offset(false);
                ScreenTransition::Stay
            }
            (KeyCode::Down | KeyCode::Tab, _) => {
                self.select_offset(true);
                ScreenTransition::Stay
            }
            (code @ (KeyCode::Char(_) | KeyCode::Backspace), SettingsField::Host) => {
                self.edit_host(code);
                ScreenTransition::Stay
            }
            (code @ (KeyCode::Char(_) | KeyCode::Backspace), SettingsField::Port) => {
                self.edit_port(code);
                ScreenTransition::Stay
            }
            (code @ (KeyCode::Left | KeyCode::Right), SettingsField::Volume)
            | (code @ (KeyCode::Enter | KeyCode::Char(' ')), SettingsField::Muted) => {
                self.adjust_audio(code);
                ScreenTransition::Stay
            }
            (KeyCode::Enter, SettingsField::Save) => ScreenTransition::SaveSettings,
            (KeyCode::Enter, SettingsField::Back) => ScreenTransition::GoBack,
            _ => ScreenTransition::Stay,
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
