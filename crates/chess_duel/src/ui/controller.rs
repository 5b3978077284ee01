//! Screen controller: the state machine driving the terminal client.

use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEventKind};
use ratatui::{Frame, Terminal, backend::Backend};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

use crate::coordinator::{MatchCoordinator, MatchEvent, MatchFailure, MatchPhase};
use crate::game::{GameMode, RuleEngine};
use crate::net::{Connector, RetryPolicy, Role};
use crate::settings::{Settings, WindowSize};
use crate::ui::screen::{PopupMessage, Screen, ScreenState, ScreenTransition, render_popup};
use crate::ui::screens::{BoardScreen, HomeScreen, SettingsScreen};

/// Time between frames of [`ScreenController::run`] (60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Frames between showing the waiting popup and starting the connect loop.
pub const CONNECT_DELAY_TICKS: u64 = 2;

/// Popups shown by the controller.
pub mod popups {
    use crate::game::Side;
    use crate::ui::screen::PopupMessage;

    const SAD_FACE: &str = "(ಥ﹏ಥ)";

    /// Shown while an online match looks for its peer.
    pub fn waiting() -> PopupMessage {
        PopupMessage::new("Searching for a player on the network...").with_subtitle("Please wait.")
    }

    /// Shown when no peer answered within the retry budget.
    pub fn connection_timeout() -> PopupMessage {
        PopupMessage::new("Unfortunately, it was not possible to connect.")
            .with_subtitle("Please check your connection.")
    }

    /// Shown when the link broke during a match.
    pub fn connection_lost() -> PopupMessage {
        PopupMessage::new("Connection lost.")
    }

    /// Placeholder for the history entry point.
    pub fn history_unavailable() -> PopupMessage {
        PopupMessage::new("History unavailable at the moment").with_subtitle(SAD_FACE)
    }

    /// Placeholder for the achievements entry point.
    pub fn achievements_unavailable() -> PopupMessage {
        PopupMessage::new("Achievements unavailable at the moment").with_subtitle(SAD_FACE)
    }

    /// Shown on the board when the engine reports the end of the match.
    pub fn match_finished(winner: Option<Side>) -> PopupMessage {
        let title = match winner {
            Some(side) => format!("{} wins!", side.label()),
            None => String::from("Draw."),
        };
        PopupMessage::new(title).with_subtitle("Press Esc to return home.")
    }
}

/// Active screen in the controller's state machine.
#[derive(Debug)]
enum ActiveScreen {
    Home(HomeScreen),
    Board(BoardScreen),
    Settings(SettingsScreen),
}

impl ActiveScreen {
    fn state(&self) -> ScreenState {
        match self {
            Self::Home(_) => ScreenState::Home,
            Self::Board(_) => ScreenState::Board,
            Self::Settings(_) => ScreenState::Settings,
        }
    }

    fn as_screen(&self) -> &dyn Screen {
        match self {
            Self::Home(s) => s,
            Self::Board(s) => s,
            Self::Settings(s) => s,
        }
    }

    fn as_screen_mut(&mut self) -> &mut dyn Screen {
        match self {
            Self::Home(s) => s,
            Self::Board(s) => s,
            Self::Settings(s) => s,
        }
    }
}

/// Controller that owns the active screen and the current match.
///
/// Input and draw events go only to the active screen. Matches are started
/// through a fresh [`MatchCoordinator`] each time and discarded on
/// [`go_back`](Self::go_back) or failure. Call [`ScreenController::run`] to
/// start the event loop, or drive it by hand with [`tick`](Self::tick) and the
/// `on_*` methods.
pub struct ScreenController {
    screen: ActiveScreen,
    settings: Settings,
    settings_path: Option<PathBuf>,
    engine: Box<dyn RuleEngine>,
    connector: Arc<dyn Connector>,
    retry_policy: RetryPolicy,
    coordinator: Option<MatchCoordinator>,
    scheduled_connect: Option<u64>,
    frame: u64,
    quit: bool,
}

impl ScreenController {
    /// Creates a controller on the home screen.
    ///
    /// `settings_path` is where [`save_settings`](Self::save_settings) writes;
    /// without one, saving only keeps the values for this run.
    #[instrument(skip(settings, engine, connector))]
    pub fn new(
        settings: Settings,
        settings_path: Option<PathBuf>,
        engine: Box<dyn RuleEngine>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        info!(address = %settings.address(), "Creating ScreenController");
        Self {
            screen: ActiveScreen::Home(HomeScreen::new()),
            settings,
            settings_path,
            engine,
            connector,
            retry_policy: RetryPolicy::default(),
            coordinator: None,
            scheduled_connect: None,
            frame: 0,
            quit: false,
        }
    }

    /// Replaces the connect retry policy used for later online matches.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Which screen is active.
    pub fn screen_state(&self) -> ScreenState {
        self.screen.state()
    }

    /// Mode of the current match, if one is running or connecting.
    pub fn game_mode(&self) -> Option<GameMode> {
        self.coordinator.as_ref().and_then(MatchCoordinator::mode)
    }

    /// Phase of the current match, if any.
    pub fn match_phase(&self) -> Option<MatchPhase> {
        self.coordinator.as_ref().map(MatchCoordinator::phase)
    }

    /// Whether a session is open or being opened.
    pub fn has_open_session(&self) -> bool {
        self.coordinator
            .as_ref()
            .is_some_and(|c| c.has_session() || c.connect_pending())
    }

    /// Popup on the active screen, if any.
    pub fn popup_message(&self) -> Option<&PopupMessage> {
        self.screen.as_screen().popup_message()
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The rule engine.
    pub fn engine(&self) -> &dyn RuleEngine {
        self.engine.as_ref()
    }

    /// Frames ticked so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Whether the user asked to quit.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Shows a popup on the active screen.
    #[instrument(skip(self))]
    pub fn set_popup_message(&mut self, popup: PopupMessage) {
        self.screen.as_screen_mut().set_popup_message(popup);
    }

    /// Starts the match for a home-menu selection number: 1 local, 2 host,
    /// 3 join. Other numbers are ignored.
    #[instrument(skip(self))]
    pub fn start_game_selection(&mut self, selection: u8) {
        match GameMode::from_selection(selection) {
            Some(mode) => self.start_game(mode),
            None => warn!(selection, "Unknown game selection"),
        }
    }

    /// Starts a match.
    ///
    /// Local play enters the board right away. Online play stays on the home
    /// screen with the waiting popup and launches the connect loop
    /// [`CONNECT_DELAY_TICKS`] frames later; the board is entered once the peer
    /// is connected. Ignored while another match exists.
    #[instrument(skip(self))]
    pub fn start_game(&mut self, mode: GameMode) {
        if self.coordinator.is_some() {
            warn!(mode = ?mode, "A match is already in progress");
            return;
        }

        let mut coordinator = MatchCoordinator::new(
            self.connector.clone(),
            self.settings.address().clone(),
            self.retry_policy,
        );

        match mode {
            GameMode::Local => match coordinator.start_local(self.engine.as_mut()) {
                Ok(event) => {
                    self.coordinator = Some(coordinator);
                    self.handle_match_event(event);
                }
                Err(e) => warn!(error = %e, "Could not start local match"),
            },
            GameMode::HostOnline | GameMode::JoinOnline => {
                let role = if mode == GameMode::HostOnline {
                    Role::Host
                } else {
                    Role::Join
                };
                if let Err(e) = coordinator.begin_online(role) {
                    warn!(error = %e, "Could not begin online match");
                    return;
                }
                if self.screen.state() != ScreenState::Home {
                    self.screen = ActiveScreen::Home(HomeScreen::new());
                }
                self.set_popup_message(popups::waiting());
                self.coordinator = Some(coordinator);
                self.scheduled_connect = Some(self.frame + CONNECT_DELAY_TICKS);
                info!(role = %role, due = self.frame + CONNECT_DELAY_TICKS, "Connect scheduled");
            }
        }
    }

    /// Ends any match, closes any session and returns to the home screen.
    #[instrument(skip(self))]
    pub fn go_back(&mut self) {
        match self.coordinator.take() {
            Some(mut coordinator) => coordinator.teardown(self.engine.as_mut()),
            None => self.engine.end_match(),
        }
        self.scheduled_connect = None;
        self.screen = ActiveScreen::Home(HomeScreen::new());
        info!("Navigated to Home");
    }

    /// Advances one frame: runs a due connect and polls the match.
    #[instrument(level = "debug", skip(self), fields(frame = self.frame + 1))]
    pub fn tick(&mut self) {
        self.frame += 1;

        if let Some(due) = self.scheduled_connect
            && self.frame >= due
        {
            self.scheduled_connect = None;
            if let Some(coordinator) = self.coordinator.as_mut()
                && let Err(e) = coordinator.launch_connect()
            {
                warn!(error = %e, "Scheduled connect refused");
            }
        }

        let event = self
            .coordinator
            .as_mut()
            .and_then(|coordinator| coordinator.poll(self.engine.as_mut()));
        if let Some(event) = event {
            self.handle_match_event(event);
        }
    }

    /// Reacts to a coordinator event.
    #[instrument(skip(self))]
    fn handle_match_event(&mut self, event: MatchEvent) {
        match event {
            MatchEvent::Started { mode, local_side } => {
                info!(mode = ?mode, local_side = ?local_side, "Navigating to Board");
                self.absorb_settings_from_screen();
                self.screen = ActiveScreen::Board(BoardScreen::new());
            }
            MatchEvent::Finished { winner } => {
                info!(winner = ?winner, "Match over");
                self.set_popup_message(popups::match_finished(winner));
            }
            MatchEvent::Failed(failure) => {
                self.coordinator = None;
                self.scheduled_connect = None;
                self.absorb_settings_from_screen();
                self.screen = ActiveScreen::Home(HomeScreen::new());
                let popup = match failure {
                    MatchFailure::ConnectionTimeout => popups::connection_timeout(),
                    MatchFailure::ConnectionLost => popups::connection_lost(),
                };
                warn!(failure = %failure, "Match failed, back to Home");
                self.set_popup_message(popup);
            }
        }
    }

    /// Renders the active screen and its popup.
    pub fn on_draw(&self, frame: &mut Frame) {
        let screen = self.screen.as_screen();
        screen.render(frame, self.engine.as_ref());
        if let Some(popup) = screen.popup_message() {
            render_popup(frame, popup);
        }
    }

    /// Routes a key press to the active screen. An open popup swallows the
    /// key and closes.
    #[instrument(skip(self, key), fields(code = ?key.code))]
    pub fn on_key_press(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let screen = self.screen.as_screen_mut();
        if screen.popup_message().is_some() {
            debug!("Dismissing popup");
            screen.clear_popup();
            return;
        }
        let transition = screen.handle_key(key, self.engine.as_mut());
        self.apply_transition(transition);
    }

    /// Routes pointer movement to the active screen.
    pub fn on_mouse_motion(&mut self, column: u16, row: u16) {
        self.screen.as_screen_mut().handle_mouse_motion(column, row);
    }

    /// Routes a mouse button release to the active screen.
    #[instrument(skip(self))]
    pub fn on_mouse_release(&mut self, column: u16, row: u16) {
        let screen = self.screen.as_screen_mut();
        if screen.popup_message().is_some() {
            return;
        }
        let transition = screen.handle_mouse_release(column, row, self.engine.as_mut());
        self.apply_transition(transition);
    }

    /// Records a new terminal size in the settings.
    #[instrument(skip(self))]
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.settings.set_window_size(WindowSize { width, height });
    }

    /// Writes the settings file and reports the result in a popup.
    #[instrument(skip(self))]
    pub fn save_settings(&mut self) {
        let popup = match &self.settings_path {
            Some(path) => match self.settings.save(path) {
                Ok(()) => {
                    info!(path = %path.display(), "Settings saved");
                    PopupMessage::new("Settings saved.").with_subtitle(path.display().to_string())
                }
                Err(e) => {
                    warn!(error = %e, "Failed to save settings");
                    PopupMessage::new("Could not save settings.").with_subtitle(e.to_string())
                }
            },
            None => {
                warn!("No settings file configured");
                PopupMessage::new("Settings kept for this session.")
                    .with_subtitle("No settings file configured.")
            }
        };
        self.set_popup_message(popup);
    }

    /// Applies a screen transition.
    #[instrument(skip(self))]
    fn apply_transition(&mut self, transition: ScreenTransition) {
        if transition != ScreenTransition::Stay {
            debug!(transition = ?transition, "Applying screen transition");
        }
        match transition {
            ScreenTransition::Stay => {}
            ScreenTransition::StartGame(mode) => self.start_game(mode),
            ScreenTransition::GoBack => {
                self.absorb_settings_from_screen();
                self.go_back();
            }
            ScreenTransition::GoToSettings => {
                info!("Navigating to Settings");
                self.screen = ActiveScreen::Settings(SettingsScreen::new(self.settings.clone()));
            }
            ScreenTransition::ShowHistory => self.set_popup_message(popups::history_unavailable()),
            ScreenTransition::ShowAchievements => {
                self.set_popup_message(popups::achievements_unavailable())
            }
            ScreenTransition::SaveSettings => {
                self.absorb_settings_from_screen();
                self.save_settings();
            }
            ScreenTransition::Quit => {
                info!("Quit requested");
                self.go_back();
                self.quit = true;
            }
        }
    }

    /// Keeps the edits made on the settings screen.
    /// Takes the edited settings off the settings screen. The window size is
    /// not editable there, so the controller's own value wins.
    fn absorb_settings_from_screen(&mut self) {
        if let ActiveScreen::Settings(screen) = &self.screen {
            debug!(address = %screen.settings().address(), "Keeping edited settings");
            let window_size = *self.settings.window_size();
            self.settings = screen.settings().clone();
            self.settings.set_window_size(window_size);
        }
    }

    /// Runs the event loop at [`FRAME_INTERVAL`] until the user quits.
    ///
    /// The current terminal size is recorded first. Each frame draws, drains
    /// pending terminal events and ticks. The session is torn down before
    /// returning.
    #[instrument(skip(self, terminal))]
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()>
    where
        <B as Backend>::Error: Send + Sync + 'static,
    {
        info!("Starting event loop");
        let size = terminal.size()?;
        self.on_resize(size.width, size.height);
        let mut ticker = interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.quit {
            ticker.tick().await;
            terminal.draw(|f| self.on_draw(f))?;

            while !self.quit && event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) => self.on_key_press(key),
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                            self.on_mouse_motion(mouse.column, mouse.row)
                        }
                        MouseEventKind::Up(_) => self.on_mouse_release(mouse.column, mouse.row),
                        _ => {}
                    },
                    Event::Resize(width, height) => self.on_resize(width, height),
                    _ => {}
                }
            }

            self.tick();
        }

        self.go_back();
        info!(frames = self.frame, "Event loop finished");
        Ok(())
    }
}

impl std::fmt::Debug for ScreenController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenController")
            .field("screen", &self.screen.state())
            .field("settings", &self.settings)
            .field("settings_path", &self.settings_path)
            .field("coordinator", &self.coordinator)
            .field("scheduled_connect", &self.scheduled_connect)
            .field("frame", &self.frame)
            .finish()
    }
}
