//! Terminal front end: the screen controller, the screen contract and the
//! Home, Board and Settings screens.

mod controller;
mod screen;
mod screens;

pub use controller::{CONNECT_DELAY_TICKS, FRAME_INTERVAL, ScreenController, popups};
pub use screen::{PopupMessage, Screen, ScreenState, ScreenTransition};
pub use screens::{BoardScreen, HomeScreen, SettingsScreen};
