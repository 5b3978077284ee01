//! Screen implementations for the controller's state machine.

mod board;
mod home;
mod settings;

pub use board::BoardScreen;
pub use home::HomeScreen;
pub use settings::SettingsScreen;
