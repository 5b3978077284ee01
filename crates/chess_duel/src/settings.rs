//! Persisted client settings: peer address, window size and audio levels.
//!
//! Settings are stored as TOML. A missing file yields [`Settings::default`];
//! a file that exists but cannot be read or parsed is a [`ConfigError`].

use std::fmt;
use std::path::Path;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::ConfigError;

/// Default host used when no settings file exists.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port used when no settings file exists.
pub const DEFAULT_PORT: u16 = 5000;

/// Volume change applied by one step on the settings screen.
pub const VOLUME_STEP: u8 = 10;

/// Loudest accepted volume, in percent.
pub const MAX_VOLUME: u8 = 100;

/// Address of the peer, stored on disk as `[host, port]`.
///
/// The host listens on this address; the joiner dials it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
#[serde(from = "(String, u16)", into = "(String, u16)")]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    /// Creates a new peer address.
    #[instrument(skip(host), fields(host = %host.as_ref()))]
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        Self {
            host: host.as_ref().to_string(),
            port,
        }
    }

    /// Returns the address in the form accepted by tokio's socket constructors.
    pub fn as_tuple(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    /// Replaces the host part.
    #[instrument(skip(self))]
    pub fn set_host(&mut self, host: String) {
        debug!(old = %self.host, new = %host, "Updating peer host");
        self.host = host;
    }

    /// Replaces the port part.
    #[instrument(skip(self))]
    pub fn set_port(&mut self, port: u16) {
        debug!(old = self.port, new = port, "Updating peer port");
        self.port = port;
    }
}

impl Default for PeerAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<(String, u16)> for PeerAddress {
    fn from((host, port): (String, u16)) -> Self {
        Self { host, port }
    }
}

impl From<PeerAddress> for (String, u16) {
    fn from(address: PeerAddress) -> Self {
        (address.host, address.port)
    }
}

/// Window size in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

/// Audio volume and mute flag.
///
/// Playback itself lives outside this crate; only the values are kept so the
/// save action can persist them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioLevel {
    /// Volume in percent, `0..=100`.
    pub volume: u8,
    /// Whether sound is muted.
    pub muted: bool,
}

impl Default for AudioLevel {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            muted: false,
        }
    }
}

impl AudioLevel {
    /// Raises the volume by one step, saturating at 100.
    #[instrument]
    pub fn raise(self) -> Self {
        Self {
            volume: self.volume.saturating_add(VOLUME_STEP).min(MAX_VOLUME),
            ..self
        }
    }

    /// Lowers the volume by one step, saturating at 0.
    #[instrument]
    pub fn lower(self) -> Self {
        Self {
            volume: self.volume.saturating_sub(VOLUME_STEP),
            ..self
        }
    }

    /// Toggles the mute flag.
    #[instrument]
    pub fn toggle_mute(self) -> Self {
        Self {
            muted: !self.muted,
            ..self
        }
    }

    /// Volume actually applied to playback: 0 when muted.
    pub fn effective_volume(self) -> u8 {
        if self.muted { 0 } else { self.volume }
    }
}

/// User settings supplied at startup and written back on an explicit save.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Settings {
    /// Peer address as `[host, port]`.
    address: PeerAddress,
    /// Last known window size.
    window_size: WindowSize,
    /// Audio volume and mute flag.
    audio: AudioLevel,
}

impl Settings {
    /// Creates settings from explicit values.
    #[instrument]
    pub fn new(address: PeerAddress, window_size: WindowSize, audio: AudioLevel) -> Self {
        Self {
            address,
            window_size,
            audio,
        }
    }

    /// Loads settings from a TOML file, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut settings: Self = toml::from_str(&content)?;
        if settings.audio.volume > MAX_VOLUME {
            warn!(volume = settings.audio.volume, "Volume out of range, clamping");
            settings.audio.volume = MAX_VOLUME;
        }

        info!(address = %settings.address, "Settings loaded");
        Ok(settings)
    }

    /// Writes the settings to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            ConfigError::new(format!(
                "Failed to write settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(address = %self.address, "Settings saved");
        Ok(())
    }

    /// Replaces the peer address.
    #[instrument(skip(self))]
    pub fn set_address(&mut self, address: PeerAddress) {
        self.address = address;
    }

    /// Records a new window size.
    #[instrument(skip(self))]
    pub fn set_window_size(&mut self, window_size: WindowSize) {
        self.window_size = window_size;
    }

    /// Replaces the audio levels.
    #[instrument(skip(self))]
    pub fn set_audio(&mut self, audio: AudioLevel) {
        self.audio = audio;
    }
}
