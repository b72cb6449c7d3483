//! Play settings.
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use crate::midi::Microseconds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from reading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timing and input settings for play sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    /// Time before the first note, so falling notes are visible before they are due.
    pub lead_in_us: Microseconds,
    /// Time after the last note before the song counts as over.
    pub lead_out_us: Microseconds,
    /// Full width of the judgment window around a note's start.
    pub judgment_window_us: Microseconds,
    /// Song time shown on the playfield at once.
    pub show_duration_us: Microseconds,
    /// Playback speed in percent at session start.
    pub initial_speed: u32,
    /// How long a computer-keyboard note sounds after a key press.
    pub key_hold_ms: u64,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            lead_in_us: 5_500_000,
            lead_out_us: 1_000_000,
            judgment_window_us: 300_000,
            show_duration_us: 3_250_000,
            initial_speed: 100,
            key_hold_ms: 250,
        }
    }
}

impl PlayConfig {
    /// Half of the judgment window; a note is missed once this much time has
    /// passed since its start.
    pub fn half_window(&self) -> Microseconds {
        self.judgment_window_us / 2
    }

    /// Parses settings and checks that they can drive a session.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings under which no note could ever be hit or the song
    /// clock would run backwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.half_window() <= 0 {
            return Err(ConfigError::Invalid(format!(
                "judgment_window_us must be at least 2, got {}",
                self.judgment_window_us
            )));
        }
        if self.lead_in_us < 0 {
            return Err(ConfigError::Invalid(format!(
                "lead_in_us must not be negative, got {}",
                self.lead_in_us
            )));
        }
        if self.lead_out_us < 0 {
            return Err(ConfigError::Invalid(format!(
                "lead_out_us must not be negative, got {}",
                self.lead_out_us
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads settings from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        tracing::info!("Loaded play config from {}", path.as_ref().display());
        Ok(config)
    }
}
