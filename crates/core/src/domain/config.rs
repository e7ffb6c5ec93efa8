//! Configuration and state files for Cadenza
//!
//! This module provides:
//! - `AppConfig`: user preferences stored as TOML
//! - `StateStore`: the persisted effects chain (`state.json`), loaded at
//!   startup and written at shutdown

use crate::domain::effects::EqType;
use crate::domain::persistence::AudioGraphState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `state.json`; the platform config dir when unset
    pub state_dir: Option<PathBuf>,

    /// Equalizer layout used when the saved state does not name one
    pub eq_type: EqType,

    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: String,

    /// Volume change per step, in `[0, 1]` volume units
    pub volume_step: f32,

    /// Pan change per step, in `[-1, 1]` pan units
    pub pan_step: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            eq_type: EqType::FifteenBand,
            log_level: "info".to_string(),
            volume_step: 0.05,
            pan_step: 0.1,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "volume_step must be in (0, 1], got {}",
                self.volume_step
            )));
        }
        if !(self.pan_step > 0.0 && self.pan_step <= 2.0) {
            return Err(ConfigError::Invalid(format!(
                "pan_step must be in (0, 2], got {}",
                self.pan_step
            )));
        }
        Ok(())
    }

    /// Directory for state files: `state_dir` if set, else the platform default
    pub fn resolved_state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => StateStore::default_state_dir(),
        }
    }
}

/// Effects chain state file manager
///
/// Manages `state.json` inside the state directory
/// (`~/.config/cadenza` by default).
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
    state_path: PathBuf,
}

impl StateStore {
    pub const FILE_NAME: &'static str = "state.json";

    pub fn new(state_dir: PathBuf) -> Self {
        let state_path = state_dir.join(Self::FILE_NAME);
        Self {
            state_dir,
            state_path,
        }
    }

    /// Default state directory
    ///
    /// Returns `~/.config/cadenza` on Linux, the equivalent elsewhere
    pub fn default_state_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("cadenza"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Load the saved chain
    ///
    /// A missing file yields the default state. A corrupt file is copied to
    /// `state.json.corrupt`, logged, and the default state is returned.
    #[instrument(skip(self))]
    pub async fn load(&self) -> AudioGraphState {
        if !self.state_path.exists() {
            info!(
                path = %self.state_path.display(),
                "State file not found, using defaults"
            );
            return AudioGraphState::default();
        }

        match self.read().await {
            Ok(state) => {
                info!(path = %self.state_path.display(), "State loaded successfully");
                state
            }
            Err(e) => {
                error!(
                    path = %self.state_path.display(),
                    error = %e,
                    "Failed to load state, using defaults"
                );

                let backup_path = self.state_path.with_extension("json.corrupt");
                if let Err(copy_err) = fs::copy(&self.state_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt state"
                    );
                }

                AudioGraphState::default()
            }
        }
    }

    async fn read(&self) -> Result<AudioGraphState> {
        let contents = fs::read_to_string(&self.state_path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the chain, creating the state directory when needed
    #[instrument(skip(self, state))]
    pub async fn save(&self, state: &AudioGraphState) -> Result<()> {
        fs::create_dir_all(&self.state_dir).await?;

        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.state_path, json).await?;

        info!(path = %self.state_path.display(), "State saved");
        Ok(())
    }

    /// Delete the state file
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.state_path.exists() {
            fs::remove_file(&self.state_path).await?;
            info!(path = %self.state_path.display(), "State cleared");
        }

        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.state_path.exists()
    }
}
