//! Audio device abstractions and domain errors
//!
//! This module defines the platform-agnostic view of output devices and the
//! error type shared by the effects chain. Implementations for specific
//! platforms live in the `infra` crate.

use crate::domain::effects::FourCc;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Requested audio device was not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Invalid configuration for a unit, band or device
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The plugin host has no component with this type/sub-type pair
    #[error("Audio unit component not found: {component_type}/{component_sub_type}")]
    ComponentNotFound {
        component_type: FourCc,
        component_sub_type: FourCc,
    },

    /// The plugin host found the component but could not create an instance
    #[error("Audio unit instantiation failed: {0}")]
    InstantiationFailed(String),

    /// Error reported by the platform backend
    #[error("OS error: {0}")]
    OsError(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Unique identifier for an audio device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Information about an output device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub channels: u16,
    pub default_sample_rate: Option<u32>,
    pub is_default: bool,
}

/// Trait for enumerating available output devices
pub trait AudioEnumerator: Send + Sync {
    /// List all output devices
    fn output_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get the system default output device
    fn default_output_device(&self) -> Result<DeviceInfo>;

    /// Find an output device by its ID
    fn device_by_id(&self, id: &DeviceId) -> Result<DeviceInfo> {
        self.output_devices()?
            .into_iter()
            .find(|d| &d.id == id)
            .ok_or_else(|| AudioError::DeviceNotFound(id.as_str().to_string()))
    }
}
