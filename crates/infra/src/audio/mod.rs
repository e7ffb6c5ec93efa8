//! Audio backend pieces that sit between the chain and the device
//!
//! - `render`: lock-free parameter snapshots and the output stage
//! - `cpal_backend`: output device enumeration through CPAL (`cpal` feature)

pub mod render;

#[cfg(feature = "cpal")]
pub mod cpal_backend;

#[cfg(feature = "cpal")]
pub use cpal_backend::CpalEnumerator;
pub use render::{ChainReader, ChainSnapshot, HandleUpdates, OutputStage};
