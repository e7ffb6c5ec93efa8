//! Cadenza infrastructure
//!
//! Render-thread plumbing for the effects chain and, with the `cpal`
//! feature, output device enumeration.

pub mod audio;
