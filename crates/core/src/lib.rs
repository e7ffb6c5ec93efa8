//! Cadenza core: the effects chain of the Cadenza audio player
//!
//! Everything here runs on the controller thread except the render nodes in
//! [`domain::node`], which are shared with the real-time render thread.

pub mod domain;

pub use domain::*;
