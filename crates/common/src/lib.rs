//! Montage Common Utilities
//!
//! Shared infrastructure for all montage crates:
//! - Error types and result aliases
//! - Configuration loading
//! - CLI-over-config setting resolution
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod setting;

pub use config::*;
pub use error::*;
pub use setting::*;
