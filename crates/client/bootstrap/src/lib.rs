//! Shared bootstrap utilities for client front-ends.
//!
//! Provides configuration loading, logging setup and platform assembly that
//! can be reused by the CLI or any other front-end crate.
pub mod builder;
pub mod config;
pub mod logging;

pub use builder::{Platform, PlatformBuilder};
pub use config::{AppConfig, LogConfig};
pub use logging::setup_logging;
