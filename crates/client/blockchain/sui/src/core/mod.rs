//! Core errors for Sui blockchain integration.

pub mod error;

// Re-export commonly used items
pub use error::{Result, SuiError};
