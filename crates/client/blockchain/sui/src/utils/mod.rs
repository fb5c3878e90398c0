//! Utility modules for Sui blockchain integration.
//!
//! ## Modules
//!
//! - [`conversion`]: Identifier conversions between core and SDK types

pub mod conversion;

// Re-export commonly used items
pub use conversion::{
    from_object_id, from_sui_address, from_transaction_digest, parse_object_id, to_object_id,
    to_sui_address, to_transaction_digest,
};
