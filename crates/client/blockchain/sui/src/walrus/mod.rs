//! Walrus decentralized blob storage.
//!
//! Post bodies, images and profile assets are stored as Walrus blobs and
//! referenced on-chain by blob id. Private content is encrypted before
//! upload; public content (tier 0 posts, avatars) is stored as-is.
//!
//! ## Modules
//!
//! - [`client`]: HTTP client implementing [`client_blockchain_core::BlobStore`]
//! - [`types`]: Endpoint configuration and publisher response types

pub mod client;
pub mod types;

pub use client::WalrusClient;
pub use types::{BlobResponse, Network, WalrusConfig};
