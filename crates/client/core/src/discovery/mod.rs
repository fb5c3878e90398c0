//! Read side of the platform, reconstructed from ledger events.
//!
//! There is no index of creators or posts: everything is rebuilt from one
//! bounded page of `CreatorRegistered`, `CreatorDeleted` and `PostPublished`
//! events, followed by object reads. Failures of a single entity are logged
//! and skipped; only the event queries themselves fail the whole read.
mod creators;
mod posts;
pub mod reconcile;
pub mod search;
mod subscriptions;

use std::sync::Arc;

use client_blockchain_core::{LedgerTransport, TransportError};

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::DecodeError;

pub use reconcile::{LifecycleState, Reconciliation};
pub use search::{SearchResults, normalize_search_text};

/// Default length of the latest-posts feed.
pub const DEFAULT_LATEST_POSTS: usize = 12;

/// Number of posts scanned by search.
pub const SEARCH_POST_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to decode ledger object: {0}")]
    Decode(#[from] DecodeError),
}

/// Event types read by discovery.
pub(crate) mod events {
    pub const CREATOR_REGISTERED: &str = "CreatorRegistered";
    pub const CREATOR_DELETED: &str = "CreatorDeleted";
    pub const POST_PUBLISHED: &str = "PostPublished";
}

/// Ledger-backed discovery reads.
#[derive(Clone)]
pub struct Discovery {
    ledger: Arc<dyn LedgerTransport>,
    config: CoreConfig,
    clock: Arc<dyn Clock>,
}

impl Discovery {
    pub fn new(ledger: Arc<dyn LedgerTransport>, config: CoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub(crate) fn ledger(&self) -> &dyn LedgerTransport {
        self.ledger.as_ref()
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
