//! Platform constants and runtime knobs shared by every workflow.
use std::time::Duration;

use client_blockchain_core::ObjectId;

/// Published package of the subscription contracts (testnet).
pub const DEFAULT_PACKAGE_ID: &str =
    "0x50739904d691799acda0acaf38e7bd4f4286000b32aaa3091f3195ddf9f7d94a";

/// Events are read one bounded page at a time.
pub const EVENT_PAGE_SIZE: usize = 50;

/// Default lifetime of a session credential.
pub const DEFAULT_SESSION_TTL_MIN: u64 = 10;

/// Type fragment identifying a creator's service object in object changes.
pub const SERVICE_TYPE_FRAGMENT: &str = "::service::Service";

/// Configuration for the application workflows.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    pub package_id: ObjectId,
    pub session_ttl_min: u64,
    pub event_page_size: usize,
}

impl CoreConfig {
    pub fn new(package_id: ObjectId) -> Self {
        Self {
            package_id,
            ..Self::default()
        }
    }

    pub fn with_session_ttl_min(mut self, minutes: u64) -> Self {
        self.session_ttl_min = minutes.max(1);
        self
    }

    pub fn with_event_page_size(mut self, size: usize) -> Self {
        self.event_page_size = size.max(1);
        self
    }

    /// Fully qualified event type, e.g. `0x..::service::CreatorRegistered`.
    pub fn event_type(&self, name: &str) -> String {
        format!("{}::service::{}", self.package_id, name)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_min * 60)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            package_id: ObjectId::new(DEFAULT_PACKAGE_ID),
            session_ttl_min: DEFAULT_SESSION_TTL_MIN,
            event_page_size: EVENT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_package_qualified() {
        let config = CoreConfig::new(ObjectId::new("0xabc"));
        assert_eq!(
            config.event_type("PostPublished"),
            "0xabc::service::PostPublished"
        );
    }

    #[test]
    fn ttl_is_at_least_one_minute() {
        let config = CoreConfig::default().with_session_ttl_min(0);
        assert_eq!(config.session_ttl(), Duration::from_secs(60));
    }
}
