//! Typed decoding of ledger objects.
//!
//! Object JSON is validated once here; everything downstream works with
//! these types instead of raw field paths.
pub mod creator;
pub mod decode;
pub mod service;
pub mod subscription;

pub use creator::{Creator, CreatorPosts, FALLBACK_CREATOR_NAME, LatestPost, TierView};
pub use decode::DecodeError;
pub use service::{OnChainPost, ServiceObject, SubscribersTable, Tier};
pub use subscription::{MySubscription, SubscriptionRecord, SubscriptionStatus};
