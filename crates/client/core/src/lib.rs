//! Application logic of the creator subscription client.
//!
//! Everything here is written against the traits of
//! `client-blockchain-core`, so the same workflows run over the Sui backend
//! and over the in-memory mocks used by tests. Discovery rebuilds the read
//! side from ledger events, the unlock workflow turns blob locators into
//! local handles, and the publish pipeline and action facade cover writes.
pub mod actions;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod format;
pub mod handle;
pub mod locator;
pub mod model;
pub mod post;
pub mod query;
pub mod remap;
pub mod session;
pub mod sniff;
pub mod unlock;

pub use actions::{PlatformActions, ProfileStep, ProfileUpdate, Registration, UserActionError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use discovery::{Discovery, DiscoveryError, SearchResults};
pub use handle::{HandleSlot, HandleStore, LocalHandle};
pub use locator::Locator;
pub use model::{
    Creator, CreatorPosts, LatestPost, MySubscription, OnChainPost, ServiceObject,
    SubscriptionStatus,
};
pub use post::{ImageUpload, PostDraft, PostMetadata, PublishProgress, PublishStep, Publisher};
pub use query::{CachedDiscovery, Mutation, QueryCache, QueryKey, QueryKind};
pub use session::{SessionError, SessionManager, SessionState};
pub use sniff::{ImageKind, sniff_image};
pub use unlock::{ContentUnlocker, ProfileImage, UnlockError, UnlockedPost};
