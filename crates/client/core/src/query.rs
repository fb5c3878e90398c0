//! Query keys, freshness and mutation-driven invalidation.
//!
//! Every read goes through [`CachedDiscovery`], which keys results by
//! [`QueryKey`]. A result is served from the cache until its kind's stale
//! time elapses or a [`Mutation`] invalidates that kind.
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use client_blockchain_core::{Address, ObjectId};
use tokio::time::Instant;
use tracing::debug;

use crate::discovery::{DEFAULT_LATEST_POSTS, Discovery, DiscoveryError, SearchResults};
use crate::model::{Creator, CreatorPosts, LatestPost, MySubscription, SubscriptionStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Creator,
    AllCreators,
    CreatorPosts,
    LatestPosts,
    LatestPost,
    SubscriptionStatus,
    MySubscriptions,
    CreatorRevenue,
}

impl QueryKind {
    pub fn stale_time(self) -> Duration {
        Duration::from_secs(match self {
            QueryKind::Creator => 30,
            QueryKind::AllCreators => 60,
            QueryKind::CreatorPosts => 15,
            QueryKind::LatestPosts | QueryKind::LatestPost => 30,
            QueryKind::SubscriptionStatus => 15,
            QueryKind::MySubscriptions => 20,
            QueryKind::CreatorRevenue => 15,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Creator(String),
    AllCreators,
    CreatorPosts(ObjectId),
    LatestPosts { limit: usize, public_only: bool },
    LatestPost,
    SubscriptionStatus { service: ObjectId, subscriber: Address },
    MySubscriptions(Address),
    CreatorRevenue(ObjectId),
}

impl QueryKey {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryKey::Creator(_) => QueryKind::Creator,
            QueryKey::AllCreators => QueryKind::AllCreators,
            QueryKey::CreatorPosts(_) => QueryKind::CreatorPosts,
            QueryKey::LatestPosts { .. } => QueryKind::LatestPosts,
            QueryKey::LatestPost => QueryKind::LatestPost,
            QueryKey::SubscriptionStatus { .. } => QueryKind::SubscriptionStatus,
            QueryKey::MySubscriptions(_) => QueryKind::MySubscriptions,
            QueryKey::CreatorRevenue(_) => QueryKind::CreatorRevenue,
        }
    }
}

/// State-changing operations and the reads they make stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Subscribe,
    PublishPost,
    UpdatePost,
    DeletePost,
    SetPostVisibility,
    CreateProfile,
    UpdateProfile,
    AddTier,
    RemoveTier,
    WithdrawFunds,
    DeleteProfile,
}

impl Mutation {
    pub fn invalidates(self) -> &'static [QueryKind] {
        match self {
            Mutation::Subscribe => &[
                QueryKind::SubscriptionStatus,
                QueryKind::MySubscriptions,
                QueryKind::CreatorRevenue,
            ],
            Mutation::PublishPost
            | Mutation::UpdatePost
            | Mutation::DeletePost
            | Mutation::SetPostVisibility => &[
                QueryKind::CreatorPosts,
                QueryKind::LatestPosts,
                QueryKind::LatestPost,
            ],
            Mutation::CreateProfile
            | Mutation::UpdateProfile
            | Mutation::AddTier
            | Mutation::RemoveTier => &[QueryKind::Creator, QueryKind::AllCreators],
            Mutation::WithdrawFunds => &[QueryKind::CreatorRevenue],
            Mutation::DeleteProfile => &[
                QueryKind::Creator,
                QueryKind::AllCreators,
                QueryKind::CreatorPosts,
                QueryKind::LatestPosts,
            ],
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

/// Keyed result cache with per-kind stale times.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh cached value for `key`. A stale entry is evicted.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() >= key.kind().stale_time() {
            entries.remove(key);
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        self.lock().insert(
            key,
            Entry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Serve from the cache or run `fetch`. Errors are not cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(&key) {
            debug!("Cache hit for {:?}", key);
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry of `kind`.
    pub fn invalidate(&self, kind: QueryKind) {
        self.lock().retain(|key, _| key.kind() != kind);
    }

    pub fn apply(&self, mutation: Mutation) {
        debug!("Invalidating after {:?}", mutation);
        let kinds = mutation.invalidates();
        self.lock().retain(|key, _| !kinds.contains(&key.kind()));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Discovery reads served through a [`QueryCache`].
#[derive(Clone)]
pub struct CachedDiscovery {
    discovery: Discovery,
    cache: Arc<QueryCache>,
}

impl CachedDiscovery {
    pub fn new(discovery: Discovery, cache: Arc<QueryCache>) -> Self {
        Self { discovery, cache }
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn all_creators(&self) -> Result<Vec<Creator>, DiscoveryError> {
        self.cache
            .get_or_fetch(QueryKey::AllCreators, || self.discovery.fetch_all_creators())
            .await
    }

    pub async fn creator(&self, address_or_service: &str) -> Result<Option<Creator>, DiscoveryError> {
        self.cache
            .get_or_fetch(QueryKey::Creator(address_or_service.to_string()), || {
                self.discovery.fetch_creator(address_or_service)
            })
            .await
    }

    pub async fn creator_posts(&self, service: &ObjectId) -> Result<CreatorPosts, DiscoveryError> {
        self.cache
            .get_or_fetch(QueryKey::CreatorPosts(service.clone()), || {
                self.discovery.creator_posts(service)
            })
            .await
    }

    pub async fn latest_posts(&self, limit: usize, public_only: bool) -> Result<Vec<LatestPost>, DiscoveryError> {
        self.cache
            .get_or_fetch(QueryKey::LatestPosts { limit, public_only }, || {
                self.discovery.latest_posts(limit, public_only)
            })
            .await
    }

    pub async fn default_latest_posts(&self) -> Result<Vec<LatestPost>, DiscoveryError> {
        self.latest_posts(DEFAULT_LATEST_POSTS, true).await
    }

    pub async fn latest_post(&self) -> Result<Option<LatestPost>, DiscoveryError> {
        self.cache
            .get_or_fetch(QueryKey::LatestPost, || self.discovery.latest_post())
            .await
    }

    pub async fn subscription_status(&self, service: &ObjectId, subscriber: &Address) -> SubscriptionStatus {
        let key = QueryKey::SubscriptionStatus {
            service: service.clone(),
            subscriber: subscriber.clone(),
        };
        let fetched: Result<SubscriptionStatus, DiscoveryError> = self
            .cache
            .get_or_fetch(key, || async {
                Ok(self.discovery.subscription_status(service, subscriber).await)
            })
            .await;
        fetched.unwrap_or_default()
    }

    pub async fn my_subscriptions(&self, subscriber: &Address) -> Result<Vec<MySubscription>, DiscoveryError> {
        self.cache
            .get_or_fetch(QueryKey::MySubscriptions(subscriber.clone()), || {
                self.discovery.my_subscriptions(subscriber)
            })
            .await
    }

    pub async fn creator_revenue(&self, service: &ObjectId) -> u64 {
        let fetched: Result<u64, DiscoveryError> = self
            .cache
            .get_or_fetch(QueryKey::CreatorRevenue(service.clone()), || async {
                Ok(self.discovery.creator_revenue(service).await)
            })
            .await;
        fetched.unwrap_or_default()
    }

    /// Search over the cached creator list and the latest posts of all tiers.
    pub async fn search(&self, query: &str) -> Result<SearchResults, DiscoveryError> {
        let (creators, posts) = tokio::try_join!(
            self.all_creators(),
            self.latest_posts(crate::discovery::SEARCH_POST_LIMIT, false),
        )?;
        Ok(SearchResults::filter(query, creators, posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn stale_times_per_kind() {
        assert_eq!(QueryKey::AllCreators.kind().stale_time(), Duration::from_secs(60));
        assert_eq!(
            QueryKey::MySubscriptions(Address::new("0x1")).kind().stale_time(),
            Duration::from_secs(20)
        );
        assert_eq!(QueryKind::CreatorPosts.stale_time(), Duration::from_secs(15));
    }

    #[test]
    fn mutations_invalidate_their_reads() {
        assert_eq!(
            Mutation::Subscribe.invalidates(),
            &[QueryKind::SubscriptionStatus, QueryKind::MySubscriptions, QueryKind::CreatorRevenue]
        );
        assert!(Mutation::SetPostVisibility.invalidates().contains(&QueryKind::LatestPost));
        assert!(!Mutation::DeleteProfile.invalidates().contains(&QueryKind::LatestPost));
        assert_eq!(Mutation::WithdrawFunds.invalidates(), &[QueryKind::CreatorRevenue]);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_stale_time() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::CreatorPosts(ObjectId::new("0x1")), 7u64);

        tokio::time::advance(Duration::from_secs(14)).await;
        assert_eq!(cache.get::<u64>(&QueryKey::CreatorPosts(ObjectId::new("0x1"))), Some(7));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get::<u64>(&QueryKey::CreatorPosts(ObjectId::new("0x1"))), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_evicted_on_read() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::CreatorPosts(ObjectId::new("0x1")), 7u64);
        cache.insert(QueryKey::AllCreators, 3u64);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(cache.get::<u64>(&QueryKey::CreatorPosts(ObjectId::new("0x1"))), None);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u64>(&QueryKey::AllCreators), Some(3));
    }

    #[tokio::test]
    async fn fetch_runs_once_until_invalidated() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec![1u8])
        };

        cache.get_or_fetch(QueryKey::AllCreators, fetch).await.unwrap();
        cache.get_or_fetch(QueryKey::AllCreators, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.apply(Mutation::AddTier);
        cache.get_or_fetch(QueryKey::AllCreators, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = QueryCache::new();
        let failed: Result<u64, &str> = cache.get_or_fetch(QueryKey::LatestPost, || async { Err("down") }).await;
        assert!(failed.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn apply_keeps_unrelated_kinds() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::CreatorRevenue(ObjectId::new("0x1")), 5u64);
        cache.insert(QueryKey::AllCreators, 1u64);
        cache.apply(Mutation::WithdrawFunds);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u64>(&QueryKey::AllCreators), Some(1));
    }
}
