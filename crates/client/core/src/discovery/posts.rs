use std::collections::{HashMap, HashSet};

use client_blockchain_core::{LedgerEvent, ObjectId};
use tracing::{debug, warn};

use super::reconcile::{Reconciliation, address_key};
use super::{Discovery, DiscoveryError, events};
use crate::model::{CreatorPosts, FALLBACK_CREATOR_NAME, LatestPost, ServiceObject};

impl Discovery {
    /// A creator's posts, newest first. Unknown services have no posts.
    pub async fn creator_posts(&self, service_id: &ObjectId) -> Result<CreatorPosts, DiscoveryError> {
        Ok(match self.load_service(service_id).await? {
            Some(service) => CreatorPosts {
                posts: service.posts_newest_first(),
                next_post_id: service.next_post_id,
            },
            None => CreatorPosts {
                posts: Vec::new(),
                next_post_id: 0,
            },
        })
    }

    /// Most recently published posts across all live creators.
    ///
    /// Events are ordered by timestamp, newest first, and deduplicated on
    /// `creator:post_id`. Posts whose creator or service is gone are skipped.
    pub async fn latest_posts(&self, limit: usize, public_only: bool) -> Result<Vec<LatestPost>, DiscoveryError> {
        let published_type = self.config.event_type(events::POST_PUBLISHED);
        let mut published = self
            .ledger
            .query_events(&published_type, self.config.event_page_size)
            .await?;
        if published.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        published.sort_by(|a, b| b.timestamp_ms.unwrap_or(0).cmp(&a.timestamp_ms.unwrap_or(0)));

        let (registered, deleted) = self.creator_events().await?;
        let reconciliation = Reconciliation::new(&registered, &deleted);

        let mut seen = HashSet::new();
        let mut services: HashMap<String, Option<ServiceObject>> = HashMap::new();
        let mut results = Vec::new();

        for event in &published {
            if results.len() >= limit {
                break;
            }
            let (Some(creator), Some(post_id)) = (event.str_field("creator"), event.u64_field("post_id")) else {
                continue;
            };
            let key = address_key(creator);
            if !seen.insert(format!("{}:{}", key, post_id)) {
                continue;
            }

            if !services.contains_key(&key) {
                let service = self.live_service_of(creator, &registered, &reconciliation).await;
                services.insert(key.clone(), service);
            }
            let Some(Some(service)) = services.get(&key) else {
                continue;
            };
            let Some(post) = service.post(post_id) else {
                debug!("Post {} of {} is no longer listed", post_id, creator);
                continue;
            };
            if public_only && !post.is_public() {
                continue;
            }

            let creator_name = if service.name.trim().is_empty() {
                FALLBACK_CREATOR_NAME.to_string()
            } else {
                service.name.clone()
            };
            results.push(LatestPost {
                creator_address: creator.to_string(),
                creator_name,
                service_id: service.id.clone(),
                post: post.clone(),
            });
        }

        debug!("Assembled {} latest posts", results.len());
        Ok(results)
    }

    /// The newest public post.
    pub async fn latest_post(&self) -> Result<Option<LatestPost>, DiscoveryError> {
        Ok(self.latest_posts(1, true).await?.into_iter().next())
    }

    async fn live_service_of(
        &self,
        creator: &str,
        registered: &[LedgerEvent],
        reconciliation: &Reconciliation,
    ) -> Option<ServiceObject> {
        let service_id = self
            .active_service_among(creator, registered, reconciliation)
            .await?;
        match self.load_service(&service_id).await {
            Ok(service) => service,
            Err(e) => {
                warn!("Skipping posts of {}: {}", creator, e);
                None
            }
        }
    }
}
