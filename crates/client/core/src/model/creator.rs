//! Creator profile as presented to front-ends.
use client_blockchain_core::ObjectId;
use serde::{Deserialize, Serialize};

use super::service::{OnChainPost, ServiceObject};

/// Display name used when a service has an empty name.
pub const FALLBACK_CREATOR_NAME: &str = "Creator";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierView {
    /// `{service}_tier_{level}`
    pub id: String,
    pub tier_level: u64,
    pub name: String,
    pub price_mist: u64,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub service_id: ObjectId,
    pub name: String,
    pub bio: String,
    pub avatar_blob_id: Option<String>,
    pub banner_blob_id: Option<String>,
    pub suins_name: Option<String>,
    pub total_subscribers: u64,
    pub total_content: usize,
    /// Sorted by tier level
    pub tiers: Vec<TierView>,
}

impl Creator {
    pub fn from_service(service: &ServiceObject, total_subscribers: u64) -> Self {
        let mut tiers: Vec<TierView> = service
            .tiers
            .iter()
            .map(|tier| TierView {
                id: format!("{}_tier_{}", service.id, tier.tier_level),
                tier_level: tier.tier_level,
                name: tier.name.clone(),
                price_mist: tier.price_mist,
                duration_ms: tier.duration_ms,
            })
            .collect();
        tiers.sort_by_key(|tier| tier.tier_level);

        let name = if service.name.trim().is_empty() {
            FALLBACK_CREATOR_NAME.to_string()
        } else {
            service.name.clone()
        };

        Self {
            address: service.creator.clone(),
            service_id: service.id.clone(),
            name,
            bio: service.description.clone(),
            avatar_blob_id: service.avatar_blob_id.clone(),
            banner_blob_id: service.banner_blob_id.clone(),
            suins_name: service.suins_name.clone(),
            total_subscribers,
            total_content: service.posts.len(),
            tiers,
        }
    }

    pub fn tier(&self, tier_level: u64) -> Option<&TierView> {
        self.tiers.iter().find(|tier| tier.tier_level == tier_level)
    }
}

/// A creator's posts, newest first, plus the id the next post will get.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorPosts {
    pub posts: Vec<OnChainPost>,
    pub next_post_id: u64,
}

/// Entry of the cross-creator latest-posts feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPost {
    pub creator_address: String,
    pub creator_name: String,
    pub service_id: ObjectId,
    pub post: OnChainPost,
}
