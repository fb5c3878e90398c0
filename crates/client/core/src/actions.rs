//! State-changing user actions.
//!
//! [`PlatformActions`] wraps the transaction-submitting client with the
//! steps around each contract call: uploads before the call, abort
//! remapping after a failure and cache invalidation after a success.
use std::fmt;
use std::sync::Arc;

use client_blockchain_core::{
    ActionError, Address, BlobId, BlobStore, BlobStoreError, ObjectId, PlatformClient,
    SubnameRegistrar, TierSpec, TxDigest,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::discovery::{Discovery, DiscoveryError};
use crate::post::{PostDraft, PublishError, PublishProgress, Publisher};
use crate::query::{Mutation, QueryCache};
use crate::remap;

#[derive(Debug, thiserror::Error)]
pub enum UserActionError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Upload(#[from] BlobStoreError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("No wallet connected")]
    NotConnected,

    /// A contract abort reworded for display.
    #[error("{message}")]
    Remapped {
        message: String,
        #[source]
        source: ActionError,
    },
}

/// Profile update progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStep {
    #[default]
    Idle,
    Uploading,
    Signing,
}

impl fmt::Display for ProfileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileStep::Idle => "idle",
            ProfileStep::Uploading => "uploading",
            ProfileStep::Signing => "signing",
        })
    }
}

/// New profile values. The avatar is kept when `avatar` is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    pub description: String,
    /// Raw image bytes, stored unencrypted
    pub avatar: Option<Vec<u8>>,
}

impl ProfileUpdate {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, bytes: Vec<u8>) -> Self {
        self.avatar = Some(bytes);
        self
    }
}

/// Outcome of creator registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub service_id: ObjectId,
    /// Whether an earlier registration was found instead of creating one
    pub existing: bool,
    pub suins_name: Option<String>,
}

pub struct PlatformActions {
    client: Arc<dyn PlatformClient>,
    blobs: Arc<dyn BlobStore>,
    subnames: Option<Arc<dyn SubnameRegistrar>>,
    publisher: Publisher,
    discovery: Discovery,
    cache: Arc<QueryCache>,
    owner: Option<Address>,
    profile_step: watch::Sender<ProfileStep>,
}

impl PlatformActions {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        blobs: Arc<dyn BlobStore>,
        publisher: Publisher,
        discovery: Discovery,
        cache: Arc<QueryCache>,
        owner: Option<Address>,
    ) -> Self {
        let (profile_step, _) = watch::channel(ProfileStep::Idle);
        Self {
            client,
            blobs,
            subnames: None,
            publisher,
            discovery,
            cache,
            owner,
            profile_step,
        }
    }

    /// Request a name-service subname after registration.
    pub fn with_subnames(mut self, subnames: Arc<dyn SubnameRegistrar>) -> Self {
        self.subnames = Some(subnames);
        self
    }

    pub fn owner(&self) -> Option<&Address> {
        self.owner.as_ref()
    }

    pub fn publish_progress(&self) -> watch::Receiver<PublishProgress> {
        self.publisher.subscribe()
    }

    pub fn profile_step(&self) -> watch::Receiver<ProfileStep> {
        self.profile_step.subscribe()
    }

    fn completed(&self, mutation: Mutation) {
        debug!("Invalidating queries after {:?}", mutation);
        self.cache.apply(mutation);
    }

    /// Register the connected wallet as a creator.
    ///
    /// An "already registered" abort resolves to the live service found
    /// through discovery. A fresh registration then asks for a subname and
    /// links it; neither step can fail the registration.
    pub async fn create_profile(&self, name: &str, description: &str) -> Result<Registration, UserActionError> {
        let owner = self.owner.clone().ok_or(UserActionError::NotConnected)?;

        let service_id = match self.client.create_profile(name, description).await {
            Ok(id) => id,
            Err(e) if remap::is_already_registered(&e.to_string()) => {
                match self.discovery.find_active_service_id(owner.as_str()).await? {
                    Some(existing) => {
                        info!("{} is already registered as {}", owner, existing);
                        self.completed(Mutation::CreateProfile);
                        return Ok(Registration {
                            service_id: existing,
                            existing: true,
                            suins_name: None,
                        });
                    }
                    None => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        info!("Registered creator {} as {}", owner, service_id);
        self.completed(Mutation::CreateProfile);

        let suins_name = self.link_subname(&owner, &service_id).await;
        Ok(Registration {
            service_id,
            existing: false,
            suins_name,
        })
    }

    async fn link_subname(&self, owner: &Address, service_id: &ObjectId) -> Option<String> {
        let subnames = self.subnames.as_ref()?;
        let registration = match subnames.create_subname(owner).await {
            Ok(registration) => registration,
            Err(e) => {
                warn!("Subname request for {} failed: {}", owner, e);
                return None;
            }
        };
        if let Err(e) = self
            .client
            .set_suins_name(service_id, &registration.suins_name)
            .await
        {
            warn!("Linking {} to {} failed: {}", registration.suins_name, service_id, e);
            return None;
        }
        self.completed(Mutation::UpdateProfile);
        Some(registration.suins_name)
    }

    /// Upload a new avatar if given, then update the profile on-chain.
    pub async fn update_profile(
        &self,
        service: &ObjectId,
        update: ProfileUpdate,
    ) -> Result<TxDigest, UserActionError> {
        let result = self.run_profile_update(service, update).await;
        self.profile_step.send_replace(ProfileStep::Idle);
        if result.is_ok() {
            self.completed(Mutation::UpdateProfile);
        }
        result
    }

    async fn run_profile_update(
        &self,
        service: &ObjectId,
        update: ProfileUpdate,
    ) -> Result<TxDigest, UserActionError> {
        let avatar: Option<BlobId> = match update.avatar {
            Some(bytes) => {
                self.profile_step.send_replace(ProfileStep::Uploading);
                Some(self.blobs.store(bytes).await?)
            }
            None => None,
        };

        self.profile_step.send_replace(ProfileStep::Signing);
        let digest = self
            .client
            .update_profile(service, &update.name, &update.description, avatar.as_ref())
            .await?;
        Ok(digest)
    }

    pub async fn add_tier(&self, service: &ObjectId, tier: &TierSpec) -> Result<TxDigest, UserActionError> {
        let digest = self.client.add_tier(service, tier).await?;
        self.completed(Mutation::AddTier);
        Ok(digest)
    }

    pub async fn remove_tier(&self, service: &ObjectId, tier_level: u64) -> Result<TxDigest, UserActionError> {
        let digest = self.client.remove_tier(service, tier_level).await?;
        self.completed(Mutation::RemoveTier);
        Ok(digest)
    }

    pub async fn subscribe(
        &self,
        service: &ObjectId,
        tier_level: u64,
        price_mist: u64,
    ) -> Result<TxDigest, UserActionError> {
        let digest = self.client.subscribe(service, tier_level, price_mist).await?;
        info!("Subscribed to {} at tier {}", service, tier_level);
        self.completed(Mutation::Subscribe);
        Ok(digest)
    }

    pub async fn publish_post(&self, service: &ObjectId, draft: &PostDraft) -> Result<u64, UserActionError> {
        let post_id = self.publisher.publish(service, draft).await?;
        self.completed(Mutation::PublishPost);
        Ok(post_id)
    }

    pub async fn update_post(
        &self,
        service: &ObjectId,
        post_id: u64,
        title: &str,
        metadata_blob_id: &BlobId,
        data_blob_id: &BlobId,
    ) -> Result<TxDigest, UserActionError> {
        let digest = self
            .client
            .update_post(service, post_id, title, metadata_blob_id, data_blob_id)
            .await?;
        self.completed(Mutation::UpdatePost);
        Ok(digest)
    }

    pub async fn set_post_visibility(
        &self,
        service: &ObjectId,
        post_id: u64,
        required_tier: u64,
    ) -> Result<TxDigest, UserActionError> {
        let digest = self
            .client
            .set_post_visibility(service, post_id, required_tier)
            .await?;
        self.completed(Mutation::SetPostVisibility);
        Ok(digest)
    }

    pub async fn delete_post(&self, service: &ObjectId, post_id: u64) -> Result<TxDigest, UserActionError> {
        let digest = self.client.delete_post(service, post_id).await?;
        self.completed(Mutation::DeletePost);
        Ok(digest)
    }

    pub async fn withdraw_funds(&self, service: &ObjectId) -> Result<TxDigest, UserActionError> {
        match self.client.withdraw_funds(service).await {
            Ok(digest) => {
                self.completed(Mutation::WithdrawFunds);
                Ok(digest)
            }
            Err(source) => Err(UserActionError::Remapped {
                message: remap::withdraw_error_message(&source.to_string()),
                source,
            }),
        }
    }

    pub async fn delete_profile(&self, service: &ObjectId) -> Result<TxDigest, UserActionError> {
        match self.client.delete_profile(service).await {
            Ok(digest) => {
                info!("Deleted creator profile {}", service);
                self.completed(Mutation::DeleteProfile);
                Ok(digest)
            }
            Err(source) => Err(UserActionError::Remapped {
                message: remap::delete_profile_error_message(&source.to_string()),
                source,
            }),
        }
    }

    pub async fn remove_suins_name(&self, service: &ObjectId) -> Result<TxDigest, UserActionError> {
        let digest = self.client.remove_suins_name(service).await?;
        self.completed(Mutation::UpdateProfile);
        Ok(digest)
    }
}
