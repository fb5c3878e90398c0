//! Sui implementation of the platform action traits.

use std::sync::Arc;

use async_trait::async_trait;
use sui_sdk::SuiClient;
use sui_types::base_types::ObjectID;
use sui_types::transaction::{ObjectArg, ProgrammableTransaction};

use client_blockchain_core::{
    ActionError, BlobId, CreatorActions, NewPost, ObjectId, PlatformClient, SubscriberActions,
    TierSpec, TxDigest, WalletSigner,
};

use crate::config::SuiConfig;
use crate::contracts::{ObjectArgResolver, ServiceContract, SubscriptionContract, clock_arg};
use crate::core::error::{Result, SuiError};
use crate::executor::{ExecutionResult, TransactionExecutor};
use crate::relay::RelayClient;
use crate::utils::conversion::{parse_object_id, to_object_id};

/// Type fragment identifying the creator's service object.
pub const SERVICE_TYPE_FRAGMENT: &str = "::service::Service";

/// Transaction-submitting client for one wallet.
pub struct SuiPlatformClient {
    sui_client: SuiClient,
    config: SuiConfig,
    executor: TransactionExecutor,
    resolver: ObjectArgResolver,
    service: ServiceContract,
    subscription: SubscriptionContract,
    platform_id: ObjectID,
}

impl SuiPlatformClient {
    pub fn new(
        sui_client: SuiClient,
        config: SuiConfig,
        signer: Arc<dyn WalletSigner>,
        relay: Option<RelayClient>,
    ) -> Result<Self> {
        let package_id = parse_object_id(&config.package_id)?;
        let platform_id = parse_object_id(&config.platform_id)?;

        let executor =
            TransactionExecutor::new(sui_client.clone(), signer, relay, config.gas_budget);

        Ok(Self {
            sui_client,
            config,
            executor,
            resolver: ObjectArgResolver::new(),
            service: ServiceContract::new(package_id),
            subscription: SubscriptionContract::new(package_id),
            platform_id,
        })
    }

    pub fn config(&self) -> &SuiConfig {
        &self.config
    }

    pub fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    async fn service_arg(&self, service: &ObjectId) -> Result<ObjectArg> {
        self.resolver
            .shared(&self.sui_client, to_object_id(service)?, true)
            .await
    }

    async fn platform_arg(&self) -> Result<ObjectArg> {
        self.resolver
            .shared(&self.sui_client, self.platform_id, true)
            .await
    }

    async fn run(&self, label: &str, pt: ProgrammableTransaction) -> Result<ExecutionResult> {
        tracing::debug!("Submitting {}", label);
        let result = self.executor.execute(pt).await?;
        tracing::info!("{} confirmed in {}", label, result.digest);
        Ok(result)
    }

    async fn run_for_digest(
        &self,
        label: &str,
        pt: ProgrammableTransaction,
    ) -> std::result::Result<TxDigest, ActionError> {
        Ok(self.run(label, pt).await?.digest)
    }
}

#[async_trait]
impl CreatorActions for SuiPlatformClient {
    async fn create_profile(
        &self,
        name: &str,
        description: &str,
    ) -> std::result::Result<ObjectId, ActionError> {
        let platform = self.platform_arg().await?;
        let pt = self.service.create_creator_profile(platform, name, description)?;
        let result = self.run("create_creator_profile", pt).await?;

        result
            .find_created(SERVICE_TYPE_FRAGMENT)
            .map(|object| object.object_id.clone())
            .ok_or_else(|| {
                ActionError::Rejected("Service object not found in transaction result".to_string())
            })
    }

    async fn update_profile(
        &self,
        service: &ObjectId,
        name: &str,
        description: &str,
        avatar_blob_id: Option<&BlobId>,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.update_creator_profile(
            service_arg,
            name,
            description,
            avatar_blob_id.map(BlobId::as_str),
        )?;
        self.run_for_digest("update_creator_profile", pt).await
    }

    async fn add_tier(
        &self,
        service: &ObjectId,
        tier: &TierSpec,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.add_subscription_tier(service_arg, tier)?;
        self.run_for_digest("add_subscription_tier", pt).await
    }

    async fn remove_tier(
        &self,
        service: &ObjectId,
        tier_level: u64,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.remove_subscription_tier(service_arg, tier_level)?;
        self.run_for_digest("remove_subscription_tier", pt).await
    }

    async fn publish_post(
        &self,
        service: &ObjectId,
        post: &NewPost,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.publish_post(service_arg, post, clock_arg())?;
        self.run_for_digest("publish_post", pt).await
    }

    async fn update_post(
        &self,
        service: &ObjectId,
        post_id: u64,
        title: &str,
        metadata_blob_id: &BlobId,
        data_blob_id: &BlobId,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.update_post(
            service_arg,
            post_id,
            title,
            metadata_blob_id.as_str(),
            data_blob_id.as_str(),
        )?;
        self.run_for_digest("update_post", pt).await
    }

    async fn set_post_visibility(
        &self,
        service: &ObjectId,
        post_id: u64,
        required_tier: u64,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self
            .service
            .set_post_visibility(service_arg, post_id, required_tier)?;
        self.run_for_digest("set_post_visibility", pt).await
    }

    async fn delete_post(
        &self,
        service: &ObjectId,
        post_id: u64,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.delete_post(service_arg, post_id)?;
        self.run_for_digest("delete_post", pt).await
    }

    async fn withdraw_funds(&self, service: &ObjectId) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let pt = self.service.withdraw_creator_funds(service_arg)?;
        self.run_for_digest("withdraw_creator_funds", pt).await
    }

    async fn delete_profile(&self, service: &ObjectId) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let platform = self.platform_arg().await?;
        let pt = self.service.delete_creator_profile(service_arg, platform)?;
        self.run_for_digest("delete_creator_profile", pt).await
    }

    async fn set_suins_name(
        &self,
        service: &ObjectId,
        name: &str,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let platform = self.platform_arg().await?;
        let pt = self.service.set_suins_name(service_arg, platform, name)?;
        self.run_for_digest("set_suins_name", pt).await
    }

    async fn remove_suins_name(
        &self,
        service: &ObjectId,
    ) -> std::result::Result<TxDigest, ActionError> {
        let service_arg = self.service_arg(service).await?;
        let platform = self.platform_arg().await?;
        let pt = self.service.remove_suins_name(service_arg, platform)?;
        self.run_for_digest("remove_suins_name", pt).await
    }
}

#[async_trait]
impl SubscriberActions for SuiPlatformClient {
    async fn subscribe(
        &self,
        service: &ObjectId,
        tier_level: u64,
        price_mist: u64,
    ) -> std::result::Result<TxDigest, ActionError> {
        let coins = self.executor.payment_coins().await?;
        if coins.is_empty() {
            return Err(SuiError::NoCoins("subscription payment".to_string()).into());
        }

        let service_arg = self.service_arg(service).await?;
        let platform = self.platform_arg().await?;
        let pt = self.subscription.subscribe(
            service_arg,
            platform,
            tier_level,
            price_mist,
            &coins,
            clock_arg(),
        )?;
        self.run_for_digest("subscribe", pt).await
    }
}

impl PlatformClient for SuiPlatformClient {
    fn name(&self) -> &str {
        "Sui"
    }

    fn network(&self) -> &str {
        self.config.network.as_str()
    }
}
