//! `service` Move module integration.
//!
//! ## Move Contract Reference
//!
//! ```move
//! module patreon::service {
//!     public struct Service has key {
//!         id: UID,
//!         creator: address,
//!         name: String,
//!         description: String,
//!         avatar_blob_id: String,
//!         tiers: vector<SubscriptionTier>,
//!         posts: vector<Post>,
//!         next_post_id: u64,
//!         subscribers: Table<address, Subscription>,
//!         revenue: Balance<SUI>,
//!         suins_name: Option<String>,
//!     }
//!
//!     entry fun seal_approve(id: vector<u8>, service: &Service, clock: &Clock, ctx: &TxContext);
//! }
//! ```

use sui_types::Identifier;
use sui_types::base_types::ObjectID;
use sui_types::programmable_transaction_builder::ProgrammableTransactionBuilder;
use sui_types::transaction::{Argument, ObjectArg, ProgrammableTransaction};

use client_blockchain_core::{NewPost, TierSpec};

use crate::config::SERVICE_MODULE;
use crate::core::error::Result;

/// Transaction builders for the `service` module.
///
/// Object arguments are passed in already resolved (see
/// [`super::ObjectArgResolver`]); the service object is always a mutable
/// shared object except for `seal_approve`.
#[derive(Debug, Clone)]
pub struct ServiceContract {
    pub package_id: ObjectID,
}

impl ServiceContract {
    pub fn new(package_id: ObjectID) -> Self {
        Self { package_id }
    }

    fn call(
        &self,
        ptb: &mut ProgrammableTransactionBuilder,
        function: &str,
        arguments: Vec<Argument>,
    ) -> Result<()> {
        ptb.programmable_move_call(
            self.package_id,
            Identifier::new(SERVICE_MODULE)?,
            Identifier::new(function)?,
            vec![], // No type arguments
            arguments,
        );
        Ok(())
    }

    /// `create_creator_profile(platform, name, description)`
    pub fn create_creator_profile(
        &self,
        platform: ObjectArg,
        name: &str,
        description: &str,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(platform)?,
            ptb.pure(name.to_string())?,
            ptb.pure(description.to_string())?,
        ];
        self.call(&mut ptb, "create_creator_profile", args)?;
        Ok(ptb.finish())
    }

    /// `update_creator_profile(service, name, description[, avatar_blob_id])`
    pub fn update_creator_profile(
        &self,
        service: ObjectArg,
        name: &str,
        description: &str,
        avatar_blob_id: Option<&str>,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let mut args = vec![
            ptb.obj(service)?,
            ptb.pure(name.to_string())?,
            ptb.pure(description.to_string())?,
        ];
        if let Some(avatar) = avatar_blob_id {
            args.push(ptb.pure(avatar.to_string())?);
        }
        self.call(&mut ptb, "update_creator_profile", args)?;
        Ok(ptb.finish())
    }

    pub fn add_subscription_tier(
        &self,
        service: ObjectArg,
        tier: &TierSpec,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(service)?,
            ptb.pure(tier.tier_level)?,
            ptb.pure(tier.name.clone())?,
            ptb.pure(tier.price_mist)?,
            ptb.pure(tier.duration_ms)?,
        ];
        self.call(&mut ptb, "add_subscription_tier", args)?;
        Ok(ptb.finish())
    }

    pub fn remove_subscription_tier(
        &self,
        service: ObjectArg,
        tier_level: u64,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![ptb.obj(service)?, ptb.pure(tier_level)?];
        self.call(&mut ptb, "remove_subscription_tier", args)?;
        Ok(ptb.finish())
    }

    /// `publish_post(service, title, metadata_blob_id, data_blob_id, required_tier, clock)`
    pub fn publish_post(
        &self,
        service: ObjectArg,
        post: &NewPost,
        clock: ObjectArg,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(service)?,
            ptb.pure(post.title.clone())?,
            ptb.pure(post.metadata_blob_id.as_str().to_string())?,
            ptb.pure(post.data_blob_id.as_str().to_string())?,
            ptb.pure(post.required_tier)?,
            ptb.obj(clock)?,
        ];
        self.call(&mut ptb, "publish_post", args)?;
        Ok(ptb.finish())
    }

    pub fn update_post(
        &self,
        service: ObjectArg,
        post_id: u64,
        title: &str,
        metadata_blob_id: &str,
        data_blob_id: &str,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(service)?,
            ptb.pure(post_id)?,
            ptb.pure(title.to_string())?,
            ptb.pure(metadata_blob_id.to_string())?,
            ptb.pure(data_blob_id.to_string())?,
        ];
        self.call(&mut ptb, "update_post", args)?;
        Ok(ptb.finish())
    }

    pub fn set_post_visibility(
        &self,
        service: ObjectArg,
        post_id: u64,
        required_tier: u64,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(service)?,
            ptb.pure(post_id)?,
            ptb.pure(required_tier)?,
        ];
        self.call(&mut ptb, "set_post_visibility", args)?;
        Ok(ptb.finish())
    }

    pub fn delete_post(&self, service: ObjectArg, post_id: u64) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![ptb.obj(service)?, ptb.pure(post_id)?];
        self.call(&mut ptb, "delete_post", args)?;
        Ok(ptb.finish())
    }

    pub fn withdraw_creator_funds(&self, service: ObjectArg) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![ptb.obj(service)?];
        self.call(&mut ptb, "withdraw_creator_funds", args)?;
        Ok(ptb.finish())
    }

    pub fn delete_creator_profile(
        &self,
        service: ObjectArg,
        platform: ObjectArg,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![ptb.obj(service)?, ptb.obj(platform)?];
        self.call(&mut ptb, "delete_creator_profile", args)?;
        Ok(ptb.finish())
    }

    /// Link a name-service subname. Must be signed by the creator.
    pub fn set_suins_name(
        &self,
        service: ObjectArg,
        platform: ObjectArg,
        suins_name: &str,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![
            ptb.obj(service)?,
            ptb.obj(platform)?,
            ptb.pure(suins_name.to_string())?,
        ];
        self.call(&mut ptb, "set_suins_name", args)?;
        Ok(ptb.finish())
    }

    pub fn remove_suins_name(
        &self,
        service: ObjectArg,
        platform: ObjectArg,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![ptb.obj(service)?, ptb.obj(platform)?];
        self.call(&mut ptb, "remove_suins_name", args)?;
        Ok(ptb.finish())
    }

    /// Access-policy check evaluated by key servers before releasing keys.
    ///
    /// `identity` is the inner key id (service address followed by the content
    /// id). Key servers prefix it with the package id.
    pub fn seal_approve(
        &self,
        identity: Vec<u8>,
        service: ObjectArg,
        clock: ObjectArg,
    ) -> Result<ProgrammableTransaction> {
        let mut ptb = ProgrammableTransactionBuilder::new();
        let args = vec![ptb.pure(identity)?, ptb.obj(service)?, ptb.obj(clock)?];
        self.call(&mut ptb, "seal_approve", args)?;
        Ok(ptb.finish())
    }
}

#[cfg(test)]
mod tests {
    use client_blockchain_core::BlobId;

    use super::*;
    use crate::contracts::clock_arg;
    use crate::contracts::test_support::{move_calls, object, shared};

    fn contract() -> ServiceContract {
        ServiceContract::new(object(0xaa))
    }

    #[test]
    fn publish_post_passes_clock_last() {
        let post = NewPost {
            title: "Hello".into(),
            metadata_blob_id: BlobId::new("meta"),
            data_blob_id: BlobId::new(""),
            required_tier: 1,
        };
        let pt = contract().publish_post(shared(1), &post, clock_arg()).unwrap();

        assert_eq!(
            move_calls(&pt),
            vec![("service".to_string(), "publish_post".to_string(), 6)]
        );
        // service, title, metadata, data, tier, clock
        assert_eq!(pt.inputs.len(), 6);
    }

    #[test]
    fn avatar_is_appended_only_when_given() {
        let without = contract()
            .update_creator_profile(shared(1), "Ada", "bio", None)
            .unwrap();
        let with = contract()
            .update_creator_profile(shared(1), "Ada", "bio", Some("blob"))
            .unwrap();

        assert_eq!(move_calls(&without)[0].2, 3);
        assert_eq!(move_calls(&with)[0].2, 4);
    }

    #[test]
    fn seal_approve_targets_service_module() {
        let pt = contract()
            .seal_approve(vec![1, 2, 3], shared(1), clock_arg())
            .unwrap();
        assert_eq!(
            move_calls(&pt),
            vec![("service".to_string(), "seal_approve".to_string(), 3)]
        );
    }

    #[test]
    fn profile_deletion_references_platform() {
        let pt = contract().delete_creator_profile(shared(1), shared(2)).unwrap();
        assert_eq!(move_calls(&pt)[0].1, "delete_creator_profile");
        assert_eq!(pt.inputs.len(), 2);
    }

    #[test]
    fn tier_arguments_are_in_contract_order() {
        let tier = TierSpec {
            tier_level: 2,
            name: "Gold".into(),
            price_mist: 1_000,
            duration_ms: 86_400_000,
        };
        let pt = contract().add_subscription_tier(shared(1), &tier).unwrap();
        assert_eq!(move_calls(&pt)[0], ("service".into(), "add_subscription_tier".into(), 5));
    }
}
