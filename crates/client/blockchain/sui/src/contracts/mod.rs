//! Sui Move contract integrations.
//!
//! Each contract is represented as a struct holding only its package
//! metadata. Builders are pure: they take already-resolved object arguments
//! and return a `ProgrammableTransaction`, so they can be tested without a
//! node. [`ObjectArgResolver`] turns object ids into call arguments.

pub mod service;
pub mod subscription;
pub mod suins;

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Context;
use sui_sdk::SuiClient;
use sui_sdk::rpc_types::SuiObjectDataOptions;
use sui_types::base_types::{ObjectID, SequenceNumber};
use sui_types::object::Owner;
use sui_types::transaction::{ObjectArg, SharedObjectMutability};
use sui_types::{SUI_CLOCK_OBJECT_ID, SUI_CLOCK_OBJECT_SHARED_VERSION};

use crate::core::error::{Result, SuiError};

pub use service::ServiceContract;
pub use subscription::SubscriptionContract;
pub use suins::SuinsContract;

/// Shared clock, read-only.
pub fn clock_arg() -> ObjectArg {
    ObjectArg::SharedObject {
        id: SUI_CLOCK_OBJECT_ID,
        initial_shared_version: SUI_CLOCK_OBJECT_SHARED_VERSION,
        mutability: SharedObjectMutability::Immutable,
    }
}

/// Build a shared object argument from a known initial version.
pub fn shared_arg(id: ObjectID, initial_shared_version: SequenceNumber, mutable: bool) -> ObjectArg {
    ObjectArg::SharedObject {
        id,
        initial_shared_version,
        mutability: if mutable {
            SharedObjectMutability::Mutable
        } else {
            SharedObjectMutability::Immutable
        },
    }
}

/// Resolves object ids to transaction arguments.
///
/// Initial shared versions never change, so they are cached per id.
#[derive(Default)]
pub struct ObjectArgResolver {
    shared_versions: Mutex<HashMap<ObjectID, SequenceNumber>>,
}

impl ObjectArgResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a shared object argument.
    ///
    /// Fails with [`SuiError::NotShared`] for owned or immutable objects.
    pub async fn shared(
        &self,
        sui_client: &SuiClient,
        id: ObjectID,
        mutable: bool,
    ) -> Result<ObjectArg> {
        if let Some(version) = self.cached(&id) {
            return Ok(shared_arg(id, version, mutable));
        }

        let object = sui_client
            .read_api()
            .get_object_with_options(id, SuiObjectDataOptions::new().with_owner())
            .await
            .context("Failed to fetch object owner")?
            .into_object()
            .map_err(|_| SuiError::ObjectNotFound(id.to_string()))?;

        match object.owner {
            Some(Owner::Shared {
                initial_shared_version,
            }) => {
                tracing::debug!(
                    "Object {} is shared since version {}",
                    id,
                    initial_shared_version.value()
                );
                if let Ok(mut cache) = self.shared_versions.lock() {
                    cache.insert(id, initial_shared_version);
                }
                Ok(shared_arg(id, initial_shared_version, mutable))
            }
            _ => Err(SuiError::NotShared(id.to_string())),
        }
    }

    /// Seed the cache, e.g. for objects whose version is known from config.
    pub fn remember(&self, id: ObjectID, initial_shared_version: SequenceNumber) {
        if let Ok(mut cache) = self.shared_versions.lock() {
            cache.insert(id, initial_shared_version);
        }
    }

    fn cached(&self, id: &ObjectID) -> Option<SequenceNumber> {
        self.shared_versions.lock().ok()?.get(id).copied()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sui_types::base_types::{ObjectID, SequenceNumber};
    use sui_types::transaction::{Command, ObjectArg, ProgrammableTransaction};

    use super::shared_arg;

    pub fn object(byte: u8) -> ObjectID {
        ObjectID::from_single_byte(byte)
    }

    pub fn shared(byte: u8) -> ObjectArg {
        shared_arg(object(byte), SequenceNumber::from_u64(1), true)
    }

    /// `(module, function, argument count)` of every Move call in order.
    pub fn move_calls(pt: &ProgrammableTransaction) -> Vec<(String, String, usize)> {
        pt.commands
            .iter()
            .filter_map(|command| match command {
                Command::MoveCall(call) => Some((
                    call.module.to_string(),
                    call.function.to_string(),
                    call.arguments.len(),
                )),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_immutable_shared() {
        match clock_arg() {
            ObjectArg::SharedObject { id, mutability, .. } => {
                assert_eq!(id, SUI_CLOCK_OBJECT_ID);
                assert!(matches!(mutability, SharedObjectMutability::Immutable));
            }
            other => panic!("unexpected clock argument: {:?}", other),
        }
    }

    #[test]
    fn remembered_versions_are_cached() {
        let resolver = ObjectArgResolver::new();
        let id = ObjectID::from_single_byte(9);
        resolver.remember(id, SequenceNumber::from_u64(42));
        assert_eq!(resolver.cached(&id), Some(SequenceNumber::from_u64(42)));
    }
}
