use std::collections::HashSet;

use client_blockchain_core::{LedgerEvent, ObjectId, TxDigest};
use tracing::{debug, warn};

use super::reconcile::{Reconciliation, address_key, event_creator};
use super::{Discovery, DiscoveryError, events};
use crate::config::SERVICE_TYPE_FRAGMENT;
use crate::model::{Creator, ServiceObject};

impl Discovery {
    /// One page each of registration and deletion events, queried concurrently.
    pub(crate) async fn creator_events(&self) -> Result<(Vec<LedgerEvent>, Vec<LedgerEvent>), DiscoveryError> {
        let limit = self.config.event_page_size;
        let registered_type = self.config.event_type(events::CREATOR_REGISTERED);
        let deleted_type = self.config.event_type(events::CREATOR_DELETED);

        let (registered, deleted) = tokio::try_join!(
            self.ledger.query_events(&registered_type, limit),
            self.ledger.query_events(&deleted_type, limit),
        )?;
        debug!(
            "Read {} registration and {} deletion events",
            registered.len(),
            deleted.len()
        );
        Ok((registered, deleted))
    }

    pub async fn reconciliation(&self) -> Result<Reconciliation, DiscoveryError> {
        let (registered, deleted) = self.creator_events().await?;
        Ok(Reconciliation::new(&registered, &deleted))
    }

    /// Service object created by a registration transaction, if it can be found.
    async fn service_created_by(&self, digest: &TxDigest) -> Option<ObjectId> {
        match self.ledger.created_objects(digest).await {
            Ok(created) => created
                .into_iter()
                .find(|object| object.object_type.contains(SERVICE_TYPE_FRAGMENT))
                .map(|object| object.object_id),
            Err(e) => {
                warn!("Skipping registration {}: {}", digest, e);
                None
            }
        }
    }

    /// The creator's live service object, or `None` when the creator never
    /// registered or has deleted every profile.
    pub async fn find_active_service_id(&self, address: &str) -> Result<Option<ObjectId>, DiscoveryError> {
        let (registered, deleted) = self.creator_events().await?;
        let reconciliation = Reconciliation::new(&registered, &deleted);
        Ok(self
            .active_service_among(address, &registered, &reconciliation)
            .await)
    }

    /// Registrations are walked in ledger order and the first one whose
    /// service still has content wins.
    pub(crate) async fn active_service_among(
        &self,
        address: &str,
        registered: &[LedgerEvent],
        reconciliation: &Reconciliation,
    ) -> Option<ObjectId> {
        if reconciliation.is_deleted(address) {
            debug!("Creator {} has deleted their profile", address);
            return None;
        }

        let key = address_key(address);
        for event in registered
            .iter()
            .filter(|e| event_creator(e).as_deref() == Some(key.as_str()))
        {
            let Some(service_id) = self.service_created_by(&event.tx_digest).await else {
                continue;
            };
            match self.ledger.get_object(&service_id).await {
                Ok(object) if object.has_content() => return Some(service_id),
                Ok(_) => debug!("Service {} no longer exists", service_id),
                Err(e) => warn!("Skipping service {}: {}", service_id, e),
            }
        }
        None
    }

    /// Decoded services of every live creator, in registration order.
    pub(crate) async fn live_services(&self) -> Result<Vec<ServiceObject>, DiscoveryError> {
        let (registered, deleted) = self.creator_events().await?;
        let reconciliation = Reconciliation::new(&registered, &deleted);

        let mut seen = HashSet::new();
        let mut service_ids = Vec::new();
        for event in &registered {
            let Some(creator) = event_creator(event) else {
                continue;
            };
            if reconciliation.is_deleted(&creator) {
                continue;
            }
            if let Some(service_id) = self.service_created_by(&event.tx_digest).await {
                if seen.insert(service_id.clone()) {
                    service_ids.push(service_id);
                }
            }
        }

        if service_ids.is_empty() {
            return Ok(Vec::new());
        }

        let objects = self.ledger.multi_get_objects(&service_ids).await?;
        let services = objects
            .iter()
            .filter(|object| object.has_content())
            .filter_map(|object| match ServiceObject::from_object(object) {
                Ok(service) => Some(service),
                Err(e) => {
                    warn!("Skipping service {}: {}", object.object_id, e);
                    None
                }
            })
            .collect();
        Ok(services)
    }

    /// Every live creator with tiers and subscriber counts.
    pub async fn fetch_all_creators(&self) -> Result<Vec<Creator>, DiscoveryError> {
        let services = self.live_services().await?;
        let mut creators = Vec::with_capacity(services.len());
        for service in &services {
            let subscribers = self.subscriber_count(service).await;
            creators.push(Creator::from_service(service, subscribers));
        }
        debug!("Discovered {} live creators", creators.len());
        Ok(creators)
    }

    /// Look a creator up by wallet address, or by service id when the
    /// argument is an object id.
    pub async fn fetch_creator(&self, address_or_service: &str) -> Result<Option<Creator>, DiscoveryError> {
        let service_id = match self.find_active_service_id(address_or_service).await? {
            Some(id) => id,
            None => match ObjectId::parse(address_or_service) {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        let Some(service) = self.load_service(&service_id).await? else {
            return Ok(None);
        };
        let subscribers = self.subscriber_count(&service).await;
        Ok(Some(Creator::from_service(&service, subscribers)))
    }

    /// Read and decode a service object. `None` when it no longer exists.
    pub async fn load_service(&self, service_id: &ObjectId) -> Result<Option<ServiceObject>, DiscoveryError> {
        let object = self.ledger.get_object(service_id).await?;
        if !object.has_content() {
            return Ok(None);
        }
        Ok(Some(ServiceObject::from_object(&object)?))
    }

    /// Subscriber count from the table's `size`, falling back to counting
    /// its dynamic fields. Unreadable counts are 0.
    pub async fn subscriber_count(&self, service: &ServiceObject) -> u64 {
        let Some(table) = &service.subscribers else {
            return 0;
        };
        if let Some(size) = table.size {
            return size;
        }
        match self.ledger.count_dynamic_fields(&table.table_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Subscriber count for {} unavailable: {}", service.id, e);
                0
            }
        }
    }

    /// Accumulated, unwithdrawn revenue in MIST. 0 when unreadable.
    pub async fn creator_revenue(&self, service_id: &ObjectId) -> u64 {
        match self.load_service(service_id).await {
            Ok(Some(service)) => service.revenue_mist,
            Ok(None) => 0,
            Err(e) => {
                warn!("Revenue for {} unavailable: {}", service_id, e);
                0
            }
        }
    }
}
