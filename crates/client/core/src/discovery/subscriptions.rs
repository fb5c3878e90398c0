use client_blockchain_core::{Address, ObjectId};
use tracing::{debug, warn};

use super::{Discovery, DiscoveryError};
use crate::model::{Creator, MySubscription, ServiceObject, SubscriptionRecord, SubscriptionStatus};

impl Discovery {
    /// The viewer's standing with one creator. Any failure reads as not subscribed.
    pub async fn subscription_status(&self, service_id: &ObjectId, subscriber: &Address) -> SubscriptionStatus {
        let service = match self.load_service(service_id).await {
            Ok(Some(service)) => service,
            Ok(None) => return SubscriptionStatus::default(),
            Err(e) => {
                warn!("Subscription status for {} unavailable: {}", service_id, e);
                return SubscriptionStatus::default();
            }
        };
        let record = self.subscription_record(&service, subscriber).await;
        SubscriptionStatus::from_record(record, self.now_ms())
    }

    /// Live creators the address holds an unexpired subscription with.
    pub async fn my_subscriptions(&self, subscriber: &Address) -> Result<Vec<MySubscription>, DiscoveryError> {
        let now = self.now_ms();
        let mut subscriptions = Vec::new();
        for service in self.live_services().await? {
            let Some(record) = self.subscription_record(&service, subscriber).await else {
                continue;
            };
            if !record.is_active(now) {
                continue;
            }
            let subscribers = self.subscriber_count(&service).await;
            subscriptions.push(MySubscription {
                creator: Creator::from_service(&service, subscribers),
                tier_level: record.tier,
                expires_at_ms: record.expires_at_ms,
            });
        }
        debug!("{} holds {} active subscriptions", subscriber, subscriptions.len());
        Ok(subscriptions)
    }

    async fn subscription_record(&self, service: &ServiceObject, subscriber: &Address) -> Option<SubscriptionRecord> {
        let table = service.subscribers.as_ref()?;
        let field = match self.ledger().get_dynamic_field(&table.table_id, subscriber).await {
            Ok(field) => field?,
            Err(e) => {
                warn!("Subscriber lookup in {} failed: {}", table.table_id, e);
                return None;
            }
        };
        let fields = field.fields.as_ref()?;
        match SubscriptionRecord::from_json(fields) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Malformed subscription record in {}: {}", table.table_id, e);
                None
            }
        }
    }
}
