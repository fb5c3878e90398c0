//! Subscription records stored in a service's subscribers table.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::creator::Creator;
use super::decode::{DecodeError, struct_fields, u64_field, u64_or_default};

/// `Subscription { tier, expires_at_ms }` keyed by subscriber address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub tier: u64,
    pub expires_at_ms: u64,
}

impl SubscriptionRecord {
    /// Decode a dynamic field read. The record may sit under `value` (the
    /// `Field<K, V>` wrapper) or be the object itself.
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let fields = struct_fields(value, "Field")?;
        let record = match fields.get("value") {
            Some(inner) if inner.is_object() => struct_fields(inner, "Subscription")?,
            _ => fields,
        };
        Ok(Self {
            tier: u64_or_default(record, "tier")?,
            expires_at_ms: u64_field(record, "expires_at_ms")?,
        })
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms
    }
}

/// Viewer's standing with one creator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub is_subscribed: bool,
    /// 0 when not subscribed
    pub tier_level: u64,
    pub expires_at_ms: u64,
}

impl SubscriptionStatus {
    pub fn from_record(record: Option<SubscriptionRecord>, now_ms: u64) -> Self {
        match record {
            Some(record) => Self {
                is_subscribed: record.is_active(now_ms),
                tier_level: record.tier,
                expires_at_ms: record.expires_at_ms,
            },
            None => Self::default(),
        }
    }
}

/// One of the viewer's active subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MySubscription {
    pub creator: Creator,
    pub tier_level: u64,
    pub expires_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_wrapper_and_bare_record() {
        let wrapped = json!({
            "fields": {
                "name": "0xviewer",
                "value": { "fields": { "tier": "2", "expires_at_ms": "5000" } }
            }
        });
        let bare = json!({ "tier": 1, "expires_at_ms": 10 });

        assert_eq!(
            SubscriptionRecord::from_json(&wrapped).unwrap(),
            SubscriptionRecord { tier: 2, expires_at_ms: 5000 }
        );
        assert_eq!(SubscriptionRecord::from_json(&bare).unwrap().tier, 1);
    }

    #[test]
    fn status_requires_future_expiry() {
        let record = SubscriptionRecord { tier: 1, expires_at_ms: 1_000 };
        assert!(SubscriptionStatus::from_record(Some(record), 999).is_subscribed);
        assert!(!SubscriptionStatus::from_record(Some(record), 1_000).is_subscribed);
        assert_eq!(SubscriptionStatus::from_record(None, 0), SubscriptionStatus::default());
    }
}
