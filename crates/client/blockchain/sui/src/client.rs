//! Sui ledger reads.
//!
//! [`SuiLedgerClient`] implements [`LedgerTransport`] over the fullnode JSON-RPC
//! API. Each method is a single round trip; aggregation and best-effort
//! handling live in the application layer.

use async_trait::async_trait;
use sui_sdk::rpc_types::{
    EventFilter, ObjectChange, SuiObjectDataOptions, SuiObjectResponse, SuiParsedData,
    SuiTransactionBlockResponseOptions,
};
use sui_sdk::{SuiClient, SuiClientBuilder};
use sui_types::TypeTag;
use sui_types::dynamic_field::DynamicFieldName;

use client_blockchain_core::{
    Address, CreatedObject, LedgerEvent, LedgerTransport, ObjectData, ObjectId, TransportError,
    TxDigest,
};

use crate::config::SuiConfig;
use crate::core::error::{Result, SuiError};
use crate::utils::conversion::{
    from_object_id, from_sui_address, from_transaction_digest, to_object_id, to_sui_address,
    to_transaction_digest,
};

/// Read-only client for the Sui fullnode.
#[derive(Clone)]
pub struct SuiLedgerClient {
    client: SuiClient,
    config: SuiConfig,
}

impl SuiLedgerClient {
    /// Connect to the RPC endpoint configured in `config`.
    pub async fn connect(config: SuiConfig) -> Result<Self> {
        use client_blockchain_core::BlockchainConfig;

        config.validate().map_err(SuiError::InvalidConfig)?;

        let client = SuiClientBuilder::default()
            .build(config.get_rpc_url())
            .await?;

        tracing::info!(
            "Connected to {} at {}",
            config.network_name(),
            config.get_rpc_url()
        );

        Ok(Self { client, config })
    }

    /// Wrap an existing SDK client.
    pub fn from_client(client: SuiClient, config: SuiConfig) -> Self {
        Self { client, config }
    }

    pub fn sdk(&self) -> &SuiClient {
        &self.client
    }

    pub fn config(&self) -> &SuiConfig {
        &self.config
    }

    fn content_options() -> SuiObjectDataOptions {
        SuiObjectDataOptions::new().with_type().with_content()
    }
}

/// Map an object response into the chain-agnostic shape.
///
/// Deleted, wrapped and package objects come back without fields.
fn object_data(requested: &ObjectId, response: SuiObjectResponse) -> ObjectData {
    let Some(data) = response.data else {
        return ObjectData {
            object_id: requested.clone(),
            object_type: None,
            fields: None,
        };
    };

    let fields = match data.content {
        Some(SuiParsedData::MoveObject(object)) => Some(object.fields.to_json_value()),
        _ => None,
    };

    ObjectData {
        object_id: from_object_id(data.object_id),
        object_type: data.type_.map(|t| t.to_string()),
        fields,
    }
}

#[async_trait]
impl LedgerTransport for SuiLedgerClient {
    async fn query_events(
        &self,
        event_type: &str,
        limit: usize,
    ) -> std::result::Result<Vec<LedgerEvent>, TransportError> {
        let struct_tag = sui_types::parse_sui_struct_tag(event_type).map_err(|e| {
            TransportError::Config(format!("Invalid event type {}: {}", event_type, e))
        })?;

        let page = self
            .client
            .event_api()
            .query_events(EventFilter::MoveEventType(struct_tag), None, Some(limit), false)
            .await
            .map_err(SuiError::from)?;

        tracing::debug!("Fetched {} {} events", page.data.len(), event_type);

        Ok(page
            .data
            .into_iter()
            .map(|event| LedgerEvent {
                tx_digest: from_transaction_digest(event.id.tx_digest),
                event_seq: event.id.event_seq,
                event_type: event.type_.to_canonical_string(true),
                sender: Some(from_sui_address(event.sender)),
                parsed_json: event.parsed_json,
                timestamp_ms: event.timestamp_ms,
            })
            .collect())
    }

    async fn created_objects(
        &self,
        digest: &TxDigest,
    ) -> std::result::Result<Vec<CreatedObject>, TransportError> {
        let digest = to_transaction_digest(digest)?;

        let response = self
            .client
            .read_api()
            .get_transaction_with_options(
                digest,
                SuiTransactionBlockResponseOptions::new().with_object_changes(),
            )
            .await
            .map_err(SuiError::from)?;

        Ok(response
            .object_changes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|change| match change {
                ObjectChange::Created {
                    object_id,
                    object_type,
                    ..
                } => Some(CreatedObject {
                    object_id: from_object_id(object_id),
                    object_type: object_type.to_canonical_string(true),
                }),
                _ => None,
            })
            .collect())
    }

    async fn get_object(&self, object_id: &ObjectId) -> std::result::Result<ObjectData, TransportError> {
        let id = to_object_id(object_id)?;

        let response = self
            .client
            .read_api()
            .get_object_with_options(id, Self::content_options())
            .await
            .map_err(SuiError::from)?;

        Ok(object_data(object_id, response))
    }

    async fn multi_get_objects(
        &self,
        ids: &[ObjectId],
    ) -> std::result::Result<Vec<ObjectData>, TransportError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sdk_ids = ids
            .iter()
            .map(to_object_id)
            .collect::<Result<Vec<_>>>()?;

        let responses = self
            .client
            .read_api()
            .multi_get_object_with_options(sdk_ids, Self::content_options())
            .await
            .map_err(SuiError::from)?;

        Ok(ids
            .iter()
            .zip(responses)
            .map(|(id, response)| object_data(id, response))
            .collect())
    }

    async fn get_dynamic_field(
        &self,
        parent: &ObjectId,
        key: &Address,
    ) -> std::result::Result<Option<ObjectData>, TransportError> {
        let parent_id = to_object_id(parent)?;
        let key_address = to_sui_address(key)?;

        let name = DynamicFieldName {
            type_: TypeTag::Address,
            value: serde_json::Value::String(key_address.to_string()),
        };

        let response = self
            .client
            .read_api()
            .get_dynamic_field_object(parent_id, name)
            .await
            .map_err(SuiError::from)?;

        let Some(data) = response.data else {
            return Ok(None);
        };

        let fields = match data.content {
            Some(SuiParsedData::MoveObject(object)) => Some(object.fields.to_json_value()),
            _ => None,
        };

        Ok(Some(ObjectData {
            object_id: from_object_id(data.object_id),
            object_type: data.type_.map(|t| t.to_string()),
            fields,
        }))
    }

    async fn count_dynamic_fields(&self, parent: &ObjectId) -> std::result::Result<u64, TransportError> {
        let parent_id = to_object_id(parent)?;

        let page = self
            .client
            .read_api()
            .get_dynamic_fields(parent_id, None, None)
            .await
            .map_err(SuiError::from)?;

        Ok(page.data.len() as u64)
    }
}
