//! Key server protocol.
//!
//! A key server holds an IBE master key. Its public key lives on-chain in
//! the key server object. On `POST {url}/v1/fetch_key` it dry-runs the
//! request's `seal_approve` PTB for the certificate's user and, if the
//! policy admits them, returns the user secret key for each requested
//! identity, ElGamal-encrypted to the request's ephemeral key. A `403`
//! means the policy or the certificate was rejected.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use seal_crypto::elgamal;
use seal_crypto::ibe;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sui_sdk::SuiClient;
use sui_sdk::rpc_types::{SuiObjectDataOptions, SuiParsedData};
use sui_types::TypeTag;
use sui_types::base_types::ObjectID;
use sui_types::dynamic_field::DynamicFieldName;
use tokio::sync::OnceCell;

use super::certificate::{Certificate, ElGamalPublicKey, ElGamalVerificationKey};

/// Per-server failure while fetching a key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyServerError {
    /// The access policy rejected the request.
    #[error("access denied: {0}")]
    Denied(String),

    #[error("key server unavailable: {0}")]
    Unavailable(String),

    #[error("invalid key server response: {0}")]
    InvalidResponse(String),
}

/// Body of `POST /v1/fetch_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchKeyRequest {
    /// BCS `ProgrammableTransaction` calling `seal_approve` (base64)
    pub ptb: String,
    pub enc_key: ElGamalPublicKey,
    pub enc_verification_key: ElGamalVerificationKey,
    /// Session-key signature over the request (base64)
    pub request_signature: String,
    pub certificate: Certificate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionKey {
    /// Full identity (package id ‖ inner id)
    pub id: Vec<u8>,
    pub encrypted_key: elgamal::Encryption<ibe::UserSecretKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchKeyResponse {
    pub decryption_keys: Vec<DecryptionKey>,
}

#[async_trait]
pub trait KeyServer: Send + Sync {
    /// On-chain key server object id.
    fn object_id(&self) -> ObjectID;

    /// IBE public key registered for this server.
    async fn public_key(&self) -> Result<ibe::PublicKey, KeyServerError>;

    async fn fetch_key(&self, request: &FetchKeyRequest) -> Result<FetchKeyResponse, KeyServerError>;
}

/// Key server reached over HTTP, with its public key read from the chain.
pub struct HttpKeyServer {
    object_id: ObjectID,
    url: String,
    http_client: reqwest::Client,
    sui_client: SuiClient,
    public_key: OnceCell<ibe::PublicKey>,
}

impl HttpKeyServer {
    pub fn new(object_id: ObjectID, url: impl Into<String>, sui_client: SuiClient) -> Self {
        Self {
            object_id,
            url: url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            sui_client,
            public_key: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn object_fields(&self) -> Result<Value, KeyServerError> {
        let response = self
            .sui_client
            .read_api()
            .get_object_with_options(self.object_id, SuiObjectDataOptions::new().with_content())
            .await
            .map_err(|e| KeyServerError::Unavailable(e.to_string()))?;

        match response.data.and_then(|data| data.content) {
            Some(SuiParsedData::MoveObject(object)) => Ok(object.fields.to_json_value()),
            _ => Err(KeyServerError::InvalidResponse(format!(
                "key server object {} has no content",
                self.object_id
            ))),
        }
    }

    /// Versioned key server objects keep their fields under dynamic field `1`.
    async fn versioned_fields(&self) -> Result<Value, KeyServerError> {
        let name = DynamicFieldName {
            type_: TypeTag::U64,
            value: Value::String("1".to_string()),
        };
        let response = self
            .sui_client
            .read_api()
            .get_dynamic_field_object(self.object_id, name)
            .await
            .map_err(|e| KeyServerError::Unavailable(e.to_string()))?;

        match response.data.and_then(|data| data.content) {
            Some(SuiParsedData::MoveObject(object)) => Ok(object.fields.to_json_value()),
            _ => Err(KeyServerError::InvalidResponse(format!(
                "key server {} has no version 1 fields",
                self.object_id
            ))),
        }
    }

    async fn load_public_key(&self) -> Result<ibe::PublicKey, KeyServerError> {
        let fields = self.object_fields().await?;
        let pk = match find_pk(&fields) {
            Some(pk) => pk,
            None => {
                let versioned = self.versioned_fields().await?;
                find_pk(&versioned).ok_or_else(|| {
                    KeyServerError::InvalidResponse(format!(
                        "key server {} exposes no public key",
                        self.object_id
                    ))
                })?
            }
        };

        let public_key = bcs::from_bytes(&pk)
            .map_err(|e| KeyServerError::InvalidResponse(format!("invalid public key: {}", e)))?;
        tracing::debug!("Loaded public key of key server {}", self.object_id);
        Ok(public_key)
    }
}

/// Locate the `pk: vector<u8>` field, directly or inside a dynamic field value.
fn find_pk(fields: &Value) -> Option<Vec<u8>> {
    let candidates = [
        fields.get("pk"),
        fields.pointer("/value/pk"),
        fields.pointer("/value/fields/pk"),
    ];
    candidates.into_iter().flatten().find_map(byte_vector)
}

fn byte_vector(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        Value::String(encoded) => STANDARD.decode(encoded).ok(),
        _ => None,
    }
}

#[async_trait]
impl KeyServer for HttpKeyServer {
    fn object_id(&self) -> ObjectID {
        self.object_id
    }

    async fn public_key(&self) -> Result<ibe::PublicKey, KeyServerError> {
        self.public_key
            .get_or_try_init(|| self.load_public_key())
            .await
            .copied()
    }

    async fn fetch_key(&self, request: &FetchKeyRequest) -> Result<FetchKeyResponse, KeyServerError> {
        let response = self
            .http_client
            .post(format!("{}/v1/fetch_key", self.url))
            .header("Client-Sdk-Type", "rust")
            .header("Client-Sdk-Version", env!("CARGO_PKG_VERSION"))
            .json(request)
            .send()
            .await
            .map_err(|e| KeyServerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(KeyServerError::Denied(message));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KeyServerError::Unavailable(format!(
                "fetch_key returned {}: {}",
                status, message
            )));
        }

        response
            .json()
            .await
            .map_err(|e| KeyServerError::InvalidResponse(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn public_key_field_is_found_in_either_layout() {
        assert_eq!(find_pk(&json!({ "pk": [1, 2, 3] })), Some(vec![1, 2, 3]));
        assert_eq!(
            find_pk(&json!({ "name": "1", "value": { "url": "https://k", "pk": [7] } })),
            Some(vec![7])
        );
        assert_eq!(
            find_pk(&json!({ "value": { "type": "KeyServerV1", "fields": { "pk": "AQI=" } } })),
            Some(vec![1, 2])
        );
        assert_eq!(find_pk(&json!({ "first_version": "1" })), None);
        assert_eq!(find_pk(&json!({ "pk": [256] })), None);
    }
}
