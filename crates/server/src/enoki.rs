//! Enoki sponsorship API client.
//!
//! The relay keeps the private API key; clients only ever see the
//! sponsor-cosigned bytes and digest.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use client_blockchain_core::{SponsoredTransaction, TxDigest};

/// Sponsorship request as forwarded upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRequest {
    pub network: String,
    #[serde(rename = "transactionBlockKindBytes")]
    pub transaction_kind_bytes: String,
    pub sender: String,
    pub allowed_move_call_targets: Vec<String>,
    pub allowed_addresses: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnokiError {
    /// Non-2xx answer. `body` is the parsed response, `Null` when unparseable.
    #[error("{message}")]
    Upstream { status: u16, message: String, body: Value },

    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait SponsorBackend: Send + Sync {
    async fn sponsor(&self, request: &SponsorRequest) -> Result<SponsoredTransaction, EnokiError>;

    async fn execute(&self, digest: &str, signature: &str) -> Result<TxDigest, EnokiError>;
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ExecutedData {
    digest: TxDigest,
}

#[derive(Debug, Serialize)]
struct ExecuteBody<'a> {
    signature: &'a str,
}

#[derive(Clone)]
pub struct EnokiClient {
    api_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl EnokiClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, EnokiError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .http_client
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| EnokiError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EnokiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Err(EnokiError::Upstream {
                status: status.as_u16(),
                message: upstream_message(status.as_u16(), &body),
                body,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| EnokiError::Transport(format!("Invalid Enoki response: {}", e)))
    }
}

#[async_trait]
impl SponsorBackend for EnokiClient {
    async fn sponsor(&self, request: &SponsorRequest) -> Result<SponsoredTransaction, EnokiError> {
        let response: DataEnvelope<SponsoredTransaction> =
            self.post("/transaction-blocks/sponsor", request).await?;
        Ok(response.data)
    }

    async fn execute(&self, digest: &str, signature: &str) -> Result<TxDigest, EnokiError> {
        let response: DataEnvelope<ExecutedData> = self
            .post(
                &format!("/transaction-blocks/sponsor/{}", digest),
                &ExecuteBody { signature },
            )
            .await?;
        Ok(response.data.digest)
    }
}

/// The most specific message in an upstream error body.
pub fn upstream_message(status: u16, body: &Value) -> String {
    let first_error = body
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|error| error.get("message"));

    [body.get("message"), body.get("error"), first_error]
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str().filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Enoki API error ({})", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_upstream_field_names() {
        let request = SponsorRequest {
            network: "testnet".to_string(),
            transaction_kind_bytes: "AAE=".to_string(),
            sender: "0x1".to_string(),
            allowed_move_call_targets: vec!["0x2::service::publish_post".to_string()],
            allowed_addresses: vec!["0x6".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["transactionBlockKindBytes"], "AAE=");
        assert_eq!(json["allowedMoveCallTargets"][0], "0x2::service::publish_post");
        assert_eq!(json["allowedAddresses"][0], "0x6");
    }

    #[test]
    fn upstream_message_precedence() {
        assert_eq!(upstream_message(400, &json!({ "message": "bad kind", "error": "x" })), "bad kind");
        assert_eq!(upstream_message(400, &json!({ "error": "quota" })), "quota");
        assert_eq!(
            upstream_message(400, &json!({ "errors": [{ "code": "invalid", "message": "not allowed" }] })),
            "not allowed"
        );
        assert_eq!(upstream_message(503, &Value::Null), "Enoki API error (503)");
    }

    #[test]
    fn sponsored_envelope_parses() {
        let body = r#"{"data":{"bytes":"AAA=","digest":"9vB2"}}"#;
        let parsed: DataEnvelope<SponsoredTransaction> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.digest, TxDigest::new("9vB2"));
    }
}
