//! HTTP client for the sponsorship relay.
//!
//! The relay holds the sponsor API key and the name-service admin key, so
//! neither ever reaches the client. Routes:
//! - `POST /api/enoki/sponsor`
//! - `POST /api/enoki/execute`
//! - `POST /api/suins/create-subname`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use client_blockchain_core::{
    ActionError, Address, SponsoredTransaction, SubnameRegistrar, SubnameRegistration, TxDigest,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsorRequest<'a> {
    transaction_kind_bytes: &'a str,
    network: &'a str,
    sender: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    extra_allowed_addresses: &'a [String],
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    digest: &'a str,
    signature: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    digest: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubnameRequest<'a> {
    creator_address: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the relay server.
#[derive(Clone)]
pub struct RelayClient {
    base_url: String,
    network: String,
    http_client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            network: network.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ActionError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Relay request: POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ActionError::Sponsor(format!("Relay unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or(text);
            return Err(ActionError::Sponsor(format!(
                "{} ({})",
                message,
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ActionError::Sponsor(format!("Invalid relay response: {}", e)))
    }

    /// Ask the sponsor to wrap a transaction kind with its gas.
    pub async fn sponsor(
        &self,
        transaction_kind_bytes: &str,
        sender: &Address,
        extra_allowed_addresses: &[String],
    ) -> Result<SponsoredTransaction, ActionError> {
        let request = SponsorRequest {
            transaction_kind_bytes,
            network: &self.network,
            sender: sender.as_str(),
            extra_allowed_addresses,
        };
        self.post("/api/enoki/sponsor", &request).await
    }

    /// Submit the user's signature over a sponsored transaction.
    pub async fn execute(&self, digest: &TxDigest, signature: &str) -> Result<TxDigest, ActionError> {
        let request = ExecuteRequest {
            digest: digest.as_str(),
            signature,
        };
        let response: ExecuteResponse = self.post("/api/enoki/execute", &request).await?;
        Ok(TxDigest::new(response.digest))
    }
}

#[async_trait]
impl SubnameRegistrar for RelayClient {
    async fn create_subname(&self, creator: &Address) -> Result<SubnameRegistration, ActionError> {
        let request = SubnameRequest {
            creator_address: creator.as_str(),
        };
        self.post("/api/suins/create-subname", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sponsor_request_uses_camel_case() {
        let extra = vec!["0xabc".to_string()];
        let request = SponsorRequest {
            transaction_kind_bytes: "AAE=",
            network: "testnet",
            sender: "0x1",
            extra_allowed_addresses: &extra,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["transactionKindBytes"], "AAE=");
        assert_eq!(json["extraAllowedAddresses"][0], "0xabc");
    }

    #[test]
    fn empty_extra_addresses_are_omitted() {
        let request = SponsorRequest {
            transaction_kind_bytes: "AAE=",
            network: "testnet",
            sender: "0x1",
            extra_allowed_addresses: &[],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("extraAllowedAddresses").is_none());
    }

    #[test]
    fn subname_response_with_null_digest() {
        let body = r#"{"success":true,"suinsName":"ada.patreon.sui","normalisedName":"ada","txDigest":null,"note":"skipped"}"#;
        let registration: SubnameRegistration = serde_json::from_str(body).unwrap();
        assert_eq!(registration.suins_name, "ada.patreon.sui");
        assert!(registration.tx_digest.is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = RelayClient::new("http://localhost:3001/", "testnet");
        assert_eq!(client.base_url(), "http://localhost:3001");
    }
}
