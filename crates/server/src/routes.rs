//! HTTP routes of the relay.
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use client_blockchain_core::{Address, SponsoredTransaction, TxDigest};

use crate::enoki::{EnokiError, SponsorBackend, SponsorRequest};
use crate::error::ApiError;
use crate::suins::{CreatedSubname, SubnameService};

const DEFAULT_NETWORK: &str = "testnet";

/// Shared state of every handler.
pub struct AppState {
    /// `None` when no sponsorship API key is configured
    pub sponsor: Option<Arc<dyn SponsorBackend>>,
    /// `None` when the name-service admin is not configured
    pub subnames: Option<SubnameService>,
    pub allowed_move_call_targets: Vec<String>,
    /// Always allowed besides the sender, e.g. the platform object and the clock
    pub allowed_addresses: Vec<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/enoki/sponsor", post(sponsor))
        .route("/api/enoki/execute", post(execute))
        .route("/api/suins/create-subname", post(create_subname))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SponsorBody {
    transaction_kind_bytes: Option<String>,
    network: Option<String>,
    sender: Option<String>,
    extra_allowed_addresses: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExecuteBody {
    digest: Option<String>,
    signature: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExecuteResponse {
    digest: TxDigest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SubnameBody {
    creator_address: Option<String>,
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn sponsor_backend(state: &AppState) -> Result<&Arc<dyn SponsorBackend>, ApiError> {
    state
        .sponsor
        .as_ref()
        .ok_or_else(|| ApiError::Internal("ENOKI_PRIVATE_API_KEY not configured".to_string()))
}

impl From<EnokiError> for ApiError {
    fn from(e: EnokiError) -> Self {
        match e {
            EnokiError::Upstream { message, body, .. } => ApiError::Upstream {
                message,
                details: Some(body),
            },
            EnokiError::Transport(message) => ApiError::upstream(message),
        }
    }
}

async fn sponsor(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SponsorBody>, JsonRejection>,
) -> Result<Json<SponsoredTransaction>, ApiError> {
    let body = parse_body(payload)?;
    let (Some(transaction_kind_bytes), Some(sender)) =
        (non_empty(body.transaction_kind_bytes), non_empty(body.sender))
    else {
        return Err(ApiError::BadRequest(
            "transactionKindBytes and sender are required".to_string(),
        ));
    };
    let backend = sponsor_backend(&state)?;

    let mut allowed_addresses = state.allowed_addresses.clone();
    allowed_addresses.push(sender.clone());
    allowed_addresses.extend(body.extra_allowed_addresses.unwrap_or_default());

    let request = SponsorRequest {
        network: non_empty(body.network).unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
        transaction_kind_bytes,
        sender,
        allowed_move_call_targets: state.allowed_move_call_targets.clone(),
        allowed_addresses,
    };
    info!(
        network = %request.network,
        sender = %request.sender,
        kind_len = request.transaction_kind_bytes.len(),
        "Requesting sponsored transaction"
    );

    match backend.sponsor(&request).await {
        Ok(sponsored) => {
            info!(digest = %sponsored.digest, "Sponsored");
            Ok(Json(sponsored))
        }
        Err(e) => {
            error!(error = %e, sender = %request.sender, "Sponsorship failed");
            Err(e.into())
        }
    }
}

async fn execute(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteBody>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let body = parse_body(payload)?;
    let (Some(digest), Some(signature)) = (non_empty(body.digest), non_empty(body.signature)) else {
        return Err(ApiError::BadRequest("digest and signature are required".to_string()));
    };
    let backend = sponsor_backend(&state)?;

    match backend.execute(&digest, &signature).await {
        Ok(executed) => {
            info!(digest = %executed, "Executed sponsored transaction");
            Ok(Json(ExecuteResponse { digest: executed }))
        }
        Err(e) => {
            error!(error = %e, digest = %digest, "Sponsored execution failed");
            Err(ApiError::upstream(e.to_string()))
        }
    }
}

async fn create_subname(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubnameBody>, JsonRejection>,
) -> Result<Json<CreatedSubname>, ApiError> {
    let body = parse_body(payload)?;
    let raw = non_empty(body.creator_address)
        .ok_or_else(|| ApiError::BadRequest("creatorAddress is required".to_string()))?;
    let creator = Address::parse(&raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid creatorAddress: {}", raw)))?;

    let subnames = state
        .subnames
        .as_ref()
        .ok_or_else(|| ApiError::Internal("SuiNS admin is not configured".to_string()))?;

    match subnames.create(&creator).await {
        Ok(created) => Ok(Json(created)),
        Err(e @ ApiError::Internal(_)) => {
            error!(error = %e, creator = %creator, "create-subname failed");
            Err(e)
        }
        Err(e) => {
            warn!(error = %e, creator = %creator, "create-subname refused");
            Err(e)
        }
    }
}
