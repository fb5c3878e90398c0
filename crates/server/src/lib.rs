//! Sponsorship relay for the creator subscription client.
//!
//! Holds the secrets clients must never see: the Enoki private API key that
//! pays gas for user transactions and the keystore owning the parent
//! name-service registration.
//!
//! Routes:
//! - `POST /api/enoki/sponsor` - wrap a transaction kind with sponsor gas
//! - `POST /api/enoki/execute` - submit a sponsored transaction with the user's signature
//! - `POST /api/suins/create-subname` - create `<name>.patreon.sui` for a live creator

pub mod config;
pub mod enoki;
pub mod error;
pub mod routes;
pub mod suins;

use std::sync::Arc;

use anyhow::{Context, Result};
use client_blockchain_core::{LedgerTransport, ObjectId};
use client_blockchain_sui::SuiLedgerClient;
use client_blockchain_sui::config::CLOCK_OBJECT_ID;
use client_core::{CoreConfig, Discovery, SystemClock};
use tracing::{info, warn};

pub use config::RelayConfig;
pub use enoki::{EnokiClient, SponsorBackend};
pub use error::ApiError;
pub use routes::{AppState, router};
pub use suins::{LeafRegistrar, SubnameService, SuiLeafRegistrar, normalize_subname};

/// Connect the configured backends.
pub async fn build_state(config: &RelayConfig) -> Result<AppState> {
    config.validate()?;

    let sponsor = match &config.enoki.api_key {
        Some(key) => {
            info!(api = %config.enoki.api_url, "Sponsorship enabled");
            Some(Arc::new(EnokiClient::new(&config.enoki.api_url, key)) as Arc<dyn SponsorBackend>)
        }
        None => {
            warn!("ENOKI_PRIVATE_API_KEY not set; sponsorship requests will fail");
            None
        }
    };

    let subnames = if config.suins.is_enabled() {
        let ledger = SuiLedgerClient::connect(config.sui.clone())
            .await
            .context("Failed to connect to Sui")?;
        let registrar = SuiLeafRegistrar::new(ledger.sdk().clone(), &config.sui, &config.suins)?;
        let ledger: Arc<dyn LedgerTransport> = Arc::new(ledger);
        let discovery = Discovery::new(
            ledger.clone(),
            CoreConfig::new(ObjectId::new(config.sui.package_id.clone())),
            Arc::new(SystemClock),
        );
        info!(parent = %config.suins.parent_name, "Subname registration enabled");
        Some(SubnameService::new(
            discovery,
            ledger,
            Arc::new(registrar),
            config.suins.parent_name.clone(),
        ))
    } else {
        warn!("SUINS_OBJECT_ID or SUINS_SUBDOMAINS_PACKAGE_ID not set; subname requests will fail");
        None
    };

    Ok(AppState {
        sponsor,
        subnames,
        allowed_move_call_targets: config.sui.allowed_move_call_targets(),
        allowed_addresses: vec![config.sui.platform_id.clone(), CLOCK_OBJECT_ID.to_string()],
    })
}
