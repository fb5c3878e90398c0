//! Assembles the Sui backends and the client workflows used by front-ends.
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use client_blockchain_core::{
    BlobStore, KeyRelease, LedgerTransport, PlatformClient, SubnameRegistrar, WalletSigner,
};
use client_blockchain_sui::contracts::{ObjectArgResolver, ServiceContract};
use client_blockchain_sui::seal::{HttpKeyServer, KeyServer};
use client_blockchain_sui::utils::parse_object_id;
use client_blockchain_sui::{
    KeystoreSigner, RelayClient, SealClient, SuiKeyRelease, SuiLedgerClient, SuiPlatformClient,
    WalrusClient, default_keystore_path,
};
use client_core::{
    CachedDiscovery, ContentUnlocker, Discovery, HandleStore, PlatformActions, Publisher,
    QueryCache, SessionManager, SystemClock,
};

use crate::config::AppConfig;

/// Builder that connects to the network and wires every layer together.
pub struct PlatformBuilder {
    config: AppConfig,
    signer: Option<Arc<dyn WalletSigner>>,
}

impl PlatformBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self { config, signer: None }
    }

    /// Provide a signer instead of loading the configured keystore.
    pub fn signer(mut self, signer: Arc<dyn WalletSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    fn load_signer(&self) -> Result<Arc<dyn WalletSigner>> {
        if let Some(signer) = &self.signer {
            return Ok(signer.clone());
        }
        let path = match &self.config.sui.keystore_path {
            Some(path) => path.clone(),
            None => default_keystore_path()?,
        };
        let signer = KeystoreSigner::load(&path, self.config.sui.address.as_deref())?;
        Ok(Arc::new(signer))
    }

    fn key_release(&self, ledger: &SuiLedgerClient) -> Result<SuiKeyRelease> {
        let package_id = parse_object_id(&self.config.sui.package_id)?;

        let mut servers: Vec<Arc<dyn KeyServer>> = Vec::with_capacity(self.config.seal.key_servers.len());
        for server in &self.config.seal.key_servers {
            let object_id = parse_object_id(&server.object_id)
                .with_context(|| format!("Invalid key server {}", server.object_id))?;
            servers.push(Arc::new(HttpKeyServer::new(
                object_id,
                server.url.clone(),
                ledger.sdk().clone(),
            )));
        }

        let seal = SealClient::new(package_id, servers, self.config.seal.threshold)
            .map_err(|e| anyhow!("Invalid key server setup: {}", e))?;

        Ok(SuiKeyRelease::new(
            seal,
            ledger.sdk().clone(),
            ServiceContract::new(package_id),
            Arc::new(ObjectArgResolver::new()),
        ))
    }

    pub async fn build(self) -> Result<Platform> {
        self.config.validate()?;

        let signer = self.load_signer()?;
        let sui = SuiLedgerClient::connect(self.config.sui.clone())
            .await
            .context("Failed to connect to Sui")?;

        let relay = self.config.sui.relay_url.as_ref().map(|url| {
            tracing::info!("Sponsoring transactions through {}", url);
            RelayClient::new(url.clone(), self.config.sui.network.as_str())
        });
        if relay.is_none() {
            tracing::info!("No relay configured; the signer pays gas");
        }

        let key_release: Arc<dyn KeyRelease> = Arc::new(self.key_release(&sui)?);
        let client: Arc<dyn PlatformClient> = Arc::new(SuiPlatformClient::new(
            sui.sdk().clone(),
            self.config.sui.clone(),
            signer.clone(),
            relay.clone(),
        )?);
        let blobs: Arc<dyn BlobStore> = Arc::new(WalrusClient::new(self.config.walrus.clone()));
        let ledger: Arc<dyn LedgerTransport> = Arc::new(sui);

        let core = self.config.core();
        let clock = Arc::new(SystemClock);
        let cache = Arc::new(QueryCache::new());
        let discovery = Discovery::new(ledger.clone(), core.clone(), clock.clone());
        let sessions = Arc::new(SessionManager::new(
            signer.clone(),
            key_release.clone(),
            core.package_id.clone(),
            core.session_ttl_min,
            clock,
        ));

        let publisher = Publisher::new(ledger.clone(), blobs.clone(), key_release.clone(), client.clone());
        let mut actions = PlatformActions::new(
            client.clone(),
            blobs.clone(),
            publisher,
            discovery.clone(),
            cache.clone(),
            signer.address(),
        );
        if let Some(relay) = relay {
            let subnames: Arc<dyn SubnameRegistrar> = Arc::new(relay);
            actions = actions.with_subnames(subnames);
        }

        let unlocker = ContentUnlocker::new(blobs.clone(), key_release.clone(), sessions.clone(), HandleStore::new());

        tracing::info!(
            "Platform ready on {} as {}",
            client.network(),
            signer
                .address()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "<no account>".to_string())
        );

        Ok(Platform {
            config: self.config,
            signer,
            ledger,
            blobs,
            key_release,
            client,
            sessions,
            reads: CachedDiscovery::new(discovery, cache),
            actions,
            unlocker,
        })
    }
}

/// The assembled client platform.
pub struct Platform {
    pub config: AppConfig,
    pub signer: Arc<dyn WalletSigner>,
    pub ledger: Arc<dyn LedgerTransport>,
    pub blobs: Arc<dyn BlobStore>,
    pub key_release: Arc<dyn KeyRelease>,
    pub client: Arc<dyn PlatformClient>,
    pub sessions: Arc<SessionManager>,
    /// Cached discovery reads
    pub reads: CachedDiscovery,
    pub actions: PlatformActions,
    pub unlocker: ContentUnlocker,
}
