//! Session credential lifecycle.
//!
//! ```text
//! Uninitialized ──credential()──▶ AwaitingSignature ──signed──▶ Active
//!       ▲                                 │                        │
//!       └────────── rejected ─────────────┘                   ttl elapses
//!                                                                  ▼
//!                       AwaitingSignature ◀──credential()──── Expired
//! ```
//!
//! Credentials are kept in memory only and never renewed in the background:
//! the first request after expiry prompts the wallet again.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use client_blockchain_core::{KeyRelease, ObjectId, SessionCredential, SignerError, WalletSigner};
use thiserror::Error;

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No wallet connected")]
    NoAccount,

    #[error("Session key creation was cancelled")]
    Rejected,

    #[error("A session signature request is already pending")]
    SignatureInProgress,

    #[error("Session key creation failed: {0}")]
    Signer(String),
}

impl From<SignerError> for SessionError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected => SessionError::Rejected,
            SignerError::NoAccount => SessionError::NoAccount,
            SignerError::Backend(msg) => SessionError::Signer(msg),
        }
    }
}

/// Observable phase of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    AwaitingSignature,
    Active { expires_at_ms: u64 },
    Expired,
}

#[derive(Default)]
struct Inner {
    credential: Option<SessionCredential>,
    awaiting: bool,
    expired: bool,
}

/// Lazily creates and caches the wallet-signed session credential.
pub struct SessionManager {
    signer: Arc<dyn WalletSigner>,
    keys: Arc<dyn KeyRelease>,
    package_id: ObjectId,
    ttl_min: u64,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl SessionManager {
    pub fn new(
        signer: Arc<dyn WalletSigner>,
        keys: Arc<dyn KeyRelease>,
        package_id: ObjectId,
        ttl_min: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signer,
            keys,
            package_id,
            ttl_min: ttl_min.max(1),
            clock,
            inner: Mutex::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        let now = self.clock.now_ms();
        let inner = self.lock();
        if inner.awaiting {
            return SessionState::AwaitingSignature;
        }
        match &inner.credential {
            Some(credential) if !credential.is_expired(now) => SessionState::Active {
                expires_at_ms: credential.expires_at_ms(),
            },
            Some(_) => SessionState::Expired,
            None if inner.expired => SessionState::Expired,
            None => SessionState::Uninitialized,
        }
    }

    /// Cached credential, if one is active right now.
    pub fn current(&self) -> Option<SessionCredential> {
        let now = self.clock.now_ms();
        self.lock()
            .credential
            .as_ref()
            .filter(|credential| !credential.is_expired(now))
            .cloned()
    }

    /// Return the active credential, prompting the wallet when there is none.
    ///
    /// A second caller arriving while the prompt is open gets
    /// [`SessionError::SignatureInProgress`] instead of a second prompt.
    pub async fn credential(&self) -> Result<SessionCredential, SessionError> {
        let now = self.clock.now_ms();
        {
            let mut inner = self.lock();
            if let Some(credential) = &inner.credential {
                if !credential.is_expired(now) {
                    return Ok(credential.clone());
                }
                tracing::debug!("Session credential expired, requesting a new signature");
                inner.credential = None;
                inner.expired = true;
            }
            if inner.awaiting {
                return Err(SessionError::SignatureInProgress);
            }
            inner.awaiting = true;
        }

        let mut pending = PendingSignature { manager: self };
        let result = self.sign_new(now).await;
        pending.settle(result.as_ref().ok().cloned());
        result
    }

    /// Forget the cached credential (e.g. wallet switched accounts).
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.credential = None;
        inner.expired = false;
    }

    async fn sign_new(&self, created_at_ms: u64) -> Result<SessionCredential, SessionError> {
        let address = self.signer.address().ok_or(SessionError::NoAccount)?;
        let session_key = self.keys.new_session_key();
        let personal_message = personal_message(
            &self.package_id,
            self.ttl_min,
            created_at_ms,
            &session_key.public_key,
        );

        let signature = self
            .signer
            .sign_personal_message(personal_message.as_bytes())
            .await?;

        tracing::info!("Session credential created for {}", address);
        Ok(SessionCredential {
            address,
            package_id: self.package_id.clone(),
            created_at_ms,
            ttl_ms: self.ttl_min * 60_000,
            personal_message,
            signature,
            session_key,
        })
    }
}

/// Clears the awaiting flag even if the signing future is dropped.
struct PendingSignature<'a> {
    manager: &'a SessionManager,
}

impl PendingSignature<'_> {
    fn settle(&mut self, credential: Option<SessionCredential>) {
        let mut inner = self.manager.lock();
        inner.awaiting = false;
        if let Some(credential) = credential {
            inner.credential = Some(credential);
            inner.expired = false;
        }
    }
}

impl Drop for PendingSignature<'_> {
    fn drop(&mut self) {
        self.manager.lock().awaiting = false;
    }
}

/// Message the wallet signs to certify the session key.
///
/// Key servers rebuild this exact string from the certificate, so the
/// timestamp is truncated to whole seconds.
pub fn personal_message(
    package_id: &ObjectId,
    ttl_min: u64,
    created_at_ms: u64,
    session_public_key: &str,
) -> String {
    let timestamp = DateTime::<Utc>::from_timestamp((created_at_ms / 1000) as i64, 0)
        .map(|t| t.to_string())
        .unwrap_or_else(|| created_at_ms.to_string());
    format!(
        "Accessing keys of package {} for {} mins from {}, session key {}",
        package_id, ttl_min, timestamp, session_public_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use client_blockchain_core::{Address, MockKeyRelease, MockSigner};

    fn manager(signer: &MockSigner, clock: &ManualClock) -> SessionManager {
        SessionManager::new(
            Arc::new(signer.clone()),
            Arc::new(MockKeyRelease::new()),
            ObjectId::new("0xpkg"),
            10,
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn message_format() {
        assert_eq!(
            personal_message(&ObjectId::new("0xpkg"), 10, 1_700_000_000_999, "dGVzdA=="),
            "Accessing keys of package 0xpkg for 10 mins from 2023-11-14 22:13:20 UTC, session key dGVzdA=="
        );
    }

    #[tokio::test]
    async fn each_credential_gets_its_own_session_key() {
        let signer = MockSigner::new(Address::new("0xviewer"));
        let keys = MockKeyRelease::new();
        let clock = ManualClock::new(0);
        let session = SessionManager::new(
            Arc::new(signer.clone()),
            Arc::new(keys.clone()),
            ObjectId::new("0xpkg"),
            10,
            Arc::new(clock.clone()),
        );

        let first = session.credential().await.unwrap();
        assert!(first.personal_message.ends_with(&first.session_key.public_key));

        clock.advance(600_000);
        let second = session.credential().await.unwrap();
        assert_ne!(first.session_key, second.session_key);
        assert_eq!(keys.session_keys_issued(), 2);
    }

    #[tokio::test]
    async fn credential_is_created_once_and_cached() {
        let signer = MockSigner::new(Address::new("0xviewer"));
        let clock = ManualClock::new(1_000);
        let session = manager(&signer, &clock);

        assert_eq!(session.state(), SessionState::Uninitialized);

        let first = session.credential().await.unwrap();
        let second = session.credential().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(signer.personal_signatures(), 1);
        assert_eq!(
            session.state(),
            SessionState::Active {
                expires_at_ms: 601_000
            }
        );
    }

    #[tokio::test]
    async fn expiry_requires_a_new_signature() {
        let signer = MockSigner::new(Address::new("0xviewer"));
        let clock = ManualClock::new(0);
        let session = manager(&signer, &clock);

        session.credential().await.unwrap();
        clock.advance(600_000);
        assert_eq!(session.state(), SessionState::Expired);
        assert!(session.current().is_none());

        let renewed = session.credential().await.unwrap();
        assert_eq!(renewed.created_at_ms, 600_000);
        assert_eq!(signer.personal_signatures(), 2);
    }

    #[tokio::test]
    async fn rejection_is_terminal_for_the_attempt() {
        let signer = MockSigner::new(Address::new("0xviewer"));
        signer.set_reject(true);
        let clock = ManualClock::new(0);
        let session = manager(&signer, &clock);

        let err = session.credential().await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected));
        assert_eq!(session.state(), SessionState::Uninitialized);

        signer.set_reject(false);
        assert!(session.credential().await.is_ok());
    }

    #[tokio::test]
    async fn disconnected_wallet_fails() {
        let signer = MockSigner::disconnected();
        let clock = ManualClock::new(0);
        let session = manager(&signer, &clock);

        assert!(matches!(
            session.credential().await.unwrap_err(),
            SessionError::NoAccount
        ));
    }

    #[tokio::test]
    async fn invalidate_forgets_the_credential() {
        let signer = MockSigner::new(Address::new("0xviewer"));
        let clock = ManualClock::new(0);
        let session = manager(&signer, &clock);

        session.credential().await.unwrap();
        session.invalidate();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    struct GatedSigner {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl WalletSigner for GatedSigner {
        fn address(&self) -> Option<Address> {
            Some(Address::new("0xviewer"))
        }

        async fn sign_personal_message(&self, _message: &[u8]) -> Result<String, SignerError> {
            self.gate.notified().await;
            Ok("signature".to_string())
        }

        async fn sign_transaction(&self, _tx_data: &[u8]) -> Result<String, SignerError> {
            Err(SignerError::Rejected)
        }
    }

    fn gated() -> (Arc<SessionManager>, Arc<tokio::sync::Notify>) {
        let gate = Arc::new(tokio::sync::Notify::new());
        let session = SessionManager::new(
            Arc::new(GatedSigner { gate: gate.clone() }),
            Arc::new(MockKeyRelease::new()),
            ObjectId::new("0xpkg"),
            10,
            Arc::new(ManualClock::new(0)),
        );
        (Arc::new(session), gate)
    }

    #[tokio::test]
    async fn concurrent_request_does_not_prompt_twice() {
        let (session, gate) = gated();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.credential().await }
        });
        while session.state() != SessionState::AwaitingSignature {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            session.credential().await,
            Err(SessionError::SignatureInProgress)
        ));

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(matches!(session.state(), SessionState::Active { .. }));
    }

    #[tokio::test]
    async fn abandoned_prompt_resets_state() {
        let (session, _gate) = gated();

        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            session.credential(),
        )
        .await;
        assert!(attempt.is_err());
        assert_eq!(session.state(), SessionState::Uninitialized);
    }
}
