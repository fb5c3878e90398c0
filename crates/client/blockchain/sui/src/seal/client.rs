//! Threshold encryption client.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use seal_crypto::{
    EncryptedObject, EncryptionInput, IBEPublicKeys, IBEUserSecretKeys, create_full_id, elgamal,
    ibe, seal_decrypt, seal_encrypt,
};
use sui_types::base_types::ObjectID;

use client_blockchain_core::{KeyReleaseError, SessionCredential};

use super::certificate::{
    Certificate, ElGamalPublicKey, ElGamalSecretKey, ElGamalVerificationKey, sign_request,
    signed_request,
};
use super::key_server::{FetchKeyRequest, KeyServer, KeyServerError};

/// Encrypts for an identity and gathers user secret keys to decrypt.
pub struct SealClient {
    package_id: ObjectID,
    servers: Vec<Arc<dyn KeyServer>>,
    threshold: u8,
}

impl SealClient {
    pub fn new(
        package_id: ObjectID,
        servers: Vec<Arc<dyn KeyServer>>,
        threshold: u8,
    ) -> Result<Self, KeyReleaseError> {
        if threshold == 0 || threshold as usize > servers.len() {
            return Err(KeyReleaseError::Encryption(format!(
                "threshold {} is invalid for {} key servers",
                threshold,
                servers.len()
            )));
        }
        Ok(Self {
            package_id,
            servers,
            threshold,
        })
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Encrypt `plaintext` for `identity` under every configured server.
    pub async fn encrypt(&self, identity: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, KeyReleaseError> {
        let mut server_ids = Vec::with_capacity(self.servers.len());
        let mut public_keys = Vec::with_capacity(self.servers.len());
        for server in &self.servers {
            let public_key = server
                .public_key()
                .await
                .map_err(|e| KeyReleaseError::Transport(e.to_string()))?;
            server_ids.push(server.object_id());
            public_keys.push(public_key);
        }

        let (object, _) = seal_encrypt(
            self.package_id,
            identity.to_vec(),
            server_ids,
            &IBEPublicKeys::BonehFranklinBLS12381(public_keys),
            self.threshold,
            EncryptionInput::Aes256Gcm {
                data: plaintext.to_vec(),
                aad: None,
            },
        )
        .map_err(|e| KeyReleaseError::Encryption(e.to_string()))?;

        bcs::to_bytes(&object).map_err(|e| KeyReleaseError::Encryption(e.to_string()))
    }

    /// Decrypt an object produced for `identity`.
    ///
    /// `approval_ptb` is the BCS `ProgrammableTransaction` calling
    /// `seal_approve`. Servers are asked in object order until `threshold`
    /// verified keys arrive.
    pub async fn decrypt(
        &self,
        credential: &SessionCredential,
        identity: &[u8],
        approval_ptb: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, KeyReleaseError> {
        let object: EncryptedObject = bcs::from_bytes(ciphertext).map_err(|e| {
            KeyReleaseError::MalformedCiphertext(format!("undecodable encrypted object: {}", e))
        })?;

        if object.id != identity || object.package_id != self.package_id {
            return Err(KeyReleaseError::MalformedCiphertext(
                "identity mismatch".to_string(),
            ));
        }

        let (enc_secret, enc_key, enc_verification_key): (
            ElGamalSecretKey,
            ElGamalPublicKey,
            ElGamalVerificationKey,
        ) = elgamal::genkey(&mut rand::thread_rng());

        let message = signed_request(approval_ptb, &enc_key, &enc_verification_key)?;
        let request = FetchKeyRequest {
            ptb: STANDARD.encode(approval_ptb),
            enc_key,
            enc_verification_key,
            request_signature: sign_request(&credential.session_key, &message)?,
            certificate: Certificate::from_credential(credential)?,
        };

        let full_id = create_full_id(&self.package_id.into_bytes(), identity);
        let threshold = object.threshold as usize;
        let mut keys: HashMap<ObjectID, ibe::UserSecretKey> = HashMap::with_capacity(threshold);
        let mut denial: Option<String> = None;

        for (object_id, _) in &object.services {
            if keys.len() >= threshold {
                break;
            }

            let Some(server) = self.servers.iter().find(|s| s.object_id() == *object_id) else {
                tracing::debug!("No configured key server {}", object_id);
                continue;
            };

            match self
                .fetch_verified(server.as_ref(), &request, &enc_secret, &full_id)
                .await
            {
                Ok(key) => {
                    keys.insert(*object_id, key);
                }
                Err(KeyServerError::Denied(message)) => {
                    tracing::debug!("Key server {} denied access: {}", object_id, message);
                    denial.get_or_insert(message);
                }
                Err(e) => {
                    tracing::warn!("Key server {} failed: {}", object_id, e);
                }
            }
        }

        if keys.len() < threshold {
            return Err(match denial {
                Some(message) => KeyReleaseError::AccessDenied(message),
                None => KeyReleaseError::QuorumNotReached {
                    responded: keys.len(),
                    threshold,
                },
            });
        }

        seal_decrypt(&object, &IBEUserSecretKeys::BonehFranklinBLS12381(keys), None)
            .map_err(|e| KeyReleaseError::MalformedCiphertext(e.to_string()))
    }

    /// Fetch, unwrap and check one server's user secret key for `full_id`.
    async fn fetch_verified(
        &self,
        server: &dyn KeyServer,
        request: &FetchKeyRequest,
        enc_secret: &ElGamalSecretKey,
        full_id: &[u8],
    ) -> Result<ibe::UserSecretKey, KeyServerError> {
        let public_key = server.public_key().await?;
        let response = server.fetch_key(request).await?;

        let encrypted = response
            .decryption_keys
            .iter()
            .find(|key| key.id == full_id)
            .ok_or_else(|| KeyServerError::InvalidResponse("requested id missing".to_string()))?;

        let user_secret_key = elgamal::decrypt(enc_secret, &encrypted.encrypted_key);
        ibe::verify_user_secret_key(&user_secret_key, full_id, &public_key)
            .map_err(|_| KeyServerError::InvalidResponse("user secret key failed verification".to_string()))?;
        Ok(user_secret_key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use client_blockchain_core::{Address, ObjectId};

    use super::*;
    use crate::contracts::test_support::shared;
    use crate::contracts::{ServiceContract, clock_arg};
    use crate::seal::certificate::generate_session_key;
    use crate::seal::key_server::test_support::LocalKeyServer;

    const VIEWER: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";
    const PACKAGE: [u8; 32] = [9; 32];

    fn credential() -> SessionCredential {
        SessionCredential {
            address: Address::new(VIEWER),
            package_id: ObjectId::new("0x1"),
            created_at_ms: 0,
            ttl_ms: 600_000,
            personal_message: String::new(),
            signature: String::new(),
            session_key: generate_session_key(),
        }
    }

    fn approval(identity: &[u8]) -> Vec<u8> {
        let pt = ServiceContract::new(ObjectID::new(PACKAGE))
            .seal_approve(identity.to_vec(), shared(5), clock_arg())
            .unwrap();
        bcs::to_bytes(&pt).unwrap()
    }

    fn servers(list: Vec<LocalKeyServer>) -> (Vec<Arc<LocalKeyServer>>, Vec<Arc<dyn KeyServer>>) {
        let concrete: Vec<Arc<LocalKeyServer>> = list.into_iter().map(Arc::new).collect();
        let dynamic = concrete
            .iter()
            .map(|s| s.clone() as Arc<dyn KeyServer>)
            .collect();
        (concrete, dynamic)
    }

    fn client(dynamic: Vec<Arc<dyn KeyServer>>, threshold: u8) -> SealClient {
        SealClient::new(ObjectID::new(PACKAGE), dynamic, threshold).unwrap()
    }

    #[tokio::test]
    async fn admitted_viewer_decrypts() {
        let (concrete, dynamic) = servers(vec![
            LocalKeyServer::new(1, PACKAGE),
            LocalKeyServer::new(2, PACKAGE),
        ]);
        concrete.iter().for_each(|s| s.allow(VIEWER));
        let client = client(dynamic, 2);

        let sealed = client.encrypt(b"identity", b"secret post").await.unwrap();
        let opened = client
            .decrypt(&credential(), b"identity", &approval(b"identity"), &sealed)
            .await
            .unwrap();

        assert_eq!(opened, b"secret post");
    }

    #[tokio::test]
    async fn ciphertext_is_a_seal_encrypted_object() {
        let (_, dynamic) = servers(vec![
            LocalKeyServer::new(1, PACKAGE),
            LocalKeyServer::new(2, PACKAGE),
        ]);
        let client = client(dynamic, 2);

        let sealed = client.encrypt(b"identity", b"secret").await.unwrap();
        let object: EncryptedObject = bcs::from_bytes(&sealed).unwrap();

        assert_eq!(object.package_id, ObjectID::new(PACKAGE));
        assert_eq!(object.id, b"identity");
        assert_eq!(object.threshold, 2);
        assert_eq!(object.services.len(), 2);
    }

    #[tokio::test]
    async fn denial_is_reported_as_access_denied() {
        let (_, dynamic) = servers(vec![
            LocalKeyServer::new(1, PACKAGE),
            LocalKeyServer::new(2, PACKAGE),
        ]);
        let client = client(dynamic, 2);

        let sealed = client.encrypt(b"identity", b"secret").await.unwrap();
        let result = client
            .decrypt(&credential(), b"identity", &approval(b"identity"), &sealed)
            .await;

        assert!(matches!(result, Err(KeyReleaseError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn offline_servers_fail_quorum() {
        let (concrete, dynamic) = servers(vec![
            LocalKeyServer::new(1, PACKAGE),
            LocalKeyServer::offline(2, PACKAGE),
        ]);
        concrete[0].allow(VIEWER);
        let client = client(dynamic, 2);

        let sealed = client.encrypt(b"identity", b"secret").await.unwrap();
        let result = client
            .decrypt(&credential(), b"identity", &approval(b"identity"), &sealed)
            .await;

        assert!(matches!(
            result,
            Err(KeyReleaseError::QuorumNotReached { responded: 1, threshold: 2 })
        ));
    }

    #[tokio::test]
    async fn stops_after_threshold_keys() {
        let (concrete, dynamic) = servers(vec![
            LocalKeyServer::new(1, PACKAGE),
            LocalKeyServer::new(2, PACKAGE),
            LocalKeyServer::new(3, PACKAGE),
        ]);
        concrete.iter().for_each(|s| s.allow(VIEWER));
        let client = client(dynamic, 2);

        let sealed = client.encrypt(b"identity", b"secret").await.unwrap();
        client
            .decrypt(&credential(), b"identity", &approval(b"identity"), &sealed)
            .await
            .unwrap();

        assert_eq!(concrete[2].fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn key_for_another_package_fails_verification() {
        let (concrete, dynamic) = servers(vec![LocalKeyServer::new(1, [8; 32])]);
        concrete[0].allow(VIEWER);
        let client = client(dynamic, 1);

        let sealed = client.encrypt(b"identity", b"secret").await.unwrap();
        let result = client
            .decrypt(&credential(), b"identity", &approval(b"identity"), &sealed)
            .await;

        assert!(matches!(
            result,
            Err(KeyReleaseError::QuorumNotReached { responded: 0, threshold: 1 })
        ));
    }

    #[tokio::test]
    async fn wrong_identity_is_malformed() {
        let (concrete, dynamic) = servers(vec![LocalKeyServer::new(1, PACKAGE)]);
        concrete[0].allow(VIEWER);
        let client = client(dynamic, 1);

        let sealed = client.encrypt(b"post-1", b"secret").await.unwrap();
        let result = client
            .decrypt(&credential(), b"post-2", &approval(b"post-2"), &sealed)
            .await;

        assert!(matches!(result, Err(KeyReleaseError::MalformedCiphertext(_))));
        assert_eq!(concrete[0].fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let (_, dynamic) = servers(vec![LocalKeyServer::new(1, PACKAGE)]);
        let result = client(dynamic, 1)
            .decrypt(&credential(), b"identity", &approval(b"identity"), b"{\"version\":1}")
            .await;

        assert!(matches!(result, Err(KeyReleaseError::MalformedCiphertext(_))));
    }

    #[test]
    fn threshold_must_fit_servers() {
        let (_, dynamic) = servers(vec![LocalKeyServer::new(1, PACKAGE)]);
        assert!(SealClient::new(ObjectID::new(PACKAGE), dynamic, 2).is_err());
    }
}
