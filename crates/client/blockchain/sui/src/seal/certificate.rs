//! Session keys, certificates and request signatures.
//!
//! The wallet signs a personal message naming an ephemeral Ed25519 key once
//! per session. Every `fetch_key` request then carries that certificate and
//! a signature by the ephemeral key over the request contents.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signer, SigningKey};
use seal_crypto::elgamal;
use seal_crypto::ibe;
use serde::{Deserialize, Serialize};

use client_blockchain_core::{KeyReleaseError, SessionCredential, SessionKey};

/// ElGamal key the servers encrypt user secret keys to.
pub type ElGamalPublicKey = elgamal::PublicKey<ibe::UserSecretKey>;
pub type ElGamalSecretKey = elgamal::SecretKey<ibe::UserSecretKey>;
pub type ElGamalVerificationKey = elgamal::VerificationKey<ibe::PublicKey>;

/// Generate a fresh session key from the OS rng.
pub fn generate_session_key() -> SessionKey {
    let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
    SessionKey {
        public_key: STANDARD.encode(signing_key.verifying_key().as_bytes()),
        secret_key: signing_key.to_bytes().to_vec(),
    }
}

fn signing_key(session_key: &SessionKey) -> Result<SigningKey, KeyReleaseError> {
    let seed: [u8; 32] = session_key.secret_key.as_slice().try_into().map_err(|_| {
        KeyReleaseError::Encryption(format!(
            "session key has {} bytes, expected 32",
            session_key.secret_key.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Wallet certificate as key servers expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub user: String,
    /// Session verifying key (base64)
    pub session_vk: String,
    pub creation_time: u64,
    pub ttl_min: u16,
    /// Wallet personal-message signature (base64)
    pub signature: String,
    pub mvr_name: Option<String>,
}

impl Certificate {
    pub fn from_credential(credential: &SessionCredential) -> Result<Self, KeyReleaseError> {
        let ttl_min = u16::try_from(credential.ttl_ms / 60_000)
            .map_err(|_| KeyReleaseError::Encryption("session ttl out of range".to_string()))?;
        Ok(Self {
            user: credential.address.to_string(),
            session_vk: credential.session_key.public_key.clone(),
            creation_time: credential.created_at_ms,
            ttl_min,
            signature: credential.signature.clone(),
            mvr_name: None,
        })
    }
}

#[derive(Serialize)]
struct RequestFormat {
    ptb: Vec<u8>,
    enc_key: Vec<u8>,
    enc_verification_key: Vec<u8>,
}

/// Bytes the session key signs for one `fetch_key` request.
pub fn signed_request(
    ptb: &[u8],
    enc_key: &ElGamalPublicKey,
    enc_verification_key: &ElGamalVerificationKey,
) -> Result<Vec<u8>, KeyReleaseError> {
    let encode = |e: bcs::Error| KeyReleaseError::Encryption(e.to_string());
    let request = RequestFormat {
        ptb: ptb.to_vec(),
        enc_key: bcs::to_bytes(enc_key).map_err(encode)?,
        enc_verification_key: bcs::to_bytes(enc_verification_key).map_err(encode)?,
    };
    bcs::to_bytes(&request).map_err(encode)
}

/// Sign `message` with the session key. Returns base64.
pub fn sign_request(session_key: &SessionKey, message: &[u8]) -> Result<String, KeyReleaseError> {
    let signature = signing_key(session_key)?.sign(message);
    Ok(STANDARD.encode(signature.to_bytes()))
}

#[cfg(test)]
mod tests {
    use client_blockchain_core::{Address, ObjectId};
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    use super::*;

    fn credential(session_key: SessionKey) -> SessionCredential {
        SessionCredential {
            address: Address::new("0xaa"),
            package_id: ObjectId::new("0x1"),
            created_at_ms: 1_700_000_000_000,
            ttl_ms: 600_000,
            personal_message: String::new(),
            signature: "c2lnbmF0dXJl".to_string(),
            session_key,
        }
    }

    #[test]
    fn request_signature_verifies_under_session_key() {
        let session_key = generate_session_key();
        let signature = sign_request(&session_key, b"request").unwrap();

        let vk_bytes: [u8; 32] = STANDARD
            .decode(&session_key.public_key)
            .unwrap()
            .try_into()
            .unwrap();
        let sig_bytes: [u8; 64] = STANDARD.decode(signature).unwrap().try_into().unwrap();
        let verifying_key = VerifyingKey::from_bytes(&vk_bytes).unwrap();
        assert!(
            verifying_key
                .verify(b"request", &Signature::from_bytes(&sig_bytes))
                .is_ok()
        );
    }

    #[test]
    fn certificate_carries_session_fields() {
        let session_key = generate_session_key();
        let certificate = Certificate::from_credential(&credential(session_key.clone())).unwrap();

        assert_eq!(certificate.ttl_min, 10);
        assert_eq!(certificate.session_vk, session_key.public_key);
        assert_eq!(certificate.creation_time, 1_700_000_000_000);

        let json = serde_json::to_value(&certificate).unwrap();
        assert!(json["mvr_name"].is_null());
    }

    #[test]
    fn truncated_session_key_is_rejected() {
        let session_key = SessionKey {
            public_key: String::new(),
            secret_key: vec![1; 31],
        };
        assert!(sign_request(&session_key, b"x").is_err());
    }
}
