//! Key identities.
//!
//! Content is encrypted under `service_address ‖ content_id (u64 LE)`. The
//! on-chain `seal_approve` check parses the same layout, so key servers
//! release keys only to viewers the service admits.

use client_blockchain_core::{KeyReleaseError, ObjectId};

/// Content id used for profile assets (avatar, banner).
pub const PROFILE_CONTENT_ID: u64 = 0;

pub const IDENTITY_LEN: usize = 40;

/// Build the identity bytes for `(service, content_id)`.
pub fn content_identity(service: &ObjectId, content_id: u64) -> Result<Vec<u8>, KeyReleaseError> {
    let address = service
        .to_bytes()
        .ok_or_else(|| KeyReleaseError::Encryption(format!("Invalid service id: {}", service)))?;

    let mut identity = Vec::with_capacity(IDENTITY_LEN);
    identity.extend_from_slice(&address);
    identity.extend_from_slice(&content_id.to_le_bytes());
    Ok(identity)
}

/// Split identity bytes back into service address and content id.
pub fn parse_identity(identity: &[u8]) -> Option<([u8; 32], u64)> {
    if identity.len() != IDENTITY_LEN {
        return None;
    }
    let mut address = [0u8; 32];
    address.copy_from_slice(&identity[..32]);
    let mut id = [0u8; 8];
    id.copy_from_slice(&identity[32..]);
    Some((address, u64::from_le_bytes(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_layout() {
        let service = ObjectId::parse("0x6").unwrap();
        let identity = content_identity(&service, 7).unwrap();

        assert_eq!(identity.len(), IDENTITY_LEN);
        assert_eq!(identity[31], 6);
        assert_eq!(&identity[32..], &7u64.to_le_bytes());
        assert_eq!(parse_identity(&identity), Some((service.to_bytes().unwrap(), 7)));
    }

    #[test]
    fn invalid_service_is_rejected() {
        assert!(content_identity(&ObjectId::new("nope"), 0).is_err());
        assert!(parse_identity(&[0u8; 39]).is_none());
    }
}
