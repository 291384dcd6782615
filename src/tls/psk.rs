//! Pre-shared key identity database for ECDHE_PSK. RFC 5489 §2 defines the
//! premaster secret as `len(Z) || Z || len(PSK) || PSK`, computed in
//! `handshake_executor.rs`'s `EcdhePsk` key-exchange impl; this module
//! only resolves an identity to its key.

use crate::errors::*;

/// Looks up the key bytes for a PSK identity presented in a
/// ClientKeyExchange (server side) or supplies the identity/key pair a
/// client will offer (client side).
pub trait PskStore: Send + Sync {
    fn key_for_identity(&self, identity: &[u8]) -> Result<Vec<u8>>;
}

/// A simple in-memory identity-to-key table, sufficient for the
/// single-peer and test deployments this crate targets.
#[derive(Clone, Default)]
pub struct StaticPskStore {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl StaticPskStore {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, identity: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) {
        self.entries.push((identity.into(), key.into()));
    }
}

impl PskStore for StaticPskStore {
    fn key_for_identity(&self, identity: &[u8]) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|(id, _)| id.as_slice() == identity)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| err_msg("unknown PSK identity"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_known_identity() {
        let mut store = StaticPskStore::new();
        store.insert(b"client1".to_vec(), b"topsecret".to_vec());
        assert_eq!(store.key_for_identity(b"client1").unwrap(), b"topsecret");
    }

    #[test]
    fn lookup_rejects_unknown_identity() {
        let store = StaticPskStore::new();
        assert!(store.key_for_identity(b"nobody").is_err());
    }
}
