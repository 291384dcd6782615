//! A uniform Diffie-Hellman capability shared by the NIST curves and
//! x25519, so the handshake engine's key-exchange code
//! (`tls::handshake_executor`) does not need to special-case which named
//! group it negotiated.

use crate::errors::*;

/// Not a public/private key system on its own -- just ephemeral shared
/// secret agreement, as used for (EC)DHE key exchange.
pub trait DiffieHellmanFn: Send + Sync {
    /// Generates a secret value for this function. Never sent to the peer.
    fn secret_value(&self) -> Result<Vec<u8>>;

    /// For a secret value, produces the corresponding public value that
    /// *can* be safely sent to the peer.
    fn public_value(&self, secret: &[u8]) -> Result<Vec<u8>>;

    /// Given our secret and the peer's public value, produces the shared
    /// secret known to both parties.
    fn shared_secret(&self, secret: &[u8], peer_public: &[u8]) -> Result<Vec<u8>>;
}
