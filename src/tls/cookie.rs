//! DTLS stateless cookie exchange (RFC 6347 §4.2.1): the server never
//! keeps per-client state before a second ClientHello proves address
//! ownership. The cookie binds `(peer_address, client_random)` with an
//! HMAC under a server-held secret so it can be verified without storing
//! anything.

use crate::crypto::constant_time::constant_time_eq;
use crate::crypto::hasher::{GetHasherFactory, HasherFactory};
use crate::crypto::hmac::HMAC;
use crate::crypto::sha256::SHA256Hasher;

/// Server-side cookie secret, generated once per `ConnectionManager` and
/// reused across all peers.
#[derive(Clone)]
pub struct CookieSecret {
    key: Vec<u8>,
    hasher_factory: HasherFactory,
}

impl CookieSecret {
    pub fn new(key: Vec<u8>) -> Self {
        Self {
            key,
            hasher_factory: SHA256Hasher::factory(),
        }
    }

    /// `HMAC(server_secret, peer_address || client_random)`, truncated to
    /// 16 bytes -- long enough to resist forgery, short enough to keep
    /// `HelloVerifyRequest` well under the MTU.
    pub fn generate(&self, peer_address: &str, client_random: &[u8; 32]) -> Vec<u8> {
        let mut input = Vec::with_capacity(peer_address.len() + 32);
        input.extend_from_slice(peer_address.as_bytes());
        input.extend_from_slice(client_random);

        let mut mac = HMAC::new(self.hasher_factory.clone(), &self.key).finish_with(&input);
        mac.truncate(16);
        mac
    }

    /// Verifies a cookie presented in a second ClientHello against the
    /// `(peer_address, client_random)` pair observed for it.
    pub fn verify(&self, peer_address: &str, client_random: &[u8; 32], cookie: &[u8]) -> bool {
        let expected = self.generate(peer_address, client_random);
        constant_time_eq(&expected, cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_round_trips() {
        let secret = CookieSecret::new(vec![0x42; 32]);
        let random = [0x07u8; 32];
        let cookie = secret.generate("198.51.100.9:5684", &random);
        assert!(secret.verify("198.51.100.9:5684", &random, &cookie));
    }

    // A cookie minted for one peer address must not verify for another.
    #[test]
    fn cookie_is_bound_to_peer_address() {
        let secret = CookieSecret::new(vec![0x42; 32]);
        let random = [0x07u8; 32];
        let cookie = secret.generate("198.51.100.9:5684", &random);
        assert!(!secret.verify("203.0.113.5:5684", &random, &cookie));
    }

    #[test]
    fn cookie_is_bound_to_client_random() {
        let secret = CookieSecret::new(vec![0x42; 32]);
        let cookie = secret.generate("198.51.100.9:5684", &[0x07u8; 32]);
        assert!(!secret.verify("198.51.100.9:5684", &[0x08u8; 32], &cookie));
    }
}
