//! Connection configuration for both roles, covering the three
//! cipher-suite families this crate negotiates.
//!
//! No Certificate message is modeled: the ECDHE_ECDSA server's long-term
//! public key is pinned directly on the client side
//! (`ClientOptions::server_public_key`) rather than delivered over the
//! wire and validated against a trust store.

use std::sync::Arc;

use crate::tls::cipher_suite::CipherSuite;
use crate::tls::cookie::CookieSecret;
use crate::tls::psk::PskStore;

/// Options shared by both roles: the negotiable surface common to a
/// connection before any per-role key material.
#[derive(Clone)]
pub struct CommonOptions {
    /// Offered/accepted cipher suites, in preference order.
    pub cipher_suites: Vec<CipherSuite>,
    /// Accepted `ProtocolVersion`s, e.g. `[0xfefd]` for DTLS 1.2 only.
    pub allowed_versions: Vec<u16>,
    /// Accepted named groups (RFC 4492 registry values), in preference
    /// order.
    pub allowed_curves: Vec<u16>,
    /// Whether to offer/require the extended master secret extension
    /// (RFC 7627).
    pub extended_master_secret: bool,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            cipher_suites: vec![
                CipherSuite::TlsEcdheEcdsaWithAes128CbcSha256,
                CipherSuite::TlsEcdhePskWithAes128CbcSha256,
                CipherSuite::TlsEcdhAnonWithAes128CbcSha256,
            ],
            allowed_versions: vec![crate::tls::record::DTLS_1_2_VERSION],
            allowed_curves: vec![23, 24, 25, 29], // secp256r1, secp384r1, secp521r1, x25519
            extended_master_secret: true,
        }
    }
}

/// Client-role configuration.
#[derive(Clone)]
pub struct ClientOptions {
    pub common: CommonOptions,
    /// Long-term ECDSA public key of the server, SEC1-uncompressed-point
    /// encoded, required when an `EcdheEcdsa` suite is offered (see module
    /// doc comment).
    pub server_public_key: Option<Vec<u8>>,
    /// PSK identity and key this client will offer for `EcdhePsk` suites.
    pub psk_identity: Option<(Vec<u8>, Vec<u8>)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            common: CommonOptions::default(),
            server_public_key: None,
            psk_identity: None,
        }
    }
}

/// Server-role configuration.
#[derive(Clone)]
pub struct ServerOptions {
    pub common: CommonOptions,
    /// Long-term ECDSA private key, SEC1 scalar bytes, required when an
    /// `EcdheEcdsa` suite is enabled.
    pub ecdsa_private_key: Option<Vec<u8>>,
    /// Identity database backing `EcdhePsk` suites.
    pub psk_store: Option<Arc<dyn PskStore>>,
    /// Cookie HMAC secret for the DTLS stateless-cookie exchange. Required
    /// whenever the server runs over DTLS.
    pub cookie_secret: Option<CookieSecret>,
}

impl ServerOptions {
    pub fn new(cookie_secret: CookieSecret) -> Self {
        Self {
            common: CommonOptions::default(),
            ecdsa_private_key: None,
            psk_store: None,
            cookie_secret: Some(cookie_secret),
        }
    }
}
