//! Cipher suite registry: the three CBC suites this endpoint negotiates
//! (`TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256 = 0xc023` and friends). Other
//! codepoints parse (for error reporting) but are rejected by `decode()`.

use crate::crypto::hasher::{GetHasherFactory, HasherFactory};
use crate::crypto::sha256::SHA256Hasher;
use crate::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    TlsEcdhAnonWithAes128CbcSha256,
    TlsEcdheEcdsaWithAes128CbcSha256,
    TlsEcdhePskWithAes128CbcSha256,
    Unknown(u16),
}

impl CipherSuite {
    pub fn to_u16(&self) -> u16 {
        match self {
            CipherSuite::TlsEcdhAnonWithAes128CbcSha256 => 0xc038,
            CipherSuite::TlsEcdheEcdsaWithAes128CbcSha256 => 0xc023,
            CipherSuite::TlsEcdhePskWithAes128CbcSha256 => 0xc037,
            CipherSuite::Unknown(v) => *v,
        }
    }

    pub fn from_u16(v: u16) -> Self {
        match v {
            0xc038 => CipherSuite::TlsEcdhAnonWithAes128CbcSha256,
            0xc023 => CipherSuite::TlsEcdheEcdsaWithAes128CbcSha256,
            0xc037 => CipherSuite::TlsEcdhePskWithAes128CbcSha256,
            _ => CipherSuite::Unknown(v),
        }
    }

    pub fn key_exchange(&self) -> Result<KeyExchangeFamily> {
        Ok(match self {
            CipherSuite::TlsEcdhAnonWithAes128CbcSha256 => KeyExchangeFamily::EcdhAnon,
            CipherSuite::TlsEcdheEcdsaWithAes128CbcSha256 => KeyExchangeFamily::EcdheEcdsa,
            CipherSuite::TlsEcdhePskWithAes128CbcSha256 => KeyExchangeFamily::EcdhePsk,
            CipherSuite::Unknown(_) => return Err(TlsError::UnsupportedCipher.into()),
        })
    }

    /// Bulk cipher key length, MAC key length, and fixed IV length (here
    /// always 0: CBC uses a per-record explicit IV, not a fixed IV) plus
    /// the PRF/transcript hash factory.
    pub fn decode(&self) -> Result<CipherSuiteParams> {
        match self {
            CipherSuite::TlsEcdhAnonWithAes128CbcSha256
            | CipherSuite::TlsEcdheEcdsaWithAes128CbcSha256
            | CipherSuite::TlsEcdhePskWithAes128CbcSha256 => Ok(CipherSuiteParams {
                enc_key_len: 16,
                mac_key_len: 32,
                fixed_iv_len: 0,
                block_size: 16,
                hasher_factory: SHA256Hasher::factory(),
            }),
            CipherSuite::Unknown(_) => Err(TlsError::UnsupportedCipher.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeFamily {
    EcdhAnon,
    EcdheEcdsa,
    EcdhePsk,
}

pub struct CipherSuiteParams {
    pub enc_key_len: usize,
    pub mac_key_len: usize,
    pub fixed_iv_len: usize,
    pub block_size: usize,
    pub hasher_factory: HasherFactory,
}
