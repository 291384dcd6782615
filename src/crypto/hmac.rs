//! RFC 2104 HMAC built on the `Hasher` trait. Kept hash-agnostic
//! (constructed from a `HasherFactory`) because the PRF (`crypto::prf`)
//! and key schedule (`tls::key_schedule`) are themselves hash-agnostic
//! over the cipher suite's PRF hash.

use crate::crypto::hasher::{Hasher, HasherFactory};

pub struct HMAC {
    derived_key: Vec<u8>,
    hash: HasherFactory,
    inner_hasher: Box<dyn Hasher>,
}

impl HMAC {
    pub fn new(hash: HasherFactory, key: &[u8]) -> Self {
        let mut inner_hasher = hash.create();
        let block_size = inner_hasher.block_size();

        let mut derived_key = vec![0u8; block_size];
        if key.len() > block_size {
            let digest = inner_hasher.finish_with(key);
            derived_key[0..digest.len()].copy_from_slice(&digest);
            inner_hasher = hash.create();
        } else {
            derived_key[0..key.len()].copy_from_slice(key);
        }

        let ipad: Vec<u8> = derived_key.iter().map(|b| b ^ 0x36).collect();
        inner_hasher.update(&ipad);

        Self {
            derived_key,
            hash,
            inner_hasher,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner_hasher.update(data);
    }

    pub fn finish(&self) -> Vec<u8> {
        let inner_digest = self.inner_hasher.finish();

        let opad: Vec<u8> = self.derived_key.iter().map(|b| b ^ 0x5c).collect();

        let mut outer_hasher = self.hash.create();
        outer_hasher.update(&opad);
        outer_hasher.update(&inner_digest);
        outer_hasher.finish()
    }

    pub fn finish_with(mut self, data: &[u8]) -> Vec<u8> {
        self.update(data);
        self.finish()
    }

    pub fn output_size(&self) -> usize {
        self.inner_hasher.output_size()
    }
}

/// One-shot `HMAC(secret, data)`, used throughout the PRF and record MAC.
pub fn hmac(hash: HasherFactory, secret: &[u8], data: &[u8]) -> Vec<u8> {
    HMAC::new(hash, secret).finish_with(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hasher::GetHasherFactory;
    use crate::crypto::sha256::SHA256Hasher;

    // RFC 4231 test case 2.
    #[test]
    fn hmac_sha256_rfc4231_case2() {
        let key = b"Jefe";
        let data = b"what do ya want for nothing?";
        let out = hmac(SHA256Hasher::factory(), key, data);
        assert_eq!(
            hex::encode(out),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
