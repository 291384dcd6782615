//! TLS 1.2 PRF / P_hash (RFC 5246 §5), pulled out as a standalone,
//! directly testable primitive instead of being inlined into the key
//! schedule.

use crate::crypto::hasher::HasherFactory;
use crate::crypto::hmac::HMAC;

/// `A(0) = seed; A(i) = HMAC(secret, A(i-1))`.
fn hmac_hash(secret: &[u8], data: &[u8], hash: &HasherFactory) -> Vec<u8> {
    HMAC::new(hash.clone(), secret).finish_with(data)
}

/// `P_hash(secret, seed) = HMAC(secret, A(1) || seed) ||
/// HMAC(secret, A(2) || seed) || ...` truncated to `output_size`.
pub fn p_hash(secret: &[u8], seed: &[u8], output_size: usize, hash: &HasherFactory) -> Vec<u8> {
    let mut out = Vec::with_capacity(output_size);

    let mut a = hmac_hash(secret, seed, hash);
    while out.len() < output_size {
        let mut input = a.clone();
        input.extend_from_slice(seed);
        let chunk = hmac_hash(secret, &input, hash);
        out.extend_from_slice(&chunk);

        a = hmac_hash(secret, &a, hash);
    }

    out.truncate(output_size);
    out
}

/// `PRF(secret, label, seed, out_len) = P_hash(secret, label || seed)`.
pub fn prf(secret: &[u8], label: &str, seed: &[u8], output_size: usize, hash: &HasherFactory) -> Vec<u8> {
    let mut data = Vec::with_capacity(label.len() + seed.len());
    data.extend_from_slice(label.as_bytes());
    data.extend_from_slice(seed);
    p_hash(secret, &data, output_size, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hasher::GetHasherFactory;
    use crate::crypto::sha256::SHA256Hasher;

    #[test]
    fn prf_is_deterministic() {
        let hash = SHA256Hasher::factory();
        let a = prf(b"secret", "master secret", b"seed-bytes", 48, &hash);
        let b = prf(b"secret", "master secret", b"seed-bytes", 48, &hash);
        assert_eq!(a, b);
        assert_eq!(a.len(), 48);
    }

    #[test]
    fn prf_output_is_label_and_seed_sensitive() {
        let hash = SHA256Hasher::factory();
        let a = prf(b"secret", "master secret", b"seed-bytes", 48, &hash);
        let b = prf(b"secret", "key expansion", b"seed-bytes", 48, &hash);
        let c = prf(b"secret", "master secret", b"other-seed", 48, &hash);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
