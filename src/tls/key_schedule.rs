//! TLS 1.2 key schedule: master secret derivation, key block expansion
//! (RFC 5246 §6.3), and Finished verify_data. Takes an explicit MAC key
//! length so CBC suites get working `client_mac`/`server_mac` keys, and
//! supports the RFC 7627 extended master secret path.

use crate::crypto::hasher::HasherFactory;
use crate::crypto::prf::prf;

pub struct KeyBlock {
    pub client_mac: Vec<u8>,
    pub server_mac: Vec<u8>,
    pub client_enc: Vec<u8>,
    pub server_enc: Vec<u8>,
    pub client_iv: Vec<u8>,
    pub server_iv: Vec<u8>,
}

/// Derives the 48-byte master secret. When `extended_ms` is set, label is
/// `"extended master secret"` and seed is the handshake hash taken at
/// key-exchange completion (RFC 7627); otherwise label is
/// `"master secret"` and seed is `client_random || server_random`.
pub fn derive_master_secret(
    premaster: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    extended_ms: bool,
    handshake_hash_so_far: &[u8],
    hash: &HasherFactory,
) -> Vec<u8> {
    if extended_ms {
        prf(premaster, "extended master secret", handshake_hash_so_far, 48, hash)
    } else {
        let mut seed = Vec::with_capacity(64);
        seed.extend_from_slice(client_random);
        seed.extend_from_slice(server_random);
        prf(premaster, "master secret", &seed, 48, hash)
    }
}

/// Expands the key block: seed is `server_random || client_random`, label
/// is `"key expansion"`, sliced in order into
/// `{client_mac, server_mac, client_enc, server_enc, client_iv, server_iv}`.
pub fn derive_key_block(
    master_secret: &[u8],
    server_random: &[u8; 32],
    client_random: &[u8; 32],
    hash: &HasherFactory,
    mac_key_len: usize,
    enc_key_len: usize,
    iv_len: usize,
) -> KeyBlock {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let total = mac_key_len * 2 + enc_key_len * 2 + iv_len * 2;
    let mut block = prf(master_secret, "key expansion", &seed, total, hash).into_iter();

    let mut take = |n: usize| -> Vec<u8> { block.by_ref().take(n).collect() };

    KeyBlock {
        client_mac: take(mac_key_len),
        server_mac: take(mac_key_len),
        client_enc: take(enc_key_len),
        server_enc: take(enc_key_len),
        client_iv: take(iv_len),
        server_iv: take(iv_len),
    }
}

/// 12-byte PRF output over the handshake transcript hash, using
/// `"client finished"` or `"server finished"` as the label.
pub fn finished_verify_data(master_secret: &[u8], label: &str, handshake_hash: &[u8], hash: &HasherFactory) -> Vec<u8> {
    prf(master_secret, label, handshake_hash, 12, hash)
}

pub const CLIENT_FINISHED_LABEL: &str = "client finished";
pub const SERVER_FINISHED_LABEL: &str = "server finished";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hasher::GetHasherFactory;
    use crate::crypto::sha256::SHA256Hasher;

    // Identical randoms, differing extended_ms flag must produce
    // different master secrets.
    #[test]
    fn extended_master_secret_differs_from_plain() {
        let hash = SHA256Hasher::factory();
        let premaster = [0x07u8; 32];
        let client_random = [0x01u8; 32];
        let server_random = [0x02u8; 32];
        let transcript_hash = [0x09u8; 32];

        let plain = derive_master_secret(&premaster, &client_random, &server_random, false, &transcript_hash, &hash);
        let extended =
            derive_master_secret(&premaster, &client_random, &server_random, true, &transcript_hash, &hash);

        assert_eq!(plain.len(), 48);
        assert_eq!(extended.len(), 48);
        assert_ne!(plain, extended);
    }

    #[test]
    fn key_block_is_deterministic_and_correctly_sized() {
        let hash = SHA256Hasher::factory();
        let master = [0x55u8; 48];
        let client_random = [0x03u8; 32];
        let server_random = [0x04u8; 32];

        let a = derive_key_block(&master, &server_random, &client_random, &hash, 32, 16, 0);
        let b = derive_key_block(&master, &server_random, &client_random, &hash, 32, 16, 0);

        assert_eq!(a.client_mac, b.client_mac);
        assert_eq!(a.client_mac.len(), 32);
        assert_eq!(a.client_enc.len(), 16);
        assert_eq!(a.client_iv.len(), 0);
        assert_ne!(a.client_mac, a.server_mac);
        assert_ne!(a.client_enc, a.server_enc);
    }

    #[test]
    fn verify_data_is_12_bytes_and_side_specific() {
        let hash = SHA256Hasher::factory();
        let master = [0x11u8; 48];
        let transcript_hash = [0x22u8; 32];

        let client_vd = finished_verify_data(&master, CLIENT_FINISHED_LABEL, &transcript_hash, &hash);
        let server_vd = finished_verify_data(&master, SERVER_FINISHED_LABEL, &transcript_hash, &hash);

        assert_eq!(client_vd.len(), 12);
        assert_ne!(client_vd, server_vd);
    }
}
