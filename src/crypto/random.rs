//! Secure random generation, drawing directly on the OS CSPRNG through
//! `getrandom`.

use crate::errors::*;

pub fn secure_random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    getrandom::getrandom(&mut buf).map_err(|e| format_err!("failed to read random bytes: {}", e))?;
    Ok(buf)
}

/// Builds a TLS 1.2 `Random` structure: 4-byte `gmt_unix_time` prefix
/// followed by 28 securely-random bytes.
pub fn tls_random() -> Result<[u8; 32]> {
    let mut out = [0u8; 32];
    let now = chrono::Utc::now().timestamp() as u32;
    out[0..4].copy_from_slice(&now.to_be_bytes());
    let tail = secure_random_bytes(28)?;
    out[4..32].copy_from_slice(&tail);
    Ok(out)
}
