//! CBC-mode bulk cipher and TLS 1.2 padding. A minimal `BlockCipher` trait
//! (`encrypt_block`/`decrypt_block`) wraps the concrete AES round function
//! from the `aes` crate; CBC chaining and padding are built on top of it
//! (see DESIGN.md).

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use generic_array::GenericArray;

use crate::errors::*;

pub const BLOCK_SIZE: usize = 16;

pub trait BlockCipher: Send + Sync {
    fn block_size(&self) -> usize;
    fn encrypt_block(&self, block: &[u8], out: &mut [u8]);
    fn decrypt_block(&self, block: &[u8], out: &mut [u8]);
}

pub struct Aes128Cipher(Aes128);

impl Aes128Cipher {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 16 {
            return Err(err_msg("AES-128 key must be 16 bytes"));
        }
        Ok(Self(Aes128::new(GenericArray::from_slice(key))))
    }
}

impl BlockCipher for Aes128Cipher {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &[u8], out: &mut [u8]) {
        let mut b = GenericArray::clone_from_slice(block);
        self.0.encrypt_block(&mut b);
        out.copy_from_slice(&b);
    }

    fn decrypt_block(&self, block: &[u8], out: &mut [u8]) {
        let mut b = GenericArray::clone_from_slice(block);
        self.0.decrypt_block(&mut b);
        out.copy_from_slice(&b);
    }
}

pub struct Aes256Cipher(Aes256);

impl Aes256Cipher {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(err_msg("AES-256 key must be 32 bytes"));
        }
        Ok(Self(Aes256::new(GenericArray::from_slice(key))))
    }
}

impl BlockCipher for Aes256Cipher {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &[u8], out: &mut [u8]) {
        let mut b = GenericArray::clone_from_slice(block);
        self.0.encrypt_block(&mut b);
        out.copy_from_slice(&b);
    }

    fn decrypt_block(&self, block: &[u8], out: &mut [u8]) {
        let mut b = GenericArray::clone_from_slice(block);
        self.0.decrypt_block(&mut b);
        out.copy_from_slice(&b);
    }
}

/// Builds an AES block cipher of the appropriate key size.
pub fn aes_cipher(key: &[u8]) -> Result<Box<dyn BlockCipher>> {
    match key.len() {
        16 => Ok(Box::new(Aes128Cipher::new(key)?)),
        32 => Ok(Box::new(Aes256Cipher::new(key)?)),
        _ => Err(err_msg("unsupported AES key length")),
    }
}

/// Encrypts `plaintext` (already padded to a multiple of the block size) in
/// CBC mode with the given IV.
pub fn cbc_encrypt(cipher: &dyn BlockCipher, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    if iv.len() != block_size {
        return Err(err_msg("IV length must equal block size"));
    }
    if plaintext.len() % block_size != 0 {
        return Err(err_msg("plaintext length must be a multiple of the block size"));
    }

    let mut out = Vec::with_capacity(plaintext.len());
    let mut prev: Vec<u8> = iv.to_vec();

    for block in plaintext.chunks(block_size) {
        let mut xored = vec![0u8; block_size];
        for i in 0..block_size {
            xored[i] = block[i] ^ prev[i];
        }
        let mut enc = vec![0u8; block_size];
        cipher.encrypt_block(&xored, &mut enc);
        out.extend_from_slice(&enc);
        prev = enc;
    }

    Ok(out)
}

/// Inverse of `cbc_encrypt`.
pub fn cbc_decrypt(cipher: &dyn BlockCipher, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    if iv.len() != block_size {
        return Err(err_msg("IV length must equal block size"));
    }
    if ciphertext.len() % block_size != 0 || ciphertext.is_empty() {
        return Err(err_msg("ciphertext length must be a non-zero multiple of the block size"));
    }

    let mut out = Vec::with_capacity(ciphertext.len());
    let mut prev: Vec<u8> = iv.to_vec();

    for block in ciphertext.chunks(block_size) {
        let mut dec = vec![0u8; block_size];
        cipher.decrypt_block(block, &mut dec);
        let mut plain = vec![0u8; block_size];
        for i in 0..block_size {
            plain[i] = dec[i] ^ prev[i];
        }
        out.extend_from_slice(&plain);
        prev = block.to_vec();
    }

    Ok(out)
}

/// Applies the TLS 1.2 CBC padding scheme (RFC 5246 §6.2.3.2): append
/// `pad + 1` bytes, each holding the value `pad`, where `pad` is chosen so
/// the total length becomes a multiple of `block_size`.
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - 1 - (data.len() % block_size);
    let mut out = Vec::with_capacity(data.len() + pad_len + 1);
    out.extend_from_slice(data);
    out.resize(out.len() + pad_len + 1, pad_len as u8);
    out
}

/// Verifies and strips TLS 1.2 CBC padding in constant time over the
/// padding region. Returns `BadRecordMac` (not a more specific decode
/// error) on any mismatch, since a padding oracle must not be distinguishable
/// from a MAC failure.
pub fn unpad(data: &[u8], block_size: usize) -> Result<&[u8]> {
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(TlsError::BadRecordMac.into());
    }

    let pad_len = data[data.len() - 1] as usize;
    if pad_len >= data.len() {
        return Err(TlsError::BadRecordMac.into());
    }

    let pad_region = &data[data.len() - pad_len - 1..];
    let mut mismatch: u8 = 0;
    for b in pad_region {
        mismatch |= b ^ (pad_len as u8);
    }

    if mismatch != 0 {
        return Err(TlsError::BadRecordMac.into());
    }

    Ok(&data[..data.len() - pad_len - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbc_round_trip() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let cipher = aes_cipher(&key).unwrap();

        let plaintext = b"hello handshake!"; // exactly one block
        let padded = pad(plaintext, BLOCK_SIZE);
        let ciphertext = cbc_encrypt(cipher.as_ref(), &iv, &padded).unwrap();
        let decrypted = cbc_decrypt(cipher.as_ref(), &iv, &ciphertext).unwrap();
        let unpadded = unpad(&decrypted, BLOCK_SIZE).unwrap();

        assert_eq!(unpadded, plaintext);
    }

    #[test]
    fn bad_padding_is_rejected() {
        let mut padded = pad(b"abc", BLOCK_SIZE);
        let last = padded.len() - 1;
        padded[last] ^= 0xff;
        assert!(unpad(&padded, BLOCK_SIZE).is_err());
    }
}
