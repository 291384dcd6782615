//! CBC record cipher endpoint state: MAC-then-encrypt sealing/opening for
//! one direction of a connection, keyed on sequence number (see
//! DESIGN.md).

use bytes::Bytes;

use crate::crypto::cbc::{aes_cipher, cbc_decrypt, cbc_encrypt, pad, unpad, BlockCipher, BLOCK_SIZE};
use crate::crypto::constant_time::constant_time_eq;
use crate::crypto::hasher::HasherFactory;
use crate::crypto::hmac::HMAC;
use crate::crypto::random::secure_random_bytes;
use crate::errors::*;
use crate::tls::record::ContentType;
use zeroize::Zeroize;

/// One direction's (read or write) active cipher state for a CBC suite,
/// installed when the corresponding ChangeCipherSpec takes effect. The
/// MAC key is scrubbed on drop; the enc key schedule is scrubbed by
/// `cipher`'s own zeroizing `Drop` impl (see `crypto::cbc`).
pub struct CbcCipherEndpoint {
    mac_key: Vec<u8>,
    cipher: Box<dyn BlockCipher>,
    hasher_factory: HasherFactory,
}

impl Drop for CbcCipherEndpoint {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

impl CbcCipherEndpoint {
    pub fn new(mac_key: Vec<u8>, enc_key: Vec<u8>, hasher_factory: HasherFactory) -> Result<Self> {
        Ok(Self {
            mac_key,
            cipher: aes_cipher(&enc_key)?,
            hasher_factory,
        })
    }

    /// `seq_num || type || version || len(F) || F`, the MAC input defined
    /// in RFC 5246 §6.2.3.1.
    fn mac_input(seq_num: u64, typ: ContentType, version: u16, fragment: &[u8]) -> Vec<u8> {
        let mut input = Vec::with_capacity(8 + 1 + 2 + 2 + fragment.len());
        input.extend_from_slice(&seq_num.to_be_bytes());
        input.push(typ.to_u8());
        input.extend_from_slice(&version.to_be_bytes());
        input.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
        input.extend_from_slice(fragment);
        input
    }

    /// Encrypts one record fragment: MAC, pad, then CBC-encrypt under a
    /// fresh explicit IV.
    pub fn seal(&self, seq_num: u64, typ: ContentType, version: u16, fragment: &[u8]) -> Result<Bytes> {
        let mac_input = Self::mac_input(seq_num, typ, version, fragment);
        let mac = HMAC::new(self.hasher_factory.clone(), &self.mac_key).finish_with(&mac_input);

        let mut plaintext = Vec::with_capacity(fragment.len() + mac.len());
        plaintext.extend_from_slice(fragment);
        plaintext.extend_from_slice(&mac);
        let padded = pad(&plaintext, BLOCK_SIZE);

        let explicit_iv = secure_random_bytes(BLOCK_SIZE)?;
        let ciphertext = cbc_encrypt(self.cipher.as_ref(), &explicit_iv, &padded)?;

        let mut out = Vec::with_capacity(explicit_iv.len() + ciphertext.len());
        out.extend_from_slice(&explicit_iv);
        out.extend_from_slice(&ciphertext);
        Ok(Bytes::from(out))
    }

    /// Decrypts and verifies one record fragment. Any failure (padding or
    /// MAC) returns `BadRecordMac`; the two are deliberately not
    /// distinguished upward to avoid a padding oracle.
    pub fn open(&self, seq_num: u64, typ: ContentType, version: u16, ciphertext: &[u8]) -> Result<Bytes> {
        if ciphertext.len() < BLOCK_SIZE * 2 {
            return Err(TlsError::BadRecordMac.into());
        }

        let (explicit_iv, rest) = ciphertext.split_at(BLOCK_SIZE);
        let decrypted = cbc_decrypt(self.cipher.as_ref(), explicit_iv, rest)?;
        let unpadded = unpad(&decrypted, BLOCK_SIZE)?;

        let mac_len = self.hasher_factory.create().output_size();
        if unpadded.len() < mac_len {
            return Err(TlsError::BadRecordMac.into());
        }
        let (fragment, received_mac) = unpadded.split_at(unpadded.len() - mac_len);

        let mac_input = Self::mac_input(seq_num, typ, version, fragment);
        let expected_mac = HMAC::new(self.hasher_factory.clone(), &self.mac_key).finish_with(&mac_input);

        if !constant_time_eq(&expected_mac, received_mac) {
            return Err(TlsError::BadRecordMac.into());
        }

        Ok(Bytes::copy_from_slice(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hasher::GetHasherFactory;
    use crate::crypto::sha256::SHA256Hasher;

    fn endpoint() -> CbcCipherEndpoint {
        CbcCipherEndpoint::new(vec![0x11u8; 32], vec![0x22u8; 16], SHA256Hasher::factory()).unwrap()
    }

    // Flipping any bit in a ciphertext record causes BadRecordMac.
    #[test]
    fn tampered_ciphertext_is_rejected() {
        let endpoint = endpoint();
        let mut ciphertext = endpoint
            .seal(0, ContentType::ApplicationData, 0xfefd, b"hello")
            .unwrap()
            .to_vec();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        let result = endpoint.open(0, ContentType::ApplicationData, 0xfefd, &ciphertext);
        assert!(result.is_err());
    }

    #[test]
    fn seal_open_round_trip() {
        let endpoint = endpoint();
        let ciphertext = endpoint
            .seal(7, ContentType::ApplicationData, 0xfefd, b"application payload")
            .unwrap();
        let plaintext = endpoint
            .open(7, ContentType::ApplicationData, 0xfefd, &ciphertext)
            .unwrap();
        assert_eq!(&plaintext[..], b"application payload");
    }

    #[test]
    fn wrong_sequence_number_fails_mac() {
        let endpoint = endpoint();
        let ciphertext = endpoint
            .seal(1, ContentType::ApplicationData, 0xfefd, b"payload")
            .unwrap();
        let result = endpoint.open(2, ContentType::ApplicationData, 0xfefd, &ciphertext);
        assert!(result.is_err());
    }
}
