//! Concrete `Hasher` backed by the `sha2` crate rather than a hand-rolled
//! compression function.

use sha2::{Digest, Sha256};

use crate::crypto::hasher::Hasher;

#[derive(Clone)]
pub struct SHA256Hasher {
    inner: Sha256,
}

impl Default for SHA256Hasher {
    fn default() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }
}

impl Hasher for SHA256Hasher {
    fn block_size(&self) -> usize {
        64
    }

    fn output_size(&self) -> usize {
        32
    }

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finish(&self) -> Vec<u8> {
        self.inner.clone().finalize().to_vec()
    }

    fn box_clone(&self) -> Box<dyn Hasher> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest() {
        let mut h = SHA256Hasher::default();
        let digest = h.finish_with(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn abc_digest() {
        let mut h = SHA256Hasher::default();
        let digest = h.finish_with(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
