//! Handshake transcript hash: an ordered list of raw handshake message
//! bytes, hashed on demand rather than incrementally, so a hash can be
//! taken mid-handshake (for the extended master secret) without losing
//! the ability to keep appending.

use crate::crypto::hasher::HasherFactory;

#[derive(Default, Clone)]
pub struct Transcript {
    messages: Vec<Vec<u8>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    /// Appends one handshake message's raw bytes. Record-layer (DTLS
    /// epoch/sequence) fields are excluded, but the handshake body's own
    /// `{type, length, message_seq, fragment_offset, fragment_length}`
    /// header per message *is* included, matching RFC 6347 §4.2.6's
    /// feeding-hash-with-reassembled-message rule.
    pub fn push(&mut self, message: Vec<u8>) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn hash(&self, hasher_factory: &HasherFactory) -> Vec<u8> {
        let mut hasher = hasher_factory.create();
        for m in &self.messages {
            hasher.update(m);
        }
        hasher.finish()
    }
}
