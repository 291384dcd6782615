//! Record layer read/write state: a `RecordReader`/`RecordWriter` pair,
//! each owning one direction's cipher state, for CBC suites over DTLS
//! epoch/sequence-number framing or TLS's implicit counter. Handshake
//! message fragmentation across multiple records is not supported: every
//! handshake message is assumed to fit in one DTLS fragment
//! (`fragment_offset == 0`, `fragment_length == length`).

use bytes::Bytes;

use crate::errors::*;
use crate::tls::cipher_endpoint::CbcCipherEndpoint;
use crate::tls::record::{ContentType, HandshakeHeader, Record};

/// Assembles the 8-byte MAC/replay sequence number: `(epoch, seq)` for
/// DTLS, or a flat 64-bit counter for TLS.
fn seq_num(is_dtls: bool, epoch: u16, seq: u64) -> u64 {
    if is_dtls {
        ((epoch as u64) << 48) | (seq & 0x0000_ffff_ffff_ffff)
    } else {
        seq
    }
}

pub struct RecordWriter {
    is_dtls: bool,
    version: u16,
    write_epoch: u16,
    write_seq: u64,
    cipher: Option<CbcCipherEndpoint>,
    message_seq: u16,
}

impl RecordWriter {
    pub fn new(is_dtls: bool, version: u16) -> Self {
        Self {
            is_dtls,
            version,
            write_epoch: 0,
            write_seq: 0,
            cipher: None,
            message_seq: 0,
        }
    }

    /// Installs the write-side cipher computed from the key block and
    /// atomically rotates the write epoch.
    pub fn activate_cipher(&mut self, cipher: CbcCipherEndpoint) {
        self.write_epoch += 1;
        self.write_seq = 0;
        self.cipher = Some(cipher);
    }

    /// Wraps a handshake body in its `{type, length, [message_seq,
    /// fragment_offset, fragment_length]}` header and returns the bytes fed
    /// to the transcript hash alongside the record to send.
    pub fn build_handshake_fragment(&mut self, typ: u8, body: &[u8]) -> Vec<u8> {
        let header = HandshakeHeader {
            typ,
            length: body.len() as u32,
            message_seq: self.message_seq,
            fragment_offset: 0,
            fragment_length: body.len() as u32,
        };
        self.message_seq += 1;

        let mut out = Vec::with_capacity(body.len() + 12);
        if self.is_dtls {
            header.serialize_dtls(&mut out);
        } else {
            header.serialize_tls(&mut out);
        }
        out.extend_from_slice(body);
        out
    }

    /// Frames and, if a cipher is active, seals `fragment` for content type
    /// `typ`, returning the bytes to write to the transport and advancing
    /// `write_seq`.
    pub fn send_record(&mut self, typ: ContentType, fragment: &[u8]) -> Result<Vec<u8>> {
        let seq = self.write_seq;
        self.write_seq += 1;

        let wire_fragment = match &self.cipher {
            Some(cipher) => {
                let sn = seq_num(self.is_dtls, self.write_epoch, seq);
                cipher.seal(sn, typ, self.version, fragment)?
            }
            None => Bytes::copy_from_slice(fragment),
        };

        let record = Record {
            typ,
            version: self.version,
            epoch_seq: if self.is_dtls {
                Some((self.write_epoch, seq))
            } else {
                None
            },
            fragment: wire_fragment,
        };

        let mut out = Vec::new();
        record.serialize(&mut out);
        Ok(out)
    }
}

pub struct RecordReader {
    is_dtls: bool,
    read_epoch: u16,
    next_receive_seq: u64,
    cipher: Option<CbcCipherEndpoint>,
}

/// Outcome of feeding one incoming record through the reader.
pub enum Delivery {
    /// Record accepted; `fragment` is the plaintext payload for `typ`.
    Accepted { typ: ContentType, fragment: Bytes },
    /// Record silently dropped as a replay or stale epoch; not an error,
    /// not reported upward.
    Dropped,
}

impl RecordReader {
    pub fn new(is_dtls: bool) -> Self {
        Self {
            is_dtls,
            read_epoch: 0,
            next_receive_seq: 0,
            cipher: None,
        }
    }

    /// Installs the read-side cipher and atomically rotates the read epoch.
    /// Mirrors `RecordWriter::activate_cipher`.
    pub fn activate_cipher(&mut self, cipher: CbcCipherEndpoint) {
        self.read_epoch += 1;
        self.next_receive_seq = 0;
        self.cipher = Some(cipher);
    }

    /// Applies replay filtering and, if active, decryption. On
    /// `BadRecordMac` the caller is responsible for emitting the fatal
    /// alert and terminating the connection.
    pub fn recv_record(&mut self, record: Record) -> Result<Delivery> {
        let (epoch, seq) = record.epoch_seq.unwrap_or((0, self.next_receive_seq));

        if self.is_dtls {
            if epoch < self.read_epoch || (epoch == self.read_epoch && seq < self.next_receive_seq) {
                return Ok(Delivery::Dropped);
            }
        } else if seq < self.next_receive_seq {
            return Ok(Delivery::Dropped);
        }

        let plaintext = match &self.cipher {
            Some(cipher) => {
                let sn = seq_num(self.is_dtls, epoch, seq);
                cipher.open(sn, record.typ, record.version, &record.fragment)?
            }
            None => record.fragment,
        };

        if !self.is_dtls || epoch == self.read_epoch {
            self.next_receive_seq = seq + 1;
        }

        Ok(Delivery::Accepted {
            typ: record.typ,
            fragment: plaintext,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sequence numbers strictly increase within an epoch.
    #[test]
    fn write_seq_increases_monotonically() {
        let mut writer = RecordWriter::new(true, 0xfefd);
        writer.send_record(ContentType::Handshake, b"one").unwrap();
        writer.send_record(ContentType::Handshake, b"two").unwrap();
        assert_eq!(writer.write_seq, 2);
    }

    // Replayed record yields no delivery.
    #[test]
    fn replayed_record_is_dropped() {
        let mut reader = RecordReader::new(true);
        let record = Record {
            typ: ContentType::ApplicationData,
            version: 0xfefd,
            epoch_seq: Some((0, 0)),
            fragment: Bytes::from_static(b"data"),
        };

        match reader.recv_record(record.clone()).unwrap() {
            Delivery::Accepted { .. } => {}
            Delivery::Dropped => panic!("first delivery should be accepted"),
        }

        match reader.recv_record(record).unwrap() {
            Delivery::Dropped => {}
            Delivery::Accepted { .. } => panic!("replay should be dropped"),
        }
    }
}
