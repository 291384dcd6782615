//! Shared record/transcript plumbing used by both `client.rs` and
//! `server.rs` to send and receive handshake flights. Neither role's
//! driver owns transport I/O directly -- each is handed a `Transport` so
//! the same driver runs over a real UDP socket or an in-memory pair in
//! tests. A single send/recv trait covers both roles since DTLS has no
//! separate half-close.

use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::Reader;
use crate::errors::*;
use crate::tls::alert::{Alert, AlertLevel};
use crate::tls::handshake::{Handshake, HandshakeHeader, HandshakeType};
use crate::tls::record::{ContentType, Record};
use crate::tls::record_stream::{Delivery, RecordReader, RecordWriter};
use crate::tls::transcript::Transcript;

/// The unit of datagram I/O a handshake driver needs. A DTLS transport
/// delivers one record (or coalesced flight) per `recv`; a TLS transport
/// may need to be fed through a stream framer upstream, out of scope here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, data: &[u8]) -> Result<()>;
    async fn recv(&self) -> Result<Vec<u8>>;
}

/// What `FlightIo::recv_handshake` can hand back: either the next
/// handshake message, or notice that a ChangeCipherSpec record arrived.
/// CCS is not itself a handshake message but gates the next one, which
/// must arrive under the new read cipher.
pub enum Incoming {
    Handshake(Handshake),
    ChangeCipherSpec,
}

/// Bundles the per-direction record state and the running transcript hash
/// that both `client.rs` and `server.rs` thread through a handshake.
pub struct FlightIo {
    pub writer: RecordWriter,
    pub reader: RecordReader,
    pub transcript: Transcript,
    pub is_dtls: bool,
}

impl FlightIo {
    pub fn new(is_dtls: bool, version: u16) -> Self {
        Self {
            writer: RecordWriter::new(is_dtls, version),
            reader: RecordReader::new(is_dtls),
            transcript: Transcript::new(),
            is_dtls,
        }
    }

    /// Frames, transcripts, and sends one handshake message.
    pub async fn send_handshake(&mut self, transport: &dyn Transport, message: &Handshake) -> Result<()> {
        let mut body = Vec::new();
        message.serialize_body(&mut body, self.is_dtls);
        let fragment = self.writer.build_handshake_fragment(message.typ().to_u8(), &body);
        self.transcript.push(fragment.clone());
        let record = self.writer.send_record(ContentType::Handshake, &fragment)?;
        transport.send(&record).await
    }

    /// Sends the single-byte ChangeCipherSpec record under the *current*
    /// (pre-rotation) write cipher, then the caller rotates the write
    /// epoch via `self.writer.activate_cipher`.
    pub async fn send_change_cipher_spec(&mut self, transport: &dyn Transport) -> Result<()> {
        let record = self.writer.send_record(ContentType::ChangeCipherSpec, &[1u8])?;
        transport.send(&record).await
    }

    /// Sends a fatal alert best-effort; errors from the send itself are
    /// swallowed since the connection is already being torn down.
    pub async fn send_fatal_alert(&mut self, transport: &dyn Transport, description: crate::tls::alert::AlertDescription) {
        let alert = Alert::fatal(description);
        let mut body = Vec::new();
        alert.serialize(&mut body);
        if let Ok(record) = self.writer.send_record(ContentType::Alert, &body) {
            let _ = transport.send(&record).await;
        }
    }

    /// Reads datagrams from `transport` until one yields an accepted
    /// handshake or ChangeCipherSpec delivery. Replayed/stale records are
    /// dropped silently; peer alerts are either logged (warning) or
    /// turned into an error (fatal).
    pub async fn recv_handshake(&mut self, transport: &dyn Transport) -> Result<Incoming> {
        loop {
            let datagram = transport.recv().await?;
            let mut reader = Reader::new(Bytes::from(datagram));
            let record = Record::parse(&mut reader, self.is_dtls)
                .map_err(|e| TlsError::MalformedRecord(e.to_string()))?;

            let delivery = self.reader.recv_record(record)?;
            let (typ, fragment) = match delivery {
                Delivery::Dropped => continue,
                Delivery::Accepted { typ, fragment } => (typ, fragment),
            };

            match typ {
                ContentType::Handshake => {
                    let mut body_reader = Reader::new(fragment.clone());
                    let header = if self.is_dtls {
                        HandshakeHeader::parse_dtls(&mut body_reader)?
                    } else {
                        HandshakeHeader::parse_tls(&mut body_reader)?
                    };
                    let body = body_reader.read_bytes(body_reader.remaining())?;
                    self.transcript.push(fragment.to_vec());
                    let message = Handshake::parse_body(HandshakeType::from_u8(header.typ), body, self.is_dtls)?;
                    return Ok(Incoming::Handshake(message));
                }
                ContentType::ChangeCipherSpec => return Ok(Incoming::ChangeCipherSpec),
                ContentType::Alert => {
                    let mut alert_reader = Reader::new(fragment);
                    let alert = Alert::parse(&mut alert_reader)?;
                    match alert.level {
                        AlertLevel::Fatal => return Err(TlsError::PeerAlert(alert.description).into()),
                        _ => {
                            log::warn!("received warning alert: {:?}", alert.description);
                            continue;
                        }
                    }
                }
                ContentType::ApplicationData => {
                    return Err(TlsError::UnexpectedMessage("application data during handshake".into()).into());
                }
                ContentType::Unknown(v) => {
                    return Err(TlsError::UnexpectedMessage(format!("unknown content type {}", v)).into());
                }
            }
        }
    }
}
