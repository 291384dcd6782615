//! The per-peer session aggregate: tracks role, negotiated parameters, and
//! the pre-handshake `flight_buffer` a connection manager needs to queue
//! application data sent before the handshake completes.

use bytes::Bytes;

use crate::codec::Reader;
use crate::errors::*;
use crate::tls::alert::{Alert, AlertLevel};
use crate::tls::cipher_suite::CipherSuite;
use crate::tls::client::EstablishedConnection;
use crate::tls::flight::FlightIo;
use crate::tls::record::{ContentType, Record};
use crate::tls::record_stream::Delivery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Established,
    Closed,
}

/// What decrypting one post-handshake record yielded.
pub enum InboundEvent {
    /// An application-data payload, ready to hand up to the host.
    ApplicationData(Bytes),
    /// The peer sent a CloseNotify (or other warning alert); the
    /// connection should be torn down without treating it as an error.
    PeerClosed,
    /// A replayed or stale record; silently discarded.
    Dropped,
}

/// One peer's session. Owned exclusively by the `ConnectionManager`;
/// every other component only holds a transient reference scoped to a
/// single message.
pub struct Connection {
    pub peer_address: String,
    pub role: Role,
    pub state: ConnectionState,
    pub protocol_version: u16,
    pub cipher_suite: Option<CipherSuite>,
    io: Option<FlightIo>,
    /// Application payloads queued while the handshake is not yet complete.
    pub flight_buffer: Vec<Bytes>,
}

impl Connection {
    pub fn new(peer_address: String, role: Role, protocol_version: u16) -> Self {
        Self {
            peer_address,
            role,
            state: ConnectionState::Handshaking,
            protocol_version,
            cipher_suite: None,
            io: None,
            flight_buffer: Vec::new(),
        }
    }

    pub fn mark_established(&mut self, established: EstablishedConnection) {
        self.cipher_suite = Some(established.negotiated_cipher_suite);
        self.io = Some(established.io);
        self.state = ConnectionState::Established;
    }

    pub fn is_established(&self) -> bool {
        self.state == ConnectionState::Established
    }

    /// Encrypts and frames one application-data payload for sending.
    /// Errors if the handshake has not completed yet; the caller
    /// (connection manager) is responsible for buffering pre-handshake
    /// sends in `flight_buffer` instead of calling this.
    pub fn seal_application_data(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let io = self
            .io
            .as_mut()
            .ok_or_else(|| err_msg("connection has no active cipher state"))?;
        io.writer.send_record(ContentType::ApplicationData, payload)
    }

    /// Encrypts and frames `alert` under the current write cipher, if the
    /// handshake has completed. Returns `None` pre-handshake, since there
    /// is no cipher state yet to protect an alert under.
    pub fn seal_alert(&mut self, alert: Alert) -> Option<Vec<u8>> {
        let io = self.io.as_mut()?;
        let mut body = Vec::new();
        alert.serialize(&mut body);
        io.writer.send_record(ContentType::Alert, &body).ok()
    }

    /// Decrypts and dispatches one post-handshake record. Errors if the
    /// handshake has not completed yet.
    pub fn receive(&mut self, record: Record) -> Result<InboundEvent> {
        let io = self
            .io
            .as_mut()
            .ok_or_else(|| err_msg("connection has no active cipher state"))?;

        let (typ, fragment) = match io.reader.recv_record(record)? {
            Delivery::Dropped => return Ok(InboundEvent::Dropped),
            Delivery::Accepted { typ, fragment } => (typ, fragment),
        };

        match typ {
            ContentType::ApplicationData => Ok(InboundEvent::ApplicationData(fragment)),
            ContentType::Alert => {
                let mut reader = Reader::new(fragment);
                let alert = Alert::parse(&mut reader)?;
                match alert.level {
                    AlertLevel::Fatal => Err(TlsError::PeerAlert(alert.description).into()),
                    _ => Ok(InboundEvent::PeerClosed),
                }
            }
            _ => Err(TlsError::UnexpectedMessage("unexpected content type after handshake".into()).into()),
        }
    }

    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.io = None;
    }
}
