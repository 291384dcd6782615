//! Connection manager: owns every `Connection`, keyed by `peer_address`,
//! and is the sole place connections are created or destroyed.
//! Single-threaded, cooperative dispatch, matching the rest of this
//! crate's `async-std` style.

use std::collections::HashMap;

use async_std::sync::Mutex;
use bytes::Bytes;

use crate::codec::Reader;
use crate::crypto::random::secure_random_bytes;
use crate::errors::*;
use crate::tls::alert::{fatal_alert_for, Alert, AlertDescription};
use crate::tls::cookie::CookieSecret;
use crate::tls::flight::Transport;
use crate::tls::options::{ClientOptions, ServerOptions};
use crate::tls::record::Record;

use super::connection::{Connection, InboundEvent, Role};

/// Host-facing callbacks for handshake completion, application data, and
/// error reporting.
#[async_trait::async_trait]
pub trait ConnectionEvents: Send + Sync {
    async fn on_handshake_complete(&self, peer_address: &str);
    async fn on_application_data(&self, data: &[u8], peer_address: &str);
    async fn on_error(&self, kind: &str, peer_address: &str);
}

/// Owns all per-peer `Connection`s for one local endpoint.
pub struct ConnectionManager {
    connections: Mutex<HashMap<String, Connection>>,
    cookie_secret: CookieSecret,
    is_dtls: bool,
}

impl ConnectionManager {
    /// Generates a fresh random cookie secret -- callers that need a
    /// stable secret across manager restarts should persist and pass it
    /// in via `with_cookie_secret`.
    pub fn new(is_dtls: bool) -> Result<Self> {
        let key = secure_random_bytes(32)?;
        Ok(Self::with_cookie_secret(is_dtls, CookieSecret::new(key)))
    }

    pub fn with_cookie_secret(is_dtls: bool, cookie_secret: CookieSecret) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            cookie_secret,
            is_dtls,
        }
    }

    pub fn cookie_secret(&self) -> &CookieSecret {
        &self.cookie_secret
    }

    /// Drives a client-role handshake to a new peer and installs the
    /// resulting `Connection`, notifying `events` of the outcome.
    pub async fn connect(
        &self,
        peer_address: &str,
        transport: &dyn Transport,
        options: &ClientOptions,
        events: &dyn ConnectionEvents,
    ) -> Result<()> {
        let version = options.common.allowed_versions.first().copied().unwrap_or(0);
        let mut connection = Connection::new(peer_address.to_string(), Role::Client, version);

        match crate::tls::client::run_client_handshake(transport, options, self.is_dtls).await {
            Ok(established) => {
                connection.mark_established(established);
                self.connections.lock().await.insert(peer_address.to_string(), connection);
                events.on_handshake_complete(peer_address).await;
                Ok(())
            }
            Err(e) => {
                self.emit_fatal_alert(transport, &e).await;
                events.on_error(&e.to_string(), peer_address).await;
                Err(e)
            }
        }
    }

    /// Accepts an inbound handshake, creating the `Connection` on receipt
    /// of the first ClientHello and notifying `events` of the outcome. The
    /// DTLS cookie round trip happens inside `run_server_handshake` before
    /// any state here is touched.
    pub async fn accept(
        &self,
        peer_address: &str,
        transport: &dyn Transport,
        options: &ServerOptions,
        events: &dyn ConnectionEvents,
    ) -> Result<()> {
        let version = options.common.allowed_versions.first().copied().unwrap_or(0);
        let mut connection = Connection::new(peer_address.to_string(), Role::Server, version);

        match crate::tls::server::run_server_handshake(transport, options, peer_address, self.is_dtls).await {
            Ok(established) => {
                connection.mark_established(established);
                self.connections.lock().await.insert(peer_address.to_string(), connection);
                events.on_handshake_complete(peer_address).await;
                Ok(())
            }
            Err(e) => {
                self.emit_fatal_alert(transport, &e).await;
                events.on_error(&e.to_string(), peer_address).await;
                Err(e)
            }
        }
    }

    /// Queues application data for `peer_address` if its handshake has
    /// completed, returning the sealed record bytes to put on the wire.
    /// Buffers into `flight_buffer` and returns `None` if the handshake is
    /// still in progress.
    pub async fn send(&self, peer_address: &str, payload: Bytes) -> Result<Option<Vec<u8>>> {
        let mut connections = self.connections.lock().await;
        let connection = connections
            .get_mut(peer_address)
            .ok_or_else(|| err_msg("no connection for peer address"))?;

        if !connection.is_established() {
            connection.flight_buffer.push(payload);
            return Ok(None);
        }

        Ok(Some(connection.seal_application_data(&payload)?))
    }

    /// Parses and decrypts one inbound post-handshake datagram from
    /// `peer_address`, dispatching the result to `events`:
    /// `on_application_data` for a decrypted payload, `on_error` for a
    /// malformed record or a fatal alert (the connection is also
    /// destroyed in the latter case). A CloseNotify tears the connection
    /// down without being reported as an error; a replayed or stale
    /// record is silently ignored.
    pub async fn on_datagram(&self, peer_address: &str, datagram: &[u8], events: &dyn ConnectionEvents) {
        let mut connections = self.connections.lock().await;

        let outcome = match connections.get_mut(peer_address) {
            Some(connection) => {
                let mut reader = Reader::new(Bytes::copy_from_slice(datagram));
                match Record::parse(&mut reader, self.is_dtls) {
                    Ok(record) => connection.receive(record),
                    Err(e) => Err(TlsError::MalformedRecord(e.to_string()).into()),
                }
            }
            None => Err(err_msg("no connection for peer address")),
        };

        match outcome {
            Ok(InboundEvent::ApplicationData(data)) => {
                drop(connections);
                events.on_application_data(&data, peer_address).await;
            }
            Ok(InboundEvent::Dropped) => {}
            Ok(InboundEvent::PeerClosed) => {
                connections.remove(peer_address);
            }
            Err(e) => {
                connections.remove(peer_address);
                drop(connections);
                events.on_error(&e.to_string(), peer_address).await;
            }
        }
    }

    /// Destroys a connection, best-effort notifying the peer first with a
    /// CloseNotify warning alert sealed under the connection's write
    /// cipher. Dropping the `Connection` value releases its cipher key
    /// material.
    pub async fn terminate(&self, peer_address: &str, transport: &dyn Transport) {
        if let Some(mut connection) = self.connections.lock().await.remove(peer_address) {
            if let Some(record) = connection.seal_alert(Alert::warning(AlertDescription::CloseNotify)) {
                let _ = transport.send(&record).await;
            }
            connection.close();
        }
    }

    async fn emit_fatal_alert(&self, transport: &dyn Transport, err: &Error) {
        if let Some(tls_err) = err.downcast_ref::<TlsError>() {
            if let Some(alert) = fatal_alert_for(tls_err) {
                let mut body = Vec::new();
                alert.serialize(&mut body);
                // Best-effort: the connection never got far enough to have
                // a FlightIo worth reusing, so this is sent unencrypted.
                let mut record = Vec::new();
                record.push(crate::tls::record::ContentType::Alert.to_u8());
                record.extend_from_slice(&(if self.is_dtls {
                    crate::tls::record::DTLS_1_2_VERSION
                } else {
                    crate::tls::record::TLS_1_2_VERSION
                })
                .to_be_bytes());
                if self.is_dtls {
                    record.extend_from_slice(&[0u8; 8]); // epoch=0, seq=0
                }
                record.extend_from_slice(&(body.len() as u16).to_be_bytes());
                record.extend_from_slice(&body);
                let _ = transport.send(&record).await;
            }
        }
    }
}
