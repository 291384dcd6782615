//! End-to-end handshake scenarios over an in-memory transport, exercising
//! `tls::client`, `tls::server`, and `connection::ConnectionManager`
//! together the way a real socket pair would.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_std::sync::Mutex;
use async_trait::async_trait;
use bytes::Bytes;

use dtls::connection::{ConnectionEvents, ConnectionManager};
use dtls::crypto::random::secure_random_bytes;
use dtls::errors::Result;
use dtls::tls::client::run_client_handshake;
use dtls::tls::cookie::CookieSecret;
use dtls::tls::flight::Transport;
use dtls::tls::options::{ClientOptions, ServerOptions};
use dtls::tls::server::run_server_handshake;

/// One direction of an in-memory datagram pipe: `send` pushes onto `outbox`,
/// `recv` pops off `inbox`. Pairing two of these (inbox <-> outbox swapped)
/// gives a lossless, ordered duplex channel good enough to drive a
/// handshake without a real socket.
type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

struct MemoryTransport {
    inbox: Queue,
    outbox: Queue,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.outbox.lock().await.push_back(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        loop {
            if let Some(datagram) = self.inbox.lock().await.pop_front() {
                return Ok(datagram);
            }
            async_std::task::yield_now().await;
        }
    }
}

fn duplex_pair() -> (MemoryTransport, MemoryTransport) {
    let a_to_b: Queue = Arc::new(Mutex::new(VecDeque::new()));
    let b_to_a: Queue = Arc::new(Mutex::new(VecDeque::new()));
    let client = MemoryTransport {
        inbox: b_to_a.clone(),
        outbox: a_to_b.clone(),
    };
    let server = MemoryTransport {
        inbox: a_to_b,
        outbox: b_to_a,
    };
    (client, server)
}

/// Records the callbacks a `ConnectionManager` fires, so tests can assert
/// on them instead of just on the raw bytes crossing the wire.
#[derive(Default)]
struct RecordingEvents {
    handshake_complete: AtomicBool,
    application_data: Mutex<Option<Vec<u8>>>,
    error: Mutex<Option<String>>,
}

#[async_trait]
impl ConnectionEvents for RecordingEvents {
    async fn on_handshake_complete(&self, _peer_address: &str) {
        self.handshake_complete.store(true, Ordering::SeqCst);
    }

    async fn on_application_data(&self, data: &[u8], _peer_address: &str) {
        *self.application_data.lock().await = Some(data.to_vec());
    }

    async fn on_error(&self, kind: &str, _peer_address: &str) {
        *self.error.lock().await = Some(kind.to_string());
    }
}

fn anon_options() -> (ClientOptions, ServerOptions) {
    let mut client = ClientOptions::default();
    client.common.cipher_suites = vec![dtls::tls::cipher_suite::CipherSuite::TlsEcdhAnonWithAes128CbcSha256];
    client.common.allowed_curves = vec![29]; // x25519

    let cookie_secret = CookieSecret::new(secure_random_bytes(32).unwrap());
    let mut server = ServerOptions::new(cookie_secret);
    server.common.cipher_suites = client.common.cipher_suites.clone();
    server.common.allowed_curves = client.common.allowed_curves.clone();

    (client, server)
}

#[async_std::test]
async fn dtls_handshake_completes_with_cookie_round_trip() {
    let (client_transport, server_transport) = duplex_pair();
    let (client_options, server_options) = anon_options();

    let client_fut = run_client_handshake(&client_transport, &client_options, true);
    let server_fut = run_server_handshake(&server_transport, &server_options, "client:1", true);

    let (client_result, server_result) = futures::future::join(client_fut, server_fut).await;

    let client_conn = client_result.expect("client handshake should complete");
    let server_conn = server_result.expect("server handshake should complete");

    assert_eq!(
        client_conn.negotiated_cipher_suite.to_u16(),
        server_conn.negotiated_cipher_suite.to_u16()
    );
}

#[async_std::test]
async fn connection_manager_round_trip_establishes_and_sends() {
    let (client_transport, server_transport) = duplex_pair();
    let (client_options, server_options) = anon_options();

    let client_manager = ConnectionManager::new(true).unwrap();
    let server_manager = ConnectionManager::with_cookie_secret(true, server_options.cookie_secret.clone().unwrap());

    let client_events = RecordingEvents::default();
    let server_events = RecordingEvents::default();

    let connect_fut = client_manager.connect("server:1", &client_transport, &client_options, &client_events);
    let accept_fut = server_manager.accept("client:1", &server_transport, &server_options, &server_events);

    let (connect_result, accept_result) = futures::future::join(connect_fut, accept_fut).await;
    connect_result.expect("client connect should succeed");
    accept_result.expect("server accept should succeed");
    assert!(client_events.handshake_complete.load(Ordering::SeqCst));
    assert!(server_events.handshake_complete.load(Ordering::SeqCst));

    let sealed = client_manager
        .send("server:1", Bytes::from_static(b"hello"))
        .await
        .expect("send should succeed")
        .expect("handshake already established, so sealing should not buffer");
    assert!(!sealed.is_empty());

    server_manager.on_datagram("client:1", &sealed, &server_events).await;
    assert_eq!(
        server_events.application_data.lock().await.as_deref(),
        Some(b"hello".as_slice())
    );
}
