//! DTLS/TLS 1.2 protocol engine: record layer, handshake codec, key
//! schedule, and client/server drivers (see DESIGN.md for scope notes).

pub mod alert;
pub mod cipher_endpoint;
pub mod cipher_suite;
pub mod client;
pub mod cookie;
pub mod extensions;
pub mod flight;
pub mod handshake;
pub mod handshake_executor;
pub mod key_schedule;
pub mod options;
pub mod psk;
pub mod record;
pub mod record_stream;
pub mod server;
pub mod transcript;
