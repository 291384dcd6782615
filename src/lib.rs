//! Asynchronous DTLS/TLS 1.2 endpoint: record layer, handshake state
//! machine, and connection management for the ECDH_anon, ECDHE_ECDSA, and
//! ECDHE_PSK key-exchange families.

pub mod codec;
pub mod connection;
pub mod crypto;
pub mod errors;
pub mod tls;
