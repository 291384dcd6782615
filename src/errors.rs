//! Error taxonomy for the DTLS/TLS 1.2 core.
//!
//! A single `Result<T>` alias backed by the `failure` crate, plus a
//! `Fail`-deriving enum so fatal-alert mapping (see `tls::alert`) is a
//! total match instead of string sniffing.

pub use failure::{err_msg, format_err, Error, Fail};

pub type Result<T> = std::result::Result<T, Error>;

/// Closed taxonomy of handshake and record-layer failures. Each one has a
/// fixed mapping onto an outgoing `AlertDescription` in
/// `tls::alert::fatal_alert_for`.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum TlsError {
    #[fail(display = "malformed record: {}", _0)]
    MalformedRecord(String),

    #[fail(display = "unsupported protocol version")]
    UnsupportedVersion,

    #[fail(display = "unsupported cipher suite")]
    UnsupportedCipher,

    #[fail(display = "unsupported named curve")]
    UnsupportedCurve,

    #[fail(display = "bad record MAC")]
    BadRecordMac,

    #[fail(display = "bad finished verify_data")]
    BadFinished,

    #[fail(display = "unexpected message in state {}", _0)]
    UnexpectedMessage(String),

    #[fail(display = "handshake timed out")]
    HandshakeTimeout,

    #[fail(display = "peer sent fatal alert: {:?}", _0)]
    PeerAlert(crate::tls::alert::AlertDescription),
}
