//! Handshake message codec: ClientHello, ServerHello, HelloVerifyRequest,
//! ServerKeyExchange, ClientKeyExchange, Finished. A `Certificate` message
//! is deliberately not modeled: ECDHE_ECDSA's server key here is pinned
//! directly via configuration
//! (`tls::options::ClientOptions::server_public_key`) rather than carried
//! over the wire as an X.509 chain (see DESIGN.md).

use bytes::Bytes;

use crate::codec::{write_opaque16, write_opaque8, write_u16, write_u8, with_u16_length_prefix, Reader};
use crate::errors::*;
use crate::tls::extensions::Extension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeType {
    HelloVerifyRequest,
    ClientHello,
    ServerHello,
    ServerKeyExchange,
    ServerHelloDone,
    ClientKeyExchange,
    Finished,
    Unknown(u8),
}

impl HandshakeType {
    pub fn to_u8(&self) -> u8 {
        match self {
            HandshakeType::HelloVerifyRequest => 3,
            HandshakeType::ClientHello => 1,
            HandshakeType::ServerHello => 2,
            HandshakeType::ServerKeyExchange => 12,
            HandshakeType::ServerHelloDone => 14,
            HandshakeType::ClientKeyExchange => 16,
            HandshakeType::Finished => 20,
            HandshakeType::Unknown(v) => *v,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            3 => HandshakeType::HelloVerifyRequest,
            1 => HandshakeType::ClientHello,
            2 => HandshakeType::ServerHello,
            12 => HandshakeType::ServerKeyExchange,
            14 => HandshakeType::ServerHelloDone,
            16 => HandshakeType::ClientKeyExchange,
            20 => HandshakeType::Finished,
            _ => HandshakeType::Unknown(v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientHello {
    pub client_version: u16,
    pub random: [u8; 32],
    pub session_id: Bytes,
    /// Empty outside DTLS, or on the first cookieless ClientHello.
    pub cookie: Bytes,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Bytes,
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    pub fn parse(reader: &mut Reader, is_dtls: bool) -> Result<Self> {
        let client_version = reader.read_u16()?;
        let random_bytes = reader.read_bytes(32)?;
        let mut random = [0u8; 32];
        random.copy_from_slice(&random_bytes);
        let session_id = reader.read_opaque8()?;
        let cookie = if is_dtls {
            reader.read_opaque8()?
        } else {
            Bytes::new()
        };

        let mut suites_reader = reader.read_nested(reader.read_u16()? as usize)?;
        let mut cipher_suites = Vec::new();
        while !suites_reader.is_empty() {
            cipher_suites.push(suites_reader.read_u16()?);
        }

        let compression_methods = reader.read_opaque8()?;

        let extensions = if reader.is_empty() {
            Vec::new()
        } else {
            let mut ext_reader = reader.read_nested(reader.read_u16()? as usize)?;
            let mut extensions = Vec::new();
            while !ext_reader.is_empty() {
                extensions.push(Extension::parse(&mut ext_reader)?);
            }
            extensions
        };

        Ok(Self {
            client_version,
            random,
            session_id,
            cookie,
            cipher_suites,
            compression_methods,
            extensions,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>, is_dtls: bool) {
        write_u16(out, self.client_version);
        out.extend_from_slice(&self.random);
        write_opaque8(out, &self.session_id);
        if is_dtls {
            write_opaque8(out, &self.cookie);
        }
        with_u16_length_prefix(out, |inner| {
            for suite in &self.cipher_suites {
                write_u16(inner, *suite);
            }
        });
        write_opaque8(out, &self.compression_methods);
        if !self.extensions.is_empty() {
            with_u16_length_prefix(out, |inner| {
                for ext in &self.extensions {
                    ext.serialize(inner);
                }
            });
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerHello {
    pub server_version: u16,
    pub random: [u8; 32],
    pub session_id: Bytes,
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let server_version = reader.read_u16()?;
        let random_bytes = reader.read_bytes(32)?;
        let mut random = [0u8; 32];
        random.copy_from_slice(&random_bytes);
        let session_id = reader.read_opaque8()?;
        let cipher_suite = reader.read_u16()?;
        let compression_method = reader.read_u8()?;

        let extensions = if reader.is_empty() {
            Vec::new()
        } else {
            let mut ext_reader = reader.read_nested(reader.read_u16()? as usize)?;
            let mut extensions = Vec::new();
            while !ext_reader.is_empty() {
                extensions.push(Extension::parse(&mut ext_reader)?);
            }
            extensions
        };

        Ok(Self {
            server_version,
            random,
            session_id,
            cipher_suite,
            compression_method,
            extensions,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_u16(out, self.server_version);
        out.extend_from_slice(&self.random);
        write_opaque8(out, &self.session_id);
        write_u16(out, self.cipher_suite);
        write_u8(out, self.compression_method);
        if !self.extensions.is_empty() {
            with_u16_length_prefix(out, |inner| {
                for ext in &self.extensions {
                    ext.serialize(inner);
                }
            });
        }
    }
}

/// DTLS-only (RFC 6347 §4.2.1); never sent nor received over plain TLS.
#[derive(Debug, Clone)]
pub struct HelloVerifyRequest {
    pub server_version: u16,
    pub cookie: Bytes,
}

impl HelloVerifyRequest {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let server_version = reader.read_u16()?;
        let cookie = reader.read_opaque8()?;
        Ok(Self {
            server_version,
            cookie,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_u16(out, self.server_version);
        write_opaque8(out, &self.cookie);
    }
}

/// An uncompressed X9.62 EC point, transported as `opaque<1..2^8-1>`.
#[derive(Debug, Clone)]
pub struct ECPoint {
    pub point: Bytes,
}

impl ECPoint {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            point: reader.read_opaque8()?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_opaque8(out, &self.point);
    }
}

/// `{curve_type = named_curve(3), namedcurve}` (RFC 4492 §5.4).
#[derive(Debug, Clone)]
pub struct ECParameters {
    pub named_curve: u16,
}

impl ECParameters {
    const NAMED_CURVE_TYPE: u8 = 3;

    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let curve_type = reader.read_u8()?;
        if curve_type != Self::NAMED_CURVE_TYPE {
            return Err(err_msg("only named_curve ECParameters are supported"));
        }
        Ok(Self {
            named_curve: reader.read_u16()?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_u8(out, Self::NAMED_CURVE_TYPE);
        write_u16(out, self.named_curve);
    }
}

#[derive(Debug, Clone)]
pub struct ServerECDHParams {
    pub curve_params: ECParameters,
    pub public: ECPoint,
}

impl ServerECDHParams {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            curve_params: ECParameters::parse(reader)?,
            public: ECPoint::parse(reader)?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.curve_params.serialize(out);
        self.public.serialize(out);
    }
}

/// `ServerKeyExchange` for ECDH_anon and ECDHE_ECDSA: `{params, [signature]}`.
#[derive(Debug, Clone)]
pub struct ServerKeyExchangeEcdh {
    pub params: ServerECDHParams,
    /// `Some((scheme, signature))` for ECDHE_ECDSA; `None` for ECDH_anon.
    pub signature: Option<(u16, Bytes)>,
}

impl ServerKeyExchangeEcdh {
    pub fn parse(reader: &mut Reader, signed: bool) -> Result<Self> {
        let params = ServerECDHParams::parse(reader)?;
        let signature = if signed {
            let scheme = reader.read_u16()?;
            let sig = reader.read_opaque16()?;
            Some((scheme, sig))
        } else {
            None
        };
        Ok(Self { params, signature })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.params.serialize(out);
        if let Some((scheme, sig)) = &self.signature {
            write_u16(out, *scheme);
            write_opaque16(out, sig);
        }
    }
}

/// `ServerKeyExchange` for ECDHE_PSK (RFC 5489 §2): identity hint then
/// ECDHE params, unsigned.
#[derive(Debug, Clone)]
pub struct ServerKeyExchangePsk {
    pub psk_identity_hint: Bytes,
    pub params: ServerECDHParams,
}

impl ServerKeyExchangePsk {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            psk_identity_hint: reader.read_opaque16()?,
            params: ServerECDHParams::parse(reader)?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_opaque16(out, &self.psk_identity_hint);
        self.params.serialize(out);
    }
}

/// `ClientKeyExchange` for ECDH_anon/ECDHE_ECDSA: just the client's point.
#[derive(Debug, Clone)]
pub struct ClientKeyExchangeEcdh {
    pub public: ECPoint,
}

impl ClientKeyExchangeEcdh {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            public: ECPoint::parse(reader)?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.public.serialize(out);
    }
}

/// `ClientKeyExchange` for ECDHE_PSK: selected identity then client point
/// (RFC 5489 §2).
#[derive(Debug, Clone)]
pub struct ClientKeyExchangePsk {
    pub psk_identity: Bytes,
    pub public: ECPoint,
}

impl ClientKeyExchangePsk {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            psk_identity: reader.read_opaque16()?,
            public: ECPoint::parse(reader)?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_opaque16(out, &self.psk_identity);
        self.public.serialize(out);
    }
}

#[derive(Debug, Clone)]
pub struct Finished {
    pub verify_data: Bytes,
}

impl Finished {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            verify_data: reader.read_bytes(reader.remaining())?,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.verify_data);
    }
}

/// A parsed handshake message: `{type, length, body}` (DTLS also carries
/// `message_seq`/fragment offset/length, handled one level up in
/// `record_stream`). `ServerKeyExchange` and `ClientKeyExchange` are left
/// as raw bytes since their shape depends on the negotiated key-exchange
/// family.
#[derive(Debug, Clone)]
pub enum Handshake {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    HelloVerifyRequest(HelloVerifyRequest),
    ServerKeyExchange(Bytes),
    ServerHelloDone,
    ClientKeyExchange(Bytes),
    Finished(Finished),
}

impl Handshake {
    pub fn typ(&self) -> HandshakeType {
        match self {
            Handshake::ClientHello(_) => HandshakeType::ClientHello,
            Handshake::ServerHello(_) => HandshakeType::ServerHello,
            Handshake::HelloVerifyRequest(_) => HandshakeType::HelloVerifyRequest,
            Handshake::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            Handshake::ServerHelloDone => HandshakeType::ServerHelloDone,
            Handshake::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            Handshake::Finished(_) => HandshakeType::Finished,
        }
    }

    /// Parses a handshake body given its type tag, as extracted from the
    /// record-layer/DTLS fragment header by `record_stream`.
    pub fn parse_body(typ: HandshakeType, body: Bytes, is_dtls: bool) -> Result<Self> {
        let mut reader = Reader::new(body.clone());
        Ok(match typ {
            HandshakeType::ClientHello => Handshake::ClientHello(ClientHello::parse(&mut reader, is_dtls)?),
            HandshakeType::ServerHello => Handshake::ServerHello(ServerHello::parse(&mut reader)?),
            HandshakeType::HelloVerifyRequest => {
                Handshake::HelloVerifyRequest(HelloVerifyRequest::parse(&mut reader)?)
            }
            HandshakeType::ServerKeyExchange => Handshake::ServerKeyExchange(body),
            HandshakeType::ServerHelloDone => Handshake::ServerHelloDone,
            HandshakeType::ClientKeyExchange => Handshake::ClientKeyExchange(body),
            HandshakeType::Finished => Handshake::Finished(Finished::parse(&mut reader)?),
            HandshakeType::Unknown(v) => {
                return Err(format_err!("unknown handshake type: {}", v));
            }
        })
    }

    /// Serializes just the handshake body (without the outer type/length
    /// header, which `record_stream` prepends per DTLS/TLS framing).
    pub fn serialize_body(&self, out: &mut Vec<u8>, is_dtls: bool) {
        match self {
            Handshake::ClientHello(m) => m.serialize(out, is_dtls),
            Handshake::ServerHello(m) => m.serialize(out),
            Handshake::HelloVerifyRequest(m) => m.serialize(out),
            Handshake::ServerKeyExchange(data) => out.extend_from_slice(data),
            Handshake::ServerHelloDone => {}
            Handshake::ClientKeyExchange(data) => out.extend_from_slice(data),
            Handshake::Finished(m) => m.serialize(out),
        }
    }
}
