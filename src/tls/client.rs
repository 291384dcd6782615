//! Client-side handshake driver: ClientHello -> wait ServerHello ->
//! ServerKeyExchange/ServerHelloDone -> ClientKeyExchange ->
//! ChangeCipherSpec -> Finished, across all three key-exchange families
//! and DTLS's cookie round trip. No Certificate message is exchanged;
//! see `options.rs` for how the server's public key reaches the client
//! instead.

use crate::crypto::constant_time::constant_time_eq;
use crate::crypto::elliptic::NamedGroup;
use crate::crypto::random::tls_random;
use crate::errors::*;
use crate::tls::cipher_endpoint::CbcCipherEndpoint;
use crate::tls::cipher_suite::{CipherSuite, KeyExchangeFamily};
use crate::tls::extensions::{find_elliptic_curves, has_extended_master_secret, Extension};
use crate::tls::flight::{FlightIo, Incoming, Transport};
use crate::tls::handshake::{ClientHello, Finished, Handshake, ServerKeyExchangeEcdh, ServerKeyExchangePsk};
use crate::tls::handshake_executor as kx;
use crate::tls::key_schedule::{derive_key_block, derive_master_secret, finished_verify_data, CLIENT_FINISHED_LABEL, SERVER_FINISHED_LABEL};
use crate::tls::options::ClientOptions;
use crate::tls::record::{DTLS_1_2_VERSION, TLS_1_2_VERSION};
use zeroize::Zeroize;

/// What a completed handshake leaves ready for application data: the
/// record-layer read/write cipher state plus the negotiated suite.
pub struct EstablishedConnection {
    pub io: FlightIo,
    pub negotiated_cipher_suite: CipherSuite,
}

/// Runs the client side of a handshake to completion over `transport`.
pub async fn run_client_handshake(
    transport: &dyn Transport,
    options: &ClientOptions,
    is_dtls: bool,
) -> Result<EstablishedConnection> {
    let version = if is_dtls { DTLS_1_2_VERSION } else { TLS_1_2_VERSION };
    let mut io = FlightIo::new(is_dtls, version);

    let client_random = tls_random()?;
    let mut cookie = bytes::Bytes::new();

    let mut client_hello = build_client_hello(options, version, client_random, cookie.clone());
    io.send_handshake(transport, &Handshake::ClientHello(client_hello.clone())).await?;

    // DTLS stateless cookie round trip: a HelloVerifyRequest resets the
    // transcript since it is never itself hashed into it.
    let server_hello = loop {
        match io.recv_handshake(transport).await? {
            Incoming::Handshake(Handshake::HelloVerifyRequest(hvr)) => {
                cookie = hvr.cookie;
                io.transcript.clear();
                client_hello = build_client_hello(options, version, client_random, cookie.clone());
                io.send_handshake(transport, &Handshake::ClientHello(client_hello.clone())).await?;
            }
            Incoming::Handshake(Handshake::ServerHello(sh)) => break sh,
            Incoming::Handshake(_) => {
                return Err(TlsError::UnexpectedMessage("expected ServerHello".into()).into());
            }
            Incoming::ChangeCipherSpec => {
                return Err(TlsError::UnexpectedMessage("unexpected ChangeCipherSpec".into()).into());
            }
        }
    };

    let cipher_suite = CipherSuite::from_u16(server_hello.cipher_suite);
    if !options.common.cipher_suites.iter().any(|c| *c == cipher_suite) {
        return Err(TlsError::UnsupportedCipher.into());
    }
    let family = cipher_suite.key_exchange()?;
    let params = cipher_suite.decode()?;
    let extended_ms = options.common.extended_master_secret && has_extended_master_secret(&server_hello.extensions);

    let server_key_exchange = match io.recv_handshake(transport).await? {
        Incoming::Handshake(Handshake::ServerKeyExchange(body)) => body,
        _ => return Err(TlsError::UnexpectedMessage("expected ServerKeyExchange".into()).into()),
    };

    let (group, server_public, psk_identity_hint) = match family {
        KeyExchangeFamily::EcdhAnon => {
            let mut reader = crate::codec::Reader::new(server_key_exchange);
            let ske = ServerKeyExchangeEcdh::parse(&mut reader, false)?;
            let group = NamedGroup::from_u16(ske.params.curve_params.named_curve);
            (group, ske.params.public.point, None)
        }
        KeyExchangeFamily::EcdheEcdsa => {
            let mut reader = crate::codec::Reader::new(server_key_exchange);
            let ske = ServerKeyExchangeEcdh::parse(&mut reader, true)?;
            let server_public_key = options
                .server_public_key
                .as_ref()
                .ok_or_else(|| err_msg("ClientOptions.server_public_key required for ECDHE_ECDSA"))?;
            kx::verify_ecdhe_ecdsa_server_key_exchange(&ske, &client_random, &server_hello.random, server_public_key)?;
            let group = NamedGroup::from_u16(ske.params.curve_params.named_curve);
            (group, ske.params.public.point, None)
        }
        KeyExchangeFamily::EcdhePsk => {
            let mut reader = crate::codec::Reader::new(server_key_exchange);
            let ske = ServerKeyExchangePsk::parse(&mut reader)?;
            let group = NamedGroup::from_u16(ske.params.curve_params.named_curve);
            (group, ske.params.public.point, Some(ske.psk_identity_hint))
        }
    };

    if !options.common.allowed_curves.contains(&group.to_u16()) {
        return Err(TlsError::UnsupportedCurve.into());
    }

    match io.recv_handshake(transport).await? {
        Incoming::Handshake(Handshake::ServerHelloDone) => {}
        _ => return Err(TlsError::UnexpectedMessage("expected ServerHelloDone".into()).into()),
    }

    let dh = group.group()?;
    let client_secret = dh.secret_value()?;
    let client_public = dh.public_value(&client_secret)?;

    let premaster = match family {
        KeyExchangeFamily::EcdhAnon | KeyExchangeFamily::EcdheEcdsa => {
            let client_key_exchange = kx::build_client_key_exchange_ecdh(client_public.clone());
            let mut body = Vec::new();
            client_key_exchange.serialize(&mut body);
            io.send_handshake(transport, &Handshake::ClientKeyExchange(body.into())).await?;
            kx::ecdh_premaster(group, &client_secret, &server_public)?
        }
        KeyExchangeFamily::EcdhePsk => {
            let (identity, psk) = options
                .psk_identity
                .clone()
                .ok_or_else(|| err_msg("ClientOptions.psk_identity required for ECDHE_PSK"))?;
            let _ = psk_identity_hint;
            let client_key_exchange = kx::build_client_key_exchange_psk(identity, client_public.clone());
            let mut body = Vec::new();
            client_key_exchange.serialize(&mut body);
            io.send_handshake(transport, &Handshake::ClientKeyExchange(body.into())).await?;
            let z = kx::ecdh_premaster(group, &client_secret, &server_public)?;
            kx::ecdhe_psk_premaster(&z, &psk)
        }
    };

    io.send_change_cipher_spec(transport).await?;

    let handshake_hash_at_kx = io.transcript.hash(&params.hasher_factory);
    let mut premaster = premaster;
    let master_secret = derive_master_secret(
        &premaster,
        &client_random,
        &server_hello.random,
        extended_ms,
        &handshake_hash_at_kx,
        &params.hasher_factory,
    );
    // I5: premaster_secret must not outlive master secret derivation.
    premaster.zeroize();

    let key_block = derive_key_block(
        &master_secret,
        &server_hello.random,
        &client_random,
        &params.hasher_factory,
        params.mac_key_len,
        params.enc_key_len,
        params.fixed_iv_len,
    );

    let client_cipher = CbcCipherEndpoint::new(key_block.client_mac, key_block.client_enc, params.hasher_factory.clone())?;
    let server_cipher = CbcCipherEndpoint::new(key_block.server_mac, key_block.server_enc, params.hasher_factory.clone())?;
    io.writer.activate_cipher(client_cipher);

    let client_verify_data = finished_verify_data(
        &master_secret,
        CLIENT_FINISHED_LABEL,
        &io.transcript.hash(&params.hasher_factory),
        &params.hasher_factory,
    );
    io.send_handshake(
        transport,
        &Handshake::Finished(Finished {
            verify_data: client_verify_data.into(),
        }),
    )
    .await?;

    match io.recv_handshake(transport).await? {
        Incoming::ChangeCipherSpec => {}
        _ => return Err(TlsError::UnexpectedMessage("expected ChangeCipherSpec".into()).into()),
    }
    io.reader.activate_cipher(server_cipher);

    let expected_server_verify_data = finished_verify_data(
        &master_secret,
        SERVER_FINISHED_LABEL,
        &io.transcript.hash(&params.hasher_factory),
        &params.hasher_factory,
    );
    match io.recv_handshake(transport).await? {
        Incoming::Handshake(Handshake::Finished(f)) => {
            if !constant_time_eq(&f.verify_data, &expected_server_verify_data) {
                return Err(TlsError::BadFinished.into());
            }
        }
        _ => return Err(TlsError::UnexpectedMessage("expected Finished".into()).into()),
    }

    Ok(EstablishedConnection {
        io,
        negotiated_cipher_suite: cipher_suite,
    })
}

fn build_client_hello(
    options: &ClientOptions,
    version: u16,
    random: [u8; 32],
    cookie: bytes::Bytes,
) -> ClientHello {
    let mut extensions = vec![Extension::elliptic_curves(&options.common.allowed_curves)];
    if options.common.extended_master_secret {
        extensions.push(Extension::extended_master_secret());
    }

    ClientHello {
        client_version: version,
        random,
        session_id: bytes::Bytes::new(),
        cookie,
        cipher_suites: options.common.cipher_suites.iter().map(|c| c.to_u16()).collect(),
        compression_methods: bytes::Bytes::from_static(&[0]),
        extensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_hello_offers_configured_curves_and_suites() {
        let options = ClientOptions::default();
        let hello = build_client_hello(&options, DTLS_1_2_VERSION, [0u8; 32], bytes::Bytes::new());
        assert_eq!(hello.cipher_suites.len(), options.common.cipher_suites.len());
        assert!(hello.extensions.iter().any(|e| e.typ == crate::tls::extensions::ExtensionType::EllipticCurves));
    }
}
