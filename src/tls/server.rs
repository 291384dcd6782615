//! Server-side handshake driver: the mirror image of `client.rs`, driving
//! ClientHello (with the DTLS cookie round trip) through ServerHello,
//! ServerKeyExchange/ServerHelloDone, ClientKeyExchange,
//! ChangeCipherSpec, and Finished.

use crate::crypto::constant_time::constant_time_eq;
use crate::crypto::elliptic::NamedGroup;
use crate::crypto::random::tls_random;
use crate::errors::*;
use crate::tls::cipher_endpoint::CbcCipherEndpoint;
use crate::tls::cipher_suite::{CipherSuite, KeyExchangeFamily};
use crate::tls::extensions::{find_elliptic_curves, has_extended_master_secret, Extension};
use crate::tls::flight::{FlightIo, Incoming, Transport};
use crate::tls::handshake::{
    ClientHello, ClientKeyExchangeEcdh, ClientKeyExchangePsk, Finished, Handshake, HelloVerifyRequest, ServerHello,
};
use crate::tls::handshake_executor as kx;
use crate::tls::key_schedule::{derive_key_block, derive_master_secret, finished_verify_data, CLIENT_FINISHED_LABEL, SERVER_FINISHED_LABEL};
use crate::tls::options::ServerOptions;
use crate::tls::record::{DTLS_1_2_VERSION, TLS_1_2_VERSION};
use zeroize::Zeroize;

use super::client::EstablishedConnection;

/// Runs the server side of a handshake to completion over `transport`,
/// including the DTLS stateless cookie round trip when
/// `options.cookie_secret` is set.
pub async fn run_server_handshake(
    transport: &dyn Transport,
    options: &ServerOptions,
    peer_address: &str,
    is_dtls: bool,
) -> Result<EstablishedConnection> {
    let version = if is_dtls { DTLS_1_2_VERSION } else { TLS_1_2_VERSION };
    let mut io = FlightIo::new(is_dtls, version);

    let client_hello = receive_verified_client_hello(&mut io, transport, options, peer_address, is_dtls).await?;

    let cipher_suite = options
        .common
        .cipher_suites
        .iter()
        .find(|c| client_hello.cipher_suites.contains(&c.to_u16()))
        .copied()
        .ok_or_else(|| TlsError::UnsupportedCipher)?;
    let family = cipher_suite.key_exchange()?;
    let params = cipher_suite.decode()?;

    let offered_curves = find_elliptic_curves(&client_hello.extensions)?;
    let group = options
        .common
        .allowed_curves
        .iter()
        .find(|g| offered_curves.contains(g))
        .map(|g| NamedGroup::from_u16(*g))
        .ok_or_else(|| TlsError::UnsupportedCurve)?;

    let extended_ms = options.common.extended_master_secret && has_extended_master_secret(&client_hello.extensions);

    let server_random = tls_random()?;
    let mut server_extensions = Vec::new();
    if extended_ms {
        server_extensions.push(Extension::extended_master_secret());
    }

    let server_hello = ServerHello {
        server_version: version,
        random: server_random,
        session_id: bytes::Bytes::new(),
        cipher_suite: cipher_suite.to_u16(),
        compression_method: 0,
        extensions: server_extensions,
    };
    io.send_handshake(transport, &Handshake::ServerHello(server_hello.clone())).await?;

    let dh_secret = match family {
        KeyExchangeFamily::EcdhAnon => {
            let (ske, secret) = kx::build_ecdh_anon_server_key_exchange(group)?;
            let mut body = Vec::new();
            ske.serialize(&mut body);
            io.send_handshake(transport, &Handshake::ServerKeyExchange(body.into())).await?;
            secret
        }
        KeyExchangeFamily::EcdheEcdsa => {
            let private_key = options
                .ecdsa_private_key
                .as_ref()
                .ok_or_else(|| err_msg("ServerOptions.ecdsa_private_key required for ECDHE_ECDSA"))?;
            let (ske, secret) =
                kx::build_ecdhe_ecdsa_server_key_exchange(group, &client_hello.random, &server_random, private_key)?;
            let mut body = Vec::new();
            ske.serialize(&mut body);
            io.send_handshake(transport, &Handshake::ServerKeyExchange(body.into())).await?;
            secret
        }
        KeyExchangeFamily::EcdhePsk => {
            let (ske, secret) = kx::build_ecdhe_psk_server_key_exchange(group, b"")?;
            let mut body = Vec::new();
            ske.serialize(&mut body);
            io.send_handshake(transport, &Handshake::ServerKeyExchange(body.into())).await?;
            secret
        }
    };

    io.send_handshake(transport, &Handshake::ServerHelloDone).await?;

    let client_key_exchange = match io.recv_handshake(transport).await? {
        Incoming::Handshake(Handshake::ClientKeyExchange(body)) => body,
        _ => return Err(TlsError::UnexpectedMessage("expected ClientKeyExchange".into()).into()),
    };

    let premaster = match family {
        KeyExchangeFamily::EcdhAnon | KeyExchangeFamily::EcdheEcdsa => {
            let mut reader = crate::codec::Reader::new(client_key_exchange);
            let cke = ClientKeyExchangeEcdh::parse(&mut reader)?;
            kx::ecdh_premaster(group, &dh_secret, &cke.public.point)?
        }
        KeyExchangeFamily::EcdhePsk => {
            let mut reader = crate::codec::Reader::new(client_key_exchange);
            let cke = ClientKeyExchangePsk::parse(&mut reader)?;
            let psk_store = options
                .psk_store
                .as_ref()
                .ok_or_else(|| err_msg("ServerOptions.psk_store required for ECDHE_PSK"))?;
            let psk = psk_store.key_for_identity(&cke.psk_identity)?;
            let z = kx::ecdh_premaster(group, &dh_secret, &cke.public.point)?;
            kx::ecdhe_psk_premaster(&z, &psk)
        }
    };

    let handshake_hash_at_kx = io.transcript.hash(&params.hasher_factory);
    let mut premaster = premaster;
    let master_secret = derive_master_secret(
        &premaster,
        &client_hello.random,
        &server_random,
        extended_ms,
        &handshake_hash_at_kx,
        &params.hasher_factory,
    );
    // I5: premaster_secret must not outlive master secret derivation.
    premaster.zeroize();

    let key_block = derive_key_block(
        &master_secret,
        &server_random,
        &client_hello.random,
        &params.hasher_factory,
        params.mac_key_len,
        params.enc_key_len,
        params.fixed_iv_len,
    );

    let client_cipher = CbcCipherEndpoint::new(key_block.client_mac, key_block.client_enc, params.hasher_factory.clone())?;
    let server_cipher = CbcCipherEndpoint::new(key_block.server_mac, key_block.server_enc, params.hasher_factory.clone())?;

    let expected_client_verify_data = finished_verify_data(
        &master_secret,
        CLIENT_FINISHED_LABEL,
        &io.transcript.hash(&params.hasher_factory),
        &params.hasher_factory,
    );

    match io.recv_handshake(transport).await? {
        Incoming::ChangeCipherSpec => {}
        _ => return Err(TlsError::UnexpectedMessage("expected ChangeCipherSpec".into()).into()),
    }
    io.reader.activate_cipher(client_cipher);

    match io.recv_handshake(transport).await? {
        Incoming::Handshake(Handshake::Finished(f)) => {
            if !constant_time_eq(&f.verify_data, &expected_client_verify_data) {
                return Err(TlsError::BadFinished.into());
            }
        }
        _ => return Err(TlsError::UnexpectedMessage("expected Finished".into()).into()),
    }

    io.send_change_cipher_spec(transport).await?;
    io.writer.activate_cipher(server_cipher);

    let server_verify_data = finished_verify_data(
        &master_secret,
        SERVER_FINISHED_LABEL,
        &io.transcript.hash(&params.hasher_factory),
        &params.hasher_factory,
    );
    io.send_handshake(
        transport,
        &Handshake::Finished(Finished {
            verify_data: server_verify_data.into(),
        }),
    )
    .await?;

    Ok(EstablishedConnection {
        io,
        negotiated_cipher_suite: cipher_suite,
    })
}

/// Handles the DTLS cookie round trip and returns the first ClientHello
/// that carries a valid cookie (or, for plain TLS / cookie-less
/// configurations, the first ClientHello received at all).
async fn receive_verified_client_hello(
    io: &mut FlightIo,
    transport: &dyn Transport,
    options: &ServerOptions,
    peer_address: &str,
    is_dtls: bool,
) -> Result<ClientHello> {
    loop {
        let client_hello = match io.recv_handshake(transport).await? {
            Incoming::Handshake(Handshake::ClientHello(ch)) => ch,
            _ => return Err(TlsError::UnexpectedMessage("expected ClientHello".into()).into()),
        };

        let cookie_secret = match (&options.cookie_secret, is_dtls) {
            (Some(secret), true) => secret,
            _ => return Ok(client_hello),
        };

        if !client_hello.cookie.is_empty() && cookie_secret.verify(peer_address, &client_hello.random, &client_hello.cookie) {
            return Ok(client_hello);
        }

        let cookie = cookie_secret.generate(peer_address, &client_hello.random);
        io.send_handshake(
            transport,
            &Handshake::HelloVerifyRequest(HelloVerifyRequest {
                server_version: DTLS_1_2_VERSION,
                cookie: cookie.into(),
            }),
        )
        .await?;
        // HelloVerifyRequest is never itself hashed into the transcript; clear
        // out the rejected ClientHello and this HVR together so the retry
        // ClientHello starts the transcript fresh, matching the client side.
        io.transcript.clear();
    }
}
