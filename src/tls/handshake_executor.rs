//! Per-suite key-exchange mechanics. `client.rs`/`server.rs` drive the
//! overall `INIT -> ... -> HANDSHAKE_OVER` state machine and own the
//! record/transcript bookkeeping; this module holds the cryptographic
//! shape that differs by `KeyExchangeFamily` -- building and parsing
//! ServerKeyExchange/ClientKeyExchange, and computing the premaster
//! secret -- grounded in RFC 4492 §5 (ECDH_anon/ECDHE_ECDSA) and RFC 5489
//! §2 (ECDHE_PSK).

use bytes::Bytes;

use crate::crypto::elliptic::{ecdsa_p256_sign, ecdsa_p256_verify, NamedGroup};
use crate::crypto::hasher::GetHasherFactory;
use crate::crypto::sha256::SHA256Hasher;
use crate::errors::*;
use crate::tls::handshake::{
    ClientKeyExchangeEcdh, ClientKeyExchangePsk, ECParameters, ECPoint, ServerECDHParams,
    ServerKeyExchangeEcdh, ServerKeyExchangePsk,
};

/// `ecdsa_secp256r1_sha256` (RFC 5246 §7.4.1.4.1) -- the only signature
/// scheme the in-scope `TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256` suite
/// pairs with.
const ECDSA_SECP256R1_SHA256: u16 = 0x0403;

fn sha256_digest(data: &[u8]) -> Vec<u8> {
    SHA256Hasher::factory().create().finish_with(data)
}

/// `client_random || server_random || ServerECDHParams`, the input signed
/// over in ECDHE_ECDSA (RFC 4492 §5.4).
fn signature_input(client_random: &[u8; 32], server_random: &[u8; 32], params: &ServerECDHParams) -> Vec<u8> {
    let mut input = Vec::new();
    input.extend_from_slice(client_random);
    input.extend_from_slice(server_random);
    params.serialize(&mut input);
    input
}

fn generate_ecdh_params(group: NamedGroup) -> Result<(ServerECDHParams, Vec<u8>)> {
    let dh = group.group()?;
    let secret = dh.secret_value()?;
    let public = dh.public_value(&secret)?;
    let params = ServerECDHParams {
        curve_params: ECParameters {
            named_curve: group.to_u16(),
        },
        public: ECPoint {
            point: Bytes::from(public),
        },
    };
    Ok((params, secret))
}

/// ECDH_anon: server sends unsigned ECDH params.
pub fn build_ecdh_anon_server_key_exchange(group: NamedGroup) -> Result<(ServerKeyExchangeEcdh, Vec<u8>)> {
    let (params, secret) = generate_ecdh_params(group)?;
    Ok((
        ServerKeyExchangeEcdh {
            params,
            signature: None,
        },
        secret,
    ))
}

/// ECDHE_ECDSA: server signs the ECDH params with its long-term ECDSA
/// key.
pub fn build_ecdhe_ecdsa_server_key_exchange(
    group: NamedGroup,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    ecdsa_private_key: &[u8],
) -> Result<(ServerKeyExchangeEcdh, Vec<u8>)> {
    let (params, secret) = generate_ecdh_params(group)?;
    let digest = sha256_digest(&signature_input(client_random, server_random, &params));
    let signature = ecdsa_p256_sign(ecdsa_private_key, &digest)?;
    Ok((
        ServerKeyExchangeEcdh {
            params,
            signature: Some((ECDSA_SECP256R1_SHA256, Bytes::from(signature))),
        },
        secret,
    ))
}

/// Verifies a ECDHE_ECDSA ServerKeyExchange signature against the pinned
/// server public key (`ClientOptions::server_public_key`; no Certificate
/// message is modeled). A signature mismatch is reported under
/// `TlsError::BadFinished` (DecryptError alert): both it and a bad
/// Finished verify_data represent a cryptographic verification failure,
/// and the error taxonomy names no separate category for the two.
pub fn verify_ecdhe_ecdsa_server_key_exchange(
    ske: &ServerKeyExchangeEcdh,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    server_public_key: &[u8],
) -> Result<()> {
    let (scheme, signature) = ske
        .signature
        .as_ref()
        .ok_or_else(|| TlsError::UnexpectedMessage("ServerKeyExchange missing signature".into()))?;
    if *scheme != ECDSA_SECP256R1_SHA256 {
        return Err(TlsError::UnsupportedCipher.into());
    }

    let digest = sha256_digest(&signature_input(client_random, server_random, &ske.params));
    if !ecdsa_p256_verify(server_public_key, &digest, signature)? {
        return Err(TlsError::BadFinished.into());
    }
    Ok(())
}

/// ECDHE_PSK (RFC 5489 §2): server sends an identity hint plus unsigned
/// ECDH params.
pub fn build_ecdhe_psk_server_key_exchange(
    group: NamedGroup,
    psk_identity_hint: &[u8],
) -> Result<(ServerKeyExchangePsk, Vec<u8>)> {
    let (params, secret) = generate_ecdh_params(group)?;
    Ok((
        ServerKeyExchangePsk {
            psk_identity_hint: Bytes::copy_from_slice(psk_identity_hint),
            params,
        },
        secret,
    ))
}

pub fn build_client_key_exchange_ecdh(client_public: Vec<u8>) -> ClientKeyExchangeEcdh {
    ClientKeyExchangeEcdh {
        public: ECPoint {
            point: Bytes::from(client_public),
        },
    }
}

pub fn build_client_key_exchange_psk(psk_identity: Vec<u8>, client_public: Vec<u8>) -> ClientKeyExchangePsk {
    ClientKeyExchangePsk {
        psk_identity: Bytes::from(psk_identity),
        public: ECPoint {
            point: Bytes::from(client_public),
        },
    }
}

/// `ECDH(E)` premaster secret: the raw shared `Z` value (RFC 4492 §5.10).
pub fn ecdh_premaster(group: NamedGroup, own_secret: &[u8], peer_public: &[u8]) -> Result<Vec<u8>> {
    group.group()?.shared_secret(own_secret, peer_public)
}

/// ECDHE_PSK premaster secret (RFC 5489 §2):
/// `len(Z) || Z || len(PSK) || PSK`.
pub fn ecdhe_psk_premaster(z: &[u8], psk: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + z.len() + psk.len());
    out.extend_from_slice(&(z.len() as u16).to_be_bytes());
    out.extend_from_slice(z);
    out.extend_from_slice(&(psk.len() as u16).to_be_bytes());
    out.extend_from_slice(psk);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdh_anon_round_trip_premaster_matches() {
        let group = NamedGroup::Secp256r1;
        let (ske, server_secret) = build_ecdh_anon_server_key_exchange(group).unwrap();

        let client_dh = group.group().unwrap();
        let client_secret = client_dh.secret_value().unwrap();
        let client_public = client_dh.public_value(&client_secret).unwrap();

        let server_premaster = ecdh_premaster(group, &server_secret, &client_public).unwrap();
        let client_premaster = ecdh_premaster(group, &client_secret, &ske.params.public.point).unwrap();
        assert_eq!(server_premaster, client_premaster);
    }

    #[test]
    fn ecdhe_ecdsa_signature_verifies_and_rejects_tamper() {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let private_bytes = signing_key.to_bytes().to_vec();
        let public_bytes = {
            use elliptic_curve::sec1::ToEncodedPoint;
            signing_key.verifying_key().to_encoded_point(false).as_bytes().to_vec()
        };

        let client_random = [0x01u8; 32];
        let server_random = [0x02u8; 32];
        let (ske, _secret) = build_ecdhe_ecdsa_server_key_exchange(
            NamedGroup::Secp256r1,
            &client_random,
            &server_random,
            &private_bytes,
        )
        .unwrap();

        assert!(verify_ecdhe_ecdsa_server_key_exchange(&ske, &client_random, &server_random, &public_bytes).is_ok());

        let mut tampered = ske.clone();
        let (scheme, sig) = tampered.signature.unwrap();
        let mut sig = sig.to_vec();
        *sig.last_mut().unwrap() ^= 0xff;
        tampered.signature = Some((scheme, Bytes::from(sig)));
        assert!(verify_ecdhe_ecdsa_server_key_exchange(&tampered, &client_random, &server_random, &public_bytes).is_err());
    }

    #[test]
    fn ecdhe_psk_premaster_matches_rfc5489_layout() {
        let z = [0xaa; 4];
        let psk = [0xbb; 3];
        let premaster = ecdhe_psk_premaster(&z, &psk);
        assert_eq!(premaster, vec![0, 4, 0xaa, 0xaa, 0xaa, 0xaa, 0, 3, 0xbb, 0xbb, 0xbb]);
    }
}
