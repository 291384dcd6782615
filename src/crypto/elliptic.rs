//! ECDH key agreement and ECDSA sign/verify over the four named curves
//! (secp256r1, secp384r1, secp521r1, x25519) this handshake negotiates.
//! Curve arithmetic is delegated to `p256`/`p384`/`p521`/`x25519-dalek`
//! and ECDSA DER encoding to the `ecdsa` crate rather than hand-rolled
//! (see DESIGN.md).

use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use signature::{Signer, Verifier};

use crate::crypto::dh::DiffieHellmanFn;
use crate::errors::*;

/// RFC 4492 `NamedCurve` codepoints used as TLS 1.2 `NamedGroup` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedGroup {
    Secp256r1,
    Secp384r1,
    Secp521r1,
    X25519,
    Unknown(u16),
}

impl NamedGroup {
    pub fn to_u16(&self) -> u16 {
        match self {
            NamedGroup::Secp256r1 => 23,
            NamedGroup::Secp384r1 => 24,
            NamedGroup::Secp521r1 => 25,
            NamedGroup::X25519 => 29,
            NamedGroup::Unknown(v) => *v,
        }
    }

    pub fn from_u16(v: u16) -> Self {
        match v {
            23 => NamedGroup::Secp256r1,
            24 => NamedGroup::Secp384r1,
            25 => NamedGroup::Secp521r1,
            29 => NamedGroup::X25519,
            _ => NamedGroup::Unknown(v),
        }
    }

    /// Returns the `DiffieHellmanFn` implementation for this group, or an
    /// `UnsupportedCurve` error for anything outside the four curves
    /// above.
    pub fn group(&self) -> Result<Box<dyn DiffieHellmanFn>> {
        Ok(match self {
            NamedGroup::Secp256r1 => Box::new(NistCurveGroup::<p256::NistP256>::new()),
            NamedGroup::Secp384r1 => Box::new(NistCurveGroup::<p384::NistP384>::new()),
            NamedGroup::Secp521r1 => Box::new(NistCurveGroup::<p521::NistP521>::new()),
            NamedGroup::X25519 => Box::new(X25519Group),
            NamedGroup::Unknown(_) => return Err(TlsError::UnsupportedCurve.into()),
        })
    }
}

/// Generic NIST prime-field curve group (secp256r1/secp384r1/secp521r1),
/// parameterized over the concrete `elliptic_curve::Curve` implementation
/// from the `p256`/`p384`/`p521` crates.
pub struct NistCurveGroup<C: elliptic_curve::Curve> {
    _marker: std::marker::PhantomData<C>,
}

impl<C: elliptic_curve::Curve> NistCurveGroup<C> {
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

macro_rules! impl_nist_dh {
    ($curve:ty) => {
        impl DiffieHellmanFn for NistCurveGroup<$curve> {
            fn secret_value(&self) -> Result<Vec<u8>> {
                let secret = elliptic_curve::SecretKey::<$curve>::random(&mut rand_core::OsRng);
                Ok(secret.to_bytes().to_vec())
            }

            fn public_value(&self, secret: &[u8]) -> Result<Vec<u8>> {
                let secret = elliptic_curve::SecretKey::<$curve>::from_slice(secret)
                    .map_err(|_| err_msg("invalid ECDH private scalar"))?;
                let point = secret.public_key().to_encoded_point(false);
                Ok(point.as_bytes().to_vec())
            }

            fn shared_secret(&self, secret: &[u8], peer_public: &[u8]) -> Result<Vec<u8>> {
                let secret = elliptic_curve::SecretKey::<$curve>::from_slice(secret)
                    .map_err(|_| err_msg("invalid ECDH private scalar"))?;
                let encoded = elliptic_curve::sec1::EncodedPoint::<$curve>::from_bytes(peer_public)
                    .map_err(|_| err_msg("invalid uncompressed EC point"))?;
                let peer_public_key: Option<elliptic_curve::PublicKey<$curve>> =
                    elliptic_curve::PublicKey::<$curve>::from_encoded_point(&encoded).into();
                let peer_public_key = peer_public_key.ok_or_else(|| err_msg("peer point not on curve"))?;

                let shared = elliptic_curve::ecdh::diffie_hellman(
                    secret.to_nonzero_scalar(),
                    peer_public_key.as_affine(),
                );
                Ok(shared.raw_secret_bytes().to_vec())
            }
        }
    };
}

impl_nist_dh!(p256::NistP256);
impl_nist_dh!(p384::NistP384);
impl_nist_dh!(p521::NistP521);

/// Curve25519 Diffie-Hellman (RFC 7748), used for `NamedGroup::X25519`.
pub struct X25519Group;

impl DiffieHellmanFn for X25519Group {
    fn secret_value(&self) -> Result<Vec<u8>> {
        let secret = x25519_dalek::StaticSecret::random_from_rng(rand_core::OsRng);
        Ok(secret.to_bytes().to_vec())
    }

    fn public_value(&self, secret: &[u8]) -> Result<Vec<u8>> {
        let secret = to_x25519_secret(secret)?;
        let public = x25519_dalek::PublicKey::from(&secret);
        Ok(public.as_bytes().to_vec())
    }

    fn shared_secret(&self, secret: &[u8], peer_public: &[u8]) -> Result<Vec<u8>> {
        let secret = to_x25519_secret(secret)?;
        let peer_bytes: [u8; 32] = peer_public
            .try_into()
            .map_err(|_| err_msg("x25519 public value must be 32 bytes"))?;
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer_bytes));
        Ok(shared.as_bytes().to_vec())
    }
}

fn to_x25519_secret(secret: &[u8]) -> Result<x25519_dalek::StaticSecret> {
    let bytes: [u8; 32] = secret
        .try_into()
        .map_err(|_| err_msg("x25519 secret must be 32 bytes"))?;
    Ok(x25519_dalek::StaticSecret::from(bytes))
}

/// Long-term ECDSA signing/verification for ECDHE_ECDSA's ServerKeyExchange
/// signature. Only secp256r1 is wired up to a signature scheme here; the
/// `TLS_ECDHE_ECDSA_WITH_*` cipher suite pairs with `ecdsa_secp256r1_sha256`.
pub fn ecdsa_p256_sign(private_key_bytes: &[u8], digest: &[u8]) -> Result<Vec<u8>> {
    let signing_key = p256::ecdsa::SigningKey::from_slice(private_key_bytes)
        .map_err(|_| err_msg("invalid ECDSA private key"))?;
    let signature: p256::ecdsa::Signature = signing_key
        .try_sign(digest)
        .map_err(|_| err_msg("ECDSA signing failed"))?;
    Ok(signature.to_der().as_bytes().to_vec())
}

pub fn ecdsa_p256_verify(public_key_bytes: &[u8], digest: &[u8], der_signature: &[u8]) -> Result<bool> {
    let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key_bytes)
        .map_err(|_| err_msg("invalid ECDSA public key"))?;
    let signature = p256::ecdsa::Signature::from_der(der_signature)
        .map_err(|_| err_msg("invalid DER ECDSA signature"))?;
    Ok(verifying_key.verify(digest, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x25519_agreement_matches() {
        let group = X25519Group;
        let a_secret = group.secret_value().unwrap();
        let b_secret = group.secret_value().unwrap();
        let a_public = group.public_value(&a_secret).unwrap();
        let b_public = group.public_value(&b_secret).unwrap();

        let a_shared = group.shared_secret(&a_secret, &b_public).unwrap();
        let b_shared = group.shared_secret(&b_secret, &a_public).unwrap();
        assert_eq!(a_shared, b_shared);
    }

    #[test]
    fn secp256r1_agreement_matches() {
        let group = NistCurveGroup::<p256::NistP256>::new();
        let a_secret = group.secret_value().unwrap();
        let b_secret = group.secret_value().unwrap();
        let a_public = group.public_value(&a_secret).unwrap();
        let b_public = group.public_value(&b_secret).unwrap();

        let a_shared = group.shared_secret(&a_secret, &b_public).unwrap();
        let b_shared = group.shared_secret(&b_secret, &a_public).unwrap();
        assert_eq!(a_shared, b_shared);
    }

    #[test]
    fn ecdsa_sign_verify_round_trip() {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
        let private_bytes = signing_key.to_bytes();
        let public_bytes = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let digest = [0x42u8; 32];
        let sig = ecdsa_p256_sign(&private_bytes, &digest).unwrap();
        assert!(ecdsa_p256_verify(&public_bytes, &digest, &sig).unwrap());

        let mut bad_sig = sig.clone();
        *bad_sig.last_mut().unwrap() ^= 0xff;
        assert!(!ecdsa_p256_verify(&public_bytes, &digest, &bad_sig).unwrap_or(false));
    }
}
