use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, PublicKeyUse};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use p521::ecdsa::{SigningKey as P521SigningKey, VerifyingKey as P521VerifyingKey};
use pem::parse_many;
use pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde_json::json;
use std::fmt;

use super::codec::{base64_url_decode, base64_url_encode};
use crate::error::Error;

/// Key material tagged by kind; algorithms accept only the kinds of their family.
#[derive(Clone)]
pub enum Key {
    Hmac(Vec<u8>),
    RsaPrivate(RsaPrivateKey),
    RsaPublic(RsaPublicKey),
    EcdsaPrivate(EcdsaPrivateKey),
    EcdsaPublic(EcdsaPublicKey),
}

#[derive(Clone)]
pub enum EcdsaPrivateKey {
    P256(P256SigningKey),
    P384(P384SigningKey),
    P521(P521SigningKey),
}

#[derive(Clone)]
pub enum EcdsaPublicKey {
    P256(P256VerifyingKey),
    P384(P384VerifyingKey),
    P521(P521VerifyingKey),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    /// Byte width of one coordinate, and of each of `r` and `s` in a JWS signature.
    pub fn coordinate_size(self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    fn jwk_name(self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    fn from_jwk_curve(curve: &EllipticCurve) -> Option<Self> {
        match curve {
            EllipticCurve::P256 => Some(EcCurve::P256),
            EllipticCurve::P384 => Some(EcCurve::P384),
            EllipticCurve::P521 => Some(EcCurve::P521),
            _ => None,
        }
    }

    fn for_alg(alg: &str) -> Option<Self> {
        match alg {
            "ES256" => Some(EcCurve::P256),
            "ES384" => Some(EcCurve::P384),
            "ES512" => Some(EcCurve::P521),
            _ => None,
        }
    }
}

impl EcdsaPrivateKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            EcdsaPrivateKey::P256(_) => EcCurve::P256,
            EcdsaPrivateKey::P384(_) => EcCurve::P384,
            EcdsaPrivateKey::P521(_) => EcCurve::P521,
        }
    }

    pub fn public_key(&self) -> EcdsaPublicKey {
        match self {
            EcdsaPrivateKey::P256(key) => EcdsaPublicKey::P256(P256VerifyingKey::from(key)),
            EcdsaPrivateKey::P384(key) => EcdsaPublicKey::P384(P384VerifyingKey::from(key)),
            EcdsaPrivateKey::P521(key) => EcdsaPublicKey::P521(P521VerifyingKey::from(key)),
        }
    }
}

impl EcdsaPublicKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            EcdsaPublicKey::P256(_) => EcCurve::P256,
            EcdsaPublicKey::P384(_) => EcCurve::P384,
            EcdsaPublicKey::P521(_) => EcCurve::P521,
        }
    }

    fn uncompressed_point(&self) -> Vec<u8> {
        match self {
            EcdsaPublicKey::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            EcdsaPublicKey::P384(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            EcdsaPublicKey::P521(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        }
    }
}

impl Key {
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        Key::Hmac(secret.into())
    }

    /// Loads the first usable RSA or EC key (private or public) from PEM text.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, Error> {
        let blocks =
            parse_many(pem_bytes).map_err(|e| Error::Crypto(format!("pem parse error: {e}")))?;
        for block in blocks {
            let der = block.contents();
            let parsed = match block.tag() {
                "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(der).ok().map(Key::RsaPrivate),
                "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_der(der).ok().map(Key::RsaPublic),
                "EC PRIVATE KEY" => parse_ec_private_sec1(der),
                "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(der)
                    .ok()
                    .map(Key::RsaPrivate)
                    .or_else(|| parse_ec_private_pkcs8(der)),
                "PUBLIC KEY" => RsaPublicKey::from_public_key_der(der)
                    .ok()
                    .map(Key::RsaPublic)
                    .or_else(|| parse_ec_public_spki(der)),
                _ => None,
            };
            if let Some(key) = parsed {
                return Ok(key);
            }
        }
        Err(Error::Crypto("unsupported key format".to_string()))
    }

    /// Builds the verification key a JWK describes, provided it may be used with `alg`.
    ///
    /// Symmetric (`oct`) keys are refused: a JWK travels with or is selected by the
    /// token, so an HMAC secret from that source would let anyone mint tokens.
    pub fn from_jwk(jwk: &Jwk, alg: &str) -> Result<Self, Error> {
        if let Some(usage) = jwk.common.public_key_use.as_ref() {
            if *usage != PublicKeyUse::Signature {
                return Err(Error::key_not_for_alg(alg, "jwk use is not sig"));
            }
        }
        if let Some(key_alg) = jwk.common.key_algorithm.as_ref() {
            let key_alg = key_alg.to_string();
            if key_alg != alg {
                return Err(Error::key_not_for_alg(
                    alg,
                    format!("jwk is declared for {key_alg}"),
                ));
            }
        }
        match &jwk.algorithm {
            AlgorithmParameters::RSA(params) => {
                if !(alg.starts_with("RS") || alg.starts_with("PS")) {
                    return Err(Error::key_not_for_alg(alg, "jwk kty is RSA"));
                }
                let n = decode_jwk_uint(&params.n, "n")?;
                let e = decode_jwk_uint(&params.e, "e")?;
                let key = RsaPublicKey::new(n, e)
                    .map_err(|e| Error::Crypto(format!("rsa jwk error: {e}")))?;
                Ok(Key::RsaPublic(key))
            }
            AlgorithmParameters::EllipticCurve(params) => {
                let Some(curve) = EcCurve::from_jwk_curve(&params.curve) else {
                    return Err(Error::key_not_for_alg(alg, "unsupported jwk curve"));
                };
                if EcCurve::for_alg(alg) != Some(curve) {
                    return Err(Error::key_not_for_alg(
                        alg,
                        format!("jwk curve is {}", curve.jwk_name()),
                    ));
                }
                let size = curve.coordinate_size();
                let x = decode_ec_coord(&params.x, size)?;
                let y = decode_ec_coord(&params.y, size)?;
                let mut sec1 = Vec::with_capacity(1 + 2 * size);
                sec1.push(0x04);
                sec1.extend_from_slice(&x);
                sec1.extend_from_slice(&y);
                ec_public_from_sec1(curve, &sec1).map(Key::EcdsaPublic)
            }
            AlgorithmParameters::OctetKey(_) => Err(Error::key_not_for_alg(
                alg,
                "symmetric jwk keys are not accepted",
            )),
            _ => Err(Error::key_not_for_alg(alg, "unsupported jwk kty")),
        }
    }

    /// Public JWK for this key, suitable for a header `jwk` or a JWKS document.
    pub fn to_jwk(&self, kid: Option<&str>) -> Result<Jwk, Error> {
        let mut value = match self.to_public() {
            Key::RsaPublic(key) => json!({
                "kty": "RSA",
                "n": base64_url_encode(key.n().to_bytes_be()),
                "e": base64_url_encode(key.e().to_bytes_be()),
            }),
            Key::EcdsaPublic(key) => {
                let curve = key.curve();
                let size = curve.coordinate_size();
                let point = key.uncompressed_point();
                json!({
                    "kty": "EC",
                    "crv": curve.jwk_name(),
                    "x": base64_url_encode(&point[1..1 + size]),
                    "y": base64_url_encode(&point[1 + size..]),
                })
            }
            _ => {
                return Err(Error::Crypto(
                    "hmac secrets are not exported as jwk".to_string(),
                ))
            }
        };
        if let Some(kid) = kid {
            value["kid"] = json!(kid);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// The verification counterpart; public and HMAC keys are returned unchanged.
    pub fn to_public(&self) -> Key {
        match self {
            Key::RsaPrivate(key) => Key::RsaPublic(key.to_public_key()),
            Key::EcdsaPrivate(key) => Key::EcdsaPublic(key.public_key()),
            other => other.clone(),
        }
    }

    /// Human readable kind, used in errors instead of key material.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Key::Hmac(_) => "hmac secret",
            Key::RsaPrivate(_) => "rsa private key",
            Key::RsaPublic(_) => "rsa public key",
            Key::EcdsaPrivate(key) => match key.curve() {
                EcCurve::P256 => "ecdsa P-256 private key",
                EcCurve::P384 => "ecdsa P-384 private key",
                EcCurve::P521 => "ecdsa P-521 private key",
            },
            Key::EcdsaPublic(key) => match key.curve() {
                EcCurve::P256 => "ecdsa P-256 public key",
                EcCurve::P384 => "ecdsa P-384 public key",
                EcCurve::P521 => "ecdsa P-521 public key",
            },
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.kind_name()).finish()
    }
}

impl fmt::Debug for EcdsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EcdsaPrivateKey")
            .field(&self.curve().jwk_name())
            .finish()
    }
}

impl fmt::Debug for EcdsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EcdsaPublicKey")
            .field(&self.curve().jwk_name())
            .finish()
    }
}

impl From<RsaPrivateKey> for Key {
    fn from(key: RsaPrivateKey) -> Self {
        Key::RsaPrivate(key)
    }
}

impl From<RsaPublicKey> for Key {
    fn from(key: RsaPublicKey) -> Self {
        Key::RsaPublic(key)
    }
}

impl From<P256SigningKey> for Key {
    fn from(key: P256SigningKey) -> Self {
        Key::EcdsaPrivate(EcdsaPrivateKey::P256(key))
    }
}

impl From<P384SigningKey> for Key {
    fn from(key: P384SigningKey) -> Self {
        Key::EcdsaPrivate(EcdsaPrivateKey::P384(key))
    }
}

impl From<P521SigningKey> for Key {
    fn from(key: P521SigningKey) -> Self {
        Key::EcdsaPrivate(EcdsaPrivateKey::P521(key))
    }
}

fn parse_ec_private_pkcs8(der: &[u8]) -> Option<Key> {
    if let Ok(secret) = p256::SecretKey::from_pkcs8_der(der) {
        return Some(P256SigningKey::from(secret).into());
    }
    if let Ok(secret) = p384::SecretKey::from_pkcs8_der(der) {
        return Some(P384SigningKey::from(secret).into());
    }
    if let Ok(secret) = p521::SecretKey::from_pkcs8_der(der) {
        return P521SigningKey::from_bytes(&secret.to_bytes())
            .ok()
            .map(Key::from);
    }
    None
}

fn parse_ec_private_sec1(der: &[u8]) -> Option<Key> {
    if let Ok(secret) = p256::SecretKey::from_sec1_der(der) {
        return Some(P256SigningKey::from(secret).into());
    }
    if let Ok(secret) = p384::SecretKey::from_sec1_der(der) {
        return Some(P384SigningKey::from(secret).into());
    }
    if let Ok(secret) = p521::SecretKey::from_sec1_der(der) {
        return P521SigningKey::from_bytes(&secret.to_bytes())
            .ok()
            .map(Key::from);
    }
    None
}

fn parse_ec_public_spki(der: &[u8]) -> Option<Key> {
    if let Ok(public_key) = p256::PublicKey::from_public_key_der(der) {
        return Some(Key::EcdsaPublic(EcdsaPublicKey::P256(
            P256VerifyingKey::from(public_key),
        )));
    }
    if let Ok(public_key) = p384::PublicKey::from_public_key_der(der) {
        return Some(Key::EcdsaPublic(EcdsaPublicKey::P384(
            P384VerifyingKey::from(public_key),
        )));
    }
    if let Ok(public_key) = p521::PublicKey::from_public_key_der(der) {
        let encoded = public_key.to_encoded_point(false);
        return P521VerifyingKey::from_encoded_point(&encoded)
            .ok()
            .map(|key| Key::EcdsaPublic(EcdsaPublicKey::P521(key)));
    }
    None
}

fn ec_public_from_sec1(curve: EcCurve, sec1: &[u8]) -> Result<EcdsaPublicKey, Error> {
    let invalid = |e: signature::Error| Error::Crypto(format!("ec jwk point error: {e}"));
    match curve {
        EcCurve::P256 => P256VerifyingKey::from_sec1_bytes(sec1)
            .map(EcdsaPublicKey::P256)
            .map_err(invalid),
        EcCurve::P384 => P384VerifyingKey::from_sec1_bytes(sec1)
            .map(EcdsaPublicKey::P384)
            .map_err(invalid),
        EcCurve::P521 => P521VerifyingKey::from_sec1_bytes(sec1)
            .map(EcdsaPublicKey::P521)
            .map_err(invalid),
    }
}

fn decode_jwk_uint(value: &str, field: &str) -> Result<BigUint, Error> {
    let bytes = base64_url_decode(value, field)
        .map_err(|_| Error::Crypto(format!("rsa jwk {field} is not base64url")))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

// Coordinates may arrive without their leading zero bytes; restore the fixed width.
fn decode_ec_coord(value: &str, size: usize) -> Result<Vec<u8>, Error> {
    let bytes = base64_url_decode(value, "coordinate")
        .map_err(|_| Error::Crypto("ec jwk coordinate is not base64url".to_string()))?;
    if bytes.len() > size {
        return Err(Error::Crypto(format!(
            "ec jwk coordinate is {} bytes, expected at most {size}",
            bytes.len()
        )));
    }
    let mut padded = vec![0u8; size - bytes.len()];
    padded.extend_from_slice(&bytes);
    Ok(padded)
}
