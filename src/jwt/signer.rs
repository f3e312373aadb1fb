use log::debug;
use std::sync::Arc;

use super::codec::{encode_claims, encode_header};
use super::key::Key;
use super::registry::Registry;
use super::types::{ClaimsSet, Header};
use crate::error::Error;

/// Produces a compact JWS: `header.payload.signature`.
///
/// Codec failures surface as `InvalidPrivateParameters` / `InvalidPrivateClaims`
/// before any signing happens.
pub fn sign(
    registry: &Registry,
    header: &Header,
    claims: &ClaimsSet,
    key: &Key,
) -> Result<String, Error> {
    let signing_input = format!("{}.{}", encode_header(header)?, encode_claims(claims)?);
    let signature = registry.lookup(&header.alg).sign(key, &signing_input)?;
    debug!("signed token alg={} key={}", header.alg, key.kind_name());
    Ok(format!("{signing_input}.{signature}"))
}

/// Holds a signing key and a shared registry for repeated signing.
#[derive(Debug, Clone)]
pub struct JwtSigner {
    registry: Arc<Registry>,
    key: Key,
    kid: Option<String>,
}

impl JwtSigner {
    pub fn new(registry: Arc<Registry>, key: Key) -> Self {
        Self {
            registry,
            key,
            kid: None,
        }
    }

    /// Creates a signer from a PEM encoded RSA or EC private key.
    pub fn from_pem(registry: Arc<Registry>, private_key_pem: &[u8]) -> Result<Self, Error> {
        let key = Key::from_pem(private_key_pem)?;
        Ok(Self::new(registry, key))
    }

    /// Sets the `kid` placed in headers built by [`Self::sign_claims`].
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn sign(&self, header: &Header, claims: &ClaimsSet) -> Result<String, Error> {
        sign(&self.registry, header, claims, &self.key)
    }

    pub fn sign_claims(&self, alg: &str, claims: &ClaimsSet) -> Result<String, Error> {
        let mut header = Header::new(alg);
        header.kid = self.kid.clone();
        self.sign(&header, claims)
    }
}
