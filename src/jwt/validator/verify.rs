use log::debug;
use std::sync::Arc;
use std::time::Instant;

use super::claims::validate_claims;
use super::resolve::KeyStrategy;
use crate::error::Error;
use crate::jwt::codec::{decode_claims, decode_header, split_token, TokenParts};
use crate::jwt::constants::ALG_NONE;
use crate::jwt::key::Key;
use crate::jwt::registry::Registry;
use crate::jwt::types::{Header, TokenData, ValidationOptions};

/// Verifies compact tokens with one key strategy and one set of claim rules.
#[derive(Debug, Clone)]
pub struct Verifier {
    registry: Arc<Registry>,
    strategy: KeyStrategy,
    options: ValidationOptions,
    allowed_algs: Option<Vec<String>>,
}

impl Verifier {
    pub fn new(registry: Arc<Registry>, strategy: KeyStrategy) -> Self {
        Self {
            registry,
            strategy,
            options: ValidationOptions::default(),
            allowed_algs: None,
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Restricts accepted `alg` values; others fail with `NotImplemented`
    /// before any key is resolved.
    pub fn with_allowed_algs<I, S>(mut self, algs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_algs = Some(algs.into_iter().map(Into::into).collect());
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn verify(&self, token: &str) -> Result<TokenData, Error> {
        self.verify_with_deadline(token, None)
    }

    /// Like [`Self::verify`], giving up on JWKS fetches that would run past `deadline`.
    pub fn verify_before(&self, token: &str, deadline: Instant) -> Result<TokenData, Error> {
        self.verify_with_deadline(token, Some(deadline))
    }

    fn verify_with_deadline(
        &self,
        token: &str,
        deadline: Option<Instant>,
    ) -> Result<TokenData, Error> {
        let (parts, header) = parse_token(token)?;
        check_alg(&header, self.allowed_algs.as_deref())?;
        let key = self.strategy.resolve(&header, deadline)?;
        finish(&self.registry, &key, &parts, header, &self.options)
    }
}

pub(super) fn parse_token(token: &str) -> Result<(TokenParts<'_>, Header), Error> {
    let parts = split_token(token)?;
    let header = decode_header(parts.header)?;
    Ok((parts, header))
}

pub(super) fn check_alg(header: &Header, allowed_algs: Option<&[String]>) -> Result<(), Error> {
    if header.alg == ALG_NONE {
        return Err(Error::AlgorithmNoneNotSupported);
    }
    if let Some(allowed) = allowed_algs {
        if !allowed.iter().any(|alg| *alg == header.alg) {
            return Err(Error::NotImplemented(header.alg.clone()));
        }
    }
    Ok(())
}

pub(super) fn finish(
    registry: &Registry,
    key: &Key,
    parts: &TokenParts<'_>,
    header: Header,
    options: &ValidationOptions,
) -> Result<TokenData, Error> {
    registry
        .lookup(&header.alg)
        .verify(key, &parts.signing_input(), parts.signature)?;
    let claims = decode_claims(parts.payload)?;
    validate_claims(&claims, options)?;
    debug!("verified token alg={} key={}", header.alg, key.kind_name());
    Ok(TokenData { header, claims })
}
