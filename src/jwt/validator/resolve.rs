use jsonwebtoken::jwk::Jwk;
use log::debug;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::error::Error;
use crate::jwt::jwks::{redact_jwks_uri, JwksCache};
use crate::jwt::key::Key;
use crate::jwt::types::Header;

/// Where the verification key for a token comes from.
#[derive(Clone)]
pub enum KeyStrategy {
    /// The given key, regardless of header contents.
    Static(Key),
    /// The public key carried in the header's `jwk` parameter.
    EmbeddedJwk,
    /// The key matching the header `kid` in the JWKS served at `url`.
    JwksUrl { url: String, jwks: Arc<JwksCache> },
    /// The key matching the header `kid` in the JWKS served at the header `jku`.
    ///
    /// A non-empty `trusted_prefixes` limits which `jku` values are fetched;
    /// an empty list fetches any well-formed URL without credentials.
    JwksFromHeader {
        jwks: Arc<JwksCache>,
        trusted_prefixes: Vec<String>,
    },
}

impl KeyStrategy {
    pub fn jwks_url(url: impl Into<String>, jwks: Arc<JwksCache>) -> Self {
        KeyStrategy::JwksUrl {
            url: url.into(),
            jwks,
        }
    }

    pub fn jwks_from_header<I, S>(jwks: Arc<JwksCache>, trusted_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyStrategy::JwksFromHeader {
            jwks,
            trusted_prefixes: trusted_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Produces exactly one key for `header` or fails; there is no fallback
    /// between strategies.
    pub fn resolve(&self, header: &Header, deadline: Option<Instant>) -> Result<Cow<'_, Key>, Error> {
        match self {
            KeyStrategy::Static(key) => Ok(Cow::Borrowed(key)),
            KeyStrategy::EmbeddedJwk => embedded_key(header).map(Cow::Owned),
            KeyStrategy::JwksUrl { url, jwks } => {
                let kid = required_kid(header)?;
                let jwk = jwks.find_key(url, kid, deadline).map_err(|err| jwks_error(url, err))?;
                jwk_to_key(&jwk, header).map(Cow::Owned)
            }
            KeyStrategy::JwksFromHeader {
                jwks,
                trusted_prefixes,
            } => {
                let url = trusted_jku(header, trusted_prefixes)?;
                let kid = required_kid(header)?;
                let jwk = jwks
                    .find_key(url.as_str(), kid, deadline)
                    .map_err(|err| jwks_error(url.as_str(), err))?;
                jwk_to_key(&jwk, header).map(Cow::Owned)
            }
        }
    }
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeyStrategy::EmbeddedJwk => f.write_str("EmbeddedJwk"),
            KeyStrategy::JwksUrl { url, .. } => {
                f.debug_struct("JwksUrl").field("url", url).finish()
            }
            KeyStrategy::JwksFromHeader {
                trusted_prefixes, ..
            } => f
                .debug_struct("JwksFromHeader")
                .field("trusted_prefixes", trusted_prefixes)
                .finish(),
        }
    }
}

pub(super) fn embedded_key(header: &Header) -> Result<Key, Error> {
    let jwk = header.jwk.as_ref().ok_or(Error::JsonWebKeyIsEmpty)?;
    debug!("resolving {} key from embedded jwk", header.alg);
    Key::from_jwk(jwk, &header.alg)
}

pub(super) fn required_kid(header: &Header) -> Result<&str, Error> {
    header
        .kid
        .as_deref()
        .ok_or_else(|| Error::JwkSetIsEmpty("token header has no kid".to_string()))
}

pub(super) fn jwk_to_key(jwk: &Jwk, header: &Header) -> Result<Key, Error> {
    debug!(
        "resolving {} key from jwks kid={}",
        header.alg,
        header.kid.as_deref().unwrap_or("<none>")
    );
    Key::from_jwk(jwk, &header.alg)
}

/// Keeps the lookup outcomes callers act on and folds transport failures
/// into `JwkSetIsEmpty`.
pub(super) fn jwks_error(url: &str, err: Error) -> Error {
    match err {
        Error::KidNotFound(_) | Error::JwkSetIsEmpty(_) => err,
        other => {
            let location = Url::parse(url)
                .map(|url| redact_jwks_uri(&url))
                .unwrap_or_else(|_| "<invalid url>".to_string());
            Error::JwkSetIsEmpty(format!("{location}: {other}"))
        }
    }
}

pub(super) fn trusted_jku(header: &Header, trusted_prefixes: &[String]) -> Result<Url, Error> {
    let jku = header
        .jku
        .as_deref()
        .ok_or_else(|| Error::JwkSetIsEmpty("token header has no jku".to_string()))?;
    let url = Url::parse(jku)
        .map_err(|e| Error::JwkSetIsEmpty(format!("token header jku is invalid: {e}")))?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err(Error::JwkSetIsEmpty(
            "token header jku carries credentials".to_string(),
        ));
    }
    if !trusted_prefixes.is_empty()
        && !trusted_prefixes
            .iter()
            .any(|prefix| url.as_str().starts_with(prefix.as_str()))
    {
        return Err(Error::JwkSetIsEmpty(format!(
            "token header jku {} is not trusted",
            redact_jwks_uri(&url)
        )));
    }
    Ok(url)
}
