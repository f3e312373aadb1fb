use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::resolve::{embedded_key, jwk_to_key, jwks_error, required_kid, trusted_jku};
use super::verify::{check_alg, finish, parse_token};
use crate::error::Error;
use crate::jwt::jwks::JwksCacheAsync;
use crate::jwt::key::Key;
use crate::jwt::registry::Registry;
use crate::jwt::types::{Header, TokenData, ValidationOptions};

/// Key strategies for [`VerifierAsync`]; JWKS lookups go through [`JwksCacheAsync`].
#[derive(Clone)]
pub enum AsyncKeyStrategy {
    Static(Key),
    EmbeddedJwk,
    JwksUrl {
        url: String,
        jwks: Arc<JwksCacheAsync>,
    },
    JwksFromHeader {
        jwks: Arc<JwksCacheAsync>,
        trusted_prefixes: Vec<String>,
    },
}

impl AsyncKeyStrategy {
    pub fn jwks_url(url: impl Into<String>, jwks: Arc<JwksCacheAsync>) -> Self {
        AsyncKeyStrategy::JwksUrl {
            url: url.into(),
            jwks,
        }
    }

    pub fn jwks_from_header<I, S>(jwks: Arc<JwksCacheAsync>, trusted_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AsyncKeyStrategy::JwksFromHeader {
            jwks,
            trusted_prefixes: trusted_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn resolve(
        &self,
        header: &Header,
        deadline: Option<Instant>,
    ) -> Result<Cow<'_, Key>, Error> {
        match self {
            AsyncKeyStrategy::Static(key) => Ok(Cow::Borrowed(key)),
            AsyncKeyStrategy::EmbeddedJwk => embedded_key(header).map(Cow::Owned),
            AsyncKeyStrategy::JwksUrl { url, jwks } => {
                let kid = required_kid(header)?;
                let jwk = jwks
                    .find_key(url, kid, deadline)
                    .await
                    .map_err(|err| jwks_error(url, err))?;
                jwk_to_key(&jwk, header).map(Cow::Owned)
            }
            AsyncKeyStrategy::JwksFromHeader {
                jwks,
                trusted_prefixes,
            } => {
                let url = trusted_jku(header, trusted_prefixes)?;
                let kid = required_kid(header)?;
                let jwk = jwks
                    .find_key(url.as_str(), kid, deadline)
                    .await
                    .map_err(|err| jwks_error(url.as_str(), err))?;
                jwk_to_key(&jwk, header).map(Cow::Owned)
            }
        }
    }
}

impl fmt::Debug for AsyncKeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncKeyStrategy::Static(key) => f.debug_tuple("Static").field(key).finish(),
            AsyncKeyStrategy::EmbeddedJwk => f.write_str("EmbeddedJwk"),
            AsyncKeyStrategy::JwksUrl { url, .. } => {
                f.debug_struct("JwksUrl").field("url", url).finish()
            }
            AsyncKeyStrategy::JwksFromHeader {
                trusted_prefixes, ..
            } => f
                .debug_struct("JwksFromHeader")
                .field("trusted_prefixes", trusted_prefixes)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifierAsync {
    registry: Arc<Registry>,
    strategy: AsyncKeyStrategy,
    options: ValidationOptions,
    allowed_algs: Option<Vec<String>>,
}

impl VerifierAsync {
    pub fn new(registry: Arc<Registry>, strategy: AsyncKeyStrategy) -> Self {
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

    pub fn with_allowed_algs<I, S>(mut self, algs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_algs = Some(algs.into_iter().map(Into::into).collect());
        self
    }

    pub async fn verify(&self, token: &str) -> Result<TokenData, Error> {
        self.verify_with_deadline(token, None).await
    }

    pub async fn verify_before(&self, token: &str, deadline: Instant) -> Result<TokenData, Error> {
        self.verify_with_deadline(token, Some(deadline)).await
    }

    async fn verify_with_deadline(
        &self,
        token: &str,
        deadline: Option<Instant>,
    ) -> Result<TokenData, Error> {
        let (parts, header) = parse_token(token)?;
        check_alg(&header, self.allowed_algs.as_deref())?;
        let key = self.strategy.resolve(&header, deadline).await?;
        finish(&self.registry, &key, &parts, header, &self.options)
    }
}
