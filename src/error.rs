use std::io::Read;

pub(crate) const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

/// Taxonomy of failures, independent of the context each [`Error`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidTokenReceived,
    InvalidJson,
    InvalidPrivateParameters,
    InvalidPrivateClaims,
    InvalidKeyReceived,
    NotImplemented,
    AlgorithmNoneNotSupported,
    FailedToVerifySignature,
    TokenIsExpired,
    AudienceIsNotMatch,
    IssuerIsNotMatch,
    JsonWebKeyIsEmpty,
    JwkSetIsEmpty,
    KidNotFound,
    KeyIsNotForAlgorithm,
    Json,
    Crypto,
    Url,
    Http,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid token received: {0}")]
    InvalidTokenReceived(String),
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("invalid private parameters: {0}")]
    InvalidPrivateParameters(String),
    #[error("invalid private claims: {0}")]
    InvalidPrivateClaims(String),
    #[error("invalid key received: {alg} cannot use {key}")]
    InvalidKeyReceived { alg: String, key: &'static str },
    #[error("algorithm not implemented: {0}")]
    NotImplemented(String),
    #[error("algorithm none is not supported")]
    AlgorithmNoneNotSupported,
    #[error("failed to verify {alg} signature: {reason}")]
    FailedToVerifySignature { alg: String, reason: String },
    #[error("token is expired")]
    TokenIsExpired,
    #[error("audience does not match: {0}")]
    AudienceIsNotMatch(String),
    #[error("issuer does not match: {0}")]
    IssuerIsNotMatch(String),
    #[error("json web key is empty")]
    JsonWebKeyIsEmpty,
    #[error("jwk set is empty: {0}")]
    JwkSetIsEmpty(String),
    #[error("kid not found: {0}")]
    KidNotFound(String),
    #[error("key is not for algorithm {alg}: {reason}")]
    KeyIsNotForAlgorithm { alg: String, reason: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidTokenReceived(_) => ErrorKind::InvalidTokenReceived,
            Error::InvalidJson(_) => ErrorKind::InvalidJson,
            Error::InvalidPrivateParameters(_) => ErrorKind::InvalidPrivateParameters,
            Error::InvalidPrivateClaims(_) => ErrorKind::InvalidPrivateClaims,
            Error::InvalidKeyReceived { .. } => ErrorKind::InvalidKeyReceived,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::AlgorithmNoneNotSupported => ErrorKind::AlgorithmNoneNotSupported,
            Error::FailedToVerifySignature { .. } => ErrorKind::FailedToVerifySignature,
            Error::TokenIsExpired => ErrorKind::TokenIsExpired,
            Error::AudienceIsNotMatch(_) => ErrorKind::AudienceIsNotMatch,
            Error::IssuerIsNotMatch(_) => ErrorKind::IssuerIsNotMatch,
            Error::JsonWebKeyIsEmpty => ErrorKind::JsonWebKeyIsEmpty,
            Error::JwkSetIsEmpty(_) => ErrorKind::JwkSetIsEmpty,
            Error::KidNotFound(_) => ErrorKind::KidNotFound,
            Error::KeyIsNotForAlgorithm { .. } => ErrorKind::KeyIsNotForAlgorithm,
            Error::Json(_) => ErrorKind::Json,
            Error::Crypto(_) => ErrorKind::Crypto,
            Error::Url(_) => ErrorKind::Url,
            Error::Http(_) => ErrorKind::Http,
        }
    }

    pub(crate) fn key_not_for_alg(alg: &str, reason: impl Into<String>) -> Self {
        Error::KeyIsNotForAlgorithm {
            alg: alg.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_signature(alg: &str, reason: impl Into<String>) -> Self {
        Error::FailedToVerifySignature {
            alg: alg.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn read_body_with_limit(
    resp: &mut reqwest::blocking::Response,
    limit: usize,
) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    resp.by_ref()
        .take(limit as u64)
        .read_to_end(&mut body)
        .map_err(|e| Error::Crypto(format!("error body read failed: {e}")))?;
    Ok(body)
}

#[cfg(feature = "async-validate")]
pub(crate) async fn read_body_with_limit_async(
    resp: &mut reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let remaining = limit.saturating_sub(body.len());
        if remaining == 0 {
            break;
        }
        let take = remaining.min(chunk.len());
        body.extend_from_slice(&chunk[..take]);
    }
    Ok(body)
}
