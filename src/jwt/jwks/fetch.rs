use crate::error::{read_body_with_limit, Error, MAX_ERROR_BODY_BYTES};
use jsonwebtoken::jwk::JwkSet;
use reqwest::blocking::Client as HttpClient;
use std::time::Duration;
use url::Url;

use super::sanitize::{jwks_from_slice, redact_jwks_uri, sanitize_error_body};

/// Retrieves a JWKS document. The cache calls this on a miss, on expiry and
/// on a rate-limited refresh; implementations need no caching of their own.
pub trait JwksFetcher: Send + Sync {
    /// `timeout` is already clamped to the caller's deadline, if any.
    fn fetch(&self, url: &Url, timeout: Option<Duration>) -> Result<JwkSet, Error>;
}

/// Blocking HTTP GET of a JWKS document.
#[derive(Debug, Clone)]
pub struct HttpJwksFetcher {
    http: HttpClient,
}

impl HttpJwksFetcher {
    pub fn new() -> Result<Self, Error> {
        let http = HttpClient::builder().build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: HttpClient) -> Self {
        Self { http }
    }
}

impl JwksFetcher for HttpJwksFetcher {
    fn fetch(&self, url: &Url, timeout: Option<Duration>) -> Result<JwkSet, Error> {
        let mut req = self.http.get(url.clone());
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let mut resp = req.send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = read_body_with_limit(&mut resp, MAX_ERROR_BODY_BYTES)?;
            return Err(fetch_status_error(url, status, &body));
        }
        let body = resp.bytes()?;
        jwks_from_slice(&body)
    }
}

pub(super) fn fetch_status_error(url: &Url, status: reqwest::StatusCode, body: &[u8]) -> Error {
    let body_preview = sanitize_error_body(body);
    let redacted = redact_jwks_uri(url);
    Error::Crypto(if body_preview.is_empty() {
        format!(
            "jwks fetch failed: uri {} status {} body_read_len {}",
            redacted,
            status,
            body.len()
        )
    } else {
        format!(
            "jwks fetch failed: uri {} status {} body_read_len {} body_preview {}",
            redacted,
            status,
            body.len(),
            body_preview
        )
    })
}
