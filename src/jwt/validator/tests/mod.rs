
use crate::error::Error;
use crate::jwt::jwks::JwksFetcher;
use crate::jwt::key::Key;
use jsonwebtoken::jwk::JwkSet;
use rand::thread_rng;
use rsa::RsaPrivateKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

pub(super) const JWKS_URL: &str = "https://keys.example.com/jwks.json";
pub(super) const NOW: i64 = 1_700_000_000;

pub(super) fn rsa_key() -> Key {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    Key::RsaPrivate(
        KEY.get_or_init(|| RsaPrivateKey::new(&mut thread_rng(), 2048).expect("private key"))
            .clone(),
    )
}

pub(super) fn p256_key() -> Key {
    Key::from(p256::ecdsa::SigningKey::random(&mut thread_rng()))
}

pub(super) fn jwks_of(keys: &[(&Key, &str)]) -> JwkSet {
    JwkSet {
        keys: keys
            .iter()
            .map(|(key, kid)| key.to_jwk(Some(kid)).expect("jwk"))
            .collect(),
    }
}

/// Returns a fixed result and counts calls.
pub(super) struct StaticFetcher {
    jwks: Option<JwkSet>,
    pub(super) calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub(super) fn serving(jwks: JwkSet) -> Self {
        Self {
            jwks: Some(jwks),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            jwks: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl JwksFetcher for StaticFetcher {
    fn fetch(&self, _url: &Url, _timeout: Option<Duration>) -> Result<JwkSet, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.jwks
            .clone()
            .ok_or_else(|| Error::Crypto("connection refused".to_string()))
    }
}
