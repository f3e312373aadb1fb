use crate::error::{read_body_with_limit_async, Error, MAX_ERROR_BODY_BYTES};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use log::{debug, warn};
use reqwest::Client as AsyncHttpClient;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock};
use url::Url;

use super::super::constants::{DEFAULT_JWKS_CACHE_TTL, DEFAULT_JWKS_TIMEOUT, MIN_REFRESH_INTERVAL};
use super::cache::{effective_timeout, find_by_kid, CachedJwks, FetchSource};
use super::fetch::fetch_status_error;
use super::sanitize::{jwks_from_slice, redact_jwks_uri};

/// Async counterpart of [`super::JwksCache`], fetching with a non-blocking client.
#[derive(Debug)]
pub struct JwksCacheAsync {
    http: AsyncHttpClient,
    timeout: Option<Duration>,
    cache_ttl: Duration,
    slots: RwLock<HashMap<String, Arc<AsyncCacheSlot>>>,
}

#[derive(Debug, Default)]
pub(super) struct AsyncCacheSlot {
    pub(super) entry: AsyncRwLock<Option<CachedJwks>>,
    fetch_lock: AsyncMutex<()>,
}

impl AsyncCacheSlot {
    async fn fresh(&self, now: Instant) -> Option<JwkSet> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.expires_at > now)
            .map(|cached| cached.jwks.clone())
    }

    async fn recently_fetched(&self, now: Instant) -> Option<JwkSet> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.fetched_at + MIN_REFRESH_INTERVAL > now)
            .map(|cached| cached.jwks.clone())
    }
}

impl JwksCacheAsync {
    pub fn new() -> Result<Self, Error> {
        let http = AsyncHttpClient::builder().build()?;
        Ok(Self {
            http,
            timeout: Some(DEFAULT_JWKS_TIMEOUT),
            cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            slots: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_http_client(mut self, http: AsyncHttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Sets the TTL; entries already cached restart their window with it.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        let now = Instant::now();
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.values() {
            if let Ok(mut entry) = slot.entry.try_write() {
                if let Some(cached) = entry.as_mut() {
                    cached.expires_at = now + ttl;
                    cached.fetched_at = now;
                }
            }
        }
        self
    }

    pub async fn preload(&self, url: &str, jwks: JwkSet) -> Result<(), Error> {
        let url = Url::parse(url)?;
        *self.slot(&url).entry.write().await = Some(CachedJwks::new(jwks, self.cache_ttl));
        Ok(())
    }

    pub async fn get_or_fetch(
        &self,
        url: &str,
        deadline: Option<Instant>,
    ) -> Result<JwkSet, Error> {
        let url = Url::parse(url)?;
        let (jwks, _source) = self.fetch_with_source(&url, deadline).await?;
        Ok(jwks)
    }

    pub async fn find_key(
        &self,
        url: &str,
        kid: &str,
        deadline: Option<Instant>,
    ) -> Result<Jwk, Error> {
        let url = Url::parse(url)?;
        let (mut jwks, source) = self.fetch_with_source(&url, deadline).await?;
        if find_by_kid(&jwks, kid).is_none() && source == FetchSource::Cache {
            debug!(
                "kid {kid} not in cached jwks {}; refreshing",
                redact_jwks_uri(&url)
            );
            jwks = self.refresh(&url, deadline).await?;
        }
        if jwks.keys.is_empty() {
            return Err(Error::JwkSetIsEmpty(redact_jwks_uri(&url)));
        }
        find_by_kid(&jwks, kid)
            .cloned()
            .ok_or_else(|| Error::KidNotFound(kid.to_string()))
    }

    pub fn invalidate(&self, url: &str) -> Result<(), Error> {
        let url = Url::parse(url)?;
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url.as_str());
        Ok(())
    }

    async fn fetch_with_source(
        &self,
        url: &Url,
        deadline: Option<Instant>,
    ) -> Result<(JwkSet, FetchSource), Error> {
        let slot = self.slot(url);
        if let Some(jwks) = slot.fresh(Instant::now()).await {
            return Ok((jwks, FetchSource::Cache));
        }

        let _guard = slot.fetch_lock.lock().await;
        if let Some(jwks) = slot.fresh(Instant::now()).await {
            return Ok((jwks, FetchSource::Cache));
        }
        let jwks = self.fetch_remote(url, &slot, deadline).await?;
        Ok((jwks, FetchSource::Remote))
    }

    async fn refresh(&self, url: &Url, deadline: Option<Instant>) -> Result<JwkSet, Error> {
        let slot = self.slot(url);
        let now = Instant::now();
        if let Some(jwks) = slot.recently_fetched(now).await {
            return Ok(jwks);
        }
        let _guard = slot.fetch_lock.lock().await;
        if let Some(jwks) = slot.recently_fetched(now).await {
            return Ok(jwks);
        }
        self.fetch_remote(url, &slot, deadline).await
    }

    async fn fetch_remote(
        &self,
        url: &Url,
        slot: &AsyncCacheSlot,
        deadline: Option<Instant>,
    ) -> Result<JwkSet, Error> {
        let fetched = match effective_timeout(self.timeout, deadline) {
            Ok(timeout) => self.request(url, timeout).await,
            Err(err) => Err(err),
        };
        let jwks = match fetched {
            Ok(jwks) => jwks,
            Err(err) => {
                warn!("jwks fetch from {} failed: {err}", redact_jwks_uri(url));
                self.discard_if_empty(url);
                return Err(err);
            }
        };
        debug!(
            "fetched jwks from {} with {} keys",
            redact_jwks_uri(url),
            jwks.keys.len()
        );
        *slot.entry.write().await = Some(CachedJwks::new(jwks.clone(), self.cache_ttl));
        Ok(jwks)
    }

    async fn request(&self, url: &Url, timeout: Option<Duration>) -> Result<JwkSet, Error> {
        let mut req = self.http.get(url.clone());
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let mut resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = read_body_with_limit_async(&mut resp, MAX_ERROR_BODY_BYTES).await?;
            return Err(fetch_status_error(url, status, &body));
        }
        let body = resp.bytes().await?;
        jwks_from_slice(&body)
    }

    /// Drops the slot for `url` unless it holds a set. A slot whose entry is
    /// being written is left alone.
    fn discard_if_empty(&self, url: &Url) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let empty = slots
            .get(url.as_str())
            .is_some_and(|slot| slot.entry.try_read().is_ok_and(|entry| entry.is_none()));
        if empty {
            slots.remove(url.as_str());
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_urls(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(super) fn slot(&self, url: &Url) -> Arc<AsyncCacheSlot> {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url.as_str())
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(url.as_str().to_string()).or_default())
    }
}
