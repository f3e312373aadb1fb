use crate::error::Error;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use log::{debug, warn};
use reqwest::blocking::Client as HttpClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use url::Url;

use super::super::constants::{DEFAULT_JWKS_CACHE_TTL, DEFAULT_JWKS_TIMEOUT, MIN_REFRESH_INTERVAL};
use super::fetch::{HttpJwksFetcher, JwksFetcher};
use super::sanitize::redact_jwks_uri;

/// JWKS documents cached per URL.
///
/// Each URL owns its own slot: a miss for one URL never waits on a fetch for
/// another, and concurrent misses for the same URL share one fetch.
pub struct JwksCache {
    fetcher: Arc<dyn JwksFetcher>,
    timeout: Option<Duration>,
    cache_ttl: Duration,
    slots: RwLock<HashMap<String, Arc<CacheSlot>>>,
}

#[derive(Default)]
pub(super) struct CacheSlot {
    pub(super) entry: RwLock<Option<CachedJwks>>,
    fetch_lock: Mutex<()>,
}

#[derive(Debug, Clone)]
pub(super) struct CachedJwks {
    pub(super) jwks: JwkSet,
    pub(super) expires_at: Instant,
    pub(super) fetched_at: Instant,
}

impl CachedJwks {
    pub(super) fn new(jwks: JwkSet, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            jwks,
            expires_at: now + ttl,
            fetched_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FetchSource {
    Cache,
    Remote,
}

impl CacheSlot {
    fn fresh(&self, now: Instant) -> Option<JwkSet> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|cached| cached.expires_at > now)
            .map(|cached| cached.jwks.clone())
    }

    fn recently_fetched(&self, now: Instant) -> Option<JwkSet> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|cached| cached.fetched_at + MIN_REFRESH_INTERVAL > now)
            .map(|cached| cached.jwks.clone())
    }

    fn store(&self, cached: CachedJwks) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(cached);
    }
}

impl JwksCache {
    pub fn new() -> Result<Self, Error> {
        Ok(Self::with_fetcher(HttpJwksFetcher::new()?))
    }

    pub fn with_fetcher(fetcher: impl JwksFetcher + 'static) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            timeout: Some(DEFAULT_JWKS_TIMEOUT),
            cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.fetcher = Arc::new(HttpJwksFetcher::with_client(http));
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
            if let Some(cached) = slot
                .entry
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .as_mut()
            {
                cached.expires_at = now + ttl;
                cached.fetched_at = now;
            }
        }
        self
    }

    pub fn with_preloaded(self, url: &str, jwks: JwkSet) -> Result<Self, Error> {
        self.preload(url, jwks)?;
        Ok(self)
    }

    /// Seeds the entry for `url` as if it had just been fetched.
    pub fn preload(&self, url: &str, jwks: JwkSet) -> Result<(), Error> {
        let url = Url::parse(url)?;
        self.slot(&url).store(CachedJwks::new(jwks, self.cache_ttl));
        Ok(())
    }

    pub fn get(&self, url: &str) -> Result<JwkSet, Error> {
        self.get_or_fetch(url, None)
    }

    /// Returns the cached set for `url`, fetching it when absent or expired.
    pub fn get_or_fetch(&self, url: &str, deadline: Option<Instant>) -> Result<JwkSet, Error> {
        let url = Url::parse(url)?;
        let (jwks, _source) = self.fetch_with_source(&url, deadline)?;
        Ok(jwks)
    }

    /// Fetches `url` again unless it was fetched within the last
    /// `MIN_REFRESH_INTERVAL`, in which case the current entry is returned.
    pub fn fetch_fresh(&self, url: &str, deadline: Option<Instant>) -> Result<JwkSet, Error> {
        let url = Url::parse(url)?;
        self.refresh(&url, &self.slot(&url), deadline)
    }

    /// Finds the key with `kid`, refreshing a cached set once when it is missing.
    pub fn find_key(&self, url: &str, kid: &str, deadline: Option<Instant>) -> Result<Jwk, Error> {
        let url = Url::parse(url)?;
        let (mut jwks, source) = self.fetch_with_source(&url, deadline)?;
        if find_by_kid(&jwks, kid).is_none() && source == FetchSource::Cache {
            debug!(
                "kid {kid} not in cached jwks {}; refreshing",
                redact_jwks_uri(&url)
            );
            jwks = self.refresh(&url, &self.slot(&url), deadline)?;
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

    pub(crate) fn fetch_with_source(
        &self,
        url: &Url,
        deadline: Option<Instant>,
    ) -> Result<(JwkSet, FetchSource), Error> {
        let slot = self.slot(url);
        if let Some(jwks) = slot.fresh(Instant::now()) {
            return Ok((jwks, FetchSource::Cache));
        }

        let _guard = slot.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(jwks) = slot.fresh(Instant::now()) {
            return Ok((jwks, FetchSource::Cache));
        }
        let jwks = self.fetch_remote(url, &slot, deadline)?;
        Ok((jwks, FetchSource::Remote))
    }

    fn refresh(
        &self,
        url: &Url,
        slot: &CacheSlot,
        deadline: Option<Instant>,
    ) -> Result<JwkSet, Error> {
        let now = Instant::now();
        if let Some(jwks) = slot.recently_fetched(now) {
            return Ok(jwks);
        }
        let _guard = slot.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(jwks) = slot.recently_fetched(now) {
            return Ok(jwks);
        }
        self.fetch_remote(url, slot, deadline)
    }

    fn fetch_remote(
        &self,
        url: &Url,
        slot: &CacheSlot,
        deadline: Option<Instant>,
    ) -> Result<JwkSet, Error> {
        let fetched = effective_timeout(self.timeout, deadline)
            .and_then(|timeout| self.fetcher.fetch(url, timeout));
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
        slot.store(CachedJwks::new(jwks.clone(), self.cache_ttl));
        Ok(jwks)
    }

    /// Drops the slot for `url` unless it holds a set, so failed URLs do not
    /// accumulate.
    fn discard_if_empty(&self, url: &Url) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let empty = slots.get(url.as_str()).is_some_and(|slot| {
            slot.entry
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_none()
        });
        if empty {
            slots.remove(url.as_str());
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_urls(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(super) fn slot(&self, url: &Url) -> Arc<CacheSlot> {
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

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let urls: Vec<String> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("JwksCache")
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("urls", &urls)
            .finish()
    }
}

pub(super) fn find_by_kid<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|key| key.common.key_id.as_deref() == Some(kid))
}

/// Narrows the per-request timeout so a fetch never outlives `deadline`.
pub(super) fn effective_timeout(
    timeout: Option<Duration>,
    deadline: Option<Instant>,
) -> Result<Option<Duration>, Error> {
    let Some(deadline) = deadline else {
        return Ok(timeout);
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(Error::Crypto("jwks fetch deadline exceeded".to_string()));
    }
    Ok(Some(timeout.map_or(remaining, |timeout| timeout.min(remaining))))
}
