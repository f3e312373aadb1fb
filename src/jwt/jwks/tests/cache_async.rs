use super::super::JwksCacheAsync;
use super::helpers::jwks_with_kids;
use std::time::{Duration, Instant};

const URL: &str = "https://keys.example.com/.well-known/jwks.json";

#[tokio::test]
async fn failed_fetches_leave_no_entries_behind() {
    let cache = JwksCacheAsync::new().expect("cache");
    for i in 0..50 {
        let url = format!("https://keys.example.com/jwks?x={i}");
        cache
            .get_or_fetch(&url, Some(Instant::now()))
            .await
            .expect_err("deadline elapsed");
    }
    assert_eq!(cache.cached_urls(), 0);
}

#[tokio::test]
async fn preloaded_set_is_served_without_fetching() {
    let cache = JwksCacheAsync::new().expect("cache");
    cache
        .preload(URL, jwks_with_kids(&["a"]))
        .await
        .expect("preload");
    let jwk = cache
        .find_key(URL, "a", Some(Instant::now()))
        .await
        .expect("cached");
    assert_eq!(jwk.common.key_id.as_deref(), Some("a"));
}

#[tokio::test]
async fn cache_ttl_applies_to_existing_entries() {
    let cache = JwksCacheAsync::new().expect("cache");
    cache
        .preload(URL, jwks_with_kids(&["a"]))
        .await
        .expect("preload");
    let cache = cache.with_cache_ttl(Duration::ZERO);

    let err = cache
        .get_or_fetch(URL, Some(Instant::now()))
        .await
        .expect_err("entry expired");
    assert!(err.to_string().contains("deadline"), "{err}");
    assert_eq!(cache.cached_urls(), 1);
}
