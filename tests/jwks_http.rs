use compact_jose::{
    sign, ClaimsSet, ErrorKind, Header, JwksCache, Key, KeyStrategy, Registry, ValidationOptions,
    Verifier,
};
use p384::ecdsa::SigningKey as P384SigningKey;
use rand::thread_rng;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{json_response, jwks_body, rsa_key, serve_blocking, NOW};

fn claims() -> ClaimsSet {
    ClaimsSet::new()
        .with_subject("principal")
        .with_expiration(NOW + 3600)
}

#[test]
fn verifies_against_remote_jwks_and_caches_it() {
    let rsa = rsa_key();
    let ec = Key::from(P384SigningKey::random(&mut thread_rng()));
    let body = jwks_body(&[(&rsa, "rsa-1"), (&ec, "ec-1")]);
    let (base_url, count) = serve_blocking(vec![json_response("200 OK", &body)]);
    let registry = Arc::new(Registry::with_defaults());
    let jwks = Arc::new(JwksCache::new().expect("cache").with_timeout(Duration::from_secs(2)));
    let verifier = Verifier::new(
        Arc::clone(&registry),
        KeyStrategy::jwks_url(format!("{base_url}/jwks.json"), jwks),
    )
    .with_options(ValidationOptions::new().at(NOW));

    let rs = sign(&registry, &Header::new("RS256").with_kid("rsa-1"), &claims(), &rsa)
        .expect("sign rs256");
    let es = sign(&registry, &Header::new("ES384").with_kid("ec-1"), &claims(), &ec)
        .expect("sign es384");
    verifier.verify(&rs).expect("rs256");
    verifier.verify(&es).expect("es384");
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let unknown = sign(&registry, &Header::new("RS256").with_kid("rsa-9"), &claims(), &rsa)
        .expect("sign");
    let err = verifier.verify(&unknown).expect_err("unknown kid");
    assert_eq!(err.kind(), ErrorKind::KidNotFound);
}

#[test]
fn jku_strategy_fetches_trusted_location() {
    let ec = Key::from(P384SigningKey::random(&mut thread_rng()));
    let body = jwks_body(&[(&ec, "ec-1")]);
    let (base_url, count) = serve_blocking(vec![json_response("200 OK", &body)]);
    let registry = Arc::new(Registry::with_defaults());
    let jwks = Arc::new(JwksCache::new().expect("cache"));
    let verifier = Verifier::new(
        Arc::clone(&registry),
        KeyStrategy::jwks_from_header(jwks, [format!("{base_url}/")]),
    )
    .with_options(ValidationOptions::new().at(NOW));

    let header = Header::new("ES384")
        .with_kid("ec-1")
        .with_jku(format!("{base_url}/keys"));
    let token = sign(&registry, &header, &claims(), &ec).expect("sign");
    let data = verifier.verify(&token).expect("verify");
    assert_eq!(
        data.header.jku.as_deref(),
        Some(format!("{base_url}/keys").as_str())
    );

    let header = Header::new("ES384")
        .with_kid("ec-1")
        .with_jku("http://127.0.0.1:1/keys");
    let token = sign(&registry, &header, &claims(), &ec).expect("sign");
    let err = verifier.verify(&token).expect_err("untrusted jku");
    assert_eq!(err.kind(), ErrorKind::JwkSetIsEmpty);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn server_error_surfaces_as_empty_set() {
    let (base_url, _count) = serve_blocking(vec![json_response("500 Internal Server Error", "{}")]);
    let registry = Arc::new(Registry::with_defaults());
    let jwks = Arc::new(JwksCache::new().expect("cache"));
    let verifier = Verifier::new(
        Arc::clone(&registry),
        KeyStrategy::jwks_url(format!("{base_url}/jwks.json"), jwks),
    )
    .with_options(ValidationOptions::new().at(NOW));

    let rsa = rsa_key();
    let token = sign(&registry, &Header::new("RS256").with_kid("rsa-1"), &claims(), &rsa)
        .expect("sign");
    let err = verifier.verify(&token).expect_err("server error");
    assert_eq!(err.kind(), ErrorKind::JwkSetIsEmpty);
    assert!(err.to_string().contains("500"), "{err}");
}
