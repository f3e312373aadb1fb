use std::time::Duration;

pub(crate) const ALG_NONE: &str = "none";

/// Algorithm identifiers registered by [`crate::Registry::with_defaults`].
pub const DEFAULT_ALGS: &[&str] = &[
    "HS256", "HS384", "HS512", "RS256", "RS384", "RS512", "ES256", "ES384", "ES512", "PS256",
    "PS384", "PS512", ALG_NONE,
];

pub(crate) const REGISTERED_HEADER_PARAMETERS: &[&str] = &[
    "alg", "typ", "cty", "kid", "jku", "jwk", "x5u", "x5c", "x5t", "x5t#S256", "crit",
];
pub(crate) const REGISTERED_CLAIMS: &[&str] = &["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

pub(crate) const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
pub(crate) const DEFAULT_JWKS_TIMEOUT: Duration = Duration::from_secs(10);
// Lower bound between two network fetches of the same JWKS when a kid misses.
pub(crate) const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

// JWK `alg` values the jsonwebtoken model can represent; anything else is stripped on load.
pub(super) const SUPPORTED_JWK_ALGS: &[&str] = &[
    "HS256",
    "HS384",
    "HS512",
    "ES256",
    "ES384",
    "RS256",
    "RS384",
    "RS512",
    "PS256",
    "PS384",
    "PS512",
    "EdDSA",
    "RSA1_5",
    "RSA-OAEP",
    "RSA-OAEP-256",
];
