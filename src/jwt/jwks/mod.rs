mod cache;
#[cfg(feature = "async-validate")]
mod cache_async;
mod fetch;
mod sanitize;

#[cfg(test)]
mod tests;

pub use cache::JwksCache;
#[cfg(feature = "async-validate")]
pub use cache_async::JwksCacheAsync;
pub use fetch::{HttpJwksFetcher, JwksFetcher};
pub use sanitize::{jwks_from_slice, jwks_from_slice_with_report};

pub(crate) use sanitize::{redact_jwks_uri, sanitize_jwk_object};
