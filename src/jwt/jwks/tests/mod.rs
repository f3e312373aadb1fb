#[cfg(feature = "async-validate")]
mod cache_async;
mod helpers;
