#[cfg(feature = "async-validate")]
mod async_impl;
mod claims;
mod resolve;
mod verify;

#[cfg(test)]
mod tests;

#[cfg(feature = "async-validate")]
pub use async_impl::{AsyncKeyStrategy, VerifierAsync};
pub use claims::validate_claims;
pub use resolve::KeyStrategy;
pub use verify::Verifier;
