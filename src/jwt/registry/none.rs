use super::SigningAlgorithm;
use crate::error::Error;
use crate::jwt::key::Key;

/// Registered under `none` so the identifier is known, but never signs or verifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneAlgorithm;

impl SigningAlgorithm for NoneAlgorithm {
    fn sign(&self, _key: &Key, _signing_input: &str) -> Result<String, Error> {
        Err(Error::AlgorithmNoneNotSupported)
    }

    fn verify(&self, _key: &Key, _signing_input: &str, _signature: &str) -> Result<(), Error> {
        Err(Error::AlgorithmNoneNotSupported)
    }
}
