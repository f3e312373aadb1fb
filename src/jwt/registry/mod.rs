mod ecdsa;
mod hmac;
mod none;
mod pss;
mod rsa;


use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use log::debug;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::constants::ALG_NONE;
use super::key::Key;
use crate::error::Error;

pub use self::ecdsa::EcdsaAlgorithm;
pub use self::hmac::HmacAlgorithm;
pub use self::none::NoneAlgorithm;
pub use self::pss::RsaPssAlgorithm;
pub use self::rsa::RsaAlgorithm;

/// Signs and verifies JWS signing inputs for one `alg` identifier.
///
/// Signatures cross this boundary already base64url encoded, so an
/// implementation owns the byte layout of its signature format.
pub trait SigningAlgorithm: Send + Sync {
    fn sign(&self, key: &Key, signing_input: &str) -> Result<String, Error>;

    fn verify(&self, key: &Key, signing_input: &str, signature: &str) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashFunction {
    Sha256,
    Sha384,
    Sha512,
}

impl HashFunction {
    pub fn output_size(self) -> usize {
        match self {
            HashFunction::Sha256 => 32,
            HashFunction::Sha384 => 48,
            HashFunction::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        self.digest_parts(&[data])
    }

    pub(crate) fn digest_parts(self, parts: &[&[u8]]) -> Vec<u8> {
        fn run<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().to_vec()
        }
        match self {
            HashFunction::Sha256 => run::<Sha256>(parts),
            HashFunction::Sha384 => run::<Sha384>(parts),
            HashFunction::Sha512 => run::<Sha512>(parts),
        }
    }
}

/// Table of algorithm implementations keyed by `alg`.
///
/// Lookups take a read lock; [`Registry::register`] and
/// [`Registry::unregister`] take the write lock, so a registry can be shared
/// through an `Arc` and extended while verifiers are running.
pub struct Registry {
    algorithms: RwLock<HashMap<String, Arc<dyn SigningAlgorithm>>>,
}

impl Registry {
    /// An empty registry; every lookup yields the not-implemented sentinel.
    pub fn new() -> Self {
        Self {
            algorithms: RwLock::new(HashMap::new()),
        }
    }

    /// A registry holding the HMAC, RSA, ECDSA, RSA-PSS and `none` families.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for (alg, hash) in [
            ("HS256", HashFunction::Sha256),
            ("HS384", HashFunction::Sha384),
            ("HS512", HashFunction::Sha512),
        ] {
            registry.register(alg, Arc::new(HmacAlgorithm::new(alg, hash)));
        }
        for (alg, hash) in [
            ("RS256", HashFunction::Sha256),
            ("RS384", HashFunction::Sha384),
            ("RS512", HashFunction::Sha512),
        ] {
            registry.register(alg, Arc::new(RsaAlgorithm::new(alg, hash)));
        }
        for (alg, hash) in [
            ("PS256", HashFunction::Sha256),
            ("PS384", HashFunction::Sha384),
            ("PS512", HashFunction::Sha512),
        ] {
            registry.register(alg, Arc::new(RsaPssAlgorithm::new(alg, hash)));
        }
        registry.register("ES256", Arc::new(EcdsaAlgorithm::es256()));
        registry.register("ES384", Arc::new(EcdsaAlgorithm::es384()));
        registry.register("ES512", Arc::new(EcdsaAlgorithm::es512()));
        registry.register(ALG_NONE, Arc::new(NoneAlgorithm));
        registry
    }

    /// Installs `algorithm` under `alg`, returning the implementation it replaced.
    pub fn register(
        &self,
        alg: impl Into<String>,
        algorithm: Arc<dyn SigningAlgorithm>,
    ) -> Option<Arc<dyn SigningAlgorithm>> {
        let alg = alg.into();
        debug!("registering signing algorithm {alg}");
        self.algorithms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alg, algorithm)
    }

    pub fn unregister(&self, alg: &str) -> Option<Arc<dyn SigningAlgorithm>> {
        debug!("unregistering signing algorithm {alg}");
        self.algorithms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(alg)
    }

    /// Returns the implementation for `alg`. Unknown identifiers resolve to a
    /// sentinel whose operations fail with [`Error::NotImplemented`].
    pub fn lookup(&self, alg: &str) -> Arc<dyn SigningAlgorithm> {
        self.algorithms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alg)
            .cloned()
            .unwrap_or_else(|| Arc::new(Unregistered(alg.to_string())))
    }

    pub fn contains(&self, alg: &str) -> bool {
        self.algorithms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(alg)
    }

    /// Registered identifiers, sorted.
    pub fn algorithms(&self) -> Vec<String> {
        let mut algs: Vec<String> = self
            .algorithms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        algs.sort();
        algs
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}

struct Unregistered(String);

impl SigningAlgorithm for Unregistered {
    fn sign(&self, _key: &Key, _signing_input: &str) -> Result<String, Error> {
        Err(Error::NotImplemented(self.0.clone()))
    }

    fn verify(&self, _key: &Key, _signing_input: &str, _signature: &str) -> Result<(), Error> {
        Err(Error::NotImplemented(self.0.clone()))
    }
}

pub(super) fn wrong_key(alg: &str, key: &Key) -> Error {
    Error::InvalidKeyReceived {
        alg: alg.to_string(),
        key: key.kind_name(),
    }
}

/// Decodes a signature segment. Anything that is not base64url counts as a
/// bad signature rather than a malformed token.
pub(super) fn decode_signature(alg: &str, signature: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|err| Error::bad_signature(alg, format!("signature is not base64url: {err}")))
}
