use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use std::borrow::Cow;

use super::{decode_signature, wrong_key, HashFunction, SigningAlgorithm};
use crate::error::Error;
use crate::jwt::codec::base64_url_encode;
use crate::jwt::key::Key;

/// RS256/RS384/RS512 (RSASSA-PKCS1-v1_5).
#[derive(Debug, Clone)]
pub struct RsaAlgorithm {
    alg: String,
    hash: HashFunction,
}

impl RsaAlgorithm {
    pub fn new(alg: impl Into<String>, hash: HashFunction) -> Self {
        Self {
            alg: alg.into(),
            hash,
        }
    }

    fn scheme(&self) -> Pkcs1v15Sign {
        match self.hash {
            HashFunction::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            HashFunction::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            HashFunction::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

impl SigningAlgorithm for RsaAlgorithm {
    fn sign(&self, key: &Key, signing_input: &str) -> Result<String, Error> {
        let Key::RsaPrivate(private_key) = key else {
            return Err(wrong_key(&self.alg, key));
        };
        let digest = self.hash.digest(signing_input.as_bytes());
        let signature = private_key
            .sign(self.scheme(), &digest)
            .map_err(|e| Error::Crypto(format!("{} sign error: {e}", self.alg)))?;
        Ok(base64_url_encode(signature))
    }

    fn verify(&self, key: &Key, signing_input: &str, signature: &str) -> Result<(), Error> {
        let public_key = rsa_public_key(&self.alg, key)?;
        let signature = decode_signature(&self.alg, signature)?;
        let digest = self.hash.digest(signing_input.as_bytes());
        public_key
            .verify(self.scheme(), &digest, &signature)
            .map_err(|e| Error::bad_signature(&self.alg, e.to_string()))
    }
}

pub(super) fn rsa_public_key<'a>(alg: &str, key: &'a Key) -> Result<Cow<'a, RsaPublicKey>, Error> {
    match key {
        Key::RsaPublic(public_key) => Ok(Cow::Borrowed(public_key)),
        Key::RsaPrivate(private_key) => Ok(Cow::Owned(private_key.to_public_key())),
        other => Err(wrong_key(alg, other)),
    }
}
