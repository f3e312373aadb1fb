use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::{decode_signature, wrong_key, HashFunction, SigningAlgorithm};
use crate::error::Error;
use crate::jwt::codec::base64_url_encode;
use crate::jwt::key::Key;

/// HS256/HS384/HS512.
#[derive(Debug, Clone)]
pub struct HmacAlgorithm {
    alg: String,
    hash: HashFunction,
}

impl HmacAlgorithm {
    pub fn new(alg: impl Into<String>, hash: HashFunction) -> Self {
        Self {
            alg: alg.into(),
            hash,
        }
    }

    fn mac(&self, key: &Key, signing_input: &str) -> Result<Vec<u8>, Error> {
        let Key::Hmac(secret) = key else {
            return Err(wrong_key(&self.alg, key));
        };
        if secret.is_empty() {
            return Err(wrong_key(&self.alg, key));
        }
        let input = signing_input.as_bytes();
        match self.hash {
            HashFunction::Sha256 => compute::<Hmac<Sha256>>(secret, input),
            HashFunction::Sha384 => compute::<Hmac<Sha384>>(secret, input),
            HashFunction::Sha512 => compute::<Hmac<Sha512>>(secret, input),
        }
    }
}

impl SigningAlgorithm for HmacAlgorithm {
    fn sign(&self, key: &Key, signing_input: &str) -> Result<String, Error> {
        Ok(base64_url_encode(self.mac(key, signing_input)?))
    }

    fn verify(&self, key: &Key, signing_input: &str, signature: &str) -> Result<(), Error> {
        let expected = self.mac(key, signing_input)?;
        let provided = decode_signature(&self.alg, signature)?;
        if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            Ok(())
        } else {
            Err(Error::bad_signature(&self.alg, "hmac mismatch"))
        }
    }
}

fn compute<M: Mac + KeyInit>(secret: &[u8], input: &[u8]) -> Result<Vec<u8>, Error> {
    let mut mac = <M as Mac>::new_from_slice(secret)
        .map_err(|e| Error::Crypto(format!("hmac key error: {e}")))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}
