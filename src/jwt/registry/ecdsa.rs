use p256::ecdsa::Signature as P256Signature;
use p384::ecdsa::Signature as P384Signature;
use p521::ecdsa::Signature as P521Signature;
use signature::{Signer, Verifier};

use super::{decode_signature, wrong_key, SigningAlgorithm};
use crate::error::Error;
use crate::jwt::codec::base64_url_encode;
use crate::jwt::key::{EcCurve, EcdsaPrivateKey, EcdsaPublicKey, Key};

/// ES256/ES384/ES512. Signatures are the fixed-width `r || s` concatenation.
#[derive(Debug, Clone)]
pub struct EcdsaAlgorithm {
    alg: String,
    curve: EcCurve,
}

impl EcdsaAlgorithm {
    pub fn new(alg: impl Into<String>, curve: EcCurve) -> Self {
        Self {
            alg: alg.into(),
            curve,
        }
    }

    pub fn es256() -> Self {
        Self::new("ES256", EcCurve::P256)
    }

    pub fn es384() -> Self {
        Self::new("ES384", EcCurve::P384)
    }

    pub fn es512() -> Self {
        Self::new("ES512", EcCurve::P521)
    }

    fn verifying_key(&self, key: &Key) -> Result<EcdsaPublicKey, Error> {
        let public_key = match key {
            Key::EcdsaPublic(public_key) => public_key.clone(),
            Key::EcdsaPrivate(private_key) => private_key.public_key(),
            other => return Err(wrong_key(&self.alg, other)),
        };
        if public_key.curve() != self.curve {
            return Err(wrong_key(&self.alg, key));
        }
        Ok(public_key)
    }
}

impl SigningAlgorithm for EcdsaAlgorithm {
    fn sign(&self, key: &Key, signing_input: &str) -> Result<String, Error> {
        let Key::EcdsaPrivate(private_key) = key else {
            return Err(wrong_key(&self.alg, key));
        };
        if private_key.curve() != self.curve {
            return Err(wrong_key(&self.alg, key));
        }
        let message = signing_input.as_bytes();
        let sign_error = |e: signature::Error| Error::Crypto(format!("{} sign error: {e}", self.alg));
        let bytes = match private_key {
            EcdsaPrivateKey::P256(signing_key) => {
                let sig: P256Signature = signing_key.try_sign(message).map_err(sign_error)?;
                sig.to_bytes().to_vec()
            }
            EcdsaPrivateKey::P384(signing_key) => {
                let sig: P384Signature = signing_key.try_sign(message).map_err(sign_error)?;
                sig.to_bytes().to_vec()
            }
            EcdsaPrivateKey::P521(signing_key) => {
                let sig: P521Signature = signing_key.try_sign(message).map_err(sign_error)?;
                sig.to_bytes().to_vec()
            }
        };
        Ok(base64_url_encode(bytes))
    }

    fn verify(&self, key: &Key, signing_input: &str, signature: &str) -> Result<(), Error> {
        let public_key = self.verifying_key(key)?;
        let bytes = decode_signature(&self.alg, signature)?;
        let expected = 2 * self.curve.coordinate_size();
        if bytes.len() != expected {
            return Err(Error::bad_signature(
                &self.alg,
                format!("signature is {} bytes, expected {expected}", bytes.len()),
            ));
        }
        let message = signing_input.as_bytes();
        let invalid = |e: signature::Error| Error::bad_signature(&self.alg, e.to_string());
        match public_key {
            EcdsaPublicKey::P256(verifying_key) => {
                let sig = P256Signature::from_slice(&bytes).map_err(invalid)?;
                verifying_key.verify(message, &sig).map_err(invalid)
            }
            EcdsaPublicKey::P384(verifying_key) => {
                let sig = P384Signature::from_slice(&bytes).map_err(invalid)?;
                verifying_key.verify(message, &sig).map_err(invalid)
            }
            EcdsaPublicKey::P521(verifying_key) => {
                let sig = P521Signature::from_slice(&bytes).map_err(invalid)?;
                verifying_key.verify(message, &sig).map_err(invalid)
            }
        }
    }
}
