use rand::thread_rng;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pss, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::rsa::rsa_public_key;
use super::{decode_signature, wrong_key, HashFunction, SigningAlgorithm};
use crate::error::Error;
use crate::jwt::codec::base64_url_encode;
use crate::jwt::key::Key;

/// PS256/PS384/PS512 (RSASSA-PSS with MGF1 over the same hash).
///
/// Signing uses a salt as long as the digest. Verification recovers the salt
/// length from the encoded message, so signatures from producers that pick a
/// different salt length are accepted.
#[derive(Debug, Clone)]
pub struct RsaPssAlgorithm {
    alg: String,
    hash: HashFunction,
}

impl RsaPssAlgorithm {
    pub fn new(alg: impl Into<String>, hash: HashFunction) -> Self {
        Self {
            alg: alg.into(),
            hash,
        }
    }

    fn scheme(&self) -> Pss {
        match self.hash {
            HashFunction::Sha256 => Pss::new::<Sha256>(),
            HashFunction::Sha384 => Pss::new::<Sha384>(),
            HashFunction::Sha512 => Pss::new::<Sha512>(),
        }
    }

    fn fail(&self, reason: &str) -> Error {
        Error::bad_signature(&self.alg, reason)
    }

    // RFC 8017 §8.1.2 and §9.1.2 with the salt length taken from the decoded block.
    fn verify_encoded(
        &self,
        public_key: &RsaPublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        let modulus = public_key.n();
        if signature.len() != public_key.size() {
            return Err(self.fail("signature length does not match modulus"));
        }
        let s = BigUint::from_bytes_be(signature);
        if &s >= modulus {
            return Err(self.fail("signature representative out of range"));
        }
        let m = s.modpow(public_key.e(), modulus);

        let em_bits = modulus.bits() - 1;
        let em_len = (em_bits + 7) / 8;
        let m_bytes = m.to_bytes_be();
        if m_bytes.len() > em_len {
            return Err(self.fail("encoded message too long"));
        }
        let mut em = vec![0u8; em_len - m_bytes.len()];
        em.extend_from_slice(&m_bytes);

        let h_len = self.hash.output_size();
        if em_len < h_len + 2 {
            return Err(self.fail("encoded message too short"));
        }
        if em[em_len - 1] != 0xbc {
            return Err(self.fail("missing trailer byte"));
        }
        let db_len = em_len - h_len - 1;
        let (masked_db, rest) = em.split_at(db_len);
        let h = &rest[..h_len];

        let unused_bits = 8 * em_len - em_bits;
        let top_mask = 0xffu8.checked_shr(unused_bits as u32).unwrap_or(0);
        if masked_db[0] & !top_mask != 0 {
            return Err(self.fail("leftmost bits are not zero"));
        }

        let mask = mgf1(self.hash, h, db_len);
        let mut db: Vec<u8> = masked_db.iter().zip(&mask).map(|(a, b)| a ^ b).collect();
        db[0] &= top_mask;

        let Some(separator) = db.iter().position(|b| *b != 0) else {
            return Err(self.fail("missing salt separator"));
        };
        if db[separator] != 0x01 {
            return Err(self.fail("missing salt separator"));
        }
        let salt = &db[separator + 1..];

        let m_hash = self.hash.digest(message);
        let expected = self.hash.digest_parts(&[&[0u8; 8], &m_hash, salt]);
        if bool::from(expected.as_slice().ct_eq(h)) {
            Ok(())
        } else {
            Err(self.fail("pss hash mismatch"))
        }
    }
}

impl SigningAlgorithm for RsaPssAlgorithm {
    fn sign(&self, key: &Key, signing_input: &str) -> Result<String, Error> {
        let Key::RsaPrivate(private_key) = key else {
            return Err(wrong_key(&self.alg, key));
        };
        let digest = self.hash.digest(signing_input.as_bytes());
        let signature = private_key
            .sign_with_rng(&mut thread_rng(), self.scheme(), &digest)
            .map_err(|e| Error::Crypto(format!("{} sign error: {e}", self.alg)))?;
        Ok(base64_url_encode(signature))
    }

    fn verify(&self, key: &Key, signing_input: &str, signature: &str) -> Result<(), Error> {
        let public_key = rsa_public_key(&self.alg, key)?;
        let signature = decode_signature(&self.alg, signature)?;
        self.verify_encoded(&public_key, signing_input.as_bytes(), &signature)
    }
}

fn mgf1(hash: HashFunction, seed: &[u8], len: usize) -> Vec<u8> {
    let mut mask = Vec::with_capacity(len + hash.output_size());
    let mut counter: u32 = 0;
    while mask.len() < len {
        mask.extend_from_slice(&hash.digest_parts(&[seed, &counter.to_be_bytes()]));
        counter += 1;
    }
    mask.truncate(len);
    mask
}
