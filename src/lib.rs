#![forbid(unsafe_code)]

mod error;
mod jwt;

pub use error::{Error, ErrorKind};

pub use jwt::{
    decode_claims, decode_header, encode_claims, encode_header, jwks_from_slice,
    jwks_from_slice_with_report, sign, validate_claims, ClaimsSet, EcCurve, EcdsaAlgorithm,
    EcdsaPrivateKey, EcdsaPublicKey, HashFunction, Header, HmacAlgorithm, HttpJwksFetcher,
    JwksCache, JwksFetcher, JwksSanitizeReport, JwtSigner, Key, KeyStrategy, NoneAlgorithm,
    PrivateClaimsCheck, Registry, RemovedAlg, RemovedAlgReason, RsaAlgorithm, RsaPssAlgorithm,
    SigningAlgorithm, TokenData, ValidationOptions, Verifier, DEFAULT_ALGS,
};
#[cfg(feature = "async-validate")]
pub use jwt::{AsyncKeyStrategy, JwksCacheAsync, VerifierAsync};
