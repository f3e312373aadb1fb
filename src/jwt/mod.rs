mod codec;
mod constants;
mod jwks;
mod key;
mod registry;
mod signer;
mod types;
mod validator;

pub use codec::{decode_claims, decode_header, encode_claims, encode_header};
pub use constants::DEFAULT_ALGS;
#[cfg(feature = "async-validate")]
pub use jwks::JwksCacheAsync;
pub use jwks::{
    jwks_from_slice, jwks_from_slice_with_report, HttpJwksFetcher, JwksCache, JwksFetcher,
};
pub use key::{EcCurve, EcdsaPrivateKey, EcdsaPublicKey, Key};
pub use registry::{
    EcdsaAlgorithm, HashFunction, HmacAlgorithm, NoneAlgorithm, Registry, RsaAlgorithm,
    RsaPssAlgorithm, SigningAlgorithm,
};
pub use signer::{sign, JwtSigner};
pub use types::{
    ClaimsSet, Header, JwksSanitizeReport, PrivateClaimsCheck, RemovedAlg, RemovedAlgReason,
    TokenData, ValidationOptions,
};
#[cfg(feature = "async-validate")]
pub use validator::{AsyncKeyStrategy, VerifierAsync};
pub use validator::{validate_claims, KeyStrategy, Verifier};
