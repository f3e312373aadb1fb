use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::constants::{REGISTERED_CLAIMS, REGISTERED_HEADER_PARAMETERS};
use crate::error::Error;

/// JOSE header (RFC 7515 §4) with an open set of private parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    #[serde(
        default,
        rename = "x5t#S256",
        skip_serializing_if = "Option::is_none"
    )]
    pub x5t_s256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
    /// Parameters outside the registered set, merged flat into the encoded header.
    #[serde(skip)]
    pub private_parameters: Map<String, Value>,
}

impl Header {
    /// Creates a header for `alg` with `typ` set to `JWT`.
    pub fn new(alg: impl Into<String>) -> Self {
        Self {
            alg: alg.into(),
            typ: Some("JWT".to_string()),
            ..Self::default()
        }
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_jku(mut self, jku: impl Into<String>) -> Self {
        self.jku = Some(jku.into());
        self
    }

    pub fn with_jwk(mut self, jwk: Jwk) -> Self {
        self.jwk = Some(jwk);
        self
    }

    /// Stores a private parameter. Registered names and values that cannot be
    /// represented as JSON are rejected.
    pub fn set_private(
        &mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> Result<&mut Self, Error> {
        let name = name.into();
        if REGISTERED_HEADER_PARAMETERS.contains(&name.as_str()) {
            return Err(Error::InvalidPrivateParameters(format!(
                "{name} is a registered header parameter"
            )));
        }
        let value = serde_json::to_value(value)
            .map_err(|e| Error::InvalidPrivateParameters(format!("{name}: {e}")))?;
        self.private_parameters.insert(name, value);
        Ok(self)
    }

    pub fn private(&self, name: &str) -> Option<&Value> {
        self.private_parameters.get(name)
    }
}

/// JWT claims set (RFC 7519 §4). Timestamps are Unix seconds, `0` means unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimsSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "audience"
    )]
    pub aud: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "is_unset",
        deserialize_with = "numeric_date"
    )]
    pub exp: i64,
    #[serde(
        default,
        skip_serializing_if = "is_unset",
        deserialize_with = "numeric_date"
    )]
    pub nbf: i64,
    #[serde(
        default,
        skip_serializing_if = "is_unset",
        deserialize_with = "numeric_date"
    )]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Claims outside the registered set, merged flat into the encoded payload.
    #[serde(skip)]
    pub private_claims: Map<String, Value>,
}

impl ClaimsSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    pub fn with_subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    pub fn with_audience(mut self, aud: impl Into<String>) -> Self {
        self.aud.push(aud.into());
        self
    }

    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    pub fn with_not_before(mut self, nbf: i64) -> Self {
        self.nbf = nbf;
        self
    }

    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = iat;
        self
    }

    pub fn with_jwt_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Stores a private claim. Registered names and values that cannot be
    /// represented as JSON are rejected.
    pub fn set_private(
        &mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> Result<&mut Self, Error> {
        let name = name.into();
        if REGISTERED_CLAIMS.contains(&name.as_str()) {
            return Err(Error::InvalidPrivateClaims(format!(
                "{name} is a registered claim"
            )));
        }
        let value = serde_json::to_value(value)
            .map_err(|e| Error::InvalidPrivateClaims(format!("{name}: {e}")))?;
        self.private_claims.insert(name, value);
        Ok(self)
    }

    pub fn private(&self, name: &str) -> Option<&Value> {
        self.private_claims.get(name)
    }
}

fn is_unset(value: &i64) -> bool {
    *value == 0
}

fn audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        Single(String),
        Multiple(Vec<String>),
    }

    Ok(match Option::<Audience>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Audience::Single(aud)) => vec![aud],
        Some(Audience::Multiple(aud)) => aud,
    })
}

fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct NumericDate;

    impl<'de> Visitor<'de> for NumericDate {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a numeric date in unix seconds")
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            i64::try_from(value).map_err(|_| E::custom("numeric date out of range"))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value.is_finite() && value > i64::MIN as f64 && value < i64::MAX as f64 {
                Ok(value.trunc() as i64)
            } else {
                Err(E::custom("numeric date out of range"))
            }
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(0)
        }
    }

    deserializer.deserialize_any(NumericDate)
}

/// Header and claims of a token whose signature and claims were accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenData {
    pub header: Header,
    pub claims: ClaimsSet,
}

pub type PrivateClaimsCheck = Arc<dyn Fn(&Map<String, Value>) -> Result<(), Error> + Send + Sync>;

#[derive(Clone)]
pub struct ValidationOptions {
    pub audience: Option<String>,
    pub issuer: Option<String>,
    /// Clock skew allowance in seconds applied to `exp` and `nbf`.
    pub leeway: u64,
    pub validate_exp: bool,
    pub validate_nbf: bool,
    /// Fixed evaluation time in Unix seconds; wall clock when unset.
    pub now: Option<i64>,
    pub private_claims: Option<PrivateClaimsCheck>,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self {
            audience: None,
            issuer: None,
            leeway: 0,
            validate_exp: true,
            validate_nbf: true,
            now: None,
            private_claims: None,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn at(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_private_claims<F>(mut self, check: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.private_claims = Some(Arc::new(check));
        self
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("leeway", &self.leeway)
            .field("validate_exp", &self.validate_exp)
            .field("validate_nbf", &self.validate_nbf)
            .field("now", &self.now)
            .field("private_claims", &self.private_claims.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JwksSanitizeReport {
    pub jwks: JwkSet,
    pub removed_algs: Vec<RemovedAlg>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RemovedAlg {
    pub kid: Option<String>,
    pub alg: Option<String>,
    pub reason: RemovedAlgReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RemovedAlgReason {
    NotString,
    Unsupported,
}
