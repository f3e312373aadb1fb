use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::constants::{REGISTERED_CLAIMS, REGISTERED_HEADER_PARAMETERS};
use super::jwks::sanitize_jwk_object;
use super::types::{ClaimsSet, Header};
use crate::error::Error;

/// A JSON object made of typed registered fields plus a flat private map.
trait Segment: Serialize + DeserializeOwned {
    const REGISTERED: &'static [&'static str];
    const NAME: &'static str;

    fn private_fields(&self) -> &Map<String, Value>;
    fn set_private_fields(&mut self, fields: Map<String, Value>);
    fn private_error(reason: String) -> Error;

    fn prepare(_fields: &mut Map<String, Value>) {}
}

impl Segment for Header {
    const REGISTERED: &'static [&'static str] = REGISTERED_HEADER_PARAMETERS;
    const NAME: &'static str = "header";

    fn private_fields(&self) -> &Map<String, Value> {
        &self.private_parameters
    }

    fn set_private_fields(&mut self, fields: Map<String, Value>) {
        self.private_parameters = fields;
    }

    fn private_error(reason: String) -> Error {
        Error::InvalidPrivateParameters(reason)
    }

    fn prepare(fields: &mut Map<String, Value>) {
        if let Some(Value::Object(jwk)) = fields.get_mut("jwk") {
            sanitize_jwk_object(jwk);
        }
    }
}

impl Segment for ClaimsSet {
    const REGISTERED: &'static [&'static str] = REGISTERED_CLAIMS;
    const NAME: &'static str = "claims";

    fn private_fields(&self) -> &Map<String, Value> {
        &self.private_claims
    }

    fn set_private_fields(&mut self, fields: Map<String, Value>) {
        self.private_claims = fields;
    }

    fn private_error(reason: String) -> Error {
        Error::InvalidPrivateClaims(reason)
    }
}

pub fn encode_header(header: &Header) -> Result<String, Error> {
    encode_segment(header)
}

pub fn encode_claims(claims: &ClaimsSet) -> Result<String, Error> {
    encode_segment(claims)
}

pub fn decode_header(encoded: &str) -> Result<Header, Error> {
    decode_segment(encoded)
}

pub fn decode_claims(encoded: &str) -> Result<ClaimsSet, Error> {
    decode_segment(encoded)
}

fn encode_segment<T: Segment>(segment: &T) -> Result<String, Error> {
    let registered =
        serde_json::to_value(segment).map_err(|e| Error::InvalidJson(format!("{}: {e}", T::NAME)))?;
    let Value::Object(mut fields) = registered else {
        return Err(Error::InvalidJson(format!(
            "{} did not serialize to a json object",
            T::NAME
        )));
    };
    for (name, value) in segment.private_fields() {
        if T::REGISTERED.contains(&name.as_str()) {
            return Err(T::private_error(format!(
                "{name} collides with a registered {} field",
                T::NAME
            )));
        }
        fields.insert(name.clone(), value.clone());
    }
    let json = serde_json::to_vec(&Value::Object(fields))
        .map_err(|e| Error::InvalidJson(format!("{}: {e}", T::NAME)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: Segment>(encoded: &str) -> Result<T, Error> {
    let bytes = base64_url_decode(encoded, T::NAME)?;
    let raw: Value = serde_json::from_slice(&bytes)?;
    let Value::Object(mut fields) = raw else {
        return Err(Error::InvalidJson(format!("{} is not a json object", T::NAME)));
    };
    T::prepare(&mut fields);
    let raw = Value::Object(fields);
    let mut segment = T::deserialize(&raw)?;
    if let Value::Object(fields) = raw {
        let private = fields
            .into_iter()
            .filter(|(name, _)| !T::REGISTERED.contains(&name.as_str()))
            .collect();
        segment.set_private_fields(private);
    }
    Ok(segment)
}

pub(crate) struct TokenParts<'a> {
    pub(crate) header: &'a str,
    pub(crate) payload: &'a str,
    pub(crate) signature: &'a str,
}

impl TokenParts<'_> {
    pub(crate) fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

pub(crate) fn split_token(token: &str) -> Result<TokenParts<'_>, Error> {
    let mut iter = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (iter.next(), iter.next(), iter.next(), iter.next())
    else {
        return Err(Error::InvalidTokenReceived(format!(
            "expected 3 segments, got {}",
            token.split('.').count()
        )));
    };
    Ok(TokenParts {
        header,
        payload,
        signature,
    })
}

pub(crate) fn base64_url_decode(data: &str, what: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(data)
        .map_err(|err| Error::InvalidTokenReceived(format!("{what} base64url decode error: {err}")))
}

pub(crate) fn base64_url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}
