use crate::error::Error;
use jsonwebtoken::jwk::JwkSet;
use log::warn;
use serde_json::{Map, Value};
use url::Url;

use super::super::constants::SUPPORTED_JWK_ALGS;
use super::super::types::{JwksSanitizeReport, RemovedAlg, RemovedAlgReason};

pub(super) fn sanitize_error_body(body: &[u8]) -> String {
    let mut sanitized = String::new();
    for &byte in body.iter().take(128) {
        match byte {
            b'\n' => sanitized.push_str("\\n"),
            b'\r' => sanitized.push_str("\\r"),
            b'\t' => sanitized.push_str("\\t"),
            _ if byte.is_ascii_graphic() || byte == b' ' => sanitized.push(byte as char),
            _ => sanitized.push('.'),
        }
    }
    if body.len() > 128 {
        sanitized.push_str("...");
    }
    sanitized
}

/// Strips credentials, query and fragment so a JWKS URL is safe to log.
pub(crate) fn redact_jwks_uri(uri: &Url) -> String {
    let mut redacted = uri.clone();
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted.set_query(None);
    redacted.set_fragment(None);
    redacted.to_string()
}

pub fn jwks_from_slice(body: &[u8]) -> Result<JwkSet, Error> {
    let report = jwks_from_slice_with_report(body)?;
    Ok(report.jwks)
}

/// Parses a JWKS document, dropping `alg` members the key model cannot hold
/// and reporting each removal.
pub fn jwks_from_slice_with_report(body: &[u8]) -> Result<JwksSanitizeReport, Error> {
    let mut value: Value = serde_json::from_slice(body)?;
    let removed_algs = sanitize_jwks(&mut value);
    let jwks: JwkSet = serde_json::from_value(value)?;
    Ok(JwksSanitizeReport { jwks, removed_algs })
}

pub(super) fn sanitize_jwks(value: &mut Value) -> Vec<RemovedAlg> {
    let Some(keys) = value.get_mut("keys").and_then(Value::as_array_mut) else {
        return Vec::new();
    };
    keys.iter_mut()
        .filter_map(Value::as_object_mut)
        .filter_map(sanitize_jwk_object)
        .collect()
}

/// Removes an unusable `alg` from one JWK object. The key itself is kept;
/// algorithm compatibility is checked again when the key is selected.
pub(crate) fn sanitize_jwk_object(object: &mut Map<String, Value>) -> Option<RemovedAlg> {
    let alg_value = object.get("alg")?;
    let kid = object
        .get("kid")
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    let removed = match alg_value.as_str() {
        None => {
            warn!(
                "jwk alg is not a string; kid={}",
                kid.as_deref().unwrap_or("<none>")
            );
            RemovedAlg {
                kid,
                alg: None,
                reason: RemovedAlgReason::NotString,
            }
        }
        Some(alg) if !SUPPORTED_JWK_ALGS.contains(&alg) => {
            warn!(
                "jwk alg unsupported; kid={}, alg={}",
                kid.as_deref().unwrap_or("<none>"),
                alg
            );
            RemovedAlg {
                kid,
                alg: Some(alg.to_string()),
                reason: RemovedAlgReason::Unsupported,
            }
        }
        Some(_) => return None,
    };
    object.remove("alg");
    Some(removed)
}
