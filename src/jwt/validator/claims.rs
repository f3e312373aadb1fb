use crate::error::Error;
use crate::jwt::types::{ClaimsSet, ValidationOptions};

/// Checks time bounds, audience, issuer and the private-claims predicate, in that order.
///
/// A zero `exp` or `nbf` is treated as absent. Both time violations report
/// [`Error::TokenIsExpired`].
pub fn validate_claims(claims: &ClaimsSet, options: &ValidationOptions) -> Result<(), Error> {
    let now = options
        .now
        .unwrap_or_else(|| jsonwebtoken::get_current_timestamp() as i64);
    let leeway = i64::try_from(options.leeway).unwrap_or(i64::MAX);

    if options.validate_exp && claims.exp != 0 && claims.exp.saturating_add(leeway) <= now {
        return Err(Error::TokenIsExpired);
    }
    if options.validate_nbf && claims.nbf != 0 && claims.nbf.saturating_sub(leeway) >= now {
        return Err(Error::TokenIsExpired);
    }

    if let Some(audience) = options.audience.as_deref() {
        if !claims.aud.iter().any(|aud| aud == audience) {
            return Err(Error::AudienceIsNotMatch(audience.to_string()));
        }
    }

    if let Some(issuer) = options.issuer.as_deref() {
        if claims.iss.as_deref() != Some(issuer) {
            return Err(Error::IssuerIsNotMatch(issuer.to_string()));
        }
    }

    if let Some(check) = options.private_claims.as_ref() {
        check(&claims.private_claims)?;
    }
    Ok(())
}
