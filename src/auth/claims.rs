//! Identity claim types shared by both validator variants
//!
//! Claims are produced only by successful validation, live for one request,
//! and are never persisted.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The `aud` claim as it appears on the wire: either a single string or a
/// list of strings (RFC 7519 section 4.1.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AudienceClaim {
    /// A single audience value.
    One(String),
    /// Multiple audience values.
    Many(Vec<String>),
}

impl AudienceClaim {
    /// Returns true when `expected` matches this claim: exact equality for a
    /// single value, membership for a list.
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            AudienceClaim::One(aud) => aud == expected,
            AudienceClaim::Many(auds) => auds.iter().any(|a| a == expected),
        }
    }
}

/// Raw JWT payload as deserialized from a verified token.
///
/// Only used internally by the validators; callers receive
/// [`IdentityClaims`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawClaims {
    /// Subject.
    pub sub: Option<String>,
    /// Audience, string or list. Absence is a validation failure.
    pub aud: Option<AudienceClaim>,
    /// Issuer.
    pub iss: Option<String>,
    /// Expiry, seconds since epoch.
    pub exp: Option<i64>,
    /// Issued-at, seconds since epoch.
    pub iat: Option<i64>,
    /// Optional email claim.
    pub email: Option<String>,
    /// Optional display-name claim.
    pub name: Option<String>,
}

/// Validated identity claim set handed to the authorization gate.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    /// Token subject.
    pub subject: String,
    /// Audience the token was minted for.
    pub audience: AudienceClaim,
    /// Token issuer, if present.
    pub issuer: Option<String>,
    /// Expiry, seconds since epoch.
    pub expiry: Option<i64>,
    /// Issued-at, seconds since epoch.
    pub issued_at: Option<i64>,
    /// Email, if the provider included one.
    pub email: Option<String>,
    /// Display name, if the provider included one.
    pub name: Option<String>,
}

/// Verifies the audience claim against the configured expected audience.
///
/// This check is mandatory and runs independently of signature verification:
/// without it, a token minted for an unrelated service with the same signing
/// key would be accepted.
///
/// The missing-claim case produces a distinct message from the wrong-value
/// case for diagnostic purposes; both surface to the client as a generic 401.
pub fn check_audience(claim: Option<&AudienceClaim>, expected: &str) -> Result<(), AuthError> {
    match claim {
        None => Err(AuthError::AudienceMismatch(
            "missing audience claim".to_string(),
        )),
        Some(AudienceClaim::One(aud)) if aud == expected => Ok(()),
        Some(AudienceClaim::One(aud)) => Err(AuthError::AudienceMismatch(format!(
            "invalid audience: expected {expected}, got {aud}"
        ))),
        Some(AudienceClaim::Many(auds)) if auds.iter().any(|a| a == expected) => Ok(()),
        Some(AudienceClaim::Many(_)) => Err(AuthError::AudienceMismatch(format!(
            "invalid audience: expected {expected} not found in audience list"
        ))),
    }
}

/// Builds [`IdentityClaims`] from a verified raw payload.
///
/// Must only be called after signature, expiry, and audience checks have
/// passed; `aud` is unwrapped here because [`check_audience`] has already
/// rejected the missing-claim case.
pub fn into_identity(raw: RawClaims) -> IdentityClaims {
    IdentityClaims {
        subject: raw.sub.unwrap_or_default(),
        audience: raw
            .aud
            .unwrap_or_else(|| AudienceClaim::One(String::new())),
        issuer: raw.iss,
        expiry: raw.exp,
        issued_at: raw.iat,
        email: raw.email,
        name: raw.name,
    }
}
