//! Bearer-token validation and the authorization gate
//!
//! # Module Layout
//!
//! - [`claims`] -- identity claim types and the audience check
//! - [`hmac`]   -- shared-secret HS256 validator
//! - [`oidc`]   -- external-provider RS256/JWKS validator
//! - [`gate`]   -- composition point invoked before any tool executes
//!
//! The two validator variants form a closed set behind the
//! [`TokenValidator`] trait, selected once at construction by
//! [`build_validator`]; call sites never branch on the provider tag.

pub mod claims;
pub mod gate;
pub mod hmac;
pub mod oidc;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, ProviderKind};
use crate::error::{AuthError, ConfigError};

pub use claims::{AudienceClaim, IdentityClaims};
pub use gate::AuthorizationGate;
pub use hmac::HmacValidator;
pub use oidc::OidcValidator;

/// Verifies a bearer token's signature, expiry, and audience.
///
/// Implementations are stateless per call and safe to share across request
/// handlers behind an `Arc`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validates a bearer token string, returning the identity claims it
    /// asserts.
    ///
    /// # Errors
    ///
    /// Returns a typed [`AuthError`] distinguishing malformed tokens,
    /// expired tokens, signature mismatches, and audience mismatches.
    async fn validate_token(&self, token: &str) -> Result<IdentityClaims, AuthError>;
}

/// Constructs the validator variant selected by the configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] when required credentials for the selected
/// provider are absent; this is fatal at startup, never deferred to the
/// first request.
pub fn build_validator(config: &Config) -> Result<Arc<dyn TokenValidator>, ConfigError> {
    match config.provider {
        ProviderKind::Hmac => Ok(Arc::new(HmacValidator::new(
            &config.jwt_secret,
            &config.oidc_audience,
        )?)),
        ProviderKind::Oidc => Ok(Arc::new(OidcValidator::new(
            &config.oidc_issuer,
            &config.oidc_audience,
            config.http_timeout,
        )?)),
    }
}

/// Truncates secret material for diagnostic logging.
///
/// Tokens carry end-user identity claims; log lines get at most the first
/// ten characters. Truncation is per character, not per byte: the values
/// previewed here arrive percent-decoded off the wire and may contain
/// multi-byte characters.
pub(crate) fn token_preview(token: &str) -> String {
    let mut preview: String = token.chars().take(10).collect();
    if preview.len() < token.len() {
        preview.push_str("...");
    }
    preview
}

/// Maps a `jsonwebtoken` decode failure onto the gateway's error taxonomy.
pub(crate) fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}
