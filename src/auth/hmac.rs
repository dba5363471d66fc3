//! Shared-secret HS256 token validator
//!
//! Used when the gateway and the token minter share a signing secret. The
//! audience check runs independently of signature verification so that a
//! token minted for an unrelated service with the same signing key is
//! rejected.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::auth::claims::{self, IdentityClaims, RawClaims};
use crate::auth::{map_jwt_error, TokenValidator};
use crate::error::{AuthError, ConfigError};

/// Validates HS256 tokens against a configured shared secret and audience.
pub struct HmacValidator {
    key: DecodingKey,
    audience: String,
}

impl HmacValidator {
    /// Creates a validator from the configured secret and expected audience.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] or
    /// [`ConfigError::MissingAudience`] when the respective field is empty.
    /// Both are fatal at startup: a validator with no secret would silently
    /// accept forged tokens.
    pub fn new(secret: &str, audience: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if audience.is_empty() {
            return Err(ConfigError::MissingAudience("hmac"));
        }
        Ok(HmacValidator {
            key: DecodingKey::from_secret(secret.as_bytes()),
            audience: audience.to_string(),
        })
    }
}

#[async_trait]
impl TokenValidator for HmacValidator {
    async fn validate_token(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // The audience is checked independently below so the missing-claim
        // and wrong-value cases produce distinct diagnostics.
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data =
            jsonwebtoken::decode::<RawClaims>(token, &self.key, &validation).map_err(map_jwt_error)?;

        claims::check_audience(data.claims.aud.as_ref(), &self.audience)?;

        Ok(claims::into_identity(data.claims))
    }
}
