//! Authorization gate invoked before any tool executes
//!
//! The gate is the composition point between the protocol dispatcher and the
//! token validator: it extracts the bearer token, validates it, and either
//! attaches the resulting identity to the request or answers 401 with a
//! `WWW-Authenticate: Bearer` challenge and a generic body. The detailed
//! failure reason is logged server-side only.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::claims::IdentityClaims;
use crate::auth::{build_validator, token_preview, TokenValidator};
use crate::config::Config;
use crate::error::{AuthError, ConfigError};

/// Gates every tool invocation on bearer-token validation.
///
/// When authentication is disabled in the configuration the gate passes all
/// requests through with no identity attached.
pub struct AuthorizationGate {
    validator: Option<Arc<dyn TokenValidator>>,
}

impl AuthorizationGate {
    /// Builds the gate from the process configuration, constructing the
    /// selected validator variant when authentication is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the enabled provider is missing required
    /// credentials; fatal at startup.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let validator = if config.oauth_enabled {
            Some(build_validator(config)?)
        } else {
            None
        };
        Ok(AuthorizationGate { validator })
    }

    /// Creates a gate around an explicit validator. Used by tests and by
    /// dispatchers that construct validators themselves.
    pub fn new(validator: Option<Arc<dyn TokenValidator>>) -> Self {
        AuthorizationGate { validator }
    }

    /// Whether the gate enforces authentication at all.
    pub fn enabled(&self) -> bool {
        self.validator.is_some()
    }

    /// Validates the `Authorization` header value for one request.
    ///
    /// Returns `Ok(None)` when authentication is disabled, `Ok(Some(claims))`
    /// on success.
    ///
    /// # Errors
    ///
    /// Returns a typed [`AuthError`]; a failed validation is terminal for
    /// the request, there is no retry.
    pub async fn validate_bearer(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<IdentityClaims>, AuthError> {
        let Some(validator) = &self.validator else {
            return Ok(None);
        };

        let header = authorization
            .ok_or_else(|| AuthError::MalformedToken("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::MalformedToken("Authorization header is not a bearer token".to_string())
            })?;

        let claims = validator.validate_token(token).await?;
        tracing::debug!(
            subject = %claims.subject,
            token = %token_preview(token),
            "bearer token validated"
        );
        Ok(Some(claims))
    }
}

/// Builds the generic 401 response with the bearer challenge header.
///
/// The body never discloses which claim failed; that detail is logged.
pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({
            "error": "invalid_token",
            "error_description": "authentication required",
        })),
    )
        .into_response()
}

/// Axum middleware enforcing bearer authentication on nested routes.
///
/// On success the validated [`IdentityClaims`] are attached as a request
/// extension for downstream handlers.
pub async fn require_bearer(
    State(gate): State<Arc<AuthorizationGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match gate.validate_bearer(authorization.as_deref()).await {
        Ok(Some(claims)) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(err) => {
            tracing::info!(error = %err, "rejecting request with invalid bearer token");
            unauthorized_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HmacValidator;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "gate-test-secret";
    const AUDIENCE: &str = "gate-test-audience";

    fn gate() -> AuthorizationGate {
        AuthorizationGate::new(Some(Arc::new(
            HmacValidator::new(SECRET, AUDIENCE).unwrap(),
        )))
    }

    fn token() -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &json!({
                "sub": "u1",
                "aud": AUDIENCE,
                "exp": chrono::Utc::now().timestamp() + 600,
            }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_disabled_gate_passes_without_identity() {
        let gate = AuthorizationGate::new(None);
        assert!(!gate.enabled());
        let result = gate.validate_bearer(None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_valid_bearer_yields_claims() {
        let header = format!("Bearer {}", token());
        let claims = gate()
            .validate_bearer(Some(&header))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claims.subject, "u1");
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let err = gate().validate_bearer(None).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        let err = gate()
            .validate_bearer(Some("Basic dXNlcjpwYXNz"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn test_empty_bearer_rejected() {
        let err = gate().validate_bearer(Some("Bearer ")).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn test_unauthorized_response_carries_challenge() {
        let response = unauthorized_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
    }

    #[test]
    fn test_from_config_disabled_builds_pass_through() {
        let config = Config::default();
        let gate = AuthorizationGate::from_config(&config).unwrap();
        assert!(!gate.enabled());
    }

    #[test]
    fn test_from_config_enabled_requires_credentials() {
        let config = Config {
            oauth_enabled: true,
            ..Config::default()
        };
        assert!(matches!(
            AuthorizationGate::from_config(&config),
            Err(ConfigError::MissingSecret)
        ));
    }
}
