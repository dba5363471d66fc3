//! External-provider token validator (RS256 via JWKS)
//!
//! Verifies tokens minted by an OIDC identity provider. Endpoint discovery
//! is lazy and failure-tolerant: a provider whose discovery document is
//! unreachable can still be used for resource-server validation through the
//! conventional JWKS location, so discovery failure logs a warning instead
//! of failing startup.
//!
//! The JWKS cache is the only shared mutable state in the gateway. It is
//! held as an atomically swapped immutable snapshot so concurrent
//! validations never observe a partially updated key set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::auth::claims::{self, IdentityClaims, RawClaims};
use crate::auth::{map_jwt_error, TokenValidator};
use crate::error::{AuthError, ConfigError};

/// How long a fetched key set stays fresh before the next validation
/// triggers a refresh.
const JWKS_TTL: Duration = Duration::from_secs(300);

/// Subset of the OIDC discovery document the validator cares about.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

/// An immutable key-set snapshot with its fetch time.
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Validates RS-family tokens against an OIDC provider's published key set.
pub struct OidcValidator {
    issuer: String,
    audience: String,
    http: reqwest::Client,
    jwks: RwLock<Option<Arc<CachedJwks>>>,
}

impl OidcValidator {
    /// Creates a validator for the given issuer and expected audience.
    ///
    /// The audience is a configuration field of its own, never the client
    /// id, so the validator can be re-pointed to a new audience without
    /// touching the original client registration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingIssuer`] or
    /// [`ConfigError::MissingAudience`] when the respective field is empty.
    pub fn new(issuer: &str, audience: &str, timeout: Duration) -> Result<Self, ConfigError> {
        if issuer.is_empty() {
            return Err(ConfigError::MissingIssuer);
        }
        if audience.is_empty() {
            return Err(ConfigError::MissingAudience("oidc"));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Ok(OidcValidator {
            issuer: issuer.trim_end_matches('/').to_string(),
            audience: audience.to_string(),
            http,
            jwks: RwLock::new(None),
        })
    }

    /// Resolves the JWKS URI, preferring OIDC discovery and falling back to
    /// the conventional `/.well-known/jwks.json` location on failure.
    async fn resolve_jwks_uri(&self) -> String {
        let discovery_url = format!("{}/.well-known/openid-configuration", self.issuer);
        match self.http.get(&discovery_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<DiscoveryDocument>().await {
                    Ok(doc) => return doc.jwks_uri,
                    Err(e) => {
                        tracing::warn!(issuer = %self.issuer, error = %e,
                            "OIDC discovery document unparsable, using conventional JWKS location");
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(issuer = %self.issuer, status = %resp.status(),
                    "OIDC discovery failed, using conventional JWKS location");
            }
            Err(e) => {
                tracing::warn!(issuer = %self.issuer, error = %e,
                    "OIDC discovery failed, using conventional JWKS location");
            }
        }
        format!("{}/.well-known/jwks.json", self.issuer)
    }

    /// Fetches a fresh key set and swaps it in as the current snapshot.
    async fn refresh_jwks(&self) -> Result<Arc<CachedJwks>, AuthError> {
        let jwks_uri = self.resolve_jwks_uri().await;
        let resp = self
            .http
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksUnavailable(format!("fetch failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AuthError::JwksUnavailable(format!(
                "JWKS endpoint returned {}",
                resp.status()
            )));
        }

        let keys: JwkSet = resp
            .json()
            .await
            .map_err(|e| AuthError::JwksUnavailable(format!("unparsable key set: {e}")))?;

        let snapshot = Arc::new(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });
        *self.jwks.write().await = Some(Arc::clone(&snapshot));
        tracing::debug!(keys = snapshot.keys.keys.len(), "refreshed JWKS cache");
        Ok(snapshot)
    }

    /// Returns the current snapshot, refreshing when absent or stale.
    async fn current_jwks(&self) -> Result<Arc<CachedJwks>, AuthError> {
        if let Some(snapshot) = self.jwks.read().await.as_ref() {
            if snapshot.fetched_at.elapsed() < JWKS_TTL {
                return Ok(Arc::clone(snapshot));
            }
        }
        self.refresh_jwks().await
    }

    /// Locates the decoding key for a token's `kid`, refreshing the key set
    /// once for a `kid` the cached snapshot does not know (key rotation).
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let snapshot = self.current_jwks().await?;
        if let Some(key) = find_key(&snapshot.keys, kid) {
            return Ok(key);
        }

        let snapshot = self.refresh_jwks().await?;
        find_key(&snapshot.keys, kid).ok_or_else(|| {
            AuthError::JwksUnavailable(format!("no key matching kid {:?}", kid.unwrap_or("<none>")))
        })
    }
}

/// Finds a usable decoding key in a key set, matching `kid` when present and
/// falling back to the first parsable key otherwise.
fn find_key(keys: &JwkSet, kid: Option<&str>) -> Option<DecodingKey> {
    let jwk = match kid {
        Some(kid) => keys.find(kid),
        None => keys.keys.first(),
    }?;
    DecodingKey::from_jwk(jwk).ok()
}

#[async_trait]
impl TokenValidator for OidcValidator {
    async fn validate_token(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Audience is checked independently below with the configured value.
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data =
            jsonwebtoken::decode::<RawClaims>(token, &key, &validation).map_err(map_jwt_error)?;

        claims::check_audience(data.claims.aud.as_ref(), &self.audience)?;

        Ok(claims::into_identity(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_requires_issuer_and_audience() {
        let timeout = Duration::from_secs(5);
        assert!(matches!(
            OidcValidator::new("", "svc", timeout),
            Err(ConfigError::MissingIssuer)
        ));
        assert!(matches!(
            OidcValidator::new("https://idp.example.com", "", timeout),
            Err(ConfigError::MissingAudience("oidc"))
        ));
        assert!(OidcValidator::new("https://idp.example.com", "svc", timeout).is_ok());
    }

    #[test]
    fn test_issuer_trailing_slash_is_normalized() {
        let v =
            OidcValidator::new("https://idp.example.com/", "svc", Duration::from_secs(5)).unwrap();
        assert_eq!(v.issuer, "https://idp.example.com");
    }

    #[tokio::test]
    async fn test_unreachable_provider_surfaces_jwks_unavailable() {
        // Construction must succeed even though the issuer is unreachable;
        // the failure surfaces per-request as a typed error, not a hang.
        let v = OidcValidator::new(
            "http://127.0.0.1:1", // nothing listens here
            "svc",
            Duration::from_millis(200),
        )
        .unwrap();

        let err = v.validate_token(
            // Structurally valid JWT header so we reach the JWKS fetch.
            "eyJhbGciOiJSUzI1NiIsImtpZCI6InRlc3QifQ.eyJzdWIiOiJ1In0.sig",
        );
        let err = err.await.unwrap_err();
        assert!(matches!(err, AuthError::JwksUnavailable(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_malformed_before_any_fetch() {
        let v = OidcValidator::new("http://127.0.0.1:1", "svc", Duration::from_millis(200))
            .unwrap();
        let err = v.validate_token("garbage").await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    // Wiremock integration tests covering JWKS discovery, caching, and full
    // RS256 validation are in tests/oidc_validator_test.rs.
}
