//! Error types for Sqlgate
//!
//! This module defines the error taxonomy used throughout the gateway,
//! using `thiserror` for ergonomic error handling.
//!
//! The taxonomy mirrors the boundaries of the system:
//!
//! - [`ConfigError`]   -- fatal at startup; the process must not start.
//! - [`AuthError`]     -- per-request token validation failures, surfaced as
//!   HTTP 401 with a `WWW-Authenticate: Bearer` challenge and a generic body.
//! - [`FlowError`]     -- OAuth flow failures, surfaced as 400/500 to the
//!   flow participant, never fatal to the process.
//! - [`QueryRejected`] -- expected tool-level denials from the read-only
//!   classifier; not logged as anomalies.
//! - [`AccessDenied`]  -- expected tool-level denials from the allowlist
//!   filter, identifying the denied qualified name.

use thiserror::Error;

/// Fatal configuration errors raised at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// HMAC provider selected but no signing secret configured.
    ///
    /// An HMAC validator with no secret would silently accept forged tokens,
    /// so this is fatal at startup rather than deferred to first request.
    #[error("JWT_SECRET is required for the hmac provider")]
    MissingSecret,

    /// No token audience configured for the selected provider.
    #[error("OIDC_AUDIENCE is required for the {0} provider")]
    MissingAudience(&'static str),

    /// OIDC provider selected but no issuer URL configured.
    #[error("OIDC_ISSUER is required for the oidc provider")]
    MissingIssuer,

    /// Unrecognized auth provider tag.
    #[error("unknown auth provider: {0:?} (expected \"hmac\" or \"oidc\")")]
    InvalidProvider(String),

    /// Unrecognized OAuth operational mode.
    #[error("unknown oauth mode: {0:?} (expected \"native\" or \"proxy\")")]
    InvalidMode(String),

    /// An allowlist entry does not match the expected qualification depth.
    #[error("invalid entry in {variable}: {entry:?} (expected {expected} dots, found {found})")]
    InvalidAllowlistEntry {
        /// The environment variable the entry came from.
        variable: &'static str,
        /// The offending entry.
        entry: String,
        /// How many `.` separators the granularity requires.
        expected: usize,
        /// How many were found.
        found: usize,
    },
}

/// Per-request bearer token validation failures.
///
/// The variants are deliberately distinct so the gate can log an accurate
/// diagnostic while returning a generic 401 to the client.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Token expiry (`exp`) is in the past.
    #[error("token expired")]
    Expired,

    /// Signature verification against the configured secret/key failed.
    #[error("token signature verification failed")]
    BadSignature,

    /// Audience claim missing or not matching the configured audience.
    #[error("audience validation failed: {0}")]
    AudienceMismatch(String),

    /// The token could not be parsed as a JWT at all.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The OIDC signing key set could not be fetched or contains no usable key.
    #[error("signing keys unavailable: {0}")]
    JwksUnavailable(String),
}

/// OAuth authorization flow failures.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The identity provider returned an `error` on the callback. Carries
    /// the provider's `error_description`.
    #[error("authorization failed: {0}")]
    ProviderDenied(String),

    /// Token exchange requested without an authorization code.
    #[error("missing authorization code")]
    MissingCode,

    /// Token exchange requested with a grant type other than
    /// `authorization_code`.
    #[error("unsupported grant type: {0}")]
    UnsupportedGrant(String),

    /// The exchange against the provider's token endpoint failed.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),
}

/// Expected denials from the read-only query classifier.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryRejected {
    /// A write/DDL/DCL/session keyword was found anywhere in the statement.
    #[error("query contains write operation {0:?}; only read-only queries are allowed")]
    WriteKeywordDetected(String),

    /// A semicolon survived literal/comment stripping (statement stacking).
    #[error("multiple SQL statements are not allowed")]
    MultipleStatements,

    /// The statement does not start with a recognized read-only prefix.
    #[error("only SELECT, SHOW, DESCRIBE, EXPLAIN, and WITH queries are allowed")]
    NotReadOnly,
}

/// Expected denials from the catalog/schema/table allowlist filter.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccessDenied {
    /// Catalog is not in the catalog allowlist.
    #[error("catalog access denied: {0} not in allowlist")]
    CatalogNotAllowed(String),

    /// `catalog.schema` is not in the schema allowlist.
    #[error("schema access denied: {0} not in allowlist")]
    SchemaNotAllowed(String),

    /// `catalog.schema.table` is not in the table allowlist.
    #[error("table access denied: {0} not in allowlist")]
    TableNotAllowed(String),
}

/// Umbrella error type for gateway operations.
#[derive(Error, Debug)]
pub enum SqlgateError {
    /// Configuration errors (fatal at startup).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bearer token validation errors.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// OAuth flow errors.
    #[error("oauth flow error: {0}")]
    Flow(#[from] FlowError),

    /// Read-only classifier denials.
    #[error("{0}")]
    Query(#[from] QueryRejected),

    /// Allowlist filter denials.
    #[error("{0}")]
    Access(#[from] AccessDenied),

    /// Errors reported by the SQL engine collaborator.
    #[error("engine error: {0}")]
    Engine(String),

    /// An EXPLAIN format outside the accepted set.
    #[error("invalid EXPLAIN format: {0:?} (allowed: LOGICAL, DISTRIBUTED, VALIDATE, IO)")]
    InvalidExplainFormat(String),

    /// HTTP request errors.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gateway operations.
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_display() {
        let error = ConfigError::MissingSecret;
        assert_eq!(
            error.to_string(),
            "JWT_SECRET is required for the hmac provider"
        );
    }

    #[test]
    fn test_missing_audience_display_names_provider() {
        let error = ConfigError::MissingAudience("oidc");
        assert!(error.to_string().contains("oidc provider"));
    }

    #[test]
    fn test_invalid_allowlist_entry_display() {
        let error = ConfigError::InvalidAllowlistEntry {
            variable: "SQLGATE_ALLOWED_SCHEMAS",
            entry: "just_a_schema".to_string(),
            expected: 1,
            found: 0,
        };
        let s = error.to_string();
        assert!(s.contains("SQLGATE_ALLOWED_SCHEMAS"));
        assert!(s.contains("just_a_schema"));
        assert!(s.contains("expected 1 dots, found 0"));
    }

    #[test]
    fn test_audience_mismatch_display() {
        let error = AuthError::AudienceMismatch("missing audience claim".to_string());
        assert_eq!(
            error.to_string(),
            "audience validation failed: missing audience claim"
        );
    }

    #[test]
    fn test_provider_denied_display_uses_description() {
        let error = FlowError::ProviderDenied("user cancelled".to_string());
        assert_eq!(error.to_string(), "authorization failed: user cancelled");
    }

    #[test]
    fn test_unsupported_grant_display() {
        let error = FlowError::UnsupportedGrant("client_credentials".to_string());
        assert_eq!(
            error.to_string(),
            "unsupported grant type: client_credentials"
        );
    }

    #[test]
    fn test_write_keyword_display() {
        let error = QueryRejected::WriteKeywordDetected("drop".to_string());
        assert!(error.to_string().contains("\"drop\""));
    }

    #[test]
    fn test_table_not_allowed_names_qualified_table() {
        let error = AccessDenied::TableNotAllowed("hive.sales.orders".to_string());
        assert_eq!(
            error.to_string(),
            "table access denied: hive.sales.orders not in allowlist"
        );
    }

    #[test]
    fn test_sqlgate_error_wraps_taxonomy() {
        let error: SqlgateError = AuthError::Expired.into();
        assert!(matches!(error, SqlgateError::Auth(AuthError::Expired)));

        let error: SqlgateError = QueryRejected::MultipleStatements.into();
        assert!(matches!(error, SqlgateError::Query(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqlgateError>();
        assert_send_sync::<AuthError>();
    }
}
