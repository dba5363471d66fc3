//! Configuration management for Sqlgate
//!
//! All configuration is collected into one immutable [`Config`] struct built
//! once at startup from environment variables. Components receive the parts
//! they need at construction time; no component reads the environment
//! directly after startup.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Which trust model the token validator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Shared-secret HS256 validation.
    Hmac,
    /// External OIDC provider with RS256/JWKS validation.
    Oidc,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hmac" => Ok(ProviderKind::Hmac),
            "oidc" => Ok(ProviderKind::Oidc),
            other => Err(ConfigError::InvalidProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Hmac => write!(f, "hmac"),
            ProviderKind::Oidc => write!(f, "oidc"),
        }
    }
}

/// OAuth operational mode.
///
/// In native mode the client talks to the identity provider directly and the
/// gateway only validates tokens; in proxy mode the gateway mediates the
/// whole authorization flow with its own registered credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthMode {
    /// Server validates only; the flow relay endpoints are not mounted.
    Native,
    /// Server mediates the full flow with its own client credentials.
    Proxy,
}

impl FromStr for OAuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(OAuthMode::Native),
            "proxy" => Ok(OAuthMode::Proxy),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Immutable process-wide gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether bearer-token authentication is enforced at all.
    pub oauth_enabled: bool,
    /// Native or proxy flow mode.
    pub oauth_mode: OAuthMode,
    /// Trust model for token validation.
    pub provider: ProviderKind,

    /// HS256 signing secret (HMAC provider).
    pub jwt_secret: String,
    /// OIDC issuer URL.
    pub oidc_issuer: String,
    /// Expected token audience. Always checked against this value, never the
    /// client id, so the validator can be re-pointed without re-registering.
    pub oidc_audience: String,
    /// OAuth client id used by the proxy-mode relay.
    pub oidc_client_id: String,
    /// OAuth client secret used by the proxy-mode relay.
    pub oidc_client_secret: String,
    /// Fixed, pre-registered redirect URI for proxy mode. `None` means the
    /// client's own redirect URI is used directly and no state re-encoding
    /// occurs.
    pub oauth_redirect_uri: Option<String>,

    /// Bind host for the HTTP surface.
    pub host: String,
    /// Bind port for the HTTP surface.
    pub port: u16,
    /// Externally visible base URL of the gateway, used in discovery
    /// documents.
    pub public_url: String,

    /// Default catalog used when a table reference omits one.
    pub default_catalog: String,
    /// Default schema used when a table reference omits one.
    pub default_schema: String,
    /// When true the read-only classifier is bypassed entirely.
    pub allow_write_queries: bool,

    /// Allowed catalogs; empty means unrestricted.
    pub allowed_catalogs: Vec<String>,
    /// Allowed `catalog.schema` names; empty means unrestricted.
    pub allowed_schemas: Vec<String>,
    /// Allowed `catalog.schema.table` names; empty means unrestricted.
    pub allowed_tables: Vec<String>,

    /// Timeout applied to every outbound call (discovery, JWKS fetch, token
    /// exchange).
    pub http_timeout: Duration,
}

impl Config {
    /// Builds the configuration from environment variables.
    ///
    /// Allowlist entries are validated for the right qualification depth
    /// here, because a malformed entry would otherwise silently never match
    /// and the operator would believe a restriction is in place.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on an unknown provider/mode tag or a
    /// malformed allowlist entry. Provider-specific required fields are
    /// checked by [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let oauth_enabled = env_bool("OAUTH_ENABLED", false);
        let oauth_mode: OAuthMode = env_or("OAUTH_MODE", "native").parse()?;
        let provider: ProviderKind = env_or("OAUTH_PROVIDER", "hmac").parse()?;

        // Redirect URI configuration with backward compatibility.
        let redirect = match non_empty(env_or("OAUTH_ALLOWED_REDIRECT_URIS", "")) {
            Some(uris) => {
                // Comma-separated list; the first entry is the fixed URI the
                // relay registers with the provider.
                uris.split(',')
                    .map(str::trim)
                    .find(|s| !s.is_empty())
                    .map(str::to_string)
            }
            None => {
                let deprecated = non_empty(env_or("OAUTH_REDIRECT_URI", ""));
                if deprecated.is_some() {
                    tracing::warn!(
                        "OAUTH_REDIRECT_URI is deprecated; use OAUTH_ALLOWED_REDIRECT_URIS"
                    );
                }
                deprecated
            }
        };

        let host = env_or("SQLGATE_HOST", "localhost");
        let port: u16 = env_or("SQLGATE_PORT", "8080").parse().unwrap_or(8080);
        let public_url = non_empty(env_or("SQLGATE_URL", ""))
            .unwrap_or_else(|| format!("http://{}:{}", host, port));

        let allowed_catalogs = parse_allowlist(&env_or("SQLGATE_ALLOWED_CATALOGS", ""));
        let allowed_schemas = parse_allowlist(&env_or("SQLGATE_ALLOWED_SCHEMAS", ""));
        let allowed_tables = parse_allowlist(&env_or("SQLGATE_ALLOWED_TABLES", ""));

        validate_allowlist("SQLGATE_ALLOWED_SCHEMAS", &allowed_schemas, 1)?;
        validate_allowlist("SQLGATE_ALLOWED_TABLES", &allowed_tables, 2)?;

        let allow_write_queries = env_bool("SQLGATE_ALLOW_WRITE_QUERIES", false);
        if allow_write_queries {
            tracing::warn!(
                "write queries are enabled (SQLGATE_ALLOW_WRITE_QUERIES=true); \
                 the read-only classifier is bypassed"
            );
        }

        let timeout_secs: u64 = env_or("SQLGATE_HTTP_TIMEOUT", "10").parse().unwrap_or(10);

        Ok(Config {
            oauth_enabled,
            oauth_mode,
            provider,
            jwt_secret: env_or("JWT_SECRET", ""),
            oidc_issuer: env_or("OIDC_ISSUER", ""),
            // No default: the audience must be explicitly configured.
            oidc_audience: env_or("OIDC_AUDIENCE", ""),
            oidc_client_id: env_or("OIDC_CLIENT_ID", ""),
            oidc_client_secret: env_or("OIDC_CLIENT_SECRET", ""),
            oauth_redirect_uri: redirect,
            host,
            port,
            public_url,
            default_catalog: env_or("SQLGATE_DEFAULT_CATALOG", "memory"),
            default_schema: env_or("SQLGATE_DEFAULT_SCHEMA", "default"),
            allow_write_queries,
            allowed_catalogs,
            allowed_schemas,
            allowed_tables,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Checks provider-specific required fields.
    ///
    /// Performed at startup so a misconfigured validator never reaches its
    /// first request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.oauth_enabled {
            return Ok(());
        }
        match self.provider {
            ProviderKind::Hmac => {
                if self.jwt_secret.is_empty() {
                    return Err(ConfigError::MissingSecret);
                }
                if self.oidc_audience.is_empty() {
                    return Err(ConfigError::MissingAudience("hmac"));
                }
            }
            ProviderKind::Oidc => {
                if self.oidc_issuer.is_empty() {
                    return Err(ConfigError::MissingIssuer);
                }
                if self.oidc_audience.is_empty() {
                    return Err(ConfigError::MissingAudience("oidc"));
                }
            }
        }
        Ok(())
    }

    /// Logs the allowlist configuration at startup.
    pub fn log_allowlists(&self) {
        if self.allowed_catalogs.is_empty()
            && self.allowed_schemas.is_empty()
            && self.allowed_tables.is_empty()
        {
            tracing::info!("no allowlists configured; all catalogs, schemas, and tables visible");
            return;
        }
        if !self.allowed_catalogs.is_empty() {
            tracing::info!(
                count = self.allowed_catalogs.len(),
                catalogs = %self.allowed_catalogs.join(", "),
                "catalog allowlist configured"
            );
        }
        if !self.allowed_schemas.is_empty() {
            tracing::info!(
                count = self.allowed_schemas.len(),
                schemas = %self.allowed_schemas.join(", "),
                "schema allowlist configured"
            );
        }
        if !self.allowed_tables.is_empty() {
            tracing::info!(
                count = self.allowed_tables.len(),
                tables = %self.allowed_tables.join(", "),
                "table allowlist configured"
            );
        }
    }
}

impl Default for Config {
    /// A permissive local-development configuration, used mainly by tests.
    fn default() -> Self {
        Config {
            oauth_enabled: false,
            oauth_mode: OAuthMode::Native,
            provider: ProviderKind::Hmac,
            jwt_secret: String::new(),
            oidc_issuer: String::new(),
            oidc_audience: String::new(),
            oidc_client_id: String::new(),
            oidc_client_secret: String::new(),
            oauth_redirect_uri: None,
            host: "localhost".to_string(),
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            default_catalog: "memory".to_string(),
            default_schema: "default".to_string(),
            allow_write_queries: false,
            allowed_catalogs: Vec::new(),
            allowed_schemas: Vec::new(),
            allowed_tables: Vec::new(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Reads an environment variable with a default.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads a boolean environment variable with a default.
fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}

/// Parses a comma-separated allowlist, trimming and dropping empty entries.
pub fn parse_allowlist(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validates that every allowlist entry has exactly `expected_dots` dot
/// separators.
fn validate_allowlist(
    variable: &'static str,
    entries: &[String],
    expected_dots: usize,
) -> Result<(), ConfigError> {
    for entry in entries {
        let found = entry.matches('.').count();
        if found != expected_dots {
            return Err(ConfigError::InvalidAllowlistEntry {
                variable,
                entry: entry.clone(),
                expected: expected_dots,
                found,
            });
        }
    }
    Ok(())
}
