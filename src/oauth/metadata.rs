//! OAuth discovery documents
//!
//! Three documents, all cacheable for five minutes:
//!
//! - `/.well-known/oauth-authorization-server` -- RFC 8414 authorization
//!   server metadata, describing the upstream provider.
//! - `/.well-known/oauth-protected-resource` -- RFC 9728 protected resource
//!   metadata, describing this gateway.
//! - `/oauth/metadata` -- legacy document predating the well-known pair;
//!   kept for clients that still probe it.
//!
//! Unlike the flow routes these are mounted in every mode: native-mode
//! clients rely on them to find the provider they must talk to directly.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::config::ProviderKind;
use crate::oauth::discovery::ProviderEndpoints;
use crate::server::AppState;

const CACHE_POLICY: (header::HeaderName, &str) = (header::CACHE_CONTROL, "public, max-age=300");

fn cached_json(body: Value) -> Response {
    ([CACHE_POLICY], Json(body)).into_response()
}

/// The provider token endpoint to advertise: the relay's resolved endpoint
/// when the relay exists, the conventional layout otherwise.
fn advertised_endpoints(state: &AppState) -> ProviderEndpoints {
    match &state.relay {
        Some(relay) => relay.endpoints().clone(),
        None => ProviderEndpoints::conventional(&state.config.oidc_issuer),
    }
}

/// `GET /.well-known/oauth-authorization-server` (RFC 8414).
pub async fn authorization_server(State(state): State<AppState>) -> Response {
    let issuer = state.config.oidc_issuer.trim_end_matches('/');
    cached_json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/oauth2/v1/authorize"),
        "token_endpoint": format!("{issuer}/oauth2/v1/token"),
        "registration_endpoint": format!("{issuer}/oauth2/v1/clients"),
        "response_types_supported": ["code"],
        "response_modes_supported": ["query"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post", "none"],
        "code_challenge_methods_supported": ["plain", "S256"],
        "revocation_endpoint": format!("{issuer}/oauth/revoke"),
    }))
}

/// `GET /.well-known/oauth-protected-resource` (RFC 9728).
pub async fn protected_resource(State(state): State<AppState>) -> Response {
    let base = state.config.public_url.trim_end_matches('/');
    cached_json(json!({
        "resource": base,
        "authorization_servers": [base],
        "bearer_methods_supported": ["header"],
        "resource_signing_alg_values_supported": ["RS256"],
        "resource_documentation": format!("{base}/docs"),
        "resource_policy_uri": format!("{base}/policy"),
        "resource_tos_uri": format!("{base}/tos"),
    }))
}

/// `GET /oauth/metadata` -- legacy document.
pub async fn legacy(State(state): State<AppState>) -> Response {
    let config = &state.config;

    if !config.oauth_enabled {
        return cached_json(json!({
            "oauth_enabled": false,
            "authentication_methods": ["none"],
            "mcp_version": "1.0.0",
        }));
    }

    let base = config.public_url.trim_end_matches('/');
    let mut doc = json!({
        "oauth_enabled": true,
        "authentication_methods": ["bearer_token"],
        "token_types": ["JWT"],
        "token_validation": "server_side",
        "mcp_version": "1.0.0",
        "server_version": env!("CARGO_PKG_VERSION"),
        "provider": config.provider.to_string(),
        "authorization_endpoint": format!("{base}/oauth/authorize"),
        "token_endpoint": advertised_endpoints(&state).token_endpoint,
    });

    match config.provider {
        ProviderKind::Hmac => {
            doc["validation_method"] = json!("hmac_sha256");
            doc["signature_algorithm"] = json!("HS256");
            doc["requires_secret"] = json!(true);
        }
        ProviderKind::Oidc => {
            doc["validation_method"] = json!("oidc_jwks");
            doc["signature_algorithm"] = json!("RS256");
            doc["requires_secret"] = json!(false);
            if !config.oidc_issuer.is_empty() {
                let issuer = config.oidc_issuer.trim_end_matches('/');
                doc["issuer"] = json!(issuer);
                doc["jwks_uri"] = json!(format!("{issuer}/.well-known/jwks.json"));
            }
            if !config.oidc_audience.is_empty() {
                doc["audience"] = json!(config.oidc_audience);
            }
        }
    }

    cached_json(doc)
}
