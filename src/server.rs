//! HTTP surface composition
//!
//! Builds the shared application state and the axum router. Which routes
//! exist is a capability decision made here, at registration time: the
//! proxy-only flow routes are simply never mounted in native mode, so they
//! 404 without any per-handler mode checks.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::auth::AuthorizationGate;
use crate::config::{Config, OAuthMode};
use crate::error::ConfigError;
use crate::oauth::{handlers, metadata, OAuth2Relay};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Immutable process configuration.
    pub config: Arc<Config>,
    /// The flow relay; present only in proxy mode with auth enabled.
    pub relay: Option<Arc<OAuth2Relay>>,
    /// The bearer-token gate.
    pub gate: Arc<AuthorizationGate>,
}

/// Builds the shared state, constructing the validator and (in proxy mode)
/// resolving the provider endpoints.
///
/// # Errors
///
/// Returns [`ConfigError`] when the enabled provider is missing required
/// credentials; fatal at startup.
pub async fn build_state(config: Config) -> Result<AppState, ConfigError> {
    let gate = Arc::new(AuthorizationGate::from_config(&config)?);

    let relay = if config.oauth_enabled && config.oauth_mode == OAuthMode::Proxy {
        Some(Arc::new(OAuth2Relay::from_config(&config).await))
    } else {
        None
    };

    Ok(AppState {
        config: Arc::new(config),
        relay,
        gate,
    })
}

/// Builds the router for the given state.
///
/// Discovery documents and health are always mounted; the flow routes only
/// when the relay exists.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route(
            "/.well-known/oauth-authorization-server",
            get(metadata::authorization_server),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(metadata::protected_resource),
        )
        .route("/oauth/metadata", get(metadata::legacy));

    if state.relay.is_some() {
        router = router
            .route("/oauth/authorize", get(handlers::authorize))
            .route("/oauth/callback", get(handlers::callback))
            .route("/oauth/token", post(handlers::token))
            .route("/oauth/register", post(handlers::register))
            .route("/callback", get(handlers::callback_shim));
    }

    router.with_state(state)
}

/// Binds the configured address and serves until shutdown.
///
/// # Errors
///
/// Returns an error when the listen address cannot be bound or the server
/// loop fails.
pub async fn serve(state: AppState) -> crate::error::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        %addr,
        oauth_enabled = state.config.oauth_enabled,
        proxy = state.relay.is_some(),
        "sqlgate listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "oauth_enabled": state.config.oauth_enabled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_state_native_mode_has_no_relay() {
        let state = build_state(Config::default()).await.unwrap();
        assert!(state.relay.is_none());
        assert!(!state.gate.enabled());
    }

    #[tokio::test]
    async fn test_build_state_rejects_incomplete_credentials() {
        let config = Config {
            oauth_enabled: true,
            ..Config::default()
        };
        assert!(matches!(
            build_state(config).await,
            Err(ConfigError::MissingSecret)
        ));
    }

    // Route-level behavior (native-mode 404s, discovery documents, the
    // legacy /callback shim) is covered in tests/server_routes_test.rs.
}
