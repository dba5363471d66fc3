//! HTTP handlers for the OAuth flow surface
//!
//! These routes are mounted only in proxy mode; in native mode the router
//! never registers them and they 404. Handlers recover every flow failure at
//! the boundary as 400/500 responses to the flow participant; nothing here
//! is fatal to the process.

use axum::extract::{Query, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::token_preview;
use crate::error::FlowError;
use crate::oauth::relay::{AuthorizeParams, CallbackOutcome};
use crate::server::AppState;

/// Terminal page shown when the callback cannot be proxied back to a client.
const COMPLETION_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>OAuth2 Success</title>
</head>
<body>
    <h2>Authentication Successful!</h2>
    <p>You have been successfully authenticated.</p>
    <p>You can now close this window and return to your application.</p>
</body>
</html>"#;

fn relay_unavailable() -> Response {
    // Proxy routes are only mounted when the relay exists; this is a
    // belt-and-braces answer, not a reachable path.
    StatusCode::NOT_FOUND.into_response()
}

// ---------------------------------------------------------------------------
// GET /oauth/authorize
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code_challenge: String,
    #[serde(default)]
    pub code_challenge_method: String,
}

/// Redirects the browser to the identity provider's authorization endpoint.
pub async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    let Some(relay) = &state.relay else {
        return relay_unavailable();
    };

    tracing::info!(
        client_id = %query.client_id,
        redirect_uri = %query.redirect_uri,
        code_challenge = %token_preview(&query.code_challenge),
        "authorization request"
    );

    let params = AuthorizeParams {
        redirect_uri: query.redirect_uri,
        state: query.state,
        code_challenge: query.code_challenge,
        code_challenge_method: query.code_challenge_method,
    };

    match relay.authorize_url(&params) {
        Ok(url) => Redirect::temporary(url.as_str()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to build authorization URL");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /oauth/callback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

/// Receives the provider callback and proxies the code back to the client.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(relay) = &state.relay else {
        return relay_unavailable();
    };

    tracing::info!(
        code = %token_preview(&query.code),
        error = %query.error,
        "provider callback received"
    );

    if !query.error.is_empty() {
        tracing::warn!(
            code = %query.error,
            description = %query.error_description,
            "provider denied authorization"
        );
        let denied = FlowError::ProviderDenied(query.error_description);
        return (StatusCode::BAD_REQUEST, denied.to_string()).into_response();
    }

    if query.code.is_empty() {
        return (StatusCode::BAD_REQUEST, FlowError::MissingCode.to_string()).into_response();
    }

    match relay.callback_outcome(&query.code, &query.state) {
        CallbackOutcome::RedirectClient(target) => {
            (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
        }
        CallbackOutcome::CompletionPage => completion_page(),
    }
}

fn completion_page() -> Response {
    (
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Html(COMPLETION_PAGE),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /oauth/token
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub code_verifier: String,
}

/// Exchanges an authorization code for tokens at the provider.
pub async fn token(State(state): State<AppState>, Form(form): Form<TokenForm>) -> Response {
    let Some(relay) = &state.relay else {
        return relay_unavailable();
    };

    tracing::info!(
        grant_type = %form.grant_type,
        client_id = %form.client_id,
        code = %token_preview(&form.code),
        "token exchange request"
    );

    let verifier = if form.code_verifier.is_empty() {
        None
    } else {
        Some(form.code_verifier.as_str())
    };

    match relay
        .exchange(&form.grant_type, &form.code, &form.redirect_uri, verifier)
        .await
    {
        Ok(grant) => (
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(grant.to_response_body()),
        )
            .into_response(),
        Err(err) => {
            let status = match err {
                FlowError::MissingCode | FlowError::UnsupportedGrant(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(error = %err, "token exchange rejected");
            (status, err.to_string()).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /oauth/register
// ---------------------------------------------------------------------------

/// Dynamic client registration (RFC 7591 shape).
///
/// Accepts any registration request and answers with the relay's own
/// pre-configured public client id; no per-client credentials are ever
/// provisioned.
pub async fn register(State(state): State<AppState>, Json(request): Json<Value>) -> Response {
    let Some(relay) = &state.relay else {
        return relay_unavailable();
    };

    let client_name = request
        .get("client_name")
        .and_then(|v| v.as_str())
        .unwrap_or("<none>");
    tracing::info!(%client_name, "dynamic client registration request");

    let redirect_uris = match relay.fixed_redirect_uri() {
        Some(fixed) => json!([fixed]),
        None => request.get("redirect_uris").cloned().unwrap_or(json!([])),
    };

    let response = json!({
        "client_id": relay.client_id(),
        "client_secret": "",
        "client_id_issued_at": chrono::Utc::now().timestamp(),
        "grant_types": ["authorization_code", "refresh_token"],
        "response_types": ["code"],
        "token_endpoint_auth_method": "none",
        "application_type": "native",
        "client_name": request.get("client_name").cloned().unwrap_or(Value::Null),
        "redirect_uris": redirect_uris,
    });

    (StatusCode::CREATED, Json(response)).into_response()
}

// ---------------------------------------------------------------------------
// GET /callback
// ---------------------------------------------------------------------------

/// Legacy shim: some clients register `/callback` as the redirect path.
/// Forwards to `/oauth/callback` preserving the full query string.
pub async fn callback_shim(RawQuery(query): RawQuery) -> Response {
    let target = match query {
        Some(q) if !q.is_empty() => format!("/oauth/callback?{q}"),
        _ => "/oauth/callback".to_string(),
    };
    tracing::debug!(%target, "redirecting legacy /callback");
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}
