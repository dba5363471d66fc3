//! Authorization-code flow relay
//!
//! Drives the authorize / callback / token exchange triple against the
//! identity provider. One login attempt is one authorize/callback/exchange
//! sequence; the relay itself carries no cross-request mutable state, so a
//! single instance serves any number of concurrent logins.
//!
//! In proxy mode the relay substitutes its own fixed, pre-registered
//! redirect URI on the provider leg and threads the client's context through
//! the provider inside the `state` parameter (see [`FlowState`]). Without a
//! fixed redirect URI the client's own URI is used directly and no state
//! re-encoding occurs.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::Config;
use crate::error::FlowError;
use crate::oauth::discovery::ProviderEndpoints;
use crate::oauth::state::FlowState;

/// Scopes requested on every authorization redirect.
const SCOPES: &str = "openid profile email";

// ---------------------------------------------------------------------------
// AuthorizeParams
// ---------------------------------------------------------------------------

/// Parameters of an incoming `/oauth/authorize` request.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeParams {
    /// The client's own redirect URI.
    pub redirect_uri: String,
    /// The client's opaque state value, returned to it verbatim.
    pub state: String,
    /// PKCE code challenge, forwarded to the provider unchanged.
    pub code_challenge: String,
    /// PKCE challenge method, forwarded with the challenge.
    pub code_challenge_method: String,
}

// ---------------------------------------------------------------------------
// TokenGrant
// ---------------------------------------------------------------------------

/// Raw JSON response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// A successful token exchange, with the expiry held as an absolute instant
/// so the remaining lifetime can be recomputed when the response is built.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// The access token issued by the provider.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    pub token_type: String,
    /// Absolute expiry, when the provider reported one.
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token, when issued.
    pub refresh_token: Option<String>,
    /// OIDC ID token, when issued.
    pub id_token: Option<String>,
    /// Granted scope, when reported.
    pub scope: Option<String>,
}

impl TokenGrant {
    fn from_provider(resp: ProviderTokenResponse) -> Self {
        let expires_at = resp
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        TokenGrant {
            access_token: resp.access_token,
            token_type: resp.token_type,
            expires_at,
            refresh_token: resp.refresh_token,
            id_token: resp.id_token,
            scope: resp.scope,
        }
    }

    /// Builds the JSON body returned to the client, with `expires_in`
    /// computed as the remaining lifetime at response time.
    pub fn to_response_body(&self) -> Value {
        let mut body = json!({
            "access_token": self.access_token,
            "token_type": self.token_type,
        });
        if let Some(expires_at) = self.expires_at {
            body["expires_in"] = json!((expires_at - Utc::now()).num_seconds());
        }
        if let Some(refresh_token) = &self.refresh_token {
            body["refresh_token"] = json!(refresh_token);
        }
        if let Some(id_token) = &self.id_token {
            body["id_token"] = json!(id_token);
        }
        if let Some(scope) = &self.scope {
            body["scope"] = json!(scope);
        }
        body
    }
}

// ---------------------------------------------------------------------------
// CallbackOutcome
// ---------------------------------------------------------------------------

/// What the callback handler should do with a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Redirect the browser back to the client's redirect URI with the
    /// authorization code and the client's original state.
    RedirectClient(String),
    /// State was absent or undecodable; show the human-readable completion
    /// page. Terminal success, never an error.
    CompletionPage,
}

// ---------------------------------------------------------------------------
// OAuth2Relay
// ---------------------------------------------------------------------------

/// The proxy-mode flow relay, shared across all concurrent logins.
pub struct OAuth2Relay {
    client_id: String,
    client_secret: String,
    fixed_redirect_uri: Option<String>,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
}

impl OAuth2Relay {
    /// Creates a relay from explicit parts.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        fixed_redirect_uri: Option<String>,
        endpoints: ProviderEndpoints,
        http: reqwest::Client,
    ) -> Self {
        OAuth2Relay {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            fixed_redirect_uri,
            endpoints,
            http,
        }
    }

    /// Builds a relay from the process configuration, resolving the
    /// provider's endpoints via discovery (fallback on failure, never fatal).
    pub async fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_default();
        let endpoints =
            crate::oauth::discovery::resolve_endpoints(&http, &config.oidc_issuer).await;
        OAuth2Relay::new(
            config.oidc_client_id.clone(),
            config.oidc_client_secret.clone(),
            config.oauth_redirect_uri.clone(),
            endpoints,
            http,
        )
    }

    /// The relay's registered client id, also returned by the registration
    /// endpoint.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The fixed redirect URI, when one is configured.
    pub fn fixed_redirect_uri(&self) -> Option<&str> {
        self.fixed_redirect_uri.as_deref()
    }

    /// The resolved provider endpoints.
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Builds the provider authorization URL for a client's authorize
    /// request.
    ///
    /// With a fixed redirect URI configured, the provider leg uses the fixed
    /// URI and the client's `{state, redirect}` pair rides inside the
    /// outgoing `state`; otherwise the client's URI and state pass through
    /// unchanged. PKCE parameters are forwarded verbatim when present.
    ///
    /// # Errors
    ///
    /// Fails only when the resolved authorization endpoint is not a valid
    /// URL.
    pub fn authorize_url(&self, params: &AuthorizeParams) -> Result<Url, url::ParseError> {
        let (redirect_uri, state) = match &self.fixed_redirect_uri {
            Some(fixed) => {
                let flow_state = FlowState {
                    state: params.state.clone(),
                    redirect: params.redirect_uri.clone(),
                };
                (fixed.clone(), flow_state.encode())
            }
            None => (params.redirect_uri.clone(), params.state.clone()),
        };

        let mut url = Url::parse(&self.endpoints.authorization_endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &redirect_uri)
                .append_pair("scope", SCOPES)
                .append_pair("access_type", "offline")
                .append_pair("state", &state);
            if !params.code_challenge.is_empty() {
                query
                    .append_pair("code_challenge", &params.code_challenge)
                    .append_pair("code_challenge_method", &params.code_challenge_method);
            }
        }
        Ok(url)
    }

    /// Decides what to do with a successful provider callback.
    ///
    /// With a fixed redirect URI configured, an intact `state` is decoded and
    /// the browser is sent back to the client's redirect URI carrying the
    /// code and the client's original state. An undecodable state (or native
    /// passthrough operation) yields the completion page.
    pub fn callback_outcome(&self, code: &str, state: &str) -> CallbackOutcome {
        if self.fixed_redirect_uri.is_none() {
            return CallbackOutcome::CompletionPage;
        }

        let Some(flow_state) = FlowState::decode(state) else {
            tracing::debug!("callback state undecodable, showing completion page");
            return CallbackOutcome::CompletionPage;
        };

        let Ok(mut target) = Url::parse(&flow_state.redirect) else {
            tracing::warn!(redirect = %flow_state.redirect,
                "decoded redirect URI unparsable, showing completion page");
            return CallbackOutcome::CompletionPage;
        };
        target
            .query_pairs_mut()
            .append_pair("code", code)
            .append_pair("state", &flow_state.state);

        tracing::info!(redirect = %target.host_str().unwrap_or("<none>"),
            "proxying authorization code back to client");
        CallbackOutcome::RedirectClient(target.into())
    }

    /// Exchanges an authorization code for tokens at the provider's token
    /// endpoint.
    ///
    /// The token request uses the same redirect URI as authorize time (the
    /// fixed URI when configured) and appends the PKCE `code_verifier` to the
    /// form body when the client supplied one.
    ///
    /// # Errors
    ///
    /// - [`FlowError::UnsupportedGrant`] for any grant other than
    ///   `authorization_code`.
    /// - [`FlowError::MissingCode`] for an empty code.
    /// - [`FlowError::ExchangeFailed`] when the provider rejects the exchange
    ///   or is unreachable.
    pub async fn exchange(
        &self,
        grant_type: &str,
        code: &str,
        client_redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenGrant, FlowError> {
        if code.is_empty() {
            return Err(FlowError::MissingCode);
        }
        if grant_type != "authorization_code" {
            return Err(FlowError::UnsupportedGrant(grant_type.to_string()));
        }

        let redirect_uri = self
            .fixed_redirect_uri
            .as_deref()
            .unwrap_or(client_redirect_uri);

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &self.client_id),
        ];
        if !self.client_secret.is_empty() {
            form.push(("client_secret", &self.client_secret));
        }
        if let Some(verifier) = code_verifier.filter(|v| !v.is_empty()) {
            form.push(("code_verifier", verifier));
        }

        let resp = self
            .http
            .post(&self.endpoints.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| FlowError::ExchangeFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FlowError::ExchangeFailed(format!(
                "provider returned {status}"
            )));
        }

        let provider_resp: ProviderTokenResponse = resp
            .json()
            .await
            .map_err(|e| FlowError::ExchangeFailed(format!("unparsable token response: {e}")))?;

        let grant = TokenGrant::from_provider(provider_resp);
        tracing::info!(
            token = %crate::auth::token_preview(&grant.access_token),
            "token exchange successful"
        );
        Ok(grant)
    }
}
