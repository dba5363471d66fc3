//! Integration tests for the token exchange against a mock provider
//!
//! Verifies the wire form of the outgoing token request, in particular that
//! the PKCE `code_verifier` travels in the form body, and that provider
//! failures surface as typed flow errors.

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sqlgate::error::FlowError;
use sqlgate::oauth::{OAuth2Relay, ProviderEndpoints};

fn relay_for(server: &MockServer, fixed_redirect_uri: Option<&str>) -> OAuth2Relay {
    let endpoints = ProviderEndpoints {
        authorization_endpoint: format!("{}/authorize", server.uri()),
        token_endpoint: format!("{}/token", server.uri()),
    };
    OAuth2Relay::new(
        "relay-client",
        "relay-secret",
        fixed_redirect_uri.map(str::to_string),
        endpoints,
        reqwest::Client::new(),
    )
}

fn token_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": "provider-access-token",
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": "provider-refresh-token",
        "id_token": "provider-id-token",
        "scope": "openid profile",
    })
}

#[tokio::test]
async fn exchange_sends_code_verifier_in_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-123"))
        .and(body_string_contains("client_id=relay-client"))
        .and(body_string_contains("client_secret=relay-secret"))
        .and(body_string_contains("code_verifier=verifier-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server, None);
    let grant = relay
        .exchange(
            "authorization_code",
            "auth-code-123",
            "https://client/cb",
            Some("verifier-xyz"),
        )
        .await
        .unwrap();

    assert_eq!(grant.access_token, "provider-access-token");
    assert_eq!(grant.token_type, "Bearer");
    assert_eq!(grant.refresh_token.as_deref(), Some("provider-refresh-token"));
    assert_eq!(grant.id_token.as_deref(), Some("provider-id-token"));
    assert!(grant.expires_at.is_some());
}

#[tokio::test]
async fn exchange_uses_fixed_redirect_uri_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "redirect_uri=https%3A%2F%2Fgateway%2Foauth%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server, Some("https://gateway/oauth/callback"));
    relay
        .exchange(
            "authorization_code",
            "auth-code-123",
            "https://client/cb",
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn exchange_without_verifier_omits_the_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .mount(&server)
        .await;

    let relay = relay_for(&server, None);
    relay
        .exchange("authorization_code", "code", "https://client/cb", None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(!body.contains("code_verifier"));
}

#[tokio::test]
async fn provider_rejection_surfaces_as_exchange_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let relay = relay_for(&server, None);
    let err = relay
        .exchange("authorization_code", "bad-code", "https://client/cb", None)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::ExchangeFailed(_)));
}

#[tokio::test]
async fn token_response_without_optional_fields_still_parses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at",
            "token_type": "Bearer",
        })))
        .mount(&server)
        .await;

    let relay = relay_for(&server, None);
    let grant = relay
        .exchange("authorization_code", "code", "https://client/cb", None)
        .await
        .unwrap();

    assert!(grant.expires_at.is_none());
    assert!(grant.refresh_token.is_none());
    let body = grant.to_response_body();
    assert!(body.get("expires_in").is_none());
}
