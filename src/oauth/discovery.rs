//! Provider endpoint discovery
//!
//! Resolves the identity provider's authorization and token endpoints via
//! OIDC discovery, falling back to the conventional `/oauth2/v1/...` layout
//! when the discovery document is unreachable or unparsable. Discovery
//! failure logs a warning and never fails startup: the relay can still
//! operate against a provider whose endpoint layout is the conventional one.

use serde::Deserialize;

/// The provider endpoints the flow relay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Where `/oauth/authorize` redirects the browser.
    pub authorization_endpoint: String,
    /// Where `/oauth/token` exchanges the authorization code.
    pub token_endpoint: String,
}

impl ProviderEndpoints {
    /// The conventional endpoint layout used when discovery fails.
    pub fn conventional(issuer: &str) -> Self {
        let issuer = issuer.trim_end_matches('/');
        ProviderEndpoints {
            authorization_endpoint: format!("{issuer}/oauth2/v1/authorize"),
            token_endpoint: format!("{issuer}/oauth2/v1/token"),
        }
    }
}

/// Subset of the OIDC discovery document the relay cares about.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    authorization_endpoint: String,
    token_endpoint: String,
}

/// Resolves the provider's endpoints, preferring OIDC discovery.
///
/// Never fails: any discovery error is logged as a warning and the
/// conventional layout is returned instead.
pub async fn resolve_endpoints(http: &reqwest::Client, issuer: &str) -> ProviderEndpoints {
    let issuer = issuer.trim_end_matches('/');
    let discovery_url = format!("{issuer}/.well-known/openid-configuration");

    match fetch_document(http, &discovery_url).await {
        Ok(doc) => {
            tracing::debug!(issuer, "resolved provider endpoints via OIDC discovery");
            ProviderEndpoints {
                authorization_endpoint: doc.authorization_endpoint,
                token_endpoint: doc.token_endpoint,
            }
        }
        Err(reason) => {
            tracing::warn!(
                issuer,
                %reason,
                "OIDC discovery failed, using conventional endpoint layout"
            );
            ProviderEndpoints::conventional(issuer)
        }
    }
}

async fn fetch_document(http: &reqwest::Client, url: &str) -> Result<DiscoveryDocument, String> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("discovery endpoint returned {}", resp.status()));
    }

    resp.json::<DiscoveryDocument>()
        .await
        .map_err(|e| format!("unparsable discovery document: {e}"))
}
