//! Flow state threaded through the provider redirect
//!
//! In proxy mode the relay substitutes its own fixed redirect URI when
//! forwarding the browser to the identity provider, so the client's original
//! `state` value and redirect URI have to ride along somewhere. They are
//! carried inside the outgoing `state` parameter itself: serialized as JSON
//! and base64url-encoded so the provider round-trips them opaquely. There is
//! no server-side session store; the wire-encoded value is the only
//! persistence.
//!
//! The payload crosses an untrusted intermediary and is attacker-observable
//! (base64, not encrypted), so decoding validates the structure defensively
//! and never assumes the value came back unmodified.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// The client context carried across the provider redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    /// The client's original opaque `state` value.
    pub state: String,
    /// The client's original redirect URI.
    pub redirect: String,
}

impl FlowState {
    /// Encodes the state for the outgoing provider request.
    pub fn encode(&self) -> String {
        // Two owned strings always serialize.
        let json = serde_json::to_string(self).unwrap_or_default();
        URL_SAFE.encode(json)
    }

    /// Decodes a callback `state` value.
    ///
    /// Tries the structured base64url JSON form first, then the legacy
    /// pipe-delimited `state|redirect` form (exactly one `|`, both halves
    /// non-empty). Returns `None` for anything else; the caller falls back
    /// to the completion page rather than erroring.
    pub fn decode(raw: &str) -> Option<FlowState> {
        if let Some(decoded) = Self::decode_structured(raw) {
            return Some(decoded);
        }
        Self::decode_legacy(raw)
    }

    fn decode_structured(raw: &str) -> Option<FlowState> {
        let bytes = URL_SAFE.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn decode_legacy(raw: &str) -> Option<FlowState> {
        let (state, redirect) = raw.split_once('|')?;
        if state.is_empty() || redirect.is_empty() || redirect.contains('|') {
            return None;
        }
        Some(FlowState {
            state: state.to_string(),
            redirect: redirect.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_reproduces_both_fields() {
        let original = FlowState {
            state: "abc".to_string(),
            redirect: "https://client/cb".to_string(),
        };
        let decoded = FlowState::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_round_trip_with_url_unsafe_characters() {
        let original = FlowState {
            state: "a+b/c=?&".to_string(),
            redirect: "http://localhost:3334/oauth/callback?x=1".to_string(),
        };
        assert_eq!(FlowState::decode(&original.encode()).unwrap(), original);
    }

    #[test]
    fn test_legacy_pipe_format_accepted() {
        let decoded = FlowState::decode("mystate|https://client/cb").unwrap();
        assert_eq!(decoded.state, "mystate");
        assert_eq!(decoded.redirect, "https://client/cb");
    }

    #[test]
    fn test_legacy_format_rejects_extra_pipes() {
        assert!(FlowState::decode("a|b|c").is_none());
    }

    #[test]
    fn test_legacy_format_rejects_empty_halves() {
        assert!(FlowState::decode("|https://client/cb").is_none());
        assert!(FlowState::decode("mystate|").is_none());
    }

    #[test]
    fn test_garbage_state_is_none_not_panic() {
        assert!(FlowState::decode("").is_none());
        assert!(FlowState::decode("not base64 !!!").is_none());
        // Valid base64 but not the expected JSON shape.
        let b64 = base64::engine::general_purpose::URL_SAFE.encode("[1,2,3]");
        assert!(FlowState::decode(&b64).is_none());
    }

    #[test]
    fn test_decode_prefers_structured_form() {
        // An encoded payload that happens to contain a pipe must decode as
        // the structured form, not the legacy split.
        let original = FlowState {
            state: "left|right".to_string(),
            redirect: "https://client/cb".to_string(),
        };
        assert_eq!(FlowState::decode(&original.encode()).unwrap(), original);
    }
}
