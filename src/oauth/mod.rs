//! OAuth 2.0 authorization-code flow relay with PKCE
//!
//! # Module Layout
//!
//! - [`discovery`] -- provider endpoint discovery with conventional fallback
//! - [`state`]     -- flow state threaded through the provider redirect
//! - [`relay`]     -- the authorize / callback / exchange state machine
//! - [`handlers`]  -- axum handlers for the flow routes (proxy mode only)
//! - [`metadata`]  -- RFC 8414 / RFC 9728 / legacy discovery documents
//!
//! In native mode clients talk to the identity provider directly and the
//! gateway only publishes the metadata documents; the flow routes are never
//! mounted. In proxy mode the gateway mediates the whole flow with its own
//! registered credentials.

pub mod discovery;
pub mod handlers;
pub mod metadata;
pub mod relay;
pub mod state;

pub use discovery::ProviderEndpoints;
pub use relay::{AuthorizeParams, CallbackOutcome, OAuth2Relay, TokenGrant};
pub use state::FlowState;
