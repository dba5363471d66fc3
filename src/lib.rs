//! Sqlgate - access-control gateway for a SQL engine
//!
//! This library is the authorization boundary of a data-query gateway that
//! exposes a remote SQL engine (Trino-style catalogs/schemas/tables) to
//! automated clients over a tool-calling protocol. It decides whether a
//! request is allowed and what it may see; the protocol transport and the
//! engine wire driver are external collaborators.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: bearer-token validation (HMAC and OIDC) and the authorization gate
//! - `oauth`: OAuth 2.0 authorization-code flow relay with PKCE
//! - `sql`: read-only query classifier and catalog/schema/table allowlists
//! - `engine`: the SQL engine seam consumed by the gateway
//! - `gateway`: query and metadata operations composed over the engine
//! - `server`: axum router and application state
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use sqlgate::config::Config;
//! use sqlgate::server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!
//!     let state = server::build_state(config).await?;
//!     server::serve(state).await
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod oauth;
pub mod server;
pub mod sql;

// Re-export commonly used types
pub use auth::{AuthorizationGate, IdentityClaims, TokenValidator};
pub use config::Config;
pub use engine::{QueryEngine, Row};
pub use error::{Result, SqlgateError};
pub use gateway::QueryGateway;
pub use sql::{check_read_only, is_read_only, AccessFilter};
