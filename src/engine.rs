//! SQL engine seam
//!
//! The engine wire protocol, driver, and connection pooling live outside
//! this crate; the gateway only needs "run a statement, get rows back".
//! [`QueryEngine`] is that seam. Rows come back as ordered JSON maps so
//! metadata queries can extract named columns without a schema.

use async_trait::async_trait;

use crate::error::SqlgateError;

/// One result row: column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The out-of-scope SQL engine collaborator.
///
/// Implementations are expected to bound every statement with their own
/// timeout; the gateway never retries a failed statement.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Runs one SQL statement and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqlgateError::Engine`] describing the engine-side failure.
    async fn run_query(&self, sql: &str) -> Result<Vec<Row>, SqlgateError>;
}
