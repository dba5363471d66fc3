//! Query gateway: the authorization layers composed over the engine seam
//!
//! Every tool operation funnels through here. Execution is gated by the
//! read-only classifier (unless writes are explicitly enabled), metadata
//! listings are post-filtered by the allowlists, and table references are
//! resolved to their full identity before any allowlist verdict.

use std::sync::Arc;

use crate::engine::{QueryEngine, Row};
use crate::error::SqlgateError;
use crate::sql::classifier;
use crate::sql::filter::{AccessFilter, ResolvedTable};

/// EXPLAIN output formats the engine accepts.
const EXPLAIN_FORMATS: &[&str] = &["LOGICAL", "DISTRIBUTED", "VALIDATE", "IO"];

/// Mediates all query and metadata access to the engine.
pub struct QueryGateway {
    engine: Arc<dyn QueryEngine>,
    filter: AccessFilter,
    allow_write: bool,
}

impl QueryGateway {
    /// Composes the gateway from its parts.
    pub fn new(engine: Arc<dyn QueryEngine>, filter: AccessFilter, allow_write: bool) -> Self {
        QueryGateway {
            engine,
            filter,
            allow_write,
        }
    }

    /// The allowlist filter, for callers that post-process engine output
    /// themselves.
    pub fn filter(&self) -> &AccessFilter {
        &self.filter
    }

    /// Runs a SQL statement, enforcing the read-only gate unless write
    /// queries were explicitly enabled at startup.
    ///
    /// # Errors
    ///
    /// Returns the classifier's [`QueryRejected`](crate::error::QueryRejected)
    /// verdict as an expected denial, or [`SqlgateError::Engine`] when the
    /// statement fails engine-side.
    pub async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SqlgateError> {
        if !self.allow_write {
            classifier::check_read_only(sql)?;
        }
        self.engine.run_query(sql).await
    }

    /// Lists catalogs visible through the catalog allowlist.
    pub async fn list_catalogs(&self) -> Result<Vec<String>, SqlgateError> {
        let rows = self.execute_query("SHOW CATALOGS").await?;
        let catalogs = string_column(rows, "Catalog");
        Ok(self.filter.filter_catalogs(catalogs))
    }

    /// Lists schemas in a catalog (default catalog when empty), filtered by
    /// the schema allowlist.
    pub async fn list_schemas(&self, catalog: &str) -> Result<Vec<String>, SqlgateError> {
        let catalog = self.or_default_catalog(catalog);
        let rows = self
            .execute_query(&format!("SHOW SCHEMAS FROM {catalog}"))
            .await?;
        let schemas = string_column(rows, "Schema");
        Ok(self.filter.filter_schemas(&catalog, schemas))
    }

    /// Lists tables in a schema (defaults applied for empty arguments),
    /// filtered by the table allowlist.
    pub async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
    ) -> Result<Vec<String>, SqlgateError> {
        let catalog = self.or_default_catalog(catalog);
        let schema = if schema.is_empty() {
            self.filter.default_schema().to_string()
        } else {
            schema.to_string()
        };
        let rows = self
            .execute_query(&format!("SHOW TABLES FROM {catalog}.{schema}"))
            .await?;
        let tables = string_column(rows, "Table");
        Ok(self.filter.filter_tables(&catalog, &schema, tables))
    }

    /// Describes a table after resolving the reference and checking the
    /// table allowlist against the resolved identity.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`](crate::error::AccessDenied) naming the
    /// denied qualified name.
    pub async fn get_table_schema(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<Row>, SqlgateError> {
        let resolved: ResolvedTable = self.filter.check_table(catalog, schema, table)?;
        self.execute_query(&format!("DESCRIBE {}", resolved.qualified_name()))
            .await
    }

    /// Returns the execution plan for a statement, with an optional
    /// `TYPE` format from the accepted set.
    ///
    /// # Errors
    ///
    /// Returns [`SqlgateError::InvalidExplainFormat`] for a format outside
    /// the whitelist; the statement itself still passes the read-only gate.
    pub async fn explain_query(
        &self,
        sql: &str,
        format: &str,
    ) -> Result<Vec<Row>, SqlgateError> {
        let format = format.trim().to_uppercase();
        let prefix = if format.is_empty() {
            "EXPLAIN".to_string()
        } else if EXPLAIN_FORMATS.contains(&format.as_str()) {
            format!("EXPLAIN (TYPE {format})")
        } else {
            return Err(SqlgateError::InvalidExplainFormat(format));
        };
        self.execute_query(&format!("{prefix} {sql}")).await
    }

    fn or_default_catalog(&self, catalog: &str) -> String {
        if catalog.is_empty() {
            self.filter.default_catalog().to_string()
        } else {
            catalog.to_string()
        }
    }
}

/// Pulls a named string column out of a row set, skipping rows where the
/// column is absent or not a string.
fn string_column(rows: Vec<Row>, column: &str) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| {
            row.get(column)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AccessDenied, QueryRejected};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Engine double that records statements and answers from a canned map
    /// keyed by statement prefix.
    struct ScriptedEngine {
        statements: Mutex<Vec<String>>,
        responses: Vec<(&'static str, Vec<Row>)>,
    }

    impl ScriptedEngine {
        fn new(responses: Vec<(&'static str, Vec<Row>)>) -> Self {
            ScriptedEngine {
                statements: Mutex::new(Vec::new()),
                responses,
            }
        }

        fn seen(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        async fn run_query(&self, sql: &str) -> Result<Vec<Row>, SqlgateError> {
            self.statements.lock().unwrap().push(sql.to_string());
            for (prefix, rows) in &self.responses {
                if sql.starts_with(prefix) {
                    return Ok(rows.clone());
                }
            }
            Ok(Vec::new())
        }
    }

    fn rows(column: &str, values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert(column.to_string(), json!(v));
                row
            })
            .collect()
    }

    fn gateway_with(
        engine: Arc<ScriptedEngine>,
        catalogs: &[&str],
        schemas: &[&str],
        tables: &[&str],
    ) -> QueryGateway {
        let filter = AccessFilter::new(
            catalogs.iter().map(|s| s.to_string()).collect(),
            schemas.iter().map(|s| s.to_string()).collect(),
            tables.iter().map(|s| s.to_string()).collect(),
            "memory",
            "default",
        );
        QueryGateway::new(engine, filter, false)
    }

    #[tokio::test]
    async fn test_execute_query_rejects_writes() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let gateway = gateway_with(Arc::clone(&engine), &[], &[], &[]);

        let err = gateway
            .execute_query("DROP TABLE t")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SqlgateError::Query(QueryRejected::WriteKeywordDetected(_))
        ));
        assert!(engine.seen().is_empty(), "engine must not see rejected SQL");
    }

    #[tokio::test]
    async fn test_execute_query_write_bypass_flag() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let filter = AccessFilter::new(vec![], vec![], vec![], "memory", "default");
        let gateway = QueryGateway::new(engine.clone(), filter, true);

        gateway.execute_query("DROP TABLE t").await.unwrap();
        assert_eq!(engine.seen(), vec!["DROP TABLE t"]);
    }

    #[tokio::test]
    async fn test_list_catalogs_filters_engine_output() {
        let engine = Arc::new(ScriptedEngine::new(vec![(
            "SHOW CATALOGS",
            rows("Catalog", &["hive", "iceberg", "system"]),
        )]));
        let gateway = gateway_with(engine, &["hive", "iceberg"], &[], &[]);

        assert_eq!(gateway.list_catalogs().await.unwrap(), vec!["hive", "iceberg"]);
    }

    #[tokio::test]
    async fn test_list_schemas_applies_default_catalog() {
        let engine = Arc::new(ScriptedEngine::new(vec![(
            "SHOW SCHEMAS FROM memory",
            rows("Schema", &["default", "info"]),
        )]));
        let gateway = gateway_with(Arc::clone(&engine), &[], &[], &[]);

        let schemas = gateway.list_schemas("").await.unwrap();
        assert_eq!(schemas, vec!["default", "info"]);
        assert_eq!(engine.seen(), vec!["SHOW SCHEMAS FROM memory"]);
    }

    #[tokio::test]
    async fn test_list_tables_filters_by_table_allowlist() {
        let engine = Arc::new(ScriptedEngine::new(vec![(
            "SHOW TABLES FROM c.s1",
            rows("Table", &["t1", "t2"]),
        )]));
        let gateway = gateway_with(engine, &[], &[], &["c.s1.t1"]);

        assert_eq!(gateway.list_tables("c", "s1").await.unwrap(), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_get_table_schema_denied_before_engine_call() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let gateway = gateway_with(Arc::clone(&engine), &[], &[], &["c.s.t"]);

        let err = gateway
            .get_table_schema("", "", "c.s.other")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SqlgateError::Access(AccessDenied::TableNotAllowed(name)) if name == "c.s.other"
        ));
        assert!(engine.seen().is_empty());
    }

    #[tokio::test]
    async fn test_get_table_schema_describes_resolved_identity() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let gateway = gateway_with(Arc::clone(&engine), &[], &[], &[]);

        gateway.get_table_schema("", "", "s.t").await.unwrap();
        assert_eq!(engine.seen(), vec!["DESCRIBE memory.s.t"]);
    }

    #[tokio::test]
    async fn test_explain_query_format_whitelist() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let gateway = gateway_with(Arc::clone(&engine), &[], &[], &[]);

        gateway.explain_query("SELECT 1", "io").await.unwrap();
        gateway.explain_query("SELECT 1", "").await.unwrap();
        assert_eq!(
            engine.seen(),
            vec!["EXPLAIN (TYPE IO) SELECT 1", "EXPLAIN SELECT 1"]
        );

        let err = gateway.explain_query("SELECT 1", "GRAPHVIZ").await.unwrap_err();
        assert!(matches!(
            err,
            SqlgateError::InvalidExplainFormat(f) if f == "GRAPHVIZ"
        ));
    }

    #[tokio::test]
    async fn test_string_column_skips_non_string_cells() {
        let mut row = Row::new();
        row.insert("Catalog".to_string(), json!(42));
        let mut good = Row::new();
        good.insert("Catalog".to_string(), json!("hive"));

        assert_eq!(string_column(vec![row, good], "Catalog"), vec!["hive"]);
    }
}
