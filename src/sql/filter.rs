//! Hierarchical catalog/schema/table allowlist filter
//!
//! Each granularity has its own independent allowlist; an empty list means
//! unrestricted at that granularity (a schema allowlist does not imply a
//! table allowlist). The table allowlist is additionally scoped per schema:
//! only schemas it names at least once are restricted, so listing a table
//! in one schema never hides the tables of a schema the allowlist does not
//! mention. Matching is a case-insensitive exact match against the
//! dot-joined fully qualified name.
//!
//! Table references arrive in three shapes -- `table`, `schema.table`, or
//! `catalog.schema.table` -- and are resolved against configured defaults
//! before any allowlist check, so partially-qualified references are always
//! evaluated against their fully resolved identity.

use crate::config::Config;
use crate::error::AccessDenied;

/// A table reference resolved to its fully qualified identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    /// Catalog, from the reference or the configured default.
    pub catalog: String,
    /// Schema, from the reference or the configured default.
    pub schema: String,
    /// Bare table name.
    pub table: String,
}

impl ResolvedTable {
    /// The dot-joined fully qualified name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

/// Filters and validates qualified names against the configured allowlists.
#[derive(Debug, Clone)]
pub struct AccessFilter {
    catalogs: Vec<String>,
    schemas: Vec<String>,
    tables: Vec<String>,
    default_catalog: String,
    default_schema: String,
}

impl AccessFilter {
    /// Builds the filter from process configuration.
    pub fn from_config(config: &Config) -> Self {
        AccessFilter {
            catalogs: config.allowed_catalogs.clone(),
            schemas: config.allowed_schemas.clone(),
            tables: config.allowed_tables.clone(),
            default_catalog: config.default_catalog.clone(),
            default_schema: config.default_schema.clone(),
        }
    }

    /// Creates a filter from explicit allowlists and defaults.
    pub fn new(
        catalogs: Vec<String>,
        schemas: Vec<String>,
        tables: Vec<String>,
        default_catalog: impl Into<String>,
        default_schema: impl Into<String>,
    ) -> Self {
        AccessFilter {
            catalogs,
            schemas,
            tables,
            default_catalog: default_catalog.into(),
            default_schema: default_schema.into(),
        }
    }

    /// The configured default catalog.
    pub fn default_catalog(&self) -> &str {
        &self.default_catalog
    }

    /// The configured default schema.
    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// True when the catalog is allowed. Unrestricted when the catalog
    /// allowlist is empty.
    pub fn is_catalog_allowed(&self, catalog: &str) -> bool {
        self.catalogs.is_empty() || contains_ignore_case(&self.catalogs, catalog)
    }

    /// True when `catalog.schema` is allowed. Unrestricted when the schema
    /// allowlist is empty.
    pub fn is_schema_allowed(&self, catalog: &str, schema: &str) -> bool {
        self.schemas.is_empty()
            || contains_ignore_case(&self.schemas, &format!("{catalog}.{schema}"))
    }

    /// True when `catalog.schema.table` is allowed. Unrestricted when the
    /// table allowlist is empty or has no entry for this `catalog.schema`.
    pub fn is_table_allowed(&self, catalog: &str, schema: &str, table: &str) -> bool {
        if self.tables.is_empty() {
            return true;
        }
        let scope = format!("{catalog}.{schema}");
        let mut scope_restricted = false;
        for entry in &self.tables {
            // Entries are validated at startup to be catalog.schema.table.
            let Some((prefix, allowed)) = entry.rsplit_once('.') else {
                continue;
            };
            if prefix.eq_ignore_ascii_case(&scope) {
                if allowed.eq_ignore_ascii_case(table) {
                    return true;
                }
                scope_restricted = true;
            }
        }
        !scope_restricted
    }

    /// Filters a catalog list, preserving input order.
    pub fn filter_catalogs(&self, catalogs: Vec<String>) -> Vec<String> {
        catalogs
            .into_iter()
            .filter(|c| self.is_catalog_allowed(c))
            .collect()
    }

    /// Filters a schema list within a catalog, preserving input order.
    pub fn filter_schemas(&self, catalog: &str, schemas: Vec<String>) -> Vec<String> {
        schemas
            .into_iter()
            .filter(|s| self.is_schema_allowed(catalog, s))
            .collect()
    }

    /// Filters a table list within a schema, preserving input order.
    pub fn filter_tables(&self, catalog: &str, schema: &str, tables: Vec<String>) -> Vec<String> {
        tables
            .into_iter()
            .filter(|t| self.is_table_allowed(catalog, schema, t))
            .collect()
    }

    /// Resolves a possibly-qualified table reference to its full identity.
    ///
    /// The `table` argument may be a bare name, `schema.table`, or
    /// `catalog.schema.table`; a qualified reference overrides the
    /// `catalog`/`schema` arguments, and empty positions fall back to the
    /// configured defaults.
    pub fn resolve_table(&self, catalog: &str, schema: &str, table: &str) -> ResolvedTable {
        let parts: Vec<&str> = table.split('.').collect();
        let (catalog, schema, table) = match parts.as_slice() {
            [c, s, t] => ((*c).to_string(), (*s).to_string(), (*t).to_string()),
            [s, t] => (
                or_default(catalog, &self.default_catalog),
                (*s).to_string(),
                (*t).to_string(),
            ),
            _ => (
                or_default(catalog, &self.default_catalog),
                or_default(schema, &self.default_schema),
                table.to_string(),
            ),
        };
        ResolvedTable {
            catalog,
            schema,
            table,
        }
    }

    /// Resolves a table reference and checks every allowlist granularity
    /// against the resolved identity, catalog first.
    ///
    /// # Errors
    ///
    /// Returns the [`AccessDenied`] variant for the narrowest level that
    /// failed, naming the denied qualified name.
    pub fn check_table(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> Result<ResolvedTable, AccessDenied> {
        let resolved = self.resolve_table(catalog, schema, table);
        if !self.is_catalog_allowed(&resolved.catalog) {
            return Err(AccessDenied::CatalogNotAllowed(resolved.catalog.clone()));
        }
        if !self.is_schema_allowed(&resolved.catalog, &resolved.schema) {
            return Err(AccessDenied::SchemaNotAllowed(format!(
                "{}.{}",
                resolved.catalog, resolved.schema
            )));
        }
        if self.is_table_allowed(&resolved.catalog, &resolved.schema, &resolved.table) {
            Ok(resolved)
        } else {
            Err(AccessDenied::TableNotAllowed(resolved.qualified_name()))
        }
    }
}

fn contains_ignore_case(entries: &[String], candidate: &str) -> bool {
    entries.iter().any(|e| e.eq_ignore_ascii_case(candidate))
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(catalogs: &[&str], schemas: &[&str], tables: &[&str]) -> AccessFilter {
        AccessFilter::new(
            catalogs.iter().map(|s| s.to_string()).collect(),
            schemas.iter().map(|s| s.to_string()).collect(),
            tables.iter().map(|s| s.to_string()).collect(),
            "memory",
            "default",
        )
    }

    // -----------------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------------

    #[test]
    fn test_empty_allowlists_are_unrestricted() {
        let f = filter(&[], &[], &[]);
        assert!(f.is_catalog_allowed("anything"));
        assert!(f.is_schema_allowed("any", "thing"));
        assert!(f.is_table_allowed("any", "thing", "at_all"));
    }

    #[test]
    fn test_catalog_match_is_case_insensitive() {
        let f = filter(&["Hive"], &[], &[]);
        assert!(f.is_catalog_allowed("hive"));
        assert!(f.is_catalog_allowed("HIVE"));
        assert!(!f.is_catalog_allowed("iceberg"));
    }

    #[test]
    fn test_schema_match_uses_qualified_name() {
        let f = filter(&[], &["c.s1"], &[]);
        assert!(f.is_schema_allowed("c", "s1"));
        assert!(f.is_schema_allowed("C", "S1"));
        assert!(!f.is_schema_allowed("c", "s2"));
        assert!(!f.is_schema_allowed("other", "s1"));
    }

    #[test]
    fn test_granularities_are_independent() {
        // A schema allowlist for c.s1 and a table allowlist for c.s1.t1:
        // tables in c.s1 are restricted to t1, but tables in the unlisted
        // schema c.s2 are untouched by the schema allowlist.
        let f = filter(&[], &["c.s1"], &["c.s1.t1"]);

        let in_s1 = f.filter_tables("c", "s1", vec!["t1".into(), "t2".into()]);
        assert_eq!(in_s1, vec!["t1"]);

        let in_s2 = f.filter_tables("c", "s2", vec!["t1".into(), "t9".into()]);
        assert_eq!(
            in_s2,
            vec!["t1".to_string(), "t9".to_string()],
            "table allowlist must not implicitly restrict other schemas"
        );
    }

    // -----------------------------------------------------------------------
    // Filtering
    // -----------------------------------------------------------------------

    #[test]
    fn test_filter_catalogs_preserves_order() {
        let f = filter(&["b", "a", "c"], &[], &[]);
        let out = f.filter_catalogs(vec!["a".into(), "x".into(), "b".into(), "c".into()]);
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filter_schemas_scopes_to_catalog() {
        let f = filter(&[], &["c.sales"], &[]);
        assert_eq!(
            f.filter_schemas("c", vec!["sales".into(), "hr".into()]),
            vec!["sales"]
        );
        assert!(f.filter_schemas("other", vec!["sales".into()]).is_empty());
    }

    // -----------------------------------------------------------------------
    // Table resolution
    // -----------------------------------------------------------------------

    #[test]
    fn test_resolution_shapes_converge_on_same_identity() {
        let f = filter(&[], &[], &[]);
        let expected = ResolvedTable {
            catalog: "c".to_string(),
            schema: "s".to_string(),
            table: "t".to_string(),
        };

        assert_eq!(f.resolve_table("c", "s", "t"), expected);
        assert_eq!(f.resolve_table("c", "", "s.t"), expected);
        assert_eq!(f.resolve_table("", "", "c.s.t"), expected);
    }

    #[test]
    fn test_resolution_falls_back_to_defaults() {
        let f = filter(&[], &[], &[]);
        let r = f.resolve_table("", "", "t");
        assert_eq!(r.catalog, "memory");
        assert_eq!(r.schema, "default");
        assert_eq!(r.table, "t");

        let r = f.resolve_table("", "", "s.t");
        assert_eq!(r.catalog, "memory");
        assert_eq!(r.schema, "s");
    }

    #[test]
    fn test_check_table_runs_after_resolution() {
        let f = AccessFilter::new(
            vec![],
            vec![],
            vec!["c.s.t".to_string()],
            "c",
            "s",
        );

        // All four reference shapes resolve to c.s.t and are allowed.
        assert!(f.check_table("c", "s", "t").is_ok());
        assert!(f.check_table("", "s", "t").is_ok());
        assert!(f.check_table("", "", "s.t").is_ok());
        assert!(f.check_table("", "", "c.s.t").is_ok());

        // A different resolved identity is denied by its qualified name.
        let err = f.check_table("", "", "c.s.other").unwrap_err();
        assert_eq!(
            err,
            AccessDenied::TableNotAllowed("c.s.other".to_string())
        );
    }

    #[test]
    fn test_check_table_ignores_allowlist_for_unlisted_schemas() {
        // The table allowlist names c.s.t, so only schema c.s is restricted;
        // a table in a schema the allowlist never mentions stays reachable.
        let f = filter(&[], &[], &["c.s.t"]);
        assert!(f.check_table("", "", "c.reporting.totals").is_ok());
        assert!(f.check_table("", "", "c.s.other").is_err());
    }

    #[test]
    fn test_check_table_denies_at_narrowest_failing_level() {
        let f = filter(&["c"], &["c.s"], &[]);

        assert!(f.check_table("", "", "c.s.t").is_ok());
        assert_eq!(
            f.check_table("x", "s", "t").unwrap_err(),
            AccessDenied::CatalogNotAllowed("x".to_string())
        );
        assert_eq!(
            f.check_table("c", "hr", "t").unwrap_err(),
            AccessDenied::SchemaNotAllowed("c.hr".to_string())
        );
    }

    #[test]
    fn test_qualified_name_joins_with_dots() {
        let r = ResolvedTable {
            catalog: "hive".to_string(),
            schema: "sales".to_string(),
            table: "orders".to_string(),
        };
        assert_eq!(r.qualified_name(), "hive.sales.orders");
    }
}
