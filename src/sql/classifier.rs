//! Lexical read-only query classifier
//!
//! Decides whether a SQL statement is read-only before it reaches the
//! engine. This is a deliberate heuristic over the statement text, not a SQL
//! parser: string literals, quoted identifiers, and comments are stripped so
//! they cannot hide or fake keywords, any remaining semicolon is treated as
//! statement stacking, and write keywords are rejected as whole words
//! anywhere in the statement -- a write embedded in a subquery or CTE body
//! must fail even though the statement starts with `select`.
//!
//! Unrecognized statement shapes are not read-only by default; the
//! classifier fails closed. The heuristic's false-positive profile (benign
//! mentions of reserved words in contexts the stripping pass misses) is a
//! known property that client test suites depend on; keep it stable.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::QueryRejected;

/// Write/DDL/DCL/session keywords rejected anywhere in a statement.
const WRITE_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "create", "alter", "truncate", "merge", "copy", "grant",
    "revoke", "commit", "rollback", "call", "execute", "refresh", "set", "reset",
];

/// Prefixes a read-only statement may start with.
const READ_ONLY_PREFIXES: &[&str] = &["select", "show", "describe", "explain", "with"];

fn write_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"\b({})\b", WRITE_KEYWORDS.join("|"));
        Regex::new(&pattern).expect("write keyword pattern is valid")
    })
}

/// Classifies a SQL statement, returning the rejection reason when it is not
/// read-only.
///
/// # Errors
///
/// - [`QueryRejected::MultipleStatements`] when a semicolon survives
///   literal/comment stripping.
/// - [`QueryRejected::WriteKeywordDetected`] when a write keyword appears
///   anywhere as a whole word.
/// - [`QueryRejected::NotReadOnly`] when the statement does not start with
///   `select`, `show`, `describe`, `explain`, or `with`.
pub fn check_read_only(query: &str) -> Result<(), QueryRejected> {
    // Normalize: lowercase, trim, newlines and carriage returns to spaces.
    let normalized = query.trim().to_lowercase().replace(['\n', '\r'], " ");

    // Strip content that could hide or fake keywords. Placeholders are
    // uppercase so they can never match the lowercase keyword scan.
    let sanitized = strip_literals_and_comments(&normalized);

    // Statement-stacking defense.
    if sanitized.contains(';') {
        return Err(QueryRejected::MultipleStatements);
    }

    // Write operations anywhere in the statement, as whole words.
    if let Some(found) = write_keyword_regex().find(&sanitized) {
        return Err(QueryRejected::WriteKeywordDetected(
            found.as_str().to_string(),
        ));
    }

    // Keyword-prefix match, not a tokenizer: `selectid` still counts as
    // starting with `select`.
    let head = sanitized.trim_start();
    if READ_ONLY_PREFIXES.iter().any(|p| head.starts_with(p)) {
        Ok(())
    } else {
        Err(QueryRejected::NotReadOnly)
    }
}

/// Convenience predicate over [`check_read_only`].
pub fn is_read_only(query: &str) -> bool {
    check_read_only(query).is_ok()
}

/// Replaces string literals and quoted identifiers with placeholders and
/// strips comments, so their content cannot trigger or mask keyword
/// detection.
fn strip_literals_and_comments(query: &str) -> String {
    static SINGLE_QUOTED: OnceLock<Regex> = OnceLock::new();
    static DOUBLE_QUOTED: OnceLock<Regex> = OnceLock::new();
    static BACKTICK_QUOTED: OnceLock<Regex> = OnceLock::new();
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
    static BLOCK_COMMENT: OnceLock<Regex> = OnceLock::new();

    // Single-quoted literals with doubled-quote escaping: 'don''t'.
    let single = SINGLE_QUOTED.get_or_init(|| Regex::new(r"'(?:[^']|'')*'").expect("valid regex"));
    // Double-quoted identifiers with doubled-quote escaping.
    let double = DOUBLE_QUOTED.get_or_init(|| Regex::new(r#""(?:[^"]|"")*""#).expect("valid regex"));
    let backtick = BACKTICK_QUOTED.get_or_init(|| Regex::new("`[^`]*`").expect("valid regex"));
    let line = LINE_COMMENT.get_or_init(|| Regex::new(r"--[^\r\n]*").expect("valid regex"));
    let block = BLOCK_COMMENT
        .get_or_init(|| Regex::new(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("valid regex"));

    let query = single.replace_all(query, "'LITERAL'");
    let query = double.replace_all(&query, "\"IDENTIFIER\"");
    let query = backtick.replace_all(&query, "`IDENTIFIER`");
    let query = line.replace_all(&query, "");
    let query = block.replace_all(&query, "");
    query.trim().to_string()
}
