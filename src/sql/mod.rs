//! SQL-side authorization primitives
//!
//! # Module Layout
//!
//! - [`classifier`] -- lexical read-only query classifier
//! - [`filter`]     -- hierarchical catalog/schema/table allowlist filter
//!
//! Both are pure and stateless: safe to call concurrently from any number of
//! request handlers with no locking.

pub mod classifier;
pub mod filter;

pub use classifier::{check_read_only, is_read_only};
pub use filter::{AccessFilter, ResolvedTable};
