//! # mcpreg-cli — server.json Validator
//!
//! Command-line front end for `mcpreg-schema`. Checks one MCP registry
//! `server.json` descriptor against the schema its `$schema` field names
//! and prints a human-readable report.
//!
//! ## Exit Codes
//!
//! - `0` — the document satisfies its schema.
//! - `1` — anything else: missing file, bad JSON, missing `$schema`, fetch
//!   failure, malformed schema, or a validation failure.
//!
//! ## Crate Policy
//!
//! - Argument parsing and presentation live here; checking logic lives in
//!   `mcpreg-schema`.
//! - The report goes to stdout. Tracing goes to stderr.

pub mod report;
pub mod validate;
