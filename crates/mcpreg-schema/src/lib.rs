//! # mcpreg-schema — server.json Schema Checking
//!
//! Checks an MCP registry `server.json` descriptor against the JSON Schema
//! its own `$schema` field points at.
//!
//! ## Pipeline
//!
//! 1. [`Document::load`] reads and parses the descriptor.
//! 2. [`Document::schema_reference`] extracts the `$schema` URL.
//! 3. [`SchemaFetcher::fetch`] retrieves the schema with one bounded GET.
//! 4. [`SchemaCheck::check`] validates the descriptor; [`JsonSchemaCheck`]
//!    is the `jsonschema`-backed implementation, resolving remote `$ref`s
//!    through [`RefRetriever`] under the same [`FetchConfig`].
//!
//! Each step either yields a value or a terminal [`CheckError`]. Nothing is
//! retried and nothing is cached between runs.
//!
//! ## Crate Policy
//!
//! - No console output here. Presentation belongs to `mcpreg-cli`.
//! - The schema is opaque: no assumptions about descriptor content beyond
//!   what the fetched schema encodes.

pub mod document;
pub mod error;
pub mod fetch;
pub mod validate;

pub use document::{Document, DocumentSummary, PackageEntry, RemoteEntry, DEFAULT_DOCUMENT_PATH};
pub use error::CheckError;
pub use fetch::{FetchConfig, RefRetriever, SchemaFetcher};
pub use validate::{
    BranchError, JsonSchemaCheck, PathSegment, SchemaCheck, Violation, ViolationContext,
};
