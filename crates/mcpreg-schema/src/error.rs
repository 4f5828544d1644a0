//! # Error Types
//!
//! Every stage of a check run ends in either a value or one of these
//! errors. None of them is recoverable mid-run: the caller reports the
//! error and stops.

use thiserror::Error;

use crate::validate::Violation;

/// Terminal outcomes of a server.json check, one variant per failure stage.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The document path does not exist.
    #[error("{path} not found")]
    FileNotFound {
        /// Path as given by the caller.
        path: String,
    },

    /// The document exists but could not be read.
    #[error("cannot read {path}: {source}")]
    DocumentRead {
        /// Path as given by the caller.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    DocumentParse {
        /// Path as given by the caller.
        path: String,
        /// Parser error, including line and column.
        source: serde_json::Error,
    },

    /// The document has no usable `$schema` reference.
    #[error("no $schema field found in {path}")]
    MissingSchemaReference {
        /// Path as given by the caller.
        path: String,
    },

    /// The schema, or a schema it references with `$ref`, could not be
    /// retrieved: bad URL, transport failure, timeout, or a non-success
    /// HTTP status.
    #[error("failed to fetch schema from {url}: {reason}")]
    SchemaFetch {
        /// The `$schema` URL, or the `$ref` target that failed.
        url: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The schema response body is not valid JSON.
    #[error("failed to parse schema JSON from {url}: {source}")]
    SchemaParse {
        /// The `$schema` URL.
        url: String,
        /// Parser error.
        source: serde_json::Error,
    },

    /// The fetched document is not itself a valid JSON Schema.
    #[error("schema error: {reason}")]
    SchemaStructure {
        /// Compilation failure reported by the validator.
        reason: String,
    },

    /// The document violates the schema.
    #[error("validation error at {}: {}", .0.display_path(), .0.message)]
    DocumentInvalid(Violation),
}

impl CheckError {
    /// Short, stable name of the failure stage, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "file_not_found",
            Self::DocumentRead { .. } => "document_read",
            Self::DocumentParse { .. } => "document_parse",
            Self::MissingSchemaReference { .. } => "missing_schema_reference",
            Self::SchemaFetch { .. } => "schema_fetch",
            Self::SchemaParse { .. } => "schema_parse",
            Self::SchemaStructure { .. } => "schema_structure",
            Self::DocumentInvalid(_) => "document_invalid",
        }
    }
}
