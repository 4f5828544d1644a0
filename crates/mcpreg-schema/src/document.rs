//! # server.json Documents
//!
//! Loading of the descriptor under check, extraction of its `$schema`
//! reference, and the read-only [`DocumentSummary`] printed after a
//! successful check.
//!
//! Descriptive fields are looked up defensively: any of them may be
//! missing or have an unexpected type, and the summary keeps them as
//! `Option`s rather than assuming presence.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::CheckError;

/// Key holding the schema reference URL.
pub const SCHEMA_REFERENCE_KEY: &str = "$schema";

/// Path checked when the caller does not name one.
pub const DEFAULT_DOCUMENT_PATH: &str = "server.json";

/// A parsed server.json document together with the path it came from.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    value: Value,
}

impl Document {
    /// Read and parse the document at `path`.
    ///
    /// # Errors
    ///
    /// [`CheckError::FileNotFound`] when nothing exists at `path`,
    /// [`CheckError::DocumentRead`] for other I/O failures, and
    /// [`CheckError::DocumentParse`] when the content is not JSON, including
    /// content that is not UTF-8.
    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let display = path.display().to_string();

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CheckError::FileNotFound {
                path: display.clone(),
            },
            _ => CheckError::DocumentRead {
                path: display.clone(),
                source: e,
            },
        })?;

        let value = serde_json::from_slice(&bytes).map_err(|e| CheckError::DocumentParse {
            path: display,
            source: e,
        })?;

        tracing::debug!(path = %path.display(), "loaded document");
        Ok(Self::from_value(path, value))
    }

    /// Wrap an already-parsed value.
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// Path the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed JSON.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The `$schema` URL, trimmed.
    ///
    /// # Errors
    ///
    /// [`CheckError::MissingSchemaReference`] when the root is not an object
    /// or the key is absent, blank, or not a string.
    pub fn schema_reference(&self) -> Result<&str, CheckError> {
        self.value
            .get(SCHEMA_REFERENCE_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CheckError::MissingSchemaReference {
                path: self.path.display().to_string(),
            })
    }

    /// Descriptive projection of the document for display.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary::from_value(&self.value)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Rendering used for any descriptive field that is absent.
pub const NOT_SET: &str = "(not set)";

/// Descriptive fields of a server.json document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSummary {
    pub name: Option<String>,
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// `None` when the document has no `packages` array.
    pub packages: Option<Vec<PackageEntry>>,
    /// `None` when the document has no `remotes` array.
    pub remotes: Option<Vec<RemoteEntry>>,
}

/// One entry of `packages`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageEntry {
    pub registry_type: Option<String>,
    pub identifier: Option<String>,
    pub version: Option<String>,
}

/// One entry of `remotes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteEntry {
    pub transport: Option<String>,
    pub url: Option<String>,
}

impl DocumentSummary {
    /// Project `value` onto its descriptive fields.
    pub fn from_value(value: &Value) -> Self {
        Self {
            name: field(value, "name"),
            title: field(value, "title"),
            version: field(value, "version"),
            description: field(value, "description"),
            packages: entries(value, "packages", |pkg| PackageEntry {
                registry_type: field(pkg, "registryType"),
                identifier: field(pkg, "identifier"),
                version: field(pkg, "version"),
            }),
            remotes: entries(value, "remotes", |remote| RemoteEntry {
                transport: field(remote, "type"),
                url: field(remote, "url"),
            }),
        }
    }
}

impl fmt::Display for PackageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} v{}",
            or_not_set(&self.registry_type),
            or_not_set(&self.identifier),
            or_not_set(&self.version)
        )
    }
}

impl fmt::Display for RemoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", or_not_set(&self.transport), or_not_set(&self.url))
    }
}

/// The value, or [`NOT_SET`].
pub fn or_not_set(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_SET)
}

/// Strings are taken as-is; other non-null scalars and containers fall back
/// to their JSON text.
fn field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn entries<T>(value: &Value, key: &str, project: impl Fn(&Value) -> T) -> Option<Vec<T>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(project).collect())
}
