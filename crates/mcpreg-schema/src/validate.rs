//! # Schema Validation
//!
//! Checks a server.json document against a JSON Schema. The check is a
//! trait, [`SchemaCheck`], so the pipeline does not depend on a particular
//! validator; [`JsonSchemaCheck`] is the implementation backed by the
//! `jsonschema` crate.
//!
//! A failed check yields a single [`Violation`]: the first error the
//! validator reports, with its location split into path segments and the
//! validator's message verbatim. When that error is an `anyOf` or `oneOf`
//! with no matching branch, each branch is evaluated again on its own and
//! the branch errors become the violation's context. A schema that does not
//! compile is reported separately as [`CheckError::SchemaStructure`].

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ReferencingError, ValidationError};
use serde_json::{json, Value};
use url::Url;

use crate::error::CheckError;
use crate::fetch::{FetchConfig, RefRetriever};

/// Separator between path segments when a violation path is printed.
pub const PATH_SEPARATOR: &str = " -> ";

/// Rendering of an empty path, i.e. a violation at the document root.
const ROOT_PATH: &str = "(root)";

/// Registration URI for a schema without an absolute `$id`.
const ANONYMOUS_SCHEMA_BASE: &str = "json-schema:///fetched-schema.json";

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// One step in the location of a violating value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// An object member name.
    Key(String),
    /// An array position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Why each alternative of a failed `anyOf`/`oneOf` rejected the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationContext {
    /// `"anyOf"` or `"oneOf"`.
    pub keyword: &'static str,
    /// Errors from every branch, in branch order.
    pub errors: Vec<BranchError>,
}

/// An error raised by one branch of a combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchError {
    /// Zero-based position of the branch in the combinator's array.
    pub branch: usize,
    /// Location relative to the value the combinator was applied to.
    pub path: Vec<PathSegment>,
    /// The validator's message, unchanged.
    pub message: String,
}

/// Structured description of a document that does not satisfy its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location of the violating value; empty for the document root.
    pub path: Vec<PathSegment>,
    /// The validator's message, unchanged.
    pub message: String,
    /// Per-branch errors when the failing keyword is `anyOf` or `oneOf`.
    pub context: Option<ViolationContext>,
}

impl Violation {
    /// Build a violation from a `jsonschema` error raised against `document`.
    ///
    /// The context is left empty; [`JsonSchemaCheck`] fills it in for
    /// combinator failures.
    pub fn from_error(error: &ValidationError<'_>, document: &Value) -> Self {
        Self {
            path: segments_from_pointer(error.instance_path.as_str(), document),
            message: error.to_string(),
            context: None,
        }
    }

    /// Path segments joined with [`PATH_SEPARATOR`].
    pub fn display_path(&self) -> String {
        join_path(&self.path)
    }
}

/// Segments joined with [`PATH_SEPARATOR`], or `(root)` when empty.
pub fn join_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return ROOT_PATH.to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a JSON Pointer into segments, walking `document` alongside so that
/// numeric tokens become [`PathSegment::Index`] only where they address an
/// array element.
fn segments_from_pointer(pointer: &str, document: &Value) -> Vec<PathSegment> {
    let mut current = Some(document);
    pointer
        .split('/')
        .skip(1)
        .map(|raw| {
            let token = unescape(raw);
            let segment = match (current, token.parse::<usize>()) {
                (Some(Value::Array(_)), Ok(index)) => PathSegment::Index(index),
                _ => PathSegment::Key(token),
            };
            current = current.and_then(|value| match &segment {
                PathSegment::Index(index) => value.get(*index),
                PathSegment::Key(key) => value.get(key.as_str()),
            });
            segment
        })
        .collect()
}

/// Map a keyword evaluation path onto a JSON Pointer inside `schema`,
/// following local `$ref`s. `None` if the path leaves the schema document or
/// does not end at an array.
fn locate_keyword(schema: &Value, evaluation_path: &str) -> Option<String> {
    let mut node = schema;
    let mut pointer = String::new();

    for raw in evaluation_path.split('/').skip(1) {
        if raw == "$ref" {
            if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
                let target = reference.strip_prefix('#')?;
                node = schema.pointer(target)?;
                pointer = target.to_string();
                continue;
            }
        }
        let token = unescape(raw);
        node = match node {
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            other => other.get(token.as_str())?,
        };
        pointer.push('/');
        pointer.push_str(raw);
    }

    node.is_array().then_some(pointer)
}

/// Absolute `$id` of `schema` without its fragment, or a fixed local URI.
fn schema_base(schema: &Value) -> Option<Url> {
    let mut base = schema
        .get("$id")
        .and_then(Value::as_str)
        .and_then(|id| Url::parse(id).ok())
        .or_else(|| Url::parse(ANONYMOUS_SCHEMA_BASE).ok())?;
    base.set_fragment(None);
    Some(base)
}

// ---------------------------------------------------------------------------
// SchemaCheck
// ---------------------------------------------------------------------------

/// A JSON Schema validator usable by the check pipeline.
///
/// Implementations return [`CheckError::SchemaStructure`] when the schema
/// itself is unusable, [`CheckError::SchemaFetch`] when a schema it refers
/// to cannot be retrieved, and [`CheckError::DocumentInvalid`] when the
/// document fails validation.
pub trait SchemaCheck {
    /// Validate `document` against `schema`.
    fn check(&self, document: &Value, schema: &Value) -> Result<(), CheckError>;
}

impl<C: SchemaCheck + ?Sized> SchemaCheck for &C {
    fn check(&self, document: &Value, schema: &Value) -> Result<(), CheckError> {
        (**self).check(document, schema)
    }
}

/// [`SchemaCheck`] backed by the `jsonschema` crate.
///
/// The draft is taken from the schema's own `$schema` keyword unless one is
/// forced with [`JsonSchemaCheck::with_draft`]. Remote `$ref`s inside the
/// schema are fetched by a [`RefRetriever`] under the check's
/// [`FetchConfig`].
///
/// Must not be used from within an async context.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaCheck {
    draft: Option<jsonschema::Draft>,
    retriever: RefRetriever,
}

impl JsonSchemaCheck {
    /// A check whose `$ref` retrieval follows `config`.
    pub fn new(config: FetchConfig) -> Self {
        Self {
            draft: None,
            retriever: RefRetriever::new(config),
        }
    }

    /// Force a specific draft instead of auto-detecting it.
    pub fn with_draft(mut self, draft: jsonschema::Draft) -> Self {
        self.draft = Some(draft);
        self
    }

    fn options(&self) -> jsonschema::ValidationOptions {
        let mut options = jsonschema::options();
        if let Some(draft) = self.draft {
            options.with_draft(draft);
        }
        options.with_retriever(self.retriever.clone());
        options
    }

    /// Evaluate each branch of the combinator that raised `error` against
    /// the rejected value and collect what every branch reports.
    fn branch_context(
        &self,
        keyword: &'static str,
        error: &ValidationError<'_>,
        schema: &Value,
    ) -> Option<ViolationContext> {
        let pointer = locate_keyword(schema, error.schema_path.as_str())?;
        let branches = schema.pointer(&pointer)?.as_array()?.len();
        let base = schema_base(schema)?;
        let root = match self.draft {
            Some(draft) => draft.create_resource(schema.clone()),
            None => jsonschema::Resource::from_contents(schema.clone()).ok()?,
        };
        let instance: &Value = &error.instance;

        let mut errors = Vec::new();
        for branch in 0..branches {
            let mut target = base.clone();
            target.set_fragment(Some(format!("{pointer}/{branch}").as_str()));
            let mut wrapper = json!({ "$ref": target.as_str() });
            if let Some(meta) = schema.get("$schema") {
                wrapper["$schema"] = meta.clone();
            }

            let mut options = self.options();
            options.with_resource(base.as_str(), root.clone());
            let validator = match options.build(&wrapper) {
                Ok(validator) => validator,
                Err(e) => {
                    tracing::debug!(branch, error = %e, "cannot evaluate {keyword} branch");
                    return None;
                }
            };

            errors.extend(validator.iter_errors(instance).map(|e| BranchError {
                branch,
                path: segments_from_pointer(e.instance_path.as_str(), instance),
                message: e.to_string(),
            }));
        }

        (!errors.is_empty()).then_some(ViolationContext { keyword, errors })
    }
}

/// Combinator keyword for errors whose branches are worth reporting.
fn branch_keyword(kind: &ValidationErrorKind) -> Option<&'static str> {
    match kind {
        ValidationErrorKind::AnyOf => Some("anyOf"),
        ValidationErrorKind::OneOfNotValid => Some("oneOf"),
        _ => None,
    }
}

/// A compilation failure: an unreachable remote `$ref` is a fetch error,
/// anything else means the schema is malformed.
fn compile_error(error: &ValidationError<'_>) -> CheckError {
    if let ValidationErrorKind::Referencing(ReferencingError::Unretrievable { uri, source }) =
        &error.kind
    {
        return CheckError::SchemaFetch {
            url: uri.clone(),
            reason: source.to_string(),
        };
    }
    CheckError::SchemaStructure {
        reason: error.to_string(),
    }
}

impl SchemaCheck for JsonSchemaCheck {
    fn check(&self, document: &Value, schema: &Value) -> Result<(), CheckError> {
        let validator = self.options().build(schema).map_err(|e| compile_error(&e))?;

        let mut errors = validator.iter_errors(document);
        let Some(first) = errors.next() else {
            return Ok(());
        };
        let total = 1 + errors.count();

        let mut violation = Violation::from_error(&first, document);
        if let Some(keyword) = branch_keyword(&first.kind) {
            violation.context = self.branch_context(keyword, &first, schema);
        }

        tracing::debug!(
            violations = total,
            path = %violation.display_path(),
            "document failed schema validation"
        );

        Err(CheckError::DocumentInvalid(violation))
    }
}
