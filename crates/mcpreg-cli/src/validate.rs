//! # Validate Command
//!
//! Runs the check pipeline for one server.json document and prints the
//! result. The pipeline is strictly sequential: load, extract `$schema`,
//! fetch, check. The first failing step ends the run.
//!
//! The fetch is the only async operation. It is driven on a current-thread
//! runtime owned by [`Pipeline`], so schema compilation and validation run
//! outside any async context, where the check may make blocking requests
//! for remote `$ref`s.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use mcpreg_schema::fetch::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS};
use mcpreg_schema::{
    CheckError, Document, FetchConfig, JsonSchemaCheck, SchemaCheck, SchemaFetcher,
    DEFAULT_DOCUMENT_PATH,
};

use crate::report::{report_failure, report_success};

/// Exit code for a valid document.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code for every failure, operational or not.
pub const EXIT_FAILURE: u8 = 1;

/// Arguments for a validation run.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Path to the server.json document.
    #[arg(value_name = "PATH", default_value = DEFAULT_DOCUMENT_PATH)]
    pub path: PathBuf,

    /// Timeout for each schema request, in seconds.
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Maximum redirects followed per schema request (0 disables).
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,
}

impl ValidateArgs {
    /// HTTP policy derived from the flags.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
            ..FetchConfig::default()
        }
    }
}

/// Execute a validation run, writing the report to `out`.
///
/// Returns the process exit code: [`EXIT_SUCCESS`] for a valid document,
/// [`EXIT_FAILURE`] otherwise. `Err` is reserved for operational failures
/// such as an unwritable `out`.
pub fn run_validate(args: &ValidateArgs, out: &mut impl Write) -> Result<u8> {
    let config = args.fetch_config();
    Pipeline::new(config.clone(), JsonSchemaCheck::new(config))?.run(&args.path, out)
}

/// Fetcher, validator, and the runtime that drives the fetch.
pub struct Pipeline<C> {
    fetcher: SchemaFetcher,
    check: C,
    runtime: tokio::runtime::Runtime,
}

impl<C: SchemaCheck> Pipeline<C> {
    /// Build a pipeline. Must not be called from within an async context.
    pub fn new(config: FetchConfig, check: C) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let fetcher = {
            let _guard = runtime.enter();
            SchemaFetcher::new(config).context("failed to build HTTP client")?
        };

        Ok(Self {
            fetcher,
            check,
            runtime,
        })
    }

    /// Check the document at `path` and report to `out`.
    pub fn run(&self, path: &Path, out: &mut impl Write) -> Result<u8> {
        let span = tracing::info_span!("validate", path = %path.display());
        let _entered = span.enter();

        let document = match Document::load(path) {
            Ok(document) => document,
            Err(e) => return fail(out, &e),
        };

        let reference = match document.schema_reference() {
            Ok(reference) => reference,
            Err(e) => return fail(out, &e),
        };

        writeln!(out, "Fetching schema from: {reference}")?;
        let schema = match self.runtime.block_on(self.fetcher.fetch(reference)) {
            Ok(schema) => schema,
            Err(e) => return fail(out, &e),
        };

        match self.check.check(document.value(), &schema) {
            Ok(()) => {
                tracing::info!("document is valid");
                report_success(out, &document)?;
                Ok(EXIT_SUCCESS)
            }
            Err(e) => fail(out, &e),
        }
    }
}

fn fail(out: &mut impl Write, error: &CheckError) -> Result<u8> {
    tracing::info!(kind = error.kind(), "check failed: {error}");
    report_failure(out, error)?;
    Ok(EXIT_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::Value;
    use std::cell::Cell;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: ValidateArgs,
    }

    /// Counts invocations and always passes.
    #[derive(Default)]
    struct CountingCheck {
        calls: Cell<usize>,
    }

    impl SchemaCheck for CountingCheck {
        fn check(&self, _document: &Value, _schema: &Value) -> Result<(), CheckError> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    fn run_with(check: &CountingCheck, path: &Path) -> (u8, String) {
        let pipeline = Pipeline::new(FetchConfig::default(), check).unwrap();
        let mut out = Vec::new();
        let code = pipeline.run(path, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn args_default_to_server_json() {
        let cli = TestCli::parse_from(["mcpreg-validate"]);
        assert_eq!(cli.args.path, PathBuf::from("server.json"));
        assert_eq!(cli.args.fetch_config(), FetchConfig::default());
    }

    #[test]
    fn args_override_fetch_policy() {
        let cli = TestCli::parse_from([
            "mcpreg-validate",
            "custom.json",
            "--timeout-secs",
            "3",
            "--max-redirects",
            "0",
        ]);
        assert_eq!(cli.args.path, PathBuf::from("custom.json"));
        let config = cli.args.fetch_config();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.max_redirects, 0);
    }

    #[test]
    fn args_reject_zero_timeout() {
        assert!(TestCli::try_parse_from(["mcpreg-validate", "--timeout-secs", "0"]).is_err());
    }

    #[test]
    fn missing_file_stops_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        let check = CountingCheck::default();

        let (code, output) = run_with(&check, &path);

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(output, format!("ERROR: {} not found\n", path.display()));
        assert_eq!(check.calls.get(), 0);
    }

    #[test]
    fn missing_schema_reference_stops_before_fetch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "io.github.acme/weather"}}"#).unwrap();
        let check = CountingCheck::default();

        let (code, output) = run_with(&check, file.path());

        assert_eq!(code, EXIT_FAILURE);
        assert!(output.starts_with("ERROR: no $schema field found in"), "{output}");
        assert!(!output.contains("Fetching schema"), "{output}");
        assert_eq!(check.calls.get(), 0);
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let check = CountingCheck::default();

        let (code, output) = run_with(&check, file.path());

        assert_eq!(code, EXIT_FAILURE);
        assert!(output.starts_with("ERROR: invalid JSON in"), "{output}");
    }
}
