//! # Console Report
//!
//! Human-readable rendering of a check result. Every failure starts with a
//! prefixed line naming its cause, so the reason for a non-zero exit is
//! visible without reading the rest of the output.

use std::io::{self, Write};

use mcpreg_schema::document::or_not_set;
use mcpreg_schema::validate::join_path;
use mcpreg_schema::{CheckError, Document, Violation};

/// Print the confirmation line and the descriptor summary.
pub fn report_success(out: &mut impl Write, document: &Document) -> io::Result<()> {
    let summary = document.summary();

    writeln!(out, "OK: {} is valid", document.path().display())?;
    writeln!(out)?;
    writeln!(out, "Server details:")?;
    writeln!(out, "  Name: {}", or_not_set(&summary.name))?;
    writeln!(out, "  Title: {}", or_not_set(&summary.title))?;
    writeln!(out, "  Version: {}", or_not_set(&summary.version))?;
    writeln!(out, "  Description: {}", or_not_set(&summary.description))?;

    if let Some(packages) = &summary.packages {
        writeln!(out)?;
        writeln!(out, "Packages:")?;
        for package in packages {
            writeln!(out, "  - {package}")?;
        }
    }

    if let Some(remotes) = &summary.remotes {
        writeln!(out)?;
        writeln!(out, "Remotes:")?;
        for remote in remotes {
            writeln!(out, "  - {remote}")?;
        }
    }

    Ok(())
}

/// Print the diagnostic for a failed run.
pub fn report_failure(out: &mut impl Write, error: &CheckError) -> io::Result<()> {
    match error {
        CheckError::DocumentInvalid(violation) => report_violation(out, violation),
        other => writeln!(out, "ERROR: {other}"),
    }
}

fn report_violation(out: &mut impl Write, violation: &Violation) -> io::Result<()> {
    writeln!(out, "FAIL: validation error")?;
    writeln!(out, "  Path: {}", violation.display_path())?;
    writeln!(out, "  Message: {}", violation.message)?;
    if let Some(context) = &violation.context {
        writeln!(out, "  Context:")?;
        for error in &context.errors {
            write!(out, "    - {}[{}]", context.keyword, error.branch)?;
            if !error.path.is_empty() {
                write!(out, " at {}", join_path(&error.path))?;
            }
            writeln!(out, ": {}", error.message)?;
        }
    }
    Ok(())
}
