//! `validate` command handler.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ScenarioLoader;
use crate::error::{ConfigError, RdoMockError, Severity, ValidationIssue};

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// File as given on the command line.
    pub file: String,
    /// Whether the file passed.
    pub valid: bool,
    /// Issues that fail the file.
    pub errors: Vec<ValidationIssue>,
    /// Issues reported without failing the file.
    pub warnings: Vec<ValidationIssue>,
}

/// Validate fixture files without serving them.
///
/// Every file is checked and reported before the command fails.
///
/// # Errors
///
/// Returns an I/O error if any file does not exist, or a config error
/// if any file fails validation.
pub fn run(args: &ValidateArgs, quiet: bool) -> Result<(), RdoMockError> {
    for path in &args.files {
        if !path.exists() {
            return Err(RdoMockError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
    }

    let loader = ScenarioLoader::with_defaults();
    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| check_file(&loader, path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Human => print_human(&reports, quiet),
    }

    match reports.into_iter().find(|r| !r.valid) {
        Some(failed) => Err(ConfigError::ValidationError {
            path: failed.file,
            errors: failed.errors,
        }
        .into()),
        None => Ok(()),
    }
}

/// Loads one file and sorts its issues into errors and warnings.
pub fn check_file(loader: &ScenarioLoader, path: &Path, strict: bool) -> FileReport {
    tracing::info!(file = %path.display(), "validating fixture");

    let (mut errors, warnings) = match loader.load(path) {
        Ok(result) => {
            let warnings = result
                .warnings
                .into_iter()
                .map(|w| ValidationIssue {
                    path: w.location.unwrap_or_default(),
                    message: w.message,
                    severity: Severity::Warning,
                })
                .collect();
            (Vec::new(), warnings)
        }
        Err(ConfigError::ValidationError { errors, .. }) => (errors, Vec::new()),
        Err(e) => (
            vec![ValidationIssue {
                path: String::new(),
                message: e.to_string(),
                severity: Severity::Error,
            }],
            Vec::new(),
        ),
    };

    if strict {
        errors.extend(warnings.iter().cloned().map(|w| ValidationIssue {
            severity: Severity::Error,
            ..w
        }));
    }

    FileReport {
        file: path.display().to_string(),
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn print_human(reports: &[FileReport], quiet: bool) {
    for report in reports {
        if report.valid {
            if !quiet {
                println!("ok: {} ({} warnings)", report.file, report.warnings.len());
            }
        } else {
            println!("FAILED: {}", report.file);
            for issue in &report.errors {
                println!("  {issue}");
            }
        }
        if !quiet {
            for issue in &report.warnings {
                println!("  {issue}");
            }
        }
    }
}
