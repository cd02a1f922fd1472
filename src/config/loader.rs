//! Fixture loader.
//!
//! Loading pipeline for one file:
//! 1. Size check against [`LoaderLimits`]
//! 2. Read, strip a UTF-8 BOM
//! 3. Parse as YAML or JSON, chosen by extension
//! 4. Validation
//! 5. Split into a [`ScenarioBundle`]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::schema::{FixtureFile, ScenarioBundle};
use crate::config::validation::Validator;
use crate::error::{ConfigError, Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Limits on fixture size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct LoaderLimits {
    /// Maximum fixture file size in bytes.
    pub max_fixture_size: usize,

    /// Maximum number of exchanges in one fixture, across protocols.
    pub max_exchanges: usize,
}

impl Default for LoaderLimits {
    fn default() -> Self {
        Self {
            max_fixture_size: env_or("RDOMOCK_MAX_FIXTURE_SIZE", 10 * 1024 * 1024),
            max_exchanges: env_or("RDOMOCK_MAX_EXCHANGES", 10_000),
        }
    }
}

/// Result of loading one or more fixture files.
#[derive(Debug)]
pub struct LoadResult {
    /// Loaded scenarios, variables and triggers.
    pub bundle: ScenarioBundle,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during fixture loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Fixture format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl FixtureFormat {
    /// Detects the format of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Fixture loader.
#[derive(Debug, Default)]
pub struct ScenarioLoader {
    limits: LoaderLimits,
}

impl ScenarioLoader {
    /// Creates a loader with the given limits.
    #[must_use]
    pub const fn new(limits: LoaderLimits) -> Self {
        Self { limits }
    }

    /// Creates a loader with default limits.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderLimits::default())
    }

    /// Loads and validates one fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing, too large, or has an unknown extension
    /// - Parsing fails
    /// - Validation reports any error
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let format = FixtureFormat::from_path(path)?;

        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_fixture_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_fixture_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, format, path)
    }

    /// Loads several fixture files into one bundle, in order.
    ///
    /// Exchange ids must be unique per protocol across all files, since
    /// consumption is tracked by id.
    ///
    /// # Errors
    ///
    /// Fails on the first file that fails to load, or that reuses an
    /// exchange id from an earlier file.
    pub fn load_all<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<LoadResult, ConfigError> {
        let mut combined = LoadResult {
            bundle: ScenarioBundle::default(),
            warnings: Vec::new(),
        };
        let mut ids = ClaimedIds::default();
        for path in paths {
            let path = path.as_ref();
            let LoadResult { bundle, warnings } = self.load(path)?;

            let clashes = ids.claim(&bundle, path);
            if !clashes.is_empty() {
                return Err(ConfigError::ValidationError {
                    path: path.display().to_string(),
                    errors: clashes,
                });
            }

            combined.bundle.merge(bundle);
            combined.warnings.extend(warnings);
        }
        Ok(combined)
    }

    /// Parses and validates fixture text. `origin` is used in errors only.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error.
    pub fn load_str(
        &self,
        raw: &str,
        format: FixtureFormat,
        origin: &Path,
    ) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        if raw.trim().is_empty() {
            return Err(ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: None,
                message: "Fixture file is empty".to_string(),
            });
        }

        let fixture = parse_fixture(raw, format, origin)?;

        let result = Validator::new().validate(&fixture, &self.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }

        let warnings = result
            .warnings
            .into_iter()
            .map(|issue| LoadWarning {
                message: issue.message,
                location: Some(format!("{}: {}", origin.display(), issue.path)),
            })
            .collect();

        tracing::debug!(
            fixture = %fixture.name,
            rdo = fixture.rdo.len(),
            ws = fixture.ws.len(),
            http = fixture.http.len(),
            "fixture loaded"
        );

        Ok(LoadResult {
            bundle: ScenarioBundle::from_fixture(fixture),
            warnings,
        })
    }
}

/// Exchange ids taken by earlier files, per protocol, mapped to the file
/// that defined them.
#[derive(Debug, Default)]
struct ClaimedIds {
    rdo: HashMap<String, String>,
    ws: HashMap<String, String>,
    http: HashMap<String, String>,
}

impl ClaimedIds {
    /// Claims every id in `bundle` for `origin`, returning one issue per id
    /// an earlier file already owns.
    fn claim(&mut self, bundle: &ScenarioBundle, origin: &Path) -> Vec<ValidationIssue> {
        let origin = origin.display().to_string();
        let mut clashes = Vec::new();

        let rdo = bundle.rdo.iter().flat_map(|s| &s.exchanges).map(|e| e.id.as_str());
        claim_section(&mut self.rdo, "rdo", rdo, &origin, &mut clashes);
        let ws = bundle.ws.iter().flat_map(|s| &s.exchanges).map(|e| e.id.as_str());
        claim_section(&mut self.ws, "ws", ws, &origin, &mut clashes);
        let http = bundle.http.iter().flat_map(|s| &s.exchanges).map(|e| e.id.as_str());
        claim_section(&mut self.http, "http", http, &origin, &mut clashes);

        clashes
    }
}

fn claim_section<'a>(
    owners: &mut HashMap<String, String>,
    section: &str,
    ids: impl Iterator<Item = &'a str>,
    origin: &str,
    clashes: &mut Vec<ValidationIssue>,
) {
    for (i, id) in ids.enumerate() {
        match owners.get(id) {
            Some(owner) => clashes.push(ValidationIssue {
                path: format!("{section}[{i}].id"),
                message: format!("Exchange id '{id}' is already defined in {owner}"),
                severity: Severity::Error,
            }),
            None => {
                owners.insert(id.to_string(), origin.to_string());
            }
        }
    }
}

fn parse_fixture(
    raw: &str,
    format: FixtureFormat,
    origin: &Path,
) -> Result<FixtureFile, ConfigError> {
    let path: PathBuf = origin.to_path_buf();
    match format {
        FixtureFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path,
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        }),
        FixtureFormat::Json => serde_json::from_str(raw).map_err(|e| ConfigError::ParseError {
            path,
            line: Some(e.line()),
            message: e.to_string(),
        }),
    }
}

/// Reads a numeric limit from the environment, falling back to `default`.
pub(crate) fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
