//! Fixture validation.
//!
//! Runs on a deserialized [`FixtureFile`] and collects every issue instead of
//! stopping at the first, so one `validate` run reports everything wrong
//! with a capture.

use std::collections::HashSet;

use crate::config::loader::LoaderLimits;
use crate::config::schema::FixtureFile;
use crate::error::{Severity, ValidationIssue};
use crate::protocol::IDOF_VERB;
use crate::session::SessionPhase;

/// HTTP methods browsers actually send to the game's web front-end.
const USUAL_HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "HEAD"];

// ============================================================================
// Public API
// ============================================================================

/// Result of fixture validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fixture validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a fixture and returns every issue found.
    pub fn validate(&mut self, fixture: &FixtureFile, limits: &LoaderLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if fixture.name.trim().is_empty() {
            self.add_error("name", "Fixture name is required and cannot be empty");
        }

        self.validate_rdo(fixture);
        self.validate_ws(fixture);
        self.validate_http(fixture);
        self.validate_triggers(fixture);
        self.validate_limits(fixture, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Per-protocol checks
    // ========================================================================

    fn validate_rdo(&mut self, fixture: &FixtureFile) {
        self.check_ids("rdo", fixture.rdo.iter().map(|e| e.id.as_str()));

        for (i, exchange) in fixture.rdo.iter().enumerate() {
            let path = format!("rdo[{i}]");
            match (&exchange.match_keys, exchange.push_only) {
                (None, false) => self.add_error(
                    &format!("{path}.match"),
                    "Exchange has no match keys and is not push_only",
                ),
                (Some(_), true) => self.add_warning(
                    &format!("{path}.match"),
                    "Match keys on a push_only exchange are ignored",
                ),
                (Some(keys), false) if keys.is_unconstrained() => self.add_warning(
                    &format!("{path}.match"),
                    "Match keys constrain nothing; the exchange is never selected",
                ),
                // only the idof fallback selects by verb alone
                (Some(keys), false)
                    if keys.member.is_none() && keys.verb.as_deref() != Some(IDOF_VERB) =>
                {
                    self.add_warning(
                        &format!("{path}.match.member"),
                        "Exchange without a member is never selected",
                    );
                }
                _ => {}
            }
        }
    }

    fn validate_ws(&mut self, fixture: &FixtureFile) {
        self.check_ids("ws", fixture.ws.iter().map(|e| e.id.as_str()));

        for (i, exchange) in fixture.ws.iter().enumerate() {
            if exchange.request_type().is_none() {
                self.add_warning(
                    &format!("ws[{i}].request.type"),
                    "Request has no string 'type' field and cannot be looked up",
                );
            }
        }
    }

    fn validate_http(&mut self, fixture: &FixtureFile) {
        self.check_ids("http", fixture.http.iter().map(|e| e.id.as_str()));

        for (i, exchange) in fixture.http.iter().enumerate() {
            if exchange.url_pattern.trim().is_empty() {
                self.add_error(&format!("http[{i}].url"), "URL pattern cannot be empty");
            }
            let method = exchange.method.to_ascii_uppercase();
            if !USUAL_HTTP_METHODS.contains(&method.as_str()) {
                self.add_warning(
                    &format!("http[{i}].method"),
                    &format!("Unusual HTTP method '{}'", exchange.method),
                );
            }
        }
    }

    fn validate_triggers(&mut self, fixture: &FixtureFile) {
        for (i, trigger) in fixture.phase_triggers.iter().enumerate() {
            if trigger.member.trim().is_empty() {
                self.add_error(
                    &format!("phase_triggers[{i}].member"),
                    "Trigger member cannot be empty",
                );
            }
            match trigger.phase.parse::<SessionPhase>() {
                Ok(SessionPhase::Disconnected) => self.add_error(
                    &format!("phase_triggers[{i}].phase"),
                    "No trigger can enter the initial phase",
                ),
                Ok(_) => {}
                Err(_) => self.add_error(
                    &format!("phase_triggers[{i}].phase"),
                    &format!(
                        "Unknown phase '{}'. Expected one of: {}",
                        trigger.phase,
                        phase_names()
                    ),
                ),
            }
        }
    }

    fn validate_limits(&mut self, fixture: &FixtureFile, limits: &LoaderLimits) {
        let total = fixture.rdo.len() + fixture.ws.len() + fixture.http.len();
        if total > limits.max_exchanges {
            self.add_error(
                "",
                &format!(
                    "Too many exchanges: {total} (limit: {})",
                    limits.max_exchanges
                ),
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Reports empty and duplicate ids within one protocol section.
    fn check_ids<'a>(&mut self, section: &str, ids: impl Iterator<Item = &'a str>) {
        let mut seen = HashSet::new();
        for (i, id) in ids.enumerate() {
            let path = format!("{section}[{i}].id");
            if id.trim().is_empty() {
                self.add_error(&path, "Exchange id cannot be empty");
            } else if !seen.insert(id) {
                self.add_error(&path, &format!("Duplicate exchange id '{id}'"));
            }
        }
    }

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

fn phase_names() -> String {
    SessionPhase::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
