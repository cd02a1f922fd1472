//! Fixture configuration.
//!
//! Loads and validates captured-session fixture files.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{FixtureFormat, LoadResult, LoadWarning, LoaderLimits, ScenarioLoader};
pub use schema::{FixtureFile, ScenarioBundle, TriggerDef};
pub use validation::{ValidationResult, Validator};
