//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod replay;
pub mod serve;
pub mod validate;

use std::path::PathBuf;

use crate::cli::args::{Cli, Commands};
use crate::config::ScenarioLoader;
use crate::error::{ConfigError, RdoMockError};
use crate::scenarios::ScenarioVariables;
use crate::server::MockServer;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), RdoMockError> {
    match cli.command {
        Commands::Serve(args) => serve::run(&args).await,
        Commands::Validate(args) => validate::run(&args, cli.quiet),
        Commands::Replay(args) => replay::run(&args).await,
    }
}

/// Loads `paths` into a fresh server and applies CLI variable overrides.
///
/// Loader warnings are logged, not returned.
pub(crate) fn load_server(
    paths: &[PathBuf],
    vars: &[(String, String)],
) -> Result<MockServer, RdoMockError> {
    for path in paths {
        tracing::info!(fixture = %path.display(), "loading fixture");
    }
    let result = ScenarioLoader::with_defaults()
        .load_all(paths)
        .inspect_err(|e| {
            if let ConfigError::ValidationError { path, errors } = e {
                for issue in errors {
                    tracing::error!(fixture = %path, "{issue}");
                }
            }
        })?;

    for warning in &result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    let mut server = MockServer::from_bundle(result.bundle);
    if !vars.is_empty() {
        let overrides: ScenarioVariables = vars.iter().cloned().collect();
        server.set_variables(&overrides);
    }
    Ok(server)
}
