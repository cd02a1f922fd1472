//! `serve` command handler.

use crate::cli::args::ServeArgs;
use crate::error::RdoMockError;
use crate::transport::{StdioConfig, StdioTransport, serve};

use super::load_server;

/// Serve the loaded fixtures over stdio until stdin closes.
///
/// # Errors
///
/// Returns a config error if a fixture fails to load, or a transport
/// error if stdin or stdout fails.
pub async fn run(args: &ServeArgs) -> Result<(), RdoMockError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let mut server = load_server(&args.scenarios, &args.vars)?;

    let config = StdioConfig::from_env();
    tracing::info!(
        max_message_size = config.max_message_size,
        "serving on stdio"
    );
    let mut transport = StdioTransport::stdio(config);
    serve(&mut server, &mut transport).await?;
    Ok(())
}
