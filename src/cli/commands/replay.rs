//! `replay` command handler.

use crate::cli::args::ReplayArgs;
use crate::error::RdoMockError;
use crate::server::{MockServer, Reply};
use crate::transport::dispatch_line;

use super::load_server;

/// Match each request in order against the fixtures and print one NDJSON
/// reply per request.
///
/// Misses are printed as error frames and do not fail the command.
///
/// # Errors
///
/// Returns a usage error when there is nothing to replay, or a config
/// error if a fixture fails to load.
pub async fn run(args: &ReplayArgs) -> Result<(), RdoMockError> {
    let mut requests = Vec::new();
    if let Some(ref path) = args.input {
        let content = tokio::fs::read_to_string(path).await?;
        requests.extend(content.lines().map(str::to_string));
    }
    requests.extend(args.commands.iter().cloned());

    if requests.iter().all(|r| r.trim().is_empty()) {
        return Err(RdoMockError::Usage(
            "nothing to replay: pass COMMANDS or --input".to_string(),
        ));
    }

    let mut server = load_server(&args.scenarios, &args.vars)?;
    for reply in replay_all(&mut server, &requests) {
        println!("{}", serde_json::to_string(&reply)?);
    }
    Ok(())
}

/// Answers every non-blank request in order.
pub fn replay_all(server: &mut MockServer, requests: &[String]) -> Vec<Reply> {
    requests
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(|r| dispatch_line(server, r))
        .collect()
}
