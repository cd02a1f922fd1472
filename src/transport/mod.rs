//! Line-oriented transport.
//!
//! The mock server speaks NDJSON: one request per line in, one reply frame
//! per line out. A line starting with `{` is a request frame:
//!
//! ```json
//! {"rdo": "C 12 call RDOSetPrice \"0\" \"100\"", "vars": {"username": "bob"}}
//! {"ws": "hello"}
//! {"http": {"method": "GET", "url": "/news.asp"}}
//! {"control": "reset"}
//! ```
//!
//! Any other line is taken as a raw RDO command.

pub mod stdio;

pub use stdio::{Incoming, ServeSummary, StdioConfig, StdioTransport, serve};

use serde::Deserialize;

use crate::error::TransportError;
use crate::scenarios::ScenarioVariables;
use crate::server::{ErrorCode, MockServer, Reply};

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Default maximum request line size in bytes (1 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default buffer size for the stdio transport (64 KB).
pub const DEFAULT_STDIO_BUFFER_SIZE: usize = 64 * 1024;

/// A decoded request line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Request {
    /// Raw RDO command with optional per-call variables.
    Rdo {
        /// Raw command text.
        rdo: String,
        /// Per-call variable overrides.
        #[serde(default)]
        vars: Option<ScenarioVariables>,
    },
    /// WebSocket request by message type.
    Ws {
        /// Request `type`.
        ws: String,
        /// Per-call variable overrides.
        #[serde(default)]
        vars: Option<ScenarioVariables>,
    },
    /// HTTP request.
    Http {
        /// Method and URL.
        http: HttpRequest,
    },
    /// Session control.
    Control {
        /// Control command.
        control: ControlCommand,
    },
}

/// HTTP request line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpRequest {
    /// Request method, `GET` when omitted.
    #[serde(default = "default_method")]
    pub method: String,
    /// Request URL or path.
    pub url: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Session control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Clear consumption and start a fresh session.
    Reset,
}

impl Request {
    /// Decodes one trimmed, non-empty line.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for a `{`-prefixed line that is not a known
    /// request frame.
    pub fn from_line(line: &str) -> std::result::Result<Self, serde_json::Error> {
        if line.starts_with('{') {
            serde_json::from_str(line)
        } else {
            Ok(Self::Rdo {
                rdo: line.to_string(),
                vars: None,
            })
        }
    }
}

/// Decodes `line` and routes it to the matching handler.
pub fn dispatch_line(server: &mut MockServer, line: &str) -> Reply {
    match Request::from_line(line) {
        Ok(request) => dispatch(server, request),
        Err(e) => {
            tracing::warn!(
                error = %e,
                line = %sanitize_for_log(line, 200),
                "invalid request frame"
            );
            Reply::error(
                ErrorCode::InvalidRequest,
                "transport",
                format!("invalid request frame: {e}"),
            )
        }
    }
}

/// Routes a decoded request to the matching handler.
pub fn dispatch(server: &mut MockServer, request: Request) -> Reply {
    match request {
        Request::Rdo { rdo, vars } => server.handle_rdo(&rdo, vars.as_ref()),
        Request::Ws { ws, vars } => server.handle_ws(&ws, vars.as_ref()),
        Request::Http { http } => server.handle_http(&http.method, &http.url),
        Request::Control {
            control: ControlCommand::Reset,
        } => server.reset(),
    }
}

/// Truncates and strips control characters from untrusted input before logging.
pub(crate) fn sanitize_for_log(input: &str, max_len: usize) -> String {
    input
        .chars()
        .take(max_len)
        .map(|c| {
            if c.is_control() && c != '\t' {
                '\u{FFFD}'
            } else {
                c
            }
        })
        .collect()
}
