//! NDJSON transport over stdin/stdout.
//!
//! Reads are bounded: a line longer than the configured limit is drained
//! without being buffered and answered with a `message_too_large` frame.

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use super::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_STDIO_BUFFER_SIZE, Result, dispatch_line};
use crate::error::TransportError;
use crate::observability::metrics;
use crate::server::{ErrorCode, MockServer, Reply};

/// Configuration for the stdio transport.
///
/// Values are read from environment variables with fallback to defaults.
#[derive(Debug, Clone, Copy)]
pub struct StdioConfig {
    /// Maximum request line size in bytes.
    pub max_message_size: usize,
    /// Read/write buffer size in bytes.
    pub buffer_size: usize,
}

impl StdioConfig {
    /// Loads configuration from environment variables with defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `RDOMOCK_MAX_MESSAGE_SIZE` | 1 MB |
    /// | `RDOMOCK_STDIO_BUFFER_SIZE` | 64 KB |
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_message_size: env_or("RDOMOCK_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE),
            buffer_size: env_or("RDOMOCK_STDIO_BUFFER_SIZE", DEFAULT_STDIO_BUFFER_SIZE),
        }
    }
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            buffer_size: DEFAULT_STDIO_BUFFER_SIZE,
        }
    }
}

/// One unit read from the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A trimmed, non-empty line.
    Line(String),
    /// A line over the size limit, with its full length.
    Oversized {
        /// Line length in bytes, excluding the newline
        size: usize,
    },
    /// A line that is not valid UTF-8.
    InvalidUtf8,
}

/// NDJSON transport over any buffered reader and writer.
///
/// The server loop owns the transport exclusively, so reads and writes take
/// `&mut self` and need no locking.
pub struct StdioTransport<R = BufReader<tokio::io::Stdin>, W = BufWriter<tokio::io::Stdout>> {
    reader: R,
    writer: W,
    config: StdioConfig,
}

impl StdioTransport {
    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn stdio(config: StdioConfig) -> Self {
        Self::new(
            BufReader::with_capacity(config.buffer_size, tokio::io::stdin()),
            BufWriter::with_capacity(config.buffer_size, tokio::io::stdout()),
            config,
        )
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over explicit streams.
    ///
    /// Primarily used in tests and by library consumers embedding the
    /// transport directly.
    pub const fn new(reader: R, writer: W, config: StdioConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &StdioConfig {
        &self.config
    }

    /// Reads the next non-empty line, or `None` at EOF.
    ///
    /// A final line without a trailing newline is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if reading fails.
    pub async fn receive(&mut self) -> Result<Option<Incoming>> {
        let limit = self.config.max_message_size;
        let mut buf: Vec<u8> = Vec::with_capacity(limit.min(64 * 1024));

        loop {
            buf.clear();
            let mut size = 0_usize;

            loop {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    if size == 0 {
                        return Ok(None);
                    }
                    break;
                }

                let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => (&available[..pos], pos + 1, true),
                    None => (available, available.len(), false),
                };

                let remaining = (limit + 1).saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
                size += chunk.len();

                self.reader.consume(consumed);
                if done {
                    break;
                }
            }

            if size > limit {
                tracing::warn!(size, limit, "request line exceeds size limit");
                return Ok(Some(Incoming::Oversized { size }));
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                tracing::warn!("invalid UTF-8 in request line");
                return Ok(Some(Incoming::InvalidUtf8));
            };

            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(Incoming::Line(trimmed.to_string())));
            }
        }
    }

    /// Writes one reply frame followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn send(&mut self, reply: &Reply) -> Result<()> {
        let serialized = serde_json::to_string(reply)?;
        self.writer.write_all(serialized.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R, W> std::fmt::Debug for StdioTransport<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Totals for one served session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Request lines answered.
    pub requests: u64,
    /// Replies that were error frames.
    pub errors: u64,
}

/// Answers requests from `transport` until EOF.
///
/// # Errors
///
/// Returns a [`TransportError`] if reading or writing fails. Bad requests
/// are answered with error frames and never end the session.
pub async fn serve<R, W>(
    server: &mut MockServer,
    transport: &mut StdioTransport<R, W>,
) -> Result<ServeSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = ServeSummary::default();

    while let Some(incoming) = transport.receive().await? {
        let reply = match incoming {
            Incoming::Line(line) => dispatch_line(server, &line),
            Incoming::Oversized { size } => {
                metrics::record_error("transport");
                let err = TransportError::MessageTooLarge {
                    size,
                    limit: transport.config().max_message_size,
                };
                Reply::error(ErrorCode::MessageTooLarge, "transport", err.to_string())
            }
            Incoming::InvalidUtf8 => {
                metrics::record_error("transport");
                Reply::error(
                    ErrorCode::InvalidRequest,
                    "transport",
                    "request line is not valid UTF-8",
                )
            }
        };

        summary.requests += 1;
        if reply.is_error() {
            summary.errors += 1;
        }
        transport.send(&reply).await?;
    }

    tracing::info!(
        requests = summary.requests,
        errors = summary.errors,
        "input closed, session finished"
    );
    Ok(summary)
}

/// Reads an environment variable, parsing it to type `T`, or returns the default.
///
/// Logs a warning if the variable is set but cannot be parsed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(name, value = %v, "invalid env var value, using default");
            default
        }),
        Err(_) => default,
    }
}
