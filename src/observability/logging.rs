//! Logging initialization for `rdomock`.
//!
//! Logs always go to stderr; stdout carries reply frames. `-v` raises the
//! level of this crate's own targets only, so matcher traces at `-vvv` are
//! not drowned out by tokio or the metrics exporter, which stay at `warn`.
//! `RDOMOCK_LOG_LEVEL` replaces the computed filter entirely.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::args::ColorChoice;

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "RDOMOCK_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Level for this crate's targets at a given `-v` count.
#[must_use]
pub const fn crate_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directive for a `-v` count: dependencies at `warn`, `rdomock`
/// at [`crate_level`].
#[must_use]
pub fn default_directive(verbosity: u8) -> String {
    match verbosity {
        0 => "warn".to_string(),
        v => format!("warn,{}={}", env!("CARGO_CRATE_NAME"), crate_level(v)),
    }
}

fn use_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    // module paths only help once matcher internals are being traced
    let show_target = verbosity >= 2;

    let human = (format == LogFormat::Human).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(use_ansi(color))
            .with_target(show_target)
    });
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(show_target)
            .with_current_span(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(human)
        .with(json)
        .try_init();
}
