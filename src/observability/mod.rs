//! Observability module
//!
//! Logging and metrics infrastructure for monitoring a replay session.

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, init_logging};
pub use self::metrics::init_metrics;
