//! Structured logging setup, mirroring the teacher's `logging.rs`: a thin
//! wrapper around `tracing_subscriber`'s env-filtered formatter. The store
//! itself never calls this — it's for a binary or test harness that wants
//! readable `trace!`/`debug!`/`warn!`/`error!` output without each caller
//! reimplementing the subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Initializes a process-wide `tracing` subscriber filtered by `level`
/// (e.g. `"info"`, `"graphos_core=debug"`). Fails if a subscriber is
/// already installed, or if `level` isn't a valid filter directive.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| Error::backend_internal(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .try_init()
        .map_err(|_| Error::backend_internal("logging already initialized"))
}
