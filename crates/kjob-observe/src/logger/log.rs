use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, fmt::time::OffsetTime, layer::Layered, prelude::*,
    util::TryInitError,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type Filtered = Layered<EnvFilter, Registry>;

/// Build the subscriber for `cfg` and install it as the global default.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let base = tracing_subscriber::registry().with(env_filter(&cfg.level)?);

    let installed = match cfg.format {
        LoggerFormat::Text => base
            .with(
                fmt::layer()
                    .with_ansi(cfg.should_use_color())
                    .with_target(cfg.with_targets)
                    .with_timer(local_rfc3339()),
            )
            .try_init(),
        // Event fields are flattened so `job` and `execution` are top-level keys.
        LoggerFormat::Json => base
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_timer(local_rfc3339()),
            )
            .try_init(),
        LoggerFormat::Journald => return journald(base),
    };
    installed.map_err(init_error)
}

fn env_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn local_rfc3339() -> OffsetTime<Rfc3339> {
    // Unsound to query from a multi-threaded process on some platforms; fall back to UTC.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn init_error(e: TryInitError) -> LoggerError {
    let msg = e.to_string();
    if msg.contains("global default") || msg.contains("SetGlobalDefaultError") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(msg)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(base: Filtered) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier("kjob".to_string());
    base.with(layer).try_init().map_err(init_error)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_base: Filtered) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
