//! Stderr diagnostics for vdi components.
//!
//! Diagnostics are `tracing` events tagged with a component field. Their
//! verbosity follows `VDI_LOG_DEBUG_LEVEL`:
//!
//! | level | shows |
//! |---|---|
//! | 0 | errors |
//! | 1 | + info (log file notice) |
//! | 2, 3 | + debug (load/unload, per-call, downloads) |
//! | 4+ | + trace (formatted records) |
//!
//! # Usage
//!
//! ```ignore
//! use vdi_config::log_layer_debug;
//!
//! log_layer_debug!("called", func = "open", path = "/tmp/x");
//! ```

use tracing::level_filters::LevelFilter;

/// Overrides the level mapping with a full `EnvFilter` directive.
pub const ENV_FILTER_VAR: &str = "VDI_LOG";

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const LAYER: &'static str = "LAYER";
    pub const AUDIT: &'static str = "AUDIT";
    pub const FETCH: &'static str = "FETCH";
}

// === LAYER logging macros ===

#[macro_export]
macro_rules! log_layer_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = $crate::logging::Component::LAYER, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_layer_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = $crate::logging::Component::LAYER, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_layer_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = $crate::logging::Component::LAYER, $($key = $value,)* $msg)
    };
}

// === AUDIT logging macros ===

#[macro_export]
macro_rules! log_audit_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = $crate::logging::Component::AUDIT, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_audit_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = $crate::logging::Component::AUDIT, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_audit_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(component = $crate::logging::Component::AUDIT, $($key = $value,)* $msg)
    };
}

// === FETCH logging macros ===

#[macro_export]
macro_rules! log_fetch_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = $crate::logging::Component::FETCH, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_fetch_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = $crate::logging::Component::FETCH, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_fetch_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(component = $crate::logging::Component::FETCH, $($key = $value,)* $msg)
    };
}

/// Map the integer debug level onto a tracing level filter.
pub fn level_for_debug(debug_level: u8) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::INFO,
        2 | 3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Initialize stderr diagnostics. Safe to call more than once; only the
/// first call installs a subscriber.
pub fn init_logging(debug_level: u8) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_env(ENV_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level_for_debug(debug_level).to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
