//! Process-wide tracing/logging setup.

pub mod tracing;

pub use crate::tracing::{DEFAULT_FILTER, LogFormat, LogSettings, init_with};

/// Initialize JSON logging with the default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    init_with(&LogSettings::default());
}
