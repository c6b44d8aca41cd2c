//! Process-wide logging setup.

/// Initialize structured logging with `info` as the default level.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Tracing configuration (filters, output format).
pub mod tracing;
