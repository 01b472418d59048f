//! Warning sink for recoverable plugin problems.

use tracing::warn;

/// Receives the single structured warning the rewriter emits when a plugin's
/// context fails validation.
pub trait Logger: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, message: &str) {
        warn!(target: "objrewrite", "{message}");
    }
}
