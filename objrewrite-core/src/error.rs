//! Error types for field resolution and rewriting.

use objrewrite_path::PathError;
use thiserror::Error;

/// Result type for rewrite operations.
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Errors that can occur while building plugins, compiling or rewriting.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A desired or required field has no store entry and no producing plugin.
    #[error("Bad Field Requested: {0}")]
    UnsatisfiableField(String),

    /// Malformed path in a registry key, plugin option or field list.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Plugin options rejected by the builder.
    #[error("invalid plugin options: {0}")]
    InvalidPlugin(String),

    /// An INJECT result failed its output schema.
    #[error("plugin '{plugin}' produced a value rejected by its schema for target '{target}'")]
    InvalidOutput { plugin: String, target: String },

    /// A plugin callback returned an error.
    #[error("plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    /// A deferred INJECT transform was reached by the synchronous entry point.
    #[error("plugin '{plugin}' returns a deferred value; use rewrite_async")]
    DeferredInSyncRewrite { plugin: String },
}
