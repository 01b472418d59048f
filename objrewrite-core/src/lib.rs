//! Plugin-driven rewriting of JSON trees.
//!
//! A [`Registry`] maps tree locations to plugins of three kinds:
//! - INJECT computes a new value from an object and merges it in
//! - FILTER removes array elements (or keys) that fail a predicate
//! - SORT orders an array by computed keys, optionally truncating it
//!
//! [`Rewriter::compile`] resolves the fields a caller wants against the
//! fields the store can fetch, keeping only the plugins needed to produce
//! them. The resulting [`CompiledRewriter`] reports what to fetch and then
//! rewrites fetched trees bottom-up, synchronously or with async injections.
//!
//! ```no_run
//! use objrewrite_core::{Plugin, Registry, Rewriter, Schema};
//! use serde_json::json;
//!
//! # fn main() -> objrewrite_core::RewriteResult<()> {
//! let full_name = Plugin::inject("fullName")
//!     .requires(["first", "last"])
//!     .schema(Schema::predicate(serde_json::Value::is_string))
//!     .transform(|node, _| {
//!         let first = node["first"].as_str().unwrap_or_default();
//!         let last = node["last"].as_str().unwrap_or_default();
//!         Ok(json!(format!("{first} {last}")))
//!     })
//!     .build()?;
//!
//! let registry = Registry::new().with("users", [full_name])?;
//! let rewriter = Rewriter::new(registry, ["users.first", "users.last"])?;
//! let compiled = rewriter.compile(["users.fullName"])?;
//!
//! let mut tree = json!({"users": [{"first": "Ada", "last": "Lovelace"}]});
//! compiled.rewrite(&mut tree, None)?;
//! # Ok(())
//! # }
//! ```

mod error;
mod logger;
mod merge;
mod ordering;
mod plugin;
mod registry;
mod resolver;
mod retain;
mod rewriter;
mod runtime;
mod schema;
mod scope;
mod walker;

pub use error::{RewriteError, RewriteResult};
pub use logger::{Logger, TracingLogger};
pub use merge::{assign, merge};
pub use objrewrite_path::{FieldPath, PathError, Segment};
pub use ordering::{compare_slices, compare_values};
pub use plugin::{
    ActivateFn, DeferredTransformFn, Descriptor, KeyFn, LimitFn, Plugin, PluginBuilder,
    PluginKind, PredicateFn, TransformFn,
};
pub use registry::Registry;
pub use rewriter::{CompiledRewriter, Rewriter, RewriterConfig};
pub use schema::Schema;
pub use scope::{Cache, Scope};
