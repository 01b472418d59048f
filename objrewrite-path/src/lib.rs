//! Field paths and path-pattern matching for objrewrite.
//!
//! This crate defines the addressing model shared by the resolver and the
//! tree walker:
//! - [`FieldPath`]: a dotted path pattern (`a.b`, `*`, `**.id`)
//! - [`Segment`]: one step of a path: a literal key or a wildcard
//! - [`Matcher`]: an incremental matcher that follows a tree walk key by key
//!
//! Arrays are transparent: indices never appear in a path, and the elements
//! of an array live at the same path as the array itself.

mod matcher;
mod path;

pub use matcher::{MatchState, Matcher};
pub use path::{FieldPath, Segment};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, PathError>;

/// Errors that can occur while parsing paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty segment in path '{0}'")]
    EmptySegment(String),
}
