//! Dotted field paths.
//!
//! A [`FieldPath`] is a sequence of [`Segment`]s written as `a.b.c`. The empty
//! string is the document root. `*` stands for exactly one key and `**` for
//! any number of keys (including none). A pattern made only of `**` never
//! matches the root itself; the root is addressed by the empty path alone.

use crate::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A literal object key.
    Key(String),
    /// Any single key (`*`).
    Star,
    /// Any run of keys, possibly empty (`**`).
    AnyDepth,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw {
            "*" => Self::Star,
            "**" => Self::AnyDepth,
            key => Self::Key(key.to_string()),
        }
    }

    /// Returns true for `*` and `**`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::Key(_))
    }

    /// Returns true if this segment accepts the concrete `key`.
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        match self {
            Self::Key(k) => k == key,
            Self::Star | Self::AnyDepth => true,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Star => f.write_str("*"),
            Self::AnyDepth => f.write_str("**"),
        }
    }
}

/// A dotted path pattern addressing locations in a JSON tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The empty path, addressing the document root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from already-parsed segments.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses a dotted path. `""` is the root; empty segments are rejected.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        let segments = raw
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    Err(PathError::EmptySegment(raw.to_string()))
                } else {
                    Ok(Segment::parse(part))
                }
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Same as [`FieldPath::is_root`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if any segment is `*` or `**`.
    #[must_use]
    pub fn has_wildcards(&self) -> bool {
        self.segments.iter().any(Segment::is_wildcard)
    }

    /// Appends `other` to this path.
    #[must_use]
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Appends a single segment.
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// The path without its last segment, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns true if the concrete key path `keys` is matched by this pattern.
    #[must_use]
    pub fn matches(&self, keys: &[&str]) -> bool {
        if keys.is_empty() {
            return self.is_root();
        }
        match_keys(&self.segments, keys)
    }

    /// Returns true if every concrete path matched by `other` is also matched
    /// by `self`.
    ///
    /// Exact when `other` has no wildcards. With wildcards on both sides the
    /// check is conservative: `*` in `other` is only covered by `*` or `**`,
    /// and `**` in `other` only by `**`.
    #[must_use]
    pub fn covers(&self, other: &FieldPath) -> bool {
        if other.is_root() {
            return self.is_root();
        }
        covers_segments(&self.segments, &other.segments)
    }

    /// Returns true if some concrete path matched by `self` is a prefix of (or
    /// equal to) some concrete path matched by `other`.
    #[must_use]
    pub fn reaches(&self, other: &FieldPath) -> bool {
        if self.is_root() {
            return true;
        }
        if other.is_root() {
            return false;
        }
        reaches_segments(&self.segments, &other.segments)
    }
}

fn match_keys(segments: &[Segment], keys: &[&str]) -> bool {
    match segments.split_first() {
        None => keys.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=keys.len()).any(|skip| match_keys(rest, &keys[skip..]))
        }
        Some((segment, rest)) => match keys.split_first() {
            Some((key, tail)) => segment.accepts(key) && match_keys(rest, tail),
            None => false,
        },
    }
}

fn covers_segments(outer: &[Segment], inner: &[Segment]) -> bool {
    match (outer.split_first(), inner.split_first()) {
        (None, None) => true,
        (Some((Segment::AnyDepth, outer_rest)), _) => {
            covers_segments(outer_rest, inner)
                || inner
                    .split_first()
                    .is_some_and(|(_, inner_rest)| covers_segments(outer, inner_rest))
        }
        (None, Some(_)) | (Some(_), None) => false,
        (Some((Segment::Star, outer_rest)), Some((segment, inner_rest))) => {
            *segment != Segment::AnyDepth && covers_segments(outer_rest, inner_rest)
        }
        (Some((Segment::Key(a), outer_rest)), Some((Segment::Key(b), inner_rest))) => {
            a == b && covers_segments(outer_rest, inner_rest)
        }
        (Some((Segment::Key(_), _)), Some(_)) => false,
    }
}

fn reaches_segments(prefix: &[Segment], full: &[Segment]) -> bool {
    let Some((p, p_rest)) = prefix.split_first() else {
        return true;
    };
    let Some((f, f_rest)) = full.split_first() else {
        return *p == Segment::AnyDepth && reaches_segments(p_rest, full);
    };

    if *p == Segment::AnyDepth && reaches_segments(p_rest, full) {
        return true;
    }
    if *f == Segment::AnyDepth && reaches_segments(prefix, f_rest) {
        return true;
    }

    let compatible = match (p, f) {
        (Segment::Key(a), Segment::Key(b)) => a == b,
        _ => true,
    };
    if !compatible {
        return false;
    }
    // Consume one concrete key on both sides; `**` stays in place.
    let next_prefix = if *p == Segment::AnyDepth { prefix } else { p_rest };
    let next_full = if *f == Segment::AnyDepth { full } else { f_rest };
    if next_prefix.len() == prefix.len() && next_full.len() == full.len() {
        return false;
    }
    reaches_segments(next_prefix, next_full)
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}
