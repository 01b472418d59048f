//! Incremental path-pattern matching.
//!
//! A [`Matcher`] is built once over an ordered list of patterns. Walkers carry
//! a [`MatchState`] down the tree and advance it one object key at a time, so
//! no pattern is re-parsed or re-globbed at each node.

use crate::{FieldPath, Segment};

/// Position of a walk inside the patterns of a [`Matcher`].
///
/// Each entry is `(pattern index, segment position)`: the segments before the
/// position have been consumed by the keys walked so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    positions: Vec<(usize, usize)>,
    at_root: bool,
}

impl MatchState {
    fn insert(&mut self, pattern: usize, position: usize) {
        if !self.positions.contains(&(pattern, position)) {
            self.positions.push((pattern, position));
        }
    }
}

/// Matches concrete key paths against a fixed, ordered set of patterns.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    patterns: Vec<FieldPath>,
}

impl Matcher {
    #[must_use]
    pub fn new(patterns: Vec<FieldPath>) -> Self {
        Self { patterns }
    }

    #[must_use]
    pub fn patterns(&self) -> &[FieldPath] {
        &self.patterns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The state at the document root.
    #[must_use]
    pub fn start(&self) -> MatchState {
        MatchState {
            positions: (0..self.patterns.len()).map(|i| (i, 0)).collect(),
            at_root: true,
        }
    }

    /// Advances `state` by one object key.
    #[must_use]
    pub fn step(&self, state: &MatchState, key: &str) -> MatchState {
        let mut next = MatchState::default();
        for &(pattern, position) in &state.positions {
            let segments = self.patterns[pattern].segments();
            let mut at = position;
            while at < segments.len() {
                match &segments[at] {
                    Segment::AnyDepth => {
                        // consume the key and stay, or let `**` match nothing
                        next.insert(pattern, at);
                        at += 1;
                    }
                    Segment::Star => {
                        next.insert(pattern, at + 1);
                        break;
                    }
                    Segment::Key(k) => {
                        if k == key {
                            next.insert(pattern, at + 1);
                        }
                        break;
                    }
                }
            }
        }
        next
    }

    /// Indices (ascending) of the patterns matching the current path.
    #[must_use]
    pub fn matches(&self, state: &MatchState) -> Vec<usize> {
        let mut matched: Vec<usize> = if state.at_root {
            self.patterns
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_root())
                .map(|(i, _)| i)
                .collect()
        } else {
            state
                .positions
                .iter()
                .filter(|&&(pattern, position)| {
                    self.patterns[pattern].segments()[position..]
                        .iter()
                        .all(|s| *s == Segment::AnyDepth)
                })
                .map(|&(pattern, _)| pattern)
                .collect()
        };
        matched.sort_unstable();
        matched.dedup();
        matched
    }

    /// Indices (ascending) of the patterns that are still alive below the
    /// current path but do not match it.
    #[must_use]
    pub fn traversed(&self, state: &MatchState) -> Vec<usize> {
        let matched = self.matches(state);
        let mut alive: Vec<usize> = state
            .positions
            .iter()
            .map(|&(pattern, _)| pattern)
            .filter(|pattern| !matched.contains(pattern))
            .collect();
        alive.sort_unstable();
        alive.dedup();
        alive
    }

    /// Returns true if no pattern can match the current path or anything
    /// beneath it.
    #[must_use]
    pub fn is_dead(&self, state: &MatchState) -> bool {
        state.positions.is_empty()
    }
}
