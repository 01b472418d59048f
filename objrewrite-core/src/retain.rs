//! Prunes a rewritten tree down to the fields the caller asked for.

use objrewrite_path::{FieldPath, MatchState, Matcher};
use serde_json::Value;

/// Keeps keys whose path matches a desired field (with their whole subtree)
/// and keys leading to one; drops the rest. Array elements are never dropped.
pub(crate) struct Retainer {
    matcher: Matcher,
    keep_empty_parents: bool,
}

impl Retainer {
    pub(crate) fn new(desired: Vec<FieldPath>, keep_empty_parents: bool) -> Self {
        Self {
            matcher: Matcher::new(desired),
            keep_empty_parents,
        }
    }

    pub(crate) fn apply(&self, tree: &mut Value) {
        let root = self.matcher.start();
        if !self.matcher.matches(&root).is_empty() {
            return;
        }
        self.prune(tree, &root);
    }

    fn prune(&self, value: &mut Value, state: &MatchState) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.prune(item, state);
                }
            }
            Value::Object(map) => map.retain(|key, child| {
                let next = self.matcher.step(state, key);
                if !self.matcher.matches(&next).is_empty() {
                    return true;
                }
                if self.matcher.is_dead(&next) {
                    return false;
                }
                self.prune(child, &next);
                self.keep_empty_parents || !is_empty_container(child)
            }),
            _ => {}
        }
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.iter().all(is_empty_container),
        _ => false,
    }
}
