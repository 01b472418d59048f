//! Deep merge used when writing INJECT results into the tree.
//!
//! Conflict rule: when both sides are objects their keys merge recursively and
//! incoming keys overwrite; in every other case the incoming value replaces
//! the existing one (arrays replace wholesale).

use serde_json::{Map, Value};

/// Merges `incoming` into `target`.
pub fn merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

/// Writes `value` at the key path `keys` below `node`.
///
/// Missing intermediate objects are created and non-object intermediates are
/// replaced by objects. The value is [`merge`]d into whatever sits at the
/// final key; an empty `keys` merges into `node` itself.
pub fn assign(node: &mut Value, keys: &[String], value: Value) {
    let Some((last, init)) = keys.split_last() else {
        merge(node, value);
        return;
    };
    let mut current = node;
    for key in init {
        current = object_mut(current)
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let parent = object_mut(current);
    match parent.get_mut(last) {
        Some(slot) => merge(slot, value),
        None => {
            parent.insert(last.clone(), value);
        }
    }
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            object_mut(other)
        }
    }
}
