use objrewrite_path::{FieldPath, Segment};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A leaf check on a single JSON value.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Describes the expected shape of a JSON value.
///
/// Used twice by plugins: as the output schema of an INJECT plugin, and as the
/// context shape a plugin accepts. Shapes nest, so `[{ id: integer }]` is
/// `Schema::list(Schema::object([("id", Schema::predicate(..))]))`.
#[derive(Clone)]
pub enum Schema {
    /// Arbitrary check on the value.
    Predicate(Predicate),
    /// An object with the listed keys, each validated by its own schema.
    Object(Vec<(String, Schema)>),
    /// An array whose every element has the inner shape.
    List(Box<Schema>),
}

impl Schema {
    /// Shorthand for a predicate schema.
    pub fn predicate(check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(check))
    }

    /// Accepts every value.
    #[must_use]
    pub fn any() -> Self {
        Self::predicate(|_| true)
    }

    /// Shorthand for an object schema.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// Shorthand for a homogeneous list schema.
    #[must_use]
    pub fn list(element: Schema) -> Self {
        Self::List(Box::new(element))
    }

    /// Validates `value` against this shape.
    ///
    /// Absent object keys are checked as `null`. In strict mode an object may
    /// not carry keys the schema does not declare.
    #[must_use]
    pub fn validate(&self, value: &Value, strict: bool) -> bool {
        match self {
            Self::Predicate(check) => check(value),
            Self::Object(fields) => {
                let Value::Object(map) = value else {
                    return false;
                };
                if strict && map.keys().any(|k| !fields.iter().any(|(name, _)| name == k)) {
                    return false;
                }
                fields
                    .iter()
                    .all(|(name, schema)| schema.validate(map.get(name).unwrap_or(&Value::Null), strict))
            }
            Self::List(element) => match value {
                Value::Array(items) => items.iter().all(|item| element.validate(item, strict)),
                _ => false,
            },
        }
    }

    /// Narrows a context to the keys an object schema declares; other shapes
    /// see the context unchanged.
    #[must_use]
    pub fn project(&self, context: &Value) -> Value {
        match (self, context) {
            (Self::Object(fields), Value::Object(map)) => {
                let projected: Map<String, Value> = fields
                    .iter()
                    .filter_map(|(name, _)| map.get(name).map(|v| (name.clone(), v.clone())))
                    .collect();
                Value::Object(projected)
            }
            _ => context.clone(),
        }
    }

    /// Paths an INJECT plugin writing at `base` can produce under this shape.
    pub(crate) fn output_paths(&self, base: &FieldPath) -> Vec<FieldPath> {
        let mut out = Vec::new();
        self.collect_output_paths(base, &mut out);
        out
    }

    fn collect_output_paths(&self, base: &FieldPath, out: &mut Vec<FieldPath>) {
        let mut push = |path: FieldPath| {
            if !out.contains(&path) {
                out.push(path);
            }
        };
        match self {
            Self::Predicate(_) => {
                push(base.clone());
                push(base.child(Segment::AnyDepth));
            }
            Self::Object(fields) => {
                push(base.clone());
                for (name, schema) in fields {
                    schema.collect_output_paths(&base.child(Segment::Key(name.clone())), out);
                }
            }
            Self::List(element) => element.collect_output_paths(base, out),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Object(fields) => f.debug_map().entries(fields.iter().map(|(k, v)| (k, v))).finish(),
            Self::List(element) => f.debug_list().entry(element).finish(),
        }
    }
}
