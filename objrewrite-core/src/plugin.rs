//! Plugin definitions and their normalized, prefix-bound descriptors.
//!
//! A [`Plugin`] is written once, independent of where it is registered.
//! Registering it under a prefix yields a [`Descriptor`] whose target and
//! requirements are absolute paths. The same `Arc<Plugin>` may be registered
//! under several prefixes; it is still activated only once per rewrite call.

use crate::error::{RewriteError, RewriteResult};
use crate::schema::Schema;
use crate::scope::{Cache, Scope};
use futures::future::{BoxFuture, FutureExt};
use objrewrite_path::{FieldPath, Segment};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Computes an INJECT result from the node it runs on.
pub type TransformFn = Arc<dyn Fn(&Value, &Scope) -> anyhow::Result<Value> + Send + Sync>;

/// Computes an INJECT result asynchronously.
pub type DeferredTransformFn =
    Arc<dyn Fn(Value, Scope) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Decides whether a FILTER keeps a value.
pub type PredicateFn = Arc<dyn Fn(&Value, &Scope) -> anyhow::Result<bool> + Send + Sync>;

/// Produces a SORT key for a value.
pub type KeyFn = Arc<dyn Fn(&Value, &Scope) -> anyhow::Result<Value> + Send + Sync>;

/// Caps the length of a sorted array.
pub type LimitFn = Arc<dyn Fn(&Scope) -> anyhow::Result<usize> + Send + Sync>;

/// One-time-per-call setup. Receives the projected context and the fresh
/// cache; the returned flag enables or disables the plugin for the call.
pub type ActivateFn = Arc<dyn Fn(&mut Value, &Cache) -> anyhow::Result<bool> + Send + Sync>;

/// The three plugin families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginKind {
    Inject,
    Filter,
    Sort,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inject => "INJECT",
            Self::Filter => "FILTER",
            Self::Sort => "SORT",
        })
    }
}

#[derive(Clone)]
pub(crate) enum InjectFn {
    Immediate(TransformFn),
    Deferred(DeferredTransformFn),
}

#[derive(Clone)]
pub(crate) enum Behavior {
    Inject { transform: InjectFn, schema: Schema },
    Filter { predicate: PredicateFn },
    Sort { key: KeyFn, limit: Option<LimitFn> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// `*`: the node the plugin is registered on.
    Node,
    Path(FieldPath),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Relative(FieldPath),
    /// Written with a leading `/`: resolved from the document root.
    Absolute(FieldPath),
}

/// A prefix-independent plugin definition.
pub struct Plugin {
    name: String,
    target_raw: String,
    requires_raw: Vec<String>,
    target: Target,
    requires: Vec<Requirement>,
    context_schema: Option<Schema>,
    activate: Option<ActivateFn>,
    behavior: Behavior,
}

impl Plugin {
    /// Starts an INJECT plugin writing at `target` (`*` for the node itself).
    pub fn inject(target: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(PluginKind::Inject, target.into())
    }

    /// Starts a FILTER plugin matching `target` (`*` for the node itself).
    pub fn filter(target: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(PluginKind::Filter, target.into())
    }

    /// Starts a SORT plugin matching `target` (`*` for the node itself).
    pub fn sort(target: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(PluginKind::Sort, target.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PluginKind {
        match self.behavior {
            Behavior::Inject { .. } => PluginKind::Inject,
            Behavior::Filter { .. } => PluginKind::Filter,
            Behavior::Sort { .. } => PluginKind::Sort,
        }
    }

    #[must_use]
    pub fn context_schema(&self) -> Option<&Schema> {
        self.context_schema.as_ref()
    }

    /// Returns true if the INJECT transform produces its value asynchronously.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(
            self.behavior,
            Behavior::Inject {
                transform: InjectFn::Deferred(_),
                ..
            }
        )
    }

    pub(crate) fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub(crate) fn activate_hook(&self) -> Option<&ActivateFn> {
        self.activate.as_ref()
    }

    /// JSON summary of the options this plugin was built from.
    #[must_use]
    pub fn options(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.kind(),
            "target": self.target_raw,
            "requires": self.requires_raw,
        })
    }

    /// Binds this plugin to a registry prefix.
    #[must_use]
    pub fn bind(self: &Arc<Self>, prefix: &FieldPath) -> Descriptor {
        let target = match &self.target {
            Target::Node => prefix.clone(),
            Target::Path(path) => prefix.join(path),
        };
        let requires = self
            .requires
            .iter()
            .map(|req| match req {
                Requirement::Relative(path) => prefix.join(path),
                Requirement::Absolute(path) => path.clone(),
            })
            .collect();
        let (location, targets, write_keys) = match &self.behavior {
            Behavior::Inject { schema, .. } => {
                let write_keys = match &self.target {
                    Target::Node => Vec::new(),
                    Target::Path(path) => path.segments().iter().map(ToString::to_string).collect(),
                };
                (prefix.clone(), schema.output_paths(&target), write_keys)
            }
            Behavior::Filter { .. } | Behavior::Sort { .. } => {
                (target.clone(), vec![target.clone()], Vec::new())
            }
        };
        Descriptor {
            plugin: Arc::clone(self),
            prefix: prefix.clone(),
            target,
            location,
            targets,
            requires,
            write_keys,
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("target", &self.target_raw)
            .field("requires", &self.requires_raw)
            .finish_non_exhaustive()
    }
}

/// A plugin bound to a registry prefix, with every path made absolute.
#[derive(Debug, Clone)]
pub struct Descriptor {
    plugin: Arc<Plugin>,
    prefix: FieldPath,
    target: FieldPath,
    location: FieldPath,
    targets: Vec<FieldPath>,
    requires: Vec<FieldPath>,
    write_keys: Vec<String>,
}

impl Descriptor {
    #[must_use]
    pub fn plugin(&self) -> &Arc<Plugin> {
        &self.plugin
    }

    #[must_use]
    pub fn kind(&self) -> PluginKind {
        self.plugin.kind()
    }

    #[must_use]
    pub fn prefix(&self) -> &FieldPath {
        &self.prefix
    }

    /// Absolute target path.
    #[must_use]
    pub fn target(&self) -> &FieldPath {
        &self.target
    }

    /// Where the plugin runs: the objects at the prefix for INJECT, the
    /// value at the target for FILTER and SORT.
    #[must_use]
    pub fn location(&self) -> &FieldPath {
        &self.location
    }

    /// Paths this plugin produces (INJECT) or matches (FILTER, SORT).
    #[must_use]
    pub fn targets(&self) -> &[FieldPath] {
        &self.targets
    }

    /// Absolute paths the plugin's callbacks read.
    #[must_use]
    pub fn requires(&self) -> &[FieldPath] {
        &self.requires
    }

    /// Returns true if this INJECT descriptor can produce `field`.
    #[must_use]
    pub fn produces(&self, field: &FieldPath) -> bool {
        self.kind() == PluginKind::Inject && self.targets.iter().any(|t| t.covers(field))
    }

    pub(crate) fn write_keys(&self) -> &[String] {
        &self.write_keys
    }
}

/// Collects plugin options and validates them in [`PluginBuilder::build`].
pub struct PluginBuilder {
    kind: PluginKind,
    name: Option<String>,
    target: String,
    requires: Vec<String>,
    context_schema: Option<Schema>,
    activate: Option<ActivateFn>,
    schema: Option<Schema>,
    transform: Option<InjectFn>,
    predicate: Option<PredicateFn>,
    key: Option<KeyFn>,
    limit: Option<LimitFn>,
}

impl PluginBuilder {
    fn new(kind: PluginKind, target: String) -> Self {
        Self {
            kind,
            name: None,
            target,
            requires: Vec::new(),
            context_schema: None,
            activate: None,
            schema: None,
            transform: None,
            predicate: None,
            key: None,
            limit: None,
        }
    }

    /// Name used in logs and errors. Defaults to `KIND(target)`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fields the callbacks read, relative to the registry prefix. A leading
    /// `/` makes a field relative to the document root; `*` is the node
    /// itself.
    pub fn requires<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Shape the rewrite context must have for the plugin to run. Object
    /// shapes also narrow the context the plugin sees to the declared keys.
    pub fn context_schema(mut self, schema: Schema) -> Self {
        self.context_schema = Some(schema);
        self
    }

    /// One-time-per-call hook run before the first callback.
    pub fn activate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Value, &Cache) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.activate = Some(Arc::new(hook));
        self
    }

    /// Output schema of an INJECT plugin.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// INJECT transform returning its value immediately.
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Scope) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.transform = Some(InjectFn::Immediate(Arc::new(f)));
        self
    }

    /// INJECT transform returning a future. Only usable with
    /// [`CompiledRewriter::rewrite_async`](crate::CompiledRewriter::rewrite_async).
    pub fn transform_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.transform = Some(InjectFn::Deferred(Arc::new(move |value, scope| {
            f(value, scope).boxed()
        })));
        self
    }

    /// FILTER predicate.
    pub fn predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Scope) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(f));
        self
    }

    /// SORT key function.
    pub fn key<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Scope) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.key = Some(Arc::new(f));
        self
    }

    /// SORT result-size limiter.
    pub fn limit<F>(mut self, f: F) -> Self
    where
        F: Fn(&Scope) -> anyhow::Result<usize> + Send + Sync + 'static,
    {
        self.limit = Some(Arc::new(f));
        self
    }

    /// Validates the options and produces the shared plugin definition.
    pub fn build(self) -> RewriteResult<Arc<Plugin>> {
        let kind = self.kind;
        let invalid = |msg: &str| RewriteError::InvalidPlugin(format!("{kind}({}): {msg}", self.target));

        if self.target.is_empty() {
            return Err(invalid("target can not be empty, use '*' for the node itself"));
        }
        let target = if self.target == "*" {
            Target::Node
        } else {
            Target::Path(FieldPath::parse(&self.target)?)
        };
        let requires = self
            .requires
            .iter()
            .map(|raw| match raw.strip_prefix('/') {
                Some(abs) => FieldPath::parse(abs).map(Requirement::Absolute),
                None if raw == "*" => Ok(Requirement::Relative(FieldPath::root())),
                None => FieldPath::parse(raw).map(Requirement::Relative),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let behavior = match kind {
            PluginKind::Inject => {
                if self.predicate.is_some() || self.key.is_some() || self.limit.is_some() {
                    return Err(invalid("only transform, schema and common options are allowed"));
                }
                if let Target::Path(path) = &target {
                    if path.segments().iter().any(Segment::is_wildcard) {
                        return Err(invalid("target must be '*' or a wildcard-free path"));
                    }
                }
                let transform = self.transform.ok_or_else(|| invalid("transform is required"))?;
                let schema = self.schema.ok_or_else(|| invalid("schema is required"))?;
                Behavior::Inject { transform, schema }
            }
            PluginKind::Filter => {
                if self.transform.is_some() || self.schema.is_some() || self.key.is_some() || self.limit.is_some() {
                    return Err(invalid("only predicate and common options are allowed"));
                }
                let predicate = self.predicate.ok_or_else(|| invalid("predicate is required"))?;
                Behavior::Filter { predicate }
            }
            PluginKind::Sort => {
                if self.transform.is_some() || self.schema.is_some() || self.predicate.is_some() {
                    return Err(invalid("only key, limit and common options are allowed"));
                }
                let key = self.key.ok_or_else(|| invalid("key is required"))?;
                Behavior::Sort {
                    key,
                    limit: self.limit,
                }
            }
        };

        Ok(Arc::new(Plugin {
            name: self.name.unwrap_or_else(|| format!("{kind}({})", self.target)),
            target_raw: self.target,
            requires_raw: self.requires,
            target,
            requires,
            context_schema: self.context_schema,
            activate: self.activate,
            behavior,
        }))
    }
}
