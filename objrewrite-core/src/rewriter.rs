//! Compilation of desired fields into a reusable rewriter, and the rewrite
//! entry points.

use crate::error::RewriteResult;
use crate::logger::{Logger, TracingLogger};
use crate::plugin::{Descriptor, Plugin};
use crate::registry::Registry;
use crate::resolver::resolve;
use crate::retain::Retainer;
use crate::runtime::CallState;
use crate::walker::{Binding, Mode, Walker};
use objrewrite_path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Post-processing options applied after every rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    /// Prune the tree down to the desired fields after the walk.
    pub retain_requested_only: bool,
    /// When pruning, keep ancestor objects that end up empty.
    pub retain_empty_parents: bool,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            retain_requested_only: true,
            retain_empty_parents: true,
        }
    }
}

/// A plugin registry paired with the fields the backing store can provide.
#[derive(Clone)]
pub struct Rewriter {
    registry: Registry,
    store_fields: Vec<FieldPath>,
    logger: Arc<dyn Logger>,
    config: RewriterConfig,
}

impl Rewriter {
    /// Creates a rewriter. `store_fields` are the paths the store can fetch.
    pub fn new<I, S>(registry: Registry, store_fields: I) -> RewriteResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let store_fields = parse_fields(store_fields)?;
        Ok(Self {
            registry,
            store_fields,
            logger: Arc::new(TracingLogger),
            config: RewriterConfig::default(),
        })
    }

    /// Replaces the warning sink (defaults to [`TracingLogger`]).
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RewriterConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn store_fields(&self) -> &[FieldPath] {
        &self.store_fields
    }

    #[must_use]
    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    /// Resolves `desired` against the store and the registry.
    ///
    /// Fails with [`RewriteError::UnsatisfiableField`](crate::RewriteError::UnsatisfiableField)
    /// if some desired or required field can be neither fetched nor produced.
    /// The result is immutable and can serve any number of rewrite calls.
    pub fn compile<I, S>(&self, desired: I) -> RewriteResult<CompiledRewriter>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let desired = parse_fields(desired)?;
        let descriptors = self.registry.descriptors();
        let resolution = resolve(&descriptors, &self.store_fields, &desired)?;

        let mut plugins: Vec<Arc<Plugin>> = Vec::new();
        let mut active = Vec::new();
        let mut bindings = Vec::new();
        let selected = descriptors
            .into_iter()
            .zip(resolution.active)
            .filter_map(|(descriptor, on)| on.then_some(descriptor));
        for (order, descriptor) in selected.enumerate() {
            let slot = match plugins.iter().position(|p| Arc::ptr_eq(p, descriptor.plugin())) {
                Some(slot) => slot,
                None => {
                    plugins.push(Arc::clone(descriptor.plugin()));
                    plugins.len() - 1
                }
            };
            active.push(descriptor.clone());
            bindings.push(Binding {
                order,
                slot,
                descriptor,
            });
        }

        let retainer = self
            .config
            .retain_requested_only
            .then(|| Retainer::new(desired.clone(), self.config.retain_empty_parents));

        info!(
            desired = desired.len(),
            requested = resolution.fields_to_request.len(),
            plugins = plugins.len(),
            "compiled rewriter"
        );
        debug!(
            active = ?active.iter().map(|d| d.plugin().name()).collect::<Vec<_>>(),
            "active plugins"
        );

        Ok(CompiledRewriter {
            desired,
            fields_to_request: resolution.fields_to_request,
            active,
            slot_count: plugins.len(),
            walker: Walker::new(bindings),
            retainer,
            logger: Arc::clone(&self.logger),
        })
    }
}

impl fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewriter")
            .field("registry", &self.registry)
            .field("store_fields", &self.store_fields)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The outcome of [`Rewriter::compile`]: which store fields to fetch and
/// which plugins to run for one set of desired fields.
pub struct CompiledRewriter {
    desired: Vec<FieldPath>,
    fields_to_request: Vec<FieldPath>,
    active: Vec<Descriptor>,
    slot_count: usize,
    walker: Walker,
    retainer: Option<Retainer>,
    logger: Arc<dyn Logger>,
}

impl CompiledRewriter {
    #[must_use]
    pub fn desired(&self) -> &[FieldPath] {
        &self.desired
    }

    /// Store fields the caller must fetch before rewriting, in discovery order.
    #[must_use]
    pub fn fields_to_request(&self) -> &[FieldPath] {
        &self.fields_to_request
    }

    /// [`fields_to_request`](Self::fields_to_request) rendered as strings.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields_to_request.iter().map(ToString::to_string).collect()
    }

    /// Bound plugins taking part in the rewrite, in registration order.
    #[must_use]
    pub fn active_plugins(&self) -> &[Descriptor] {
        &self.active
    }

    /// Rewrites `tree` in place. `context` defaults to an empty object.
    ///
    /// Fails with [`RewriteError::DeferredInSyncRewrite`](crate::RewriteError::DeferredInSyncRewrite)
    /// when an active INJECT plugin has an async transform. On any error the
    /// tree is left partially rewritten.
    pub fn rewrite(&self, tree: &mut Value, context: Option<&Value>) -> RewriteResult<()> {
        let mut call = self.call_state(context);
        futures::executor::block_on(self.walker.run(tree, &mut call, Mode::Immediate))?;
        self.finish(tree);
        Ok(())
    }

    /// Rewrites `tree` in place, awaiting async INJECT transforms one at a
    /// time in walk order.
    pub async fn rewrite_async(&self, tree: &mut Value, context: Option<&Value>) -> RewriteResult<()> {
        let mut call = self.call_state(context);
        self.walker.run(tree, &mut call, Mode::Deferred).await?;
        self.finish(tree);
        Ok(())
    }

    fn call_state(&self, context: Option<&Value>) -> CallState {
        let context = context
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        CallState::new(context, self.slot_count, Arc::clone(&self.logger))
    }

    fn finish(&self, tree: &mut Value) {
        if let Some(retainer) = &self.retainer {
            retainer.apply(tree);
        }
    }
}

impl fmt::Debug for CompiledRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRewriter")
            .field("desired", &self.desired)
            .field("fields_to_request", &self.fields_to_request)
            .field("active", &self.active.len())
            .finish_non_exhaustive()
    }
}

fn parse_fields<I, S>(fields: I) -> RewriteResult<Vec<FieldPath>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(fields
        .into_iter()
        .map(|field| FieldPath::parse(field.as_ref()))
        .collect::<Result<Vec<_>, _>>()?)
}
