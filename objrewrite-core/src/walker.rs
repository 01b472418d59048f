//! Bottom-up application of active plugins to a data tree.
//!
//! Every value is visited after all of its descendants. At a matched location
//! the phases run in a fixed order: INJECT on each object at the location,
//! then FILTER, then SORT on the value at the location. Within a phase,
//! plugins run in registration order.
//!
//! Array elements are visited front to back and object keys in map order.
//! Plugins at a location are activated the first time the walk does work
//! there, so activation order follows walk order rather than registration.
//!
//! The walk is written once as a future. The synchronous entry point drives it
//! with [`Mode::Immediate`], in which a deferred transform is an error, so the
//! future never actually suspends.

use crate::error::{RewriteError, RewriteResult};
use crate::merge;
use crate::ordering::compare_slices;
use crate::plugin::{Behavior, Descriptor, InjectFn, PluginKind};
use crate::runtime::CallState;
use crate::scope::Scope;
use futures::future::BoxFuture;
use objrewrite_path::{MatchState, Matcher};
use serde_json::Value;

/// How INJECT results may be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Every transform must return its value directly.
    Immediate,
    /// Deferred transforms are awaited one at a time, in walk order.
    Deferred,
}

/// An active descriptor with its activation slot and registration order.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub order: usize,
    pub slot: usize,
    pub descriptor: Descriptor,
}

/// Bindings applying at one location, split by phase.
#[derive(Default)]
struct Plan<'w> {
    all: Vec<&'w Binding>,
    inject: Vec<&'w Binding>,
    filter: Vec<&'w Binding>,
    sort: Vec<&'w Binding>,
}

pub(crate) struct Walker {
    matcher: Matcher,
    /// Parallel to the matcher's patterns.
    locations: Vec<Vec<Binding>>,
}

impl Walker {
    /// Groups bindings by location; locations keep first-seen order.
    pub(crate) fn new(bindings: Vec<Binding>) -> Self {
        let mut patterns = Vec::new();
        let mut locations: Vec<Vec<Binding>> = Vec::new();
        for binding in bindings {
            let location = binding.descriptor.location();
            match patterns.iter().position(|p| p == location) {
                Some(i) => locations[i].push(binding),
                None => {
                    patterns.push(location.clone());
                    locations.push(vec![binding]);
                }
            }
        }
        Self {
            matcher: Matcher::new(patterns),
            locations,
        }
    }

    pub(crate) fn run<'a>(
        &'a self,
        tree: &'a mut Value,
        call: &'a mut CallState,
        mode: Mode,
    ) -> BoxFuture<'a, RewriteResult<()>> {
        Box::pin(async move {
            let root = self.matcher.start();
            if self.matcher.is_dead(&root) {
                return Ok(());
            }
            // The root can not be removed, so a failed filter there is moot.
            self.visit_slot(tree, root, call, mode).await.map(|_| ())
        })
    }

    fn plan(&self, state: &MatchState) -> Plan<'_> {
        let mut all: Vec<&Binding> = self
            .matcher
            .matches(state)
            .into_iter()
            .flat_map(|i| self.locations[i].iter())
            .collect();
        all.sort_by_key(|b| b.order);

        let mut plan = Plan::default();
        for binding in &all {
            match binding.descriptor.kind() {
                PluginKind::Inject => plan.inject.push(*binding),
                PluginKind::Filter => plan.filter.push(*binding),
                PluginKind::Sort => plan.sort.push(*binding),
            }
        }
        plan.all = all;
        plan
    }

    /// Visits the value stored under a key (or the root). Returns false when
    /// a filter rejects a non-array value, which the caller then removes.
    fn visit_slot<'a>(
        &'a self,
        value: &'a mut Value,
        state: MatchState,
        call: &'a mut CallState,
        mode: Mode,
    ) -> BoxFuture<'a, RewriteResult<bool>> {
        Box::pin(async move {
            let plan = self.plan(&state);
            self.visit_node(value, &state, &plan, call, mode).await?;
            if plan.filter.is_empty() && plan.sort.is_empty() {
                return Ok(true);
            }
            activate(&plan, call)?;
            match value {
                Value::Array(items) => {
                    filter_items(items, &plan.filter, call)?;
                    sort_items(items, &plan.sort, call)?;
                    Ok(true)
                }
                other => passes(other, &enabled(&plan.filter, call)?),
            }
        })
    }

    /// Processes children first, then runs INJECT if the value is an object.
    /// Array elements share their array's location.
    fn visit_node<'a>(
        &'a self,
        value: &'a mut Value,
        state: &'a MatchState,
        plan: &'a Plan<'a>,
        call: &'a mut CallState,
        mode: Mode,
    ) -> BoxFuture<'a, RewriteResult<()>> {
        Box::pin(async move {
            match value {
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        self.visit_node(item, state, plan, call, mode).await?;
                    }
                }
                Value::Object(map) => {
                    let mut rejected = Vec::new();
                    for (key, child) in map.iter_mut() {
                        let next = self.matcher.step(state, key);
                        if self.matcher.is_dead(&next) {
                            continue;
                        }
                        if !self.visit_slot(child, next, call, mode).await? {
                            rejected.push(key.clone());
                        }
                    }
                    for key in rejected {
                        map.remove(&key);
                    }
                }
                _ => {}
            }
            if value.is_object() && !plan.inject.is_empty() {
                inject(value, plan, call, mode).await?;
            }
            Ok(())
        })
    }
}

fn activate(plan: &Plan<'_>, call: &mut CallState) -> RewriteResult<()> {
    for binding in &plan.all {
        call.activate(binding.slot, binding.descriptor.plugin())?;
    }
    Ok(())
}

/// Enabled bindings among `bindings`, with their scopes.
fn enabled<'w>(
    bindings: &[&'w Binding],
    call: &mut CallState,
) -> RewriteResult<Vec<(&'w Binding, Scope)>> {
    let mut out = Vec::with_capacity(bindings.len());
    for binding in bindings {
        if let Some(scope) = call.scope(binding.slot, binding.descriptor.plugin())? {
            out.push((*binding, scope));
        }
    }
    Ok(out)
}

fn plugin_error(binding: &Binding) -> impl FnOnce(anyhow::Error) -> RewriteError + '_ {
    move |source| RewriteError::Plugin {
        plugin: binding.descriptor.plugin().name().to_string(),
        source,
    }
}

async fn inject(
    node: &mut Value,
    plan: &Plan<'_>,
    call: &mut CallState,
    mode: Mode,
) -> RewriteResult<()> {
    activate(plan, call)?;
    for binding in &plan.inject {
        let plugin = binding.descriptor.plugin();
        let Some(scope) = call.scope(binding.slot, plugin)? else {
            continue;
        };
        let Behavior::Inject { transform, schema } = plugin.behavior() else {
            continue;
        };
        let output = match (transform, mode) {
            (InjectFn::Immediate(f), _) => f(&*node, &scope).map_err(plugin_error(binding))?,
            (InjectFn::Deferred(f), Mode::Deferred) => {
                f(node.clone(), scope).await.map_err(plugin_error(binding))?
            }
            (InjectFn::Deferred(_), Mode::Immediate) => {
                return Err(RewriteError::DeferredInSyncRewrite {
                    plugin: plugin.name().to_string(),
                });
            }
        };
        if !schema.validate(&output, true) {
            return Err(RewriteError::InvalidOutput {
                plugin: plugin.name().to_string(),
                target: binding.descriptor.target().to_string(),
            });
        }
        merge::assign(node, binding.descriptor.write_keys(), output);
    }
    Ok(())
}

fn passes(value: &Value, filters: &[(&Binding, Scope)]) -> RewriteResult<bool> {
    for (binding, scope) in filters {
        let Behavior::Filter { predicate } = binding.descriptor.plugin().behavior() else {
            continue;
        };
        if !predicate(value, scope).map_err(plugin_error(binding))? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn filter_items(
    items: &mut Vec<Value>,
    bindings: &[&Binding],
    call: &mut CallState,
) -> RewriteResult<()> {
    let filters = enabled(bindings, call)?;
    if filters.is_empty() {
        return Ok(());
    }
    let keep = items
        .iter()
        .map(|item| passes(item, &filters))
        .collect::<RewriteResult<Vec<bool>>>()?;
    let mut keep = keep.into_iter();
    items.retain(|_| keep.next().unwrap_or(true));
    Ok(())
}

/// Stable sort by the tuple of keys, one key per enabled SORT plugin, then
/// truncation by the first enabled plugin that declares a limit.
fn sort_items(
    items: &mut Vec<Value>,
    bindings: &[&Binding],
    call: &mut CallState,
) -> RewriteResult<()> {
    let sorters = enabled(bindings, call)?;
    if sorters.is_empty() {
        return Ok(());
    }

    let keys = items
        .iter()
        .map(|item| {
            sorters
                .iter()
                .filter_map(|(binding, scope)| match binding.descriptor.plugin().behavior() {
                    Behavior::Sort { key, .. } => {
                        Some(key(item, scope).map_err(plugin_error(binding)))
                    }
                    _ => None,
                })
                .collect::<RewriteResult<Vec<Value>>>()
        })
        .collect::<RewriteResult<Vec<Vec<Value>>>>()?;

    let mut keyed: Vec<(Vec<Value>, Value)> = keys.into_iter().zip(items.drain(..)).collect();
    keyed.sort_by(|a, b| compare_slices(&a.0, &b.0));
    items.extend(keyed.into_iter().map(|(_, item)| item));

    let limiter = sorters
        .iter()
        .find_map(|(binding, scope)| match binding.descriptor.plugin().behavior() {
            Behavior::Sort {
                limit: Some(limit), ..
            } => Some((binding, limit, scope)),
            _ => None,
        });
    if let Some((binding, limit, scope)) = limiter {
        let size = limit(scope).map_err(plugin_error(binding))?;
        items.truncate(size);
    }
    Ok(())
}
