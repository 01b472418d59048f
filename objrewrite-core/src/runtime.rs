//! Per-call plugin activation.
//!
//! Each rewrite call owns a [`CallState`]: one activation slot per distinct
//! plugin instance, all pending at the start of the call. A slot is settled
//! the first time the walker needs the plugin and is never revisited within
//! the call, so activation runs at most once per plugin per call. Nothing
//! here outlives the call.

use crate::error::{RewriteError, RewriteResult};
use crate::logger::Logger;
use crate::plugin::Plugin;
use crate::scope::{Cache, Scope};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
enum Activation {
    Pending,
    Disabled,
    Enabled(Scope),
}

/// Activation slots for one rewrite call.
pub(crate) struct CallState {
    context: Value,
    logger: Arc<dyn Logger>,
    slots: Vec<Activation>,
}

impl CallState {
    pub(crate) fn new(context: Value, slot_count: usize, logger: Arc<dyn Logger>) -> Self {
        Self {
            context,
            logger,
            slots: vec![Activation::Pending; slot_count],
        }
    }

    /// Activates `plugin` in `slot` if that has not happened yet this call.
    pub(crate) fn activate(&mut self, slot: usize, plugin: &Plugin) -> RewriteResult<()> {
        if !matches!(self.slots[slot], Activation::Pending) {
            return Ok(());
        }
        let settled = self.settle(plugin)?;
        debug!(
            plugin = %plugin.name(),
            enabled = matches!(settled, Activation::Enabled(_)),
            "plugin activated"
        );
        self.slots[slot] = settled;
        Ok(())
    }

    /// The plugin's scope if it is enabled for this call, activating it first
    /// when needed.
    pub(crate) fn scope(&mut self, slot: usize, plugin: &Plugin) -> RewriteResult<Option<Scope>> {
        self.activate(slot, plugin)?;
        Ok(match &self.slots[slot] {
            Activation::Enabled(scope) => Some(scope.clone()),
            Activation::Pending | Activation::Disabled => None,
        })
    }

    fn settle(&self, plugin: &Plugin) -> RewriteResult<Activation> {
        let mut context = match plugin.context_schema() {
            Some(schema) => {
                if !schema.validate(&self.context, false) {
                    let details = json!({
                        "origin": "object-rewrite",
                        "options": plugin.options(),
                    });
                    self.logger
                        .warn(&format!("Context validation failure\n{details}"));
                    return Ok(Activation::Disabled);
                }
                schema.project(&self.context)
            }
            None => self.context.clone(),
        };

        let cache = Cache::new();
        let enabled = match plugin.activate_hook() {
            Some(hook) => hook(&mut context, &cache).map_err(|source| RewriteError::Plugin {
                plugin: plugin.name().to_string(),
                source,
            })?,
            None => true,
        };

        Ok(if enabled {
            Activation::Enabled(Scope::new(context, cache))
        } else {
            Activation::Disabled
        })
    }
}
