//! Association from registry prefixes to ordered plugin lists.

use crate::error::RewriteResult;
use crate::plugin::{Descriptor, Plugin};
use objrewrite_path::FieldPath;
use std::sync::Arc;

/// Plugins keyed by the tree location they are registered on.
///
/// Registration order is kept: it orders plugins within a phase and, for a
/// plugin reading another plugin's output, must list the producer first.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<(FieldPath, Vec<Arc<Plugin>>)>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `plugins` under `prefix` (`""` is the root).
    pub fn register<I>(&mut self, prefix: &str, plugins: I) -> RewriteResult<&mut Self>
    where
        I: IntoIterator<Item = Arc<Plugin>>,
    {
        let prefix = FieldPath::parse(prefix)?;
        match self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, list)) => list.extend(plugins),
            None => self.entries.push((prefix, plugins.into_iter().collect())),
        }
        Ok(self)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<I>(mut self, prefix: &str, plugins: I) -> RewriteResult<Self>
    where
        I: IntoIterator<Item = Arc<Plugin>>,
    {
        self.register(prefix, plugins)?;
        Ok(self)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&FieldPath, &[Arc<Plugin>])> {
        self.entries.iter().map(|(p, list)| (p, list.as_slice()))
    }

    /// Number of registered prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every plugin bound to its prefix, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.entries
            .iter()
            .flat_map(|(prefix, list)| list.iter().map(move |plugin| plugin.bind(prefix)))
            .collect()
    }
}
