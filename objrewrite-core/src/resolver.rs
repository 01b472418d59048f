//! Compile-time field resolution.
//!
//! Resolves the desired fields depth-first. Each field is satisfied by the
//! store, by INJECT descriptors producing it, or both; every producer found is
//! activated and its own requirements are resolved before the next field.
//! FILTER and SORT descriptors are structural: any of them located on the way
//! to a resolved field is activated and its requirements resolved too. The
//! first field that nothing satisfies aborts resolution.

use crate::error::{RewriteError, RewriteResult};
use crate::plugin::{Descriptor, PluginKind};
use objrewrite_path::FieldPath;
use std::collections::HashSet;
use tracing::debug;

/// Outcome of resolving a set of desired fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolution {
    /// Store fields to fetch, in discovery order.
    pub fields_to_request: Vec<FieldPath>,
    /// Parallel to the descriptor list: whether each one takes part.
    pub active: Vec<bool>,
}

pub(crate) fn resolve(
    descriptors: &[Descriptor],
    store_fields: &[FieldPath],
    desired: &[FieldPath],
) -> RewriteResult<Resolution> {
    let mut resolver = Resolver {
        descriptors,
        store_fields,
        visited: HashSet::new(),
        active: vec![false; descriptors.len()],
        fields_to_request: Vec::new(),
        requested: HashSet::new(),
    };
    for field in desired {
        resolver.visit(field)?;
    }

    debug!(
        fields = ?resolver.fields_to_request.iter().map(ToString::to_string).collect::<Vec<_>>(),
        active = resolver.active.iter().filter(|a| **a).count(),
        "resolved fields"
    );
    Ok(Resolution {
        fields_to_request: resolver.fields_to_request,
        active: resolver.active,
    })
}

struct Resolver<'a> {
    descriptors: &'a [Descriptor],
    store_fields: &'a [FieldPath],
    /// Fields already resolved or being resolved; breaks cycles and diamonds.
    visited: HashSet<FieldPath>,
    active: Vec<bool>,
    fields_to_request: Vec<FieldPath>,
    requested: HashSet<FieldPath>,
}

impl Resolver<'_> {
    fn visit(&mut self, field: &FieldPath) -> RewriteResult<()> {
        if !self.visited.insert(field.clone()) {
            return Ok(());
        }

        let mut found = Vec::new();
        if self.store_fields.iter().any(|s| s.covers(field)) {
            found.push(field.clone());
        } else if field.has_wildcards() {
            found.extend(self.store_fields.iter().filter(|s| field.covers(s)).cloned());
        }
        let stored = !found.is_empty();
        let produced = self
            .descriptors
            .iter()
            .any(|d| d.kind() == PluginKind::Inject && d.produces(field));
        if !stored && !produced {
            return Err(RewriteError::UnsatisfiableField(field.to_string()));
        }
        for path in found {
            if self.requested.insert(path.clone()) {
                self.fields_to_request.push(path);
            }
        }

        let descriptors = self.descriptors;
        for (i, descriptor) in descriptors.iter().enumerate() {
            let wanted = match descriptor.kind() {
                PluginKind::Inject => descriptor.produces(field),
                PluginKind::Filter | PluginKind::Sort => descriptor.location().reaches(field),
            };
            if !wanted || self.active[i] {
                continue;
            }
            self.active[i] = true;
            for required in descriptor.requires() {
                // The node a plugin runs on always exists.
                if required == descriptor.prefix() {
                    continue;
                }
                self.visit(required)?;
            }
        }
        Ok(())
    }
}
