//! Propagates canonical types into the schema registry, outermost ancestor first.
//!
//! The full ancestor path is computed before any registry call is made, then
//! replayed root-to-leaf so every `add_child` finds its parent already known.

use std::collections::HashSet;

use crate::error::{Result, SysbioError};
use crate::mapping::{by_canonical_type, table_len, TableKind, TypeMapping};
use crate::schema::{ChildSpec, SchemaRegistry};

/// `(parent, child)` declarations ordered root-to-leaf.
pub fn ancestor_path(kind: TableKind, leaf: &TypeMapping) -> Result<Vec<(&'static str, &'static str)>> {
    let mut path = Vec::new();
    let mut child = leaf.canonical_type;
    let mut parent = leaf.parent;

    while let Some(p) = parent {
        if p == child || path.len() >= table_len(kind) {
            return Err(SysbioError::HierarchyCycle(leaf.canonical_type.to_string()));
        }
        path.push((p, child));
        match by_canonical_type(kind, p) {
            Some(mapping) => {
                child = mapping.canonical_type;
                parent = mapping.parent;
            }
            // Parent is outside the table: it must already be in the registry.
            None => break,
        }
    }

    path.reverse();
    Ok(path)
}

/// Session-scoped synchronizer. A no-op without a registry.
pub struct HierarchySync<'r> {
    registry: Option<&'r mut dyn SchemaRegistry>,
    synced: HashSet<(TableKind, &'static str)>,
    declarations: usize,
}

impl<'r> HierarchySync<'r> {
    pub fn new(registry: Option<&'r mut dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            synced: HashSet::new(),
            declarations: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.registry.is_some()
    }

    /// Number of `add_child` calls issued so far.
    pub fn declarations(&self) -> usize {
        self.declarations
    }

    /// Ensure `leaf` and all its ancestors are declared. Each type is
    /// declared at most once per session.
    pub fn sync(&mut self, kind: TableKind, leaf: &TypeMapping) -> Result<()> {
        let Some(registry) = self.registry.as_deref_mut() else {
            return Ok(());
        };
        if leaf.parent.is_none() || self.synced.contains(&(kind, leaf.canonical_type)) {
            return Ok(());
        }

        let path = ancestor_path(kind, leaf)?;
        for (parent, child) in path {
            if self.synced.contains(&(kind, child)) {
                continue;
            }
            log::debug!("Declaring schema type '{}' under '{}'", child, parent);
            registry.add_child(parent, child, ChildSpec::default())?;
            self.synced.insert((kind, child));
            self.declarations += 1;
        }
        Ok(())
    }
}
