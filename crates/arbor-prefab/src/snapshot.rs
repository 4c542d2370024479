//! Serializable snapshots of an ownership tree.
//!
//! A [`ScopeSnapshot`] is a plain-data copy of a [`PrefabScope`] subtree that
//! can go through `serde` (JSON in the tests, or whatever a diagnostics tool
//! wants). Restoring re-runs the ownership checks, so a snapshot edited by
//! hand cannot produce a tree where a component has two owners.

use arbor_core::ComponentId;
use serde::{Deserialize, Serialize};

use crate::scope::PrefabScope;
use crate::PrefabError;

/// Plain-data copy of one scope and its nested scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    pub origin: String,
    pub root: ComponentId,
    /// Directly owned components, root included, in registration order.
    pub components: Vec<ComponentId>,
    /// Snapshots of the directly nested scopes.
    pub children: Vec<ScopeSnapshot>,
}

impl PrefabScope {
    /// Copy this subtree into a [`ScopeSnapshot`].
    pub fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            origin: self.origin().to_owned(),
            root: self.root(),
            components: self.components().to_vec(),
            children: self.child_scopes().iter().map(PrefabScope::snapshot).collect(),
        }
    }

    /// Rebuild a scope tree, rejecting snapshots where a component is listed
    /// twice, root included.
    ///
    /// Components keep their snapshot order. A root missing from its
    /// `components` list is registered first.
    pub fn from_snapshot(snapshot: &ScopeSnapshot) -> Result<Self, PrefabError> {
        let mut scope = PrefabScope::unregistered(snapshot.origin.clone(), snapshot.root);
        if !snapshot.components.contains(&snapshot.root) {
            scope.register(snapshot.root)?;
        }
        for &component in &snapshot.components {
            scope.register(component)?;
        }
        for child in &snapshot.children {
            scope.nest(PrefabScope::from_snapshot(child)?)?;
        }
        Ok(scope)
    }
}
