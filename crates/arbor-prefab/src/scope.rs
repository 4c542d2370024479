//! The ownership tree built while prefabs are instantiated.
//!
//! Every instantiation boundary gets a [`PrefabScope`]. A scope directly owns
//! the components its own prefab definition created (its root included) and
//! holds one nested scope per prefab instantiated from inside it. The tree
//! mirrors prefab nesting, not the runtime [`Hierarchy`](arbor_core::Hierarchy)
//! shape: a component can sit deep in the hierarchy yet be owned by the
//! top-level scope, and vice versa.
//!
//! Each component is owned by exactly one scope. [`PrefabScope::register`] and
//! [`PrefabScope::nest`] refuse input that would break this.

use std::collections::HashSet;

use arbor_core::ComponentId;
use tracing::{trace, warn};

use crate::PrefabError;

// ---------------------------------------------------------------------------
// PrefabScope
// ---------------------------------------------------------------------------

/// One prefab instantiation: the components it created and the prefab
/// instantiations made from inside it.
///
/// Components are identified by [`ComponentId`], so the tree holds no
/// references into the live component graph.
#[derive(Debug, Clone)]
pub struct PrefabScope {
    /// Where the prefab came from, e.g. its source file.
    origin: String,
    root: ComponentId,
    /// Directly owned components in registration order.
    components: Vec<ComponentId>,
    /// Same ids as `components`, for lookups.
    owned: HashSet<ComponentId>,
    children: Vec<PrefabScope>,
}

impl PrefabScope {
    /// A scope for the prefab instantiated from `origin`, owning `root`.
    pub fn new(origin: impl Into<String>, root: ComponentId) -> Self {
        Self {
            origin: origin.into(),
            root,
            components: vec![root],
            owned: HashSet::from([root]),
            children: Vec::new(),
        }
    }

    /// A scope rooted at `root` that owns nothing yet, for callers that
    /// register the root themselves at a chosen position.
    pub(crate) fn unregistered(origin: String, root: ComponentId) -> Self {
        Self {
            origin,
            root,
            components: Vec::new(),
            owned: HashSet::new(),
            children: Vec::new(),
        }
    }

    /// Where the prefab was instantiated from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The component this scope's prefab instantiated as its root.
    pub fn root(&self) -> ComponentId {
        self.root
    }

    /// Components owned directly by this scope, in registration order.
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Scopes nested directly in this one, in nesting order.
    pub fn child_scopes(&self) -> &[PrefabScope] {
        &self.children
    }

    /// Whether `component` is owned directly by this scope.
    pub fn owns(&self, component: ComponentId) -> bool {
        self.owned.contains(&component)
    }

    // -- construction -------------------------------------------------------

    /// Record `component` as owned by this scope.
    pub fn register(&mut self, component: ComponentId) -> Result<(), PrefabError> {
        if let Some(owner) = self.owning_scope(component) {
            warn!(
                %component,
                owner = %owner.origin,
                scope = %self.origin,
                "refusing to register component twice"
            );
            return Err(PrefabError::AlreadyOwned {
                component,
                owner: owner.origin.clone(),
            });
        }
        trace!(%component, scope = %self.origin, "register component");
        self.components.push(component);
        self.owned.insert(component);
        Ok(())
    }

    /// Attach `child` as a nested scope.
    ///
    /// Fails if any component of `child`'s subtree is already owned somewhere
    /// in this subtree; `self` is left unchanged in that case.
    pub fn nest(&mut self, child: PrefabScope) -> Result<(), PrefabError> {
        if let Some(component) = child.all_components().find(|&id| self.owning_scope(id).is_some()) {
            let owner = self
                .owning_scope(component)
                .map(|scope| scope.origin.clone())
                .unwrap_or_default();
            warn!(
                %component,
                %owner,
                nested = %child.origin,
                "refusing to nest scope with overlapping ownership"
            );
            return Err(PrefabError::AlreadyOwned { component, owner });
        }
        trace!(scope = %self.origin, nested = %child.origin, "nest scope");
        self.children.push(child);
        Ok(())
    }

    // -- resolution ---------------------------------------------------------

    /// The nested scope whose root is `component`, searched depth first.
    ///
    /// Each nested scope's root is checked before descending into it. `self`
    /// is never returned, even when `component` is its own root.
    pub fn find_scope_rooted_at(&self, component: ComponentId) -> Option<&PrefabScope> {
        for child in &self.children {
            if child.root == component {
                return Some(child);
            }
            if let Some(found) = child.find_scope_rooted_at(component) {
                return Some(found);
            }
        }
        None
    }

    /// The scope that directly owns `component`: `self` first, then nested
    /// scopes depth first.
    ///
    /// A component missing from the tree was never registered during
    /// instantiation, which is a bug in whatever built the tree.
    pub fn find_owning_scope(&self, component: ComponentId) -> Result<&PrefabScope, PrefabError> {
        self.owning_scope(component)
            .ok_or_else(|| PrefabError::ComponentNotFound {
                component,
                origin: self.origin.clone(),
            })
    }

    fn owning_scope(&self, component: ComponentId) -> Option<&PrefabScope> {
        if self.owns(component) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.owning_scope(component))
    }

    // -- traversal ----------------------------------------------------------

    /// All scopes of this subtree in preorder, `self` first.
    pub fn iter(&self) -> Scopes<'_> {
        Scopes { stack: vec![self] }
    }

    /// Number of scopes in this subtree, `self` included.
    pub fn scope_count(&self) -> usize {
        self.iter().count()
    }

    /// Every component owned anywhere in this subtree, scope by scope in
    /// preorder.
    pub fn all_components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.iter().flat_map(|scope| scope.components.iter().copied())
    }
}

/// Preorder iterator over a scope subtree.
#[derive(Debug)]
pub struct Scopes<'a> {
    stack: Vec<&'a PrefabScope>,
}

impl<'a> Iterator for Scopes<'a> {
    type Item = &'a PrefabScope;

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.stack.pop()?;
        self.stack.extend(scope.children.iter().rev());
        Some(scope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
