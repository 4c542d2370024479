//! Arbor Prefab -- ownership scopes for prefab serialization.
//!
//! A deserializer builds a [`PrefabScope`] tree while it instantiates prefabs,
//! registering every component it creates into exactly one scope. A serializer
//! later consults the tree to decide which components' fields belong to the
//! scope it is writing and how each reference field is written out.
//!
//! # Modules
//!
//! - [`scope`]: the ownership tree and its lookups.
//! - [`visibility`]: per-reference emit/suppress decisions.
//! - [`snapshot`]: serde-friendly copies of a scope tree.
//!
//! # Example
//!
//! ```
//! use arbor_core::prelude::*;
//! use arbor_prefab::prelude::*;
//!
//! struct Leaf;
//! impl Component for Leaf {}
//!
//! let root = ComponentRef::new(Hierarchy::new("scene"));
//! let button = ComponentRef::new(Leaf);
//! let label = ComponentRef::new(Leaf);
//!
//! let mut button_scope = PrefabScope::new("button.prefab", button.id());
//! button_scope.register(label.id()).unwrap();
//! let mut scene = PrefabScope::new("scene.prefab", root.id());
//! scene.nest(button_scope).unwrap();
//!
//! assert_eq!(scene.find_owning_scope(label.id()).unwrap().origin(), "button.prefab");
//! assert_eq!(scene.find_scope_rooted_at(button.id()).unwrap().origin(), "button.prefab");
//! assert!(scene.find_scope_rooted_at(label.id()).is_none());
//! ```

#![deny(unsafe_code)]

pub mod scope;
pub mod snapshot;
pub mod visibility;

pub use scope::PrefabScope;

use arbor_core::ComponentId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ownership-tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefabError {
    /// The component is not owned by any scope in the searched tree.
    ///
    /// Every instantiated component is registered somewhere, so this points
    /// at a bug in whatever built the tree rather than at bad input.
    #[error("component {component} is not owned by any scope under '{origin}'")]
    ComponentNotFound {
        component: ComponentId,
        origin: String,
    },

    /// The component already has an owning scope.
    #[error("component {component} is already owned by scope '{owner}'")]
    AlreadyOwned {
        component: ComponentId,
        owner: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::scope::{PrefabScope, Scopes};
    pub use crate::snapshot::ScopeSnapshot;
    pub use crate::visibility::ReferenceVisibility;
    pub use crate::PrefabError;
}
