//! Which reference fields a serializer may write at a given scope.
//!
//! A scope tells apart three kinds of component:
//!
//! - components it owns directly,
//! - the root of a scope nested directly inside it,
//! - components owned anywhere deeper.
//!
//! The first two kinds have their fields written when the scope is written
//! back out. A nested root's fields are the instance overrides the outer
//! prefab applies to it. Components owned deeper are written by the nested
//! prefab's own definition, so their references are hidden here. A reference
//! held by a written component is then emitted according to where its target
//! lives:
//!
//! | target | written as |
//! |---|---|
//! | owned by this scope | [`ReferenceVisibility::Local`] |
//! | root of a scope nested directly in this one | [`ReferenceVisibility::NestedRoot`] |
//! | anywhere deeper | [`ReferenceVisibility::Hidden`] |

use arbor_core::ComponentId;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::scope::PrefabScope;
use crate::PrefabError;

/// How one reference field is written when serializing a particular scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceVisibility {
    /// Write the reference as a local component reference.
    Local,
    /// Write the reference as a path to the nested prefab instance.
    NestedRoot {
        /// Origin of the nested scope rooted at the target.
        origin: String,
    },
    /// Do not write the reference at this scope.
    Hidden,
}

impl ReferenceVisibility {
    /// Whether the reference appears in the serialized output at all.
    pub fn is_emitted(&self) -> bool {
        !matches!(self, ReferenceVisibility::Hidden)
    }
}

impl PrefabScope {
    /// How a reference from `holder` to `target` is written when serializing
    /// this scope.
    ///
    /// The holder's fields are written here when this scope owns it or when
    /// it is the root of a scope nested directly in this one. Any other
    /// holder gets [`ReferenceVisibility::Hidden`]. Both components must be
    /// owned somewhere in this subtree.
    pub fn reference_visibility(
        &self,
        holder: ComponentId,
        target: ComponentId,
    ) -> Result<ReferenceVisibility, PrefabError> {
        self.find_owning_scope(holder)?;
        self.find_owning_scope(target)?;

        let visibility = if !self.writes_fields_of(holder) {
            ReferenceVisibility::Hidden
        } else if self.owns(target) {
            ReferenceVisibility::Local
        } else if let Some(nested) = self
            .child_scopes()
            .iter()
            .find(|nested| nested.root() == target)
        {
            ReferenceVisibility::NestedRoot {
                origin: nested.origin().to_owned(),
            }
        } else {
            ReferenceVisibility::Hidden
        };

        trace!(
            scope = %self.origin(),
            %holder,
            %target,
            ?visibility,
            "resolved reference visibility"
        );
        Ok(visibility)
    }

    /// Components whose fields are written when serializing this scope: the
    /// directly owned ones in registration order, then the root of each
    /// directly nested scope.
    pub fn serialized_components(&self) -> Vec<ComponentId> {
        self.components()
            .iter()
            .copied()
            .chain(self.child_scopes().iter().map(PrefabScope::root))
            .collect()
    }

    fn writes_fields_of(&self, component: ComponentId) -> bool {
        self.owns(component)
            || self
                .child_scopes()
                .iter()
                .any(|nested| nested.root() == component)
    }
}
