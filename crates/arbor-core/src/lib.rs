//! Arbor Core -- component trees with typed, phased broadcast dispatch.
//!
//! Components are heterogeneous `'static` values behind [`ComponentRef`]
//! handles. A component becomes a tree node by embedding a [`Hierarchy`], and
//! takes part in dispatch by declaring typed roles ([`Listener`], [`Hook`]) or
//! by exposing a [`Propagator`]. [`Hierarchy::notify`] delivers a notification
//! to its children in five ordered phases, recursing through propagators.
//!
//! # Quick Start
//!
//! ```
//! use std::cell::Cell;
//! use arbor_core::prelude::*;
//!
//! struct Score(Cell<u32>);
//!
//! impl Listener<Update> for Score {
//!     fn on_notify(&self, _: &Update) -> anyhow::Result<()> {
//!         self.0.set(self.0.get() + 1);
//!         Ok(())
//!     }
//! }
//!
//! impl Component for Score {
//!     fn roles(&self, roles: &mut Roles<'_>) {
//!         roles.listener::<Update>(self);
//!     }
//! }
//!
//! let root = Hierarchy::new("root");
//! let score = ComponentRef::new(Score(Cell::new(0)));
//! root.add_child(score.clone());
//! root.notify(&Update { delta_time: 1.0 / 60.0 }).unwrap();
//!
//! assert_eq!(score.downcast_ref::<Score>().unwrap().0.get(), 1);
//! ```
//!
//! Everything here is single-threaded: handles are `Rc`-based, and the tree
//! must not be reshaped from another thread while a dispatch is running.

#![deny(unsafe_code)]

pub mod capability;
pub mod component;
pub mod dispatch;
pub mod event;
pub mod hierarchy;
pub mod notifications;

pub use capability::{Hook, Listener, Notification, Phase, Propagator, Roles};
pub use component::{Component, ComponentId, ComponentRef};
pub use hierarchy::Hierarchy;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by notification dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A component callback failed. The rest of the broadcast was skipped.
    #[error("component '{component}' ({component_id}) failed during {phase} of {notification}")]
    Callback {
        component: String,
        component_id: ComponentId,
        phase: Phase,
        notification: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// Id of the component whose callback failed.
    pub fn component_id(&self) -> ComponentId {
        match self {
            DispatchError::Callback { component_id, .. } => *component_id,
        }
    }

    /// Phase that was being delivered when the callback failed.
    pub fn phase(&self) -> Phase {
        match self {
            DispatchError::Callback { phase, .. } => *phase,
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::capability::{Hook, Listener, Notification, Phase, Propagator, Roles};
    pub use crate::component::{Component, ComponentId, ComponentRef};
    pub use crate::dispatch::{notify_all, propagate_to};
    pub use crate::event::{Event, SubscriptionId};
    pub use crate::hierarchy::{DispatchState, Hierarchy, TreeFormat};
    pub use crate::notifications::{DebugEntity, Update};
    pub use crate::DispatchError;
}
