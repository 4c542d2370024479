//! Components and the handles that point at them.
//!
//! A component is any `'static` value implementing [`Component`]. Nothing is
//! required of it: every trait method has a default, and a component opts into
//! behavioral roles (identity, hooks, listeners, propagation) by overriding the
//! relevant methods. Components are shared through [`ComponentRef`], an
//! `Rc`-based handle carrying a stable [`ComponentId`] that serves as the
//! component's identity everywhere in the workspace.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::capability::{Notification, Propagator, Roles};
use crate::hierarchy::Hierarchy;
use crate::DispatchError;

// ---------------------------------------------------------------------------
// ComponentId
// ---------------------------------------------------------------------------

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identifier of a component instance.
///
/// Allocated once when a value is wrapped into a [`ComponentRef`]; every clone
/// of that handle reports the same id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh id. Never returns the same value twice per process.
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId(#{})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A participant in a component tree.
///
/// Role membership is evaluated every time the dispatcher asks for it, so a
/// component may expose different roles for different notification types, or
/// even change them between calls.
pub trait Component: Any {
    /// Identity role. Defaults to the name of the component's own
    /// [`Hierarchy`], if it has one.
    fn name(&self) -> Option<&str> {
        self.hierarchy().map(Hierarchy::name)
    }

    /// Short name of the concrete type, used when no name is available.
    fn kind(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// The child list this component carries, if any.
    fn hierarchy(&self) -> Option<&Hierarchy> {
        None
    }

    /// Propagator role. A component without one is a dispatch leaf, whatever
    /// it holds internally.
    fn propagator(&self) -> Option<&dyn Propagator> {
        self.hierarchy().map(|hierarchy| hierarchy as &dyn Propagator)
    }

    /// Declare listener and hook roles for the notification being delivered.
    ///
    /// ```
    /// use arbor_core::prelude::*;
    ///
    /// struct Ping;
    /// struct Counter(std::cell::Cell<u32>);
    ///
    /// impl Listener<Ping> for Counter {
    ///     fn on_notify(&self, _: &Ping) -> anyhow::Result<()> {
    ///         self.0.set(self.0.get() + 1);
    ///         Ok(())
    ///     }
    /// }
    ///
    /// impl Component for Counter {
    ///     fn roles(&self, roles: &mut Roles<'_>) {
    ///         roles.listener::<Ping>(self);
    ///     }
    /// }
    /// ```
    fn roles(&self, roles: &mut Roles<'_>) {
        let _ = roles;
    }
}

/// Strip the module path (and generic arguments) from a type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// ComponentRef
// ---------------------------------------------------------------------------

/// Shared handle to a component, compared and hashed by [`ComponentId`].
///
/// Wrapping the same `Rc` twice with [`ComponentRef::from_rc`] produces two
/// distinct identities; clone the handle instead when the same component must
/// appear in several places.
#[derive(Clone)]
pub struct ComponentRef {
    id: ComponentId,
    inner: Rc<dyn Component>,
}

impl ComponentRef {
    /// Move `component` behind a new handle.
    pub fn new<C: Component>(component: C) -> Self {
        Self::from_rc(Rc::new(component))
    }

    /// Wrap an already shared component, keeping the caller's typed `Rc`.
    pub fn from_rc<C: Component>(component: Rc<C>) -> Self {
        Self {
            id: ComponentId::next(),
            inner: component,
        }
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Name if the component has the identity role, its type name otherwise.
    pub fn label(&self) -> &str {
        self.inner.name().unwrap_or_else(|| self.inner.kind())
    }

    /// Borrow the concrete component, if it is a `C`.
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        let any: &dyn Any = self.inner.as_ref();
        any.downcast_ref::<C>()
    }

    pub fn downcast_rc<C: Component>(&self) -> Option<Rc<C>> {
        let any: Rc<dyn Any> = self.inner.clone();
        any.downcast::<C>().ok()
    }

    /// Dispatch `value` through this component's propagator.
    ///
    /// Components without the propagator role ignore the call.
    pub fn notify<T: 'static>(&self, value: &T) -> Result<(), DispatchError> {
        match self.inner.propagator() {
            Some(propagator) => propagator.propagate(&Notification::new(value)),
            None => Ok(()),
        }
    }
}

impl Deref for ComponentRef {
    type Target = dyn Component;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentRef {}

impl Hash for ComponentRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef({} {})", self.id, self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
