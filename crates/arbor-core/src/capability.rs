//! Capability roles a component may take on during dispatch.
//!
//! Listener and hook roles are generic over the notification type, so they
//! cannot be asked for through a trait object directly. Instead the dispatcher
//! hands each component a [`Roles`] request bound to one phase and one
//! notification, and the component declares which typed roles it has. A
//! declaration whose type matches the notification and whose role matches the
//! phase is invoked on the spot; every other declaration is ignored.

use std::any::Any;
use std::fmt;

use crate::DispatchError;

// ---------------------------------------------------------------------------
// Role traits
// ---------------------------------------------------------------------------

/// Primary handler for notifications of type `T`.
pub trait Listener<T> {
    fn on_notify(&self, notification: &T) -> anyhow::Result<()>;
}

/// Observer running around the handle and propagate phases for `T`.
pub trait Hook<T> {
    fn on_pre_notify(&self, notification: &T) -> anyhow::Result<()> {
        let _ = notification;
        Ok(())
    }

    fn on_post_notify(&self, notification: &T) -> anyhow::Result<()> {
        let _ = notification;
        Ok(())
    }

    /// Runs after every propagator in the same child list has finished.
    fn on_post_propagate(&self, notification: &T) -> anyhow::Result<()> {
        let _ = notification;
        Ok(())
    }
}

/// Something that can dispatch a notification further down the tree.
///
/// Implemented by [`Hierarchy`](crate::hierarchy::Hierarchy); composite
/// components that forward to a fixed set of parts can implement it with
/// [`propagate_to`](crate::dispatch::propagate_to).
pub trait Propagator {
    fn propagate(&self, notification: &Notification<'_>) -> Result<(), DispatchError>;
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The five dispatch phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreNotify,
    Notify,
    PostNotify,
    Propagate,
    PostPropagate,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::PreNotify,
        Phase::Notify,
        Phase::PostNotify,
        Phase::Propagate,
        Phase::PostPropagate,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::PreNotify => "pre-notify",
            Phase::Notify => "notify",
            Phase::PostNotify => "post-notify",
            Phase::Propagate => "propagate",
            Phase::PostPropagate => "post-propagate",
        })
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A type-erased borrow of a notification payload.
#[derive(Clone, Copy)]
pub struct Notification<'a> {
    value: &'a dyn Any,
    type_name: &'static str,
}

impl<'a> Notification<'a> {
    /// Erase `value`, remembering its type name.
    pub fn new<T: 'static>(value: &'a T) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The payload, if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Full type name of the payload, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Notification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notification({})", self.type_name)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Role request for one component, one phase and one notification.
///
/// Once a callback fails, later declarations are skipped and the error is
/// handed back to the dispatcher.
pub struct Roles<'n> {
    phase: Phase,
    notification: Notification<'n>,
    invoked: usize,
    outcome: anyhow::Result<()>,
}

impl<'n> Roles<'n> {
    pub(crate) fn new(phase: Phase, notification: Notification<'n>) -> Self {
        Self {
            phase,
            notification,
            invoked: 0,
            outcome: Ok(()),
        }
    }

    /// Phase being delivered.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notification(&self) -> Notification<'n> {
        self.notification
    }

    /// Declare the listener role for `T`.
    pub fn listener<T: 'static>(&mut self, listener: &dyn Listener<T>) -> &mut Self {
        if self.phase != Phase::Notify || self.outcome.is_err() {
            return self;
        }
        if let Some(value) = self.notification.downcast_ref::<T>() {
            self.invoked += 1;
            self.outcome = listener.on_notify(value);
        }
        self
    }

    /// Declare the hook role for `T`.
    pub fn hook<T: 'static>(&mut self, hook: &dyn Hook<T>) -> &mut Self {
        if self.outcome.is_err() {
            return self;
        }
        let Some(value) = self.notification.downcast_ref::<T>() else {
            return self;
        };
        let result = match self.phase {
            Phase::PreNotify => hook.on_pre_notify(value),
            Phase::PostNotify => hook.on_post_notify(value),
            Phase::PostPropagate => hook.on_post_propagate(value),
            Phase::Notify | Phase::Propagate => return self,
        };
        self.invoked += 1;
        self.outcome = result;
        self
    }

    /// Number of callbacks this request has run so far.
    pub fn invoked(&self) -> usize {
        self.invoked
    }

    pub(crate) fn finish(self) -> anyhow::Result<()> {
        self.outcome
    }
}

impl fmt::Debug for Roles<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Roles")
            .field("phase", &self.phase)
            .field("notification", &self.notification)
            .field("invoked", &self.invoked)
            .field("failed", &self.outcome.is_err())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
