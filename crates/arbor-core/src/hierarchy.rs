//! Ordered child lists and the dispatch entry point.
//!
//! A [`Hierarchy`] is the piece of state a component embeds to become a tree
//! node: an ordered list of [`ComponentRef`] children, a name, and a dispatch
//! flag. All methods take `&self` so that callbacks running inside a dispatch
//! can still reshape the tree.
//!
//! # Reentrancy
//!
//! While a hierarchy is dispatching, any further [`Hierarchy::notify`] on that
//! same instance returns immediately without running a phase, whatever the
//! notification type. The flag is per instance, not per type, so a `B`
//! notification sent from inside the dispatch of an `A` notification on the
//! same node is dropped as well.
//!
//! # Example
//!
//! ```
//! use arbor_core::prelude::*;
//!
//! let root = Hierarchy::new("root");
//! let group = ComponentRef::new(Hierarchy::new("group"));
//! root.add_child(group.clone());
//! group.hierarchy().unwrap().add_child(ComponentRef::new(Hierarchy::new("leaf")));
//!
//! root.notify(&Update { delta_time: 0.016 }).unwrap();
//! assert_eq!(root.tree_string(), "root\n\u{2514} group\n  \u{2514} leaf\n");
//! ```

use std::cell::{Cell, RefCell};
use std::fmt::{self, Write as _};

use tracing::{debug, trace};

use crate::capability::{Notification, Propagator};
use crate::component::{short_type_name, Component, ComponentRef};
use crate::dispatch;
use crate::event::Event;
use crate::DispatchError;

// ---------------------------------------------------------------------------
// DispatchState
// ---------------------------------------------------------------------------

/// Whether a [`Hierarchy`] is currently delivering a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// A `notify` is in progress; further `notify` calls on the same
    /// hierarchy are dropped until it returns.
    Dispatching,
}

/// Holds a hierarchy in [`DispatchState::Dispatching`] and returns it to
/// [`DispatchState::Idle`] on drop, including on error and unwind.
struct DispatchGuard<'a> {
    state: &'a Cell<DispatchState>,
}

impl<'a> DispatchGuard<'a> {
    fn enter(state: &'a Cell<DispatchState>) -> Option<Self> {
        if state.get() == DispatchState::Dispatching {
            return None;
        }
        state.set(DispatchState::Dispatching);
        Some(Self { state })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.state.set(DispatchState::Idle);
    }
}

// ---------------------------------------------------------------------------
// TreeFormat
// ---------------------------------------------------------------------------

/// Layout of the debug tree dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFormat {
    /// Written `depth - 1` times before the connector.
    pub indent: String,
    /// Written once before the name of every node below the root.
    pub connector: String,
}

impl Default for TreeFormat {
    /// Two spaces of indent and a `"└ "` connector.
    fn default() -> Self {
        Self {
            indent: "  ".to_owned(),
            connector: "\u{2514} ".to_owned(),
        }
    }
}

impl TreeFormat {
    fn write_line(&self, out: &mut dyn fmt::Write, depth: usize, name: &str) -> fmt::Result {
        if depth > 0 {
            for _ in 1..depth {
                out.write_str(&self.indent)?;
            }
            out.write_str(&self.connector)?;
        }
        out.write_str(name)?;
        out.write_char('\n')
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// An ordered list of child components that relays notifications to them.
///
/// Children are held by [`ComponentRef`] and may repeat. Every method takes
/// `&self`, so callbacks running during [`Hierarchy::notify`] can add and
/// remove children; the change is seen from the next phase on.
pub struct Hierarchy {
    name: String,
    children: RefCell<Vec<ComponentRef>>,
    state: Cell<DispatchState>,
    child_added: Event<ComponentRef>,
    child_removed: Event<ComponentRef>,
}

impl Hierarchy {
    /// An empty, idle hierarchy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: RefCell::new(Vec::new()),
            state: Cell::new(DispatchState::Idle),
            child_added: Event::new(),
            child_removed: Event::new(),
        }
    }

    /// A hierarchy named after the short name of `C`, the conventional name
    /// for a component that has nothing better.
    pub fn named_after<C: ?Sized>() -> Self {
        Self::new(short_type_name(std::any::type_name::<C>()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// [`DispatchState::Dispatching`] while a `notify` call is running.
    pub fn state(&self) -> DispatchState {
        self.state.get()
    }

    /// Shorthand for `state() == DispatchState::Dispatching`.
    pub fn is_dispatching(&self) -> bool {
        self.state.get() == DispatchState::Dispatching
    }

    // -- children -----------------------------------------------------------

    /// Append `child`. Duplicates are allowed.
    pub fn add_child(&self, child: ComponentRef) {
        trace!(hierarchy = %self.name, child = ?child, "add child");
        self.children.borrow_mut().push(child.clone());
        self.child_added.emit(&child);
    }

    /// Remove the first occurrence of `child`, comparing by identity.
    ///
    /// Returns `false`, without firing [`Hierarchy::child_removed`], when
    /// `child` is not in the list.
    pub fn remove_child(&self, child: &ComponentRef) -> bool {
        let removed = {
            let mut children = self.children.borrow_mut();
            children
                .iter()
                .position(|existing| existing == child)
                .map(|index| children.remove(index))
        };
        match removed {
            Some(removed) => {
                trace!(hierarchy = %self.name, child = ?removed, "remove child");
                self.child_removed.emit(&removed);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the children in insertion order.
    pub fn children(&self) -> Vec<ComponentRef> {
        self.children.borrow().clone()
    }

    /// Whether `child` (by id) appears at least once.
    pub fn contains(&self, child: &ComponentRef) -> bool {
        self.children.borrow().iter().any(|existing| existing == child)
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    /// Fired after a child has been appended.
    pub fn child_added(&self) -> &Event<ComponentRef> {
        &self.child_added
    }

    /// Fired after a child has been removed.
    pub fn child_removed(&self) -> &Event<ComponentRef> {
        &self.child_removed
    }

    // -- dispatch -----------------------------------------------------------

    /// Broadcast `value` to the children in five phases.
    ///
    /// A call made while this hierarchy is already dispatching does nothing
    /// and returns `Ok(())`.
    pub fn notify<T: 'static>(&self, value: &T) -> Result<(), DispatchError> {
        self.dispatch(&Notification::new(value))
    }

    /// Type-erased form of [`Hierarchy::notify`].
    pub fn dispatch(&self, notification: &Notification<'_>) -> Result<(), DispatchError> {
        let Some(_guard) = DispatchGuard::enter(&self.state) else {
            debug!(
                hierarchy = %self.name,
                notification = notification.type_name(),
                "suppressed re-entrant notify"
            );
            return Ok(());
        };

        trace!(
            hierarchy = %self.name,
            notification = notification.type_name(),
            children = self.len(),
            "dispatch"
        );
        dispatch::run_phases(notification, || self.children())
    }

    // -- debug dump ---------------------------------------------------------

    /// Write the subtree rooted here, one line per node, depth first.
    pub fn write_tree(&self, out: &mut dyn fmt::Write, depth: usize) -> fmt::Result {
        self.write_tree_with(&TreeFormat::default(), out, depth)
    }

    /// [`Hierarchy::write_tree`] with a custom layout.
    ///
    /// This hierarchy is printed under its own name and every child under
    /// its [`ComponentRef::label`], so a component that wraps a hierarchy
    /// and names itself shows up under that name.
    pub fn write_tree_with(
        &self,
        format: &TreeFormat,
        out: &mut dyn fmt::Write,
        depth: usize,
    ) -> fmt::Result {
        self.write_subtree(format, out, depth, &self.name)
    }

    fn write_subtree(
        &self,
        format: &TreeFormat,
        out: &mut dyn fmt::Write,
        depth: usize,
        name: &str,
    ) -> fmt::Result {
        format.write_line(out, depth, name)?;
        for child in self.children() {
            match child.hierarchy() {
                Some(hierarchy) => {
                    hierarchy.write_subtree(format, out, depth + 1, child.label())?
                }
                None => format.write_line(out, depth + 1, child.label())?,
            }
        }
        Ok(())
    }

    /// The default-format dump as a `String`, starting at depth 0.
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tree(&mut out, 0);
        out
    }

    /// Print the subtree to stdout, starting at `depth`.
    pub fn print_tree(&self, depth: usize) {
        let mut out = String::new();
        let _ = self.write_tree(&mut out, depth);
        print!("{out}");
    }
}

impl Propagator for Hierarchy {
    fn propagate(&self, notification: &Notification<'_>) -> Result<(), DispatchError> {
        self.dispatch(notification)
    }
}

impl Component for Hierarchy {
    fn hierarchy(&self) -> Option<&Hierarchy> {
        Some(self)
    }
}

impl fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierarchy")
            .field("name", &self.name)
            .field("children", &self.children.borrow())
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
