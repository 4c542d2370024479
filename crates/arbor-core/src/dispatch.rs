//! The five-phase broadcast.
//!
//! Each phase walks one snapshot of the target list, taken when the phase
//! starts, and delivers to every target that has the relevant role:
//!
//! 1. [`Phase::PreNotify`]: [`Hook::on_pre_notify`](crate::capability::Hook::on_pre_notify)
//! 2. [`Phase::Notify`]: [`Listener::on_notify`](crate::capability::Listener::on_notify)
//! 3. [`Phase::PostNotify`]: [`Hook::on_post_notify`](crate::capability::Hook::on_post_notify)
//! 4. [`Phase::Propagate`]: [`Propagator::propagate`](crate::capability::Propagator::propagate)
//! 5. [`Phase::PostPropagate`]: [`Hook::on_post_propagate`](crate::capability::Hook::on_post_propagate)
//!
//! The first failing callback stops the broadcast. Its error is wrapped into a
//! [`DispatchError`] once, where it happened, and passed unchanged through
//! every enclosing propagation frame.

use tracing::warn;

use crate::capability::{Notification, Phase, Roles};
use crate::component::ComponentRef;
use crate::DispatchError;

/// Run all five phases over a fixed list of targets.
///
/// Unlike [`Hierarchy::notify`](crate::hierarchy::Hierarchy::notify) there is
/// no reentrancy guard: a composite that forwards to its parts this way is
/// responsible for not forwarding to itself.
pub fn propagate_to(
    notification: &Notification<'_>,
    targets: &[ComponentRef],
) -> Result<(), DispatchError> {
    run_phases(notification, || targets.to_vec())
}

/// Typed convenience wrapper around [`propagate_to`].
pub fn notify_all<T: 'static>(value: &T, targets: &[ComponentRef]) -> Result<(), DispatchError> {
    propagate_to(&Notification::new(value), targets)
}

pub(crate) fn run_phases(
    notification: &Notification<'_>,
    snapshot: impl Fn() -> Vec<ComponentRef>,
) -> Result<(), DispatchError> {
    for phase in Phase::ALL {
        for target in snapshot() {
            deliver(&target, phase, notification)?;
        }
    }
    Ok(())
}

fn deliver(
    target: &ComponentRef,
    phase: Phase,
    notification: &Notification<'_>,
) -> Result<(), DispatchError> {
    if phase == Phase::Propagate {
        return match target.propagator() {
            Some(propagator) => propagator.propagate(notification),
            None => Ok(()),
        };
    }

    let mut roles = Roles::new(phase, *notification);
    target.roles(&mut roles);
    roles.finish().map_err(|source| {
        warn!(
            component = %target.label(),
            component_id = %target.id(),
            %phase,
            notification = notification.type_name(),
            error = %source,
            "callback failed, aborting dispatch"
        );
        DispatchError::Callback {
            component: target.label().to_owned(),
            component_id: target.id(),
            phase,
            notification: notification.type_name(),
            source,
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
