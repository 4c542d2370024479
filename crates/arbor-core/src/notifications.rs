//! Built-in notification payloads.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::capability::{Listener, Roles};
use crate::component::Component;

/// Per-frame tick, broadcast from the root of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Seconds since the previous update.
    pub delta_time: f64,
}

/// Logs every [`Update`] it receives.
#[derive(Debug, Default)]
pub struct DebugEntity {
    updates: Cell<u64>,
}

impl DebugEntity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of updates received so far.
    pub fn update_count(&self) -> u64 {
        self.updates.get()
    }
}

impl Listener<Update> for DebugEntity {
    fn on_notify(&self, update: &Update) -> anyhow::Result<()> {
        self.updates.set(self.updates.get() + 1);
        info!(delta_time = update.delta_time, "updating");
        Ok(())
    }
}

impl Component for DebugEntity {
    fn roles(&self, roles: &mut Roles<'_>) {
        roles.listener::<Update>(self);
    }
}
