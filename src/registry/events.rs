//! Lifecycle events and transition notifications.

use crate::core::{EntityId, MachineId};
use serde::{Deserialize, Serialize};

/// Which lifecycle hook just ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Enter,
    Update,
    Exit,
}

/// Fired right after a state's hook returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub machine: MachineId,
    pub entity: EntityId,
    pub state: &'static str,
    pub phase: LifecyclePhase,
}

/// Observer of one state's lifecycle events.
pub type LifecycleListener = Box<dyn FnMut(&LifecycleEvent)>;

/// Listeners attached to one discovered state, per phase.
#[derive(Default)]
pub struct StateEvents {
    on_enter: Vec<LifecycleListener>,
    on_update: Vec<LifecycleListener>,
    on_exit: Vec<LifecycleListener>,
}

impl StateEvents {
    fn listeners_mut(&mut self, phase: LifecyclePhase) -> &mut Vec<LifecycleListener> {
        match phase {
            LifecyclePhase::Enter => &mut self.on_enter,
            LifecyclePhase::Update => &mut self.on_update,
            LifecyclePhase::Exit => &mut self.on_exit,
        }
    }

    pub fn subscribe(&mut self, phase: LifecyclePhase, listener: LifecycleListener) {
        self.listeners_mut(phase).push(listener);
    }

    /// Invoke every listener of `event.phase`, in subscription order.
    pub fn emit(&mut self, event: &LifecycleEvent) {
        for listener in self.listeners_mut(event.phase) {
            listener(event);
        }
    }

    pub fn listener_count(&self, phase: LifecyclePhase) -> usize {
        match phase {
            LifecyclePhase::Enter => self.on_enter.len(),
            LifecyclePhase::Update => self.on_update.len(),
            LifecyclePhase::Exit => self.on_exit.len(),
        }
    }
}

impl std::fmt::Debug for StateEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateEvents")
            .field("on_enter", &self.on_enter.len())
            .field("on_update", &self.on_update.len())
            .field("on_exit", &self.on_exit.len())
            .finish()
    }
}

/// Emitted after every successful transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionNotice {
    pub entity: EntityId,
    pub machine: MachineId,
    pub previous: String,
    pub next: String,
}

/// External consumer of transition notices (timeline sync, scripting, ...).
pub trait TransitionSink {
    fn state_entered(&mut self, notice: &TransitionNotice);
}

impl<F> TransitionSink for F
where
    F: FnMut(&TransitionNotice),
{
    fn state_entered(&mut self, notice: &TransitionNotice) {
        self(notice)
    }
}
