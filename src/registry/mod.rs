//! The state machine registry.
//!
//! [`StateMachineManager`] owns every active machine, keyed by
//! [`MachineId`](crate::core::MachineId) in activation order. It discovers a
//! machine's states from the [`StateCatalog`](crate::catalog::StateCatalog),
//! performs transitions (exit old, enter new, notify) and drives `on_update`
//! once per tick.
//!
//! # Transition Order
//!
//! For a transition from `A` to `B`:
//!
//! 1. `A.on_exit`, then `A`'s exit listeners
//! 2. the current state becomes `B`
//! 3. `B.on_enter`, then `B`'s enter listeners
//! 4. every [`TransitionSink`] receives `("A", "B")`
//! 5. transitions requested by those hooks are applied
//!
//! # Failure Modes
//!
//! - Activating a kind without states, or an unknown kind, fails and
//!   registers nothing.
//! - Activating the same machine twice fails.
//! - `set_state::<S>` fails when the machine has no `S`.
//! - `set_state_by_name` with an unknown name is a no-op.
//! - Queries on a machine that was never activated activate it first.

pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod reference;

pub use config::ManagerConfig;
pub use error::{Result, StateMachineError};
pub use events::{
    LifecycleEvent, LifecycleListener, LifecyclePhase, StateEvents, TransitionNotice,
    TransitionSink,
};
pub use manager::StateMachineManager;
pub use reference::{
    MachineHandle, MachineHeader, MachineOwner, Reference, StateMachineReference, StateReference,
};
