//! Statenest: a hierarchical state machine registry
//!
//! Statenest keeps, for every active machine, a tree of nested states and a
//! pointer to the current one. State hierarchies are declared once per
//! machine kind in a [`StateCatalog`](catalog::StateCatalog); the
//! [`StateMachineManager`](registry::StateMachineManager) instantiates them on
//! activation, runs transitions and ticks the current state of every machine.
//!
//! # Core Concepts
//!
//! - **State**: a behavior mode with `on_enter`/`on_update`/`on_exit` hooks
//! - **Tree**: the generic arena tree storing a machine's state hierarchy
//! - **Catalog**: the static table of machine kinds and their nested states
//! - **Manager**: the registry that activates, transitions and ticks machines
//!
//! # Example
//!
//! ```rust
//! use statenest::catalog::StateCatalog;
//! use statenest::core::{EntityId, State, StateContext};
//! use statenest::registry::{MachineHandle, StateMachineManager};
//! use statenest::state_blueprint;
//!
//! #[derive(Debug, Default)]
//! struct Idle;
//! impl State for Idle {}
//!
//! #[derive(Debug, Default)]
//! struct Patrol {
//!     laps: u32,
//! }
//!
//! impl State for Patrol {
//!     fn on_update(&mut self, ctx: &mut StateContext<'_>) {
//!         self.laps += 1;
//!         if self.laps == 2 {
//!             ctx.set_state::<Idle>();
//!         }
//!     }
//! }
//!
//! let catalog = StateCatalog::builder()
//!     .register(state_blueprint!("Guard" => { Idle, Patrol }))
//!     .build()
//!     .unwrap();
//! let mut manager = StateMachineManager::new(catalog);
//! let guard = MachineHandle::new("Guard", EntityId(1));
//!
//! // Queries activate the machine on first use.
//! assert_eq!(manager.current_state_name(&guard).unwrap(), "Idle");
//!
//! manager.set_state::<Patrol>(&guard).unwrap();
//! manager.update().unwrap();
//! manager.update().unwrap();
//! assert_eq!(manager.current_state_name(&guard).unwrap(), "Idle");
//! ```

pub mod catalog;
pub mod core;
pub mod registry;

// Re-export commonly used types
pub use crate::catalog::{MachineBlueprint, StateCatalog, StateDescriptor};
pub use crate::core::{EntityId, MachineId, State, StateContext, Tree};
pub use crate::registry::{MachineOwner, StateMachineError, StateMachineManager};
