//! Core building blocks of the state machine runtime.
//!
//! This module contains the engine-independent pieces:
//! - The generic arena-backed `Tree` that stores a machine's state hierarchy
//! - The `State` trait and the `StateContext` handed to lifecycle hooks
//! - Identity handles for machines and their owning entities
//! - Bounded transition history

mod history;
mod identity;
mod state;
mod tree;

pub use history::{TransitionHistory, TransitionRecord};
pub use identity::{EntityId, MachineId};
pub use state::{simple_type_name, AsAny, State, StateContext, TransitionRequest};
pub use tree::{Node, NodeId, Tree};
