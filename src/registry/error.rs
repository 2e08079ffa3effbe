//! Errors raised by the state machine registry.

use crate::core::MachineId;
use thiserror::Error;

/// Errors that can occur while activating or driving state machines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Machine kind '{kind}' is not registered in the state catalog")]
    UnknownMachineKind { kind: String },

    #[error("Machine kind '{kind}' declares no states")]
    NoStates { kind: String },

    #[error("Machine {machine} is already active")]
    AlreadyActive { machine: MachineId },

    #[error("State '{state}' is not part of machine {machine}")]
    StateNotFound { machine: MachineId, state: String },

    #[error("Machine {machine} exceeded {limit} chained transitions")]
    TransitionChainExceeded { machine: MachineId, limit: usize },
}

/// Result alias for registry operations.
pub type Result<T> = std::result::Result<T, StateMachineError>;
