//! Errors raised while building a state catalog.

use thiserror::Error;

/// Errors that can occur when registering machine blueprints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Machine kind '{kind}' is registered twice")]
    DuplicateMachineKind { kind: String },

    #[error("State '{state}' appears more than once in machine kind '{kind}'")]
    DuplicateStateType { kind: String, state: String },
}
