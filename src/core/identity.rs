//! Identity handles shared by the tree, the states and the registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of one state machine instance.
///
/// Used as the registry key. An owning entity may host several machines,
/// each with its own `MachineId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MachineId(Uuid);

impl MachineId {
    /// Create a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a deterministic identity, mostly useful in tests and tools.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MachineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle of the entity that owns one or more machines.
///
/// The host decides what the number means (an ECS entity, an object slot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}
