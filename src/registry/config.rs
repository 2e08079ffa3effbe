//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Tunables of a [`StateMachineManager`](crate::registry::StateMachineManager).
///
/// Missing fields fall back to their defaults when deserializing.
///
/// # Example
///
/// ```rust
/// use statenest::registry::ManagerConfig;
///
/// let config = ManagerConfig::from_json(r#"{ "history_limit": 8 }"#).unwrap();
/// assert_eq!(config.history_limit, 8);
/// assert_eq!(config.max_chained_transitions, 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Transitions kept per machine. Zero disables history.
    pub history_limit: usize,

    /// Transitions a hook may chain before the manager gives up.
    pub max_chained_transitions: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            history_limit: 32,
            max_chained_transitions: 16,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_max_chained_transitions(mut self, limit: usize) -> Self {
        self.max_chained_transitions = limit;
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
