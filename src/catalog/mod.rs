//! Static registration of state hierarchies.
//!
//! Every machine kind declares, once at startup, the ordered tree of state
//! kinds nested under it. The registry reads this table when a machine is
//! activated and instantiates one state per descriptor.
//!
//! # Example
//!
//! ```rust
//! use statenest::catalog::StateCatalog;
//! use statenest::core::State;
//! use statenest::state_blueprint;
//!
//! #[derive(Debug, Default)]
//! struct Closed;
//! impl State for Closed {}
//!
//! #[derive(Debug, Default)]
//! struct Open;
//! impl State for Open {}
//!
//! let catalog = StateCatalog::builder()
//!     .register(state_blueprint!("Door" => { Closed, Open }))
//!     .build()
//!     .unwrap();
//!
//! assert!(catalog.contains("Door"));
//! ```

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod macros;

pub use builder::CatalogBuilder;
pub use descriptor::{MachineBlueprint, StateDescriptor, StateFactory};
pub use error::CatalogError;

use std::collections::HashMap;

/// Lookup table from machine kind to its declared state hierarchy.
#[derive(Clone, Debug, Default)]
pub struct StateCatalog {
    pub(crate) blueprints: HashMap<String, MachineBlueprint>,
}

impl StateCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn get(&self, kind: &str) -> Option<&MachineBlueprint> {
        self.blueprints.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.blueprints.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
        self.blueprints.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}
