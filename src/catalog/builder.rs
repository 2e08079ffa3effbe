//! Builder for constructing state catalogs.

use crate::catalog::descriptor::MachineBlueprint;
use crate::catalog::error::CatalogError;
use crate::catalog::StateCatalog;
use std::collections::{HashMap, HashSet};

/// Builder for constructing a [`StateCatalog`] with a fluent API.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    blueprints: Vec<MachineBlueprint>,
}

impl CatalogBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the state hierarchy of one machine kind.
    pub fn register(mut self, blueprint: MachineBlueprint) -> Self {
        self.blueprints.push(blueprint);
        self
    }

    /// Register several blueprints at once.
    pub fn register_all(mut self, blueprints: impl IntoIterator<Item = MachineBlueprint>) -> Self {
        self.blueprints.extend(blueprints);
        self
    }

    /// Build the catalog.
    ///
    /// Returns an error if a kind is registered twice or if one state type is
    /// nested more than once inside the same kind. A kind without states is
    /// accepted here and rejected when a machine of that kind is activated.
    pub fn build(self) -> Result<StateCatalog, CatalogError> {
        let mut blueprints = HashMap::with_capacity(self.blueprints.len());

        for blueprint in self.blueprints {
            let mut seen = HashSet::new();
            for descriptor in blueprint.descriptors() {
                if !seen.insert(descriptor.type_id()) {
                    return Err(CatalogError::DuplicateStateType {
                        kind: blueprint.kind().to_string(),
                        state: descriptor.name().to_string(),
                    });
                }
            }

            let kind = blueprint.kind().to_string();
            if blueprints.contains_key(&kind) {
                return Err(CatalogError::DuplicateMachineKind { kind });
            }
            blueprints.insert(kind, blueprint);
        }

        Ok(StateCatalog { blueprints })
    }
}
