//! State descriptors and machine blueprints.

use crate::core::{simple_type_name, State};
use std::any::TypeId;

/// Default-constructs one state instance.
pub type StateFactory = fn() -> Box<dyn State>;

fn construct<S: State + Default>() -> Box<dyn State> {
    Box::new(S::default())
}

/// Describes one state kind and the state kinds nested under it.
#[derive(Clone, Debug)]
pub struct StateDescriptor {
    name: &'static str,
    type_id: TypeId,
    factory: StateFactory,
    children: Vec<StateDescriptor>,
}

impl StateDescriptor {
    /// Descriptor for `S`, named after its unqualified type name.
    pub fn of<S: State + Default>() -> Self {
        Self {
            name: simple_type_name::<S>(),
            type_id: TypeId::of::<S>(),
            factory: construct::<S>,
            children: Vec::new(),
        }
    }

    /// Override the lookup name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_child(mut self, child: StateDescriptor) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<StateDescriptor>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn children(&self) -> &[StateDescriptor] {
        &self.children
    }

    /// Build a fresh instance of the state.
    pub fn instantiate(&self) -> Box<dyn State> {
        (self.factory)()
    }

    /// This descriptor plus all nested ones.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(StateDescriptor::count).sum::<usize>()
    }

    pub(crate) fn visit<'a>(&'a self, out: &mut Vec<&'a StateDescriptor>) {
        out.push(self);
        for child in &self.children {
            child.visit(out);
        }
    }
}

/// The ordered state hierarchy declared for one machine kind.
///
/// # Example
///
/// ```rust
/// use statenest::catalog::{MachineBlueprint, StateDescriptor};
/// use statenest::core::State;
///
/// #[derive(Debug, Default)]
/// struct Idle;
/// impl State for Idle {}
///
/// #[derive(Debug, Default)]
/// struct Combat;
/// impl State for Combat {}
///
/// #[derive(Debug, Default)]
/// struct Aim;
/// impl State for Aim {}
///
/// let blueprint = MachineBlueprint::new("Guard")
///     .with_state(StateDescriptor::of::<Idle>())
///     .with_state(StateDescriptor::of::<Combat>().with_child(StateDescriptor::of::<Aim>()));
///
/// assert_eq!(blueprint.state_count(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct MachineBlueprint {
    kind: String,
    states: Vec<StateDescriptor>,
}

impl MachineBlueprint {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            states: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: StateDescriptor) -> Self {
        self.states.push(state);
        self
    }

    pub fn with_states(mut self, states: Vec<StateDescriptor>) -> Self {
        self.states.extend(states);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Top-level states, in declaration order.
    pub fn states(&self) -> &[StateDescriptor] {
        &self.states
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_count(&self) -> usize {
        self.states.iter().map(StateDescriptor::count).sum()
    }

    pub(crate) fn descriptors(&self) -> Vec<&StateDescriptor> {
        let mut out = Vec::with_capacity(self.state_count());
        for state in &self.states {
            state.visit(&mut out);
        }
        out
    }
}
