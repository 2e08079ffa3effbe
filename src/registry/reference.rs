//! Wrapper records tying discovered states to their machine.
//!
//! A machine's hierarchy is stored as a `Tree<Reference>`: the root holds a
//! [`MachineHeader`], every other node a [`StateReference`] owning one live
//! state instance.

use crate::catalog::StateDescriptor;
use crate::core::{
    EntityId, MachineId, NodeId, State, StateContext, TransitionHistory, TransitionRequest, Tree,
};
use crate::registry::events::{LifecycleEvent, LifecycleListener, LifecyclePhase, StateEvents};
use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// What the registry needs to know about whoever owns a machine.
///
/// Entity liveness is not part of this trait; the manager tracks it per
/// entity through `StateMachineManager::set_entity_active`.
pub trait MachineOwner {
    /// Stable registry key of this machine.
    fn machine_id(&self) -> MachineId;

    /// Entity hosting the machine, used for liveness and entity fan-out.
    fn entity(&self) -> EntityId;

    /// Machine kind, looked up in the state catalog.
    fn kind(&self) -> &str;

    /// Data shared with every state hook through [`StateContext::context`].
    fn context(&self) -> Rc<dyn Any> {
        Rc::new(())
    }
}

/// Ready-made [`MachineOwner`] for hosts without their own owner type.
#[derive(Clone)]
pub struct MachineHandle {
    id: MachineId,
    entity: EntityId,
    kind: String,
    context: Rc<dyn Any>,
}

impl MachineHandle {
    pub fn new(kind: impl Into<String>, entity: EntityId) -> Self {
        Self {
            id: MachineId::new(),
            entity,
            kind: kind.into(),
            context: Rc::new(()),
        }
    }

    pub fn with_id(mut self, id: MachineId) -> Self {
        self.id = id;
        self
    }

    pub fn with_context(mut self, context: Rc<dyn Any>) -> Self {
        self.context = context;
        self
    }
}

impl MachineOwner for MachineHandle {
    fn machine_id(&self) -> MachineId {
        self.id
    }

    fn entity(&self) -> EntityId {
        self.entity
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn context(&self) -> Rc<dyn Any> {
        Rc::clone(&self.context)
    }
}

impl fmt::Debug for MachineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineHandle")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Root payload of a machine's tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineHeader {
    pub machine: MachineId,
    pub kind: String,
}

/// A discovered state together with its live instance.
pub struct StateReference {
    machine: MachineId,
    state_type: TypeId,
    state_name: &'static str,
    state: Box<dyn State>,
    events: StateEvents,
}

impl StateReference {
    pub(crate) fn discover(machine: MachineId, descriptor: &StateDescriptor) -> Self {
        Self {
            machine,
            state_type: descriptor.type_id(),
            state_name: descriptor.name(),
            state: descriptor.instantiate(),
            events: StateEvents::default(),
        }
    }

    pub fn machine(&self) -> MachineId {
        self.machine
    }

    pub fn state_type(&self) -> TypeId {
        self.state_type
    }

    pub fn state_name(&self) -> &'static str {
        self.state_name
    }

    pub fn state(&self) -> &dyn State {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> &mut dyn State {
        self.state.as_mut()
    }

    pub fn events(&self) -> &StateEvents {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut StateEvents {
        &mut self.events
    }
}

impl fmt::Debug for StateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateReference")
            .field("machine", &self.machine)
            .field("state_name", &self.state_name)
            .field("state", &self.state)
            .field("events", &self.events)
            .finish()
    }
}

/// Payload of a machine tree node.
#[derive(Debug)]
pub enum Reference {
    Machine(MachineHeader),
    State(StateReference),
}

impl Reference {
    pub fn machine(&self) -> MachineId {
        match self {
            Self::Machine(header) => header.machine,
            Self::State(state) => state.machine,
        }
    }

    pub fn state_type(&self) -> Option<TypeId> {
        self.as_state().map(StateReference::state_type)
    }

    pub fn as_state(&self) -> Option<&StateReference> {
        match self {
            Self::State(state) => Some(state),
            Self::Machine(_) => None,
        }
    }

    pub fn as_state_mut(&mut self) -> Option<&mut StateReference> {
        match self {
            Self::State(state) => Some(state),
            Self::Machine(_) => None,
        }
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Machine(a), Self::Machine(b)) => a == b,
            (Self::State(a), Self::State(b)) => {
                a.machine == b.machine && a.state_type == b.state_type
            }
            _ => false,
        }
    }
}

/// One active machine: its state tree and current state.
pub struct StateMachineReference {
    machine: MachineId,
    entity: EntityId,
    kind: String,
    pub(crate) current: NodeId,
    tree: Tree<Reference>,
    pub(crate) history: TransitionHistory,
    context: Rc<dyn Any>,
}

impl StateMachineReference {
    /// Build the tree for `owner`'s declared states. `None` when the
    /// blueprint holds no state at all.
    pub(crate) fn discover(
        owner: &dyn MachineOwner,
        states: &[StateDescriptor],
        history_limit: usize,
    ) -> Option<Self> {
        let machine = owner.machine_id();
        let mut tree = Tree::new(Reference::Machine(MachineHeader {
            machine,
            kind: owner.kind().to_string(),
        }));
        let root = tree.root();
        attach_states(&mut tree, root, machine, states);

        let current = tree.flatten().first().copied()?;
        Some(Self {
            machine,
            entity: owner.entity(),
            kind: owner.kind().to_string(),
            current,
            tree,
            history: TransitionHistory::new(history_limit),
            context: owner.context(),
        })
    }

    pub fn machine(&self) -> MachineId {
        self.machine
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn state_tree(&self) -> &Tree<Reference> {
        &self.tree
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    pub fn current_node(&self) -> NodeId {
        self.current
    }

    pub fn current_state(&self) -> Option<&StateReference> {
        self.state_at(self.current)
    }

    pub fn current_state_name(&self) -> &'static str {
        self.current_state()
            .map(StateReference::state_name)
            .unwrap_or_default()
    }

    pub fn state_at(&self, node: NodeId) -> Option<&StateReference> {
        self.tree.value(node).and_then(Reference::as_state)
    }

    pub(crate) fn state_at_mut(&mut self, node: NodeId) -> Option<&mut StateReference> {
        self.tree.value_mut(node).and_then(Reference::as_state_mut)
    }

    /// Every discovered state, in flatten order.
    pub fn states(&self) -> Vec<&StateReference> {
        self.tree
            .flatten_values()
            .into_iter()
            .filter_map(Reference::as_state)
            .collect()
    }

    /// Names from the top-level state down to the current one.
    pub fn current_path(&self) -> Vec<&'static str> {
        let mut path: Vec<_> = self
            .tree
            .ancestors(self.current)
            .filter_map(|node| self.state_at(node))
            .map(StateReference::state_name)
            .collect();
        path.reverse();
        path.push(self.current_state_name());
        path
    }

    pub fn find_by_type(&self, state_type: TypeId) -> Option<NodeId> {
        self.find(|state| state.state_type == state_type)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find(|state| state.state_name == name)
    }

    /// Attach `listener` to the state called `state`. `false` if there is none.
    pub(crate) fn subscribe(
        &mut self,
        state: &str,
        phase: LifecyclePhase,
        listener: LifecycleListener,
    ) -> bool {
        match self
            .find_by_name(state)
            .and_then(|node| self.state_at_mut(node))
        {
            Some(target) => {
                target.events_mut().subscribe(phase, listener);
                true
            }
            None => false,
        }
    }

    pub(crate) fn resolve(&self, request: &TransitionRequest) -> Option<NodeId> {
        match request {
            TransitionRequest::ByType { type_id, .. } => self.find_by_type(*type_id),
            TransitionRequest::ByName(name) => self.find_by_name(name),
        }
    }

    fn find(&self, predicate: impl Fn(&StateReference) -> bool) -> Option<NodeId> {
        self.tree
            .flatten()
            .into_iter()
            .find(|&node| self.state_at(node).is_some_and(&predicate))
    }

    /// Run one hook of the state at `node`, then its listeners.
    pub(crate) fn run_hook(
        &mut self,
        node: NodeId,
        phase: LifecyclePhase,
        pending: &mut Option<TransitionRequest>,
    ) {
        let (machine, entity) = (self.machine, self.entity);
        let Some(Reference::State(reference)) = self.tree.value_mut(node) else {
            return;
        };

        let mut ctx = StateContext::new(
            machine,
            entity,
            reference.state_name,
            self.context.as_ref(),
            pending,
        );
        match phase {
            LifecyclePhase::Enter => reference.state.on_enter(&mut ctx),
            LifecyclePhase::Update => reference.state.on_update(&mut ctx),
            LifecyclePhase::Exit => reference.state.on_exit(&mut ctx),
        }

        reference.events.emit(&LifecycleEvent {
            machine,
            entity,
            state: reference.state_name,
            phase,
        });
    }
}

impl fmt::Debug for StateMachineReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachineReference")
            .field("machine", &self.machine)
            .field("entity", &self.entity)
            .field("kind", &self.kind)
            .field("current", &self.current_state_name())
            .field("states", &self.tree.len().saturating_sub(1))
            .finish_non_exhaustive()
    }
}

fn attach_states(
    tree: &mut Tree<Reference>,
    parent: NodeId,
    machine: MachineId,
    descriptors: &[StateDescriptor],
) {
    for descriptor in descriptors {
        let reference = Reference::State(StateReference::discover(machine, descriptor));
        if let Some(node) = tree.add_child(parent, reference) {
            attach_states(tree, node, machine, descriptor.children());
        }
    }
}
