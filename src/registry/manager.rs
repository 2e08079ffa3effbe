//! Central registry that activates, transitions and ticks state machines.

use crate::catalog::StateCatalog;
use crate::core::{
    simple_type_name, EntityId, MachineId, NodeId, State, TransitionHistory, TransitionRecord,
    TransitionRequest,
};
use crate::registry::config::ManagerConfig;
use crate::registry::error::{Result, StateMachineError};
use crate::registry::events::{
    LifecycleEvent, LifecycleListener, LifecyclePhase, TransitionNotice, TransitionSink,
};
use crate::registry::reference::{MachineOwner, StateMachineReference, StateReference};
use indexmap::IndexMap;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Registry mapping machine identities to their live state trees.
///
/// Single-threaded: every call runs to completion before returning. Hooks
/// may request further transitions through their context; those run right
/// after the transition (or tick) that triggered them.
pub struct StateMachineManager {
    catalog: StateCatalog,
    config: ManagerConfig,
    machines: IndexMap<MachineId, StateMachineReference>,
    inactive_entities: HashSet<EntityId>,
    sinks: Vec<Box<dyn TransitionSink>>,
    held_listeners: HashMap<MachineId, Vec<HeldListener>>,
    tick: u64,
}

/// Listener registered for a machine that is not active yet.
struct HeldListener {
    state: String,
    phase: LifecyclePhase,
    listener: LifecycleListener,
}

impl StateMachineManager {
    pub fn new(catalog: StateCatalog) -> Self {
        Self::with_config(catalog, ManagerConfig::default())
    }

    pub fn with_config(catalog: StateCatalog, config: ManagerConfig) -> Self {
        Self {
            catalog,
            config,
            machines: IndexMap::new(),
            inactive_entities: HashSet::new(),
            sinks: Vec::new(),
            held_listeners: HashMap::new(),
            tick: 0,
        }
    }

    pub fn catalog(&self) -> &StateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Register a consumer of transition notices.
    pub fn add_sink(&mut self, sink: impl TransitionSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Number of completed `update` calls.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn contains(&self, machine: MachineId) -> bool {
        self.machines.contains_key(&machine)
    }

    /// Look up an active machine without activating anything.
    pub fn reference(&self, machine: MachineId) -> Option<&StateMachineReference> {
        self.machines.get(&machine)
    }

    /// Active machines in activation order.
    pub fn machines(&self) -> impl Iterator<Item = &StateMachineReference> + '_ {
        self.machines.values()
    }

    pub fn history(&self, machine: MachineId) -> Option<&TransitionHistory> {
        self.machines.get(&machine).map(StateMachineReference::history)
    }

    /// Discover `owner`'s states, register the machine and enter its first
    /// state.
    ///
    /// Fails if the machine is already registered, if its kind is unknown or
    /// if the kind declares no states. Nothing is registered on failure.
    pub fn activate(&mut self, owner: &dyn MachineOwner) -> Result<&StateMachineReference> {
        let index = self.activate_index(owner)?;
        Ok(&self.machines[index])
    }

    fn activate_index(&mut self, owner: &dyn MachineOwner) -> Result<usize> {
        let machine = owner.machine_id();
        if self.machines.contains_key(&machine) {
            warn!(%machine, "machine activated twice");
            return Err(StateMachineError::AlreadyActive { machine });
        }

        let kind = owner.kind();
        let blueprint = self.catalog.get(kind).ok_or_else(|| {
            warn!(%machine, kind, "unknown machine kind");
            StateMachineError::UnknownMachineKind {
                kind: kind.to_string(),
            }
        })?;
        let reference =
            StateMachineReference::discover(owner, blueprint.states(), self.config.history_limit)
                .ok_or_else(|| {
                    warn!(%machine, kind, "machine kind declares no states");
                    StateMachineError::NoStates {
                        kind: kind.to_string(),
                    }
                })?;

        let held = self.held_listeners.remove(&machine).unwrap_or_default();
        let (index, _) = self.machines.insert_full(machine, reference);
        let mut pending = None;
        let reference = &mut self.machines[index];
        for held in held {
            if !reference.subscribe(&held.state, held.phase, held.listener) {
                debug!(%machine, state = %held.state, "dropping listener for unknown state");
            }
        }
        let initial = reference.current;
        debug!(
            %machine,
            entity = %reference.entity(),
            kind,
            state = reference.current_state_name(),
            "machine activated"
        );
        reference.run_hook(initial, LifecyclePhase::Enter, &mut pending);

        self.drain(index, pending)?;
        Ok(index)
    }

    fn ensure_active(&mut self, owner: &dyn MachineOwner) -> Result<usize> {
        match self.machines.get_index_of(&owner.machine_id()) {
            Some(index) => Ok(index),
            None => self.activate_index(owner),
        }
    }

    /// The machine's reference, activating it first if needed.
    pub fn get_state_machine_reference(
        &mut self,
        owner: &dyn MachineOwner,
    ) -> Result<&StateMachineReference> {
        let index = self.ensure_active(owner)?;
        Ok(&self.machines[index])
    }

    pub fn current_state(&mut self, owner: &dyn MachineOwner) -> Result<&dyn State> {
        let index = self.ensure_active(owner)?;
        let reference = &self.machines[index];
        reference
            .current_state()
            .map(StateReference::state)
            .ok_or_else(|| StateMachineError::StateNotFound {
                machine: reference.machine(),
                state: reference.current_node().to_string(),
            })
    }

    pub fn current_state_name(&mut self, owner: &dyn MachineOwner) -> Result<&'static str> {
        let index = self.ensure_active(owner)?;
        Ok(self.machines[index].current_state_name())
    }

    /// Names from the top-level state down to the current one.
    pub fn current_state_path(&mut self, owner: &dyn MachineOwner) -> Result<Vec<&'static str>> {
        let index = self.ensure_active(owner)?;
        Ok(self.machines[index].current_path())
    }

    /// Every discovered state of the machine, in flatten order.
    pub fn state_references(&mut self, owner: &dyn MachineOwner) -> Result<Vec<&StateReference>> {
        let index = self.ensure_active(owner)?;
        Ok(self.machines[index].states())
    }

    /// Transition to the discovered state of type `S`.
    ///
    /// Fails with [`StateMachineError::StateNotFound`] if the machine has no
    /// such state; the current state is then left untouched.
    pub fn set_state<S: State>(&mut self, owner: &dyn MachineOwner) -> Result<()> {
        let index = self.ensure_active(owner)?;
        let reference = &self.machines[index];
        let Some(target) = reference.find_by_type(TypeId::of::<S>()) else {
            let machine = reference.machine();
            let state = simple_type_name::<S>();
            warn!(%machine, state, "no such state");
            return Err(StateMachineError::StateNotFound {
                machine,
                state: state.to_string(),
            });
        };
        self.transition(index, target)
    }

    /// Transition to the first discovered state called `name`.
    ///
    /// Returns `Ok(false)` and changes nothing when there is no such state.
    pub fn set_state_by_name(&mut self, owner: &dyn MachineOwner, name: &str) -> Result<bool> {
        let index = self.ensure_active(owner)?;
        match self.machines[index].find_by_name(name) {
            Some(target) => {
                self.transition(index, target)?;
                Ok(true)
            }
            None => {
                debug!(machine = %owner.machine_id(), state = name, "ignoring unknown state name");
                Ok(false)
            }
        }
    }

    /// Transition every machine of `entity` that has a state of type `S`.
    ///
    /// Machines without such a state are skipped. Returns how many machines
    /// transitioned. A failing machine does not stop the others; the first
    /// error is returned once every target has been handled.
    pub fn set_state_for_entity<S: State>(&mut self, entity: EntityId) -> Result<usize> {
        self.fan_out(entity, &TransitionRequest::of::<S>())
    }

    /// Name-based variant of [`set_state_for_entity`](Self::set_state_for_entity).
    pub fn set_state_for_entity_by_name(&mut self, entity: EntityId, name: &str) -> Result<usize> {
        self.fan_out(entity, &TransitionRequest::ByName(name.to_string()))
    }

    fn fan_out(&mut self, entity: EntityId, request: &TransitionRequest) -> Result<usize> {
        let targets: Vec<(usize, NodeId)> = self
            .machines
            .values()
            .enumerate()
            .filter(|(_, reference)| reference.entity() == entity)
            .filter_map(|(index, reference)| reference.resolve(request).map(|node| (index, node)))
            .collect();

        let mut first_error = None;
        for &(index, target) in &targets {
            if let Err(error) = self.transition(index, target) {
                warn!(%entity, %error, "entity-wide transition failed");
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(targets.len()),
        }
    }

    /// `(machine, current state)` for every machine hosted by `entity`.
    pub fn current_states_for_entity(&self, entity: EntityId) -> Vec<(MachineId, &'static str)> {
        self.machines
            .values()
            .filter(|reference| reference.entity() == entity)
            .map(|reference| (reference.machine(), reference.current_state_name()))
            .collect()
    }

    /// Attach a listener to one state's lifecycle events.
    ///
    /// Returns `Ok(false)` when the machine has no state called `state`.
    pub fn subscribe(
        &mut self,
        owner: &dyn MachineOwner,
        state: &str,
        phase: LifecyclePhase,
        listener: impl FnMut(&LifecycleEvent) + 'static,
    ) -> Result<bool> {
        let index = self.ensure_active(owner)?;
        Ok(self.machines[index].subscribe(state, phase, Box::new(listener)))
    }

    /// Attach a listener by machine identity, without activating anything.
    ///
    /// If the machine is not active yet the listener is held and attached
    /// right before its initial `on_enter`, so it observes the initial enter
    /// event too. Held listeners naming an unknown state are dropped at
    /// activation. Returns `false` only when the machine is already active and
    /// has no state called `state`.
    pub fn subscribe_machine(
        &mut self,
        machine: MachineId,
        state: &str,
        phase: LifecyclePhase,
        listener: impl FnMut(&LifecycleEvent) + 'static,
    ) -> bool {
        if let Some(reference) = self.machines.get_mut(&machine) {
            return reference.subscribe(state, phase, Box::new(listener));
        }

        self.held_listeners
            .entry(machine)
            .or_default()
            .push(HeldListener {
                state: state.to_string(),
                phase,
                listener: Box::new(listener),
            });
        true
    }

    /// Mark an entity live or not. Machines of inactive entities are skipped
    /// by [`update`](Self::update). Entities are active by default.
    pub fn set_entity_active(&mut self, entity: EntityId, active: bool) {
        if active {
            self.inactive_entities.remove(&entity);
        } else {
            self.inactive_entities.insert(entity);
        }
    }

    pub fn is_entity_active(&self, entity: EntityId) -> bool {
        !self.inactive_entities.contains(&entity)
    }

    /// Run `on_update` of the current state of every machine whose entity is
    /// active, in activation order.
    ///
    /// A machine whose requested transition fails does not stop the others;
    /// the first such error is returned once all machines have been ticked.
    pub fn update(&mut self) -> Result<()> {
        self.tick += 1;
        trace!(tick = self.tick, machines = self.machines.len(), "update");

        let mut first_error = None;
        for index in 0..self.machines.len() {
            let mut pending = None;
            {
                let reference = &mut self.machines[index];
                if self.inactive_entities.contains(&reference.entity()) {
                    continue;
                }
                let current = reference.current;
                reference.run_hook(current, LifecyclePhase::Update, &mut pending);
            }
            if let Err(error) = self.drain(index, pending) {
                warn!(%error, "transition requested during update failed");
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Remove a machine from the registry, running its current state's
    /// `on_exit` first. Transitions requested by that hook are dropped.
    pub fn deactivate(&mut self, machine: MachineId) -> Option<StateMachineReference> {
        let mut reference = self.machines.shift_remove(&machine)?;
        let current = reference.current;
        let mut pending = None;
        reference.run_hook(current, LifecyclePhase::Exit, &mut pending);
        info!(
            %machine,
            state = reference.current_state_name(),
            "machine deactivated"
        );
        Some(reference)
    }

    /// Deactivate every machine hosted by `entity`. Returns how many were removed.
    pub fn deactivate_entity(&mut self, entity: EntityId) -> usize {
        let machines: Vec<MachineId> = self
            .machines
            .values()
            .filter(|reference| reference.entity() == entity)
            .map(StateMachineReference::machine)
            .collect();

        self.inactive_entities.remove(&entity);
        machines
            .into_iter()
            .filter_map(|machine| self.deactivate(machine))
            .count()
    }

    fn transition(&mut self, index: usize, target: NodeId) -> Result<()> {
        let pending = self.transition_once(index, target);
        self.drain(index, pending)
    }

    /// Exit the current state, swap, enter `target`, notify sinks.
    fn transition_once(&mut self, index: usize, target: NodeId) -> Option<TransitionRequest> {
        let mut pending = None;
        let notice = {
            let reference = &mut self.machines[index];
            let previous = reference.current;
            let previous_name = reference.current_state_name();

            reference.run_hook(previous, LifecyclePhase::Exit, &mut pending);
            reference.current = target;
            reference.run_hook(target, LifecyclePhase::Enter, &mut pending);

            let next_name = reference.current_state_name();
            debug!(
                machine = %reference.machine(),
                from = previous_name,
                to = next_name,
                "state transition"
            );
            reference
                .history
                .record(TransitionRecord::new(previous_name, next_name, self.tick));

            TransitionNotice {
                entity: reference.entity(),
                machine: reference.machine(),
                previous: previous_name.to_string(),
                next: next_name.to_string(),
            }
        };

        for sink in &mut self.sinks {
            sink.state_entered(&notice);
        }
        pending
    }

    /// Apply transitions requested from hooks until none is left.
    fn drain(&mut self, index: usize, mut pending: Option<TransitionRequest>) -> Result<()> {
        let limit = self.config.max_chained_transitions;
        let mut chained = 0;

        while let Some(request) = pending.take() {
            let reference = &self.machines[index];
            let machine = reference.machine();

            chained += 1;
            if chained > limit {
                warn!(%machine, limit, "too many chained transitions");
                return Err(StateMachineError::TransitionChainExceeded { machine, limit });
            }

            match (reference.resolve(&request), &request) {
                (Some(target), _) => pending = self.transition_once(index, target),
                (None, TransitionRequest::ByName(name)) => {
                    debug!(%machine, state = %name, "ignoring unknown state name");
                }
                (None, TransitionRequest::ByType { name, .. }) => {
                    warn!(%machine, state = name, "no such state");
                    return Err(StateMachineError::StateNotFound {
                        machine,
                        state: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for StateMachineManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachineManager")
            .field("config", &self.config)
            .field("machines", &self.machines.len())
            .field("sinks", &self.sinks.len())
            .field("held_listeners", &self.held_listeners.len())
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MachineHandle;
    use crate::core::StateContext;
    use crate::state_blueprint;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = RefCell<Vec<String>>;

    fn log(ctx: &StateContext<'_>, entry: &str) {
        if let Some(log) = ctx.context::<Log>() {
            log.borrow_mut().push(format!("{}.{entry}", ctx.state_name()));
        }
    }

    #[derive(Debug, Default)]
    struct Idle;
    impl State for Idle {
        fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
            log(ctx, "enter");
        }
        fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
            log(ctx, "exit");
        }
    }

    #[derive(Debug, Default)]
    struct Patrol {
        ticks: u32,
    }
    impl State for Patrol {
        fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
            log(ctx, "enter");
        }
        fn on_update(&mut self, ctx: &mut StateContext<'_>) {
            self.ticks += 1;
            if self.ticks == 2 {
                ctx.set_state::<Idle>();
            }
        }
        fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
            log(ctx, "exit");
        }
    }

    /// Bounces straight to `Patrol` whenever entered.
    #[derive(Debug, Default)]
    struct Bounce;
    impl State for Bounce {
        fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
            log(ctx, "enter");
            ctx.set_state_by_name("Patrol");
        }
    }

    /// Asks for a state type no machine declares.
    #[derive(Debug, Default)]
    struct Lost;
    impl State for Lost {
        fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
            ctx.set_state::<Unlisted>();
        }
    }

    #[derive(Debug, Default)]
    struct Unlisted;
    impl State for Unlisted {}

    /// Re-enters itself forever.
    #[derive(Debug, Default)]
    struct Spin;
    impl State for Spin {
        fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
            ctx.set_state::<Spin>();
        }
    }

    fn manager() -> StateMachineManager {
        let catalog = StateCatalog::builder()
            .register(state_blueprint!("Guard" => { Idle, Patrol, Bounce, Lost }))
            .register(state_blueprint!("Spinner" => { Spin }))
            .register(state_blueprint!("Empty" => {}))
            .build()
            .unwrap();
        StateMachineManager::new(catalog)
    }

    fn owner(kind: &str, log: &Rc<Log>) -> MachineHandle {
        MachineHandle::new(kind, EntityId(1)).with_context(log.clone())
    }

    #[test]
    fn activate_enters_first_state() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        let reference = manager.activate(&guard).unwrap();
        assert_eq!(reference.current_state_name(), "Idle");
        assert_eq!(*log.borrow(), vec!["Idle.enter"]);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn activation_errors_leave_registry_empty() {
        let mut manager = manager();
        let log = Rc::new(Log::default());

        assert!(matches!(
            manager.activate(&owner("Empty", &log)),
            Err(StateMachineError::NoStates { .. })
        ));
        assert!(matches!(
            manager.activate(&owner("Turret", &log)),
            Err(StateMachineError::UnknownMachineKind { .. })
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn duplicate_activation_is_rejected() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        manager.activate(&guard).unwrap();
        let result = manager.activate(&guard);

        assert_eq!(
            result.err(),
            Some(StateMachineError::AlreadyActive {
                machine: guard.machine_id()
            })
        );
        assert_eq!(manager.len(), 1);
        assert_eq!(*log.borrow(), vec!["Idle.enter"]);
    }

    #[test]
    fn update_requested_transition_runs_after_hook() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        manager.set_state::<Patrol>(&guard).unwrap();
        manager.update().unwrap();
        assert_eq!(manager.current_state_name(&guard).unwrap(), "Patrol");

        manager.update().unwrap();
        assert_eq!(manager.current_state_name(&guard).unwrap(), "Idle");
        assert_eq!(manager.tick(), 2);
        assert_eq!(
            manager.history(guard.machine_id()).map(TransitionHistory::path),
            Some(vec!["Idle", "Patrol", "Idle"])
        );
    }

    #[test]
    fn enter_requested_transition_is_chained() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        manager.set_state::<Bounce>(&guard).unwrap();

        assert_eq!(manager.current_state_name(&guard).unwrap(), "Patrol");
        assert_eq!(
            *log.borrow(),
            vec!["Idle.enter", "Idle.exit", "Bounce.enter", "Patrol.enter"]
        );
    }

    #[test]
    fn failed_typed_request_from_hook_surfaces() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        let result = manager.set_state::<Lost>(&guard);

        assert!(matches!(
            result,
            Err(StateMachineError::StateNotFound { ref state, .. }) if state == "Unlisted"
        ));
        assert_eq!(manager.current_state_name(&guard).unwrap(), "Lost");
    }

    #[test]
    fn runaway_chains_are_cut() {
        let catalog = StateCatalog::builder()
            .register(state_blueprint!("Spinner" => { Spin }))
            .build()
            .unwrap();
        let mut manager = StateMachineManager::with_config(
            catalog,
            ManagerConfig::new().with_max_chained_transitions(3),
        );
        let spinner = MachineHandle::new("Spinner", EntityId(9));

        let result = manager.activate(&spinner);

        assert!(matches!(
            result,
            Err(StateMachineError::TransitionChainExceeded { limit: 3, .. })
        ));
        assert!(manager.contains(spinner.machine_id()));
        assert_eq!(manager.history(spinner.machine_id()).map(TransitionHistory::len), Some(3));
    }

    #[test]
    fn inactive_entities_are_not_ticked() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        manager.set_state::<Patrol>(&guard).unwrap();
        manager.set_entity_active(EntityId(1), false);
        assert!(!manager.is_entity_active(EntityId(1)));

        manager.update().unwrap();
        manager.update().unwrap();
        assert_eq!(manager.current_state_name(&guard).unwrap(), "Patrol");

        manager.set_entity_active(EntityId(1), true);
        manager.update().unwrap();
        manager.update().unwrap();
        assert_eq!(manager.current_state_name(&guard).unwrap(), "Idle");
    }

    #[test]
    fn deactivate_runs_exit_and_evicts() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);
        manager.activate(&guard).unwrap();

        let removed = manager.deactivate(guard.machine_id());

        assert!(removed.is_some());
        assert!(!manager.contains(guard.machine_id()));
        assert_eq!(*log.borrow(), vec!["Idle.enter", "Idle.exit"]);
        assert!(manager.deactivate(guard.machine_id()).is_none());
    }

    #[test]
    fn deactivate_entity_removes_all_its_machines() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        manager.activate(&owner("Guard", &log)).unwrap();
        manager.activate(&owner("Guard", &log)).unwrap();
        manager
            .activate(&MachineHandle::new("Guard", EntityId(2)))
            .unwrap();

        assert_eq!(manager.deactivate_entity(EntityId(1)), 2);
        assert_eq!(manager.len(), 1);
        assert!(manager.current_states_for_entity(EntityId(1)).is_empty());
    }

    #[test]
    fn subscribe_reports_unknown_states() {
        let mut manager = manager();
        let log = Rc::new(Log::default());
        let guard = owner("Guard", &log);

        assert!(!manager
            .subscribe(&guard, "Sleep", LifecyclePhase::Enter, |_| {})
            .unwrap());
        assert!(manager
            .subscribe(&guard, "Patrol", LifecyclePhase::Enter, |_| {})
            .unwrap());
    }
}
