//! Core State trait for nested state machine states.
//!
//! A state is one behavior mode of a machine. It exposes three lifecycle
//! hooks, all optional, and reaches its machine through a [`StateContext`].

use super::identity::{EntityId, MachineId};
use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Upcast helper so `dyn State` can be downcast to its concrete type.
#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Trait for state machine states.
///
/// Every hook defaults to a no-op. States are instantiated once, through
/// `Default`, when their machine is activated, and keep their fields for the
/// whole life of the machine.
///
/// # Example
///
/// ```rust
/// use statenest::core::{State, StateContext};
///
/// #[derive(Debug, Default)]
/// struct Patrol {
///     laps: u32,
/// }
///
/// #[derive(Debug, Default)]
/// struct Alert;
///
/// impl State for Patrol {
///     fn on_update(&mut self, ctx: &mut StateContext<'_>) {
///         self.laps += 1;
///         if self.laps == 3 {
///             ctx.set_state::<Alert>();
///         }
///     }
/// }
///
/// impl State for Alert {}
/// ```
pub trait State: AsAny + Debug + 'static {
    /// Called when the machine enters this state.
    fn on_enter(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called once per tick while this is the current state.
    fn on_update(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called when the machine leaves this state.
    fn on_exit(&mut self, _ctx: &mut StateContext<'_>) {}
}

impl<'s> dyn State + 's {
    pub fn is<T: State>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: State>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: State>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Unqualified type name, used as the lookup name of a state.
///
/// `my_game::ai::Patrol` becomes `Patrol`; generic arguments are dropped.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A transition asked for from inside a hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionRequest {
    /// Target the discovered state of this concrete type.
    ByType { type_id: TypeId, name: &'static str },
    /// Target the first discovered state with this name.
    ByName(String),
}

impl TransitionRequest {
    pub fn of<S: State>() -> Self {
        Self::ByType {
            type_id: TypeId::of::<S>(),
            name: simple_type_name::<S>(),
        }
    }

    pub fn target_name(&self) -> &str {
        match self {
            Self::ByType { name, .. } => name,
            Self::ByName(name) => name,
        }
    }
}

/// What a hook can see of, and ask from, its machine.
///
/// Transitions requested here are deferred: the manager applies them once
/// the running hook and its event have completed. When several are
/// requested during one hook the last one wins.
pub struct StateContext<'a> {
    machine: MachineId,
    entity: EntityId,
    state: &'static str,
    context: &'a dyn Any,
    pending: &'a mut Option<TransitionRequest>,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(
        machine: MachineId,
        entity: EntityId,
        state: &'static str,
        context: &'a dyn Any,
        pending: &'a mut Option<TransitionRequest>,
    ) -> Self {
        Self {
            machine,
            entity,
            state,
            context,
            pending,
        }
    }

    pub fn machine(&self) -> MachineId {
        self.machine
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Name of the state whose hook is running.
    pub fn state_name(&self) -> &'static str {
        self.state
    }

    /// The owner's shared data, if it has type `T`.
    pub fn context<T: Any>(&self) -> Option<&T> {
        self.context.downcast_ref::<T>()
    }

    pub fn set_state<S: State>(&mut self) {
        *self.pending = Some(TransitionRequest::of::<S>());
    }

    pub fn set_state_by_name(&mut self, name: impl Into<String>) {
        *self.pending = Some(TransitionRequest::ByName(name.into()));
    }

    pub fn pending(&self) -> Option<&TransitionRequest> {
        self.pending.as_ref()
    }
}
