//! Macros for ergonomic blueprint declaration.

/// Declare the nested state hierarchy of a machine kind.
///
/// Each entry is a state type implementing `State + Default`, given by name or
/// by path (`ai::Patrol`), optionally followed by `=> { ... }` with the states
/// nested under it.
///
/// # Example
///
/// ```
/// use statenest::core::State;
/// use statenest::state_blueprint;
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
/// #[derive(Debug, Default)]
/// struct Reload;
/// impl State for Reload {}
///
/// let blueprint = state_blueprint!("Guard" => {
///     Idle,
///     Combat => { Aim, Reload },
/// });
///
/// assert_eq!(blueprint.kind(), "Guard");
/// assert_eq!(blueprint.state_count(), 4);
/// ```
#[macro_export]
macro_rules! state_blueprint {
    ($kind:expr => { $($body:tt)* }) => {
        $crate::catalog::MachineBlueprint::new($kind)
            .with_states($crate::__state_descriptors!($($body)*))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __state_descriptors {
    () => {
        ::std::vec::Vec::<$crate::catalog::StateDescriptor>::new()
    };
    ($($state:path $(=> { $($inner:tt)* })?),+ $(,)?) => {
        ::std::vec![$(
            $crate::catalog::StateDescriptor::of::<$state>()
                $(.with_children($crate::__state_descriptors!($($inner)*)))?
        ),+]
    };
}
