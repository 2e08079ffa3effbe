//! Guard Patrol
//!
//! This example drives a nested guard AI and a door on the same entity.
//!
//! Key concepts:
//! - Declaring machine kinds with `state_blueprint!`
//! - Hooks requesting transitions through their context
//! - Lifecycle listeners and transition sinks
//! - Entity-wide transitions and liveness
//!
//! Run with: RUST_LOG=debug cargo run --example guard_patrol

use statenest::catalog::StateCatalog;
use statenest::core::{EntityId, State, StateContext};
use statenest::registry::{
    LifecycleEvent, LifecyclePhase, MachineHandle, MachineOwner, ManagerConfig, StateMachineManager,
    TransitionNotice,
};
use statenest::state_blueprint;
use std::cell::Cell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// Noise level around the guard, shared with every hook.
#[derive(Debug, Default)]
struct Surroundings {
    noise: Cell<u32>,
}

#[derive(Debug, Default)]
struct Idle;

impl State for Idle {
    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        ctx.set_state::<Patrol>();
    }
}

#[derive(Debug, Default)]
struct Patrol {
    laps: u32,
}

impl State for Patrol {
    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        self.laps += 1;
        let noisy = ctx
            .context::<Surroundings>()
            .is_some_and(|s| s.noise.get() > 5);
        if noisy {
            ctx.set_state::<Aim>();
        }
    }
}

#[derive(Debug, Default)]
struct Combat;

impl State for Combat {}

#[derive(Debug, Default)]
struct Aim {
    shots: u32,
}

impl State for Aim {
    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        self.shots += 1;
        if self.shots % 3 == 0 {
            ctx.set_state::<Reload>();
        }
    }
}

#[derive(Debug, Default)]
struct Reload;

impl State for Reload {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        if let Some(surroundings) = ctx.context::<Surroundings>() {
            surroundings.noise.set(0);
        }
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        ctx.set_state_by_name("Patrol");
    }
}

#[derive(Debug, Default)]
struct Closed;

impl State for Closed {}

#[derive(Debug, Default)]
struct Open;

impl State for Open {}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let catalog = StateCatalog::builder()
        .register(state_blueprint!("Guard" => {
            Idle,
            Patrol,
            Combat => { Aim, Reload },
        }))
        .register(state_blueprint!("Door" => { Closed, Open }))
        .build()?;

    let config = ManagerConfig::from_json(r#"{ "history_limit": 8 }"#)?;
    let mut manager = StateMachineManager::with_config(catalog, config);

    manager.add_sink(|notice: &TransitionNotice| {
        println!(
            "  {} {}: {} -> {}",
            notice.entity, notice.machine, notice.previous, notice.next
        );
    });

    let entity = EntityId(1);
    let surroundings = Rc::new(Surroundings::default());
    let guard = MachineHandle::new("Guard", entity).with_context(surroundings.clone());
    let door = MachineHandle::new("Door", entity);

    manager.activate(&guard)?;
    manager.activate(&door)?;
    manager.subscribe(&guard, "Aim", LifecyclePhase::Enter, |event: &LifecycleEvent| {
        println!("  {} takes aim", event.entity);
    })?;

    for tick in 1..=8 {
        surroundings.noise.set(surroundings.noise.get() + 2);
        println!("tick {tick} (noise {})", surroundings.noise.get());
        manager.update()?;
        println!("  guard at {:?}", manager.current_state_path(&guard)?);
    }

    println!("opening every door of {entity}");
    manager.set_state_for_entity::<Open>(entity)?;
    for (machine, state) in manager.current_states_for_entity(entity) {
        println!("  {machine} is {state}");
    }

    manager.set_entity_active(entity, false);
    manager.update()?;

    if let Some(history) = manager.history(guard.machine_id()) {
        println!("guard history: {}", history.path().join(" -> "));
    }

    manager.deactivate_entity(entity);
    Ok(())
}
