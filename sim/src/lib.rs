//! Rampage - Simulation Core
//!
//! A tick-driven ECS simulation of a city street: a player with melee
//! weapons, a gun, charges, vehicles and a rampage ability; civilians who
//! wander, witness violence, panic and die; and an escalation scheduler that
//! answers the death toll with parachute reinforcements.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod events;
pub mod population;
pub mod render_bridge;
pub mod rng;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{ConfigError, SimConfig};
pub use events::{EventLog, SimEvent, WaveTrigger};
pub use rng::SimRng;
pub use spatial::{OccupancyGrid, Rect};
pub use systems::*;
pub use world::Snapshot;
