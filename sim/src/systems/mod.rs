//! ECS Systems for the Rampage simulation.
//!
//! Systems contain the game logic that operates on components and resources.
//! `SimWorld` runs them as four chained groups every tick:
//!
//! **Player** - intents and pose:
//! - `player_control_system` - Weapon select and facing
//! - `vehicle_toggle_system` - Enter or leave a vehicle
//! - `vehicle_drive_system` - Drive and run civilians over
//! - `player_movement_system` - Movement on foot
//! - `gun_timer_system` - Shot interval and reload
//!
//! **Violence** - damage and the witnesses it creates:
//! - `attack_system` - Melee strikes and gunshots
//! - `charge_placement_system` - Attach a charge to the nearest structure
//! - `charge_fuse_system` - Fuses, detonations and blast damage
//! - `proximity_witness_system` - Civilians near visible violence
//!
//! **Population** - agents in motion:
//! - `civilian_movement_system` - Wandering, fleeing, anti-overlap
//! - `explosion_visual_system` - Blast and shockwave rings
//! - `airborne_physics_system` - Flight and landing outcomes
//!
//! **Escalation** - session-level state:
//! - `escalation_system` - Reinforcement wave state machine
//! - `drop_release_system` - Parachute batches
//! - `ability_system` - Rampage buff and shockwave
//! - `panic_latch_system` - One-way panic latch
//! - `effect_expiry_system` - Timed effect cleanup

pub mod ability;
pub mod airborne;
pub mod combat;
pub mod demolition;
pub mod effects;
pub mod escalation;
pub mod movement;
pub mod panic;
pub mod player;
pub mod serialization;
pub mod vehicle;

pub use ability::*;
pub use airborne::*;
pub use combat::*;
pub use demolition::*;
pub use effects::*;
pub use escalation::*;
pub use movement::*;
pub use panic::*;
pub use player::*;
pub use serialization::*;
pub use vehicle::*;
