//! Public API for the simulation.
//!
//! `SimWorld` owns the ECS world and the per-tick schedule. The input layer
//! records intents between ticks, the host calls `update(dt_ms)` once per
//! rendered frame, and the renderer reads `snapshot()` afterwards.
//!
//! ## Tick Model
//!
//! One `update` call runs exactly one tick. Motion (walking, flight, vehicle
//! driving, carrier travel) advances by a fixed amount per tick, while fuses,
//! reloads, cooldowns, drop batches and effect lifetimes consume the real
//! elapsed milliseconds passed in by the caller.
//!
//! ## System Order
//!
//! **Player** - intents, vehicles, on-foot movement, gun timers
//!
//! **Violence** - attacks, charge placement, fuses and detonations, proximity
//! witnessing
//!
//! **Population** - civilian movement, explosion rings, airborne flight and
//! landings
//!
//! **Escalation** - wave scheduler, parachute drops, rampage ability, panic
//! latch, effect expiry

use crate::components::*;
use crate::config::{ConfigError, SimConfig};
use crate::events::{EventLog, SimEvent};
use crate::population::{generate_city, CivilianSequence};
use crate::rng::SimRng;
use crate::spatial::{OccupancyGrid, Rect};
use crate::systems::*;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use log::info;

/// Cell size of the civilian anti-overlap grid.
const OCCUPANCY_CELL_SIZE: f32 = 30.0;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing the city
/// - Advancing the simulation one tick at a time
/// - Recording player intents
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time_ms: f64,
}

impl SimWorld {
    /// Create a generated city with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create a generated city. The config is used as given.
    pub fn with_config(config: SimConfig) -> Self {
        let mut sim = Self::new_empty(config);
        generate_city(&mut sim.world);
        info!(
            "rampage simulation ready: {} civilians, {} structures, {} vehicles",
            sim.civilian_count(),
            sim.structure_count(),
            sim.vehicle_count()
        );
        sim
    }

    /// Validate the config, then create a generated city.
    pub fn try_with_config(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Create a world with the player and every resource but no city.
    pub fn new_empty(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(0.0));
        world.insert_resource(SimRng::from_optional_seed(config.seed));
        world.insert_resource(CivilianSequence::default());
        world.insert_resource(OccupancyGrid::new(OCCUPANCY_CELL_SIZE));
        world.insert_resource(Player::spawn_for(&config));
        world.insert_resource(PlayerInput::default());
        world.insert_resource(PanicState::new(config.panic_threshold));
        world.insert_resource(EscalationState::default());
        world.insert_resource(AbilityState::default());
        world.insert_resource(Effects::default());
        world.insert_resource(Explosions::default());
        world.insert_resource(EventLog::default());
        world.insert_resource(config);

        let mut schedule = Schedule::default();

        // Player: intents first so every later system sees this tick's pose
        schedule.add_systems(
            (
                player_control_system,
                vehicle_toggle_system,
                vehicle_drive_system,
                player_movement_system,
                gun_timer_system,
            )
                .chain(),
        );

        // Violence: damage, detonations and the witnesses they create
        schedule.add_systems(
            (
                attack_system,
                charge_placement_system,
                charge_fuse_system,
                proximity_witness_system,
            )
                .chain()
                .after(gun_timer_system),
        );

        // Population: walkers, then flyers launched this tick
        schedule.add_systems(
            (
                civilian_movement_system,
                explosion_visual_system,
                airborne_physics_system,
            )
                .chain()
                .after(proximity_witness_system),
        );

        // Escalation and end-of-tick bookkeeping
        schedule.add_systems(
            (
                escalation_system,
                drop_release_system,
                ability_system,
                panic_latch_system,
                effect_expiry_system,
            )
                .chain()
                .after(airborne_physics_system),
        );

        Self {
            world,
            schedule,
            tick: 0,
            time_ms: 0.0,
        }
    }

    /// Advance the simulation by one tick of `dt_ms` real milliseconds.
    ///
    /// Negative or non-finite elapsed times are treated as zero.
    pub fn update(&mut self, dt_ms: f32) {
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };

        self.world.resource_mut::<DeltaTime>().0 = dt_ms;
        self.world.resource_mut::<EventLog>().clear();

        self.schedule.run(&mut self.world);

        self.world.resource_mut::<PlayerInput>().clear_edges();
        self.tick += 1;
        self.time_ms += f64::from(dt_ms);
    }

    // ========================================================================
    // INTENTS
    // ========================================================================

    /// Set the movement intent. Components are clamped to [-1, 1].
    pub fn set_movement(&mut self, x: f32, y: f32) {
        let mut input = self.world.resource_mut::<PlayerInput>();
        input.move_x = x.clamp(-1.0, 1.0);
        input.move_y = y.clamp(-1.0, 1.0);
    }

    pub fn set_jump(&mut self, jump: bool) {
        self.world.resource_mut::<PlayerInput>().jump = jump;
    }

    pub fn set_facing(&mut self, facing: Facing) {
        self.world.resource_mut::<PlayerInput>().face = Some(facing);
    }

    pub fn select_weapon(&mut self, weapon: Weapon) {
        self.world.resource_mut::<PlayerInput>().select_weapon = Some(weapon);
    }

    /// Press the attack trigger.
    pub fn attack_start(&mut self) {
        self.world.resource_mut::<PlayerInput>().set_attack(true);
    }

    /// Release the attack trigger.
    pub fn attack_stop(&mut self) {
        self.world.resource_mut::<PlayerInput>().set_attack(false);
    }

    pub fn place_charge(&mut self) {
        self.world.resource_mut::<PlayerInput>().place_charge = true;
    }

    /// Enter the nearest vehicle, or leave the current one.
    pub fn toggle_vehicle(&mut self) {
        self.world.resource_mut::<PlayerInput>().toggle_vehicle = true;
    }

    pub fn activate_ability(&mut self) {
        self.world.resource_mut::<PlayerInput>().activate_ability = true;
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time_ms)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Sum of every elapsed time passed to `update`.
    pub fn current_time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn player(&self) -> &Player {
        self.world.resource::<Player>()
    }

    pub fn panic(&self) -> &PanicState {
        self.world.resource::<PanicState>()
    }

    pub fn escalation(&self) -> &EscalationState {
        self.world.resource::<EscalationState>()
    }

    pub fn ability(&self) -> &AbilityState {
        self.world.resource::<AbilityState>()
    }

    /// Events produced by the most recent tick.
    pub fn events(&self) -> &[SimEvent] {
        self.world.resource::<EventLog>().events()
    }

    /// Number of civilians, standing and airborne.
    pub fn civilian_count(&mut self) -> usize {
        let mut query = self.world.query::<&Civilian>();
        query.iter(&self.world).count()
    }

    pub fn structure_count(&mut self) -> usize {
        let mut query = self.world.query::<&Structure>();
        query.iter(&self.world).count()
    }

    pub fn vehicle_count(&mut self) -> usize {
        let mut query = self.world.query::<&Vehicle>();
        query.iter(&self.world).count()
    }

    pub fn charge_count(&mut self) -> usize {
        let mut query = self.world.query::<&Charge>();
        query.iter(&self.world).count()
    }

    /// Civilian with the given scan number, standing or airborne.
    pub fn civilian(&mut self, id: CivilianId) -> Option<(Position, Civilian)> {
        let mut query = self.world.query::<(&CivilianId, &Position, &Civilian)>();
        query
            .iter(&self.world)
            .find(|(cid, _, _)| **cid == id)
            .map(|(_, pos, civ)| (*pos, *civ))
    }

    // ========================================================================
    // WORLD SETUP
    // ========================================================================

    /// Add a standing civilian at `(x, y)` with the next scan number.
    pub fn spawn_civilian(&mut self, x: f32, y: f32, civilian: Civilian) -> CivilianId {
        let id = self.world.resource_mut::<CivilianSequence>().allocate();
        self.world.spawn(CivilianBundle::new(id, x, y, civilian));
        id
    }

    /// Add a structure with the given footprint.
    pub fn spawn_structure(&mut self, rect: Rect) -> Entity {
        let mut query = self.world.query::<&StructureId>();
        let id = query.iter(&self.world).map(|id| id.0 + 1).max().unwrap_or(0);
        self.world.spawn(StructureBundle::new(id, rect)).id()
    }

    /// Add a vehicle resting on the ground line.
    pub fn spawn_vehicle(&mut self, kind: VehicleKind, x: f32) -> Entity {
        let ground = self.config().ground_y();
        self.world.spawn(Vehicle::new(kind, x, ground)).id()
    }

    /// Place the player's top-left corner.
    pub fn set_player_position(&mut self, x: f32, y: f32) {
        self.world.resource_mut::<Player>().position = Position::new(x, y);
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
