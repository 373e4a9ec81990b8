//! The player character: pose, weapon loadout, intents and the gun's
//! magazine/reload cycle.

use crate::components::{Facing, Position};
use crate::config::SimConfig;
use crate::events::{EventLog, SimEvent};
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Side length of the player's square body.
pub const PLAYER_SIZE: f32 = 30.0;

/// Base walking speed (units per tick).
pub const PLAYER_SPEED: f32 = 5.0;

/// Highest point the player can climb to.
const PLAYER_MIN_Y: f32 = 50.0;

/// Rounds in a full gun magazine.
pub const MAGAZINE_SIZE: u32 = 50;

/// Real time taken by a reload.
pub const RELOAD_MS: f32 = 1000.0;

/// Minimum real time between two gun shots.
pub const MIN_SHOT_INTERVAL_MS: f32 = 100.0;

// ============================================================================
// WEAPONS
// ============================================================================

/// How a weapon delivers damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireMode {
    /// Semicircular strike in front of the player.
    Melee,
    /// Single horizontal ray, first civilian in scan order is hit.
    Hitscan,
    /// Timed charge stuck to a structure.
    Placed,
}

/// Fixed stats of a weapon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub range: f32,
    pub damage: i32,
    pub fire_mode: FireMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weapon {
    #[default]
    Fist,
    Knife,
    Crowbar,
    Axe,
    Gun,
    Bomb,
}

impl Weapon {
    pub const ALL: [Weapon; 6] = [
        Weapon::Fist,
        Weapon::Knife,
        Weapon::Crowbar,
        Weapon::Axe,
        Weapon::Gun,
        Weapon::Bomb,
    ];

    pub fn stats(self) -> WeaponStats {
        let (range, damage, fire_mode) = match self {
            Weapon::Fist => (40.0, 20, FireMode::Melee),
            Weapon::Knife => (50.0, 50, FireMode::Melee),
            Weapon::Crowbar => (70.0, 40, FireMode::Melee),
            Weapon::Axe => (60.0, 60, FireMode::Melee),
            Weapon::Gun => (300.0, 100, FireMode::Hitscan),
            Weapon::Bomb => (150.0, 200, FireMode::Placed),
        };
        WeaponStats {
            range,
            damage,
            fire_mode,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weapon::Fist => "Fist",
            Weapon::Knife => "Knife",
            Weapon::Crowbar => "Crowbar",
            Weapon::Axe => "Axe",
            Weapon::Gun => "Gun",
            Weapon::Bomb => "Bomb",
        }
    }
}

// ============================================================================
// PLAYER STATE
// ============================================================================

/// Gun magazine and timers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GunState {
    pub ammo: u32,
    pub reloading: bool,
    /// Real time left on the current reload.
    pub reload_remaining_ms: f32,
    /// Real time since the last shot.
    pub since_last_shot_ms: f32,
}

impl Default for GunState {
    fn default() -> Self {
        Self {
            ammo: MAGAZINE_SIZE,
            reloading: false,
            reload_remaining_ms: 0.0,
            since_last_shot_ms: MIN_SHOT_INTERVAL_MS,
        }
    }
}

impl GunState {
    /// Whether a shot may be fired right now.
    pub fn can_fire(&self) -> bool {
        !self.reloading && self.ammo > 0 && self.since_last_shot_ms >= MIN_SHOT_INTERVAL_MS
    }

    /// Begin a reload. Returns `false` if one is already running.
    pub fn start_reload(&mut self) -> bool {
        if self.reloading {
            return false;
        }
        self.reloading = true;
        self.reload_remaining_ms = RELOAD_MS;
        true
    }
}

/// The player character.
#[derive(Resource, Debug, Clone)]
pub struct Player {
    /// Top-left corner of the body.
    pub position: Position,
    pub facing: Facing,
    pub speed: f32,
    /// Temporary multiplier from the special ability.
    pub speed_multiplier: f32,
    pub weapon: Weapon,
    /// Vehicle currently driven, if any.
    pub vehicle: Option<Entity>,
    pub gun: GunState,
    /// Real time until the next melee strike while the attack is held.
    pub swing_timer_ms: f32,
}

impl Player {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            facing: Facing::Right,
            speed: PLAYER_SPEED,
            speed_multiplier: 1.0,
            weapon: Weapon::Fist,
            vehicle: None,
            gun: GunState::default(),
            swing_timer_ms: 0.0,
        }
    }

    /// Player placed at the left of the street, standing on the ground.
    pub fn spawn_for(config: &SimConfig) -> Self {
        Self::new(Position::new(100.0, config.ground_y() - PLAYER_SIZE))
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.position.x + PLAYER_SIZE / 2.0,
            self.position.y + PLAYER_SIZE / 2.0,
        )
    }

    #[inline]
    pub fn in_vehicle(&self) -> bool {
        self.vehicle.is_some()
    }
}

/// Intents from the input layer for the next tick.
///
/// Continuous intents (movement, attack held) persist until changed. Edge
/// intents are consumed by one tick and cleared by `clear_edges`.
#[derive(Resource, Debug, Clone, Default)]
pub struct PlayerInput {
    /// Horizontal movement in [-1, 1].
    pub move_x: f32,
    /// Vertical movement in [-1, 1], negative is up.
    pub move_y: f32,
    pub jump: bool,
    pub attack_held: bool,
    /// Attack went from released to pressed.
    pub attack_started: bool,
    pub face: Option<Facing>,
    pub select_weapon: Option<Weapon>,
    pub place_charge: bool,
    pub toggle_vehicle: bool,
    pub activate_ability: bool,
}

impl PlayerInput {
    /// Set the attack trigger state, recording a start edge when pressed.
    pub fn set_attack(&mut self, held: bool) {
        if held && !self.attack_held {
            self.attack_started = true;
        }
        self.attack_held = held;
    }

    /// Drop all one-shot intents after a tick consumed them.
    pub fn clear_edges(&mut self) {
        self.attack_started = false;
        self.face = None;
        self.select_weapon = None;
        self.place_charge = false;
        self.toggle_vehicle = false;
        self.activate_ability = false;
    }
}

// ============================================================================
// SYSTEMS
// ============================================================================

/// Apply weapon selection and facing intents.
pub fn player_control_system(input: Res<PlayerInput>, mut player: ResMut<Player>) {
    if let Some(weapon) = input.select_weapon {
        player.weapon = weapon;
        player.swing_timer_ms = 0.0;
    }
    if let Some(facing) = input.face {
        player.facing = facing;
    }
}

/// Move the player on foot. Does nothing while driving.
pub fn player_movement_system(
    config: Res<SimConfig>,
    input: Res<PlayerInput>,
    mut player: ResMut<Player>,
) {
    if player.in_vehicle() {
        return;
    }

    let step = player.speed * player.speed_multiplier;
    let mx = input.move_x.clamp(-1.0, 1.0);
    let mut my = input.move_y.clamp(-1.0, 1.0) * step;
    if input.jump {
        my -= step * 2.0;
    }

    if mx < 0.0 {
        player.facing = Facing::Left;
    } else if mx > 0.0 {
        player.facing = Facing::Right;
    }

    let max_x = (config.world_width - PLAYER_SIZE).max(0.0);
    let max_y = (config.ground_y() - PLAYER_SIZE).max(PLAYER_MIN_Y);
    player.position.x = (player.position.x + mx * step).clamp(0.0, max_x);
    player.position.y = (player.position.y + my).clamp(PLAYER_MIN_Y, max_y);
}

/// Advance the gun's shot interval and any running reload.
pub fn gun_timer_system(dt: Res<DeltaTime>, mut player: ResMut<Player>, mut events: ResMut<EventLog>) {
    let gun = &mut player.gun;
    gun.since_last_shot_ms += dt.0;

    if gun.reloading {
        gun.reload_remaining_ms -= dt.0;
        if gun.reload_remaining_ms <= 0.0 {
            gun.reloading = false;
            gun.reload_remaining_ms = 0.0;
            gun.ammo = MAGAZINE_SIZE;
            events.push(SimEvent::ReloadFinished);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_world() -> World {
        let mut world = World::new();
        let config = SimConfig::default();
        world.insert_resource(Player::spawn_for(&config));
        world.insert_resource(config);
        world.insert_resource(PlayerInput::default());
        world.insert_resource(DeltaTime(16.0));
        world.insert_resource(EventLog::default());
        world
    }

    #[test]
    fn test_weapon_table() {
        assert_eq!(Weapon::Fist.stats().range, 40.0);
        assert_eq!(Weapon::Axe.stats().damage, 60);
        assert_eq!(Weapon::Gun.stats().fire_mode, FireMode::Hitscan);
        assert_eq!(Weapon::Bomb.stats().fire_mode, FireMode::Placed);
        assert_eq!(
            Weapon::ALL.iter().filter(|w| w.stats().fire_mode == FireMode::Melee).count(),
            4
        );
    }

    #[test]
    fn test_movement_sets_facing_and_clamps() {
        let mut world = player_world();
        world.resource_mut::<PlayerInput>().move_x = -1.0;
        world.resource_mut::<Player>().position.x = 2.0;

        let mut schedule = Schedule::default();
        schedule.add_systems(player_movement_system);
        schedule.run(&mut world);

        let player = world.resource::<Player>();
        assert_eq!(player.facing, Facing::Left);
        assert_eq!(player.position.x, 0.0);
    }

    #[test]
    fn test_jump_is_clamped_to_top() {
        let mut world = player_world();
        {
            let mut input = world.resource_mut::<PlayerInput>();
            input.move_y = -1.0;
            input.jump = true;
        }
        world.resource_mut::<Player>().position.y = 55.0;

        let mut schedule = Schedule::default();
        schedule.add_systems(player_movement_system);
        schedule.run(&mut world);

        assert_eq!(world.resource::<Player>().position.y, PLAYER_MIN_Y);
    }

    #[test]
    fn test_speed_multiplier_scales_step() {
        let mut world = player_world();
        world.resource_mut::<PlayerInput>().move_x = 1.0;
        world.resource_mut::<Player>().speed_multiplier = 3.0;
        let start = world.resource::<Player>().position.x;

        let mut schedule = Schedule::default();
        schedule.add_systems(player_movement_system);
        schedule.run(&mut world);

        assert_eq!(world.resource::<Player>().position.x, start + 15.0);
    }

    #[test]
    fn test_reload_completes_after_real_time() {
        let mut world = player_world();
        {
            let mut player = world.resource_mut::<Player>();
            player.gun.ammo = 0;
            assert!(player.gun.start_reload());
            assert!(!player.gun.start_reload());
        }
        world.insert_resource(DeltaTime(600.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(gun_timer_system);
        schedule.run(&mut world);
        assert!(world.resource::<Player>().gun.reloading);

        schedule.run(&mut world);
        let gun = world.resource::<Player>().gun;
        assert!(!gun.reloading);
        assert_eq!(gun.ammo, MAGAZINE_SIZE);
        assert_eq!(world.resource::<EventLog>().events(), &[SimEvent::ReloadFinished]);
    }

    #[test]
    fn test_attack_edge_only_on_press() {
        let mut input = PlayerInput::default();
        input.set_attack(true);
        assert!(input.attack_started);
        input.clear_edges();
        input.set_attack(true);
        assert!(!input.attack_started);
        assert!(input.attack_held);
    }
}
