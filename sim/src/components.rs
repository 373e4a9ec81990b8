//! ECS Components for the Rampage simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.
//!
//! Civilians carry `Position` and `Civilian` plus exactly one of the
//! population markers: `Standing` (walking, fleeing or lying dead) or
//! `Airborne` (in flight after a blast, shockwave or parachute drop).
//! Structures, charges and vehicles keep their geometry inside their own
//! component so they never alias civilian positions in a query.

use crate::spatial::Rect;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Side length of a civilian's square body.
pub const CIVILIAN_SIZE: f32 = 25.0;

/// Walking speed of a calm civilian (units per tick).
pub const CIVILIAN_SPEED: f32 = 2.0;

/// Full health of a civilian.
pub const CIVILIAN_HEALTH: i32 = 100;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position in the city (x = along the street, y = down the screen).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D velocity vector (units per tick).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }
}

/// Horizontal facing of the player or a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// +1.0 for right, -1.0 for left.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

// ============================================================================
// CIVILIAN COMPONENTS
// ============================================================================

/// Spawn sequence number. Ascending order is the population scan order.
///
/// A civilian that lands and rejoins the street is given a fresh number, so
/// it scans after everyone already standing.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CivilianId(pub u32);

/// Behavioral state of a civilian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// Strolling along the street.
    #[default]
    Wandering,
    /// Running away from the player.
    Fleeing,
    /// Permanent corpse. Never leaves this state.
    Dead,
    /// Launched by a blast or shockwave.
    Falling,
    /// Dropped by a reinforcement carrier.
    Parachuting,
}

/// Result of applying damage to a civilian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target was already dead; nothing changed.
    Ignored,
    /// Target survived.
    Wounded,
    /// Target crossed zero health on this hit.
    Killed,
}

/// Civilian agent state.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Civilian {
    /// Health, floored at 0. Zero means dead.
    pub health: i32,
    /// Walking direction, +1.0 or -1.0.
    pub direction: f32,
    /// Walking speed.
    pub speed: f32,
    /// Saw violence. Never reset.
    pub witnessed: bool,
    pub state: AgentState,
    /// Cosmetic hue in degrees.
    pub hue: u16,
}

impl Default for Civilian {
    fn default() -> Self {
        Self::new(1.0, 0)
    }
}

impl Civilian {
    pub fn new(direction: f32, hue: u16) -> Self {
        Self {
            health: CIVILIAN_HEALTH,
            direction,
            speed: CIVILIAN_SPEED,
            witnessed: false,
            state: AgentState::Wandering,
            hue,
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.state == AgentState::Dead
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    /// Subtract `amount` from health.
    ///
    /// Damage to a corpse is a no-op. The death transition happens at most
    /// once, on the hit that takes health to zero or below.
    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0);
        if self.health == 0 {
            self.state = AgentState::Dead;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }

    /// Can this civilian still become a witness?
    #[inline]
    pub fn can_witness(&self) -> bool {
        self.is_alive() && !self.witnessed
    }

    /// Mark as a witness. Returns `true` only on the first call for a living
    /// civilian, so callers count each witness exactly once.
    pub fn mark_witnessed(&mut self) -> bool {
        if !self.can_witness() {
            return false;
        }
        self.witnessed = true;
        if self.state == AgentState::Wandering {
            self.state = AgentState::Fleeing;
        }
        true
    }

    /// Kill outright (landing impact). Same once-only contract as damage.
    pub fn kill(&mut self) -> DamageOutcome {
        self.apply_damage(self.health.max(1))
    }
}

/// Marker for civilians in the standing population.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Standing;

/// Flight state of an airborne civilian. Paired with `Velocity`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Airborne {
    /// Tumble angle in radians (cosmetic).
    pub rotation: f32,
    /// Tumble rate in radians per tick.
    pub rotation_speed: f32,
    pub has_parachute: bool,
}

// ============================================================================
// WORLD OBJECT COMPONENTS
// ============================================================================

/// Unique identifier for structures.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Static building footprint. Removed for good when a charge detonates.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Structure {
    pub rect: Rect,
}

/// Timed explosive attached to a structure.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Charge {
    pub x: f32,
    pub y: f32,
    /// Structure the charge was placed on.
    pub structure: Entity,
    /// Footprint of that structure at placement time.
    pub footprint: Rect,
    /// Fuse time left in milliseconds.
    pub remaining_ms: f32,
}

/// Vehicle model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleKind {
    Car,
    Truck,
}

impl VehicleKind {
    /// Body size (width, height).
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            VehicleKind::Car => (100.0, 50.0),
            VehicleKind::Truck => (150.0, 70.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleKind::Car => "Car",
            VehicleKind::Truck => "Truck",
        }
    }
}

/// Drivable vehicle. Only the player can occupy one.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub kind: VehicleKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub facing: Facing,
    pub speed: f32,
    pub occupied: bool,
}

impl Vehicle {
    /// Vehicle resting on the ground line.
    pub fn new(kind: VehicleKind, x: f32, ground_y: f32) -> Self {
        let (width, height) = kind.dimensions();
        Self {
            kind,
            x,
            y: ground_y - height,
            width,
            height,
            facing: Facing::Right,
            speed: 10.0,
            occupied: false,
        }
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// X coordinate of the bumper in the driving direction.
    pub fn front(&self) -> f32 {
        match self.facing {
            Facing::Right => self.x + self.width,
            Facing::Left => self.x,
        }
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a standing civilian.
#[derive(Bundle)]
pub struct CivilianBundle {
    pub id: CivilianId,
    pub position: Position,
    pub civilian: Civilian,
    pub standing: Standing,
}

impl CivilianBundle {
    pub fn new(id: CivilianId, x: f32, y: f32, civilian: Civilian) -> Self {
        Self {
            id,
            position: Position::new(x, y),
            civilian,
            standing: Standing,
        }
    }
}

/// Bundle for spawning a civilian directly into the air.
#[derive(Bundle)]
pub struct AirborneBundle {
    pub id: CivilianId,
    pub position: Position,
    pub velocity: Velocity,
    pub civilian: Civilian,
    pub airborne: Airborne,
}

impl AirborneBundle {
    pub fn new(id: CivilianId, position: Position, velocity: Velocity, airborne: Airborne, hue: u16) -> Self {
        let mut civilian = Civilian::new(1.0, hue);
        civilian.state = if airborne.has_parachute {
            AgentState::Parachuting
        } else {
            AgentState::Falling
        };
        Self {
            id,
            position,
            velocity,
            civilian,
            airborne,
        }
    }
}

/// Bundle for spawning a structure.
#[derive(Bundle)]
pub struct StructureBundle {
    pub id: StructureId,
    pub structure: Structure,
}

impl StructureBundle {
    pub fn new(id: u32, rect: Rect) -> Self {
        Self {
            id: StructureId(id),
            structure: Structure { rect },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_kills_once() {
        let mut civ = Civilian::default();
        civ.health = 15;
        assert_eq!(civ.apply_damage(50), DamageOutcome::Killed);
        assert_eq!(civ.health, 0);
        assert!(civ.is_dead());

        // Corpses ignore further damage
        assert_eq!(civ.apply_damage(50), DamageOutcome::Ignored);
        assert_eq!(civ.health, 0);
        assert_eq!(civ.state, AgentState::Dead);
    }

    #[test]
    fn test_witness_is_idempotent() {
        let mut civ = Civilian::default();
        assert!(civ.mark_witnessed());
        assert_eq!(civ.state, AgentState::Fleeing);
        assert!(!civ.mark_witnessed());
    }

    #[test]
    fn test_dead_never_witnesses() {
        let mut civ = Civilian::default();
        civ.kill();
        assert!(!civ.mark_witnessed());
        assert!(!civ.witnessed);
    }

    #[test]
    fn test_vehicle_front_follows_facing() {
        let mut car = Vehicle::new(VehicleKind::Car, 200.0, 570.0);
        assert_eq!(car.y, 520.0);
        assert_eq!(car.front(), 300.0);
        car.facing = Facing::Left;
        assert_eq!(car.front(), 200.0);
    }
}
