//! Snapshot types for renderers and UI.
//!
//! The `Snapshot` struct is a read-only, serializable view of the simulation
//! after a completed tick. Renderers read it; nothing in it feeds back into
//! the simulation.

use crate::components::*;
use crate::events::{EventLog, SimEvent};
use crate::config::SimConfig;
use crate::systems::ability::AbilityState;
use crate::systems::effects::{Effect, Effects, Explosions, Ring};
use crate::systems::escalation::{Carrier, EscalationState, WavePhase};
use crate::systems::panic::PanicState;
use crate::systems::player::{Player, Weapon, PLAYER_SIZE};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Player pose and weapon state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub facing: Facing,
    pub weapon: Weapon,
    pub speed_multiplier: f32,
    pub in_vehicle: bool,
    pub ammo: u32,
    pub reloading: bool,
}

/// A civilian, standing or airborne.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CivilianSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub dead: bool,
    pub witnessed: bool,
    pub state: AgentState,
    pub airborne: bool,
    pub has_parachute: bool,
    /// Tumble angle, zero for standing civilians.
    pub rotation: f32,
    pub hue: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A placed charge and its remaining fuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSnapshot {
    pub x: f32,
    pub y: f32,
    pub remaining_ms: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub kind: VehicleKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub facing: Facing,
    pub occupied: bool,
}

/// Wave state for the HUD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationSnapshot {
    pub phase: WavePhase,
    pub carrier: Option<Carrier>,
    /// Milliseconds until the wave timer fires. Zero during a wave.
    pub countdown_ms: f32,
    pub pending_drops: u32,
    pub deaths_since_wave: u32,
    pub total_deaths: u64,
    pub waves_started: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilitySnapshot {
    pub active: bool,
    pub cooldown_ms: f32,
    pub remaining_ms: f32,
    /// Radius of the sweeping shockwave front, if one is expanding.
    pub shockwave_radius: Option<f32>,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticks run so far.
    pub tick: u64,
    /// Sum of every `dt_ms` passed to `update`.
    pub time_ms: f64,
    pub world_width: f32,
    pub world_height: f32,
    pub player: PlayerSnapshot,
    /// Standing and airborne civilians in scan order.
    pub civilians: Vec<CivilianSnapshot>,
    pub structures: Vec<StructureSnapshot>,
    pub charges: Vec<ChargeSnapshot>,
    pub vehicles: Vec<VehicleSnapshot>,
    pub explosions: Vec<Ring>,
    pub effects: Vec<Effect>,
    pub escalation: EscalationSnapshot,
    pub panic_percentage: u32,
    pub panic_mode: bool,
    pub witnesses: u32,
    pub ability: AbilitySnapshot,
    /// Events produced by the most recent tick.
    pub events: Vec<SimEvent>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    ///
    /// Every resource `SimWorld` inserts must be present; a missing one
    /// leaves the matching section at its default.
    pub fn from_world(world: &mut World, tick: u64, time_ms: f64) -> Self {
        let mut civilians = Vec::new();
        let mut query = world.query::<(&CivilianId, &Position, &Civilian, Option<&Airborne>)>();
        for (id, pos, civ, airborne) in query.iter(world) {
            civilians.push(CivilianSnapshot {
                id: id.0,
                x: pos.x,
                y: pos.y,
                health: civ.health,
                dead: civ.is_dead(),
                witnessed: civ.witnessed,
                state: civ.state,
                airborne: airborne.is_some(),
                has_parachute: airborne.is_some_and(|a| a.has_parachute),
                rotation: airborne.map_or(0.0, |a| a.rotation),
                hue: civ.hue,
            });
        }
        civilians.sort_by_key(|c| c.id);

        let mut structures = Vec::new();
        let mut query = world.query::<(&StructureId, &Structure)>();
        for (id, structure) in query.iter(world) {
            let r = structure.rect;
            structures.push(StructureSnapshot {
                id: id.0,
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            });
        }
        structures.sort_by_key(|s| s.id);

        let mut query = world.query::<&Charge>();
        let charges = query
            .iter(world)
            .map(|c| ChargeSnapshot {
                x: c.x,
                y: c.y,
                remaining_ms: c.remaining_ms,
            })
            .collect();

        let mut query = world.query::<&Vehicle>();
        let vehicles = query
            .iter(world)
            .map(|v| VehicleSnapshot {
                kind: v.kind,
                x: v.x,
                y: v.y,
                width: v.width,
                height: v.height,
                facing: v.facing,
                occupied: v.occupied,
            })
            .collect();

        let player = world
            .get_resource::<Player>()
            .map(|p| PlayerSnapshot {
                x: p.position.x,
                y: p.position.y,
                size: PLAYER_SIZE,
                facing: p.facing,
                weapon: p.weapon,
                speed_multiplier: p.speed_multiplier,
                in_vehicle: p.in_vehicle(),
                ammo: p.gun.ammo,
                reloading: p.gun.reloading,
            })
            .unwrap_or_default();

        let config = world.get_resource::<SimConfig>().cloned().unwrap_or_default();
        let escalation = world
            .get_resource::<EscalationState>()
            .map(|e| EscalationSnapshot {
                phase: e.phase,
                carrier: e.carrier,
                countdown_ms: e.countdown_ms(&config),
                pending_drops: e.pending_drops(),
                deaths_since_wave: e.deaths_since_wave,
                total_deaths: e.total_deaths,
                waves_started: e.waves_started,
            })
            .unwrap_or_default();

        let (panic_percentage, panic_mode, witnesses) = world
            .get_resource::<PanicState>()
            .map(|p| (p.percentage(), p.panic_mode, p.witnesses))
            .unwrap_or_default();

        let ability = world
            .get_resource::<AbilityState>()
            .map(|a| AbilitySnapshot {
                active: a.active,
                cooldown_ms: a.cooldown_ms,
                remaining_ms: a.remaining_ms,
                shockwave_radius: a.shockwave.map(|w| w.radius),
            })
            .unwrap_or_default();

        let explosions = world
            .get_resource::<Explosions>()
            .map(|e| e.rings.clone())
            .unwrap_or_default();
        let effects = world
            .get_resource::<Effects>()
            .map(|e| e.iter().copied().collect())
            .unwrap_or_default();
        let events = world
            .get_resource::<EventLog>()
            .map(|log| log.events().to_vec())
            .unwrap_or_default();

        Self {
            tick,
            time_ms,
            world_width: config.world_width,
            world_height: config.world_height,
            player,
            civilians,
            structures,
            charges,
            vehicles,
            explosions,
            effects,
            escalation,
            panic_percentage,
            panic_mode,
            witnesses,
            ability,
            events,
        }
    }

    /// Civilians currently in the air.
    pub fn airborne_count(&self) -> usize {
        self.civilians.iter().filter(|c| c.airborne).count()
    }

    /// Corpses lying in the street.
    pub fn dead_count(&self) -> usize {
        self.civilians.iter().filter(|c| c.dead).count()
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
