//! Airborne civilians: ballistic flight, parachutes and landing outcomes.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::EventLog;
use crate::population::CivilianSequence;
use crate::rng::SimRng;
use crate::systems::effects::{EffectKind, Effects, LANDING_BLOOD_MS};
use crate::systems::escalation::EscalationState;
use bevy_ecs::prelude::*;

/// Downward acceleration per tick.
pub const GRAVITY: f32 = 0.5;

/// Fraction of gravity felt under a parachute.
const PARACHUTE_DRAG: f32 = 0.2;

/// Terminal fall speed under a parachute.
const PARACHUTE_MAX_FALL: f32 = 2.0;

/// Slack past the world edges before a flyer is discarded.
const BOUNDS_SLACK: f32 = 100.0;

/// Probability that a fall without a parachute is fatal.
const LANDING_DEATH_CHANCE: f64 = 0.5;

/// Health left after surviving a hard landing.
const INJURED_HEALTH: i32 = 50;

/// How an airborne civilian came down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// Parachute landing, back on the street unharmed.
    Safe,
    /// Hard landing survived, hurt and already panicking.
    Injured,
    /// Hard landing killed them.
    Fatal,
}

/// Apply one tick of gravity to a velocity.
#[inline]
pub fn apply_gravity(velocity: &mut Velocity, has_parachute: bool) {
    if has_parachute {
        velocity.vy = (velocity.vy + GRAVITY * PARACHUTE_DRAG).min(PARACHUTE_MAX_FALL);
    } else {
        velocity.vy += GRAVITY;
    }
}

/// Resolve a landing in place and return what happened.
///
/// A parachuted civilian always lands unhurt and unwitnessed. Without a
/// parachute it is a coin flip between death and a half-health civilian who
/// already knows something is wrong. The injured one is not counted as a
/// new witness.
pub fn resolve_landing(civilian: &mut Civilian, has_parachute: bool, rng: &mut SimRng) -> Landing {
    let direction = rng.sign();
    let hue = civilian.hue;

    if has_parachute {
        *civilian = Civilian::new(direction, hue);
        return Landing::Safe;
    }

    if rng.chance(LANDING_DEATH_CHANCE) {
        *civilian = Civilian::new(direction, hue);
        civilian.kill();
        Landing::Fatal
    } else {
        *civilian = Civilian::new(direction, hue);
        civilian.health = INJURED_HEALTH;
        civilian.witnessed = true;
        civilian.state = AgentState::Fleeing;
        Landing::Injured
    }
}

/// Integrate every airborne civilian and hand landed ones back to the street.
///
/// Landed civilians get a fresh `CivilianId`, so they scan after everyone
/// already standing.
#[allow(clippy::too_many_arguments)]
pub fn airborne_physics_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut rng: ResMut<SimRng>,
    mut sequence: ResMut<CivilianSequence>,
    mut escalation: ResMut<EscalationState>,
    mut effects: ResMut<Effects>,
    mut events: ResMut<EventLog>,
    mut flyers: Query<
        (
            Entity,
            &mut CivilianId,
            &mut Position,
            &mut Velocity,
            &mut Airborne,
            &mut Civilian,
        ),
        Without<Standing>,
    >,
) {
    let ground = config.ground_y();
    let width = config.world_width;
    let height = config.world_height;

    let mut order: Vec<(CivilianId, Entity)> = flyers.iter().map(|(e, id, ..)| (*id, e)).collect();
    order.sort_unstable();

    for (_, entity) in order {
        let Ok((entity, mut id, mut pos, mut vel, mut airborne, mut civ)) = flyers.get_mut(entity) else {
            continue;
        };

        apply_gravity(&mut vel, airborne.has_parachute);
        pos.x += vel.vx;
        pos.y += vel.vy;
        airborne.rotation += airborne.rotation_speed;

        if pos.x < -BOUNDS_SLACK || pos.x > width + BOUNDS_SLACK || pos.y > height + BOUNDS_SLACK {
            commands.entity(entity).despawn();
            continue;
        }

        if pos.y + CIVILIAN_SIZE < ground {
            continue;
        }

        pos.y = ground - CIVILIAN_SIZE;
        let landing = resolve_landing(&mut civ, airborne.has_parachute, &mut rng);
        if landing == Landing::Fatal {
            escalation.record_death();
            events.death(&mut rng, pos.x, pos.y);
            effects.spawn_for(EffectKind::Blood, pos.x, pos.y + CIVILIAN_SIZE, LANDING_BLOOD_MS);
        }

        *id = sequence.allocate();
        commands
            .entity(entity)
            .remove::<(Velocity, Airborne)>()
            .insert(Standing);
    }
}
