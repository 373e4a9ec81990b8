//! Demolition - placing charges on structures and detonating them.
//!
//! ## Detonation
//!
//! A detonation removes its structure for good, throws 10-30 occupants out
//! of the footprint, damages standing civilians inside the blast radius with
//! linear falloff, and makes everyone within twice the radius a witness.
//! A second charge on an already destroyed structure only produces the
//! blast.

use crate::components::*;
use crate::events::{EventLog, SimEvent};
use crate::population::{random_hue, CivilianSequence};
use crate::rng::SimRng;
use crate::spatial::{direction, distance, Rect};
use crate::systems::combat::Aftermath;
use crate::systems::effects::{Effects, Explosions, Ring};
use crate::systems::escalation::EscalationState;
use crate::systems::movement::DeltaTime;
use crate::systems::panic::{witness, witness_death, PanicState};
use crate::systems::player::{Player, PlayerInput, Weapon};
use bevy_ecs::prelude::*;
use log::{debug, info};
use std::collections::HashSet;
use std::f32::consts::TAU;

/// Fuse length of a freshly placed charge.
pub const FUSE_MS: f32 = 5000.0;

/// How close the player must be to a structure to plant a charge.
const PLACEMENT_MARGIN: f32 = 50.0;

/// Charge height above the structure's base.
const CHARGE_HEIGHT: f32 = 20.0;

/// Knockback applied to blast survivors.
const BLAST_KNOCKBACK: f32 = 10.0;

/// Occupants thrown out of a demolished structure.
const MIN_OCCUPANTS: u32 = 10;
const MAX_OCCUPANTS: u32 = 30;

/// Launch speed range for thrown occupants, and the extra upward kick.
const LAUNCH_MIN: f32 = 5.0;
const LAUNCH_MAX: f32 = 15.0;
const LAUNCH_LIFT: f32 = 10.0;

/// Blast damage at distance `d` from the center, zero at and past `range`.
pub fn blast_damage(d: f32, range: f32, max_damage: i32) -> i32 {
    if d >= range {
        return 0;
    }
    (max_damage as f32 * (1.0 - d / range)).floor() as i32
}

/// Nearest structure whose margin-expanded footprint contains `point`.
pub fn nearest_charge_site<'a, I>(point: Position, structures: I) -> Option<(Entity, Rect)>
where
    I: IntoIterator<Item = (Entity, &'a Structure)>,
{
    structures
        .into_iter()
        .filter(|(_, s)| s.rect.expanded(PLACEMENT_MARGIN).contains_strict(point))
        .map(|(e, s)| (e, s.rect, distance(point, s.rect.center())))
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(e, rect, _)| (e, rect))
}

/// Plant a charge on the nearest structure when the bomb is used.
pub fn charge_placement_system(
    mut commands: Commands,
    input: Res<PlayerInput>,
    player: Res<Player>,
    mut events: ResMut<EventLog>,
    structures: Query<(Entity, &Structure)>,
) {
    if player.weapon != Weapon::Bomb || player.in_vehicle() {
        return;
    }
    if !(input.place_charge || input.attack_started) {
        return;
    }

    let Some((target, rect)) = nearest_charge_site(player.center(), structures.iter()) else {
        return;
    };

    let x = rect.center().x;
    let y = rect.bottom() - CHARGE_HEIGHT;
    commands.spawn(Charge {
        x,
        y,
        structure: target,
        footprint: rect,
        remaining_ms: FUSE_MS,
    });
    debug!("charge placed at ({x:.0}, {y:.0})");
    events.push(SimEvent::ChargePlaced { x, y });
}

/// Count down fuses in real time and detonate expired charges.
#[allow(clippy::too_many_arguments)]
pub fn charge_fuse_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    mut rng: ResMut<SimRng>,
    mut sequence: ResMut<CivilianSequence>,
    mut panic: ResMut<PanicState>,
    mut escalation: ResMut<EscalationState>,
    mut effects: ResMut<Effects>,
    mut events: ResMut<EventLog>,
    mut explosions: ResMut<Explosions>,
    mut charges: Query<(Entity, &mut Charge)>,
    structures: Query<(Entity, &Structure)>,
    mut civilians: Query<(Entity, &CivilianId, &mut Position, &mut Civilian), With<Standing>>,
) {
    let mut expired = Vec::new();
    for (entity, mut charge) in charges.iter_mut() {
        let before = charge.remaining_ms;
        charge.remaining_ms -= dt.0;
        if charge.remaining_ms <= 0.0 {
            expired.push((entity, *charge));
        } else if (charge.remaining_ms / 1000.0).floor() != (before / 1000.0).floor() {
            events.push(SimEvent::ChargeTick {
                x: charge.x,
                y: charge.y,
                seconds_left: (charge.remaining_ms / 1000.0).ceil() as u32,
            });
        }
    }
    if expired.is_empty() {
        return;
    }

    let mut destroyed: HashSet<Entity> = HashSet::new();
    let mut aftermath = Aftermath {
        effects: &mut *effects,
        events: &mut *events,
        rng: &mut *rng,
        panic: &mut *panic,
        escalation: &mut *escalation,
    };

    for (entity, charge) in expired {
        commands.entity(entity).despawn();
        explosions.push(Ring::blast(charge.x, charge.y));

        let intact = structures.get(charge.structure).is_ok() && !destroyed.contains(&charge.structure);
        let launched = if intact {
            destroyed.insert(charge.structure);
            commands.entity(charge.structure).despawn();
            throw_occupants(&mut commands, &charge, &mut sequence, aftermath.rng)
        } else {
            0
        };

        let blockers: Vec<Rect> = structures
            .iter()
            .filter(|(e, _)| !destroyed.contains(e))
            .map(|(_, s)| s.rect)
            .collect();
        blast_civilians(&charge, &blockers, &mut civilians, &mut aftermath);

        info!(
            "charge detonated at ({:.0}, {:.0}), {} occupants thrown",
            charge.x, charge.y, launched
        );
        aftermath.events.push(SimEvent::Detonation {
            x: charge.x,
            y: charge.y,
            launched,
        });
    }
}

/// Spawn the structure's occupants as airborne civilians.
fn throw_occupants(
    commands: &mut Commands,
    charge: &Charge,
    sequence: &mut CivilianSequence,
    rng: &mut SimRng,
) -> u32 {
    let center = Position::new(charge.x, charge.y);
    let footprint = charge.footprint;
    let count = rng.between(MIN_OCCUPANTS, MAX_OCCUPANTS);

    let batch: Vec<AirborneBundle> = (0..count)
        .map(|_| {
            let pos = Position::new(
                footprint.x + rng.unit() * footprint.width,
                footprint.y + rng.unit() * footprint.height,
            );
            let (nx, ny) = direction(center, pos).unwrap_or((0.0, -1.0));
            let magnitude = rng.range(LAUNCH_MIN, LAUNCH_MAX);
            let velocity = Velocity::new(nx * magnitude, ny * magnitude - LAUNCH_LIFT);
            let airborne = Airborne {
                rotation: rng.unit() * TAU,
                rotation_speed: (rng.unit() - 0.5) * 0.2,
                has_parachute: false,
            };
            let hue = random_hue(rng);
            AirborneBundle::new(sequence.allocate(), pos, velocity, airborne, hue)
        })
        .collect();
    commands.spawn_batch(batch);
    count
}

/// Damage, knock back and alarm standing civilians around a blast.
fn blast_civilians(
    charge: &Charge,
    blockers: &[Rect],
    civilians: &mut Query<(Entity, &CivilianId, &mut Position, &mut Civilian), With<Standing>>,
    aftermath: &mut Aftermath,
) {
    let stats = Weapon::Bomb.stats();
    let center = Position::new(charge.x, charge.y);

    let mut order: Vec<(CivilianId, Entity)> = civilians
        .iter()
        .filter(|(_, _, _, civ)| civ.is_alive())
        .map(|(entity, id, _, _)| (*id, entity))
        .collect();
    order.sort_unstable();

    for (_, entity) in order {
        let Ok((_, _, mut pos, mut civ)) = civilians.get_mut(entity) else {
            continue;
        };
        let d = distance(*pos, center);

        if d < stats.range {
            let damage = blast_damage(d, stats.range, stats.damage);
            let outcome = aftermath.hit(&mut civ, *pos, damage);
            match outcome {
                DamageOutcome::Killed => {
                    let origin = *pos;
                    witness_death(
                        origin,
                        blockers,
                        civilians.iter_mut().map(|(_, _, p, c)| (*p, c.into_inner())),
                        aftermath.panic,
                    );
                    continue;
                }
                DamageOutcome::Wounded => {
                    if let Some((nx, _)) = direction(center, *pos) {
                        pos.x += nx * BLAST_KNOCKBACK;
                    }
                    witness(&mut civ, aftermath.panic);
                }
                DamageOutcome::Ignored => {}
            }
        }

        if d < stats.range * 2.0 {
            witness(&mut civ, aftermath.panic);
        }
    }
}
