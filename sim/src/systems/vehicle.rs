//! Vehicles - entering, exiting, driving and running civilians over.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EventLog, SimEvent};
use crate::rng::SimRng;
use crate::spatial::{distance, Rect};
use crate::systems::combat::Aftermath;
use crate::systems::effects::{Effects, VEHICLE_BLOOD_MS};
use crate::systems::escalation::EscalationState;
use crate::systems::panic::{witness_death, PanicState};
use crate::systems::player::{Player, PlayerInput, PLAYER_SIZE};
use bevy_ecs::prelude::*;
use log::debug;

/// Reach within which the player can climb into a vehicle.
const ENTER_RADIUS: f32 = 80.0;

/// Gap left between a vehicle and the player stepping out.
const EXIT_GAP: f32 = 10.0;

/// Horizontal reach of the bumper.
const BUMPER_REACH: f32 = 20.0;

/// Damage dealt by running a civilian over.
pub const RUN_OVER_DAMAGE: i32 = 50;

/// How far a struck civilian is thrown along the driving direction.
const RUN_OVER_KNOCKBACK: f32 = 50.0;

/// Enter the nearest vehicle in reach, or leave the current one.
pub fn vehicle_toggle_system(
    config: Res<SimConfig>,
    input: Res<PlayerInput>,
    mut player: ResMut<Player>,
    mut events: ResMut<EventLog>,
    mut vehicles: Query<(Entity, &mut Vehicle)>,
) {
    if !input.toggle_vehicle {
        return;
    }

    if let Some(current) = player.vehicle {
        player.vehicle = None;
        let Ok((_, mut vehicle)) = vehicles.get_mut(current) else {
            return;
        };
        vehicle.occupied = false;
        player.position = Position::new(
            vehicle.x + vehicle.width + EXIT_GAP,
            config.ground_y() - PLAYER_SIZE,
        );
        debug!("player left the {}", vehicle.kind.name());
        events.push(SimEvent::VehicleExited {
            kind: vehicle.kind.name().to_string(),
        });
        return;
    }

    let center = player.center();
    let nearest = vehicles
        .iter()
        .map(|(entity, vehicle)| (entity, distance(center, vehicle.center())))
        .filter(|(_, d)| *d < ENTER_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((entity, _)) = nearest {
        if let Ok((_, mut vehicle)) = vehicles.get_mut(entity) {
            vehicle.occupied = true;
            player.vehicle = Some(entity);
            debug!("player entered the {}", vehicle.kind.name());
            events.push(SimEvent::VehicleEntered {
                kind: vehicle.kind.name().to_string(),
            });
        }
    }
}

/// Drive the occupied vehicle and run over whoever is at its bumper.
#[allow(clippy::too_many_arguments)]
pub fn vehicle_drive_system(
    config: Res<SimConfig>,
    input: Res<PlayerInput>,
    mut player: ResMut<Player>,
    mut rng: ResMut<SimRng>,
    mut panic: ResMut<PanicState>,
    mut escalation: ResMut<EscalationState>,
    mut effects: ResMut<Effects>,
    mut events: ResMut<EventLog>,
    mut vehicles: Query<&mut Vehicle>,
    structures: Query<&Structure>,
    mut civilians: Query<(Entity, &CivilianId, &mut Position, &mut Civilian), With<Standing>>,
) {
    let Some(current) = player.vehicle else {
        return;
    };
    let Ok(mut vehicle) = vehicles.get_mut(current) else {
        player.vehicle = None;
        return;
    };

    if input.move_x < 0.0 {
        vehicle.facing = Facing::Left;
        vehicle.x -= vehicle.speed;
    } else if input.move_x > 0.0 {
        vehicle.facing = Facing::Right;
        vehicle.x += vehicle.speed;
    }
    vehicle.x = vehicle.x.clamp(0.0, (config.world_width - vehicle.width).max(0.0));
    player.position.x = vehicle.x + vehicle.width / 2.0 - PLAYER_SIZE / 2.0;
    player.facing = vehicle.facing;

    let vehicle = *vehicle;
    let front = vehicle.front();
    let mut order: Vec<(CivilianId, Entity)> = civilians
        .iter()
        .filter(|(_, _, pos, civ)| {
            civ.is_alive()
                && (pos.x + CIVILIAN_SIZE / 2.0 - front).abs() < BUMPER_REACH
                && pos.y + CIVILIAN_SIZE > vehicle.y
                && pos.y < vehicle.y + vehicle.height
        })
        .map(|(entity, id, _, _)| (*id, entity))
        .collect();
    if order.is_empty() {
        return;
    }
    order.sort_unstable();

    let blockers: Vec<Rect> = structures.iter().map(|s| s.rect).collect();
    let mut aftermath = Aftermath {
        effects: &mut *effects,
        events: &mut *events,
        rng: &mut *rng,
        panic: &mut *panic,
        escalation: &mut *escalation,
    };

    for (_, entity) in order {
        let Ok((_, _, pos, mut civ)) = civilians.get_mut(entity) else {
            continue;
        };
        let hit_at = *pos;
        let outcome = aftermath.hit_with_blood(&mut civ, hit_at, RUN_OVER_DAMAGE, VEHICLE_BLOOD_MS);
        let wounded = outcome == DamageOutcome::Wounded;
        if wounded {
            aftermath.events.injury(aftermath.rng, hit_at.x, hit_at.y);
        }

        witness_death(
            hit_at,
            &blockers,
            civilians.iter_mut().map(|(_, _, p, c)| (*p, c.into_inner())),
            aftermath.panic,
        );

        // Corpses stay where they fell
        if wounded {
            if let Ok((_, _, mut pos, _)) = civilians.get_mut(entity) {
                pos.x += vehicle.facing.sign() * RUN_OVER_KNOCKBACK;
            }
        }
    }
}
