//! Combat system - melee strikes and hitscan gunfire against civilians.
//!
//! ## Hit resolution
//!
//! Every damage source (melee, gun, blast, vehicle) funnels through
//! [`Aftermath::hit`], which applies damage, spawns blood, emits the hit
//! event and, when the hit kills, counts the death exactly once and emits a
//! death phrase. The caller then runs death witnessing from the corpse,
//! because that needs the civilian query the caller already holds.
//!
//! ## Scan order
//!
//! Targets are resolved in ascending `CivilianId`. The gun hits the first
//! civilian in that order inside its ray, which is not necessarily the
//! nearest one.

use crate::components::*;
use crate::events::{EventLog, SimEvent};
use crate::rng::SimRng;
use crate::spatial::Rect;
use crate::systems::effects::{EffectKind, Effects};
use crate::systems::escalation::EscalationState;
use crate::systems::movement::DeltaTime;
use crate::systems::panic::{witness_death, PanicState};
use crate::systems::player::{FireMode, Player, PlayerInput, Weapon, PLAYER_SIZE};
use bevy_ecs::prelude::*;

/// Real time between melee strikes while the attack is held.
pub const SWING_INTERVAL_MS: f32 = 167.0;

/// Half-height of the gun's vertical hit band.
const GUN_BAND: f32 = 30.0;

/// Shared sinks for the side effects of hurting civilians.
pub struct Aftermath<'a> {
    pub effects: &'a mut Effects,
    pub events: &'a mut EventLog,
    pub rng: &'a mut SimRng,
    pub panic: &'a mut PanicState,
    pub escalation: &'a mut EscalationState,
}

impl Aftermath<'_> {
    /// Damage one civilian at `pos`.
    ///
    /// Corpses are ignored outright: no blood, no event, no death count.
    pub fn hit(&mut self, civilian: &mut Civilian, pos: Position, damage: i32) -> DamageOutcome {
        self.hit_with_blood(civilian, pos, damage, EffectKind::Blood.lifetime_ms())
    }

    /// [`Aftermath::hit`] with a custom blood lifetime.
    pub fn hit_with_blood(&mut self, civilian: &mut Civilian, pos: Position, damage: i32, blood_ms: f32) -> DamageOutcome {
        let outcome = civilian.apply_damage(damage);
        if outcome == DamageOutcome::Ignored {
            return outcome;
        }
        self.effects.spawn_for(EffectKind::Blood, pos.x, pos.y, blood_ms);
        self.events.push(SimEvent::Hit {
            x: pos.x,
            y: pos.y,
            amount: damage,
        });
        if outcome == DamageOutcome::Killed {
            self.record_death(pos);
        }
        outcome
    }

    /// Count a death and shout a phrase for it.
    pub fn record_death(&mut self, pos: Position) {
        self.escalation.record_death();
        self.events.death(self.rng, pos.x, pos.y);
    }
}

/// Footprints of every standing structure, for line-of-sight checks.
pub fn structure_blockers(structures: &Query<&Structure>) -> Vec<Rect> {
    structures.iter().map(|s| s.rect).collect()
}

/// Living standing civilians in scan order.
fn scan_order(civilians: &Query<(Entity, &CivilianId, &Position, &mut Civilian), With<Standing>>) -> Vec<(Entity, Position)> {
    let mut order: Vec<(CivilianId, Entity, Position)> = civilians
        .iter()
        .filter(|(_, _, _, civ)| civ.is_alive())
        .map(|(entity, id, pos, _)| (*id, entity, *pos))
        .collect();
    order.sort_unstable_by_key(|(id, _, _)| *id);
    order.into_iter().map(|(_, entity, pos)| (entity, pos)).collect()
}

/// Does the held or freshly pressed trigger produce a melee strike this tick?
fn melee_strike_due(player: &mut Player, input: &PlayerInput, dt_ms: f32) -> bool {
    if input.attack_started {
        player.swing_timer_ms = SWING_INTERVAL_MS;
        return true;
    }
    if !input.attack_held {
        return false;
    }
    player.swing_timer_ms -= dt_ms;
    if player.swing_timer_ms <= 0.0 {
        player.swing_timer_ms += SWING_INTERVAL_MS;
        return true;
    }
    false
}

/// System that resolves the player's melee and gun attacks.
///
/// Melee: every living civilian within range of the anchor in front of the
/// player is hit once per strike. Gun: one shot per trigger press, limited
/// by ammo, reload and the minimum shot interval.
#[allow(clippy::too_many_arguments)]
pub fn attack_system(
    dt: Res<DeltaTime>,
    input: Res<PlayerInput>,
    mut player: ResMut<Player>,
    mut effects: ResMut<Effects>,
    mut events: ResMut<EventLog>,
    mut rng: ResMut<SimRng>,
    mut panic: ResMut<PanicState>,
    mut escalation: ResMut<EscalationState>,
    structures: Query<&Structure>,
    mut civilians: Query<(Entity, &CivilianId, &Position, &mut Civilian), With<Standing>>,
) {
    if player.in_vehicle() {
        return;
    }

    let mut aftermath = Aftermath {
        effects: &mut *effects,
        events: &mut *events,
        rng: &mut *rng,
        panic: &mut *panic,
        escalation: &mut *escalation,
    };

    match player.weapon.stats().fire_mode {
        FireMode::Melee => {
            if melee_strike_due(&mut player, &input, dt.0) {
                melee_strike(&player, &structures, &mut civilians, &mut aftermath);
            }
        }
        FireMode::Hitscan => {
            if input.attack_started && player.gun.can_fire() {
                fire_gun(&mut player, &structures, &mut civilians, &mut aftermath);
            }
        }
        // Charges are handled by the demolition systems
        FireMode::Placed => {}
    }
}

fn melee_strike(
    player: &Player,
    structures: &Query<&Structure>,
    civilians: &mut Query<(Entity, &CivilianId, &Position, &mut Civilian), With<Standing>>,
    aftermath: &mut Aftermath,
) {
    let stats = player.weapon.stats();
    let origin = player.position;
    let anchor_x = match player.facing {
        Facing::Right => origin.x + PLAYER_SIZE,
        Facing::Left => origin.x - stats.range,
    };
    let edge_x = match player.facing {
        Facing::Right => origin.x + PLAYER_SIZE,
        Facing::Left => origin.x,
    };
    aftermath
        .effects
        .spawn(EffectKind::AttackSwing, edge_x, origin.y + PLAYER_SIZE / 2.0);

    let blockers = structure_blockers(structures);
    for (entity, pos) in scan_order(civilians) {
        if (pos.x - anchor_x).hypot(pos.y - origin.y) >= stats.range {
            continue;
        }
        let outcome = match civilians.get_mut(entity) {
            Ok((_, _, _, mut civ)) => aftermath.hit(&mut civ, pos, stats.damage),
            Err(_) => continue,
        };
        if outcome == DamageOutcome::Killed {
            witness_death(
                pos,
                &blockers,
                civilians.iter_mut().map(|(_, _, p, civ)| (*p, civ.into_inner())),
                aftermath.panic,
            );
        }
    }
}

fn fire_gun(
    player: &mut Player,
    structures: &Query<&Structure>,
    civilians: &mut Query<(Entity, &CivilianId, &Position, &mut Civilian), With<Standing>>,
    aftermath: &mut Aftermath,
) {
    let stats = Weapon::Gun.stats();
    player.gun.ammo -= 1;
    player.gun.since_last_shot_ms = 0.0;

    let origin = player.position;
    let sign = player.facing.sign();
    let muzzle_x = match player.facing {
        Facing::Right => origin.x + PLAYER_SIZE + 15.0,
        Facing::Left => origin.x - 15.0,
    };
    let start_x = match player.facing {
        Facing::Right => origin.x + PLAYER_SIZE,
        Facing::Left => origin.x,
    };
    let center_y = origin.y + PLAYER_SIZE / 2.0;

    aftermath.effects.spawn(EffectKind::MuzzleFlash, muzzle_x, center_y);
    aftermath.effects.spawn_line(
        EffectKind::BulletTrail,
        (muzzle_x, center_y),
        (start_x + sign * stats.range, center_y),
    );

    let in_span = |x: f32| match player.facing {
        Facing::Right => x > start_x && x < start_x + stats.range,
        Facing::Left => x < start_x && x > start_x - stats.range,
    };
    let target = scan_order(civilians)
        .into_iter()
        .find(|(_, pos)| in_span(pos.x) && (pos.y + CIVILIAN_SIZE / 2.0 - center_y).abs() < GUN_BAND);

    if let Some((entity, pos)) = target {
        let impact_x = match player.facing {
            Facing::Right => pos.x,
            Facing::Left => pos.x + CIVILIAN_SIZE,
        };
        aftermath.effects.spawn(EffectKind::BulletImpact, impact_x, center_y);

        let outcome = match civilians.get_mut(entity) {
            Ok((_, _, _, mut civ)) => aftermath.hit(&mut civ, pos, stats.damage),
            Err(_) => DamageOutcome::Ignored,
        };
        if outcome == DamageOutcome::Killed {
            let blockers = structure_blockers(structures);
            witness_death(
                pos,
                &blockers,
                civilians.iter_mut().map(|(_, _, p, civ)| (*p, civ.into_inner())),
                aftermath.panic,
            );
        }
    }

    if player.gun.ammo == 0 && player.gun.start_reload() {
        aftermath.events.push(SimEvent::ReloadStarted);
    }
}
