//! Rampage ability: a cooldown-gated speed buff with a launching shockwave.

use crate::components::*;
use crate::events::{EventLog, SimEvent};
use crate::rng::SimRng;
use crate::spatial::{direction, distance};
use crate::systems::effects::{Explosions, Ring};
use crate::systems::movement::DeltaTime;
use crate::systems::player::{Player, PlayerInput};
use bevy_ecs::prelude::*;
use log::info;
use std::f32::consts::TAU;

/// Cooldown started on activation.
pub const ABILITY_COOLDOWN_MS: f32 = 30_000.0;

/// How long the speed buff lasts.
pub const ABILITY_DURATION_MS: f32 = 10_000.0;

/// Player speed multiplier while active.
pub const ABILITY_SPEED_MULTIPLIER: f32 = 3.0;

const SHOCKWAVE_START_RADIUS: f32 = 10.0;
const SHOCKWAVE_MAX_RADIUS: f32 = 500.0;
const SHOCKWAVE_GROWTH: f32 = 15.0;

/// Launch speeds given to swept civilians.
const LAUNCH_OUTWARD: f32 = 15.0;
const LAUNCH_VERTICAL: f32 = 10.0;
const LAUNCH_LIFT: f32 = 10.0;

/// Expanding sweep front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shockwave {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Shockwave {
    /// Does a civilian at distance `d` sit inside the band just swept?
    #[inline]
    fn sweeps(&self, d: f32) -> bool {
        d < self.radius && d > self.radius - SHOCKWAVE_GROWTH
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct AbilityState {
    pub cooldown_ms: f32,
    pub active: bool,
    pub remaining_ms: f32,
    pub shockwave: Option<Shockwave>,
    pub activations: u32,
}

impl AbilityState {
    pub fn ready(&self) -> bool {
        self.cooldown_ms <= 0.0
    }
}

/// Tick the cooldown and buff, handle activation and sweep the shockwave.
#[allow(clippy::too_many_arguments)]
pub fn ability_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    input: Res<PlayerInput>,
    mut player: ResMut<Player>,
    mut state: ResMut<AbilityState>,
    mut rng: ResMut<SimRng>,
    mut explosions: ResMut<Explosions>,
    mut events: ResMut<EventLog>,
    mut civilians: Query<(Entity, &CivilianId, &Position, &mut Civilian), With<Standing>>,
) {
    state.cooldown_ms = (state.cooldown_ms - dt.0).max(0.0);

    if state.active {
        state.remaining_ms -= dt.0;
        if state.remaining_ms <= 0.0 {
            state.active = false;
            state.remaining_ms = 0.0;
            player.speed_multiplier = 1.0;
            info!("rampage ability ended");
            events.push(SimEvent::AbilityEnded);
        }
    }

    if input.activate_ability && state.ready() {
        let center = player.center();
        state.cooldown_ms = ABILITY_COOLDOWN_MS;
        state.active = true;
        state.remaining_ms = ABILITY_DURATION_MS;
        state.activations += 1;
        state.shockwave = Some(Shockwave {
            x: center.x,
            y: center.y,
            radius: SHOCKWAVE_START_RADIUS,
        });
        player.speed_multiplier = ABILITY_SPEED_MULTIPLIER;
        explosions.push(Ring::shockwave(center.x, center.y));
        info!("rampage ability activated at ({:.0}, {:.0})", center.x, center.y);
        events.push(SimEvent::AbilityStarted);
    }

    let Some(mut wave) = state.shockwave else {
        return;
    };
    wave.radius += SHOCKWAVE_GROWTH;
    let origin = Position::new(wave.x, wave.y);

    let mut swept: Vec<(CivilianId, Entity, Position)> = civilians
        .iter()
        .filter(|(_, _, pos, civ)| civ.is_alive() && wave.sweeps(distance(**pos, origin)))
        .map(|(entity, id, pos, _)| (*id, entity, *pos))
        .collect();
    swept.sort_unstable_by_key(|(id, _, _)| *id);

    for (_, entity, pos) in swept {
        let Ok((_, _, _, mut civ)) = civilians.get_mut(entity) else {
            continue;
        };
        civ.state = AgentState::Falling;
        let (nx, ny) = direction(origin, pos).unwrap_or((0.0, -1.0));
        let velocity = Velocity::new(nx * LAUNCH_OUTWARD, ny * LAUNCH_VERTICAL - LAUNCH_LIFT);
        let airborne = Airborne {
            rotation: rng.unit() * TAU,
            rotation_speed: (rng.unit() - 0.5) * 0.2,
            has_parachute: false,
        };
        commands
            .entity(entity)
            .remove::<Standing>()
            .insert((velocity, airborne));
    }

    state.shockwave = if wave.radius < SHOCKWAVE_MAX_RADIUS {
        Some(wave)
    } else {
        None
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability_world() -> World {
        let mut world = World::new();
        world.insert_resource(DeltaTime(16.0));
        world.insert_resource(PlayerInput::default());
        world.insert_resource(Player::new(Position::new(1000.0, 520.0)));
        world.insert_resource(AbilityState::default());
        world.insert_resource(SimRng::seeded(4));
        world.insert_resource(Explosions::default());
        world.insert_resource(EventLog::default());
        world
    }

    fn schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(ability_system);
        schedule
    }

    #[test]
    fn test_activation_sets_cooldown_and_speed() {
        let mut world = ability_world();
        world.resource_mut::<PlayerInput>().activate_ability = true;
        schedule().run(&mut world);

        let state = world.resource::<AbilityState>();
        assert!(state.active);
        assert_eq!(state.cooldown_ms, ABILITY_COOLDOWN_MS);
        assert_eq!(world.resource::<Player>().speed_multiplier, 3.0);
        assert_eq!(world.resource::<Explosions>().rings.len(), 1);
        assert_eq!(world.resource::<EventLog>().events(), &[SimEvent::AbilityStarted]);
    }

    #[test]
    fn test_activation_rejected_during_cooldown() {
        let mut world = ability_world();
        world.resource_mut::<AbilityState>().cooldown_ms = 5000.0;
        world.resource_mut::<PlayerInput>().activate_ability = true;
        schedule().run(&mut world);

        let state = world.resource::<AbilityState>();
        assert!(!state.active);
        assert_eq!(state.cooldown_ms, 5000.0 - 16.0);
        assert!(state.shockwave.is_none());
        assert_eq!(world.resource::<Player>().speed_multiplier, 1.0);
    }

    #[test]
    fn test_buff_ends_after_duration() {
        let mut world = ability_world();
        world.resource_mut::<PlayerInput>().activate_ability = true;
        let mut schedule = schedule();
        schedule.run(&mut world);
        world.resource_mut::<PlayerInput>().activate_ability = false;

        world.insert_resource(DeltaTime(5000.0));
        schedule.run(&mut world);
        assert!(world.resource::<AbilityState>().active);
        schedule.run(&mut world);

        let state = world.resource::<AbilityState>();
        assert!(!state.active);
        assert_eq!(state.cooldown_ms, ABILITY_COOLDOWN_MS - 10_000.0);
        assert_eq!(world.resource::<Player>().speed_multiplier, 1.0);
        assert!(world.resource::<EventLog>().events().contains(&SimEvent::AbilityEnded));
    }

    #[test]
    fn test_shockwave_sweeps_each_civilian_once() {
        let mut world = ability_world();
        // Player center is (1015, 535)
        let near = world
            .spawn(CivilianBundle::new(CivilianId(0), 1035.0, 535.0, Civilian::default()))
            .id();
        let far = world
            .spawn(CivilianBundle::new(CivilianId(1), 1615.0, 535.0, Civilian::default()))
            .id();
        let mut corpse = Civilian::default();
        corpse.kill();
        let dead = world
            .spawn(CivilianBundle::new(CivilianId(2), 1035.0, 535.0, corpse))
            .id();

        world.resource_mut::<PlayerInput>().activate_ability = true;
        let mut schedule = schedule();
        schedule.run(&mut world);
        world.resource_mut::<PlayerInput>().activate_ability = false;

        // Radius 25 this tick: the civilian 20 away is launched
        assert!(world.get::<Standing>(near).is_none());
        let vel = *world.get::<Velocity>(near).unwrap();
        assert_eq!(vel.vx, 15.0);
        assert_eq!(vel.vy, -10.0);
        assert_eq!(world.get::<Civilian>(near).unwrap().state, AgentState::Falling);
        assert_eq!(world.get::<Civilian>(near).unwrap().health, 100);

        for _ in 0..40 {
            schedule.run(&mut world);
        }
        assert!(world.resource::<AbilityState>().shockwave.is_none());
        // Beyond the maximum radius
        assert!(world.get::<Standing>(far).is_some());
        // Corpses stay put
        assert!(world.get::<Standing>(dead).is_some());
    }
}
