//! Witnessing and the global panic latch.
//!
//! ## Death witnessing
//!
//! Death witnessing has two phases, like the other area sweeps:
//!
//! 1. **Gather** - decide for every observer whether it can see the death
//!    (distance and line of sight). Read-only, parallel with the `parallel`
//!    feature.
//! 2. **Apply** - flip the witnessed flag and bump the global counter,
//!    sequentially so each witness is counted exactly once.

use crate::components::*;
use crate::events::{EventLog, SimEvent};
use crate::spatial::{distance, line_of_sight, Rect};
use crate::systems::effects::Effects;
use crate::systems::player::Player;
use bevy_ecs::prelude::*;
use log::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Radius within which civilians see a death or the player attacking.
pub const WITNESS_RADIUS: f32 = 200.0;

/// Default witness count that latches panic mode.
pub const PANIC_THRESHOLD: u32 = 3;

/// Global witness count and the one-way panic latch.
#[derive(Resource, Debug, Clone)]
pub struct PanicState {
    /// Total witnesses this session. Never decreases.
    pub witnesses: u32,
    /// Once set, never cleared.
    pub panic_mode: bool,
    pub threshold: u32,
}

impl Default for PanicState {
    fn default() -> Self {
        Self::new(PANIC_THRESHOLD)
    }
}

impl PanicState {
    pub fn new(threshold: u32) -> Self {
        Self {
            witnesses: 0,
            panic_mode: false,
            threshold: threshold.max(1),
        }
    }

    #[inline]
    pub fn record_witness(&mut self) {
        self.witnesses = self.witnesses.saturating_add(1);
    }

    /// HUD panic meter, 0..=100.
    pub fn percentage(&self) -> u32 {
        let pct = u64::from(self.witnesses) * 100 / u64::from(self.threshold);
        pct.min(100) as u32
    }

    /// Raise the latch if the threshold is reached. Returns `true` only on
    /// the tick the latch flips.
    pub fn try_latch(&mut self) -> bool {
        if !self.panic_mode && self.witnesses >= self.threshold {
            self.panic_mode = true;
            return true;
        }
        false
    }
}

/// Mark one civilian as a witness, counting it if it is new.
#[inline]
pub fn witness(civilian: &mut Civilian, panic: &mut PanicState) -> bool {
    let fresh = civilian.mark_witnessed();
    if fresh {
        panic.record_witness();
    }
    fresh
}

/// Witness every observer within `radius` of `origin`, no occlusion.
pub fn witness_within<'a, I>(origin: Position, radius: f32, observers: I, panic: &mut PanicState) -> u32
where
    I: IntoIterator<Item = (Position, &'a mut Civilian)>,
{
    let mut count = 0;
    for (pos, civ) in observers {
        if distance(pos, origin) < radius && witness(civ, panic) {
            count += 1;
        }
    }
    count
}

/// Witness a death at `origin`.
///
/// Observers must be living, not yet witnessed, closer than
/// [`WITNESS_RADIUS`] and have line of sight past every structure in
/// `blockers`. Returns the number of new witnesses.
pub fn witness_death<'a, I>(origin: Position, blockers: &[Rect], observers: I, panic: &mut PanicState) -> u32
where
    I: IntoIterator<Item = (Position, &'a mut Civilian)>,
{
    let mut observers: Vec<(Position, &'a mut Civilian)> = observers.into_iter().collect();

    let sees = |(pos, civ): &(Position, &'a mut Civilian)| {
        civ.can_witness()
            && distance(*pos, origin) < WITNESS_RADIUS
            && line_of_sight(origin, *pos, blockers)
    };

    #[cfg(feature = "parallel")]
    let visible: Vec<bool> = observers.par_iter().map(sees).collect();

    #[cfg(not(feature = "parallel"))]
    let visible: Vec<bool> = observers.iter().map(sees).collect();

    let mut count = 0;
    for ((_, civ), seen) in observers.iter_mut().zip(visible) {
        if seen && witness(civ, panic) {
            count += 1;
        }
    }
    count
}

/// Civilians near the player notice while an attack, muzzle flash or blood
/// is on screen.
pub fn proximity_witness_system(
    player: Res<Player>,
    effects: Res<Effects>,
    mut panic: ResMut<PanicState>,
    mut civilians: Query<(&Position, &mut Civilian), With<Standing>>,
) {
    if !effects.violence_visible() {
        return;
    }
    let origin = player.position;
    witness_within(
        origin,
        WITNESS_RADIUS,
        civilians.iter_mut().map(|(pos, civ)| (*pos, civ.into_inner())),
        &mut panic,
    );
}

/// Latch panic mode at the end of a tick once enough civilians have seen
/// violence.
pub fn panic_latch_system(mut panic: ResMut<PanicState>, mut events: ResMut<EventLog>) {
    if panic.try_latch() {
        info!("panic mode latched after {} witnesses", panic.witnesses);
        events.push(SimEvent::PanicLatched {
            witnesses: panic.witnesses,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::effects::EffectKind;

    #[test]
    fn test_percentage_caps_at_100() {
        let mut panic = PanicState::new(3);
        assert_eq!(panic.percentage(), 0);
        panic.record_witness();
        assert_eq!(panic.percentage(), 33);
        panic.record_witness();
        panic.record_witness();
        panic.record_witness();
        assert_eq!(panic.percentage(), 100);
    }

    #[test]
    fn test_latch_is_one_way() {
        let mut panic = PanicState::new(2);
        panic.record_witness();
        assert!(!panic.try_latch());
        panic.record_witness();
        assert!(panic.try_latch());
        assert!(!panic.try_latch());
        assert!(panic.panic_mode);
    }

    #[test]
    fn test_witness_death_respects_radius_and_occlusion() {
        let mut panic = PanicState::default();
        let building = Rect::new(100.0, 400.0, 50.0, 170.0);
        let origin = Position::new(80.0, 520.0);

        let mut near = Civilian::default();
        let mut hidden = Civilian::default();
        let mut far = Civilian::default();
        let mut dead = Civilian::default();
        dead.kill();

        let observers = vec![
            (Position::new(20.0, 520.0), &mut near),
            (Position::new(200.0, 520.0), &mut hidden),
            (Position::new(280.0, 520.0), &mut far),
            (Position::new(60.0, 520.0), &mut dead),
        ];
        let count = witness_death(origin, &[building], observers, &mut panic);

        assert_eq!(count, 1);
        assert_eq!(panic.witnesses, 1);
        assert!(near.witnessed);
        assert!(!hidden.witnessed);
        assert!(!far.witnessed);
        assert!(!dead.witnessed);
    }

    #[test]
    fn test_repeat_witnessing_counts_once() {
        let mut panic = PanicState::default();
        let mut civ = Civilian::default();
        let origin = Position::new(0.0, 0.0);

        witness_death(origin, &[], vec![(Position::new(10.0, 0.0), &mut civ)], &mut panic);
        witness_death(origin, &[], vec![(Position::new(10.0, 0.0), &mut civ)], &mut panic);
        assert_eq!(panic.witnesses, 1);
    }

    #[test]
    fn test_proximity_witness_needs_visible_violence() {
        let mut world = World::new();
        world.insert_resource(Player::new(Position::new(500.0, 520.0)));
        world.insert_resource(Effects::default());
        world.insert_resource(PanicState::default());
        let near = world
            .spawn(CivilianBundle::new(CivilianId(0), 600.0, 520.0, Civilian::default()))
            .id();
        let far = world
            .spawn(CivilianBundle::new(CivilianId(1), 800.0, 520.0, Civilian::default()))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(proximity_witness_system);
        schedule.run(&mut world);
        assert_eq!(world.resource::<PanicState>().witnesses, 0);

        world.resource_mut::<Effects>().spawn(EffectKind::AttackSwing, 530.0, 535.0);
        schedule.run(&mut world);

        assert!(world.get::<Civilian>(near).unwrap().witnessed);
        assert!(!world.get::<Civilian>(far).unwrap().witnessed);
        assert_eq!(world.resource::<PanicState>().witnesses, 1);
    }

    #[test]
    fn test_latch_system_emits_event_once() {
        let mut world = World::new();
        let mut panic = PanicState::default();
        panic.witnesses = 3;
        world.insert_resource(panic);
        world.insert_resource(EventLog::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(panic_latch_system);
        schedule.run(&mut world);
        schedule.run(&mut world);

        assert!(world.resource::<PanicState>().panic_mode);
        assert_eq!(
            world.resource::<EventLog>().events(),
            &[SimEvent::PanicLatched { witnesses: 3 }]
        );
    }
}
