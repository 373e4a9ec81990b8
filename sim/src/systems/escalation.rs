//! Escalation scheduler - reinforcement waves and their parachute drops.
//!
//! A wave starts when either the wave timer or the death toll since the last
//! wave reaches its threshold. A carrier flies in from the left, starts a
//! drop sequence at the middle of the city and then leaves at double speed.
//! Drop sequences release batches on a real-time interval and keep going
//! after the carrier is gone.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EventLog, SimEvent, WaveTrigger};
use crate::population::{random_hue, CivilianSequence};
use crate::rng::SimRng;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Carrier entry point, left of the city.
const CARRIER_START_X: f32 = -200.0;
/// Carrier altitude.
const CARRIER_Y: f32 = 100.0;
/// Inbound carrier speed (units per tick). Departure is twice this.
pub const CARRIER_SPEED: f32 = 3.0;
/// Distance past the right edge at which the carrier is gone.
const CARRIER_EXIT_MARGIN: f32 = 200.0;
/// Horizontal spread of dropped civilians around the carrier.
const DROP_SPREAD: f32 = 100.0;
/// Drop height below the carrier.
const DROP_OFFSET_Y: f32 = 20.0;

/// Phase of the reinforcement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WavePhase {
    #[default]
    Idle,
    Inbound,
    Departing,
}

/// The reinforcement aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub drop_x: f32,
}

impl Carrier {
    pub fn new(world_width: f32) -> Self {
        Self {
            x: CARRIER_START_X,
            y: CARRIER_Y,
            speed: CARRIER_SPEED,
            drop_x: world_width / 2.0,
        }
    }
}

/// Pending parachute batches from one drop.
///
/// The anchor stays at the drop point for the whole sequence, however far
/// the carrier has flown since.
#[derive(Debug, Clone, PartialEq)]
pub struct DropSequence {
    pub anchor_x: f32,
    pub anchor_y: f32,
    /// Civilians still to be released.
    pub remaining: u32,
    /// Real time until the next batch.
    pub until_next_ms: f32,
}

impl DropSequence {
    pub fn new(anchor_x: f32, anchor_y: f32, total: u32) -> Self {
        Self {
            anchor_x,
            anchor_y,
            remaining: total,
            until_next_ms: 0.0,
        }
    }

    /// Sequence anchored at the carrier's drop point, kept far enough from
    /// the edges that the whole spread lands inside the city.
    pub fn at_drop_point(carrier: &Carrier, world_width: f32, total: u32) -> Self {
        let anchor_x = if world_width > DROP_SPREAD * 2.0 {
            carrier.drop_x.clamp(DROP_SPREAD, world_width - DROP_SPREAD)
        } else {
            world_width / 2.0
        };
        Self::new(anchor_x, carrier.y, total)
    }

    /// Sizes of the batches released after `dt_ms` elapses.
    fn due_batches(&mut self, dt_ms: f32, batch_size: u32, interval_ms: f32) -> Vec<u32> {
        self.until_next_ms -= dt_ms;
        let mut batches = Vec::new();
        while self.until_next_ms <= 0.0 && self.remaining > 0 {
            let count = batch_size.min(self.remaining);
            self.remaining -= count;
            batches.push(count);
            self.until_next_ms += interval_ms;
        }
        batches
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

/// Wave timer, death toll and the active carrier.
#[derive(Resource, Debug, Clone, Default)]
pub struct EscalationState {
    pub phase: WavePhase,
    pub carrier: Option<Carrier>,
    pub drops: Vec<DropSequence>,
    /// Real time spent idle since the last wave started or ended.
    pub since_last_wave_ms: f32,
    /// Deaths since the last wave ended.
    pub deaths_since_wave: u32,
    /// Deaths this session.
    pub total_deaths: u64,
    pub waves_started: u32,
}

impl EscalationState {
    pub fn record_death(&mut self) {
        self.deaths_since_wave = self.deaths_since_wave.saturating_add(1);
        self.total_deaths += 1;
    }

    /// Milliseconds until the wave timer fires, zero during a wave.
    pub fn countdown_ms(&self, config: &SimConfig) -> f32 {
        match self.phase {
            WavePhase::Idle => (config.reinforcement_interval_ms - self.since_last_wave_ms).max(0.0),
            _ => 0.0,
        }
    }

    /// Civilians still waiting in drop queues.
    pub fn pending_drops(&self) -> u32 {
        self.drops.iter().map(|d| d.remaining).sum()
    }

    fn start_wave(&mut self, config: &SimConfig, trigger: WaveTrigger, events: &mut EventLog) {
        self.phase = WavePhase::Inbound;
        self.carrier = Some(Carrier::new(config.world_width));
        self.since_last_wave_ms = 0.0;
        self.waves_started += 1;
        info!(
            "reinforcement wave {} started ({:?}, {} deaths since last wave)",
            self.waves_started, trigger, self.deaths_since_wave
        );
        events.push(SimEvent::WaveStarted { trigger });
    }

    fn end_wave(&mut self, events: &mut EventLog) {
        self.phase = WavePhase::Idle;
        self.carrier = None;
        self.deaths_since_wave = 0;
        self.since_last_wave_ms = 0.0;
        info!("reinforcement wave {} ended", self.waves_started);
        events.push(SimEvent::WaveEnded);
    }
}

/// Advance the wave state machine by one tick.
pub fn escalation_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut state: ResMut<EscalationState>,
    mut events: ResMut<EventLog>,
) {
    let phase = state.phase;
    match phase {
        WavePhase::Idle => {
            state.since_last_wave_ms += dt.0;
            if state.deaths_since_wave >= config.death_threshold {
                state.start_wave(&config, WaveTrigger::DeathToll, &mut events);
            } else if state.since_last_wave_ms >= config.reinforcement_interval_ms {
                state.start_wave(&config, WaveTrigger::Timer, &mut events);
            }
        }
        WavePhase::Inbound => {
            let Some(mut carrier) = state.carrier else {
                state.phase = WavePhase::Idle;
                return;
            };
            carrier.x += carrier.speed;
            state.carrier = Some(carrier);
            if carrier.x >= carrier.drop_x {
                let drop = DropSequence::at_drop_point(&carrier, config.world_width, config.drop_count);
                debug!("carrier dropping {} civilians at x={:.0}", config.drop_count, drop.anchor_x);
                events.push(SimEvent::DropStarted {
                    x: drop.anchor_x,
                    y: drop.anchor_y,
                    count: config.drop_count,
                });
                state.drops.push(drop);
                state.phase = WavePhase::Departing;
            }
        }
        WavePhase::Departing => {
            let Some(mut carrier) = state.carrier else {
                state.end_wave(&mut events);
                return;
            };
            carrier.x += carrier.speed * 2.0;
            state.carrier = Some(carrier);
            if carrier.x > config.world_width + CARRIER_EXIT_MARGIN {
                state.end_wave(&mut events);
            }
        }
    }
}

/// Release due parachute batches from every drop sequence.
pub fn drop_release_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut state: ResMut<EscalationState>,
    mut rng: ResMut<SimRng>,
    mut sequence: ResMut<CivilianSequence>,
) {
    let batch_size = config.drop_batch_size.max(1);

    for drop in &mut state.drops {
        for count in drop.due_batches(dt.0, batch_size, config.drop_batch_interval_ms) {
            let batch: Vec<AirborneBundle> = (0..count)
                .map(|_| {
                    let x = drop.anchor_x - DROP_SPREAD + rng.range(0.0, DROP_SPREAD * 2.0);
                    let position = Position::new(x, drop.anchor_y + DROP_OFFSET_Y);
                    let velocity = Velocity::new(rng.range(-1.0, 1.0), rng.range(1.0, 3.0));
                    let airborne = Airborne {
                        rotation: 0.0,
                        rotation_speed: 0.0,
                        has_parachute: true,
                    };
                    let hue = random_hue(&mut rng);
                    AirborneBundle::new(sequence.allocate(), position, velocity, airborne, hue)
                })
                .collect();
            commands.spawn_batch(batch);
        }
    }

    state.drops.retain(|d| !d.is_finished());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escalation_world(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(DeltaTime(16.0));
        world.insert_resource(EscalationState::default());
        world.insert_resource(EventLog::default());
        world.insert_resource(SimRng::seeded(21));
        world.insert_resource(CivilianSequence::default());
        world
    }

    fn schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems((escalation_system, drop_release_system).chain());
        schedule
    }

    #[test]
    fn test_death_toll_starts_wave_regardless_of_timer() {
        let mut world = escalation_world(SimConfig::default());
        world.resource_mut::<EscalationState>().deaths_since_wave = 400;
        schedule().run(&mut world);

        let state = world.resource::<EscalationState>();
        assert_eq!(state.phase, WavePhase::Inbound);
        assert!(state.carrier.is_some());
        assert_eq!(
            world.resource::<EventLog>().events(),
            &[SimEvent::WaveStarted {
                trigger: WaveTrigger::DeathToll
            }]
        );
    }

    #[test]
    fn test_timer_starts_wave() {
        let mut world = escalation_world(SimConfig {
            reinforcement_interval_ms: 100.0,
            ..Default::default()
        });
        world.insert_resource(DeltaTime(60.0));
        let mut schedule = schedule();
        schedule.run(&mut world);
        assert_eq!(world.resource::<EscalationState>().phase, WavePhase::Idle);
        schedule.run(&mut world);
        assert_eq!(world.resource::<EscalationState>().phase, WavePhase::Inbound);
    }

    #[test]
    fn test_batches_release_on_interval_with_remainder() {
        let mut drop = DropSequence::new(0.0, 0.0, 120);
        assert_eq!(drop.due_batches(16.0, 50, 500.0), vec![50]);
        assert!(drop.due_batches(400.0, 50, 500.0).is_empty());
        assert_eq!(drop.due_batches(100.0, 50, 500.0), vec![50]);
        assert_eq!(drop.due_batches(500.0, 50, 500.0), vec![20]);
        assert!(drop.is_finished());
    }

    #[test]
    fn test_drop_point_keeps_spread_inside_world() {
        let carrier = Carrier::new(5000.0);
        let drop = DropSequence::at_drop_point(&carrier, 5000.0, 10);
        assert_eq!(drop.anchor_x, 2500.0);

        let mut off_edge = carrier;
        off_edge.drop_x = 4990.0;
        let drop = DropSequence::at_drop_point(&off_edge, 5000.0, 10);
        assert_eq!(drop.anchor_x, 4900.0);

        let drop = DropSequence::at_drop_point(&Carrier::new(150.0), 150.0, 10);
        assert_eq!(drop.anchor_x, 75.0);
    }

    #[test]
    fn test_default_wave_releases_every_civilian_over_the_city() {
        let mut world = escalation_world(SimConfig::default());
        world.resource_mut::<EscalationState>().deaths_since_wave = 400;
        let mut schedule = schedule();

        let mut wave_ended = false;
        for _ in 0..5000 {
            schedule.run(&mut world);
            if world.resource::<EventLog>().events().contains(&SimEvent::WaveEnded) {
                wave_ended = true;
            }
            world.resource_mut::<EventLog>().clear();
            let state = world.resource::<EscalationState>();
            if wave_ended && state.drops.is_empty() {
                break;
            }
        }

        // Carrier left long before the last batch
        assert!(wave_ended);
        assert_eq!(world.resource::<EscalationState>().pending_drops(), 0);

        let mut flyers = world.query::<(&Position, &Airborne)>();
        let released: Vec<_> = flyers.iter(&world).collect();
        assert_eq!(released.len(), 2222);
        assert!(released
            .iter()
            .all(|(pos, a)| a.has_parachute && pos.x >= 2400.0 && pos.x < 2600.0));
    }

    #[test]
    fn test_full_wave_cycle() {
        let config = SimConfig {
            world_width: 600.0,
            drop_count: 120,
            ..Default::default()
        };
        let mut world = escalation_world(config);
        world.resource_mut::<EscalationState>().deaths_since_wave = 400;
        let mut schedule = schedule();

        let mut dropped = false;
        for _ in 0..2000 {
            schedule.run(&mut world);
            if world.resource::<EscalationState>().phase == WavePhase::Departing {
                dropped = true;
            }
            let state = world.resource::<EscalationState>();
            if dropped && state.phase == WavePhase::Idle && state.drops.is_empty() {
                break;
            }
            world.resource_mut::<EventLog>().clear();
        }

        let state = world.resource::<EscalationState>();
        assert!(dropped);
        assert_eq!(state.phase, WavePhase::Idle);
        assert_eq!(state.deaths_since_wave, 0);
        assert!(state.carrier.is_none());

        let mut airborne = world.query::<(&Civilian, &Airborne)>();
        let all: Vec<_> = airborne.iter(&world).collect();
        assert_eq!(all.len(), 120);
        assert!(all
            .iter()
            .all(|(civ, a)| a.has_parachute && civ.state == AgentState::Parachuting));
    }
}
