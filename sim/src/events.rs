//! Transient simulation events for UI and audio collaborators.
//!
//! The log is cleared at the start of every `update`, so callers see only
//! the events produced by the most recent tick.

use crate::rng::SimRng;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Phrases shouted by civilians as they die.
pub const DEATH_PHRASES: [&str; 16] = [
    "Why me?!",
    "C'mon!",
    "Nooooo!",
    "I had plans!",
    "Not fair!",
    "I'm too young!",
    "My family...",
    "I regret nothing!",
    "Tell my wife...",
    "Avenge me!",
    "This is it?",
    "I see the light...",
    "Ouch!",
    "That hurt!",
    "I'll be back!",
    "Seriously?!",
];

/// Phrases shouted by civilians who survive being run over.
pub const INJURY_PHRASES: [&str; 5] = ["Ouch!", "My leg!", "Help!", "Watch it!", "I'm hurt!"];

/// What started a reinforcement wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveTrigger {
    Timer,
    DeathToll,
}

/// A single event emitted during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Hit { x: f32, y: f32, amount: i32 },
    Death { x: f32, y: f32, phrase: String },
    Injury { x: f32, y: f32, phrase: String },
    ChargePlaced { x: f32, y: f32 },
    /// Fuse crossed a whole-second boundary.
    ChargeTick { x: f32, y: f32, seconds_left: u32 },
    Detonation { x: f32, y: f32, launched: u32 },
    WaveStarted { trigger: WaveTrigger },
    DropStarted { x: f32, y: f32, count: u32 },
    WaveEnded,
    AbilityStarted,
    AbilityEnded,
    ReloadStarted,
    ReloadFinished,
    VehicleEntered { kind: String },
    VehicleExited { kind: String },
    PanicLatched { witnesses: u32 },
}

/// Per-tick event buffer.
#[derive(Resource, Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Record a death with a random flavor phrase.
    pub fn death(&mut self, rng: &mut SimRng, x: f32, y: f32) {
        let phrase = rng.pick(&DEATH_PHRASES).copied().unwrap_or("...");
        self.push(SimEvent::Death {
            x,
            y,
            phrase: phrase.to_string(),
        });
    }

    /// Record a non-fatal run-over with a random injury phrase.
    pub fn injury(&mut self, rng: &mut SimRng, x: f32, y: f32) {
        let phrase = rng.pick(&INJURY_PHRASES).copied().unwrap_or("...");
        self.push(SimEvent::Injury {
            x,
            y,
            phrase: phrase.to_string(),
        });
    }

    /// Number of death events in the buffer.
    pub fn deaths(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Death { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_death_uses_known_phrase() {
        let mut log = EventLog::default();
        let mut rng = SimRng::seeded(3);
        log.death(&mut rng, 1.0, 2.0);
        match &log.events()[0] {
            SimEvent::Death { phrase, .. } => assert!(DEATH_PHRASES.contains(&phrase.as_str())),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(log.deaths(), 1);
    }
}
