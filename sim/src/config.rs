//! Simulation configuration.
//!
//! `SimConfig` carries the world extents, generation counts and escalation
//! tunables. Weapon and physics constants live next to the systems that use
//! them.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Height of the ground strip below the ground line.
pub const GROUND_MARGIN: f32 = 30.0;

/// Distance above the bottom edge at which standing civilians walk.
pub const STREET_OFFSET: f32 = 80.0;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds a value the simulation cannot run with.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tunables for a simulation session.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Horizontal extent of the city in world units.
    pub world_width: f32,
    /// Vertical extent of the playfield. The ground line sits `GROUND_MARGIN` above it.
    pub world_height: f32,
    /// Number of structures generated at startup.
    pub building_count: u32,
    /// Number of civilians generated at startup.
    pub civilian_count: u32,
    /// Number of vehicles generated at startup (alternating car/truck).
    pub vehicle_count: u32,
    /// Optional RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Witnesses needed to latch panic mode.
    pub panic_threshold: u32,
    /// Milliseconds between timed reinforcement waves.
    pub reinforcement_interval_ms: f32,
    /// Deaths since the last wave that force an early wave.
    pub death_threshold: u32,
    /// Total parachuting civilians released per wave.
    pub drop_count: u32,
    /// Civilians released per drop batch.
    pub drop_batch_size: u32,
    /// Milliseconds between drop batches.
    pub drop_batch_interval_ms: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 5000.0,
            world_height: 600.0,
            building_count: 30,
            civilian_count: 500,
            vehicle_count: 2,
            seed: None,
            panic_threshold: 3,
            reinforcement_interval_ms: 60_000.0,
            death_threshold: 400,
            drop_count: 2222,
            drop_batch_size: 50,
            drop_batch_interval_ms: 500.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a playable world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.world_width > 0.0) {
            return Err(ConfigError::Invalid {
                field: "world_width",
                reason: "must be positive",
            });
        }
        if !(self.world_height > STREET_OFFSET + GROUND_MARGIN) {
            return Err(ConfigError::Invalid {
                field: "world_height",
                reason: "must leave room for the street above the ground strip",
            });
        }
        if self.panic_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "panic_threshold",
                reason: "must be at least 1",
            });
        }
        if self.drop_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "drop_batch_size",
                reason: "must be at least 1",
            });
        }
        if self.reinforcement_interval_ms < 0.0 || self.drop_batch_interval_ms < 0.0 {
            return Err(ConfigError::Invalid {
                field: "reinforcement_interval_ms",
                reason: "timers cannot be negative",
            });
        }
        Ok(())
    }

    /// Y coordinate of the ground line.
    #[inline]
    pub fn ground_y(&self) -> f32 {
        self.world_height - GROUND_MARGIN
    }

    /// Y coordinate at which standing civilians are generated.
    #[inline]
    pub fn street_y(&self) -> f32 {
        self.world_height - STREET_OFFSET
    }
}
