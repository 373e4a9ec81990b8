//! Render Bridge
//!
//! Flattens the civilian population of a `Snapshot` into one contiguous
//! `Vec<f32>` for renderers that draw thousands of agents per frame and
//! would rather index a float array than walk JSON.
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (3 elements)                                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ [0] civilian_count (as f32)                                     │
//! │ [1] panic_mode     (1.0=latched, 0.0=calm)                      │
//! │ [2] tick           (as f32, inexact past 2^24)                  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ CIVILIAN DATA (civilian_count × CIVILIAN_STRIDE elements)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each civilian i (offset = 3 + i * CIVILIAN_STRIDE):         │
//! │   [+0] id          - Scan order number (u32 as f32)             │
//! │   [+1] x           - X position (world units)                   │
//! │   [+2] y           - Y position (world units)                   │
//! │   [+3] health      - Current health (0-100)                     │
//! │   [+4] is_dead     - 1.0 for corpses                            │
//! │   [+5] witnessed   - 1.0 once the civilian saw violence         │
//! │   [+6] state       - Agent state (see STATE_* constants)        │
//! │   [+7] parachute   - 1.0 while hanging under a parachute        │
//! │   [+8] rotation    - Tumble angle in radians                    │
//! │   [+9] hue         - Cosmetic hue in degrees                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # State Mapping
//!
//! | State       | ID  |
//! |-------------|-----|
//! | Wandering   | 0.0 |
//! | Fleeing     | 1.0 |
//! | Dead        | 2.0 |
//! | Falling     | 3.0 |
//! | Parachuting | 4.0 |
//!
//! Civilians appear in the snapshot's order, which is scan order.

use crate::components::AgentState;
use crate::world::Snapshot;

// ============================================================================
// CONSTANTS - BUFFER CONTRACT
// ============================================================================

/// Number of f32 values per civilian.
///
/// Fields (in order):
/// 0. id, 1. x, 2. y, 3. health, 4. is_dead, 5. witnessed,
/// 6. state, 7. parachute, 8. rotation, 9. hue
pub const CIVILIAN_STRIDE: usize = 10;

/// Number of f32 values in the buffer header.
pub const HEADER_SIZE: usize = 3;

pub const STATE_WANDERING: f32 = 0.0;
pub const STATE_FLEEING: f32 = 1.0;
pub const STATE_DEAD: f32 = 2.0;
pub const STATE_FALLING: f32 = 3.0;
pub const STATE_PARACHUTING: f32 = 4.0;

pub const FIELD_ID: usize = 0;
pub const FIELD_X: usize = 1;
pub const FIELD_Y: usize = 2;
pub const FIELD_HEALTH: usize = 3;
pub const FIELD_IS_DEAD: usize = 4;
pub const FIELD_WITNESSED: usize = 5;
pub const FIELD_STATE: usize = 6;
pub const FIELD_PARACHUTE: usize = 7;
pub const FIELD_ROTATION: usize = 8;
pub const FIELD_HUE: usize = 9;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Numeric ID of an agent state.
#[inline]
pub fn state_to_id(state: AgentState) -> f32 {
    match state {
        AgentState::Wandering => STATE_WANDERING,
        AgentState::Fleeing => STATE_FLEEING,
        AgentState::Dead => STATE_DEAD,
        AgentState::Falling => STATE_FALLING,
        AgentState::Parachuting => STATE_PARACHUTING,
    }
}

#[inline]
fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

// ============================================================================
// MAIN SERIALIZATION FUNCTION
// ============================================================================

/// Convert a snapshot's civilians to a flat buffer.
///
/// The same `Snapshot` always produces the same buffer.
///
/// ```rust
/// use rampage_sim::api::SimWorld;
/// use rampage_sim::render_bridge::{snapshot_to_flatbuffer, CIVILIAN_STRIDE, HEADER_SIZE};
///
/// let mut sim = SimWorld::new();
/// let buffer = snapshot_to_flatbuffer(&sim.snapshot());
/// let count = buffer[0] as usize;
/// assert_eq!(buffer.len(), HEADER_SIZE + count * CIVILIAN_STRIDE);
/// ```
pub fn snapshot_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let count = snapshot.civilians.len();
    let buffer_size = calculate_buffer_size(count);
    let mut buffer = Vec::with_capacity(buffer_size);

    buffer.push(count as f32);
    buffer.push(flag(snapshot.panic_mode));
    buffer.push(snapshot.tick as f32);

    for civ in &snapshot.civilians {
        buffer.push(civ.id as f32);
        buffer.push(civ.x);
        buffer.push(civ.y);
        buffer.push(civ.health as f32);
        buffer.push(flag(civ.dead));
        buffer.push(flag(civ.witnessed));
        buffer.push(state_to_id(civ.state));
        buffer.push(flag(civ.has_parachute));
        buffer.push(civ.rotation);
        buffer.push(f32::from(civ.hue));
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Buffer size mismatch");
    buffer
}

/// `HEADER_SIZE + civilian_count * CIVILIAN_STRIDE`
#[inline]
pub fn calculate_buffer_size(civilian_count: usize) -> usize {
    HEADER_SIZE + civilian_count * CIVILIAN_STRIDE
}

/// Parse the civilian count from a flat buffer.
///
/// Returns `None` if the buffer is shorter than its header.
#[inline]
pub fn parse_civilian_count(buffer: &[f32]) -> Option<usize> {
    if buffer.len() < HEADER_SIZE {
        return None;
    }
    Some(buffer[0] as usize)
}

/// Buffer offset of the civilian at `index`.
#[inline]
pub const fn civilian_offset(index: usize) -> usize {
    HEADER_SIZE + index * CIVILIAN_STRIDE
}
