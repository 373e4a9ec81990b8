//! Spatial primitives: rectangles, distances, line of sight, and the coarse
//! occupancy grid civilians use to avoid stacking on top of each other.

use crate::components::Position;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rectangle grown by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    /// Strict interior test; points on the edge are outside.
    #[inline]
    pub fn contains_strict(&self, p: Position) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Position, b: Position) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Unit vector from `from` toward `to`, or `None` when the points coincide.
#[inline]
pub fn direction(from: Position, to: Position) -> Option<(f32, f32)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = dx.hypot(dy);
    if len > 0.0 {
        Some((dx / len, dy / len))
    } else {
        None
    }
}

/// Coarse occlusion test between an event and an observer.
///
/// A structure blocks the view only when the event and the observer sit on
/// opposite horizontal sides of it and the event lies within the
/// structure's vertical band. This is not a raycast.
pub fn line_of_sight(event: Position, observer: Position, blockers: &[Rect]) -> bool {
    !blockers.iter().any(|r| {
        let straddles = (event.x < r.x && observer.x > r.right())
            || (event.x > r.right() && observer.x < r.x);
        straddles && event.y >= r.y && event.y <= r.bottom()
    })
}

/// Single-occupant bucket grid rebuilt every movement pass.
///
/// A cell holds at most one civilian per tick. Only the target cell is
/// checked, so civilians in adjacent cells can still overlap.
#[derive(Resource, Debug)]
pub struct OccupancyGrid {
    /// Cell size in world units.
    pub cell_size: f32,
    cells: HashMap<(i32, i32), Entity>,
}

impl Default for OccupancyGrid {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl OccupancyGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Clear all claims (call at the start of each movement pass).
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Claim the cell containing `(x, y)` for `entity`.
    ///
    /// Returns `false` when another entity already claimed it this pass.
    pub fn try_claim(&mut self, entity: Entity, x: f32, y: f32) -> bool {
        let cell = self.world_to_cell(x, y);
        match self.cells.get(&cell) {
            Some(&owner) => owner == entity,
            None => {
                self.cells.insert(cell, entity);
                true
            }
        }
    }

    /// Owner of the cell containing `(x, y)`, if any.
    pub fn occupant(&self, x: f32, y: f32) -> Option<Entity> {
        self.cells.get(&self.world_to_cell(x, y)).copied()
    }

    /// Number of claimed cells.
    pub fn claimed(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_of_sight_blocked_by_straddled_building() {
        let building = Rect::new(100.0, 400.0, 50.0, 170.0);
        let death = Position::new(80.0, 500.0);
        let behind = Position::new(200.0, 520.0);
        let same_side = Position::new(20.0, 520.0);

        assert!(!line_of_sight(death, behind, &[building]));
        assert!(line_of_sight(death, same_side, &[building]));
    }

    #[test]
    fn test_line_of_sight_ignores_building_outside_vertical_band() {
        let building = Rect::new(100.0, 400.0, 50.0, 100.0);
        // Event above the building's band
        let death = Position::new(80.0, 300.0);
        let observer = Position::new(200.0, 300.0);
        assert!(line_of_sight(death, observer, &[building]));
    }

    #[test]
    fn test_occupancy_single_claim_per_cell() {
        let mut grid = OccupancyGrid::new(30.0);

        let e1 = Entity::from_raw(1);
        let e2 = Entity::from_raw(2);

        assert!(grid.try_claim(e1, 5.0, 5.0));
        // Same cell, different entity
        assert!(!grid.try_claim(e2, 20.0, 10.0));
        // Adjacent cell is free
        assert!(grid.try_claim(e2, 31.0, 10.0));
        assert_eq!(grid.occupant(10.0, 10.0), Some(e1));
        assert_eq!(grid.claimed(), 2);

        grid.clear();
        assert!(grid.try_claim(e2, 5.0, 5.0));
    }

    #[test]
    fn test_rect_expanded_contains() {
        let r = Rect::new(100.0, 100.0, 50.0, 50.0);
        let grown = r.expanded(50.0);
        assert!(grown.contains_strict(Position::new(60.0, 60.0)));
        assert!(!grown.contains_strict(Position::new(50.0, 60.0)));
    }

    #[test]
    fn test_direction_of_coincident_points() {
        let p = Position::new(3.0, 4.0);
        assert!(direction(p, p).is_none());
        let (nx, ny) = direction(Position::new(0.0, 0.0), p).unwrap();
        assert!((nx - 0.6).abs() < 1e-6 && (ny - 0.8).abs() < 1e-6);
    }
}
