//! Movement system - walks calm civilians and drives fleeing ones away from
//! the player.

use crate::components::*;
use crate::config::SimConfig;
use crate::rng::SimRng;
use crate::spatial::OccupancyGrid;
use crate::systems::panic::PanicState;
use crate::systems::player::Player;
use bevy_ecs::prelude::*;

/// Resource containing the real elapsed time of the current tick, in milliseconds.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Speed of a fleeing civilian (units per tick).
pub const PANIC_SPEED: f32 = 4.0;

/// Edge buffer that turns a wandering civilian around.
const WANDER_EDGE_BUFFER: f32 = 50.0;

/// Edge buffer that pushes a fleeing civilian back inward.
const PANIC_EDGE_BUFFER: f32 = 100.0;

/// Per-tick probability of a wandering civilian turning around.
const WANDER_TURN_CHANCE: f64 = 0.005;

/// Vertical sidestep when a fleeing civilian's target cell is taken.
const SIDESTEP: f32 = 5.0;

/// System that moves every living standing civilian one step.
///
/// Civilians are processed in scan order. Each claims the occupancy cell it
/// wants to enter; if the cell is taken, a wanderer turns around and a
/// fleeing civilian sidesteps vertically instead of moving horizontally.
pub fn civilian_movement_system(
    config: Res<SimConfig>,
    player: Res<Player>,
    panic: Res<PanicState>,
    mut rng: ResMut<SimRng>,
    mut grid: ResMut<OccupancyGrid>,
    mut query: Query<(Entity, &CivilianId, &mut Position, &mut Civilian), With<Standing>>,
) {
    grid.clear();

    let mut order: Vec<(CivilianId, Entity)> = query
        .iter()
        .filter(|(_, _, _, civ)| civ.is_alive())
        .map(|(entity, id, _, _)| (*id, entity))
        .collect();
    order.sort_unstable();

    let width = config.world_width;
    let top = config.street_y();
    let bottom = config.ground_y() - CIVILIAN_SIZE;

    for (_, entity) in order {
        let Ok((entity, _, mut pos, mut civ)) = query.get_mut(entity) else {
            continue;
        };

        if panic.panic_mode || civ.witnessed {
            if civ.state == AgentState::Wandering {
                civ.state = AgentState::Fleeing;
            }

            let away = if pos.x < player.position.x { -1.0 } else { 1.0 };
            let mut new_x = pos.x + away * PANIC_SPEED;
            if new_x < PANIC_EDGE_BUFFER {
                new_x = pos.x + PANIC_SPEED;
            } else if new_x > width - CIVILIAN_SIZE - PANIC_EDGE_BUFFER {
                new_x = pos.x - PANIC_SPEED;
            }

            if grid.try_claim(entity, new_x, pos.y) {
                pos.x = new_x;
            } else {
                let offset = if rng.chance(0.5) { SIDESTEP } else { -SIDESTEP };
                pos.y = (pos.y + offset).min(bottom).max(top);
            }
        } else {
            let mut new_x = pos.x + civ.direction * civ.speed;
            if new_x <= WANDER_EDGE_BUFFER {
                civ.direction = 1.0;
                new_x = WANDER_EDGE_BUFFER + 1.0;
            } else if new_x >= width - CIVILIAN_SIZE - WANDER_EDGE_BUFFER {
                civ.direction = -1.0;
                new_x = width - CIVILIAN_SIZE - WANDER_EDGE_BUFFER - 1.0;
            } else if rng.chance(WANDER_TURN_CHANCE) {
                civ.direction = -civ.direction;
            }

            if grid.try_claim(entity, new_x, pos.y) {
                pos.x = new_x;
            } else {
                civ.direction = -civ.direction;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement_world(panic_mode: bool) -> World {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimRng::seeded(5));
        world.insert_resource(OccupancyGrid::default());
        world.insert_resource(PanicState {
            panic_mode,
            ..Default::default()
        });
        world.insert_resource(Player::new(Position::new(1000.0, 500.0)));
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(civilian_movement_system);
        schedule.run(world);
    }

    #[test]
    fn test_wanderer_walks_in_its_direction() {
        let mut world = movement_world(false);
        let e = world
            .spawn(CivilianBundle::new(CivilianId(0), 500.0, 520.0, Civilian::new(1.0, 0)))
            .id();
        run(&mut world);

        let pos = world.get::<Position>(e).unwrap();
        let civ = world.get::<Civilian>(e).unwrap();
        // A random turn only changes direction for the next tick
        assert!((pos.x - 502.0).abs() < 1e-4);
        assert_eq!(civ.state, AgentState::Wandering);
    }

    #[test]
    fn test_wanderer_turns_at_left_edge() {
        let mut world = movement_world(false);
        let e = world
            .spawn(CivilianBundle::new(CivilianId(0), 51.0, 520.0, Civilian::new(-1.0, 0)))
            .id();
        run(&mut world);

        let civ = world.get::<Civilian>(e).unwrap();
        assert_eq!(civ.direction, 1.0);
        assert!((world.get::<Position>(e).unwrap().x - 51.0).abs() < 1e-4);
    }

    #[test]
    fn test_panic_mode_makes_everyone_flee_from_player() {
        let mut world = movement_world(true);
        let left = world
            .spawn(CivilianBundle::new(CivilianId(0), 800.0, 520.0, Civilian::new(1.0, 0)))
            .id();
        let right = world
            .spawn(CivilianBundle::new(CivilianId(1), 1200.0, 520.0, Civilian::new(-1.0, 0)))
            .id();
        run(&mut world);

        assert!((world.get::<Position>(left).unwrap().x - 796.0).abs() < 1e-4);
        assert!((world.get::<Position>(right).unwrap().x - 1204.0).abs() < 1e-4);
        assert_eq!(world.get::<Civilian>(left).unwrap().state, AgentState::Fleeing);
    }

    #[test]
    fn test_fleeing_civilian_pushed_back_from_edge() {
        let mut world = movement_world(true);
        // Left of the player and already inside the buffer: runs right instead
        let e = world
            .spawn(CivilianBundle::new(CivilianId(0), 99.0, 520.0, Civilian::new(1.0, 0)))
            .id();
        run(&mut world);
        assert!((world.get::<Position>(e).unwrap().x - 103.0).abs() < 1e-4);
    }

    #[test]
    fn test_blocked_wanderer_reverses() {
        let mut world = movement_world(false);
        // Both want the same 30x30 cell this tick; the first in scan order wins
        let first = world
            .spawn(CivilianBundle::new(CivilianId(0), 300.0, 520.0, Civilian::new(1.0, 0)))
            .id();
        let second = world
            .spawn(CivilianBundle::new(CivilianId(1), 305.0, 520.0, Civilian::new(1.0, 0)))
            .id();
        run(&mut world);

        assert!((world.get::<Position>(first).unwrap().x - 302.0).abs() < 1e-4);
        assert!((world.get::<Position>(second).unwrap().x - 305.0).abs() < 1e-4);
        assert_eq!(world.get::<Civilian>(second).unwrap().direction, -1.0);
    }

    #[test]
    fn test_dead_civilians_do_not_move() {
        let mut world = movement_world(true);
        let mut corpse = Civilian::new(1.0, 0);
        corpse.kill();
        let e = world
            .spawn(CivilianBundle::new(CivilianId(0), 700.0, 520.0, corpse))
            .id();
        run(&mut world);
        assert_eq!(world.get::<Position>(e).unwrap().x, 700.0);
        assert_eq!(world.get::<Civilian>(e).unwrap().state, AgentState::Dead);
    }
}
