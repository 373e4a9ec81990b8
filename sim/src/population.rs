//! City generation and civilian numbering.

use crate::components::*;
use crate::config::SimConfig;
use crate::rng::SimRng;
use crate::spatial::Rect;
use bevy_ecs::prelude::*;
use log::debug;

/// Allocator for civilian spawn sequence numbers.
#[derive(Resource, Debug, Default)]
pub struct CivilianSequence(u32);

impl CivilianSequence {
    /// Next number in scan order.
    pub fn allocate(&mut self) -> CivilianId {
        let id = CivilianId(self.0);
        self.0 = self.0.wrapping_add(1);
        id
    }

    /// Numbers handed out so far.
    pub fn issued(&self) -> u32 {
        self.0
    }
}

/// Random cosmetic hue.
pub fn random_hue(rng: &mut SimRng) -> u16 {
    (rng.unit() * 360.0) as u16
}

/// Populate the world with structures, civilians and vehicles per config.
pub fn generate_city(world: &mut World) {
    let config = world.resource::<SimConfig>().clone();
    let mut structures = Vec::with_capacity(config.building_count as usize);
    let mut civilians = Vec::with_capacity(config.civilian_count as usize);
    let mut vehicles = Vec::with_capacity(config.vehicle_count as usize);

    world.resource_scope(|world, mut rng: Mut<SimRng>| {
        for i in 0..config.building_count {
            let width = rng.range(100.0, 400.0);
            let height = rng.range(100.0, 300.0);
            let x = rng.range(0.0, (config.world_width - width).max(0.0));
            let y = config.ground_y() - height;
            structures.push(StructureBundle::new(i, Rect::new(x, y, width, height)));
        }

        let mut sequence = world.resource_mut::<CivilianSequence>();
        for _ in 0..config.civilian_count {
            let x = rng.range(0.0, config.world_width);
            let civilian = Civilian::new(rng.sign(), random_hue(&mut *rng));
            civilians.push(CivilianBundle::new(sequence.allocate(), x, config.street_y(), civilian));
        }

        for i in 0..config.vehicle_count {
            let kind = if i % 2 == 0 { VehicleKind::Car } else { VehicleKind::Truck };
            let x = 500.0 + rng.range(0.0, (config.world_width - 1000.0).max(0.0));
            vehicles.push(Vehicle::new(kind, x, config.ground_y()));
        }
    });

    world.spawn_batch(structures);
    world.spawn_batch(civilians);
    world.spawn_batch(vehicles);

    debug!(
        "generated city: {} structures, {} civilians, {} vehicles",
        config.building_count, config.civilian_count, config.vehicle_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(config: SimConfig) -> World {
        let mut world = World::new();
        world.insert_resource(SimRng::seeded(11));
        world.insert_resource(CivilianSequence::default());
        world.insert_resource(config);
        world
    }

    #[test]
    fn test_generate_city_counts_and_placement() {
        let config = SimConfig {
            world_width: 2000.0,
            building_count: 5,
            civilian_count: 40,
            ..Default::default()
        };
        let ground = config.ground_y();
        let mut world = world_with(config);
        generate_city(&mut world);

        let mut structures = world.query::<&Structure>();
        assert_eq!(structures.iter(&world).count(), 5);
        for s in structures.iter(&world) {
            assert!((s.rect.bottom() - ground).abs() < 1e-3, "buildings rest on the ground");
        }

        let mut civilians = world.query_filtered::<(&Position, &Civilian), With<Standing>>();
        assert_eq!(civilians.iter(&world).count(), 40);
        for (pos, civ) in civilians.iter(&world) {
            assert_eq!(civ.health, CIVILIAN_HEALTH);
            assert!(pos.x >= 0.0 && pos.x < 2000.0);
        }

        let mut vehicles = world.query::<&Vehicle>();
        let kinds: Vec<_> = vehicles.iter(&world).map(|v| v.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&VehicleKind::Car) && kinds.contains(&VehicleKind::Truck));
        assert_eq!(world.resource::<CivilianSequence>().issued(), 40);
    }
}
