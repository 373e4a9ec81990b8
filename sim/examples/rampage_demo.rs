//! Scripted rampage through a generated city.
//!
//! Run with: cargo run --example rampage_demo
//! Set `RUST_LOG=debug` for charge and carrier details.

use env_logger::{Builder, Env};
use rampage_sim::{SimConfig, SimEvent, SimWorld, Weapon};

/// Frame time fed to `update`, about 60 frames per second.
const FRAME_MS: f32 = 16.0;

fn init_logging() {
    let env = Env::default().default_filter_or("info");
    let _ = Builder::from_env(env).try_init();
}

fn main() {
    init_logging();
    println!("=== Rampage - Simulation Demo ===\n");

    let config = SimConfig {
        seed: Some(2024),
        death_threshold: 25,
        drop_count: 200,
        ..Default::default()
    };
    let mut sim = match SimWorld::try_with_config(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid config: {err}");
            return;
        }
    };

    println!("Initial state:");
    print_summary(&mut sim);

    // Walk right swinging an axe
    sim.select_weapon(Weapon::Axe);
    sim.set_movement(1.0, 0.0);
    sim.attack_start();
    run(&mut sim, 600);
    sim.attack_stop();

    // Shoot along the street
    sim.select_weapon(Weapon::Gun);
    for _ in 0..60 {
        sim.attack_start();
        run(&mut sim, 8);
        sim.attack_stop();
        run(&mut sim, 1);
    }

    // Blow up whatever building is closest, then go wild
    sim.set_movement(0.0, 0.0);
    sim.select_weapon(Weapon::Bomb);
    sim.update(FRAME_MS);
    sim.place_charge();
    sim.activate_ability();
    run(&mut sim, 400);

    println!("\nAfter the rampage:");
    print_summary(&mut sim);

    // Let the reinforcement wave play out
    run(&mut sim, 3000);
    println!("\nAfter the reinforcements:");
    print_summary(&mut sim);

    println!("\n=== Final Escalation State (JSON) ===\n");
    match serde_json::to_string_pretty(&sim.snapshot().escalation) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("snapshot failed: {err}"),
    }
}

fn run(sim: &mut SimWorld, ticks: usize) {
    for _ in 0..ticks {
        sim.update(FRAME_MS);
        for event in sim.events() {
            match event {
                SimEvent::Death { x, phrase, .. } => println!("  [x={x:.0}] \"{phrase}\""),
                SimEvent::WaveStarted { trigger } => println!("  reinforcements inbound ({trigger:?})"),
                SimEvent::Detonation { launched, .. } => println!("  BOOM - {launched} launched"),
                _ => {}
            }
        }
    }
}

fn print_summary(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    println!(
        "  tick={} t={:.1}s civilians={} dead={} airborne={} structures={}",
        snapshot.tick,
        snapshot.time_ms / 1000.0,
        snapshot.civilians.len(),
        snapshot.dead_count(),
        snapshot.airborne_count(),
        snapshot.structures.len()
    );
    println!(
        "  panic={}% (latched: {}) wave={:?} deaths since wave={}",
        snapshot.panic_percentage,
        snapshot.panic_mode,
        snapshot.escalation.phase,
        snapshot.escalation.deaths_since_wave
    );
}
