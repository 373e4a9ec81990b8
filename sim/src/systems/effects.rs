//! Timed visual effect records and expanding explosion rings.
//!
//! Effects live in real time and are compacted at the end of every tick.
//! Rings grow a fixed amount per tick and fade once past half their
//! maximum radius.

use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of short-lived visual effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Melee swing animation.
    AttackSwing,
    MuzzleFlash,
    BulletTrail,
    BulletImpact,
    Blood,
}

impl EffectKind {
    /// Default lifetime in milliseconds.
    pub fn lifetime_ms(self) -> f32 {
        match self {
            EffectKind::AttackSwing => 167.0,
            EffectKind::MuzzleFlash => 83.0,
            EffectKind::BulletTrail => 83.0,
            EffectKind::BulletImpact => 250.0,
            EffectKind::Blood => 1667.0,
        }
    }

    /// Effects that make nearby civilians notice the player.
    #[inline]
    pub fn is_violent(self) -> bool {
        matches!(
            self,
            EffectKind::AttackSwing | EffectKind::MuzzleFlash | EffectKind::Blood
        )
    }
}

/// Blood left by a vehicle hit.
pub const VEHICLE_BLOOD_MS: f32 = 2500.0;

/// Blood left by a fatal landing.
pub const LANDING_BLOOD_MS: f32 = 3333.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub x: f32,
    pub y: f32,
    /// Second point for line effects (bullet trail end).
    pub x2: f32,
    pub y2: f32,
    pub remaining_ms: f32,
}

/// All live visual effects.
#[derive(Resource, Debug, Default)]
pub struct Effects {
    effects: Vec<Effect>,
}

impl Effects {
    pub fn spawn(&mut self, kind: EffectKind, x: f32, y: f32) {
        self.spawn_for(kind, x, y, kind.lifetime_ms());
    }

    pub fn spawn_for(&mut self, kind: EffectKind, x: f32, y: f32, lifetime_ms: f32) {
        self.effects.push(Effect {
            kind,
            x,
            y,
            x2: x,
            y2: y,
            remaining_ms: lifetime_ms,
        });
    }

    pub fn spawn_line(&mut self, kind: EffectKind, from: (f32, f32), to: (f32, f32)) {
        self.effects.push(Effect {
            kind,
            x: from.0,
            y: from.1,
            x2: to.0,
            y2: to.1,
            remaining_ms: kind.lifetime_ms(),
        });
    }

    /// Is any swing, muzzle flash or blood effect still showing?
    pub fn violence_visible(&self) -> bool {
        self.effects.iter().any(|e| e.kind.is_violent())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Age every effect and drop the expired ones.
    pub fn advance(&mut self, dt_ms: f32) {
        for effect in &mut self.effects {
            effect.remaining_ms -= dt_ms;
        }
        self.effects.retain(|e| e.remaining_ms > 0.0);
    }
}

// ============================================================================
// RINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingKind {
    Blast,
    Shockwave,
}

/// Expanding, fading circle drawn for blasts and shockwaves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub kind: RingKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub max_radius: f32,
    pub growth: f32,
    pub alpha: f32,
    pub fade: f32,
}

impl Ring {
    pub fn blast(x: f32, y: f32) -> Self {
        Self {
            kind: RingKind::Blast,
            x,
            y,
            radius: 10.0,
            max_radius: 150.0,
            growth: 10.0,
            alpha: 1.0,
            fade: 0.02,
        }
    }

    pub fn shockwave(x: f32, y: f32) -> Self {
        Self {
            kind: RingKind::Shockwave,
            x,
            y,
            radius: 10.0,
            max_radius: 500.0,
            growth: 15.0,
            alpha: 1.0,
            fade: 0.01,
        }
    }

    fn step(&mut self) {
        self.radius += self.growth;
        if self.radius >= self.max_radius / 2.0 {
            self.alpha -= self.fade;
        }
    }
}

/// Live explosion and shockwave rings.
#[derive(Resource, Debug, Default)]
pub struct Explosions {
    pub rings: Vec<Ring>,
}

impl Explosions {
    pub fn push(&mut self, ring: Ring) {
        self.rings.push(ring);
    }
}

/// Grow and fade rings, removing fully faded ones.
pub fn explosion_visual_system(mut explosions: ResMut<Explosions>) {
    for ring in &mut explosions.rings {
        ring.step();
    }
    explosions.rings.retain(|r| r.alpha > 0.0);
}

/// Age timed effects by the tick's real elapsed time.
pub fn effect_expiry_system(dt: Res<DeltaTime>, mut effects: ResMut<Effects>) {
    effects.advance(dt.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_expire_in_real_time() {
        let mut effects = Effects::default();
        effects.spawn(EffectKind::MuzzleFlash, 0.0, 0.0);
        effects.spawn(EffectKind::Blood, 0.0, 0.0);
        assert!(effects.violence_visible());

        effects.advance(100.0);
        assert_eq!(effects.len(), 1);

        effects.advance(2000.0);
        assert!(effects.is_empty());
        assert!(!effects.violence_visible());
    }

    #[test]
    fn test_trail_is_not_violent() {
        let mut effects = Effects::default();
        effects.spawn_line(EffectKind::BulletTrail, (0.0, 0.0), (300.0, 0.0));
        assert!(!effects.violence_visible());
    }

    #[test]
    fn test_blast_ring_fades_and_is_removed() {
        let mut world = World::new();
        let mut explosions = Explosions::default();
        explosions.push(Ring::blast(0.0, 0.0));
        world.insert_resource(explosions);

        let mut schedule = Schedule::default();
        schedule.add_systems(explosion_visual_system);

        // Radius reaches half max after 7 ticks, then 50 fade steps to zero alpha
        for _ in 0..6 {
            schedule.run(&mut world);
        }
        assert_eq!(world.resource::<Explosions>().rings[0].alpha, 1.0);

        for _ in 0..60 {
            schedule.run(&mut world);
        }
        assert!(world.resource::<Explosions>().rings.is_empty());
    }
}
