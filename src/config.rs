use std::path::PathBuf;

use glam::{vec3, Vec3};

use crate::field::Bounds;

/// Everything that varied between the iterations of the original effect:
/// layer counts, sprite set, trail behavior, card artwork. One scene is one
/// `SkyConfig`.
#[derive(Debug, Clone)]
pub struct SkyConfig {
    pub layers: Vec<FieldConfig>,
    pub star: ShootingStarConfig,
    pub trail: TrailConfig,
    pub card: CardConfig,
    /// Frequency k of the pulsation term `sin(t * k + size)`.
    pub pulse_rate: f32,
}

#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub count: u32,
    pub bounds: Bounds,
    pub point_size: f32,
    pub sprite: Option<PathBuf>,
    /// Tint color; alpha is the blend weight toward it.
    pub tint: [f32; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct ShootingStarConfig {
    /// Duration of one start-to-end travel, in seconds.
    pub travel_secs: f32,
    /// Fixed z the star travels at.
    pub depth: f32,
}

#[derive(Debug, Clone)]
pub struct TrailConfig {
    pub particles_per_segment: u32,
    pub base_decay_secs: f32,
    /// Upper bound on live segments; the oldest is evicted when full.
    pub max_segments: usize,
    /// Per-particle color is a coin flip between these two.
    pub colors: [Vec3; 2],
}

#[derive(Debug, Clone)]
pub struct CardConfig {
    pub front: PathBuf,
    pub back: PathBuf,
    pub size: f32,
    /// z gap between the front and back faces.
    pub gap: f32,
    /// Radians added per frame while spinning.
    pub spin_rate: f32,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            layers: vec![
                FieldConfig {
                    count: 900,
                    bounds: Bounds::centered(60.0, 40.0, 50.0),
                    point_size: 0.05,
                    sprite: Some("assets/star_soft.png".into()),
                    tint: [0.75, 0.82, 1.0, 0.35],
                },
                FieldConfig {
                    count: 550,
                    bounds: Bounds::centered(40.0, 28.0, 30.0),
                    point_size: 0.08,
                    sprite: Some("assets/star_sharp.png".into()),
                    tint: [1.0, 0.95, 0.85, 0.25],
                },
                FieldConfig {
                    count: 250,
                    bounds: Bounds::centered(24.0, 16.0, 18.0),
                    point_size: 0.12,
                    sprite: Some("assets/star_soft.png".into()),
                    tint: [1.0, 1.0, 1.0, 0.15],
                },
            ],
            star: ShootingStarConfig {
                travel_secs: 1.2,
                depth: -1.0,
            },
            trail: TrailConfig {
                particles_per_segment: 5,
                base_decay_secs: 0.6,
                max_segments: 240,
                colors: [vec3(1.0, 1.0, 1.0), vec3(1.0, 0.85, 0.55)],
            },
            card: CardConfig {
                front: "assets/card_front.png".into(),
                back: "assets/card_back.png".into(),
                size: 2.0,
                gap: 0.01,
                spin_rate: 0.01,
            },
            pulse_rate: 2.0,
        }
    }
}
