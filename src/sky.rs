use glam::{vec2, Vec2};
use log::info;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::{
    animation::{ShootingStar, TrailSet},
    config::SkyConfig,
    entity::{Camera, CardGroup, Scene, StarLayer},
    field::StarField,
};

/// Radians of layer drift per frame per unit of normalized cursor offset.
const PARALLAX_RATE: f32 = 1.0e-4;

/// The CPU side of the effect: owns the scene and steps every animation once
/// per frame. Holds no GPU state, so the whole frame logic is testable.
pub struct Sky {
    pub scene: Scene,
    running: bool,
    textures_ready: bool,
    cursor: Vec2,
    rng: Pcg64Mcg,
}

impl Sky {
    pub fn new(config: &SkyConfig, aspect_ratio: f32, seed: u64) -> Self {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        info!("Seeded RNG with {}", seed);

        let layers = config
            .layers
            .iter()
            .map(|layer| {
                let field = StarField::generate(layer.count, &layer.bounds, &mut rng);
                StarLayer::new(field, layer.point_size, layer.tint)
            })
            .collect();

        let scene = Scene {
            camera: Camera::new(aspect_ratio),
            layers,
            star: ShootingStar::new(&config.star, &mut rng),
            trails: TrailSet::new(config.trail.clone()),
            card: CardGroup::new(config.card.size, config.card.gap, config.card.spin_rate),
            time: 0.0,
        };

        Self {
            scene,
            running: true,
            textures_ready: false,
            cursor: Vec2::ZERO,
            rng,
        }
    }

    /// Fire-once completion signal from the asset loader. Until it arrives,
    /// frames are no-ops.
    pub fn mark_textures_ready(&mut self) {
        self.textures_ready = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cursor position normalized to [-1, 1] on both axes.
    pub fn on_cursor_move(&mut self, x: f32, y: f32) {
        self.cursor = vec2(x, y);
    }

    pub fn on_click(&mut self) {
        self.scene.card.toggle();
    }

    pub fn on_resize(&mut self, logical_width: f64, aspect_ratio: f32) {
        self.scene.camera.set_viewport(logical_width, aspect_ratio);
    }

    /// Stops the loop and cancels everything tied to the scene. Idempotent,
    /// and safe immediately after construction.
    pub fn shutdown(&mut self) {
        if self.running {
            info!("Sky shut down");
        }
        self.running = false;
        self.scene.trails.clear();
    }

    /// Steps one frame's worth of animation state. Returns true when the
    /// frame should actually draw; state updates always precede the draw.
    pub fn advance_frame(&mut self, dt: f32) -> bool {
        if !self.running || !self.textures_ready {
            return false;
        }

        self.scene.time += dt;

        self.scene.card.advance();

        let completed = self.scene.star.advance(dt);
        self.scene.trails.spawn(self.scene.star.position, &mut self.rng);
        if completed {
            self.scene.star.restart(&mut self.rng);
        }
        self.scene.trails.advance(dt);

        // Vertical cursor motion pitches the layers (x), horizontal yaws
        // them (y).
        for layer in &mut self.scene.layers {
            layer.drift.x += self.cursor.y * PARALLAX_RATE;
            layer.drift.y += self.cursor.x * PARALLAX_RATE;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sky() -> Sky {
        Sky::new(&SkyConfig::default(), 16.0 / 9.0, 42)
    }

    #[test]
    fn frames_are_noops_until_textures_arrive() {
        let mut sky = sky();
        assert!(!sky.advance_frame(0.016));
        assert_eq!(sky.scene.time, 0.0);
        assert!(sky.scene.trails.is_empty());

        sky.mark_textures_ready();
        assert!(sky.advance_frame(0.016));
        assert!(sky.scene.time > 0.0);
    }

    #[test]
    fn shutdown_right_after_init_is_safe_and_idempotent() {
        let mut sky = sky();
        sky.shutdown();
        sky.shutdown();
        assert!(!sky.is_running());

        // A late frame callback must not touch the disposed scene.
        sky.mark_textures_ready();
        assert!(!sky.advance_frame(0.016));
        assert_eq!(sky.scene.time, 0.0);
        assert!(sky.scene.trails.is_empty());
    }

    #[test]
    fn each_frame_spawns_a_trail_segment_at_the_star() {
        let mut sky = sky();
        sky.mark_textures_ready();
        sky.advance_frame(0.016);
        assert_eq!(sky.scene.trails.len(), 1);
        let anchor = sky.scene.trails.iter().next().unwrap().anchor;
        assert_eq!(anchor, sky.scene.star.position);
    }

    #[test]
    fn star_cycle_restarts_without_ending_the_loop() {
        let mut sky = sky();
        sky.mark_textures_ready();
        let travel = SkyConfig::default().star.travel_secs;

        // Run well past several travel durations.
        for _ in 0..10 {
            assert!(sky.advance_frame(travel));
        }
        let start = sky.scene.star.start();
        assert!((-2.0..2.0).contains(&start.x));
        assert!((1.0..3.0).contains(&start.y));
    }

    #[test]
    fn cursor_offset_accumulates_layer_drift() {
        let mut sky = sky();
        sky.mark_textures_ready();
        sky.on_cursor_move(1.0, -0.5);
        sky.advance_frame(0.016);
        sky.advance_frame(0.016);

        for layer in &sky.scene.layers {
            assert!((layer.drift.x + 1.0 * PARALLAX_RATE).abs() < 1e-9);
            assert!((layer.drift.y - 2.0 * PARALLAX_RATE).abs() < 1e-9);
        }
    }

    #[test]
    fn horizontal_cursor_yaws_and_vertical_cursor_pitches() {
        let mut sky = sky();
        sky.mark_textures_ready();

        sky.on_cursor_move(1.0, 0.0);
        sky.advance_frame(0.016);
        let (yaw, pitch, _) = sky.scene.layers[0]
            .rotation()
            .to_euler(glam::EulerRot::YXZ);
        assert!(yaw.abs() > 0.0, "horizontal cursor must yaw the layer");
        assert_eq!(pitch, 0.0);

        sky.on_cursor_move(0.0, 1.0);
        sky.advance_frame(0.016);
        let (_, pitch, _) = sky.scene.layers[0]
            .rotation()
            .to_euler(glam::EulerRot::YXZ);
        assert!(pitch.abs() > 0.0, "vertical cursor must pitch the layer");
    }

    #[test]
    fn layers_match_their_configuration() {
        let config = SkyConfig::default();
        let sky = Sky::new(&config, 1.0, 7);
        assert_eq!(sky.scene.layers.len(), config.layers.len());
        for (layer, cfg) in sky.scene.layers.iter().zip(&config.layers) {
            assert_eq!(layer.field.len(), cfg.count);
            assert_eq!(layer.point_size, cfg.point_size);
        }
    }
}
