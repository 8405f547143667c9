use std::collections::VecDeque;

use glam::{vec3, Vec3};
use rand::prelude::*;

use crate::config::{ShootingStarConfig, TrailConfig};

/// Quadratic ease-out: fast start, decelerating into the endpoint.
pub fn ease_out_quad(p: f32) -> f32 {
    1.0 - (1.0 - p) * (1.0 - p)
}

/// The fixed diagonal a shooting star always covers, whatever its start.
const TRAVEL_DELTA: (f32, f32) = (2.0, 1.0);

/// A point that travels a random diagonal over a fixed duration, forever.
/// `advance` returns true when a travel completes; the caller restarts it,
/// which makes the restart instantaneous from the scene's point of view.
#[derive(Debug, Clone)]
pub struct ShootingStar {
    start: Vec3,
    end: Vec3,
    elapsed: f32,
    travel_secs: f32,
    pub position: Vec3,
}

impl ShootingStar {
    pub fn new(config: &ShootingStarConfig, rng: &mut impl Rng) -> Self {
        let start = Self::sample_start(config.depth, rng);
        Self {
            start,
            end: Self::derive_end(start),
            elapsed: 0.0,
            travel_secs: config.travel_secs,
            position: start,
        }
    }

    fn sample_start(depth: f32, rng: &mut impl Rng) -> Vec3 {
        vec3(rng.gen_range(-2.0..2.0), rng.gen_range(1.0..3.0), depth)
    }

    /// The end point is not sampled; it is the start shifted down-left by a
    /// fixed delta so every star crosses the sky the same way.
    fn derive_end(start: Vec3) -> Vec3 {
        vec3(start.x - TRAVEL_DELTA.0, start.y - TRAVEL_DELTA.1, start.z)
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn end(&self) -> Vec3 {
        self.end
    }

    /// Steps the travel tween. Returns true exactly once per cycle, with
    /// `position` left on the end point.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        let progress = (self.elapsed / self.travel_secs).min(1.0);
        self.position = self.start.lerp(self.end, ease_out_quad(progress));
        progress >= 1.0
    }

    /// Re-enters the traveling state with a fresh trajectory.
    pub fn restart(&mut self, rng: &mut impl Rng) {
        self.start = Self::sample_start(self.start.z, rng);
        self.end = Self::derive_end(self.start);
        self.elapsed = 0.0;
        self.position = self.start;
    }
}

#[derive(Debug, Clone)]
pub struct TrailParticle {
    pub offset: Vec3,
    pub color: Vec3,
}

/// A short-lived particle cluster anchored where the shooting star was when
/// it spawned. Opacity tweens 1 -> 0 over a randomized duration; at zero the
/// segment is dropped from the set.
#[derive(Debug, Clone)]
pub struct TrailSegment {
    pub anchor: Vec3,
    pub particles: Vec<TrailParticle>,
    pub opacity: f32,
    elapsed: f32,
    decay_secs: f32,
}

impl TrailSegment {
    fn new(anchor: Vec3, config: &TrailConfig, rng: &mut impl Rng) -> Self {
        let particles = (0..config.particles_per_segment)
            .map(|_| TrailParticle {
                offset: vec3(
                    rng.gen_range(-0.05..0.05),
                    rng.gen_range(-0.05..0.05),
                    rng.gen_range(-0.05..0.05),
                ),
                color: config.colors[rng.gen_range(0..2)],
            })
            .collect();

        Self {
            anchor,
            particles,
            opacity: 1.0,
            elapsed: 0.0,
            decay_secs: config.base_decay_secs * rng.gen_range(1.0..3.0),
        }
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        self.opacity = (1.0 - self.elapsed / self.decay_secs).max(0.0);
    }

    fn expired(&self) -> bool {
        self.opacity <= 0.0
    }
}

/// Live trail segments, oldest first. The set is capped: spawning at
/// capacity evicts the oldest segment instead of growing, so a stalled frame
/// cadence cannot accumulate segments without bound.
#[derive(Debug, Clone)]
pub struct TrailSet {
    segments: VecDeque<TrailSegment>,
    config: TrailConfig,
}

impl TrailSet {
    pub fn new(config: TrailConfig) -> Self {
        Self {
            segments: VecDeque::with_capacity(config.max_segments),
            config,
        }
    }

    pub fn spawn(&mut self, anchor: Vec3, rng: &mut impl Rng) {
        if self.segments.len() == self.config.max_segments {
            self.segments.pop_front();
        }
        self.segments
            .push_back(TrailSegment::new(anchor, &self.config, rng));
    }

    /// Steps every decay tween and drops segments that reached zero. Each
    /// segment leaves the set exactly once, here or by eviction.
    pub fn advance(&mut self, dt: f32) {
        for segment in &mut self.segments {
            segment.advance(dt);
        }
        self.segments.retain(|s| !s.expired());
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailSegment> {
        self.segments.iter()
    }

    pub fn particles_per_segment(&self) -> u32 {
        self.config.particles_per_segment
    }

    pub fn max_segments(&self) -> usize {
        self.config.max_segments
    }
}

#[cfg(test)]
mod tests {
    use glam::vec2;
    use rand_pcg::Pcg64Mcg;

    use crate::config::SkyConfig;

    use super::*;

    fn rng() -> Pcg64Mcg {
        Pcg64Mcg::seed_from_u64(99)
    }

    #[test]
    fn ease_out_hits_endpoints_and_decelerates() {
        assert_eq!(ease_out_quad(0.0), 0.0);
        assert_eq!(ease_out_quad(1.0), 1.0);

        let mut last = 0.0;
        let mut last_step = f32::MAX;
        for i in 1..=10 {
            let value = ease_out_quad(i as f32 / 10.0);
            let step = value - last;
            assert!(value >= last, "not monotonic at step {}", i);
            assert!(step <= last_step + 1e-6, "not decelerating at step {}", i);
            last = value;
            last_step = step;
        }
    }

    #[test]
    fn travel_ends_at_fixed_diagonal_from_start() {
        let config = SkyConfig::default().star;
        let mut rng = rng();
        let mut star = ShootingStar::new(&config, &mut rng);
        let start = star.start();

        let mut completed = false;
        for _ in 0..200 {
            if star.advance(config.travel_secs / 100.0) {
                completed = true;
                break;
            }
        }
        assert!(completed);

        let expected = start - glam::vec3(2.0, 1.0, 0.0);
        assert!((star.position - expected).length() < 1e-4);
        assert_eq!(star.position.z, config.depth);
    }

    #[test]
    fn restart_samples_a_fresh_trajectory_in_range() {
        let config = SkyConfig::default().star;
        let mut rng = rng();
        let mut star = ShootingStar::new(&config, &mut rng);

        for _ in 0..50 {
            star.restart(&mut rng);
            let start = star.start();
            assert!((-2.0..2.0).contains(&start.x));
            assert!((1.0..3.0).contains(&start.y));
            let delta = vec2(start.x - star.end().x, start.y - star.end().y);
            assert!((delta - vec2(2.0, 1.0)).length() < 1e-5);
        }
    }

    #[test]
    fn expired_segments_leave_the_set() {
        let config = SkyConfig::default().trail;
        let base = config.base_decay_secs;
        let mut rng = rng();
        let mut trails = TrailSet::new(config);

        for i in 0..10 {
            trails.spawn(glam::vec3(i as f32, 0.0, 0.0), &mut rng);
        }
        assert_eq!(trails.len(), 10);

        // Decay factor is in [1, 3), so 4x the base duration outlives all.
        trails.advance(base * 4.0);
        assert!(trails.is_empty());
    }

    #[test]
    fn live_set_never_holds_a_decayed_segment() {
        let config = SkyConfig::default().trail;
        let mut rng = rng();
        let mut trails = TrailSet::new(config.clone());

        for _ in 0..64 {
            trails.spawn(Vec3::ZERO, &mut rng);
            trails.advance(config.base_decay_secs * 0.4);
            for segment in trails.iter() {
                assert!(segment.opacity > 0.0);
            }
        }
    }

    #[test]
    fn spawn_at_capacity_evicts_the_oldest() {
        let mut config = SkyConfig::default().trail;
        config.max_segments = 8;
        let mut rng = rng();
        let mut trails = TrailSet::new(config);

        for i in 0..32 {
            trails.spawn(glam::vec3(i as f32, 0.0, 0.0), &mut rng);
            assert!(trails.len() <= 8);
        }
        assert_eq!(trails.len(), 8);
        // Only the 8 most recent anchors remain.
        let oldest = trails.iter().next().unwrap().anchor.x;
        assert_eq!(oldest, 24.0);
    }

    #[test]
    fn decay_duration_scales_base_by_one_to_three() {
        let config = SkyConfig::default().trail;
        let base = config.base_decay_secs;
        let mut rng = rng();
        for _ in 0..100 {
            let segment = TrailSegment::new(Vec3::ZERO, &config, &mut rng);
            assert!(segment.decay_secs >= base);
            assert!(segment.decay_secs < base * 3.0);
            assert_eq!(segment.particles.len(), 5);
        }
    }
}
