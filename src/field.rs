use std::ops::Range;

use rand::prelude::*;

/// Per-axis sampling ranges. The common case is symmetric around the origin
/// but nothing requires it.
#[derive(Debug, Clone)]
pub struct Bounds {
    pub x: Range<f32>,
    pub y: Range<f32>,
    pub z: Range<f32>,
}

impl Bounds {
    pub fn centered(width: f32, height: f32, depth: f32) -> Self {
        Self {
            x: -width * 0.5..width * 0.5,
            y: -height * 0.5..height * 0.5,
            z: -depth * 0.5..depth * 0.5,
        }
    }
}

/// A static starfield layer. Positions are a flat xyz buffer, immutable after
/// generation; all animation happens in the vertex shader.
#[derive(Debug, Clone)]
pub struct StarField {
    positions: Vec<f32>,
    sizes: Vec<f32>,
}

impl StarField {
    /// Samples `count` points, each axis independently uniform within its
    /// range. The per-particle size attribute doubles as the phase offset of
    /// the pulsation term, so it is sampled over a full turn.
    pub fn generate(count: u32, bounds: &Bounds, rng: &mut impl Rng) -> Self {
        let mut positions = Vec::with_capacity(count as usize * 3);
        let mut sizes = Vec::with_capacity(count as usize);

        for _ in 0..count {
            positions.push(rng.gen_range(bounds.x.clone()));
            positions.push(rng.gen_range(bounds.y.clone()));
            positions.push(rng.gen_range(bounds.z.clone()));
            sizes.push(rng.gen_range(0.5..std::f32::consts::TAU));
        }

        Self { positions, sizes }
    }

    pub fn len(&self) -> u32 {
        self.sizes.len() as u32
    }

    /// Flat xyz components, 3 per particle.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }
}

#[cfg(test)]
mod tests {
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn buffer_has_three_components_per_particle() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let field = StarField::generate(321, &Bounds::centered(10.0, 10.0, 10.0), &mut rng);
        assert_eq!(field.positions().len(), 321 * 3);
        assert_eq!(field.sizes().len(), 321);
        assert_eq!(field.len(), 321);
    }

    #[test]
    fn samples_stay_within_asymmetric_bounds() {
        let bounds = Bounds {
            x: -200.0..200.0,
            y: -50.0..50.0,
            z: -55.0..45.0,
        };
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let field = StarField::generate(1500, &bounds, &mut rng);

        assert_eq!(field.positions().len(), 4500);
        for chunk in field.positions().chunks_exact(3) {
            assert!(bounds.x.contains(&chunk[0]), "x out of bounds: {}", chunk[0]);
            assert!(bounds.y.contains(&chunk[1]), "y out of bounds: {}", chunk[1]);
            assert!(bounds.z.contains(&chunk[2]), "z out of bounds: {}", chunk[2]);
        }
    }

    #[test]
    fn centered_bounds_are_symmetric() {
        let bounds = Bounds::centered(60.0, 40.0, 50.0);
        assert_eq!(bounds.x, -30.0..30.0);
        assert_eq!(bounds.y, -20.0..20.0);
        assert_eq!(bounds.z, -25.0..25.0);
    }
}
