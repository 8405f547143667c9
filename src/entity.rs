use glam::{vec2, Quat, Vec2, Vec3};

use crate::{
    animation::{ShootingStar, TrailSet},
    field::StarField,
};

#[derive(Debug, Copy, Clone, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// Breakpoint below which a viewport counts as mobile, in logical units.
pub const MOBILE_WIDTH_THRESHOLD: f64 = 768.0;

/// The camera z has exactly two valid values, reselected on every resize.
pub const CAMERA_Z_DESKTOP: f32 = -5.0;
pub const CAMERA_Z_MOBILE: f32 = -7.5;

#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub transform: Transform,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            transform: Transform {
                position: Vec3::Z * CAMERA_Z_DESKTOP,
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
            },
            fov: 75.0,
            aspect_ratio,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn depth_for_width(logical_width: f64) -> f32 {
        if logical_width < MOBILE_WIDTH_THRESHOLD {
            CAMERA_Z_MOBILE
        } else {
            CAMERA_Z_DESKTOP
        }
    }

    /// Applies a resize: new aspect ratio plus the mobile/desktop depth.
    pub fn set_viewport(&mut self, logical_width: f64, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.transform.position.z = Self::depth_for_width(logical_width);
    }
}

/// One starfield layer: an immutable point cloud plus the cursor-driven
/// drift rotation accumulated on it each frame.
#[derive(Debug, Clone)]
pub struct StarLayer {
    pub field: StarField,
    /// Accumulated (x, y) euler rotation from cursor parallax.
    pub drift: Vec2,
    pub point_size: f32,
    pub tint: [f32; 4],
}

impl StarLayer {
    pub fn new(field: StarField, point_size: f32, tint: [f32; 4]) -> Self {
        Self {
            field,
            drift: vec2(0.0, 0.0),
            point_size,
            tint,
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(glam::EulerRot::YXZ, self.drift.y, self.drift.x, 0.0)
    }
}

/// The two-sided greeting card. Front and back faces share one y rotation;
/// the spin advances by a fixed angle per frame while enabled.
#[derive(Debug, Clone)]
pub struct CardGroup {
    pub rotation: f32,
    pub spinning: bool,
    pub size: f32,
    pub gap: f32,
    spin_rate: f32,
}

impl CardGroup {
    pub fn new(size: f32, gap: f32, spin_rate: f32) -> Self {
        Self {
            rotation: 0.0,
            spinning: true,
            size,
            gap,
            spin_rate,
        }
    }

    /// Click handler: a pure state flip, no transition of its own.
    pub fn toggle(&mut self) {
        self.spinning = !self.spinning;
    }

    pub fn advance(&mut self) {
        if self.spinning {
            self.rotation += self.spin_rate;
        }
    }
}

/// Ownership root for everything renderable. Plain data; per-frame stepping
/// lives in `sky`, GPU state in `renderer`.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub layers: Vec<StarLayer>,
    pub star: ShootingStar,
    pub trails: TrailSet,
    pub card: CardGroup,
    /// Monotonic time fed to the pulsation shader, seconds.
    pub time: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_viewport_selects_mobile_depth() {
        assert_eq!(Camera::depth_for_width(500.0), CAMERA_Z_MOBILE);
        assert_eq!(Camera::depth_for_width(1024.0), CAMERA_Z_DESKTOP);
        assert_eq!(Camera::depth_for_width(768.0), CAMERA_Z_DESKTOP);
    }

    #[test]
    fn resize_moves_the_camera_between_the_two_depths() {
        let mut camera = Camera::new(16.0 / 9.0);
        camera.set_viewport(500.0, 0.5);
        assert_eq!(camera.transform.position.z, CAMERA_Z_MOBILE);
        assert_eq!(camera.aspect_ratio, 0.5);

        camera.set_viewport(1024.0, 2.0);
        assert_eq!(camera.transform.position.z, CAMERA_Z_DESKTOP);
    }

    #[test]
    fn double_toggle_restores_spinning_with_no_extra_rotation() {
        let mut card = CardGroup::new(2.0, 0.01, 0.01);
        card.advance();
        card.advance();
        let accrued = card.rotation;

        card.toggle();
        card.advance();
        card.advance();
        card.toggle();

        assert!(card.spinning);
        assert_eq!(card.rotation, accrued);

        card.advance();
        assert!((card.rotation - accrued - 0.01).abs() < 1e-6);
    }
}
