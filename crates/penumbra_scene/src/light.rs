//! Light sources.

use glam::Vec3;

use crate::BoundingSphere;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Distance at which the contribution reaches zero.
    pub radius: f32,
    pub color: Vec3,
    pub intensity: f32,
    pub casts_shadow: bool,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            radius: 10.0,
            color: Vec3::ONE,
            intensity: 1.0,
            casts_shadow: false,
        }
    }
}

impl PointLight {
    #[must_use]
    pub fn new(position: Vec3, radius: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            radius,
            color,
            intensity,
            casts_shadow: false,
        }
    }

    #[must_use]
    pub fn with_shadows(mut self) -> Self {
        self.casts_shadow = true;
        self
    }

    /// The volume the light can reach.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> BoundingSphere {
        BoundingSphere::new(self.position, self.radius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub casts_shadow: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.3, -1.0, -0.2).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
            casts_shadow: false,
        }
    }
}

impl DirectionalLight {
    #[must_use]
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
            casts_shadow: false,
        }
    }

    #[must_use]
    pub fn with_shadows(mut self) -> Self {
        self.casts_shadow = true;
        self
    }
}

/// The ambient term: a color and a scalar intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 0.1,
        }
    }
}

impl AmbientLight {
    #[inline]
    #[must_use]
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}
