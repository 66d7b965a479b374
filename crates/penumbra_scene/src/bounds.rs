//! Bounding spheres.

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[inline]
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Applies a scale → rotate → translate transform.
    ///
    /// The radius grows by the largest absolute scale component, so a
    /// non-uniform scale still yields a sphere that encloses the mesh.
    #[must_use]
    pub fn transformed(&self, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let max_scale = scale.abs().max_element();
        Self {
            center: position + rotation * (self.center * scale),
            radius: self.radius * max_scale,
        }
    }
}

impl From<(Vec3, f32)> for BoundingSphere {
    fn from((center, radius): (Vec3, f32)) -> Self {
        Self { center, radius }
    }
}
