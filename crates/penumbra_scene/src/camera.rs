//! Look-at camera with a perspective projection.

use glam::{Mat4, Vec3};

use crate::Frustum;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// World-space point the camera looks at.
    pub look: Vec3,
    pub up: Vec3,
    /// Full vertical field of view, radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            look: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 60_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    #[must_use]
    pub fn new(position: Vec3, look: Vec3, up: Vec3) -> Self {
        Self {
            position,
            look,
            up,
            ..Self::default()
        }
    }

    /// Sets the projection. `fov_y_degrees` is converted to radians.
    #[must_use]
    pub fn with_perspective(mut self, fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        self.fov_y = fov_y_degrees.to_radians();
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self
    }

    #[inline]
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.look - self.position).normalize_or_zero()
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look, self.up)
    }

    /// Right-handed perspective with wgpu's `[0, 1]` depth range.
    #[inline]
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Frustum built from the camera parameters.
    #[must_use]
    pub fn frustum(&self) -> Frustum {
        Frustum::from_perspective(
            self.position,
            self.look,
            self.up,
            self.fov_y,
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}
