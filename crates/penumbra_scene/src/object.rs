//! Scene objects.
//!
//! The world-space bounding sphere is cached and recomputed on every
//! transform write, so readers never see a stale value.

use glam::{Mat4, Quat, Vec3};

use penumbra_resources::{MaterialHandle, MeshHandle, ModelHandle};

use crate::BoundingSphere;

/// What an object draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderable {
    Mesh {
        mesh: MeshHandle,
        material: MaterialHandle,
    },
    Model(ModelHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    renderable: Renderable,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    visible: bool,
    local_bounds: BoundingSphere,
    world_bounds: BoundingSphere,
}

impl SceneObject {
    /// An object at the origin with identity rotation and unit scale.
    #[must_use]
    pub fn new(renderable: Renderable, local_bounds: BoundingSphere) -> Self {
        Self {
            renderable,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            visible: true,
            local_bounds,
            world_bounds: local_bounds,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    fn refresh_bounds(&mut self) {
        self.world_bounds = self
            .local_bounds
            .transformed(self.position, self.rotation, self.scale);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn renderable(&self) -> Renderable {
        self.renderable
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Cached world-space bounding sphere.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> BoundingSphere {
        self.world_bounds
    }

    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.refresh_bounds();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.refresh_bounds();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.refresh_bounds();
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
