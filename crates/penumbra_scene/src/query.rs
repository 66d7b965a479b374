//! Scene Query
//!
//! The visible set of one `(Scene, Camera)` pair, as three ordered id lists
//! with independent pull cursors. A query is consumed once: cursors never
//! rewind, and [`Scene::visible_objects`](crate::Scene::visible_objects)
//! clears it before refilling it for the next frame.

use penumbra_core::Handle;

use crate::scene::{DirectionalLightHandle, PointLightHandle, SceneObjectHandle};

#[derive(Debug)]
struct Cursor<T> {
    items: Vec<Handle<T>>,
    next: usize,
}

impl<T> Default for Cursor<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next: 0,
        }
    }
}

impl<T> Cursor<T> {
    fn push(&mut self, handle: Handle<T>) {
        self.items.push(handle);
    }

    fn has_next(&self) -> bool {
        self.next < self.items.len()
    }

    fn next(&mut self) -> Handle<T> {
        match self.items.get(self.next) {
            Some(&handle) => {
                self.next += 1;
                handle
            }
            None => Handle::INVALID,
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.next = 0;
    }
}

#[derive(Debug, Default)]
pub struct SceneQuery {
    objects: Cursor<crate::SceneObject>,
    point_lights: Cursor<crate::PointLight>,
    directional_lights: Cursor<crate::DirectionalLight>,
}

impl SceneQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties all three lists and resets the cursors.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.point_lights.clear();
        self.directional_lights.clear();
    }

    pub fn add_object(&mut self, handle: SceneObjectHandle) {
        self.objects.push(handle);
    }

    pub fn add_point_light(&mut self, handle: PointLightHandle) {
        self.point_lights.push(handle);
    }

    pub fn add_directional_light(&mut self, handle: DirectionalLightHandle) {
        self.directional_lights.push(handle);
    }

    #[must_use]
    pub fn has_next_object(&self) -> bool {
        self.objects.has_next()
    }

    /// The next visible object, or [`Handle::INVALID`] once exhausted.
    pub fn next_object(&mut self) -> SceneObjectHandle {
        self.objects.next()
    }

    #[must_use]
    pub fn has_next_point_light(&self) -> bool {
        self.point_lights.has_next()
    }

    pub fn next_point_light(&mut self) -> PointLightHandle {
        self.point_lights.next()
    }

    #[must_use]
    pub fn has_next_directional_light(&self) -> bool {
        self.directional_lights.has_next()
    }

    pub fn next_directional_light(&mut self) -> DirectionalLightHandle {
        self.directional_lights.next()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.items.len()
    }

    #[must_use]
    pub fn point_light_count(&self) -> usize {
        self.point_lights.items.len()
    }

    #[must_use]
    pub fn directional_light_count(&self) -> usize {
        self.directional_lights.items.len()
    }
}
