//! Scene
//!
//! Dense, append-only stores of objects, point lights and directional lights
//! plus a single ambient term. Handles are indices into those stores and are
//! valid for the lifetime of the scene; there is no removal.
//!
//! Out-of-range handles passed to the panicking accessors are caller bugs.
//! The `get_*` variants return `Option` for code that must tolerate them.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use penumbra_core::Handle;
use penumbra_resources::ResourceStore;

use crate::{
    AmbientLight, BoundingSphere, Camera, DirectionalLight, PointLight, Renderable, SceneObject,
    SceneQuery,
};

pub type SceneObjectHandle = Handle<SceneObject>;
pub type PointLightHandle = Handle<PointLight>;
pub type DirectionalLightHandle = Handle<DirectionalLight>;

/// Per-frame culling switches, passed explicitly into
/// [`Scene::visible_objects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    pub view_frustum_culling: bool,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            view_frustum_culling: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    point_lights: Vec<PointLight>,
    directional_lights: Vec<DirectionalLight>,
    ambient: AmbientLight,
}

fn next_handle<T>(len: usize) -> Handle<T> {
    Handle::from_raw(len as u32)
}

/// Smallest sphere (by the simple two-sphere construction) enclosing both.
fn merge_spheres(a: BoundingSphere, b: BoundingSphere) -> BoundingSphere {
    let offset = b.center - a.center;
    let dist = offset.length();
    if dist + b.radius <= a.radius {
        return a;
    }
    if dist + a.radius <= b.radius {
        return b;
    }
    let radius = (dist + a.radius + b.radius) * 0.5;
    let center = a.center + offset * ((radius - a.radius) / dist);
    BoundingSphere::new(center, radius)
}

/// Local-space bounds of whatever `renderable` draws, if its meshes exist.
#[must_use]
pub fn local_bounds(store: &ResourceStore, renderable: Renderable) -> Option<BoundingSphere> {
    match renderable {
        Renderable::Mesh { mesh, .. } => store.mesh(mesh).map(|m| m.bounding_sphere().into()),
        Renderable::Model(model) => store
            .model(model)?
            .parts
            .iter()
            .filter_map(|part| store.mesh(part.mesh))
            .map(|m| BoundingSphere::from(m.bounding_sphere()))
            .reduce(merge_spheres),
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Objects
    // ========================================================================

    pub fn create_object(&mut self, object: SceneObject) -> SceneObjectHandle {
        let handle = next_handle(self.objects.len());
        self.objects.push(object);
        handle
    }

    /// Creates an object whose local bounds come from the meshes in `store`.
    ///
    /// Unresolvable meshes fall back to a unit sphere with a warning so the
    /// object is still culled sensibly.
    pub fn create_renderable(&mut self, store: &ResourceStore, renderable: Renderable) -> SceneObjectHandle {
        let bounds = local_bounds(store, renderable).unwrap_or_else(|| {
            log::warn!("No mesh bounds for {renderable:?}; using a unit sphere");
            BoundingSphere::new(Vec3::ZERO, 1.0)
        });
        self.create_object(SceneObject::new(renderable, bounds))
    }

    #[must_use]
    pub fn object(&self, handle: SceneObjectHandle) -> &SceneObject {
        &self.objects[handle.index()]
    }

    pub fn object_mut(&mut self, handle: SceneObjectHandle) -> &mut SceneObject {
        &mut self.objects[handle.index()]
    }

    #[must_use]
    pub fn get_object(&self, handle: SceneObjectHandle) -> Option<&SceneObject> {
        self.objects.get(handle.index())
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> impl Iterator<Item = (SceneObjectHandle, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (next_handle(i), o))
    }

    // ========================================================================
    // Lights
    // ========================================================================

    pub fn create_point_light(&mut self, light: PointLight) -> PointLightHandle {
        let handle = next_handle(self.point_lights.len());
        self.point_lights.push(light);
        handle
    }

    #[must_use]
    pub fn point_light(&self, handle: PointLightHandle) -> &PointLight {
        &self.point_lights[handle.index()]
    }

    pub fn point_light_mut(&mut self, handle: PointLightHandle) -> &mut PointLight {
        &mut self.point_lights[handle.index()]
    }

    #[must_use]
    pub fn get_point_light(&self, handle: PointLightHandle) -> Option<&PointLight> {
        self.point_lights.get(handle.index())
    }

    #[must_use]
    pub fn point_light_count(&self) -> usize {
        self.point_lights.len()
    }

    pub fn create_directional_light(&mut self, light: DirectionalLight) -> DirectionalLightHandle {
        let handle = next_handle(self.directional_lights.len());
        self.directional_lights.push(light);
        handle
    }

    #[must_use]
    pub fn directional_light(&self, handle: DirectionalLightHandle) -> &DirectionalLight {
        &self.directional_lights[handle.index()]
    }

    pub fn directional_light_mut(&mut self, handle: DirectionalLightHandle) -> &mut DirectionalLight {
        &mut self.directional_lights[handle.index()]
    }

    #[must_use]
    pub fn get_directional_light(&self, handle: DirectionalLightHandle) -> Option<&DirectionalLight> {
        self.directional_lights.get(handle.index())
    }

    #[must_use]
    pub fn directional_light_count(&self) -> usize {
        self.directional_lights.len()
    }

    #[inline]
    #[must_use]
    pub fn ambient(&self) -> AmbientLight {
        self.ambient
    }

    pub fn set_ambient(&mut self, color: Vec3, intensity: f32) {
        self.ambient = AmbientLight { color, intensity };
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// Rebuilds `query` with everything `camera` can see.
    ///
    /// With culling enabled, objects and point lights are tested against the
    /// camera frustum; otherwise every object and point light is added.
    /// Directional lights are unbounded and always added.
    pub fn visible_objects(&self, camera: &Camera, culling: CullingConfig, query: &mut SceneQuery) {
        query.clear();

        if culling.view_frustum_culling {
            let frustum = camera.frustum();
            for (i, object) in self.objects.iter().enumerate() {
                if frustum.intersects_sphere(&object.bounds()) {
                    query.add_object(next_handle(i));
                }
            }
            for (i, light) in self.point_lights.iter().enumerate() {
                if frustum.intersects_sphere(&light.bounds()) {
                    query.add_point_light(next_handle(i));
                }
            }
        } else {
            for i in 0..self.objects.len() {
                query.add_object(next_handle(i));
            }
            for i in 0..self.point_lights.len() {
                query.add_point_light(next_handle(i));
            }
        }

        for i in 0..self.directional_lights.len() {
            query.add_directional_light(next_handle(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_enclosing_sphere() {
        let big = BoundingSphere::new(Vec3::ZERO, 5.0);
        let small = BoundingSphere::new(Vec3::X, 1.0);
        assert_eq!(merge_spheres(big, small), big);
    }

    #[test]
    fn merge_disjoint_spheres_spans_both() {
        let a = BoundingSphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0);
        let b = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let m = merge_spheres(a, b);
        assert!((m.radius - 3.0).abs() < 1e-5);
        assert!(m.center.length() < 1e-5);
    }
}
