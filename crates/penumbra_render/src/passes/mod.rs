//! Renderers and their passes
//!
//! A [`Renderer`] turns one `(Scene, Camera)` pair into a frame on the
//! device surface. Everything a renderer may touch during a frame is bundled
//! in a [`FrameContext`], built by the [`RenderSystem`](crate::RenderSystem)
//! with field-level borrows so the device can be mutated while the cache,
//! store and scene are read.
//!
//! - [`DeferredRenderer`]: G-buffer, light accumulation, post chain
//! - [`ForwardRenderer`]: single lit pass, used for wireframe

use glam::{Mat4, Vec3};

use penumbra_core::Result;
use penumbra_resources::primitives::SPHERE_KEY;
use penumbra_resources::{MaterialHandle, MeshHandle, ResourceStore};
use penumbra_scene::{BoundingSphere, Camera, DirectionalLight, PointLight, Renderable, Scene, SceneObject, SceneQuery};

use crate::cache::{GpuMaterial, GpuMesh, GpuResourceCache};
use crate::device::{DrawCall, GpuDevice, ProgramId, TextureId};
use crate::settings::{RendererKind, RendererSettings};
use crate::shaders::{BuiltinPrograms, Program};
use crate::target::TextureSemantic;
use crate::uniforms::{ObjectUniforms, bytes_of};

pub mod deferred;
pub mod forward;
pub mod post;
pub mod shadow;

pub use deferred::DeferredRenderer;
pub use forward::ForwardRenderer;

// ============================================================================
// Renderer contract
// ============================================================================

/// Borrowed state for rendering one frame.
pub struct FrameContext<'a> {
    pub device: &'a mut dyn GpuDevice,
    pub store: &'a ResourceStore,
    pub cache: &'a GpuResourceCache,
    pub programs: &'a BuiltinPrograms,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    /// Visible set for this frame; renderers drain its cursors.
    pub query: &'a mut SceneQuery,
    pub settings: &'a RendererSettings,
}

impl FrameContext<'_> {
    /// Resolves a built-in program, logging when it is unavailable so the
    /// caller can skip its pass.
    pub fn program(&self, program: Program) -> Option<ProgramId> {
        let id = self
            .cache
            .program(self.programs.get(program))
            .filter(|&id| self.device.has_program(id));
        if id.is_none() {
            log::error!("Program '{}' is not available, skipping its pass", program.name());
        }
        id
    }

    /// The unit sphere drawn for point light volumes.
    pub fn light_volume_mesh(&self) -> Option<GpuMesh> {
        let mesh = self.store.find_mesh(SPHERE_KEY).and_then(|h| self.cache.mesh(h));
        if mesh.is_none() {
            log::error!("Light volume mesh '{SPHERE_KEY}' is not available, skipping point lights");
        }
        mesh
    }
}

pub trait Renderer {
    fn kind(&self) -> RendererKind;

    /// Re-provisions size-dependent targets.
    fn resize(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()>;

    /// Records all passes of one frame. Called between
    /// [`GpuDevice::begin_frame`] and [`GpuDevice::end_frame`].
    fn render(&mut self, ctx: &mut FrameContext<'_>) -> Result<()>;

    /// A texture owned by this renderer, by role.
    fn texture(&self, semantic: TextureSemantic) -> Option<TextureId>;
}

// ============================================================================
// Draw gathering
// ============================================================================

/// One mesh ready to draw, with its material already resolved.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub mesh: GpuMesh,
    pub material: GpuMaterial,
    pub model: Mat4,
    /// World-space bounds of the owning object.
    pub bounds: BoundingSphere,
}

impl DrawItem {
    /// Draw with material factors and the five material textures bound.
    #[must_use]
    pub fn material_call(&self) -> DrawCall {
        let uniforms = ObjectUniforms::with_material(self.model, &self.material);
        DrawCall::mesh(self.mesh.id, bytes_of(&uniforms), &self.material.textures())
    }

    /// Draw with only the model transform, for depth-only passes.
    #[must_use]
    pub fn transform_call(&self) -> DrawCall {
        DrawCall::mesh(self.mesh.id, bytes_of(&ObjectUniforms::transform(self.model)), &[])
    }
}

/// The resolved contents of a drained [`SceneQuery`].
#[derive(Debug, Default)]
pub struct VisibleSet {
    pub draws: Vec<DrawItem>,
    pub point_lights: Vec<PointLight>,
    pub directional_lights: Vec<DirectionalLight>,
}

/// Drains every cursor of `query`, resolving ids against `scene` and the
/// GPU cache. Ids that do not resolve are logged and dropped.
pub fn drain_query(scene: &Scene, cache: &GpuResourceCache, query: &mut SceneQuery) -> VisibleSet {
    let mut visible = VisibleSet::default();

    while query.has_next_object() {
        let handle = query.next_object();
        match scene.get_object(handle) {
            Some(object) => push_draws(cache, object, &mut visible.draws),
            None => log::error!("Query returned unknown scene object {handle:?}"),
        }
    }
    while query.has_next_point_light() {
        let handle = query.next_point_light();
        match scene.get_point_light(handle) {
            Some(light) => visible.point_lights.push(*light),
            None => log::error!("Query returned unknown point light {handle:?}"),
        }
    }
    while query.has_next_directional_light() {
        let handle = query.next_directional_light();
        match scene.get_directional_light(handle) {
            Some(light) => visible.directional_lights.push(*light),
            None => log::error!("Query returned unknown directional light {handle:?}"),
        }
    }

    visible
}

/// Every visible object in the scene, ignoring the camera. Shadow casters
/// come from here since they may sit outside the view.
pub fn scene_draws(scene: &Scene, cache: &GpuResourceCache) -> Vec<DrawItem> {
    let mut draws = Vec::new();
    for (_, object) in scene.objects() {
        push_draws(cache, object, &mut draws);
    }
    draws
}

fn push_draws(cache: &GpuResourceCache, object: &SceneObject, out: &mut Vec<DrawItem>) {
    if !object.is_visible() {
        return;
    }
    let model = object.world_matrix();
    let bounds = object.bounds();

    let mut push = |mesh_handle: MeshHandle, material_handle: MaterialHandle| match cache.mesh(mesh_handle) {
        Some(mesh) => out.push(DrawItem {
            mesh,
            material: cache.material_or_default(material_handle),
            model,
            bounds,
        }),
        None => log::error!("Mesh {mesh_handle:?} is not materialized, skipping draw"),
    };

    match object.renderable() {
        Renderable::Mesh { mesh, material } => push(mesh, material),
        Renderable::Model(handle) => match cache.model(handle) {
            Some(model) => {
                for part in &model.parts {
                    push(part.mesh, part.material);
                }
            }
            None => log::error!("Model {handle:?} is not materialized, skipping draw"),
        },
    }
}

/// World transform of a point light volume.
#[inline]
#[must_use]
pub fn light_volume_transform(light: &PointLight) -> Mat4 {
    Mat4::from_translation(light.position) * Mat4::from_scale(Vec3::splat(light.radius))
}
