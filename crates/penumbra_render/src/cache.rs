//! GPU Resource Cache
//!
//! The consumer half of the resource pipeline. The cache subscribes to a
//! [`ResourceStore`] and turns each logical resource into its GPU form:
//!
//! | Logical        | GPU                                  |
//! |----------------|--------------------------------------|
//! | `Image`        | `Rgba8Unorm` texture                 |
//! | `Mesh`         | vertex + index buffers               |
//! | `ShaderSource` | compiled and linked program          |
//! | `Material`     | five resolved texture ids + factors  |
//! | `Model`        | list of (mesh, material) handles     |
//!
//! Materialization is one-shot. [`GpuResourceCache::sync`] drains the
//! creation events in order; an id that is already materialized is skipped,
//! so replays and duplicate events are harmless. GPU objects are keyed by the
//! same handle as the logical resource and live as long as the cache.

use std::collections::VecDeque;

use glam::Vec3;
use rustc_hash::FxHashMap;

use penumbra_core::{RenderError, Result};
use penumbra_resources::{
    ImageHandle, MaterialHandle, MeshHandle, ModelHandle, ModelPart, ResourceEvent, ResourceId, ResourceStore,
    ShaderHandle,
};

use crate::device::{GpuDevice, MeshId, ProgramId, TextureDesc, TextureFormat, TextureId};

/// Fallback textures for material channels that are unset or never
/// materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTextures {
    /// Magenta, so missing albedo is obvious on screen.
    pub diffuse: TextureId,
    /// Flat tangent-space normal.
    pub normal: TextureId,
    pub specular: TextureId,
    pub glow: TextureId,
    pub alpha: TextureId,
}

impl DefaultTextures {
    pub const DIFFUSE_RGBA: [u8; 4] = [255, 0, 255, 255];
    pub const NORMAL_RGBA: [u8; 4] = [128, 128, 255, 255];
    pub const SPECULAR_RGBA: [u8; 4] = [255, 255, 255, 255];
    pub const GLOW_RGBA: [u8; 4] = [0, 0, 0, 255];
    pub const ALPHA_RGBA: [u8; 4] = [255, 255, 255, 255];

    fn create(device: &mut dyn GpuDevice) -> Result<Self> {
        let mut solid = |label: &str, rgba: [u8; 4]| -> Result<TextureId> {
            let id = device.create_texture(&TextureDesc::new_2d(label, 1, 1, TextureFormat::Rgba8Unorm));
            device.write_texture(id, &rgba)?;
            Ok(id)
        };
        Ok(Self {
            diffuse: solid("default/diffuse", Self::DIFFUSE_RGBA)?,
            normal: solid("default/normal", Self::NORMAL_RGBA)?,
            specular: solid("default/specular", Self::SPECULAR_RGBA)?,
            glow: solid("default/glow", Self::GLOW_RGBA)?,
            alpha: solid("default/alpha", Self::ALPHA_RGBA)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuMesh {
    pub id: MeshId,
    pub index_count: u32,
}

/// A material with every channel resolved to a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuMaterial {
    pub diffuse: TextureId,
    pub normal: TextureId,
    pub specular: TextureId,
    pub glow: TextureId,
    pub alpha: TextureId,
    pub color: Vec3,
    pub specular_intensity: f32,
    pub glow_intensity: f32,
}

impl GpuMaterial {
    /// Channels in the binding order of the geometry and forward programs.
    #[must_use]
    pub fn textures(&self) -> [TextureId; 5] {
        [self.diffuse, self.normal, self.specular, self.glow, self.alpha]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuModel {
    pub parts: Vec<ModelPart>,
}

/// Outcome of one [`GpuResourceCache::sync`].
#[derive(Debug, Default)]
pub struct SyncReport {
    pub materialized: usize,
    pub failed: Vec<(ResourceId, RenderError)>,
}

impl SyncReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Converts the first failure into an error.
    pub fn into_result(self) -> Result<usize> {
        match self.failed.into_iter().next() {
            None => Ok(self.materialized),
            Some((_, err)) => Err(err),
        }
    }
}

pub struct GpuResourceCache {
    events: flume::Receiver<ResourceEvent>,
    backlog: VecDeque<ResourceId>,
    textures: FxHashMap<ImageHandle, TextureId>,
    meshes: FxHashMap<MeshHandle, GpuMesh>,
    programs: FxHashMap<ShaderHandle, ProgramId>,
    materials: FxHashMap<MaterialHandle, GpuMaterial>,
    models: FxHashMap<ModelHandle, GpuModel>,
    defaults: DefaultTextures,
}

impl GpuResourceCache {
    /// Subscribes to `store` and queues everything it already holds, so
    /// resources created before the cache are materialized too.
    pub fn new(store: &mut ResourceStore, device: &mut dyn GpuDevice) -> Result<Self> {
        let events = store.subscribe();
        let backlog = store.resource_ids().into();
        Ok(Self {
            events,
            backlog,
            textures: FxHashMap::default(),
            meshes: FxHashMap::default(),
            programs: FxHashMap::default(),
            materials: FxHashMap::default(),
            models: FxHashMap::default(),
            defaults: DefaultTextures::create(device)?,
        })
    }

    fn next_id(&mut self) -> Option<ResourceId> {
        if let Some(id) = self.backlog.pop_front() {
            return Some(id);
        }
        match self.events.try_recv().ok()? {
            ResourceEvent::Created(id) => Some(id),
        }
    }

    /// Materializes every resource created since the last call, in creation
    /// order. Failures are logged and reported; they do not stop the drain.
    pub fn sync(&mut self, store: &ResourceStore, device: &mut dyn GpuDevice) -> SyncReport {
        let mut report = SyncReport::default();
        while let Some(id) = self.next_id() {
            match self.materialize(store, device, id) {
                Ok(true) => report.materialized += 1,
                Ok(false) => {}
                Err(err) => {
                    log::error!("Failed to materialize {id:?}: {err}");
                    report.failed.push((id, err));
                }
            }
        }
        if report.materialized > 0 {
            log::debug!("GPU cache materialized {} resources", report.materialized);
        }
        report
    }

    /// Returns `Ok(false)` when nothing had to be built.
    fn materialize(&mut self, store: &ResourceStore, device: &mut dyn GpuDevice, id: ResourceId) -> Result<bool> {
        if self.is_materialized(id) {
            return Ok(false);
        }

        match id {
            ResourceId::Image(handle) => {
                let image = store
                    .image(handle)
                    .ok_or_else(|| RenderError::invalid_handle("image", handle))?;
                let texture = device.create_texture(&TextureDesc::new_2d(
                    image.label.clone(),
                    image.width,
                    image.height,
                    TextureFormat::Rgba8Unorm,
                ));
                device.write_texture(texture, &image.pixels)?;
                self.textures.insert(handle, texture);
            }
            ResourceId::Mesh(handle) => {
                let mesh = store
                    .mesh(handle)
                    .ok_or_else(|| RenderError::invalid_handle("mesh", handle))?;
                let gpu = GpuMesh {
                    id: device.create_mesh(mesh),
                    index_count: mesh.index_count(),
                };
                self.meshes.insert(handle, gpu);
            }
            ResourceId::Shader(handle) => {
                let source = store
                    .shader(handle)
                    .ok_or_else(|| RenderError::invalid_handle("shader", handle))?;
                let program = device.create_program(source)?;
                self.programs.insert(handle, program);
            }
            ResourceId::Material(handle) => {
                let material = store
                    .material(handle)
                    .ok_or_else(|| RenderError::invalid_handle("material", handle))?;
                let resolve = |channel: Option<ImageHandle>, fallback: TextureId, name: &str| match channel {
                    None => fallback,
                    Some(image) => self.textures.get(&image).copied().unwrap_or_else(|| {
                        log::warn!(
                            "Material '{}' {name} image {image:?} is not materialized; using default",
                            material.label
                        );
                        fallback
                    }),
                };
                let gpu = GpuMaterial {
                    diffuse: resolve(material.diffuse, self.defaults.diffuse, "diffuse"),
                    normal: resolve(material.normal, self.defaults.normal, "normal"),
                    specular: resolve(material.specular, self.defaults.specular, "specular"),
                    glow: resolve(material.glow, self.defaults.glow, "glow"),
                    alpha: resolve(material.alpha, self.defaults.alpha, "alpha"),
                    color: material.color,
                    specular_intensity: material.specular_intensity,
                    glow_intensity: material.glow_intensity,
                };
                self.materials.insert(handle, gpu);
            }
            ResourceId::Model(handle) => {
                let model = store
                    .model(handle)
                    .ok_or_else(|| RenderError::invalid_handle("model", handle))?;
                self.models.insert(
                    handle,
                    GpuModel {
                        parts: model.parts.clone(),
                    },
                );
            }
            ResourceId::Text(_) => return Ok(false),
        }

        log::debug!("Materialized {id:?}");
        Ok(true)
    }

    #[must_use]
    pub fn is_materialized(&self, id: ResourceId) -> bool {
        match id {
            ResourceId::Image(h) => self.textures.contains_key(&h),
            ResourceId::Mesh(h) => self.meshes.contains_key(&h),
            ResourceId::Shader(h) => self.programs.contains_key(&h),
            ResourceId::Material(h) => self.materials.contains_key(&h),
            ResourceId::Model(h) => self.models.contains_key(&h),
            ResourceId::Text(_) => false,
        }
    }

    #[must_use]
    pub fn defaults(&self) -> &DefaultTextures {
        &self.defaults
    }

    #[must_use]
    pub fn texture(&self, handle: ImageHandle) -> Option<TextureId> {
        self.textures.get(&handle).copied()
    }

    #[must_use]
    pub fn mesh(&self, handle: MeshHandle) -> Option<GpuMesh> {
        self.meshes.get(&handle).copied()
    }

    #[must_use]
    pub fn program(&self, handle: ShaderHandle) -> Option<ProgramId> {
        self.programs.get(&handle).copied()
    }

    #[must_use]
    pub fn material(&self, handle: MaterialHandle) -> Option<&GpuMaterial> {
        self.materials.get(&handle)
    }

    /// The material for `handle`, or all-default channels when it is missing.
    #[must_use]
    pub fn material_or_default(&self, handle: MaterialHandle) -> GpuMaterial {
        self.materials.get(&handle).copied().unwrap_or(GpuMaterial {
            diffuse: self.defaults.diffuse,
            normal: self.defaults.normal,
            specular: self.defaults.specular,
            glow: self.defaults.glow,
            alpha: self.defaults.alpha,
            color: Vec3::ONE,
            specular_intensity: 0.5,
            glow_intensity: 0.0,
        })
    }

    #[must_use]
    pub fn model(&self, handle: ModelHandle) -> Option<&GpuModel> {
        self.models.get(&handle)
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

impl std::fmt::Debug for GpuResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResourceCache")
            .field("textures", &self.textures.len())
            .field("meshes", &self.meshes.len())
            .field("programs", &self.programs.len())
            .field("materials", &self.materials.len())
            .field("models", &self.models.len())
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}
