#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Penumbra
//!
//! A deferred rendering core on wgpu: frustum-culled scenes, a resource
//! store whose contents are materialized on the GPU on demand, and a
//! multi-pass renderer with shadows and a post-processing chain.
//!
//! This crate re-exports the workspace members:
//!
//! - [`core`]: errors and typed handles
//! - [`resources`]: the logical resource store and loaders
//! - [`scene`]: scenes, cameras, lights and visibility queries
//! - [`render`]: GPU devices, renderers and the [`RenderSystem`] façade

pub mod logging;

pub use penumbra_core as core;
pub use penumbra_render as render;
pub use penumbra_resources as resources;
pub use penumbra_scene as scene;

pub use glam;

pub use penumbra_core::{Handle, RenderError, Result};
pub use penumbra_render::{
    DebugView, GpuDevice, HeadlessDevice, RenderSystem, RendererKind, RendererSettings, SurfaceProvider,
    TextureSemantic, WgpuDevice,
};
pub use penumbra_resources::{Image, Material, Mesh, Model, ResourceStore, Vertex};
pub use penumbra_scene::{
    AmbientLight, BoundingSphere, Camera, DirectionalLight, Frustum, PointLight, Renderable, Scene, SceneObject,
    SceneQuery,
};

pub use logging::{LoggingConfig, init_logging};

/// Everything an application typically needs.
pub mod prelude {
    pub use crate::logging::{LoggingConfig, init_logging};
    pub use penumbra_core::{Handle, RenderError, Result};
    pub use penumbra_render::{
        CameraHandle, DebugView, PostEffects, RenderSystem, RendererKind, RendererSettings, SceneHandle,
        SurfaceProvider, TextureSemantic, WgpuDevice,
    };
    pub use penumbra_resources::{Material, Mesh, Model, ResourceStore};
    pub use penumbra_scene::{Camera, DirectionalLight, PointLight, Renderable, Scene, SceneObject};
}
