//! Penumbra Render
//!
//! The GPU half of the engine:
//!
//! - [`device`]: the [`GpuDevice`] abstraction with wgpu and headless backends
//! - [`cache`]: [`GpuResourceCache`], materializing store resources on the GPU
//! - [`target`]: multi-attachment [`RenderTarget`]s
//! - [`passes`]: the deferred and forward renderers, shadows and post chain
//! - [`shaders`]: embedded built-in WGSL programs
//! - [`settings`]: serde-backed [`RendererSettings`]
//! - [`system`]: the [`RenderSystem`] façade driving a frame

pub mod cache;
pub mod device;
pub mod passes;
pub mod settings;
pub mod shaders;
pub mod system;
pub mod target;
pub mod uniforms;

pub use cache::{DefaultTextures, GpuMaterial, GpuMesh, GpuModel, GpuResourceCache, SyncReport};
pub use device::{
    GpuDevice, HeadlessDevice, MeshId, PassDesc, ProgramId, TextureDesc, TextureFormat, TextureId, WgpuDevice,
};
pub use passes::post::{PostBuffer, PostInput, PostPlan, PostStage, PostStep, plan_post_chain};
pub use passes::{DeferredRenderer, ForwardRenderer, FrameContext, Renderer};
pub use settings::{
    BloomSettings, DebugView, DepthOfFieldSettings, FogSettings, GodRaySettings, LensFlareSettings, PostEffects,
    PostProcessSettings, RendererKind, RendererSettings, ShadowSettings,
};
pub use shaders::{BuiltinPrograms, Program};
pub use system::{CameraHandle, RenderSystem, SceneHandle, SurfaceProvider};
pub use target::{AttachmentPoint, RenderTarget, TextureSemantic};
