//! GPU Device Abstraction
//!
//! Every GPU operation the renderers perform goes through the object-safe
//! [`GpuDevice`] trait. Resources are addressed by generation-checked
//! `slotmap` keys ([`TextureId`], [`MeshId`], [`ProgramId`]): a key that
//! outlived its resource resolves to nothing instead of aliasing a newer one.
//!
//! A frame is a sequence of [`PassDesc`]s submitted between
//! [`GpuDevice::begin_frame`] and [`GpuDevice::end_frame`]. Each pass fully
//! describes its attachments, fixed-function state, bound textures and draws,
//! so backends can cache pipelines by value.
//!
//! Backends:
//! - [`WgpuDevice`]: the real GPU backend
//! - [`HeadlessDevice`]: validates and records passes without a GPU

use std::any::Any;

use smallvec::SmallVec;

use penumbra_core::Result;
use penumbra_resources::{Mesh, ShaderSource};

pub mod headless;
pub mod wgpu_backend;

pub use headless::HeadlessDevice;
pub use wgpu_backend::WgpuDevice;

slotmap::new_key_type! {
    /// A GPU texture.
    pub struct TextureId;
    /// Uploaded vertex and index buffers.
    pub struct MeshId;
    /// A linked shader program.
    pub struct ProgramId;
}

// ============================================================================
// Textures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8UnormSrgb,
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    #[inline]
    #[must_use]
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }

    #[inline]
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    /// Six square layers sampled as a cube map.
    Cube,
}

impl TextureDimension {
    #[inline]
    #[must_use]
    pub const fn layers(self) -> u32 {
        match self {
            Self::D2 => 1,
            Self::Cube => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub dimension: TextureDimension,
}

impl TextureDesc {
    #[must_use]
    pub fn new_2d(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            format,
            dimension: TextureDimension::D2,
        }
    }

    #[must_use]
    pub fn new_cube(label: impl Into<String>, size: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width: size,
            height: size,
            format,
            dimension: TextureDimension::Cube,
        }
    }
}

// ============================================================================
// Pass description
// ============================================================================

/// Load behaviour of an attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<V> {
    Clear(V),
    Load,
}

/// Where a color attachment writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTo {
    /// One layer of a texture (layer 0 for 2D textures, 0..6 for cube faces).
    Texture { id: TextureId, layer: u32 },
    /// The presentation surface of the current frame.
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    pub target: RenderTo,
    pub load: LoadOp<[f32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachment {
    pub texture: TextureId,
    pub layer: u32,
    pub load: LoadOp<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Replace,
    /// `dst + src`, used for light accumulation.
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthMode {
    /// No depth test or write.
    #[default]
    Disabled,
    /// `Less` test with depth writes.
    TestWrite,
    /// `LessEqual` test without writes.
    TestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// Rasterizer depth bias for shadow passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant: i32,
    pub slope_scale: f32,
}

/// Fixed-function state of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineState {
    pub blend: BlendMode,
    pub cull: CullMode,
    pub depth: DepthMode,
    pub depth_bias: Option<DepthBias>,
    pub polygon: PolygonMode,
}

/// Pixel rectangle a pass is restricted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawGeometry {
    /// Three vertices generated in the vertex stage.
    FullscreenTriangle,
    Mesh(MeshId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub geometry: DrawGeometry,
    /// Bytes bound at `@group(1) @binding(0)`.
    pub uniforms: Vec<u8>,
    /// Textures bound at `@group(1) @binding(1..)`.
    pub textures: SmallVec<[TextureId; 5]>,
}

impl DrawCall {
    #[must_use]
    pub fn fullscreen() -> Self {
        Self {
            geometry: DrawGeometry::FullscreenTriangle,
            uniforms: Vec::new(),
            textures: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn mesh(mesh: MeshId, uniforms: Vec<u8>, textures: &[TextureId]) -> Self {
        Self {
            geometry: DrawGeometry::Mesh(mesh),
            uniforms,
            textures: SmallVec::from_slice(textures),
        }
    }
}

/// One render pass.
///
/// A pass without a program only performs its attachment load operations,
/// which is how targets are cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDesc {
    pub label: &'static str,
    pub program: Option<ProgramId>,
    pub color: SmallVec<[ColorAttachment; 4]>,
    pub depth: Option<DepthAttachment>,
    pub state: PipelineState,
    pub viewport: Option<Viewport>,
    /// Bytes bound at `@group(0) @binding(0)`.
    pub uniforms: Vec<u8>,
    /// Textures bound at `@group(0) @binding(3..)`.
    pub textures: SmallVec<[TextureId; 4]>,
    pub draws: Vec<DrawCall>,
}

impl PassDesc {
    #[must_use]
    pub fn new(label: &'static str, program: Option<ProgramId>) -> Self {
        Self {
            label,
            program,
            color: SmallVec::new(),
            depth: None,
            state: PipelineState::default(),
            viewport: None,
            uniforms: Vec::new(),
            textures: SmallVec::new(),
            draws: Vec::new(),
        }
    }
}

// ============================================================================
// Device trait
// ============================================================================

pub trait GpuDevice {
    /// Allocates an uninitialized texture.
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId;

    /// Uploads tightly packed pixels covering the whole of layer 0.
    fn write_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<()>;

    /// Re-provisions a texture at a new size, keeping its id, format and
    /// dimension. Contents are discarded.
    fn resize_texture(&mut self, id: TextureId, width: u32, height: u32) -> Result<()>;

    fn texture_desc(&self, id: TextureId) -> Option<&TextureDesc>;

    fn create_mesh(&mut self, mesh: &Mesh) -> MeshId;

    fn has_mesh(&self, id: MeshId) -> bool;

    /// Compiles every stage and links them. Stage and link diagnostics are
    /// returned as [`RenderError::ShaderCompileFailure`](penumbra_core::RenderError::ShaderCompileFailure).
    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId>;

    fn has_program(&self, id: ProgramId) -> bool;

    fn surface_size(&self) -> (u32, u32);

    fn surface_format(&self) -> TextureFormat;

    fn resize_surface(&mut self, width: u32, height: u32);

    /// Whether [`PolygonMode::Line`] is available.
    fn supports_wireframe(&self) -> bool;

    /// Acquires the surface image for this frame.
    fn begin_frame(&mut self) -> Result<()>;

    fn run_pass(&mut self, pass: &PassDesc) -> Result<()>;

    /// Submits recorded work and presents.
    fn end_frame(&mut self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
