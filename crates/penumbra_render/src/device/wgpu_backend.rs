//! wgpu Backend
//!
//! [`WgpuDevice`] implements [`GpuDevice`] on top of wgpu. It owns the
//! device, queue and presentation surface, plus three generation-checked
//! arenas (textures, meshes, programs).
//!
//! # Pipelines
//!
//! Programs are compiled eagerly, but render pipelines are built lazily the
//! first time a pass needs one and cached under a [`PipelineKey`]: program,
//! attachment formats and fixed-function state.
//!
//! # Bindings
//!
//! Every program shares one bind-group convention (see
//! [`penumbra_resources::shader`]). Pass uniforms are uploaded into a fresh
//! buffer per pass; per-draw uniforms are packed into one buffer per pass and
//! addressed with dynamic offsets.
//!
//! # Frames
//!
//! All passes of a frame are recorded into a single command encoder, which
//! is submitted in [`GpuDevice::end_frame`] before the surface is presented.

use std::any::Any;
use std::num::NonZeroU64;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;
use wgpu::util::DeviceExt;

use penumbra_core::{RenderError, Result};
use penumbra_resources::{Mesh, ProgramLayout, ShaderSource, ShaderStage, TextureSlot, Vertex, VertexInput};

use crate::settings::RendererSettings;

use super::{
    BlendMode, CullMode, DepthMode, DrawGeometry, GpuDevice, LoadOp, MeshId, PassDesc, PolygonMode,
    ProgramId, RenderTo, TextureDesc, TextureDimension, TextureFormat, TextureId,
};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2, 3 => Float32x4];

/// Minimum size of any uniform binding.
const MIN_UNIFORM_SIZE: u64 = 16;

// ============================================================================
// Format conversion
// ============================================================================

fn to_wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

fn from_wgpu_format(format: wgpu::TextureFormat) -> TextureFormat {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Rgba16Float => TextureFormat::Rgba16Float,
        wgpu::TextureFormat::Depth32Float => TextureFormat::Depth32Float,
        _ => TextureFormat::Bgra8UnormSrgb,
    }
}

#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Copies `bytes` into a buffer of at least [`MIN_UNIFORM_SIZE`] bytes,
/// rounded up to 16.
fn padded_uniform(bytes: &[u8]) -> Vec<u8> {
    let size = align_up((bytes.len() as u64).max(MIN_UNIFORM_SIZE), 16) as usize;
    let mut out = vec![0_u8; size];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Error lines for one compiled stage. Scoped validation errors are only
/// reported when the compilation info carried no error of its own.
fn shader_errors(stage: ShaderStage, info: &wgpu::CompilationInfo, scoped: Option<wgpu::Error>) -> Vec<String> {
    let mut errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{stage:?} {}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => format!("{stage:?}: {}", m.message),
        })
        .collect();
    if errors.is_empty()
        && let Some(error) = scoped
    {
        errors.push(format!("{stage:?}: {error}"));
    }
    errors
}

fn present_mode(settings: &RendererSettings) -> wgpu::PresentMode {
    if settings.vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn pipeline_error(label: &str, error: &wgpu::Error) -> RenderError {
    RenderError::ShaderCompileFailure {
        label: label.to_owned(),
        log: format!("pipeline: {error}"),
    }
}

// ============================================================================
// Arena entries
// ============================================================================

struct GpuTexture {
    desc: TextureDesc,
    texture: wgpu::Texture,
    /// Whole-resource view used for sampling (cube view for cube maps).
    sample_view: wgpu::TextureView,
    /// One 2D view per layer, used as render attachments.
    layer_views: SmallVec<[wgpu::TextureView; 6]>,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuProgram {
    label: String,
    layout: ProgramLayout,
    vertex_module: wgpu::ShaderModule,
    /// `None` when both stages come from the same module.
    fragment_module: Option<wgpu::ShaderModule>,
    pass_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    color_formats: SmallVec<[wgpu::TextureFormat; 4]>,
    depth_format: Option<wgpu::TextureFormat>,
    blend: BlendMode,
    cull: CullMode,
    depth: DepthMode,
    /// `(constant, slope_scale bits)`
    bias: Option<(i32, u32)>,
    polygon: PolygonMode,
}

enum Presentation {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
    },
}

struct Frame {
    encoder: wgpu::CommandEncoder,
    surface_texture: Option<wgpu::SurfaceTexture>,
    view: wgpu::TextureView,
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    presentation: Presentation,
    textures: SlotMap<TextureId, GpuTexture>,
    meshes: SlotMap<MeshId, GpuMesh>,
    programs: SlotMap<ProgramId, GpuProgram>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Keys whose pipeline failed validation; their passes are skipped.
    failed_pipelines: FxHashSet<PipelineKey>,
    linear_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    frame: Option<Frame>,
    wireframe: bool,
    uniform_alignment: u64,
}

impl WgpuDevice {
    /// Creates a device presenting to `window`, synchronized to the display
    /// when `settings.vsync` is set.
    pub async fn new<W>(window: W, width: u32, height: u32, settings: &RendererSettings) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::SurfaceError(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue, wireframe) = Self::request_device(&adapter).await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| RenderError::SurfaceError("surface not supported by adapter".into()))?;
        let caps = surface.get_capabilities(&adapter);
        if let Some(srgb) = caps.formats.iter().copied().find(wgpu::TextureFormat::is_srgb) {
            config.format = srgb;
        }
        config.present_mode = present_mode(settings);
        surface.configure(&device, &config);

        log::info!(
            "wgpu device ready: {} ({:?}), surface {:?} {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.format,
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Self::from_parts(
            device,
            queue,
            Presentation::Surface { surface, config },
            wireframe,
        ))
    }

    /// Blocking form of [`WgpuDevice::new`].
    pub fn new_blocking<W>(window: W, width: u32, height: u32, settings: &RendererSettings) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        pollster::block_on(Self::new(window, width, height, settings))
    }

    /// Creates a device that renders into an offscreen color texture instead
    /// of a window surface.
    pub async fn offscreen(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|e| RenderError::AdapterRequestFailed(e.to_string()))?;
        let (device, queue, wireframe) = Self::request_device(&adapter).await?;

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let texture = Self::offscreen_texture(&device, width.max(1), height.max(1), format);
        Ok(Self::from_parts(
            device,
            queue,
            Presentation::Offscreen { texture, format },
            wireframe,
        ))
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue, bool)> {
        let wireframe = adapter.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if wireframe {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Penumbra Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|e| RenderError::DeviceRequestFailed(e.to_string()))?;

        device.on_uncaptured_error(std::sync::Arc::new(|e: wgpu::Error| {
            log::error!("wgpu uncaptured error: {e}");
        }));

        Ok((device, queue, wireframe))
    }

    fn from_parts(device: wgpu::Device, queue: wgpu::Queue, presentation: Presentation, wireframe: bool) -> Self {
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let uniform_alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);

        Self {
            device,
            queue,
            presentation,
            textures: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            pipelines: FxHashMap::default(),
            failed_pipelines: FxHashSet::default(),
            linear_sampler,
            shadow_sampler,
            frame: None,
            wireframe,
            uniform_alignment,
        }
    }

    fn offscreen_texture(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Surface"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    // ========================================================================
    // Internal builders
    // ========================================================================

    fn allocate_texture(device: &wgpu::Device, desc: &TextureDesc) -> GpuTexture {
        let format = to_wgpu_format(desc.format);
        let layers = desc.dimension.layers();
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !desc.format.is_depth() {
            usage |= wgpu::TextureUsages::COPY_DST;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&desc.label),
            dimension: Some(match desc.dimension {
                TextureDimension::D2 => wgpu::TextureViewDimension::D2,
                TextureDimension::Cube => wgpu::TextureViewDimension::Cube,
            }),
            array_layer_count: Some(layers),
            ..Default::default()
        });
        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&desc.label),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        GpuTexture {
            desc: desc.clone(),
            texture,
            sample_view,
            layer_views,
        }
    }

    fn texture_layout_entry(binding: u32, slot: TextureSlot) -> wgpu::BindGroupLayoutEntry {
        let (sample_type, view_dimension) = match slot {
            TextureSlot::Color => (
                wgpu::TextureSampleType::Float { filterable: true },
                wgpu::TextureViewDimension::D2,
            ),
            TextureSlot::Depth => (wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2),
            TextureSlot::DepthCube => (wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::Cube),
        };
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled: false,
            },
            count: None,
        }
    }

    fn uniform_layout_entry(binding: u32, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: None,
            },
            count: None,
        }
    }

    fn compile_module(&self, label: &str, stage: ShaderStage, source: &str) -> Result<wgpu::ShaderModule> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let info = pollster::block_on(module.get_compilation_info());
        let scoped = pollster::block_on(scope.pop());

        let errors = shader_errors(stage, &info, scoped);
        if errors.is_empty() {
            Ok(module)
        } else {
            Err(RenderError::ShaderCompileFailure {
                label: label.to_owned(),
                log: errors.join("\n"),
            })
        }
    }

    /// Builds the pipeline for `key`, capturing validation errors (stage
    /// interface or layout mismatches) instead of letting them escape.
    fn try_build_pipeline(
        device: &wgpu::Device,
        program: &GpuProgram,
        key: &PipelineKey,
    ) -> Result<wgpu::RenderPipeline> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = Self::build_pipeline(device, program, key);
        match pollster::block_on(scope.pop()) {
            None => Ok(pipeline),
            Some(error) => Err(pipeline_error(&program.label, &error)),
        }
    }

    fn build_pipeline(device: &wgpu::Device, program: &GpuProgram, key: &PipelineKey) -> wgpu::RenderPipeline {
        let vertex_buffers: &[wgpu::VertexBufferLayout<'_>] = match program.layout.vertex_input {
            VertexInput::None => &[],
            VertexInput::Mesh => &[wgpu::VertexBufferLayout {
                array_stride: Vertex::STRIDE,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        };

        let blend = match key.blend {
            BlendMode::Replace => Some(wgpu::BlendState::REPLACE),
            BlendMode::Additive => {
                let add = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState { color: add, alpha: add })
            }
        };
        let targets: SmallVec<[Option<wgpu::ColorTargetState>; 4]> = key
            .color_formats
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let depth_stencil = key.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(key.depth == DepthMode::TestWrite),
            depth_compare: Some(match key.depth {
                DepthMode::Disabled => wgpu::CompareFunction::Always,
                DepthMode::TestWrite => wgpu::CompareFunction::Less,
                DepthMode::TestOnly => wgpu::CompareFunction::LessEqual,
            }),
            stencil: wgpu::StencilState::default(),
            bias: key.bias.map_or_else(wgpu::DepthBiasState::default, |(constant, slope)| {
                wgpu::DepthBiasState {
                    constant,
                    slope_scale: f32::from_bits(slope),
                    clamp: 0.0,
                }
            }),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&program.label),
            layout: Some(&program.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex_module,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                buffers: vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: program.fragment_module.as_ref().unwrap_or(&program.vertex_module),
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                targets: &targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: match key.cull {
                    CullMode::None => None,
                    CullMode::Front => Some(wgpu::Face::Front),
                    CullMode::Back => Some(wgpu::Face::Back),
                },
                unclipped_depth: false,
                polygon_mode: match key.polygon {
                    PolygonMode::Fill => wgpu::PolygonMode::Fill,
                    PolygonMode::Line => wgpu::PolygonMode::Line,
                },
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn attachment_format(&self, target: RenderTo) -> Result<wgpu::TextureFormat> {
        match target {
            RenderTo::Surface => Ok(match &self.presentation {
                Presentation::Surface { config, .. } => config.format,
                Presentation::Offscreen { format, .. } => *format,
            }),
            RenderTo::Texture { id, .. } => self
                .textures
                .get(id)
                .map(|t| to_wgpu_format(t.desc.format))
                .ok_or_else(|| RenderError::invalid_handle("texture", id)),
        }
    }

    fn pipeline_key(&self, pass: &PassDesc, program: ProgramId) -> Result<PipelineKey> {
        let color_formats = pass
            .color
            .iter()
            .map(|a| self.attachment_format(a.target))
            .collect::<Result<SmallVec<_>>>()?;
        let depth_format = pass
            .depth
            .map(|d| self.attachment_format(RenderTo::Texture { id: d.texture, layer: d.layer }))
            .transpose()?;

        let polygon = if pass.state.polygon == PolygonMode::Line && !self.wireframe {
            log::warn!("Line rasterization unsupported; '{}' falls back to fill", pass.label);
            PolygonMode::Fill
        } else {
            pass.state.polygon
        };

        Ok(PipelineKey {
            program,
            color_formats,
            depth_format,
            blend: pass.state.blend,
            cull: pass.state.cull,
            depth: pass.state.depth,
            bias: pass.state.depth_bias.map(|b| (b.constant, b.slope_scale.to_bits())),
            polygon,
        })
    }
}

fn clear_color(c: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(c[0]),
        g: f64::from(c[1]),
        b: f64::from(c[2]),
        a: f64::from(c[3]),
    }
}

impl GpuDevice for WgpuDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId {
        let texture = Self::allocate_texture(&self.device, desc);
        self.textures.insert(texture)
    }

    fn write_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<()> {
        let texture = self
            .textures
            .get(id)
            .ok_or_else(|| RenderError::invalid_handle("texture", id))?;
        let desc = &texture.desc;
        let bytes_per_row = desc.width * desc.format.bytes_per_pixel();
        if pixels.len() != (bytes_per_row * desc.height) as usize {
            return Err(RenderError::load_failure(
                desc.label.clone(),
                format!("upload is {} bytes, texture needs {}", pixels.len(), bytes_per_row * desc.height),
            ));
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(desc.height),
            },
            wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn resize_texture(&mut self, id: TextureId, width: u32, height: u32) -> Result<()> {
        let entry = self
            .textures
            .get_mut(id)
            .ok_or_else(|| RenderError::invalid_handle("texture", id))?;
        let mut desc = entry.desc.clone();
        desc.width = width.max(1);
        desc.height = height.max(1);
        *entry = Self::allocate_texture(&self.device, &desc);
        Ok(())
    }

    fn texture_desc(&self, id: TextureId) -> Option<&TextureDesc> {
        self.textures.get(id).map(|t| &t.desc)
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> MeshId {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&mesh.label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&mesh.label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        })
    }

    fn has_mesh(&self, id: MeshId) -> bool {
        self.meshes.contains_key(id)
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId> {
        for stage in &source.stages {
            if matches!(
                stage.stage,
                ShaderStage::TessControl | ShaderStage::TessEvaluation | ShaderStage::Geometry
            ) {
                return Err(RenderError::ShaderCompileFailure {
                    label: source.label.clone(),
                    log: format!("{:?} stage is not supported by wgpu", stage.stage),
                });
            }
        }
        let (Some(vs), Some(fs)) = (source.stage(ShaderStage::Vertex), source.stage(ShaderStage::Fragment)) else {
            return Err(RenderError::ShaderCompileFailure {
                label: source.label.clone(),
                log: "link error: a program needs vertex and fragment stages".into(),
            });
        };

        let vertex_module = self.compile_module(&source.label, ShaderStage::Vertex, &vs.source)?;
        let fragment_module = if fs.source == vs.source {
            None
        } else {
            Some(self.compile_module(&source.label, ShaderStage::Fragment, &fs.source)?)
        };

        let mut pass_entries = vec![
            Self::uniform_layout_entry(0, false),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ];
        pass_entries.extend(
            (0_u32..)
                .zip(&source.layout.pass_textures)
                .map(|(i, &slot)| Self::texture_layout_entry(3 + i, slot)),
        );
        let mut draw_entries = vec![Self::uniform_layout_entry(0, true)];
        draw_entries.extend(
            (0_u32..)
                .zip(&source.layout.draw_textures)
                .map(|(i, &slot)| Self::texture_layout_entry(1 + i, slot)),
        );

        let pass_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Pass Layout", source.label)),
            entries: &pass_entries,
        });
        let draw_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Draw Layout", source.label)),
            entries: &draw_entries,
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&source.label),
            bind_group_layouts: &[Some(&pass_layout), Some(&draw_layout)],
            immediate_size: 0,
        });

        log::debug!("Compiled program '{}'", source.label);
        Ok(self.programs.insert(GpuProgram {
            label: source.label.clone(),
            layout: source.layout.clone(),
            vertex_module,
            fragment_module,
            pass_layout,
            draw_layout,
            pipeline_layout,
        }))
    }

    fn has_program(&self, id: ProgramId) -> bool {
        self.programs.contains_key(id)
    }

    fn surface_size(&self) -> (u32, u32) {
        match &self.presentation {
            Presentation::Surface { config, .. } => (config.width, config.height),
            Presentation::Offscreen { texture, .. } => (texture.width(), texture.height()),
        }
    }

    fn surface_format(&self) -> TextureFormat {
        match &self.presentation {
            Presentation::Surface { config, .. } => from_wgpu_format(config.format),
            Presentation::Offscreen { format, .. } => from_wgpu_format(*format),
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        match &mut self.presentation {
            Presentation::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            Presentation::Offscreen { texture, format } => {
                *texture = Self::offscreen_texture(&self.device, width, height, *format);
            }
        }
    }

    fn supports_wireframe(&self) -> bool {
        self.wireframe
    }

    fn begin_frame(&mut self) -> Result<()> {
        let (surface_texture, view) = match &self.presentation {
            Presentation::Surface { surface, config } => {
                let output = match surface.get_current_texture() {
                    wgpu::CurrentSurfaceTexture::Success(output)
                    | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
                    wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                        surface.configure(&self.device, config);
                        return Err(RenderError::SurfaceError("surface lost; reconfigured".into()));
                    }
                    e => return Err(RenderError::SurfaceError(format!("{e:?}"))),
                };
                let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
                (Some(output), view)
            }
            Presentation::Offscreen { texture, .. } => {
                (None, texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
        };

        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Penumbra Frame Encoder"),
        });
        self.frame = Some(Frame {
            encoder,
            surface_texture,
            view,
        });
        Ok(())
    }

    fn run_pass(&mut self, pass: &PassDesc) -> Result<()> {
        if self.frame.is_none() {
            return Err(RenderError::SurfaceError(format!(
                "pass '{}' recorded outside a frame",
                pass.label
            )));
        }

        let key = match pass.program {
            Some(program) => {
                let key = self.pipeline_key(pass, program)?;
                if self.failed_pipelines.contains(&key) {
                    return Ok(());
                }
                if !self.pipelines.contains_key(&key) {
                    let gpu_program = self
                        .programs
                        .get(program)
                        .ok_or_else(|| RenderError::invalid_handle("program", program))?;
                    match Self::try_build_pipeline(&self.device, gpu_program, &key) {
                        Ok(pipeline) => {
                            self.pipelines.insert(key.clone(), pipeline);
                        }
                        Err(err) => {
                            if self.failed_pipelines.insert(key) {
                                log::error!("{err}, skipping pass '{}'", pass.label);
                            }
                            return Ok(());
                        }
                    }
                }
                Some(key)
            }
            None => None,
        };

        let Self {
            device,
            textures,
            meshes,
            programs,
            pipelines,
            frame,
            linear_sampler,
            shadow_sampler,
            uniform_alignment,
            ..
        } = self;
        let Some(Frame {
            encoder,
            view: surface_view,
            ..
        }) = frame.as_mut()
        else {
            return Ok(());
        };

        let layer_view = |id: TextureId, layer: u32| -> Result<&wgpu::TextureView> {
            textures
                .get(id)
                .and_then(|t| t.layer_views.get(layer as usize))
                .ok_or_else(|| RenderError::invalid_handle("texture", id))
        };
        let sample_view = |id: TextureId| -> Result<&wgpu::TextureView> {
            textures
                .get(id)
                .map(|t| &t.sample_view)
                .ok_or_else(|| RenderError::invalid_handle("texture", id))
        };

        // Attachments
        let mut color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 4]> = SmallVec::new();
        for attachment in &pass.color {
            let view = match attachment.target {
                RenderTo::Surface => &*surface_view,
                RenderTo::Texture { id, layer } => layer_view(id, layer)?,
            };
            let load = match attachment.load {
                LoadOp::Clear(c) => wgpu::LoadOp::Clear(clear_color(c)),
                LoadOp::Load => wgpu::LoadOp::Load,
            };
            color_attachments.push(Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            }));
        }
        let depth_attachment = match &pass.depth {
            Some(depth) => Some(wgpu::RenderPassDepthStencilAttachment {
                view: layer_view(depth.texture, depth.layer)?,
                depth_ops: Some(wgpu::Operations {
                    load: match depth.load {
                        LoadOp::Clear(v) => wgpu::LoadOp::Clear(v),
                        LoadOp::Load => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            None => None,
        };

        // Bindings
        let mut bound = None;
        if let (Some(key), Some(program_id)) = (&key, pass.program) {
            let program = programs
                .get(program_id)
                .ok_or_else(|| RenderError::invalid_handle("program", program_id))?;
            let pipeline = pipelines
                .get(key)
                .ok_or_else(|| RenderError::invalid_handle("pipeline", program_id))?;

            let pass_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(pass.label),
                contents: &padded_uniform(&pass.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let mut pass_entries = vec![
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: pass_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(linear_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow_sampler),
                },
            ];
            for (i, &id) in (0_u32..).zip(&pass.textures) {
                pass_entries.push(wgpu::BindGroupEntry {
                    binding: 3 + i,
                    resource: wgpu::BindingResource::TextureView(sample_view(id)?),
                });
            }
            let pass_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(pass.label),
                layout: &program.pass_layout,
                entries: &pass_entries,
            });

            // Per-draw uniforms share one buffer, addressed by dynamic offset.
            let binding_size = align_up(
                pass.draws
                    .iter()
                    .map(|d| d.uniforms.len() as u64)
                    .max()
                    .unwrap_or(0)
                    .max(MIN_UNIFORM_SIZE),
                16,
            );
            let stride = align_up(binding_size, *uniform_alignment);
            let mut draw_bytes = vec![0_u8; (stride * pass.draws.len().max(1) as u64) as usize];
            for (i, draw) in pass.draws.iter().enumerate() {
                let start = i * stride as usize;
                draw_bytes[start..start + draw.uniforms.len()].copy_from_slice(&draw.uniforms);
            }
            let draw_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(pass.label),
                contents: &draw_bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let mut draw_groups = Vec::with_capacity(pass.draws.len());
            for draw in &pass.draws {
                let mut entries = vec![wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &draw_uniforms,
                        offset: 0,
                        size: NonZeroU64::new(binding_size),
                    }),
                }];
                for (i, &id) in (0_u32..).zip(&draw.textures) {
                    entries.push(wgpu::BindGroupEntry {
                        binding: 1 + i,
                        resource: wgpu::BindingResource::TextureView(sample_view(id)?),
                    });
                }
                draw_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(pass.label),
                    layout: &program.draw_layout,
                    entries: &entries,
                }));
            }

            let mut draw_meshes = Vec::with_capacity(pass.draws.len());
            for draw in &pass.draws {
                draw_meshes.push(match draw.geometry {
                    DrawGeometry::FullscreenTriangle => None,
                    DrawGeometry::Mesh(id) => Some(
                        meshes
                            .get(id)
                            .ok_or_else(|| RenderError::invalid_handle("mesh", id))?,
                    ),
                });
            }

            bound = Some((pipeline, pass_group, draw_groups, draw_meshes, stride));
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: depth_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if let Some(viewport) = pass.viewport {
            render_pass.set_viewport(viewport.x, viewport.y, viewport.width, viewport.height, 0.0, 1.0);
        }

        if let Some((pipeline, pass_group, draw_groups, draw_meshes, stride)) = &bound {
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, pass_group, &[]);
            for (i, (group, mesh)) in draw_groups.iter().zip(draw_meshes).enumerate() {
                let offset = (i as u64 * stride) as u32;
                render_pass.set_bind_group(1, group, &[offset]);
                match mesh {
                    None => render_pass.draw(0..3, 0..1),
                    Some(mesh) => {
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }
                }
            }
        }

        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| RenderError::SurfaceError("end_frame without begin_frame".into()))?;
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
        if let Some(output) = frame.surface_texture {
            output.present();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_error(description: &str) -> wgpu::Error {
        wgpu::Error::Validation {
            source: Box::new(std::io::Error::other(description.to_owned())),
            description: description.to_owned(),
        }
    }

    fn message(text: &str, message_type: wgpu::CompilationMessageType) -> wgpu::CompilationMessage {
        wgpu::CompilationMessage {
            message: text.to_owned(),
            message_type,
            location: None,
        }
    }

    #[test]
    fn clean_compilation_has_no_errors() {
        let info = wgpu::CompilationInfo {
            messages: vec![message("unused variable", wgpu::CompilationMessageType::Warning)],
        };
        assert!(shader_errors(ShaderStage::Vertex, &info, None).is_empty());
    }

    #[test]
    fn scoped_validation_error_fails_the_stage() {
        let info = wgpu::CompilationInfo { messages: Vec::new() };
        let errors = shader_errors(
            ShaderStage::Fragment,
            &info,
            Some(validation_error("expected ')', found '}'")),
        );
        assert_eq!(errors, vec!["Fragment: expected ')', found '}'".to_owned()]);
    }

    #[test]
    fn compilation_messages_take_precedence_over_the_scope() {
        let mut parse = message("unexpected token", wgpu::CompilationMessageType::Error);
        parse.location = Some(wgpu::SourceLocation {
            line_number: 1,
            line_position: 19,
            offset: 18,
            length: 1,
        });
        let info = wgpu::CompilationInfo { messages: vec![parse] };
        let errors = shader_errors(ShaderStage::Vertex, &info, Some(validation_error("Shader is invalid")));
        assert_eq!(errors, vec!["Vertex 1:19: unexpected token".to_owned()]);
    }

    #[test]
    fn pipeline_validation_maps_to_compile_failure() {
        let err = pipeline_error("builtin/fog", &validation_error("location[0] not provided"));
        assert!(
            matches!(&err, RenderError::ShaderCompileFailure { label, log }
                if label == "builtin/fog" && log.contains("location[0]")),
            "got {err:?}"
        );
    }

    #[test]
    fn vsync_setting_selects_present_mode() {
        let mut settings = RendererSettings::default();
        assert_eq!(present_mode(&settings), wgpu::PresentMode::AutoVsync);

        settings = RendererSettings::from_json_str(r#"{ "vsync": false }"#).unwrap();
        assert_eq!(present_mode(&settings), wgpu::PresentMode::AutoNoVsync);
    }
}
