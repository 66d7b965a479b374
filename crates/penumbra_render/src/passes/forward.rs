//! Forward Renderer
//!
//! Draws every visible mesh straight to the surface in one lit pass: the
//! first directional light and up to [`FORWARD_MAX_POINT_LIGHTS`] point
//! lights, no shadows and no post-processing. Used for wireframe viewing,
//! where it switches the rasterizer to line mode when the device allows it.

use penumbra_core::Result;
use penumbra_scene::PointLight;

use super::{DrawItem, FrameContext, Renderer, drain_query};
use crate::device::{
    ColorAttachment, CullMode, DepthMode, GpuDevice, LoadOp, PassDesc, PipelineState, PolygonMode, RenderTo,
    TextureFormat, TextureId,
};
use crate::settings::RendererKind;
use crate::shaders::Program;
use crate::target::{AttachmentPoint, RenderTarget, TextureSemantic};
use crate::uniforms::{FORWARD_MAX_POINT_LIGHTS, ForwardUniforms, bytes_of};

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug)]
pub struct ForwardRenderer {
    depth: RenderTarget,
    warned_wireframe: bool,
}

impl ForwardRenderer {
    pub fn new(device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<Self> {
        let mut depth = RenderTarget::new("Forward Depth", width.max(1), height.max(1));
        depth.create_attachment(
            device,
            AttachmentPoint::Depth,
            TextureFormat::Depth32Float,
            Some(TextureSemantic::Depth),
        );
        depth.validate(device);
        depth.ensure_complete()?;
        Ok(Self {
            depth,
            warned_wireframe: false,
        })
    }

    fn pipeline_state(&mut self, wireframe: bool, device: &dyn GpuDevice) -> PipelineState {
        let mut state = PipelineState {
            cull: CullMode::Back,
            depth: DepthMode::TestWrite,
            ..PipelineState::default()
        };
        if wireframe {
            if device.supports_wireframe() {
                state.polygon = PolygonMode::Line;
                state.cull = CullMode::None;
            } else if !self.warned_wireframe {
                log::warn!("Device does not support line rasterization, wireframe falls back to filled polygons");
                self.warned_wireframe = true;
            }
        }
        state
    }
}

impl Renderer for ForwardRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Forward
    }

    fn resize(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()> {
        self.depth.resize(device, width.max(1), height.max(1))?;
        self.depth.validate(device);
        self.depth.ensure_complete()
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        let (width, height) = ctx.device.surface_size();
        if self.depth.size() != (width.max(1), height.max(1)) {
            self.resize(ctx.device, width, height)?;
        }

        let visible = drain_query(ctx.scene, ctx.cache, ctx.query);
        let Some(program) = ctx.program(Program::Forward) else {
            return Ok(());
        };

        if visible.point_lights.len() > FORWARD_MAX_POINT_LIGHTS {
            log::debug!(
                "Forward pass shades {FORWARD_MAX_POINT_LIGHTS} of {} visible point lights",
                visible.point_lights.len()
            );
        }
        let points: Vec<&PointLight> = visible.point_lights.iter().collect();
        let uniforms = ForwardUniforms::new(
            ctx.camera,
            ctx.scene.ambient(),
            visible.directional_lights.first(),
            &points,
        );

        let mut pass = PassDesc::new("Forward", Some(program));
        pass.color.push(ColorAttachment {
            target: RenderTo::Surface,
            load: LoadOp::Clear(CLEAR_COLOR),
        });
        pass.depth = self.depth.depth_attachment(LoadOp::Clear(1.0));
        pass.state = self.pipeline_state(ctx.settings.wireframe, &*ctx.device);
        pass.uniforms = bytes_of(&uniforms);
        pass.draws = visible.draws.iter().map(DrawItem::material_call).collect();
        ctx.device.run_pass(&pass)
    }

    fn texture(&self, semantic: TextureSemantic) -> Option<TextureId> {
        self.depth.semantic(semantic)
    }
}
