//! Deferred Renderer
//!
//! Frame structure:
//!
//! 1. **Geometry**: visible meshes write albedo/glow, normal/specular and
//!    depth into the G-buffer.
//! 2. **Lighting**: the light buffer is cleared to the ambient radiance,
//!    then every visible light adds its contribution. Point lights draw a
//!    sphere volume scaled to their radius; directional lights draw a
//!    full-screen triangle. Shadowed lights first render their depth map,
//!    interleaved per light so a single shadow map of each kind is reused.
//! 3. **Illumination**: albedo, glow and accumulated light are combined
//!    into the HDR scene buffer.
//! 4. **Post-processing**: the stages of a [`PostPlan`] rotate through three
//!    ping-pong buffers.
//! 5. **Display**: the selected buffer is blitted to the surface, optionally
//!    followed by debug thumbnails.
//!
//! A pass whose program or mesh cannot be resolved is skipped with an
//! error log; the rest of the frame still renders.

use glam::{Mat4, Vec2, Vec3, Vec4};

use penumbra_core::Result;
use penumbra_scene::{Camera, DirectionalLight, PointLight};

use super::post::{PostBuffer, PostInput, PostPlan, PostStage, plan_post_chain};
use super::shadow::{
    casts_into, directional_light_view_projection, point_light_face_view_projections, shadow_matrix,
    within_light,
};
use super::{DrawItem, FrameContext, Renderer, VisibleSet, drain_query, light_volume_transform, scene_draws};
use crate::device::{
    BlendMode, ColorAttachment, CullMode, DepthAttachment, DepthBias, DepthMode, DrawCall, GpuDevice, LoadOp,
    PassDesc, PipelineState, RenderTo, TextureDesc, TextureFormat, TextureId, Viewport,
};
use crate::settings::{DebugView, RendererKind, RendererSettings};
use crate::shaders::Program;
use crate::target::{AttachmentPoint, RenderTarget, TextureSemantic};
use crate::uniforms::{
    CameraUniforms, DirectionalLightUniforms, ObjectUniforms, PointLightUniforms, PostUniforms, ShadowUniforms,
    bytes_of,
};

/// Light volume tessellation reaches slightly past the unit radius.
const LIGHT_VOLUME_MARGIN: f32 = 1.03;

/// Fraction of the far plane at which the sun is placed for god rays.
const SUN_DISTANCE: f32 = 0.9;

const GLOW_STRENGTH: f32 = 1.0;

const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Texture ids of every buffer the frame touches, fixed at construction.
#[derive(Debug, Clone, Copy)]
struct Buffers {
    albedo: TextureId,
    normal: TextureId,
    depth: TextureId,
    light: TextureId,
    scene: TextureId,
    ping_pong: [TextureId; 3],
    directional_shadow: TextureId,
    point_shadow: TextureId,
}

#[derive(Debug)]
pub struct DeferredRenderer {
    gbuffer: RenderTarget,
    light: RenderTarget,
    scene: RenderTarget,
    /// Post buffers A, B, C.
    ping_pong: [RenderTarget; 3],
    buffers: Buffers,
    /// Current `(directional, point)` shadow map sizes.
    shadow_sizes: (u32, u32),
    last_plan: Option<PostPlan>,
}

impl DeferredRenderer {
    /// Allocates every target at `width x height` and validates them.
    pub fn new(device: &mut dyn GpuDevice, width: u32, height: u32, settings: &RendererSettings) -> Result<Self> {
        let (width, height) = (width.max(1), height.max(1));

        let mut gbuffer = RenderTarget::new("G-Buffer", width, height);
        let albedo = gbuffer.create_attachment(
            device,
            AttachmentPoint::Color(0),
            TextureFormat::Rgba8Unorm,
            Some(TextureSemantic::Diffuse),
        );
        let normal = gbuffer.create_attachment(
            device,
            AttachmentPoint::Color(1),
            TextureFormat::Rgba16Float,
            Some(TextureSemantic::Normal),
        );
        let depth = gbuffer.create_attachment(
            device,
            AttachmentPoint::Depth,
            TextureFormat::Depth32Float,
            Some(TextureSemantic::Depth),
        );

        let (light, light_id) = color_target(device, "Light Buffer", width, height, Some(TextureSemantic::Light));
        let (scene, scene_id) = color_target(device, "Scene HDR", width, height, Some(TextureSemantic::LitHdr));
        let (post_a, a) = color_target(device, "Post A", width, height, None);
        let (post_b, b) = color_target(device, "Post B", width, height, Some(TextureSemantic::LitLdr));
        let (post_c, c) = color_target(device, "Post C", width, height, None);

        let shadows = &settings.shadows;
        let directional_shadow = device.create_texture(&TextureDesc::new_2d(
            "Directional Shadow Map",
            shadows.directional_map_size,
            shadows.directional_map_size,
            TextureFormat::Depth32Float,
        ));
        let point_shadow = device.create_texture(&TextureDesc::new_cube(
            "Point Shadow Cube",
            shadows.point_map_size,
            TextureFormat::Depth32Float,
        ));

        let mut renderer = Self {
            gbuffer,
            light,
            scene,
            ping_pong: [post_a, post_b, post_c],
            buffers: Buffers {
                albedo,
                normal,
                depth,
                light: light_id,
                scene: scene_id,
                ping_pong: [a, b, c],
                directional_shadow,
                point_shadow,
            },
            shadow_sizes: (shadows.directional_map_size, shadows.point_map_size),
            last_plan: None,
        };
        renderer.validate(device)?;

        log::info!("Deferred renderer ready at {width}x{height}");
        Ok(renderer)
    }

    fn targets_mut(&mut self) -> impl Iterator<Item = &mut RenderTarget> {
        [&mut self.gbuffer, &mut self.light, &mut self.scene]
            .into_iter()
            .chain(self.ping_pong.iter_mut())
    }

    fn targets(&self) -> impl Iterator<Item = &RenderTarget> {
        [&self.gbuffer, &self.light, &self.scene]
            .into_iter()
            .chain(self.ping_pong.iter())
    }

    fn validate(&mut self, device: &dyn GpuDevice) -> Result<()> {
        for target in self.targets_mut() {
            target.validate(device);
            target.ensure_complete()?;
        }
        Ok(())
    }

    /// The G-buffer, exposed for inspection.
    #[must_use]
    pub fn gbuffer(&self) -> &RenderTarget {
        &self.gbuffer
    }

    /// The post plan executed by the most recent frame.
    #[must_use]
    pub fn last_plan(&self) -> Option<&PostPlan> {
        self.last_plan.as_ref()
    }

    fn post_buffer(&self, buffer: PostBuffer) -> TextureId {
        match buffer {
            PostBuffer::Scene => self.buffers.scene,
            PostBuffer::A => self.buffers.ping_pong[0],
            PostBuffer::B => self.buffers.ping_pong[1],
            PostBuffer::C => self.buffers.ping_pong[2],
        }
    }

    fn post_input(&self, input: PostInput) -> TextureId {
        match input {
            PostInput::Buffer(buffer) => self.post_buffer(buffer),
            PostInput::Depth => self.buffers.depth,
            PostInput::Normal => self.buffers.normal,
        }
    }

    fn sync_shadow_sizes(&mut self, device: &mut dyn GpuDevice, settings: &RendererSettings) -> Result<()> {
        let wanted = (settings.shadows.directional_map_size, settings.shadows.point_map_size);
        if wanted.0 != self.shadow_sizes.0 {
            device.resize_texture(self.buffers.directional_shadow, wanted.0, wanted.0)?;
        }
        if wanted.1 != self.shadow_sizes.1 {
            device.resize_texture(self.buffers.point_shadow, wanted.1, wanted.1)?;
        }
        self.shadow_sizes = wanted;
        Ok(())
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    fn geometry_pass(&self, ctx: &mut FrameContext<'_>, camera: &CameraUniforms, draws: &[DrawItem]) -> Result<()> {
        let Some(program) = ctx.program(Program::Geometry) else {
            return Ok(());
        };

        let mut pass = PassDesc::new("Geometry", Some(program));
        pass.color = self.gbuffer.color_attachments(LoadOp::Clear([0.0; 4]));
        pass.depth = self.gbuffer.depth_attachment(LoadOp::Clear(1.0));
        pass.state = PipelineState {
            cull: CullMode::Back,
            depth: DepthMode::TestWrite,
            ..PipelineState::default()
        };
        pass.uniforms = bytes_of(camera);
        pass.draws = draws.iter().map(DrawItem::material_call).collect();
        ctx.device.run_pass(&pass)
    }

    // ========================================================================
    // Lighting
    // ========================================================================

    fn light_passes(&self, ctx: &mut FrameContext<'_>, camera: &CameraUniforms, visible: &VisibleSet) -> Result<()> {
        let ambient = ctx.scene.ambient().radiance();
        let mut clear = PassDesc::new("Light Clear", None);
        clear.color = self
            .light
            .color_attachments(LoadOp::Clear([ambient.x, ambient.y, ambient.z, 0.0]));
        ctx.device.run_pass(&clear)?;

        let any_shadows = visible.point_lights.iter().any(|l| l.casts_shadow)
            || visible.directional_lights.iter().any(|l| l.casts_shadow);
        let casters = if any_shadows {
            scene_draws(ctx.scene, ctx.cache)
        } else {
            Vec::new()
        };

        if !visible.point_lights.is_empty() {
            let program = ctx.program(Program::LightPoint);
            let volume = ctx.light_volume_mesh();
            for light in &visible.point_lights {
                let shadowed = light.casts_shadow && self.point_shadow_passes(ctx, light, &casters)?;
                if let (Some(program), Some(volume)) = (program, volume) {
                    let mut pass = PassDesc::new("Point Light", Some(program));
                    pass.color = self.light.color_attachments(LoadOp::Load);
                    pass.state = PipelineState {
                        blend: BlendMode::Additive,
                        cull: light_volume_cull(ctx.camera, light),
                        ..PipelineState::default()
                    };
                    pass.uniforms = bytes_of(&PointLightUniforms::new(
                        camera,
                        light,
                        shadowed,
                        ctx.settings.shadows.sample_bias,
                    ));
                    pass.textures.extend([self.buffers.normal, self.buffers.depth, self.buffers.point_shadow]);
                    pass.draws.push(DrawCall::mesh(
                        volume.id,
                        bytes_of(&ObjectUniforms::transform(light_volume_transform(light))),
                        &[],
                    ));
                    ctx.device.run_pass(&pass)?;
                }
            }
        }

        if !visible.directional_lights.is_empty() {
            let program = ctx.program(Program::LightDirectional);
            for light in &visible.directional_lights {
                let shadow = if light.casts_shadow {
                    self.directional_shadow_pass(ctx, light, &casters)?
                } else {
                    None
                };
                if let Some(program) = program {
                    let mut pass = PassDesc::new("Directional Light", Some(program));
                    pass.color = self.light.color_attachments(LoadOp::Load);
                    pass.state.blend = BlendMode::Additive;
                    pass.uniforms = bytes_of(&DirectionalLightUniforms::new(
                        camera,
                        light,
                        shadow,
                        ctx.settings.shadows.sample_bias,
                        self.shadow_sizes.0,
                    ));
                    pass.textures.extend([
                        self.buffers.normal,
                        self.buffers.depth,
                        self.buffers.directional_shadow,
                    ]);
                    pass.draws.push(DrawCall::fullscreen());
                    ctx.device.run_pass(&pass)?;
                }
            }
        }

        Ok(())
    }

    /// Renders the six cube faces for `light`. Returns whether the cube now
    /// holds this light's depths.
    fn point_shadow_passes(&self, ctx: &mut FrameContext<'_>, light: &PointLight, casters: &[DrawItem]) -> Result<bool> {
        let Some(program) = ctx.program(Program::ShadowPoint) else {
            return Ok(false);
        };

        let draws: Vec<DrawCall> = casters
            .iter()
            .filter(|item| within_light(light.position, light.radius, &item.bounds))
            .map(DrawItem::transform_call)
            .collect();

        let faces = point_light_face_view_projections(light.position, light.radius);
        for (layer, view_projection) in (0u32..).zip(faces) {
            let mut pass = PassDesc::new("Point Shadow", Some(program));
            pass.depth = Some(DepthAttachment {
                texture: self.buffers.point_shadow,
                layer,
                load: LoadOp::Clear(1.0),
            });
            pass.state = PipelineState {
                cull: CullMode::None,
                depth: DepthMode::TestWrite,
                ..PipelineState::default()
            };
            pass.uniforms = bytes_of(&ShadowUniforms {
                light_view_proj: view_projection,
                light_pos_radius: light.position.extend(light.radius),
                params: Vec4::ZERO,
            });
            pass.draws.clone_from(&draws);
            ctx.device.run_pass(&pass)?;
        }
        Ok(true)
    }

    /// Renders the directional shadow map. Returns the world to shadow-map
    /// matrix when the map was written.
    fn directional_shadow_pass(
        &self,
        ctx: &mut FrameContext<'_>,
        light: &DirectionalLight,
        casters: &[DrawItem],
    ) -> Result<Option<Mat4>> {
        let Some(program) = ctx.program(Program::ShadowDirectional) else {
            return Ok(None);
        };
        let shadows = &ctx.settings.shadows;
        let view_projection = directional_light_view_projection(light.direction, ctx.camera, self.shadow_sizes.0);

        let mut pass = PassDesc::new("Directional Shadow", Some(program));
        pass.depth = Some(DepthAttachment {
            texture: self.buffers.directional_shadow,
            layer: 0,
            load: LoadOp::Clear(1.0),
        });
        pass.state = PipelineState {
            cull: CullMode::Front,
            depth: DepthMode::TestWrite,
            depth_bias: Some(DepthBias {
                constant: shadows.depth_bias_constant,
                slope_scale: shadows.depth_bias_slope,
            }),
            ..PipelineState::default()
        };
        pass.uniforms = bytes_of(&ShadowUniforms {
            light_view_proj: view_projection,
            light_pos_radius: Vec4::ZERO,
            params: Vec4::ZERO,
        });
        pass.draws = casters
            .iter()
            .filter(|item| casts_into(view_projection, &item.bounds))
            .map(DrawItem::transform_call)
            .collect();
        ctx.device.run_pass(&pass)?;

        Ok(Some(shadow_matrix(view_projection)))
    }

    // ========================================================================
    // Composition
    // ========================================================================

    fn illumination_pass(&self, ctx: &mut FrameContext<'_>, camera: &CameraUniforms) -> Result<()> {
        let Some(program) = ctx.program(Program::Illumination) else {
            return Ok(());
        };
        let mut pass = PassDesc::new("Illumination", Some(program));
        pass.color = self.scene.color_attachments(LoadOp::Clear(BLACK));
        pass.uniforms = bytes_of(&PostUniforms::new(
            camera,
            [Vec4::new(GLOW_STRENGTH, 0.0, 0.0, 0.0), Vec4::ZERO],
        ));
        pass.textures.extend([self.buffers.albedo, self.buffers.light]);
        pass.draws.push(DrawCall::fullscreen());
        ctx.device.run_pass(&pass)
    }

    fn post_passes(
        &self,
        ctx: &mut FrameContext<'_>,
        camera: &CameraUniforms,
        plan: &PostPlan,
        sun: Option<&DirectionalLight>,
    ) -> Result<()> {
        for step in &plan.steps {
            let Some(program) = ctx.program(step.stage.program()) else {
                continue;
            };
            let params = stage_params(step.stage, ctx.settings, ctx.camera, camera, sun);

            let mut pass = PassDesc::new(step.stage.label(), Some(program));
            pass.color.push(ColorAttachment {
                target: RenderTo::Texture {
                    id: self.post_buffer(step.output),
                    layer: 0,
                },
                load: LoadOp::Clear(BLACK),
            });
            pass.uniforms = bytes_of(&PostUniforms::new(camera, params));
            pass.textures = step.inputs.iter().map(|&input| self.post_input(input)).collect();
            pass.draws.push(DrawCall::fullscreen());
            ctx.device.run_pass(&pass)?;
        }
        Ok(())
    }

    fn blit(
        &self,
        ctx: &mut FrameContext<'_>,
        camera: &CameraUniforms,
        source: TextureId,
        show_normals: bool,
        viewport: Option<Viewport>,
        load: LoadOp<[f32; 4]>,
    ) -> Result<()> {
        let Some(program) = ctx.program(Program::Display) else {
            return Ok(());
        };
        let mode = if show_normals { 1.0 } else { 0.0 };
        let mut pass = PassDesc::new("Display", Some(program));
        pass.color.push(ColorAttachment {
            target: RenderTo::Surface,
            load,
        });
        pass.viewport = viewport;
        pass.uniforms = bytes_of(&PostUniforms::new(camera, [Vec4::new(mode, 0.0, 0.0, 0.0), Vec4::ZERO]));
        pass.textures.push(source);
        pass.draws.push(DrawCall::fullscreen());
        ctx.device.run_pass(&pass)
    }

    fn display_pass(&self, ctx: &mut FrameContext<'_>, camera: &CameraUniforms, plan: &PostPlan) -> Result<()> {
        let (source, show_normals) = match ctx.settings.debug_view {
            DebugView::Final | DebugView::GodRays => (self.post_buffer(plan.output), false),
            DebugView::Albedo => (self.buffers.albedo, false),
            DebugView::Normals => (self.buffers.normal, true),
            DebugView::Light => (self.buffers.light, false),
        };
        self.blit(ctx, camera, source, show_normals, None, LoadOp::Clear(BLACK))
    }

    /// Quarter-size thumbnails of albedo, normals, light and the final image
    /// along the bottom of the screen.
    fn debug_overlay(&self, ctx: &mut FrameContext<'_>, camera: &CameraUniforms, plan: &PostPlan) -> Result<()> {
        let (width, height) = self.gbuffer.size();
        let size = Vec2::new(width as f32, height as f32) / 4.0;
        let tiles = [
            (self.buffers.albedo, false),
            (self.buffers.normal, true),
            (self.buffers.light, false),
            (self.post_buffer(plan.output), false),
        ];
        for (i, (source, show_normals)) in tiles.into_iter().enumerate() {
            let viewport = Viewport {
                x: i as f32 * size.x,
                y: height as f32 - size.y,
                width: size.x,
                height: size.y,
            };
            self.blit(ctx, camera, source, show_normals, Some(viewport), LoadOp::Load)?;
        }
        Ok(())
    }
}

impl Renderer for DeferredRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Deferred
    }

    fn resize(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()> {
        let (width, height) = (width.max(1), height.max(1));
        for target in self.targets_mut() {
            target.resize(device, width, height)?;
        }
        self.validate(device)?;
        log::debug!("Deferred targets resized to {width}x{height}");
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        let (width, height) = ctx.device.surface_size();
        if self.gbuffer.size() != (width.max(1), height.max(1)) {
            self.resize(ctx.device, width, height)?;
        }
        self.sync_shadow_sizes(ctx.device, ctx.settings)?;

        let camera = CameraUniforms::new(ctx.camera, width, height);
        let visible = drain_query(ctx.scene, ctx.cache, ctx.query);

        self.geometry_pass(ctx, &camera, &visible.draws)?;
        self.light_passes(ctx, &camera, &visible)?;
        self.illumination_pass(ctx, &camera)?;

        let plan = plan_post_chain(&ctx.settings.post, ctx.settings.debug_view == DebugView::GodRays);
        self.post_passes(ctx, &camera, &plan, visible.directional_lights.first())?;

        self.display_pass(ctx, &camera, &plan)?;
        if ctx.settings.debug_overlay {
            self.debug_overlay(ctx, &camera, &plan)?;
        }

        self.last_plan = Some(plan);
        Ok(())
    }

    fn texture(&self, semantic: TextureSemantic) -> Option<TextureId> {
        self.targets().find_map(|target| target.semantic(semantic))
    }
}

fn color_target(
    device: &mut dyn GpuDevice,
    label: &str,
    width: u32,
    height: u32,
    semantic: Option<TextureSemantic>,
) -> (RenderTarget, TextureId) {
    let mut target = RenderTarget::new(label, width, height);
    let id = target.create_attachment(device, AttachmentPoint::Color(0), TextureFormat::Rgba16Float, semantic);
    (target, id)
}

/// Back faces normally; front faces once the camera is inside the volume,
/// where the near faces are clipped away.
fn light_volume_cull(camera: &Camera, light: &PointLight) -> CullMode {
    let reach = light.radius * LIGHT_VOLUME_MARGIN + camera.near;
    if camera.position.distance_squared(light.position) < reach * reach {
        CullMode::Front
    } else {
        CullMode::Back
    }
}

/// `PostUniforms::params` for one post stage.
fn stage_params(
    stage: PostStage,
    settings: &RendererSettings,
    camera: &Camera,
    uniforms: &CameraUniforms,
    sun: Option<&DirectionalLight>,
) -> [Vec4; 2] {
    let post = &settings.post;
    let first = match stage {
        PostStage::Fog => Vec3::from(post.fog.color).extend(post.fog.density),
        PostStage::DofBlurHorizontal => Vec4::new(uniforms.screen.z, 0.0, 0.0, 0.0),
        PostStage::DofBlurVertical => Vec4::new(0.0, uniforms.screen.w, 0.0, 0.0),
        PostStage::DofCombine => Vec4::new(post.depth_of_field.focus_distance, post.depth_of_field.focus_range, 0.0, 0.0),
        PostStage::GodRays => {
            let (uv, facing) = sun_screen_position(camera, sun);
            return [
                Vec4::new(uv.x, uv.y, post.god_rays.density, post.god_rays.decay),
                Vec4::new(post.god_rays.exposure, facing, 0.0, 0.0),
            ];
        }
        PostStage::Vignette => Vec4::new(post.vignette, 0.0, 0.0, 0.0),
        PostStage::BloomExtract => Vec4::new(post.bloom.threshold, 0.0, 0.0, 0.0),
        PostStage::BloomCombine => Vec4::new(post.bloom.intensity, 0.0, 0.0, 0.0),
        PostStage::FlareThreshold => Vec4::new(post.lens_flare.threshold, 0.0, 0.0, 0.0),
        PostStage::FlareGhosts => Vec4::new(post.lens_flare.ghosts as f32, post.lens_flare.ghost_spacing, 0.0, 0.0),
        PostStage::FlareCombine => Vec4::new(post.lens_flare.intensity, 0.0, 0.0, 0.0),
        PostStage::ToneMap => Vec4::new(post.exposure, 0.0, 0.0, 0.0),
        PostStage::AntiAlias
        | PostStage::Passthrough
        | PostStage::GodRaysCombine
        | PostStage::CelShade => Vec4::ZERO,
    };
    [first, Vec4::ZERO]
}

/// Screen uv of the sun for `light` and how directly the camera faces it.
/// Facing is zero without a directional light or when the sun is behind the
/// camera.
#[must_use]
pub fn sun_screen_position(camera: &Camera, light: Option<&DirectionalLight>) -> (Vec2, f32) {
    let Some(light) = light else {
        return (Vec2::splat(0.5), 0.0);
    };
    let direction = light.direction.normalize_or_zero();
    let sun = camera.position - direction * camera.far * SUN_DISTANCE;
    let clip = camera.view_projection() * sun.extend(1.0);
    if clip.w <= f32::EPSILON {
        return (Vec2::splat(0.5), 0.0);
    }
    let ndc = clip.truncate() / clip.w;
    let uv = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let facing = camera.forward().dot(-direction).max(0.0);
    (uv, facing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_inside_volume_culls_front_faces() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let near = PointLight::new(Vec3::new(0.0, 0.0, -2.0), 5.0, Vec3::ONE, 1.0);
        let far = PointLight::new(Vec3::new(0.0, 0.0, -20.0), 5.0, Vec3::ONE, 1.0);
        assert_eq!(light_volume_cull(&camera, &near), CullMode::Front);
        assert_eq!(light_volume_cull(&camera, &far), CullMode::Back);
    }

    #[test]
    fn sun_ahead_of_camera_projects_to_center() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        // Light travels toward +z, so the sun sits straight ahead.
        let light = DirectionalLight::new(Vec3::Z, Vec3::ONE, 1.0);
        let (uv, facing) = sun_screen_position(&camera, Some(&light));
        assert!((uv - Vec2::splat(0.5)).length() < 1e-3, "uv = {uv}");
        assert!((facing - 1.0).abs() < 1e-4);
    }

    #[test]
    fn sun_behind_camera_has_no_facing() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let light = DirectionalLight::new(Vec3::NEG_Z, Vec3::ONE, 1.0);
        let (_, facing) = sun_screen_position(&camera, Some(&light));
        assert_eq!(facing, 0.0);
        assert_eq!(sun_screen_position(&camera, None).1, 0.0);
    }

    #[test]
    fn blur_steps_follow_texel_size() {
        let settings = RendererSettings::default();
        let camera = Camera::default();
        let uniforms = CameraUniforms::new(&camera, 200, 100);
        let h = stage_params(PostStage::DofBlurHorizontal, &settings, &camera, &uniforms, None)[0];
        let v = stage_params(PostStage::DofBlurVertical, &settings, &camera, &uniforms, None)[0];
        assert!((h.x - 1.0 / 200.0).abs() < 1e-6 && h.y == 0.0);
        assert!((v.y - 1.0 / 100.0).abs() < 1e-6 && v.x == 0.0);
    }
}
