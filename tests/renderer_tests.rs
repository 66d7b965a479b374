//! Render System Tests
//!
//! Drives whole frames through `RenderSystem` on a `HeadlessDevice` and
//! asserts on the recorded passes.
//!
//! Tests for:
//! - Deferred pass order, with and without shadowed lights
//! - Skipping passes whose program or mesh is unavailable
//! - Resources that fail to materialize between frames
//! - Wireframe mode and the forward renderer
//! - Culling toggles, debug views and overlays
//! - Lifecycle errors and surface resizes

use std::any::Any;

use glam::Vec3;

use penumbra::core::{Handle, RenderError, Result};
use penumbra::{LoggingConfig, init_logging};
use penumbra::render::device::{
    CullMode, GpuDevice, HeadlessDevice, MeshId, PassDesc, PolygonMode, ProgramId, RenderTo, TextureDesc,
    TextureFormat, TextureId,
};
use penumbra::render::{
    DebugView, PostEffects, RenderSystem, RendererKind, RendererSettings, SceneHandle, TextureSemantic,
};
use penumbra::resources::primitives::create_cube;
use penumbra::resources::{Image, Material, Mesh, ProgramLayout, ResourceStore, ShaderSource};
use penumbra::scene::{BoundingSphere, DirectionalLight, PointLight, Renderable, SceneObject};

const SIZE: (u32, u32) = (320, 240);

struct Harness {
    system: RenderSystem,
    store: ResourceStore,
    scene: SceneHandle,
}

impl Harness {
    fn new(device: Box<dyn GpuDevice>, settings: RendererSettings) -> Self {
        init_logging(LoggingConfig::for_tests());
        let mut store = ResourceStore::new();
        let mut system = RenderSystem::new(device, settings);
        system.init(&mut store).expect("init");

        let scene = system.create_scene();
        let camera = system.create_camera();
        system.set_active_scene(scene).expect("scene");
        system.set_active_camera(camera).expect("camera");
        Self { system, store, scene }
    }

    fn headless(settings: RendererSettings) -> Self {
        Self::new(Box::new(HeadlessDevice::new(SIZE.0, SIZE.1)), settings)
    }

    /// Adds a unit cube at `position`.
    fn add_cube(&mut self, position: Vec3) {
        let mesh = self.store.create_mesh(create_cube(1.0));
        let material = self.store.create_material(Material::new("cube"));
        let scene = self.system.scene_mut(self.scene).expect("scene");
        let handle = scene.create_renderable(&self.store, Renderable::Mesh { mesh, material });
        scene.object_mut(handle).set_position(position);
    }

    fn scene_mut(&mut self) -> &mut penumbra::Scene {
        self.system.scene_mut(self.scene).expect("scene")
    }

    fn draw(&mut self) -> Result<()> {
        self.system.draw(&self.store, &SIZE)
    }

    fn device(&self) -> &HeadlessDevice {
        self.system
            .device()
            .as_any()
            .downcast_ref::<HeadlessDevice>()
            .expect("headless device")
    }

    /// Passes recorded from index `from` on.
    fn passes_since(&self, from: usize) -> &[PassDesc] {
        &self.device().passes()[from..]
    }

    fn labels_since(&self, from: usize) -> Vec<&'static str> {
        self.passes_since(from).iter().map(|p| p.label).collect()
    }

    fn pass_count(&self) -> usize {
        self.device().passes().len()
    }
}

const DEFAULT_POST: [&str; 10] = [
    "Post: FXAA",
    "Post: Fog",
    "Post: Passthrough",
    "Post: Passthrough",
    "Post: Vignette",
    "Post: Bloom Extract",
    "Post: Bloom Combine",
    "Post: Passthrough",
    "Post: Tone Map",
    "Post: Passthrough",
];

// ============================================================================
// Deferred Frame Structure
// ============================================================================

#[test]
fn unlit_frame_pass_order() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.draw().expect("frame");

    let mut expected = vec!["Geometry", "Light Clear", "Illumination"];
    expected.extend(DEFAULT_POST);
    expected.push("Display");
    assert_eq!(h.labels_since(0), expected);
    assert_eq!(h.device().frames_presented(), 1);
    assert_eq!(h.system.frame_count(), 1);
}

#[test]
fn shadowed_lights_render_their_maps_first() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.scene_mut()
        .create_point_light(PointLight::new(Vec3::new(0.0, 2.0, 0.0), 5.0, Vec3::ONE, 1.0).with_shadows());
    h.scene_mut()
        .create_directional_light(DirectionalLight::new(Vec3::new(-0.3, -1.0, -0.2), Vec3::ONE, 1.0).with_shadows());
    h.draw().expect("frame");

    let labels = h.labels_since(0);
    let mut expected = vec!["Geometry", "Light Clear"];
    expected.extend(["Point Shadow"; 6]);
    expected.extend(["Point Light", "Directional Shadow", "Directional Light", "Illumination"]);
    expected.extend(DEFAULT_POST);
    expected.push("Display");
    assert_eq!(labels, expected);

    let faces: Vec<u32> = h
        .passes_since(0)
        .iter()
        .filter(|p| p.label == "Point Shadow")
        .map(|p| p.depth.expect("depth-only pass").layer)
        .collect();
    assert_eq!(faces, vec![0, 1, 2, 3, 4, 5], "one pass per cube face");

    let directional = h
        .passes_since(0)
        .iter()
        .find(|p| p.label == "Directional Shadow")
        .expect("shadow pass");
    assert!(directional.state.depth_bias.is_some(), "directional casters are biased");
    assert_eq!(directional.state.cull, CullMode::Front);
}

#[test]
fn each_shadowed_point_light_gets_its_own_faces() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    for x in [-1.0, 1.0] {
        h.scene_mut()
            .create_point_light(PointLight::new(Vec3::new(x, 1.0, 0.0), 4.0, Vec3::ONE, 1.0).with_shadows());
    }
    h.draw().expect("frame");

    let lighting: Vec<&str> = h
        .labels_since(0)
        .into_iter()
        .filter(|l| l.starts_with("Point"))
        .collect();
    let mut expected = Vec::new();
    for _ in 0..2 {
        expected.extend(["Point Shadow"; 6]);
        expected.push("Point Light");
    }
    assert_eq!(lighting, expected, "shadow faces are interleaved with their light");
}

#[test]
fn light_passes_accumulate_additively() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.scene_mut()
        .create_point_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), 3.0, Vec3::ONE, 1.0));
    h.draw().expect("frame");

    let point = h
        .passes_since(0)
        .iter()
        .find(|p| p.label == "Point Light")
        .expect("point light pass");
    assert_eq!(point.state.blend, penumbra::render::device::BlendMode::Additive);
    assert_eq!(point.draws.len(), 1, "one light volume");
    assert_eq!(point.textures.len(), 3);
}

#[test]
fn geometry_pass_draws_visible_objects_only() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.add_cube(Vec3::new(0.0, 0.0, 50.0));
    h.draw().expect("frame");

    let geometry = &h.passes_since(0)[0];
    assert_eq!(geometry.label, "Geometry");
    assert_eq!(geometry.draws.len(), 1, "the cube behind the camera is culled");
    assert_eq!(geometry.draws[0].textures.len(), 5, "five material channels");
}

#[test]
fn hidden_objects_are_not_drawn() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.scene_mut().object_mut(Handle::from_raw(0)).set_visible(false);
    h.draw().expect("frame");
    assert!(h.passes_since(0)[0].draws.is_empty());
}

// ============================================================================
// Missing Resources
// ============================================================================

#[test]
fn unmaterialized_mesh_is_skipped() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    let material = h.store.create_material(Material::new("orphan"));
    h.scene_mut().create_object(SceneObject::new(
        Renderable::Mesh {
            mesh: Handle::from_raw(999),
            material,
        },
        BoundingSphere::new(Vec3::ZERO, 1.0),
    ));

    h.draw().expect("a missing mesh does not fail the frame");
    assert_eq!(h.system.query().object_count(), 2, "both objects are visible");
    assert_eq!(h.passes_since(0)[0].draws.len(), 1, "only the resolvable one is drawn");
}

/// Delegates to a `HeadlessDevice` but pretends one program never linked.
struct MissingProgramDevice {
    inner: HeadlessDevice,
    hidden_label: &'static str,
    hidden: Option<ProgramId>,
}

impl GpuDevice for MissingProgramDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId {
        self.inner.create_texture(desc)
    }

    fn write_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<()> {
        self.inner.write_texture(id, pixels)
    }

    fn resize_texture(&mut self, id: TextureId, width: u32, height: u32) -> Result<()> {
        self.inner.resize_texture(id, width, height)
    }

    fn texture_desc(&self, id: TextureId) -> Option<&TextureDesc> {
        self.inner.texture_desc(id)
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> MeshId {
        self.inner.create_mesh(mesh)
    }

    fn has_mesh(&self, id: MeshId) -> bool {
        self.inner.has_mesh(id)
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId> {
        let id = self.inner.create_program(source)?;
        if source.label == self.hidden_label {
            self.hidden = Some(id);
        }
        Ok(id)
    }

    fn has_program(&self, id: ProgramId) -> bool {
        self.hidden != Some(id) && self.inner.has_program(id)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.inner.surface_size()
    }

    fn surface_format(&self) -> TextureFormat {
        self.inner.surface_format()
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.inner.resize_surface(width, height);
    }

    fn supports_wireframe(&self) -> bool {
        self.inner.supports_wireframe()
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.inner.begin_frame()
    }

    fn run_pass(&mut self, pass: &PassDesc) -> Result<()> {
        self.inner.run_pass(pass)
    }

    fn end_frame(&mut self) -> Result<()> {
        self.inner.end_frame()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn missing_program_skips_only_its_pass() {
    let device = MissingProgramDevice {
        inner: HeadlessDevice::new(SIZE.0, SIZE.1),
        hidden_label: "builtin/light_point",
        hidden: None,
    };
    let mut h = Harness::new(Box::new(device), RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.scene_mut()
        .create_point_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), 3.0, Vec3::ONE, 1.0));
    h.scene_mut().create_directional_light(DirectionalLight::default());

    h.draw().expect("a missing program does not fail the frame");

    let inner = &h
        .system
        .device()
        .as_any()
        .downcast_ref::<MissingProgramDevice>()
        .expect("wrapper device")
        .inner;
    let labels = inner.pass_labels();
    assert!(!labels.contains(&"Point Light"), "pass without a program is skipped");
    assert!(labels.contains(&"Directional Light"), "other light passes still run");
    assert_eq!(labels.last(), Some(&"Display"));
    assert_eq!(inner.frames_presented(), 1);
}

// ============================================================================
// Wireframe & Forward
// ============================================================================

#[test]
fn failed_materialization_does_not_fail_the_frame() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.draw().expect("first frame");

    // Created between frames: one program that cannot link, one good image.
    let broken = h.store.create_shader(ShaderSource::from_module(
        "broken",
        "@vertex fn vs_main() {}",
        ProgramLayout::fullscreen(&[]),
    ));
    let image = h.store.create_image(Image::solid("white", [255; 4]));

    let before = h.pass_count();
    h.draw().expect("a failed resource is reported, not returned");
    assert!(h.pass_count() > before, "the frame still renders");

    let cache = h.system.cache().expect("initialized");
    assert_eq!(cache.program(broken), None);
    assert!(cache.texture(image).is_some(), "the rest of the batch still materializes");
    assert_eq!(h.system.frame_count(), 2);
}

#[test]
fn wireframe_uses_forward_line_pass() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    assert!(h.system.toggle_wireframe_mode());
    assert_eq!(h.system.active_renderer(), RendererKind::Forward);
    h.draw().expect("frame");

    let passes = h.passes_since(0);
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].label, "Forward");
    assert_eq!(passes[0].state.polygon, PolygonMode::Line);
    assert_eq!(passes[0].state.cull, CullMode::None);
    assert_eq!(passes[0].color[0].target, RenderTo::Surface);
    assert_eq!(passes[0].draws.len(), 1);

    assert!(!h.system.toggle_wireframe_mode());
    assert_eq!(h.system.active_renderer(), RendererKind::Deferred);
}

#[test]
fn wireframe_without_device_support_falls_back_to_fill() {
    let device = HeadlessDevice::new(SIZE.0, SIZE.1).without_wireframe();
    let mut h = Harness::new(Box::new(device), RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.system.toggle_wireframe_mode();

    h.draw().expect("frame");
    h.draw().expect("second frame");
    for pass in h.passes_since(0) {
        assert_eq!(pass.label, "Forward");
        assert_eq!(pass.state.polygon, PolygonMode::Fill);
        assert_eq!(pass.state.cull, CullMode::Back);
    }
}

#[test]
fn forward_renderer_selected_by_name() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.system.set_active_renderer("forward").expect("known renderer");
    h.draw().expect("frame");
    assert_eq!(h.labels_since(0), vec!["Forward"]);
    assert_eq!(h.passes_since(0)[0].state.polygon, PolygonMode::Fill);
}

#[test]
fn unknown_renderer_is_rejected() {
    let mut h = Harness::headless(RendererSettings::default());
    let err = h.system.set_active_renderer("raytraced").unwrap_err();
    assert!(matches!(err, RenderError::UnknownRenderer(ref name) if name == "raytraced"));
    assert_eq!(h.system.active_renderer(), RendererKind::Deferred, "selection unchanged");
}

// ============================================================================
// Culling & Debug Views
// ============================================================================

#[test]
fn culling_toggle_changes_visible_count() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.add_cube(Vec3::new(1.0, 0.0, 0.0));
    h.add_cube(Vec3::new(0.0, 0.0, 50.0));

    h.draw().expect("frame");
    assert_eq!(h.system.query().object_count(), 2);

    assert!(!h.system.toggle_view_frustum_culling());
    h.draw().expect("frame");
    assert_eq!(h.system.query().object_count(), 3, "culling off draws everything");
}

#[test]
fn debug_overlay_adds_four_thumbnails() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    assert!(h.system.toggle_debug_overlay());
    h.draw().expect("frame");

    let passes = h.passes_since(0);
    let displays: Vec<&PassDesc> = passes.iter().filter(|p| p.label == "Display").collect();
    assert_eq!(displays.len(), 5, "full-screen display plus four thumbnails");
    assert!(displays[0].viewport.is_none());
    for (i, pass) in displays[1..].iter().enumerate() {
        let viewport = pass.viewport.expect("thumbnail viewport");
        assert!((viewport.width - SIZE.0 as f32 / 4.0).abs() < 1e-4);
        assert!((viewport.x - i as f32 * SIZE.0 as f32 / 4.0).abs() < 1e-4);
    }
}

#[test]
fn albedo_debug_view_displays_gbuffer() {
    let settings = RendererSettings {
        debug_view: DebugView::Albedo,
        ..RendererSettings::default()
    };
    let mut h = Harness::headless(settings);
    h.add_cube(Vec3::ZERO);
    h.draw().expect("frame");

    let display = h.passes_since(0).last().expect("display pass");
    assert_eq!(display.label, "Display");
    assert_eq!(display.textures.first().copied(), h.system.get_texture(TextureSemantic::Diffuse));
}

#[test]
fn god_ray_debug_view_stops_post_chain() {
    let settings = RendererSettings {
        debug_view: DebugView::GodRays,
        ..RendererSettings::default()
    };
    let mut h = Harness::headless(settings);
    h.add_cube(Vec3::ZERO);
    h.draw().expect("frame");

    let labels = h.labels_since(0);
    assert!(labels.contains(&"Post: God Rays"));
    assert!(!labels.contains(&"Post: Tone Map"));
    let plan = h.system.deferred().and_then(|d| d.last_plan()).expect("plan");
    assert!(plan.early_exit);
}

#[test]
fn all_post_effects_run_cleanly() {
    let mut settings = RendererSettings::default();
    settings.post.set_effects(PostEffects::all());
    let mut h = Harness::headless(settings);
    h.add_cube(Vec3::ZERO);
    h.scene_mut().create_directional_light(DirectionalLight::default());
    h.draw().expect("every stage validates against its program layout");

    let labels = h.labels_since(0);
    assert!(labels.contains(&"Post: DoF Combine"));
    assert!(labels.contains(&"Post: Flare Combine"));
    assert!(labels.contains(&"Post: Cel Shade"));
}

// ============================================================================
// Textures
// ============================================================================

#[test]
fn get_texture_follows_active_renderer() {
    let mut h = Harness::headless(RendererSettings::default());
    let diffuse = h.system.get_texture(TextureSemantic::Diffuse);
    assert!(diffuse.is_some());
    assert_eq!(
        diffuse,
        h.system.deferred().and_then(|d| d.gbuffer().semantic(TextureSemantic::Diffuse))
    );
    assert!(h.system.get_texture(TextureSemantic::LitHdr).is_some());

    h.system.toggle_wireframe_mode();
    assert_eq!(h.system.get_texture(TextureSemantic::Diffuse), None, "forward has no G-buffer");
    assert!(h.system.get_texture(TextureSemantic::Depth).is_some());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn draw_before_init_fails() {
    let mut system = RenderSystem::new(
        Box::new(HeadlessDevice::new(SIZE.0, SIZE.1)),
        RendererSettings::default(),
    );
    let store = ResourceStore::new();
    assert!(!system.is_initialized());
    assert!(matches!(system.draw(&store, &SIZE), Err(RenderError::NotInitialized)));
    assert_eq!(system.get_texture(TextureSemantic::Diffuse), None);
}

#[test]
fn invalid_active_handles_are_rejected() {
    let mut h = Harness::headless(RendererSettings::default());
    assert!(matches!(
        h.system.set_active_scene(Handle::from_raw(7)),
        Err(RenderError::InvalidHandle { .. })
    ));
    assert!(h.system.set_active_camera(Handle::INVALID).is_err());
    h.draw().expect("previous selection still renders");
}

#[test]
fn surface_resize_reallocates_targets() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.system.draw(&h.store, &(640_u32, 480_u32)).expect("frame");

    assert_eq!(h.device().surface_size(), (640, 480));
    let gbuffer = h.system.deferred().expect("deferred").gbuffer();
    assert_eq!(gbuffer.size(), (640, 480));
    assert!(gbuffer.is_complete());

    let albedo = h.system.get_texture(TextureSemantic::Diffuse).expect("albedo");
    let desc = h.device().texture_desc(albedo).expect("texture");
    assert_eq!((desc.width, desc.height), (640, 480));
    assert_eq!(desc.format, TextureFormat::Rgba8Unorm);
}

#[test]
fn zero_sized_surface_skips_frame() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    let before = h.pass_count();
    h.system.draw(&h.store, &(0_u32, 0_u32)).expect("minimized window is not an error");
    assert_eq!(h.pass_count(), before);
    assert_eq!(h.system.frame_count(), 0);
}

#[test]
fn resources_added_between_frames_are_drawn() {
    let mut h = Harness::headless(RendererSettings::default());
    h.add_cube(Vec3::ZERO);
    h.draw().expect("frame");
    let before = h.pass_count();

    h.add_cube(Vec3::new(0.5, 0.0, 0.0));
    h.draw().expect("frame");
    let geometry = &h.passes_since(before)[0];
    assert_eq!(geometry.draws.len(), 2);
    assert_eq!(h.system.frame_count(), 2);
}
