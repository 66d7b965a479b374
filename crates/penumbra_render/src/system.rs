//! Render System
//!
//! [`RenderSystem`] is the entry point collaborators talk to. It owns the
//! GPU device, the scenes and cameras it renders, both renderers and the GPU
//! resource cache, and exposes one [`draw`](RenderSystem::draw) per frame.
//!
//! # Lifecycle
//!
//! 1. Create with [`RenderSystem::new`] around any [`GpuDevice`]
//! 2. [`init`](RenderSystem::init) against the application's
//!    [`ResourceStore`]: registers built-in programs and meshes and
//!    materializes everything already in the store
//! 3. Create scenes and cameras, make one of each active
//! 4. Call [`draw`](RenderSystem::draw) every frame
//!
//! ```rust,ignore
//! let settings = RendererSettings::from_json_file("renderer.json")?;
//! let device = WgpuDevice::new_blocking(window.clone(), 1280, 720, &settings)?;
//! let mut system = RenderSystem::new(Box::new(device), settings);
//! system.init(&mut store)?;
//!
//! let scene = system.create_scene();
//! let camera = system.create_camera();
//! system.set_active_scene(scene)?;
//! system.set_active_camera(camera)?;
//!
//! loop {
//!     system.draw(&store, &window_size)?;
//! }
//! ```
//!
//! The renderer is chosen per frame from
//! [`RendererSettings::effective_renderer`]; wireframe mode always selects
//! the forward renderer.
//!
//! Scenes, cameras and GPU resources live as long as the system; there is no
//! removal.

use penumbra_core::{Handle, RenderError, Result};
use penumbra_resources::ResourceStore;
use penumbra_resources::primitives::{CUBE_KEY, SPHERE_KEY, create_cube, create_light_volume};
use penumbra_scene::{Camera, Scene, SceneQuery};

use crate::cache::GpuResourceCache;
use crate::device::{GpuDevice, TextureId};
use crate::passes::{DeferredRenderer, ForwardRenderer, FrameContext, Renderer};
use crate::settings::{RendererKind, RendererSettings};
use crate::shaders::BuiltinPrograms;
use crate::target::TextureSemantic;

pub type SceneHandle = Handle<Scene>;
pub type CameraHandle = Handle<Camera>;

/// Reports the size of the window or surface being drawn into.
pub trait SurfaceProvider {
    fn surface_size(&self) -> (u32, u32);
}

impl SurfaceProvider for (u32, u32) {
    fn surface_size(&self) -> (u32, u32) {
        *self
    }
}

struct Renderers {
    deferred: DeferredRenderer,
    forward: ForwardRenderer,
}

impl Renderers {
    fn get(&self, kind: RendererKind) -> &dyn Renderer {
        match kind {
            RendererKind::Deferred => &self.deferred,
            RendererKind::Forward => &self.forward,
        }
    }

    fn get_mut(&mut self, kind: RendererKind) -> &mut dyn Renderer {
        match kind {
            RendererKind::Deferred => &mut self.deferred,
            RendererKind::Forward => &mut self.forward,
        }
    }
}

/// State that exists only after [`RenderSystem::init`].
struct Ready {
    cache: GpuResourceCache,
    programs: BuiltinPrograms,
    renderers: Renderers,
}

pub struct RenderSystem {
    device: Box<dyn GpuDevice>,
    settings: RendererSettings,
    scenes: Vec<Scene>,
    cameras: Vec<Camera>,
    active_scene: SceneHandle,
    active_camera: CameraHandle,
    query: SceneQuery,
    ready: Option<Ready>,
    frame_count: u64,
}

impl RenderSystem {
    /// Wraps `device`. No GPU work happens until [`init`](Self::init).
    #[must_use]
    pub fn new(device: Box<dyn GpuDevice>, settings: RendererSettings) -> Self {
        Self {
            device,
            settings,
            scenes: Vec::new(),
            cameras: Vec::new(),
            active_scene: SceneHandle::INVALID,
            active_camera: CameraHandle::INVALID,
            query: SceneQuery::new(),
            ready: None,
            frame_count: 0,
        }
    }

    /// Registers built-in programs and meshes in `store`, materializes the
    /// whole store and allocates both renderers.
    ///
    /// # Errors
    ///
    /// The first materialization failure (a program that does not compile,
    /// an image that does not upload) or an incomplete render target.
    pub fn init(&mut self, store: &mut ResourceStore) -> Result<()> {
        let programs = BuiltinPrograms::register(store)?;
        store.insert_mesh_keyed(SPHERE_KEY, create_light_volume());
        store.insert_mesh_keyed(CUBE_KEY, create_cube(1.0));

        let device = self.device.as_mut();
        let mut cache = GpuResourceCache::new(store, device)?;
        let materialized = cache.sync(store, device).into_result()?;

        let (width, height) = device.surface_size();
        let renderers = Renderers {
            deferred: DeferredRenderer::new(device, width, height, &self.settings)?,
            forward: ForwardRenderer::new(device, width, height)?,
        };

        self.ready = Some(Ready {
            cache,
            programs,
            renderers,
        });
        log::info!(
            "Render system initialized: {materialized} resources, {} renderer",
            self.settings.effective_renderer().name()
        );
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.ready.is_some()
    }

    // ========================================================================
    // Renderer selection & debug toggles
    // ========================================================================

    /// Selects `"deferred"` or `"forward"`.
    pub fn set_active_renderer(&mut self, name: &str) -> Result<()> {
        self.settings.renderer = name.parse()?;
        log::info!("Active renderer: {}", self.settings.renderer.name());
        Ok(())
    }

    /// The renderer the next frame will use.
    #[must_use]
    pub fn active_renderer(&self) -> RendererKind {
        self.settings.effective_renderer()
    }

    /// Returns the new state.
    pub fn toggle_debug_overlay(&mut self) -> bool {
        self.settings.debug_overlay = !self.settings.debug_overlay;
        self.settings.debug_overlay
    }

    /// Returns the new state. While on, frames use the forward renderer.
    pub fn toggle_wireframe_mode(&mut self) -> bool {
        self.settings.wireframe = !self.settings.wireframe;
        log::info!("Wireframe {}", if self.settings.wireframe { "on" } else { "off" });
        self.settings.wireframe
    }

    /// Returns the new state.
    pub fn toggle_view_frustum_culling(&mut self) -> bool {
        let culling = &mut self.settings.culling.view_frustum_culling;
        *culling = !*culling;
        *culling
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    // ========================================================================
    // Scenes & cameras
    // ========================================================================

    pub fn create_scene(&mut self) -> SceneHandle {
        let handle = index_handle(self.scenes.len());
        self.scenes.push(Scene::new());
        handle
    }

    /// A default camera with the aspect ratio of the current surface.
    pub fn create_camera(&mut self) -> CameraHandle {
        let (width, height) = self.device.surface_size();
        let mut camera = Camera::default();
        camera.set_aspect(width, height);
        let handle = index_handle(self.cameras.len());
        self.cameras.push(camera);
        handle
    }

    pub fn set_active_scene(&mut self, handle: SceneHandle) -> Result<()> {
        if handle.index() >= self.scenes.len() {
            return Err(RenderError::invalid_handle("scene", handle));
        }
        self.active_scene = handle;
        Ok(())
    }

    pub fn set_active_camera(&mut self, handle: CameraHandle) -> Result<()> {
        if handle.index() >= self.cameras.len() {
            return Err(RenderError::invalid_handle("camera", handle));
        }
        self.active_camera = handle;
        Ok(())
    }

    #[must_use]
    pub fn scene(&self, handle: SceneHandle) -> Option<&Scene> {
        self.scenes.get(handle.index())
    }

    pub fn scene_mut(&mut self, handle: SceneHandle) -> Option<&mut Scene> {
        self.scenes.get_mut(handle.index())
    }

    #[must_use]
    pub fn camera(&self, handle: CameraHandle) -> Option<&Camera> {
        self.cameras.get(handle.index())
    }

    pub fn camera_mut(&mut self, handle: CameraHandle) -> Option<&mut Camera> {
        self.cameras.get_mut(handle.index())
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Renders the active scene from the active camera and presents it.
    ///
    /// Resources created in `store` since the last frame are materialized
    /// first; failures are logged and the affected draws skipped. A zero
    /// sized surface (minimized window) renders nothing.
    pub fn draw(&mut self, store: &ResourceStore, surface: &dyn SurfaceProvider) -> Result<()> {
        let Self {
            device,
            settings,
            scenes,
            cameras,
            active_scene,
            active_camera,
            query,
            ready,
            frame_count,
        } = self;
        let ready = ready.as_mut().ok_or(RenderError::NotInitialized)?;

        let (width, height) = surface.surface_size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        if device.surface_size() != (width, height) {
            device.resize_surface(width, height);
        }

        // Draws that need a failed resource are skipped.
        let report = ready.cache.sync(store, device.as_mut());
        if !report.is_ok() {
            log::warn!(
                "{} of {} new resources failed to materialize this frame",
                report.failed.len(),
                report.failed.len() + report.materialized
            );
        }

        let scene = scenes
            .get(active_scene.index())
            .ok_or_else(|| RenderError::invalid_handle("scene", *active_scene))?;
        let camera = cameras
            .get_mut(active_camera.index())
            .ok_or_else(|| RenderError::invalid_handle("camera", *active_camera))?;
        camera.set_aspect(width, height);

        scene.visible_objects(camera, settings.culling, query);

        device.begin_frame()?;
        let renderer = ready.renderers.get_mut(settings.effective_renderer());
        let mut ctx = FrameContext {
            device: device.as_mut(),
            store,
            cache: &ready.cache,
            programs: &ready.programs,
            scene,
            camera,
            query,
            settings,
        };
        let rendered = renderer.render(&mut ctx);
        let presented = device.end_frame();
        rendered?;
        presented?;

        *frame_count += 1;
        Ok(())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// An intermediate texture of the active renderer, by role.
    #[must_use]
    pub fn get_texture(&self, semantic: TextureSemantic) -> Option<TextureId> {
        let ready = self.ready.as_ref()?;
        ready
            .renderers
            .get(self.settings.effective_renderer())
            .texture(semantic)
    }

    #[must_use]
    pub fn device(&self) -> &dyn GpuDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn GpuDevice {
        self.device.as_mut()
    }

    /// The visible set built by the most recent frame.
    #[must_use]
    pub fn query(&self) -> &SceneQuery {
        &self.query
    }

    #[must_use]
    pub fn cache(&self) -> Option<&GpuResourceCache> {
        self.ready.as_ref().map(|ready| &ready.cache)
    }

    #[must_use]
    pub fn deferred(&self) -> Option<&DeferredRenderer> {
        self.ready.as_ref().map(|ready| &ready.renderers.deferred)
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl std::fmt::Debug for RenderSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSystem")
            .field("settings", &self.settings)
            .field("scenes", &self.scenes.len())
            .field("cameras", &self.cameras.len())
            .field("active_scene", &self.active_scene)
            .field("active_camera", &self.active_camera)
            .field("initialized", &self.ready.is_some())
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

#[inline]
fn index_handle<T>(index: usize) -> Handle<T> {
    Handle::from_raw(u32::try_from(index).unwrap_or(u32::MAX))
}
