//! Headless Device
//!
//! A [`GpuDevice`] that keeps only descriptors and records every pass it is
//! given. It validates passes the way a real backend would (stale ids,
//! attachment formats and sizes, texture counts against the program layout)
//! and reports violations as errors, which makes it suitable for CI and for
//! asserting on pass order in tests.

use std::any::Any;

use slotmap::SlotMap;

use penumbra_core::{RenderError, Result};
use penumbra_resources::{Mesh, ProgramLayout, ShaderSource, ShaderStage, TextureSlot, VertexInput};

use super::{
    DrawGeometry, GpuDevice, MeshId, PassDesc, PolygonMode, ProgramId, RenderTo, TextureDesc,
    TextureDimension, TextureFormat, TextureId,
};

#[derive(Debug)]
struct HeadlessMesh {
    index_count: u32,
}

#[derive(Debug)]
struct HeadlessProgram {
    label: String,
    layout: ProgramLayout,
}

#[derive(Debug)]
pub struct HeadlessDevice {
    textures: SlotMap<TextureId, TextureDesc>,
    meshes: SlotMap<MeshId, HeadlessMesh>,
    programs: SlotMap<ProgramId, HeadlessProgram>,
    surface: (u32, u32),
    wireframe: bool,
    in_frame: bool,
    frames: u64,
    passes: Vec<PassDesc>,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            textures: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            surface: (width.max(1), height.max(1)),
            wireframe: true,
            in_frame: false,
            frames: 0,
            passes: Vec::new(),
        }
    }

    /// Simulates an adapter without line rasterization.
    #[must_use]
    pub fn without_wireframe(mut self) -> Self {
        self.wireframe = false;
        self
    }

    /// Every pass run since creation or the last [`clear_passes`](Self::clear_passes).
    #[must_use]
    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    #[must_use]
    pub fn pass_labels(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.label).collect()
    }

    pub fn clear_passes(&mut self) {
        self.passes.clear();
    }

    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn program_label(&self, id: ProgramId) -> Option<&str> {
        self.programs.get(id).map(|p| p.label.as_str())
    }

    #[must_use]
    pub fn mesh_index_count(&self, id: MeshId) -> Option<u32> {
        self.meshes.get(id).map(|m| m.index_count)
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn texture(&self, id: TextureId) -> Result<&TextureDesc> {
        self.textures
            .get(id)
            .ok_or_else(|| RenderError::invalid_handle("texture", id))
    }

    fn check_slot(&self, pass: &PassDesc, id: TextureId, slot: TextureSlot) -> Result<()> {
        let desc = self.texture(id)?;
        let ok = match slot {
            TextureSlot::Color => !desc.format.is_depth() && desc.dimension == TextureDimension::D2,
            TextureSlot::Depth => desc.format.is_depth() && desc.dimension == TextureDimension::D2,
            TextureSlot::DepthCube => desc.format.is_depth() && desc.dimension == TextureDimension::Cube,
        };
        if ok {
            Ok(())
        } else {
            Err(RenderError::RenderTargetIncomplete(format!(
                "pass '{}': texture '{}' ({:?} {:?}) bound to a {slot:?} slot",
                pass.label, desc.label, desc.format, desc.dimension
            )))
        }
    }

    fn check_textures(&self, pass: &PassDesc, ids: &[TextureId], slots: &[TextureSlot], group: &str) -> Result<()> {
        if ids.len() != slots.len() {
            return Err(RenderError::RenderTargetIncomplete(format!(
                "pass '{}': {group} binds {} textures, program expects {}",
                pass.label,
                ids.len(),
                slots.len()
            )));
        }
        for (&id, &slot) in ids.iter().zip(slots) {
            self.check_slot(pass, id, slot)?;
        }
        Ok(())
    }

    fn validate(&self, pass: &PassDesc) -> Result<()> {
        let mut size = None;
        let mut check_size = |w: u32, h: u32, what: &str| -> Result<()> {
            match size {
                None => {
                    size = Some((w, h));
                    Ok(())
                }
                Some(s) if s == (w, h) => Ok(()),
                Some((sw, sh)) => Err(RenderError::RenderTargetIncomplete(format!(
                    "pass '{}': {what} is {w}x{h}, other attachments are {sw}x{sh}",
                    pass.label
                ))),
            }
        };

        for attachment in &pass.color {
            match attachment.target {
                RenderTo::Surface => {
                    if !self.in_frame {
                        return Err(RenderError::SurfaceError(format!(
                            "pass '{}' targets the surface outside a frame",
                            pass.label
                        )));
                    }
                    check_size(self.surface.0, self.surface.1, "surface")?;
                }
                RenderTo::Texture { id, layer } => {
                    let desc = self.texture(id)?;
                    if desc.format.is_depth() || layer >= desc.dimension.layers() {
                        return Err(RenderError::RenderTargetIncomplete(format!(
                            "pass '{}': '{}' layer {layer} is not a color attachment",
                            pass.label, desc.label
                        )));
                    }
                    check_size(desc.width, desc.height, &desc.label)?;
                }
            }
        }

        if let Some(depth) = &pass.depth {
            let desc = self.texture(depth.texture)?;
            if !desc.format.is_depth() || depth.layer >= desc.dimension.layers() {
                return Err(RenderError::RenderTargetIncomplete(format!(
                    "pass '{}': '{}' layer {} is not a depth attachment",
                    pass.label, desc.label, depth.layer
                )));
            }
            check_size(desc.width, desc.height, &desc.label)?;
        }

        if pass.color.is_empty() && pass.depth.is_none() {
            return Err(RenderError::RenderTargetIncomplete(format!(
                "pass '{}' has no attachments",
                pass.label
            )));
        }

        let Some(program_id) = pass.program else {
            if pass.draws.is_empty() {
                return Ok(());
            }
            return Err(RenderError::invalid_handle("program", "none"));
        };
        let program = self
            .programs
            .get(program_id)
            .ok_or_else(|| RenderError::invalid_handle("program", program_id))?;

        if pass.state.polygon == PolygonMode::Line && !self.wireframe {
            return Err(RenderError::RenderTargetIncomplete(format!(
                "pass '{}' requests line rasterization on a device without it",
                pass.label
            )));
        }

        self.check_textures(pass, &pass.textures, &program.layout.pass_textures, "pass")?;
        for draw in &pass.draws {
            match (draw.geometry, program.layout.vertex_input) {
                (DrawGeometry::FullscreenTriangle, VertexInput::None) => {}
                (DrawGeometry::Mesh(mesh), VertexInput::Mesh) => {
                    if !self.meshes.contains_key(mesh) {
                        return Err(RenderError::invalid_handle("mesh", mesh));
                    }
                }
                (geometry, input) => {
                    return Err(RenderError::RenderTargetIncomplete(format!(
                        "pass '{}': {geometry:?} drawn with a {input:?} program",
                        pass.label
                    )));
                }
            }
            self.check_textures(pass, &draw.textures, &program.layout.draw_textures, "draw")?;
        }
        Ok(())
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId {
        self.textures.insert(desc.clone())
    }

    fn write_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<()> {
        let desc = self.texture(id)?;
        let expected = (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize;
        if pixels.len() != expected {
            return Err(RenderError::load_failure(
                desc.label.clone(),
                format!("upload is {} bytes, texture needs {expected}", pixels.len()),
            ));
        }
        Ok(())
    }

    fn resize_texture(&mut self, id: TextureId, width: u32, height: u32) -> Result<()> {
        let desc = self
            .textures
            .get_mut(id)
            .ok_or_else(|| RenderError::invalid_handle("texture", id))?;
        desc.width = width.max(1);
        desc.height = height.max(1);
        Ok(())
    }

    fn texture_desc(&self, id: TextureId) -> Option<&TextureDesc> {
        self.textures.get(id)
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> MeshId {
        self.meshes.insert(HeadlessMesh {
            index_count: mesh.index_count(),
        })
    }

    fn has_mesh(&self, id: MeshId) -> bool {
        self.meshes.contains_key(id)
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId> {
        let fail = |log: String| RenderError::ShaderCompileFailure {
            label: source.label.clone(),
            log,
        };

        for stage in &source.stages {
            match stage.stage {
                ShaderStage::TessControl | ShaderStage::TessEvaluation | ShaderStage::Geometry => {
                    return Err(fail(format!("{:?} stage is not supported", stage.stage)));
                }
                ShaderStage::Vertex | ShaderStage::Fragment => {
                    let entry = format!("fn {}", stage.stage.entry_point());
                    if !stage.source.contains(&entry) {
                        return Err(fail(format!(
                            "{:?} stage has no entry point `{}`",
                            stage.stage,
                            stage.stage.entry_point()
                        )));
                    }
                }
            }
        }
        for required in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if source.stage(required).is_none() {
                return Err(fail(format!("link error: no {required:?} stage")));
            }
        }

        Ok(self.programs.insert(HeadlessProgram {
            label: source.label.clone(),
            layout: source.layout.clone(),
        }))
    }

    fn has_program(&self, id: ProgramId) -> bool {
        self.programs.contains_key(id)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn surface_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface = (width, height);
        }
    }

    fn supports_wireframe(&self) -> bool {
        self.wireframe
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.in_frame = true;
        Ok(())
    }

    fn run_pass(&mut self, pass: &PassDesc) -> Result<()> {
        self.validate(pass)?;
        self.passes.push(pass.clone());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if !self.in_frame {
            return Err(RenderError::SurfaceError("end_frame without begin_frame".into()));
        }
        self.in_frame = false;
        self.frames += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
