//! Render Targets
//!
//! A [`RenderTarget`] is a named set of attachment-point → texture bindings
//! that passes render into together:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ RenderTarget "G-Buffer"  (1280 × 720)        │
//! │                                              │
//! │  Color(0) → albedo+glow    [Diffuse]         │
//! │  Color(1) → normal+spec    [Normal]          │
//! │  Depth    → depth          [Depth]           │
//! │                                              │
//! │  draw_buffers: [Color(0), Color(1)]          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Attachment formats are fixed when textures are attached; [`RenderTarget::resize`]
//! only changes dimensions. Completeness is checked once by
//! [`RenderTarget::validate`] and reported through [`RenderTarget::state`]
//! rather than as an error on every frame.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use penumbra_core::{RenderError, Result};

use crate::device::{
    ColorAttachment, DepthAttachment, GpuDevice, LoadOp, RenderTo, TextureDesc, TextureFormat, TextureId,
};

/// Where a texture is bound on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentPoint {
    Color(u8),
    Depth,
}

/// Role of an attached texture, for lookups by debug tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSemantic {
    /// G-buffer albedo + glow.
    Diffuse,
    /// G-buffer normal + specular.
    Normal,
    /// Light accumulation.
    Light,
    /// Lit scene before post-processing.
    LitHdr,
    /// Tone-mapped scene color.
    LitLdr,
    Depth,
}

const STATE_UNCHECKED: &str = "unchecked";
const STATE_COMPLETE: &str = "complete";

#[derive(Debug)]
pub struct RenderTarget {
    label: String,
    width: u32,
    height: u32,
    attachments: Vec<(AttachmentPoint, TextureId)>,
    draw_buffers: Vec<AttachmentPoint>,
    semantics: FxHashMap<TextureSemantic, TextureId>,
    state: String,
}

impl RenderTarget {
    #[must_use]
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width: width.max(1),
            height: height.max(1),
            attachments: Vec::new(),
            draw_buffers: Vec::new(),
            semantics: FxHashMap::default(),
            state: STATE_UNCHECKED.to_owned(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Binds `texture` at `point`, replacing whatever was there. Color points
    /// join the draw-buffer list; the depth point never does.
    pub fn attach(&mut self, texture: TextureId, point: AttachmentPoint, semantic: Option<TextureSemantic>) {
        if let Some(slot) = self.attachments.iter_mut().find(|(p, _)| *p == point) {
            let previous = slot.1;
            slot.1 = texture;
            self.semantics.retain(|_, id| *id != previous);
        } else {
            self.attachments.push((point, texture));
            self.attachments.sort_by_key(|(p, _)| *p);
        }

        if matches!(point, AttachmentPoint::Color(_)) && !self.draw_buffers.contains(&point) {
            self.draw_buffers.push(point);
            self.draw_buffers.sort();
        }
        if let Some(semantic) = semantic {
            self.semantics.insert(semantic, texture);
        }
        self.state = STATE_UNCHECKED.to_owned();
    }

    /// Allocates a texture at the target's size and attaches it.
    pub fn create_attachment(
        &mut self,
        device: &mut dyn GpuDevice,
        point: AttachmentPoint,
        format: TextureFormat,
        semantic: Option<TextureSemantic>,
    ) -> TextureId {
        let name = match point {
            AttachmentPoint::Color(i) => format!("{} Color{i}", self.label),
            AttachmentPoint::Depth => format!("{} Depth", self.label),
        };
        let id = device.create_texture(&TextureDesc::new_2d(name, self.width, self.height, format));
        self.attach(id, point, semantic);
        id
    }

    /// Re-provisions every attachment at the new size, keeping formats.
    pub fn resize(&mut self, device: &mut dyn GpuDevice, width: u32, height: u32) -> Result<()> {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        for &(_, id) in &self.attachments {
            device.resize_texture(id, width, height)?;
        }
        self.width = width;
        self.height = height;
        log::debug!("Resized render target '{}' to {width}x{height}", self.label);
        Ok(())
    }

    /// Checks the attachments against the device and stores the diagnostic
    /// returned by [`RenderTarget::state`].
    pub fn validate(&mut self, device: &dyn GpuDevice) -> bool {
        self.state = match self.find_problem(device) {
            None => STATE_COMPLETE.to_owned(),
            Some(problem) => {
                log::warn!("Render target '{}' incomplete: {problem}", self.label);
                problem
            }
        };
        self.is_complete()
    }

    fn find_problem(&self, device: &dyn GpuDevice) -> Option<String> {
        if self.attachments.is_empty() {
            return Some("no attachments".to_owned());
        }
        for &(point, id) in &self.attachments {
            let Some(desc) = device.texture_desc(id) else {
                return Some(format!("{point:?} references a missing texture"));
            };
            if (desc.width, desc.height) != (self.width, self.height) {
                return Some(format!(
                    "{point:?} is {}x{}, target is {}x{}",
                    desc.width, desc.height, self.width, self.height
                ));
            }
            match point {
                AttachmentPoint::Depth if !desc.format.is_depth() => {
                    return Some(format!("depth attachment has color format {:?}", desc.format));
                }
                AttachmentPoint::Color(_) if desc.format.is_depth() => {
                    return Some(format!("{point:?} has depth format {:?}", desc.format));
                }
                _ => {}
            }
        }
        None
    }

    /// The diagnostic computed by the last [`RenderTarget::validate`].
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == STATE_COMPLETE
    }

    /// Returns an error carrying the diagnostic when incomplete.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(RenderError::RenderTargetIncomplete(format!("{}: {}", self.label, self.state)))
        }
    }

    #[must_use]
    pub fn draw_buffers(&self) -> &[AttachmentPoint] {
        &self.draw_buffers
    }

    #[must_use]
    pub fn texture(&self, point: AttachmentPoint) -> Option<TextureId> {
        self.attachments.iter().find(|(p, _)| *p == point).map(|(_, id)| *id)
    }

    #[must_use]
    pub fn semantic(&self, semantic: TextureSemantic) -> Option<TextureId> {
        self.semantics.get(&semantic).copied()
    }

    /// Color attachments in draw-buffer order, all with the same load op.
    #[must_use]
    pub fn color_attachments(&self, load: LoadOp<[f32; 4]>) -> SmallVec<[ColorAttachment; 4]> {
        self.draw_buffers
            .iter()
            .filter_map(|&point| self.texture(point))
            .map(|id| ColorAttachment {
                target: RenderTo::Texture { id, layer: 0 },
                load,
            })
            .collect()
    }

    #[must_use]
    pub fn depth_attachment(&self, load: LoadOp<f32>) -> Option<DepthAttachment> {
        self.texture(AttachmentPoint::Depth).map(|texture| DepthAttachment {
            texture,
            layer: 0,
            load,
        })
    }
}
