//! Shader source payloads.
//!
//! A [`ShaderSource`] is the text of each pipeline stage plus a
//! [`ProgramLayout`] describing the resources the program binds. The layout
//! follows one fixed convention so programs can be linked without reflection:
//!
//! ```text
//! @group(0)  binding 0      pass uniforms
//!            binding 1      filtering sampler
//!            binding 2      comparison sampler (shadows)
//!            binding 3 + i  pass texture i
//! @group(1)  binding 0      per-draw uniforms (dynamic offset)
//!            binding 1 + i  per-draw texture i
//! ```
//!
//! Vertex stages enter at `vs_main`, fragment stages at `fs_main`.

use serde::{Deserialize, Serialize};

/// Pipeline stage of a shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
}

impl ShaderStage {
    #[must_use]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::TessControl => "tcs_main",
            Self::TessEvaluation => "tes_main",
            Self::Geometry => "gs_main",
            Self::Fragment => "fs_main",
        }
    }
}

/// Where a program pulls its vertices from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexInput {
    /// No vertex buffers; the vertex stage synthesizes a full-screen triangle.
    #[default]
    None,
    /// The interleaved [`Vertex`](crate::Vertex) layout.
    Mesh,
}

/// Kind of texture bound at a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    /// Filterable float texture (`texture_2d<f32>`).
    Color,
    /// Depth texture (`texture_depth_2d`).
    Depth,
    /// Depth cube map (`texture_depth_cube`).
    DepthCube,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramLayout {
    pub vertex_input: VertexInput,
    pub pass_textures: Vec<TextureSlot>,
    pub draw_textures: Vec<TextureSlot>,
}

impl ProgramLayout {
    /// Layout of a full-screen pass sampling `inputs`.
    #[must_use]
    pub fn fullscreen(inputs: &[TextureSlot]) -> Self {
        Self {
            vertex_input: VertexInput::None,
            pass_textures: inputs.to_vec(),
            draw_textures: Vec::new(),
        }
    }

    /// Layout of a mesh pass binding the five material channels per draw,
    /// in [`Material`](crate::Material) order.
    #[must_use]
    pub fn material_mesh() -> Self {
        Self::mesh(&[], &[TextureSlot::Color; 5])
    }

    /// Layout of a mesh pass with per-draw textures.
    #[must_use]
    pub fn mesh(pass_textures: &[TextureSlot], draw_textures: &[TextureSlot]) -> Self {
        Self {
            vertex_input: VertexInput::Mesh,
            pass_textures: pass_textures.to_vec(),
            draw_textures: draw_textures.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageSource {
    pub stage: ShaderStage,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: String,
    pub stages: Vec<ShaderStageSource>,
    pub layout: ProgramLayout,
}

impl ShaderSource {
    /// A program whose vertex and fragment stages live in one WGSL module.
    #[must_use]
    pub fn from_module(label: impl Into<String>, wgsl: impl Into<String>, layout: ProgramLayout) -> Self {
        let source = wgsl.into();
        Self {
            label: label.into(),
            stages: vec![
                ShaderStageSource {
                    stage: ShaderStage::Vertex,
                    source: source.clone(),
                },
                ShaderStageSource {
                    stage: ShaderStage::Fragment,
                    source,
                },
            ],
            layout,
        }
    }

    #[must_use]
    pub fn stage(&self, stage: ShaderStage) -> Option<&ShaderStageSource> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}
