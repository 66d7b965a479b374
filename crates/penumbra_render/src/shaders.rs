//! Built-in Programs
//!
//! Every WGSL program the renderers need ships inside the binary through
//! `rust-embed` and is registered in the [`ResourceStore`] under
//! `builtin/<name>`. From there it follows the normal resource path: the
//! store announces it, the GPU cache compiles it, and passes look it up by
//! [`ShaderHandle`].
//!
//! Post-processing programs share `common.wgsl` (samplers, the
//! [`PostUniforms`](crate::uniforms::PostUniforms) block and a full-screen
//! vertex stage), which is prepended at registration time.

use rust_embed::RustEmbed;

use penumbra_core::{RenderError, Result};
use penumbra_resources::{ProgramLayout, ResourceStore, ShaderHandle, ShaderSource, TextureSlot};

#[derive(RustEmbed)]
#[folder = "shaders/"]
struct ShaderAssets;

const COMMON: &str = "common.wgsl";

/// Built-in programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    Geometry,
    ShadowDirectional,
    ShadowPoint,
    LightPoint,
    LightDirectional,
    Illumination,
    Passthrough,
    Fxaa,
    Fog,
    DofBlur,
    DofCombine,
    GodRays,
    GodRaysCombine,
    Vignette,
    BloomExtract,
    BloomCombine,
    FlareThreshold,
    FlareGhosts,
    FlareCombine,
    ToneMap,
    CelShade,
    Display,
    Forward,
}

impl Program {
    pub const ALL: [Self; 23] = [
        Self::Geometry,
        Self::ShadowDirectional,
        Self::ShadowPoint,
        Self::LightPoint,
        Self::LightDirectional,
        Self::Illumination,
        Self::Passthrough,
        Self::Fxaa,
        Self::Fog,
        Self::DofBlur,
        Self::DofCombine,
        Self::GodRays,
        Self::GodRaysCombine,
        Self::Vignette,
        Self::BloomExtract,
        Self::BloomCombine,
        Self::FlareThreshold,
        Self::FlareGhosts,
        Self::FlareCombine,
        Self::ToneMap,
        Self::CelShade,
        Self::Display,
        Self::Forward,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::ShadowDirectional => "shadow_directional",
            Self::ShadowPoint => "shadow_point",
            Self::LightPoint => "light_point",
            Self::LightDirectional => "light_directional",
            Self::Illumination => "illumination",
            Self::Passthrough => "passthrough",
            Self::Fxaa => "fxaa",
            Self::Fog => "fog",
            Self::DofBlur => "dof_blur",
            Self::DofCombine => "dof_combine",
            Self::GodRays => "god_rays",
            Self::GodRaysCombine => "god_rays_combine",
            Self::Vignette => "vignette",
            Self::BloomExtract => "bloom_extract",
            Self::BloomCombine => "bloom_combine",
            Self::FlareThreshold => "flare_threshold",
            Self::FlareGhosts => "flare_ghosts",
            Self::FlareCombine => "flare_combine",
            Self::ToneMap => "tone_map",
            Self::CelShade => "cel_shade",
            Self::Display => "display",
            Self::Forward => "forward",
        }
    }

    /// Store key the program is registered under.
    #[must_use]
    pub fn key(self) -> String {
        format!("builtin/{}", self.name())
    }

    #[must_use]
    pub fn layout(self) -> ProgramLayout {
        use TextureSlot::{Color, Depth, DepthCube};

        match self {
            Self::Geometry | Self::Forward => ProgramLayout::material_mesh(),
            Self::ShadowDirectional | Self::ShadowPoint => ProgramLayout::mesh(&[], &[]),
            Self::LightPoint => ProgramLayout::mesh(&[Color, Depth, DepthCube], &[]),
            Self::LightDirectional => ProgramLayout::fullscreen(&[Color, Depth, Depth]),
            Self::Illumination | Self::GodRaysCombine | Self::BloomCombine | Self::FlareCombine => {
                ProgramLayout::fullscreen(&[Color, Color])
            }
            Self::DofCombine | Self::CelShade => ProgramLayout::fullscreen(&[Color, Color, Depth]),
            Self::Fog | Self::GodRays => ProgramLayout::fullscreen(&[Color, Depth]),
            Self::Passthrough
            | Self::Fxaa
            | Self::DofBlur
            | Self::Vignette
            | Self::BloomExtract
            | Self::FlareThreshold
            | Self::FlareGhosts
            | Self::ToneMap
            | Self::Display => ProgramLayout::fullscreen(&[Color]),
        }
    }

    /// Programs bound to [`PostUniforms`](crate::uniforms::PostUniforms)
    /// get `common.wgsl` prepended.
    #[must_use]
    pub const fn uses_common(self) -> bool {
        !matches!(
            self,
            Self::Geometry
                | Self::ShadowDirectional
                | Self::ShadowPoint
                | Self::LightPoint
                | Self::LightDirectional
                | Self::Forward
        )
    }

    /// Assembles the embedded WGSL for this program.
    pub fn source(self) -> Result<ShaderSource> {
        let body = embedded(&format!("{}.wgsl", self.name()))?;
        let wgsl = if self.uses_common() {
            let mut text = embedded(COMMON)?;
            text.push('\n');
            text.push_str(&body);
            text
        } else {
            body
        };
        Ok(ShaderSource::from_module(self.key(), wgsl, self.layout()))
    }
}

fn embedded(file: &str) -> Result<String> {
    let asset = ShaderAssets::get(file).ok_or_else(|| RenderError::load_failure(file, "not embedded"))?;
    String::from_utf8(asset.data.into_owned()).map_err(|e| RenderError::load_failure(file, e))
}

/// Store handles of every built-in program.
#[derive(Debug, Clone)]
pub struct BuiltinPrograms {
    handles: [ShaderHandle; Program::ALL.len()],
}

impl BuiltinPrograms {
    /// Registers every built-in program in `store`. Programs already present
    /// under their key are reused.
    pub fn register(store: &mut ResourceStore) -> Result<Self> {
        let mut handles = [ShaderHandle::INVALID; Program::ALL.len()];
        for (slot, program) in handles.iter_mut().zip(Program::ALL) {
            *slot = match store.find_shader(&program.key()) {
                Some(handle) => handle,
                None => store.insert_shader_keyed(&program.key(), program.source()?),
            };
        }
        log::info!("Registered {} built-in programs", handles.len());
        Ok(Self { handles })
    }

    #[must_use]
    pub fn get(&self, program: Program) -> ShaderHandle {
        self.handles[program as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_is_embedded_with_entry_points() {
        for program in Program::ALL {
            let source = program.source().unwrap();
            let wgsl = &source.stages[0].source;
            assert!(wgsl.contains("fn vs_main"), "{} lacks vs_main", program.name());
            assert!(wgsl.contains("fn fs_main"), "{} lacks fs_main", program.name());
        }
    }

    #[test]
    fn all_is_in_discriminant_order() {
        for (i, program) in Program::ALL.iter().enumerate() {
            assert_eq!(*program as usize, i);
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let mut store = ResourceStore::new();
        let first = BuiltinPrograms::register(&mut store).unwrap();
        let second = BuiltinPrograms::register(&mut store).unwrap();
        assert_eq!(first.get(Program::Display), second.get(Program::Display));
        assert_eq!(store.shader_count(), Program::ALL.len());
    }
}
