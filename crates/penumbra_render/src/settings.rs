//! Renderer Settings
//!
//! [`RendererSettings`] gathers every knob the render system reads each
//! frame: which renderer is active, frustum culling, shadow resolution and
//! bias, the optional post-processing stages and the debug views.
//!
//! Settings are plain serde data and can be loaded from JSON:
//!
//! ```rust,ignore
//! let settings = RendererSettings::from_json_str(r#"{ "renderer": "forward" }"#)?;
//! ```

use std::path::Path;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use penumbra_core::{RenderError, Result};
use penumbra_scene::CullingConfig;

// ---------------------------------------------------------------------------
// RendererKind
// ---------------------------------------------------------------------------

/// Which renderer executes the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// G-buffer, shadows, light accumulation and the post chain.
    #[default]
    Deferred,
    /// One lit pass straight to the surface. Used for wireframe.
    Forward,
}

impl RendererKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Forward => "forward",
        }
    }
}

impl FromStr for RendererKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deferred" => Ok(Self::Deferred),
            "forward" => Ok(Self::Forward),
            _ => Err(RenderError::UnknownRenderer(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Shadows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Edge length of each directional shadow map.
    pub directional_map_size: u32,
    /// Edge length of each point-light cube face.
    pub point_map_size: u32,
    /// Rasterizer constant depth bias for directional casters.
    pub depth_bias_constant: i32,
    /// Rasterizer slope-scaled depth bias for directional casters.
    pub depth_bias_slope: f32,
    /// Bias subtracted from the receiver depth when comparing.
    pub sample_bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            directional_map_size: 2048,
            point_map_size: 512,
            depth_bias_constant: 2,
            depth_bias_slope: 2.0,
            sample_bias: 0.005,
        }
    }
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

bitflags! {
    /// Compact view of which optional post stages are enabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PostEffects: u32 {
        const ANTI_ALIASING  = 1 << 0;
        const FOG            = 1 << 1;
        const DEPTH_OF_FIELD = 1 << 2;
        const GOD_RAYS       = 1 << 3;
        const BLOOM          = 1 << 4;
        const LENS_FLARE     = 1 << 5;
        const CEL_SHADING    = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogSettings {
    pub enabled: bool,
    pub color: [f32; 3],
    /// Exponential density per world unit.
    pub density: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            color: [0.5, 0.6, 0.7],
            density: 0.015,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthOfFieldSettings {
    pub enabled: bool,
    /// View distance that stays sharp.
    pub focus_distance: f32,
    /// Distance over which the blur fades in.
    pub focus_range: f32,
}

impl Default for DepthOfFieldSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            focus_distance: 10.0,
            focus_range: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GodRaySettings {
    pub enabled: bool,
    pub density: f32,
    pub decay: f32,
    pub exposure: f32,
}

impl Default for GodRaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            density: 0.9,
            decay: 0.96,
            exposure: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Luminance above which pixels bloom.
    pub threshold: f32,
    pub intensity: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1.0,
            intensity: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensFlareSettings {
    pub enabled: bool,
    pub threshold: f32,
    pub ghosts: u32,
    pub ghost_spacing: f32,
    pub intensity: f32,
}

impl Default for LensFlareSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 1.5,
            ghosts: 4,
            ghost_spacing: 0.3,
            intensity: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    pub anti_aliasing: bool,
    pub fog: FogSettings,
    pub depth_of_field: DepthOfFieldSettings,
    pub god_rays: GodRaySettings,
    /// Strength of the vignette darkening, 0 disables the effect but the
    /// stage still runs.
    pub vignette: f32,
    pub bloom: BloomSettings,
    pub lens_flare: LensFlareSettings,
    /// Exposure applied before tone mapping.
    pub exposure: f32,
    pub cel_shading: bool,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            anti_aliasing: true,
            fog: FogSettings::default(),
            depth_of_field: DepthOfFieldSettings::default(),
            god_rays: GodRaySettings::default(),
            vignette: 0.35,
            bloom: BloomSettings::default(),
            lens_flare: LensFlareSettings::default(),
            exposure: 1.0,
            cel_shading: false,
        }
    }
}

impl PostProcessSettings {
    /// Returns the enabled optional stages as flags.
    #[must_use]
    pub fn effects(&self) -> PostEffects {
        let mut effects = PostEffects::empty();
        effects.set(PostEffects::ANTI_ALIASING, self.anti_aliasing);
        effects.set(PostEffects::FOG, self.fog.enabled);
        effects.set(PostEffects::DEPTH_OF_FIELD, self.depth_of_field.enabled);
        effects.set(PostEffects::GOD_RAYS, self.god_rays.enabled);
        effects.set(PostEffects::BLOOM, self.bloom.enabled);
        effects.set(PostEffects::LENS_FLARE, self.lens_flare.enabled);
        effects.set(PostEffects::CEL_SHADING, self.cel_shading);
        effects
    }

    /// Enables exactly the stages in `effects`.
    pub fn set_effects(&mut self, effects: PostEffects) {
        self.anti_aliasing = effects.contains(PostEffects::ANTI_ALIASING);
        self.fog.enabled = effects.contains(PostEffects::FOG);
        self.depth_of_field.enabled = effects.contains(PostEffects::DEPTH_OF_FIELD);
        self.god_rays.enabled = effects.contains(PostEffects::GOD_RAYS);
        self.bloom.enabled = effects.contains(PostEffects::BLOOM);
        self.lens_flare.enabled = effects.contains(PostEffects::LENS_FLARE);
        self.cel_shading = effects.contains(PostEffects::CEL_SHADING);
    }
}

// ---------------------------------------------------------------------------
// Debug views
// ---------------------------------------------------------------------------

/// What the display pass shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugView {
    /// The full post-processed frame.
    #[default]
    Final,
    /// Raw G-buffer albedo.
    Albedo,
    /// G-buffer normals remapped to color.
    Normals,
    /// Light accumulation buffer.
    Light,
    /// The first god-ray pass, skipping the rest of the post chain.
    GodRays,
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub renderer: RendererKind,
    pub culling: CullingConfig,
    pub shadows: ShadowSettings,
    pub post: PostProcessSettings,
    pub debug_view: DebugView,
    /// Draws G-buffer thumbnails over the final frame.
    pub debug_overlay: bool,
    /// Forces the forward renderer with line rasterization.
    pub wireframe: bool,
    /// Present mode of the window surface, read when the device is created.
    pub vsync: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            renderer: RendererKind::default(),
            culling: CullingConfig::default(),
            shadows: ShadowSettings::default(),
            post: PostProcessSettings::default(),
            debug_view: DebugView::default(),
            debug_overlay: false,
            wireframe: false,
            vsync: true,
        }
    }
}

impl RendererSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RenderError::ConfigError(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The renderer that actually runs this frame.
    #[must_use]
    pub fn effective_renderer(&self) -> RendererKind {
        if self.wireframe {
            RendererKind::Forward
        } else {
            self.renderer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_kind_parses_case_insensitively() {
        assert_eq!("Deferred".parse::<RendererKind>().ok(), Some(RendererKind::Deferred));
        assert_eq!(" forward ".parse::<RendererKind>().ok(), Some(RendererKind::Forward));
        assert!(matches!(
            "raytraced".parse::<RendererKind>(),
            Err(RenderError::UnknownRenderer(name)) if name == "raytraced"
        ));
    }

    #[test]
    fn effects_view_round_trips_through_sections() {
        let mut post = PostProcessSettings::default();
        let flags = PostEffects::BLOOM | PostEffects::GOD_RAYS | PostEffects::CEL_SHADING;
        post.set_effects(flags);
        assert_eq!(post.effects(), flags);
        assert!(!post.fog.enabled, "fog was not in the flag set");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = RendererSettings::from_json_str(
            r#"{ "renderer": "forward", "post": { "bloom": { "threshold": 2.0 } } }"#,
        )
        .unwrap();
        assert_eq!(settings.renderer, RendererKind::Forward);
        assert!(settings.post.bloom.enabled, "unspecified field keeps its default");
        assert!((settings.post.bloom.threshold - 2.0).abs() < 1e-6);
        assert_eq!(settings.shadows, ShadowSettings::default());
    }

    #[test]
    fn wireframe_forces_forward() {
        let settings = RendererSettings {
            wireframe: true,
            ..Default::default()
        };
        assert_eq!(settings.effective_renderer(), RendererKind::Forward);
    }
}
