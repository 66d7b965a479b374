//! Material payloads.
//!
//! A material is a bundle of optional image channels plus scalar factors.
//! Channels left as `None` (or pointing at an image that never materialized)
//! are filled with shared default textures on the GPU side:
//!
//! | Channel  | Default                        |
//! |----------|--------------------------------|
//! | diffuse  | "missing" magenta              |
//! | normal   | flat tangent-space normal      |
//! | specular | white (scaled by intensity)    |
//! | glow     | black (no emission)            |
//! | alpha    | white (opaque)                 |

use glam::Vec3;

use crate::ImageHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub label: String,
    pub diffuse: Option<ImageHandle>,
    pub normal: Option<ImageHandle>,
    pub specular: Option<ImageHandle>,
    pub glow: Option<ImageHandle>,
    pub alpha: Option<ImageHandle>,
    /// Multiplied into the diffuse sample.
    pub color: Vec3,
    pub specular_intensity: f32,
    pub glow_intensity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            label: String::new(),
            diffuse: None,
            normal: None,
            specular: None,
            glow: None,
            alpha: None,
            color: Vec3::ONE,
            specular_intensity: 0.5,
            glow_intensity: 0.0,
        }
    }
}

impl Material {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_diffuse(mut self, image: ImageHandle) -> Self {
        self.diffuse = Some(image);
        self
    }

    #[must_use]
    pub fn with_normal(mut self, image: ImageHandle) -> Self {
        self.normal = Some(image);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }
}
