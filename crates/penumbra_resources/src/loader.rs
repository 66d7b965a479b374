//! File-format loaders.
//!
//! The store never parses files itself. On a cache miss it hands the path to
//! an injected [`ResourceLoader`] and registers whatever payload comes back.
//! Materials and models reference other files, so their loaders return
//! descriptions with paths that the store resolves (and deduplicates) in turn.

use std::path::{Path, PathBuf};

use glam::Vec3;
use penumbra_core::{RenderError, Result};

use crate::{Image, Mesh, ProgramLayout, ShaderSource};

/// A material file: image channel paths plus factors.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialFile {
    pub diffuse: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub specular: Option<PathBuf>,
    pub glow: Option<PathBuf>,
    pub alpha: Option<PathBuf>,
    pub color: Vec3,
    pub specular_intensity: f32,
    pub glow_intensity: f32,
}

impl Default for MaterialFile {
    fn default() -> Self {
        Self {
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

/// A model file: `(mesh path, material path)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFile {
    pub parts: Vec<(PathBuf, PathBuf)>,
}

fn unsupported<T>(what: &str, path: &Path) -> Result<T> {
    Err(RenderError::load_failure(
        path.display().to_string(),
        format!("no {what} loader installed"),
    ))
}

/// Turns paths into payloads. Every method defaults to a load failure so a
/// loader only implements the formats it understands.
pub trait ResourceLoader {
    fn load_mesh(&self, path: &Path) -> Result<Mesh> {
        unsupported("mesh", path)
    }

    fn load_image(&self, path: &Path) -> Result<Image> {
        unsupported("image", path)
    }

    fn load_material(&self, path: &Path) -> Result<MaterialFile> {
        unsupported("material", path)
    }

    fn load_model(&self, path: &Path) -> Result<ModelFile> {
        unsupported("model", path)
    }

    fn load_shader(&self, path: &Path) -> Result<ShaderSource> {
        unsupported("shader", path)
    }

    fn load_text(&self, path: &Path) -> Result<String> {
        unsupported("text", path)
    }
}

/// Loader backed by the local filesystem.
///
/// Decodes images with the `image` crate and reads text files verbatim.
///
/// A shader file holds one WGSL module with both entry points. Its
/// [`ProgramLayout`] comes from a JSON sidecar next to it, `lit.wgsl` reading
/// `lit.layout.json`:
///
/// ```json
/// { "vertex_input": "mesh", "pass_textures": [], "draw_textures": ["color", "color"] }
/// ```
///
/// Without a sidecar the layout is [`ProgramLayout::material_mesh`].
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    /// Resolves relative paths against `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        std::fs::read(&full).map_err(|e| RenderError::load_failure(full.display().to_string(), e))
    }

    fn read_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| RenderError::load_failure(path.display().to_string(), e))
    }

    fn shader_layout(&self, path: &Path) -> Result<ProgramLayout> {
        let sidecar = layout_sidecar(path);
        if !self.resolve(&sidecar).is_file() {
            return Ok(ProgramLayout::material_mesh());
        }
        let json = self.read_string(&sidecar)?;
        serde_json::from_str(&json).map_err(|e| RenderError::load_failure(sidecar.display().to_string(), e))
    }
}

/// `shaders/lit.wgsl` → `shaders/lit.layout.json`.
#[must_use]
pub fn layout_sidecar(path: &Path) -> PathBuf {
    path.with_extension("layout.json")
}

impl ResourceLoader for FsLoader {
    fn load_image(&self, path: &Path) -> Result<Image> {
        let bytes = self.read(path)?;
        Image::decode(path.display().to_string(), &bytes)
    }

    fn load_shader(&self, path: &Path) -> Result<ShaderSource> {
        let wgsl = self.read_string(path)?;
        let layout = self.shader_layout(path)?;
        log::debug!("Loaded shader '{}' ({} bytes)", path.display(), wgsl.len());
        Ok(ShaderSource::from_module(path.display().to_string(), wgsl, layout))
    }

    fn load_text(&self, path: &Path) -> Result<String> {
        self.read_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextureSlot;

    #[test]
    fn sidecar_replaces_the_extension() {
        assert_eq!(
            layout_sidecar(Path::new("shaders/lit.wgsl")),
            PathBuf::from("shaders/lit.layout.json")
        );
    }

    #[test]
    fn shader_layout_comes_from_the_sidecar() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("blit.wgsl"), "@vertex fn vs_main() {}\n@fragment fn fs_main() {}\n")
            .expect("write shader");
        std::fs::write(dir.path().join("blit.layout.json"), r#"{ "pass_textures": ["color", "depth"] }"#)
            .expect("write layout");

        let shader = FsLoader::new(dir.path()).load_shader(Path::new("blit.wgsl"))?;
        assert_eq!(shader.layout, ProgramLayout::fullscreen(&[TextureSlot::Color, TextureSlot::Depth]));
        assert_eq!(shader.label, "blit.wgsl");
        Ok(())
    }

    #[test]
    fn malformed_sidecar_is_a_load_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bad.wgsl"), "@vertex fn vs_main() {}").expect("write shader");
        std::fs::write(dir.path().join("bad.layout.json"), "{ \"vertex_input\": \"points\" }").expect("write layout");

        let err = FsLoader::new(dir.path()).load_shader(Path::new("bad.wgsl")).unwrap_err();
        assert!(
            matches!(&err, RenderError::ResourceLoadFailure { path, .. } if path == "bad.layout.json"),
            "got {err:?}"
        );
    }
}
