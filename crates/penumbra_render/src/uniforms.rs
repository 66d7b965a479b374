//! Uniform blocks shared with the built-in WGSL programs.
//!
//! Every block is `#[repr(C)]` and built only from `Mat4` and `Vec4`, so the
//! Rust layout matches WGSL's uniform address space without manual padding.
//! Field order must match the struct declarations in `shaders/`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use penumbra_scene::{AmbientLight, Camera, DirectionalLight, PointLight};

use crate::cache::GpuMaterial;

/// Maximum number of point lights the forward program shades.
pub const FORWARD_MAX_POINT_LIGHTS: usize = 4;

/// Copies a uniform block into an owned byte buffer.
#[inline]
#[must_use]
pub fn bytes_of<T: Pod>(value: &T) -> Vec<u8> {
    bytemuck::bytes_of(value).to_vec()
}

/// `(width, height, 1/width, 1/height)`
#[must_use]
pub fn screen_vector(width: u32, height: u32) -> Vec4 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Vec4::new(w, h, 1.0 / w, 1.0 / h)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    /// xyz: eye position, w: far plane
    pub camera_pos: Vec4,
    pub screen: Vec4,
}

impl CameraUniforms {
    #[must_use]
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let view_proj = camera.view_projection();
        Self {
            view_proj,
            inv_view_proj: view_proj.inverse(),
            camera_pos: camera.position.extend(camera.far),
            screen: screen_vector(width, height),
        }
    }
}

/// Per-draw block for geometry, shadow and forward draws.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    /// rgb: material tint
    pub color: Vec4,
    /// x: specular intensity, y: glow intensity
    pub params: Vec4,
}

impl ObjectUniforms {
    #[must_use]
    pub fn new(model: Mat4, color: Vec3, specular_intensity: f32, glow_intensity: f32) -> Self {
        Self {
            model,
            normal_matrix: model.inverse().transpose(),
            color: color.extend(1.0),
            params: Vec4::new(specular_intensity, glow_intensity, 0.0, 0.0),
        }
    }

    #[must_use]
    pub fn with_material(model: Mat4, material: &GpuMaterial) -> Self {
        Self::new(model, material.color, material.specular_intensity, material.glow_intensity)
    }

    /// Transform only, for shadow casters and light volumes.
    #[must_use]
    pub fn transform(model: Mat4) -> Self {
        Self::new(model, Vec3::ONE, 0.0, 0.0)
    }
}

/// Pass block for both shadow programs.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ShadowUniforms {
    pub light_view_proj: Mat4,
    /// xyz: light position (point lights), w: light radius
    pub light_pos_radius: Vec4,
    pub params: Vec4,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PointLightUniforms {
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    pub camera_pos: Vec4,
    pub screen: Vec4,
    pub position_radius: Vec4,
    pub color_intensity: Vec4,
    /// x: 1 when a shadow cube is bound, y: comparison bias
    pub shadow: Vec4,
}

impl PointLightUniforms {
    #[must_use]
    pub fn new(camera: &CameraUniforms, light: &PointLight, shadowed: bool, bias: f32) -> Self {
        Self {
            view_proj: camera.view_proj,
            inv_view_proj: camera.inv_view_proj,
            camera_pos: camera.camera_pos,
            screen: camera.screen,
            position_radius: light.position.extend(light.radius),
            color_intensity: light.color.extend(light.intensity),
            shadow: Vec4::new(if shadowed { 1.0 } else { 0.0 }, bias, 0.0, 0.0),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct DirectionalLightUniforms {
    pub inv_view_proj: Mat4,
    /// World space to shadow-map texture space.
    pub shadow_matrix: Mat4,
    pub camera_pos: Vec4,
    pub screen: Vec4,
    pub direction: Vec4,
    pub color_intensity: Vec4,
    /// x: 1 when shadowed, y: comparison bias, z: shadow texel size
    pub shadow: Vec4,
}

impl DirectionalLightUniforms {
    #[must_use]
    pub fn new(
        camera: &CameraUniforms,
        light: &DirectionalLight,
        shadow_matrix: Option<Mat4>,
        bias: f32,
        map_size: u32,
    ) -> Self {
        Self {
            inv_view_proj: camera.inv_view_proj,
            shadow_matrix: shadow_matrix.unwrap_or(Mat4::IDENTITY),
            camera_pos: camera.camera_pos,
            screen: camera.screen,
            direction: light.direction.extend(0.0),
            color_intensity: light.color.extend(light.intensity),
            shadow: Vec4::new(
                if shadow_matrix.is_some() { 1.0 } else { 0.0 },
                bias,
                1.0 / map_size.max(1) as f32,
                0.0,
            ),
        }
    }
}

/// Pass block for illumination, post stages and display.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PostUniforms {
    pub inv_view_proj: Mat4,
    pub camera_pos: Vec4,
    pub screen: Vec4,
    /// Stage specific.
    pub params: [Vec4; 2],
}

impl PostUniforms {
    #[must_use]
    pub fn new(camera: &CameraUniforms, params: [Vec4; 2]) -> Self {
        Self {
            inv_view_proj: camera.inv_view_proj,
            camera_pos: camera.camera_pos,
            screen: camera.screen,
            params,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ForwardUniforms {
    pub view_proj: Mat4,
    pub camera_pos: Vec4,
    pub ambient: Vec4,
    pub light_direction: Vec4,
    pub light_color: Vec4,
    pub point_position_radius: [Vec4; FORWARD_MAX_POINT_LIGHTS],
    pub point_color_intensity: [Vec4; FORWARD_MAX_POINT_LIGHTS],
    /// x: directional light present, y: point light count
    pub counts: Vec4,
}

impl ForwardUniforms {
    #[must_use]
    pub fn new(
        camera: &Camera,
        ambient: AmbientLight,
        directional: Option<&DirectionalLight>,
        points: &[&PointLight],
    ) -> Self {
        let mut uniforms = Self {
            view_proj: camera.view_projection(),
            camera_pos: camera.position.extend(1.0),
            ambient: ambient.radiance().extend(0.0),
            ..Self::default()
        };
        if let Some(light) = directional {
            uniforms.light_direction = light.direction.extend(0.0);
            uniforms.light_color = light.color.extend(light.intensity);
            uniforms.counts.x = 1.0;
        }
        let count = points.len().min(FORWARD_MAX_POINT_LIGHTS);
        for (i, light) in points.iter().take(count).enumerate() {
            uniforms.point_position_radius[i] = light.position.extend(light.radius);
            uniforms.point_color_intensity[i] = light.color.extend(light.intensity);
        }
        uniforms.counts.y = count as f32;
        uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_sixteen_byte_multiples() {
        assert_eq!(size_of::<CameraUniforms>(), 160);
        assert_eq!(size_of::<ObjectUniforms>(), 160);
        assert_eq!(size_of::<ShadowUniforms>() % 16, 0);
        assert_eq!(size_of::<PointLightUniforms>() % 16, 0);
        assert_eq!(size_of::<DirectionalLightUniforms>() % 16, 0);
        assert_eq!(size_of::<PostUniforms>(), 128);
        assert_eq!(size_of::<ForwardUniforms>(), 272);
    }

    #[test]
    fn forward_caps_point_lights() {
        let light = PointLight::default();
        let lights = vec![&light; 6];
        let uniforms = ForwardUniforms::new(&Camera::default(), AmbientLight::default(), None, &lights);
        assert!((uniforms.counts.y - FORWARD_MAX_POINT_LIGHTS as f32).abs() < 1e-6);
        assert!(uniforms.counts.x.abs() < 1e-6, "no directional light bound");
    }
}
