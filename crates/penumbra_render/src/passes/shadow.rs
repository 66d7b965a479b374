//! Shadow Math
//!
//! Light-space view-projection matrices for the shadow passes, kept free of
//! GPU state so they can be tested directly.
//!
//! - Directional lights: orthographic fit around the camera frustum,
//!   snapped to the shadow-map texel grid.
//! - Point lights: six 90° perspective views, one per cube face, in
//!   +X, -X, +Y, -Y, +Z, -Z layer order.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use penumbra_scene::{BoundingSphere, Camera, Frustum};

/// Maps clip space to shadow-map texture space: `xy` from `[-1, 1]` to
/// `[0, 1]` with y pointing down, depth unchanged.
pub const SHADOW_BIAS_MATRIX: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, -0.5, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.5, 0.5, 0.0, 1.0,
]);

/// Depth range added in front of the fitted box so off-screen casters
/// between the light and the view still land in the map.
const CASTER_EXTENSION: f32 = 50.0;

/// Face directions and up vectors in cube layer order.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

// ============================================================================
// Directional lights
// ============================================================================

/// Builds an orthographic view-projection that covers the camera frustum as
/// seen from a directional light.
#[must_use]
pub fn directional_light_view_projection(direction: Vec3, camera: &Camera, map_size: u32) -> Mat4 {
    let dir = if direction.length_squared() > 1e-6 {
        direction.normalize()
    } else {
        Vec3::NEG_Y
    };
    let corners = Frustum::corners_of(camera.view_projection().inverse());

    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let light_view = Mat4::look_at_rh(center - dir, center, up);

    let mut ls_min = Vec3::splat(f32::MAX);
    let mut ls_max = Vec3::splat(f32::MIN);
    for corner in &corners {
        let ls = light_view.transform_point3(*corner);
        ls_min = ls_min.min(ls);
        ls_max = ls_max.max(ls);
    }

    // Light looks down -Z: ls_max.z is nearest the light.
    ls_max.z += CASTER_EXTENSION;

    let size = map_size.max(1) as f32;
    let texel_x = (ls_max.x - ls_min.x) / size;
    let texel_y = (ls_max.y - ls_min.y) / size;
    if texel_x > 0.0 {
        ls_min.x = (ls_min.x / texel_x).floor() * texel_x;
        ls_max.x = (ls_max.x / texel_x).ceil() * texel_x;
    }
    if texel_y > 0.0 {
        ls_min.y = (ls_min.y / texel_y).floor() * texel_y;
        ls_max.y = (ls_max.y / texel_y).ceil() * texel_y;
    }

    let projection = Mat4::orthographic_rh(ls_min.x, ls_max.x, ls_min.y, ls_max.y, -ls_max.z, -ls_min.z);
    projection * light_view
}

/// World space to shadow-map texture space.
#[inline]
#[must_use]
pub fn shadow_matrix(light_view_projection: Mat4) -> Mat4 {
    SHADOW_BIAS_MATRIX * light_view_projection
}

/// Whether `bounds` can cast into the map of `light_view_projection`.
#[must_use]
pub fn casts_into(light_view_projection: Mat4, bounds: &BoundingSphere) -> bool {
    Frustum::from_inverse_matrix(light_view_projection.inverse()).intersects_sphere(bounds)
}

// ============================================================================
// Point lights
// ============================================================================

/// View-projections of the six cube faces around `position`.
///
/// The projection is flipped vertically because wgpu's framebuffer origin is
/// the top-left corner while cube-map sampling expects the GL face layout.
#[must_use]
pub fn point_light_face_view_projections(position: Vec3, radius: f32) -> [Mat4; 6] {
    let far = radius.max(0.01);
    let near = (far * 0.01).max(0.01).min(far * 0.5);
    let projection = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)) * Mat4::perspective_rh(FRAC_PI_2, 1.0, near, far);
    CUBE_FACES.map(|(forward, up)| projection * Mat4::look_at_rh(position, position + forward, up))
}

/// Whether an object with `bounds` lies within reach of a point light.
#[inline]
#[must_use]
pub fn within_light(light_position: Vec3, light_radius: f32, bounds: &BoundingSphere) -> bool {
    bounds.center.distance(light_position) <= bounds.radius + light_radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    const EPSILON: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn bias_matrix_maps_clip_corners_to_uv() {
        let top_left = SHADOW_BIAS_MATRIX * Vec4::new(-1.0, 1.0, 0.25, 1.0);
        assert!(approx(top_left.x, 0.0) && approx(top_left.y, 0.0), "got {top_left:?}");
        assert!(approx(top_left.z, 0.25), "depth passes through");

        let bottom_right = SHADOW_BIAS_MATRIX * Vec4::new(1.0, -1.0, 0.0, 1.0);
        assert!(approx(bottom_right.x, 1.0) && approx(bottom_right.y, 1.0));
    }

    #[test]
    fn each_cube_face_centers_its_axis() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let faces = point_light_face_view_projections(position, 10.0);
        for (i, (forward, _)) in CUBE_FACES.iter().enumerate() {
            let clip = faces[i] * (position + *forward * 5.0).extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(approx(ndc.x, 0.0) && approx(ndc.y, 0.0), "face {i} centre at {ndc:?}");
            assert!(ndc.z > 0.0 && ndc.z < 1.0, "face {i} depth {}", ndc.z);
        }
    }

    #[test]
    fn directional_fit_contains_camera_frustum() {
        let camera = Camera::default();
        let vp = directional_light_view_projection(Vec3::new(-0.3, -1.0, -0.2), &camera, 1024);
        for corner in Frustum::corners_of(camera.view_projection().inverse()) {
            let clip = vp * corner.extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() <= 1.0 + EPSILON && ndc.y.abs() <= 1.0 + EPSILON, "corner {corner} at {ndc:?}");
            assert!((-EPSILON..=1.0 + EPSILON).contains(&ndc.z), "corner {corner} depth {}", ndc.z);
        }
    }

    #[test]
    fn point_light_reach_counts_touching_spheres() {
        let bounds = BoundingSphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0);
        assert!(within_light(Vec3::ZERO, 2.0, &bounds));
        assert!(!within_light(Vec3::ZERO, 1.9, &bounds));
    }
}
