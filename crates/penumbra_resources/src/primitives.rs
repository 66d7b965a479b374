//! Built-in meshes.
//!
//! The light pass draws point lights as unit spheres scaled to the light
//! radius, so the sphere must enclose the unit ball: vertices sit on the
//! circumscribed radius of the tessellation rather than exactly at 1.0.

use std::f32::consts::PI;

use crate::{Mesh, Vertex};

/// Store key of the light-volume sphere.
pub const SPHERE_KEY: &str = "builtin/sphere";
/// Store key of the unit cube.
pub const CUBE_KEY: &str = "builtin/cube";

/// UV sphere of the given radius.
#[must_use]
pub fn create_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);

    for y in 0..=height_segments {
        let v = y as f32 / height_segments as f32;
        let theta = v * PI;
        let py = -theta.cos();
        let ring = theta.sin();

        for x in 0..=width_segments {
            let u = x as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let normal = [-ring * phi.cos(), py, ring * phi.sin()];
            let position = [normal[0] * radius, normal[1] * radius, normal[2] * radius];
            vertices.push(Vertex::new(position, normal, [u, 1.0 - v]));
        }
    }

    let stride = width_segments + 1;
    for y in 0..height_segments {
        for x in 0..width_segments {
            let v0 = y * stride + x;
            let v1 = v0 + 1;
            let v2 = v0 + stride;
            let v3 = v2 + 1;
            indices.extend_from_slice(&[v0, v1, v2, v1, v3, v2]);
        }
    }

    Mesh::new("sphere", vertices, indices)
}

/// Sphere that fully contains the unit ball when drawn as triangles.
#[must_use]
pub fn create_light_volume() -> Mesh {
    const SEGMENTS_W: u32 = 16;
    const SEGMENTS_H: u32 = 12;
    // Flat faces sit inside the vertex radius; push vertices out so the
    // inscribed surface still reaches 1.0.
    let radius = 1.0 / (PI / SEGMENTS_W as f32).cos() / (PI / (2.0 * SEGMENTS_H as f32)).cos();
    let mut mesh = create_sphere(radius, SEGMENTS_W, SEGMENTS_H);
    mesh.label = "light_volume".to_owned();
    mesh
}

/// Axis-aligned cube centered on the origin with side `size`.
#[must_use]
pub fn create_cube(size: f32) -> Mesh {
    let h = size * 0.5;
    // (normal, tangent-u axis, tangent-v axis)
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [
                (n[0] + u[0] * su + v[0] * sv) * h,
                (n[1] + u[1] * su + v[1] * sv) * h,
                (n[2] + u[2] * su + v[2] * sv) * h,
            ];
            let mut vertex = Vertex::new(position, n, [(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5]);
            vertex.tangent = [u[0], u[1], u[2], 1.0];
            vertices.push(vertex);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::new("cube", vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_volume_encloses_unit_ball() {
        let (_, radius) = create_light_volume().bounding_sphere();
        assert!(radius > 1.0, "vertex radius {radius} must exceed 1.0");
    }

    #[test]
    fn cube_has_24_vertices_and_12_triangles() {
        let cube = create_cube(2.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        let (center, radius) = cube.bounding_sphere();
        assert!(center.length() < 1e-5);
        assert!((radius - 3.0_f32.sqrt()).abs() < 1e-4);
    }
}
