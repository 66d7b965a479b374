//! View Frustum
//!
//! Six inward-facing planes stored as `Vec4(normal.xyz, distance)`, ordered
//! Left, Right, Bottom, Top, Near, Far. A point `p` is on the inner side of a
//! plane when `dot(normal, p) + distance >= 0`.
//!
//! Three constructions are available:
//!
//! | Method                          | Source                                  |
//! |---------------------------------|-----------------------------------------|
//! | [`Frustum::from_perspective`]   | camera position/look/up + fov/aspect    |
//! | [`Frustum::from_matrix`]        | rows of a view-projection matrix        |
//! | [`Frustum::from_inverse_matrix`]| world-space corners of the NDC cube     |
//!
//! The corner method is used for light cameras, where transforming eight
//! corners explicitly is more robust than row extraction from a nearly
//! degenerate orthographic matrix.
//!
//! Depth follows the wgpu convention: NDC z in `[0, 1]`.

use glam::{Mat4, Vec3, Vec4};

use crate::BoundingSphere;

/// Result of a sphere-vs-frustum test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Entirely on the outer side of at least one plane.
    Outside,
    /// Straddles or touches at least one plane. Counted as visible.
    Intersecting,
    /// Strictly inside every plane.
    Inside,
}

impl Containment {
    #[inline]
    #[must_use]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frustum {
    planes: [Vec4; 6],
}

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;
pub const BOTTOM: usize = 2;
pub const TOP: usize = 3;
pub const NEAR: usize = 4;
pub const FAR: usize = 5;

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > f32::EPSILON {
        plane / length
    } else {
        plane
    }
}

fn plane_from_normal_point(normal: Vec3, point: Vec3) -> Vec4 {
    let n = normal.normalize_or_zero();
    n.extend(-n.dot(point))
}

impl Frustum {
    /// Builds the frustum geometrically from camera parameters.
    ///
    /// `fov_y` is the full vertical field of view in radians.
    #[must_use]
    pub fn from_perspective(
        position: Vec3,
        look: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let forward = (look - position).normalize_or_zero();
        let right = forward.cross(up).normalize_or_zero();
        let up = right.cross(forward);

        let tan_h = (fov_y * 0.5).tan();
        let tan_w = tan_h * aspect;

        let to_top = forward + up * tan_h;
        let to_bottom = forward - up * tan_h;
        let to_left = forward - right * tan_w;
        let to_right = forward + right * tan_w;

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = plane_from_normal_point(to_left.cross(up), position);
        planes[RIGHT] = plane_from_normal_point(up.cross(to_right), position);
        planes[BOTTOM] = plane_from_normal_point(right.cross(to_bottom), position);
        planes[TOP] = plane_from_normal_point(to_top.cross(right), position);
        planes[NEAR] = plane_from_normal_point(forward, position + forward * near);
        planes[FAR] = plane_from_normal_point(-forward, position + forward * far);

        Self { planes }
    }

    /// Gribb-Hartmann extraction from a combined view-projection matrix.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // z in [0, 1]: near is row 2 alone.
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            *plane = normalize_plane(*plane);
        }

        Self { planes }
    }

    /// Builds the planes from the eight world-space corners obtained by
    /// un-projecting the NDC cube through `inverse_view_projection`.
    #[must_use]
    pub fn from_inverse_matrix(inverse_view_projection: Mat4) -> Self {
        let c = Self::corners_of(inverse_view_projection);
        let centroid = c.iter().copied().sum::<Vec3>() / 8.0;

        // Corner index bits: x = bit 0, y = bit 1, z = bit 2 (0 = near).
        let triples: [[usize; 3]; 6] = [
            [0, 2, 4], // x = -1
            [1, 3, 5], // x = +1
            [0, 1, 4], // y = -1
            [2, 3, 6], // y = +1
            [0, 1, 2], // z = 0
            [4, 5, 6], // z = 1
        ];

        let mut planes = [Vec4::ZERO; 6];
        for (plane, [a, b, d]) in planes.iter_mut().zip(triples) {
            let normal = (c[b] - c[a]).cross(c[d] - c[a]).normalize_or_zero();
            let mut p = normal.extend(-normal.dot(c[a]));
            if p.truncate().dot(centroid) + p.w < 0.0 {
                p = -p;
            }
            *plane = p;
        }

        Self { planes }
    }

    /// World-space corners of the NDC cube, indexed by `x | y << 1 | z << 2`.
    #[must_use]
    pub fn corners_of(inverse_view_projection: Mat4) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            let ndc = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { 0.0 } else { 1.0 },
            );
            inverse_view_projection.project_point3(ndc)
        })
    }

    #[inline]
    #[must_use]
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Signed distance from `point` to plane `index`; positive is inside.
    #[inline]
    #[must_use]
    pub fn distance(&self, index: usize, point: Vec3) -> f32 {
        let plane = self.planes[index];
        plane.truncate().dot(point) + plane.w
    }

    /// Classifies a sphere against all six planes.
    ///
    /// Any plane with `distance < -radius` short-circuits to
    /// [`Containment::Outside`]. A sphere touching a plane (distance equal to
    /// `±radius`) is reported as [`Containment::Intersecting`].
    #[must_use]
    pub fn classify(&self, sphere: &BoundingSphere) -> Containment {
        let mut intersecting = false;
        for index in 0..6 {
            let dist = self.distance(index, sphere.center);
            if dist < -sphere.radius {
                return Containment::Outside;
            }
            if dist <= sphere.radius {
                intersecting = true;
            }
        }
        if intersecting {
            Containment::Intersecting
        } else {
            Containment::Inside
        }
    }

    #[inline]
    #[must_use]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.classify(sphere).is_visible()
    }
}
