//! Frustum Tests
//!
//! Tests for:
//! - Plane construction from camera parameters
//! - Clip-space (Gribb-Hartmann) and world-space (inverse corners) extraction
//! - Sphere classification, including the touching-boundary case

use glam::Vec3;

use penumbra::scene::{BoundingSphere, Camera, Containment, Frustum};
use penumbra::scene::frustum::{FAR, NEAR};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Camera at the origin looking down -Z with a 90° square frustum from 1 to 10.
fn test_camera() -> Camera {
    Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y).with_perspective(90.0, 1.0, 1.0, 10.0)
}

fn sphere(x: f32, y: f32, z: f32, r: f32) -> BoundingSphere {
    BoundingSphere::new(Vec3::new(x, y, z), r)
}

// ============================================================================
// Plane Construction
// ============================================================================

#[test]
fn near_and_far_planes_sit_at_camera_distances() {
    let frustum = test_camera().frustum();
    let on_near = Vec3::new(0.0, 0.0, -1.0);
    let on_far = Vec3::new(0.0, 0.0, -10.0);

    assert!(approx(frustum.distance(NEAR, on_near), 0.0), "point on near plane has zero distance");
    assert!(approx(frustum.distance(FAR, on_far), 0.0), "point on far plane has zero distance");
    assert!(
        approx(frustum.distance(NEAR, Vec3::new(0.0, 0.0, -5.0)), 4.0),
        "distances are in world units"
    );
}

#[test]
fn plane_normals_are_unit_length() {
    let camera = test_camera();
    let vp = camera.view_projection();
    for frustum in [
        camera.frustum(),
        Frustum::from_matrix(vp),
        Frustum::from_inverse_matrix(vp.inverse()),
    ] {
        for plane in frustum.planes() {
            assert!(
                approx(plane.truncate().length(), 1.0),
                "plane {plane} should be normalized"
            );
        }
    }
}

#[test]
fn corners_span_near_and_far() {
    let camera = test_camera();
    let corners = Frustum::corners_of(camera.view_projection().inverse());
    // Index 0 is (-1, -1, near), index 7 is (+1, +1, far).
    assert!((corners[0].z + 1.0).abs() < 1e-3, "near corner z = {}", corners[0].z);
    assert!((corners[7].z + 10.0).abs() < 1e-3, "far corner z = {}", corners[7].z);
    assert!(
        (corners[7].x - 10.0).abs() < 1e-3,
        "90° frustum is as wide as it is deep, got x = {}",
        corners[7].x
    );
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn sphere_inside_all_planes_is_inside() {
    let frustum = test_camera().frustum();
    assert_eq!(frustum.classify(&sphere(0.0, 0.0, -5.0, 0.5)), Containment::Inside);
}

#[test]
fn sphere_behind_camera_is_outside() {
    let frustum = test_camera().frustum();
    let s = sphere(0.0, 0.0, 5.0, 1.0);
    assert_eq!(frustum.classify(&s), Containment::Outside);
    assert!(!frustum.intersects_sphere(&s));
}

#[test]
fn sphere_straddling_far_plane_is_intersecting() {
    let frustum = test_camera().frustum();
    let s = sphere(0.0, 0.0, -10.0, 1.0);
    assert_eq!(frustum.classify(&s), Containment::Intersecting);
    assert!(frustum.intersects_sphere(&s), "intersecting spheres count as visible");
}

#[test]
fn sphere_touching_plane_from_outside_is_included() {
    let frustum = test_camera().frustum();
    // Center 0.5 in front of the near plane, radius 0.5: distance == -radius.
    let touching = sphere(0.0, 0.0, -0.5, 0.5);
    assert_eq!(
        frustum.classify(&touching),
        Containment::Intersecting,
        "distance equal to -radius must not be culled"
    );

    let just_outside = sphere(0.0, 0.0, -0.4, 0.5);
    assert_eq!(frustum.classify(&just_outside), Containment::Outside);
}

#[test]
fn sphere_touching_plane_from_inside_is_intersecting() {
    let frustum = test_camera().frustum();
    // Distance to the far plane equals the radius exactly.
    let s = sphere(0.0, 0.0, -9.0, 1.0);
    assert_eq!(frustum.classify(&s), Containment::Intersecting);
}

#[test]
fn outside_any_single_plane_short_circuits() {
    let frustum = test_camera().frustum();
    // Far to the right but well within near/far depth.
    assert_eq!(frustum.classify(&sphere(20.0, 0.0, -5.0, 1.0)), Containment::Outside);
    // Beyond the far plane but centered.
    assert_eq!(frustum.classify(&sphere(0.0, 0.0, -12.0, 1.0)), Containment::Outside);
}

#[test]
fn extraction_methods_agree() {
    let camera = test_camera();
    let vp = camera.view_projection();
    let geometric = camera.frustum();
    let clip = Frustum::from_matrix(vp);
    let world = Frustum::from_inverse_matrix(vp.inverse());

    let spheres = [
        sphere(0.0, 0.0, -5.0, 0.5),
        sphere(0.0, 0.0, 5.0, 1.0),
        sphere(20.0, 0.0, -5.0, 1.0),
        sphere(0.0, 0.0, -12.0, 1.0),
        sphere(0.0, 0.0, -10.0, 1.0),
        sphere(5.0, 0.0, -5.0, 0.5),
        sphere(0.0, -3.0, -6.0, 0.25),
    ];
    for s in &spheres {
        let expected = geometric.classify(s);
        assert_eq!(clip.classify(s), expected, "clip-space planes disagree for {s:?}");
        assert_eq!(world.classify(s), expected, "world-space planes disagree for {s:?}");
    }
}

#[test]
fn containment_visibility() {
    assert!(!Containment::Outside.is_visible());
    assert!(Containment::Intersecting.is_visible());
    assert!(Containment::Inside.is_visible());
}
