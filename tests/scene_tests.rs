//! Scene Integration Tests
//!
//! Tests for:
//! - SceneQuery cursors: ordering, exhaustion sentinel, clearing
//! - SceneObject: cached world bounds under translation, rotation and scale
//! - Scene::visible_objects with culling on and off
//! - Local bounds derived from store meshes and models

use glam::{Quat, Vec3};

use penumbra::core::Handle;
use penumbra::resources::primitives::{create_cube, create_sphere};
use penumbra::resources::{Material, Model, ResourceStore};
use penumbra::scene::scene::local_bounds;
use penumbra::scene::{
    BoundingSphere, Camera, CullingConfig, DirectionalLight, PointLight, Renderable, Scene, SceneObject,
    SceneQuery,
};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn unit_renderable() -> Renderable {
    Renderable::Mesh {
        mesh: Handle::from_raw(0),
        material: Handle::from_raw(0),
    }
}

fn unit_object(position: Vec3) -> SceneObject {
    SceneObject::new(unit_renderable(), BoundingSphere::new(Vec3::ZERO, 1.0)).with_position(position)
}

const CULL: CullingConfig = CullingConfig {
    view_frustum_culling: true,
};
const NO_CULL: CullingConfig = CullingConfig {
    view_frustum_culling: false,
};

// ============================================================================
// SceneQuery Cursors
// ============================================================================

#[test]
fn query_cursor_yields_each_added_id_then_invalid() {
    let mut query = SceneQuery::new();
    for i in 0..4 {
        query.add_object(Handle::from_raw(i));
    }

    for i in 0..4 {
        assert!(query.has_next_object(), "cursor should have item {i}");
        assert_eq!(query.next_object(), Handle::from_raw(i), "ids come back in insertion order");
    }
    assert!(!query.has_next_object());
    assert_eq!(query.next_object(), Handle::INVALID, "exhausted cursor returns the sentinel");
    assert_eq!(query.next_object(), Handle::INVALID, "and keeps returning it");
}

#[test]
fn query_cursors_are_independent() {
    let mut query = SceneQuery::new();
    query.add_object(Handle::from_raw(7));
    query.add_point_light(Handle::from_raw(3));
    query.add_directional_light(Handle::from_raw(1));

    assert_eq!(query.next_object(), Handle::from_raw(7));
    assert!(query.has_next_point_light(), "draining objects leaves lights untouched");
    assert_eq!(query.next_point_light(), Handle::from_raw(3));
    assert_eq!(query.next_directional_light(), Handle::from_raw(1));
    assert_eq!(query.next_point_light(), Handle::INVALID);
}

#[test]
fn query_clear_resets_lists_and_cursors() {
    let mut query = SceneQuery::new();
    query.add_object(Handle::from_raw(0));
    let _ = query.next_object();
    query.clear();

    assert_eq!(query.object_count(), 0);
    assert!(!query.has_next_object());

    query.add_object(Handle::from_raw(5));
    assert_eq!(query.next_object(), Handle::from_raw(5), "cursor restarts after clear");
}

// ============================================================================
// Object Bounds
// ============================================================================

#[test]
fn translation_moves_bounds_center() {
    let object = unit_object(Vec3::new(3.0, -2.0, 1.0));
    let bounds = object.bounds();
    assert!(bounds.center.distance(Vec3::new(3.0, -2.0, 1.0)) < EPSILON);
    assert!(approx(bounds.radius, 1.0));
}

#[test]
fn uniform_scale_multiplies_radius() {
    let mut object = unit_object(Vec3::ZERO);
    object.set_scale(Vec3::splat(2.5));
    assert!(approx(object.bounds().radius, 2.5), "radius = {}", object.bounds().radius);
}

#[test]
fn non_uniform_scale_uses_largest_axis() {
    let mut object = unit_object(Vec3::ZERO);
    object.set_scale(Vec3::new(1.0, 4.0, -2.0));
    assert!(approx(object.bounds().radius, 4.0), "radius must enclose the stretched mesh");
}

#[test]
fn rotation_moves_offset_center() {
    let local = BoundingSphere::new(Vec3::X, 0.5);
    let mut object = SceneObject::new(unit_renderable(), local);
    object.set_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
    let center = object.bounds().center;
    assert!(center.distance(Vec3::Y) < EPSILON, "+X rotated 90° about Z is +Y, got {center}");
}

#[test]
fn bounds_follow_every_transform_write() {
    let mut object = unit_object(Vec3::ZERO);
    object.set_position(Vec3::new(0.0, 0.0, -10.0));
    assert!(approx(object.bounds().center.z, -10.0));
    object.set_position(Vec3::new(0.0, 0.0, 4.0));
    assert!(approx(object.bounds().center.z, 4.0), "cached bounds must not go stale");
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn object_in_front_of_camera_is_visible() {
    let mut scene = Scene::new();
    scene.create_object(unit_object(Vec3::ZERO));
    let camera = Camera::default();

    let mut query = SceneQuery::new();
    scene.visible_objects(&camera, CULL, &mut query);
    assert_eq!(query.object_count(), 1);
    assert_eq!(query.next_object(), Handle::from_raw(0));
}

#[test]
fn camera_past_far_plane_sees_nothing() {
    let mut scene = Scene::new();
    scene.create_object(unit_object(Vec3::ZERO));
    let camera = Camera::new(Vec3::new(0.0, 0.0, 200.0), Vec3::new(0.0, 0.0, 199.0), Vec3::Y);

    let mut query = SceneQuery::new();
    scene.visible_objects(&camera, CULL, &mut query);
    assert_eq!(query.object_count(), 0, "object 200 units away is beyond far = 100");
}

#[test]
fn culling_off_returns_every_object_and_light() {
    let mut scene = Scene::new();
    scene.create_object(unit_object(Vec3::ZERO));
    scene.create_object(unit_object(Vec3::new(0.0, 0.0, 50.0)));
    scene.create_object(unit_object(Vec3::new(500.0, 0.0, 0.0)));
    scene.create_point_light(PointLight::new(Vec3::new(0.0, 0.0, 300.0), 1.0, Vec3::ONE, 1.0));
    let camera = Camera::default();

    let mut query = SceneQuery::new();
    scene.visible_objects(&camera, CULL, &mut query);
    assert_eq!(query.object_count(), 1);
    assert_eq!(query.point_light_count(), 0);

    scene.visible_objects(&camera, NO_CULL, &mut query);
    assert_eq!(query.object_count(), 3, "culling off ignores the frustum");
    assert_eq!(query.point_light_count(), 1);
}

#[test]
fn directional_lights_are_always_visible() {
    let mut scene = Scene::new();
    scene.create_directional_light(DirectionalLight::default());
    scene.create_directional_light(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 2.0));
    let camera = Camera::new(Vec3::new(0.0, 0.0, 500.0), Vec3::new(0.0, 0.0, 600.0), Vec3::Y);

    let mut query = SceneQuery::new();
    scene.visible_objects(&camera, CULL, &mut query);
    assert_eq!(query.directional_light_count(), 2);
}

#[test]
fn point_light_is_culled_by_its_radius() {
    let mut scene = Scene::new();
    // Light sits behind the camera, but its radius reaches into the frustum.
    scene.create_point_light(PointLight::new(Vec3::new(0.0, 0.0, 8.0), 6.0, Vec3::ONE, 1.0));
    // Same position with a small radius stays outside.
    scene.create_point_light(PointLight::new(Vec3::new(0.0, 0.0, 8.0), 1.0, Vec3::ONE, 1.0));
    let camera = Camera::default();

    let mut query = SceneQuery::new();
    scene.visible_objects(&camera, CULL, &mut query);
    assert_eq!(query.point_light_count(), 1);
    assert_eq!(query.next_point_light(), Handle::from_raw(0));
}

#[test]
fn visible_objects_replaces_previous_frame() {
    let mut scene = Scene::new();
    scene.create_object(unit_object(Vec3::ZERO));
    let camera = Camera::default();

    let mut query = SceneQuery::new();
    scene.visible_objects(&camera, CULL, &mut query);
    scene.visible_objects(&camera, CULL, &mut query);
    assert_eq!(query.object_count(), 1, "a rebuild must not accumulate ids");
}

// ============================================================================
// Scene Storage
// ============================================================================

#[test]
fn handles_are_dense_indices() {
    let mut scene = Scene::new();
    let a = scene.create_object(unit_object(Vec3::ZERO));
    let b = scene.create_object(unit_object(Vec3::X));
    assert_eq!(a.raw(), 0);
    assert_eq!(b.raw(), 1);
    assert!(scene.get_object(Handle::from_raw(2)).is_none());
    assert_eq!(scene.objects().count(), 2);
}

#[test]
fn ambient_defaults_and_updates() {
    let mut scene = Scene::new();
    assert!(approx(scene.ambient().intensity, 0.1));
    scene.set_ambient(Vec3::new(1.0, 0.5, 0.0), 0.4);
    let radiance = scene.ambient().radiance();
    assert!(approx(radiance.x, 0.4) && approx(radiance.y, 0.2) && approx(radiance.z, 0.0));
}

// ============================================================================
// Bounds From Resources
// ============================================================================

#[test]
fn renderable_bounds_come_from_mesh() {
    let mut store = ResourceStore::new();
    let mesh = store.create_mesh(create_sphere(2.0, 16, 8));
    let material = store.create_material(Material::new("m"));

    let mut scene = Scene::new();
    let handle = scene.create_renderable(&store, Renderable::Mesh { mesh, material });
    let bounds = scene.object(handle).bounds();
    assert!(approx(bounds.radius, 2.0), "sphere mesh radius, got {}", bounds.radius);
}

#[test]
fn model_bounds_enclose_every_part() {
    let mut store = ResourceStore::new();
    let cube = store.create_mesh(create_cube(2.0));
    let sphere = store.create_mesh(create_sphere(3.0, 16, 8));
    let material = store.create_material(Material::new("m"));
    let model = store.create_model(Model::new("m").with_part(cube, material).with_part(sphere, material));

    let bounds = local_bounds(&store, Renderable::Model(model)).expect("model has meshes");
    assert!(approx(bounds.radius, 3.0), "sphere encloses the cube, got {}", bounds.radius);
}

#[test]
fn unresolved_mesh_falls_back_to_unit_sphere() {
    let store = ResourceStore::new();
    let mut scene = Scene::new();
    let handle = scene.create_renderable(&store, unit_renderable());
    assert!(approx(scene.object(handle).bounds().radius, 1.0));
}
