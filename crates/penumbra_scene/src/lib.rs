//! Penumbra Scene
//!
//! Scene storage and visibility:
//!
//! - [`BoundingSphere`] and [`Frustum`]: pure culling math
//! - [`Camera`]: look-at camera with a perspective projection
//! - [`Scene`]: dense stores of objects and lights
//! - [`SceneQuery`]: the per-frame list of visible ids, consumed by cursors

pub mod bounds;
pub mod camera;
pub mod frustum;
pub mod light;
pub mod object;
pub mod query;
pub mod scene;

pub use bounds::BoundingSphere;
pub use camera::Camera;
pub use frustum::{Containment, Frustum};
pub use light::{AmbientLight, DirectionalLight, PointLight};
pub use object::{Renderable, SceneObject};
pub use query::SceneQuery;
pub use scene::{CullingConfig, DirectionalLightHandle, PointLightHandle, Scene, SceneObjectHandle};
