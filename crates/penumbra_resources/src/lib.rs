//! Penumbra Resources
//!
//! The logical side of the resource pipeline. Payloads (meshes, images,
//! materials, models, shader sources and strings) are registered in a
//! [`ResourceStore`], addressed by typed [`Handle`]s, and announced to
//! consumers through [`ResourceEvent`]s.
//!
//! Nothing in this crate touches the GPU. The render crate subscribes to the
//! store and materializes each payload exactly once.

pub mod events;
pub mod image;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod model;
pub mod primitives;
pub mod shader;
pub mod store;

pub use events::{ResourceEvent, ResourceId, ResourceKind};
pub use self::image::Image;
pub use loader::{FsLoader, ResourceLoader};
pub use material::Material;
pub use mesh::{Mesh, Vertex};
pub use model::{Model, ModelPart};
pub use penumbra_core::Handle;
pub use shader::{ProgramLayout, ShaderSource, ShaderStage, ShaderStageSource, TextureSlot, VertexInput};
pub use store::ResourceStore;

pub type MeshHandle = Handle<Mesh>;
pub type ImageHandle = Handle<Image>;
pub type MaterialHandle = Handle<Material>;
pub type ModelHandle = Handle<Model>;
pub type ShaderHandle = Handle<ShaderSource>;
pub type TextHandle = Handle<String>;
