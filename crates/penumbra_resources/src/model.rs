//! Models: a list of mesh + material pairs drawn with one transform.

use crate::{MaterialHandle, MeshHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPart {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub label: String,
    pub parts: Vec<ModelPart>,
}

impl Model {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_part(mut self, mesh: MeshHandle, material: MaterialHandle) -> Self {
        self.parts.push(ModelPart { mesh, material });
        self
    }
}
