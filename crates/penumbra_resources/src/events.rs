//! Resource notifications.
//!
//! Every `create_*` on the [`ResourceStore`](crate::ResourceStore) sends one
//! [`ResourceEvent::Created`] to each subscriber, in creation order. Resources
//! live for the whole process, so there are no change or delete events.

use crate::{ImageHandle, MaterialHandle, MeshHandle, ModelHandle, ShaderHandle, TextHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Mesh,
    Image,
    Material,
    Model,
    Shader,
    Text,
}

/// A handle of any category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Mesh(MeshHandle),
    Image(ImageHandle),
    Material(MaterialHandle),
    Model(ModelHandle),
    Shader(ShaderHandle),
    Text(TextHandle),
}

impl ResourceId {
    #[must_use]
    pub const fn kind(self) -> ResourceKind {
        match self {
            Self::Mesh(_) => ResourceKind::Mesh,
            Self::Image(_) => ResourceKind::Image,
            Self::Material(_) => ResourceKind::Material,
            Self::Model(_) => ResourceKind::Model,
            Self::Shader(_) => ResourceKind::Shader,
            Self::Text(_) => ResourceKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    Created(ResourceId),
}
