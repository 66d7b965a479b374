//! Logical Resource Store
//!
//! Append-only storage for every logical resource category. Each category
//! keeps:
//!
//! - a dense `Vec` of payloads indexed by handle (handles are issued in order
//!   and never reused, so the index is the handle)
//! - a key → handle cache so repeated loads of one path return one handle
//!
//! # Notifications
//!
//! Consumers call [`ResourceStore::subscribe`] and receive a `flume` channel.
//! Every successful `create_*` sends [`ResourceEvent::Created`] to all live
//! subscribers, so the consumer sees creations in exactly the order they
//! happened and can drain them whenever it is ready. Disconnected subscribers
//! are pruned on the next send.
//!
//! # Lifetime
//!
//! There is no removal API: a resource lives as long as the store.

use std::path::Path;

use rustc_hash::FxHashMap;

use penumbra_core::{Handle, HandleAllocator, Result};

use crate::events::{ResourceEvent, ResourceId};
use crate::loader::{FsLoader, ResourceLoader};
use crate::{
    Image, ImageHandle, Material, MaterialHandle, Mesh, MeshHandle, Model, ModelHandle, ModelPart,
    ShaderHandle, ShaderSource, TextHandle,
};

/// One category's payloads and key cache.
struct Storage<T> {
    items: Vec<T>,
    lookup: FxHashMap<String, Handle<T>>,
    alloc: HandleAllocator,
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            lookup: FxHashMap::default(),
            alloc: HandleAllocator::new(),
        }
    }
}

impl<T> Storage<T> {
    fn insert(&mut self, item: T) -> Handle<T> {
        let handle = self.alloc.allocate();
        debug_assert_eq!(handle.index(), self.items.len());
        self.items.push(item);
        handle
    }

    #[inline]
    fn get(&self, handle: Handle<T>) -> Option<&T> {
        if handle.is_valid() {
            self.items.get(handle.index())
        } else {
            None
        }
    }

    #[inline]
    fn find(&self, key: &str) -> Option<Handle<T>> {
        self.lookup.get(key).copied()
    }

    fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        (0..self.items.len()).map(|i| Handle::from_raw(i as u32))
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub struct ResourceStore {
    meshes: Storage<Mesh>,
    images: Storage<Image>,
    materials: Storage<Material>,
    models: Storage<Model>,
    shaders: Storage<ShaderSource>,
    texts: Storage<String>,
    loader: Box<dyn ResourceLoader>,
    subscribers: Vec<flume::Sender<ResourceEvent>>,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("meshes", &self.meshes.items.len())
            .field("images", &self.images.items.len())
            .field("materials", &self.materials.items.len())
            .field("models", &self.models.items.len())
            .field("shaders", &self.shaders.items.len())
            .field("texts", &self.texts.items.len())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

/// Generates the per-category create / get / find / keyed-insert accessors.
macro_rules! category {
    (
        $field:ident, $ty:ty, $handle:ty, $variant:ident,
        create = $create:ident, get = $get:ident, find = $find:ident,
        insert_keyed = $insert_keyed:ident, count = $count:ident
    ) => {
        /// Registers a payload, returns its new handle and notifies subscribers.
        pub fn $create(&mut self, item: $ty) -> $handle {
            let handle = self.$field.insert(item);
            log::debug!(concat!("Created ", stringify!($variant), " {:?}"), handle);
            self.notify(ResourceId::$variant(handle));
            handle
        }

        #[must_use]
        pub fn $get(&self, handle: $handle) -> Option<&$ty> {
            self.$field.get(handle)
        }

        /// Looks up a previously loaded or keyed resource.
        #[must_use]
        pub fn $find(&self, key: &str) -> Option<$handle> {
            self.$field.find(key)
        }

        /// Registers a payload under `key` unless one is cached there already.
        pub fn $insert_keyed(&mut self, key: &str, item: $ty) -> $handle {
            if let Some(handle) = self.$field.find(key) {
                return handle;
            }
            let handle = self.$create(item);
            self.$field.lookup.insert(key.to_owned(), handle);
            handle
        }

        #[must_use]
        pub fn $count(&self) -> usize {
            self.$field.items.len()
        }
    };
}

impl ResourceStore {
    /// A store that loads from the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_loader(FsLoader::default())
    }

    #[must_use]
    pub fn with_loader(loader: impl ResourceLoader + 'static) -> Self {
        Self {
            meshes: Storage::default(),
            images: Storage::default(),
            materials: Storage::default(),
            models: Storage::default(),
            shaders: Storage::default(),
            texts: Storage::default(),
            loader: Box::new(loader),
            subscribers: Vec::new(),
        }
    }

    /// Opens a new notification channel. Only creations after this call are
    /// delivered.
    pub fn subscribe(&mut self) -> flume::Receiver<ResourceEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Every registered resource, dependencies first: images, meshes and
    /// shaders, then materials, models and texts. Each category is in
    /// creation order.
    ///
    /// A late subscriber replays this list before draining its channel.
    #[must_use]
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        let mut ids = Vec::with_capacity(
            self.images.items.len()
                + self.meshes.items.len()
                + self.shaders.items.len()
                + self.materials.items.len()
                + self.models.items.len()
                + self.texts.items.len(),
        );
        ids.extend(self.images.handles().map(ResourceId::Image));
        ids.extend(self.meshes.handles().map(ResourceId::Mesh));
        ids.extend(self.shaders.handles().map(ResourceId::Shader));
        ids.extend(self.materials.handles().map(ResourceId::Material));
        ids.extend(self.models.handles().map(ResourceId::Model));
        ids.extend(self.texts.handles().map(ResourceId::Text));
        ids
    }

    fn notify(&mut self, id: ResourceId) {
        self.subscribers
            .retain(|tx| tx.send(ResourceEvent::Created(id)).is_ok());
    }

    // ========================================================================
    // Per-category accessors
    // ========================================================================

    category!(meshes, Mesh, MeshHandle, Mesh,
        create = create_mesh, get = mesh, find = find_mesh,
        insert_keyed = insert_mesh_keyed, count = mesh_count);

    category!(images, Image, ImageHandle, Image,
        create = create_image, get = image, find = find_image,
        insert_keyed = insert_image_keyed, count = image_count);

    category!(materials, Material, MaterialHandle, Material,
        create = create_material, get = material, find = find_material,
        insert_keyed = insert_material_keyed, count = material_count);

    category!(models, Model, ModelHandle, Model,
        create = create_model, get = model, find = find_model,
        insert_keyed = insert_model_keyed, count = model_count);

    category!(shaders, ShaderSource, ShaderHandle, Shader,
        create = create_shader, get = shader, find = find_shader,
        insert_keyed = insert_shader_keyed, count = shader_count);

    category!(texts, String, TextHandle, Text,
        create = create_text, get = text, find = find_text,
        insert_keyed = insert_text_keyed, count = text_count);

    // ========================================================================
    // File loading (deduplicated by path)
    // ========================================================================

    pub fn load_mesh(&mut self, path: impl AsRef<Path>) -> Result<MeshHandle> {
        let path = path.as_ref();
        let key = path_key(path);
        if let Some(handle) = self.meshes.find(&key) {
            return Ok(handle);
        }
        let mesh = self.loader.load_mesh(path)?;
        Ok(self.insert_mesh_keyed(&key, mesh))
    }

    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<ImageHandle> {
        let path = path.as_ref();
        let key = path_key(path);
        if let Some(handle) = self.images.find(&key) {
            return Ok(handle);
        }
        let image = self.loader.load_image(path)?;
        Ok(self.insert_image_keyed(&key, image))
    }

    pub fn load_shader(&mut self, path: impl AsRef<Path>) -> Result<ShaderHandle> {
        let path = path.as_ref();
        let key = path_key(path);
        if let Some(handle) = self.shaders.find(&key) {
            return Ok(handle);
        }
        let shader = self.loader.load_shader(path)?;
        Ok(self.insert_shader_keyed(&key, shader))
    }

    pub fn load_text(&mut self, path: impl AsRef<Path>) -> Result<TextHandle> {
        let path = path.as_ref();
        let key = path_key(path);
        if let Some(handle) = self.texts.find(&key) {
            return Ok(handle);
        }
        let text = self.loader.load_text(path)?;
        Ok(self.insert_text_keyed(&key, text))
    }

    /// Loads a material and every image it references.
    ///
    /// Images are registered before the material, so subscribers always see a
    /// material's channels created ahead of the material itself.
    pub fn load_material(&mut self, path: impl AsRef<Path>) -> Result<MaterialHandle> {
        let path = path.as_ref();
        let key = path_key(path);
        if let Some(handle) = self.materials.find(&key) {
            return Ok(handle);
        }
        let file = self.loader.load_material(path)?;

        let mut channel = |p: Option<&Path>| -> Result<Option<ImageHandle>> {
            p.map(|p| self.load_image(p)).transpose()
        };
        let material = Material {
            label: key.clone(),
            diffuse: channel(file.diffuse.as_deref())?,
            normal: channel(file.normal.as_deref())?,
            specular: channel(file.specular.as_deref())?,
            glow: channel(file.glow.as_deref())?,
            alpha: channel(file.alpha.as_deref())?,
            color: file.color,
            specular_intensity: file.specular_intensity,
            glow_intensity: file.glow_intensity,
        };
        Ok(self.insert_material_keyed(&key, material))
    }

    /// Loads a model together with its meshes and materials.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<ModelHandle> {
        let path = path.as_ref();
        let key = path_key(path);
        if let Some(handle) = self.models.find(&key) {
            return Ok(handle);
        }
        let file = self.loader.load_model(path)?;

        let mut model = Model::new(key.clone());
        for (mesh_path, material_path) in &file.parts {
            let mesh = self.load_mesh(mesh_path)?;
            let material = self.load_material(material_path)?;
            model.parts.push(ModelPart { mesh, material });
        }
        Ok(self.insert_model_keyed(&key, model))
    }
}
