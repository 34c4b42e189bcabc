//! Modules of a loaded assembly.
//!
//! A [`Module`] is the unit the engine reference counts. Resource views hold a [`ModuleRc`]
//! clone for as long as they point into module memory, so [`Module::liveness`] directly
//! reflects how many holders keep the module's memory alive.

use std::sync::Arc;

use crate::file::Backend;

/// A reference-counted pointer to a `Module`
pub type ModuleRc = Arc<Module>;

/// One module of a loaded assembly, as reported by the engine.
#[derive(Debug)]
pub struct Module {
    /// File name of the module, e.g. `"App.dll"`
    pub name: String,
    /// Name stored in the module's metadata; used for lookups by name
    pub scope_name: String,
    /// Full path of the module, or a placeholder for in-memory modules
    pub fully_qualified_name: String,
    /// A Guid used to distinguish between two versions of the same module
    pub mvid: uguid::Guid,
    /// Set if the module carries only resources and no code
    pub is_resource: bool,
    /// Image memory owned by this module, if the engine attached one
    image: Option<Box<dyn Backend>>,
}

impl Module {
    /// Creates a code module without an attached image.
    ///
    /// # Arguments
    /// * `name` - File name, also used as scope and fully qualified name until overridden
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Module {
            scope_name: name.clone(),
            fully_qualified_name: name.clone(),
            name,
            mvid: uguid::Guid::ZERO,
            is_resource: false,
            image: None,
        }
    }

    /// Marks the module as a resource-only module.
    #[must_use]
    pub fn resource(mut self) -> Self {
        self.is_resource = true;
        self
    }

    /// Sets the metadata scope name.
    #[must_use]
    pub fn with_scope_name(mut self, scope_name: impl Into<String>) -> Self {
        self.scope_name = scope_name.into();
        self
    }

    /// Sets the fully qualified name.
    #[must_use]
    pub fn with_fully_qualified_name(mut self, fully_qualified_name: impl Into<String>) -> Self {
        self.fully_qualified_name = fully_qualified_name.into();
        self
    }

    /// Sets the module version id.
    #[must_use]
    pub fn with_mvid(mut self, mvid: uguid::Guid) -> Self {
        self.mvid = mvid;
        self
    }

    /// Attaches the memory this module's resources live in.
    #[must_use]
    pub fn with_image(mut self, image: impl Backend + 'static) -> Self {
        self.image = Some(Box::new(image));
        self
    }

    /// Returns `true` for resource-only modules.
    #[must_use]
    pub fn is_resource(&self) -> bool {
        self.is_resource
    }

    /// The attached image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&dyn Backend> {
        self.image.as_deref()
    }

    /// Number of live references to `module`, views and the engine's own included.
    #[must_use]
    pub fn liveness(module: &ModuleRc) -> usize {
        Arc::strong_count(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Memory;

    #[test]
    fn builder_sets_fields() {
        let mvid = uguid::guid!("01234567-89ab-cdef-0123-456789abcdef");
        let module = Module::new("App.resources.dll")
            .resource()
            .with_scope_name("App.resources")
            .with_mvid(mvid)
            .with_image(Memory::new(vec![1, 2, 3]));

        assert!(module.is_resource());
        assert_eq!(module.scope_name, "App.resources");
        assert_eq!(module.fully_qualified_name, "App.resources.dll");
        assert_eq!(module.mvid, mvid);
        assert_eq!(module.image().unwrap().data(), &[1, 2, 3]);
    }

    #[test]
    fn liveness_tracks_clones() {
        let module: ModuleRc = Arc::new(Module::new("App.dll"));
        assert_eq!(Module::liveness(&module), 1);

        let held = Arc::clone(&module);
        assert_eq!(Module::liveness(&module), 2);

        drop(held);
        assert_eq!(Module::liveness(&module), 1);
    }
}
