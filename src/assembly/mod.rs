//! The runtime assembly facade.
//!
//! [`RuntimeAssembly`] is a safe view of an assembly loaded and owned by a runtime engine.
//! It validates arguments, forwards queries through the [`Engine`] trait and converts the
//! answers: resource pointers become [`ResourceStream`]s that keep their module alive, and
//! native name records are marshaled into owned [`AssemblyName`]s with all native memory
//! returned to the engine.
//!
//! # Examples
//!
//! ```rust,ignore
//! use rtassembly::{metadata::typesystem::TypeRef, RuntimeAssembly};
//!
//! let assembly = RuntimeAssembly::new(engine, handle);
//!
//! for reference in assembly.get_referenced_assemblies()? {
//!     println!("{}", reference);
//! }
//!
//! let program = TypeRef::new("App", "Program");
//! if let Some(mut stream) = assembly.get_manifest_resource_stream_for(Some(&program), Some("app.png"))? {
//!     let icon = stream.as_slice()?.to_vec();
//!     stream.release()?;
//! }
//! # Ok::<(), rtassembly::Error>(())
//! ```

mod events;

pub use events::{HandlerId, ModuleResolveHandler, ResolveEventArgs, ResolveEventRegistry};

use std::{fmt, sync::Arc};

use crate::{
    engine::{AssemblyHandle, Engine},
    metadata::{
        customattributes::{self, AttributeSubject, CustomAttributeValue, CustomAttributeValueRc},
        identity::{self, AssemblyName, AssemblyVersion, DecodeOptions},
        module::ModuleRc,
        resources::{resource_name, ManifestResourceInfo, ResourceStream},
        typesystem::{MethodRef, TypeRef},
    },
    Error, Result,
};

/// A loaded assembly, as seen through its runtime engine.
///
/// Holds a non-owning handle to the engine's assembly and the assembly's module-resolve
/// subscribers. All queries go to the engine; once the engine unloads the assembly they fail
/// with [`Error::StaleHandle`].
pub struct RuntimeAssembly {
    handle: AssemblyHandle,
    engine: Arc<dyn Engine>,
    resolve_events: ResolveEventRegistry,
}

impl RuntimeAssembly {
    /// Wraps the engine assembly identified by `handle`.
    pub fn new(engine: Arc<dyn Engine>, handle: AssemblyHandle) -> Self {
        RuntimeAssembly {
            handle,
            engine,
            resolve_events: ResolveEventRegistry::new(),
        }
    }

    /// The engine handle of this assembly.
    #[must_use]
    pub fn handle(&self) -> AssemblyHandle {
        self.handle
    }

    /// The engine answering this assembly's queries.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Simple name of the assembly, e.g. `"System.Core"`.
    ///
    /// # Errors
    /// See [`RuntimeAssembly::get_name`].
    pub fn name(&self) -> Result<String> {
        Ok(self.get_name()?.name)
    }

    /// Display name, e.g. `"App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"`.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn full_name(&self) -> Result<String> {
        self.engine.full_name(self.handle)
    }

    /// Location the assembly was originally loaded from, as a URI.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn code_base(&self) -> Result<Option<String>> {
        self.engine.code_base(self.handle, false)
    }

    /// [`RuntimeAssembly::code_base`], URI-escaped.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn escaped_code_base(&self) -> Result<Option<String>> {
        self.engine.code_base(self.handle, true)
    }

    /// Path of the loaded file, empty for assemblies loaded from memory.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn location(&self) -> Result<String> {
        self.engine.location(self.handle)
    }

    /// Runtime version the image was built against, e.g. `"v4.0.30319"`.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn image_runtime_version(&self) -> Result<String> {
        self.engine.image_runtime_version(self.handle)
    }

    /// The method run when the assembly is executed, `None` for libraries.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn entry_point(&self) -> Result<Option<MethodRef>> {
        self.engine.entry_point(self.handle)
    }

    /// Always `false`: runtime assemblies are loaded for execution.
    #[must_use]
    pub const fn reflection_only(&self) -> bool {
        false
    }

    /// Always `false`: there is no global assembly cache.
    #[must_use]
    pub const fn global_assembly_cache(&self) -> bool {
        false
    }

    /// Always `0`.
    #[must_use]
    pub const fn host_context(&self) -> i64 {
        0
    }

    /// Always `false`: assemblies are never unloaded while a facade can observe them.
    #[must_use]
    pub const fn is_collectible(&self) -> bool {
        false
    }

    /// The module holding the assembly manifest.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn manifest_module(&self) -> Result<ModuleRc> {
        self.engine.manifest_module(self.handle)
    }

    /// Names of all manifest resources.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_manifest_resource_names(&self) -> Result<Vec<String>> {
        self.engine.manifest_resource_names(self.handle)
    }

    /// Publicly visible types.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_exported_types(&self) -> Result<Vec<TypeRef>> {
        self.engine.exported_types(self.handle)
    }

    /// Describes a manifest resource, `None` if there is no resource called `name`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty name, [`Error::StaleHandle`] if the assembly
    /// was unloaded.
    pub fn get_manifest_resource_info(&self, name: &str) -> Result<Option<ManifestResourceInfo>> {
        require(name, "resourceName")?;

        let mut info = ManifestResourceInfo::new(name);
        if self.engine.manifest_resource_info(self.handle, name, &mut info)? {
            Ok(Some(info))
        } else {
            log::trace!("no manifest resource info for '{}'", name);
            Ok(None)
        }
    }

    /// Opens a bounded view over a manifest resource, `None` if there is no resource called
    /// `name`.
    ///
    /// The stream keeps the resource's module alive until it is released or dropped.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty name, [`Error::StaleHandle`] if the assembly
    /// was unloaded.
    pub fn get_manifest_resource_stream(&self, name: &str) -> Result<Option<ResourceStream>> {
        require(name, "name")?;

        match self.engine.manifest_resource(self.handle, name)? {
            Some(raw) => Ok(Some(ResourceStream::acquire(raw))),
            None => {
                log::trace!("no manifest resource named '{}'", name);
                Ok(None)
            }
        }
    }

    /// Opens a manifest resource whose name is scoped by the namespace of `scope`.
    ///
    /// With `scope` in namespace `App` and `name` `"app.png"` the resource `"App.app.png"`
    /// is opened. Either part may be missing, but not both.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for `type` if both are `None` or `scope` has no namespace
    /// and `name` is `None`, for `name` if `name` is empty. [`Error::StaleHandle`] if the
    /// assembly was unloaded.
    pub fn get_manifest_resource_stream_for(
        &self,
        scope: Option<&TypeRef>,
        name: Option<&str>,
    ) -> Result<Option<ResourceStream>> {
        let name = resource_name(scope, name)?;
        self.get_manifest_resource_stream(&name)
    }

    /// Modules of the assembly in engine order, resource modules only if requested.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_modules(&self, include_resource: bool) -> Result<Vec<ModuleRc>> {
        let mut modules = self.engine.modules(self.handle)?;
        if !include_resource {
            modules.retain(|module| !module.is_resource());
        }
        Ok(modules)
    }

    /// Modules the engine has loaded. Every module of a runtime assembly is loaded, so this
    /// matches [`RuntimeAssembly::get_modules`].
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_loaded_modules(&self, include_resource: bool) -> Result<Vec<ModuleRc>> {
        self.get_modules(include_resource)
    }

    /// The module whose scope name is `name`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty name, [`Error::StaleHandle`] if the assembly
    /// was unloaded.
    pub fn get_module(&self, name: &str) -> Result<Option<ModuleRc>> {
        require(name, "name")?;

        Ok(self
            .engine
            .modules(self.handle)?
            .into_iter()
            .find(|module| module.scope_name == name))
    }

    /// The identity of this assembly, public key and code base included.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded, [`Error::DecodeFailure`] if the
    /// engine's name record is malformed.
    pub fn get_name(&self) -> Result<AssemblyName> {
        let record = self.engine.assembly_name(self.handle)?;
        // SAFETY: the record was just handed out by the engine and is freed exactly once by
        // `decode_single`.
        let mut name =
            unsafe { identity::decode_single(&*self.engine, record, DecodeOptions::identity()) }?;
        name.code_base = self.engine.code_base(self.handle, false)?;
        Ok(name)
    }

    /// Looks up a type by its full name.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty name, [`Error::TypeNotFound`] if the type is
    /// missing and `throw_on_error` is set, [`Error::StaleHandle`] if the assembly was
    /// unloaded.
    pub fn get_type(
        &self,
        name: &str,
        throw_on_error: bool,
        ignore_case: bool,
    ) -> Result<Option<TypeRef>> {
        require(name, "name")?;

        match self.engine.find_type(self.handle, name, ignore_case)? {
            Some(found) => Ok(Some(found)),
            None if throw_on_error => Err(Error::TypeNotFound(name.to_string())),
            None => Ok(None),
        }
    }

    /// Names of all referenced assemblies, in engine order.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded, [`Error::DecodeFailure`] if any
    /// record is malformed. No partial list is returned.
    pub fn get_referenced_assemblies(&self) -> Result<Vec<AssemblyName>> {
        identity::marshal_all(&*self.engine, self.handle, DecodeOptions::referenced())
    }

    /// Whether an attribute of type `attribute_type` is applied to the assembly.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn is_defined(&self, attribute_type: &TypeRef, inherit: bool) -> Result<bool> {
        customattributes::is_defined(&*self.engine, self.subject(), attribute_type, inherit)
    }

    /// All custom attributes applied to the assembly.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_custom_attributes(&self, inherit: bool) -> Result<Vec<CustomAttributeValueRc>> {
        customattributes::get_custom_attributes(&*self.engine, self.subject(), inherit)
    }

    /// Custom attributes of type `attribute_type` applied to the assembly.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_custom_attributes_of(
        &self,
        attribute_type: &TypeRef,
        inherit: bool,
    ) -> Result<Vec<CustomAttributeValueRc>> {
        customattributes::get_custom_attributes_of(
            &*self.engine,
            self.subject(),
            attribute_type,
            inherit,
        )
    }

    /// Owned copies of the custom attributes declared on the assembly.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the assembly was unloaded.
    pub fn get_custom_attributes_data(&self) -> Result<Vec<CustomAttributeValue>> {
        customattributes::get_custom_attributes_data(&*self.engine, self.subject())
    }

    /// Subscribes `handler` to module-resolve failures of this assembly.
    pub fn add_module_resolve(&self, handler: ModuleResolveHandler) -> HandlerId {
        self.resolve_events.add(handler)
    }

    /// Unsubscribes a handler. Returns `false` if it was not subscribed.
    pub fn remove_module_resolve(&self, id: HandlerId) -> bool {
        self.resolve_events.remove(id)
    }

    /// The subscribers, for the engine to notify.
    #[must_use]
    pub fn resolve_events(&self) -> &ResolveEventRegistry {
        &self.resolve_events
    }

    /// Not supported.
    ///
    /// # Errors
    /// Always [`Error::NotSupported`].
    pub fn get_forwarded_types(&self) -> Result<Vec<TypeRef>> {
        Err(Error::NotSupported)
    }

    /// Not supported.
    ///
    /// # Errors
    /// Always [`Error::NotSupported`].
    pub fn get_satellite_assembly(&self, _culture: &str) -> Result<RuntimeAssembly> {
        Err(Error::NotSupported)
    }

    /// Not supported.
    ///
    /// # Errors
    /// Always [`Error::NotSupported`].
    pub fn get_satellite_assembly_version(
        &self,
        _culture: &str,
        _version: Option<AssemblyVersion>,
    ) -> Result<RuntimeAssembly> {
        Err(Error::NotSupported)
    }

    /// Not supported.
    ///
    /// # Errors
    /// Always [`Error::NotSupported`].
    pub fn get_file(&self, _name: &str) -> Result<ResourceStream> {
        Err(Error::NotSupported)
    }

    /// Not supported.
    ///
    /// # Errors
    /// Always [`Error::NotSupported`].
    pub fn get_files(&self, _include_resource_modules: bool) -> Result<Vec<ResourceStream>> {
        Err(Error::NotSupported)
    }

    /// Not supported.
    ///
    /// # Errors
    /// Always [`Error::NotSupported`].
    pub fn load_module(&self, _name: &str, _raw_module: &[u8]) -> Result<ModuleRc> {
        Err(Error::NotSupported)
    }

    fn subject(&self) -> AttributeSubject {
        AttributeSubject::Assembly(self.handle)
    }
}

impl fmt::Debug for RuntimeAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeAssembly")
            .field("handle", &self.handle)
            .field("resolve_events", &self.resolve_events)
            .finish_non_exhaustive()
    }
}

fn require(value: &str, name: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::empty_argument(name));
    }
    Ok(())
}
