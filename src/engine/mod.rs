//! The runtime engine collaborator surface.
//!
//! The engine loads modules, parses metadata and resolves references. None of that happens
//! in this crate: [`crate::RuntimeAssembly`] only issues the queries defined by [`Engine`]
//! and turns the raw answers (pointers, lengths, native record arrays) into safe values.
//!
//! # Contract
//!
//! - Every query fails with [`crate::Error::StaleHandle`] once the assembly is unloaded.
//! - Memory behind a [`crate::RawResource`] stays valid for as long as its owning
//!   [`crate::Module`] is alive. Only the module is reference counted, never the pointer.
//! - Native name records returned by [`Engine::assembly_name`] and
//!   [`Engine::referenced_assemblies`] stay valid until handed back to
//!   [`Engine::free_assembly_name`]. Arrays stay valid until passed to
//!   [`Engine::free_name_array`]. The crate hands every record and array back exactly once.
//! - Individual calls are thread-safe. The crate never holds a lock while calling in.

mod native;

pub use native::{NativeAssemblyName, NativeNameArray, PUBLIC_KEY_TOKEN_LEN};

use std::{fmt, ptr::NonNull};

use crate::{
    metadata::{
        customattributes::{AttributeSubject, CustomAttributeValueRc},
        module::ModuleRc,
        resources::{ManifestResourceInfo, RawResource},
        typesystem::{MethodRef, TypeRef},
    },
    Result,
};

/// Opaque, non-owning handle to an engine-owned loaded assembly.
///
/// The value is whatever the engine uses to identify the assembly (an address, a slot
/// index, ...). The crate never interprets it, it is only passed back to the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssemblyHandle(usize);

impl AssemblyHandle {
    /// Wraps an engine-specific assembly identifier.
    #[must_use]
    pub const fn new(value: usize) -> Self {
        AssemblyHandle(value)
    }

    /// The raw engine-specific identifier.
    #[must_use]
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for AssemblyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssemblyHandle(0x{:X})", self.0)
    }
}

/// Queries a runtime engine answers on behalf of a [`crate::RuntimeAssembly`].
///
/// Implementations must be object safe and thread-safe. Methods receive validated
/// arguments only, since the facade rejects empty names before calling in.
pub trait Engine: Send + Sync {
    /// Display name of the assembly, e.g. `"App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"`.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn full_name(&self, assembly: AssemblyHandle) -> Result<String>;

    /// Location the assembly was originally loaded from, as a URI, optionally escaped.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn code_base(&self, assembly: AssemblyHandle, escaped: bool) -> Result<Option<String>>;

    /// Path of the loaded file, empty if the assembly was loaded from memory.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn location(&self, assembly: AssemblyHandle) -> Result<String>;

    /// Runtime version recorded in the image, e.g. `"v4.0.30319"`.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn image_runtime_version(&self, assembly: AssemblyHandle) -> Result<String>;

    /// Names of all manifest resources.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn manifest_resource_names(&self, assembly: AssemblyHandle) -> Result<Vec<String>>;

    /// Method executed when the assembly is run, `None` for libraries.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn entry_point(&self, assembly: AssemblyHandle) -> Result<Option<MethodRef>>;

    /// Publicly visible types.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn exported_types(&self, assembly: AssemblyHandle) -> Result<Vec<TypeRef>>;

    /// Looks a type up by its full name.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn find_type(
        &self,
        assembly: AssemblyHandle,
        name: &str,
        ignore_case: bool,
    ) -> Result<Option<TypeRef>>;

    /// Locates the raw bytes of a manifest resource.
    ///
    /// Returns `None` when no resource with that name exists.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn manifest_resource(&self, assembly: AssemblyHandle, name: &str)
        -> Result<Option<RawResource>>;

    /// Fills `info` with the description of a manifest resource.
    ///
    /// Returns `false` (leaving `info` untouched) when no resource with that name exists.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn manifest_resource_info(
        &self,
        assembly: AssemblyHandle,
        name: &str,
        info: &mut ManifestResourceInfo,
    ) -> Result<bool>;

    /// The module holding the assembly manifest.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn manifest_module(&self, assembly: AssemblyHandle) -> Result<ModuleRc>;

    /// All modules of the assembly, resource modules included, in engine order.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn modules(&self, assembly: AssemblyHandle) -> Result<Vec<ModuleRc>>;

    /// The assembly's own name as a freshly allocated native record.
    ///
    /// Ownership passes to the caller, who must return it through
    /// [`Engine::free_assembly_name`] with `free_struct` set.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn assembly_name(&self, assembly: AssemblyHandle) -> Result<NonNull<NativeAssemblyName>>;

    /// Names of all referenced assemblies as a freshly allocated native array.
    ///
    /// Ownership passes to the caller, who must return every record through
    /// [`Engine::free_assembly_name`] and the array through [`Engine::free_name_array`].
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the assembly was unloaded.
    fn referenced_assemblies(&self, assembly: AssemblyHandle) -> Result<NativeNameArray>;

    /// Releases the buffers referenced by `record` and, if `free_struct` is set, the record.
    ///
    /// Called exactly once per record obtained from the engine.
    fn free_assembly_name(&self, record: NonNull<NativeAssemblyName>, free_struct: bool);

    /// Releases the storage of a name array. Records must already have been freed.
    fn free_name_array(&self, array: NativeNameArray);

    /// Custom attributes applied to `subject`, optionally filtered by attribute type.
    ///
    /// # Errors
    /// [`crate::Error::StaleHandle`] if the subject's assembly was unloaded.
    fn custom_attributes(
        &self,
        subject: AttributeSubject,
        filter: Option<&TypeRef>,
        inherit: bool,
    ) -> Result<Vec<CustomAttributeValueRc>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_roundtrips_value() {
        let handle = AssemblyHandle::new(0x7F00_1000);
        assert_eq!(handle.value(), 0x7F00_1000);
        assert_eq!(format!("{:?}", handle), "AssemblyHandle(0x7F001000)");
        assert_eq!(handle, AssemblyHandle::new(0x7F00_1000));
    }
}
