//! Manifest resources.
//!
//! Resource lookups come in two shapes: [`ManifestResourceInfo`] describes where a resource
//! lives without touching its bytes, [`ResourceStream`] is a bounded view over the bytes
//! themselves. Both are produced by [`crate::RuntimeAssembly`].

mod stream;

pub use stream::{RawResource, ResourceStream};

use bitflags::bitflags;

use crate::{
    engine::AssemblyHandle,
    metadata::{
        module::ModuleRc,
        typesystem::{TypeRef, DELIMITER},
    },
    Error, Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Where a manifest resource is stored
    pub struct ResourceLocation : u32 {
        /// The resource is embedded in the manifest module
        const EMBEDDED = 0x0001;
        /// The resource lives in another assembly
        const CONTAINED_IN_ANOTHER_ASSEMBLY = 0x0002;
        /// The resource is stored in the file holding the manifest
        const CONTAINED_IN_MANIFEST_FILE = 0x0004;
    }
}

/// Description of a manifest resource, without its data.
#[derive(Debug, Clone, Default)]
pub struct ManifestResourceInfo {
    /// Name the resource was looked up with
    pub name: String,
    /// Length of the resource data in bytes, `0` if not known to the engine
    pub length: usize,
    /// Module holding the resource data, if it is part of this assembly
    pub module: Option<ModuleRc>,
    /// File containing the resource, for resources linked from a separate file
    pub file_name: Option<String>,
    /// Assembly containing the resource, for resources forwarded to another assembly
    pub referenced_assembly: Option<AssemblyHandle>,
    /// Storage flags
    pub location: ResourceLocation,
}

impl ManifestResourceInfo {
    /// An empty description for `name`, to be filled in by the engine.
    pub fn new(name: impl Into<String>) -> Self {
        ManifestResourceInfo {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builds the lookup name for a resource scoped by a type's namespace.
///
/// `namespace.name` if both are present, otherwise whichever part is present. An empty
/// namespace counts as absent.
///
/// # Errors
/// [`crate::Error::InvalidArgument`] for the `type` parameter if neither a type nor a name
/// is given, or if the type has no namespace and no name is given. An empty `name` is
/// reported for the `name` parameter.
pub fn resource_name(scope: Option<&TypeRef>, name: Option<&str>) -> Result<String> {
    if scope.is_none() && name.is_none() {
        return Err(Error::InvalidArgument {
            name: "type",
            message: "Either a type or a resource name is required.",
        });
    }

    if name == Some("") {
        return Err(Error::empty_argument("name"));
    }

    let namespace = scope
        .and_then(|scope| scope.namespace.as_deref())
        .filter(|namespace| !namespace.is_empty());

    match (namespace, name) {
        (Some(namespace), Some(name)) => Ok(format!("{}{}{}", namespace, DELIMITER, name)),
        (Some(namespace), None) => Ok(namespace.to_string()),
        (None, Some(name)) => Ok(name.to_string()),
        (None, None) => Err(Error::InvalidArgument {
            name: "type",
            message: "The type is in the global namespace and no resource name was given.",
        }),
    }
}
