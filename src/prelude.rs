//! # rtassembly Prelude
//!
//! The most commonly used types and traits. `use rtassembly::prelude::*;` is enough to
//! implement an engine and query assemblies through it.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all rtassembly operations
pub use crate::Error;

/// The result type used throughout rtassembly
pub use crate::Result;

// ================================================================================================
// Facade and Engine
// ================================================================================================

/// The assembly facade and module-resolve subscribers
pub use crate::assembly::{
    HandlerId, ModuleResolveHandler, ResolveEventArgs, ResolveEventRegistry, RuntimeAssembly,
};

/// The engine interface and native record layouts
pub use crate::engine::{AssemblyHandle, Engine, NativeAssemblyName, NativeNameArray};

// ================================================================================================
// Metadata
// ================================================================================================

/// Assembly identities
pub use crate::metadata::identity::{
    AssemblyName, AssemblyNameFlags, AssemblyVersion, DecodeOptions, ProcessorArchitecture,
};

/// Modules
pub use crate::metadata::module::{Module, ModuleRc};

/// Manifest resources
pub use crate::metadata::resources::{
    ManifestResourceInfo, RawResource, ResourceLocation, ResourceStream,
};

/// Custom attributes
pub use crate::metadata::customattributes::{
    AttributeSubject, CustomAttributeArgument, CustomAttributeNamedArgument,
    CustomAttributeValue, CustomAttributeValueRc,
};

/// Type and method references
pub use crate::metadata::typesystem::{MethodRef, TypeRef};

// ================================================================================================
// Module Images
// ================================================================================================

/// Image backends
pub use crate::file::{Backend, Memory};
