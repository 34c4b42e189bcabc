// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'metadata/resources/stream.rs' reads engine-owned resource memory
// - 'metadata/identity/marshal.rs' reads and frees engine-allocated name records

//! # rtassembly
//!
//! A safe facade over .NET assemblies that are loaded and owned by a runtime engine.
//!
//! The engine does the heavy lifting (loading, metadata parsing, type resolution) and
//! answers queries through the [`Engine`] trait with raw answers: pointers into module
//! memory, native name records, opaque handles. This crate turns those answers into safe,
//! owned values:
//!
//! - **Resource streams** - [`ResourceStream`] is a bounded, seekable view over engine-owned
//!   resource memory that keeps the owning [`Module`] alive and releases it exactly once
//! - **Referenced assemblies** - native name record arrays are decoded into owned
//!   [`AssemblyName`]s, with every record and the array handed back to the engine on every
//!   exit path
//! - **Assembly facade** - [`RuntimeAssembly`] validates arguments, forwards identity, module,
//!   type and custom attribute queries, and holds module-resolve subscribers
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rtassembly::prelude::*;
//!
//! let assembly = RuntimeAssembly::new(engine, AssemblyHandle::new(raw_handle));
//!
//! println!("{}", assembly.full_name()?);
//! for name in assembly.get_manifest_resource_names()? {
//!     if let Some(stream) = assembly.get_manifest_resource_stream(&name)? {
//!         println!("{}: {} bytes", name, stream.len());
//!     }
//! }
//! # Ok::<(), rtassembly::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`Result`]. Argument errors are raised before the engine
//! is called, engine errors are passed through unchanged, and decode errors are raised only
//! after all native memory involved has been released.
//!
//! # Logging
//!
//! Diagnostics go through the [`log`] facade. The crate never installs a logger.

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Backing storage for module images and a parser for compressed metadata integers.
pub mod file;

/// The runtime engine collaborator interface and its native record layouts.
pub mod engine;

/// Identities, resources, modules and custom attributes of a runtime assembly.
pub mod metadata;

/// The [`RuntimeAssembly`] facade and its module-resolve subscribers.
pub mod assembly;

/// `rtassembly` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `rtassembly` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// The assembly facade and its event types.
pub use assembly::{HandlerId, ModuleResolveHandler, ResolveEventArgs, RuntimeAssembly};

/// The engine interface.
pub use engine::{AssemblyHandle, Engine};

/// Owned metadata values.
pub use metadata::{
    identity::{AssemblyName, AssemblyVersion, DecodeOptions},
    module::{Module, ModuleRc},
    resources::{ManifestResourceInfo, RawResource, ResourceStream},
};

/// Module image backends.
pub use file::{parser::Parser, Backend};
