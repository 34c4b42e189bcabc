//! Owned representations of the metadata a runtime assembly exposes.
//!
//! # Key Components
//!
//! - [`identity`] - Assembly names and the marshaler for engine-allocated name records
//! - [`resources`] - Manifest resource descriptions and bounded resource streams
//! - [`module`] - Modules and their liveness
//! - [`customattributes`] - Custom attribute values and queries
//! - [`typesystem`] - Type references

/// Custom attribute values and queries
pub mod customattributes;
/// Assembly identities and native name marshaling
pub mod identity;
/// Modules of a loaded assembly
pub mod module;
/// Manifest resources
pub mod resources;
/// Type references
pub mod typesystem;
