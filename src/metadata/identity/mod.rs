//! Assembly identities.
//!
//! [`AssemblyName`] is the owned, safe form of an assembly's identity. Names reach this crate
//! as engine-allocated native records; [`marshal_all`] and [`decode_single`] copy them into
//! [`AssemblyName`] values and return the native memory to the engine.

mod assembly;
pub mod marshal;

pub use assembly::{
    AssemblyName, AssemblyNameFlags, AssemblyVersion, ProcessorArchitecture, PUBLIC_KEY_TOKEN_SIZE,
};
pub use marshal::{decode_name, decode_single, marshal_all, DecodeOptions};
