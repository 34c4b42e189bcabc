//! Module image backends.
//!
//! The engine owns the memory that resource views point into. When the engine is itself
//! written in Rust (or wants the crate to manage the mapping), a [`crate::Module`] can carry
//! its image as a [`Backend`], and [`crate::RawResource::from_module_image`] then derives
//! resource pointers from memory that provably lives as long as the module.
//!
//! # Key Components
//!
//! - [`Backend`] - Read-only, bounds-checked access to an image
//! - [`Memory`] - Image held in an owned buffer
//! - [`parser::Parser`] - Cursor used to decode blobs handed out by the engine

pub mod parser;

mod memory;

pub use memory::Memory;

use crate::Result;

/// Backend trait for module image data sources.
///
/// This trait abstracts over where the bytes of a module image live, allowing engines to
/// attach whatever storage they keep images in. All implementations must be thread-safe,
/// and the slice returned by [`Backend::data`] must stay at the same address for as long as
/// the backend is alive, since resource views keep raw pointers into it.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the image.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(crate::Error::OutOfBounds);
        };

        self.data()
            .get(offset..offset_end)
            .ok_or(crate::Error::OutOfBounds)
    }

    /// Returns the entire image.
    fn data(&self) -> &[u8];

    /// Returns the total length of the image.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the image holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("len", &self.len()).finish()
    }
}
