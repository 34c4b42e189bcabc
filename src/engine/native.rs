//! Native layouts shared with the engine.
//!
//! These types mirror what the engine allocates. They are never decoded in place by callers;
//! [`crate::metadata::identity::marshal`] copies them into owned values and hands the native
//! memory back to the engine.

use std::{os::raw::c_char, ptr, ptr::NonNull};

/// Size of [`NativeAssemblyName::public_key_token`]: 16 ASCII hex digits and a NUL.
pub const PUBLIC_KEY_TOKEN_LEN: usize = 17;

/// Fixed-size engine record describing one assembly name.
///
/// Owned by the engine. String pointers are NUL-terminated UTF-8, `public_key` points to a
/// compressed-length-prefixed blob. Any pointer may be null when the engine did not populate
/// the field. Version components are stored widened to `u32` and must fit into `u16`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeAssemblyName {
    /// Simple name, required
    pub name: *const c_char,
    /// Culture name, null for culture neutral
    pub culture: *const c_char,
    /// Hash of the referenced file, opaque to this crate
    pub hash_value: *const c_char,
    /// Public key blob
    pub public_key: *const u8,
    /// Public key token as lowercase/uppercase hex, first byte `0` when absent
    pub public_key_token: [u8; PUBLIC_KEY_TOKEN_LEN],
    /// Hash algorithm identifier
    pub hash_alg: u32,
    /// Length of `hash_value`
    pub hash_len: u32,
    /// `AssemblyNameFlags` bits
    pub flags: u32,
    /// Major version component
    pub major: u32,
    /// Minor version component
    pub minor: u32,
    /// Build version component
    pub build: u32,
    /// Revision version component
    pub revision: u32,
    /// Runtime processor architecture code, `0` when unspecified
    pub arch: u32,
}

impl Default for NativeAssemblyName {
    fn default() -> Self {
        NativeAssemblyName {
            name: ptr::null(),
            culture: ptr::null(),
            hash_value: ptr::null(),
            public_key: ptr::null(),
            public_key_token: [0; PUBLIC_KEY_TOKEN_LEN],
            hash_alg: 0,
            hash_len: 0,
            flags: 0,
            major: 0,
            minor: 0,
            build: 0,
            revision: 0,
            arch: 0,
        }
    }
}

/// Engine-owned array of pointers to [`NativeAssemblyName`] records.
///
/// Deliberately neither `Clone` nor `Copy`: the array is handed back to the engine exactly
/// once, by value, through [`crate::Engine::free_name_array`].
#[derive(Debug)]
pub struct NativeNameArray {
    pdata: *mut *mut NativeAssemblyName,
    len: usize,
}

impl NativeNameArray {
    /// An array with no records and no storage.
    #[must_use]
    pub const fn empty() -> Self {
        NativeNameArray {
            pdata: ptr::null_mut(),
            len: 0,
        }
    }

    /// Wraps an engine-allocated array.
    ///
    /// # Safety
    ///
    /// `pdata` must be valid for reads of `len` pointers until the array is passed to
    /// [`crate::Engine::free_name_array`]. It may only be null if `len` is `0`. Every non-null
    /// entry must point to a record that stays valid until it is freed.
    #[must_use]
    pub const unsafe fn from_raw_parts(pdata: *mut *mut NativeAssemblyName, len: usize) -> Self {
        NativeNameArray { pdata, len }
    }

    /// Number of entries, null entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The record at `index`, or `None` if `index` is out of range or the entry is null.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<NonNull<NativeAssemblyName>> {
        if index >= self.len {
            return None;
        }

        // SAFETY: `index < len` and `from_raw_parts` guarantees `len` readable entries.
        NonNull::new(unsafe { *self.pdata.add(index) })
    }

    /// Raw pointer to the entry storage, for the engine to release.
    #[must_use]
    pub fn as_mut_ptr(&self) -> *mut *mut NativeAssemblyName {
        self.pdata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_array_has_no_records() {
        let array = NativeNameArray::empty();
        assert!(array.is_empty());
        assert!(array.get(0).is_none());
        assert!(array.as_mut_ptr().is_null());
    }

    #[test]
    fn get_skips_null_entries_and_bounds() {
        let mut record = NativeAssemblyName::default();
        let mut entries: Vec<*mut NativeAssemblyName> = vec![&mut record, ptr::null_mut()];
        let array = unsafe { NativeNameArray::from_raw_parts(entries.as_mut_ptr(), 2) };

        assert_eq!(array.len(), 2);
        assert!(array.get(0).is_some());
        assert!(array.get(1).is_none());
        assert!(array.get(2).is_none());
    }
}
