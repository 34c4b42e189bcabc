//! Marshaling of engine-owned assembly name records.
//!
//! The engine returns referenced assembly names as an array of pointers to fixed-size
//! [`NativeAssemblyName`] records, each owning further native buffers. This module copies
//! them into owned [`AssemblyName`] values and hands every record, and then the array, back
//! to the engine exactly once.
//!
//! # Cleanup discipline
//!
//! Acquire the array, decode every record into a separate buffer, release everything.
//! The release step lives in a `Drop` guard, so it runs whether decoding succeeded, returned
//! early with an error, or unwound. A failure in record `k` therefore still frees all `n`
//! records before the error reaches the caller, and no partial result is ever returned.

use std::{ffi::CStr, mem, os::raw::c_char, ptr::NonNull, slice};

use crate::{
    engine::{AssemblyHandle, Engine, NativeAssemblyName, NativeNameArray, PUBLIC_KEY_TOKEN_LEN},
    file::parser::{compressed_uint_len, Parser},
    metadata::identity::{
        AssemblyName, AssemblyNameFlags, AssemblyVersion, ProcessorArchitecture,
        PUBLIC_KEY_TOKEN_SIZE,
    },
    Result,
};

/// Controls how fields the engine left empty are filled in while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DecodeOptions {
    /// Copy the version components into [`AssemblyName::version`]
    pub add_version: bool,
    /// Decode the public key blob; an absent key becomes an empty one
    pub add_public_key: bool,
    /// Substitute an empty token when the record carries none
    pub default_token: bool,
    /// Mark the decoded name as coming from a reference
    pub by_reference: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::referenced()
    }
}

impl DecodeOptions {
    /// Options for names of referenced assemblies.
    ///
    /// Versions are kept, public keys are omitted, a missing token becomes an explicit empty
    /// token, and names are flagged as references.
    #[must_use]
    pub const fn referenced() -> Self {
        Self {
            add_version: true,
            add_public_key: false,
            default_token: true,
            by_reference: true,
        }
    }

    /// Options for an assembly's own name.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            add_version: true,
            add_public_key: true,
            default_token: true,
            by_reference: false,
        }
    }
}

/// Decodes every referenced assembly name of `assembly`, in engine order.
///
/// # Errors
/// Any engine error from the array query, or [`crate::Error::DecodeFailure`] if a record is
/// null or malformed. In the failure case every record and the array have already been
/// released when the error is returned.
pub fn marshal_all(
    engine: &dyn Engine,
    assembly: AssemblyHandle,
    options: DecodeOptions,
) -> Result<Vec<AssemblyName>> {
    let guard = NameArrayGuard {
        engine,
        array: engine.referenced_assemblies(assembly)?,
    };
    log::debug!(
        "marshaling {} referenced assembly names of {:?}",
        guard.array.len(),
        assembly
    );

    let result = decode_all(&guard.array, options);
    drop(guard);

    if let Err(error) = &result {
        log::warn!("referenced assemblies of {:?}: {}", assembly, error);
    }
    result
}

/// Decodes a single engine-allocated record and hands it back to the engine.
///
/// The record is freed (structure included) even if decoding fails.
///
/// # Safety
///
/// `record` must come from `engine`, be valid, and not have been freed yet. Ownership
/// passes to this function.
///
/// # Errors
/// [`crate::Error::DecodeFailure`] if the record is malformed.
pub unsafe fn decode_single(
    engine: &dyn Engine,
    record: NonNull<NativeAssemblyName>,
    options: DecodeOptions,
) -> Result<AssemblyName> {
    let guard = NameGuard { engine, record };
    // SAFETY: guaranteed valid by the caller; freed only when `guard` drops below.
    let result = unsafe { decode_name(guard.record.as_ref(), options) };
    drop(guard);

    if let Err(error) = &result {
        log::warn!("assembly name record: {}", error);
    }
    result
}

/// Copies one native record into an owned [`AssemblyName`].
///
/// The record is not freed.
///
/// # Safety
///
/// Every non-null pointer in `record` must point to a NUL-terminated string (`name`,
/// `culture`) or a complete compressed-length blob (`public_key`) that stays valid for the
/// duration of the call.
///
/// # Errors
/// [`crate::Error::DecodeFailure`] if the name is missing, a string is not UTF-8, a version
/// component exceeds `u16`, the token is not hexadecimal, the architecture code is unknown,
/// or the public key blob has an invalid header.
pub unsafe fn decode_name(
    record: &NativeAssemblyName,
    options: DecodeOptions,
) -> Result<AssemblyName> {
    // SAFETY: forwarded caller contract for every pointer read below.
    let name = unsafe { c_string(record.name, "name") }?
        .ok_or_else(|| decode_error!("Assembly name record has no name"))?;

    let version =
        AssemblyVersion::from_native(record.major, record.minor, record.build, record.revision)?;

    let culture = unsafe { c_string(record.culture, "culture") }?
        .filter(|culture| !culture.is_empty() && culture != "neutral");

    let mut flags = AssemblyNameFlags::from_bits_retain(record.flags);
    let public_key = if options.add_public_key {
        flags |= AssemblyNameFlags::PUBLIC_KEY;
        if record.public_key.is_null() {
            Some(Vec::new())
        } else {
            Some(unsafe { read_blob(record.public_key) }?)
        }
    } else {
        None
    };

    let public_key_token = match decode_token(&record.public_key_token)? {
        Some(token) => Some(token),
        None if options.default_token => Some(Vec::new()),
        None => None,
    };

    let decoded = AssemblyName {
        name,
        version: options.add_version.then_some(version),
        culture,
        public_key,
        public_key_token,
        flags,
        hash_algorithm: record.hash_alg,
        processor_architecture: ProcessorArchitecture::from_native(record.arch)?,
        code_base: None,
        is_reference: options.by_reference,
    };

    log::trace!("decoded assembly name '{}'", decoded.display_name());
    Ok(decoded)
}

fn decode_all(array: &NativeNameArray, options: DecodeOptions) -> Result<Vec<AssemblyName>> {
    let count = array.len();
    let mut names = Vec::with_capacity(count);

    for index in 0..count {
        let record = array
            .get(index)
            .ok_or_else(|| decode_error!("Native name record {} of {} is null", index, count))?;

        // SAFETY: non-null entries of an engine array are valid until freed by the guard,
        // which outlives this loop.
        names.push(unsafe { decode_name(record.as_ref(), options) }?);
    }

    Ok(names)
}

/// Reads a NUL-terminated UTF-8 string, `None` for a null pointer.
unsafe fn c_string(ptr: *const c_char, field: &str) -> Result<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }

    // SAFETY: non-null and NUL-terminated per the record contract.
    let value = unsafe { CStr::from_ptr(ptr) };
    value
        .to_str()
        .map(|value| Some(value.to_owned()))
        .map_err(|error| decode_error!("Field '{}' is not valid UTF-8: {}", field, error))
}

/// Reads a compressed-length-prefixed blob.
unsafe fn read_blob(ptr: *const u8) -> Result<Vec<u8>> {
    // SAFETY: a non-null blob has at least its first header byte.
    let header_len = compressed_uint_len(unsafe { *ptr })?;
    // SAFETY: the first byte announces `header_len` header bytes.
    let header = unsafe { slice::from_raw_parts(ptr, header_len) };
    let len = Parser::new(header).read_compressed_uint()? as usize;

    // SAFETY: the header announces `len` payload bytes directly after it.
    Ok(unsafe { slice::from_raw_parts(ptr.add(header_len), len) }.to_vec())
}

/// Decodes the hex token, `None` if the first byte is NUL.
fn decode_token(token: &[u8; PUBLIC_KEY_TOKEN_LEN]) -> Result<Option<Vec<u8>>> {
    if token[0] == 0 {
        return Ok(None);
    }

    let digit = |ascii: u8| {
        char::from(ascii)
            .to_digit(16)
            .map(|value| value as u8)
            .ok_or_else(|| decode_error!("Invalid hex digit in public key token: {:#04x}", ascii))
    };

    let mut bytes = Vec::with_capacity(PUBLIC_KEY_TOKEN_SIZE);
    for pair in token[..PUBLIC_KEY_TOKEN_SIZE * 2].chunks_exact(2) {
        bytes.push((digit(pair[0])? << 4) | digit(pair[1])?);
    }

    Ok(Some(bytes))
}

/// Frees every record of an array, then the array itself, when dropped.
struct NameArrayGuard<'e> {
    engine: &'e dyn Engine,
    array: NativeNameArray,
}

impl Drop for NameArrayGuard<'_> {
    fn drop(&mut self) {
        let array = mem::replace(&mut self.array, NativeNameArray::empty());

        let mut freed = 0usize;
        for index in 0..array.len() {
            if let Some(record) = array.get(index) {
                self.engine.free_assembly_name(record, true);
                freed += 1;
            }
        }
        self.engine.free_name_array(array);

        log::trace!("released {} native assembly name records", freed);
    }
}

/// Frees one record when dropped.
struct NameGuard<'e> {
    engine: &'e dyn Engine,
    record: NonNull<NativeAssemblyName>,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        self.engine.free_assembly_name(self.record, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::{
        test::{MockEngine, NameFixture},
        Error,
    };

    const ASSEMBLY: AssemblyHandle = AssemblyHandle::new(1);

    #[test]
    fn preserves_order_and_count() {
        let engine = MockEngine::new()
            .with_reference(NameFixture::new("mscorlib").version(4, 0, 0, 0))
            .with_reference(NameFixture::new("System.Core").version(3, 5, 0, 0))
            .with_reference(NameFixture::new("App.Shared").version(1, 2, 3, 4));

        let names = marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()).unwrap();

        let simple: Vec<&str> = names.iter().map(|name| name.name.as_str()).collect();
        assert_eq!(simple, ["mscorlib", "System.Core", "App.Shared"]);
        assert_eq!(names[2].version, Some(AssemblyVersion::new(1, 2, 3, 4)));
        assert_eq!(engine.record_frees(), 3);
        assert_eq!(engine.array_frees(), 1);
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn empty_array() {
        let engine = MockEngine::new();

        let names = marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()).unwrap();

        assert!(names.is_empty());
        assert_eq!(engine.record_frees(), 0);
        assert_eq!(engine.array_frees(), 1);
    }

    #[test]
    fn malformed_second_record_frees_all_three() {
        let engine = MockEngine::new()
            .with_reference(NameFixture::new("First"))
            .with_reference(NameFixture::new("Second").version(1, 0x1_0000, 0, 0))
            .with_reference(NameFixture::new("Third"));

        let result = marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced());

        assert!(matches!(result, Err(Error::DecodeFailure { .. })));
        assert_eq!(engine.record_frees(), 3);
        assert_eq!(engine.array_frees(), 1);
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn failure_at_any_position_frees_everything() {
        for bad in 0..4 {
            let mut engine = MockEngine::new();
            for index in 0..4 {
                let fixture = NameFixture::new(format!("Ref{}", index));
                engine = engine.with_reference(if index == bad { fixture.arch(99) } else { fixture });
            }

            assert!(marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()).is_err());
            assert_eq!(engine.record_frees(), 4);
            assert_eq!(engine.array_frees(), 1);
        }
    }

    #[test]
    fn null_entry_is_a_decode_failure() {
        let engine = MockEngine::new()
            .with_reference(NameFixture::new("First"))
            .with_null_reference()
            .with_reference(NameFixture::new("Third"));

        assert!(matches!(
            marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()),
            Err(Error::DecodeFailure { .. })
        ));
        assert_eq!(engine.record_frees(), 2);
        assert_eq!(engine.array_frees(), 1);
    }

    #[test]
    fn engine_error_passes_through_without_frees() {
        let engine = MockEngine::new().with_reference(NameFixture::new("First"));
        engine.unload();

        assert!(matches!(
            marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()),
            Err(Error::StaleHandle)
        ));
        assert_eq!(engine.record_frees(), 0);
        assert_eq!(engine.array_frees(), 0);
    }

    #[test]
    fn referenced_defaults() {
        let engine = MockEngine::new()
            .with_reference(NameFixture::new("Plain").version(2, 0, 0, 0))
            .with_reference(
                NameFixture::new("Signed")
                    .token("B77A5C561934E089")
                    .public_key(&[0x00, 0x24, 0x00, 0x00])
                    .culture("neutral"),
            );

        let names = marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()).unwrap();

        let plain = &names[0];
        assert_eq!(plain.version, Some(AssemblyVersion::new(2, 0, 0, 0)));
        assert_eq!(plain.public_key, None);
        assert_eq!(plain.public_key_token, Some(Vec::new()));
        assert!(plain.is_reference);
        assert!(plain.culture.is_none());

        let signed = &names[1];
        assert_eq!(signed.public_key, None);
        assert_eq!(
            signed.public_key_token,
            Some(vec![0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89])
        );
        assert!(!signed.flags.contains(AssemblyNameFlags::PUBLIC_KEY));
        assert!(signed.culture.is_none());
    }

    #[test]
    fn identity_options_decode_public_key() {
        let engine = MockEngine::new()
            .with_reference(NameFixture::new("Keyed").public_key(&[1, 2, 3, 4, 5]))
            .with_reference(NameFixture::new("Keyless").culture("fr-FR").arch(4));

        let names = marshal_all(&engine, ASSEMBLY, DecodeOptions::identity()).unwrap();

        assert_eq!(names[0].public_key, Some(vec![1, 2, 3, 4, 5]));
        assert!(names[0].flags.contains(AssemblyNameFlags::PUBLIC_KEY));
        assert_eq!(names[1].public_key, Some(Vec::new()));
        assert_eq!(names[1].culture.as_deref(), Some("fr-FR"));
        assert_eq!(
            names[1].processor_architecture,
            Some(ProcessorArchitecture::AMD64)
        );
        assert!(!names[1].is_reference);
    }

    #[test]
    fn without_defaults_fields_stay_empty() {
        let options = DecodeOptions {
            add_version: false,
            add_public_key: false,
            default_token: false,
            by_reference: false,
        };
        let engine = MockEngine::new().with_reference(NameFixture::new("Bare").version(1, 0, 0, 0));

        let names = marshal_all(&engine, ASSEMBLY, options).unwrap();

        assert_eq!(names[0].version, None);
        assert_eq!(names[0].public_key_token, None);
        assert_eq!(names[0].display_name(), "Bare, Culture=neutral");
    }

    #[test]
    fn bad_token_digit_is_a_decode_failure() {
        let engine = MockEngine::new().with_reference(NameFixture::new("Bad").token("B77A5C561934E0ZZ"));

        assert!(matches!(
            marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()),
            Err(Error::DecodeFailure { .. })
        ));
        assert_eq!(engine.record_frees(), 1);
    }

    #[test]
    fn missing_name_is_a_decode_failure() {
        let engine = MockEngine::new().with_reference(NameFixture::unnamed());

        assert!(matches!(
            marshal_all(&engine, ASSEMBLY, DecodeOptions::referenced()),
            Err(Error::DecodeFailure { .. })
        ));
        assert_eq!(engine.live_allocations(), 0);
    }

    #[test]
    fn large_public_key_uses_two_byte_header() {
        let key: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let engine = MockEngine::new().with_reference(NameFixture::new("BigKey").public_key(&key));

        let names = marshal_all(&engine, ASSEMBLY, DecodeOptions::identity()).unwrap();

        assert_eq!(names[0].public_key.as_deref(), Some(key.as_slice()));
    }

    struct WarningCapture(Mutex<Vec<String>>);

    impl log::Log for WarningCapture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.0.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: WarningCapture = WarningCapture(Mutex::new(Vec::new()));

    fn capture_warnings() -> &'static WarningCapture {
        let _ = log::set_logger(&WARNINGS);
        log::set_max_level(log::LevelFilter::Warn);
        &WARNINGS
    }

    #[test]
    fn decode_single_frees_and_warns_on_failure() {
        let warnings = capture_warnings();
        let engine = MockEngine::new().with_own_name(NameFixture::new("Own").arch(42));
        let record = engine.assembly_name(ASSEMBLY).unwrap();

        let result = unsafe { decode_single(&engine, record, DecodeOptions::identity()) };

        let Err(error) = result else {
            panic!("architecture code 42 must not decode");
        };
        assert_eq!(engine.record_frees(), 1);
        assert_eq!(engine.live_allocations(), 0);

        let expected = format!("assembly name record: {}", error);
        assert!(warnings.0.lock().unwrap().contains(&expected));
    }

    #[test]
    fn default_options_are_the_referenced_preset() {
        assert_eq!(DecodeOptions::default(), DecodeOptions::referenced());
        assert!(!DecodeOptions::referenced().add_public_key);
        assert!(DecodeOptions::identity().add_public_key);
    }
}
