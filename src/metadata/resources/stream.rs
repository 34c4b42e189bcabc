//! Bounded views over engine-owned resource memory.
//!
//! The engine hands out a resource as a bare pointer and length. The pointer itself is not
//! reference counted, only the module it points into is. [`ResourceStream`] therefore pairs
//! the byte range with a strong reference to the owning [`Module`], and gives both up
//! together, exactly once, on [`ResourceStream::release`] or drop.
//!
//! # Access rules
//!
//! - Reads are confined to `[pointer, pointer + length)`; ranged reads past the end fail with
//!   [`crate::Error::OutOfBounds`].
//! - After release every access fails with [`crate::Error::UseAfterRelease`], including a
//!   second release.
//! - Reads take `&self` and release takes `&mut self`, so a view can never be read while it
//!   is being released. Release may happen on any thread that owns the view.

use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom},
    ptr::NonNull,
    slice,
};

use crate::{
    metadata::module::{Module, ModuleRc},
    Error, Result,
};

/// A raw resource location returned by the engine: pointer, length and owning module.
///
/// Producing one is the engine's promise that `len` bytes starting at the pointer stay
/// readable for as long as `module` is alive.
pub struct RawResource {
    data: NonNull<u8>,
    len: usize,
    module: ModuleRc,
}

// SAFETY: the bytes are read-only and kept alive by `module`, which is itself Send + Sync.
unsafe impl Send for RawResource {}
// SAFETY: see above, shared access only ever reads.
unsafe impl Sync for RawResource {}

impl RawResource {
    /// Wraps a pointer handed out by a native engine.
    ///
    /// Returns `None` for a null pointer, which engines use to report a missing resource.
    ///
    /// # Safety
    ///
    /// If non-null, `data` must be valid for reads of `len` bytes, must not be written to,
    /// and must stay valid for as long as `module` (or any clone of it) is alive.
    pub unsafe fn from_raw_parts(data: *const u8, len: usize, module: ModuleRc) -> Option<Self> {
        NonNull::new(data.cast_mut()).map(|data| RawResource { data, len, module })
    }

    /// Locates a resource inside the image attached to `module`.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] if the range does not fit into the image, or
    /// [`crate::Error::Error`] if the module has no image attached.
    pub fn from_module_image(module: ModuleRc, offset: usize, len: usize) -> Result<Self> {
        let data = {
            let Some(image) = module.image() else {
                return Err(Error::Error(format!(
                    "module '{}' has no image attached",
                    module.name
                )));
            };
            NonNull::from(image.data_slice(offset, len)?).cast::<u8>()
        };

        Ok(RawResource { data, len, module })
    }

    /// Length of the resource in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-length resource.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The module whose memory holds the resource.
    #[must_use]
    pub fn module(&self) -> &ModuleRc {
        &self.module
    }
}

impl fmt::Debug for RawResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResource")
            .field("data", &self.data)
            .field("len", &self.len)
            .field("module", &self.module.name)
            .finish()
    }
}

/// A read-only, seekable view over one manifest resource.
///
/// Holds a strong reference to the owning module for its whole lifetime, which keeps the
/// engine from unloading the memory the view points into.
///
/// # Examples
///
/// ```rust,ignore
/// use std::io::Read;
///
/// if let Some(mut stream) = assembly.get_manifest_resource_stream("App.icon.png")? {
///     let mut bytes = Vec::with_capacity(stream.len());
///     stream.read_to_end(&mut bytes)?;
///     stream.release()?;
/// }
/// ```
pub struct ResourceStream {
    data: Option<NonNull<u8>>,
    len: usize,
    position: usize,
    module: Option<ModuleRc>,
}

// SAFETY: the view only reads, and the memory is pinned by the module reference it owns.
unsafe impl Send for ResourceStream {}
// SAFETY: `&ResourceStream` only permits reads; release requires `&mut`.
unsafe impl Sync for ResourceStream {}

impl ResourceStream {
    /// Binds a view to a raw resource, taking over its module reference.
    pub fn acquire(raw: RawResource) -> Self {
        log::debug!(
            "acquired resource view of {} bytes in module '{}' (liveness {})",
            raw.len,
            raw.module.name,
            Module::liveness(&raw.module)
        );

        ResourceStream {
            data: Some(raw.data),
            len: raw.len,
            position: 0,
            module: Some(raw.module),
        }
    }

    /// Length of the resource in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-length resource.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current read position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns `true` once the view has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// The module this view keeps alive.
    ///
    /// # Errors
    /// [`crate::Error::UseAfterRelease`] if the view was released.
    pub fn module(&self) -> Result<&ModuleRc> {
        self.module.as_ref().ok_or(Error::UseAfterRelease)
    }

    /// The complete resource.
    ///
    /// # Errors
    /// [`crate::Error::UseAfterRelease`] if the view was released.
    pub fn as_slice(&self) -> Result<&[u8]> {
        let data = self.data.ok_or(Error::UseAfterRelease)?;

        // SAFETY: `data` is non-null and, per the `RawResource` contract, readable for `len`
        // bytes while the module is alive. We hold the module until `data` is cleared.
        Ok(unsafe { slice::from_raw_parts(data.as_ptr(), self.len) })
    }

    /// Borrows `len` bytes starting at `offset`, independent of the read position.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] if the range exceeds the resource, or
    /// [`crate::Error::UseAfterRelease`] if the view was released.
    pub fn read_at(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).ok_or(Error::OutOfBounds)?;
        self.as_slice()?.get(offset..end).ok_or(Error::OutOfBounds)
    }

    /// Borrows the next `len` bytes and advances the read position past them.
    ///
    /// The position is left untouched on failure.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] if fewer than `len` bytes are left, or
    /// [`crate::Error::UseAfterRelease`] if the view was released.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.position;
        let end = start.checked_add(len).ok_or(Error::OutOfBounds)?;
        if self.is_released() {
            return Err(Error::UseAfterRelease);
        }
        if end > self.len {
            return Err(Error::OutOfBounds);
        }

        self.position = end;
        self.read_at(start, len)
    }

    /// Moves the read position to `position`, which may equal the length.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] if `position` is past the end, or
    /// [`crate::Error::UseAfterRelease`] if the view was released.
    pub fn seek_to(&mut self, position: usize) -> Result<()> {
        if self.is_released() {
            return Err(Error::UseAfterRelease);
        }
        if position > self.len {
            return Err(Error::OutOfBounds);
        }

        self.position = position;
        Ok(())
    }

    /// Releases the view: drops the module reference and clears the pointer.
    ///
    /// Dropping an unreleased view does the same, so calling this is only needed to give
    /// the memory back early.
    ///
    /// # Errors
    /// [`crate::Error::UseAfterRelease`] if the view was already released. The module's
    /// liveness is never decremented twice.
    pub fn release(&mut self) -> Result<()> {
        if self.data.take().is_none() {
            return Err(Error::UseAfterRelease);
        }

        if let Some(module) = self.module.take() {
            log::debug!(
                "released resource view of {} bytes in module '{}'",
                self.len,
                module.name
            );
        }
        self.position = 0;
        Ok(())
    }
}

impl Drop for ResourceStream {
    fn drop(&mut self) {
        if !self.is_released() {
            // Cannot fail: the view is known to be live.
            let _ = self.release();
        }
    }
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.as_slice()?.get(self.position..).unwrap_or_default();
        let count = remaining.len().min(buf.len());

        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }
}

impl Seek for ResourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => usize::try_from(offset).ok(),
            SeekFrom::End(delta) => offset_by(self.len, delta),
            SeekFrom::Current(delta) => offset_by(self.position, delta),
        };

        self.seek_to(target.ok_or(Error::OutOfBounds)?)?;
        Ok(self.position as u64)
    }
}

fn offset_by(base: usize, delta: i64) -> Option<usize> {
    let magnitude = usize::try_from(delta.unsigned_abs()).ok()?;
    if delta < 0 {
        base.checked_sub(magnitude)
    } else {
        base.checked_add(magnitude)
    }
}

impl fmt::Debug for ResourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStream")
            .field("len", &self.len)
            .field("position", &self.position)
            .field("released", &self.is_released())
            .field("module", &self.module.as_ref().map(|module| &module.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::file::Memory;

    fn module_with(image: &[u8]) -> ModuleRc {
        Arc::new(Module::new("App.dll").with_image(Memory::new(image.to_vec())))
    }

    fn view(module: &ModuleRc, offset: usize, len: usize) -> ResourceStream {
        ResourceStream::acquire(
            RawResource::from_module_image(Arc::clone(module), offset, len).unwrap(),
        )
    }

    #[test]
    fn reads_exactly_the_resource_bytes() {
        let module = module_with(b"headerPAYLOADtrailer");
        let stream = view(&module, 6, 7);

        assert_eq!(stream.len(), 7);
        assert_eq!(stream.as_slice().unwrap(), b"PAYLOAD");
        assert_eq!(stream.read_at(3, 4).unwrap(), b"LOAD");
        assert!(matches!(stream.read_at(3, 5), Err(Error::OutOfBounds)));
        assert!(matches!(stream.read_at(usize::MAX, 2), Err(Error::OutOfBounds)));
    }

    #[test]
    fn read_bytes_advances_and_rejects_overrun() {
        let module = module_with(b"0123456789");
        let mut stream = view(&module, 0, 10);

        assert_eq!(stream.read_bytes(4).unwrap(), b"0123");
        assert_eq!(stream.position(), 4);
        assert!(matches!(stream.read_bytes(7), Err(Error::OutOfBounds)));
        assert_eq!(stream.position(), 4);
        assert_eq!(stream.read_bytes(6).unwrap(), b"456789");
        assert!(matches!(stream.read_bytes(1), Err(Error::OutOfBounds)));
    }

    #[test]
    fn io_read_and_seek() {
        let module = module_with(b"abcdefgh");
        let mut stream = view(&module, 0, 8);

        let mut all = Vec::new();
        stream.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"abcdefgh");
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 0);

        assert_eq!(stream.seek(SeekFrom::End(-3)).unwrap(), 5);
        let mut tail = [0u8; 3];
        stream.read_exact(&mut tail).unwrap();
        assert_eq!(&tail, b"fgh");

        assert_eq!(stream.seek(SeekFrom::Current(-8)).unwrap(), 0);
        assert!(stream.seek(SeekFrom::Current(-1)).is_err());
        assert!(stream.seek(SeekFrom::Start(9)).is_err());
        assert_eq!(stream.seek(SeekFrom::Start(8)).unwrap(), 8);
    }

    #[test]
    fn release_decrements_liveness_once() {
        let module = module_with(b"data");
        assert_eq!(Module::liveness(&module), 1);

        let mut stream = view(&module, 0, 4);
        assert_eq!(Module::liveness(&module), 2);

        stream.release().unwrap();
        assert!(stream.is_released());
        assert_eq!(Module::liveness(&module), 1);

        assert!(matches!(stream.release(), Err(Error::UseAfterRelease)));
        assert_eq!(Module::liveness(&module), 1);

        drop(stream);
        assert_eq!(Module::liveness(&module), 1);
    }

    #[test]
    fn drop_releases_unreleased_view() {
        let module = module_with(b"data");
        {
            let _stream = view(&module, 0, 4);
            assert_eq!(Module::liveness(&module), 2);
        }
        assert_eq!(Module::liveness(&module), 1);
    }

    #[test]
    fn access_after_release_fails() {
        let module = module_with(b"data");
        let mut stream = view(&module, 0, 4);
        stream.release().unwrap();

        assert!(matches!(stream.as_slice(), Err(Error::UseAfterRelease)));
        assert!(matches!(stream.read_at(0, 1), Err(Error::UseAfterRelease)));
        assert!(matches!(stream.read_bytes(1), Err(Error::UseAfterRelease)));
        assert!(matches!(stream.seek_to(0), Err(Error::UseAfterRelease)));
        assert!(matches!(stream.module(), Err(Error::UseAfterRelease)));
        assert!(stream.read(&mut [0u8; 1]).is_err());
    }

    #[test]
    fn view_keeps_module_memory_alive() {
        let module = module_with(b"survivor");
        let stream = view(&module, 0, 8);
        drop(module);

        assert_eq!(stream.as_slice().unwrap(), b"survivor");
        assert_eq!(Module::liveness(stream.module().unwrap()), 1);
    }

    #[test]
    fn raw_parts_null_means_absent() {
        let module = module_with(b"");
        let raw = unsafe { RawResource::from_raw_parts(std::ptr::null(), 10, module) };
        assert!(raw.is_none());
    }

    #[test]
    fn image_bounds_are_checked() {
        let module = module_with(b"tiny");
        assert!(matches!(
            RawResource::from_module_image(Arc::clone(&module), 2, 3),
            Err(Error::OutOfBounds)
        ));

        let bare: ModuleRc = Arc::new(Module::new("NoImage.dll"));
        assert!(matches!(
            RawResource::from_module_image(bare, 0, 0),
            Err(Error::Error(_))
        ));

        let empty = RawResource::from_module_image(module, 4, 0).unwrap();
        assert!(empty.is_empty());
        assert_eq!(ResourceStream::acquire(empty).as_slice().unwrap(), b"");
    }

    #[test]
    fn view_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResourceStream>();
        assert_send_sync::<RawResource>();
    }
}
