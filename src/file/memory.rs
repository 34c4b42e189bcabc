use super::Backend;

/// Module image held in an owned heap buffer.
///
/// The buffer is boxed once at construction and never reallocated, so pointers handed out
/// by [`Backend::data`] stay valid until the backend is dropped.
#[derive(Debug)]
pub struct Memory {
    data: Box<[u8]>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The image bytes to take ownership of
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Memory {
        Memory {
            data: data.into().into_boxed_slice(),
        }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
