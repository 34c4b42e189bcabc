use thiserror::Error;

/// Builds an [`Error::DecodeFailure`] tagged with the source location of the failing check.
macro_rules! decode_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::DecodeFailure {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::DecodeFailure {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every operation of [`crate::RuntimeAssembly`] reports failures through this enum. Argument
/// validation errors are raised before the engine is consulted, engine failures are passed
/// through unchanged, and native cleanup always completes before a decode error reaches the
/// caller.
///
/// # Error Categories
///
/// ## Caller Errors
/// - [`Error::InvalidArgument`] - A required name was empty or missing
/// - [`Error::OutOfBounds`] - A read or seek went past the end of a resource view
/// - [`Error::UseAfterRelease`] - A resource view was used (or released) after release
///
/// ## Engine Errors
/// - [`Error::StaleHandle`] - The engine reports the assembly as unloaded
/// - [`Error::DecodeFailure`] - A native record handed out by the engine was malformed
/// - [`Error::TypeNotFound`] - A type lookup failed and the caller asked for an error
///
/// ## Other
/// - [`Error::NotSupported`] - The operation is intentionally not implemented
/// - [`Error::Error`] - A module has no image to derive a resource from
///
/// # Examples
///
/// ```rust,ignore
/// use rtassembly::Error;
///
/// match assembly.get_manifest_resource_stream("") {
///     Err(Error::InvalidArgument { name, .. }) => eprintln!("bad argument: {}", name),
///     Err(Error::StaleHandle) => eprintln!("assembly was unloaded"),
///     Ok(Some(stream)) => println!("{} bytes", stream.len()),
///     Ok(None) => println!("no such resource"),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A required string argument was empty or absent.
    ///
    /// Raised at the facade boundary, before any engine call is made.
    ///
    /// # Fields
    ///
    /// * `name` - The name of the offending parameter
    /// * `message` - Why the value was rejected
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument {
        /// The parameter that was rejected
        name: &'static str,
        /// Description of the problem
        message: &'static str,
    },

    /// An out of bound access was attempted on a bounded resource view.
    ///
    /// Views never read outside of `[pointer, pointer + length)`.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A resource view was accessed after it had been released.
    ///
    /// Also returned by a second call to [`crate::ResourceStream::release`], so that the
    /// owning module's liveness is never decremented twice.
    #[error("The resource view has already been released")]
    UseAfterRelease,

    /// The engine reports that the assembly behind the handle has been unloaded.
    #[error("The assembly handle is stale, the assembly has been unloaded")]
    StaleHandle,

    /// This operation is not supported.
    ///
    /// Forwarded types, satellite assemblies, raw file access and dynamic module loading
    /// always fail with this error.
    #[error("This operation is not supported")]
    NotSupported,

    /// A native record handed out by the engine could not be decoded.
    ///
    /// The error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("DecodeFailure - {file}:{line}: {message}")]
    DecodeFailure {
        /// The message to be printed for the DecodeFailure error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A type lookup by name found nothing and the caller requested an error.
    #[error("Failed to find type - {0}")]
    TypeNotFound(String),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories, such as a module without an attached image.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Shorthand for the "empty string" flavour of [`Error::InvalidArgument`].
    pub(crate) fn empty_argument(name: &'static str) -> Self {
        Error::InvalidArgument {
            name,
            message: "String cannot have zero length.",
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::OutOfBounds | Error::InvalidArgument { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
            }
            other => std::io::Error::other(other),
        }
    }
}
