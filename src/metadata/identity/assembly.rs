//! Decoded assembly names.
//!
//! [`AssemblyName`] is the owned, fully copied form of a native name record. Once built it
//! has no tie to engine memory and can be kept indefinitely.
//!
//! # Thread Safety
//!
//! All types in this module are plain data and implement [`Send`] and [`Sync`].

use std::{fmt, fmt::Write as _};

use bitflags::bitflags;
use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// Length of a public key token in bytes.
pub const PUBLIC_KEY_TOKEN_SIZE: usize = 8;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags carried by an assembly name, §II.23.1.2
    pub struct AssemblyNameFlags : u32 {
        /// The name holds the full (unhashed) public key
        const PUBLIC_KEY = 0x0001;
        /// The implementation used at runtime is not expected to match the version seen at compile time
        const RETARGETABLE = 0x0100;
        /// Reserved (a conforming implementation of the CLI may ignore this setting on read)
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// Reserved (a conforming implementation of the CLI may ignore this setting on read)
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// Four-part version numbering for .NET assemblies.
///
/// Versions are compared component-wise in order: major, minor, build, revision.
///
/// # Examples
///
/// ```rust
/// use rtassembly::metadata::identity::AssemblyVersion;
///
/// let version = AssemblyVersion::new(1, 2, 3, 4);
/// assert_eq!(version.to_string(), "1.2.3.4");
///
/// assert!(AssemblyVersion::new(2, 0, 0, 0) > version);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a new assembly version with the specified components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Builds a version from the widened components of a native record.
    ///
    /// Unlike metadata tables, which may be read leniently, a runtime record with a component
    /// outside the `u16` range is corrupt.
    ///
    /// # Errors
    /// Returns [`crate::Error::DecodeFailure`] if any component exceeds `u16::MAX`.
    pub fn from_native(major: u32, minor: u32, build: u32, revision: u32) -> Result<Self> {
        let component = |value: u32, what: &str| {
            u16::try_from(value)
                .map_err(|_| decode_error!("Version component {} out of range: {}", what, value))
        };

        Ok(Self::new(
            component(major, "major")?,
            component(minor, "minor")?,
            component(build, "build")?,
            component(revision, "revision")?,
        ))
    }
}

/// Processor architecture of an assembly, as encoded by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorArchitecture {
    /// Microsoft Intermediate Language - architecture neutral.
    MSIL,
    /// 32-bit Intel x86 architecture.
    X86,
    /// Intel Itanium 64-bit architecture.
    IA64,
    /// 64-bit x86-64 architecture (Intel/AMD).
    AMD64,
    /// ARM processor architecture.
    ARM,
}

impl ProcessorArchitecture {
    /// Maps the runtime's architecture code, where `0` means "not specified".
    ///
    /// # Errors
    /// Returns [`crate::Error::DecodeFailure`] for codes above `5`.
    pub fn from_native(code: u32) -> Result<Option<Self>> {
        if code == 0 {
            return Ok(None);
        }
        Self::try_from(code).map(Some)
    }
}

impl TryFrom<u32> for ProcessorArchitecture {
    type Error = Error;

    /// Convert a runtime processor architecture code.
    ///
    /// # Code Mapping
    ///
    /// - `1` - MSIL
    /// - `2` - x86
    /// - `3` - IA64
    /// - `4` - AMD64
    /// - `5` - ARM
    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::MSIL),
            2 => Ok(Self::X86),
            3 => Ok(Self::IA64),
            4 => Ok(Self::AMD64),
            5 => Ok(Self::ARM),
            _ => Err(decode_error!("Unknown processor architecture code: {}", value)),
        }
    }
}

/// Owned name of an assembly, decoded from a native record.
///
/// Fields the engine did not populate are `None`, unless the decode options asked for a
/// default (see [`crate::metadata::identity::DecodeOptions`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyName {
    /// Simple assembly name (e.g., "mscorlib", "System.Core").
    pub name: String,
    /// Four-part version, if requested and known.
    pub version: Option<AssemblyVersion>,
    /// Culture for satellite assemblies, `None` for culture-neutral ones.
    pub culture: Option<String>,
    /// Full public key. `Some(empty)` means "requested, but the engine had none".
    pub public_key: Option<Vec<u8>>,
    /// Public key token. `Some(empty)` means "explicitly no token".
    pub public_key_token: Option<Vec<u8>>,
    /// Name flags.
    pub flags: AssemblyNameFlags,
    /// Hash algorithm identifier (`0x8004` for SHA-1), as recorded by the engine.
    pub hash_algorithm: u32,
    /// Target processor architecture, if the engine recorded one.
    pub processor_architecture: Option<ProcessorArchitecture>,
    /// Location the assembly was loaded from, only set for the assembly's own name.
    pub code_base: Option<String>,
    /// Set when the name was decoded from a reference rather than a loaded assembly.
    pub is_reference: bool,
}

impl AssemblyName {
    /// Creates a name with only the simple name set.
    pub fn new(name: impl Into<String>) -> Self {
        AssemblyName {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The public key token: the explicit one if set, otherwise derived from the public key.
    ///
    /// The derived token is the last 8 bytes of the key's SHA-1 hash, in reverse order.
    /// Returns `None` if neither a non-empty token nor a non-empty key is available.
    #[must_use]
    pub fn public_key_token(&self) -> Option<Vec<u8>> {
        if let Some(token) = self.public_key_token.as_ref().filter(|token| !token.is_empty()) {
            return Some(token.clone());
        }

        let key = self.public_key.as_ref().filter(|key| !key.is_empty())?;
        let hash = Sha1::digest(key);
        Some(
            hash[hash.len() - PUBLIC_KEY_TOKEN_SIZE..]
                .iter()
                .rev()
                .copied()
                .collect(),
        )
    }

    /// Check if this assembly name carries a strong name (key or non-empty token).
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.public_key_token().is_some()
    }

    /// Generate the display name, e.g.
    /// `"System.Core, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"`.
    ///
    /// The version is omitted when unknown. `PublicKeyToken=null` is written for an
    /// explicitly empty token; the token part is omitted when nothing is known about it.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);

        if let Some(version) = &self.version {
            let _ = write!(result, ", Version={}", version);
        }

        let culture_str = self.culture.as_deref().unwrap_or("neutral");
        let _ = write!(result, ", Culture={}", culture_str);

        match self.public_key_token() {
            Some(token) => {
                result.push_str(", PublicKeyToken=");
                for byte in token {
                    let _ = write!(result, "{:02x}", byte);
                }
            }
            None if self.public_key_token.is_some() || self.public_key.is_some() => {
                result.push_str(", PublicKeyToken=null");
            }
            None => {}
        }

        if self.flags.contains(AssemblyNameFlags::RETARGETABLE) {
            result.push_str(", Retargetable=Yes");
        }

        result
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for ProcessorArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arch_str = match self {
            Self::MSIL => "MSIL",
            Self::X86 => "x86",
            Self::IA64 => "IA64",
            Self::AMD64 => "AMD64",
            Self::ARM => "ARM",
        };
        write!(f, "{}", arch_str)
    }
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_version_from_native() {
        assert_eq!(
            AssemblyVersion::from_native(4, 0, 65535, 1).unwrap(),
            AssemblyVersion::new(4, 0, u16::MAX, 1)
        );
        assert!(matches!(
            AssemblyVersion::from_native(4, 0x1_0000, 0, 0),
            Err(Error::DecodeFailure { .. })
        ));
    }

    #[test]
    fn test_assembly_version_ordering() {
        let v1 = AssemblyVersion::new(1, 0, 0, 0);
        let v2 = AssemblyVersion::new(1, 0, 0, 1);
        let v3 = AssemblyVersion::new(2, 0, 0, 0);
        assert!(v1 < v2 && v2 < v3);
        assert_eq!(v3.to_string(), "2.0.0.0");
    }

    #[test]
    fn test_processor_architecture() {
        assert_eq!(ProcessorArchitecture::AMD64.to_string(), "AMD64");

        assert_eq!(ProcessorArchitecture::from_native(0).unwrap(), None);
        assert_eq!(
            ProcessorArchitecture::from_native(2).unwrap(),
            Some(ProcessorArchitecture::X86)
        );
        assert!(ProcessorArchitecture::from_native(6).is_err());
    }

    #[test]
    fn test_display_name_full() {
        let name = AssemblyName {
            version: Some(AssemblyVersion::new(4, 0, 0, 0)),
            public_key_token: Some(vec![0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]),
            ..AssemblyName::new("mscorlib")
        };

        assert_eq!(
            name.display_name(),
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
        );
        assert!(name.is_strong_named());
    }

    #[test]
    fn test_display_name_defaults() {
        let mut name = AssemblyName::new("App");
        assert_eq!(name.display_name(), "App, Culture=neutral");

        name.public_key_token = Some(Vec::new());
        name.culture = Some("de-DE".to_string());
        name.flags = AssemblyNameFlags::RETARGETABLE;
        assert_eq!(
            name.display_name(),
            "App, Culture=de-DE, PublicKeyToken=null, Retargetable=Yes"
        );
        assert!(!name.is_strong_named());
    }

    #[test]
    fn test_token_derived_from_public_key() {
        let key = vec![0x00, 0x24, 0x00, 0x00, 0x04, 0x80, 0x00, 0x00];
        let name = AssemblyName {
            public_key: Some(key.clone()),
            ..AssemblyName::new("Signed")
        };

        let hash = Sha1::digest(&key);
        let mut expected = hash[12..].to_vec();
        expected.reverse();

        assert_eq!(name.public_key_token().unwrap(), expected);
        assert_eq!(name.public_key_token().unwrap().len(), PUBLIC_KEY_TOKEN_SIZE);
    }
}
