//! Cross-component decode state
//!
//! The coordinator peeks Header to learn the format generation and the
//! Extended flag, then Directory for the size table, and finally Descriptor
//! for authoritative method boundaries. Everything downstream reads this
//! shared, immutable context.

use crate::error::{Error, Result};

/// Supported CAP/EXP format generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    /// Format 2.1
    V2_1,
    /// Format 2.2
    V2_2,
    /// Format 2.3
    V2_3,
}

impl Version {
    /// Map a Header `(major, minor)` pair to a generation
    pub fn from_pair(major: u8, minor: u8) -> Result<Self> {
        match (major, minor) {
            (2, 1) => Ok(Self::V2_1),
            (2, 2) => Ok(Self::V2_2),
            (2, 3) => Ok(Self::V2_3),
            _ => Err(Error::UnsupportedVersion { major, minor }),
        }
    }

    /// The `(major, minor)` pair this generation writes
    pub const fn pair(self) -> (u8, u8) {
        match self {
            Self::V2_1 => (2, 1),
            Self::V2_2 => (2, 2),
            Self::V2_3 => (2, 3),
        }
    }
}

/// Boundary of one method body inside the Method component info
///
/// Derived from Descriptor's `method_offset` and `bytecode_count` entries;
/// the Method component alone cannot delimit its bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodBounds {
    /// Offset of the method_info from the start of the Method info
    pub offset: u32,
    /// Number of bytecode bytes following the method header
    pub bytecode_count: u16,
}

/// Shared decode context
#[derive(Debug, Clone)]
pub struct Context {
    /// Detected format generation
    pub version: Version,
    /// Header minor version byte as read
    pub minor: u8,
    /// Header major version byte as read
    pub major: u8,
    /// Header flags byte as read
    pub flags: u8,
    /// ACC_EXTENDED set in Header flags
    pub extended: bool,
    /// Directory's recorded size per component tag, once decoded
    pub directory_sizes: Vec<(u8, u32)>,
    /// Method boundaries from Descriptor, sorted by offset
    pub method_bounds: Vec<MethodBounds>,
}

impl Context {
    /// Fresh context for a detected generation
    pub const fn new(version: Version, minor: u8, major: u8) -> Self {
        Self {
            version,
            minor,
            major,
            flags: 0,
            extended: false,
            directory_sizes: Vec::new(),
            method_bounds: Vec::new(),
        }
    }

    /// True for 2.2 and later (signature pool, package name, remote infos)
    pub fn at_least_22(&self) -> bool {
        self.version >= Version::V2_2
    }

    /// True for 2.3 (token mappings, StaticResources, referenced packages)
    pub fn at_least_23(&self) -> bool {
        self.version >= Version::V2_3
    }
}

/// Header flag bits
pub mod header_flags {
    /// Package uses the int type
    pub const ACC_INT: u8 = 0x01;
    /// Package has an Export component
    pub const ACC_EXPORT: u8 = 0x02;
    /// Package has an Applet component
    pub const ACC_APPLET: u8 = 0x04;
    /// Extended layout: long-size components, `.capx` overflow
    pub const ACC_EXTENDED: u8 = 0x08;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_dispatch() {
        assert_eq!(Version::from_pair(2, 1).unwrap(), Version::V2_1);
        assert_eq!(Version::from_pair(2, 2).unwrap(), Version::V2_2);
        assert_eq!(Version::from_pair(2, 3).unwrap(), Version::V2_3);
        assert!(matches!(
            Version::from_pair(3, 0),
            Err(Error::UnsupportedVersion { major: 3, minor: 0 })
        ));
    }

    #[test]
    fn test_generation_ordering() {
        let ctx = Context::new(Version::V2_2, 2, 2);
        assert!(ctx.at_least_22());
        assert!(!ctx.at_least_23());
    }
}
