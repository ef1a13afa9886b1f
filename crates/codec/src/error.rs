//! Error and warning types for the CAP/EXP codec
//!
//! The codec is deliberately tolerant: it is meant to operate on tampered
//! files, so most consistency problems surface as [`Warning`]s collected
//! alongside the decoded form. Hard [`Error`]s are reserved for conditions
//! that make further parsing nonsense (unreadable envelope, truncated reads)
//! or that make an encode impossible (malformed `raw_modified` hex).

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = core::result::Result<T, Error>;

/// Hard failure while decoding or encoding a CAP/EXP file
#[derive(Debug, Error)]
pub enum Error {
    /// Archive structure unreadable
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Archive entry outside the standard component set and the custom-AID
    /// naming convention
    #[error("unknown archive entry: {0}")]
    UnknownEntry(String),

    /// Header carries a format version other than 2.1, 2.2 or 2.3
    #[error("unsupported CAP format version {major}.{minor}")]
    UnsupportedVersion {
        /// Major format version
        major: u8,
        /// Minor format version
        minor: u8,
    },

    /// A read ran past the end of a component blob
    #[error("truncated {component} component: needed {needed} byte(s) at offset {offset}")]
    TruncatedComponent {
        /// Component being decoded
        component: &'static str,
        /// Offset of the failed read
        offset: usize,
        /// Bytes the read required
        needed: usize,
    },

    /// Component leading tag disagrees with its archive entry name
    #[error("{component} component has tag {found}, expected {expected}")]
    TagMismatch {
        /// Component named by the archive entry
        component: &'static str,
        /// Tag required for that entry name
        expected: u8,
        /// Tag actually read
        found: u8,
    },

    /// A `raw_modified` string did not normalize to even-length hex
    #[error("malformed hex in raw_modified of {component}: {reason}")]
    MalformedHex {
        /// Component carrying the offending override
        component: String,
        /// What went wrong during normalization
        reason: &'static str,
    },

    /// Intermediate form is structurally unusable (missing `raw`, wrong type)
    #[error("invalid intermediate form: {0}")]
    InvalidRecord(String),

    /// I/O error from the caller-provided reader/writer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Intermediate form (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tolerated inconsistency noticed while decoding
///
/// Warnings are logged through `tracing` and returned to the caller; they
/// never abort a decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// Directory's recorded size disagrees with the component blob, or a
    /// component's declared size disagrees with the bytes present
    #[error("{component}: recorded size {recorded} but found {actual} byte(s)")]
    InconsistentSize {
        /// Component the sizes disagree about
        component: String,
        /// Size recorded in Directory or the component's size field
        recorded: u32,
        /// Size actually observed
        actual: u32,
    },

    /// Component size field only parses under the size width the Header
    /// flags say it should not be using
    #[error("{component}: size field read as {observed_width}-byte despite header flags")]
    SizeWidthMismatch {
        /// Component whose size width disagrees with Header.ACC_EXTENDED
        component: String,
        /// Width (2 or 4) that actually matched the blob
        observed_width: u8,
    },

    /// `impdep1`/`impdep2` byte seen inside method bytecode
    #[error("forbidden instruction 0x{opcode:02x} in method bytecode at offset {offset}")]
    ForbiddenInstruction {
        /// Offending opcode byte (0xfe or 0xff)
        opcode: u8,
        /// Offset within the Method component info
        offset: usize,
    },

    /// A quantified cross-field constraint does not hold
    #[error("invariant violated in {component}: {detail}")]
    InvariantViolation {
        /// Component the constraint belongs to
        component: String,
        /// Human-readable statement of the failed constraint
        detail: String,
    },
}
