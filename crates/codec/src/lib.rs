//! Bidirectional codec for Java Card CAP and EXP files
//!
//! This crate decodes a binary CAP archive (a ZIP-like envelope holding a
//! fixed set of tagged components) or a flat EXP export file into a
//! structured, human-editable intermediate form, and reconstructs the
//! binary from that form. All three format generations (2.1, 2.2, 2.3) and
//! both the Compact and Extended layouts are handled.
//!
//! The codec operates in Shallow mode: every record keeps its exact source
//! bytes, and encoding emits `raw_modified` (when the user set one) or
//! `raw` verbatim. It never re-serializes parsed fields, so an unedited
//! decode-then-encode is byte-identical and edits stay localized to the
//! component they touch. The decoder is deliberately tolerant — the point
//! is to study tampered files — so consistency problems surface as
//! warnings, not failures.
//!
//! ```no_run
//! use capastrophic_codec::CapFile;
//!
//! # fn main() -> capastrophic_codec::Result<()> {
//! let bytes = std::fs::read("helloworld.cap")?;
//! let cap = CapFile::decode(&bytes)?;
//! println!("{}", cap.to_json(true)?);
//! assert_eq!(cap.encode()?, bytes);
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod cap;
pub mod components;
pub mod context;
pub mod envelope;
pub mod error;
pub mod exp;
pub mod reader;
pub mod record;

// Re-exports
pub use cap::{CapFile, CapSummary};
pub use components::Kind;
pub use context::{Context, Version};
pub use error::{Error, Result, Warning};
pub use exp::ExpFile;
pub use record::Record;
