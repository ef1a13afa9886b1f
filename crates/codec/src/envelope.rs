//! Envelope layer: the outer archive of component blobs
//!
//! A CAP file is a ZIP/JAR container with one entry per present component;
//! this layer reads and writes those entries without interpreting component
//! internals. EXP files bypass it entirely (the whole file is one blob).

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::components::Kind;
use crate::error::{Error, Result};

/// How an archive entry participates in the CAP format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A component blob (standard or custom)
    Component {
        /// Component kind derived from the entry stem
        kind: Kind,
        /// Extended-mode overflow section (`.capx`)
        capx: bool,
    },
    /// JAR housekeeping (`META-INF/…`, `APPLET-INF/…`), carried through raw
    Extra,
}

/// One archive entry: full path, raw bytes and its classification
#[derive(Debug, Clone)]
pub struct Entry {
    /// Entry path as stored in the archive
    pub name: String,
    /// Entry bytes
    pub data: Vec<u8>,
    /// Component or housekeeping
    pub kind: EntryKind,
}

impl Entry {
    /// The path's final segment (e.g. `Header.cap`)
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// The directory part of the path, trailing slash included
    pub fn dir_prefix(&self) -> &str {
        match self.name.rfind('/') {
            Some(i) => &self.name[..=i],
            None => "",
        }
    }
}

/// Classify an entry path, or reject it
///
/// Recognized: the standard component filenames with `.cap`/`.capx`
/// suffixes, custom components named by their AID hex, and JAR housekeeping
/// under `META-INF/` or `APPLET-INF/`. Anything else is an
/// [`Error::UnknownEntry`].
fn classify(name: &str) -> Result<EntryKind> {
    if name.starts_with("META-INF/") || name.starts_with("APPLET-INF/") {
        return Ok(EntryKind::Extra);
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let (stem, capx) = if let Some(stem) = file_name.strip_suffix(".capx") {
        (stem, true)
    } else if let Some(stem) = file_name.strip_suffix(".cap") {
        (stem, false)
    } else {
        return Err(Error::UnknownEntry(name.to_owned()));
    };
    match Kind::from_stem(stem) {
        Some(kind) => Ok(EntryKind::Component { kind, capx }),
        None => Err(Error::UnknownEntry(name.to_owned())),
    }
}

/// Enumerate a CAP archive's entries in stored order
pub fn read_cap(bytes: &[u8]) -> Result<Vec<Entry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::InvalidEnvelope(e.to_string()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::InvalidEnvelope(e.to_string()))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_owned();
        let kind = classify(&name)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.push(Entry { name, data, kind });
    }
    if entries.is_empty() {
        return Err(Error::InvalidEnvelope("archive holds no entries".into()));
    }
    Ok(entries)
}

/// Assemble a CAP archive from `(name, bytes)` pairs, preserving order
///
/// Entries are Stored (no compression) with a fixed timestamp, so equal
/// inputs produce byte-identical archives.
pub fn write_cap(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default());
    for (name, data) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| Error::InvalidEnvelope(e.to_string()))?;
        writer.write_all(data)?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| Error::InvalidEnvelope(e.to_string()))?;
    Ok(cursor.into_inner())
}
