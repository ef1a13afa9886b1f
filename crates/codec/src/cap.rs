//! CAP file coordinator
//!
//! Owns the cross-component state: the detected format generation, the
//! Extended flag from Header, and Directory's size table. Decode peeks
//! Header first, then Directory, then Descriptor (for authoritative method
//! boundaries), then walks every entry in archive order. Encode replays the
//! records verbatim: Shallow mode emits `raw_modified` (normalized) when
//! set, otherwise `raw` — it never re-serializes parsed fields, so edits
//! stay localized to the component the user touched.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::components::{self, Kind};
use crate::context::{Context, Version, header_flags};
use crate::envelope::{self, Entry, EntryKind};
use crate::error::{Error, Result, Warning};
use crate::record::Record;

/// A decoded CAP file in intermediate form
#[derive(Debug, Clone, Default)]
pub struct CapFile {
    /// Directory prefix shared by the component entries (e.g.
    /// `demo/javacard/`)
    prefix: String,
    /// One record per archive entry, in archive order; components are keyed
    /// by bare filename, housekeeping entries by full path
    records: IndexMap<String, Record>,
    /// Everything tolerated during decode
    warnings: Vec<Warning>,
}

/// Quick-look metadata pulled out of a decoded CAP
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapSummary {
    /// CAP format version `(major, minor)`
    pub format_version: Option<(u8, u8)>,
    /// Extended layout flag
    pub extended: bool,
    /// Package AID hex
    pub package_aid: Option<String>,
    /// Package version `(major, minor)`
    pub package_version: Option<(u8, u8)>,
    /// Applet AID hex strings, in component order
    pub applet_aids: Vec<String>,
}

/// Reserved intermediate-form key carrying the entry directory prefix
const DIRECTORY_KEY: &str = "_directory";

impl CapFile {
    /// Decode a binary CAP archive into intermediate form
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let entries = envelope::read_cap(bytes)?;
        let mut warnings = Vec::new();

        let ctx = build_context(&entries, &mut warnings)?;
        debug!(
            version = ?ctx.version,
            extended = ctx.extended,
            entries = entries.len(),
            "decoding CAP archive"
        );

        let mut cap = Self::default();
        let mut actual_sizes: Vec<(u8, u32)> = Vec::new();
        let mut directory_sizes: Vec<(u8, u32)> = Vec::new();
        for entry in &entries {
            let (key, record) = match &entry.kind {
                EntryKind::Extra => {
                    (entry.name.clone(), Record::with_raw(&entry.data))
                }
                EntryKind::Component { capx: true, .. } => {
                    // Overflow continuation; structural parsing stays on the
                    // primary section.
                    (entry.file_name().to_owned(), Record::with_raw(&entry.data))
                }
                EntryKind::Component { kind, capx: false } => {
                    if cap.prefix.is_empty() {
                        cap.prefix = entry.dir_prefix().to_owned();
                    }
                    let blob = components::split_blob(*kind, &entry.data, &ctx, &mut warnings)?;
                    let kind = match kind {
                        Kind::Custom(_) => Kind::Custom(blob.tag),
                        other => *other,
                    };
                    let mut record = Record::with_raw(&entry.data);
                    record.put("tag-u1", blob.tag);
                    record.put(format!("size-u{}", blob.size_width), blob.size);
                    if let Kind::Custom(tag) = kind {
                        if !(128..=255).contains(&tag) {
                            warnings.push(Warning::InvariantViolation {
                                component: entry.file_name().to_owned(),
                                detail: format!("custom component tag {tag} outside [128, 255]"),
                            });
                        }
                    }
                    if kind == Kind::Directory {
                        let mut reader = crate::reader::Reader::new("Directory", blob.info);
                        directory_sizes = components::directory::decode(
                            &mut reader,
                            &ctx,
                            &mut record,
                            &mut warnings,
                        )?;
                    } else {
                        components::decode_info(kind, &blob, &ctx, &mut record, &mut warnings)?;
                    }
                    actual_sizes.push((blob.tag, blob.info.len() as u32));
                    (entry.file_name().to_owned(), record)
                }
            };
            if cap.records.insert(key.clone(), record).is_some() {
                warnings.push(Warning::InvariantViolation {
                    component: key,
                    detail: "duplicate archive entry".to_owned(),
                });
            }
        }

        check_presence(&ctx, &actual_sizes, &mut warnings);
        check_directory_sizes(&directory_sizes, &actual_sizes, &mut warnings);

        for warning in &warnings {
            warn!("{warning}");
        }
        cap.warnings = warnings;
        Ok(cap)
    }

    /// Re-assemble the binary archive from the current records
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::with_capacity(self.records.len());
        for (key, record) in &self.records {
            let name = if key.contains('/') {
                key.clone()
            } else {
                format!("{}{key}", self.prefix)
            };
            entries.push((name, record.emit_bytes(key)?));
        }
        envelope::write_cap(&entries)
    }

    /// Borrow the record map (archive order)
    pub const fn records(&self) -> &IndexMap<String, Record> {
        &self.records
    }

    /// Look up one record by key (`Header.cap`, `Method.capx`, …)
    pub fn record(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Mutable record access, for installing `raw_modified` overrides
    pub fn record_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    /// Warnings collected by the decode that produced this value
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The directory prefix shared by component entries
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Intermediate form as a JSON value
    pub fn to_json_value(&self) -> Result<Value> {
        let mut map = serde_json::Map::new();
        if !self.prefix.is_empty() {
            map.insert(DIRECTORY_KEY.to_owned(), self.prefix.clone().into());
        }
        for (key, record) in &self.records {
            map.insert(key.clone(), serde_json::to_value(record)?);
        }
        Ok(Value::Object(map))
    }

    /// Intermediate form as a JSON string
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let value = self.to_json_value()?;
        Ok(if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        })
    }

    /// Rebuild a CAP from its intermediate form
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(Error::InvalidRecord(
                "intermediate form must be a JSON object".into(),
            ));
        };
        let mut cap = Self::default();
        for (key, value) in map {
            if key == DIRECTORY_KEY {
                cap.prefix = value
                    .as_str()
                    .ok_or_else(|| Error::InvalidRecord("_directory must be a string".into()))?
                    .to_owned();
                continue;
            }
            let record: Record = serde_json::from_value(value)
                .map_err(|_| Error::InvalidRecord(format!("record {key} is not an object")))?;
            cap.records.insert(key, record);
        }
        Ok(cap)
    }

    /// Package and applet metadata at a glance
    pub fn summary(&self) -> CapSummary {
        let mut summary = CapSummary::default();
        if let Some(header) = self.record("Header.cap") {
            let version = |field: &str| {
                header
                    .get(field)
                    .and_then(Value::as_u64)
                    .map(|v| v as u8)
            };
            if let (Some(minor), Some(major)) =
                (version("minor_version-u1"), version("major_version-u1"))
            {
                summary.format_version = Some((major, minor));
            }
            summary.extended = header
                .get("flags-u1")
                .and_then(Value::as_u64)
                .is_some_and(|f| f as u8 & header_flags::ACC_EXTENDED != 0);
            if let Some(package) = header.get("package") {
                summary.package_aid = package["AID"].as_str().map(str::to_owned);
                if let (Some(minor), Some(major)) = (
                    package["minor_version-u1"].as_u64(),
                    package["major_version-u1"].as_u64(),
                ) {
                    summary.package_version = Some((major as u8, minor as u8));
                }
            }
        }
        if let Some(applet) = self.record("Applet.cap") {
            if let Some(applets) = applet.get("applets").and_then(Value::as_array) {
                summary.applet_aids = applets
                    .iter()
                    .filter_map(|a| a["AID"].as_str().map(str::to_owned))
                    .collect();
            }
        }
        summary
    }
}

/// Peek Header (and Descriptor, when present) to build the shared context
fn build_context(entries: &[Entry], warnings: &mut Vec<Warning>) -> Result<Context> {
    let find = |wanted: Kind| {
        entries.iter().find(|e| {
            matches!(e.kind, EntryKind::Component { kind, capx: false } if kind == wanted)
        })
    };

    let header = find(Kind::Header).ok_or_else(|| {
        Error::InvalidEnvelope("archive has no Header component".into())
    })?;
    let (minor, major, flags) = components::header::peek(&header.data)?;
    let version = Version::from_pair(major, minor)?;
    let mut ctx = Context::new(version, minor, major);
    ctx.flags = flags;
    ctx.extended = flags & header_flags::ACC_EXTENDED != 0;

    // Descriptor delimits method bodies; a throwaway decode up front makes
    // its boundaries available before Method is reached.
    if let Some(descriptor) = find(Kind::Descriptor) {
        let mut scratch_warnings = Vec::new();
        let blob =
            components::split_blob(Kind::Descriptor, &descriptor.data, &ctx, &mut scratch_warnings)?;
        let mut reader = crate::reader::Reader::new("Descriptor", blob.info);
        let mut scratch = Record::with_raw(&[]);
        ctx.method_bounds =
            components::descriptor::decode(&mut reader, &ctx, &mut scratch)?;
    } else {
        warnings.push(Warning::InvariantViolation {
            component: "Descriptor".to_owned(),
            detail: "component absent; method bodies kept opaque".to_owned(),
        });
    }
    Ok(ctx)
}

/// Header flags promise which conditional components exist
fn check_presence(ctx: &Context, actual: &[(u8, u32)], warnings: &mut Vec<Warning>) {
    let present = |kind: Kind| actual.iter().any(|&(tag, _)| tag == kind.tag());
    let checks = [
        (Kind::Applet, header_flags::ACC_APPLET, "ACC_APPLET"),
        (Kind::Export, header_flags::ACC_EXPORT, "ACC_EXPORT"),
    ];
    for (kind, flag, flag_name) in checks {
        let flagged = ctx.flags & flag != 0;
        if flagged != present(kind) {
            warnings.push(Warning::InvariantViolation {
                component: kind.name().to_owned(),
                detail: if flagged {
                    format!("{flag_name} set but component absent")
                } else {
                    format!("component present without {flag_name}")
                },
            });
        }
    }
    for kind in [
        Kind::Header,
        Kind::Directory,
        Kind::Import,
        Kind::Class,
        Kind::Method,
        Kind::StaticField,
        Kind::ConstantPool,
        Kind::RefLocation,
    ] {
        if !present(kind) {
            warnings.push(Warning::InvariantViolation {
                component: kind.name().to_owned(),
                detail: "mandatory component absent".to_owned(),
            });
        }
    }
}

/// Cross-check Directory's size table against the blobs actually present
fn check_directory_sizes(
    recorded: &[(u8, u32)],
    actual: &[(u8, u32)],
    warnings: &mut Vec<Warning>,
) {
    for &(tag, recorded_size) in recorded {
        let observed = actual.iter().find(|&&(t, _)| t == tag).map(|&(_, s)| s);
        match observed {
            Some(actual_size) if actual_size != recorded_size => {
                warnings.push(Warning::InconsistentSize {
                    component: name_for_tag(tag),
                    recorded: recorded_size,
                    actual: actual_size,
                });
            }
            None if recorded_size != 0 => {
                warnings.push(Warning::InconsistentSize {
                    component: name_for_tag(tag),
                    recorded: recorded_size,
                    actual: 0,
                });
            }
            _ => {}
        }
    }
}

fn name_for_tag(tag: u8) -> String {
    for kind in components::INSTALL_ORDER {
        if kind.tag() == tag {
            return kind.name().to_owned();
        }
    }
    format!("Custom(0x{tag:02x})")
}
