//! Per-component decoders and the component table
//!
//! Every CAP component shares the tag-size-info shape; the table below fixes
//! the tag assignment, canonical install order, presence rules and size-field
//! widths per format generation. The submodules decode one component kind
//! each, appending parsed fields to the entry's [`Record`] in on-disk order.

use serde_json::{Value, json};

use crate::context::Context;
use crate::error::{Error, Result, Warning};
use crate::reader::{ClassRef, Reader, TypeDescriptor};
use crate::record::{Fields, Record, hex_value};

pub(crate) mod applet;
pub(crate) mod class;
pub(crate) mod constant_pool;
pub(crate) mod debug;
pub(crate) mod descriptor;
pub(crate) mod directory;
pub(crate) mod export;
pub(crate) mod header;
pub(crate) mod import;
pub(crate) mod method;
pub(crate) mod ref_location;
pub(crate) mod static_field;
pub(crate) mod static_resources;

/// Component kinds, standard and custom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Tag 1, mandatory
    Header,
    /// Tag 2, mandatory
    Directory,
    /// Tag 3, present iff Header.ACC_APPLET
    Applet,
    /// Tag 4, mandatory
    Import,
    /// Tag 5, mandatory
    ConstantPool,
    /// Tag 6, mandatory
    Class,
    /// Tag 7, mandatory
    Method,
    /// Tag 8, mandatory
    StaticField,
    /// Tag 9, mandatory
    RefLocation,
    /// Tag 10, present iff Header.ACC_EXPORT
    Export,
    /// Tag 11, mandatory
    Descriptor,
    /// Tag 12, off-card
    Debug,
    /// Tag 13, conditional, 2.3+
    StaticResources,
    /// Tags 128..=255, named by AID
    Custom(u8),
}

/// The standard components in canonical install order (Debug last, off-card)
pub const INSTALL_ORDER: [Kind; 13] = [
    Kind::Header,
    Kind::Directory,
    Kind::Import,
    Kind::Applet,
    Kind::Class,
    Kind::Method,
    Kind::StaticField,
    Kind::Export,
    Kind::ConstantPool,
    Kind::RefLocation,
    Kind::StaticResources,
    Kind::Descriptor,
    Kind::Debug,
];

/// Order of entries in Directory's component_sizes table (by tag)
pub(crate) const TAG_ORDER: [Kind; 12] = [
    Kind::Header,
    Kind::Directory,
    Kind::Applet,
    Kind::Import,
    Kind::ConstantPool,
    Kind::Class,
    Kind::Method,
    Kind::StaticField,
    Kind::RefLocation,
    Kind::Export,
    Kind::Descriptor,
    Kind::Debug,
];

impl Kind {
    /// Component tag byte
    pub const fn tag(self) -> u8 {
        match self {
            Self::Header => 1,
            Self::Directory => 2,
            Self::Applet => 3,
            Self::Import => 4,
            Self::ConstantPool => 5,
            Self::Class => 6,
            Self::Method => 7,
            Self::StaticField => 8,
            Self::RefLocation => 9,
            Self::Export => 10,
            Self::Descriptor => 11,
            Self::Debug => 12,
            Self::StaticResources => 13,
            Self::Custom(tag) => tag,
        }
    }

    /// Component name used in archive entries and diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Header => "Header",
            Self::Directory => "Directory",
            Self::Applet => "Applet",
            Self::Import => "Import",
            Self::ConstantPool => "ConstantPool",
            Self::Class => "Class",
            Self::Method => "Method",
            Self::StaticField => "StaticField",
            Self::RefLocation => "RefLocation",
            Self::Export => "Export",
            Self::Descriptor => "Descriptor",
            Self::Debug => "Debug",
            Self::StaticResources => "StaticResources",
            Self::Custom(_) => "Custom",
        }
    }

    /// Map an archive entry stem (no `.cap`/`.capx` suffix) to a kind
    ///
    /// Custom components are named by the lowercase hex of their 5–16 byte
    /// AID; the tag is read from the blob itself.
    pub fn from_stem(stem: &str) -> Option<Self> {
        match stem {
            "Header" => Some(Self::Header),
            "Directory" => Some(Self::Directory),
            "Applet" => Some(Self::Applet),
            "Import" => Some(Self::Import),
            "ConstantPool" => Some(Self::ConstantPool),
            "Class" => Some(Self::Class),
            "Method" => Some(Self::Method),
            "StaticField" => Some(Self::StaticField),
            "RefLocation" => Some(Self::RefLocation),
            "Export" => Some(Self::Export),
            "Descriptor" => Some(Self::Descriptor),
            "Debug" => Some(Self::Debug),
            "StaticResources" => Some(Self::StaticResources),
            _ => {
                let looks_like_aid = (10..=32).contains(&stem.len())
                    && stem.len() % 2 == 0
                    && stem.chars().all(|c| c.is_ascii_hexdigit());
                looks_like_aid.then_some(Self::Custom(0))
            }
        }
    }

    /// Whether this kind uses the long (u4) size form under the given context
    ///
    /// `ACC_EXTENDED` forces Method, RefLocation, Descriptor, Debug and all
    /// custom components into long-size form; StaticResources always uses it.
    pub const fn uses_long_size(self, extended: bool) -> bool {
        match self {
            Self::StaticResources => true,
            Self::Method | Self::RefLocation | Self::Descriptor | Self::Debug | Self::Custom(_) => {
                extended
            }
            _ => false,
        }
    }
}

/// A component blob split into its tag, declared size and info bytes
#[derive(Debug)]
pub(crate) struct ComponentBlob<'a> {
    pub tag: u8,
    pub size: u32,
    /// Width of the size field as observed (2 or 4)
    pub size_width: u8,
    pub info: &'a [u8],
}

/// Split `blob` into tag/size/info, verifying the tag against the entry name
///
/// The size field is first read at the width the context demands; if the
/// declared size disagrees with the bytes present, the alternate width is
/// tried and accepted with a [`Warning::SizeWidthMismatch`]. When neither
/// width matches, the declared size is kept in the record and the remaining
/// bytes become the info (with an [`Warning::InconsistentSize`]).
pub(crate) fn split_blob<'a>(
    kind: Kind,
    blob: &'a [u8],
    ctx: &Context,
    warnings: &mut Vec<Warning>,
) -> Result<ComponentBlob<'a>> {
    let component = kind.name();
    let mut reader = Reader::new(component, blob);
    let tag = reader.u1()?;
    if !matches!(kind, Kind::Custom(_)) && tag != kind.tag() {
        return Err(Error::TagMismatch {
            component,
            expected: kind.tag(),
            found: tag,
        });
    }

    let long = kind.uses_long_size(ctx.extended);
    let read_size = |reader: &mut Reader<'a>, long: bool| -> Result<u32> {
        if long {
            reader.u4()
        } else {
            reader.u2().map(u32::from)
        }
    };

    let mut probe = reader.clone();
    let declared = read_size(&mut probe, long)?;
    if declared as usize == probe.remaining() {
        return Ok(ComponentBlob {
            tag,
            size: declared,
            size_width: if long { 4 } else { 2 },
            info: probe.take(probe.remaining())?,
        });
    }

    // Declared size disagrees with the blob; try the other width.
    let mut alt = reader.clone();
    if let Ok(alt_size) = read_size(&mut alt, !long) {
        if alt_size as usize == alt.remaining() {
            warnings.push(Warning::SizeWidthMismatch {
                component: component.to_owned(),
                observed_width: if long { 2 } else { 4 },
            });
            return Ok(ComponentBlob {
                tag,
                size: alt_size,
                size_width: if long { 2 } else { 4 },
                info: alt.take(alt.remaining())?,
            });
        }
    }

    warnings.push(Warning::InconsistentSize {
        component: component.to_owned(),
        recorded: declared,
        actual: probe.remaining() as u32,
    });
    Ok(ComponentBlob {
        tag,
        size: declared,
        size_width: if long { 4 } else { 2 },
        info: probe.take(probe.remaining())?,
    })
}

/// Decode one component's info into `record`, dispatching on kind
pub(crate) fn decode_info(
    kind: Kind,
    blob: &ComponentBlob<'_>,
    ctx: &Context,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let mut reader = Reader::new(kind.name(), blob.info);
    match kind {
        Kind::Header => header::decode(&mut reader, ctx, record, warnings)?,
        Kind::Directory => {
            directory::decode(&mut reader, ctx, record, warnings)?;
        }
        Kind::Applet => applet::decode(&mut reader, ctx, record, warnings)?,
        Kind::Import => import::decode(&mut reader, record)?,
        Kind::ConstantPool => constant_pool::decode(&mut reader, record)?,
        Kind::Class => class::decode(&mut reader, ctx, record)?,
        Kind::Method => method::decode(&mut reader, ctx, record, warnings)?,
        Kind::StaticField => static_field::decode(&mut reader, record, warnings)?,
        Kind::RefLocation => ref_location::decode(&mut reader, record, warnings)?,
        Kind::Export => export::decode(&mut reader, record)?,
        Kind::Descriptor => {
            descriptor::decode(&mut reader, ctx, record)?;
        }
        Kind::Debug => debug::decode(&mut reader, record)?,
        Kind::StaticResources => static_resources::decode(&mut reader, record, warnings)?,
        Kind::Custom(_) => {
            record.put("info", hex_value(blob.info));
        }
    }
    finish(kind, &mut reader, record, warnings);
    Ok(())
}

/// Record trailing bytes a decoder did not account for
fn finish(kind: Kind, reader: &mut Reader<'_>, record: &mut Record, warnings: &mut Vec<Warning>) {
    if matches!(kind, Kind::Custom(_) | Kind::Debug) {
        return;
    }
    let left = reader.remaining();
    if left > 0 {
        warnings.push(Warning::InvariantViolation {
            component: kind.name().to_owned(),
            detail: format!("{left} trailing byte(s) after parsed fields"),
        });
        if let Ok(rest) = reader.take(left) {
            record.put("trailing", hex_value(rest));
        }
    }
}

/// Spell out the set bits of a flag field
pub(crate) fn flag_names(value: u8, table: &[(u8, &str)]) -> Value {
    Value::Array(
        table
            .iter()
            .filter(|(mask, _)| value & mask != 0)
            .map(|(_, name)| Value::String((*name).to_owned()))
            .collect(),
    )
}

/// Ordered-map JSON for a 2-byte class reference
pub(crate) fn class_ref_value(class_ref: ClassRef) -> Value {
    match class_ref {
        ClassRef::Internal(offset) => json!({
            "kind": "internal",
            "offset-u2": offset,
        }),
        ClassRef::External {
            package_token,
            class_token,
        } => json!({
            "kind": "external",
            "package_token-u1": package_token,
            "class_token-u1": class_token,
        }),
    }
}

/// Ordered-map JSON for a packed-nibble type descriptor
pub(crate) fn type_descriptor_value(td: &TypeDescriptor) -> Value {
    let mut fields = Fields::new();
    fields.insert("nibble_count-u1".to_owned(), td.nibble_count.into());
    fields.insert("bytes".to_owned(), hex_value(&td.bytes));
    fields.insert(
        "types".to_owned(),
        Value::Array(td.type_names().into_iter().map(Value::String).collect()),
    );
    Value::Object(fields.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Version;
    use hex_literal::hex;

    fn ctx(extended: bool) -> Context {
        let mut ctx = Context::new(Version::V2_3, 3, 2);
        ctx.extended = extended;
        ctx
    }

    #[test]
    fn test_split_blob_short_size() {
        let blob = hex!("01 0003 aabbcc");
        let mut warnings = Vec::new();
        let parts = split_blob(Kind::Header, &blob, &ctx(false), &mut warnings).unwrap();
        assert_eq!(parts.tag, 1);
        assert_eq!(parts.size, 3);
        assert_eq!(parts.size_width, 2);
        assert_eq!(parts.info, hex!("aabbcc"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_split_blob_tag_mismatch() {
        let blob = hex!("02 0000");
        let mut warnings = Vec::new();
        let err = split_blob(Kind::Header, &blob, &ctx(false), &mut warnings).unwrap_err();
        assert!(matches!(
            err,
            Error::TagMismatch {
                component: "Header",
                expected: 1,
                found: 2,
            }
        ));
    }

    #[test]
    fn test_split_blob_width_fallback() {
        // Extended context expects a u4 size for Method, but the blob uses u2.
        let blob = hex!("07 0002 beef");
        let mut warnings = Vec::new();
        let parts = split_blob(Kind::Method, &blob, &ctx(true), &mut warnings).unwrap();
        assert_eq!(parts.size, 2);
        assert_eq!(parts.size_width, 2);
        assert_eq!(
            warnings,
            vec![Warning::SizeWidthMismatch {
                component: "Method".to_owned(),
                observed_width: 2,
            }]
        );
    }

    #[test]
    fn test_kind_from_stem() {
        assert_eq!(Kind::from_stem("Header"), Some(Kind::Header));
        assert_eq!(Kind::from_stem("a000000062010101"), Some(Kind::Custom(0)));
        assert_eq!(Kind::from_stem("MANIFEST"), None);
    }

    #[test]
    fn test_long_size_selection() {
        assert!(Kind::StaticResources.uses_long_size(false));
        assert!(Kind::Method.uses_long_size(true));
        assert!(!Kind::Method.uses_long_size(false));
        assert!(!Kind::Header.uses_long_size(true));
    }
}
