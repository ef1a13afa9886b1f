//! Header component (tag 1)
//!
//! Carries the magic, the format generation, the package flags and the
//! package AID. The coordinator peeks this component before anything else:
//! the generation and the ACC_EXTENDED flag steer every other decoder.

use serde_json::json;

use crate::context::{Context, header_flags};
use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Record, hex_value};

use super::flag_names;

/// CAP file magic
pub const MAGIC: u32 = 0xdecaffed;

const FLAG_TABLE: [(u8, &str); 4] = [
    (header_flags::ACC_INT, "ACC_INT"),
    (header_flags::ACC_EXPORT, "ACC_EXPORT"),
    (header_flags::ACC_APPLET, "ACC_APPLET"),
    (header_flags::ACC_EXTENDED, "ACC_EXTENDED"),
];

/// Read `(minor, major, flags)` from a whole Header blob, before any
/// context exists
///
/// The Header's size field is a u2 in every generation, so this needs no
/// version knowledge.
pub(crate) fn peek(blob: &[u8]) -> Result<(u8, u8, u8)> {
    let mut reader = Reader::new("Header", blob);
    let _tag = reader.u1()?;
    let _size = reader.u2()?;
    let _magic = reader.u4()?;
    let minor = reader.u1()?;
    let major = reader.u1()?;
    let flags = reader.u1()?;
    Ok((minor, major, flags))
}

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    ctx: &Context,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let magic = reader.u4()?;
    record.put("magic-u4", hex_value(&magic.to_be_bytes()));
    if magic != MAGIC {
        warnings.push(Warning::InvariantViolation {
            component: "Header".to_owned(),
            detail: format!("magic 0x{magic:08x}, expected 0xdecaffed"),
        });
    }

    record.put("minor_version-u1", reader.u1()?);
    record.put("major_version-u1", reader.u1()?);
    let flags = reader.u1()?;
    record.put("flags-u1", flags);
    record.put("flags_decoded", flag_names(flags, &FLAG_TABLE));

    let pkg_minor = reader.u1()?;
    let pkg_major = reader.u1()?;
    let (aid_len, aid) = reader.aid()?;
    if !(5..=16).contains(&aid_len) {
        warnings.push(Warning::InvariantViolation {
            component: "Header".to_owned(),
            detail: format!("package AID length {aid_len} outside [5, 16]"),
        });
    }
    record.put(
        "package",
        json!({
            "minor_version-u1": pkg_minor,
            "major_version-u1": pkg_major,
            "AID_length-u1": aid_len,
            "AID": hex::encode(aid),
        }),
    );

    // The package name was introduced with 2.2 and is optional: it is
    // present exactly when bytes remain after package_info.
    if ctx.at_least_22() && !reader.is_empty() {
        let len_before = reader.pos();
        let name = reader.name()?;
        let name_length = (reader.pos() - len_before - 1) as u8;
        record.put(
            "package_name",
            json!({
                "name_length-u1": name_length,
                "name": name,
            }),
        );
    }
    Ok(())
}
