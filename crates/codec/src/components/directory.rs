//! Directory component (tag 2)
//!
//! Records the size of every component kind, the static-field image metrics
//! and the import/applet/custom counts. The coordinator cross-checks the
//! size table against the blobs actually present (warning only; tampered
//! directories are part of this tool's diet).

use serde_json::Value;

use crate::context::Context;
use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Fields, Record};

use super::{Kind, TAG_ORDER};

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    ctx: &Context,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<(u8, u32)>> {
    let mut sizes = Vec::new();
    let mut size_fields = Fields::new();

    // 2.1 has no Debug entry; 2.2 onward lists all twelve standard tags.
    let table: &[Kind] = if ctx.at_least_22() {
        &TAG_ORDER
    } else {
        &TAG_ORDER[..11]
    };
    for kind in table {
        let long = kind.uses_long_size(ctx.extended);
        let (size, suffix) = if long {
            (reader.u4()?, "u4")
        } else {
            (u32::from(reader.u2()?), "u2")
        };
        size_fields.insert(format!("{}-{suffix}", kind.name()), size.into());
        sizes.push((kind.tag(), size));
    }
    if ctx.at_least_23() {
        let size = reader.u4()?;
        size_fields.insert("StaticResources-u4".to_owned(), size.into());
        sizes.push((Kind::StaticResources.tag(), size));
    }
    record.put(
        "component_sizes",
        Value::Object(size_fields.into_iter().collect()),
    );

    record.put("image_size-u2", reader.u2()?);
    record.put("array_init_count-u2", reader.u2()?);
    record.put("array_init_size-u2", reader.u2()?);
    record.put("import_count-u1", reader.u1()?);
    record.put("applet_count-u1", reader.u1()?);
    let custom_count = reader.u1()?;
    record.put("custom_count-u1", custom_count);

    if custom_count > 0 {
        let mut customs = Vec::with_capacity(custom_count as usize);
        for _ in 0..custom_count {
            let tag = reader.u1()?;
            if !(128..=255).contains(&tag) {
                warnings.push(Warning::InvariantViolation {
                    component: "Directory".to_owned(),
                    detail: format!("custom component tag {tag} outside [128, 255]"),
                });
            }
            let (size, suffix) = if ctx.extended {
                (reader.u4()?, "u4")
            } else {
                (u32::from(reader.u2()?), "u2")
            };
            let (aid_len, aid) = reader.aid()?;
            let mut entry = Fields::new();
            entry.insert("component_tag-u1".to_owned(), tag.into());
            entry.insert(format!("size-{suffix}"), size.into());
            entry.insert("AID_length-u1".to_owned(), aid_len.into());
            entry.insert("AID".to_owned(), hex::encode(aid).into());
            customs.push(Value::Object(entry.into_iter().collect()));
            sizes.push((tag, size));
        }
        record.put("custom_components", Value::Array(customs));
    }

    Ok(sizes)
}
