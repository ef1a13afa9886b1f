//! ConstantPool component (tag 5)
//!
//! A length-prefixed array of 4-byte entries. The first byte of each entry
//! is its tag; the remaining three bytes are tag-specific. Entries never
//! reference other pool entries. Tags are recorded literally; semantic
//! rules (index 0 not a catch type) are the consumer's business.

use serde_json::Value;

use crate::error::Result;
use crate::reader::Reader;
use crate::record::{Fields, Record, hex_value};

use super::class_ref_value;

const TAG_CLASSREF: u8 = 1;
const TAG_INSTANCE_FIELDREF: u8 = 2;
const TAG_VIRTUAL_METHODREF: u8 = 3;
const TAG_SUPER_METHODREF: u8 = 4;
const TAG_STATIC_FIELDREF: u8 = 5;
const TAG_STATIC_METHODREF: u8 = 6;

fn tag_name(tag: u8) -> &'static str {
    match tag {
        TAG_CLASSREF => "CONSTANT_Classref",
        TAG_INSTANCE_FIELDREF => "CONSTANT_InstanceFieldref",
        TAG_VIRTUAL_METHODREF => "CONSTANT_VirtualMethodref",
        TAG_SUPER_METHODREF => "CONSTANT_SuperMethodref",
        TAG_STATIC_FIELDREF => "CONSTANT_StaticFieldref",
        TAG_STATIC_METHODREF => "CONSTANT_StaticMethodref",
        _ => "CONSTANT_Unknown",
    }
}

/// Decode the static-ref union: internal `{padding, offset}` or external
/// `{package token | 0x80, class token, token}`, discriminated on the high
/// bit of the first byte.
fn static_ref(reader: &mut Reader<'_>, entry: &mut Fields) -> Result<()> {
    let first = reader.u1()?;
    if first & 0x80 != 0 {
        entry.insert("kind".to_owned(), "external".into());
        entry.insert("package_token-u1".to_owned(), (first & 0x7f).into());
        entry.insert("class_token-u1".to_owned(), reader.u1()?.into());
        entry.insert("token-u1".to_owned(), reader.u1()?.into());
    } else {
        entry.insert("kind".to_owned(), "internal".into());
        entry.insert("padding-u1".to_owned(), first.into());
        entry.insert("offset-u2".to_owned(), reader.u2()?.into());
    }
    Ok(())
}

pub(crate) fn decode(reader: &mut Reader<'_>, record: &mut Record) -> Result<()> {
    let count = reader.u2()?;
    record.put("count-u2", count);

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = reader.u1()?;
        let mut entry = Fields::new();
        entry.insert("tag-u1".to_owned(), tag.into());
        entry.insert("type".to_owned(), tag_name(tag).into());
        match tag {
            TAG_CLASSREF => {
                entry.insert("class_ref".to_owned(), class_ref_value(reader.class_ref()?));
                entry.insert("padding-u1".to_owned(), reader.u1()?.into());
            }
            TAG_INSTANCE_FIELDREF | TAG_VIRTUAL_METHODREF | TAG_SUPER_METHODREF => {
                entry.insert("class_ref".to_owned(), class_ref_value(reader.class_ref()?));
                entry.insert("token-u1".to_owned(), reader.u1()?.into());
            }
            TAG_STATIC_FIELDREF | TAG_STATIC_METHODREF => {
                static_ref(reader, &mut entry)?;
            }
            _ => {
                entry.insert("info".to_owned(), hex_value(reader.take(3)?));
            }
        }
        entries.push(Value::Object(entry.into_iter().collect()));
    }
    record.put("entries", Value::Array(entries));
    Ok(())
}
