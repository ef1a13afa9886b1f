//! Descriptor component (tag 11)
//!
//! Per-class field and method descriptors plus the type descriptor pool.
//! This component is the authoritative source of method body boundaries:
//! the coordinator decodes it before Method and feeds the collected
//! `method_offset`/`bytecode_count` pairs into the shared context.

use serde_json::Value;

use crate::context::{Context, MethodBounds};
use crate::error::Result;
use crate::reader::Reader;
use crate::record::{Fields, Record};

use super::{class_ref_value, flag_names, type_descriptor_value};

const CLASS_FLAGS: [(u8, &str); 4] = [
    (0x01, "ACC_PUBLIC"),
    (0x10, "ACC_FINAL"),
    (0x40, "ACC_INTERFACE"),
    (0x80, "ACC_ABSTRACT"),
];

const FIELD_FLAGS: [(u8, &str); 5] = [
    (0x01, "ACC_PUBLIC"),
    (0x02, "ACC_PRIVATE"),
    (0x04, "ACC_PROTECTED"),
    (0x08, "ACC_STATIC"),
    (0x10, "ACC_FINAL"),
];

const METHOD_FLAGS: [(u8, &str); 7] = [
    (0x01, "ACC_PUBLIC"),
    (0x02, "ACC_PRIVATE"),
    (0x04, "ACC_PROTECTED"),
    (0x08, "ACC_STATIC"),
    (0x10, "ACC_FINAL"),
    (0x40, "ACC_ABSTRACT"),
    (0x80, "ACC_INIT"),
];

const ACC_STATIC: u8 = 0x08;

/// Primitive type encodings used when the high bit of a field type is set
fn primitive_type_name(value: u16) -> &'static str {
    match value {
        0x8002 => "boolean",
        0x8003 => "byte",
        0x8004 => "short",
        0x8005 => "int",
        _ => "unknown",
    }
}

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    ctx: &Context,
    record: &mut Record,
) -> Result<Vec<MethodBounds>> {
    let class_count = reader.u1()?;
    record.put("class_count-u1", class_count);

    let mut bounds = Vec::new();
    let mut classes = Vec::with_capacity(class_count as usize);
    for _ in 0..class_count {
        classes.push(class_descriptor(reader, ctx, &mut bounds)?);
    }
    record.put("classes", Value::Array(classes));

    record.put("types", type_descriptor_info(reader)?);

    bounds.sort_by_key(|b| b.offset);
    bounds.dedup_by_key(|b| b.offset);
    Ok(bounds)
}

fn class_descriptor(
    reader: &mut Reader<'_>,
    ctx: &Context,
    bounds: &mut Vec<MethodBounds>,
) -> Result<Value> {
    let mut entry = Fields::new();
    entry.insert("token-u1".to_owned(), reader.u1()?.into());
    let access_flags = reader.u1()?;
    entry.insert("access_flags-u1".to_owned(), access_flags.into());
    entry.insert(
        "access_flags_decoded".to_owned(),
        flag_names(access_flags, &CLASS_FLAGS),
    );
    entry.insert(
        "this_class_ref".to_owned(),
        class_ref_value(reader.class_ref()?),
    );
    let interface_count = reader.u1()?;
    entry.insert("interface_count-u1".to_owned(), interface_count.into());
    let field_count = reader.u2()?;
    entry.insert("field_count-u2".to_owned(), field_count.into());
    let method_count = reader.u2()?;
    entry.insert("method_count-u2".to_owned(), method_count.into());

    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(class_ref_value(reader.class_ref()?));
    }
    entry.insert("interfaces".to_owned(), Value::Array(interfaces));

    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(field_descriptor(reader)?);
    }
    entry.insert("fields".to_owned(), Value::Array(fields));

    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        methods.push(method_descriptor(reader, ctx, bounds)?);
    }
    entry.insert("methods".to_owned(), Value::Array(methods));
    Ok(Value::Object(entry.into_iter().collect()))
}

fn field_descriptor(reader: &mut Reader<'_>) -> Result<Value> {
    let mut entry = Fields::new();
    entry.insert("token-u1".to_owned(), reader.u1()?.into());
    let access_flags = reader.u1()?;
    entry.insert("access_flags-u1".to_owned(), access_flags.into());
    entry.insert(
        "access_flags_decoded".to_owned(),
        flag_names(access_flags, &FIELD_FLAGS),
    );

    // The 3-byte field_ref union is discriminated by ACC_STATIC.
    let mut field_ref = Fields::new();
    if access_flags & ACC_STATIC != 0 {
        let first = reader.u1()?;
        if first & 0x80 != 0 {
            field_ref.insert("kind".to_owned(), "external".into());
            field_ref.insert("package_token-u1".to_owned(), (first & 0x7f).into());
            field_ref.insert("class_token-u1".to_owned(), reader.u1()?.into());
            field_ref.insert("token-u1".to_owned(), reader.u1()?.into());
        } else {
            field_ref.insert("kind".to_owned(), "internal".into());
            field_ref.insert("padding-u1".to_owned(), first.into());
            field_ref.insert("offset-u2".to_owned(), reader.u2()?.into());
        }
    } else {
        field_ref.insert("kind".to_owned(), "instance".into());
        field_ref.insert("class_ref".to_owned(), class_ref_value(reader.class_ref()?));
        field_ref.insert("token-u1".to_owned(), reader.u1()?.into());
    }
    entry.insert(
        "field_ref".to_owned(),
        Value::Object(field_ref.into_iter().collect()),
    );

    let type_value = reader.u2()?;
    let mut type_entry = Fields::new();
    type_entry.insert("value-u2".to_owned(), type_value.into());
    if type_value & 0x8000 != 0 {
        type_entry.insert("kind".to_owned(), "primitive".into());
        type_entry.insert(
            "primitive_type".to_owned(),
            primitive_type_name(type_value).into(),
        );
    } else {
        type_entry.insert("kind".to_owned(), "reference".into());
        type_entry.insert("offset".to_owned(), type_value.into());
    }
    entry.insert(
        "type".to_owned(),
        Value::Object(type_entry.into_iter().collect()),
    );
    Ok(Value::Object(entry.into_iter().collect()))
}

fn method_descriptor(
    reader: &mut Reader<'_>,
    ctx: &Context,
    bounds: &mut Vec<MethodBounds>,
) -> Result<Value> {
    let mut entry = Fields::new();
    entry.insert("token-u1".to_owned(), reader.u1()?.into());
    let access_flags = reader.u1()?;
    entry.insert("access_flags-u1".to_owned(), access_flags.into());
    entry.insert(
        "access_flags_decoded".to_owned(),
        flag_names(access_flags, &METHOD_FLAGS),
    );
    let method_offset = if ctx.extended {
        let offset = reader.u4()?;
        entry.insert("method_offset-u4".to_owned(), offset.into());
        offset
    } else {
        let offset = reader.u2()?;
        entry.insert("method_offset-u2".to_owned(), offset.into());
        u32::from(offset)
    };
    entry.insert("type_offset-u2".to_owned(), reader.u2()?.into());
    let bytecode_count = reader.u2()?;
    entry.insert("bytecode_count-u2".to_owned(), bytecode_count.into());
    entry.insert(
        "exception_handler_count-u2".to_owned(),
        reader.u2()?.into(),
    );
    entry.insert(
        "exception_handler_index-u2".to_owned(),
        reader.u2()?.into(),
    );

    // Abstract and imported methods carry offset 0 and contribute no body.
    if method_offset > 0 {
        bounds.push(MethodBounds {
            offset: method_offset,
            bytecode_count,
        });
    }
    Ok(Value::Object(entry.into_iter().collect()))
}

fn type_descriptor_info(reader: &mut Reader<'_>) -> Result<Value> {
    let mut info = Fields::new();
    let cp_count = reader.u2()?;
    info.insert("constant_pool_count-u2".to_owned(), cp_count.into());
    let mut cp_types = Vec::with_capacity(cp_count as usize);
    for _ in 0..cp_count {
        cp_types.push(Value::from(reader.u2()?));
    }
    info.insert("constant_pool_types".to_owned(), Value::Array(cp_types));

    let mut descriptors = Vec::new();
    while !reader.is_empty() {
        descriptors.push(type_descriptor_value(&reader.type_descriptor()?));
    }
    info.insert("type_descriptors".to_owned(), Value::Array(descriptors));
    Ok(Value::Object(info.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Version;
    use hex_literal::hex;

    // One public class with one public static install method at offset 1,
    // one bytecode; pool maps the single CP entry to no field type.
    const DESC_21: [u8; 28] = hex!(
        "01"
        "00 01 0000 00 0000 0001"
        "00 09 0001 0000 0001 0000 0000"
        "0001 ffff 01 10"
    );

    #[test]
    fn test_method_bounds_collected() {
        let ctx = Context::new(Version::V2_1, 1, 2);
        let mut record = Record::with_raw(&DESC_21);
        let mut reader = Reader::new("Descriptor", &DESC_21);
        let bounds = decode(&mut reader, &ctx, &mut record).unwrap();

        assert!(reader.is_empty());
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds[0].offset, 1);
        assert_eq!(bounds[0].bytecode_count, 1);
    }

    #[test]
    fn test_class_and_method_fields() {
        let ctx = Context::new(Version::V2_1, 1, 2);
        let mut record = Record::with_raw(&DESC_21);
        let mut reader = Reader::new("Descriptor", &DESC_21);
        decode(&mut reader, &ctx, &mut record).unwrap();

        let classes = record.get("classes").unwrap().as_array().unwrap();
        assert_eq!(classes[0]["access_flags_decoded"][0], "ACC_PUBLIC");
        let methods = classes[0]["methods"].as_array().unwrap();
        assert_eq!(methods[0]["method_offset-u2"], 1);
        let decoded = methods[0]["access_flags_decoded"].as_array().unwrap();
        assert!(decoded.iter().any(|f| f == "ACC_STATIC"));

        let types = record.get("types").unwrap();
        assert_eq!(types["constant_pool_count-u2"], 1);
        assert_eq!(types["constant_pool_types"][0], 0xffff);
        assert_eq!(types["type_descriptors"][0]["types"][0], "void");
    }

    #[test]
    fn test_instance_field_ref() {
        // One class with a single private instance byte field.
        let info = hex!(
            "01"
            "00 01 0000 00 0001 0000"
            "ff 02 0000 00 8003"
            "0000"
        );
        let ctx = Context::new(Version::V2_1, 1, 2);
        let mut record = Record::with_raw(&info);
        let mut reader = Reader::new("Descriptor", &info);
        decode(&mut reader, &ctx, &mut record).unwrap();

        let classes = record.get("classes").unwrap().as_array().unwrap();
        let fields = classes[0]["fields"].as_array().unwrap();
        assert_eq!(fields[0]["token-u1"], 0xff);
        assert_eq!(fields[0]["field_ref"]["kind"], "instance");
        assert_eq!(fields[0]["type"]["primitive_type"], "byte");
    }
}
