//! Class component (tag 6)
//!
//! A signature pool (2.2+) followed by interface_info and class_info
//! structures packed back to back until the blob ends. There is no per-class
//! length prefix: every field must be sized exactly or the remainder of the
//! component misparses.

use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::reader::Reader;
use crate::record::{Fields, Record};

use super::{class_ref_value, flag_names, type_descriptor_value};

/// Flags nibble of interface_info and class_info
const CLASS_FLAGS: [(u8, &str); 3] = [
    (0x8, "ACC_INTERFACE"),
    (0x4, "ACC_SHAREABLE"),
    (0x2, "ACC_REMOTE"),
];

const ACC_INTERFACE: u8 = 0x8;
const ACC_REMOTE: u8 = 0x2;

pub(crate) fn decode(reader: &mut Reader<'_>, ctx: &Context, record: &mut Record) -> Result<()> {
    if ctx.at_least_22() {
        let pool_len = reader.u2()?;
        record.put("signature_pool_length-u2", pool_len);
        let pool_bytes = reader.take(pool_len as usize)?;
        let mut pool_reader = Reader::new("Class", pool_bytes);
        let mut pool = Vec::new();
        while !pool_reader.is_empty() {
            pool.push(type_descriptor_value(&pool_reader.type_descriptor()?));
        }
        record.put("signature_pool", Value::Array(pool));
    }

    let mut classes = Vec::new();
    while !reader.is_empty() {
        let (flags, interface_count) = reader.nibbles()?;
        let mut entry = Fields::new();
        entry.insert(
            "bitfield-u1".to_owned(),
            ((flags << 4) | interface_count).into(),
        );
        entry.insert("flags".to_owned(), flag_names(flags, &CLASS_FLAGS));
        entry.insert("interface_count".to_owned(), interface_count.into());
        if flags & ACC_INTERFACE != 0 {
            entry.insert("kind".to_owned(), "interface_info".into());
            interface_info(reader, ctx, flags, interface_count, &mut entry)?;
        } else {
            entry.insert("kind".to_owned(), "class_info".into());
            class_info(reader, ctx, flags, interface_count, &mut entry)?;
        }
        classes.push(Value::Object(entry.into_iter().collect()));
    }
    record.put("classes", Value::Array(classes));
    Ok(())
}

fn interface_info(
    reader: &mut Reader<'_>,
    ctx: &Context,
    flags: u8,
    interface_count: u8,
    entry: &mut Fields,
) -> Result<()> {
    let mut supers = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        supers.push(class_ref_value(reader.class_ref()?));
    }
    entry.insert("superinterfaces".to_owned(), Value::Array(supers));

    if ctx.at_least_22() && flags & ACC_REMOTE != 0 {
        let start = reader.pos();
        let name = reader.name()?;
        let name_length = (reader.pos() - start - 1) as u8;
        let mut info = Fields::new();
        info.insert("interface_name_length-u1".to_owned(), name_length.into());
        info.insert("interface_name".to_owned(), name.into());
        entry.insert(
            "interface_name_info".to_owned(),
            Value::Object(info.into_iter().collect()),
        );
    }
    Ok(())
}

fn class_info(
    reader: &mut Reader<'_>,
    ctx: &Context,
    flags: u8,
    interface_count: u8,
    entry: &mut Fields,
) -> Result<()> {
    entry.insert(
        "super_class_ref".to_owned(),
        class_ref_value(reader.class_ref()?),
    );
    entry.insert("declared_instance_size-u1".to_owned(), reader.u1()?.into());
    entry.insert("first_reference_token-u1".to_owned(), reader.u1()?.into());
    entry.insert("reference_count-u1".to_owned(), reader.u1()?.into());
    entry.insert("public_method_table_base-u1".to_owned(), reader.u1()?.into());
    let public_count = reader.u1()?;
    entry.insert("public_method_table_count-u1".to_owned(), public_count.into());
    entry.insert(
        "package_method_table_base-u1".to_owned(),
        reader.u1()?.into(),
    );
    let package_count = reader.u1()?;
    entry.insert(
        "package_method_table_count-u1".to_owned(),
        package_count.into(),
    );

    // Virtual method table slots are offsets into Method; the extended
    // layout widens them past the u2 horizon.
    entry.insert(
        "public_virtual_method_table".to_owned(),
        method_table(reader, ctx, public_count)?,
    );
    entry.insert(
        "package_virtual_method_table".to_owned(),
        method_table(reader, ctx, package_count)?,
    );

    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        let mut imp = Fields::new();
        imp.insert(
            "interface".to_owned(),
            class_ref_value(reader.class_ref()?),
        );
        let count = reader.u1()?;
        imp.insert("count-u1".to_owned(), count.into());
        let index = reader.take(count as usize)?;
        imp.insert("index".to_owned(), hex::encode(index).into());
        interfaces.push(Value::Object(imp.into_iter().collect()));
    }
    entry.insert("implemented_interfaces".to_owned(), Value::Array(interfaces));

    if ctx.at_least_22() && flags & ACC_REMOTE != 0 {
        entry.insert(
            "remote_interface_info".to_owned(),
            remote_interface_info(reader)?,
        );
    }

    if ctx.at_least_23() {
        let mapping = reader.take(public_count as usize)?;
        entry.insert(
            "public_virtual_method_token_mapping".to_owned(),
            hex::encode(mapping).into(),
        );
        entry.insert(
            "CAP22_inheritable_public_method_token_count-u1".to_owned(),
            reader.u1()?.into(),
        );
    }
    Ok(())
}

fn method_table(reader: &mut Reader<'_>, ctx: &Context, count: u8) -> Result<Value> {
    let mut table = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if ctx.extended {
            table.push(Value::from(reader.u4()?));
        } else {
            table.push(Value::from(reader.u2()?));
        }
    }
    Ok(Value::Array(table))
}

fn remote_interface_info(reader: &mut Reader<'_>) -> Result<Value> {
    let mut info = Fields::new();
    let method_count = reader.u1()?;
    info.insert("remote_methods_count-u1".to_owned(), method_count.into());
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let mut m = Fields::new();
        m.insert("remote_method_hash-u2".to_owned(), reader.u2()?.into());
        m.insert("signature_offset-u2".to_owned(), reader.u2()?.into());
        m.insert("virtual_method_token-u1".to_owned(), reader.u1()?.into());
        methods.push(Value::Object(m.into_iter().collect()));
    }
    info.insert("remote_methods".to_owned(), Value::Array(methods));

    let modifier_len = reader.u1()?;
    info.insert("hash_modifier_length-u1".to_owned(), modifier_len.into());
    info.insert(
        "hash_modifier".to_owned(),
        hex::encode(reader.take(modifier_len as usize)?).into(),
    );
    let start = reader.pos();
    let name = reader.name()?;
    let name_length = (reader.pos() - start - 1) as u8;
    info.insert("class_name_length-u1".to_owned(), name_length.into());
    info.insert("class_name".to_owned(), name.into());

    let iface_count = reader.u1()?;
    info.insert("remote_interfaces_count-u1".to_owned(), iface_count.into());
    let mut ifaces = Vec::with_capacity(iface_count as usize);
    for _ in 0..iface_count {
        ifaces.push(class_ref_value(reader.class_ref()?));
    }
    info.insert("remote_interfaces".to_owned(), Value::Array(ifaces));
    Ok(Value::Object(info.into_iter().collect()))
}
