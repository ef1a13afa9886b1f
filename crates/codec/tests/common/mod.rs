//! Synthesized helloworld-package samples
//!
//! Builds small but fully consistent CAP archives (and a matching EXP file)
//! for each format generation: sizes in Directory match the components,
//! Descriptor delimits the single install method, and the applet AID shares
//! the package RID.

// Each test binary uses its own slice of this module.
#![allow(dead_code)]

use capastrophic_codec::envelope;

/// Package AID of the helloworld sample
pub const PACKAGE_AID: [u8; 5] = [0x44, 0x44, 0x44, 0x44, 0x44];
/// Applet AID: package RID + one byte
pub const APPLET_AID: [u8; 6] = [0x44, 0x44, 0x44, 0x44, 0x44, 0x01];

fn put_u2(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u4(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Wrap `info` in the tag-size-info shape
fn component(tag: u8, long_size: bool, info: &[u8]) -> Vec<u8> {
    let mut blob = vec![tag];
    if long_size {
        put_u4(&mut blob, info.len() as u32);
    } else {
        put_u2(&mut blob, info.len() as u16);
    }
    blob.extend_from_slice(info);
    blob
}

fn header_info(minor: u8, extended: bool) -> Vec<u8> {
    let mut info = vec![0xde, 0xca, 0xff, 0xed, minor, 0x02];
    let flags = if extended { 0x04 | 0x08 } else { 0x04 };
    info.push(flags);
    info.extend_from_slice(&[0x00, 0x01]); // package version 1.0
    info.push(PACKAGE_AID.len() as u8);
    info.extend_from_slice(&PACKAGE_AID);
    info
}

fn applet_info(extended: bool) -> Vec<u8> {
    let mut info = vec![0x01, APPLET_AID.len() as u8];
    info.extend_from_slice(&APPLET_AID);
    if extended {
        put_u4(&mut info, 1);
    } else {
        put_u2(&mut info, 1);
    }
    info
}

fn import_info() -> Vec<u8> {
    // javacard/framework 1.0
    let mut info = vec![0x01, 0x00, 0x01, 0x07];
    info.extend_from_slice(&[0xa0, 0x00, 0x00, 0x00, 0x62, 0x01, 0x01]);
    info
}

fn constant_pool_info() -> Vec<u8> {
    // One StaticMethodref to the internal install method at offset 1
    vec![0x00, 0x01, 0x06, 0x00, 0x00, 0x01]
}

fn class_info(minor: u8) -> Vec<u8> {
    let mut info = Vec::new();
    if minor >= 2 {
        put_u2(&mut info, 0); // empty signature pool
    }
    // One class extending an external framework class, no methods tables
    info.extend_from_slice(&[0x00, 0x80, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    if minor >= 3 {
        info.push(0x00); // CAP22_inheritable_public_method_token_count
    }
    info
}

fn method_info() -> Vec<u8> {
    // No handlers; one method (header 01 10) whose body is `return`
    vec![0x00, 0x01, 0x10, 0x7a]
}

fn static_field_info() -> Vec<u8> {
    vec![0x00; 10]
}

fn ref_location_info() -> Vec<u8> {
    // Empty 1-byte list; two 2-byte-index sites at offsets 1 and 3
    vec![0x00, 0x00, 0x00, 0x02, 0x01, 0x02]
}

fn descriptor_info(extended: bool) -> Vec<u8> {
    let mut info = vec![0x01];
    // class: token 0, public, internal ref 0, no interfaces/fields, 1 method
    info.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
    // method: token 0, public static, offset 1, type 0, 1 bytecode
    info.extend_from_slice(&[0x00, 0x09]);
    if extended {
        put_u4(&mut info, 1);
    } else {
        put_u2(&mut info, 1);
    }
    info.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]);
    // type pool: one CP entry with no field type, one "()V" descriptor
    info.extend_from_slice(&[0x00, 0x01, 0xff, 0xff, 0x01, 0x10]);
    info
}

fn directory_info(minor: u8, extended: bool, sizes: &[(u8, u32)]) -> Vec<u8> {
    let size_of = |tag: u8| sizes.iter().find(|&&(t, _)| t == tag).map_or(0, |&(_, s)| s);
    let mut info = Vec::new();
    let table_len = if minor >= 2 { 12 } else { 11 };
    for tag in 1..=table_len {
        let long = extended && matches!(tag, 7 | 9 | 11 | 12);
        if long {
            put_u4(&mut info, size_of(tag));
        } else {
            put_u2(&mut info, size_of(tag) as u16);
        }
    }
    if minor >= 3 {
        put_u4(&mut info, 0); // StaticResources absent
    }
    info.extend_from_slice(&[0x00; 6]); // static field image metrics
    info.extend_from_slice(&[0x01, 0x01, 0x00]); // imports, applets, customs
    info
}

/// Build a consistent helloworld CAP for CAP format `2.<minor>`
pub fn helloworld_cap(minor: u8, extended: bool) -> Vec<u8> {
    let header = header_info(minor, extended);
    let applet = applet_info(extended);
    let import = import_info();
    let class = class_info(minor);
    let method = method_info();
    let static_field = static_field_info();
    let constant_pool = constant_pool_info();
    let ref_location = ref_location_info();
    let descriptor = descriptor_info(extended);

    let mut sizes: Vec<(u8, u32)> = vec![
        (1, header.len() as u32),
        (3, applet.len() as u32),
        (4, import.len() as u32),
        (5, constant_pool.len() as u32),
        (6, class.len() as u32),
        (7, method.len() as u32),
        (8, static_field.len() as u32),
        (9, ref_location.len() as u32),
        (11, descriptor.len() as u32),
    ];
    let directory = directory_info(minor, extended, &sizes);
    sizes.push((2, directory.len() as u32));
    // Directory records its own size too; rebuild with the real value.
    let directory = directory_info(minor, extended, &sizes);

    let long = |tag: u8| extended && matches!(tag, 7 | 9 | 11);
    let entries = vec![
        ("Header.cap", component(1, false, &header)),
        ("Directory.cap", component(2, false, &directory)),
        ("Import.cap", component(4, false, &import)),
        ("Applet.cap", component(3, false, &applet)),
        ("Class.cap", component(6, false, &class)),
        ("Method.cap", component(7, long(7), &method)),
        ("StaticField.cap", component(8, false, &static_field)),
        ("ConstantPool.cap", component(5, false, &constant_pool)),
        ("RefLocation.cap", component(9, long(9), &ref_location)),
        ("Descriptor.cap", component(11, long(11), &descriptor)),
    ];
    let named: Vec<(String, Vec<u8>)> = entries
        .into_iter()
        .map(|(name, blob)| (format!("helloworld/javacard/{name}"), blob))
        .collect();
    envelope::write_cap(&named).expect("sample archive")
}

/// Same archive with one Directory size byte bumped (for tamper tests)
pub fn helloworld_cap_with_corrupt_directory(minor: u8) -> Vec<u8> {
    let bytes = helloworld_cap(minor, false);
    let entries = envelope::read_cap(&bytes).expect("sample archive");
    let tampered: Vec<(String, Vec<u8>)> = entries
        .into_iter()
        .map(|entry| {
            let mut data = entry.data;
            if entry.name.ends_with("/Directory.cap") {
                // component_sizes[0] (Header) lives right after tag + size
                data[4] += 1;
            }
            (entry.name, data)
        })
        .collect();
    envelope::write_cap(&tampered).expect("tampered archive")
}

/// Build the matching export file for `2.<minor>`
pub fn helloworld_exp(minor: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    put_u4(&mut bytes, 0x00fa_cade);
    bytes.push(minor);
    bytes.push(0x02);
    // Constant pool: package name Utf8, then the package itself
    put_u2(&mut bytes, 2);
    bytes.push(0x01);
    put_u2(&mut bytes, 10);
    bytes.extend_from_slice(b"helloworld");
    bytes.push(0x0d);
    bytes.push(0x00);
    put_u2(&mut bytes, 0); // name_index -> the Utf8 above
    bytes.extend_from_slice(&[0x00, 0x01]); // package version 1.0
    bytes.push(PACKAGE_AID.len() as u8);
    bytes.extend_from_slice(&PACKAGE_AID);
    put_u2(&mut bytes, 1); // this_package -> the CONSTANT_Package above
    if minor >= 3 {
        bytes.push(0x00); // no referenced packages
    }
    bytes.push(0x00); // no exported classes
    bytes
}
