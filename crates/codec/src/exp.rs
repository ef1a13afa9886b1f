//! EXP (export file) codec
//!
//! A single flat blob, no envelope: magic `0x00FACADE`, version pair, a
//! tagged constant pool, the `this_package` index, a referenced-packages
//! list (2.3+), then class_info entries with their field and method tables.
//! The same Shallow passthrough discipline applies: an unedited
//! decode-then-encode is byte-identical.

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::Version;
use crate::error::{Error, Result, Warning};
use crate::reader::Reader;
use crate::record::{Fields, Record, hex_value};

/// Export file magic
pub const MAGIC: u32 = 0x00fa_cade;

/// Constant pool tags
pub mod cp_tags {
    /// CONSTANT_Utf8_info
    pub const UTF8: u8 = 1;
    /// CONSTANT_Integer_info
    pub const INTEGER: u8 = 3;
    /// CONSTANT_Classref_info
    pub const CLASSREF: u8 = 7;
    /// CONSTANT_Package_info
    pub const PACKAGE: u8 = 13;
}

const CLASS_FLAGS: [(u16, &str); 6] = [
    (0x0001, "ACC_PUBLIC"),
    (0x0010, "ACC_FINAL"),
    (0x0200, "ACC_INTERFACE"),
    (0x0400, "ACC_ABSTRACT"),
    (0x0800, "ACC_SHAREABLE"),
    (0x1000, "ACC_REMOTE"),
];

const FIELD_FLAGS: [(u16, &str); 4] = [
    (0x0001, "ACC_PUBLIC"),
    (0x0004, "ACC_PROTECTED"),
    (0x0008, "ACC_STATIC"),
    (0x0010, "ACC_FINAL"),
];

const METHOD_FLAGS: [(u16, &str); 5] = [
    (0x0001, "ACC_PUBLIC"),
    (0x0004, "ACC_PROTECTED"),
    (0x0008, "ACC_STATIC"),
    (0x0010, "ACC_FINAL"),
    (0x0400, "ACC_ABSTRACT"),
];

fn flag_names16(value: u16, table: &[(u16, &str)]) -> Value {
    Value::Array(
        table
            .iter()
            .filter(|(mask, _)| value & mask != 0)
            .map(|(_, name)| Value::String((*name).to_owned()))
            .collect(),
    )
}

/// A decoded EXP file in intermediate form
#[derive(Debug, Clone, Default)]
pub struct ExpFile {
    record: Record,
    warnings: Vec<Warning>,
}

impl ExpFile {
    /// Decode a binary export file
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut warnings = Vec::new();
        let mut record = Record::with_raw(bytes);
        let mut reader = Reader::new("Export file", bytes);

        let magic = reader.u4()?;
        record.put("magic-u4", hex_value(&magic.to_be_bytes()));
        if magic != MAGIC {
            warnings.push(Warning::InvariantViolation {
                component: "Export file".to_owned(),
                detail: format!("magic 0x{magic:08x}, expected 0x00facade"),
            });
        }
        let minor = reader.u1()?;
        let major = reader.u1()?;
        record.put("minor_version-u1", minor);
        record.put("major_version-u1", major);
        let version = Version::from_pair(major, minor)?;
        debug!(?version, "decoding export file");

        let cp_count = reader.u2()?;
        record.put("constant_pool_count-u2", cp_count);
        let mut pool = Vec::with_capacity(cp_count as usize);
        for _ in 0..cp_count {
            pool.push(cp_entry(&mut reader)?);
        }
        record.put("constant_pool", Value::Array(pool));

        record.put("this_package-u2", reader.u2()?);

        if version >= Version::V2_3 {
            let count = reader.u1()?;
            record.put("referenced_package_count-u1", count);
            let mut referenced = Vec::with_capacity(count as usize);
            for _ in 0..count {
                referenced.push(Value::from(reader.u2()?));
            }
            record.put("referenced_packages", Value::Array(referenced));
        }

        let class_count = reader.u1()?;
        record.put("export_class_count-u1", class_count);
        let mut classes = Vec::with_capacity(class_count as usize);
        for _ in 0..class_count {
            classes.push(class_info(&mut reader)?);
        }
        record.put("classes", Value::Array(classes));

        if !reader.is_empty() {
            let left = reader.remaining();
            warnings.push(Warning::InvariantViolation {
                component: "Export file".to_owned(),
                detail: format!("{left} trailing byte(s) after parsed fields"),
            });
            record.put("trailing", hex_value(reader.take(left)?));
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        Ok(Self { record, warnings })
    }

    /// Re-assemble the binary file: `raw_modified` (normalized) over `raw`
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.record.emit_bytes("Export file")
    }

    /// Borrow the single record
    pub const fn record(&self) -> &Record {
        &self.record
    }

    /// Mutable record access, for installing a `raw_modified` override
    pub const fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Warnings collected during decode
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Intermediate form as a JSON string
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(&self.record)?
        } else {
            serde_json::to_string(&self.record)?
        })
    }

    /// Rebuild from the intermediate form
    pub fn from_json(text: &str) -> Result<Self> {
        let record: Record = serde_json::from_str(text)
            .map_err(|_| Error::InvalidRecord("export file form is not an object".into()))?;
        Ok(Self {
            record,
            warnings: Vec::new(),
        })
    }
}

fn cp_entry(reader: &mut Reader<'_>) -> Result<Value> {
    let tag = reader.u1()?;
    let mut entry = Fields::new();
    entry.insert("tag-u1".to_owned(), tag.into());
    match tag {
        cp_tags::UTF8 => {
            entry.insert("type".to_owned(), "CONSTANT_Utf8".into());
            let length = reader.u2()?;
            entry.insert("length-u2".to_owned(), length.into());
            let bytes = reader.take(length as usize)?;
            match core::str::from_utf8(bytes) {
                Ok(s) => entry.insert("bytes".to_owned(), s.into()),
                Err(_) => entry.insert("bytes".to_owned(), hex_value(bytes)),
            };
        }
        cp_tags::INTEGER => {
            entry.insert("type".to_owned(), "CONSTANT_Integer".into());
            entry.insert("bytes-u4".to_owned(), reader.u4()?.into());
        }
        cp_tags::CLASSREF => {
            entry.insert("type".to_owned(), "CONSTANT_Classref".into());
            entry.insert("name_index-u2".to_owned(), reader.u2()?.into());
        }
        cp_tags::PACKAGE => {
            entry.insert("type".to_owned(), "CONSTANT_Package".into());
            entry.insert("flags-u1".to_owned(), reader.u1()?.into());
            entry.insert("name_index-u2".to_owned(), reader.u2()?.into());
            entry.insert("minor_version-u1".to_owned(), reader.u1()?.into());
            entry.insert("major_version-u1".to_owned(), reader.u1()?.into());
            let (aid_len, aid) = reader.aid()?;
            entry.insert("AID_length-u1".to_owned(), aid_len.into());
            entry.insert("AID".to_owned(), hex::encode(aid).into());
        }
        _ => {
            entry.insert("type".to_owned(), "CONSTANT_Unknown".into());
        }
    }
    Ok(Value::Object(entry.into_iter().collect()))
}

fn class_info(reader: &mut Reader<'_>) -> Result<Value> {
    let mut entry = Fields::new();
    entry.insert("token-u1".to_owned(), reader.u1()?.into());
    let access_flags = reader.u2()?;
    entry.insert("access_flags-u2".to_owned(), access_flags.into());
    entry.insert(
        "access_flags_decoded".to_owned(),
        flag_names16(access_flags, &CLASS_FLAGS),
    );
    entry.insert("name_index-u2".to_owned(), reader.u2()?.into());

    let supers_count = reader.u2()?;
    entry.insert("export_supers_count-u2".to_owned(), supers_count.into());
    let mut supers = Vec::with_capacity(supers_count as usize);
    for _ in 0..supers_count {
        supers.push(Value::from(reader.u2()?));
    }
    entry.insert("supers".to_owned(), Value::Array(supers));

    let iface_count = reader.u1()?;
    entry.insert("export_interfaces_count-u1".to_owned(), iface_count.into());
    let mut interfaces = Vec::with_capacity(iface_count as usize);
    for _ in 0..iface_count {
        interfaces.push(Value::from(reader.u2()?));
    }
    entry.insert("interfaces".to_owned(), Value::Array(interfaces));

    let field_count = reader.u2()?;
    entry.insert("export_fields_count-u2".to_owned(), field_count.into());
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(field_info(reader)?);
    }
    entry.insert("fields".to_owned(), Value::Array(fields));

    let method_count = reader.u2()?;
    entry.insert("export_methods_count-u2".to_owned(), method_count.into());
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        methods.push(method_info(reader)?);
    }
    entry.insert("methods".to_owned(), Value::Array(methods));
    Ok(Value::Object(entry.into_iter().collect()))
}

fn field_info(reader: &mut Reader<'_>) -> Result<Value> {
    let mut entry = Fields::new();
    entry.insert("token-u1".to_owned(), reader.u1()?.into());
    let access_flags = reader.u2()?;
    entry.insert("access_flags-u2".to_owned(), access_flags.into());
    entry.insert(
        "access_flags_decoded".to_owned(),
        flag_names16(access_flags, &FIELD_FLAGS),
    );
    entry.insert("name_index-u2".to_owned(), reader.u2()?.into());
    entry.insert("descriptor_index-u2".to_owned(), reader.u2()?.into());

    let attr_count = reader.u2()?;
    entry.insert("attributes_count-u2".to_owned(), attr_count.into());
    let mut attributes = Vec::with_capacity(attr_count as usize);
    for _ in 0..attr_count {
        let mut attr = Fields::new();
        attr.insert("attribute_name_index-u2".to_owned(), reader.u2()?.into());
        let length = reader.u4()?;
        attr.insert("attribute_length-u4".to_owned(), length.into());
        attr.insert(
            "info".to_owned(),
            hex_value(reader.take(length as usize)?),
        );
        attributes.push(Value::Object(attr.into_iter().collect()));
    }
    entry.insert("attributes".to_owned(), Value::Array(attributes));
    Ok(Value::Object(entry.into_iter().collect()))
}

fn method_info(reader: &mut Reader<'_>) -> Result<Value> {
    let mut entry = Fields::new();
    entry.insert("token-u1".to_owned(), reader.u1()?.into());
    let access_flags = reader.u2()?;
    entry.insert("access_flags-u2".to_owned(), access_flags.into());
    entry.insert(
        "access_flags_decoded".to_owned(),
        flag_names16(access_flags, &METHOD_FLAGS),
    );
    entry.insert("name_index-u2".to_owned(), reader.u2()?.into());
    entry.insert("descriptor_index-u2".to_owned(), reader.u2()?.into());
    Ok(Value::Object(entry.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // Minimal 2.1 export file: Utf8 "hello", one package entry, no classes.
    fn sample_exp_21() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&hex!("00facade 01 02"));
        bytes.extend_from_slice(&hex!("0002"));
        bytes.extend_from_slice(&hex!("01 0005 68656c6c6f"));
        bytes.extend_from_slice(&hex!("0d 00 0000 00 01 05 4444444444"));
        bytes.extend_from_slice(&hex!("0001"));
        bytes.extend_from_slice(&hex!("00"));
        bytes
    }

    #[test]
    fn test_decode_fields() {
        let bytes = sample_exp_21();
        let exp = ExpFile::decode(&bytes).unwrap();
        let record = exp.record();

        assert_eq!(record.get("magic-u4").unwrap(), "00facade");
        let pool = record.get("constant_pool").unwrap().as_array().unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0]["type"], "CONSTANT_Utf8");
        assert_eq!(pool[0]["bytes"], "hello");
        assert_eq!(pool[1]["type"], "CONSTANT_Package");
        assert_eq!(pool[1]["AID"], "4444444444");
        assert_eq!(record.get("this_package-u2").unwrap(), 1);
        assert!(exp.warnings().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let bytes = sample_exp_21();
        let exp = ExpFile::decode(&bytes).unwrap();
        assert_eq!(exp.encode().unwrap(), bytes);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let bytes = hex!("00facade 00 03 0000 0000 00");
        assert!(matches!(
            ExpFile::decode(&bytes),
            Err(Error::UnsupportedVersion { major: 3, minor: 0 })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let bytes = sample_exp_21();
        let exp = ExpFile::decode(&bytes).unwrap();
        let json = exp.to_json(false).unwrap();
        let rebuilt = ExpFile::from_json(&json).unwrap();
        assert_eq!(rebuilt.encode().unwrap(), bytes);
    }
}
