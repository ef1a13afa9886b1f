//! StaticField component (tag 8)
//!
//! Describes the static field image: reference slots first, then primitive
//! defaults (implicit zeros, not stored), then non-default primitive
//! initializer bytes, with an array-initializer table for applet packages.
//! Image segments are ordered {arrays-init, ref-null, prim-default,
//! prim-nondefault}.

use serde_json::Value;

use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Fields, Record, hex_value};

fn array_type_name(type_byte: u8) -> &'static str {
    match type_byte {
        2 => "boolean",
        3 => "byte",
        4 => "short",
        5 => "int",
        _ => "unknown",
    }
}

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let image_size = reader.u2()?;
    record.put("image_size-u2", image_size);
    let reference_count = reader.u2()?;
    record.put("reference_count-u2", reference_count);

    let array_init_count = reader.u2()?;
    record.put("array_init_count-u2", array_init_count);
    let mut inits = Vec::with_capacity(array_init_count as usize);
    for _ in 0..array_init_count {
        let type_byte = reader.u1()?;
        let count = reader.u2()?;
        let values = reader.take(count as usize)?;
        let mut init = Fields::new();
        init.insert("type-u1".to_owned(), type_byte.into());
        init.insert("type_name".to_owned(), array_type_name(type_byte).into());
        init.insert("count-u2".to_owned(), count.into());
        init.insert("values".to_owned(), hex_value(values));
        inits.push(Value::Object(init.into_iter().collect()));
    }
    if array_init_count > 0 {
        record.put("array_init", Value::Array(inits));
    }

    let default_value_count = reader.u2()?;
    record.put("default_value_count-u2", default_value_count);
    let non_default_value_count = reader.u2()?;
    record.put("non_default_value_count-u2", non_default_value_count);
    let non_default_values = reader.take(non_default_value_count as usize)?;
    record.put("non_default_values", hex_value(non_default_values));

    let expected = u32::from(reference_count) * 2
        + u32::from(default_value_count)
        + u32::from(non_default_value_count);
    if u32::from(image_size) != expected {
        warnings.push(Warning::InvariantViolation {
            component: "StaticField".to_owned(),
            detail: format!(
                "image_size {image_size} != 2*{reference_count} + {default_value_count} + {non_default_value_count}"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty_image() {
        let info = hex!("0000 0000 0000 0000 0000");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("StaticField", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();
        assert!(reader.is_empty());
        assert!(warnings.is_empty());
        assert_eq!(record.get("image_size-u2").unwrap(), 0);
    }

    #[test]
    fn test_image_arithmetic() {
        // 1 reference slot + 2 default bytes + 2 non-default bytes = 6
        let info = hex!("0006 0001 0000 0002 0002 cafe");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("StaticField", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(record.get("non_default_values").unwrap(), "cafe");
    }

    #[test]
    fn test_image_size_violation_warns() {
        let info = hex!("0005 0001 0000 0002 0002 cafe");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("StaticField", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_array_init_table() {
        let info = hex!("0000 0000 0001 03 0004 01020304 0000 0000");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("StaticField", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();
        let inits = record.get("array_init").unwrap().as_array().unwrap();
        assert_eq!(inits[0]["type_name"], "byte");
        assert_eq!(inits[0]["values"], "01020304");
    }
}
