//! Export component (tag 10)
//!
//! Lists the externally visible classes of an exported package with the
//! offsets of their public static fields and methods. Applet packages only
//! export Shareable interfaces, for which the static method count is zero.

use serde_json::Value;

use crate::error::Result;
use crate::reader::Reader;
use crate::record::{Fields, Record};

pub(crate) fn decode(reader: &mut Reader<'_>, record: &mut Record) -> Result<()> {
    let class_count = reader.u1()?;
    record.put("class_count-u1", class_count);

    let mut classes = Vec::with_capacity(class_count as usize);
    for _ in 0..class_count {
        let mut entry = Fields::new();
        entry.insert("class_offset-u2".to_owned(), reader.u2()?.into());
        let field_count = reader.u1()?;
        entry.insert("static_field_count-u1".to_owned(), field_count.into());
        let method_count = reader.u1()?;
        entry.insert("static_method_count-u1".to_owned(), method_count.into());

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(Value::from(reader.u2()?));
        }
        entry.insert("static_field_offsets".to_owned(), Value::Array(fields));

        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(Value::from(reader.u2()?));
        }
        entry.insert("static_method_offsets".to_owned(), Value::Array(methods));
        classes.push(Value::Object(entry.into_iter().collect()));
    }
    record.put("class_exports", Value::Array(classes));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_exported_class() {
        let info = hex!("01 0000 02 01 0000 0002 0005");
        let mut record = Record::with_raw(&info);
        let mut reader = Reader::new("Export", &info);
        decode(&mut reader, &mut record).unwrap();

        assert!(reader.is_empty());
        let classes = record.get("class_exports").unwrap().as_array().unwrap();
        assert_eq!(classes[0]["static_field_count-u1"], 2);
        assert_eq!(
            classes[0]["static_field_offsets"].as_array().unwrap().len(),
            2
        );
        assert_eq!(classes[0]["static_method_offsets"][0], 5);
    }
}
