//! Import component (tag 4)
//!
//! The table of imported package AIDs with their versions. An index into
//! this table is the package token used by external references everywhere
//! else in the file.

use serde_json::{Value, json};

use crate::error::Result;
use crate::reader::Reader;
use crate::record::Record;

pub(crate) fn decode(reader: &mut Reader<'_>, record: &mut Record) -> Result<()> {
    let count = reader.u1()?;
    record.put("count-u1", count);

    let mut packages = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let minor = reader.u1()?;
        let major = reader.u1()?;
        let (aid_len, aid) = reader.aid()?;
        packages.push(json!({
            "minor_version-u1": minor,
            "major_version-u1": major,
            "AID_length-u1": aid_len,
            "AID": hex::encode(aid),
        }));
    }
    record.put("packages", Value::Array(packages));
    Ok(())
}
