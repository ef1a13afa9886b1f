//! StaticResources component (tag 13, 2.3+)
//!
//! A directory of `{resource_id, size}` pairs followed by the concatenated
//! resource blobs. Sizes are bounded by 32767 and ids are unique within the
//! file; both are checked as warnings.

use serde_json::Value;

use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Fields, Record, hex_value};

/// Largest legal resource size
const MAX_RESOURCE_SIZE: u32 = 32767;

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let count = reader.u2()?;
    record.put("resource_count-u2", count);

    let mut directory = Vec::with_capacity(count as usize);
    let mut sizes = Vec::with_capacity(count as usize);
    let mut seen_ids = Vec::new();
    for _ in 0..count {
        let id = reader.u2()?;
        let size = reader.u4()?;
        if size > MAX_RESOURCE_SIZE {
            warnings.push(Warning::InvariantViolation {
                component: "StaticResources".to_owned(),
                detail: format!("resource {id} size {size} exceeds {MAX_RESOURCE_SIZE}"),
            });
        }
        if seen_ids.contains(&id) {
            warnings.push(Warning::InvariantViolation {
                component: "StaticResources".to_owned(),
                detail: format!("duplicate resource id {id}"),
            });
        }
        seen_ids.push(id);
        let mut entry = Fields::new();
        entry.insert("resource_id-u2".to_owned(), id.into());
        entry.insert("resource_size-u4".to_owned(), size.into());
        directory.push(Value::Object(entry.into_iter().collect()));
        sizes.push(size);
    }
    record.put("directory", Value::Array(directory));

    let mut resources = Vec::with_capacity(sizes.len());
    for size in sizes {
        resources.push(hex_value(reader.take(size as usize)?));
    }
    record.put("resources", Value::Array(resources));
    Ok(())
}
