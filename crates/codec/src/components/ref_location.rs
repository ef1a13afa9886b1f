//! RefLocation component (tag 9)
//!
//! Two delta-encoded offset lists into the Method component: sites of
//! 1-byte and of 2-byte constant pool indices. Each stored byte is a
//! forward delta from the previous site; the decoder also reconstructs the
//! absolute offsets for convenience.

use serde_json::Value;

use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Record, hex_value};

fn offsets_list(
    reader: &mut Reader<'_>,
    label: &str,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let count = reader.u2()?;
    record.put(format!("{label}_count-u2"), count);
    let deltas = reader.take(count as usize)?;
    record.put(format!("{label}_deltas"), hex_value(deltas));

    // 0xff is a pad delta: it advances without marking a site, so a zero
    // delta is only legal in first position.
    let mut absolute = Vec::with_capacity(count as usize);
    let mut position = 0u32;
    let mut first = true;
    for &delta in deltas {
        position += u32::from(delta);
        if delta == 0xff {
            continue;
        }
        if delta == 0 && !first {
            warnings.push(Warning::InvariantViolation {
                component: "RefLocation".to_owned(),
                detail: format!("zero delta inside {label} list"),
            });
        }
        first = false;
        absolute.push(Value::from(position));
    }
    record.put(format!("{label}_offsets"), Value::Array(absolute));
    Ok(())
}

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    offsets_list(reader, "byte_indices", record, warnings)?;
    offsets_list(reader, "byte2_indices", record, warnings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty_lists() {
        let info = hex!("0000 0000");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("RefLocation", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();
        assert!(reader.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_absolute_offsets_are_strictly_increasing() {
        let info = hex!("0000 0003 05 02 0a");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("RefLocation", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();

        let offsets = record.get("byte2_indices_offsets").unwrap().as_array().unwrap();
        let values: Vec<u64> = offsets.iter().map(|v| v.as_u64().unwrap()).collect();
        assert_eq!(values, [5, 7, 17]);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_pad_delta_advances_without_site() {
        let info = hex!("0000 0002 ff 02");
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("RefLocation", &info);
        decode(&mut reader, &mut record, &mut warnings).unwrap();
        let offsets = record.get("byte2_indices_offsets").unwrap().as_array().unwrap();
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets[0], 257);
    }
}
