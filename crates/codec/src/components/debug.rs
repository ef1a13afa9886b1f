//! Debug component (tag 12)
//!
//! Off-card metadata: never installed, tolerated on decode, optional on
//! encode. Only the leading string-table count is surfaced; the body is
//! kept opaque.

use crate::error::Result;
use crate::reader::Reader;
use crate::record::{Record, hex_value};

pub(crate) fn decode(reader: &mut Reader<'_>, record: &mut Record) -> Result<()> {
    if reader.remaining() >= 2 {
        record.put("string_count-u2", reader.u2()?);
    }
    let rest = reader.take(reader.remaining())?;
    record.put("info", hex_value(rest));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_opaque_body() {
        let info = hex!("0002 aabbccdd");
        let mut record = Record::with_raw(&info);
        let mut reader = Reader::new("Debug", &info);
        decode(&mut reader, &mut record).unwrap();
        assert_eq!(record.get("string_count-u2").unwrap(), 2);
        assert_eq!(record.get("info").unwrap(), "aabbccdd");
    }
}
