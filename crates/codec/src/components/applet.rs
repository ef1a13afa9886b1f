//! Applet component (tag 3)
//!
//! Present exactly when Header carries ACC_APPLET. Lists each applet's AID
//! and the offset of its install method inside the Method component.

use serde_json::Value;

use crate::context::Context;
use crate::error::{Result, Warning};
use crate::reader::Reader;
use crate::record::{Fields, Record};

pub(crate) fn decode(
    reader: &mut Reader<'_>,
    ctx: &Context,
    record: &mut Record,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let count = reader.u1()?;
    record.put("count-u1", count);

    let mut applets = Vec::with_capacity(count as usize);
    let mut first_rid: Option<[u8; 5]> = None;
    for _ in 0..count {
        let (aid_len, aid) = reader.aid()?;

        // All applets of a package share the package RID.
        if aid.len() >= 5 {
            let mut rid = [0u8; 5];
            rid.copy_from_slice(&aid[..5]);
            match first_rid {
                None => first_rid = Some(rid),
                Some(expected) if expected != rid => {
                    warnings.push(Warning::InvariantViolation {
                        component: "Applet".to_owned(),
                        detail: format!(
                            "applet RID {} differs from {}",
                            hex::encode(rid),
                            hex::encode(expected)
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        let mut entry = Fields::new();
        entry.insert("AID_length-u1".to_owned(), aid_len.into());
        entry.insert("AID".to_owned(), hex::encode(aid).into());
        if ctx.extended {
            entry.insert(
                "install_method_offset-u4".to_owned(),
                reader.u4()?.into(),
            );
        } else {
            entry.insert(
                "install_method_offset-u2".to_owned(),
                reader.u2()?.into(),
            );
        }
        applets.push(Value::Object(entry.into_iter().collect()));
    }
    record.put("applets", Value::Array(applets));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Version;
    use hex_literal::hex;

    #[test]
    fn test_single_applet() {
        let info = hex!("01 06 444444444401 0001");
        let ctx = Context::new(Version::V2_1, 1, 2);
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("Applet", &info);
        decode(&mut reader, &ctx, &mut record, &mut warnings).unwrap();

        assert!(reader.is_empty());
        let applets = record.get("applets").unwrap().as_array().unwrap();
        assert_eq!(applets.len(), 1);
        assert_eq!(applets[0]["AID"], "444444444401");
        assert_eq!(applets[0]["install_method_offset-u2"], 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_mismatched_rid_warns() {
        let info = hex!("02 06 444444444401 0001 06 555555555502 0001");
        let ctx = Context::new(Version::V2_1, 1, 2);
        let mut record = Record::with_raw(&info);
        let mut warnings = Vec::new();
        let mut reader = Reader::new("Applet", &info);
        decode(&mut reader, &ctx, &mut record, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
    }
}
