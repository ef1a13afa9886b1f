//! The intermediate, human-editable form of a component
//!
//! Each component decodes to a [`Record`]: an ordered map whose first two
//! entries are `raw` (the exact source bytes, hex) and `raw_modified` (an
//! initially empty override slot), followed by the parsed fields in on-disk
//! order. Field names carry `-u1`/`-u2`/`-u4` width suffixes so an editor
//! can locate them inside `raw`. Insertion order is part of the contract.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotations;
use crate::error::{Error, Result};

/// Ordered field map backing a [`Record`]
pub type Fields = IndexMap<String, Value>;

/// One component (or raw archive entry) in intermediate form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Fields,
}

impl Record {
    /// Create a record seeded with `raw` and an empty `raw_modified`
    pub fn with_raw(raw: &[u8]) -> Self {
        let mut record = Self::default();
        record.put("raw", hex::encode(raw));
        record.put("raw_modified", "");
        record
    }

    /// Append a parsed field, preserving insertion order
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The exact source bytes this record was decoded from
    pub fn raw(&self) -> Result<Vec<u8>> {
        let raw = self
            .fields
            .get("raw")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidRecord("record is missing its raw field".into()))?;
        hex::decode(raw).map_err(|_| Error::InvalidRecord("raw field is not valid hex".into()))
    }

    /// The user-supplied override, if one has been set
    pub fn raw_modified(&self) -> Option<&str> {
        self.fields
            .get("raw_modified")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Install a `raw_modified` override (annotation syntax permitted)
    pub fn set_raw_modified(&mut self, hex_text: impl Into<String>) {
        self.fields
            .insert("raw_modified".to_owned(), Value::String(hex_text.into()));
    }

    /// The bytes this record contributes to an encoded file
    ///
    /// Shallow-mode priority: a non-empty `raw_modified` (normalized per the
    /// annotation rules), otherwise `raw` verbatim. `name` labels any
    /// `MalformedHex` failure.
    pub fn emit_bytes(&self, name: &str) -> Result<Vec<u8>> {
        match self.raw_modified() {
            Some(text) => annotations::normalize(name, text),
            None => self.raw(),
        }
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Borrow the underlying ordered map
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }
}

/// Lowercase hex string for a byte slice, as a JSON value
pub fn hex_value(bytes: &[u8]) -> Value {
    Value::String(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_raw_fidelity() {
        let record = Record::with_raw(&hex!("01000f"));
        assert_eq!(record.raw().unwrap(), hex!("01000f"));
        assert_eq!(record.raw_modified(), None);
    }

    #[test]
    fn test_field_order_is_preserved() {
        let mut record = Record::with_raw(&[]);
        record.put("tag-u1", 1);
        record.put("size-u2", 15);
        record.put("magic-u4", "decaffed");
        let names: Vec<_> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            ["raw", "raw_modified", "tag-u1", "size-u2", "magic-u4"]
        );
    }

    #[test]
    fn test_emit_prefers_raw_modified() {
        let mut record = Record::with_raw(&hex!("0102"));
        assert_eq!(record.emit_bytes("Test").unwrap(), hex!("0102"));
        record.set_raw_modified("03 04");
        assert_eq!(record.emit_bytes("Test").unwrap(), hex!("0304"));
    }

    #[test]
    fn test_empty_raw_modified_means_unset() {
        let record = Record::with_raw(&hex!("aa"));
        assert_eq!(record.raw_modified(), None);
        assert_eq!(record.emit_bytes("Test").unwrap(), hex!("aa"));
    }
}
