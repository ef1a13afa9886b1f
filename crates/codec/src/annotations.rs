//! Normalization of annotated `raw_modified` hex strings
//!
//! Editors may decorate an override with comments and markers:
//!
//! - `(...)` and `[...]` are comments; the group and its content are dropped.
//! - `<...>` is an inline annotation; the delimiters are dropped, the content
//!   kept (it may itself contain `()`/`[]` comments).
//! - Whitespace, `|` and `,` are separators and are dropped.
//!
//! Grouping is not nested: the first matching closer ends a comment. Whatever
//! survives must be even-length hex.

use crate::error::{Error, Result};

/// Strip annotations and separators, then decode the remaining hex
///
/// `component` names the record in any [`Error::MalformedHex`] produced.
pub fn normalize(component: &str, text: &str) -> Result<Vec<u8>> {
    let malformed = |reason: &'static str| Error::MalformedHex {
        component: component.to_owned(),
        reason,
    };

    let mut cleaned = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '(' => {
                if !chars.any(|c| c == ')') {
                    return Err(malformed("unterminated ( comment"));
                }
            }
            '[' => {
                if !chars.any(|c| c == ']') {
                    return Err(malformed("unterminated [ comment"));
                }
            }
            '<' | '>' => {}
            c if c.is_whitespace() || c == '|' || c == ',' => {}
            c => cleaned.push(c),
        }
    }

    if !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(malformed("non-hex character after stripping annotations"));
    }
    if cleaned.len() % 2 != 0 {
        return Err(malformed("odd number of hex digits"));
    }
    hex::decode(&cleaned).map_err(|_| malformed("hex decode failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_plain_hex_with_separators() {
        let out = normalize("Header", "01 000f|de,ca ff ed").unwrap();
        assert_eq!(out, hex!("01000fdecaffed"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(normalize("X", "DeCaFfEd").unwrap(), hex!("decaffed"));
    }

    #[test]
    fn test_comments_dropped_with_content() {
        let out = normalize("X", "(magic)decaffed[version]0102").unwrap();
        assert_eq!(out, hex!("decaffed0102"));
    }

    #[test]
    fn test_angle_markers_keep_content() {
        let out = normalize("Header", "01 000f decaffed 0102040001<(AID Len)05><(AID)5555555555>")
            .unwrap();
        assert_eq!(out, hex!("01000fdecaffed0102040001055555555555"));
    }

    #[test]
    fn test_annotation_invariance() {
        // Adding or removing legal decoration never changes the result.
        let bare = normalize("X", "0102aabb").unwrap();
        for decorated in [
            "01 02 aa bb",
            "<01>(first)02aabb",
            "[ignored]01|02,aa bb()",
            "<0102><aabb>",
        ] {
            assert_eq!(normalize("X", decorated).unwrap(), bare);
        }
    }

    #[test]
    fn test_odd_length_rejected() {
        let err = normalize("Applet", "abc").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedHex { ref component, .. } if component == "Applet"
        ));
    }

    #[test]
    fn test_stray_character_rejected() {
        assert!(normalize("X", "zz").is_err());
    }

    #[test]
    fn test_unterminated_comment_rejected() {
        assert!(normalize("X", "(never closed 0102").is_err());
    }
}
