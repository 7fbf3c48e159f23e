//! Character-reference decoding.
//!
//! Shared by the text and attribute-value tokenizer states. Decoding follows
//! browser recovery rules: a small legacy set decodes without a trailing
//! semicolon in text, while attribute context refuses the legacy form when
//! the reference is followed by an alphanumeric character or '='.

use crate::errors::ErrorCode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Named references recognized with a trailing semicolon.
pub static NAMED_ENTITIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (name, value) in [
        ("amp", "&"),
        ("AMP", "&"),
        ("lt", "<"),
        ("LT", "<"),
        ("gt", ">"),
        ("GT", ">"),
        ("quot", "\""),
        ("QUOT", "\""),
        ("apos", "'"),
        ("nbsp", "\u{00A0}"),
        ("copy", "\u{00A9}"),
        ("reg", "\u{00AE}"),
        ("trade", "\u{2122}"),
        ("deg", "\u{00B0}"),
        ("plusmn", "\u{00B1}"),
        ("para", "\u{00B6}"),
        ("middot", "\u{00B7}"),
        ("laquo", "\u{00AB}"),
        ("raquo", "\u{00BB}"),
        ("times", "\u{00D7}"),
        ("divide", "\u{00F7}"),
        ("cent", "\u{00A2}"),
        ("pound", "\u{00A3}"),
        ("yen", "\u{00A5}"),
        ("euro", "\u{20AC}"),
        ("sect", "\u{00A7}"),
        ("not", "\u{00AC}"),
        ("shy", "\u{00AD}"),
        ("macr", "\u{00AF}"),
        ("micro", "\u{00B5}"),
        ("iexcl", "\u{00A1}"),
        ("iquest", "\u{00BF}"),
        ("sup1", "\u{00B9}"),
        ("sup2", "\u{00B2}"),
        ("sup3", "\u{00B3}"),
        ("frac14", "\u{00BC}"),
        ("frac12", "\u{00BD}"),
        ("frac34", "\u{00BE}"),
        ("ndash", "\u{2013}"),
        ("mdash", "\u{2014}"),
        ("lsquo", "\u{2018}"),
        ("rsquo", "\u{2019}"),
        ("ldquo", "\u{201C}"),
        ("rdquo", "\u{201D}"),
        ("hellip", "\u{2026}"),
        ("bull", "\u{2022}"),
        ("dagger", "\u{2020}"),
        ("Dagger", "\u{2021}"),
        ("permil", "\u{2030}"),
        ("prime", "\u{2032}"),
        ("Prime", "\u{2033}"),
        ("larr", "\u{2190}"),
        ("uarr", "\u{2191}"),
        ("rarr", "\u{2192}"),
        ("darr", "\u{2193}"),
        ("harr", "\u{2194}"),
        ("infin", "\u{221E}"),
        ("ne", "\u{2260}"),
        ("le", "\u{2264}"),
        ("ge", "\u{2265}"),
        ("minus", "\u{2212}"),
        ("lowast", "\u{2217}"),
        ("radic", "\u{221A}"),
        ("sum", "\u{2211}"),
        ("prod", "\u{220F}"),
        ("int", "\u{222B}"),
        ("alpha", "\u{03B1}"),
        ("beta", "\u{03B2}"),
        ("gamma", "\u{03B3}"),
        ("delta", "\u{03B4}"),
        ("epsilon", "\u{03B5}"),
        ("lambda", "\u{03BB}"),
        ("mu", "\u{03BC}"),
        ("pi", "\u{03C0}"),
        ("sigma", "\u{03C3}"),
        ("omega", "\u{03C9}"),
        ("Omega", "\u{03A9}"),
        ("ensp", "\u{2002}"),
        ("emsp", "\u{2003}"),
        ("thinsp", "\u{2009}"),
        ("zwnj", "\u{200C}"),
        ("zwj", "\u{200D}"),
        ("lrm", "\u{200E}"),
        ("rlm", "\u{200F}"),
        ("curren", "\u{00A4}"),
        ("brvbar", "\u{00A6}"),
        ("uml", "\u{00A8}"),
        ("ordf", "\u{00AA}"),
        ("ordm", "\u{00BA}"),
        ("acute", "\u{00B4}"),
        ("cedil", "\u{00B8}"),
    ] {
        m.insert(name, value);
    }
    m
});

/// Subset of [`NAMED_ENTITIES`] that browsers decode without a semicolon.
pub static LEGACY_NAMED_ENTITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut names: Vec<&'static str> = vec![
        "amp", "AMP", "lt", "LT", "gt", "GT", "quot", "QUOT", "nbsp", "copy", "reg", "deg",
        "plusmn", "para", "middot", "laquo", "raquo", "times", "divide", "cent", "pound", "yen",
        "sect", "not", "shy", "macr", "micro", "iexcl", "iquest", "sup1", "sup2", "sup3",
        "frac14", "frac12", "frac34", "curren", "brvbar", "uml", "ordf", "ordm", "acute",
        "cedil",
    ];
    // Longest-match order.
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names
});

/// Outcome of decoding one reference starting at a `&`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    /// Byte offset one past the last consumed character.
    pub end: usize,
    /// Replacement text (the raw slice when the reference is unknown).
    pub text: String,
    pub error: Option<ErrorCode>,
}

const MAX_NAME_LENGTH: usize = 32;

/// Attempts to decode the character reference at `start` (which must point at
/// a `&`). Returns `None` when the input does not look like a reference at
/// all, in which case the ampersand is ordinary text.
pub fn decode_entity(buf: &[u8], start: usize, in_attribute: bool) -> Option<DecodedEntity> {
    debug_assert_eq!(buf.get(start), Some(&b'&'));
    let mut i = start + 1;
    if i >= buf.len() {
        return None;
    }
    if buf[i] == b'#' {
        return decode_numeric(buf, i + 1);
    }

    let name_start = i;
    while i < buf.len() && buf[i].is_ascii_alphanumeric() && i - name_start < MAX_NAME_LENGTH {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = std::str::from_utf8(&buf[name_start..i]).ok()?;

    if buf.get(i) == Some(&b';') {
        return Some(match NAMED_ENTITIES.get(name) {
            Some(value) => DecodedEntity { end: i + 1, text: (*value).to_string(), error: None },
            None => DecodedEntity {
                end: i + 1,
                text: String::from_utf8_lossy(&buf[start..i + 1]).into_owned(),
                error: Some(ErrorCode::UnknownNamedCharacterReference),
            },
        });
    }

    // No semicolon: only the legacy subset decodes, and never in attribute
    // context when the character after the match could belong to a literal
    // value.
    for legacy in LEGACY_NAMED_ENTITIES.iter() {
        if name.starts_with(legacy) {
            let end = name_start + legacy.len();
            let next = buf.get(end).copied();
            if in_attribute
                && matches!(next, Some(c) if c == b'=' || c.is_ascii_alphanumeric())
            {
                return None;
            }
            return Some(DecodedEntity {
                end,
                text: NAMED_ENTITIES[legacy].to_string(),
                error: Some(ErrorCode::MissingSemicolonAfterCharacterReference),
            });
        }
    }
    None
}

fn decode_numeric(buf: &[u8], mut i: usize) -> Option<DecodedEntity> {
    let hex = matches!(buf.get(i), Some(b'x') | Some(b'X'));
    if hex {
        i += 1;
    }
    let digits_start = i;
    while i < buf.len() && if hex { buf[i].is_ascii_hexdigit() } else { buf[i].is_ascii_digit() } {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    let digits = std::str::from_utf8(&buf[digits_start..i]).ok()?;
    let code = u32::from_str_radix(digits, if hex { 16 } else { 10 }).unwrap_or(u32::MAX);

    let mut error = None;
    let end = if buf.get(i) == Some(&b';') {
        i + 1
    } else {
        error = Some(ErrorCode::MissingSemicolonAfterCharacterReference);
        i
    };

    let (ch, err) = match code {
        0 => ('\u{FFFD}', Some(ErrorCode::UnexpectedNullCharacter)),
        0xD800..=0xDFFF => ('\u{FFFD}', None),
        c => (char::from_u32(c).unwrap_or('\u{FFFD}'), None),
    };
    Some(DecodedEntity { end, text: ch.to_string(), error: err.or(error) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_reference() {
        let out = decode_entity(b"&amp;x", 0, false).unwrap();
        assert_eq!(out.text, "&");
        assert_eq!(out.end, 5);
        assert_eq!(out.error, None);
    }

    #[test]
    fn legacy_reference_without_semicolon_in_text() {
        let out = decode_entity(b"&amp x", 0, false).unwrap();
        assert_eq!(out.text, "&");
        assert_eq!(out.end, 4);
        assert_eq!(out.error, Some(ErrorCode::MissingSemicolonAfterCharacterReference));
    }

    #[test]
    fn legacy_reference_refused_in_attribute_before_alnum() {
        assert_eq!(decode_entity(b"&ampx", 0, true), None);
        assert!(decode_entity(b"&ampx", 0, false).is_some());
    }

    #[test]
    fn unknown_named_reference_reported_but_kept_literal() {
        let out = decode_entity(b"&nosuch;", 0, false).unwrap();
        assert_eq!(out.text, "&nosuch;");
        assert_eq!(out.error, Some(ErrorCode::UnknownNamedCharacterReference));
    }

    #[test]
    fn numeric_references() {
        let dec = decode_entity(b"&#65;", 0, false).unwrap();
        assert_eq!(dec.text, "A");
        let hex = decode_entity(b"&#x1F600;", 0, false).unwrap();
        assert_eq!(hex.text, "\u{1F600}");
        let unterminated = decode_entity(b"&#65 ", 0, false).unwrap();
        assert_eq!(unterminated.text, "A");
        assert_eq!(
            unterminated.error,
            Some(ErrorCode::MissingSemicolonAfterCharacterReference)
        );
    }

    #[test]
    fn bare_ampersand_is_not_a_reference() {
        assert_eq!(decode_entity(b"& x", 0, false), None);
        assert_eq!(decode_entity(b"&", 0, false), None);
    }
}
