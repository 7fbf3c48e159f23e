//! Character constants used by the tokenizer.

pub const TAB: u8 = b'\t';
pub const LF: u8 = b'\n';
pub const FF: u8 = 0x0C;
pub const CR: u8 = b'\r';
pub const SPACE: u8 = b' ';

pub const BANG: u8 = b'!';
pub const DQ: u8 = b'"';
pub const HASH: u8 = b'#';
pub const AMPERSAND: u8 = b'&';
pub const SQ: u8 = b'\'';
pub const DOT: u8 = b'.';
pub const SLASH: u8 = b'/';
pub const COLON: u8 = b':';
pub const SEMICOLON: u8 = b';';
pub const LT: u8 = b'<';
pub const EQ: u8 = b'=';
pub const GT: u8 = b'>';
pub const QUESTION: u8 = b'?';
pub const AT: u8 = b'@';
pub const LBRACKET: u8 = b'[';
pub const RBRACKET: u8 = b']';
pub const BT: u8 = b'`';
pub const DASH: u8 = b'-';
pub const NUL: u8 = 0;

/// Tag names, attribute names and directive pieces end on these.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, TAB | LF | FF | CR | SPACE)
}

pub fn is_ascii_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

pub fn is_end_of_tag_section(c: u8) -> bool {
    c == SLASH || c == GT || is_whitespace(c)
}

/// Case-insensitive comparison for the single ASCII letters the special-tag
/// sequence matcher cares about.
pub fn to_lower(c: u8) -> u8 {
    c | 0x20
}
