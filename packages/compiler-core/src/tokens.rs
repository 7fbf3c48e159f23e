//! Tokenizer event contract.
//!
//! The tokenizer never materializes a token list; it drives a callback sink
//! with byte ranges into the original source, in source order. The parser is
//! the production sink.

use crate::errors::ErrorCode;
use serde::Serialize;

/// Quote style of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuoteKind {
    /// Attribute without a value.
    None,
    Unquoted,
    Single,
    Double,
}

/// Lexical event sink. All ranges are `[start, end)` byte offsets.
///
/// `on_err` receives a position, not a span; the sink decides how much
/// context to attach. A tokenizer error never stops the scan.
pub trait TokenizerCallbacks {
    fn on_text(&mut self, start: usize, end: usize);
    /// A decoded character reference inside text. `start..end` covers the raw
    /// reference, `text` its replacement.
    fn on_text_entity(&mut self, text: &str, start: usize, end: usize);
    /// `start..end` covers the interpolation including its delimiters.
    fn on_interpolation(&mut self, start: usize, end: usize);
    fn on_open_tag_name(&mut self, start: usize, end: usize);
    /// `end` is the offset of the closing `>`.
    fn on_open_tag_end(&mut self, end: usize);
    fn on_self_closing_tag(&mut self, end: usize);
    /// `start..end` covers the end tag name only.
    fn on_close_tag(&mut self, start: usize, end: usize);
    fn on_attrib_name(&mut self, start: usize, end: usize);
    fn on_attrib_data(&mut self, start: usize, end: usize);
    fn on_attrib_entity(&mut self, text: &str, start: usize, end: usize);
    /// Fires once per attribute, after its (possibly empty) value.
    fn on_attrib_end(&mut self, quote: QuoteKind, end: usize);
    /// Directive name or shorthand marker (`:`, `@`, `#`, `.`).
    fn on_dir_name(&mut self, start: usize, end: usize);
    fn on_dir_arg(&mut self, start: usize, end: usize);
    fn on_dir_modifier(&mut self, start: usize, end: usize);
    /// `start..end` covers the comment content without markers.
    fn on_comment(&mut self, start: usize, end: usize);
    fn on_cdata(&mut self, start: usize, end: usize);
    fn on_processing_instruction(&mut self, start: usize, end: usize);
    fn on_end(&mut self, end: usize);
    fn on_err(&mut self, code: ErrorCode, offset: usize);

    /// Queried before interpolation and directive tokenization; a verbatim
    /// (`v-pre`) subtree suppresses both.
    fn in_v_pre(&self) -> bool {
        false
    }
}
