//! Byte-level tokenizer.
//!
//! A single-pass finite-state machine over the raw input bytes. All
//! state-significant characters are ASCII, so multi-byte UTF-8 content flows
//! through the text states untouched. The machine never fails: every
//! malformed construct reports a diagnostic through the callback sink and
//! takes a defined recovery transition.

use crate::chars::{self, is_ascii_alpha, is_end_of_tag_section, is_whitespace, to_lower};
use crate::entities::decode_entity;
use crate::errors::ErrorCode;
use crate::tags::{text_mode_for, TextMode};
use crate::tokens::{QuoteKind, TokenizerCallbacks};
use smallvec::SmallVec;

/// Terminal sequences for comment-like and raw-text scanning.
mod sequences {
    pub const CDATA: &[u8] = b"CDATA[";
    pub const CDATA_END: &[u8] = b"]]>";
    pub const COMMENT_END: &[u8] = b"-->";
    pub const COMMENT_OPEN: &[u8] = b"<!--";
    pub const COMMENT_BANG_END: &[u8] = b"--!>";
    pub const SCRIPT_END: &[u8] = b"</script";
    pub const STYLE_END: &[u8] = b"</style";
    pub const TITLE_END: &[u8] = b"</title";
    pub const TEXTAREA_END: &[u8] = b"</textarea";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    InterpolationOpen,
    Interpolation,
    InterpolationClose,
    BeforeTagName,
    InTagName,
    InSelfClosingTag,
    BeforeClosingTagName,
    InClosingTagName,
    AfterClosingTagName,
    BeforeAttrName,
    InAttrName,
    InDirName,
    InDirArg,
    InDirDynamicArg,
    InDirModifier,
    AfterAttrName,
    BeforeAttrValue,
    InAttrValueDq,
    InAttrValueSq,
    InAttrValueNq,
    AfterAttrValueQuoted,
    BeforeDeclaration,
    InDeclaration,
    InProcessingInstruction,
    BeforeComment,
    CdataSequence,
    InSpecialComment,
    InCommentLike,
    InRawText,
    InEscapableRawText,
}

/// Tokenizer configuration. The delimiter pair may be any two non-empty
/// ASCII sequences.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    pub delimiters: (String, String),
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions { delimiters: ("{{".to_string(), "}}".to_string()) }
    }
}

/// Runs the state machine over `source`, emitting events into `cbs`.
pub fn tokenize(source: &str, options: &TokenizerOptions, cbs: &mut dyn TokenizerCallbacks) {
    let mut tokenizer = Tokenizer::new(source, options);
    tokenizer.run(cbs);
}

struct Tokenizer<'a> {
    buf: &'a [u8],
    index: usize,
    section_start: usize,
    state: State,
    return_state: State,
    delimiter_open: SmallVec<[u8; 4]>,
    delimiter_close: SmallVec<[u8; 4]>,
    delimiter_index: usize,
    current_sequence: &'static [u8],
    sequence_index: usize,
    in_cdata: bool,
    // Secondary matchers inside comments: nested "<!--" and "--!>" close.
    nested_index: usize,
    bang_index: usize,
    pending_raw: Option<(&'static [u8], bool)>,
    close_tag_solidus: bool,
    close_tag_junk_reported: bool,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str, options: &TokenizerOptions) -> Self {
        Tokenizer {
            buf: source.as_bytes(),
            index: 0,
            section_start: 0,
            state: State::Text,
            return_state: State::Text,
            delimiter_open: SmallVec::from_slice(options.delimiters.0.as_bytes()),
            delimiter_close: SmallVec::from_slice(options.delimiters.1.as_bytes()),
            delimiter_index: 0,
            current_sequence: sequences::COMMENT_END,
            sequence_index: 0,
            in_cdata: false,
            nested_index: 0,
            bang_index: 0,
            pending_raw: None,
            close_tag_solidus: false,
            close_tag_junk_reported: false,
        }
    }

    fn run(&mut self, cbs: &mut dyn TokenizerCallbacks) {
        while self.index < self.buf.len() {
            let c = self.buf[self.index];
            self.dispatch(c, cbs);
            self.index += 1;
        }
        self.finish(cbs);
        cbs.on_end(self.buf.len());
    }

    fn dispatch(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        match self.state {
            State::Text => self.state_text(c, cbs),
            State::InterpolationOpen => self.state_interpolation_open(c, cbs),
            State::Interpolation => self.state_interpolation(c, cbs),
            State::InterpolationClose => self.state_interpolation_close(c, cbs),
            State::BeforeTagName => self.state_before_tag_name(c, cbs),
            State::InTagName => self.state_in_tag_name(c, cbs),
            State::InSelfClosingTag => self.state_in_self_closing_tag(c, cbs),
            State::BeforeClosingTagName => self.state_before_closing_tag_name(c, cbs),
            State::InClosingTagName => self.state_in_closing_tag_name(c, cbs),
            State::AfterClosingTagName => self.state_after_closing_tag_name(c, cbs),
            State::BeforeAttrName => self.state_before_attr_name(c, cbs),
            State::InAttrName => self.state_in_attr_name(c, cbs),
            State::InDirName => self.state_in_dir_name(c, cbs),
            State::InDirArg => self.state_in_dir_arg(c, cbs),
            State::InDirDynamicArg => self.state_in_dir_dynamic_arg(c, cbs),
            State::InDirModifier => self.state_in_dir_modifier(c, cbs),
            State::AfterAttrName => self.state_after_attr_name(c, cbs),
            State::BeforeAttrValue => self.state_before_attr_value(c, cbs),
            State::InAttrValueDq => self.state_in_attr_value(c, chars::DQ, QuoteKind::Double, cbs),
            State::InAttrValueSq => self.state_in_attr_value(c, chars::SQ, QuoteKind::Single, cbs),
            State::InAttrValueNq => self.state_in_attr_value_unquoted(c, cbs),
            State::AfterAttrValueQuoted => self.state_after_attr_value_quoted(c, cbs),
            State::BeforeDeclaration => self.state_before_declaration(c, cbs),
            State::InDeclaration => self.state_in_declaration(c, cbs),
            State::InProcessingInstruction => self.state_in_processing_instruction(c, cbs),
            State::BeforeComment => self.state_before_comment(c, cbs),
            State::CdataSequence => self.state_cdata_sequence(c, cbs),
            State::InSpecialComment => self.state_in_special_comment(c, cbs),
            State::InCommentLike => self.state_in_comment_like(c, cbs),
            State::InRawText => self.state_in_raw_text(c, cbs),
            State::InEscapableRawText => self.state_in_escapable_raw_text(c, cbs),
        }
    }

    // ---- text & interpolation ------------------------------------------

    fn state_text(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::LT {
            if self.index > self.section_start {
                cbs.on_text(self.section_start, self.index);
            }
            self.state = State::BeforeTagName;
            self.section_start = self.index;
        } else if c == chars::AMPERSAND {
            self.try_text_entity(cbs);
        } else if c == self.delimiter_open[0] && !cbs.in_v_pre() {
            self.state = State::InterpolationOpen;
            self.return_state = State::Text;
            self.delimiter_index = 0;
            self.state_interpolation_open(c, cbs);
        } else if c == chars::NUL {
            cbs.on_err(ErrorCode::UnexpectedNullCharacter, self.index);
        }
    }

    fn state_interpolation_open(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == self.delimiter_open[self.delimiter_index] {
            if self.delimiter_index == self.delimiter_open.len() - 1 {
                let start = self.index + 1 - self.delimiter_open.len();
                if start > self.section_start {
                    cbs.on_text(self.section_start, start);
                }
                self.state = State::Interpolation;
                self.section_start = start;
            } else {
                self.delimiter_index += 1;
            }
        } else {
            self.state = self.return_state;
            self.dispatch(c, cbs);
        }
    }

    fn state_interpolation(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == self.delimiter_close[0] {
            self.state = State::InterpolationClose;
            self.delimiter_index = 0;
            self.state_interpolation_close(c, cbs);
        }
    }

    fn state_interpolation_close(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == self.delimiter_close[self.delimiter_index] {
            if self.delimiter_index == self.delimiter_close.len() - 1 {
                cbs.on_interpolation(self.section_start, self.index + 1);
                self.state = self.return_state;
                self.section_start = self.index + 1;
            } else {
                self.delimiter_index += 1;
            }
        } else {
            self.state = State::Interpolation;
            self.state_interpolation(c, cbs);
        }
    }

    // ---- tag open ------------------------------------------------------

    fn state_before_tag_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::BANG {
            self.state = State::BeforeDeclaration;
            self.section_start = self.index + 1;
        } else if c == chars::QUESTION {
            cbs.on_err(ErrorCode::UnexpectedQuestionMarkInsteadOfTagName, self.index);
            self.state = State::InProcessingInstruction;
            self.section_start = self.index;
        } else if is_ascii_alpha(c) {
            self.state = State::InTagName;
            self.section_start = self.index;
        } else if c == chars::SLASH {
            self.state = State::BeforeClosingTagName;
        } else {
            cbs.on_err(ErrorCode::InvalidFirstCharacterOfTagName, self.index);
            // `<` followed by junk degrades to literal text.
            self.state = State::Text;
            self.state_text(c, cbs);
        }
    }

    fn state_in_tag_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if is_end_of_tag_section(c) {
            self.handle_tag_name(c, cbs);
        }
    }

    fn handle_tag_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        let (start, end) = (self.section_start, self.index);
        let name = &self.buf[start..end];
        self.pending_raw = match text_mode_for(std::str::from_utf8(name).unwrap_or("")) {
            TextMode::RawText => Some((raw_sequence_for(name), false)),
            TextMode::EscapableRawText => Some((raw_sequence_for(name), true)),
            TextMode::Data => None,
        };
        cbs.on_open_tag_name(start, end);
        self.section_start = end;
        self.state = State::BeforeAttrName;
        self.state_before_attr_name(c, cbs);
    }

    fn state_in_self_closing_tag(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT {
            cbs.on_self_closing_tag(self.index);
            self.pending_raw = None;
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else if !is_whitespace(c) {
            cbs.on_err(ErrorCode::UnexpectedSolidusInTag, self.index);
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c, cbs);
        }
    }

    // ---- tag close -----------------------------------------------------

    fn state_before_closing_tag_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if is_whitespace(c) {
            // ignore
        } else if c == chars::GT {
            cbs.on_err(ErrorCode::MissingEndTagName, self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else if is_ascii_alpha(c) {
            self.state = State::InClosingTagName;
            self.section_start = self.index;
        } else {
            cbs.on_err(ErrorCode::InvalidFirstCharacterOfTagName, self.index);
            // `</` + junk is recovered as a bogus comment.
            self.state = State::InSpecialComment;
            self.section_start = self.index;
        }
    }

    fn state_in_closing_tag_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT || is_whitespace(c) {
            cbs.on_close_tag(self.section_start, self.index);
            self.section_start = self.index;
            self.state = State::AfterClosingTagName;
            self.close_tag_solidus = false;
            self.close_tag_junk_reported = false;
            self.state_after_closing_tag_name(c, cbs);
        }
    }

    fn state_after_closing_tag_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT {
            if self.close_tag_solidus {
                cbs.on_err(ErrorCode::EndTagWithTrailingSolidus, self.index - 1);
            }
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else if c == chars::SLASH {
            self.close_tag_solidus = true;
        } else if !is_whitespace(c) {
            self.close_tag_solidus = false;
            if !self.close_tag_junk_reported {
                cbs.on_err(ErrorCode::EndTagWithAttributes, self.index);
                self.close_tag_junk_reported = true;
            }
        } else {
            self.close_tag_solidus = false;
        }
    }

    // ---- attributes ----------------------------------------------------

    fn state_before_attr_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT {
            self.handle_open_tag_end(cbs);
        } else if c == chars::SLASH {
            self.state = State::InSelfClosingTag;
        } else if is_whitespace(c) {
            // ignore
        } else if c == chars::EQ {
            cbs.on_err(ErrorCode::UnexpectedEqualsSignBeforeAttributeName, self.index);
            self.state = State::InAttrName;
            self.section_start = self.index;
        } else {
            self.handle_attr_start(c, cbs);
        }
    }

    fn handle_attr_start(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if cbs.in_v_pre() {
            self.state = State::InAttrName;
            self.section_start = self.index;
            return;
        }
        if c == b'v' && self.buf.get(self.index + 1) == Some(&chars::DASH) {
            self.state = State::InDirName;
            self.section_start = self.index;
        } else if matches!(c, chars::DOT | chars::COLON | chars::AT | chars::HASH) {
            cbs.on_dir_name(self.index, self.index + 1);
            self.state = State::InDirArg;
            self.section_start = self.index + 1;
        } else {
            self.state = State::InAttrName;
            self.section_start = self.index;
        }
    }

    fn handle_attr_name_end(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        self.section_start = self.index;
        self.state = State::AfterAttrName;
        self.state_after_attr_name(c, cbs);
    }

    fn state_in_attr_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::EQ || is_end_of_tag_section(c) {
            cbs.on_attrib_name(self.section_start, self.index);
            self.handle_attr_name_end(c, cbs);
        } else if matches!(c, chars::DQ | chars::SQ | chars::LT) {
            cbs.on_err(ErrorCode::UnexpectedCharacterInAttributeName, self.index);
        }
    }

    fn state_in_dir_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::EQ || is_end_of_tag_section(c) {
            cbs.on_dir_name(self.section_start, self.index);
            self.handle_attr_name_end(c, cbs);
        } else if c == chars::COLON {
            cbs.on_dir_name(self.section_start, self.index);
            self.state = State::InDirArg;
            self.section_start = self.index + 1;
        } else if c == chars::DOT {
            cbs.on_dir_name(self.section_start, self.index);
            self.state = State::InDirModifier;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_dir_arg(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::EQ || is_end_of_tag_section(c) {
            cbs.on_dir_arg(self.section_start, self.index);
            self.handle_attr_name_end(c, cbs);
        } else if c == chars::LBRACKET {
            self.state = State::InDirDynamicArg;
        } else if c == chars::DOT {
            cbs.on_dir_arg(self.section_start, self.index);
            self.state = State::InDirModifier;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_dir_dynamic_arg(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::RBRACKET {
            self.state = State::InDirArg;
        } else if c == chars::EQ || is_end_of_tag_section(c) {
            cbs.on_err(ErrorCode::MissingDynamicDirectiveArgumentEnd, self.index);
            cbs.on_dir_arg(self.section_start, self.index);
            self.handle_attr_name_end(c, cbs);
        }
    }

    fn state_in_dir_modifier(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::EQ || is_end_of_tag_section(c) {
            cbs.on_dir_modifier(self.section_start, self.index);
            self.handle_attr_name_end(c, cbs);
        } else if c == chars::DOT {
            cbs.on_dir_modifier(self.section_start, self.index);
            self.section_start = self.index + 1;
        }
    }

    fn state_after_attr_name(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::EQ {
            self.state = State::BeforeAttrValue;
        } else if c == chars::SLASH || c == chars::GT {
            cbs.on_attrib_end(QuoteKind::None, self.section_start);
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c, cbs);
        } else if !is_whitespace(c) {
            cbs.on_attrib_end(QuoteKind::None, self.section_start);
            self.handle_attr_start(c, cbs);
        }
    }

    fn state_before_attr_value(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::DQ {
            self.state = State::InAttrValueDq;
            self.section_start = self.index + 1;
        } else if c == chars::SQ {
            self.state = State::InAttrValueSq;
            self.section_start = self.index + 1;
        } else if c == chars::GT {
            cbs.on_err(ErrorCode::MissingAttributeValue, self.index);
            cbs.on_attrib_end(QuoteKind::None, self.index);
            self.handle_open_tag_end(cbs);
        } else if !is_whitespace(c) {
            self.state = State::InAttrValueNq;
            self.section_start = self.index;
            self.state_in_attr_value_unquoted(c, cbs);
        }
    }

    fn state_in_attr_value(
        &mut self,
        c: u8,
        quote: u8,
        kind: QuoteKind,
        cbs: &mut dyn TokenizerCallbacks,
    ) {
        if c == quote {
            cbs.on_attrib_data(self.section_start, self.index);
            cbs.on_attrib_end(kind, self.index + 1);
            self.state = State::AfterAttrValueQuoted;
        } else if c == chars::AMPERSAND {
            self.try_attr_entity(cbs);
        }
    }

    fn state_in_attr_value_unquoted(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT || is_whitespace(c) {
            cbs.on_attrib_data(self.section_start, self.index);
            cbs.on_attrib_end(QuoteKind::Unquoted, self.index);
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c, cbs);
        } else if c == chars::AMPERSAND {
            self.try_attr_entity(cbs);
        } else if matches!(c, chars::DQ | chars::SQ | chars::LT | chars::EQ | chars::BT) {
            cbs.on_err(ErrorCode::UnexpectedCharacterInUnquotedAttributeValue, self.index);
        }
    }

    fn state_after_attr_value_quoted(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT || c == chars::SLASH || is_whitespace(c) {
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c, cbs);
        } else {
            cbs.on_err(ErrorCode::MissingWhitespaceBetweenAttributes, self.index);
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c, cbs);
        }
    }

    fn handle_open_tag_end(&mut self, cbs: &mut dyn TokenizerCallbacks) {
        cbs.on_open_tag_end(self.index);
        self.section_start = self.index + 1;
        self.state = match self.pending_raw.take() {
            Some((sequence, escapable)) => {
                self.current_sequence = sequence;
                self.sequence_index = 0;
                if escapable {
                    State::InEscapableRawText
                } else {
                    State::InRawText
                }
            }
            None => State::Text,
        };
    }

    // ---- declarations, comments, CDATA ---------------------------------

    fn state_before_declaration(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::LBRACKET {
            self.state = State::CdataSequence;
            self.sequence_index = 0;
        } else if c == chars::DASH {
            self.state = State::BeforeComment;
        } else {
            cbs.on_err(ErrorCode::IncorrectlyOpenedComment, self.index);
            self.state = State::InDeclaration;
            self.state_in_declaration(c, cbs);
        }
    }

    fn state_before_comment(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::DASH {
            self.state = State::InCommentLike;
            self.current_sequence = sequences::COMMENT_END;
            self.sequence_index = 0;
            self.in_cdata = false;
            self.nested_index = 0;
            self.bang_index = 0;
            self.section_start = self.index + 1;
        } else {
            cbs.on_err(ErrorCode::IncorrectlyOpenedComment, self.index);
            self.state = State::InDeclaration;
            self.state_in_declaration(c, cbs);
        }
    }

    fn state_cdata_sequence(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == sequences::CDATA[self.sequence_index] {
            self.sequence_index += 1;
            if self.sequence_index == sequences::CDATA.len() {
                self.state = State::InCommentLike;
                self.current_sequence = sequences::CDATA_END;
                self.sequence_index = 0;
                self.in_cdata = true;
                self.section_start = self.index + 1;
            }
        } else {
            cbs.on_err(ErrorCode::IncorrectlyOpenedComment, self.index);
            self.sequence_index = 0;
            self.state = State::InDeclaration;
            self.state_in_declaration(c, cbs);
        }
    }

    fn state_in_declaration(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT {
            cbs.on_comment(self.section_start, self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_processing_instruction(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT {
            cbs.on_processing_instruction(self.section_start, self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_special_comment(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == chars::GT {
            cbs.on_comment(self.section_start, self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_comment_like(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if c == self.current_sequence[self.sequence_index] {
            self.sequence_index += 1;
            if self.sequence_index == self.current_sequence.len() {
                let content_end = self.index + 1 - self.current_sequence.len();
                if self.in_cdata {
                    cbs.on_cdata(self.section_start, content_end);
                } else {
                    cbs.on_comment(self.section_start, content_end);
                }
                self.sequence_index = 0;
                self.state = State::Text;
                self.section_start = self.index + 1;
                return;
            }
        } else if self.sequence_index > 0 && c != self.current_sequence[self.sequence_index - 1] {
            self.sequence_index = 0;
        }

        if self.in_cdata {
            return;
        }

        // Abrupt close of an (effectively) empty comment: `<!-->`, `<!--->`.
        let content_len = self.index - self.section_start;
        if c == chars::GT
            && (content_len == 0 || (content_len == 1 && self.buf[self.section_start] == chars::DASH))
        {
            cbs.on_err(ErrorCode::AbruptClosingOfEmptyComment, self.index);
            cbs.on_comment(self.section_start, self.section_start);
            self.sequence_index = 0;
            self.state = State::Text;
            self.section_start = self.index + 1;
            return;
        }

        // `--!>` closes the comment but is malformed.
        if c == sequences::COMMENT_BANG_END[self.bang_index] {
            self.bang_index += 1;
            if self.bang_index == sequences::COMMENT_BANG_END.len() {
                cbs.on_err(ErrorCode::IncorrectlyClosedComment, self.index);
                cbs.on_comment(self.section_start, self.index + 1 - sequences::COMMENT_BANG_END.len());
                self.sequence_index = 0;
                self.bang_index = 0;
                self.state = State::Text;
                self.section_start = self.index + 1;
                return;
            }
        } else {
            self.bang_index = match c {
                chars::DASH if self.bang_index >= 2 => 2,
                chars::DASH => 1,
                _ => 0,
            };
        }

        // A nested `<!--` opener is reported but the comment continues.
        if c == sequences::COMMENT_OPEN[self.nested_index] {
            self.nested_index += 1;
            if self.nested_index == sequences::COMMENT_OPEN.len() {
                cbs.on_err(ErrorCode::NestedComment, self.index + 1 - sequences::COMMENT_OPEN.len());
                self.nested_index = 0;
            }
        } else {
            self.nested_index = usize::from(c == chars::LT);
        }
    }

    // ---- raw & escapable raw text --------------------------------------

    fn state_in_raw_text(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        self.match_raw_text_end(c, true, cbs);
    }

    fn state_in_escapable_raw_text(&mut self, c: u8, cbs: &mut dyn TokenizerCallbacks) {
        if self.sequence_index == 0 {
            if c == chars::AMPERSAND {
                self.try_text_entity(cbs);
                return;
            }
            if c == self.delimiter_open[0] && !cbs.in_v_pre() {
                self.state = State::InterpolationOpen;
                self.return_state = State::InEscapableRawText;
                self.delimiter_index = 0;
                self.state_interpolation_open(c, cbs);
                return;
            }
        }
        self.match_raw_text_end(c, false, cbs);
    }

    fn match_raw_text_end(&mut self, c: u8, fast_forward: bool, cbs: &mut dyn TokenizerCallbacks) {
        if self.sequence_index == self.current_sequence.len() {
            if c == chars::GT || is_whitespace(c) {
                let end_of_text = self.index - self.current_sequence.len();
                if self.section_start < end_of_text {
                    cbs.on_text(self.section_start, end_of_text);
                }
                // Name starts right after the `</` of the matched sequence.
                self.section_start = end_of_text + 2;
                self.state = State::InClosingTagName;
                self.state_in_closing_tag_name(c, cbs);
                return;
            }
            self.sequence_index = 0;
        }
        if to_lower(c) == self.current_sequence[self.sequence_index] {
            self.sequence_index += 1;
        } else if self.sequence_index == 0 {
            if fast_forward {
                // Nothing but the closing sequence matters here; skip ahead
                // to the next `<`.
                if let Some(pos) = memchr(chars::LT, &self.buf[self.index..]) {
                    self.index += pos - 1;
                } else {
                    self.index = self.buf.len() - 1;
                }
            }
        } else {
            self.sequence_index = usize::from(c == chars::LT);
        }
    }

    // ---- entities ------------------------------------------------------

    fn try_text_entity(&mut self, cbs: &mut dyn TokenizerCallbacks) {
        if let Some(decoded) = decode_entity(self.buf, self.index, false) {
            if let Some(code) = decoded.error {
                cbs.on_err(code, self.index);
                if code == ErrorCode::UnknownNamedCharacterReference {
                    return;
                }
            }
            if self.index > self.section_start {
                cbs.on_text(self.section_start, self.index);
            }
            cbs.on_text_entity(&decoded.text, self.index, decoded.end);
            self.section_start = decoded.end;
            self.index = decoded.end - 1;
        }
    }

    fn try_attr_entity(&mut self, cbs: &mut dyn TokenizerCallbacks) {
        if let Some(decoded) = decode_entity(self.buf, self.index, true) {
            if let Some(code) = decoded.error {
                cbs.on_err(code, self.index);
                if code == ErrorCode::UnknownNamedCharacterReference {
                    return;
                }
            }
            if self.index > self.section_start {
                cbs.on_attrib_data(self.section_start, self.index);
            }
            cbs.on_attrib_entity(&decoded.text, self.index, decoded.end);
            self.section_start = decoded.end;
            self.index = decoded.end - 1;
        }
    }

    // ---- end of input --------------------------------------------------

    fn finish(&mut self, cbs: &mut dyn TokenizerCallbacks) {
        let end = self.buf.len();
        match self.state {
            State::Text | State::InRawText | State::InEscapableRawText => {
                if end > self.section_start {
                    cbs.on_text(self.section_start, end);
                }
            }
            State::InterpolationOpen => {
                if end > self.section_start {
                    cbs.on_text(self.section_start, end);
                }
            }
            State::Interpolation | State::InterpolationClose => {
                cbs.on_err(ErrorCode::MissingInterpolationEnd, end);
                if end > self.section_start {
                    cbs.on_text(self.section_start, end);
                }
            }
            State::InCommentLike => {
                if self.in_cdata {
                    cbs.on_err(ErrorCode::EofInCdata, end);
                    cbs.on_cdata(self.section_start, end);
                } else {
                    cbs.on_err(ErrorCode::EofInComment, end);
                    cbs.on_comment(self.section_start, end);
                }
            }
            State::InDeclaration | State::InProcessingInstruction | State::InSpecialComment => {
                cbs.on_err(ErrorCode::EofInComment, end);
                cbs.on_comment(self.section_start, end);
            }
            State::BeforeDeclaration | State::BeforeComment => {
                cbs.on_err(ErrorCode::IncorrectlyOpenedComment, end);
            }
            State::CdataSequence => {
                cbs.on_err(ErrorCode::EofInCdata, end);
            }
            State::BeforeTagName => {
                cbs.on_err(ErrorCode::EofBeforeTagName, end);
            }
            _ => {
                cbs.on_err(ErrorCode::EofInTag, end);
            }
        }
    }
}

fn raw_sequence_for(name: &[u8]) -> &'static [u8] {
    let lower: Vec<u8> = name.iter().map(|&c| c.to_ascii_lowercase()).collect();
    match lower.as_slice() {
        b"script" => sequences::SCRIPT_END,
        b"style" => sequences::STYLE_END,
        b"title" => sequences::TITLE_END,
        _ => sequences::TEXTAREA_END,
    }
}

fn memchr(needle: u8, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}
