//! Compiler diagnostics.
//!
//! All recoverable problems (lexical, syntactic, semantic) are reported as
//! [`CompilerError`] values through a caller-supplied sink. Without a sink the
//! first diagnostic aborts compilation; with one, compilation always yields a
//! best-effort tree plus the diagnostic stream.

use crate::parse_util::SourceSpan;
use serde::Serialize;
use thiserror::Error;

/// Closed set of diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    // Lexical (tokenizer)
    AbruptClosingOfEmptyComment,
    CdataInHtmlContent,
    EofBeforeTagName,
    EofInCdata,
    EofInComment,
    EofInTag,
    IncorrectlyClosedComment,
    IncorrectlyOpenedComment,
    InvalidFirstCharacterOfTagName,
    MissingAttributeValue,
    MissingEndTagName,
    MissingSemicolonAfterCharacterReference,
    MissingWhitespaceBetweenAttributes,
    NestedComment,
    UnexpectedCharacterInAttributeName,
    UnexpectedCharacterInUnquotedAttributeValue,
    UnexpectedEqualsSignBeforeAttributeName,
    UnexpectedNullCharacter,
    UnexpectedQuestionMarkInsteadOfTagName,
    UnexpectedSolidusInTag,
    UnknownNamedCharacterReference,
    // Syntactic (parser)
    DuplicateAttribute,
    EndTagWithAttributes,
    EndTagWithTrailingSolidus,
    InvalidEndTag,
    MissingEndTag,
    MissingDynamicDirectiveArgumentEnd,
    MissingInterpolationEnd,
    // Semantic (transforms)
    IfNoExpression,
    ElseNoAdjacentIf,
    ForNoExpression,
    ForMalformedExpression,
}

impl ErrorCode {
    pub fn message(self) -> &'static str {
        use ErrorCode::*;
        match self {
            AbruptClosingOfEmptyComment => "Illegal comment.",
            CdataInHtmlContent => "CDATA section is allowed only in XML context.",
            EofBeforeTagName => "Unexpected EOF in tag.",
            EofInCdata => "Unexpected EOF in CDATA section.",
            EofInComment => "Unexpected EOF in comment.",
            EofInTag => "Unexpected EOF in tag.",
            IncorrectlyClosedComment => "Incorrectly closed comment.",
            IncorrectlyOpenedComment => "Incorrectly opened comment.",
            InvalidFirstCharacterOfTagName => "Illegal tag name. Use '&lt;' to print '<'.",
            MissingAttributeValue => "Attribute value was expected.",
            MissingEndTagName => "End tag name was expected.",
            MissingSemicolonAfterCharacterReference => {
                "Semicolon was expected after character reference."
            }
            MissingWhitespaceBetweenAttributes => "Whitespace was expected.",
            NestedComment => "Unexpected '<!--' in comment.",
            UnexpectedCharacterInAttributeName => "Attribute name cannot contain '\"', '\\'' or '<'.",
            UnexpectedCharacterInUnquotedAttributeValue => {
                "Unquoted attribute value cannot contain '\"', '\\'', '<', '=' or '`'."
            }
            UnexpectedEqualsSignBeforeAttributeName => "Attribute name cannot start with '='.",
            UnexpectedNullCharacter => "Unexpected null character.",
            UnexpectedQuestionMarkInsteadOfTagName => "'<?' is allowed only in XML context.",
            UnexpectedSolidusInTag => "Illegal '/' in tag.",
            UnknownNamedCharacterReference => "Unknown named character reference.",
            DuplicateAttribute => "Duplicate attribute.",
            EndTagWithAttributes => "End tag cannot have attributes.",
            EndTagWithTrailingSolidus => "Illegal '/' in end tag.",
            InvalidEndTag => "Invalid end tag.",
            MissingEndTag => "Element is missing end tag.",
            MissingDynamicDirectiveArgumentEnd => {
                "End bracket for dynamic directive argument was not found. \
                 Note that dynamic directive argument cannot contain spaces."
            }
            MissingInterpolationEnd => "Interpolation was not closed.",
            IfNoExpression => "Conditional directive is missing its expression.",
            ElseNoAdjacentIf => "Else branch has no adjacent conditional group.",
            ForNoExpression => "Loop directive is missing its expression.",
            ForMalformedExpression => "Malformed loop expression.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    Warning,
    Error,
}

/// A diagnostic with an exact source span.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message} ({span})")]
pub struct CompilerError {
    pub code: ErrorCode,
    pub message: String,
    pub span: SourceSpan,
    pub level: ErrorLevel,
}

impl CompilerError {
    pub fn new(code: ErrorCode, span: SourceSpan) -> Self {
        let level = match code {
            ErrorCode::MissingSemicolonAfterCharacterReference => ErrorLevel::Warning,
            _ => ErrorLevel::Error,
        };
        CompilerError { code, message: code.message().to_string(), span, level }
    }
}

/// Caller-supplied diagnostic sinks. Owned by the options value for one call.
pub type ErrorSink<'a> = Box<dyn FnMut(CompilerError) + 'a>;
pub type WarnSink<'a> = Box<dyn FnMut(CompilerError) + 'a>;
