#![deny(clippy::all)]

//! Component-template compiler core.
//!
//! Compiles HTML-like component templates (elements, text, comments,
//! `{{ }}` interpolations, directive attributes) into an annotated AST ready
//! for a code-emission stage. The pipeline is `parse` -> `transform`; error
//! recovery follows browser tokenizer behavior, so malformed input always
//! yields a best-effort tree plus exact-span diagnostics.

pub mod ast;
pub mod cache_static;
pub mod chars;
pub mod entities;
pub mod errors;
pub mod options;
pub mod parse_util;
pub mod parser;
pub mod runtime_helpers;
pub mod tags;
pub mod tokenizer;
pub mod tokens;
pub mod transform;
pub mod transforms;
pub mod whitespace;

pub use ast::{Node, Root};
pub use errors::{CompilerError, ErrorCode, ErrorLevel};
pub use options::{ParserOptions, TransformOptions, WhitespaceMode};
pub use parser::parse;
pub use transform::{transform, Transition};

use std::collections::HashMap;
use transform::{DirectiveTransform, NodeTransform};

/// The standard transform pipeline: structural directives first, then vnode
/// construction and text merging on exit. The directive-transform map is
/// empty; `bind` and `on` are handled inside the element transform.
pub fn base_transform_preset() -> (Vec<NodeTransform>, HashMap<String, DirectiveTransform>) {
    (
        vec![
            transforms::transform_if(),
            transforms::transform_for(),
            transforms::transform_element(),
            transforms::transform_text(),
        ],
        HashMap::new(),
    )
}
