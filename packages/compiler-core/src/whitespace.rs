//! Whitespace condensing.
//!
//! Runs bottom-up, once per completed children list, so outer passes never
//! see unprocessed inner text. Exposed as a standalone pass; applying it a
//! second time to already-condensed children is a no-op.

use crate::ast::Node;
use crate::options::WhitespaceMode;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\r\n\f ]+").unwrap());

fn has_newline(text: &str) -> bool {
    text.contains('\n') || text.contains('\r')
}

/// Applies the whitespace strategy to one completed children list. Inside a
/// preformatted element (`in_pre`), and in [`WhitespaceMode::Preserve`], text
/// is left untouched.
pub fn condense_whitespace(children: &mut Vec<Node>, mode: WhitespaceMode, in_pre: bool) {
    if in_pre || mode == WhitespaceMode::Preserve {
        return;
    }
    let mut removed = vec![false; children.len()];
    for i in 0..children.len() {
        let content = match &children[i] {
            Node::Text(t) => t.content.clone(),
            _ => continue,
        };
        if content.trim().is_empty() {
            let prev = if i == 0 { None } else { Some(&children[i - 1]) };
            let next = children.get(i + 1);
            // Whitespace-only runs vanish at the edges of a children list,
            // around comments, and between elements when they span a line
            // break. Everything else shrinks to a single space.
            let drop = prev.is_none()
                || next.is_none()
                || match (prev, next) {
                    (Some(Node::Comment(_)), Some(Node::Comment(_)))
                    | (Some(Node::Comment(_)), Some(Node::Element(_)))
                    | (Some(Node::Element(_)), Some(Node::Comment(_))) => true,
                    (Some(Node::Element(_)), Some(Node::Element(_))) => has_newline(&content),
                    _ => false,
                };
            if drop {
                removed[i] = true;
            } else if let Node::Text(t) = &mut children[i] {
                t.content = " ".to_string();
            }
        } else if let Node::Text(t) = &mut children[i] {
            t.content = WHITESPACE_RUN.replace_all(&t.content, " ").into_owned();
        }
    }
    if removed.iter().any(|&r| r) {
        let mut keep = removed.iter().map(|&r| !r);
        children.retain(|_| keep.next().unwrap_or(true));
    }
}
