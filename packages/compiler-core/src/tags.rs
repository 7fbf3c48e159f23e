//! Tag tables: void elements, raw-text modes, namespaces.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;

/// Content namespace of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

/// How the tokenizer treats an element's character data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Tags, comments, entities and interpolation are all recognized.
    Data,
    /// Everything is literal text until the matching end tag (script, style).
    RawText,
    /// Entities and interpolation are still recognized (title, textarea).
    EscapableRawText,
}

static VOID_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

pub fn is_pre_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("pre")
}

pub fn text_mode_for(tag: &str) -> TextMode {
    let lower = tag.to_ascii_lowercase();
    match lower.as_str() {
        "script" | "style" => TextMode::RawText,
        "title" | "textarea" => TextMode::EscapableRawText,
        _ => TextMode::Data,
    }
}

/// Default namespace resolution: children inherit, `<svg>`/`<math>` open
/// their namespaces, and the HTML integration points inside SVG drop back to
/// HTML content.
pub fn default_namespace(tag: &str, parent_tag: Option<&str>, parent_ns: Namespace) -> Namespace {
    let mut ns = parent_ns;
    if let Some(parent) = parent_tag {
        if parent_ns == Namespace::Svg
            && matches!(parent, "foreignObject" | "desc" | "title")
        {
            ns = Namespace::Html;
        }
        if parent_ns == Namespace::MathMl && parent == "annotation-xml" {
            ns = Namespace::Html;
        }
    }
    if ns == Namespace::Html {
        match tag {
            "svg" => Namespace::Svg,
            "math" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    } else {
        ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_tags_are_case_insensitive() {
        assert!(is_void_tag("br"));
        assert!(is_void_tag("BR"));
        assert!(!is_void_tag("div"));
    }

    #[test]
    fn text_modes() {
        assert_eq!(text_mode_for("script"), TextMode::RawText);
        assert_eq!(text_mode_for("TEXTAREA"), TextMode::EscapableRawText);
        assert_eq!(text_mode_for("div"), TextMode::Data);
    }

    #[test]
    fn namespace_resolution() {
        assert_eq!(default_namespace("svg", None, Namespace::Html), Namespace::Svg);
        assert_eq!(default_namespace("circle", Some("svg"), Namespace::Svg), Namespace::Svg);
        assert_eq!(
            default_namespace("div", Some("foreignObject"), Namespace::Svg),
            Namespace::Html
        );
    }
}
