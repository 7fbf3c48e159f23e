//! Per-call configuration.
//!
//! Options values are plain structs built with `Default` plus struct update.
//! There is no shared mutable configuration: every `parse`/`transform` call
//! owns its options, including the diagnostic sinks.

use crate::errors::{ErrorSink, WarnSink};
use crate::tags::Namespace;

/// How text whitespace between nodes is treated after a children list
/// completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    #[default]
    Condense,
    Preserve,
}

type TagPredicate<'a> = Box<dyn Fn(&str) -> bool + 'a>;

pub struct ParserOptions<'a> {
    /// Interpolation delimiter pair. Both sides must be non-empty ASCII.
    pub delimiters: (String, String),
    pub whitespace: WhitespaceMode,
    /// Whether comment nodes are kept in the tree.
    pub comments: bool,
    /// Overrides for the built-in tag tables. `None` uses the HTML defaults.
    pub is_void_tag: Option<TagPredicate<'a>>,
    pub is_pre_tag: Option<TagPredicate<'a>>,
    pub is_custom_element: Option<TagPredicate<'a>>,
    /// Tags that classify as components regardless of casing.
    pub is_builtin_component: Option<TagPredicate<'a>>,
    #[allow(clippy::type_complexity)]
    pub get_namespace: Option<Box<dyn Fn(&str, Option<&str>, Namespace) -> Namespace + 'a>>,
    /// Receives every diagnostic. When absent, the first error aborts the
    /// parse.
    pub on_error: Option<ErrorSink<'a>>,
    /// Receives warning-level diagnostics. Warnings never abort.
    pub on_warn: Option<WarnSink<'a>>,
}

impl Default for ParserOptions<'_> {
    fn default() -> Self {
        ParserOptions {
            delimiters: ("{{".to_string(), "}}".to_string()),
            whitespace: WhitespaceMode::Condense,
            comments: true,
            is_void_tag: None,
            is_pre_tag: None,
            is_custom_element: None,
            is_builtin_component: None,
            get_namespace: None,
            on_error: None,
            on_warn: None,
        }
    }
}

impl<'a> ParserOptions<'a> {
    pub(crate) fn void_tag(&self, tag: &str) -> bool {
        match &self.is_void_tag {
            Some(f) => f(tag),
            None => crate::tags::is_void_tag(tag),
        }
    }

    pub(crate) fn pre_tag(&self, tag: &str) -> bool {
        match &self.is_pre_tag {
            Some(f) => f(tag),
            None => crate::tags::is_pre_tag(tag),
        }
    }

    pub(crate) fn custom_element(&self, tag: &str) -> bool {
        self.is_custom_element.as_ref().is_some_and(|f| f(tag))
    }

    pub(crate) fn builtin_component(&self, tag: &str) -> bool {
        self.is_builtin_component.as_ref().is_some_and(|f| f(tag))
    }

    pub(crate) fn namespace(
        &self,
        tag: &str,
        parent_tag: Option<&str>,
        parent_ns: Namespace,
    ) -> Namespace {
        match &self.get_namespace {
            Some(f) => f(tag, parent_tag, parent_ns),
            None => crate::tags::default_namespace(tag, parent_tag, parent_ns),
        }
    }
}

pub struct TransformOptions<'a> {
    /// Ordered node transforms, run pre-order on every node.
    pub node_transforms: Vec<crate::transform::NodeTransform>,
    /// Directive-name keyed transforms consulted while building element
    /// props.
    pub directive_transforms:
        std::collections::HashMap<String, crate::transform::DirectiveTransform>,
    /// Run the static classification/hoisting pass after traversal.
    pub hoist_static: bool,
    /// Reserved for an expression-rewriting stage; carried through untouched.
    pub prefix_identifiers: bool,
    pub on_error: Option<ErrorSink<'a>>,
}

impl Default for TransformOptions<'_> {
    fn default() -> Self {
        TransformOptions {
            node_transforms: Vec::new(),
            directive_transforms: std::collections::HashMap::new(),
            hoist_static: false,
            prefix_identifiers: false,
            on_error: None,
        }
    }
}
