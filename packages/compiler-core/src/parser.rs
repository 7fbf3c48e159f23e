//! Tree builder.
//!
//! Implements [`TokenizerCallbacks`] over an element stack. Malformed markup
//! degrades the way a browser degrades it: unclosed elements are implicitly
//! closed, stray end tags are dropped, and every deviation is reported with
//! an exact span.

use crate::ast::{
    Attribute, Comment, Directive, Element, ElementKind, ForParseResult, Interpolation, Node,
    NodeId, Prop, Root, SimpleExpression, Text,
};
use crate::chars;
use crate::errors::{CompilerError, ErrorCode, ErrorLevel};
use crate::options::ParserOptions;
use crate::parse_util::{advance_position, LineIndex, SourceSpan};
use crate::tags::Namespace;
use crate::tokenizer::{tokenize, TokenizerOptions};
use crate::tokens::{QuoteKind, TokenizerCallbacks};
use crate::whitespace::condense_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;

/// Parses `source` into a [`Root`].
///
/// With an `on_error` sink installed, every diagnostic flows to the sink and
/// a best-effort tree is always returned. Without one, the first error-level
/// diagnostic aborts the parse. Warnings go to `on_warn` and never abort.
pub fn parse(source: &str, mut options: ParserOptions<'_>) -> Result<Root, CompilerError> {
    let mut on_error = options.on_error.take();
    let mut on_warn = options.on_warn.take();
    let line_index = LineIndex::new(source);
    let tokenizer_options = TokenizerOptions { delimiters: options.delimiters.clone() };

    let mut builder = TreeBuilder::new(source, &line_index, &options);
    tokenize(source, &tokenizer_options, &mut builder);
    let (root, diagnostics) = builder.into_output();

    let mut first_error = None;
    for diagnostic in diagnostics {
        match diagnostic.level {
            ErrorLevel::Warning => {
                if let Some(warn) = on_warn.as_mut() {
                    warn(diagnostic);
                }
            }
            ErrorLevel::Error => match on_error.as_mut() {
                Some(sink) => sink(diagnostic),
                None => {
                    if first_error.is_none() {
                        first_error = Some(diagnostic);
                    }
                }
            },
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(root),
    }
}

struct TreeBuilder<'s, 'a> {
    source: &'s str,
    buf: &'s [u8],
    line_index: &'s LineIndex,
    options: &'s ParserOptions<'a>,
    stack: Vec<Element>,
    stack_starts: Vec<usize>,
    root_children: Vec<Node>,
    errors: Vec<CompilerError>,
    // Pending text run, possibly assembled from several fragments around
    // decoded character references.
    text_buf: String,
    text_start: usize,
    text_end: usize,
    // Open tag under construction.
    current: Option<Element>,
    current_start: usize,
    current_prop: Option<Prop>,
    prop_start: usize,
    attr_value: String,
    attr_value_started: bool,
    attr_value_start: usize,
    attr_value_end: usize,
    in_pre: usize,
    v_pre_pending: bool,
    v_pre_boundary: Option<usize>,
    next_id: usize,
}

impl<'s, 'a> TreeBuilder<'s, 'a> {
    fn new(source: &'s str, line_index: &'s LineIndex, options: &'s ParserOptions<'a>) -> Self {
        TreeBuilder {
            source,
            buf: source.as_bytes(),
            line_index,
            options,
            stack: Vec::new(),
            stack_starts: Vec::new(),
            root_children: Vec::new(),
            errors: Vec::new(),
            text_buf: String::new(),
            text_start: 0,
            text_end: 0,
            current: None,
            current_start: 0,
            current_prop: None,
            prop_start: 0,
            attr_value: String::new(),
            attr_value_started: false,
            attr_value_start: 0,
            attr_value_end: 0,
            in_pre: 0,
            v_pre_pending: false,
            v_pre_boundary: None,
            next_id: 0,
        }
    }

    fn into_output(mut self) -> (Root, Vec<CompilerError>) {
        condense_whitespace(&mut self.root_children, self.options.whitespace, false);
        let span = self.span(0, self.source.len());
        (Root::new(self.root_children, span), self.errors)
    }

    fn span(&self, start: usize, end: usize) -> SourceSpan {
        self.line_index.span(self.source, start, end)
    }

    fn err_at(&mut self, code: ErrorCode, offset: usize) {
        let offset = offset.min(self.source.len());
        self.errors.push(CompilerError::new(code, self.span(offset, offset)));
    }

    fn push_child(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root_children.push(node),
        }
    }

    fn flush_text(&mut self) {
        if self.text_buf.is_empty() {
            return;
        }
        let content = normalize_line_endings(&self.text_buf);
        let span = self.span(self.text_start, self.text_end);
        self.text_buf.clear();
        self.push_child(Node::Text(Text { content, span }));
    }

    fn append_text(&mut self, text: &str, start: usize, end: usize) {
        if self.text_buf.is_empty() {
            self.text_start = start;
        }
        self.text_buf.push_str(text);
        self.text_end = end;
    }

    // ---- open tags -----------------------------------------------------

    fn classify(&self, el: &Element) -> ElementKind {
        let tag = el.tag.as_str();
        if self.in_v_pre() || self.options.custom_element(tag) {
            return ElementKind::Plain;
        }
        if tag == "slot" {
            return ElementKind::SlotOutlet;
        }
        if tag == "template" {
            let grouping = el.props.iter().any(|p| match p {
                Prop::Directive(d) => {
                    matches!(d.name.as_str(), "if" | "else-if" | "else" | "for" | "slot")
                }
                Prop::Attribute(_) => false,
            });
            return if grouping { ElementKind::Template } else { ElementKind::Plain };
        }
        let has_is_binding = el.props.iter().any(|p| match p {
            Prop::Directive(d) => {
                d.name == "bind"
                    && d.arg.as_ref().is_some_and(|arg| arg.is_static && arg.content == "is")
            }
            Prop::Attribute(a) => a.name == "is",
        });
        let component = el.tag.starts_with(|c: char| c.is_ascii_uppercase())
            || tag == "component"
            || self.options.builtin_component(tag)
            || has_is_binding;
        if component {
            ElementKind::Component
        } else {
            ElementKind::Plain
        }
    }

    fn complete_open_tag(&mut self, gt_offset: usize, self_closing: bool) {
        let Some(mut el) = self.current.take() else { return };
        el.self_closing = self_closing;
        el.kind = self.classify(&el);
        el.span = self.span(self.current_start, (gt_offset + 1).min(self.source.len()));
        if self_closing || self.options.void_tag(&el.tag) {
            if self.v_pre_pending {
                self.v_pre_pending = false;
            }
            self.push_child(Node::Element(el));
        } else {
            if self.options.pre_tag(&el.tag) {
                self.in_pre += 1;
            }
            if self.v_pre_pending {
                self.v_pre_pending = false;
                self.v_pre_boundary = Some(self.stack.len());
            }
            self.stack_starts.push(self.current_start);
            self.stack.push(el);
        }
    }

    fn pop_element(&mut self, end_offset: usize) {
        let Some(mut el) = self.stack.pop() else { return };
        let start = self.stack_starts.pop().unwrap_or(el.span.start.offset);
        el.span = self.span(start, end_offset);
        condense_whitespace(&mut el.children, self.options.whitespace, self.in_pre > 0);
        if self.options.pre_tag(&el.tag) {
            self.in_pre = self.in_pre.saturating_sub(1);
            // A newline immediately after the open tag is not content.
            let mut emptied = false;
            if let Some(Node::Text(t)) = el.children.first_mut() {
                if t.content.starts_with('\n') {
                    t.content.remove(0);
                    emptied = t.content.is_empty();
                }
            }
            if emptied {
                el.children.remove(0);
            }
        }
        if self.v_pre_boundary == Some(self.stack.len()) {
            self.v_pre_boundary = None;
        }
        self.push_child(Node::Element(el));
    }

    // ---- attributes ----------------------------------------------------

    fn finish_prop(&mut self, quote: QuoteKind, end: usize) {
        let Some(mut prop) = self.current_prop.take() else { return };
        let has_value = quote != QuoteKind::None && self.attr_value_started;
        let value_span = if has_value {
            Some(self.span(self.attr_value_start, self.attr_value_end))
        } else {
            None
        };
        let content = normalize_line_endings(&self.attr_value);
        self.attr_value.clear();
        self.attr_value_started = false;
        let span = self.span(self.prop_start, end.min(self.source.len()));
        match &mut prop {
            Prop::Attribute(attr) => {
                if let Some(value_span) = value_span {
                    attr.value = Some(Text { content, span: value_span });
                }
                attr.span = span;
            }
            Prop::Directive(dir) => {
                if let Some(value_span) = value_span {
                    dir.exp = Some(SimpleExpression::new(content, false, value_span));
                }
                dir.span = span;
                if dir.name == "for" {
                    dir.for_parse_result =
                        dir.exp.as_ref().and_then(parse_for_expression);
                }
            }
        }
        let key = written_name(&prop).to_string();
        let duplicate = !key.is_empty()
            && self
                .current
                .as_ref()
                .is_some_and(|c| c.props.iter().any(|p| written_name(p) == key));
        if duplicate {
            self.err_at(ErrorCode::DuplicateAttribute, self.prop_start);
        }
        if let Some(current) = self.current.as_mut() {
            current.props.push(prop);
        }
    }

    /// Already-decomposed directives on the element that just turned out to
    /// carry `v-pre` are folded back into plain attributes.
    fn convert_directives_to_attributes(&mut self) {
        let Some(current) = self.current.as_mut() else { return };
        for prop in current.props.iter_mut() {
            if let Prop::Directive(dir) = prop {
                let raw = dir.span.source.clone();
                let name: String =
                    raw.split('=').next().unwrap_or(raw.as_str()).trim_end().to_string();
                let name_start = dir.span.start.offset;
                let name_span = self.line_index.span(
                    self.source,
                    name_start,
                    (name_start + name.len()).min(self.source.len()),
                );
                let value = dir.exp.as_ref().map(|exp| Text {
                    content: exp.content.clone(),
                    span: exp.span.clone(),
                });
                *prop = Prop::Attribute(Attribute {
                    name,
                    name_span,
                    value,
                    span: dir.span.clone(),
                });
            }
        }
    }

    fn in_v_pre(&self) -> bool {
        self.v_pre_pending || self.v_pre_boundary.is_some()
    }
}

fn written_name(prop: &Prop) -> &str {
    match prop {
        Prop::Attribute(a) => &a.name,
        Prop::Directive(d) => &d.raw_name,
    }
}

fn normalize_line_endings(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    }
}

impl TokenizerCallbacks for TreeBuilder<'_, '_> {
    fn on_text(&mut self, start: usize, end: usize) {
        let slice = &self.source[start..end];
        self.append_text(&slice.to_string(), start, end);
    }

    fn on_text_entity(&mut self, text: &str, start: usize, end: usize) {
        self.append_text(&text.to_string(), start, end);
    }

    fn on_interpolation(&mut self, start: usize, end: usize) {
        self.flush_text();
        let open_len = self.options.delimiters.0.len();
        let close_len = self.options.delimiters.1.len();
        let raw = &self.source[start + open_len..end - close_len];
        let trimmed = raw.trim();
        let inner_start = start + open_len + (raw.len() - raw.trim_start().len());
        let inner_end = inner_start + trimmed.len();
        let content = SimpleExpression::new(
            normalize_line_endings(trimmed),
            false,
            self.span(inner_start, inner_end),
        );
        let span = self.span(start, end);
        self.push_child(Node::Interpolation(Interpolation { content, span }));
    }

    fn on_open_tag_name(&mut self, start: usize, end: usize) {
        self.flush_text();
        let tag = self.source[start..end].to_string();
        let (parent_tag, parent_ns) = match self.stack.last() {
            Some(parent) => (Some(parent.tag.clone()), parent.ns),
            None => (None, Namespace::Html),
        };
        let ns = self.options.namespace(&tag, parent_tag.as_deref(), parent_ns);
        self.current_start = start - 1;
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.current = Some(Element {
            id,
            tag,
            kind: ElementKind::Plain,
            ns,
            self_closing: false,
            props: Vec::new(),
            children: Vec::new(),
            is_block: false,
            codegen: None,
            span: self.span(start, end),
        });
    }

    fn on_open_tag_end(&mut self, end: usize) {
        self.complete_open_tag(end, false);
    }

    fn on_self_closing_tag(&mut self, end: usize) {
        self.complete_open_tag(end, true);
    }

    fn on_close_tag(&mut self, start: usize, end: usize) {
        self.flush_text();
        let name = &self.source[start..end];
        let gt_end = self.buf[end..]
            .iter()
            .position(|&b| b == chars::GT)
            .map(|p| end + p + 1)
            .unwrap_or(self.buf.len());
        match self.stack.iter().rposition(|el| el.tag.eq_ignore_ascii_case(name)) {
            Some(depth) => {
                while self.stack.len() > depth + 1 {
                    let open_at = self.stack_starts.last().copied().unwrap_or(0);
                    self.err_at(ErrorCode::MissingEndTag, open_at);
                    self.pop_element(start.saturating_sub(2));
                }
                self.pop_element(gt_end);
            }
            None => {
                self.err_at(ErrorCode::InvalidEndTag, start.saturating_sub(2));
            }
        }
    }

    fn on_attrib_name(&mut self, start: usize, end: usize) {
        let name = self.source[start..end].to_string();
        self.prop_start = start;
        self.current_prop = Some(Prop::Attribute(Attribute {
            name,
            name_span: self.span(start, end),
            value: None,
            span: self.span(start, end),
        }));
    }

    fn on_attrib_data(&mut self, start: usize, end: usize) {
        if !self.attr_value_started {
            self.attr_value_started = true;
            self.attr_value_start = start;
        }
        self.attr_value.push_str(&self.source[start..end]);
        self.attr_value_end = end;
    }

    fn on_attrib_entity(&mut self, text: &str, start: usize, end: usize) {
        if !self.attr_value_started {
            self.attr_value_started = true;
            self.attr_value_start = start;
        }
        self.attr_value.push_str(text);
        self.attr_value_end = end;
    }

    fn on_attrib_end(&mut self, quote: QuoteKind, end: usize) {
        self.finish_prop(quote, end);
    }

    fn on_dir_name(&mut self, start: usize, end: usize) {
        let raw = self.source[start..end].to_string();
        self.prop_start = start;
        let mut modifiers = Vec::new();
        let name = match raw.as_str() {
            ":" => "bind".to_string(),
            "." => {
                modifiers.push(SimpleExpression::new("prop", true, SourceSpan::stub()));
                "bind".to_string()
            }
            "@" => "on".to_string(),
            "#" => "slot".to_string(),
            _ => raw.strip_prefix("v-").unwrap_or(raw.as_str()).to_string(),
        };
        if name == "pre" {
            self.v_pre_pending = true;
            self.convert_directives_to_attributes();
        }
        self.current_prop = Some(Prop::Directive(Directive {
            name,
            raw_name: raw,
            arg: None,
            exp: None,
            modifiers,
            span: self.span(start, end),
            for_parse_result: None,
        }));
    }

    fn on_dir_arg(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        let raw = &self.source[start..end];
        let Some(Prop::Directive(dir)) = self.current_prop.as_mut() else { return };
        if dir.raw_name.starts_with("v-") {
            dir.raw_name.push(':');
        }
        dir.raw_name.push_str(raw);
        let arg = if let Some(inner) = raw.strip_prefix('[') {
            let content = inner.strip_suffix(']').unwrap_or(inner);
            SimpleExpression::new(content, false, self.line_index.span(self.source, start, end))
        } else {
            SimpleExpression::new(raw, true, self.line_index.span(self.source, start, end))
        };
        dir.arg = Some(arg);
    }

    fn on_dir_modifier(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        let raw = &self.source[start..end];
        let span = self.line_index.span(self.source, start, end);
        if let Some(Prop::Directive(dir)) = self.current_prop.as_mut() {
            dir.modifiers.push(SimpleExpression::new(raw, true, span));
        }
    }

    fn on_comment(&mut self, start: usize, end: usize) {
        self.flush_text();
        if !self.options.comments {
            return;
        }
        // Recover the marker extents; the opener is always the nearest `<`
        // before the content.
        let span_start = self.source[..start].rfind('<').unwrap_or(start);
        let span_end = self.buf[end..]
            .iter()
            .position(|&b| b == chars::GT)
            .map(|p| end + p + 1)
            .unwrap_or(self.buf.len());
        let content = normalize_line_endings(&self.source[start..end]);
        let span = self.span(span_start, span_end);
        self.push_child(Node::Comment(Comment { content, span }));
    }

    fn on_cdata(&mut self, start: usize, end: usize) {
        let ns = self.stack.last().map(|el| el.ns).unwrap_or(Namespace::Html);
        if ns == Namespace::Html {
            self.err_at(ErrorCode::CdataInHtmlContent, start.saturating_sub(9));
        } else {
            let slice = self.source[start..end].to_string();
            self.append_text(&slice, start, end);
        }
    }

    fn on_processing_instruction(&mut self, start: usize, end: usize) {
        self.on_comment(start, end);
    }

    fn on_end(&mut self, end: usize) {
        // Best-effort completion of whatever is still open at EOF.
        if self.current_prop.is_some() {
            self.finish_prop(QuoteKind::None, end);
        }
        if let Some(mut el) = self.current.take() {
            el.kind = self.classify(&el);
            el.span = self.span(self.current_start, end);
            self.push_child(Node::Element(el));
        }
        self.flush_text();
        while !self.stack.is_empty() {
            let open_at = self.stack_starts.last().copied().unwrap_or(0);
            self.err_at(ErrorCode::MissingEndTag, open_at);
            self.pop_element(end);
        }
    }

    fn on_err(&mut self, code: ErrorCode, offset: usize) {
        self.err_at(code, offset);
    }

    fn in_v_pre(&self) -> bool {
        TreeBuilder::in_v_pre(self)
    }
}

static FOR_ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*?)\s+(?:in|of)\s+(.*)$").unwrap());
static FOR_ITERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",([^,\}\]]*)(?:,([^,\}\]]*))?$").unwrap());
static STRIP_PARENS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(|\)$").unwrap());

/// Decomposes a loop expression: `value (in|of) source` with an optional
/// `, key[, index]` tail after the value. Elided fragments stay `None`;
/// fragment spans are located by forward search inside the full expression.
pub fn parse_for_expression(input: &SimpleExpression) -> Option<ForParseResult> {
    let exp = input.content.as_str();
    let caps = FOR_ALIAS_RE.captures(exp)?;
    let lhs = caps.get(1)?.as_str();
    let rhs_match = caps.get(2)?;
    let rhs = rhs_match.as_str().trim();
    if rhs.is_empty() {
        return None;
    }
    let rhs_offset = exp[rhs_match.start()..].find(rhs).map(|p| rhs_match.start() + p)?;
    let source = alias_expression(input, rhs, rhs_offset);

    let lhs_trimmed = lhs.trim();
    let mut value_content = STRIP_PARENS_RE.replace_all(lhs_trimmed, "").trim().to_string();
    let trimmed_offset = exp.find(value_content.as_str()).unwrap_or(0);

    let mut key = None;
    let mut index = None;
    let alias_list = value_content.clone();
    if let Some(iter) = FOR_ITERATOR_RE.captures(&alias_list) {
        value_content = FOR_ITERATOR_RE.replace(&value_content, "").trim().to_string();
        let key_content = iter.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
        let mut key_end = trimmed_offset + value_content.len();
        if !key_content.is_empty() {
            if let Some(pos) = exp[key_end..].find(&key_content) {
                let at = key_end + pos;
                key = Some(alias_expression(input, &key_content, at));
                key_end = at + key_content.len();
            }
        }
        if let Some(index_match) = iter.get(2) {
            let index_content = index_match.as_str().trim();
            if !index_content.is_empty() {
                if let Some(pos) = exp[key_end..].find(index_content) {
                    index = Some(alias_expression(input, index_content, key_end + pos));
                }
            }
        }
    }

    let value = if value_content.is_empty() {
        None
    } else {
        Some(alias_expression(input, &value_content, trimmed_offset))
    };
    Some(ForParseResult { source, value, key, index })
}

fn alias_expression(input: &SimpleExpression, content: &str, offset: usize) -> SimpleExpression {
    let start = advance_position(input.span.start, &input.content, offset);
    let end = advance_position(start, content, content.len());
    SimpleExpression::new(content, false, SourceSpan::new(start, end, content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_util::Position;

    fn exp(content: &str) -> SimpleExpression {
        let span = SourceSpan::new(
            Position::default(),
            Position::new(content.len(), 1, content.len() as u32 + 1),
            content.to_string(),
        );
        SimpleExpression::new(content, false, span)
    }

    #[test]
    fn alias_value_only() {
        let result = parse_for_expression(&exp("item in items")).unwrap();
        assert_eq!(result.value.unwrap().content, "item");
        assert_eq!(result.key, None);
        assert_eq!(result.index, None);
        assert_eq!(result.source.content, "items");
    }

    #[test]
    fn alias_value_and_key() {
        let result = parse_for_expression(&exp("(value, key) in object")).unwrap();
        assert_eq!(result.value.unwrap().content, "value");
        assert_eq!(result.key.unwrap().content, "key");
        assert_eq!(result.index, None);
        assert_eq!(result.source.content, "object");
    }

    #[test]
    fn alias_full_triple_with_of() {
        let result = parse_for_expression(&exp("(value, key, index) of object")).unwrap();
        assert_eq!(result.value.unwrap().content, "value");
        assert_eq!(result.key.unwrap().content, "key");
        assert_eq!(result.index.unwrap().content, "index");
        assert_eq!(result.source.content, "object");
    }

    #[test]
    fn alias_elided_value_slot() {
        let result = parse_for_expression(&exp("(, key) in object")).unwrap();
        assert_eq!(result.value, None);
        assert_eq!(result.key.unwrap().content, "key");
        assert_eq!(result.source.content, "object");
    }

    #[test]
    fn alias_elided_key_slot() {
        let result = parse_for_expression(&exp("(value, , index) in object")).unwrap();
        assert_eq!(result.value.unwrap().content, "value");
        assert_eq!(result.key, None);
        assert_eq!(result.index.unwrap().content, "index");
    }

    #[test]
    fn malformed_alias_is_rejected() {
        assert_eq!(parse_for_expression(&exp("items")), None);
        assert_eq!(parse_for_expression(&exp("item in ")), None);
    }

    #[test]
    fn alias_spans_point_into_the_expression() {
        let result = parse_for_expression(&exp("item in items")).unwrap();
        let value = result.value.unwrap();
        assert_eq!(value.span.start.offset, 0);
        assert_eq!(value.span.end.offset, 4);
        assert_eq!(result.source.span.start.offset, 8);
        assert_eq!(result.source.span.end.offset, 13);
    }
}
