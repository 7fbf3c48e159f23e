//! Template AST.
//!
//! A closed sum type over every node kind the pipeline produces, from the
//! parser's markup nodes through the lowered structural shapes to the codegen
//! IR the transforms attach. Every node carries a [`SourceSpan`]; nodes
//! synthesized by transforms use [`SourceSpan::stub`].

use crate::parse_util::SourceSpan;
use crate::runtime_helpers::RuntimeHelper;
use crate::tags::Namespace;
use bitflags::bitflags;
use indexmap::IndexSet;
use serde::Serialize;

/// Dense, parser-assigned element identity. Used as the key for side tables
/// that outlive a borrow of the tree (constant-classification memoization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub usize);

/// How constant a subtree is. Ordered: each level implies the ones below it.
///
/// The parser and the built-in transforms only produce `CanStringify` (fully
/// static) and `NotConstant`. `CanSkipPatch` sits in between for embedding
/// compilers whose expression analysis proves a binding stable across
/// renders; they assign it to [`SimpleExpression::const_type`] before the
/// caching pass, which turns such subtrees into render-cache slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConstantType {
    NotConstant,
    CanSkipPatch,
    CanCache,
    CanStringify,
}

bitflags! {
    /// Runtime patching hints attached to a [`VNodeCall`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct PatchFlags: u32 {
        const TEXT = 1;
        const CLASS = 1 << 1;
        const STYLE = 1 << 2;
        const PROPS = 1 << 3;
        const FULL_PROPS = 1 << 4;
        const NEED_PATCH = 1 << 5;
        const STABLE_FRAGMENT = 1 << 6;
        const KEYED_FRAGMENT = 1 << 7;
        const UNKEYED_FRAGMENT = 1 << 8;
    }
}

/// Classification assigned when an element's open tag completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    Plain,
    Component,
    SlotOutlet,
    /// A `<template>` that groups children for a structural or slot
    /// directive. A `<template>` without one stays [`ElementKind::Plain`].
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub content: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub content: String,
    pub span: SourceSpan,
}

/// An opaque expression slice. The compiler never evaluates it; `is_static`
/// marks expressions that are literal text (static attribute values, hoist
/// references, object keys).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleExpression {
    pub content: String,
    pub is_static: bool,
    pub const_type: ConstantType,
    pub span: SourceSpan,
}

impl SimpleExpression {
    pub fn new(content: impl Into<String>, is_static: bool, span: SourceSpan) -> Self {
        let const_type =
            if is_static { ConstantType::CanStringify } else { ConstantType::NotConstant };
        SimpleExpression { content: content.into(), is_static, const_type, span }
    }
}

/// `{{ expression }}`. The span covers the delimiters; the inner expression
/// span covers the trimmed content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpolation {
    pub content: SimpleExpression,
    pub span: SourceSpan,
}

/// One piece of a merged text run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CompoundChild {
    Text(Text),
    Interpolation(Interpolation),
    Expression(SimpleExpression),
    /// Literal joining source, e.g. ` + `.
    Separator(String),
}

/// Adjacent text and interpolation siblings merged by the text transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundExpression {
    pub children: Vec<CompoundChild>,
    pub span: SourceSpan,
}

/// A plain `name="value"` attribute. `value` is `None` for bare attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub name_span: SourceSpan,
    pub value: Option<Text>,
    pub span: SourceSpan,
}

/// A parsed directive: `v-name:arg.mod="exp"` or one of the shorthands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    /// Canonical name without the `v-` prefix (`bind`, `on`, `if`, ...).
    pub name: String,
    /// The name exactly as written, shorthand marker included.
    pub raw_name: String,
    pub arg: Option<SimpleExpression>,
    pub exp: Option<SimpleExpression>,
    pub modifiers: Vec<SimpleExpression>,
    pub span: SourceSpan,
    /// Loop alias decomposition, cached at parse time for `for` directives.
    pub for_parse_result: Option<ForParseResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Prop {
    Attribute(Attribute),
    Directive(Directive),
}

impl Prop {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Prop::Attribute(a) => &a.span,
            Prop::Directive(d) => &d.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Prop::Attribute(a) => &a.name,
            Prop::Directive(d) => &d.name,
        }
    }
}

/// Decomposed loop expression: `value (in|of) source` with optional
/// `, key[, index]` extras. Elided slots stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForParseResult {
    pub source: SimpleExpression,
    pub value: Option<SimpleExpression>,
    pub key: Option<SimpleExpression>,
    pub index: Option<SimpleExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub id: NodeId,
    pub tag: String,
    pub kind: ElementKind,
    pub ns: Namespace,
    pub self_closing: bool,
    pub props: Vec<Prop>,
    pub children: Vec<Node>,
    /// Whether the element opens a block at runtime. Cleared by the static
    /// optimizer for fully-constant subtrees.
    pub is_block: bool,
    pub codegen: Option<CodegenNode>,
    pub span: SourceSpan,
}

impl Element {
    pub fn find_directive(&self, name: &str) -> Option<&Directive> {
        self.props.iter().find_map(|p| match p {
            Prop::Directive(d) if d.name == name => Some(d),
            _ => None,
        })
    }
}

/// One arm of a lowered conditional. `condition` is `None` for the trailing
/// unconditioned branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfBranch {
    pub condition: Option<SimpleExpression>,
    pub children: Vec<Node>,
    pub span: SourceSpan,
}

/// A chain of conditional branches lowered from `if`/`else-if`/`else`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfBranchGroup {
    pub branches: Vec<IfBranch>,
    pub span: SourceSpan,
}

/// A lowered loop. The body children render once per iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoop {
    pub parse_result: ForParseResult,
    pub children: Vec<Node>,
    pub span: SourceSpan,
}

// ---- codegen IR --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: SimpleExpression,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectExpression {
    pub properties: Vec<Property>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayExpression {
    pub elements: Vec<Node>,
    pub span: SourceSpan,
}

/// A render-cache slot. `index` is dense per [`Root`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheExpression {
    pub index: usize,
    pub value: Box<Node>,
    pub span: SourceSpan,
}

/// The emitter-facing description of one vnode creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VNodeCall {
    pub tag: String,
    pub is_component: bool,
    pub props: Option<Box<Node>>,
    pub children: Vec<Node>,
    pub patch_flag: PatchFlags,
    pub dynamic_props: Vec<String>,
    /// Names of user directives applied via `withDirectives`.
    pub directives: Vec<String>,
    pub is_block: bool,
    pub disable_tracking: bool,
}

/// What the element transform attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CodegenNode {
    VNode(VNodeCall),
    /// Index into [`Root::hoists`].
    HoistRef(usize),
    Cached(CacheExpression),
}

// ---- node & root -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Element(Element),
    Text(Text),
    Comment(Comment),
    Interpolation(Interpolation),
    SimpleExpression(SimpleExpression),
    CompoundExpression(CompoundExpression),
    IfBranchGroup(IfBranchGroup),
    ForLoop(ForLoop),
    Object(ObjectExpression),
    Array(ArrayExpression),
    Cache(CacheExpression),
}

impl Node {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Node::Element(n) => &n.span,
            Node::Text(n) => &n.span,
            Node::Comment(n) => &n.span,
            Node::Interpolation(n) => &n.span,
            Node::SimpleExpression(n) => &n.span,
            Node::CompoundExpression(n) => &n.span,
            Node::IfBranchGroup(n) => &n.span,
            Node::ForLoop(n) => &n.span,
            Node::Object(n) => &n.span,
            Node::Array(n) => &n.span,
            Node::Cache(n) => &n.span,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// Root shape marker the emitter dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RootCodegen {
    SingleChild,
    /// Multiple root children render as an implicit fragment.
    MultiRoot,
}

/// The parsed (and, after transformation, annotated) template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Root {
    pub children: Vec<Node>,
    /// Runtime helpers the generated code needs, in first-use order.
    pub helpers: IndexSet<RuntimeHelper>,
    /// Component names to resolve, in first-use order.
    pub components: IndexSet<String>,
    /// User directive names to resolve, in first-use order.
    pub directives: IndexSet<String>,
    pub hoists: Vec<Node>,
    /// Number of render-cache slots handed out.
    pub cached: usize,
    pub codegen: Option<RootCodegen>,
    pub span: SourceSpan,
}

impl Root {
    pub fn new(children: Vec<Node>, span: SourceSpan) -> Self {
        Root {
            children,
            helpers: IndexSet::new(),
            components: IndexSet::new(),
            directives: IndexSet::new(),
            hoists: Vec::new(),
            cached: 0,
            codegen: None,
            span,
        }
    }
}
