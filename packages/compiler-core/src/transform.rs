//! AST transformation engine.
//!
//! Runs an ordered list of node transforms over the tree, pre-order. Each
//! transform returns a [`Transition`] telling the engine what happened to the
//! visited slot, and may queue exit actions that run after the node's
//! children, in reverse registration order. Transforms see the node's
//! preceding siblings, which is how conditional chains fold backward.

use crate::ast::{Element, ElementKind, Node, Property, Root, RootCodegen};
use crate::errors::{CompilerError, ErrorCode, ErrorLevel};
use crate::options::TransformOptions;
use crate::parse_util::SourceSpan;
use crate::runtime_helpers::RuntimeHelper;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::rc::Rc;

/// What a node transform did to the visited slot.
pub enum Transition {
    Keep,
    /// Overwrite the slot; remaining transforms re-run on the new node
    /// before the engine recurses into it.
    Replace(Node),
    /// Drop the slot. The sibling cursor does not advance past it.
    Remove,
}

pub type NodeTransform = Box<dyn Fn(&mut Node, &mut [Node], &mut TransformContext) -> Transition>;
pub type ExitFn = Box<dyn FnOnce(&mut Node, &mut TransformContext)>;

/// Result of a directive transform: properties to merge into the props
/// object, and whether the directive still needs a runtime counterpart.
pub struct DirectiveTransformResult {
    pub props: Vec<Property>,
    pub need_runtime: bool,
}

pub type DirectiveTransform =
    Box<dyn Fn(&crate::ast::Directive, &Element, &mut TransformContext) -> DirectiveTransformResult>;

pub struct TransformContext {
    pub helpers: IndexSet<RuntimeHelper>,
    pub components: IndexSet<String>,
    pub directives: IndexSet<String>,
    pub directive_transforms: HashMap<String, DirectiveTransform>,
    pub errors: Vec<CompilerError>,
    /// Depth of the node currently being visited; 0 for root children.
    pub depth: usize,
    transforms: Rc<Vec<NodeTransform>>,
    exit_fns: Vec<ExitFn>,
}

impl TransformContext {
    fn new(
        transforms: Vec<NodeTransform>,
        directive_transforms: HashMap<String, DirectiveTransform>,
    ) -> Self {
        TransformContext {
            helpers: IndexSet::new(),
            components: IndexSet::new(),
            directives: IndexSet::new(),
            directive_transforms,
            errors: Vec::new(),
            depth: 0,
            transforms: Rc::new(transforms),
            exit_fns: Vec::new(),
        }
    }

    pub fn helper(&mut self, helper: RuntimeHelper) {
        self.helpers.insert(helper);
    }

    pub fn error(&mut self, code: ErrorCode, span: SourceSpan) {
        self.errors.push(CompilerError::new(code, span));
    }

    /// Defers work until after the current node's children were traversed.
    /// Exit actions run in reverse registration order.
    pub fn on_exit(&mut self, f: ExitFn) {
        self.exit_fns.push(f);
    }

    pub fn at_root(&self) -> bool {
        self.depth == 0
    }

    /// Runs the full pipeline over a children list the engine will not reach
    /// on its own, e.g. a branch appended to an already-visited group. The
    /// list is traversed one level below the node currently being visited.
    pub fn traverse(&mut self, children: &mut Vec<Node>) {
        let depth = self.depth;
        traverse_children(children, self, depth + 1);
        self.depth = depth;
    }
}

/// Transforms `root` in place.
///
/// With an `on_error` sink every diagnostic flows to it; without one the
/// first error-level diagnostic is returned. The tree is left in its
/// best-effort transformed state either way.
pub fn transform(root: &mut Root, mut options: TransformOptions<'_>) -> Result<(), CompilerError> {
    let mut on_error = options.on_error.take();
    let mut ctx = TransformContext::new(
        std::mem::take(&mut options.node_transforms),
        std::mem::take(&mut options.directive_transforms),
    );

    traverse_children(&mut root.children, &mut ctx, 0);

    root.codegen = Some(if root.children.len() == 1 {
        RootCodegen::SingleChild
    } else {
        RootCodegen::MultiRoot
    });

    root.helpers = std::mem::take(&mut ctx.helpers);
    root.components = std::mem::take(&mut ctx.components);
    root.directives = std::mem::take(&mut ctx.directives);
    if options.hoist_static {
        crate::cache_static::cache_static(root);
    }

    let mut first_error = None;
    for diagnostic in ctx.errors.drain(..) {
        if diagnostic.level == ErrorLevel::Warning {
            continue;
        }
        match on_error.as_mut() {
            Some(sink) => sink(diagnostic),
            None => {
                if first_error.is_none() {
                    first_error = Some(diagnostic);
                }
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub(crate) fn traverse_children(children: &mut Vec<Node>, ctx: &mut TransformContext, depth: usize) {
    let mut i = 0;
    while i < children.len() {
        let removed = {
            let (prev, rest) = children.split_at_mut(i);
            traverse_node(&mut rest[0], prev, ctx, depth)
        };
        if removed {
            children.remove(i);
        } else {
            i += 1;
        }
    }
}

fn traverse_node(
    node: &mut Node,
    prev_siblings: &mut [Node],
    ctx: &mut TransformContext,
    depth: usize,
) -> bool {
    let exit_mark = ctx.exit_fns.len();
    ctx.depth = depth;
    let transforms = Rc::clone(&ctx.transforms);
    for t in transforms.iter() {
        match t(node, prev_siblings, ctx) {
            Transition::Keep => {}
            Transition::Replace(new_node) => *node = new_node,
            Transition::Remove => {
                // Exit actions of a removed node never run.
                ctx.exit_fns.truncate(exit_mark);
                return true;
            }
        }
    }

    // These helpers are structural facts about the tree, recorded even with
    // an empty transform list.
    match node {
        Node::Interpolation(_) => ctx.helper(RuntimeHelper::ToDisplayString),
        Node::Comment(_) => ctx.helper(RuntimeHelper::CreateComment),
        _ => {}
    }

    match node {
        Node::Element(el) => {
            traverse_children(&mut el.children, ctx, depth + 1);
        }
        Node::IfBranchGroup(group) => {
            for branch in group.branches.iter_mut() {
                traverse_children(&mut branch.children, ctx, depth + 1);
            }
        }
        Node::ForLoop(for_loop) => {
            traverse_children(&mut for_loop.children, ctx, depth + 1);
        }
        _ => {}
    }

    ctx.depth = depth;
    let mut exits = ctx.exit_fns.split_off(exit_mark);
    while let Some(exit) = exits.pop() {
        exit(node, ctx);
    }
    false
}

/// Builds a node transform that fires `f` for elements carrying a directive
/// accepted by `matcher`. The matched directive is removed from the props
/// before `f` runs. Grouping templates already claimed by named-slot content
/// never match.
pub fn create_structural_directive_transform(
    matcher: impl Fn(&str) -> bool + 'static,
    f: impl Fn(&mut Element, crate::ast::Directive, &mut [Node], &mut TransformContext) -> Transition
        + 'static,
) -> NodeTransform {
    Box::new(move |node, prev_siblings, ctx| {
        let Node::Element(el) = node else {
            return Transition::Keep;
        };
        if el.kind == ElementKind::Template && el.find_directive("slot").is_some() {
            return Transition::Keep;
        }
        let matched = el.props.iter().position(|p| match p {
            crate::ast::Prop::Directive(d) => matcher(&d.name),
            crate::ast::Prop::Attribute(_) => false,
        });
        match matched {
            Some(index) => {
                let crate::ast::Prop::Directive(dir) = el.props.remove(index) else {
                    unreachable!()
                };
                f(el, dir, prev_siblings, ctx)
            }
            None => Transition::Keep,
        }
    })
}
