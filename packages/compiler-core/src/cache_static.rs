//! Static subtree optimization.
//!
//! Classifies every subtree on the constancy lattice, hoists whole constant
//! subtrees into `Root::hoists`, collapses fully-hoisted children lists into
//! a single hoisted array, wraps skip-patchable children in render-cache
//! slots, and strips block markers from constant block elements.

use crate::ast::{
    ArrayExpression, CacheExpression, CodegenNode, ConstantType, Element, ElementKind, Node,
    NodeId, Prop, Root, SimpleExpression,
};
use crate::parse_util::SourceSpan;
use crate::runtime_helpers::RuntimeHelper;
use std::collections::HashMap;

pub fn cache_static(root: &mut Root) {
    let mut cache: HashMap<NodeId, ConstantType> = HashMap::new();
    let mut children = std::mem::take(&mut root.children);
    // A sole root child is the root block itself and never hoists whole.
    walk(&mut children, root, &mut cache, true);
    root.children = children;

    if !any_block(&root.children) {
        root.helpers.shift_remove(&RuntimeHelper::OpenBlock);
    }
}

/// Processes one children list. Returns how many slots were hoisted out of
/// it, which the caller uses to detect a fully-hoisted list.
fn walk(
    children: &mut Vec<Node>,
    root: &mut Root,
    cache: &mut HashMap<NodeId, ConstantType>,
    exempt_single_child: bool,
) -> usize {
    let mut hoisted = 0;
    let exempt = exempt_single_child && children.len() == 1;
    for i in 0..children.len() {
        let ct = const_type(&children[i], cache);
        if let Node::Element(el) = &mut children[i] {
            if ct >= ConstantType::CanCache {
                clear_block(el);
                if !exempt {
                    let reference = hoist_ref(root.hoists.len());
                    let node = std::mem::replace(&mut children[i], reference);
                    root.hoists.push(node);
                    hoisted += 1;
                    continue;
                }
            } else if ct == ConstantType::CanSkipPatch {
                root.cached += 1;
                let index = root.cached - 1;
                let span = el.span.clone();
                let placeholder = Node::SimpleExpression(SimpleExpression::new(
                    "",
                    true,
                    SourceSpan::stub(),
                ));
                let node = std::mem::replace(&mut children[i], placeholder);
                children[i] = Node::Cache(CacheExpression { index, value: Box::new(node), span });
                continue;
            }
        }

        match &mut children[i] {
            Node::Element(el) => {
                if ct == ConstantType::NotConstant {
                    try_hoist_props(el, root, cache);
                }
                let inner_hoisted = walk(&mut el.children, root, cache, false);
                if !el.children.is_empty() && inner_hoisted == el.children.len() {
                    collapse_hoisted_children(el, root);
                }
            }
            Node::IfBranchGroup(group) => {
                for branch in group.branches.iter_mut() {
                    walk(&mut branch.children, root, cache, true);
                }
            }
            Node::ForLoop(for_loop) => {
                walk(&mut for_loop.children, root, cache, true);
            }
            _ => {}
        }
    }
    hoisted
}

/// A dynamic element can still have a fully-constant props object; hoist
/// just that.
fn try_hoist_props(el: &mut Element, root: &mut Root, cache: &mut HashMap<NodeId, ConstantType>) {
    let Some(CodegenNode::VNode(call)) = el.codegen.as_mut() else { return };
    let Some(props) = call.props.as_ref() else { return };
    if const_type(props, cache) >= ConstantType::CanCache {
        let reference = hoist_ref(root.hoists.len());
        let props = call.props.take().map(|b| *b);
        if let Some(props) = props {
            root.hoists.push(props);
            call.props = Some(Box::new(reference));
        }
    }
}

/// The just-hoisted children of `el` were appended to `root.hoists` back to
/// back; fold them into one hoisted array and point the element at it.
fn collapse_hoisted_children(el: &mut Element, root: &mut Root) {
    let count = el.children.len();
    let first = root.hoists.len() - count;
    let elements: Vec<Node> = root.hoists.drain(first..).collect();
    root.hoists.push(Node::Array(ArrayExpression { elements, span: SourceSpan::stub() }));
    el.children = vec![hoist_ref(root.hoists.len() - 1)];
}

fn hoist_ref(index: usize) -> Node {
    let mut exp =
        SimpleExpression::new(format!("_hoisted_{}", index + 1), false, SourceSpan::stub());
    exp.const_type = ConstantType::CanCache;
    Node::SimpleExpression(exp)
}

fn clear_block(el: &mut Element) {
    if matches!(el.tag.as_str(), "svg" | "math" | "foreignObject") {
        return;
    }
    el.is_block = false;
    if let Some(CodegenNode::VNode(call)) = el.codegen.as_mut() {
        call.is_block = false;
    }
}

fn any_block(children: &[Node]) -> bool {
    children.iter().any(|node| match node {
        Node::Element(el) => el.is_block || any_block(&el.children),
        Node::IfBranchGroup(group) => {
            group.branches.iter().any(|b| any_block(&b.children))
        }
        Node::ForLoop(for_loop) => any_block(&for_loop.children),
        _ => false,
    })
}

/// Classification on the constancy lattice, memoized per element.
pub fn const_type(node: &Node, cache: &mut HashMap<NodeId, ConstantType>) -> ConstantType {
    match node {
        Node::Text(_) | Node::Comment(_) => ConstantType::CanStringify,
        Node::Interpolation(interp) => interp.content.const_type,
        Node::SimpleExpression(exp) => exp.const_type,
        Node::CompoundExpression(_) => ConstantType::NotConstant,
        Node::Element(el) => {
            if let Some(&cached) = cache.get(&el.id) {
                return cached;
            }
            let ct = element_const_type(el, cache);
            cache.insert(el.id, ct);
            ct
        }
        Node::Object(obj) => obj.properties.iter().fold(ConstantType::CanStringify, |ct, p| {
            let key = if p.key.is_static {
                ConstantType::CanStringify
            } else {
                ConstantType::NotConstant
            };
            ct.min(key).min(const_type(&p.value, cache))
        }),
        Node::Array(arr) => arr
            .elements
            .iter()
            .fold(ConstantType::CanStringify, |ct, e| ct.min(const_type(e, cache))),
        Node::IfBranchGroup(_) | Node::ForLoop(_) | Node::Cache(_) => ConstantType::NotConstant,
    }
}

fn element_const_type(el: &Element, cache: &mut HashMap<NodeId, ConstantType>) -> ConstantType {
    if el.kind != ElementKind::Plain {
        return ConstantType::NotConstant;
    }
    let mut ct = ConstantType::CanStringify;
    for prop in el.props.iter() {
        match prop {
            Prop::Attribute(_) => {}
            Prop::Directive(dir) => match dir.name.as_str() {
                "pre" => {}
                "bind" => {
                    let arg_ct = match &dir.arg {
                        Some(arg) if arg.is_static => ConstantType::CanStringify,
                        _ => ConstantType::NotConstant,
                    };
                    let exp_ct = dir
                        .exp
                        .as_ref()
                        .map(|exp| exp.const_type)
                        .unwrap_or(ConstantType::NotConstant);
                    ct = ct.min(arg_ct).min(exp_ct);
                }
                _ => return ConstantType::NotConstant,
            },
        }
        if ct == ConstantType::NotConstant {
            return ct;
        }
    }
    for child in el.children.iter() {
        ct = ct.min(const_type(child, cache));
        if ct == ConstantType::NotConstant {
            return ct;
        }
    }
    ct
}
