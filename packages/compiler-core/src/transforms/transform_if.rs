//! Conditional lowering.
//!
//! `if` starts a new branch group in place of the element; `else-if` and
//! `else` fold backward into the nearest group among the preceding siblings,
//! skipping comments. A grouping template contributes its children to the
//! branch; any other element becomes the branch's sole child.

use crate::ast::{Directive, Element, ElementKind, IfBranch, IfBranchGroup, Node, SimpleExpression};
use crate::errors::ErrorCode;
use crate::parse_util::SourceSpan;
use crate::transform::{
    create_structural_directive_transform, NodeTransform, TransformContext, Transition,
};

pub fn transform_if() -> NodeTransform {
    create_structural_directive_transform(
        |name| matches!(name, "if" | "else-if" | "else"),
        process_if,
    )
}

fn process_if(
    el: &mut Element,
    dir: Directive,
    prev_siblings: &mut [Node],
    ctx: &mut TransformContext,
) -> Transition {
    let condition = if dir.name == "else" {
        None
    } else {
        match dir.exp.as_ref().filter(|exp| !exp.content.trim().is_empty()) {
            Some(exp) => Some(exp.clone()),
            None => {
                ctx.error(ErrorCode::IfNoExpression, dir.span.clone());
                Some(SimpleExpression::new("true", false, SourceSpan::stub()))
            }
        }
    };
    let mut branch = make_branch(el, condition);

    if dir.name == "if" {
        let span = branch.span.clone();
        return Transition::Replace(Node::IfBranchGroup(IfBranchGroup {
            branches: vec![branch],
            span,
        }));
    }

    for sibling in prev_siblings.iter_mut().rev() {
        match sibling {
            Node::Comment(_) => continue,
            Node::IfBranchGroup(group) => {
                if group.branches.last().is_some_and(|b| b.condition.is_none()) {
                    // The chain already ended in an unconditioned branch.
                    ctx.error(ErrorCode::ElseNoAdjacentIf, dir.span);
                    return Transition::Keep;
                }
                // The group was already visited; its new branch is traversed
                // here or not at all.
                ctx.traverse(&mut branch.children);
                group.branches.push(branch);
                return Transition::Remove;
            }
            _ => break,
        }
    }
    ctx.error(ErrorCode::ElseNoAdjacentIf, dir.span);
    Transition::Keep
}

fn make_branch(el: &mut Element, condition: Option<SimpleExpression>) -> IfBranch {
    let span = el.span.clone();
    let children = if el.kind == ElementKind::Template {
        std::mem::take(&mut el.children)
    } else {
        vec![Node::Element(el.clone())]
    };
    IfBranch { condition, children, span }
}
