//! Text merging.
//!
//! On exit from a container, adjacent text and interpolation siblings merge
//! into one `CompoundExpression` joined by ` + `, so the emitter produces a
//! single text vnode per run.

use crate::ast::{CompoundChild, CompoundExpression, Node};
use crate::parse_util::SourceSpan;
use crate::transform::{NodeTransform, TransformContext, Transition};

pub fn transform_text() -> NodeTransform {
    Box::new(|node, _prev_siblings, ctx| {
        if matches!(node, Node::Element(_) | Node::IfBranchGroup(_) | Node::ForLoop(_)) {
            ctx.on_exit(Box::new(|node: &mut Node, _ctx: &mut TransformContext| match node {
                Node::Element(el) => merge_adjacent_text(&mut el.children),
                Node::IfBranchGroup(group) => {
                    for branch in group.branches.iter_mut() {
                        merge_adjacent_text(&mut branch.children);
                    }
                }
                Node::ForLoop(for_loop) => merge_adjacent_text(&mut for_loop.children),
                _ => {}
            }));
        }
        Transition::Keep
    })
}

fn is_text_like(node: &Node) -> bool {
    matches!(node, Node::Text(_) | Node::Interpolation(_))
}

pub fn merge_adjacent_text(children: &mut Vec<Node>) {
    let mut i = 0;
    while i < children.len() {
        if !is_text_like(&children[i]) {
            i += 1;
            continue;
        }
        let mut run_end = i + 1;
        while run_end < children.len() && is_text_like(&children[run_end]) {
            run_end += 1;
        }
        if run_end - i < 2 {
            i += 1;
            continue;
        }
        let run: Vec<Node> = children.drain(i..run_end).collect();
        let start = run.first().map(|n| n.span().start).unwrap_or_default();
        let end = run.last().map(|n| n.span().end).unwrap_or_default();
        let source: String = run.iter().map(|n| n.span().source.as_str()).collect();
        let mut parts = Vec::with_capacity(run.len() * 2 - 1);
        for node in run {
            if !parts.is_empty() {
                parts.push(CompoundChild::Separator(" + ".to_string()));
            }
            match node {
                Node::Text(t) => parts.push(CompoundChild::Text(t)),
                Node::Interpolation(interp) => parts.push(CompoundChild::Interpolation(interp)),
                _ => {}
            }
        }
        children.insert(
            i,
            Node::CompoundExpression(CompoundExpression {
                children: parts,
                span: SourceSpan::new(start, end, source),
            }),
        );
        i += 1;
    }
}
