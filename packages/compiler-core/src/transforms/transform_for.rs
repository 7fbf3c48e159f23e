//! Loop lowering.
//!
//! Requires a decomposable alias expression; the parser caches the
//! decomposition on the directive, so by the time this runs a missing result
//! means the expression did not match the `value (in|of) source` shape.

use crate::ast::{ElementKind, ForLoop, Node};
use crate::errors::ErrorCode;
use crate::parser::parse_for_expression;
use crate::runtime_helpers::RuntimeHelper;
use crate::transform::{create_structural_directive_transform, NodeTransform, Transition};

pub fn transform_for() -> NodeTransform {
    create_structural_directive_transform(
        |name| name == "for",
        |el, dir, _prev_siblings, ctx| {
            let Some(exp) = dir.exp.as_ref().filter(|e| !e.content.trim().is_empty()) else {
                ctx.error(ErrorCode::ForNoExpression, dir.span.clone());
                return Transition::Keep;
            };
            let parse_result = match dir.for_parse_result.clone().or_else(|| parse_for_expression(exp))
            {
                Some(result) => result,
                None => {
                    ctx.error(ErrorCode::ForMalformedExpression, exp.span.clone());
                    return Transition::Keep;
                }
            };
            ctx.helper(RuntimeHelper::RenderList);
            let span = el.span.clone();
            let children = if el.kind == ElementKind::Template {
                std::mem::take(&mut el.children)
            } else {
                vec![Node::Element(el.clone())]
            };
            Transition::Replace(Node::ForLoop(ForLoop { parse_result, children, span }))
        },
    )
}
