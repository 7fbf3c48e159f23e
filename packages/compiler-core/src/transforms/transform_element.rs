//! VNode call construction.
//!
//! Runs on exit so child transforms have already settled. Resolves
//! components, builds the props IR from attributes and directives, computes
//! the patch flag, and fills the element's codegen slot.

use crate::ast::{
    CodegenNode, Directive, Element, ElementKind, Node, ObjectExpression, PatchFlags, Prop,
    Property, SimpleExpression, VNodeCall,
};
use crate::parse_util::SourceSpan;
use crate::runtime_helpers::RuntimeHelper;
use crate::transform::{NodeTransform, TransformContext, Transition};

pub fn transform_element() -> NodeTransform {
    Box::new(|node, _prev_siblings, ctx| {
        if let Node::Element(el) = node {
            if matches!(el.kind, ElementKind::Plain | ElementKind::Component) {
                ctx.on_exit(Box::new(build_vnode_call));
            }
        }
        Transition::Keep
    })
}

fn build_vnode_call(node: &mut Node, ctx: &mut TransformContext) {
    let Node::Element(el) = node else { return };
    let is_component = el.kind == ElementKind::Component;
    if is_component {
        ctx.helper(RuntimeHelper::ResolveComponent);
        ctx.components.insert(el.tag.clone());
    }

    let mut properties = Vec::new();
    let mut patch_flag = PatchFlags::empty();
    let mut dynamic_props = Vec::new();
    let mut runtime_directives = Vec::new();

    for prop in el.props.clone() {
        match prop {
            Prop::Attribute(attr) => {
                let value = attr
                    .value
                    .as_ref()
                    .map(|v| v.content.clone())
                    .unwrap_or_default();
                let value_span =
                    attr.value.as_ref().map(|v| v.span.clone()).unwrap_or_else(SourceSpan::stub);
                properties.push(Property {
                    key: SimpleExpression::new(attr.name.clone(), true, attr.name_span.clone()),
                    value: Box::new(Node::SimpleExpression(SimpleExpression::new(
                        value, true, value_span,
                    ))),
                });
            }
            Prop::Directive(dir) => build_directive_prop(
                &dir,
                el,
                ctx,
                &mut properties,
                &mut patch_flag,
                &mut dynamic_props,
                &mut runtime_directives,
            ),
        }
    }

    if has_dynamic_text_child(el) {
        patch_flag |= PatchFlags::TEXT;
    }

    let is_block = ctx.at_root();
    if is_block {
        ctx.helper(RuntimeHelper::OpenBlock);
        ctx.helper(if is_component {
            RuntimeHelper::CreateBlock
        } else {
            RuntimeHelper::CreateElementBlock
        });
    } else {
        ctx.helper(if is_component {
            RuntimeHelper::CreateVNode
        } else {
            RuntimeHelper::CreateElementVNode
        });
    }
    if !runtime_directives.is_empty() {
        ctx.helper(RuntimeHelper::WithDirectives);
    }

    el.is_block = is_block;
    let props = if properties.is_empty() {
        None
    } else {
        Some(Box::new(Node::Object(ObjectExpression {
            properties,
            span: SourceSpan::stub(),
        })))
    };
    el.codegen = Some(CodegenNode::VNode(VNodeCall {
        tag: el.tag.clone(),
        is_component,
        props,
        children: el.children.clone(),
        patch_flag,
        dynamic_props,
        directives: runtime_directives,
        is_block,
        disable_tracking: false,
    }));
}

fn build_directive_prop(
    dir: &Directive,
    el: &Element,
    ctx: &mut TransformContext,
    properties: &mut Vec<Property>,
    patch_flag: &mut PatchFlags,
    dynamic_props: &mut Vec<String>,
    runtime_directives: &mut Vec<String>,
) {
    match dir.name.as_str() {
        // Consumed elsewhere or meaningless on a vnode call.
        "pre" | "slot" | "else" | "else-if" | "if" | "for" => {}
        "bind" => match (&dir.arg, &dir.exp) {
            (Some(arg), Some(exp)) if arg.is_static => {
                match arg.content.as_str() {
                    "class" => *patch_flag |= PatchFlags::CLASS,
                    "style" => *patch_flag |= PatchFlags::STYLE,
                    name => {
                        *patch_flag |= PatchFlags::PROPS;
                        dynamic_props.push(name.to_string());
                    }
                }
                properties.push(Property {
                    key: arg.clone(),
                    value: Box::new(Node::SimpleExpression(exp.clone())),
                });
            }
            // Dynamic argument or spread object: key set unknown up front.
            _ => *patch_flag |= PatchFlags::FULL_PROPS,
        },
        "on" => match (&dir.arg, &dir.exp) {
            (Some(arg), Some(exp)) if arg.is_static => {
                let key = format!("on{}", capitalize(&arg.content));
                *patch_flag |= PatchFlags::PROPS;
                dynamic_props.push(key.clone());
                properties.push(Property {
                    key: SimpleExpression::new(key, true, arg.span.clone()),
                    value: Box::new(Node::SimpleExpression(exp.clone())),
                });
            }
            _ => *patch_flag |= PatchFlags::FULL_PROPS,
        },
        name => {
            // Caller-supplied transform first, runtime resolution otherwise.
            if let Some(dt) = ctx.directive_transforms.remove(name) {
                let result = dt(dir, el, ctx);
                ctx.directive_transforms.insert(name.to_string(), dt);
                properties.extend(result.props);
                if !result.need_runtime {
                    return;
                }
            }
            ctx.helper(RuntimeHelper::ResolveDirective);
            ctx.directives.insert(name.to_string());
            runtime_directives.push(name.to_string());
            *patch_flag |= PatchFlags::NEED_PATCH;
        }
    }
}

fn has_dynamic_text_child(el: &Element) -> bool {
    el.children.len() == 1
        && matches!(
            el.children[0],
            Node::Interpolation(_) | Node::CompoundExpression(_)
        )
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
