//! Runtime helper registry.
//!
//! Transforms record which runtime functions the generated code will need;
//! the emitter maps each helper to its import. Names are stable and public.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuntimeHelper {
    Fragment,
    OpenBlock,
    CreateBlock,
    CreateElementBlock,
    CreateVNode,
    CreateElementVNode,
    CreateComment,
    CreateText,
    CreateStatic,
    ResolveComponent,
    ResolveDirective,
    WithDirectives,
    RenderList,
    ToDisplayString,
    NormalizeClass,
    NormalizeStyle,
    NormalizeProps,
}

impl RuntimeHelper {
    pub fn name(self) -> &'static str {
        use RuntimeHelper::*;
        match self {
            Fragment => "Fragment",
            OpenBlock => "openBlock",
            CreateBlock => "createBlock",
            CreateElementBlock => "createElementBlock",
            CreateVNode => "createVNode",
            CreateElementVNode => "createElementVNode",
            CreateComment => "createCommentVNode",
            CreateText => "createTextVNode",
            CreateStatic => "createStaticVNode",
            ResolveComponent => "resolveComponent",
            ResolveDirective => "resolveDirective",
            WithDirectives => "withDirectives",
            RenderList => "renderList",
            ToDisplayString => "toDisplayString",
            NormalizeClass => "normalizeClass",
            NormalizeStyle => "normalizeStyle",
            NormalizeProps => "normalizeProps",
        }
    }
}
