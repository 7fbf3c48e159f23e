//! Hoisting, render caching and block cleanup.

#[cfg(test)]
mod cache_static_tests {
    use tempo_compiler_core::ast::{CodegenNode, ConstantType, Node, Prop};
    use tempo_compiler_core::cache_static::cache_static;
    use tempo_compiler_core::runtime_helpers::RuntimeHelper;
    use tempo_compiler_core::{
        base_transform_preset, parse, transform, ParserOptions, Root, TransformOptions,
    };

    fn compile(source: &str, hoist_static: bool) -> Root {
        let mut root = parse(source, ParserOptions::default()).unwrap();
        let (node_transforms, directive_transforms) = base_transform_preset();
        transform(
            &mut root,
            TransformOptions {
                node_transforms,
                directive_transforms,
                hoist_static,
                ..Default::default()
            },
        )
        .unwrap();
        root
    }

    fn assert_hoist_ref(node: &Node, expected: &str) {
        match node {
            Node::SimpleExpression(exp) => {
                assert_eq!(exp.content, expected);
                assert_eq!(exp.const_type, ConstantType::CanCache);
            }
            other => panic!("expected a hoist reference, got {other:?}"),
        }
    }

    mod hoisting {
        use super::*;

        #[test]
        fn should_hoist_constant_subtrees() {
            let root = compile("<div><p>static</p><p>{{ d }}</p></div>", true);
            assert_eq!(root.hoists.len(), 1);
            let hoisted = root.hoists[0].as_element().unwrap();
            assert_eq!(hoisted.tag, "p");
            let div = root.children[0].as_element().unwrap();
            assert_hoist_ref(&div.children[0], "_hoisted_1");
            assert!(div.children[1].as_element().is_some());
        }

        #[test]
        fn should_never_hoist_the_sole_root_child_whole() {
            let root = compile("<div><p>s</p></div>", true);
            let div = root.children[0].as_element().unwrap();
            assert_eq!(div.tag, "div");
            // Its own children still hoist.
            assert_eq!(root.hoists.len(), 1);
        }

        #[test]
        fn should_collapse_a_fully_hoisted_children_list() {
            let root = compile("<section><p>a</p><p>b</p></section>", true);
            assert_eq!(root.hoists.len(), 1);
            let Node::Array(arr) = &root.hoists[0] else {
                panic!("expected a hoisted array, got {:?}", root.hoists[0]);
            };
            assert_eq!(arr.elements.len(), 2);
            let section = root.children[0].as_element().unwrap();
            assert_eq!(section.children.len(), 1);
            assert_hoist_ref(&section.children[0], "_hoisted_1");
        }

        #[test]
        fn should_not_collapse_a_partially_hoisted_list() {
            let root = compile("<section><p>a</p><p>b</p><em>{{ x }}</em></section>", true);
            assert_eq!(root.hoists.len(), 2);
            assert!(root.hoists.iter().all(|h| h.as_element().is_some()));
            let section = root.children[0].as_element().unwrap();
            assert_eq!(section.children.len(), 3);
        }

        #[test]
        fn should_not_hoist_the_sole_child_of_a_branch() {
            let root = compile("<div v-if=\"a\"><p>s</p></div>", true);
            let Node::IfBranchGroup(group) = &root.children[0] else {
                panic!("expected a branch group");
            };
            let div = group.branches[0].children[0].as_element().unwrap();
            assert_eq!(div.tag, "div");
            assert_eq!(root.hoists.len(), 1);
        }

        #[test]
        fn should_hoist_a_constant_props_object_of_a_dynamic_element() {
            let root = compile("<main><p v-focus a=\"1\"></p><i>{{ x }}</i></main>", true);
            assert_eq!(root.hoists.len(), 1);
            assert!(matches!(root.hoists[0], Node::Object(_)));
            let main = root.children[0].as_element().unwrap();
            let p = main.children[0].as_element().unwrap();
            let Some(CodegenNode::VNode(call)) = p.codegen.as_ref() else {
                panic!("missing vnode codegen");
            };
            assert_hoist_ref(call.props.as_deref().unwrap(), "_hoisted_1");
        }

        #[test]
        fn should_produce_identical_output_across_runs() {
            let source = "<div><p class=\"x\">a</p><p>{{ y }}</p><i v-if=\"z\">b</i></div>";
            assert_eq!(compile(source, true), compile(source, true));
        }
    }

    mod render_caching {
        use super::*;

        fn mark_skip_patch(node: &mut Node) {
            let el = node.as_element_mut().unwrap();
            for prop in el.props.iter_mut() {
                if let Prop::Directive(dir) = prop {
                    if let Some(exp) = dir.exp.as_mut() {
                        exp.const_type = ConstantType::CanSkipPatch;
                    }
                }
            }
        }

        #[test]
        fn should_wrap_skip_patchable_children_in_cache_slots() {
            let mut root = compile("<div><p :x=\"n\"></p><i>{{ y }}</i></div>", false);
            let div = root.children[0].as_element_mut().unwrap();
            mark_skip_patch(&mut div.children[0]);
            cache_static(&mut root);

            assert_eq!(root.cached, 1);
            let div = root.children[0].as_element().unwrap();
            let Node::Cache(cache) = &div.children[0] else {
                panic!("expected a cache slot, got {:?}", div.children[0]);
            };
            assert_eq!(cache.index, 0);
            assert_eq!(cache.value.as_element().unwrap().tag, "p");
        }

        #[test]
        fn should_hand_out_dense_cache_indices() {
            let mut root =
                compile("<div><p :x=\"a\"></p><q :y=\"b\"></q><i>{{ z }}</i></div>", false);
            let div = root.children[0].as_element_mut().unwrap();
            mark_skip_patch(&mut div.children[0]);
            mark_skip_patch(&mut div.children[1]);
            cache_static(&mut root);

            assert_eq!(root.cached, 2);
            let div = root.children[0].as_element().unwrap();
            let indices: Vec<usize> = div.children[..2]
                .iter()
                .map(|child| match child {
                    Node::Cache(cache) => cache.index,
                    other => panic!("expected a cache slot, got {other:?}"),
                })
                .collect();
            assert_eq!(indices, vec![0, 1]);
        }
    }

    mod block_cleanup {
        use super::*;

        #[test]
        fn should_clear_block_flags_on_constant_roots() {
            let root = compile("<div><p>a</p></div>", true);
            let div = root.children[0].as_element().unwrap();
            assert!(!div.is_block);
            assert!(!root.helpers.contains(&RuntimeHelper::OpenBlock));
        }

        #[test]
        fn should_keep_the_block_helper_while_any_block_remains() {
            let root = compile("<div><p>a</p></div><em>{{ x }}</em>", true);
            assert!(root.helpers.contains(&RuntimeHelper::OpenBlock));
        }

        #[test]
        fn should_keep_namespace_boundary_elements_as_blocks() {
            let root = compile("<svg><rect></rect></svg>", true);
            let svg = root.children[0].as_element().unwrap();
            assert!(svg.is_block);
            assert!(root.helpers.contains(&RuntimeHelper::OpenBlock));
        }
    }
}
