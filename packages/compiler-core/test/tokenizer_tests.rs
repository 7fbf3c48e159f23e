//! Tokenizer event-stream tests.
//!
//! Drives the state machine with a recording sink and asserts on humanized
//! event lists, positions included where they matter.

#[cfg(test)]
mod tokenizer_tests {
    use tempo_compiler_core::errors::ErrorCode;
    use tempo_compiler_core::tokenizer::{tokenize, TokenizerOptions};
    use tempo_compiler_core::tokens::{QuoteKind, TokenizerCallbacks};

    struct Recorder {
        source: String,
        events: Vec<String>,
        v_pre: bool,
    }

    impl Recorder {
        fn new(source: &str) -> Self {
            Recorder { source: source.to_string(), events: Vec::new(), v_pre: false }
        }

        fn slice(&self, start: usize, end: usize) -> &str {
            &self.source[start..end]
        }
    }

    impl TokenizerCallbacks for Recorder {
        fn on_text(&mut self, start: usize, end: usize) {
            self.events.push(format!("text '{}'", self.slice(start, end)));
        }
        fn on_text_entity(&mut self, text: &str, _start: usize, _end: usize) {
            self.events.push(format!("entity '{text}'"));
        }
        fn on_interpolation(&mut self, start: usize, end: usize) {
            self.events.push(format!("interp '{}' @{start}", self.slice(start, end)));
        }
        fn on_open_tag_name(&mut self, start: usize, end: usize) {
            self.events.push(format!("open <{}>", self.slice(start, end)));
        }
        fn on_open_tag_end(&mut self, end: usize) {
            self.events.push(format!("open-end @{end}"));
        }
        fn on_self_closing_tag(&mut self, end: usize) {
            self.events.push(format!("self-close @{end}"));
        }
        fn on_close_tag(&mut self, start: usize, end: usize) {
            self.events.push(format!("close </{}>", self.slice(start, end)));
        }
        fn on_attrib_name(&mut self, start: usize, end: usize) {
            self.events.push(format!("attr '{}'", self.slice(start, end)));
        }
        fn on_attrib_data(&mut self, start: usize, end: usize) {
            self.events.push(format!("data '{}'", self.slice(start, end)));
        }
        fn on_attrib_entity(&mut self, text: &str, _start: usize, _end: usize) {
            self.events.push(format!("data-entity '{text}'"));
        }
        fn on_attrib_end(&mut self, quote: QuoteKind, _end: usize) {
            self.events.push(format!("attr-end {quote:?}"));
        }
        fn on_dir_name(&mut self, start: usize, end: usize) {
            self.events.push(format!("dir '{}'", self.slice(start, end)));
        }
        fn on_dir_arg(&mut self, start: usize, end: usize) {
            self.events.push(format!("arg '{}'", self.slice(start, end)));
        }
        fn on_dir_modifier(&mut self, start: usize, end: usize) {
            self.events.push(format!("mod '{}'", self.slice(start, end)));
        }
        fn on_comment(&mut self, start: usize, end: usize) {
            self.events.push(format!("comment '{}'", self.slice(start, end)));
        }
        fn on_cdata(&mut self, start: usize, end: usize) {
            self.events.push(format!("cdata '{}'", self.slice(start, end)));
        }
        fn on_processing_instruction(&mut self, start: usize, end: usize) {
            self.events.push(format!("pi '{}'", self.slice(start, end)));
        }
        fn on_end(&mut self, _end: usize) {
            self.events.push("end".to_string());
        }
        fn on_err(&mut self, code: ErrorCode, offset: usize) {
            self.events.push(format!("err {code:?} @{offset}"));
        }
        fn in_v_pre(&self) -> bool {
            self.v_pre
        }
    }

    fn events(source: &str) -> Vec<String> {
        events_with(source, TokenizerOptions::default())
    }

    fn events_with(source: &str, options: TokenizerOptions) -> Vec<String> {
        let mut recorder = Recorder::new(source);
        tokenize(source, &options, &mut recorder);
        recorder.events
    }

    mod tags {
        use super::*;

        #[test]
        fn should_emit_tag_and_text_events() {
            assert_eq!(
                events("<t>a</t>"),
                vec!["open <t>", "open-end @2", "text 'a'", "close </t>", "end"]
            );
        }

        #[test]
        fn should_emit_self_closing_tag() {
            assert_eq!(events("<br/>"), vec!["open <br>", "self-close @4", "end"]);
        }

        #[test]
        fn should_recover_from_lone_lt_as_text() {
            assert_eq!(
                events("a < b"),
                vec![
                    "text 'a '",
                    "err InvalidFirstCharacterOfTagName @3",
                    "text '< b'",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_eof_in_tag() {
            assert_eq!(events("<div"), vec!["err EofInTag @4", "end"]);
        }

        #[test]
        fn should_report_end_tag_junk_once() {
            assert_eq!(
                events("<t>x</t a b>"),
                vec![
                    "open <t>",
                    "open-end @2",
                    "text 'x'",
                    "close </t>",
                    "err EndTagWithAttributes @8",
                    "end"
                ]
            );
        }
    }

    mod attributes {
        use super::*;

        #[test]
        fn should_emit_quoted_attribute() {
            assert_eq!(
                events("<t a=\"b\">"),
                vec![
                    "open <t>",
                    "attr 'a'",
                    "data 'b'",
                    "attr-end Double",
                    "open-end @8",
                    "end"
                ]
            );
        }

        #[test]
        fn should_emit_unquoted_and_valueless_attributes() {
            assert_eq!(
                events("<t a=b c>"),
                vec![
                    "open <t>",
                    "attr 'a'",
                    "data 'b'",
                    "attr-end Unquoted",
                    "attr 'c'",
                    "attr-end None",
                    "open-end @8",
                    "end"
                ]
            );
        }

        #[test]
        fn should_decode_entities_in_attribute_values() {
            assert_eq!(
                events("<t a=\"x&amp;y\">"),
                vec![
                    "open <t>",
                    "attr 'a'",
                    "data 'x'",
                    "data-entity '&'",
                    "data 'y'",
                    "attr-end Double",
                    "open-end @14",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_missing_whitespace_between_attributes() {
            assert_eq!(
                events("<t a=\"b\"c=\"d\">"),
                vec![
                    "open <t>",
                    "attr 'a'",
                    "data 'b'",
                    "attr-end Double",
                    "err MissingWhitespaceBetweenAttributes @8",
                    "attr 'c'",
                    "data 'd'",
                    "attr-end Double",
                    "open-end @13",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_missing_attribute_value() {
            assert_eq!(
                events("<t a=>"),
                vec![
                    "open <t>",
                    "attr 'a'",
                    "err MissingAttributeValue @5",
                    "attr-end None",
                    "open-end @5",
                    "end"
                ]
            );
        }
    }

    mod directives {
        use super::*;

        #[test]
        fn should_emit_full_directive_with_arg_and_modifier() {
            assert_eq!(
                events("<t v-bind:x.trim=\"c\">"),
                vec![
                    "open <t>",
                    "dir 'v-bind'",
                    "arg 'x'",
                    "mod 'trim'",
                    "data 'c'",
                    "attr-end Double",
                    "open-end @20",
                    "end"
                ]
            );
        }

        #[test]
        fn should_emit_shorthand_markers() {
            assert_eq!(
                events("<t :a=\"x\" @b=\"y\" #c>"),
                vec![
                    "open <t>",
                    "dir ':'",
                    "arg 'a'",
                    "data 'x'",
                    "attr-end Double",
                    "dir '@'",
                    "arg 'b'",
                    "data 'y'",
                    "attr-end Double",
                    "dir '#'",
                    "arg 'c'",
                    "attr-end None",
                    "open-end @19",
                    "end"
                ]
            );
        }

        #[test]
        fn should_keep_brackets_of_dynamic_argument() {
            assert_eq!(
                events("<t :[key]=\"v\">"),
                vec![
                    "open <t>",
                    "dir ':'",
                    "arg '[key]'",
                    "data 'v'",
                    "attr-end Double",
                    "open-end @13",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_unterminated_dynamic_argument() {
            assert_eq!(
                events("<t :[key=\"v\">"),
                vec![
                    "open <t>",
                    "dir ':'",
                    "err MissingDynamicDirectiveArgumentEnd @8",
                    "arg '[key'",
                    "data 'v'",
                    "attr-end Double",
                    "open-end @12",
                    "end"
                ]
            );
        }

        #[test]
        fn should_not_tokenize_directives_in_v_pre() {
            let mut recorder = Recorder::new("<t :a=\"x\">");
            recorder.v_pre = true;
            tokenize("<t :a=\"x\">", &TokenizerOptions::default(), &mut recorder);
            assert_eq!(
                recorder.events,
                vec![
                    "open <t>",
                    "attr ':a'",
                    "data 'x'",
                    "attr-end Double",
                    "open-end @9",
                    "end"
                ]
            );
        }
    }

    mod interpolation {
        use super::*;

        #[test]
        fn should_emit_interpolation_with_delimiters_in_span() {
            assert_eq!(
                events("a {{ msg }} b"),
                vec!["text 'a '", "interp '{{ msg }}' @2", "text ' b'", "end"]
            );
        }

        #[test]
        fn should_support_custom_delimiters() {
            let options = TokenizerOptions {
                delimiters: ("[[".to_string(), "]]".to_string()),
            };
            assert_eq!(
                events_with("x [[ y ]]", options),
                vec!["text 'x '", "interp '[[ y ]]' @2", "end"]
            );
        }

        #[test]
        fn should_treat_single_open_brace_as_text() {
            assert_eq!(events("a { b"), vec!["text 'a { b'", "end"]);
        }

        #[test]
        fn should_report_unterminated_interpolation() {
            assert_eq!(
                events("{{ a"),
                vec!["err MissingInterpolationEnd @4", "text '{{ a'", "end"]
            );
        }
    }

    mod entities {
        use super::*;

        #[test]
        fn should_decode_named_reference_in_text() {
            assert_eq!(
                events("a&amp;b"),
                vec!["text 'a'", "entity '&'", "text 'b'", "end"]
            );
        }

        #[test]
        fn should_keep_unknown_reference_literal_with_error() {
            assert_eq!(
                events("&nosuch;"),
                vec![
                    "err UnknownNamedCharacterReference @0",
                    "text '&nosuch;'",
                    "end"
                ]
            );
        }

        #[test]
        fn should_warn_on_legacy_reference_without_semicolon() {
            assert_eq!(
                events("&amp x"),
                vec![
                    "err MissingSemicolonAfterCharacterReference @0",
                    "entity '&'",
                    "text ' x'",
                    "end"
                ]
            );
        }
    }

    mod comments {
        use super::*;

        #[test]
        fn should_emit_comment_content() {
            assert_eq!(events("<!-- hi -->"), vec!["comment ' hi '", "end"]);
        }

        #[test]
        fn should_report_abrupt_empty_comment() {
            assert_eq!(
                events("<!-->x"),
                vec![
                    "err AbruptClosingOfEmptyComment @4",
                    "comment ''",
                    "text 'x'",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_incorrectly_closed_comment() {
            assert_eq!(
                events("<!--a--!>b"),
                vec![
                    "err IncorrectlyClosedComment @8",
                    "comment 'a'",
                    "text 'b'",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_nested_comment_opener() {
            assert_eq!(
                events("<!--a<!--b-->"),
                vec!["err NestedComment @5", "comment 'a<!--b'", "end"]
            );
        }

        #[test]
        fn should_recover_declaration_as_bogus_comment() {
            assert_eq!(
                events("<!doctype html>x"),
                vec![
                    "err IncorrectlyOpenedComment @2",
                    "comment 'doctype html'",
                    "text 'x'",
                    "end"
                ]
            );
        }

        #[test]
        fn should_recover_processing_instruction_as_bogus_comment() {
            assert_eq!(
                events("<?xml?>x"),
                vec![
                    "err UnexpectedQuestionMarkInsteadOfTagName @1",
                    "pi '?xml?'",
                    "text 'x'",
                    "end"
                ]
            );
        }

        #[test]
        fn should_report_eof_in_comment() {
            assert_eq!(
                events("<!--a"),
                vec!["err EofInComment @5", "comment 'a'", "end"]
            );
        }

        #[test]
        fn should_emit_cdata_section() {
            assert_eq!(
                events("<![CDATA[x < y]]>"),
                vec!["cdata 'x < y'", "end"]
            );
        }
    }

    mod raw_text {
        use super::*;

        #[test]
        fn should_not_parse_markup_inside_script() {
            assert_eq!(
                events("<script>let a = \"<div>\";</script>"),
                vec![
                    "open <script>",
                    "open-end @7",
                    "text 'let a = \"<div>\";'",
                    "close </script>",
                    "end"
                ]
            );
        }

        #[test]
        fn should_match_closing_tag_case_insensitively() {
            assert_eq!(
                events("<script>a</SCRIPT>"),
                vec![
                    "open <script>",
                    "open-end @7",
                    "text 'a'",
                    "close </SCRIPT>",
                    "end"
                ]
            );
        }

        #[test]
        fn should_decode_entities_and_interpolation_in_textarea() {
            assert_eq!(
                events("<textarea>&amp;{{ a }}</textarea>"),
                vec![
                    "open <textarea>",
                    "open-end @9",
                    "entity '&'",
                    "interp '{{ a }}' @15",
                    "close </textarea>",
                    "end"
                ]
            );
        }

        #[test]
        fn should_not_enter_raw_text_after_self_closing_script() {
            assert_eq!(
                events("<script/>a"),
                vec!["open <script>", "self-close @8", "text 'a'", "end"]
            );
        }
    }

    mod null_characters {
        use super::*;

        #[test]
        fn should_report_null_character_in_text() {
            assert_eq!(
                events("a\0b"),
                vec!["err UnexpectedNullCharacter @1", "text 'a\0b'", "end"]
            );
        }
    }
}
