// Property-based tests for the lexer.
//
// 1. Safety: arbitrary text lexes or fails with a syntax error, never panics
// 2. Determinism: the same input gives the same tokens
// 3. Span consistency: spans are in bounds and ordered

use phptobpc::lexer::lex;
use proptest::prelude::*;

#[test]
fn prop_lexer_never_panics() {
    proptest!(|(source in "\\PC{0,500}")| {
        let _ = lex(&source);
    });
}

#[test]
fn prop_lexer_never_panics_inside_php() {
    proptest!(|(body in "\\PC{0,500}")| {
        let _ = lex(&format!("<?php {body}"));
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn lexing_is_deterministic(body in "[ -~\\n]{0,200}") {
        let source = format!("<?php {body}");
        let first = lex(&source);
        let second = lex(&source);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "lexing the same input gave different outcomes"),
        }
    }

    #[test]
    fn spans_are_in_bounds_and_ordered(body in "[a-z0-9$ ;=+*(){}'\\[\\],.\\n-]{0,200}") {
        let source = format!("<?php {body}");
        if let Ok(tokens) = lex(&source) {
            let mut last_end = 0;
            for tok in &tokens {
                prop_assert!(tok.span.start <= tok.span.end);
                prop_assert!(tok.span.end <= source.len());
                prop_assert!(tok.span.start >= last_end);
                last_end = tok.span.end;
            }
        }
    }

    #[test]
    fn html_without_open_tag_is_one_token(text in "[a-zA-Z <>/\\n]{1,100}") {
        prop_assume!(!text.to_ascii_lowercase().contains("<?php"));
        let tokens = lex(&text).unwrap();
        prop_assert_eq!(tokens.len(), 1);
    }
}
