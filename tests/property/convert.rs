// Property-based tests for whole-file conversion.
//
// 1. Determinism: converting the same source twice gives the same text
// 2. Idempotence: converted output is a fixed point of conversion
// 3. Flattening: namespaced declarations and their calls become one token

use phptobpc::convert;
use phptobpc::lexer::is_keyword;
use proptest::prelude::*;

fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,6}".prop_filter("keywords are not names", |s| !is_keyword(s))
}

fn arb_namespace() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_segment(), 1..4)
}

/// One statement of an already flat program.
fn arb_flat_stmt() -> impl Strategy<Value = String> {
    (0..6usize, 0..100i64, "[a-z]{1,5}").prop_map(|(kind, n, word)| match kind {
        0 => format!("function fn_{word}($a) {{ return $a + {n}; }}"),
        1 => format!("$v_{word} = array({n}, '{word}');"),
        2 => format!("echo $v_{word} . '{word}', {n};"),
        3 => format!("if ($v_{word} > {n}) {{ echo {n}; }} else {{ echo -{n}; }}"),
        4 => format!("class K_{word} {{ const N = {n}; public function get() {{ return self::N; }} }}"),
        _ => format!("$r = isset($v_{word}) ? $v_{word} : {n};"),
    })
}

fn arb_flat_program() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_flat_stmt(), 0..12).prop_map(|stmts| format!("<?php\n{}\n", stmts.join("\n")))
}

/// Namespaced source using the constructs the rewrite removes.
fn arb_namespaced_program() -> impl Strategy<Value = (Vec<String>, String)> {
    (arb_namespace(), "[a-z]{1,6}", 0..100i64).prop_map(|(ns, func, n)| {
        let source = format!(
            "<?php\nnamespace {ns};\nuse Other\\Thing;\nconst LIMIT = {n};\nfunction fn_{func}(?int $x = null): int {{ return $x ?? [{n}][0]; }}\necho fn_{func}({n}) ?: \\{ns}\\LIMIT;\n",
            ns = ns.join("\\"),
        );
        (ns, source)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn conversion_is_deterministic(source in arb_flat_program()) {
        prop_assert_eq!(convert(&source).unwrap(), convert(&source).unwrap());
    }

    #[test]
    fn flat_programs_reach_a_fixed_point(source in arb_flat_program()) {
        let first = convert(&source).unwrap();
        let second = convert(&first).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn namespaced_output_is_a_fixed_point((_ns, source) in arb_namespaced_program()) {
        let first = convert(&source).unwrap();
        let second = convert(&first).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn namespaced_names_flatten_to_one_token((ns, source) in arb_namespaced_program()) {
        let out = convert(&source).unwrap();
        let prefix = ns.join("_");
        prop_assert!(!out.contains('\\'), "qualified name survived:\n{}", out);
        prop_assert!(!out.contains("namespace"));
        prop_assert!(!out.contains("use "));
        prop_assert!(!out.contains("??"));
        let define = format!("define('{}_LIMIT'", prefix);
        prop_assert!(out.contains(&define));
        let call = format!("echo {}_fn_", prefix);
        prop_assert!(out.contains(&call), "call not flattened:\n{}", out);
    }
}
