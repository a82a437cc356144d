//! Snapshot tests for error message formatting.
//!
//! Uses insta inline snapshots; run `cargo insta review` after changing a message.

use insta::assert_snapshot;
use phptobpc::diagnostics::{render_to_string, CompileError};

fn convert_err(source: &str) -> CompileError {
    match phptobpc::convert(source) {
        Ok(out) => panic!("expected an error, got:\n{out}"),
        Err(err) => err,
    }
}

#[test]
fn missing_expression_error() {
    assert_snapshot!(convert_err("<?php $a = ;").to_string(), @"Syntax error: unexpected ';' in expression");
}

#[test]
fn unclosed_block_error() {
    assert_snapshot!(convert_err("<?php function f() {").to_string(), @"Syntax error: expected }, found end of file");
}

#[test]
fn unterminated_string_error() {
    assert_snapshot!(convert_err("<?php echo 'abc").to_string(), @"Syntax error: unterminated string literal");
}

#[test]
fn alternative_syntax_error() {
    assert_snapshot!(
        convert_err("<?php while ($a): endwhile;").to_string(),
        @"Syntax error: alternative control structure syntax is not supported"
    );
}

#[test]
fn anonymous_class_error() {
    assert_snapshot!(
        convert_err("<?php $x = new class {};").to_string(),
        @"Syntax error: anonymous classes are not supported"
    );
}

#[test]
fn trait_adaptation_error() {
    assert_snapshot!(
        convert_err("<?php class A { use T { f as g; } }").to_string(),
        @"Syntax error: trait adaptation blocks are not supported"
    );
}

#[test]
fn try_without_handlers_error() {
    assert_snapshot!(convert_err("<?php try { f(); }").to_string(), @"Syntax error: try without catch or finally");
}

#[test]
fn rendered_report_points_at_source() {
    let source = "<?php\n$a = ;\n";
    let err = convert_err(source);
    let rendered = render_to_string(source, &err);
    assert!(rendered.contains("unexpected ';' in expression"));
    assert!(rendered.contains("$a = ;"));
}
