//! Behaviour of the `phptobpc` binary.

mod common;

use common::{phptobpc, run_on_source};

#[test]
fn converts_file_to_stdout() {
    let output = run_on_source("<?php namespace App; function f(): int { return 1; } echo $x ?? f();");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        "<?php\n\nfunction App_f()\n{\n    return 1;\n}\necho isset($x) ? $x : App_f();\n"
    );
}

#[test]
fn parse_error_exits_with_one_and_no_output() {
    let output = run_on_source("<?php $a = ;");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Parse Error: unexpected ';' in expression"), "stderr: {stderr}");
}

#[test]
fn missing_file_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = phptobpc().arg(dir.path().join("missing.php")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: failed to read"), "stderr: {stderr}");
    assert!(stderr.contains("--> "), "stderr: {stderr}");
    assert!(stderr.contains("missing.php"), "stderr: {stderr}");
}

#[test]
fn missing_argument_is_a_usage_error() {
    let output = phptobpc().output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn extra_argument_is_a_usage_error() {
    let output = phptobpc().args(["a.php", "b.php"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn help_exits_successfully() {
    let output = phptobpc().arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn close_tag_inside_line_comment_keeps_trailing_html() {
    let output = run_on_source("<?php echo 1; // note ?>\n<p>after</p>\n");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "<?php\n\necho 1;\n?>\n<p>after</p>\n<?php\n");
}

#[test]
fn html_passes_through() {
    let output = run_on_source("<p>hi</p>\n<?php echo 1; ?>\n<p>bye</p>\n");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "<p>hi</p>\n<?php\n\necho 1;\n?>\n<p>bye</p>\n<?php\n");
}

#[test]
fn logging_goes_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("input.php");
    std::fs::write(&src_path, "<?php namespace N; echo 1;").unwrap();
    let output = phptobpc().arg(&src_path).env("RUST_LOG", "phptobpc=debug").output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "<?php\n\necho 1;\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("rewrite finished"));
}
