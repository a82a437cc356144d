//! End-to-end rewrite behaviour through the library API.

mod common;

use common::convert_body;
use phptobpc::rewrite::{CollectMode, RewriteOptions};

fn convert_prepass(source: &str) -> String {
    let options = RewriteOptions { collect: CollectMode::Prepass, ..RewriteOptions::default() };
    let out = phptobpc::convert_with_options(source, &options).unwrap();
    out.strip_prefix("<?php\n\n").unwrap_or(&out).trim_end().to_string()
}

// ── Idempotence ──────────────────────────────────────────────────────

#[test]
fn flat_input_converts_to_a_fixed_point() {
    let source = r#"<?php
function add($a, $b = 1) { return $a + $b; }
class Point { public $x = 0; public function len() { return sqrt($this->x * $this->x); } }
$p = new Point();
echo add(1, 2), $p->len();
"#;
    let first = phptobpc::convert(source).unwrap();
    let second = phptobpc::convert(&first).unwrap();
    assert_eq!(first, second);
}

#[test]
fn converted_namespaced_input_is_a_fixed_point() {
    let source = "<?php namespace A\\B; use C\\D; function f(): ?D { return $x ?? new D(); } echo f() ?: 1;";
    let first = phptobpc::convert(source).unwrap();
    let second = phptobpc::convert(&first).unwrap();
    assert_eq!(first, second);
}

// ── Name flattening ──────────────────────────────────────────────────

#[test]
fn call_in_same_namespace_is_flattened() {
    let out = convert_body("<?php namespace App\\Util; function f() { return 1; } echo f();");
    assert_eq!(out, "function App_Util_f()\n{\n    return 1;\n}\necho App_Util_f();");
}

#[test]
fn qualified_and_imported_calls_are_flattened() {
    let out = convert_body(
        "<?php namespace App\\Util { function f() {} }
namespace Main { use function App\\Util\\f; use App\\Util as U; f(); \\App\\Util\\f(); U\\f(); }",
    );
    assert_eq!(out, "function App_Util_f()\n{\n}\nApp_Util_f();\nApp_Util_f();\nApp_Util_f();");
}

#[test]
fn global_fallback_calls_keep_their_bare_name() {
    let out = convert_body("<?php namespace App; echo strlen('abc'), \\count([]);");
    assert_eq!(out, "echo strlen('abc'), count(array());");
}

#[test]
fn forward_call_depends_on_collect_mode() {
    let source = "<?php namespace N; echo g(); function g() {}";
    assert!(convert_body(source).starts_with("echo g();"));
    assert!(convert_prepass(source).starts_with("echo N_g();"));
}

#[test]
fn classes_and_their_references_are_flattened() {
    let out = convert_body(
        "<?php namespace App; use Lib\\Base; class User extends Base implements \\JsonSerializable {
    public static function make(?User $u): self { return new User(); }
}
$u = User::make(null);
if ($u instanceof User) { echo User::class; }",
    );
    let expected = "class App_User extends Lib_Base implements JsonSerializable
{
    public static function make(?App_User $u)
    {
        return new App_User();
    }
}
$u = App_User::make(null);
if ($u instanceof App_User) {
    echo App_User::class;
}";
    assert_eq!(out, expected);
}

#[test]
fn flattened_names_are_single_tokens() {
    let out = convert_body("<?php namespace A\\B\\C; class K {} function f() {} new K(); f();");
    assert!(out.contains("class A_B_C_K"));
    assert!(out.contains("function A_B_C_f()"));
    assert!(!out.contains('\\'));
}

// ── Operators ────────────────────────────────────────────────────────

#[test]
fn null_coalescing_becomes_isset_ternary() {
    assert_eq!(convert_body("<?php $x = $a ?? $b;"), "$x = isset($a) ? $a : $b;");
    assert_eq!(
        convert_body("<?php $x = $a['k'] ?? $b->c ?? 'd';"),
        "$x = isset($a['k']) ? $a['k'] : (isset($b->c) ? $b->c : 'd');"
    );
}

#[test]
fn null_coalescing_assignment_becomes_assignment() {
    assert_eq!(convert_body("<?php $a ??= 1;"), "$a = isset($a) ? $a : 1;");
}

#[test]
fn short_ternary_repeats_condition() {
    assert_eq!(convert_body("<?php $r = $x ?: $y;"), "$r = $x ? $x : $y;");
}

#[test]
fn short_arrays_become_long() {
    assert_eq!(convert_body("<?php $a = [1, [2 => 3]]; [$b, $c] = $a;"), "$a = array(1, array(2 => 3));\nlist($b, $c) = $a;");
}

// ── Constants ────────────────────────────────────────────────────────

#[test]
fn const_group_expands_to_ordered_defines() {
    assert_eq!(convert_body("<?php namespace N; const A = 1, B = 2;"), "define('N_A', 1);\ndefine('N_B', 2);");
}

#[test]
fn global_const_keeps_its_name() {
    assert_eq!(convert_body("<?php const LIMIT = 10; echo LIMIT;"), "define('LIMIT', 10);\necho LIMIT;");
}

#[test]
fn unqualified_namespaced_const_read_stays_bare() {
    assert_eq!(convert_body("<?php namespace N; const A = 1; echo A;"), "define('N_A', 1);\necho A;");
}

#[test]
fn qualified_const_reads_are_flattened() {
    assert_eq!(convert_body("<?php echo \\N\\A, N\\B;"), "echo N_A, N_B;");
}

#[test]
fn class_constants_lose_modifiers() {
    assert_eq!(convert_body("<?php class C { private const A = 1; }"), "class C\n{\n    const A = 1;\n}");
}

// ── Elision ──────────────────────────────────────────────────────────

#[test]
fn imports_and_namespaces_never_survive() {
    let out = convert_body(
        "<?php namespace A { use X\\Y; use function X\\f; use const X\\C; use X\\{P, Q}; }
namespace B { use Z; } namespace C { } namespace { echo 1; }",
    );
    assert_eq!(out, "echo 1;");
}

#[test]
fn declare_is_removed_or_unwrapped() {
    assert_eq!(convert_body("<?php declare(strict_types=1); echo 1;"), "echo 1;");
    assert_eq!(convert_body("<?php declare(ticks=1) { echo 2; }"), "echo 2;");
}

#[test]
fn return_types_are_dropped_everywhere() {
    let out = convert_body(
        "<?php function f(): int { return 1; }
interface I { public function m(): string; }
$c = function () use ($x): ?array { return $x; };
$d = fn(int $y): int => $y;",
    );
    let expected = "function f()
{
    return 1;
}
interface I
{
    public function m();
}
$c = function () use ($x) {
    return $x;
};
$d = fn(int $y) => $y;";
    assert_eq!(out, expected);
}

// ── Guards ───────────────────────────────────────────────────────────

#[test]
fn guard_is_replaced_by_its_body() {
    let out = convert_body("<?php if (defined('__BPC__')) { echo 1; echo 2; } else { echo 3; }");
    assert_eq!(out, "echo 1;\necho 2;");
}

#[test]
fn nested_guard_is_unwrapped() {
    let out = convert_body("<?php function f() { if (defined('__BPC__')) { return 1; } return 2; }");
    assert_eq!(out, "function f()\n{\n    return 1;\n    return 2;\n}");
}

#[test]
fn other_conditions_are_kept() {
    let out = convert_body("<?php if (defined('OTHER')) { echo 1; } if (!defined('__BPC__')) { echo 2; }");
    assert_eq!(out, "if (defined('OTHER')) {\n    echo 1;\n}\nif (!defined('__BPC__')) {\n    echo 2;\n}");
}

#[test]
fn custom_guard_constant() {
    let options = RewriteOptions { guard_constant: "__NATIVE__".into(), ..RewriteOptions::default() };
    let out = phptobpc::convert_with_options("<?php if (defined('__NATIVE__')) { echo 1; }", &options).unwrap();
    assert_eq!(out, "<?php\n\necho 1;\n");
}

// ── Errors ───────────────────────────────────────────────────────────

#[test]
fn invalid_input_is_a_syntax_error() {
    let err = phptobpc::convert("<?php function (").unwrap_err();
    assert!(err.is_syntax());
}

#[test]
fn stats_count_applied_rules() {
    let mut program = phptobpc::parse_source("<?php namespace N; function f(): int { return f() ?? 1; }").unwrap();
    let stats = phptobpc::transform_program(&mut program, &RewriteOptions::default()).unwrap();
    assert_eq!(stats.registered_functions, 1);
    assert_eq!(stats.function_names, 1);
    assert_eq!(stats.return_types, 1);
    assert_eq!(stats.flat_calls, 1);
    assert_eq!(stats.coalesces, 1);
    assert_eq!(stats.namespaces, 1);
}

// ── Other syntax passes through ──────────────────────────────────────

#[test]
fn generators_keep_yield_and_flatten_calls() {
    let out = convert_body("<?php namespace N; function gen() { yield 1; yield 'k' => 2; yield from gen(); }");
    assert_eq!(out, "function N_gen()\n{\n    yield 1;\n    yield 'k' => 2;\n    yield from N_gen();\n}");
}

#[test]
fn heredoc_body_is_copied_verbatim() {
    let out = convert_body("<?php namespace N; echo <<<EOT\n  Hi {$name} \\N\\x\n  EOT;");
    assert_eq!(out, "echo <<<EOT\n  Hi {$name} \\N\\x\n  EOT;");
}

#[test]
fn variable_variable_coalesce_is_rewritten() {
    assert_eq!(convert_body("<?php $v = $$k ?? 1;"), "$v = isset($$k) ? $$k : 1;");
}

#[test]
fn halt_compiler_data_survives_conversion() {
    let out = convert_body("<?php namespace N; function f() {} __halt_compiler(); \x00raw");
    assert_eq!(out, "function N_f()\n{\n}\n__halt_compiler(); \x00raw");
}
