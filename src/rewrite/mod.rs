//! Downgrade a resolved program to the flat dialect the BPC compiler accepts.
//!
//! A single [`Transform`] applies the rule table on leave, so every rule
//! sees children that are already rewritten. In the default
//! [`CollectMode::Interleaved`] mode the declaration registry is filled by
//! the same walk's enter hook; a call that textually precedes the
//! namespaced function it targets is therefore left unflattened.

pub mod collect;
pub mod verify;

use serde::Serialize;

use crate::diagnostics::CompileError;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use crate::traverse::{transform_program, HookResult, NameContext, Rewrite, Transform};
use crate::visit::composers::contains_expr;

use collect::{collect_declarations, DeclarationRegistry};

pub use verify::verify_flat;

/// Sentinel constant checked by `if (defined('__BPC__'))` guards.
pub const DEFAULT_GUARD_CONSTANT: &str = "__BPC__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectMode {
    /// Record declarations on the rewriting walk's enter hook.
    #[default]
    Interleaved,
    /// Record every declaration in a separate walk before rewriting.
    Prepass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    pub collect: CollectMode,
    pub guard_constant: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self { collect: CollectMode::default(), guard_constant: DEFAULT_GUARD_CONSTANT.to_string() }
    }
}

/// Every rule in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    LongArray,
    PlainName,
    FlatCall,
    ClassName,
    FunctionName,
    ReturnType,
    ConstDefine,
    ConstFetch,
    ShortTernary,
    Coalesce,
    CoalesceAssign,
    Guard,
    Namespace,
    Import,
    Declare,
    ClassConstFlags,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::LongArray => "long-array",
            Rule::PlainName => "plain-name",
            Rule::FlatCall => "flat-call",
            Rule::ClassName => "class-name",
            Rule::FunctionName => "function-name",
            Rule::ReturnType => "return-type",
            Rule::ConstDefine => "const-define",
            Rule::ConstFetch => "const-fetch",
            Rule::ShortTernary => "short-ternary",
            Rule::Coalesce => "coalesce",
            Rule::CoalesceAssign => "coalesce-assign",
            Rule::Guard => "guard",
            Rule::Namespace => "namespace",
            Rule::Import => "import",
            Rule::Declare => "declare",
            Rule::ClassConstFlags => "class-const-flags",
        }
    }
}

/// How many times each rule changed the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub registered_functions: usize,
    pub long_arrays: usize,
    pub plain_names: usize,
    pub flat_calls: usize,
    pub class_names: usize,
    pub function_names: usize,
    pub return_types: usize,
    pub const_defines: usize,
    pub const_fetches: usize,
    pub short_ternaries: usize,
    pub coalesces: usize,
    pub guards: usize,
    pub namespaces: usize,
    pub imports: usize,
    pub declares: usize,
    pub class_const_flags: usize,
}

impl RewriteStats {
    fn record(&mut self, rule: Rule) {
        let counter = match rule {
            Rule::LongArray => &mut self.long_arrays,
            Rule::PlainName => &mut self.plain_names,
            Rule::FlatCall => &mut self.flat_calls,
            Rule::ClassName => &mut self.class_names,
            Rule::FunctionName => &mut self.function_names,
            Rule::ReturnType => &mut self.return_types,
            Rule::ConstDefine => &mut self.const_defines,
            Rule::ConstFetch => &mut self.const_fetches,
            Rule::ShortTernary => &mut self.short_ternaries,
            Rule::Coalesce | Rule::CoalesceAssign => &mut self.coalesces,
            Rule::Guard => &mut self.guards,
            Rule::Namespace => &mut self.namespaces,
            Rule::Import => &mut self.imports,
            Rule::Declare => &mut self.declares,
            Rule::ClassConstFlags => &mut self.class_const_flags,
        };
        *counter += 1;
    }

    /// Total number of rule applications.
    pub fn total(&self) -> usize {
        self.long_arrays
            + self.plain_names
            + self.flat_calls
            + self.class_names
            + self.function_names
            + self.return_types
            + self.const_defines
            + self.const_fetches
            + self.short_ternaries
            + self.coalesces
            + self.guards
            + self.namespaces
            + self.imports
            + self.declares
            + self.class_const_flags
    }
}

/// Apply the rule table to an already resolved program.
pub fn rewrite_program(program: &mut Program, options: &RewriteOptions) -> Result<RewriteStats, CompileError> {
    let (registry, interleaved) = match options.collect {
        CollectMode::Interleaved => (DeclarationRegistry::new(), true),
        CollectMode::Prepass => (collect_declarations(program), false),
    };
    let mut rewriter = Rewriter { options, registry, interleaved, stats: RewriteStats::default() };
    transform_program(&mut rewriter, program)?;
    rewriter.stats.registered_functions = rewriter.registry.len();
    tracing::debug!(
        registered = rewriter.stats.registered_functions,
        rules = rewriter.stats.total(),
        "rewrite finished"
    );
    Ok(rewriter.stats)
}

struct Rewriter<'o> {
    options: &'o RewriteOptions,
    registry: DeclarationRegistry,
    interleaved: bool,
    stats: RewriteStats,
}

impl Rewriter<'_> {
    fn fired(&mut self, rule: Rule, span: Span) {
        tracing::trace!(rule = rule.as_str(), start = span.start, end = span.end, "rule applied");
        self.stats.record(rule);
    }

    fn drop_return_type(&mut self, return_type: &mut Option<Spanned<TypeHint>>) {
        if let Some(ty) = return_type.take() {
            self.fired(Rule::ReturnType, ty.span);
        }
    }

    /// `if (defined('<guard>'))` with nothing else in the condition.
    fn is_guard(&self, cond: &Expr) -> bool {
        let Expr::Call { callee: Callee::Name(name), args } = cond else {
            return false;
        };
        if !name.node.is_unqualified() || name.node.parts != ["defined"] {
            return false;
        }
        let [arg] = args.as_slice() else {
            return false;
        };
        let guard = self.options.guard_constant.as_str();
        match &arg.value.node {
            _ if arg.unpack => false,
            Expr::StringLit(value) => value == guard,
            // a double-quoted body with no escapes or interpolation is plain text
            Expr::TemplateLit(raw) => raw == guard && !raw.contains(['$', '\\']),
            _ => false,
        }
    }

    fn defines(&mut self, items: Vec<ConstItem>) -> Result<Vec<Spanned<Stmt>>, CompileError> {
        let mut defines = Vec::with_capacity(items.len());
        for item in items {
            let Some(namespaced) = &item.namespaced_name else {
                return Err(missing_resolution("constant", &item.name));
            };
            let span = item.name.span.to(item.value.span);
            let call = Expr::Call {
                callee: Callee::Name(Spanned::new(Name::plain("define"), item.name.span)),
                args: vec![
                    Arg::new(Spanned::new(Expr::StringLit(namespaced.flatten()), item.name.span)),
                    Arg::new(item.value),
                ],
            };
            self.fired(Rule::ConstDefine, span);
            defines.push(Spanned::new(Stmt::Expr(Spanned::new(call, span)), span));
        }
        Ok(defines)
    }
}

fn missing_resolution(what: &str, name: &Spanned<String>) -> CompileError {
    CompileError::rewrite(format!("{what} '{}' has no resolved namespaced name", name.node), name.span)
}

/// Whether evaluating `expr` twice, once under `isset`, is observable.
fn has_side_effects(expr: &Spanned<Expr>) -> bool {
    contains_expr(expr, |e| {
        matches!(
            e,
            Expr::Call { .. }
                | Expr::MethodCall { .. }
                | Expr::StaticCall { .. }
                | Expr::New { .. }
                | Expr::Assign { .. }
                | Expr::CompoundAssign { .. }
                | Expr::IncDec { .. }
                | Expr::Yield { .. }
                | Expr::YieldFrom(_)
                | Expr::ShellExec(_)
        )
    })
}

fn isset(expr: &Spanned<Expr>) -> Spanned<Expr> {
    Spanned::new(Expr::Isset(vec![expr.clone()]), expr.span)
}

impl Transform for Rewriter<'_> {
    fn enter_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), CompileError> {
        if self.interleaved {
            self.registry.record(&stmt.node);
        }
        Ok(())
    }

    fn leave_stmt(&mut self, stmt: &mut Spanned<Stmt>) -> HookResult<Stmt> {
        let span = stmt.span;
        match &mut stmt.node {
            Stmt::Namespace { stmts, .. } => {
                self.fired(Rule::Namespace, span);
                Ok(Rewrite::Splice(std::mem::take(stmts)))
            }
            Stmt::Use { .. } | Stmt::GroupUse { .. } => {
                self.fired(Rule::Import, span);
                Ok(Rewrite::Delete)
            }
            Stmt::Declare { body, .. } => {
                self.fired(Rule::Declare, span);
                match body.take() {
                    Some(body) => Ok(Rewrite::Splice(body)),
                    None => Ok(Rewrite::Delete),
                }
            }
            Stmt::ClassLike(class) => {
                let Some(namespaced) = &class.namespaced_name else {
                    return Err(missing_resolution("class", &class.name));
                };
                let flat = namespaced.flatten();
                if flat != class.name.node {
                    class.name.node = flat;
                    self.fired(Rule::ClassName, class.name.span);
                }
                Ok(Rewrite::Keep)
            }
            Stmt::Function(func) => {
                let Some(namespaced) = &func.namespaced_name else {
                    return Err(missing_resolution("function", &func.name));
                };
                let flat = namespaced.flatten();
                if flat != func.name.node {
                    func.name.node = flat;
                    self.fired(Rule::FunctionName, func.name.span);
                }
                self.drop_return_type(&mut func.return_type);
                Ok(Rewrite::Keep)
            }
            Stmt::Const(items) => {
                let items = std::mem::take(items);
                Ok(Rewrite::Splice(self.defines(items)?))
            }
            Stmt::If { cond, then_branch, .. } if self.is_guard(&cond.node) => {
                self.fired(Rule::Guard, span);
                Ok(Rewrite::Splice(std::mem::take(then_branch)))
            }
            _ => Ok(Rewrite::Keep),
        }
    }

    fn leave_member(&mut self, member: &mut Spanned<ClassMember>) -> HookResult<ClassMember> {
        match &mut member.node {
            ClassMember::Method(method) => self.drop_return_type(&mut method.return_type),
            ClassMember::Const { modifiers, .. } if !modifiers.is_empty() => {
                *modifiers = Modifiers::default();
                self.fired(Rule::ClassConstFlags, member.span);
            }
            _ => {}
        }
        Ok(Rewrite::Keep)
    }

    fn leave_expr(&mut self, expr: &mut Spanned<Expr>) -> HookResult<Expr> {
        let span = expr.span;
        match &mut expr.node {
            Expr::Array { kind, .. } | Expr::List { kind, .. } if *kind == ArrayKind::Short => {
                *kind = ArrayKind::Long;
                self.fired(Rule::LongArray, span);
            }
            Expr::Call { callee: Callee::Name(name), .. } => {
                let target = name.node.namespaced.as_ref().filter(|ns| self.registry.contains(ns));
                if let Some(target) = target {
                    name.node = Name::plain(target.flatten());
                    self.fired(Rule::FlatCall, name.span);
                }
            }
            Expr::ConstFetch(name) => {
                let flat = Name::plain(name.node.to_qualified().flatten());
                if flat != name.node {
                    name.node = flat;
                    self.fired(Rule::ConstFetch, name.span);
                }
            }
            Expr::Ternary { cond, then_expr, .. } if then_expr.is_none() => {
                *then_expr = Some(cond.clone());
                self.fired(Rule::ShortTernary, span);
            }
            Expr::BinOp { op: BinOp::Coalesce, lhs, rhs } => {
                if has_side_effects(lhs) {
                    tracing::debug!(start = span.start, end = span.end, "left operand of ?? is evaluated twice");
                }
                let ternary = Expr::Ternary {
                    cond: Box::new(isset(lhs)),
                    then_expr: Some(lhs.clone()),
                    else_expr: rhs.clone(),
                };
                self.fired(Rule::Coalesce, span);
                return Ok(Rewrite::Replace(Spanned::new(ternary, span)));
            }
            Expr::CompoundAssign { op: AssignOp::Coalesce, target, value } => {
                let ternary = Expr::Ternary {
                    cond: Box::new(isset(target)),
                    then_expr: Some(target.clone()),
                    else_expr: value.clone(),
                };
                let assign = Expr::Assign {
                    target: target.clone(),
                    value: Box::new(Spanned::new(ternary, value.span)),
                    by_ref: false,
                };
                self.fired(Rule::CoalesceAssign, span);
                return Ok(Rewrite::Replace(Spanned::new(assign, span)));
            }
            Expr::Closure(closure) => self.drop_return_type(&mut closure.return_type),
            Expr::ArrowFunction(arrow) => self.drop_return_type(&mut arrow.return_type),
            _ => {}
        }
        Ok(Rewrite::Keep)
    }

    fn leave_name(&mut self, name: &mut Spanned<Name>, _context: NameContext) -> HookResult<Name> {
        // names still carrying a candidate are decided by the call rule
        if name.node.namespaced.is_some() {
            return Ok(Rewrite::Keep);
        }
        let plain = Name::plain(name.node.to_qualified().flatten());
        if plain != name.node {
            name.node = plain;
            self.fired(Rule::PlainName, name.span);
        }
        Ok(Rewrite::Keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_names;
    use crate::visit::composers::{collect_names, count_stmts, find_expr, find_member, find_stmt};

    fn rewrite_with(src: &str, options: &RewriteOptions) -> (Program, RewriteStats) {
        let mut program = crate::parse_source(src).unwrap();
        resolve_names(&mut program).unwrap();
        let stats = rewrite_program(&mut program, options).unwrap();
        (program, stats)
    }

    fn rewrite(src: &str) -> (Program, RewriteStats) {
        rewrite_with(src, &RewriteOptions::default())
    }

    fn callee_names(program: &Program) -> Vec<String> {
        crate::visit::composers::collect_exprs(&program.stmts, |e| match e {
            Expr::Call { callee: Callee::Name(name), .. } => Some(name.node.to_string()),
            _ => None,
        })
    }

    #[test]
    fn short_arrays_become_long() {
        let (program, stats) = rewrite("<?php $a = [1, [2]]; [$x, $y] = $a;");
        assert_eq!(stats.long_arrays, 3);
        let short = find_expr(&program.stmts, |e| {
            matches!(e.node, Expr::Array { kind: ArrayKind::Short, .. } | Expr::List { kind: ArrayKind::Short, .. })
                .then_some(())
        });
        assert!(short.is_none());
    }

    #[test]
    fn namespaced_call_is_flattened_after_declaration() {
        let (program, stats) = rewrite("<?php namespace App\\Util; function f() {} f();");
        assert_eq!(callee_names(&program), vec!["App_Util_f"]);
        assert_eq!(stats.flat_calls, 1);
        assert_eq!(stats.registered_functions, 1);
    }

    #[test]
    fn forward_call_stays_unflattened_when_interleaved() {
        let (program, _) = rewrite("<?php namespace App; f(); function f() {}");
        assert_eq!(callee_names(&program), vec!["f"]);
    }

    #[test]
    fn forward_call_is_flattened_with_prepass() {
        let options = RewriteOptions { collect: CollectMode::Prepass, ..RewriteOptions::default() };
        let (program, _) = rewrite_with("<?php namespace App; f(); function f() {}", &options);
        assert_eq!(callee_names(&program), vec!["App_f"]);
    }

    #[test]
    fn unknown_call_in_namespace_keeps_bare_name() {
        let (program, _) = rewrite("<?php namespace App; strlen('x');");
        assert_eq!(callee_names(&program), vec!["strlen"]);
    }

    #[test]
    fn fully_qualified_references_become_plain() {
        let (program, _) = rewrite("<?php namespace App; use Lib\\Db; new Db\\Conn(); \\Lib\\helper();");
        assert_eq!(collect_names(&program.stmts), vec!["Lib_Db_Conn", "Lib_helper"]);
    }

    #[test]
    fn declarations_are_flattened_and_lose_return_types() {
        let (program, stats) = rewrite("<?php namespace A\\B; interface I {} function f(): int { return 1; }");
        let names: Vec<String> = program
            .stmts
            .iter()
            .filter_map(|s| match &s.node {
                Stmt::ClassLike(c) => Some(c.name.node.clone()),
                Stmt::Function(f) => {
                    assert!(f.return_type.is_none());
                    Some(f.name.node.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["A_B_I", "A_B_f"]);
        assert_eq!(stats.return_types, 1);
    }

    #[test]
    fn method_closure_and_arrow_return_types_dropped() {
        let (program, stats) =
            rewrite("<?php class C { function m(): ?C { $f = function (): int { return 1; }; $g = fn(): int => 2; } }");
        assert_eq!(stats.return_types, 3);
        let method_rt = find_member(&program.stmts, |m| match &m.node {
            ClassMember::Method(method) => Some(method.return_type.is_some()),
            _ => None,
        });
        assert_eq!(method_rt, Some(false));
    }

    #[test]
    fn const_group_expands_to_defines_in_order() {
        let (program, stats) = rewrite("<?php namespace N; const A = 1, B = 2;");
        assert_eq!(stats.const_defines, 2);
        assert_eq!(program.stmts.len(), 2);
        let defines: Vec<(String, String)> = program
            .stmts
            .iter()
            .map(|s| {
                let Stmt::Expr(Spanned { node: Expr::Call { callee: Callee::Name(name), args }, .. }) = &s.node else {
                    panic!("expected define call, got {:?}", s.node);
                };
                assert_eq!(name.node.to_string(), "define");
                let Expr::StringLit(flat) = &args[0].value.node else { panic!() };
                let Expr::IntLit(value) = &args[1].value.node else { panic!() };
                (flat.clone(), value.clone())
            })
            .collect();
        assert_eq!(defines, vec![("N_A".to_string(), "1".to_string()), ("N_B".to_string(), "2".to_string())]);
    }

    #[test]
    fn const_fetch_is_flattened() {
        let (program, _) = rewrite("<?php echo \\N\\LIMIT, PHP_EOL;");
        let fetched = crate::visit::composers::collect_exprs(&program.stmts, |e| match e {
            Expr::ConstFetch(name) => Some(name.node.to_string()),
            _ => None,
        });
        assert_eq!(fetched, vec!["N_LIMIT", "PHP_EOL"]);
    }

    #[test]
    fn short_ternary_gets_condition_as_middle() {
        let (program, stats) = rewrite("<?php $r = $x ?: $y;");
        assert_eq!(stats.short_ternaries, 1);
        let middle = find_expr(&program.stmts, |e| match &e.node {
            Expr::Ternary { then_expr: Some(then_expr), .. } => Some(then_expr.node.clone()),
            _ => None,
        });
        assert_eq!(middle, Some(Expr::Variable("x".into())));
    }

    #[test]
    fn coalesce_becomes_isset_ternary() {
        let (program, stats) = rewrite("<?php $r = $a['k'] ?? 'd';");
        assert_eq!(stats.coalesces, 1);
        let ternary = find_expr(&program.stmts, |e| match &e.node {
            Expr::Ternary { cond, then_expr: Some(then_expr), else_expr } => {
                Some((cond.node.clone(), then_expr.node.clone(), else_expr.node.clone()))
            }
            _ => None,
        });
        let (cond, then_expr, else_expr) = ternary.unwrap();
        let Expr::Isset(vars) = cond else { panic!("expected isset, got {cond:?}") };
        assert_eq!(vars[0].node, then_expr);
        assert_eq!(else_expr, Expr::StringLit("d".into()));
    }

    #[test]
    fn side_effecting_coalesce_operands_are_detected() {
        let lhs = |src: &str| {
            let program = crate::parse_source(src).unwrap();
            find_expr(&program.stmts, |e| match &e.node {
                Expr::BinOp { op: BinOp::Coalesce, lhs, .. } => Some((**lhs).clone()),
                _ => None,
            })
            .unwrap()
        };
        assert!(!has_side_effects(&lhs("<?php $a['k']->p ?? 1;")));
        assert!(has_side_effects(&lhs("<?php $a[f()] ?? 1;")));
        assert!(has_side_effects(&lhs("<?php $a[$i++] ?? 1;")));
        assert!(has_side_effects(&lhs("<?php $a[`date`] ?? 1;")));
        assert!(!has_side_effects(&lhs("<?php $$name ?? 1;")));
    }

    #[test]
    fn nested_coalesce_rewrites_inner_first() {
        let (_, stats) = rewrite("<?php $r = $a ?? $b ?? $c;");
        assert_eq!(stats.coalesces, 2);
    }

    #[test]
    fn coalesce_assign_becomes_assignment() {
        let (program, _) = rewrite("<?php $a ??= 1;");
        let Stmt::Expr(expr) = &program.stmts[0].node else { panic!() };
        let Expr::Assign { target, value, by_ref: false } = &expr.node else { panic!("got {:?}", expr.node) };
        assert_eq!(target.node, Expr::Variable("a".into()));
        assert!(matches!(value.node, Expr::Ternary { .. }));
    }

    #[test]
    fn guard_is_unwrapped_anywhere() {
        let src = "<?php if (defined('__BPC__')) { echo 1; echo 2; } else { echo 3; }
            function f() { if (defined('__BPC__')) { echo 4; } }";
        let (program, stats) = rewrite(src);
        assert_eq!(stats.guards, 2);
        assert_eq!(count_stmts(&program.stmts, |s| matches!(s, Stmt::If { .. })), 0);
        assert_eq!(count_stmts(&program.stmts, |s| matches!(s, Stmt::Echo(_))), 3);
        assert!(matches!(program.stmts[0].node, Stmt::Echo(_)));
    }

    #[test]
    fn guard_inside_namespace() {
        let (program, _) = rewrite("<?php namespace App; if (defined('__BPC__')) { echo 1; }");
        assert_eq!(program.stmts.len(), 1);
        assert!(matches!(program.stmts[0].node, Stmt::Echo(_)));
    }

    #[test]
    fn other_defined_checks_are_kept() {
        let (program, stats) = rewrite("<?php if (defined('OTHER')) {} if (defined('__BPC__') && $x) {} if (!defined('__BPC__')) {}");
        assert_eq!(stats.guards, 0);
        assert_eq!(count_stmts(&program.stmts, |s| matches!(s, Stmt::If { .. })), 3);
    }

    #[test]
    fn custom_guard_constant() {
        let options = RewriteOptions { guard_constant: "MY_BUILD".into(), ..RewriteOptions::default() };
        let (program, stats) = rewrite_with("<?php if (defined(\"MY_BUILD\")) { echo 1; }", &options);
        assert_eq!(stats.guards, 1);
        assert!(matches!(program.stmts[0].node, Stmt::Echo(_)));
    }

    #[test]
    fn namespaces_are_unwrapped_in_place() {
        let (program, stats) = rewrite("<?php echo 0; namespace A { echo 1; } namespace { echo 2; }");
        assert_eq!(stats.namespaces, 2);
        assert_eq!(program.stmts.len(), 3);
        assert!(program.stmts.iter().all(|s| matches!(s.node, Stmt::Echo(_))));
    }

    #[test]
    fn imports_and_declares_are_removed() {
        let (program, stats) =
            rewrite("<?php declare(strict_types=1); use A\\B; use function C\\d; use E\\{F, G}; declare(ticks=1) { echo 1; }");
        assert_eq!(stats.imports, 3);
        assert_eq!(stats.declares, 2);
        assert_eq!(program.stmts.len(), 1);
        assert!(matches!(program.stmts[0].node, Stmt::Echo(_)));
    }

    #[test]
    fn class_constant_modifiers_are_cleared() {
        let (program, stats) = rewrite("<?php class C { private const A = 1; const B = 2; }");
        assert_eq!(stats.class_const_flags, 1);
        let modifiers = find_member(&program.stmts, |m| match &m.node {
            ClassMember::Const { modifiers, .. } => Some(*modifiers),
            _ => None,
        });
        assert_eq!(modifiers, Some(Modifiers::default()));
    }

    #[test]
    fn missing_resolution_is_an_error() {
        let mut program = crate::parse_source("<?php class C {}").unwrap();
        let err = rewrite_program(&mut program, &RewriteOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Rewrite { .. }));
        assert!(err.message().contains("'C'"));
    }

    #[test]
    fn flat_program_is_untouched() {
        let (program, stats) = rewrite("<?php function f($x) { return array($x); } echo f(1);");
        // the resolved `\f` callee goes back to `f`; nothing else changes
        assert_eq!(stats.total(), 1);
        assert_eq!(stats.plain_names, 1);
        let names = find_stmt(&program.stmts, |s| match &s.node {
            Stmt::Function(f) => Some(f.name.node.clone()),
            _ => None,
        });
        assert_eq!(names.as_deref(), Some("f"));
    }
}
