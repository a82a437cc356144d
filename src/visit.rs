//! Read-only AST visitor infrastructure.
//!
//! Implement [`Visitor`] for an analysis pass, overriding only the methods
//! you need, and call the matching `walk_*` function inside an override to
//! keep the default recursion. Omitting the walk call prunes traversal at
//! that node.
//!
//! ```rust
//! use phptobpc::visit::{Visitor, walk_expr};
//! use phptobpc::parser::ast::Expr;
//! use phptobpc::span::Spanned;
//!
//! #[derive(Default)]
//! struct VariableCollector {
//!     names: Vec<String>,
//! }
//!
//! impl Visitor for VariableCollector {
//!     fn visit_expr(&mut self, expr: &Spanned<Expr>) {
//!         if let Expr::Variable(name) = &expr.node {
//!             self.names.push(name.clone());
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```
//!
//! Tree rewriting goes through [`crate::traverse`], whose leave hooks can
//! replace, splice or delete nodes.

pub mod composers;

use crate::parser::ast::*;
use crate::span::Spanned;

/// Read-only AST visitor. Default implementations recurse into all children.
///
/// Names in `namespace` and `use` statements are declaration sites, not
/// references, and are not passed to [`Visitor::visit_name`].
pub trait Visitor: Sized {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_member(&mut self, member: &Spanned<ClassMember>) {
        walk_member(self, member);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }

    fn visit_type(&mut self, ty: &TypeHint) {
        walk_type(self, ty);
    }

    fn visit_name(&mut self, _name: &Spanned<Name>) {}
}

// ============================================================================
// Walk Functions
// ============================================================================

pub fn walk_program<V: Visitor>(v: &mut V, program: &Program) {
    walk_stmts(v, &program.stmts);
}

pub fn walk_stmts<V: Visitor>(v: &mut V, stmts: &[Spanned<Stmt>]) {
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
}

fn walk_params<V: Visitor>(v: &mut V, params: &[Param]) {
    for param in params {
        if let Some(ty) = &param.ty {
            v.visit_type(&ty.node);
        }
        if let Some(default) = &param.default {
            v.visit_expr(default);
        }
    }
}

fn walk_return_type<V: Visitor>(v: &mut V, ty: &Option<Spanned<TypeHint>>) {
    if let Some(ty) = ty {
        v.visit_type(&ty.node);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Spanned<Stmt>) {
    match &stmt.node {
        Stmt::InlineHtml(_)
        | Stmt::Nop
        | Stmt::Use { .. }
        | Stmt::GroupUse { .. }
        | Stmt::Goto(_)
        | Stmt::Label(_)
        | Stmt::HaltCompiler(_) => {}
        Stmt::Namespace { stmts, .. } => walk_stmts(v, stmts),
        Stmt::Declare { directives, body } => {
            for directive in directives {
                v.visit_expr(&directive.value);
            }
            if let Some(body) = body {
                walk_stmts(v, body);
            }
        }
        Stmt::Const(items) => {
            for item in items {
                v.visit_expr(&item.value);
            }
        }
        Stmt::Function(func) => {
            walk_params(v, &func.params);
            walk_return_type(v, &func.return_type);
            walk_stmts(v, &func.body);
        }
        Stmt::ClassLike(class) => {
            for name in class.extends.iter().chain(&class.implements) {
                v.visit_name(name);
            }
            for member in &class.members {
                v.visit_member(member);
            }
        }
        Stmt::Echo(exprs) | Stmt::Global(exprs) | Stmt::Unset(exprs) => {
            for expr in exprs {
                v.visit_expr(expr);
            }
        }
        Stmt::Return(value) | Stmt::Break(value) | Stmt::Continue(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::If { cond, then_branch, elseifs, else_branch } => {
            v.visit_expr(cond);
            walk_stmts(v, then_branch);
            for elseif in elseifs {
                v.visit_expr(&elseif.cond);
                walk_stmts(v, &elseif.body);
            }
            if let Some(else_branch) = else_branch {
                walk_stmts(v, else_branch);
            }
        }
        Stmt::While { cond, body } => {
            v.visit_expr(cond);
            walk_stmts(v, body);
        }
        Stmt::DoWhile { body, cond } => {
            walk_stmts(v, body);
            v.visit_expr(cond);
        }
        Stmt::For { init, cond, step, body } => {
            for expr in init.iter().chain(cond).chain(step) {
                v.visit_expr(expr);
            }
            walk_stmts(v, body);
        }
        Stmt::Foreach { subject, key, value, body, .. } => {
            v.visit_expr(subject);
            if let Some(key) = key {
                v.visit_expr(key);
            }
            v.visit_expr(value);
            walk_stmts(v, body);
        }
        Stmt::Switch { subject, cases } => {
            v.visit_expr(subject);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                walk_stmts(v, &case.body);
            }
        }
        Stmt::StaticVars(vars) => {
            for var in vars {
                if let Some(default) = &var.default {
                    v.visit_expr(default);
                }
            }
        }
        Stmt::Throw(expr) | Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Try { body, catches, finally } => {
            walk_stmts(v, body);
            for catch in catches {
                for ty in &catch.types {
                    v.visit_name(ty);
                }
                walk_stmts(v, &catch.body);
            }
            if let Some(finally) = finally {
                walk_stmts(v, finally);
            }
        }
        Stmt::Block(stmts) => walk_stmts(v, stmts),
    }
}

pub fn walk_member<V: Visitor>(v: &mut V, member: &Spanned<ClassMember>) {
    match &member.node {
        ClassMember::TraitUse(names) => {
            for name in names {
                v.visit_name(name);
            }
        }
        ClassMember::Const { consts, .. } => {
            for item in consts {
                v.visit_expr(&item.value);
            }
        }
        ClassMember::Property { ty, props, .. } => {
            if let Some(ty) = ty {
                v.visit_type(&ty.node);
            }
            for prop in props {
                if let Some(default) = &prop.default {
                    v.visit_expr(default);
                }
            }
        }
        ClassMember::Method(method) => {
            walk_params(v, &method.params);
            walk_return_type(v, &method.return_type);
            if let Some(body) = &method.body {
                walk_stmts(v, body);
            }
        }
    }
}

fn walk_args<V: Visitor>(v: &mut V, args: &[Arg]) {
    for arg in args {
        v.visit_expr(&arg.value);
    }
}

fn walk_class_ref<V: Visitor>(v: &mut V, class: &ClassRef) {
    match class {
        ClassRef::Name(name) => v.visit_name(name),
        ClassRef::Expr(expr) => v.visit_expr(expr),
    }
}

fn walk_member_name<V: Visitor>(v: &mut V, member: &MemberName) {
    if let MemberName::Expr(expr) = member {
        v.visit_expr(expr);
    }
}

fn walk_array_item<V: Visitor>(v: &mut V, item: &ArrayItem) {
    if let Some(key) = &item.key {
        v.visit_expr(key);
    }
    v.visit_expr(&item.value);
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node {
        Expr::Variable(_)
        | Expr::IntLit(_)
        | Expr::FloatLit(_)
        | Expr::StringLit(_)
        | Expr::TemplateLit(_)
        | Expr::DocString(_)
        | Expr::ShellExec(_)
        | Expr::MagicConst(_) => {}
        Expr::VariableVariable(inner) | Expr::YieldFrom(inner) => v.visit_expr(inner),
        Expr::Yield { key, value } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Expr::ConstFetch(name) => v.visit_name(name),
        Expr::ClassConstFetch { class, .. } | Expr::StaticPropertyFetch { class, .. } => {
            walk_class_ref(v, class);
        }
        Expr::Array { items, .. } => {
            for item in items {
                walk_array_item(v, item);
            }
        }
        Expr::List { items, .. } => {
            for item in items.iter().flatten() {
                walk_array_item(v, item);
            }
        }
        Expr::Call { callee, args } => {
            match callee {
                Callee::Name(name) => v.visit_name(name),
                Callee::Expr(callee) => v.visit_expr(callee),
            }
            walk_args(v, args);
        }
        Expr::MethodCall { object, method, args } => {
            v.visit_expr(object);
            walk_member_name(v, method);
            walk_args(v, args);
        }
        Expr::StaticCall { class, method, args } => {
            walk_class_ref(v, class);
            walk_member_name(v, method);
            walk_args(v, args);
        }
        Expr::PropertyFetch { object, property } => {
            v.visit_expr(object);
            walk_member_name(v, property);
        }
        Expr::Index { object, index } => {
            v.visit_expr(object);
            if let Some(index) = index {
                v.visit_expr(index);
            }
        }
        Expr::New { class, args } => {
            walk_class_ref(v, class);
            walk_args(v, args);
        }
        Expr::Clone(inner) | Expr::Empty(inner) | Expr::Print(inner) => v.visit_expr(inner),
        Expr::Closure(closure) => {
            walk_params(v, &closure.params);
            walk_return_type(v, &closure.return_type);
            walk_stmts(v, &closure.body);
        }
        Expr::ArrowFunction(arrow) => {
            walk_params(v, &arrow.params);
            walk_return_type(v, &arrow.return_type);
            v.visit_expr(&arrow.body);
        }
        Expr::Ternary { cond, then_expr, else_expr } => {
            v.visit_expr(cond);
            if let Some(then_expr) = then_expr {
                v.visit_expr(then_expr);
            }
            v.visit_expr(else_expr);
        }
        Expr::BinOp { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::UnaryOp { operand, .. } => v.visit_expr(operand),
        Expr::IncDec { target, .. } => v.visit_expr(target),
        Expr::Cast { expr, .. } | Expr::Include { expr, .. } => v.visit_expr(expr),
        Expr::Assign { target, value, .. } | Expr::CompoundAssign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Instanceof { expr, class } => {
            v.visit_expr(expr);
            walk_class_ref(v, class);
        }
        Expr::Isset(vars) => {
            for var in vars {
                v.visit_expr(var);
            }
        }
        Expr::Exit(status) => {
            if let Some(status) = status {
                v.visit_expr(status);
            }
        }
    }
}

pub fn walk_type<V: Visitor>(v: &mut V, ty: &TypeHint) {
    match ty {
        TypeHint::Builtin(_) => {}
        TypeHint::Named(name) => v.visit_name(name),
        TypeHint::Nullable(inner) => v.visit_type(inner),
        TypeHint::Union(types) => {
            for ty in types {
                v.visit_type(ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;
    use std::collections::HashSet;

    fn parse(src: &str) -> Program {
        let tokens = lex(src).unwrap();
        Parser::new(&tokens, src).parse_program().unwrap()
    }

    #[derive(Default)]
    struct NameCollector {
        names: Vec<String>,
    }

    impl Visitor for NameCollector {
        fn visit_name(&mut self, name: &Spanned<Name>) {
            self.names.push(name.node.to_string());
        }
    }

    #[derive(Default)]
    struct VariableCollector {
        vars: HashSet<String>,
    }

    impl Visitor for VariableCollector {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if let Expr::Variable(name) = &expr.node {
                self.vars.insert(name.clone());
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn test_visit_names_in_all_reference_positions() {
        let prog = parse(
            "<?php
            class A extends B implements C { use T; public function m(D $d): E { return new F(); } }
            try { g(H); } catch (I $e) { }
            $x instanceof J;
            K::run();",
        );
        let mut collector = NameCollector::default();
        collector.visit_program(&prog);
        for expected in ["B", "C", "T", "D", "E", "F", "g", "H", "I", "J", "K"] {
            assert!(collector.names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_use_and_namespace_names_are_not_references() {
        let prog = parse("<?php namespace App; use Lib\\Thing; f();");
        let mut collector = NameCollector::default();
        collector.visit_program(&prog);
        assert_eq!(collector.names, vec!["f".to_string()]);
    }

    #[test]
    fn test_walk_reaches_nested_bodies() {
        let prog = parse(
            "<?php
            function f($a = $default) {
                foreach ($items as $k => $v) {
                    $g = function () use ($c) { return fn() => $inner; };
                }
            }",
        );
        let mut collector = VariableCollector::default();
        collector.visit_program(&prog);
        for expected in ["default", "items", "k", "v", "g", "inner"] {
            assert!(collector.vars.contains(expected), "missing ${expected}");
        }
    }

    #[test]
    fn test_pruning_stops_recursion() {
        struct NoClosures {
            vars: usize,
        }
        impl Visitor for NoClosures {
            fn visit_expr(&mut self, expr: &Spanned<Expr>) {
                match &expr.node {
                    Expr::Closure(_) => {}
                    Expr::Variable(_) => self.vars += 1,
                    _ => walk_expr(self, expr),
                }
            }
        }
        let prog = parse("<?php $a = function () { return $hidden; };");
        let mut visitor = NoClosures { vars: 0 };
        visitor.visit_program(&prog);
        assert_eq!(visitor.vars, 1);
    }

    #[test]
    fn test_walk_types_inside_unions() {
        let prog = parse("<?php function f(?A $a, B|C $b) {}");
        let mut collector = NameCollector::default();
        collector.visit_program(&prog);
        assert_eq!(collector.names, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    }
}
