//! Rewriting traversal.
//!
//! One depth-first walk over a [`Program`]: [`Transform::enter_stmt`] runs
//! before a statement's children are visited, the `leave_*` hooks run after
//! all children have been visited and, where rewritten, replaced. A leave
//! hook answers with a [`Rewrite`]:
//!
//! - `Keep` leaves the node where it is (hooks may have edited it in place),
//! - `Replace` substitutes a single node,
//! - `Splice` replaces the node with a sequence in its owning list,
//! - `Delete` removes the node and its subtree.
//!
//! `Splice` and `Delete` only make sense inside statement and class-member
//! lists. Returning them for an expression or a name is an error. Nodes
//! produced by a hook are not visited again.

use crate::diagnostics::CompileError;
use crate::parser::ast::*;
use crate::span::Spanned;

/// Outcome of a leave hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite<T> {
    Keep,
    Replace(T),
    Splice(Vec<T>),
    Delete,
}

/// What a name reference refers to. The resolver looks names up in a
/// different alias table for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameContext {
    Class,
    Function,
    Constant,
}

pub type HookResult<T> = Result<Rewrite<Spanned<T>>, CompileError>;

pub trait Transform {
    fn enter_stmt(&mut self, _stmt: &Spanned<Stmt>) -> Result<(), CompileError> {
        Ok(())
    }

    fn leave_stmt(&mut self, _stmt: &mut Spanned<Stmt>) -> HookResult<Stmt> {
        Ok(Rewrite::Keep)
    }

    fn leave_member(&mut self, _member: &mut Spanned<ClassMember>) -> HookResult<ClassMember> {
        Ok(Rewrite::Keep)
    }

    fn leave_expr(&mut self, _expr: &mut Spanned<Expr>) -> HookResult<Expr> {
        Ok(Rewrite::Keep)
    }

    fn leave_name(&mut self, _name: &mut Spanned<Name>, _context: NameContext) -> HookResult<Name> {
        Ok(Rewrite::Keep)
    }
}

pub fn transform_program<T: Transform>(t: &mut T, program: &mut Program) -> Result<(), CompileError> {
    transform_stmts(t, &mut program.stmts)
}

/// Walk a statement list, splicing hook results in at each statement's
/// original position.
pub fn transform_stmts<T: Transform>(t: &mut T, stmts: &mut Vec<Spanned<Stmt>>) -> Result<(), CompileError> {
    let original = std::mem::take(stmts);
    let mut out = Vec::with_capacity(original.len());
    for mut stmt in original {
        t.enter_stmt(&stmt)?;
        walk_stmt(t, &mut stmt)?;
        match t.leave_stmt(&mut stmt)? {
            Rewrite::Keep => out.push(stmt),
            Rewrite::Replace(new) => out.push(new),
            Rewrite::Splice(seq) => out.extend(seq),
            Rewrite::Delete => {}
        }
    }
    *stmts = out;
    Ok(())
}

fn transform_members<T: Transform>(
    t: &mut T,
    members: &mut Vec<Spanned<ClassMember>>,
) -> Result<(), CompileError> {
    let original = std::mem::take(members);
    let mut out = Vec::with_capacity(original.len());
    for mut member in original {
        walk_member(t, &mut member)?;
        match t.leave_member(&mut member)? {
            Rewrite::Keep => out.push(member),
            Rewrite::Replace(new) => out.push(new),
            Rewrite::Splice(seq) => out.extend(seq),
            Rewrite::Delete => {}
        }
    }
    *members = out;
    Ok(())
}

pub fn transform_expr<T: Transform>(t: &mut T, expr: &mut Spanned<Expr>) -> Result<(), CompileError> {
    walk_expr(t, expr)?;
    match t.leave_expr(expr)? {
        Rewrite::Keep => Ok(()),
        Rewrite::Replace(new) => {
            *expr = new;
            Ok(())
        }
        Rewrite::Splice(_) | Rewrite::Delete => Err(CompileError::rewrite(
            "an expression cannot be spliced or deleted",
            expr.span,
        )),
    }
}

fn transform_name<T: Transform>(
    t: &mut T,
    name: &mut Spanned<Name>,
    context: NameContext,
) -> Result<(), CompileError> {
    match t.leave_name(name, context)? {
        Rewrite::Keep => Ok(()),
        Rewrite::Replace(new) => {
            *name = new;
            Ok(())
        }
        Rewrite::Splice(_) | Rewrite::Delete => Err(CompileError::rewrite(
            format!("name '{}' cannot be spliced or deleted", name.node),
            name.span,
        )),
    }
}

fn transform_opt_expr<T: Transform>(t: &mut T, expr: &mut Option<Spanned<Expr>>) -> Result<(), CompileError> {
    match expr {
        Some(expr) => transform_expr(t, expr),
        None => Ok(()),
    }
}

fn transform_exprs<T: Transform>(t: &mut T, exprs: &mut [Spanned<Expr>]) -> Result<(), CompileError> {
    for expr in exprs {
        transform_expr(t, expr)?;
    }
    Ok(())
}

fn transform_type<T: Transform>(t: &mut T, ty: &mut TypeHint) -> Result<(), CompileError> {
    match ty {
        TypeHint::Builtin(_) => Ok(()),
        TypeHint::Named(name) => transform_name(t, name, NameContext::Class),
        TypeHint::Nullable(inner) => transform_type(t, inner),
        TypeHint::Union(types) => {
            for ty in types {
                transform_type(t, ty)?;
            }
            Ok(())
        }
    }
}

fn transform_signature<T: Transform>(
    t: &mut T,
    params: &mut [Param],
    return_type: &mut Option<Spanned<TypeHint>>,
) -> Result<(), CompileError> {
    for param in params {
        if let Some(ty) = &mut param.ty {
            transform_type(t, &mut ty.node)?;
        }
        transform_opt_expr(t, &mut param.default)?;
    }
    if let Some(ty) = return_type {
        transform_type(t, &mut ty.node)?;
    }
    Ok(())
}

fn walk_stmt<T: Transform>(t: &mut T, stmt: &mut Spanned<Stmt>) -> Result<(), CompileError> {
    match &mut stmt.node {
        Stmt::InlineHtml(_)
        | Stmt::Nop
        | Stmt::Use { .. }
        | Stmt::GroupUse { .. }
        | Stmt::Goto(_)
        | Stmt::Label(_)
        | Stmt::HaltCompiler(_) => Ok(()),
        Stmt::Namespace { stmts, .. } => transform_stmts(t, stmts),
        Stmt::Declare { directives, body } => {
            for directive in directives {
                transform_expr(t, &mut directive.value)?;
            }
            match body {
                Some(body) => transform_stmts(t, body),
                None => Ok(()),
            }
        }
        Stmt::Const(items) => {
            for item in items {
                transform_expr(t, &mut item.value)?;
            }
            Ok(())
        }
        Stmt::Function(func) => {
            transform_signature(t, &mut func.params, &mut func.return_type)?;
            transform_stmts(t, &mut func.body)
        }
        Stmt::ClassLike(class) => {
            for name in class.extends.iter_mut().chain(class.implements.iter_mut()) {
                transform_name(t, name, NameContext::Class)?;
            }
            transform_members(t, &mut class.members)
        }
        Stmt::Echo(exprs) | Stmt::Global(exprs) | Stmt::Unset(exprs) => transform_exprs(t, exprs),
        Stmt::Return(value) | Stmt::Break(value) | Stmt::Continue(value) => transform_opt_expr(t, value),
        Stmt::If { cond, then_branch, elseifs, else_branch } => {
            transform_expr(t, cond)?;
            transform_stmts(t, then_branch)?;
            for elseif in elseifs {
                transform_expr(t, &mut elseif.cond)?;
                transform_stmts(t, &mut elseif.body)?;
            }
            match else_branch {
                Some(else_branch) => transform_stmts(t, else_branch),
                None => Ok(()),
            }
        }
        Stmt::While { cond, body } => {
            transform_expr(t, cond)?;
            transform_stmts(t, body)
        }
        Stmt::DoWhile { body, cond } => {
            transform_stmts(t, body)?;
            transform_expr(t, cond)
        }
        Stmt::For { init, cond, step, body } => {
            transform_exprs(t, init)?;
            transform_exprs(t, cond)?;
            transform_exprs(t, step)?;
            transform_stmts(t, body)
        }
        Stmt::Foreach { subject, key, value, body, .. } => {
            transform_expr(t, subject)?;
            transform_opt_expr(t, key)?;
            transform_expr(t, value)?;
            transform_stmts(t, body)
        }
        Stmt::Switch { subject, cases } => {
            transform_expr(t, subject)?;
            for case in cases {
                transform_opt_expr(t, &mut case.test)?;
                transform_stmts(t, &mut case.body)?;
            }
            Ok(())
        }
        Stmt::StaticVars(vars) => {
            for var in vars {
                transform_opt_expr(t, &mut var.default)?;
            }
            Ok(())
        }
        Stmt::Throw(expr) | Stmt::Expr(expr) => transform_expr(t, expr),
        Stmt::Try { body, catches, finally } => {
            transform_stmts(t, body)?;
            for catch in catches {
                for ty in &mut catch.types {
                    transform_name(t, ty, NameContext::Class)?;
                }
                transform_stmts(t, &mut catch.body)?;
            }
            match finally {
                Some(finally) => transform_stmts(t, finally),
                None => Ok(()),
            }
        }
        Stmt::Block(stmts) => transform_stmts(t, stmts),
    }
}

fn walk_member<T: Transform>(t: &mut T, member: &mut Spanned<ClassMember>) -> Result<(), CompileError> {
    match &mut member.node {
        ClassMember::TraitUse(names) => {
            for name in names {
                transform_name(t, name, NameContext::Class)?;
            }
            Ok(())
        }
        ClassMember::Const { consts, .. } => {
            for item in consts {
                transform_expr(t, &mut item.value)?;
            }
            Ok(())
        }
        ClassMember::Property { ty, props, .. } => {
            if let Some(ty) = ty {
                transform_type(t, &mut ty.node)?;
            }
            for prop in props {
                transform_opt_expr(t, &mut prop.default)?;
            }
            Ok(())
        }
        ClassMember::Method(method) => {
            transform_signature(t, &mut method.params, &mut method.return_type)?;
            match &mut method.body {
                Some(body) => transform_stmts(t, body),
                None => Ok(()),
            }
        }
    }
}

fn walk_args<T: Transform>(t: &mut T, args: &mut [Arg]) -> Result<(), CompileError> {
    for arg in args {
        transform_expr(t, &mut arg.value)?;
    }
    Ok(())
}

fn walk_class_ref<T: Transform>(t: &mut T, class: &mut ClassRef) -> Result<(), CompileError> {
    match class {
        ClassRef::Name(name) => transform_name(t, name, NameContext::Class),
        ClassRef::Expr(expr) => transform_expr(t, expr),
    }
}

fn walk_member_name<T: Transform>(t: &mut T, member: &mut MemberName) -> Result<(), CompileError> {
    match member {
        MemberName::Ident(_) => Ok(()),
        MemberName::Expr(expr) => transform_expr(t, expr),
    }
}

fn walk_array_item<T: Transform>(t: &mut T, item: &mut ArrayItem) -> Result<(), CompileError> {
    transform_opt_expr(t, &mut item.key)?;
    transform_expr(t, &mut item.value)
}

fn walk_expr<T: Transform>(t: &mut T, expr: &mut Spanned<Expr>) -> Result<(), CompileError> {
    match &mut expr.node {
        Expr::Variable(_)
        | Expr::IntLit(_)
        | Expr::FloatLit(_)
        | Expr::StringLit(_)
        | Expr::TemplateLit(_)
        | Expr::DocString(_)
        | Expr::ShellExec(_)
        | Expr::MagicConst(_) => Ok(()),
        Expr::VariableVariable(inner) | Expr::YieldFrom(inner) => transform_expr(t, inner),
        Expr::Yield { key, value } => {
            if let Some(key) = key {
                transform_expr(t, key)?;
            }
            match value {
                Some(value) => transform_expr(t, value),
                None => Ok(()),
            }
        }
        Expr::ConstFetch(name) => transform_name(t, name, NameContext::Constant),
        Expr::ClassConstFetch { class, .. } | Expr::StaticPropertyFetch { class, .. } => walk_class_ref(t, class),
        Expr::Array { items, .. } => {
            for item in items {
                walk_array_item(t, item)?;
            }
            Ok(())
        }
        Expr::List { items, .. } => {
            for item in items.iter_mut().flatten() {
                walk_array_item(t, item)?;
            }
            Ok(())
        }
        Expr::Call { callee, args } => {
            match callee {
                Callee::Name(name) => transform_name(t, name, NameContext::Function)?,
                Callee::Expr(callee) => transform_expr(t, callee)?,
            }
            walk_args(t, args)
        }
        Expr::MethodCall { object, method, args } => {
            transform_expr(t, object)?;
            walk_member_name(t, method)?;
            walk_args(t, args)
        }
        Expr::StaticCall { class, method, args } => {
            walk_class_ref(t, class)?;
            walk_member_name(t, method)?;
            walk_args(t, args)
        }
        Expr::PropertyFetch { object, property } => {
            transform_expr(t, object)?;
            walk_member_name(t, property)
        }
        Expr::Index { object, index } => {
            transform_expr(t, object)?;
            match index {
                Some(index) => transform_expr(t, index),
                None => Ok(()),
            }
        }
        Expr::New { class, args } => {
            walk_class_ref(t, class)?;
            walk_args(t, args)
        }
        Expr::Clone(inner) | Expr::Empty(inner) | Expr::Print(inner) => transform_expr(t, inner),
        Expr::Closure(closure) => {
            transform_signature(t, &mut closure.params, &mut closure.return_type)?;
            transform_stmts(t, &mut closure.body)
        }
        Expr::ArrowFunction(arrow) => {
            transform_signature(t, &mut arrow.params, &mut arrow.return_type)?;
            transform_expr(t, &mut arrow.body)
        }
        Expr::Ternary { cond, then_expr, else_expr } => {
            transform_expr(t, cond)?;
            if let Some(then_expr) = then_expr {
                transform_expr(t, then_expr)?;
            }
            transform_expr(t, else_expr)
        }
        Expr::BinOp { lhs, rhs, .. } => {
            transform_expr(t, lhs)?;
            transform_expr(t, rhs)
        }
        Expr::UnaryOp { operand, .. } => transform_expr(t, operand),
        Expr::IncDec { target, .. } => transform_expr(t, target),
        Expr::Cast { expr, .. } | Expr::Include { expr, .. } => transform_expr(t, expr),
        Expr::Assign { target, value, .. } | Expr::CompoundAssign { target, value, .. } => {
            transform_expr(t, target)?;
            transform_expr(t, value)
        }
        Expr::Instanceof { expr, class } => {
            transform_expr(t, expr)?;
            walk_class_ref(t, class)
        }
        Expr::Isset(vars) => transform_exprs(t, vars),
        Expr::Exit(status) => match status {
            Some(status) => transform_expr(t, status),
            None => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn parse(src: &str) -> Program {
        let tokens = lex(src).unwrap();
        Parser::new(&tokens, src).parse_program().unwrap()
    }

    /// Records the order hooks fire in.
    #[derive(Default)]
    struct Tracer {
        events: Vec<String>,
    }

    impl Transform for Tracer {
        fn enter_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), CompileError> {
            if let Stmt::Function(f) = &stmt.node {
                self.events.push(format!("enter {}", f.name.node));
            }
            Ok(())
        }

        fn leave_stmt(&mut self, stmt: &mut Spanned<Stmt>) -> HookResult<Stmt> {
            if let Stmt::Function(f) = &stmt.node {
                self.events.push(format!("leave {}", f.name.node));
            }
            Ok(Rewrite::Keep)
        }

        fn leave_name(&mut self, name: &mut Spanned<Name>, context: NameContext) -> HookResult<Name> {
            self.events.push(format!("name {} {context:?}", name.node));
            Ok(Rewrite::Keep)
        }
    }

    #[test]
    fn test_enter_before_children_leave_after() {
        let mut prog = parse("<?php function outer() { inner(); }");
        let mut tracer = Tracer::default();
        transform_program(&mut tracer, &mut prog).unwrap();
        assert_eq!(tracer.events, vec!["enter outer", "name inner Function", "leave outer"]);
    }

    #[test]
    fn test_name_contexts() {
        let mut prog = parse("<?php new A(B); C::x();");
        let mut tracer = Tracer::default();
        transform_program(&mut tracer, &mut prog).unwrap();
        assert_eq!(tracer.events, vec!["name A Class", "name B Constant", "name C Class"]);
    }

    /// Splices every `echo` into two and drops `return`.
    struct Doubler;

    impl Transform for Doubler {
        fn leave_stmt(&mut self, stmt: &mut Spanned<Stmt>) -> HookResult<Stmt> {
            match &stmt.node {
                Stmt::Echo(_) => Ok(Rewrite::Splice(vec![stmt.clone(), stmt.clone()])),
                Stmt::Return(_) => Ok(Rewrite::Delete),
                _ => Ok(Rewrite::Keep),
            }
        }
    }

    #[test]
    fn test_splice_and_delete_preserve_sibling_order() {
        let mut prog = parse("<?php $a = 1; echo 1; return; $b = 2;");
        transform_program(&mut Doubler, &mut prog).unwrap();
        let kinds: Vec<&str> = prog
            .stmts
            .iter()
            .map(|s| match s.node {
                Stmt::Echo(_) => "echo",
                Stmt::Expr(_) => "expr",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["expr", "echo", "echo", "expr"]);
    }

    #[test]
    fn test_splice_inside_nested_body() {
        let mut prog = parse("<?php if ($x) { echo 1; }");
        transform_program(&mut Doubler, &mut prog).unwrap();
        let Stmt::If { then_branch, .. } = &prog.stmts[0].node else { panic!() };
        assert_eq!(then_branch.len(), 2);
    }

    /// Replaces every integer literal with `0`, bottom-up.
    struct Zeroer {
        replaced: usize,
    }

    impl Transform for Zeroer {
        fn leave_expr(&mut self, expr: &mut Spanned<Expr>) -> HookResult<Expr> {
            if matches!(&expr.node, Expr::IntLit(raw) if raw != "0") {
                self.replaced += 1;
                return Ok(Rewrite::Replace(Spanned::new(Expr::IntLit("0".into()), expr.span)));
            }
            Ok(Rewrite::Keep)
        }
    }

    #[test]
    fn test_replace_expression_in_place() {
        let mut prog = parse("<?php $a = [1, 2 + 3];");
        let mut zeroer = Zeroer { replaced: 0 };
        transform_program(&mut zeroer, &mut prog).unwrap();
        assert_eq!(zeroer.replaced, 3);
    }

    struct DeleteExpr;

    impl Transform for DeleteExpr {
        fn leave_expr(&mut self, expr: &mut Spanned<Expr>) -> HookResult<Expr> {
            match expr.node {
                Expr::Variable(_) => Ok(Rewrite::Delete),
                _ => Ok(Rewrite::Keep),
            }
        }
    }

    #[test]
    fn test_delete_in_expression_position_is_an_error() {
        let src = "<?php echo $a;";
        let mut prog = parse(src);
        let err = transform_program(&mut DeleteExpr, &mut prog).unwrap_err();
        assert!(matches!(err, CompileError::Rewrite { .. }));
        let span = err.span().unwrap();
        assert_eq!(&src[span.start..span.end], "$a");
    }

    struct DropConstMembers;

    impl Transform for DropConstMembers {
        fn leave_member(&mut self, member: &mut Spanned<ClassMember>) -> HookResult<ClassMember> {
            match member.node {
                ClassMember::Const { .. } => Ok(Rewrite::Delete),
                _ => Ok(Rewrite::Keep),
            }
        }
    }

    #[test]
    fn test_member_list_accepts_delete() {
        let mut prog = parse("<?php class A { const X = 1; public $y; }");
        transform_program(&mut DropConstMembers, &mut prog).unwrap();
        let Stmt::ClassLike(class) = &prog.stmts[0].node else { panic!() };
        assert_eq!(class.members.len(), 1);
    }
}
