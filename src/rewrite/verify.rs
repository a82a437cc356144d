//! Post-rewrite check that nothing the BPC dialect rejects survived.

use crate::diagnostics::CompileError;
use crate::parser::ast::*;
use crate::span::Span;
use crate::visit::composers::{find_expr, find_member, find_name, find_stmt};

/// Fail with the first construct that should have been rewritten away.
pub fn verify_flat(program: &Program) -> Result<(), CompileError> {
    let stmts = &program.stmts;

    let stmt = find_stmt(stmts, |s| {
        let what = match &s.node {
            Stmt::Namespace { .. } => "namespace block",
            Stmt::Use { .. } | Stmt::GroupUse { .. } => "use statement",
            Stmt::Declare { .. } => "declare statement",
            Stmt::Const(_) => "const statement",
            Stmt::Function(f) if f.return_type.is_some() => "function return type",
            _ => return None,
        };
        Some((what, s.span))
    });

    let member = || {
        find_member(stmts, |m| match &m.node {
            ClassMember::Method(method) if method.return_type.is_some() => Some(("method return type", m.span)),
            ClassMember::Const { modifiers, .. } if !modifiers.is_empty() => Some(("class constant modifier", m.span)),
            _ => None,
        })
    };

    let expr = || {
        find_expr(stmts, |e| {
            let what = match &e.node {
                Expr::BinOp { op: BinOp::Coalesce, .. } => "null-coalescing operator",
                Expr::CompoundAssign { op: AssignOp::Coalesce, .. } => "null-coalescing assignment",
                Expr::Ternary { then_expr: None, .. } => "short ternary",
                Expr::Array { kind: ArrayKind::Short, .. } | Expr::List { kind: ArrayKind::Short, .. } => {
                    "short array syntax"
                }
                Expr::Closure(c) if c.return_type.is_some() => "closure return type",
                Expr::ArrowFunction(a) if a.return_type.is_some() => "arrow function return type",
                _ => return None,
            };
            Some((what, e.span))
        })
    };

    let name = || {
        find_name(stmts, |n| {
            (!n.node.is_unqualified() || n.node.parts.len() > 1).then(|| ("qualified name", n.span))
        })
    };

    let violation: Option<(&str, Span)> = stmt.or_else(member).or_else(expr).or_else(name);
    match violation {
        Some((what, span)) => Err(CompileError::rewrite(format!("{what} survived rewriting"), span)),
        None => Ok(()),
    }
}
