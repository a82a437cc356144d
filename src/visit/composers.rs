//! Composition utilities for common visitor patterns.
//!
//! Helpers for finding, counting and collecting nodes without writing a
//! visitor struct each time.
//!
//! ```
//! use phptobpc::parser::ast::{BinOp, Expr, Stmt};
//! use phptobpc::visit::composers::{count_stmts, find_expr};
//!
//! let program = phptobpc::parse_source("<?php echo $a ?? 1; echo 2;").unwrap();
//! assert_eq!(count_stmts(&program.stmts, |s| matches!(s, Stmt::Echo(_))), 2);
//! let coalesce = find_expr(&program.stmts, |e| {
//!     matches!(e.node, Expr::BinOp { op: BinOp::Coalesce, .. }).then_some(e.span)
//! });
//! assert!(coalesce.is_some());
//! ```

use crate::parser::ast::*;
use crate::span::Spanned;
use crate::visit::{walk_expr, walk_member, walk_stmt, Visitor};

// ============================================================================
// Detection / Counting
// ============================================================================

/// Check if an expression tree contains any expression matching a predicate.
pub fn contains_expr<F>(expr: &Spanned<Expr>, predicate: F) -> bool
where
    F: Fn(&Expr) -> bool,
{
    struct Detector<F> {
        predicate: F,
        found: bool,
    }

    impl<F> Visitor for Detector<F>
    where
        F: Fn(&Expr) -> bool,
    {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if self.found {
                return;
            }
            if (self.predicate)(&expr.node) {
                self.found = true;
                return;
            }
            walk_expr(self, expr);
        }
    }

    let mut detector = Detector { predicate, found: false };
    detector.visit_expr(expr);
    detector.found
}

/// Count statements matching a predicate, nested bodies included.
pub fn count_stmts<F>(stmts: &[Spanned<Stmt>], predicate: F) -> usize
where
    F: Fn(&Stmt) -> bool,
{
    struct Counter<F> {
        predicate: F,
        count: usize,
    }

    impl<F> Visitor for Counter<F>
    where
        F: Fn(&Stmt) -> bool,
    {
        fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
            if (self.predicate)(&stmt.node) {
                self.count += 1;
            }
            walk_stmt(self, stmt);
        }
    }

    let mut counter = Counter { predicate, count: 0 };
    for stmt in stmts {
        counter.visit_stmt(stmt);
    }
    counter.count
}

// ============================================================================
// Collection
// ============================================================================

/// Collect values from every expression the mapper accepts, in visit order.
pub fn collect_exprs<F, T>(stmts: &[Spanned<Stmt>], mapper: F) -> Vec<T>
where
    F: Fn(&Expr) -> Option<T>,
{
    struct Collector<F, T> {
        mapper: F,
        items: Vec<T>,
    }

    impl<F, T> Visitor for Collector<F, T>
    where
        F: Fn(&Expr) -> Option<T>,
    {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if let Some(item) = (self.mapper)(&expr.node) {
                self.items.push(item);
            }
            walk_expr(self, expr);
        }
    }

    let mut collector = Collector { mapper, items: Vec::new() };
    for stmt in stmts {
        collector.visit_stmt(stmt);
    }
    collector.items
}

/// Every name reference, rendered with `\` separators.
pub fn collect_names(stmts: &[Spanned<Stmt>]) -> Vec<String> {
    #[derive(Default)]
    struct Collector {
        names: Vec<String>,
    }

    impl Visitor for Collector {
        fn visit_name(&mut self, name: &Spanned<Name>) {
            self.names.push(name.node.to_string());
        }
    }

    let mut collector = Collector::default();
    for stmt in stmts {
        collector.visit_stmt(stmt);
    }
    collector.names
}

// ============================================================================
// Find Helpers
// ============================================================================

// Each finder stops at the first node the mapper accepts and returns the
// mapped value, so callers extract spans or messages instead of borrowing
// into the tree.

/// First statement the mapper accepts, in pre-order.
pub fn find_stmt<F, T>(stmts: &[Spanned<Stmt>], mapper: F) -> Option<T>
where
    F: Fn(&Spanned<Stmt>) -> Option<T>,
{
    struct Finder<F, T> {
        mapper: F,
        found: Option<T>,
    }

    impl<F, T> Visitor for Finder<F, T>
    where
        F: Fn(&Spanned<Stmt>) -> Option<T>,
    {
        fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
            if self.found.is_some() {
                return;
            }
            self.found = (self.mapper)(stmt);
            if self.found.is_none() {
                walk_stmt(self, stmt);
            }
        }
    }

    let mut finder = Finder { mapper, found: None };
    for stmt in stmts {
        finder.visit_stmt(stmt);
    }
    finder.found
}

/// First expression the mapper accepts, in pre-order.
pub fn find_expr<F, T>(stmts: &[Spanned<Stmt>], mapper: F) -> Option<T>
where
    F: Fn(&Spanned<Expr>) -> Option<T>,
{
    struct Finder<F, T> {
        mapper: F,
        found: Option<T>,
    }

    impl<F, T> Visitor for Finder<F, T>
    where
        F: Fn(&Spanned<Expr>) -> Option<T>,
    {
        fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
            if self.found.is_none() {
                walk_stmt(self, stmt);
            }
        }

        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if self.found.is_some() {
                return;
            }
            self.found = (self.mapper)(expr);
            if self.found.is_none() {
                walk_expr(self, expr);
            }
        }
    }

    let mut finder = Finder { mapper, found: None };
    for stmt in stmts {
        finder.visit_stmt(stmt);
    }
    finder.found
}

/// First class member the mapper accepts.
pub fn find_member<F, T>(stmts: &[Spanned<Stmt>], mapper: F) -> Option<T>
where
    F: Fn(&Spanned<ClassMember>) -> Option<T>,
{
    struct Finder<F, T> {
        mapper: F,
        found: Option<T>,
    }

    impl<F, T> Visitor for Finder<F, T>
    where
        F: Fn(&Spanned<ClassMember>) -> Option<T>,
    {
        fn visit_member(&mut self, member: &Spanned<ClassMember>) {
            if self.found.is_some() {
                return;
            }
            self.found = (self.mapper)(member);
            if self.found.is_none() {
                walk_member(self, member);
            }
        }
    }

    let mut finder = Finder { mapper, found: None };
    for stmt in stmts {
        finder.visit_stmt(stmt);
    }
    finder.found
}

/// First name reference the mapper accepts.
pub fn find_name<F, T>(stmts: &[Spanned<Stmt>], mapper: F) -> Option<T>
where
    F: Fn(&Spanned<Name>) -> Option<T>,
{
    struct Finder<F, T> {
        mapper: F,
        found: Option<T>,
    }

    impl<F, T> Visitor for Finder<F, T>
    where
        F: Fn(&Spanned<Name>) -> Option<T>,
    {
        fn visit_name(&mut self, name: &Spanned<Name>) {
            if self.found.is_none() {
                self.found = (self.mapper)(name);
            }
        }
    }

    let mut finder = Finder { mapper, found: None };
    for stmt in stmts {
        finder.visit_stmt(stmt);
    }
    finder.found
}

// ============================================================================
// Tests
// ============================================================================
