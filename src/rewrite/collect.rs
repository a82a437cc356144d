//! Registry of functions declared inside a namespace.
//!
//! Only these need their call sites flattened: a call to a global function
//! is already a flat name.

use std::collections::HashSet;

use crate::parser::ast::*;
use crate::span::Spanned;
use crate::visit::{walk_stmt, Visitor};

#[derive(Debug, Default, Clone)]
pub struct DeclarationRegistry {
    functions: HashSet<QualifiedName>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `stmt` if it declares a namespaced function. Returns whether
    /// anything was added.
    pub fn record(&mut self, stmt: &Stmt) -> bool {
        let Stmt::Function(func) = stmt else {
            return false;
        };
        match &func.namespaced_name {
            Some(name) if name.len() > 1 => {
                tracing::trace!(function = %name, "registered namespaced function");
                self.functions.insert(name.clone())
            }
            _ => false,
        }
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.functions.contains(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Collect every namespaced function in `program` before any rewriting
/// happens, so calls that precede their declaration are seen too.
pub fn collect_declarations(program: &Program) -> DeclarationRegistry {
    struct Collector {
        registry: DeclarationRegistry,
    }

    impl Visitor for Collector {
        fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
            self.registry.record(&stmt.node);
            walk_stmt(self, stmt);
        }
    }

    let mut collector = Collector { registry: DeclarationRegistry::new() };
    collector.visit_program(program);
    collector.registry
}
