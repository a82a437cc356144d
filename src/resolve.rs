//! Namespace-aware name resolution.
//!
//! Rewrites every name reference into the fully qualified form the source
//! dialect would bind it to, and stamps declarations with their namespaced
//! name. Unqualified function and constant references inside a namespace
//! are the exception: the source dialect falls back to the global name at
//! runtime when `ns\name` does not exist, so they are left as written and
//! only get the `namespaced` candidate attached.

use std::collections::HashMap;

use crate::diagnostics::CompileError;
use crate::parser::ast::*;
use crate::span::Spanned;
use crate::traverse::{transform_program, HookResult, NameContext, Rewrite, Transform};

/// Resolve all names in `program` in place.
pub fn resolve_names(program: &mut Program) -> Result<(), CompileError> {
    let mut resolver = NameResolver::default();
    transform_program(&mut resolver, program)?;
    tracing::debug!(resolved = resolver.resolved, "name resolution finished");
    Ok(())
}

/// Import tables for the namespace currently being walked.
#[derive(Debug, Default)]
struct Aliases {
    /// Keyed by lowercased alias.
    classes: HashMap<String, QualifiedName>,
    /// Keyed by lowercased alias.
    functions: HashMap<String, QualifiedName>,
    /// Constant aliases are case-sensitive.
    constants: HashMap<String, QualifiedName>,
}

impl Aliases {
    fn add(&mut self, kind: UseKind, item: &UseItem, prefix: Option<&Name>) -> Result<(), CompileError> {
        let target = QualifiedName::concat(prefix.map(Name::to_qualified).as_ref(), &item.name.node.parts);
        let alias = item.binding_name().to_string();
        let table = match kind {
            UseKind::Normal => &mut self.classes,
            UseKind::Function => &mut self.functions,
            UseKind::Const => {
                self.constants.insert(alias, target);
                return Ok(());
            }
            UseKind::Mixed => {
                return Err(CompileError::rewrite(
                    format!("import '{}' has no kind", item.name.node),
                    item.name.span,
                ))
            }
        };
        table.insert(alias.to_ascii_lowercase(), target);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct NameResolver {
    namespace: Option<QualifiedName>,
    aliases: Aliases,
    resolved: usize,
}

impl NameResolver {
    fn declared(&self, name: &str) -> QualifiedName {
        QualifiedName::concat(self.namespace.as_ref(), &[name.to_string()])
    }

    fn prefixed(&self, parts: &[String]) -> QualifiedName {
        QualifiedName::concat(self.namespace.as_ref(), parts)
    }

    /// Qualified names bind their first segment through the class imports.
    fn resolve_qualified(&self, parts: &[String]) -> QualifiedName {
        let Some((first, rest)) = parts.split_first() else {
            return self.prefixed(parts);
        };
        match self.aliases.classes.get(&first.to_ascii_lowercase()) {
            Some(target) => QualifiedName::concat(Some(target), rest),
            None => self.prefixed(parts),
        }
    }

    fn resolve_class(&self, name: &Name) -> Option<QualifiedName> {
        if name.is_special_class_name() {
            return None;
        }
        match name.kind {
            NameKind::FullyQualified => None,
            NameKind::Relative => Some(self.prefixed(&name.parts)),
            NameKind::Unqualified | NameKind::Qualified => Some(self.resolve_qualified(&name.parts)),
        }
    }

    /// Returns the new name, or `None` when the name is kept as is.
    fn resolve_other(&self, name: &Name, context: NameContext) -> Option<Name> {
        match name.kind {
            NameKind::FullyQualified => None,
            NameKind::Relative => Some(Name::fully_qualified(self.prefixed(&name.parts))),
            NameKind::Qualified => Some(Name::fully_qualified(self.resolve_qualified(&name.parts))),
            NameKind::Unqualified => {
                let alias = match context {
                    NameContext::Constant => self.aliases.constants.get(name.first()),
                    _ => self.aliases.functions.get(&name.first().to_ascii_lowercase()),
                };
                if let Some(target) = alias {
                    return Some(Name::fully_qualified(target.clone()));
                }
                let is_literal = context == NameContext::Constant
                    && matches!(name.first().to_ascii_lowercase().as_str(), "true" | "false" | "null");
                if self.namespace.is_none() || is_literal {
                    return Some(Name::fully_qualified(name.to_qualified()));
                }
                let mut kept = name.clone();
                kept.namespaced = Some(self.prefixed(&name.parts));
                Some(kept)
            }
        }
    }
}

impl Transform for NameResolver {
    fn enter_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), CompileError> {
        match &stmt.node {
            Stmt::Namespace { name, .. } => {
                self.namespace = name.as_ref().map(|n| n.node.to_qualified());
                self.aliases = Aliases::default();
            }
            Stmt::Use { kind, uses } => {
                for item in uses {
                    self.aliases.add(item.kind.unwrap_or(*kind), item, None)?;
                }
            }
            Stmt::GroupUse { kind, prefix, uses } => {
                for item in uses {
                    self.aliases.add(item.kind.unwrap_or(*kind), item, Some(&prefix.node))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn leave_stmt(&mut self, stmt: &mut Spanned<Stmt>) -> HookResult<Stmt> {
        match &mut stmt.node {
            Stmt::Namespace { .. } => {
                self.namespace = None;
                self.aliases = Aliases::default();
            }
            Stmt::Function(func) => {
                func.namespaced_name = Some(self.declared(&func.name.node));
            }
            Stmt::ClassLike(class) => {
                class.namespaced_name = Some(self.declared(&class.name.node));
            }
            Stmt::Const(items) => {
                for item in items {
                    item.namespaced_name = Some(self.declared(&item.name.node));
                }
            }
            _ => {}
        }
        Ok(Rewrite::Keep)
    }

    fn leave_name(&mut self, name: &mut Spanned<Name>, context: NameContext) -> HookResult<Name> {
        let resolved = match context {
            NameContext::Class => self.resolve_class(&name.node).map(Name::fully_qualified),
            NameContext::Function | NameContext::Constant => self.resolve_other(&name.node, context),
        };
        if let Some(resolved) = resolved {
            tracing::trace!(from = %name.node, to = %resolved, "resolved name");
            self.resolved += 1;
            name.node = resolved;
        }
        Ok(Rewrite::Keep)
    }
}
