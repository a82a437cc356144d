use crate::parser::ast::*;
use crate::parser::{
    infix_binding_power, BP_ASSIGN_RHS, BP_CLONE_OPERAND, BP_INSTANCEOF, BP_NOT_OPERAND, BP_PRINT_OPERAND,
    BP_TERNARY, BP_UNARY_OPERAND,
};
use crate::span::Spanned;

/// Pretty-print a `Program` back into source text that re-parses to the
/// same tree.
pub fn pretty_print(program: &Program) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_program(program);
    pp.buf
}

/// Where an expression sits: the binding power the parser resumes with on
/// its left, and the left binding power of the operator that follows it
/// (0 when nothing does).
#[derive(Debug, Clone, Copy)]
struct Ctx {
    min_bp: u8,
    follow: u8,
}

const FREE: Ctx = Ctx { min_bp: 0, follow: 0 };

impl Ctx {
    fn new(min_bp: u8, follow: u8) -> Self {
        Self { min_bp, follow }
    }
}

struct PrettyPrinter {
    buf: String,
    indent: usize,
    // raw data after `__halt_compiler();` ends the output
    halted: bool,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self {
            buf: String::new(),
            indent: 0,
            halted: false,
        }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn dedent(&mut self) {
        self.indent -= 1;
    }

    // ── Program ──────────────────────────────────────────────────────

    fn emit_program(&mut self, program: &Program) {
        let mut stmts = program.stmts.as_slice();
        // Leading inline HTML is printed before the open tag.
        if let Some((Spanned { node: Stmt::InlineHtml(html), .. }, rest)) = stmts.split_first() {
            self.write(html);
            if rest.iter().all(|s| matches!(s.node, Stmt::Nop)) {
                return;
            }
            stmts = rest;
        }
        self.write("<?php\n");
        for stmt in stmts {
            if matches!(stmt.node, Stmt::Nop) {
                continue;
            }
            self.newline();
            self.emit_stmt(&stmt.node);
        }
        if !self.halted {
            self.newline();
        }
    }

    /// Each statement on its own line, one level deeper than the caller.
    fn emit_body_lines(&mut self, stmts: &[Spanned<Stmt>]) {
        self.indent();
        for stmt in stmts {
            if matches!(stmt.node, Stmt::Nop) {
                continue;
            }
            self.newline();
            self.write_indent();
            self.emit_stmt(&stmt.node);
        }
        self.dedent();
    }

    /// `{ ... }` opening on the current line.
    fn emit_block(&mut self, stmts: &[Spanned<Stmt>]) {
        self.write("{");
        self.emit_body_lines(stmts);
        self.newline();
        self.write_indent();
        self.write("}");
    }

    /// `{ ... }` opening on its own line, for declarations.
    fn emit_decl_block(&mut self, stmts: &[Spanned<Stmt>]) {
        self.newline();
        self.write_indent();
        self.emit_block(stmts);
    }

    // ── Statements ───────────────────────────────────────────────────

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::InlineHtml(html) => {
                self.write("?>\n");
                self.write(html);
                self.write("<?php");
            }
            Stmt::Namespace { name, stmts, braced } => {
                self.write("namespace");
                if let Some(name) = name {
                    self.write(" ");
                    self.emit_name(&name.node);
                }
                if *braced {
                    self.write(" ");
                    self.emit_block(stmts);
                } else {
                    self.write(";");
                    for stmt in stmts.iter().filter(|s| !matches!(s.node, Stmt::Nop)) {
                        self.newline();
                        self.write_indent();
                        self.emit_stmt(&stmt.node);
                    }
                }
            }
            Stmt::Use { kind, uses } => {
                self.write("use ");
                self.write(use_kind_prefix(*kind));
                for (i, item) in uses.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_use_item(item);
                }
                self.write(";");
            }
            Stmt::GroupUse { kind, prefix, uses } => {
                self.write("use ");
                self.write(use_kind_prefix(*kind));
                self.emit_name(&prefix.node);
                self.write("\\{");
                for (i, item) in uses.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(kind) = item.kind {
                        self.write(use_kind_prefix(kind));
                    }
                    self.emit_use_item(item);
                }
                self.write("};");
            }
            Stmt::Declare { directives, body } => {
                self.write("declare(");
                for (i, directive) in directives.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write(&directive.key);
                    self.write("=");
                    self.emit_expr(&directive.value.node, FREE);
                }
                self.write(")");
                match body {
                    Some(body) => {
                        self.write(" ");
                        self.emit_block(body);
                    }
                    None => self.write(";"),
                }
            }
            Stmt::Const(items) => {
                self.write("const ");
                self.emit_const_items(items);
                self.write(";");
            }
            Stmt::Function(func) => self.emit_function(func),
            Stmt::ClassLike(class) => self.emit_class_like(class),
            Stmt::Echo(exprs) => {
                self.write("echo ");
                self.emit_expr_list(exprs);
                self.write(";");
            }
            Stmt::Return(value) => self.emit_keyword_stmt("return", value.as_ref()),
            Stmt::Break(depth) => self.emit_keyword_stmt("break", depth.as_ref()),
            Stmt::Continue(depth) => self.emit_keyword_stmt("continue", depth.as_ref()),
            Stmt::If { cond, then_branch, elseifs, else_branch } => {
                self.write("if (");
                self.emit_expr(&cond.node, FREE);
                self.write(") ");
                self.emit_block(then_branch);
                for elseif in elseifs {
                    self.write(" elseif (");
                    self.emit_expr(&elseif.cond.node, FREE);
                    self.write(") ");
                    self.emit_block(&elseif.body);
                }
                if let Some(else_branch) = else_branch {
                    self.write(" else ");
                    // `else if` keeps its nested form
                    match else_branch.as_slice() {
                        [Spanned { node: nested @ Stmt::If { .. }, .. }] => self.emit_stmt(nested),
                        _ => self.emit_block(else_branch),
                    }
                }
            }
            Stmt::While { cond, body } => {
                self.write("while (");
                self.emit_expr(&cond.node, FREE);
                self.write(") ");
                self.emit_block(body);
            }
            Stmt::DoWhile { body, cond } => {
                self.write("do ");
                self.emit_block(body);
                self.write(" while (");
                self.emit_expr(&cond.node, FREE);
                self.write(");");
            }
            Stmt::For { init, cond, step, body } => {
                self.write("for (");
                self.emit_expr_list(init);
                self.write("; ");
                self.emit_expr_list(cond);
                self.write("; ");
                self.emit_expr_list(step);
                self.write(") ");
                self.emit_block(body);
            }
            Stmt::Foreach { subject, key, by_ref, value, body } => {
                self.write("foreach (");
                self.emit_expr(&subject.node, FREE);
                self.write(" as ");
                if let Some(key) = key {
                    self.emit_expr(&key.node, FREE);
                    self.write(" => ");
                }
                if *by_ref {
                    self.write("&");
                }
                self.emit_expr(&value.node, FREE);
                self.write(") ");
                self.emit_block(body);
            }
            Stmt::Switch { subject, cases } => {
                self.write("switch (");
                self.emit_expr(&subject.node, FREE);
                self.write(") {");
                self.indent();
                for case in cases {
                    self.newline();
                    self.write_indent();
                    match &case.test {
                        Some(test) => {
                            self.write("case ");
                            self.emit_expr(&test.node, FREE);
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.emit_body_lines(&case.body);
                }
                self.dedent();
                self.newline();
                self.write_indent();
                self.write("}");
            }
            Stmt::Global(vars) => {
                self.write("global ");
                self.emit_expr_list(vars);
                self.write(";");
            }
            Stmt::StaticVars(vars) => {
                self.write("static ");
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write("$");
                    self.write(&var.name.node);
                    if let Some(default) = &var.default {
                        self.write(" = ");
                        self.emit_expr(&default.node, FREE);
                    }
                }
                self.write(";");
            }
            Stmt::Unset(targets) => {
                self.write("unset(");
                self.emit_expr_list(targets);
                self.write(");");
            }
            Stmt::Throw(value) => {
                self.write("throw ");
                self.emit_expr(&value.node, FREE);
                self.write(";");
            }
            Stmt::Try { body, catches, finally } => {
                self.write("try ");
                self.emit_block(body);
                for catch in catches {
                    self.write(" catch (");
                    for (i, ty) in catch.types.iter().enumerate() {
                        if i > 0 {
                            self.write("|");
                        }
                        self.emit_name(&ty.node);
                    }
                    if let Some(var) = &catch.var {
                        self.write(" $");
                        self.write(&var.node);
                    }
                    self.write(") ");
                    self.emit_block(&catch.body);
                }
                if let Some(finally) = finally {
                    self.write(" finally ");
                    self.emit_block(finally);
                }
            }
            Stmt::Block(stmts) => self.emit_block(stmts),
            Stmt::Expr(expr) => {
                self.emit_expr(&expr.node, FREE);
                self.write(";");
            }
            Stmt::Goto(label) => {
                self.write("goto ");
                self.write(&label.node);
                self.write(";");
            }
            Stmt::Label(label) => {
                self.write(&label.node);
                self.write(":");
            }
            Stmt::HaltCompiler(data) => {
                self.write("__halt_compiler();");
                self.write(data);
                self.halted = true;
            }
            Stmt::Nop => self.write(";"),
        }
    }

    fn emit_keyword_stmt(&mut self, keyword: &str, value: Option<&Spanned<Expr>>) {
        self.write(keyword);
        if let Some(value) = value {
            self.write(" ");
            self.emit_expr(&value.node, FREE);
        }
        self.write(";");
    }

    fn emit_use_item(&mut self, item: &UseItem) {
        self.emit_name(&item.name.node);
        if let Some(alias) = &item.alias {
            self.write(" as ");
            self.write(alias);
        }
    }

    fn emit_const_items(&mut self, items: &[ConstItem]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&item.name.node);
            self.write(" = ");
            self.emit_expr(&item.value.node, FREE);
        }
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn emit_function(&mut self, func: &Function) {
        self.write("function ");
        if func.by_ref {
            self.write("&");
        }
        self.write(&func.name.node);
        self.emit_params(&func.params);
        self.emit_return_type(func.return_type.as_ref());
        self.emit_decl_block(&func.body);
    }

    fn emit_class_like(&mut self, class: &ClassLike) {
        self.emit_modifiers(&class.modifiers);
        self.write(match class.kind {
            ClassKind::Class => "class ",
            ClassKind::Interface => "interface ",
            ClassKind::Trait => "trait ",
        });
        self.write(&class.name.node);
        if !class.extends.is_empty() {
            self.write(" extends ");
            self.emit_name_list(&class.extends);
        }
        if !class.implements.is_empty() {
            self.write(" implements ");
            self.emit_name_list(&class.implements);
        }
        self.newline();
        self.write_indent();
        self.write("{");
        self.indent();
        for member in &class.members {
            self.newline();
            self.write_indent();
            self.emit_member(&member.node);
        }
        self.dedent();
        self.newline();
        self.write_indent();
        self.write("}");
    }

    fn emit_member(&mut self, member: &ClassMember) {
        match member {
            ClassMember::TraitUse(traits) => {
                self.write("use ");
                self.emit_name_list(traits);
                self.write(";");
            }
            ClassMember::Const { modifiers, consts } => {
                self.emit_modifiers(modifiers);
                self.write("const ");
                self.emit_const_items(consts);
                self.write(";");
            }
            ClassMember::Property { modifiers, is_var, ty, props } => {
                if *is_var {
                    self.write("var ");
                }
                self.emit_modifiers(modifiers);
                if let Some(ty) = ty {
                    self.emit_type(&ty.node);
                    self.write(" ");
                }
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write("$");
                    self.write(&prop.name.node);
                    if let Some(default) = &prop.default {
                        self.write(" = ");
                        self.emit_expr(&default.node, FREE);
                    }
                }
                self.write(";");
            }
            ClassMember::Method(method) => {
                self.emit_modifiers(&method.modifiers);
                self.write("function ");
                if method.by_ref {
                    self.write("&");
                }
                self.write(&method.name.node);
                self.emit_params(&method.params);
                self.emit_return_type(method.return_type.as_ref());
                match &method.body {
                    Some(body) => self.emit_decl_block(body),
                    None => self.write(";"),
                }
            }
        }
    }

    fn emit_modifiers(&mut self, modifiers: &Modifiers) {
        if modifiers.is_abstract {
            self.write("abstract ");
        }
        if modifiers.is_final {
            self.write("final ");
        }
        match modifiers.visibility {
            Some(Visibility::Public) => self.write("public "),
            Some(Visibility::Protected) => self.write("protected "),
            Some(Visibility::Private) => self.write("private "),
            None => {}
        }
        if modifiers.is_static {
            self.write("static ");
        }
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if let Some(ty) = &param.ty {
                self.emit_type(&ty.node);
                self.write(" ");
            }
            if param.by_ref {
                self.write("&");
            }
            if param.variadic {
                self.write("...");
            }
            self.write("$");
            self.write(&param.name.node);
            if let Some(default) = &param.default {
                self.write(" = ");
                self.emit_expr(&default.node, FREE);
            }
        }
        self.write(")");
    }

    fn emit_return_type(&mut self, return_type: Option<&Spanned<TypeHint>>) {
        if let Some(ty) = return_type {
            self.write(": ");
            self.emit_type(&ty.node);
        }
    }

    fn emit_type(&mut self, ty: &TypeHint) {
        match ty {
            TypeHint::Builtin(name) => self.write(name),
            TypeHint::Named(name) => self.emit_name(&name.node),
            TypeHint::Nullable(inner) => {
                self.write("?");
                self.emit_type(inner);
            }
            TypeHint::Union(types) => {
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        self.write("|");
                    }
                    self.emit_type(ty);
                }
            }
        }
    }

    fn emit_name(&mut self, name: &Name) {
        match name.kind {
            NameKind::FullyQualified => self.write("\\"),
            NameKind::Relative => self.write("namespace\\"),
            NameKind::Unqualified | NameKind::Qualified => {}
        }
        self.write(&name.parts.join("\\"));
    }

    fn emit_name_list(&mut self, names: &[Spanned<Name>]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_name(&name.node);
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn emit_expr_list(&mut self, exprs: &[Spanned<Expr>]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expr(&expr.node, FREE);
        }
    }

    fn emit_args(&mut self, args: &[Arg]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if arg.unpack {
                self.write("...");
            }
            self.emit_expr(&arg.value.node, FREE);
        }
        self.write(")");
    }

    fn emit_parenthesized(&mut self, expr: &Expr) {
        self.write("(");
        self.emit_expr(expr, FREE);
        self.write(")");
    }

    /// Operand of `->`, `[`, `(` or `::`.
    fn emit_postfix_operand(&mut self, expr: &Expr) {
        if is_postfix_operand(expr) {
            self.emit_expr(expr, FREE);
        } else {
            self.emit_parenthesized(expr);
        }
    }

    /// Callee or class expression: a bare constant there would re-parse as a name.
    fn emit_dynamic_name(&mut self, expr: &Expr) {
        if matches!(expr, Expr::ConstFetch(_) | Expr::MagicConst(_)) {
            self.emit_parenthesized(expr);
        } else {
            self.emit_postfix_operand(expr);
        }
    }

    fn emit_class_ref(&mut self, class: &ClassRef) {
        match class {
            ClassRef::Name(name) => self.emit_name(&name.node),
            ClassRef::Expr(expr) => self.emit_dynamic_name(&expr.node),
        }
    }

    fn emit_member_name(&mut self, member: &MemberName) {
        match member {
            MemberName::Ident(name) => self.write(&name.node),
            MemberName::Expr(expr) => match &expr.node {
                Expr::Variable(name) => {
                    self.write("$");
                    self.write(name);
                }
                Expr::VariableVariable(_) => self.emit_expr(&expr.node, FREE),
                other => {
                    self.write("{");
                    self.emit_expr(other, FREE);
                    self.write("}");
                }
            },
        }
    }

    fn emit_array_item(&mut self, item: &ArrayItem) {
        if let Some(key) = &item.key {
            self.emit_expr(&key.node, FREE);
            self.write(" => ");
        }
        if item.by_ref {
            self.write("&");
        }
        if item.spread {
            self.write("...");
        }
        self.emit_expr(&item.value.node, FREE);
    }

    fn emit_array_open(&mut self, kind: ArrayKind, long: &str) {
        match kind {
            ArrayKind::Long => {
                self.write(long);
                self.write("(");
            }
            ArrayKind::Short => self.write("["),
        }
    }

    fn emit_array_close(&mut self, kind: ArrayKind) {
        self.write(match kind {
            ArrayKind::Long => ")",
            ArrayKind::Short => "]",
        });
    }

    fn emit_expr(&mut self, expr: &Expr, ctx: Ctx) {
        if needs_parens(expr, ctx) {
            self.emit_parenthesized(expr);
            return;
        }
        match expr {
            Expr::Variable(name) => {
                self.write("$");
                self.write(name);
            }
            Expr::IntLit(raw) | Expr::FloatLit(raw) => self.write(raw),
            Expr::StringLit(value) => {
                self.write("'");
                self.write(&escape_single_quoted(value));
                self.write("'");
            }
            Expr::TemplateLit(raw) => {
                self.write("\"");
                self.write(raw);
                self.write("\"");
            }
            Expr::MagicConst(magic) => self.write(magic.as_str()),
            Expr::ConstFetch(name) => self.emit_name(&name.node),
            Expr::ClassConstFetch { class, name } => {
                self.emit_class_ref(class);
                self.write("::");
                self.write(&name.node);
            }
            Expr::Array { kind, items } => {
                self.emit_array_open(*kind, "array");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_array_item(item);
                }
                self.emit_array_close(*kind);
            }
            Expr::List { kind, items } => {
                self.emit_array_open(*kind, "list");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(item) = item {
                        self.emit_array_item(item);
                    }
                }
                // a trailing empty slot needs its own comma
                if matches!(items.last(), Some(None)) {
                    self.write(",");
                }
                self.emit_array_close(*kind);
            }
            Expr::Call { callee, args } => {
                match callee {
                    Callee::Name(name) => self.emit_name(&name.node),
                    Callee::Expr(expr) => self.emit_dynamic_name(&expr.node),
                }
                self.emit_args(args);
            }
            Expr::MethodCall { object, method, args } => {
                self.emit_postfix_operand(&object.node);
                self.write("->");
                self.emit_member_name(method);
                self.emit_args(args);
            }
            Expr::StaticCall { class, method, args } => {
                self.emit_class_ref(class);
                self.write("::");
                self.emit_member_name(method);
                self.emit_args(args);
            }
            Expr::PropertyFetch { object, property } => {
                self.emit_postfix_operand(&object.node);
                self.write("->");
                self.emit_member_name(property);
            }
            Expr::StaticPropertyFetch { class, property } => {
                self.emit_class_ref(class);
                self.write("::$");
                self.write(&property.node);
            }
            Expr::Index { object, index } => {
                self.emit_postfix_operand(&object.node);
                self.write("[");
                if let Some(index) = index {
                    self.emit_expr(&index.node, FREE);
                }
                self.write("]");
            }
            Expr::New { class, args } => {
                self.write("new ");
                match class {
                    ClassRef::Name(name) => self.emit_name(&name.node),
                    ClassRef::Expr(expr) if is_new_class_chain(&expr.node) => self.emit_expr(&expr.node, FREE),
                    ClassRef::Expr(expr) => self.emit_parenthesized(&expr.node),
                }
                self.emit_args(args);
            }
            Expr::Clone(inner) => {
                self.write("clone ");
                self.emit_expr(&inner.node, Ctx::new(BP_CLONE_OPERAND, ctx.follow));
            }
            Expr::Closure(closure) => {
                if closure.is_static {
                    self.write("static ");
                }
                self.write("function ");
                if closure.by_ref {
                    self.write("&");
                }
                self.emit_params(&closure.params);
                if !closure.uses.is_empty() {
                    self.write(" use (");
                    for (i, var) in closure.uses.iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        if var.by_ref {
                            self.write("&");
                        }
                        self.write("$");
                        self.write(&var.name.node);
                    }
                    self.write(")");
                }
                self.emit_return_type(closure.return_type.as_ref());
                self.write(" ");
                self.emit_block(&closure.body);
            }
            Expr::ArrowFunction(arrow) => {
                if arrow.is_static {
                    self.write("static ");
                }
                self.write("fn ");
                if arrow.by_ref {
                    self.write("&");
                }
                self.emit_params(&arrow.params);
                self.emit_return_type(arrow.return_type.as_ref());
                self.write(" => ");
                self.emit_expr(&arrow.body.node, FREE);
            }
            Expr::Ternary { cond, then_expr, else_expr } => {
                self.emit_expr(&cond.node, Ctx::new(BP_TERNARY + 1, BP_TERNARY));
                match then_expr {
                    Some(then_expr) => {
                        self.write(" ? ");
                        if matches!(then_expr.node, Expr::Ternary { .. }) {
                            self.emit_parenthesized(&then_expr.node);
                        } else {
                            self.emit_expr(&then_expr.node, FREE);
                        }
                        self.write(" : ");
                    }
                    None => self.write(" ?: "),
                }
                self.emit_expr(&else_expr.node, Ctx::new(BP_TERNARY + 1, ctx.follow));
            }
            Expr::BinOp { op, lhs, rhs } => {
                let (lbp, rbp) = infix_binding_power(*op);
                self.emit_expr(&lhs.node, Ctx::new(lhs_min_bp(*op), lbp));
                self.write(" ");
                self.write(binop_str(*op));
                self.write(" ");
                self.emit_expr(&rhs.node, Ctx::new(rbp, ctx.follow));
            }
            Expr::UnaryOp { op, operand } => {
                self.write(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::BitNot => "~",
                    UnaryOp::Silence => "@",
                });
                // `- -$a` must not print as `--$a`
                let merges = matches!(op, UnaryOp::Neg | UnaryOp::Plus)
                    && matches!(
                        operand.node,
                        Expr::UnaryOp { op: UnaryOp::Neg | UnaryOp::Plus, .. }
                            | Expr::IncDec { op: IncDecOp::PreInc | IncDecOp::PreDec, .. }
                    );
                if merges {
                    self.emit_parenthesized(&operand.node);
                } else {
                    self.emit_expr(&operand.node, Ctx::new(unary_operand_bp(*op), ctx.follow));
                }
            }
            Expr::IncDec { op, target } => match op {
                IncDecOp::PreInc | IncDecOp::PreDec => {
                    self.write(if *op == IncDecOp::PreInc { "++" } else { "--" });
                    self.emit_expr(&target.node, Ctx::new(BP_UNARY_OPERAND, ctx.follow));
                }
                IncDecOp::PostInc | IncDecOp::PostDec => {
                    self.emit_postfix_operand(&target.node);
                    self.write(if *op == IncDecOp::PostInc { "++" } else { "--" });
                }
            },
            Expr::Cast { kind, expr } => {
                self.write("(");
                self.write(kind.as_str());
                self.write(") ");
                self.emit_expr(&expr.node, Ctx::new(BP_UNARY_OPERAND, ctx.follow));
            }
            Expr::Assign { target, value, by_ref } => {
                self.emit_expr(&target.node, FREE);
                self.write(if *by_ref { " = &" } else { " = " });
                self.emit_expr(&value.node, Ctx::new(BP_ASSIGN_RHS, ctx.follow));
            }
            Expr::CompoundAssign { op, target, value } => {
                self.emit_expr(&target.node, FREE);
                self.write(" ");
                self.write(assign_op_str(*op));
                self.write(" ");
                self.emit_expr(&value.node, Ctx::new(BP_ASSIGN_RHS, ctx.follow));
            }
            Expr::Instanceof { expr, class } => {
                self.emit_expr(&expr.node, Ctx::new(BP_INSTANCEOF + 1, BP_INSTANCEOF));
                self.write(" instanceof ");
                match class {
                    ClassRef::Name(name) => self.emit_name(&name.node),
                    ClassRef::Expr(class) => self.emit_expr(&class.node, Ctx::new(BP_INSTANCEOF + 1, ctx.follow)),
                }
            }
            Expr::Isset(vars) => {
                self.write("isset(");
                self.emit_expr_list(vars);
                self.write(")");
            }
            Expr::Empty(inner) => {
                self.write("empty(");
                self.emit_expr(&inner.node, FREE);
                self.write(")");
            }
            Expr::Exit(status) => {
                self.write("exit");
                if let Some(status) = status {
                    self.emit_parenthesized(&status.node);
                }
            }
            Expr::Print(inner) => {
                self.write("print ");
                self.emit_expr(&inner.node, Ctx::new(BP_PRINT_OPERAND, ctx.follow));
            }
            Expr::DocString(doc) => {
                self.write("<<<");
                if doc.nowdoc {
                    self.write("'");
                    self.write(&doc.label);
                    self.write("'");
                } else {
                    self.write(&doc.label);
                }
                self.newline();
                self.write(&doc.body);
                self.write(&doc.indent);
                self.write(&doc.label);
            }
            Expr::ShellExec(raw) => {
                self.write("`");
                self.write(raw);
                self.write("`");
            }
            Expr::VariableVariable(inner) => {
                self.write("$");
                match &inner.node {
                    Expr::Variable(_) | Expr::VariableVariable(_) => self.emit_expr(&inner.node, FREE),
                    other => {
                        self.write("{");
                        self.emit_expr(other, FREE);
                        self.write("}");
                    }
                }
            }
            Expr::Yield { key, value } => {
                self.write("yield");
                if let Some(key) = key {
                    self.write(" ");
                    self.emit_expr(&key.node, Ctx::new(BP_PRINT_OPERAND, 0));
                    self.write(" =>");
                }
                if let Some(value) = value {
                    self.write(" ");
                    self.emit_expr(&value.node, Ctx::new(BP_PRINT_OPERAND, ctx.follow));
                }
            }
            Expr::YieldFrom(inner) => {
                self.write("yield from ");
                self.emit_expr(&inner.node, Ctx::new(BP_PRINT_OPERAND, ctx.follow));
            }
            Expr::Include { kind, expr } => {
                self.write(kind.as_str());
                self.write(" ");
                self.emit_expr(&expr.node, FREE);
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn needs_parens(expr: &Expr, ctx: Ctx) -> bool {
    // a prefix operator swallows any following operator binding at least
    // as tightly as its operand
    let absorbs = |operand_bp: u8| ctx.follow > 0 && ctx.follow >= operand_bp;
    match expr {
        Expr::BinOp { op, .. } => infix_binding_power(*op).0 < ctx.min_bp,
        Expr::Ternary { .. } => BP_TERNARY < ctx.min_bp,
        Expr::Instanceof { .. } => BP_INSTANCEOF < ctx.min_bp,
        Expr::Assign { .. } | Expr::CompoundAssign { .. } => ctx.min_bp > BP_ASSIGN_RHS || absorbs(BP_ASSIGN_RHS),
        Expr::UnaryOp { op, .. } => absorbs(unary_operand_bp(*op)),
        Expr::Cast { .. } | Expr::IncDec { op: IncDecOp::PreInc | IncDecOp::PreDec, .. } => absorbs(BP_UNARY_OPERAND),
        Expr::Clone(_) => absorbs(BP_CLONE_OPERAND),
        Expr::Print(_) | Expr::YieldFrom(_) | Expr::Yield { value: Some(_), .. } => absorbs(BP_PRINT_OPERAND),
        // a bare `yield` would take the next operator's right side as its value
        Expr::Yield { value: None, .. } => ctx.follow > 0,
        Expr::Include { .. } | Expr::ArrowFunction(_) => ctx.follow > 0,
        _ => false,
    }
}

/// Expressions the parser lets `->`, `[`, `(` and `::` attach to directly.
fn is_postfix_operand(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Variable(_)
            | Expr::VariableVariable(_)
            | Expr::IntLit(_)
            | Expr::FloatLit(_)
            | Expr::StringLit(_)
            | Expr::TemplateLit(_)
            | Expr::MagicConst(_)
            | Expr::ConstFetch(_)
            | Expr::ClassConstFetch { .. }
            | Expr::Array { .. }
            | Expr::List { .. }
            | Expr::Call { .. }
            | Expr::MethodCall { .. }
            | Expr::StaticCall { .. }
            | Expr::PropertyFetch { .. }
            | Expr::StaticPropertyFetch { .. }
            | Expr::Index { .. }
            | Expr::Isset(_)
            | Expr::Empty(_)
            | Expr::Exit(_)
            | Expr::IncDec { op: IncDecOp::PostInc | IncDecOp::PostDec, .. }
    )
}

/// `new $a->b['c']` is the only dynamic class form allowed without parens.
fn is_new_class_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Variable(_) | Expr::VariableVariable(_) => true,
        Expr::PropertyFetch { object, property: MemberName::Ident(_) } => is_new_class_chain(&object.node),
        Expr::Index { object, index: Some(_) } => is_new_class_chain(&object.node),
        _ => false,
    }
}

fn unary_operand_bp(op: UnaryOp) -> u8 {
    match op {
        UnaryOp::Not => BP_NOT_OPERAND,
        _ => BP_UNARY_OPERAND,
    }
}

/// Right-associative and non-associative operators need their left
/// operand to bind strictly tighter.
fn lhs_min_bp(op: BinOp) -> u8 {
    let (lbp, rbp) = infix_binding_power(op);
    let non_assoc = matches!(
        op,
        BinOp::Eq
            | BinOp::NotEq
            | BinOp::Identical
            | BinOp::NotIdentical
            | BinOp::Spaceship
            | BinOp::Lt
            | BinOp::Gt
            | BinOp::LtEq
            | BinOp::GtEq
    );
    if rbp < lbp || non_assoc { lbp + 1 } else { lbp }
}

fn binop_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::Concat => ".",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Identical => "===",
        BinOp::NotIdentical => "!==",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::LtEq => "<=",
        BinOp::GtEq => ">=",
        BinOp::Spaceship => "<=>",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::LogicalAnd => "and",
        BinOp::LogicalOr => "or",
        BinOp::LogicalXor => "xor",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::Coalesce => "??",
    }
}

fn assign_op_str(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Add => "+=",
        AssignOp::Sub => "-=",
        AssignOp::Mul => "*=",
        AssignOp::Div => "/=",
        AssignOp::Mod => "%=",
        AssignOp::Pow => "**=",
        AssignOp::Concat => ".=",
        AssignOp::BitAnd => "&=",
        AssignOp::BitOr => "|=",
        AssignOp::BitXor => "^=",
        AssignOp::Shl => "<<=",
        AssignOp::Shr => ">>=",
        AssignOp::Coalesce => "??=",
    }
}

fn use_kind_prefix(kind: UseKind) -> &'static str {
    match kind {
        UseKind::Function => "function ",
        UseKind::Const => "const ",
        UseKind::Normal | UseKind::Mixed => "",
    }
}

/// Escape for a single-quoted literal. A backslash only needs doubling
/// where it would otherwise start an escape.
fn escape_single_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' if matches!(chars.peek(), None | Some('\\') | Some('\'')) => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}
