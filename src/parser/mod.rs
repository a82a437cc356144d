pub mod ast;

use crate::diagnostics::CompileError;
use crate::lexer::token::Token;
use crate::span::{Span, Spanned};
use ast::*;

// Binding powers. Precedence level L maps to (2L, 2L + 1) for
// left-associative operators and (2L + 1, 2L) for right-associative ones.
pub(crate) const BP_PRINT_OPERAND: u8 = 8;
pub(crate) const BP_ASSIGN_RHS: u8 = 10;
pub(crate) const BP_TERNARY: u8 = 12;
pub(crate) const BP_NOT_OPERAND: u8 = 38;
pub(crate) const BP_INSTANCEOF: u8 = 40;
pub(crate) const BP_UNARY_OPERAND: u8 = 42;
pub(crate) const BP_CLONE_OPERAND: u8 = 46;

const BUILTIN_TYPES: &[&str] = &[
    "array", "callable", "bool", "float", "int", "string", "iterable", "object", "mixed",
    "void", "null", "false", "true", "never", "self", "parent", "static",
];

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Spanned<Token>> {
        let tokens = self.tokens;
        tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Spanned<Token>> {
        let tokens = self.tokens;
        tokens.get(self.pos + offset)
    }

    fn peek_is(&self, expected: &Token) -> bool {
        self.peek().is_some_and(|t| same_kind(&t.node, expected))
    }

    fn peek_at_is(&self, offset: usize, expected: &Token) -> bool {
        self.peek_at(offset).is_some_and(|t| same_kind(&t.node, expected))
    }

    fn advance(&mut self) -> Option<&'a Spanned<Token>> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek_is(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, CompileError> {
        match self.peek() {
            Some(tok) if same_kind(&tok.node, expected) => {
                self.pos += 1;
                Ok(tok.span)
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected {expected}, found {}", describe(&tok.node)),
                tok.span,
            )),
            None => Err(CompileError::syntax(
                format!("expected {expected}, found end of file"),
                self.eof_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, CompileError> {
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::Ident) => {
                self.pos += 1;
                Ok(Spanned::new(self.text(tok.span).to_string(), tok.span))
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected identifier, found {}", describe(&tok.node)),
                tok.span,
            )),
            None => Err(CompileError::syntax(
                "expected identifier, found end of file",
                self.eof_span(),
            )),
        }
    }

    /// Member, method and class-constant names may be reserved words.
    fn expect_member_name(&mut self) -> Result<Spanned<String>, CompileError> {
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::Ident) || tok.node.is_keyword() => {
                self.pos += 1;
                Ok(Spanned::new(self.text(tok.span).to_string(), tok.span))
            }
            _ => self.expect_ident(),
        }
    }

    fn expect_variable(&mut self) -> Result<Spanned<String>, CompileError> {
        match self.peek() {
            Some(Spanned { node: Token::Variable(name), span }) => {
                self.pos += 1;
                Ok(Spanned::new(name.clone(), *span))
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected variable, found {}", describe(&tok.node)),
                tok.span,
            )),
            None => Err(CompileError::syntax(
                "expected variable, found end of file",
                self.eof_span(),
            )),
        }
    }

    /// `;`, or a close tag, which terminates the statement before it.
    fn expect_semi(&mut self) -> Result<(), CompileError> {
        if self.eat(&Token::Semicolon) || self.eat(&Token::CloseTag) {
            return Ok(());
        }
        self.expect(&Token::Semicolon).map(|_| ())
    }

    fn text(&self, span: Span) -> &'a str {
        let source = self.source;
        &source[span.start..span.end]
    }

    fn current_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_end().max(start.start))
    }

    fn eof_span(&self) -> Span {
        if let Some(last) = self.tokens.last() {
            Span::new(last.span.end, last.span.end)
        } else {
            Span::dummy()
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn unexpected(&self, context: &str) -> CompileError {
        match self.peek() {
            Some(tok) => CompileError::syntax(
                format!("unexpected {} {context}", describe(&tok.node)),
                tok.span,
            ),
            None => CompileError::syntax(format!("unexpected end of file {context}"), self.eof_span()),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            if self.eat(&Token::CloseTag) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let tok = self.peek().ok_or_else(|| {
            CompileError::syntax("unexpected end of file, expected statement", self.eof_span())
        })?;
        let start = tok.span;

        match &tok.node {
            Token::InlineHtml(html) => {
                self.advance();
                Ok(Spanned::new(Stmt::InlineHtml(html.clone()), start))
            }
            Token::CloseTag => {
                self.advance();
                Ok(Spanned::new(Stmt::Nop, start))
            }
            Token::Semicolon => {
                self.advance();
                Ok(Spanned::new(Stmt::Nop, start))
            }
            Token::LBrace => {
                let body = self.parse_block()?;
                Ok(Spanned::new(Stmt::Block(body), self.span_from(start)))
            }
            Token::Namespace if !self.peek_at_is(1, &Token::Backslash) => self.parse_namespace(),
            Token::Use => self.parse_use(),
            Token::Const => self.parse_const_stmt(),
            Token::Declare => self.parse_declare(),
            Token::Function if self.is_function_decl_ahead() => self.parse_function(),
            Token::Abstract | Token::Final | Token::Class | Token::Interface | Token::Trait => {
                self.parse_class_like()
            }
            Token::Echo => {
                self.advance();
                let exprs = self.parse_expr_list()?;
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Echo(exprs), self.span_from(start)))
            }
            Token::Return => {
                self.advance();
                let value = self.parse_optional_expr()?;
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Return(value), self.span_from(start)))
            }
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_while(),
            Token::For => self.parse_for(),
            Token::Foreach => self.parse_foreach(),
            Token::Switch => self.parse_switch(),
            Token::Break | Token::Continue => {
                let is_break = matches!(tok.node, Token::Break);
                self.advance();
                let depth = self.parse_optional_expr()?;
                self.expect_semi()?;
                let stmt = if is_break { Stmt::Break(depth) } else { Stmt::Continue(depth) };
                Ok(Spanned::new(stmt, self.span_from(start)))
            }
            Token::Global => {
                self.advance();
                let mut vars = Vec::new();
                loop {
                    let var = self.expect_variable()?;
                    vars.push(var.map(Expr::Variable));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Global(vars), self.span_from(start)))
            }
            Token::Static if matches!(self.peek_at(1).map(|t| &t.node), Some(Token::Variable(_))) => {
                self.parse_static_vars()
            }
            Token::Unset => {
                self.advance();
                self.expect(&Token::LParen)?;
                let mut targets = Vec::new();
                while !self.peek_is(&Token::RParen) {
                    targets.push(self.parse_expr(0)?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen)?;
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Unset(targets), self.span_from(start)))
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expr(0)?;
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Throw(value), self.span_from(start)))
            }
            Token::Try => self.parse_try(),
            Token::Goto => {
                self.advance();
                let label = self.expect_ident()?;
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Goto(label), self.span_from(start)))
            }
            Token::Ident if self.peek_at_is(1, &Token::Colon) => {
                let label = self.expect_ident()?;
                self.advance();
                Ok(Spanned::new(Stmt::Label(label), self.span_from(start)))
            }
            Token::HaltCompiler(data) => {
                self.advance();
                Ok(Spanned::new(Stmt::HaltCompiler(data.clone()), start))
            }
            _ => {
                let expr = self.parse_expr(0)?;
                self.expect_semi()?;
                Ok(Spanned::new(Stmt::Expr(expr), self.span_from(start)))
            }
        }
    }

    /// `{ stmt* }`
    fn parse_block(&mut self) -> Result<Vec<Spanned<Stmt>>, CompileError> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.peek_is(&Token::RBrace) {
            if self.is_at_end() {
                return Err(CompileError::syntax("expected }, found end of file", self.eof_span()));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(stmts)
    }

    /// Body of a control structure: a block or a single statement.
    fn parse_body(&mut self) -> Result<Vec<Spanned<Stmt>>, CompileError> {
        if self.peek_is(&Token::LBrace) {
            return self.parse_block();
        }
        if self.peek_is(&Token::Colon) {
            return Err(CompileError::syntax(
                "alternative control structure syntax is not supported",
                self.current_span(),
            ));
        }
        Ok(vec![self.parse_stmt()?])
    }

    fn parse_paren_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.expect(&Token::LParen)?;
        let expr = self.parse_expr(0)?;
        self.expect(&Token::RParen)?;
        Ok(expr)
    }

    fn parse_optional_expr(&mut self) -> Result<Option<Spanned<Expr>>, CompileError> {
        if self.peek_is(&Token::Semicolon) || self.peek_is(&Token::CloseTag) || self.is_at_end() {
            Ok(None)
        } else {
            Ok(Some(self.parse_expr(0)?))
        }
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Spanned<Expr>>, CompileError> {
        let mut exprs = vec![self.parse_expr(0)?];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_expr(0)?);
        }
        Ok(exprs)
    }

    fn at_namespace_decl(&self) -> bool {
        self.peek_is(&Token::Namespace) && !self.peek_at_is(1, &Token::Backslash)
    }

    fn parse_namespace(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Namespace)?;
        let name = if self.peek_is(&Token::LBrace) { None } else { Some(self.parse_name()?) };

        if self.peek_is(&Token::LBrace) {
            let stmts = self.parse_block()?;
            return Ok(Spanned::new(
                Stmt::Namespace { name, stmts, braced: true },
                self.span_from(start),
            ));
        }

        let Some(name) = name else {
            return Err(self.unexpected("after namespace"));
        };
        self.expect_semi()?;
        // The unbraced form owns every statement up to the next namespace.
        let mut stmts = Vec::new();
        while !self.is_at_end() && !self.at_namespace_decl() && !self.peek_is(&Token::RBrace) {
            if self.eat(&Token::CloseTag) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Spanned::new(
            Stmt::Namespace { name: Some(name), stmts, braced: false },
            self.span_from(start),
        ))
    }

    fn parse_use_kind(&mut self) -> Option<UseKind> {
        if self.eat(&Token::Function) {
            Some(UseKind::Function)
        } else if self.eat(&Token::Const) {
            Some(UseKind::Const)
        } else {
            None
        }
    }

    fn parse_use(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Use)?;
        let leading_kind = self.parse_use_kind();
        let first = self.parse_name()?;

        if self.peek_is(&Token::Backslash) && self.peek_at_is(1, &Token::LBrace) {
            self.advance();
            self.advance();
            let mut uses = Vec::new();
            while !self.peek_is(&Token::RBrace) {
                let item_kind = match leading_kind {
                    Some(_) => None,
                    None => Some(self.parse_use_kind().unwrap_or(UseKind::Normal)),
                };
                let name = self.parse_name()?;
                let alias = self.parse_use_alias()?;
                uses.push(UseItem { kind: item_kind, name, alias });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RBrace)?;
            self.expect_semi()?;
            return Ok(Spanned::new(
                Stmt::GroupUse { kind: leading_kind.unwrap_or(UseKind::Mixed), prefix: first, uses },
                self.span_from(start),
            ));
        }

        let mut uses = Vec::new();
        let alias = self.parse_use_alias()?;
        uses.push(UseItem { kind: None, name: first, alias });
        while self.eat(&Token::Comma) {
            let name = self.parse_name()?;
            let alias = self.parse_use_alias()?;
            uses.push(UseItem { kind: None, name, alias });
        }
        self.expect_semi()?;
        Ok(Spanned::new(
            Stmt::Use { kind: leading_kind.unwrap_or(UseKind::Normal), uses },
            self.span_from(start),
        ))
    }

    fn parse_use_alias(&mut self) -> Result<Option<String>, CompileError> {
        if self.eat(&Token::As) {
            Ok(Some(self.expect_ident()?.node))
        } else {
            Ok(None)
        }
    }

    fn parse_const_stmt(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Const)?;
        let mut items = Vec::new();
        loop {
            let name = self.expect_ident()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr(0)?;
            items.push(ConstItem { name, value, namespaced_name: None });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_semi()?;
        Ok(Spanned::new(Stmt::Const(items), self.span_from(start)))
    }

    fn parse_declare(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Declare)?;
        self.expect(&Token::LParen)?;
        let mut directives = Vec::new();
        loop {
            let key = self.expect_ident()?.node;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr(0)?;
            directives.push(DeclareDirective { key, value });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        let body = if self.eat(&Token::Semicolon) || self.eat(&Token::CloseTag) {
            None
        } else if self.peek_is(&Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            Some(vec![self.parse_stmt()?])
        };
        Ok(Spanned::new(Stmt::Declare { directives, body }, self.span_from(start)))
    }

    fn is_function_decl_ahead(&self) -> bool {
        match self.peek_at(1).map(|t| &t.node) {
            Some(Token::Ident) => true,
            Some(Token::Amp) => matches!(self.peek_at(2).map(|t| &t.node), Some(Token::Ident)),
            _ => false,
        }
    }

    fn parse_function(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Function)?;
        let by_ref = self.eat(&Token::Amp);
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let return_type = self.parse_return_type()?;
        let body = self.parse_block()?;
        Ok(Spanned::new(
            Stmt::Function(Function { name, namespaced_name: None, by_ref, params, return_type, body }),
            self.span_from(start),
        ))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, CompileError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.peek_is(&Token::RParen) {
            let ty = if self.at_type_start() { Some(self.parse_type()?) } else { None };
            let by_ref = self.eat(&Token::Amp);
            let variadic = self.eat(&Token::Ellipsis);
            let name = self.expect_variable()?;
            let default = if self.eat(&Token::Eq) { Some(self.parse_expr(0)?) } else { None };
            params.push(Param { name, ty, default, by_ref, variadic });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(params)
    }

    fn parse_return_type(&mut self) -> Result<Option<Spanned<TypeHint>>, CompileError> {
        if self.eat(&Token::Colon) {
            Ok(Some(self.parse_type()?))
        } else {
            Ok(None)
        }
    }

    fn at_type_start(&self) -> bool {
        match self.peek().map(|t| &t.node) {
            Some(Token::Question | Token::Ident | Token::Backslash | Token::Array | Token::Static) => true,
            Some(Token::Namespace) => self.peek_at_is(1, &Token::Backslash),
            _ => false,
        }
    }

    fn parse_type(&mut self) -> Result<Spanned<TypeHint>, CompileError> {
        let start = self.current_span();
        if self.eat(&Token::Question) {
            let inner = self.parse_single_type()?;
            return Ok(Spanned::new(TypeHint::Nullable(Box::new(inner)), self.span_from(start)));
        }
        let first = self.parse_single_type()?;
        if !self.peek_is(&Token::Pipe) {
            return Ok(Spanned::new(first, self.span_from(start)));
        }
        let mut types = vec![first];
        while self.eat(&Token::Pipe) {
            types.push(self.parse_single_type()?);
        }
        Ok(Spanned::new(TypeHint::Union(types), self.span_from(start)))
    }

    fn parse_single_type(&mut self) -> Result<TypeHint, CompileError> {
        if let Some(tok) = self.peek() {
            if matches!(tok.node, Token::Array | Token::Static) {
                self.advance();
                return Ok(TypeHint::Builtin(self.text(tok.span).to_string()));
            }
        }
        let name = self.parse_name()?;
        if name.node.is_unqualified()
            && BUILTIN_TYPES.contains(&name.node.first().to_ascii_lowercase().as_str())
        {
            return Ok(TypeHint::Builtin(name.node.first().to_string()));
        }
        Ok(TypeHint::Named(name))
    }

    /// A possibly qualified name: `foo`, `Foo\bar`, `\Foo\bar`, `namespace\bar`.
    fn parse_name(&mut self) -> Result<Spanned<Name>, CompileError> {
        let start = self.current_span();
        let kind = if self.eat(&Token::Backslash) {
            NameKind::FullyQualified
        } else if self.peek_is(&Token::Namespace) && self.peek_at_is(1, &Token::Backslash) {
            self.advance();
            self.advance();
            NameKind::Relative
        } else {
            NameKind::Unqualified
        };

        let mut parts = vec![self.expect_ident()?.node];
        // A trailing `\{` belongs to a group use and is left for the caller.
        while self.peek_is(&Token::Backslash)
            && self.peek_at(1).is_some_and(|t| matches!(t.node, Token::Ident) || t.node.is_keyword())
        {
            self.advance();
            parts.push(self.expect_member_name()?.node);
        }

        let kind = match kind {
            NameKind::Unqualified if parts.len() > 1 => NameKind::Qualified,
            other => other,
        };
        Ok(Spanned::new(Name::new(kind, parts), self.span_from(start)))
    }

    fn parse_name_list(&mut self) -> Result<Vec<Spanned<Name>>, CompileError> {
        let mut names = vec![self.parse_name()?];
        while self.eat(&Token::Comma) {
            names.push(self.parse_name()?);
        }
        Ok(names)
    }

    fn parse_class_like(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.current_span();
        let mut modifiers = Modifiers::default();
        loop {
            if self.eat(&Token::Abstract) {
                modifiers.is_abstract = true;
            } else if self.eat(&Token::Final) {
                modifiers.is_final = true;
            } else {
                break;
            }
        }

        let kind = if self.eat(&Token::Class) {
            ClassKind::Class
        } else if self.eat(&Token::Interface) {
            ClassKind::Interface
        } else if self.eat(&Token::Trait) {
            ClassKind::Trait
        } else {
            return Err(self.unexpected("in class declaration"));
        };

        let name = self.expect_ident()?;
        let mut extends = Vec::new();
        let mut implements = Vec::new();
        if kind != ClassKind::Trait && self.eat(&Token::Extends) {
            if kind == ClassKind::Interface {
                extends = self.parse_name_list()?;
            } else {
                extends.push(self.parse_name()?);
            }
        }
        if kind == ClassKind::Class && self.eat(&Token::Implements) {
            implements = self.parse_name_list()?;
        }

        self.expect(&Token::LBrace)?;
        let mut members = Vec::new();
        while !self.peek_is(&Token::RBrace) {
            if self.is_at_end() {
                return Err(CompileError::syntax("expected }, found end of file", self.eof_span()));
            }
            members.push(self.parse_class_member()?);
        }
        self.expect(&Token::RBrace)?;

        Ok(Spanned::new(
            Stmt::ClassLike(ClassLike {
                kind,
                name,
                namespaced_name: None,
                modifiers,
                extends,
                implements,
                members,
            }),
            self.span_from(start),
        ))
    }

    fn parse_class_member(&mut self) -> Result<Spanned<ClassMember>, CompileError> {
        let start = self.current_span();

        if self.eat(&Token::Use) {
            let traits = self.parse_name_list()?;
            if self.peek_is(&Token::LBrace) {
                return Err(CompileError::syntax(
                    "trait adaptation blocks are not supported",
                    self.current_span(),
                ));
            }
            self.expect_semi()?;
            return Ok(Spanned::new(ClassMember::TraitUse(traits), self.span_from(start)));
        }

        let mut modifiers = Modifiers::default();
        let mut is_var = false;
        loop {
            let Some(tok) = self.peek() else { break };
            match tok.node {
                Token::Public => modifiers.visibility = Some(Visibility::Public),
                Token::Protected => modifiers.visibility = Some(Visibility::Protected),
                Token::Private => modifiers.visibility = Some(Visibility::Private),
                Token::Static => modifiers.is_static = true,
                Token::Abstract => modifiers.is_abstract = true,
                Token::Final => modifiers.is_final = true,
                Token::Var => is_var = true,
                _ => break,
            }
            self.advance();
        }

        if self.eat(&Token::Const) {
            let mut consts = Vec::new();
            loop {
                let name = self.expect_member_name()?;
                self.expect(&Token::Eq)?;
                let value = self.parse_expr(0)?;
                consts.push(ConstItem { name, value, namespaced_name: None });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect_semi()?;
            return Ok(Spanned::new(ClassMember::Const { modifiers, consts }, self.span_from(start)));
        }

        if self.eat(&Token::Function) {
            let by_ref = self.eat(&Token::Amp);
            let name = self.expect_member_name()?;
            let params = self.parse_params()?;
            let return_type = self.parse_return_type()?;
            let body = if self.peek_is(&Token::LBrace) {
                Some(self.parse_block()?)
            } else {
                self.expect_semi()?;
                None
            };
            return Ok(Spanned::new(
                ClassMember::Method(Method { modifiers, name, by_ref, params, return_type, body }),
                self.span_from(start),
            ));
        }

        let ty = if matches!(self.peek().map(|t| &t.node), Some(Token::Variable(_))) {
            None
        } else if self.at_type_start() {
            Some(self.parse_type()?)
        } else {
            return Err(self.unexpected("in class body"));
        };
        let mut props = Vec::new();
        loop {
            let name = self.expect_variable()?;
            let default = if self.eat(&Token::Eq) { Some(self.parse_expr(0)?) } else { None };
            props.push(PropertyItem { name, default });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_semi()?;
        Ok(Spanned::new(ClassMember::Property { modifiers, is_var, ty, props }, self.span_from(start)))
    }

    fn parse_if(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::If)?;
        let cond = self.parse_paren_expr()?;
        let then_branch = self.parse_body()?;
        let mut elseifs = Vec::new();
        let mut else_branch = None;
        loop {
            if self.eat(&Token::ElseIf) {
                let cond = self.parse_paren_expr()?;
                let body = self.parse_body()?;
                elseifs.push(ElseIf { cond, body });
            } else if self.eat(&Token::Else) {
                // `else if` stays a nested `if` inside the else branch.
                else_branch = Some(self.parse_body()?);
                break;
            } else {
                break;
            }
        }
        Ok(Spanned::new(
            Stmt::If { cond, then_branch, elseifs, else_branch },
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::While)?;
        let cond = self.parse_paren_expr()?;
        let body = self.parse_body()?;
        Ok(Spanned::new(Stmt::While { cond, body }, self.span_from(start)))
    }

    fn parse_do_while(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Do)?;
        let body = self.parse_body()?;
        self.expect(&Token::While)?;
        let cond = self.parse_paren_expr()?;
        self.expect_semi()?;
        Ok(Spanned::new(Stmt::DoWhile { body, cond }, self.span_from(start)))
    }

    fn parse_for(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::For)?;
        self.expect(&Token::LParen)?;
        let init = self.parse_for_clause(&Token::Semicolon)?;
        self.expect(&Token::Semicolon)?;
        let cond = self.parse_for_clause(&Token::Semicolon)?;
        self.expect(&Token::Semicolon)?;
        let step = self.parse_for_clause(&Token::RParen)?;
        self.expect(&Token::RParen)?;
        let body = self.parse_body()?;
        Ok(Spanned::new(Stmt::For { init, cond, step, body }, self.span_from(start)))
    }

    fn parse_for_clause(&mut self, terminator: &Token) -> Result<Vec<Spanned<Expr>>, CompileError> {
        if self.peek_is(terminator) {
            Ok(Vec::new())
        } else {
            self.parse_expr_list()
        }
    }

    fn parse_foreach(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Foreach)?;
        self.expect(&Token::LParen)?;
        let subject = self.parse_expr(0)?;
        self.expect(&Token::As)?;

        let mut by_ref = self.eat(&Token::Amp);
        let first = self.parse_expr(0)?;
        let (key, value) = if self.eat(&Token::FatArrow) {
            if by_ref {
                return Err(CompileError::syntax("foreach key cannot be taken by reference", first.span));
            }
            by_ref = self.eat(&Token::Amp);
            (Some(first), self.parse_expr(0)?)
        } else {
            (None, first)
        };
        let value = into_destructuring(value)?;
        self.expect(&Token::RParen)?;
        let body = self.parse_body()?;
        Ok(Spanned::new(
            Stmt::Foreach { subject, key, by_ref, value, body },
            self.span_from(start),
        ))
    }

    fn parse_switch(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Switch)?;
        let subject = self.parse_paren_expr()?;
        self.expect(&Token::LBrace)?;
        let mut cases = Vec::new();
        while !self.peek_is(&Token::RBrace) {
            let test = if self.eat(&Token::Case) {
                Some(self.parse_expr(0)?)
            } else if self.eat(&Token::Default) {
                None
            } else {
                return Err(self.unexpected("in switch, expected case or default"));
            };
            if !self.eat(&Token::Colon) {
                self.expect(&Token::Semicolon)?;
            }
            let mut body = Vec::new();
            while !self.peek_is(&Token::Case) && !self.peek_is(&Token::Default) && !self.peek_is(&Token::RBrace) {
                if self.is_at_end() {
                    return Err(CompileError::syntax("expected }, found end of file", self.eof_span()));
                }
                body.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect(&Token::RBrace)?;
        Ok(Spanned::new(Stmt::Switch { subject, cases }, self.span_from(start)))
    }

    fn parse_static_vars(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Static)?;
        let mut vars = Vec::new();
        loop {
            let name = self.expect_variable()?;
            let default = if self.eat(&Token::Eq) { Some(self.parse_expr(0)?) } else { None };
            vars.push(StaticVar { name, default });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_semi()?;
        Ok(Spanned::new(Stmt::StaticVars(vars), self.span_from(start)))
    }

    fn parse_try(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(&Token::Try)?;
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.eat(&Token::Catch) {
            self.expect(&Token::LParen)?;
            let mut types = vec![self.parse_name()?];
            while self.eat(&Token::Pipe) {
                types.push(self.parse_name()?);
            }
            let var = if self.peek_is(&Token::RParen) { None } else { Some(self.expect_variable()?) };
            self.expect(&Token::RParen)?;
            let body = self.parse_block()?;
            catches.push(Catch { types, var, body });
        }
        let finally = if self.eat(&Token::Finally) { Some(self.parse_block()?) } else { None };
        if catches.is_empty() && finally.is_none() {
            return Err(CompileError::syntax(
                "try without catch or finally",
                self.span_from(start),
            ));
        }
        Ok(Spanned::new(Stmt::Try { body, catches, finally }, self.span_from(start)))
    }

    // ── Expressions ──────────────────────────────────────────────────

    pub fn parse_expr(&mut self, min_bp: u8) -> Result<Spanned<Expr>, CompileError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(tok) = self.peek() else { break };

            // Assignment binds to the variable on its left whatever the
            // surrounding precedence: `!$a = f()` is `!($a = f())`.
            if matches!(tok.node, Token::Eq) || compound_assign_op(&tok.node).is_some() {
                if !is_assignable(&lhs.node) {
                    break;
                }
                lhs = self.parse_assignment(lhs)?;
                continue;
            }

            if matches!(tok.node, Token::Question) {
                if BP_TERNARY < min_bp {
                    break;
                }
                self.advance();
                let then_expr = if self.eat(&Token::Colon) {
                    None
                } else {
                    let then_expr = self.parse_expr(0)?;
                    self.expect(&Token::Colon)?;
                    Some(Box::new(then_expr))
                };
                let else_expr = self.parse_expr(BP_TERNARY + 1)?;
                let span = Span::new(lhs.span.start, else_expr.span.end);
                lhs = Spanned::new(
                    Expr::Ternary { cond: Box::new(lhs), then_expr, else_expr: Box::new(else_expr) },
                    span,
                );
                continue;
            }

            if matches!(tok.node, Token::Instanceof) {
                if BP_INSTANCEOF < min_bp {
                    break;
                }
                self.advance();
                let class = self.parse_class_ref(false)?;
                let span = self.span_from(lhs.span);
                lhs = Spanned::new(Expr::Instanceof { expr: Box::new(lhs), class }, span);
                continue;
            }

            let Some(op) = binary_op(&tok.node) else { break };
            let (lbp, rbp) = infix_binding_power(op);
            if lbp < min_bp {
                break;
            }
            self.advance();

            let rhs = self.parse_expr(rbp)?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Spanned::new(
                Expr::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        Ok(lhs)
    }

    fn parse_assignment(&mut self, target: Spanned<Expr>) -> Result<Spanned<Expr>, CompileError> {
        let Some(tok) = self.advance() else {
            return Err(CompileError::syntax("expected assignment operator", self.eof_span()));
        };
        let target = into_destructuring(target)?;
        let start = target.span;

        if let Some(op) = compound_assign_op(&tok.node) {
            if matches!(target.node, Expr::List { .. }) {
                return Err(CompileError::syntax("cannot use compound assignment on a list", tok.span));
            }
            let value = self.parse_expr(BP_ASSIGN_RHS)?;
            let span = Span::new(start.start, value.span.end);
            return Ok(Spanned::new(
                Expr::CompoundAssign { op, target: Box::new(target), value: Box::new(value) },
                span,
            ));
        }

        let by_ref = self.eat(&Token::Amp);
        let value = self.parse_expr(BP_ASSIGN_RHS)?;
        let span = Span::new(start.start, value.span.end);
        Ok(Spanned::new(
            Expr::Assign { target: Box::new(target), value: Box::new(value), by_ref },
            span,
        ))
    }

    fn parse_prefix(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let tok = self.peek().ok_or_else(|| {
            CompileError::syntax("unexpected end of file in expression", self.eof_span())
        })?;
        let start = tok.span;

        let unary = match tok.node {
            Token::Bang => Some((UnaryOp::Not, BP_NOT_OPERAND)),
            Token::Minus => Some((UnaryOp::Neg, BP_UNARY_OPERAND)),
            Token::Plus => Some((UnaryOp::Plus, BP_UNARY_OPERAND)),
            Token::Tilde => Some((UnaryOp::BitNot, BP_UNARY_OPERAND)),
            Token::At => Some((UnaryOp::Silence, BP_UNARY_OPERAND)),
            _ => None,
        };
        if let Some((op, bp)) = unary {
            self.advance();
            let operand = self.parse_expr(bp)?;
            let span = Span::new(start.start, operand.span.end);
            return Ok(Spanned::new(Expr::UnaryOp { op, operand: Box::new(operand) }, span));
        }

        if let Some(kind) = self.cast_ahead() {
            self.pos += 3;
            let operand = self.parse_expr(BP_UNARY_OPERAND)?;
            let span = Span::new(start.start, operand.span.end);
            return Ok(Spanned::new(Expr::Cast { kind, expr: Box::new(operand) }, span));
        }

        match &tok.node {
            Token::PlusPlus | Token::MinusMinus => {
                let op = if matches!(tok.node, Token::PlusPlus) { IncDecOp::PreInc } else { IncDecOp::PreDec };
                self.advance();
                let target = self.parse_expr(BP_UNARY_OPERAND)?;
                let span = Span::new(start.start, target.span.end);
                Ok(Spanned::new(Expr::IncDec { op, target: Box::new(target) }, span))
            }
            Token::New => self.parse_new(),
            Token::Clone => {
                self.advance();
                let operand = self.parse_expr(BP_CLONE_OPERAND)?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Spanned::new(Expr::Clone(Box::new(operand)), span))
            }
            Token::Print => {
                self.advance();
                let operand = self.parse_expr(BP_PRINT_OPERAND)?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Spanned::new(Expr::Print(Box::new(operand)), span))
            }
            Token::Include | Token::IncludeOnce | Token::Require | Token::RequireOnce => {
                let kind = match tok.node {
                    Token::Include => IncludeKind::Include,
                    Token::IncludeOnce => IncludeKind::IncludeOnce,
                    Token::Require => IncludeKind::Require,
                    _ => IncludeKind::RequireOnce,
                };
                self.advance();
                let operand = self.parse_expr(0)?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Spanned::new(Expr::Include { kind, expr: Box::new(operand) }, span))
            }
            Token::Yield => self.parse_yield(),
            Token::Function | Token::Fn => self.parse_closure(false, start),
            Token::Static if matches!(self.peek_at(1).map(|t| &t.node), Some(Token::Function | Token::Fn)) => {
                self.advance();
                self.parse_closure(true, start)
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// `(int)`, `(string)`, ... : a parenthesised cast keyword.
    fn cast_ahead(&self) -> Option<CastKind> {
        if !self.peek_is(&Token::LParen) {
            return None;
        }
        let word = self.peek_at(1)?;
        if !matches!(word.node, Token::Ident | Token::Array | Token::Unset) {
            return None;
        }
        if !self.peek_at_is(2, &Token::RParen) {
            return None;
        }
        CastKind::from_keyword(self.text(word.span))
    }

    fn parse_primary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let tok = self.peek().ok_or_else(|| {
            CompileError::syntax("unexpected end of file in expression", self.eof_span())
        })?;
        let start = tok.span;

        let literal = match &tok.node {
            Token::Variable(name) => Some(Expr::Variable(name.clone())),
            Token::IntLit(raw) => Some(Expr::IntLit(raw.clone())),
            Token::FloatLit(raw) => Some(Expr::FloatLit(raw.clone())),
            Token::StringLit(value) => Some(Expr::StringLit(value.clone())),
            Token::TemplateLit(raw) => Some(Expr::TemplateLit(raw.clone())),
            Token::DocString(doc) => Some(Expr::DocString(doc.clone())),
            Token::ShellExec(raw) => Some(Expr::ShellExec(raw.clone())),
            _ => None,
        };
        if let Some(expr) = literal {
            self.advance();
            return Ok(Spanned::new(expr, start));
        }

        match &tok.node {
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(Spanned::new(inner.node, self.span_from(start)))
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_array_items(&Token::RBracket)?;
                self.expect(&Token::RBracket)?;
                Ok(Spanned::new(array_or_list(ArrayKind::Short, items), self.span_from(start)))
            }
            Token::Array if self.peek_at_is(1, &Token::LParen) => {
                self.advance();
                self.advance();
                let items = self.parse_array_items(&Token::RParen)?;
                self.expect(&Token::RParen)?;
                Ok(Spanned::new(array_or_list(ArrayKind::Long, items), self.span_from(start)))
            }
            Token::List => {
                self.advance();
                self.expect(&Token::LParen)?;
                let items = self.parse_array_items(&Token::RParen)?;
                self.expect(&Token::RParen)?;
                Ok(Spanned::new(Expr::List { kind: ArrayKind::Long, items }, self.span_from(start)))
            }
            Token::Isset => {
                self.advance();
                self.expect(&Token::LParen)?;
                let mut vars = Vec::new();
                while !self.peek_is(&Token::RParen) {
                    vars.push(self.parse_expr(0)?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen)?;
                if vars.is_empty() {
                    return Err(CompileError::syntax("isset needs at least one argument", self.span_from(start)));
                }
                Ok(Spanned::new(Expr::Isset(vars), self.span_from(start)))
            }
            Token::Empty => {
                self.advance();
                let inner = self.parse_paren_expr()?;
                Ok(Spanned::new(Expr::Empty(Box::new(inner)), self.span_from(start)))
            }
            Token::Exit | Token::Die => {
                self.advance();
                let mut status = None;
                if self.eat(&Token::LParen) {
                    if !self.peek_is(&Token::RParen) {
                        status = Some(Box::new(self.parse_expr(0)?));
                    }
                    self.expect(&Token::RParen)?;
                }
                Ok(Spanned::new(Expr::Exit(status), self.span_from(start)))
            }
            Token::Static if self.peek_at_is(1, &Token::ColonColon) => {
                self.advance();
                let class = ClassRef::Name(Spanned::new(Name::plain(self.text(start)), start));
                self.parse_static_access(class, start)
            }
            Token::Ident | Token::Backslash | Token::Namespace => self.parse_name_expr(),
            Token::Dollar => self.parse_variable_variable(),
            _ => Err(self.unexpected("in expression")),
        }
    }

    /// `$$name`, `$$$name`, ... or `${expr}`.
    fn parse_variable_variable(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect(&Token::Dollar)?;
        let inner = match self.peek() {
            Some(Spanned { node: Token::LBrace, .. }) => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RBrace)?;
                inner
            }
            Some(Spanned { node: Token::Variable(name), span }) => {
                self.advance();
                Spanned::new(Expr::Variable(name.clone()), *span)
            }
            Some(Spanned { node: Token::Dollar, .. }) => self.parse_variable_variable()?,
            _ => return Err(self.unexpected("after '$'")),
        };
        Ok(Spanned::new(Expr::VariableVariable(Box::new(inner)), self.span_from(start)))
    }

    /// `yield`, `yield v`, `yield k => v` or `yield from e`. Operands bind
    /// like the operand of `print`.
    fn parse_yield(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect(&Token::Yield)?;
        if let Some(tok) = self.peek() {
            if matches!(tok.node, Token::Ident) && self.text(tok.span).eq_ignore_ascii_case("from") {
                self.advance();
                let operand = self.parse_expr(BP_PRINT_OPERAND)?;
                let span = Span::new(start.start, operand.span.end);
                return Ok(Spanned::new(Expr::YieldFrom(Box::new(operand)), span));
            }
        }
        let bare = self.is_at_end()
            || matches!(
                self.peek().map(|t| &t.node),
                Some(Token::Semicolon | Token::CloseTag | Token::RParen | Token::RBracket | Token::Comma)
            );
        if bare {
            return Ok(Spanned::new(Expr::Yield { key: None, value: None }, start));
        }
        let first = self.parse_expr(BP_PRINT_OPERAND)?;
        let (key, value) = if self.eat(&Token::FatArrow) {
            (Some(Box::new(first)), self.parse_expr(BP_PRINT_OPERAND)?)
        } else {
            (None, first)
        };
        let span = Span::new(start.start, value.span.end);
        Ok(Spanned::new(Expr::Yield { key, value: Some(Box::new(value)) }, span))
    }

    /// Constant fetch, function call, magic constant or static access
    /// starting with a name.
    fn parse_name_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let name = self.parse_name()?;
        let start = name.span;

        if self.peek_is(&Token::LParen) {
            let args = self.parse_args()?;
            return Ok(Spanned::new(Expr::Call { callee: Callee::Name(name), args }, self.span_from(start)));
        }
        if self.peek_is(&Token::ColonColon) {
            return self.parse_static_access(ClassRef::Name(name), start);
        }
        if name.node.is_unqualified() {
            if let Some(magic) = MagicConst::from_ident(name.node.first()) {
                return Ok(Spanned::new(Expr::MagicConst(magic), start));
            }
        }
        Ok(Spanned::new(Expr::ConstFetch(name), start))
    }

    fn parse_static_access(&mut self, class: ClassRef, start: Span) -> Result<Spanned<Expr>, CompileError> {
        self.expect(&Token::ColonColon)?;
        if let Some(Spanned { node: Token::Variable(var), span }) = self.peek() {
            self.advance();
            if self.peek_is(&Token::LParen) {
                let method = MemberName::Expr(Box::new(Spanned::new(Expr::Variable(var.clone()), *span)));
                let args = self.parse_args()?;
                return Ok(Spanned::new(Expr::StaticCall { class, method, args }, self.span_from(start)));
            }
            return Ok(Spanned::new(
                Expr::StaticPropertyFetch { class, property: Spanned::new(var.clone(), *span) },
                self.span_from(start),
            ));
        }

        let name = self.expect_member_name()?;
        if self.peek_is(&Token::LParen) {
            let args = self.parse_args()?;
            return Ok(Spanned::new(
                Expr::StaticCall { class, method: MemberName::Ident(name), args },
                self.span_from(start),
            ));
        }
        Ok(Spanned::new(Expr::ClassConstFetch { class, name }, self.span_from(start)))
    }

    fn parse_postfix(&mut self, mut expr: Spanned<Expr>) -> Result<Spanned<Expr>, CompileError> {
        loop {
            let Some(tok) = self.peek() else { break };
            let start = expr.span;
            match tok.node {
                Token::LBracket => {
                    self.advance();
                    let index = if self.peek_is(&Token::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr(0)?))
                    };
                    self.expect(&Token::RBracket)?;
                    expr = Spanned::new(Expr::Index { object: Box::new(expr), index }, self.span_from(start));
                }
                Token::Arrow => {
                    self.advance();
                    let member = self.parse_member_name()?;
                    if self.peek_is(&Token::LParen) {
                        let args = self.parse_args()?;
                        expr = Spanned::new(
                            Expr::MethodCall { object: Box::new(expr), method: member, args },
                            self.span_from(start),
                        );
                    } else {
                        expr = Spanned::new(
                            Expr::PropertyFetch { object: Box::new(expr), property: member },
                            self.span_from(start),
                        );
                    }
                }
                Token::ColonColon => {
                    expr = self.parse_static_access(ClassRef::Expr(Box::new(expr)), start)?;
                }
                Token::LParen => {
                    let args = self.parse_args()?;
                    expr = Spanned::new(
                        Expr::Call { callee: Callee::Expr(Box::new(expr)), args },
                        self.span_from(start),
                    );
                }
                Token::PlusPlus | Token::MinusMinus => {
                    let op = if matches!(tok.node, Token::PlusPlus) { IncDecOp::PostInc } else { IncDecOp::PostDec };
                    self.advance();
                    expr = Spanned::new(Expr::IncDec { op, target: Box::new(expr) }, self.span_from(start));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Name after `->`: identifier, keyword, `$var` or `{expr}`.
    fn parse_member_name(&mut self) -> Result<MemberName, CompileError> {
        match self.peek() {
            Some(Spanned { node: Token::Variable(var), span }) => {
                self.advance();
                Ok(MemberName::Expr(Box::new(Spanned::new(Expr::Variable(var.clone()), *span))))
            }
            Some(Spanned { node: Token::LBrace, .. }) => {
                self.advance();
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RBrace)?;
                Ok(MemberName::Expr(Box::new(inner)))
            }
            Some(Spanned { node: Token::Dollar, .. }) => Ok(MemberName::Expr(Box::new(self.parse_variable_variable()?))),
            _ => Ok(MemberName::Ident(self.expect_member_name()?)),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, CompileError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.peek_is(&Token::RParen) {
            let unpack = self.eat(&Token::Ellipsis);
            let value = self.parse_expr(0)?;
            args.push(Arg { value, unpack });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    /// Array or list items. Empty slots (`[, $b]`) come back as `None`.
    fn parse_array_items(&mut self, close: &Token) -> Result<Vec<Option<ArrayItem>>, CompileError> {
        let mut items = Vec::new();
        while !self.peek_is(close) {
            if self.eat(&Token::Comma) {
                items.push(None);
                continue;
            }
            items.push(Some(self.parse_array_item()?));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_array_item(&mut self) -> Result<ArrayItem, CompileError> {
        if self.eat(&Token::Ellipsis) {
            let value = self.parse_expr(0)?;
            return Ok(ArrayItem { key: None, value, by_ref: false, spread: true });
        }
        if self.eat(&Token::Amp) {
            let value = self.parse_expr(0)?;
            return Ok(ArrayItem { key: None, value, by_ref: true, spread: false });
        }
        let first = self.parse_expr(0)?;
        if !self.eat(&Token::FatArrow) {
            return Ok(ArrayItem { key: None, value: first, by_ref: false, spread: false });
        }
        let by_ref = self.eat(&Token::Amp);
        let value = self.parse_expr(0)?;
        Ok(ArrayItem { key: Some(first), value, by_ref, spread: false })
    }

    fn parse_new(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect(&Token::New)?;
        if self.peek_is(&Token::Class) {
            return Err(CompileError::syntax("anonymous classes are not supported", self.current_span()));
        }
        let class = self.parse_class_ref(true)?;
        let args = if self.peek_is(&Token::LParen) { self.parse_args()? } else { Vec::new() };
        Ok(Spanned::new(Expr::New { class, args }, self.span_from(start)))
    }

    /// Class operand of `new` and `instanceof`. After `new` a dynamic class is
    /// limited to a variable with property and index accesses.
    fn parse_class_ref(&mut self, after_new: bool) -> Result<ClassRef, CompileError> {
        let Some(tok) = self.peek() else {
            return Err(CompileError::syntax("expected class name, found end of file", self.eof_span()));
        };
        match tok.node {
            Token::Static => {
                self.advance();
                Ok(ClassRef::Name(Spanned::new(Name::plain(self.text(tok.span)), tok.span)))
            }
            Token::Ident | Token::Backslash | Token::Namespace => Ok(ClassRef::Name(self.parse_name()?)),
            Token::Variable(_) | Token::Dollar if after_new => {
                let mut expr = self.parse_primary()?;
                loop {
                    let start = expr.span;
                    if self.eat(&Token::Arrow) {
                        let property = MemberName::Ident(self.expect_member_name()?);
                        expr = Spanned::new(
                            Expr::PropertyFetch { object: Box::new(expr), property },
                            self.span_from(start),
                        );
                    } else if self.eat(&Token::LBracket) {
                        let index = self.parse_expr(0)?;
                        self.expect(&Token::RBracket)?;
                        expr = Spanned::new(
                            Expr::Index { object: Box::new(expr), index: Some(Box::new(index)) },
                            self.span_from(start),
                        );
                    } else {
                        break;
                    }
                }
                Ok(ClassRef::Expr(Box::new(expr)))
            }
            Token::LParen => {
                let inner = self.parse_paren_expr()?;
                Ok(ClassRef::Expr(Box::new(inner)))
            }
            _ if !after_new => Ok(ClassRef::Expr(Box::new(self.parse_expr(BP_INSTANCEOF + 1)?))),
            _ => Err(self.unexpected("after new")),
        }
    }

    /// `function (...) use (...) { }` or `fn (...) => expr`, after any `static`.
    fn parse_closure(&mut self, is_static: bool, start: Span) -> Result<Spanned<Expr>, CompileError> {
        if self.eat(&Token::Fn) {
            let by_ref = self.eat(&Token::Amp);
            let params = self.parse_params()?;
            let return_type = self.parse_return_type()?;
            self.expect(&Token::FatArrow)?;
            let body = self.parse_expr(0)?;
            return Ok(Spanned::new(
                Expr::ArrowFunction(ArrowFunction { is_static, by_ref, params, return_type, body: Box::new(body) }),
                self.span_from(start),
            ));
        }

        self.expect(&Token::Function)?;
        let by_ref = self.eat(&Token::Amp);
        let params = self.parse_params()?;
        let mut uses = Vec::new();
        if self.eat(&Token::Use) {
            self.expect(&Token::LParen)?;
            while !self.peek_is(&Token::RParen) {
                let by_ref = self.eat(&Token::Amp);
                let name = self.expect_variable()?;
                uses.push(ClosureUse { name, by_ref });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        }
        let return_type = self.parse_return_type()?;
        let body = self.parse_block()?;
        Ok(Spanned::new(
            Expr::Closure(Closure { is_static, by_ref, params, uses, return_type, body }),
            self.span_from(start),
        ))
    }
}

fn same_kind(a: &Token, b: &Token) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Ident | Token::InlineHtml(_) | Token::Comment => tok.to_string(),
        Token::Variable(_) | Token::IntLit(_) | Token::FloatLit(_) => format!("'{tok}'"),
        Token::StringLit(_) | Token::TemplateLit(_) | Token::DocString(_) => "string literal".to_string(),
        _ => format!("'{tok}'"),
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Variable(_)
            | Expr::VariableVariable(_)
            | Expr::Index { .. }
            | Expr::PropertyFetch { .. }
            | Expr::StaticPropertyFetch { .. }
            | Expr::List { .. }
            | Expr::Array { kind: ArrayKind::Short, .. }
    )
}

/// Arrays written with empty slots can only be destructuring targets.
fn array_or_list(kind: ArrayKind, items: Vec<Option<ArrayItem>>) -> Expr {
    if items.iter().any(Option::is_none) {
        return Expr::List { kind, items };
    }
    Expr::Array { kind, items: items.into_iter().flatten().collect() }
}

/// Turn a short array used as an assignment or foreach target into a list,
/// nested arrays included.
fn into_destructuring(expr: Spanned<Expr>) -> Result<Spanned<Expr>, CompileError> {
    let Spanned { node, span } = expr;
    match node {
        Expr::Array { kind: ArrayKind::Short, items } => {
            let items = items
                .into_iter()
                .map(|item| destructure_item(item).map(Some))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Spanned::new(Expr::List { kind: ArrayKind::Short, items }, span))
        }
        Expr::List { kind, items } => {
            let items = items
                .into_iter()
                .map(|item| item.map(destructure_item).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Spanned::new(Expr::List { kind, items }, span))
        }
        Expr::Array { kind: ArrayKind::Long, .. } => {
            Err(CompileError::syntax("cannot assign to array(), use list() instead", span))
        }
        other => Ok(Spanned::new(other, span)),
    }
}

fn destructure_item(item: ArrayItem) -> Result<ArrayItem, CompileError> {
    if item.spread {
        return Err(CompileError::syntax("spread is not allowed in destructuring", item.value.span));
    }
    let value = match item.value.node {
        Expr::Array { kind: ArrayKind::Short, .. } | Expr::List { .. } => into_destructuring(item.value)?,
        _ => item.value,
    };
    Ok(ArrayItem { value, ..item })
}

fn binary_op(tok: &Token) -> Option<BinOp> {
    Some(match tok {
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::Percent => BinOp::Mod,
        Token::StarStar => BinOp::Pow,
        Token::Dot => BinOp::Concat,
        Token::EqEq => BinOp::Eq,
        Token::BangEq | Token::LtGt => BinOp::NotEq,
        Token::EqEqEq => BinOp::Identical,
        Token::BangEqEq => BinOp::NotIdentical,
        Token::Lt => BinOp::Lt,
        Token::Gt => BinOp::Gt,
        Token::LtEq => BinOp::LtEq,
        Token::GtEq => BinOp::GtEq,
        Token::Spaceship => BinOp::Spaceship,
        Token::AmpAmp => BinOp::And,
        Token::PipePipe => BinOp::Or,
        Token::LogicalAnd => BinOp::LogicalAnd,
        Token::LogicalOr => BinOp::LogicalOr,
        Token::LogicalXor => BinOp::LogicalXor,
        Token::Amp => BinOp::BitAnd,
        Token::Pipe => BinOp::BitOr,
        Token::Caret => BinOp::BitXor,
        Token::Shl => BinOp::Shl,
        Token::Shr => BinOp::Shr,
        Token::QuestionQuestion => BinOp::Coalesce,
        _ => return None,
    })
}

fn compound_assign_op(tok: &Token) -> Option<AssignOp> {
    Some(match tok {
        Token::PlusEq => AssignOp::Add,
        Token::MinusEq => AssignOp::Sub,
        Token::StarEq => AssignOp::Mul,
        Token::SlashEq => AssignOp::Div,
        Token::PercentEq => AssignOp::Mod,
        Token::StarStarEq => AssignOp::Pow,
        Token::DotEq => AssignOp::Concat,
        Token::AmpEq => AssignOp::BitAnd,
        Token::PipeEq => AssignOp::BitOr,
        Token::CaretEq => AssignOp::BitXor,
        Token::ShlEq => AssignOp::Shl,
        Token::ShrEq => AssignOp::Shr,
        Token::QuestionQuestionEq => AssignOp::Coalesce,
        _ => return None,
    })
}

pub fn infix_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::LogicalOr => (2, 3),
        BinOp::LogicalXor => (4, 5),
        BinOp::LogicalAnd => (6, 7),
        BinOp::Coalesce => (15, 14),
        BinOp::Or => (16, 17),
        BinOp::And => (18, 19),
        BinOp::BitOr => (20, 21),
        BinOp::BitXor => (22, 23),
        BinOp::BitAnd => (24, 25),
        BinOp::Eq | BinOp::NotEq | BinOp::Identical | BinOp::NotIdentical | BinOp::Spaceship => (26, 27),
        BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => (28, 29),
        BinOp::Concat => (30, 31),
        BinOp::Shl | BinOp::Shr => (32, 33),
        BinOp::Add | BinOp::Sub => (34, 35),
        BinOp::Mul | BinOp::Div | BinOp::Mod => (36, 37),
        BinOp::Pow => (45, 44),
    }
}
