use logos::{Lexer, Logos};

use crate::parser::ast::DocString;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords (case-insensitive in the source dialect)
    #[token("abstract", ignore(ascii_case))]
    Abstract,
    #[token("and", ignore(ascii_case))]
    LogicalAnd,
    #[token("array", ignore(ascii_case))]
    Array,
    #[token("as", ignore(ascii_case))]
    As,
    #[token("break", ignore(ascii_case))]
    Break,
    #[token("case", ignore(ascii_case))]
    Case,
    #[token("catch", ignore(ascii_case))]
    Catch,
    #[token("class", ignore(ascii_case))]
    Class,
    #[token("clone", ignore(ascii_case))]
    Clone,
    #[token("const", ignore(ascii_case))]
    Const,
    #[token("continue", ignore(ascii_case))]
    Continue,
    #[token("declare", ignore(ascii_case))]
    Declare,
    #[token("default", ignore(ascii_case))]
    Default,
    #[token("die", ignore(ascii_case))]
    Die,
    #[token("do", ignore(ascii_case))]
    Do,
    #[token("echo", ignore(ascii_case))]
    Echo,
    #[token("else", ignore(ascii_case))]
    Else,
    #[token("elseif", ignore(ascii_case))]
    ElseIf,
    #[token("empty", ignore(ascii_case))]
    Empty,
    #[token("exit", ignore(ascii_case))]
    Exit,
    #[token("extends", ignore(ascii_case))]
    Extends,
    #[token("final", ignore(ascii_case))]
    Final,
    #[token("finally", ignore(ascii_case))]
    Finally,
    #[token("fn", ignore(ascii_case))]
    Fn,
    #[token("for", ignore(ascii_case))]
    For,
    #[token("foreach", ignore(ascii_case))]
    Foreach,
    #[token("function", ignore(ascii_case))]
    Function,
    #[token("global", ignore(ascii_case))]
    Global,
    #[token("goto", ignore(ascii_case))]
    Goto,
    #[token("if", ignore(ascii_case))]
    If,
    #[token("implements", ignore(ascii_case))]
    Implements,
    #[token("include", ignore(ascii_case))]
    Include,
    #[token("include_once", ignore(ascii_case))]
    IncludeOnce,
    #[token("instanceof", ignore(ascii_case))]
    Instanceof,
    #[token("interface", ignore(ascii_case))]
    Interface,
    #[token("isset", ignore(ascii_case))]
    Isset,
    #[token("list", ignore(ascii_case))]
    List,
    #[token("namespace", ignore(ascii_case))]
    Namespace,
    #[token("new", ignore(ascii_case))]
    New,
    #[token("or", ignore(ascii_case))]
    LogicalOr,
    #[token("print", ignore(ascii_case))]
    Print,
    #[token("private", ignore(ascii_case))]
    Private,
    #[token("protected", ignore(ascii_case))]
    Protected,
    #[token("public", ignore(ascii_case))]
    Public,
    #[token("require", ignore(ascii_case))]
    Require,
    #[token("require_once", ignore(ascii_case))]
    RequireOnce,
    #[token("return", ignore(ascii_case))]
    Return,
    #[token("static", ignore(ascii_case))]
    Static,
    #[token("switch", ignore(ascii_case))]
    Switch,
    #[token("throw", ignore(ascii_case))]
    Throw,
    #[token("trait", ignore(ascii_case))]
    Trait,
    #[token("try", ignore(ascii_case))]
    Try,
    #[token("unset", ignore(ascii_case))]
    Unset,
    #[token("use", ignore(ascii_case))]
    Use,
    #[token("var", ignore(ascii_case))]
    Var,
    #[token("while", ignore(ascii_case))]
    While,
    #[token("xor", ignore(ascii_case))]
    LogicalXor,
    #[token("yield", ignore(ascii_case))]
    Yield,

    // Literals (raw spelling is kept so the printer reproduces it)
    #[regex(r"0[xX][0-9a-fA-F_]+|0[bB][01_]+|[0-9][0-9_]*", |lex| lex.slice().to_string())]
    IntLit(String),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", |lex| lex.slice().to_string())]
    FloatLit(String),

    /// Single-quoted string, decoded.
    #[regex(r"'([^'\\]|\\(.|\n))*'", |lex| {
        let s = lex.slice();
        unescape_single(&s[1..s.len() - 1])
    })]
    StringLit(String),

    /// Double-quoted string, raw body between the quotes.
    #[regex(r#""([^"\\]|\\(.|\n))*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    TemplateLit(String),

    /// Heredoc or nowdoc, body kept verbatim.
    #[token("<<<", doc_string)]
    DocString(DocString),

    /// Backtick shell command, raw body between the backticks.
    #[regex(r"`([^`\\]|\\(.|\n))*`", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    ShellExec(String),

    // Bytes 0x80 and up are identifier characters in the source dialect.
    #[regex(r"\$[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*", |lex| lex.slice()[1..].to_string())]
    Variable(String),

    /// A `$` not directly followed by a name: `$$v`, `${expr}`.
    #[token("$")]
    Dollar,

    // Identifiers
    #[regex(r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Ident,

    // Operators
    #[token("++")]
    PlusPlus,
    #[token("+")]
    Plus,
    #[token("--")]
    MinusMinus,
    #[token("-")]
    Minus,
    #[token("**")]
    StarStar,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("**=")]
    StarStarEq,
    #[token("/=")]
    SlashEq,
    #[token(".=")]
    DotEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("<<=")]
    ShlEq,
    #[token(">>=")]
    ShrEq,
    #[token("??=")]
    QuestionQuestionEq,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    BangEq,
    #[token("<>")]
    LtGt,
    #[token("!==")]
    BangEqEq,
    #[token("<=>")]
    Spaceship,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,
    #[token("@")]
    At,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("::")]
    ColonColon,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("...")]
    Ellipsis,
    #[token("?")]
    Question,
    #[token("??")]
    QuestionQuestion,
    #[token("\\")]
    Backslash,

    /// Close tag `?>`. Ends a code section and terminates the statement before it.
    #[token("?>")]
    CloseTag,

    /// Text outside `<?php ... ?>`. Never produced by logos directly; the
    /// tag-splitting loop in `lex` creates it.
    InlineHtml(String),

    /// `__halt_compiler();` with everything after it. Built by `lex`.
    HaltCompiler(String),

    // Comments (skip)
    #[token("//", line_comment)]
    #[token("#", line_comment)]
    #[token("/*", block_comment)]
    Comment,
}

/// An unclosed `/*` is an error rather than `/` followed by `*`.
fn block_comment(lex: &mut Lexer<Token>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Line comments stop at the newline or just before `?>`.
fn line_comment(lex: &mut Lexer<Token>) -> bool {
    let rest = lex.remainder();
    let line = rest.find('\n').map_or(rest, |end| &rest[..end]);
    lex.bump(line.find("?>").unwrap_or(line.len()));
    true
}

pub(crate) fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

/// Everything after `<<<`: the opening label line, the body and the closing
/// label, which may be indented.
fn doc_string(lex: &mut Lexer<Token>) -> Option<DocString> {
    let rest = lex.remainder();
    let mut pos = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let quote = rest[pos..].chars().next().filter(|c| matches!(c, '\'' | '"'));
    if quote.is_some() {
        pos += 1;
    }
    let label_len = rest[pos..].find(|c: char| !is_label_char(c)).unwrap_or(rest.len() - pos);
    let label = &rest[pos..pos + label_len];
    if label.is_empty() || label.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    pos += label_len;
    if let Some(q) = quote {
        if !rest[pos..].starts_with(q) {
            return None;
        }
        pos += 1;
    }
    if rest[pos..].starts_with("\r\n") {
        pos += 2;
    } else if rest[pos..].starts_with('\n') {
        pos += 1;
    } else {
        return None;
    }

    let body_start = pos;
    let mut line_start = pos;
    loop {
        let line = &rest[line_start..];
        let trimmed = line.trim_start_matches([' ', '\t']);
        let indent_len = line.len() - trimmed.len();
        if let Some(after) = trimmed.strip_prefix(label) {
            if !after.starts_with(is_label_char) {
                let doc = DocString {
                    label: label.to_string(),
                    nowdoc: quote == Some('\''),
                    body: rest[body_start..line_start].to_string(),
                    indent: line[..indent_len].to_string(),
                };
                lex.bump(line_start + indent_len + label.len());
                return Some(doc);
            }
        }
        line_start += line.find('\n')? + 1;
    }
}

fn unescape_single(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\\') | Some('\'') => {
                    if let Some(next) = chars.next() {
                        result.push(next);
                    }
                }
                _ => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

impl Token {
    /// Keywords may still appear as member, constant and method names after
    /// `->` and `::`, and as namespace segments.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Abstract | Token::LogicalAnd | Token::Array | Token::As | Token::Break
                | Token::Case | Token::Catch | Token::Class | Token::Clone | Token::Const
                | Token::Continue | Token::Declare | Token::Default | Token::Die | Token::Do
                | Token::Echo | Token::Else | Token::ElseIf | Token::Empty | Token::Exit
                | Token::Extends | Token::Final | Token::Finally | Token::Fn | Token::For
                | Token::Foreach | Token::Function | Token::Global | Token::Goto | Token::If
                | Token::Implements | Token::Include | Token::IncludeOnce | Token::Instanceof
                | Token::Interface | Token::Isset | Token::List | Token::Namespace | Token::New
                | Token::LogicalOr | Token::Print | Token::Private | Token::Protected
                | Token::Public | Token::Require | Token::RequireOnce | Token::Return
                | Token::Static | Token::Switch | Token::Throw | Token::Trait | Token::Try
                | Token::Unset | Token::Use | Token::Var | Token::While | Token::LogicalXor
                | Token::Yield
        )
    }
}

/// Returns true if the given string is a keyword of the source dialect.
pub fn is_keyword(s: &str) -> bool {
    let mut lexer = Token::lexer(s);
    matches!(lexer.next(), Some(Ok(tok)) if tok.is_keyword()) && lexer.span().len() == s.len()
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Abstract => write!(f, "abstract"),
            Token::LogicalAnd => write!(f, "and"),
            Token::Array => write!(f, "array"),
            Token::As => write!(f, "as"),
            Token::Break => write!(f, "break"),
            Token::Case => write!(f, "case"),
            Token::Catch => write!(f, "catch"),
            Token::Class => write!(f, "class"),
            Token::Clone => write!(f, "clone"),
            Token::Const => write!(f, "const"),
            Token::Continue => write!(f, "continue"),
            Token::Declare => write!(f, "declare"),
            Token::Default => write!(f, "default"),
            Token::Die => write!(f, "die"),
            Token::Do => write!(f, "do"),
            Token::Echo => write!(f, "echo"),
            Token::Else => write!(f, "else"),
            Token::ElseIf => write!(f, "elseif"),
            Token::Empty => write!(f, "empty"),
            Token::Exit => write!(f, "exit"),
            Token::Extends => write!(f, "extends"),
            Token::Final => write!(f, "final"),
            Token::Finally => write!(f, "finally"),
            Token::Fn => write!(f, "fn"),
            Token::For => write!(f, "for"),
            Token::Foreach => write!(f, "foreach"),
            Token::Function => write!(f, "function"),
            Token::Global => write!(f, "global"),
            Token::Goto => write!(f, "goto"),
            Token::If => write!(f, "if"),
            Token::Implements => write!(f, "implements"),
            Token::Include => write!(f, "include"),
            Token::IncludeOnce => write!(f, "include_once"),
            Token::Instanceof => write!(f, "instanceof"),
            Token::Interface => write!(f, "interface"),
            Token::Isset => write!(f, "isset"),
            Token::List => write!(f, "list"),
            Token::Namespace => write!(f, "namespace"),
            Token::New => write!(f, "new"),
            Token::LogicalOr => write!(f, "or"),
            Token::Print => write!(f, "print"),
            Token::Private => write!(f, "private"),
            Token::Protected => write!(f, "protected"),
            Token::Public => write!(f, "public"),
            Token::Require => write!(f, "require"),
            Token::RequireOnce => write!(f, "require_once"),
            Token::Return => write!(f, "return"),
            Token::Static => write!(f, "static"),
            Token::Switch => write!(f, "switch"),
            Token::Throw => write!(f, "throw"),
            Token::Trait => write!(f, "trait"),
            Token::Try => write!(f, "try"),
            Token::Unset => write!(f, "unset"),
            Token::Use => write!(f, "use"),
            Token::Var => write!(f, "var"),
            Token::While => write!(f, "while"),
            Token::LogicalXor => write!(f, "xor"),
            Token::Yield => write!(f, "yield"),
            Token::IntLit(s) | Token::FloatLit(s) => write!(f, "{s}"),
            Token::StringLit(s) => write!(f, "'{s}'"),
            Token::TemplateLit(s) => write!(f, "\"{s}\""),
            Token::DocString(doc) => write!(f, "<<<{}", doc.label),
            Token::ShellExec(s) => write!(f, "`{s}`"),
            Token::Dollar => write!(f, "$"),
            Token::Variable(name) => write!(f, "${name}"),
            Token::Ident => write!(f, "identifier"),
            Token::PlusPlus => write!(f, "++"),
            Token::Plus => write!(f, "+"),
            Token::MinusMinus => write!(f, "--"),
            Token::Minus => write!(f, "-"),
            Token::StarStar => write!(f, "**"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Dot => write!(f, "."),
            Token::Eq => write!(f, "="),
            Token::PlusEq => write!(f, "+="),
            Token::MinusEq => write!(f, "-="),
            Token::StarEq => write!(f, "*="),
            Token::StarStarEq => write!(f, "**="),
            Token::SlashEq => write!(f, "/="),
            Token::DotEq => write!(f, ".="),
            Token::PercentEq => write!(f, "%="),
            Token::AmpEq => write!(f, "&="),
            Token::PipeEq => write!(f, "|="),
            Token::CaretEq => write!(f, "^="),
            Token::ShlEq => write!(f, "<<="),
            Token::ShrEq => write!(f, ">>="),
            Token::QuestionQuestionEq => write!(f, "??="),
            Token::EqEq => write!(f, "=="),
            Token::EqEqEq => write!(f, "==="),
            Token::BangEq => write!(f, "!="),
            Token::LtGt => write!(f, "<>"),
            Token::BangEqEq => write!(f, "!=="),
            Token::Spaceship => write!(f, "<=>"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::At => write!(f, "@"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::ColonColon => write!(f, "::"),
            Token::Arrow => write!(f, "->"),
            Token::FatArrow => write!(f, "=>"),
            Token::Ellipsis => write!(f, "..."),
            Token::Question => write!(f, "?"),
            Token::QuestionQuestion => write!(f, "??"),
            Token::Backslash => write!(f, "\\"),
            Token::CloseTag => write!(f, "?>"),
            Token::InlineHtml(_) => write!(f, "inline HTML"),
            Token::HaltCompiler(_) => write!(f, "__halt_compiler"),
            Token::Comment => write!(f, "comment"),
        }
    }
}
