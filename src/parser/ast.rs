use serde::Serialize;

use crate::span::Spanned;

/// Separator used when a namespace path is collapsed into one identifier.
pub const FLAT_SEPARATOR: &str = "_";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// A namespace path such as `App\Util\f`, stored as its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName(pub Vec<String>);

impl QualifiedName {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// `prefix\suffix`; an absent prefix means the global namespace.
    pub fn concat(prefix: Option<&QualifiedName>, suffix: &[String]) -> Self {
        let mut parts = prefix.map(|p| p.0.clone()).unwrap_or_default();
        parts.extend(suffix.iter().cloned());
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// Collapse the path into a single identifier: `App\Util\f` -> `App_Util_f`.
    pub fn flatten(&self) -> String {
        self.0.join(FLAT_SEPARATOR)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("\\"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameKind {
    /// `foo`
    Unqualified,
    /// `Foo\bar`
    Qualified,
    /// `\Foo\bar`
    FullyQualified,
    /// `namespace\bar`
    Relative,
}

/// A name reference. The resolver turns statically resolvable names into
/// `FullyQualified` ones; unqualified function and constant names inside a
/// namespace stay as written and get `namespaced` instead, because the
/// source dialect decides between `ns\name` and the global `name` at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Name {
    pub kind: NameKind,
    pub parts: Vec<String>,
    pub namespaced: Option<QualifiedName>,
}

impl Name {
    pub fn new(kind: NameKind, parts: Vec<String>) -> Self {
        Self { kind, parts, namespaced: None }
    }

    /// A single-segment unqualified name with no resolver metadata.
    pub fn plain(name: impl Into<String>) -> Self {
        Self { kind: NameKind::Unqualified, parts: vec![name.into()], namespaced: None }
    }

    pub fn fully_qualified(name: QualifiedName) -> Self {
        Self { kind: NameKind::FullyQualified, parts: name.0, namespaced: None }
    }

    pub fn is_unqualified(&self) -> bool {
        self.kind == NameKind::Unqualified
    }

    pub fn first(&self) -> &str {
        self.parts.first().map(String::as_str).unwrap_or("")
    }

    pub fn last(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    pub fn to_qualified(&self) -> QualifiedName {
        QualifiedName(self.parts.clone())
    }

    /// `self`, `parent` and `static` never refer to a declared class name.
    pub fn is_special_class_name(&self) -> bool {
        self.is_unqualified()
            && matches!(self.first().to_ascii_lowercase().as_str(), "self" | "parent" | "static")
    }
}

/// Renders the name without its leading `\` or `namespace\` prefix.
impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.parts.join("\\"))
    }
}

// ── Statements ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    InlineHtml(String),
    Namespace {
        name: Option<Spanned<Name>>,
        stmts: Vec<Spanned<Stmt>>,
        braced: bool,
    },
    Use {
        kind: UseKind,
        uses: Vec<UseItem>,
    },
    GroupUse {
        kind: UseKind,
        prefix: Spanned<Name>,
        uses: Vec<UseItem>,
    },
    Declare {
        directives: Vec<DeclareDirective>,
        body: Option<Vec<Spanned<Stmt>>>,
    },
    Const(Vec<ConstItem>),
    Function(Function),
    ClassLike(ClassLike),
    Echo(Vec<Spanned<Expr>>),
    Return(Option<Spanned<Expr>>),
    If {
        cond: Spanned<Expr>,
        then_branch: Vec<Spanned<Stmt>>,
        elseifs: Vec<ElseIf>,
        else_branch: Option<Vec<Spanned<Stmt>>>,
    },
    While {
        cond: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },
    DoWhile {
        body: Vec<Spanned<Stmt>>,
        cond: Spanned<Expr>,
    },
    For {
        init: Vec<Spanned<Expr>>,
        cond: Vec<Spanned<Expr>>,
        step: Vec<Spanned<Expr>>,
        body: Vec<Spanned<Stmt>>,
    },
    Foreach {
        subject: Spanned<Expr>,
        key: Option<Spanned<Expr>>,
        by_ref: bool,
        value: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },
    Switch {
        subject: Spanned<Expr>,
        cases: Vec<SwitchCase>,
    },
    Break(Option<Spanned<Expr>>),
    Continue(Option<Spanned<Expr>>),
    Global(Vec<Spanned<Expr>>),
    StaticVars(Vec<StaticVar>),
    Unset(Vec<Spanned<Expr>>),
    Throw(Spanned<Expr>),
    Try {
        body: Vec<Spanned<Stmt>>,
        catches: Vec<Catch>,
        finally: Option<Vec<Spanned<Stmt>>>,
    },
    Block(Vec<Spanned<Stmt>>),
    Expr(Spanned<Expr>),
    Goto(Spanned<String>),
    Label(Spanned<String>),
    /// `__halt_compiler();` followed by the raw data after it.
    HaltCompiler(String),
    Nop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UseKind {
    Normal,
    Function,
    Const,
    /// Group use whose items each carry their own kind.
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UseItem {
    /// Only set inside a mixed group use (`use A\{function f, const C}`).
    pub kind: Option<UseKind>,
    pub name: Spanned<Name>,
    pub alias: Option<String>,
}

impl UseItem {
    /// The local name this import binds.
    pub fn binding_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.name.node.last(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclareDirective {
    pub key: String,
    pub value: Spanned<Expr>,
}

/// One `NAME = value` entry of a `const` statement or class constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstItem {
    pub name: Spanned<String>,
    pub value: Spanned<Expr>,
    /// Set by the resolver for top-level `const` statements.
    pub namespaced_name: Option<QualifiedName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: Spanned<String>,
    pub namespaced_name: Option<QualifiedName>,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<Spanned<TypeHint>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Option<Spanned<TypeHint>>,
    pub default: Option<Spanned<Expr>>,
    pub by_ref: bool,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeHint {
    /// `int`, `string`, `array`, `callable`, `self`, ...
    Builtin(String),
    Named(Spanned<Name>),
    Nullable(Box<TypeHint>),
    Union(Vec<TypeHint>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassLike {
    pub kind: ClassKind,
    pub name: Spanned<String>,
    pub namespaced_name: Option<QualifiedName>,
    pub modifiers: Modifiers,
    /// Parent class for classes; parent interfaces for interfaces.
    pub extends: Vec<Spanned<Name>>,
    pub implements: Vec<Spanned<Name>>,
    pub members: Vec<Spanned<ClassMember>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        *self == Modifiers::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClassMember {
    TraitUse(Vec<Spanned<Name>>),
    Const {
        modifiers: Modifiers,
        consts: Vec<ConstItem>,
    },
    Property {
        modifiers: Modifiers,
        /// Written with `var` instead of a visibility keyword.
        is_var: bool,
        ty: Option<Spanned<TypeHint>>,
        props: Vec<PropertyItem>,
    },
    Method(Method),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyItem {
    pub name: Spanned<String>,
    pub default: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub modifiers: Modifiers,
    pub name: Spanned<String>,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<Spanned<TypeHint>>,
    /// `None` for abstract and interface methods.
    pub body: Option<Vec<Spanned<Stmt>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElseIf {
    pub cond: Spanned<Expr>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Spanned<Expr>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticVar {
    pub name: Spanned<String>,
    pub default: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catch {
    pub types: Vec<Spanned<Name>>,
    pub var: Option<Spanned<String>>,
    pub body: Vec<Spanned<Stmt>>,
}

// ── Expressions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Variable(String),
    IntLit(String),
    FloatLit(String),
    /// Single-quoted semantics; the value is already unescaped.
    StringLit(String),
    /// Raw body of a double-quoted string, printed back verbatim.
    TemplateLit(String),
    DocString(DocString),
    /// Raw body of a backtick command.
    ShellExec(String),
    /// `$$name` or `${expr}`.
    VariableVariable(Box<Spanned<Expr>>),
    MagicConst(MagicConst),
    ConstFetch(Spanned<Name>),
    ClassConstFetch {
        class: ClassRef,
        name: Spanned<String>,
    },
    Array {
        kind: ArrayKind,
        items: Vec<ArrayItem>,
    },
    /// Destructuring target: `list($a, , $b)` or `[$a, $b]`.
    List {
        kind: ArrayKind,
        items: Vec<Option<ArrayItem>>,
    },
    Call {
        callee: Callee,
        args: Vec<Arg>,
    },
    MethodCall {
        object: Box<Spanned<Expr>>,
        method: MemberName,
        args: Vec<Arg>,
    },
    StaticCall {
        class: ClassRef,
        method: MemberName,
        args: Vec<Arg>,
    },
    PropertyFetch {
        object: Box<Spanned<Expr>>,
        property: MemberName,
    },
    StaticPropertyFetch {
        class: ClassRef,
        property: Spanned<String>,
    },
    Index {
        object: Box<Spanned<Expr>>,
        /// `None` for the append form `$a[]`.
        index: Option<Box<Spanned<Expr>>>,
    },
    New {
        class: ClassRef,
        args: Vec<Arg>,
    },
    Clone(Box<Spanned<Expr>>),
    Closure(Closure),
    ArrowFunction(ArrowFunction),
    Ternary {
        cond: Box<Spanned<Expr>>,
        /// `None` for the shorthand `a ?: b`.
        then_expr: Option<Box<Spanned<Expr>>>,
        else_expr: Box<Spanned<Expr>>,
    },
    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    IncDec {
        op: IncDecOp,
        target: Box<Spanned<Expr>>,
    },
    Cast {
        kind: CastKind,
        expr: Box<Spanned<Expr>>,
    },
    Assign {
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
        by_ref: bool,
    },
    CompoundAssign {
        op: AssignOp,
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    Instanceof {
        expr: Box<Spanned<Expr>>,
        class: ClassRef,
    },
    Isset(Vec<Spanned<Expr>>),
    Empty(Box<Spanned<Expr>>),
    Exit(Option<Box<Spanned<Expr>>>),
    Print(Box<Spanned<Expr>>),
    Yield {
        key: Option<Box<Spanned<Expr>>>,
        /// `None` for a bare `yield`.
        value: Option<Box<Spanned<Expr>>>,
    },
    YieldFrom(Box<Spanned<Expr>>),
    Include {
        kind: IncludeKind,
        expr: Box<Spanned<Expr>>,
    },
}

/// Heredoc (`<<<EOT`) or nowdoc (`<<<'EOT'`). The body runs from the line
/// after the opener up to the closing line, and `indent` is whatever precedes
/// the closing label on that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocString {
    pub label: String,
    pub nowdoc: bool,
    pub body: String,
    pub indent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MagicConst {
    Line,
    File,
    Dir,
    Function,
    Class,
    Trait,
    Method,
    Namespace,
}

impl MagicConst {
    pub fn from_ident(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "__LINE__" => Self::Line,
            "__FILE__" => Self::File,
            "__DIR__" => Self::Dir,
            "__FUNCTION__" => Self::Function,
            "__CLASS__" => Self::Class,
            "__TRAIT__" => Self::Trait,
            "__METHOD__" => Self::Method,
            "__NAMESPACE__" => Self::Namespace,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "__LINE__",
            Self::File => "__FILE__",
            Self::Dir => "__DIR__",
            Self::Function => "__FUNCTION__",
            Self::Class => "__CLASS__",
            Self::Trait => "__TRAIT__",
            Self::Method => "__METHOD__",
            Self::Namespace => "__NAMESPACE__",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrayKind {
    /// `array(...)`
    Long,
    /// `[...]`
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayItem {
    pub key: Option<Spanned<Expr>>,
    pub value: Spanned<Expr>,
    pub by_ref: bool,
    pub spread: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Callee {
    Name(Spanned<Name>),
    Expr(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub value: Spanned<Expr>,
    pub unpack: bool,
}

impl Arg {
    pub fn new(value: Spanned<Expr>) -> Self {
        Self { value, unpack: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClassRef {
    Name(Spanned<Name>),
    Expr(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MemberName {
    Ident(Spanned<String>),
    Expr(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Closure {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub uses: Vec<ClosureUse>,
    pub return_type: Option<Spanned<TypeHint>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureUse {
    pub name: Spanned<String>,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrowFunction {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<Spanned<TypeHint>>,
    pub body: Box<Spanned<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    NotEq,
    Identical,
    NotIdentical,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Spaceship,
    And,
    Or,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Silence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

impl CastKind {
    pub fn from_keyword(s: &str) -> Option<Self> {
        Some(match s.to_ascii_lowercase().as_str() {
            "int" | "integer" => Self::Int,
            "float" | "double" | "real" => Self::Float,
            "string" | "binary" => Self::String,
            "bool" | "boolean" => Self::Bool,
            "array" => Self::Array,
            "object" => Self::Object,
            "unset" => Self::Unset,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Object => "object",
            Self::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

impl IncludeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::IncludeOnce => "include_once",
            Self::Require => "require",
            Self::RequireOnce => "require_once",
        }
    }
}
