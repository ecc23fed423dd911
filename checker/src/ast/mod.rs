/**
Abstract Syntax Tree definitions for Mica

This module is the input contract of the checker: the parser produces these
nodes, the checker only reads them. Every node carries a `NodeId` (a stable
identity used as the key of the checker's output tables) and a `Span` for
diagnostics; the checker never mutates the tree or needs annotation fields
on it.
*/
use std::fmt;

/// Stable identity of an AST node.
///
/// Allocated by the parser through [`NodeIds`]; unique within one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocator for [`NodeId`]s.
#[derive(Debug, Default)]
pub struct NodeIds {
    next: u32,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// A byte range in the module's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// A synthetic location (for generated nodes or tests).
    pub fn unknown() -> Self {
        Span { start: 0, end: 0 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An identifier occurrence. Each occurrence has its own node identity,
/// which is what lets the checker distinguish definitions from uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A parsed module: a name plus its top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleAst {
    pub name: String,
    pub decls: Vec<Decl>,
}

/// Top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Let(LetDecl),
    Func(FuncDecl),
    Type(TypeDecl),
    Use(UseDecl),
}

impl Decl {
    pub fn id(&self) -> NodeId {
        match self {
            Decl::Let(d) => d.id,
            Decl::Func(d) => d.id,
            Decl::Type(d) => d.id,
            Decl::Use(d) => d.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Let(d) => d.span,
            Decl::Func(d) => d.span,
            Decl::Type(d) => d.span,
            Decl::Use(d) => d.span,
        }
    }
}

/// `let [mut] name [: type] [= value]`, at module or block level.
#[derive(Debug, Clone, PartialEq)]
pub struct LetDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub is_mut: bool,
    pub extern_name: Option<String>,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
}

/// `fn name(params) [result] { body }`
///
/// Extern functions have an extern name and no body.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    pub result: Option<TypeExpr>,
    pub body: Option<BlockExpr>,
    pub extern_name: Option<String>,
}

/// A function parameter: explicitly typed, optionally labelled, and
/// variadic only when it is the tail parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub span: Span,
    pub label: Option<Ident>,
    pub name: Ident,
    pub ty: TypeExpr,
    pub is_variadic: bool,
}

/// `type Name = <type>` or `type Name { members }`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    /// Type parameters are recognized but unsupported.
    pub type_params: Vec<Ident>,
    pub body: TypeDeclBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclBody {
    Alias(TypeExpr),
    Members(Vec<Member>),
}

/// A member of a custom type body: a field or a named variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldMember),
    Variant(VariantMember),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMember {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantMember {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub params: Vec<VariantParam>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantParam {
    pub id: NodeId,
    pub span: Span,
    pub label: Option<Ident>,
    pub ty: TypeExpr,
}

/// `use module` or `use module (a, b)`: merges value symbols of a
/// completed module into the current scope.
#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub id: NodeId,
    pub span: Span,
    pub module: Ident,
    pub names: Option<Vec<Ident>>,
}

/// Statement inside a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetDecl),
    Expr(Expr),
}

/// Expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Name(Ident),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(CallExpr),
    Field(FieldExpr),
    Index(IndexExpr),
    Tuple(TupleExpr),
    Array(ArrayExpr),
    Block(BlockExpr),
    If(IfExpr),
    While(WhileExpr),
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Lit(e) => e.id,
            Expr::Name(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::Binary(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::Field(e) => e.id,
            Expr::Index(e) => e.id,
            Expr::Tuple(e) => e.id,
            Expr::Array(e) => e.id,
            Expr::Block(e) => e.id,
            Expr::If(e) => e.id,
            Expr::While(e) => e.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Lit(e) => e.span,
            Expr::Name(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Field(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Tuple(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::Block(e) => e.span,
            Expr::If(e) => e.span,
            Expr::While(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lit {
    pub id: NodeId,
    pub span: Span,
    pub kind: LitKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LitKind {
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub span: Span,
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub span: Span,
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub id: NodeId,
    pub span: Span,
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub id: NodeId,
    pub span: Span,
    pub operand: Box<Expr>,
    pub name: Ident,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub id: NodeId,
    pub span: Span,
    pub operand: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleExpr {
    pub id: NodeId,
    pub span: Span,
    pub elems: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub id: NodeId,
    pub span: Span,
    pub elems: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockExpr {
    pub id: NodeId,
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub id: NodeId,
    pub span: Span,
    pub cond: Box<Expr>,
    pub then_body: BlockExpr,
    /// Either another `If` (an `else if` chain) or a `Block`.
    pub else_body: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileExpr {
    pub id: NodeId,
    pub span: Span,
    pub cond: Box<Expr>,
    pub body: BlockExpr,
}

/// Type expression (a type written in source).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Name(Ident),
    Tuple(TupleTypeExpr),
    Array(ArrayTypeExpr),
    Func(FuncTypeExpr),
    Ref(RefTypeExpr),
    Record(RecordTypeExpr),
}

impl TypeExpr {
    pub fn id(&self) -> NodeId {
        match self {
            TypeExpr::Name(t) => t.id,
            TypeExpr::Tuple(t) => t.id,
            TypeExpr::Array(t) => t.id,
            TypeExpr::Func(t) => t.id,
            TypeExpr::Ref(t) => t.id,
            TypeExpr::Record(t) => t.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Name(t) => t.span,
            TypeExpr::Tuple(t) => t.span,
            TypeExpr::Array(t) => t.span,
            TypeExpr::Func(t) => t.span,
            TypeExpr::Ref(t) => t.span,
            TypeExpr::Record(t) => t.span,
        }
    }
}

/// `(T1, T2, ...)`; zero elements is the unit type.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleTypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub elems: Vec<TypeExpr>,
}

/// `[size]T` with a compile-time constant size.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayTypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub size: Box<Expr>,
    pub elem: Box<TypeExpr>,
}

/// `fn(T1, T2) R`, optionally with a variadic tail `..T`.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncTypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub params: Vec<TypeExpr>,
    pub variadic: Option<Box<TypeExpr>>,
    pub result: Option<Box<TypeExpr>>,
}

/// `*T`
#[derive(Debug, Clone, PartialEq)]
pub struct RefTypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub base: Box<TypeExpr>,
}

/// `record { name: T; ... }` — an anonymous structural record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub fields: Vec<FieldMember>,
}

/// Binary operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

impl BinaryOp {
    /// Compound assignment operators perform the base operation in place.
    pub fn base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::RemAssign => Some(BinaryOp::Rem),
            _ => None,
        }
    }

    pub fn is_assign(self) -> bool {
        self == BinaryOp::Assign || self.base().is_some()
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
        };
        f.write_str(s)
    }
}

/// Unary operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("!"),
            UnaryOp::Neg => f.write_str("-"),
        }
    }
}
