//! Abstract syntax tree for transition-system scripts.

use crate::token::Span;
use num::{BigInt, BigRational};

/// A parsed script: the ordered sequence of top-level commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub commands: Vec<Command>,
    pub span: Span,
}

/// A top-level command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `(define-fun name ((p S)...) S body)`
    DefineFun(FunDecl),
    /// `(declare-fun name () S)`
    DeclareFun(ConstDecl),
    /// `(define-sys name ((v S)...) init trans (inst...))`
    DefineSys(SysDecl),
    /// `(define-prop name sys formula)`
    DefineProp(PropDecl),
    /// `(define-rel name sys formula [:assume|:prove])`
    DefineRel(RelDecl),
    /// `(verify sys (name...))`
    Verify(VerifyCmd),
}

impl Command {
    pub fn span(&self) -> Span {
        match self {
            Command::DefineFun(d) => d.span,
            Command::DeclareFun(d) => d.span,
            Command::DefineSys(d) => d.span,
            Command::DefineProp(d) => d.span,
            Command::DefineRel(d) => d.span,
            Command::Verify(d) => d.span,
        }
    }

    /// Comment lines attached to this command. They are opaque metadata.
    pub fn doc(&self) -> &[String] {
        match self {
            Command::DefineFun(d) => &d.doc,
            Command::DeclareFun(d) => &d.doc,
            Command::DefineSys(d) => &d.doc,
            Command::DefineProp(d) => &d.doc,
            Command::DefineRel(d) => &d.doc,
            Command::Verify(d) => &d.doc,
        }
    }
}

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A sort annotation as written: `Bool`, `Int` or `Real`.
///
/// Sort names are validated during lowering, not by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub name: Ident,
}

/// `(name Sort)` pair used for parameters and state variables.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedVar {
    pub name: Ident,
    pub sort: SortExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: Ident,
    pub params: Vec<SortedVar>,
    pub ret: SortExpr,
    pub body: Expr,
    pub doc: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: Ident,
    pub sort: SortExpr,
    pub doc: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SysDecl {
    pub name: Ident,
    pub state: Vec<SortedVar>,
    pub init: Expr,
    pub trans: Expr,
    pub subsystems: Vec<SubsysCall>,
    pub doc: Vec<String>,
    pub span: Span,
}

/// Subsystem instantiation `(sys actual...)` inside a `define-sys`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsysCall {
    pub system: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropDecl {
    pub name: Ident,
    pub system: Ident,
    pub body: Expr,
    pub doc: Vec<String>,
    pub span: Span,
}

/// Relation mode as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelMode {
    Prove,
    Assume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelDecl {
    pub name: Ident,
    pub system: Ident,
    pub body: Expr,
    /// `None` when no attribute was given.
    pub mode: Option<RelMode>,
    pub doc: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyCmd {
    pub system: Ident,
    pub names: Vec<Ident>,
    pub doc: Vec<String>,
    pub span: Span,
}

/// Timepoint tag of a staged variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageTag {
    Curr,
    Next,
}

/// An expression with its span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression forms. Operator applications and macro calls share `App`;
/// they are told apart during lowering.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Numeral(BigInt),
    Decimal(BigRational),
    /// Bare symbol: `true`, `false`, a let-bound name, a parameter, a
    /// declared constant or a 0-ary macro.
    Symbol(String),
    /// `(_ curr v)` / `(_ next v)`
    Staged { stage: StageTag, var: Ident },
    /// `(head arg...)`
    App { head: Ident, args: Vec<Expr> },
    /// `(let ((x e)...) body)`, parallel bindings.
    Let {
        bindings: Vec<(Ident, Expr)>,
        body: Box<Expr>,
    },
}
