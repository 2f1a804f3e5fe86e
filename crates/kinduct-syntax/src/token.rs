//! Token types and source span tracking for the script lexer.

use num::{BigInt, BigRational};
use std::fmt;

/// A span in the source code, tracking byte offsets and line/column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, in characters not bytes).
    pub column: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span for terms built programmatically rather than parsed.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Self) -> Self {
        let (line, column) = if (self.line, self.column) <= (other.line, other.column) {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The kind of token.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // === Commands ===
    /// `define-fun`
    DefineFun,
    /// `declare-fun`
    DeclareFun,
    /// `define-sys`
    DefineSys,
    /// `define-prop`
    DefineProp,
    /// `define-rel`
    DefineRel,
    /// `verify`
    Verify,

    // === Term keywords ===
    /// `let`
    Let,
    /// `_` (indexed identifier, used for staged variables)
    Underscore,
    /// `curr`
    Curr,
    /// `next`
    Next,

    // === Punctuation ===
    /// `(`
    LParen,
    /// `)`
    RParen,

    // === Literals ===
    /// Integer numeral, e.g. `42`.
    Numeral(BigInt),
    /// Decimal literal, e.g. `1.5`; stored exactly.
    Decimal(BigRational),
    /// Attribute keyword such as `:assume`, without the colon.
    Attribute(String),
    /// Plain symbol: operator names, identifiers, sorts.
    Symbol(String),

    // === Trivia ===
    /// Line comment `; ...`, text after the semicolon.
    Comment(String),

    // === Special ===
    /// End of file
    Eof,
    /// Lexer error
    Error(String),
}

impl TokenKind {
    /// Reserved words that cannot be used as symbols.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "define-fun" => TokenKind::DefineFun,
            "declare-fun" => TokenKind::DeclareFun,
            "define-sys" => TokenKind::DefineSys,
            "define-prop" => TokenKind::DefineProp,
            "define-rel" => TokenKind::DefineRel,
            "verify" => TokenKind::Verify,
            "let" => TokenKind::Let,
            "_" => TokenKind::Underscore,
            "curr" => TokenKind::Curr,
            "next" => TokenKind::Next,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::DefineFun
                | TokenKind::DeclareFun
                | TokenKind::DefineSys
                | TokenKind::DefineProp
                | TokenKind::DefineRel
                | TokenKind::Verify
                | TokenKind::Let
                | TokenKind::Underscore
                | TokenKind::Curr
                | TokenKind::Next
        )
    }

    /// Comments are skipped by the parser except when collecting documentation.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Comment(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::DefineFun => write!(f, "define-fun"),
            TokenKind::DeclareFun => write!(f, "declare-fun"),
            TokenKind::DefineSys => write!(f, "define-sys"),
            TokenKind::DefineProp => write!(f, "define-prop"),
            TokenKind::DefineRel => write!(f, "define-rel"),
            TokenKind::Verify => write!(f, "verify"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::Underscore => write!(f, "_"),
            TokenKind::Curr => write!(f, "curr"),
            TokenKind::Next => write!(f, "next"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Numeral(n) => write!(f, "{}", n),
            TokenKind::Decimal(r) => write!(f, "{}", r),
            TokenKind::Attribute(a) => write!(f, ":{}", a),
            TokenKind::Symbol(s) => write!(f, "{}", s),
            TokenKind::Comment(s) => write!(f, "; {}", s),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Error(msg) => write!(f, "ERROR: {}", msg),
        }
    }
}

/// A token with its span in the source code.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }
}
