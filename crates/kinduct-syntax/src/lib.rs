//! Lexer, parser, AST and serializer for transition-system scripts.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::{parse, parse_expr, ParseError, ParseResult, Parser};
pub use pretty::{
    format_integer, format_rational, pretty_print, pretty_print_command, pretty_print_expr,
};
pub use token::{Span, Token, TokenKind};
