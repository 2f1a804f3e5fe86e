//! Recursive descent parser for transition-system scripts.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use thiserror::Error;

/// Expressions nested deeper than this are rejected instead of overflowing
/// the stack.
const MAX_NESTING: usize = 512;

/// Parser error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("unexpected end of file at {span}")]
    UnexpectedEof { span: Span },
    #[error("unknown command '{name}' at {span}")]
    UnknownCommand { name: String, span: Span },
    #[error("lexical error at {span}: {message}")]
    Lexical { message: String, span: Span },
    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },
}

impl ParseError {
    /// Get the source span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span }
            | ParseError::UnknownCommand { span, .. }
            | ParseError::Lexical { span, .. }
            | ParseError::InvalidSyntax { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a complete script.
pub fn parse(source: &str) -> ParseResult<Script> {
    Parser::new(source).parse_script()
}

/// Parse a single expression, e.g. a formula or a value printed by a solver.
pub fn parse_expr(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser.parse_expr()?;
    if !parser.is_at_end() {
        return Err(parser.unexpected("end of input"));
    }
    Ok(expr)
}

/// Parser for script source code.
pub struct Parser {
    /// Non-trivia tokens.
    tokens: Vec<Token>,
    /// Own-line comments preceding each token in `tokens`.
    leading: Vec<Vec<String>>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut leading = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut last_line = 0;
        for token in Lexer::new(source).tokenize() {
            match token.kind {
                TokenKind::Comment(text) => {
                    // Trailing comments on a code line are not documentation.
                    if token.span.line > last_line {
                        pending.push(text);
                    }
                }
                _ => {
                    last_line = token.span.line;
                    leading.push(std::mem::take(&mut pending));
                    tokens.push(token);
                }
            }
        }
        Self {
            tokens,
            leading,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse every command up to end of input.
    pub fn parse_script(&mut self) -> ParseResult<Script> {
        let start = self.current_span();
        let mut commands = Vec::new();
        while !self.is_at_end() {
            commands.push(self.parse_command()?);
        }
        let span = if commands.is_empty() {
            start
        } else {
            start.merge(self.prev_span())
        };
        Ok(Script { commands, span })
    }

    fn parse_command(&mut self) -> ParseResult<Command> {
        let doc = self.leading.get(self.pos).cloned().unwrap_or_default();
        let start = self.current_span();
        self.expect(TokenKind::LParen)?;
        let keyword = self.advance_token()?;
        let command = match keyword.kind {
            TokenKind::DefineFun => Command::DefineFun(self.parse_define_fun(doc)?),
            TokenKind::DeclareFun => Command::DeclareFun(self.parse_declare_fun(doc)?),
            TokenKind::DefineSys => Command::DefineSys(self.parse_define_sys(doc)?),
            TokenKind::DefineProp => Command::DefineProp(self.parse_define_prop(doc)?),
            TokenKind::DefineRel => Command::DefineRel(self.parse_define_rel(doc)?),
            TokenKind::Verify => Command::Verify(self.parse_verify(doc)?),
            TokenKind::Symbol(name) => {
                return Err(ParseError::UnknownCommand {
                    name,
                    span: keyword.span,
                })
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "command keyword".to_string(),
                    found: other.to_string(),
                    span: keyword.span,
                })
            }
        };
        self.expect(TokenKind::RParen)?;
        Ok(with_span(command, start.merge(self.prev_span())))
    }

    fn parse_define_fun(&mut self, doc: Vec<String>) -> ParseResult<FunDecl> {
        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while self.peek_kind() != TokenKind::RParen {
            params.push(self.parse_sorted_var()?);
        }
        self.expect(TokenKind::RParen)?;
        let ret = self.parse_sort()?;
        let body = self.parse_expr()?;
        Ok(FunDecl {
            name,
            params,
            ret,
            body,
            doc,
            span: Span::dummy(),
        })
    }

    fn parse_declare_fun(&mut self, doc: Vec<String>) -> ParseResult<ConstDecl> {
        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        if self.peek_kind() != TokenKind::RParen {
            return Err(ParseError::InvalidSyntax {
                message: format!(
                    "'{}' must be 0-ary: only uninterpreted constants can be declared",
                    name.name
                ),
                span: self.current_span(),
            });
        }
        self.expect(TokenKind::RParen)?;
        let sort = self.parse_sort()?;
        Ok(ConstDecl {
            name,
            sort,
            doc,
            span: Span::dummy(),
        })
    }

    fn parse_define_sys(&mut self, doc: Vec<String>) -> ParseResult<SysDecl> {
        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut state = Vec::new();
        while self.peek_kind() != TokenKind::RParen {
            state.push(self.parse_sorted_var()?);
        }
        self.expect(TokenKind::RParen)?;
        let init = self.parse_expr()?;
        let trans = self.parse_expr()?;

        // The instantiation list may be omitted when there are no subsystems.
        let mut subsystems = Vec::new();
        if self.peek_kind() == TokenKind::LParen {
            self.advance();
            while self.peek_kind() != TokenKind::RParen {
                subsystems.push(self.parse_subsys_call()?);
            }
            self.expect(TokenKind::RParen)?;
        }

        Ok(SysDecl {
            name,
            state,
            init,
            trans,
            subsystems,
            doc,
            span: Span::dummy(),
        })
    }

    fn parse_subsys_call(&mut self) -> ParseResult<SubsysCall> {
        let start = self.current_span();
        self.expect(TokenKind::LParen)?;
        let system = self.parse_ident()?;
        let mut args = Vec::new();
        while self.peek_kind() != TokenKind::RParen {
            args.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(SubsysCall {
            system,
            args,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_define_prop(&mut self, doc: Vec<String>) -> ParseResult<PropDecl> {
        let name = self.parse_ident()?;
        let system = self.parse_ident()?;
        let body = self.parse_expr()?;
        Ok(PropDecl {
            name,
            system,
            body,
            doc,
            span: Span::dummy(),
        })
    }

    fn parse_define_rel(&mut self, doc: Vec<String>) -> ParseResult<RelDecl> {
        let name = self.parse_ident()?;
        let system = self.parse_ident()?;
        let body = self.parse_expr()?;
        let mode = if let TokenKind::Attribute(attr) = self.peek_kind() {
            let span = self.current_span();
            self.advance();
            match attr.as_str() {
                "assume" => Some(RelMode::Assume),
                "prove" => Some(RelMode::Prove),
                other => {
                    return Err(ParseError::InvalidSyntax {
                        message: format!(
                            "unknown relation attribute ':{}', expected ':assume' or ':prove'",
                            other
                        ),
                        span,
                    })
                }
            }
        } else {
            None
        };
        Ok(RelDecl {
            name,
            system,
            body,
            mode,
            doc,
            span: Span::dummy(),
        })
    }

    fn parse_verify(&mut self, doc: Vec<String>) -> ParseResult<VerifyCmd> {
        let system = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut names = Vec::new();
        while self.peek_kind() != TokenKind::RParen {
            names.push(self.parse_ident()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(VerifyCmd {
            system,
            names,
            doc,
            span: Span::dummy(),
        })
    }

    fn parse_sorted_var(&mut self) -> ParseResult<SortedVar> {
        let start = self.current_span();
        self.expect(TokenKind::LParen)?;
        let name = self.parse_ident()?;
        let sort = self.parse_sort()?;
        self.expect(TokenKind::RParen)?;
        Ok(SortedVar {
            name,
            sort,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_sort(&mut self) -> ParseResult<SortExpr> {
        Ok(SortExpr {
            name: self.parse_ident()?,
        })
    }

    /// Parse an expression.
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::InvalidSyntax {
                message: format!("expression nesting exceeds {}", MAX_NESTING),
                span: self.current_span(),
            });
        }
        let result = self.parse_expr_inner();
        self.depth -= 1;
        result
    }

    fn parse_expr_inner(&mut self) -> ParseResult<Expr> {
        let token = self.advance_token()?;
        match token.kind {
            TokenKind::Numeral(n) => Ok(Expr::new(ExprKind::Numeral(n), token.span)),
            TokenKind::Decimal(r) => Ok(Expr::new(ExprKind::Decimal(r), token.span)),
            TokenKind::Symbol(s) => Ok(Expr::new(ExprKind::Symbol(s), token.span)),
            TokenKind::LParen => self.parse_compound(token.span),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other.to_string(),
                span: token.span,
            }),
        }
    }

    /// Parse the rest of a parenthesized expression; `(` is consumed.
    fn parse_compound(&mut self, start: Span) -> ParseResult<Expr> {
        match self.peek_kind() {
            TokenKind::Underscore => {
                self.advance();
                let stage_token = self.advance_token()?;
                let stage = match stage_token.kind {
                    TokenKind::Curr => StageTag::Curr,
                    TokenKind::Next => StageTag::Next,
                    other => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "'curr' or 'next'".to_string(),
                            found: other.to_string(),
                            span: stage_token.span,
                        })
                    }
                };
                let var = self.parse_ident()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(
                    ExprKind::Staged { stage, var },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Let => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let mut bindings = Vec::new();
                while self.peek_kind() != TokenKind::RParen {
                    self.expect(TokenKind::LParen)?;
                    let name = self.parse_ident()?;
                    let value = self.parse_expr()?;
                    self.expect(TokenKind::RParen)?;
                    bindings.push((name, value));
                }
                if bindings.is_empty() {
                    return Err(ParseError::InvalidSyntax {
                        message: "let requires at least one binding".to_string(),
                        span: self.current_span(),
                    });
                }
                self.expect(TokenKind::RParen)?;
                let body = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(
                    ExprKind::Let {
                        bindings,
                        body: Box::new(body),
                    },
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Symbol(_) => {
                let head = self.parse_ident()?;
                let mut args = Vec::new();
                while self.peek_kind() != TokenKind::RParen {
                    args.push(self.parse_expr()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(Expr::new(
                    ExprKind::App { head, args },
                    start.merge(self.prev_span()),
                ))
            }
            _ => Err(self.unexpected("operator or function name")),
        }
    }

    /// Parse a symbol used as a name.
    fn parse_ident(&mut self) -> ParseResult<Ident> {
        let token = self.advance_token()?;
        match token.kind {
            TokenKind::Symbol(name) => Ok(Ident::new(name, token.span)),
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: other.to_string(),
                span: token.span,
            }),
        }
    }

    // === Token helpers ===

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.tokens[self.pos].is_eof()
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            return self.current_span();
        }
        self.tokens[self.pos - 1].span
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Consume the current token, turning EOF and lexer errors into parse errors.
    fn advance_token(&mut self) -> ParseResult<Token> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(ParseError::UnexpectedEof {
                span: self.current_span(),
            });
        };
        match &token.kind {
            TokenKind::Eof => Err(ParseError::UnexpectedEof { span: token.span }),
            TokenKind::Error(message) => Err(ParseError::Lexical {
                message: message.clone(),
                span: token.span,
            }),
            _ => {
                self.pos += 1;
                Ok(token)
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        let token = self.advance_token()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("'{}'", kind),
                found: token.kind.to_string(),
                span: token.span,
            })
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) if token.is_error() => ParseError::Lexical {
                message: token.kind.to_string(),
                span: token.span,
            },
            Some(token) if !token.is_eof() => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.to_string(),
                span: token.span,
            },
            _ => ParseError::UnexpectedEof {
                span: self.current_span(),
            },
        }
    }
}

fn with_span(command: Command, span: Span) -> Command {
    match command {
        Command::DefineFun(d) => Command::DefineFun(FunDecl { span, ..d }),
        Command::DeclareFun(d) => Command::DeclareFun(ConstDecl { span, ..d }),
        Command::DefineSys(d) => Command::DefineSys(SysDecl { span, ..d }),
        Command::DefineProp(d) => Command::DefineProp(PropDecl { span, ..d }),
        Command::DefineRel(d) => Command::DefineRel(RelDecl { span, ..d }),
        Command::Verify(d) => Command::Verify(VerifyCmd { span, ..d }),
    }
}
