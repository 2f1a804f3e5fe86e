//! Lexer for transition-system scripts.
//!
//! Converts source text into a stream of tokens. Comments are kept as trivia
//! tokens so the parser can attach them to the following command.

use crate::token::{Span, Token, TokenKind};
use num::{BigInt, BigRational};
use std::str::Chars;

/// Characters allowed in a simple symbol besides ASCII alphanumerics.
///
/// `@` and `#` are reserved for names generated by the checker.
const SYMBOL_PUNCT: &str = "~!$%^&*_-+=<>.?/";

/// Lexer for script source code.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    /// Current byte position.
    pos: usize,
    /// Current line number (1-indexed).
    line: u32,
    /// Current column number (1-indexed).
    column: u32,
    token_start: usize,
    token_start_line: u32,
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Tokenize the entire source, returning all tokens including EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.mark_token_start();

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            ';' => self.lex_comment(),
            '(' => {
                self.advance();
                self.make_token(TokenKind::LParen)
            }
            ')' => {
                self.advance();
                self.make_token(TokenKind::RParen)
            }
            ':' => self.lex_attribute(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_symbol_char(c) => self.lex_symbol(),
            other => {
                self.advance();
                self.make_token(TokenKind::Error(format!("unexpected character '{}'", other)))
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn mark_token_start(&mut self) {
        self.token_start = self.pos;
        self.token_start_line = self.line;
        self.token_start_column = self.column;
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.token_start,
                self.pos,
                self.token_start_line,
                self.token_start_column,
            ),
        )
    }

    fn token_text(&self) -> &'a str {
        &self.source[self.token_start..self.pos]
    }

    /// Lex a `;` comment up to the end of the line.
    fn lex_comment(&mut self) -> Token {
        // Any run of semicolons opens the comment.
        while self.peek() == Some(';') {
            self.advance();
        }
        if self.peek() == Some(' ') {
            self.advance();
        }

        let content_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }

        let content = self.source[content_start..self.pos].trim_end().to_string();
        self.make_token(TokenKind::Comment(content))
    }

    fn lex_attribute(&mut self) -> Token {
        // Skip ':'
        self.advance();
        let name_start = self.pos;
        while let Some(c) = self.peek() {
            if is_symbol_char(c) || c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == name_start {
            return self.make_token(TokenKind::Error("empty attribute name".to_string()));
        }
        let name = self.source[name_start..self.pos].to_string();
        self.make_token(TokenKind::Attribute(name))
    }

    /// Lex a numeral (`42`) or a decimal (`4.25`).
    fn lex_number(&mut self) -> Token {
        self.eat_digits();

        let is_decimal = self.peek() == Some('.');
        if is_decimal {
            if !self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                return self.make_token(TokenKind::Error(format!(
                    "invalid decimal: {}",
                    self.token_text()
                )));
            }
            self.advance();
            self.eat_digits();
        }

        if self.peek().is_some_and(is_symbol_char) {
            while self.peek().is_some_and(|c| is_symbol_char(c) || c.is_ascii_digit()) {
                self.advance();
            }
            return self.make_token(TokenKind::Error(format!(
                "symbols cannot start with a digit: {}",
                self.token_text()
            )));
        }

        let text = self.token_text();
        match parse_number(text) {
            Some(kind) => self.make_token(kind),
            None => self.make_token(TokenKind::Error(format!("invalid number: {}", text))),
        }
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Lex a symbol or reserved word.
    fn lex_symbol(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if is_symbol_char(c) || c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.token_text();
        match TokenKind::keyword(text) {
            Some(keyword) => self.make_token(keyword),
            None => self.make_token(TokenKind::Symbol(text.to_string())),
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphabetic() || SYMBOL_PUNCT.contains(c)
}

fn parse_number(text: &str) -> Option<TokenKind> {
    match text.split_once('.') {
        None => BigInt::parse_bytes(text.as_bytes(), 10).map(TokenKind::Numeral),
        Some((int_part, frac_part)) => {
            let digits = format!("{}{}", int_part, frac_part);
            let numer = BigInt::parse_bytes(digits.as_bytes(), 10)?;
            let denom = num::pow(BigInt::from(10), frac_part.len());
            Some(TokenKind::Decimal(BigRational::new(numer, denom)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn sym(s: &str) -> TokenKind {
        TokenKind::Symbol(s.to_string())
    }

    #[test]
    fn test_empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
        assert_eq!(lex("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_commands_and_punctuation() {
        assert_eq!(
            lex("(define-sys verify)"),
            vec![
                TokenKind::LParen,
                TokenKind::DefineSys,
                TokenKind::Verify,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_staged_variable() {
        assert_eq!(
            lex("(_ next out)"),
            vec![
                TokenKind::LParen,
                TokenKind::Underscore,
                TokenKind::Next,
                sym("out"),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(
            lex("=> <= >= - + to_real"),
            vec![
                sym("=>"),
                sym("<="),
                sym(">="),
                sym("-"),
                sym("+"),
                sym("to_real"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("0 42 1.5 10.250"),
            vec![
                TokenKind::Numeral(BigInt::from(0)),
                TokenKind::Numeral(BigInt::from(42)),
                TokenKind::Decimal(BigRational::new(3.into(), 2.into())),
                TokenKind::Decimal(BigRational::new(41.into(), 4.into())),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_big_numeral() {
        let toks = lex("123456789012345678901234567890");
        match &toks[0] {
            TokenKind::Numeral(n) => assert_eq!(n.to_string(), "123456789012345678901234567890"),
            other => panic!("expected numeral, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(matches!(lex("1.")[0], TokenKind::Error(_)));
        assert!(matches!(lex("3abc")[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_comments_are_trivia() {
        let toks = lex(";; node counter (x: bool)\n(verify s ())");
        assert_eq!(toks[0], TokenKind::Comment("node counter (x: bool)".into()));
        assert!(toks[0].is_trivia());
        assert_eq!(toks[1], TokenKind::LParen);
    }

    #[test]
    fn test_attribute() {
        assert_eq!(
            lex(":assume"),
            vec![TokenKind::Attribute("assume".into()), TokenKind::Eof]
        );
        assert!(matches!(lex(": x")[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_reserved_characters() {
        assert!(matches!(lex("x@1")[1], TokenKind::Error(_)));
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("(a\n  bc)").tokenize();
        assert_eq!(tokens[1].span, Span::new(1, 2, 1, 2));
        assert_eq!(tokens[2].span, Span::new(5, 7, 2, 3));
    }
}
