use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found '{found}' at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Invalid variable '{name}' at position {span:?}: variables are a single letter")]
    InvalidVariable { name: String, span: Span },
}

impl TokenKind {
    fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident => "variable",
            TokenKind::Number => "number",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Le => "'<='",
            TokenKind::Ge => "'>='",
            TokenKind::Lt => "'<'",
            TokenKind::Eq => "'='",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "invalid character",
        }
    }
}

/// Parse a decimal literal such as `-42.7` exactly.
pub fn parse_decimal(text: &str) -> Result<BigRational, ParseError> {
    let invalid = || ParseError::InvalidNumber(text.to_string());
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let numer: BigInt = format!("{}{}", whole, fraction).parse().map_err(|_| invalid())?;
    let denom = num_traits::pow(BigInt::from(10), fraction.len());
    let value = BigRational::new(numer, denom);
    Ok(if negative { -value } else { value })
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_term(source: &str) -> Result<Term, ParseError> {
        let mut parser = Parser::new(Lexer::tokenize(source));
        let term = parser.term()?;
        parser.finish()?;
        Ok(term)
    }

    pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
        let mut parser = Parser::new(Lexer::tokenize(source));
        let expression = parser.expression()?;
        parser.finish()?;
        Ok(expression)
    }

    pub fn parse_inequality(source: &str) -> Result<Inequality, ParseError> {
        let mut parser = Parser::new(Lexer::tokenize(source));
        let inequality = parser.inequality()?;
        parser.finish()?;
        Ok(inequality)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    /// True when the current token is immediately followed by a token of `kind`.
    fn next_touches(&self, kind: TokenKind) -> bool {
        match (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)) {
            (Some(current), Some(next)) => next.kind == kind && current.span.touches(next.span),
            _ => false,
        }
    }

    fn unexpected(token: Option<&Token>, expected: &str) -> ParseError {
        match token {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: t.text.clone(),
                span: t.span,
            },
            _ => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        match self.current().cloned() {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            other => Err(Self::unexpected(other.as_ref(), kind.describe())),
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Eof).map(|_| ())
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        let start = self.current().map(|t| t.span).unwrap_or(Span::new(0, 0));

        // A sign only binds when written flush against the variable
        let negative = self.peek_kind() == TokenKind::Minus && self.next_touches(TokenKind::Ident);
        if negative {
            self.advance();
        }

        let coefficient = if self.peek_kind() == TokenKind::Number {
            if !self.next_touches(TokenKind::Ident) {
                let following = self.tokens.get(self.pos + 1);
                return Err(Self::unexpected(following, "variable directly after coefficient"));
            }
            let token = self.expect(TokenKind::Number)?;
            parse_decimal(&token.text)?
        } else {
            BigRational::one()
        };

        let variable = match self.current().cloned() {
            Some(t) if t.kind == TokenKind::Ident => {
                self.advance();
                t
            }
            other => return Err(Self::unexpected(other.as_ref(), "term")),
        };
        let mut letters = variable.text.chars();
        let single_letter = matches!((letters.next(), letters.next()), (Some(c), None) if c.is_ascii_alphabetic());
        if !single_letter {
            return Err(ParseError::InvalidVariable {
                name: variable.text,
                span: variable.span,
            });
        }

        let term = Term {
            span: start.merge(variable.span),
            coefficient,
            variable: variable.text,
        };
        Ok(if negative { term.negate() } else { term })
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let mut expression = Expression::default();

        loop {
            let negate = match self.peek_kind() {
                TokenKind::Plus => {
                    self.advance();
                    false
                }
                TokenKind::Minus => {
                    self.advance();
                    true
                }
                _ => false,
            };
            let term = self.term()?;
            expression.add_term(if negate { term.negate() } else { term });

            // Operators and juxtaposed terms continue the sum
            match self.peek_kind() {
                TokenKind::Plus | TokenKind::Minus | TokenKind::Number | TokenKind::Ident => {}
                _ => break,
            }
        }

        Ok(expression)
    }

    fn inequality(&mut self) -> Result<Inequality, ParseError> {
        let start = self.current().map(|t| t.span).unwrap_or(Span::new(0, 0));
        let lhs = self.expression()?;
        self.expect(TokenKind::Le)?;
        let bound = self.expect(TokenKind::Number)?;
        let rhs = parse_decimal(&bound.text)?;

        Ok(Inequality {
            span: start.merge(bound.span),
            lhs,
            rhs,
        })
    }
}
