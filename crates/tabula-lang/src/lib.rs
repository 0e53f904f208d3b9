pub mod ast;
pub mod lexer;
pub mod parser;
pub mod program;

pub use ast::*;
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser, parse_decimal};
pub use program::{Program, ProgramError, maximize};
