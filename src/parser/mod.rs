mod error;
mod lexer;
mod parse;

#[cfg(test)]
mod str_test_strategies;

pub use error::ParserError;
pub(crate) use lexer::{Lexer, Token};
pub use parse::{Parser, parse, parse_term};
