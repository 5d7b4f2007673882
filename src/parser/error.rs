use crate::Error as TermError;


/// Errors raised while reading dice notation.
///
/// [`crate::Parser::parse()`] wraps every error in [`ParserError::AtPosition`], use
/// [`ParserError::err()`] and [`ParserError::pos()`] to look inside.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParserError {
    /// Wraps an error with the input position at which it was found.
    #[error("At position {0} - {1}")]
    AtPosition(usize, Box<ParserError>),

    /// Character outside the notation alphabet.
    #[error("Invalid token: {0}")]
    Token(char),

    /// Number that does not fit a dice count, face size or drop count.
    #[error("Invalid number: {0}")]
    Number(#[from] std::num::ParseIntError),

    /// Numbers in notation start at 1.
    #[error("Zero value is not accepted")]
    ZeroValue,

    /// Word that is not `d`, `dl`, `dh` or `e`.
    #[error("Invalid identifier: {0}")]
    Identifier(String),

    /// Input holds nothing but whitespace.
    #[error("Input string is empty")]
    Empty,

    /// Token that cannot appear at this point of an expression.
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    /// `d` without a count before it or a face size after it.
    #[error("Unexpected dice expression, expected literal number, got {0}")]
    UnexpectedDiceExpression(String),

    /// The parsed dice were rejected by the term builder.
    #[error("Term error - {0}")]
    Term(#[from] Box<TermError>),

    /// A single term was requested but the notation holds a different number of them.
    #[error("Expected a single dice term, found {0}")]
    ExpectedSingleTerm(usize)
}

impl ParserError {
    /// The wrapped error if this is [`ParserError::AtPosition`], `self` otherwise.
    pub fn err(&self) -> &Self {
        match self {
            ParserError::AtPosition(_, err) => err.as_ref(),
            other => other
        }
    }

    /// The input position if this is [`ParserError::AtPosition`].
    pub fn pos(&self) -> Option<&usize> {
        match self {
            ParserError::AtPosition(position, _) => Some(position),
            _ => None
        }
    }

    /// Wraps the error with `position`, already positioned errors are left alone.
    pub fn at_pos(self, position: usize) -> Self {
        match self {
            ParserError::AtPosition(_, _) => self,
            other => ParserError::AtPosition(position, Box::new(other))
        }
    }
}

pub type Result<T> = std::result::Result<T, ParserError>;
