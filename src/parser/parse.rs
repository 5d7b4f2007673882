use std::str::FromStr;
use crate::{Composite, Polarity, Term};
use crate::parser::error::ParserError;
use crate::parser::{Lexer, Token};


/// A parser for dice notation strings such as `1d20 - 2d6dl1 + 3`.
///
/// The input is a flat signed sum. Dice items become [`Term`]s of the resulting
/// [`Composite`], `-` before a dice item makes it a negative term, and bare numbers
/// add up into the pool modifier. Dice take the suffixes `dl[N]`, `dh[N]` and `e`,
/// a drop suffix without a number drops one die.
#[derive(Debug)]
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token
}

impl Parser {
    /// Creates a new `Parser` instance for the given input string.
    ///
    /// # Errors
    /// Returns [`ParserError::Empty`] for blank input, or a lexer error if the first
    /// two tokens cannot be read.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Parser, ParserError};
    ///
    /// assert!(Parser::new("1d6 + 3").is_ok());
    ///
    /// let err = Parser::new("  ").unwrap_err();
    /// assert!(matches!(err.err(), ParserError::Empty));
    /// ```
    pub fn new(input: &str) -> Result<Self, ParserError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;

        if current == Token::Eof {
            return Err(ParserError::Empty);
        }

        let peek = lexer.next_token()?;
        Ok(Self { lexer, current, peek })
    }

    /// Parses the entire input into an unevaluated [`Composite`].
    ///
    /// # Errors
    /// Any syntax error, wrapped with positional information using
    /// [`ParserError::at_pos()`].
    ///
    /// Get a reference to the wrapped error with [`ParserError::err()`].
    /// Get the position at which the error was found with [`ParserError::pos()`].
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Parser, ParserError};
    ///
    /// let mut parser = Parser::new("2 + 1d20 - 2d6 + 1").unwrap();
    /// let pool = parser.parse().unwrap();
    /// assert_eq!(pool.to_string(), "1d20 - 2d6 + 3");
    ///
    /// let mut invalid_parser = Parser::new("1d6 +").unwrap();
    /// let err = invalid_parser.parse().unwrap_err();
    /// assert!(matches!(err.err(), ParserError::UnexpectedToken(_)));
    /// ```
    pub fn parse(&mut self) -> Result<Composite, ParserError> {
        self.parse_pool()
            .map_err(|err| err.at_pos(self.lexer.position))
    }

    fn next_token(&mut self) -> Result<(), ParserError> {
        self.current = self.peek;
        self.peek = self.lexer.next_token()?;

        Ok(())
    }

    fn parse_pool(&mut self) -> Result<Composite, ParserError> {
        let mut pool = Composite::new();
        let mut polarity = self.parse_sign()?.unwrap_or_default();

        loop {
            self.parse_item(&mut pool, polarity)?;

            match self.peek {
                Token::Eof => break,

                Token::Plus | Token::Minus => {
                    self.next_token()?;
                    polarity = self.parse_sign()?.unwrap_or_default();
                },

                other => return Err(ParserError::UnexpectedToken(format!("{other:?}")))
            }
        }

        tracing::trace!(terms = pool.len(), modifier = ?pool.modifier(), "parsed pool");
        Ok(pool)
    }

    /// Consumes a sign in `current`, if there is one.
    fn parse_sign(&mut self) -> Result<Option<Polarity>, ParserError> {
        let polarity = match self.current {
            Token::Plus => Polarity::Positive,
            Token::Minus => Polarity::Negative,
            _ => return Ok(None)
        };

        self.next_token()?;
        Ok(Some(polarity))
    }

    fn parse_item(&mut self, pool: &mut Composite, polarity: Polarity) -> Result<(), ParserError> {
        match (self.current, self.peek) {
            (Token::Number(count), Token::Dice) => {
                self.next_token()?;
                let term = self.parse_dice(count, polarity)?;
                pool.append(term);
            },

            (Token::Number(value), _) => {
                pool.add_modifier(polarity.sign() * i64::from(value));
            },

            (Token::Dice, _) => return Err(ParserError::UnexpectedDiceExpression("Dice".into())),

            (other, _) => return Err(ParserError::UnexpectedToken(format!("{other:?}")))
        }

        Ok(())
    }

    fn parse_dice(&mut self, count: u32, polarity: Polarity) -> Result<Term, ParserError> {
        let size = match self.peek {
            Token::Number(size) => size,
            other => return Err(ParserError::UnexpectedDiceExpression(format!("{other:?}")))
        };

        self.next_token()?;

        let mut builder = Term::builder(size)
            .count(count)
            .polarity(polarity);

        loop {
            match self.peek {
                Token::DropLowest => builder = builder.dl(self.parse_drop_count()?),
                Token::DropHighest => builder = builder.dh(self.parse_drop_count()?),

                Token::Explode => {
                    self.next_token()?;
                    builder = builder.explode(true);
                },

                _ => break
            }
        }

        builder.build()
            .map_err(|err| ParserError::Term(Box::new(err)))
    }

    /// Consumes a drop suffix and its count, which defaults to 1.
    fn parse_drop_count(&mut self) -> Result<u32, ParserError> {
        self.next_token()?;

        match self.peek {
            Token::Number(n) => {
                self.next_token()?;
                Ok(n)
            },
            _ => Ok(1)
        }
    }
}


/// Parses a dice notation string into an unevaluated [`Composite`].
/// This is a convenience function that creates a [`Parser`] and calls its `parse` method.
///
/// # Errors
/// Returns a `ParserError` if any syntax errors are encountered during parsing.
/// Errors found after the first two tokens are wrapped with positional information using
/// [`ParserError::at_pos()`].
///
/// # Examples
/// ```
/// use dice_pool::{parse, Scripted};
///
/// let mut pool = parse("1d20 + 4d6dl2 + 2").unwrap();
/// assert_eq!(pool.evaluate(&mut Scripted::new([9, 3, 1, 4, 2])), 18);
/// assert_eq!(pool.to_string(), "1d20 + 4d6dl2 + 2\n[9] + [<1 + 2> + 3 + 4] + 2\nResult: 18");
/// ```
pub fn parse(input: &str) -> Result<Composite, ParserError> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}


/// Parses notation that holds exactly one dice term, the pool modifier becomes the
/// term's modifier.
///
/// # Errors
/// Any [`parse()`] error, or [`ParserError::ExpectedSingleTerm`] if the notation holds
/// no dice or more than one dice term.
///
/// # Examples
/// ```
/// use dice_pool::{parse_term, ParserError};
///
/// let term = parse_term("-2d6e + 1").unwrap();
/// assert!(term.is_negative());
/// assert_eq!(term.modifier(), Some(1));
///
/// assert_eq!(parse_term("1d6 + 1d8"), Err(ParserError::ExpectedSingleTerm(2)));
/// ```
pub fn parse_term(input: &str) -> Result<Term, ParserError> {
    let pool = parse(input)?;
    let modifier = pool.modifier();

    let mut terms = pool.into_iter();
    let term = match (terms.next(), terms.next()) {
        (Some(term), None) => term,
        (first, second) => {
            let found = usize::from(first.is_some()) + usize::from(second.is_some()) + terms.count();
            return Err(ParserError::ExpectedSingleTerm(found));
        }
    };

    Ok(match modifier {
        Some(value) => term + value,
        None => term
    })
}


impl FromStr for Composite {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl FromStr for Term {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_term(s)
    }
}
