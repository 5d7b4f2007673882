//! Dice pools for tabletop action rolls.
//!
//! A [`Term`] is a group of same-sized dice with drop rules, explosion and a flat modifier,
//! a [`Composite`] sums terms and a modifier, and an [`AttributeProfile`] builds the
//! exploding pool for an attribute score. Randomness always comes from a [`RandomSource`]
//! passed to `evaluate`, results stay cached until `reset`.
//!
//! ```
//! use dice_pool::{parse, Roller};
//!
//! let mut pool = parse("1d20 + 2d6dl1e + 3").unwrap();
//! let mut roller = Roller::from_seed(7);
//!
//! let total = pool.evaluate(&mut roller);
//! assert_eq!(pool.evaluate(&mut roller), total);
//! println!("{pool}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]


#[cfg(test)]
mod term_test_strategies;

mod error;
mod source;
mod term;
mod composite;
mod operand;
mod profile;
mod parser;
pub mod notation;

pub use error::Error;
pub use source::{RandomSource, Roller, Scripted};
pub use term::{Term, TermBuilder, Polarity, DEFAULT_EXPLODE_LIMIT};
pub use composite::Composite;
pub use operand::{Operand, DiceExpr, Comparand};
pub use profile::{AttributeProfile, attribute_dice, attribute_pool, MAX_SCORE};
pub use parser::{ParserError, Parser, parse, parse_term};
