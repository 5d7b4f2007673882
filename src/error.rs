use crate::parser::ParserError;


/// Errors raised by the dice algebra.
///
/// Every variant is a usage error reported at the call site, nothing here is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A dice count, face size, scale factor or divisor was zero,
    /// or an operation would leave a term with no dice.
    #[error("Invalid arity: {0}")]
    InvalidArity(String),

    /// Dice were merged into a term, or a pool, with no matching face size.
    #[error("Cannot merge d{found} into dice of sizes {available:?}")]
    FaceMismatch {
        /// Face size that was offered.
        found: u32,
        /// Face sizes of the receiving term or pool.
        available: Vec<u32>
    },

    /// A relational comparison touched a term or pool that has not been evaluated.
    #[error("Cannot compare an unevaluated roll")]
    UnevaluatedComparison,

    /// Attribute score outside the lookup table.
    #[error("Invalid attribute score {score}, must be <= {max}")]
    ScoreOutOfRange {
        /// Requested score.
        score: i32,
        /// Highest score in the table.
        max: i32
    },

    /// An algebraic operation was given an operand it cannot combine with.
    #[error("Unsupported operand: {0}")]
    UnsupportedOperand(String),

    /// Notation failed to parse.
    #[error("Parser error - {0}")]
    Parser(#[from] ParserError)
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
