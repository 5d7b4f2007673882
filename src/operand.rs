use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::ops::{Add, Neg, Sub};
use crate::error::{Error, Result};
use crate::source::RandomSource;
use crate::{Composite, Term};


/// Anything with a cached numeric outcome that relational comparisons can read.
///
/// Comparing fails with [`Error::UnevaluatedComparison`] while either side has no cached
/// result, plain integers always have one.
///
/// # Examples
/// ```
/// use dice_pool::{Comparand, Error, Scripted, Term};
///
/// let mut term = Term::new(2, 6).unwrap();
/// assert_eq!(term.try_gt(&5i64), Err(Error::UnevaluatedComparison));
///
/// term.evaluate(&mut Scripted::new([4, 5]));
/// assert_eq!(term.try_gt(&5i64), Ok(true));
/// assert_eq!(term.try_eq(&9i64), Ok(true));
/// ```
pub trait Comparand {
    /// The cached result, `None` if not evaluated.
    fn cached_value(&self) -> Option<i64>;

    /// Orders two cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_cmp<C: Comparand + ?Sized>(&self, other: &C) -> Result<Ordering> {
        match (self.cached_value(), other.cached_value()) {
            (Some(left), Some(right)) => Ok(left.cmp(&right)),
            _ => Err(Error::UnevaluatedComparison)
        }
    }

    /// `==` on cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_eq<C: Comparand + ?Sized>(&self, other: &C) -> Result<bool> {
        Ok(self.try_cmp(other)?.is_eq())
    }

    /// `!=` on cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_ne<C: Comparand + ?Sized>(&self, other: &C) -> Result<bool> {
        Ok(self.try_cmp(other)?.is_ne())
    }

    /// `<` on cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_lt<C: Comparand + ?Sized>(&self, other: &C) -> Result<bool> {
        Ok(self.try_cmp(other)?.is_lt())
    }

    /// `<=` on cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_le<C: Comparand + ?Sized>(&self, other: &C) -> Result<bool> {
        Ok(self.try_cmp(other)?.is_le())
    }

    /// `>` on cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_gt<C: Comparand + ?Sized>(&self, other: &C) -> Result<bool> {
        Ok(self.try_cmp(other)?.is_gt())
    }

    /// `>=` on cached results.
    ///
    /// # Errors
    /// Returns [`Error::UnevaluatedComparison`] if either side is unevaluated.
    fn try_ge<C: Comparand + ?Sized>(&self, other: &C) -> Result<bool> {
        Ok(self.try_cmp(other)?.is_ge())
    }
}

impl Comparand for i64 {
    fn cached_value(&self) -> Option<i64> {
        Some(*self)
    }
}

impl Comparand for Term {
    fn cached_value(&self) -> Option<i64> {
        self.result()
    }
}

impl Comparand for Composite {
    fn cached_value(&self) -> Option<i64> {
        self.result()
    }
}

impl Comparand for Operand {
    fn cached_value(&self) -> Option<i64> {
        match self {
            Operand::Term(term) => term.result(),
            Operand::Pool(pool) => pool.result(),
            Operand::Modifier(value) => Some(*value)
        }
    }
}


/// The capabilities shared by terms, pools and [`Operand`]s.
///
/// The cached result of the current cycle is read through the [`Comparand`] supertrait.
pub trait DiceExpr: Display + Comparand {
    /// Rolls, or returns the cached result of the current cycle.
    fn evaluate<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64;

    /// Starts a new evaluation cycle.
    fn reset(&mut self);

    /// Flips the polarity of every term.
    fn negate(&mut self);

    /// Multiplies every dice count by `factor`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] for a zero factor and [`Error::UnsupportedOperand`]
    /// for a flat modifier.
    fn scale_count(&mut self, factor: u32) -> Result<()>;

    /// Adds the dice of `other` to the terms with matching face sizes.
    ///
    /// # Errors
    /// Returns [`Error::FaceMismatch`] when a face size has no counterpart and
    /// [`Error::UnsupportedOperand`] when either side is a flat modifier. A count
    /// overflow returns [`Error::InvalidArity`]. The receiver is unchanged on error.
    fn merge_same_face(&mut self, other: Operand) -> Result<()>;

    /// Expected value, rounded half up if `round` is set.
    fn average(&self, round: bool) -> f64;
}

impl DiceExpr for Term {
    fn evaluate<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64 {
        Term::evaluate(self, source)
    }

    fn reset(&mut self) {
        Term::reset(self);
    }

    fn negate(&mut self) {
        Term::negate(self);
    }

    fn scale_count(&mut self, factor: u32) -> Result<()> {
        Term::scale_count(self, factor).map(|_| ())
    }

    fn merge_same_face(&mut self, other: Operand) -> Result<()> {
        match other {
            Operand::Term(other) => Term::merge_same_face(self, &other).map(|_| ()),

            Operand::Pool(pool) => {
                if let Some(other) = pool.terms().iter().find(|t| t.face_size() != self.face_size()) {
                    return Err(Error::FaceMismatch { found: other.face_size(), available: vec![self.face_size()] });
                }

                let mut merged = self.clone();
                for other in pool.terms() {
                    merged.merge_same_face(other)?;
                }

                *self = merged;
                Ok(())
            },

            Operand::Modifier(value) => Err(Error::UnsupportedOperand(format!("cannot merge modifier {value} into dice")))
        }
    }

    fn average(&self, round: bool) -> f64 {
        Term::average(self, round)
    }
}

impl DiceExpr for Composite {
    fn evaluate<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64 {
        Composite::evaluate(self, source)
    }

    fn reset(&mut self) {
        Composite::reset(self);
    }

    fn negate(&mut self) {
        self.negate_all();
    }

    fn scale_count(&mut self, factor: u32) -> Result<()> {
        self.scale_all(factor).map(|_| ())
    }

    fn merge_same_face(&mut self, other: Operand) -> Result<()> {
        Composite::merge_same_face(self, other).map(|_| ())
    }

    fn average(&self, round: bool) -> f64 {
        Composite::average(self, round)
    }
}


/// One operand of the dice algebra: a term, a pool of terms or a flat integer.
///
/// Operands combine with `+`, `-` and unary `-` without ever failing, the result takes the
/// widest shape needed: two terms become a pool, a term plus an integer stays a term with a
/// modifier, and so on.
///
/// # Examples
/// ```
/// use dice_pool::{Operand, Term};
///
/// let d20 = Operand::from(Term::new(1, 20).unwrap());
/// let d6 = Operand::from(Term::new(2, 6).unwrap());
///
/// let expr = d20 - d6 + Operand::from(3i64);
/// assert_eq!(expr.to_string(), "1d20 - 2d6 + 3");
/// assert!(matches!(expr, Operand::Pool(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// A single group of same-sized dice.
    Term(Term),
    /// Several terms and a flat modifier.
    Pool(Composite),
    /// A flat integer.
    Modifier(i64)
}

impl Operand {
    /// Widens the operand into a pool.
    pub fn into_pool(self) -> Composite {
        match self {
            Operand::Term(term) => Composite::from(term),
            Operand::Pool(pool) => pool,
            Operand::Modifier(value) => {
                let mut pool = Composite::new();
                pool.add_modifier(value);
                pool
            }
        }
    }
}

impl DiceExpr for Operand {
    fn evaluate<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64 {
        match self {
            Operand::Term(term) => term.evaluate(source),
            Operand::Pool(pool) => pool.evaluate(source),
            Operand::Modifier(value) => *value
        }
    }

    fn reset(&mut self) {
        match self {
            Operand::Term(term) => term.reset(),
            Operand::Pool(pool) => pool.reset(),
            Operand::Modifier(_) => ()
        }
    }

    fn negate(&mut self) {
        match self {
            Operand::Term(term) => {
                term.negate();
            },
            Operand::Pool(pool) => {
                pool.negate_all();
            },
            Operand::Modifier(value) => *value = value.saturating_neg()
        }
    }

    fn scale_count(&mut self, factor: u32) -> Result<()> {
        match self {
            Operand::Term(term) => DiceExpr::scale_count(term, factor),
            Operand::Pool(pool) => DiceExpr::scale_count(pool, factor),
            Operand::Modifier(value) => Err(Error::UnsupportedOperand(format!("cannot scale the dice count of modifier {value}")))
        }
    }

    fn merge_same_face(&mut self, other: Operand) -> Result<()> {
        match self {
            Operand::Term(term) => DiceExpr::merge_same_face(term, other),
            Operand::Pool(pool) => DiceExpr::merge_same_face(pool, other),
            Operand::Modifier(value) => Err(Error::UnsupportedOperand(format!("cannot merge dice into modifier {value}")))
        }
    }

    fn average(&self, round: bool) -> f64 {
        match self {
            Operand::Term(term) => term.average(round),
            Operand::Pool(pool) => pool.average(round),
            Operand::Modifier(value) => *value as f64
        }
    }
}

impl From<Term> for Operand {
    fn from(value: Term) -> Self {
        Operand::Term(value)
    }
}

impl From<Composite> for Operand {
    fn from(value: Composite) -> Self {
        Operand::Pool(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Modifier(value)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Term(term) => write!(f, "{term}"),
            Operand::Pool(pool) => write!(f, "{pool}"),
            Operand::Modifier(value) => write!(f, "{value}")
        }
    }
}

impl Add for Operand {
    type Output = Operand;

    fn add(self, rhs: Operand) -> Self::Output {
        use Operand as Op;
        match (self, rhs) {
            (Op::Modifier(left), Op::Modifier(right)) => Op::Modifier(left.saturating_add(right)),
            (Op::Term(term), Op::Modifier(value)) | (Op::Modifier(value), Op::Term(term)) => Op::Term(term + value),
            (Op::Term(left), Op::Term(right)) => Op::Pool(left + right),
            (left, right) => Op::Pool(left.into_pool() + right.into_pool())
        }
    }
}

impl Sub for Operand {
    type Output = Operand;

    fn sub(self, rhs: Operand) -> Self::Output {
        self + -rhs
    }
}

impl Neg for Operand {
    type Output = Operand;

    fn neg(mut self) -> Self::Output {
        DiceExpr::negate(&mut self);
        self
    }
}
