use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use crate::error::{Error, Result};
use crate::source::RandomSource;
use crate::notation;


/// Upper bound on the extra dice a single term may add through explosion in one evaluation.
///
/// A chain that reaches the limit stops exploding, the draws made so far still count.
pub const DEFAULT_EXPLODE_LIMIT: u32 = 100;


/// Whether a term adds to or subtracts from the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    /// The kept dice are added.
    #[default]
    Positive,
    /// The kept dice are subtracted.
    Negative
}

impl Polarity {
    /// `1` for [`Polarity::Positive`], `-1` for [`Polarity::Negative`].
    pub const fn sign(self) -> i64 {
        match self {
            Polarity::Positive => 1,
            Polarity::Negative => -1
        }
    }

    /// The opposite polarity.
    pub const fn flipped(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive
        }
    }
}


/// A group of same-sized dice, e.g. `4d6dl1` or `-2d8e`.
///
/// A term carries its configuration (count, face size, polarity, flat modifier, drop counts,
/// explosion) and the state of the current evaluation cycle. The first call to
/// [`Term::evaluate()`] draws from the given [`RandomSource`] and caches the outcome, later
/// calls return the cached result without drawing again until [`Term::reset()`] is called.
///
/// Every algebraic operation comes in two shapes: an in-place mutator such as
/// [`Term::add_modifier()`] and a pure form such as [`Term::with_modifier()`] that returns a
/// modified copy and leaves `self` alone.
///
/// # Examples
/// ```
/// use dice_pool::{Term, Scripted};
///
/// let mut term = Term::builder(6).count(4).dl(1).build().unwrap();
/// assert_eq!(term.to_string(), "4d6dl1");
///
/// let mut source = Scripted::new([3, 1, 6, 4]);
/// assert_eq!(term.evaluate(&mut source), 13);
/// assert_eq!(term.rolls(), &[3, 4, 6]);
/// assert_eq!(term.dropped_low(), &[1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Term {
    count: u32,
    face_size: u32,
    polarity: Polarity,
    modifier: Option<i64>,
    explode: bool,
    explode_limit: u32,
    drop_low: Option<u32>,
    drop_high: Option<u32>,
    rolls: Vec<u32>,
    kept: usize,
    explosions: Vec<u32>,
    dropped_low: Vec<u32>,
    dropped_high: Vec<u32>,
    result: Option<i64>
}

impl Term {
    /// Creates a positive term of `count` dice with `face_size` faces.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `count` or `face_size` is 0.
    pub fn new(count: u32, face_size: u32) -> Result<Self> {
        Self::builder(face_size).count(count).build()
    }

    /// Creates a new [`TermBuilder`] for dice with `face_size` faces.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::Term;
    ///
    /// let term = Term::builder(20)
    ///     .count(2)
    ///     .dh(1)
    ///     .explode(true)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(term.to_string(), "2d20dh1e");
    /// ```
    pub fn builder(face_size: u32) -> TermBuilder {
        TermBuilder::new(face_size)
    }

    /// Creates a term and evaluates it straight away.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `count` or `face_size` is 0.
    pub fn rolled<S: RandomSource + ?Sized>(count: u32, face_size: u32, source: &mut S) -> Result<Self> {
        let mut term = Self::new(count, face_size)?;
        term.evaluate(source);
        Ok(term)
    }

    /// Number of dice.
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Faces per die.
    pub const fn face_size(&self) -> u32 {
        self.face_size
    }

    /// Contribution sign of the term.
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// `true` if the term subtracts from the total.
    pub const fn is_negative(&self) -> bool {
        matches!(self.polarity, Polarity::Negative)
    }

    /// The flat modifier, `None` if no modifier was ever applied.
    pub const fn modifier(&self) -> Option<i64> {
        self.modifier
    }

    /// `true` if dice showing their highest face roll again.
    pub const fn explodes(&self) -> bool {
        self.explode
    }

    /// Maximum extra dice explosion may add in one evaluation.
    pub const fn explode_limit(&self) -> u32 {
        self.explode_limit
    }

    /// Number of lowest dice excluded from the sum.
    pub const fn drop_low(&self) -> Option<u32> {
        self.drop_low
    }

    /// Number of highest dice excluded from the sum.
    pub const fn drop_high(&self) -> Option<u32> {
        self.drop_high
    }

    /// Kept dice of the current cycle: the survivors of the drop rules in ascending order,
    /// followed by explosion draws in the order they were made.
    pub fn rolls(&self) -> &[u32] {
        &self.rolls
    }

    /// Dice removed by the drop-lowest rule, ascending.
    pub fn dropped_low(&self) -> &[u32] {
        &self.dropped_low
    }

    /// Dice removed by the drop-highest rule, ascending.
    pub fn dropped_high(&self) -> &[u32] {
        &self.dropped_high
    }

    /// The cached result of the current cycle.
    pub const fn result(&self) -> Option<i64> {
        self.result
    }

    /// `true` between the first [`Term::evaluate()`] and the next [`Term::reset()`].
    pub const fn is_evaluated(&self) -> bool {
        self.result.is_some()
    }

    /// Rolls the term, or returns the cached result if this cycle already rolled it.
    ///
    /// Draws `count` dice, sorts them, drops the configured number of lowest then highest
    /// dice, explodes kept dice showing the highest face, and sums the kept dice with the
    /// polarity sign applied before the modifier is added.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Term, Scripted};
    ///
    /// let mut term = Term::builder(6).count(2).explode(true).build().unwrap();
    /// let mut source = Scripted::new([6, 2, 6, 1]);
    ///
    /// // the first 6 explodes into another 6 which explodes into a 1
    /// assert_eq!(term.evaluate(&mut source), 21);
    /// assert_eq!(term.rolls(), &[2, 6, 6, 1]);
    ///
    /// // cached: no further draws
    /// assert_eq!(term.evaluate(&mut source), 21);
    /// assert_eq!(source.draws(), 4);
    /// ```
    pub fn evaluate<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64 {
        if let Some(result) = self.result {
            tracing::trace!(term = %notation::dice(self), result, "term already evaluated");
            return result;
        }

        let pool: Vec<u32> = (0..self.count)
            .map(|_| source.draw(self.face_size))
            .collect();

        self.partition(pool);

        if self.explode {
            let face_size = self.face_size;
            self.explode_kept(|| Some(source.draw(face_size)));
        }

        self.explosions = self.rolls[self.kept..].to_vec();

        let result = self.total();
        self.result = Some(result);

        tracing::debug!(term = %notation::dice(self), rolls = ?self.rolls, result, "evaluated term");
        result
    }

    /// Sorts freshly drawn dice and splits them by the drop rules into the kept dice and
    /// the dropped groups.
    fn partition(&mut self, mut pool: Vec<u32>) {
        pool.sort_unstable();

        self.dropped_low = split_lowest(&mut pool, self.drop_low.unwrap_or(0));
        self.dropped_high = split_highest(&mut pool, self.drop_high.unwrap_or(0));
        self.kept = pool.len();
        self.rolls = pool;
    }

    /// Appends a die from `next` for every kept die showing the highest face, appended
    /// dice included, until `next` runs dry or the limit is reached.
    fn explode_kept(&mut self, mut next: impl FnMut() -> Option<u32>) {
        // a d1 would chain forever
        if self.face_size < 2 {
            return;
        }

        let mut extra = 0;
        let mut i = 0;

        while i < self.rolls.len() {
            if self.rolls[i] == self.face_size {
                if extra >= self.explode_limit {
                    tracing::warn!(
                        term = %notation::dice(self),
                        limit = self.explode_limit,
                        "explosion chain stopped at limit"
                    );
                    break;
                }

                let Some(value) = next() else {
                    break;
                };

                tracing::trace!(face_size = self.face_size, value, "exploded");

                self.rolls.push(value);
                extra += 1;
            }

            i += 1;
        }
    }

    /// Splits the dice drawn this cycle again under the current drop rules, then replays
    /// the cycle's explosion draws over the new kept dice.
    fn repartition(&mut self) {
        if !self.is_evaluated() {
            return;
        }

        let kept = self.kept.min(self.rolls.len());
        let mut pool = std::mem::take(&mut self.dropped_low);
        pool.extend_from_slice(&self.rolls[..kept]);
        pool.append(&mut self.dropped_high);

        self.partition(pool);

        let explosions = std::mem::take(&mut self.explosions);
        let mut draws = explosions.iter().copied();
        self.explode_kept(|| draws.next());
        self.explosions = explosions;

        self.refresh_result();
    }

    fn total(&self) -> i64 {
        let sum: i64 = self.rolls.iter().map(|&r| i64::from(r)).sum();
        (self.polarity.sign() * sum).saturating_add(self.modifier.unwrap_or(0))
    }

    fn refresh_result(&mut self) {
        if self.result.is_some() {
            self.result = Some(self.total());
        }
    }

    /// Clears the rolls and result of the current cycle.
    /// Configuration, including the modifier, is kept.
    pub fn reset(&mut self) {
        self.rolls.clear();
        self.kept = 0;
        self.explosions.clear();
        self.dropped_low.clear();
        self.dropped_high.clear();
        self.result = None;
    }

    /// Adds `delta` to the flat modifier, starting from 0 if none was set.
    ///
    /// An evaluated term shifts its cached result by `delta`, nothing is redrawn.
    /// Both saturate at the `i64` bounds.
    pub fn add_modifier(&mut self, delta: i64) -> &mut Self {
        self.modifier = Some(self.modifier.unwrap_or(0).saturating_add(delta));

        if let Some(result) = self.result {
            self.result = Some(result.saturating_add(delta));
        }

        self
    }

    /// Pure form of [`Term::add_modifier()`].
    pub fn with_modifier(&self, delta: i64) -> Self {
        let mut term = self.clone();
        term.add_modifier(delta);
        term
    }

    /// Multiplies the number of dice by `factor`. Takes effect on the next roll.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `factor` is 0 or the count overflows.
    pub fn scale_count(&mut self, factor: u32) -> Result<&mut Self> {
        if factor == 0 {
            return Err(Error::InvalidArity("Cannot scale dice count by zero".into()));
        }

        self.count = self.count
            .checked_mul(factor)
            .ok_or_else(|| Error::InvalidArity(format!("{}d{} * {factor} overflows", self.count, self.face_size)))?;

        Ok(self)
    }

    /// Pure form of [`Term::scale_count()`].
    ///
    /// # Errors
    /// Same as [`Term::scale_count()`].
    pub fn scaled(&self, factor: u32) -> Result<Self> {
        let mut term = self.clone();
        term.scale_count(factor)?;
        Ok(term)
    }

    /// Divides the number of dice by `divisor`, rounding down. Takes effect on the next roll.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `divisor` is 0 or the quotient is 0,
    /// the term is left unchanged.
    pub fn scale_down_count(&mut self, divisor: u32) -> Result<&mut Self> {
        self.count = scaled_down_count(self.count, divisor)?;
        Ok(self)
    }

    /// Pure form of [`Term::scale_down_count()`].
    ///
    /// # Errors
    /// Same as [`Term::scale_down_count()`].
    pub fn scaled_down(&self, divisor: u32) -> Result<Self> {
        let mut term = self.clone();
        term.scale_down_count(divisor)?;
        Ok(term)
    }

    /// Adds the dice of `other` to this term. Takes effect on the next roll.
    ///
    /// # Errors
    /// Returns [`Error::FaceMismatch`] if the face sizes differ.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Term, Error};
    ///
    /// let mut term = Term::new(2, 6).unwrap();
    /// term.merge_same_face(&Term::new(3, 6).unwrap()).unwrap();
    /// assert_eq!(term.count(), 5);
    ///
    /// let err = term.merge_same_face(&Term::new(3, 8).unwrap()).unwrap_err();
    /// assert!(matches!(err, Error::FaceMismatch { found: 8, .. }));
    /// ```
    pub fn merge_same_face(&mut self, other: &Term) -> Result<&mut Self> {
        if other.face_size != self.face_size {
            return Err(Error::FaceMismatch { found: other.face_size, available: vec![self.face_size] });
        }

        self.count = self.count
            .checked_add(other.count)
            .ok_or_else(|| Error::InvalidArity(format!("{}d{} + {}d{} overflows", self.count, self.face_size, other.count, other.face_size)))?;

        Ok(self)
    }

    /// Pure form of [`Term::merge_same_face()`].
    ///
    /// # Errors
    /// Same as [`Term::merge_same_face()`].
    pub fn merged(&self, other: &Term) -> Result<Self> {
        let mut term = self.clone();
        term.merge_same_face(other)?;
        Ok(term)
    }

    /// Excludes the `n` lowest dice from the sum, 0 removes the rule.
    /// Dropping more dice than are available leaves no kept dice.
    ///
    /// On an evaluated term the dice drawn this cycle are partitioned again straight away,
    /// as if the rule had been set before the roll. Explosion draws of the cycle are
    /// replayed in order over the new kept dice; a newly kept highest face that would need
    /// more explosion draws than the cycle made stays unexploded until the next roll.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Scripted, Term};
    ///
    /// let mut term = Term::builder(6).count(2).explode(true).build().unwrap();
    /// term.evaluate(&mut Scripted::new([6, 3, 2]));
    /// assert_eq!(term.rolls(), &[3, 6, 2]);
    ///
    /// term.drop_lowest(1);
    /// assert_eq!(term.rolls(), &[6, 2]);
    /// assert_eq!(term.dropped_low(), &[3]);
    /// assert_eq!(term.result(), Some(8));
    /// ```
    pub fn drop_lowest(&mut self, n: u32) -> &mut Self {
        self.drop_low = (n > 0).then_some(n);
        self.repartition();
        self
    }

    /// Pure form of [`Term::drop_lowest()`].
    pub fn with_drop_lowest(&self, n: u32) -> Self {
        let mut term = self.clone();
        term.drop_lowest(n);
        term
    }

    /// Excludes the `n` highest of the remaining dice from the sum, 0 removes the rule.
    ///
    /// Re-partitions an evaluated term the same way [`Term::drop_lowest()`] does.
    pub fn drop_highest(&mut self, n: u32) -> &mut Self {
        self.drop_high = (n > 0).then_some(n);
        self.repartition();
        self
    }

    /// Pure form of [`Term::drop_highest()`].
    pub fn with_drop_highest(&self, n: u32) -> Self {
        let mut term = self.clone();
        term.drop_highest(n);
        term
    }

    /// Flips the polarity. A cached result is recomputed from the cached dice.
    pub fn negate(&mut self) -> &mut Self {
        self.polarity = self.polarity.flipped();
        self.refresh_result();
        self
    }

    /// Pure form of [`Term::negate()`].
    pub fn negated(&self) -> Self {
        let mut term = self.clone();
        term.negate();
        term
    }

    /// Turns explosion on or off. Takes effect on the next roll.
    pub fn set_explode(&mut self, explode: bool) -> &mut Self {
        self.explode = explode;
        self
    }

    /// Pure form of [`Term::set_explode()`].
    pub fn with_explode(&self, explode: bool) -> Self {
        let mut term = self.clone();
        term.set_explode(explode);
        term
    }

    /// Sets the maximum number of extra dice explosion may add in one evaluation.
    pub fn set_explode_limit(&mut self, limit: u32) -> &mut Self {
        self.explode_limit = limit;
        self
    }

    /// Expected value of the dice, ignoring drop rules, explosion and the modifier.
    ///
    /// With `round` the value is rounded half up.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::Term;
    ///
    /// assert_eq!(Term::new(2, 6).unwrap().average(false), 7.0);
    /// assert_eq!(Term::new(1, 3).unwrap().average(true), 2.0);
    /// assert_eq!(Term::new(1, 4).unwrap().average(true), 3.0);
    /// assert_eq!(Term::new(1, 4).unwrap().negated().average(false), -2.5);
    /// ```
    pub fn average(&self, round: bool) -> f64 {
        let expected = f64::from(self.count) * (f64::from(self.face_size) + 1.0) / 2.0;
        let expected = self.polarity.sign() as f64 * expected;

        if round {
            round_half_up(expected)
        } else {
            expected
        }
    }
}


/// Rounds to the nearest integer, halves towards positive infinity.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub(crate) fn scaled_down_count(count: u32, divisor: u32) -> Result<u32> {
    if divisor == 0 {
        return Err(Error::InvalidArity("Cannot divide dice count by zero".into()));
    }

    match count / divisor {
        0 => Err(Error::InvalidArity(format!("{count} dice / {divisor} leaves no dice"))),
        quotient => Ok(quotient)
    }
}

/// Removes and returns the `n` first values of an ascending pool.
fn split_lowest(pool: &mut Vec<u32>, n: u32) -> Vec<u32> {
    let n = (n as usize).min(pool.len());
    pool.drain(..n).collect()
}

/// Removes and returns the `n` last values of an ascending pool.
fn split_highest(pool: &mut Vec<u32>, n: u32) -> Vec<u32> {
    let n = (n as usize).min(pool.len());
    pool.split_off(pool.len() - n)
}


impl Neg for Term {
    type Output = Term;

    fn neg(mut self) -> Self::Output {
        self.negate();
        self
    }
}

impl Add<i64> for Term {
    type Output = Term;

    fn add(mut self, rhs: i64) -> Self::Output {
        self.add_modifier(rhs);
        self
    }
}

impl Sub<i64> for Term {
    type Output = Term;

    fn sub(self, rhs: i64) -> Self::Output {
        self + rhs.saturating_neg()
    }
}

impl AddAssign<i64> for Term {
    fn add_assign(&mut self, rhs: i64) {
        self.add_modifier(rhs);
    }
}

impl SubAssign<i64> for Term {
    fn sub_assign(&mut self, rhs: i64) {
        self.add_modifier(rhs.saturating_neg());
    }
}


/// A builder for [`Term`] with a fluent API.
///
/// Start with [`Term::builder()`], chain the setters and finish with [`TermBuilder::build()`].
#[derive(Debug, Clone)]
pub struct TermBuilder {
    face_size: u32,
    count: u32,
    polarity: Polarity,
    modifier: Option<i64>,
    explode: bool,
    explode_limit: u32,
    drop_low: Option<u32>,
    drop_high: Option<u32>
}

impl TermBuilder {
    /// Creates a builder for a single positive die with `face_size` faces.
    fn new(face_size: u32) -> Self {
        Self {
            face_size,
            count: 1,
            polarity: Polarity::Positive,
            modifier: None,
            explode: false,
            explode_limit: DEFAULT_EXPLODE_LIMIT,
            drop_low: None,
            drop_high: None
        }
    }

    /// Sets the number of dice.
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Makes the term subtract from the total.
    pub fn negative(mut self) -> Self {
        self.polarity = Polarity::Negative;
        self
    }

    /// Sets the polarity.
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Sets the flat modifier.
    pub fn modifier(mut self, modifier: i64) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Drops the `n` lowest dice, 0 for none.
    pub fn dl(mut self, n: u32) -> Self {
        self.drop_low = (n > 0).then_some(n);
        self
    }

    /// Drops the `n` highest dice, 0 for none.
    pub fn dh(mut self, n: u32) -> Self {
        self.drop_high = (n > 0).then_some(n);
        self
    }

    /// Turns explosion on or off.
    pub fn explode(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }

    /// Caps the extra dice explosion may add in one evaluation.
    pub fn explode_limit(mut self, limit: u32) -> Self {
        self.explode_limit = limit;
        self
    }

    /// Finalizes the configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if the count or face size is 0.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Term, Error};
    ///
    /// assert!(Term::builder(6).count(3).build().is_ok());
    /// assert!(matches!(Term::builder(0).build(), Err(Error::InvalidArity(_))));
    /// assert!(matches!(Term::builder(6).count(0).build(), Err(Error::InvalidArity(_))));
    /// ```
    pub fn build(self) -> Result<Term> {
        if self.count == 0 {
            return Err(Error::InvalidArity("Dice count must be greater than zero".into()));
        }

        if self.face_size == 0 {
            return Err(Error::InvalidArity("Face size must be greater than zero".into()));
        }

        Ok(Term {
            count: self.count,
            face_size: self.face_size,
            polarity: self.polarity,
            modifier: self.modifier,
            explode: self.explode,
            explode_limit: self.explode_limit,
            drop_low: self.drop_low,
            drop_high: self.drop_high,
            rolls: Vec::new(),
            kept: 0,
            explosions: Vec::new(),
            dropped_low: Vec::new(),
            dropped_high: Vec::new(),
            result: None
        })
    }
}


/// A macro for conveniently creating [`Term`] instances.
///
/// # Syntax
/// - `term!(SIZE)`: a single die of `SIZE` faces (e.g. `term!(20)` for 1d20).
/// - `term!(SIZE, COUNT)`: `COUNT` dice of `SIZE` faces (e.g. `term!(6, 3)` for 3d6).
/// - `term!(SIZE, COUNT, SETTER(ARGS)...)`: additionally calls each [`TermBuilder`] setter,
///   (e.g. `term!(6, 4, dl(1), explode(true))` for 4d6dl1e).
///
/// # Returns
/// `Result<Term, Error>` - the result of calling [`TermBuilder::build()`].
///
/// # Examples
/// ```
/// use dice_pool::term;
///
/// assert_eq!(term!(20).unwrap().to_string(), "1d20");
/// assert_eq!(term!(6, 3).unwrap().to_string(), "3d6");
/// assert_eq!(term!(6, 4, dl(1), explode(true)).unwrap().to_string(), "4d6dl1e");
/// assert_eq!(term!(8, 2, negative()).unwrap().to_string(), "-2d8");
/// assert!(term!(6, 0).is_err());
/// ```
#[macro_export]
macro_rules! term {
    ($size:expr) => {
        $crate::Term::builder($size)
            .build()
    };

    ($size:expr, $count:expr $(, $setter:ident ( $($arg:expr),* ))* $(,)?) => {
        $crate::Term::builder($size)
            .count($count)
            $(.$setter($($arg),*))*
            .build()
    };
}


#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use super::*;
    use crate::source::{Roller, Scripted};
    use crate::term_test_strategies::{term_strategy, script_strategy};


    proptest! {
        #[test]
        fn test_evaluate_draws_count_dice(term in term_strategy(), seed: u64) {
            let mut term = term;
            let mut source = Scripted::new(Vec::new());
            let mut roller = Roller::from_seed(seed);
            let mut counted = CountingRoller { roller: &mut roller, draws: &mut source };

            let result = term.evaluate(&mut counted);

            prop_assert_eq!(source.draws(), term.count() as usize);

            let drawn = term.rolls().len() + term.dropped_low().len() + term.dropped_high().len();
            prop_assert_eq!(drawn, term.count() as usize);

            for &value in term.rolls().iter().chain(term.dropped_low()).chain(term.dropped_high()) {
                prop_assert!(value >= 1 && value <= term.face_size());
            }

            let sum: i64 = term.rolls().iter().map(|&r| i64::from(r)).sum();
            prop_assert_eq!(result, term.polarity().sign() * sum + term.modifier().unwrap_or(0));
        }

        #[test]
        fn test_evaluate_is_idempotent(term in term_strategy(), script in script_strategy()) {
            let mut term = term;
            let mut source = Scripted::new(script);

            let first = term.evaluate(&mut source);
            let draws = source.draws();
            let rolls = term.rolls().to_vec();

            let second = term.evaluate(&mut source);

            prop_assert_eq!(first, second);
            prop_assert_eq!(source.draws(), draws);
            prop_assert_eq!(term.rolls(), rolls.as_slice());
        }

        #[test]
        fn test_reset_clears_cycle(term in term_strategy(), script in script_strategy()) {
            let mut term = term;
            let config = term.clone();
            let mut source = Scripted::new(script);

            term.evaluate(&mut source);
            term.reset();

            prop_assert!(!term.is_evaluated());
            prop_assert!(term.rolls().is_empty());
            prop_assert!(term.dropped_low().is_empty());
            prop_assert!(term.dropped_high().is_empty());
            prop_assert_eq!(term, config);
        }

        #[test]
        fn test_drop_rules_partition(
            values in prop::collection::vec(1..=20u32, 1..12),
            low in 0..15u32,
            high in 0..15u32
        ) {
            let count = values.len() as u32;
            let mut term = Term::builder(20).count(count).dl(low).dh(high).build().unwrap();
            let mut source = Scripted::new(values.clone());

            let result = term.evaluate(&mut source);

            let mut sorted = values.clone();
            sorted.sort_unstable();

            let low_n = (low as usize).min(sorted.len());
            let high_n = (high as usize).min(sorted.len() - low_n);

            prop_assert_eq!(term.dropped_low(), &sorted[..low_n]);
            prop_assert_eq!(term.dropped_high(), &sorted[sorted.len() - high_n..]);
            prop_assert_eq!(term.rolls(), &sorted[low_n..sorted.len() - high_n]);

            let expected: i64 = term.rolls().iter().map(|&r| i64::from(r)).sum();
            prop_assert_eq!(result, expected);
        }

        #[test]
        fn test_drop_after_roll_matches_drop_before_roll(
            face_size in 2..=6u32,
            count in 1..=6u32,
            script in prop::collection::vec(1..=6u32, 1..20),
            low in 0..4u32,
            high in 0..4u32
        ) {
            let mut before = Term::builder(face_size).count(count).dl(low).dh(high).explode(true).build().unwrap();
            let mut after = Term::builder(face_size).count(count).explode(true).build().unwrap();

            let expected = before.evaluate(&mut Scripted::new(script.clone()));
            after.evaluate(&mut Scripted::new(script));
            after.drop_lowest(low);
            after.drop_highest(high);

            prop_assert_eq!(after.result(), Some(expected));
            prop_assert_eq!(after.rolls(), before.rolls());
            prop_assert_eq!(after.dropped_low(), before.dropped_low());
            prop_assert_eq!(after.dropped_high(), before.dropped_high());
        }

        #[test]
        fn test_average_matches_formula(count in 1..50u32, face_size in 1..100u32, negative: bool) {
            let mut term = Term::new(count, face_size).unwrap();
            if negative {
                term.negate();
            }

            let expected = f64::from(count) * f64::from(face_size + 1) / 2.0;
            let sign = if negative { -1.0 } else { 1.0 };

            prop_assert_eq!(term.average(false), sign * expected);
            prop_assert_eq!(term.average(true), (sign * expected + 0.5).floor());
            prop_assert_eq!(term.negated().average(false), -term.average(false));
        }

        #[test]
        fn test_builder_validation(face_size in 0..20u32, count in 0..20u32) {
            let result = Term::builder(face_size).count(count).build();

            if face_size == 0 || count == 0 {
                prop_assert!(matches!(result, Err(Error::InvalidArity(_))));
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn test_merge_same_face(a in 1..100u32, b in 1..100u32, face in 1..20u32, other_face in 1..20u32) {
            let term = Term::new(a, face).unwrap();
            let other = Term::new(b, other_face).unwrap();

            match term.merged(&other) {
                Ok(merged) => {
                    prop_assert_eq!(face, other_face);
                    prop_assert_eq!(merged.count(), a + b);
                    prop_assert_eq!(merged.face_size(), face);
                },
                Err(err) => {
                    prop_assert_ne!(face, other_face);
                    prop_assert_eq!(err, Error::FaceMismatch { found: other_face, available: vec![face] });
                }
            }
        }
    }

    /// Forwards draws to a seeded roller while a script keeps count.
    struct CountingRoller<'a> {
        roller: &'a mut Roller,
        draws: &'a mut Scripted
    }

    impl RandomSource for CountingRoller<'_> {
        fn draw(&mut self, faces: u32) -> u32 {
            self.draws.draw(faces);
            self.roller.draw(faces)
        }
    }

    #[test]
    fn test_explosion_chains_until_non_max() {
        let mut term = Term::builder(6).explode(true).build().unwrap();
        let mut source = Scripted::new([6, 6, 2]);

        assert_eq!(term.evaluate(&mut source), 14);
        assert_eq!(term.rolls(), &[6, 6, 2]);
        assert_eq!(source.draws(), 3);
    }

    #[test]
    fn test_explosion_applies_to_kept_dice_only() {
        let mut term = Term::builder(6).count(3).dh(1).explode(true).build().unwrap();
        let mut source = Scripted::new([6, 5, 6, 3]);

        // sorted [5, 6, 6], the highest 6 is dropped, the kept 6 explodes into a 3
        assert_eq!(term.evaluate(&mut source), 14);
        assert_eq!(term.rolls(), &[5, 6, 3]);
        assert_eq!(term.dropped_high(), &[6]);
        assert_eq!(source.draws(), 4);
    }

    #[test]
    fn test_explosion_stops_at_limit() {
        let mut term = Term::builder(6).explode(true).explode_limit(3).build().unwrap();
        let mut source = Scripted::new([6]);

        assert_eq!(term.evaluate(&mut source), 24);
        assert_eq!(term.rolls().len(), 4);
        assert_eq!(source.draws(), 4);
    }

    #[test]
    fn test_single_face_never_explodes() {
        let mut term = Term::builder(1).count(3).explode(true).build().unwrap();
        let mut source = Scripted::new([1]);

        assert_eq!(term.evaluate(&mut source), 3);
        assert_eq!(source.draws(), 3);
    }

    #[test]
    fn test_drop_more_than_pool_truncates() {
        let mut term = Term::builder(6).count(2).dl(5).modifier(3).build().unwrap();
        let mut source = Scripted::new([4, 5]);

        assert_eq!(term.evaluate(&mut source), 3);
        assert!(term.rolls().is_empty());
        assert_eq!(term.dropped_low(), &[4, 5]);
        assert!(term.dropped_high().is_empty());
    }

    #[test]
    fn test_drop_after_evaluation_repartitions() {
        let mut term = Term::new(4, 6).unwrap();
        let mut source = Scripted::new([2, 5, 1, 4]);

        assert_eq!(term.evaluate(&mut source), 12);

        term.drop_lowest(2);
        assert_eq!(term.rolls(), &[4, 5]);
        assert_eq!(term.dropped_low(), &[1, 2]);
        assert_eq!(term.result(), Some(9));

        term.drop_lowest(1);
        assert_eq!(term.rolls(), &[2, 4, 5]);
        assert_eq!(term.dropped_low(), &[1]);
        assert_eq!(term.result(), Some(11));

        term.drop_highest(1);
        assert_eq!(term.rolls(), &[2, 4]);
        assert_eq!(term.dropped_high(), &[5]);
        assert_eq!(term.result(), Some(6));

        assert_eq!(source.draws(), 4);
    }

    #[test]
    fn test_drop_after_roll_keeps_explosions_with_their_dice() {
        let mut term = Term::builder(6).count(2).explode(true).build().unwrap();
        term.evaluate(&mut Scripted::new([6, 3, 2]));

        term.drop_lowest(1);
        assert_eq!(term.rolls(), &[6, 2]);
        assert_eq!(term.dropped_low(), &[3]);
        assert_eq!(term.result(), Some(8));

        let mut term = Term::builder(6).count(2).explode(true).build().unwrap();
        term.evaluate(&mut Scripted::new([6, 3, 5]));
        assert_eq!(term.rolls(), &[3, 6, 5]);

        // the 6 goes and takes the 5 it exploded into along
        term.drop_highest(1);
        assert_eq!(term.rolls(), &[3]);
        assert_eq!(term.dropped_high(), &[6]);
        assert_eq!(term.result(), Some(3));

        term.drop_highest(0);
        assert_eq!(term.rolls(), &[3, 6, 5]);
        assert_eq!(term.result(), Some(14));
    }

    #[test]
    fn test_newly_kept_max_without_cached_draw() {
        let mut term = Term::builder(6).count(2).dh(1).explode(true).build().unwrap();
        let mut source = Scripted::new([6, 6, 2]);

        // one 6 is dropped, the kept 6 explodes into a 2
        assert_eq!(term.evaluate(&mut source), 8);

        // the other 6 comes back without a draw of its own
        term.drop_highest(0);
        assert_eq!(term.rolls(), &[6, 6, 2]);
        assert_eq!(term.result(), Some(14));
        assert_eq!(source.draws(), 3);
    }

    #[test]
    fn test_rolled() {
        let mut source = Scripted::new([5, 2, 4]);
        let term = Term::rolled(3, 6, &mut source).unwrap();

        assert_eq!(term.result(), Some(11));
        assert_eq!(term.rolls(), &[2, 4, 5]);
        assert_eq!(source.draws(), 3);
        assert!(matches!(Term::rolled(0, 6, &mut source), Err(Error::InvalidArity(_))));
        assert_eq!(source.draws(), 3);
    }

    #[test]
    fn test_modifier_saturates() {
        let mut term = Term::new(1, 6).unwrap() + i64::MAX;
        term += 1i64;
        assert_eq!(term.modifier(), Some(i64::MAX));

        term.evaluate(&mut Scripted::new([3]));
        assert_eq!(term.result(), Some(i64::MAX));

        term -= i64::MAX;
        assert_eq!(term.result(), Some(0));
    }

    #[test]
    fn test_modifier_after_evaluation_shifts_result() {
        let mut term = Term::new(2, 6).unwrap();
        let mut source = Scripted::new([3, 4]);

        term.evaluate(&mut source);
        term += 2i64;
        assert_eq!(term.result(), Some(9));

        term -= 5i64;
        assert_eq!(term.result(), Some(4));
        assert_eq!(term.modifier(), Some(-3));
        assert_eq!(source.draws(), 2);
    }

    #[test]
    fn test_negative_term_subtracts_before_modifier() {
        let mut term = -(Term::new(2, 6).unwrap() + 10i64);
        let mut source = Scripted::new([3, 4]);

        assert_eq!(term.evaluate(&mut source), 3);
        assert!(term.is_negative());

        term.negate();
        assert_eq!(term.result(), Some(17));
    }

    #[test]
    fn test_reset_keeps_modifier() {
        let mut term = Term::new(1, 6).unwrap() + 2i64;
        let mut source = Scripted::new([5, 1]);

        assert_eq!(term.evaluate(&mut source), 7);
        term.reset();
        assert_eq!(term.modifier(), Some(2));
        assert_eq!(term.evaluate(&mut source), 3);
    }

    #[test]
    fn test_pure_forms_leave_receiver_untouched() {
        let term = Term::new(2, 6).unwrap();

        assert_eq!(term.with_modifier(3).modifier(), Some(3));
        assert_eq!(term.scaled(3).unwrap().count(), 6);
        assert_eq!(term.with_drop_lowest(1).drop_low(), Some(1));
        assert_eq!(term.with_drop_highest(1).drop_high(), Some(1));
        assert!(term.with_explode(true).explodes());
        assert!(term.negated().is_negative());

        assert_eq!(term, Term::new(2, 6).unwrap());
    }

    #[test]
    fn test_scaling() {
        let mut term = Term::new(5, 6).unwrap();

        term.scale_count(2).unwrap();
        assert_eq!(term.count(), 10);

        term.scale_down_count(3).unwrap();
        assert_eq!(term.count(), 3);

        assert!(matches!(term.scale_count(0), Err(Error::InvalidArity(_))));
        assert!(matches!(term.scale_down_count(0), Err(Error::InvalidArity(_))));
        assert!(matches!(term.scale_down_count(4), Err(Error::InvalidArity(_))));
        assert_eq!(term.count(), 3);
    }

    #[test]
    fn test_drop_zero_clears_rule() {
        let term = Term::builder(6).count(3).dl(1).build().unwrap();
        assert_eq!(term.with_drop_lowest(0).drop_low(), None);
    }

    #[test]
    fn test_term_macro() {
        let term = term!(6, 4, dl(1), dh(1), modifier(2)).unwrap();

        assert_eq!(term.count(), 4);
        assert_eq!(term.drop_low(), Some(1));
        assert_eq!(term.drop_high(), Some(1));
        assert_eq!(term.modifier(), Some(2));
    }
}
