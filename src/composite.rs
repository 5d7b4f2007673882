use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use crate::error::{Error, Result};
use crate::operand::Operand;
use crate::source::RandomSource;
use crate::term::{round_half_up, Term};


/// An ordered pool of [`Term`]s plus a flat modifier, e.g. `1d20 + 2d6 - 1d4 + 3`.
///
/// The pool owns its terms. Evaluating rolls every term that has not been rolled this cycle,
/// sums them with the modifier and caches the total; [`Composite::reset()`] starts a new
/// cycle for the pool and all of its terms.
///
/// Term order only matters for rendering and for the order in which dice are drawn.
///
/// # Examples
/// ```
/// use dice_pool::{Composite, Scripted, Term};
///
/// let mut pool = Term::new(1, 20).unwrap() - Term::new(2, 6).unwrap() + 3i64;
/// assert_eq!(pool.to_string(), "1d20 - 2d6 + 3");
///
/// let mut source = Scripted::new([15, 2, 5]);
/// assert_eq!(pool.evaluate(&mut source), 11);
/// assert_eq!(pool.to_string(), "1d20 - 2d6 + 3\n[15] - [2 + 5] + 3\nResult: 11");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Composite {
    terms: Vec<Term>,
    modifier: Option<i64>,
    result: Option<i64>
}

impl Composite {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool from `(count, face_size)` pairs and evaluates it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if any count or face size is 0.
    pub fn rolled<S, I>(dice: I, source: &mut S) -> Result<Self>
    where
        S: RandomSource + ?Sized,
        I: IntoIterator<Item = (u32, u32)>
    {
        let mut pool = dice.into_iter()
            .map(|(count, face_size)| Term::new(count, face_size))
            .collect::<Result<Composite>>()?;

        pool.evaluate(source);
        Ok(pool)
    }

    /// The terms in rendering order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// `true` if the pool holds no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Pool-level flat modifier, independent of the terms' own modifiers.
    pub const fn modifier(&self) -> Option<i64> {
        self.modifier
    }

    /// The cached total of the current cycle.
    pub const fn result(&self) -> Option<i64> {
        self.result
    }

    /// `true` once the pool has been evaluated this cycle.
    pub const fn is_evaluated(&self) -> bool {
        self.result.is_some()
    }

    /// Rolls every term not yet rolled this cycle and caches the total.
    /// A cached total is returned unchanged.
    pub fn evaluate<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64 {
        if let Some(result) = self.result {
            tracing::trace!(result, "pool already evaluated");
            return result;
        }

        let mut total = self.modifier.unwrap_or(0);
        for term in &mut self.terms {
            total = total.saturating_add(term.evaluate(source));
        }

        self.result = Some(total);

        tracing::debug!(terms = self.terms.len(), result = total, "evaluated pool");
        total
    }

    /// Clears the cached total and resets every term.
    pub fn reset(&mut self) {
        for term in &mut self.terms {
            term.reset();
        }

        self.result = None;
    }

    /// Recomputes a cached total from the cached term results.
    fn refresh_result(&mut self) {
        if self.result.is_some() {
            self.result = self.terms.iter()
                .map(Term::result)
                .try_fold(self.modifier.unwrap_or(0), |total, result| Some(total.saturating_add(result?)));
        }
    }

    /// Appends a term. A new term invalidates the cached total.
    pub fn append(&mut self, term: Term) -> &mut Self {
        self.terms.push(term);
        self.result = None;
        self
    }

    /// Pure form of [`Composite::append()`].
    pub fn with_term(&self, term: Term) -> Self {
        let mut pool = self.clone();
        pool.append(term);
        pool
    }

    /// Appends the terms of `other` and adds its modifier to this pool's modifier.
    pub fn merge(&mut self, other: Composite) -> &mut Self {
        if let Some(modifier) = other.modifier {
            self.modifier = Some(self.modifier.unwrap_or(0).saturating_add(modifier));
        }

        self.terms.extend(other.terms);
        self.result = None;
        self
    }

    /// Pure form of [`Composite::merge()`].
    pub fn merged(&self, other: &Composite) -> Self {
        let mut pool = self.clone();
        pool.merge(other.clone());
        pool
    }

    /// Adds `delta` to the pool modifier, starting from 0 if none was set.
    /// A cached total shifts by `delta`. Both saturate at the `i64` bounds.
    pub fn add_modifier(&mut self, delta: i64) -> &mut Self {
        self.modifier = Some(self.modifier.unwrap_or(0).saturating_add(delta));

        if let Some(result) = self.result {
            self.result = Some(result.saturating_add(delta));
        }

        self
    }

    /// Pure form of [`Composite::add_modifier()`].
    pub fn with_modifier(&self, delta: i64) -> Self {
        let mut pool = self.clone();
        pool.add_modifier(delta);
        pool
    }

    /// Adds dice to the terms with the same face size.
    ///
    /// A single term is merged into the first term with its face size. A pool is merged
    /// one term at a time, in order. Counts change for the next roll, the current cycle
    /// is kept.
    ///
    /// # Errors
    /// - Returns [`Error::FaceMismatch`] if a face size has no term to merge into,
    ///   nothing is merged in that case.
    /// - Returns [`Error::InvalidArity`] if a merged count overflows, the pool is left
    ///   as it was.
    /// - Returns [`Error::UnsupportedOperand`] for a flat modifier.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Composite, Error, Term};
    ///
    /// let mut pool = Term::new(1, 20).unwrap() + Term::new(2, 6).unwrap();
    /// pool.merge_same_face(Term::new(2, 6).unwrap()).unwrap();
    /// assert_eq!(pool.to_string(), "1d20 + 4d6");
    ///
    /// let err = pool.merge_same_face(Term::new(1, 8).unwrap()).unwrap_err();
    /// assert!(matches!(err, Error::FaceMismatch { found: 8, .. }));
    /// ```
    pub fn merge_same_face<O: Into<Operand>>(&mut self, other: O) -> Result<&mut Self> {
        match other.into() {
            Operand::Term(term) => {
                self.check_face(term.face_size())?;
                merge_term(&mut self.terms, &term)?;
            },

            Operand::Pool(pool) => {
                for term in pool.terms() {
                    self.check_face(term.face_size())?;
                }

                let mut merged = self.terms.clone();
                for term in pool.terms() {
                    merge_term(&mut merged, term)?;
                }

                self.terms = merged;
            },

            Operand::Modifier(value) => {
                return Err(Error::UnsupportedOperand(format!("cannot merge modifier {value} by face size")));
            }
        }

        Ok(self)
    }

    /// Pure form of [`Composite::merge_same_face()`].
    ///
    /// # Errors
    /// Same as [`Composite::merge_same_face()`].
    pub fn merged_same_face<O: Into<Operand>>(&self, other: O) -> Result<Self> {
        let mut pool = self.clone();
        pool.merge_same_face(other)?;
        Ok(pool)
    }

    fn check_face(&self, face_size: u32) -> Result<()> {
        match self.find_by_face_size(face_size) {
            Some(_) => Ok(()),
            None => Err(Error::FaceMismatch {
                found: face_size,
                available: self.terms.iter().map(Term::face_size).collect()
            })
        }
    }

    /// Flips the polarity of every term, the pool modifier is kept.
    pub fn negate_all(&mut self) -> &mut Self {
        for term in &mut self.terms {
            term.negate();
        }

        self.refresh_result();
        self
    }

    /// Pure form of [`Composite::negate_all()`].
    pub fn negated(&self) -> Self {
        let mut pool = self.clone();
        pool.negate_all();
        pool
    }

    /// Multiplies the dice count of every term by `factor`, the pool modifier is untouched.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `factor` is 0 or a count overflows,
    /// no term is changed in that case.
    pub fn scale_all(&mut self, factor: u32) -> Result<&mut Self> {
        self.terms = self.terms.iter()
            .map(|term| term.scaled(factor))
            .collect::<Result<Vec<Term>>>()?;

        Ok(self)
    }

    /// Pure form of [`Composite::scale_all()`].
    ///
    /// # Errors
    /// Same as [`Composite::scale_all()`].
    pub fn scaled(&self, factor: u32) -> Result<Self> {
        let mut pool = self.clone();
        pool.scale_all(factor)?;
        Ok(pool)
    }

    /// Divides the dice count of every term by `divisor`, rounding down.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `divisor` is 0 or would leave a term without
    /// dice, no term is changed in that case.
    pub fn scale_down_all(&mut self, divisor: u32) -> Result<&mut Self> {
        self.terms = self.terms.iter()
            .map(|term| term.scaled_down(divisor))
            .collect::<Result<Vec<Term>>>()?;

        Ok(self)
    }

    /// Pure form of [`Composite::scale_down_all()`].
    ///
    /// # Errors
    /// Same as [`Composite::scale_down_all()`].
    pub fn scaled_down(&self, divisor: u32) -> Result<Self> {
        let mut pool = self.clone();
        pool.scale_down_all(divisor)?;
        Ok(pool)
    }

    /// The first term with `face_size` faces.
    pub fn find_by_face_size(&self, face_size: u32) -> Option<&Term> {
        self.terms.iter().find(|t| t.face_size() == face_size)
    }

    /// Mutable access to the first term with `face_size` faces, e.g. to give only the d6
    /// of a mixed pool a drop rule.
    ///
    /// Access invalidates the cached total, the next [`Composite::evaluate()`] sums the
    /// cached term results again without redrawing them.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Composite, Scripted, Term};
    ///
    /// let mut pool = Term::new(1, 20).unwrap() + Term::new(3, 6).unwrap();
    /// if let Some(d6) = pool.find_by_face_size_mut(6) {
    ///     d6.drop_lowest(1);
    /// }
    /// assert_eq!(pool.to_string(), "1d20 + 3d6dl1");
    /// assert!(pool.find_by_face_size_mut(8).is_none());
    /// ```
    pub fn find_by_face_size_mut(&mut self, face_size: u32) -> Option<&mut Term> {
        self.result = None;
        self.terms.iter_mut().find(|t| t.face_size() == face_size)
    }

    /// Replaces every term with `face_size` faces by a copy of `term`,
    /// returns the number of replaced terms.
    pub fn replace_by_face_size(&mut self, face_size: u32, term: Term) -> usize {
        let mut replaced = 0;

        for slot in self.terms.iter_mut().filter(|t| t.face_size() == face_size) {
            *slot = term.clone();
            replaced += 1;
        }

        if replaced > 0 {
            self.result = None;
        }

        replaced
    }

    /// Turns explosion on or off for every term.
    pub fn set_explode(&mut self, explode: bool) -> &mut Self {
        for term in &mut self.terms {
            term.set_explode(explode);
        }

        self
    }

    /// Sets the explosion limit of every term.
    pub fn set_explode_limit(&mut self, limit: u32) -> &mut Self {
        for term in &mut self.terms {
            term.set_explode_limit(limit);
        }

        self
    }

    /// Sum of the terms' expected values, rounded half up at the end if `round` is set.
    /// Modifiers are not included.
    pub fn average(&self, round: bool) -> f64 {
        let average: f64 = self.terms.iter().map(|t| t.average(false)).sum();

        if round {
            round_half_up(average)
        } else {
            average
        }
    }
}


impl From<Term> for Composite {
    fn from(value: Term) -> Self {
        Self { terms: vec![value], modifier: None, result: None }
    }
}

impl FromIterator<Term> for Composite {
    fn from_iter<T: IntoIterator<Item = Term>>(iter: T) -> Self {
        Self { terms: iter.into_iter().collect(), modifier: None, result: None }
    }
}

impl Extend<Term> for Composite {
    fn extend<T: IntoIterator<Item = Term>>(&mut self, iter: T) {
        self.terms.extend(iter);
        self.result = None;
    }
}

impl IntoIterator for Composite {
    type Item = Term;
    type IntoIter = std::vec::IntoIter<Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.into_iter()
    }
}


impl Add<Term> for Term {
    type Output = Composite;

    fn add(self, rhs: Term) -> Self::Output {
        Composite::from_iter([self, rhs])
    }
}

impl Sub<Term> for Term {
    type Output = Composite;

    fn sub(self, rhs: Term) -> Self::Output {
        self + -rhs
    }
}

impl Add<Term> for Composite {
    type Output = Composite;

    fn add(mut self, rhs: Term) -> Self::Output {
        self.append(rhs);
        self
    }
}

impl Sub<Term> for Composite {
    type Output = Composite;

    fn sub(self, rhs: Term) -> Self::Output {
        self + -rhs
    }
}

impl Add<Composite> for Composite {
    type Output = Composite;

    fn add(mut self, rhs: Composite) -> Self::Output {
        self.merge(rhs);
        self
    }
}

impl Sub<Composite> for Composite {
    type Output = Composite;

    fn sub(self, rhs: Composite) -> Self::Output {
        self + -rhs
    }
}

impl Add<i64> for Composite {
    type Output = Composite;

    fn add(mut self, rhs: i64) -> Self::Output {
        self.add_modifier(rhs);
        self
    }
}

impl Sub<i64> for Composite {
    type Output = Composite;

    fn sub(self, rhs: i64) -> Self::Output {
        self + rhs.saturating_neg()
    }
}

impl AddAssign<Term> for Composite {
    fn add_assign(&mut self, rhs: Term) {
        self.append(rhs);
    }
}

impl SubAssign<Term> for Composite {
    fn sub_assign(&mut self, rhs: Term) {
        self.append(-rhs);
    }
}

impl AddAssign<Composite> for Composite {
    fn add_assign(&mut self, rhs: Composite) {
        self.merge(rhs);
    }
}

impl AddAssign<i64> for Composite {
    fn add_assign(&mut self, rhs: i64) {
        self.add_modifier(rhs);
    }
}

impl SubAssign<i64> for Composite {
    fn sub_assign(&mut self, rhs: i64) {
        self.add_modifier(rhs.saturating_neg());
    }
}

impl Neg for Composite {
    type Output = Composite;

    fn neg(mut self) -> Self::Output {
        self.negate_all();
        self
    }
}


/// Merges into the first term with the same face size. Faces are checked by the caller.
fn merge_term(terms: &mut [Term], other: &Term) -> Result<()> {
    match terms.iter_mut().find(|t| t.face_size() == other.face_size()) {
        Some(term) => term.merge_same_face(other).map(|_| ()),
        None => Err(Error::FaceMismatch {
            found: other.face_size(),
            available: Vec::new()
        })
    }
}
