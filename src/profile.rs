use std::fmt::Display;
use crate::error::{Error, Result};
use crate::source::RandomSource;
use crate::{Composite, Term};


/// Attribute dice by score, starting at score 1.
const ATTRIBUTE_DICE: [(u32, u32); 10] = [
    (1, 4),
    (1, 6),
    (1, 8),
    (1, 10),
    (2, 6),
    (2, 8),
    (2, 10),
    (3, 8),
    (3, 10),
    (4, 8)
];

/// Every action roll starts with this die.
const BASE_DIE: u32 = 20;

/// Highest attribute score in the table.
pub const MAX_SCORE: i32 = ATTRIBUTE_DICE.len() as i32;


/// The `(count, face_size)` attribute dice for a score, `None` for scores of 0 or less.
///
/// # Errors
/// Returns [`Error::ScoreOutOfRange`] if `score` is above [`MAX_SCORE`].
pub fn attribute_dice(score: i32) -> Result<Option<(u32, u32)>> {
    if score > MAX_SCORE {
        return Err(Error::ScoreOutOfRange { score, max: MAX_SCORE });
    }

    match usize::try_from(score) {
        Ok(score) if score > 0 => Ok(Some(ATTRIBUTE_DICE[score - 1])),
        _ => Ok(None)
    }
}

/// The exploding action pool for an attribute score: `1d20` plus the attribute dice.
///
/// # Errors
/// Returns [`Error::ScoreOutOfRange`] if `score` is above [`MAX_SCORE`].
///
/// # Examples
/// ```
/// use dice_pool::attribute_pool;
///
/// assert_eq!(attribute_pool(0).unwrap().to_string(), "1d20e");
/// assert_eq!(attribute_pool(5).unwrap().to_string(), "1d20e + 2d6e");
/// assert!(attribute_pool(11).is_err());
/// ```
pub fn attribute_pool(score: i32) -> Result<Composite> {
    let mut pool = Composite::from(Term::new(1, BASE_DIE)?);

    if let Some((count, face_size)) = attribute_dice(score)? {
        pool.append(Term::new(count, face_size)?);
    }

    pool.set_explode(true);
    Ok(pool)
}


/// An action roll for one attribute score, with advantage, disadvantage and legend points
/// applied on top of the attribute pool.
///
/// Advantage adds dice of the attribute's die size and drops as many of the lowest, so the
/// pool keeps its size while shifting up; disadvantage drops the highest instead. A score of
/// 0 or less has no attribute dice and applies both to the d20.
///
/// # Examples
/// ```
/// use dice_pool::{AttributeProfile, Scripted};
///
/// let mut profile = AttributeProfile::from_score(5).unwrap();
/// profile.legend(2).unwrap();
/// assert_eq!(profile.pool().to_string(), "1d20e + 4d6dl2e + 2");
///
/// let mut source = Scripted::new([12, 3, 1, 5, 2]);
/// assert_eq!(profile.roll(&mut source), 12 + 3 + 5 + 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeProfile {
    score: i32,
    pool: Composite
}

impl AttributeProfile {
    /// Creates the profile for `score`.
    ///
    /// # Errors
    /// Returns [`Error::ScoreOutOfRange`] if `score` is above [`MAX_SCORE`].
    pub fn from_score(score: i32) -> Result<Self> {
        Ok(Self { score, pool: attribute_pool(score)? })
    }

    /// The attribute score.
    pub const fn score(&self) -> i32 {
        self.score
    }

    /// The action pool with every grant applied so far.
    pub fn pool(&self) -> &Composite {
        &self.pool
    }

    /// Gives up the profile and returns its pool.
    pub fn into_pool(self) -> Composite {
        self.pool
    }

    /// Face size that advantage and disadvantage work on.
    pub fn attribute_die(&self) -> u32 {
        match attribute_dice(self.score) {
            Ok(Some((_, face_size))) => face_size,
            _ => BASE_DIE
        }
    }

    /// Adds `n` attribute dice and drops the `n` lowest of them.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `n` is 0.
    pub fn advantage(&mut self, n: u32) -> Result<&mut Self> {
        self.grant(n, Term::drop_lowest)
    }

    /// Adds `n` attribute dice and drops the `n` highest of them.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `n` is 0.
    pub fn disadvantage(&mut self, n: u32) -> Result<&mut Self> {
        self.grant(n, Term::drop_highest)
    }

    /// Spends `n` legend points: advantage `n` plus a flat `+n`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArity`] if `n` is 0.
    pub fn legend(&mut self, n: u32) -> Result<&mut Self> {
        self.advantage(n)?;
        self.pool.add_modifier(i64::from(n));
        Ok(self)
    }

    fn grant(&mut self, n: u32, rule: fn(&mut Term, u32) -> &mut Term) -> Result<&mut Self> {
        if n == 0 {
            return Err(Error::InvalidArity("Cannot grant zero dice".into()));
        }

        let face_size = self.attribute_die();
        self.pool.merge_same_face(Term::new(n, face_size)?)?;

        if let Some(term) = self.pool.find_by_face_size_mut(face_size) {
            rule(term, n);
        }

        tracing::debug!(score = self.score, n, face_size, pool = %self.pool, "granted dice");
        Ok(self)
    }

    /// Evaluates the pool, see [`Composite::evaluate()`].
    pub fn roll<S: RandomSource + ?Sized>(&mut self, source: &mut S) -> i64 {
        self.pool.evaluate(source)
    }

    /// Starts a new roll cycle, grants stay applied.
    pub fn reset(&mut self) {
        self.pool.reset();
    }
}

impl Display for AttributeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Attribute Score: {}\n{}", self.score, self.pool)
    }
}
