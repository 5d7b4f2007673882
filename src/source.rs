use rand::{rngs::StdRng, Rng, SeedableRng};


/// Supplies uniform die draws to an evaluation.
///
/// Terms and pools never reach for an ambient generator, every draw goes through the
/// source handed to `evaluate`, so a seeded or scripted source replays a roll exactly.
pub trait RandomSource {
    /// Returns a uniformly distributed value in `1..=faces`.
    ///
    /// `faces` is always at least 1.
    fn draw(&mut self, faces: u32) -> u32;
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn draw(&mut self, faces: u32) -> u32 {
        (**self).draw(faces)
    }
}


/// A [`RandomSource`] backed by any [`rand`] generator, [`StdRng`] by default.
///
/// # Examples
/// ```
/// use dice_pool::{RandomSource, Roller};
///
/// let mut a = Roller::from_seed(7);
/// let mut b = Roller::from_seed(7);
///
/// let draws_a: Vec<u32> = (0..5).map(|_| a.draw(20)).collect();
/// let draws_b: Vec<u32> = (0..5).map(|_| b.draw(20)).collect();
/// assert_eq!(draws_a, draws_b);
/// ```
#[derive(Debug, Clone)]
pub struct Roller<R = StdRng> {
    rng: R
}

impl Roller<StdRng> {
    /// Creates a roller seeded from the operating system.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    /// Creates a deterministic roller, the same seed always yields the same draws.
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<R: Rng> Roller<R> {
    /// Wraps an existing generator.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Mutable access to the wrapped generator.
    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }
}

impl<R: Rng> RandomSource for Roller<R> {
    fn draw(&mut self, faces: u32) -> u32 {
        self.rng.random_range(1..=faces.max(1))
    }
}


/// Replays a fixed sequence of draws, cycling when it runs out, and counts every draw.
///
/// Values are clamped into `1..=faces` so one script can serve dice of any size.
/// An empty script always draws 1.
///
/// # Examples
/// ```
/// use dice_pool::{RandomSource, Scripted};
///
/// let mut source = Scripted::new([3, 9, 1]);
/// assert_eq!(source.draw(6), 3);
/// assert_eq!(source.draw(6), 6); // clamped
/// assert_eq!(source.draw(6), 1);
/// assert_eq!(source.draw(6), 3); // cycles
/// assert_eq!(source.draws(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scripted {
    values: Vec<u32>,
    cursor: usize,
    draws: usize
}

impl Scripted {
    /// Creates a source replaying `values` in order.
    pub fn new<I: IntoIterator<Item = u32>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
            cursor: 0,
            draws: 0
        }
    }

    /// Number of draws served so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for Scripted {
    fn draw(&mut self, faces: u32) -> u32 {
        self.draws += 1;

        let value = self.values.get(self.cursor).copied().unwrap_or(1);

        if !self.values.is_empty() {
            self.cursor = (self.cursor + 1) % self.values.len();
        }

        value.clamp(1, faces.max(1))
    }
}
