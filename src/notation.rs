//! Text rendering of terms and pools.
//!
//! The symbolic form reads `4d6dl1dh1e`: count, `d`, face size, then the drop-lowest,
//! drop-highest and explosion markers. Rolled detail lists the kept dice joined by `" + "`,
//! with dropped dice wrapped in angle brackets on the side they were dropped from, e.g.
//! `<1> + 4 + 5 + <6>`.
//!
//! A pool renders on up to three lines:
//!
//! ```text
//! 1d20 - 2d6 + 3
//! [15] - [2 + 5] + 3
//! Result: 11
//! ```
//!
//! The second line only lists evaluated terms and only appears once one exists, the third
//! only appears once the pool total is cached.

use std::fmt::{self, Display, Write};
use crate::{Composite, Polarity, Term};


/// Symbolic notation of a term without sign or modifier, e.g. `4d6dl1e`.
///
/// # Examples
/// ```
/// use dice_pool::{notation, Term};
///
/// let term = Term::builder(6).count(4).dl(1).dh(1).explode(true).negative().build().unwrap();
/// assert_eq!(notation::dice(&term), "4d6dl1dh1e");
/// ```
pub fn dice(term: &Term) -> String {
    let mut s = format!("{}d{}", term.count(), term.face_size());

    if let Some(n) = term.drop_low() {
        let _ = write!(s, "dl{n}");
    }

    if let Some(n) = term.drop_high() {
        let _ = write!(s, "dh{n}");
    }

    if term.explodes() {
        s.push('e');
    }

    s
}

/// Modifier suffix, `" + 3"` or `" - 3"`.
pub fn modifier(value: i64) -> String {
    if value >= 0 {
        format!(" + {value}")
    } else {
        format!(" - {}", value.unsigned_abs())
    }
}

/// Rolled detail of a term, `None` until the term is evaluated.
///
/// # Examples
/// ```
/// use dice_pool::{notation, Scripted, Term};
///
/// let mut term = Term::builder(6).count(4).dl(1).dh(1).build().unwrap();
/// assert_eq!(notation::rolls(&term), None);
///
/// term.evaluate(&mut Scripted::new([5, 1, 6, 4]));
/// assert_eq!(notation::rolls(&term).as_deref(), Some("<1> + 4 + 5 + <6>"));
/// ```
pub fn rolls(term: &Term) -> Option<String> {
    if !term.is_evaluated() {
        return None;
    }

    let mut groups = Vec::with_capacity(3);

    if !term.dropped_low().is_empty() {
        groups.push(format!("<{}>", join(term.dropped_low())));
    }

    if !term.rolls().is_empty() {
        groups.push(join(term.rolls()));
    }

    if !term.dropped_high().is_empty() {
        groups.push(format!("<{}>", join(term.dropped_high())));
    }

    Some(groups.join(" + "))
}

/// The `Result: N` line.
pub fn result(value: i64) -> String {
    format!("Result: {value}")
}

fn join(values: &[u32]) -> String {
    values.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Separator written before a term inside a pool.
fn separator(first: bool, polarity: Polarity) -> &'static str {
    match (first, polarity) {
        (true, Polarity::Positive) => "",
        (true, Polarity::Negative) => "-",
        (false, Polarity::Positive) => " + ",
        (false, Polarity::Negative) => " - "
    }
}

fn write_modifier(f: &mut fmt::Formatter<'_>, value: Option<i64>) -> fmt::Result {
    match value {
        Some(value) => f.write_str(&modifier(value)),
        None => Ok(())
    }
}


impl Display for Term {
    /// Formats the term as its notation, followed by the rolled detail and the result once
    /// evaluated. A negative term is prefixed with `-` and its dice are parenthesized on the
    /// detail line.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Scripted, Term};
    ///
    /// let mut term = Term::new(2, 6).unwrap() + 1i64;
    /// assert_eq!(format!("{term}"), "2d6 + 1");
    ///
    /// term.evaluate(&mut Scripted::new([4, 3]));
    /// assert_eq!(format!("{term}"), "2d6 + 1\n3 + 4 + 1\nResult: 8");
    ///
    /// let mut term = -Term::new(2, 6).unwrap();
    /// term.evaluate(&mut Scripted::new([4, 3]));
    /// assert_eq!(format!("{term}"), "-2d6\n-(3 + 4)\nResult: -7");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };

        write!(f, "{sign}{}", dice(self))?;
        write_modifier(f, self.modifier())?;

        if let Some(rolls) = rolls(self) {
            if self.is_negative() {
                write!(f, "\n-({rolls})")?;
            } else {
                write!(f, "\n{rolls}")?;
            }

            write_modifier(f, self.modifier())?;
        }

        if let Some(value) = self.result() {
            write!(f, "\n{}", result(value))?;
        }

        Ok(())
    }
}

impl Display for Composite {
    /// Formats the pool notation, the bracketed detail of every evaluated term and the
    /// cached result. A term's own modifier follows its notation.
    ///
    /// # Examples
    /// ```
    /// use dice_pool::{Composite, Scripted, Term};
    ///
    /// let mut pool: Composite = [
    ///     Term::new(1, 20).unwrap(),
    ///     -Term::new(2, 6).unwrap(),
    ///     Term::new(1, 8).unwrap()
    /// ].into_iter().collect();
    ///
    /// assert_eq!(format!("{pool}"), "1d20 - 2d6 + 1d8");
    ///
    /// pool.evaluate(&mut Scripted::new([17, 2, 5, 8]));
    /// assert_eq!(format!("{pool}"), "1d20 - 2d6 + 1d8\n[17] - [2 + 5] + [8]\nResult: 18");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{}", self.modifier().unwrap_or(0))?;
        } else {
            for (i, term) in self.terms().iter().enumerate() {
                write!(f, "{}{}", separator(i == 0, term.polarity()), dice(term))?;
                write_modifier(f, term.modifier())?;
            }

            write_modifier(f, self.modifier())?;
        }

        let mut detail = String::new();
        for term in self.terms() {
            if let Some(rolls) = rolls(term) {
                let _ = write!(detail, "{}[{rolls}]", separator(detail.is_empty(), term.polarity()));

                if let Some(value) = term.modifier() {
                    detail.push_str(&modifier(value));
                }
            }
        }

        if !detail.is_empty() {
            write!(f, "\n{detail}")?;
            write_modifier(f, self.modifier())?;
        }

        if let Some(value) = self.result() {
            write!(f, "\n{}", result(value))?;
        }

        Ok(())
    }
}
