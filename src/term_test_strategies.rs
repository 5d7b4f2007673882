use proptest::prelude::*;
use crate::term::Term;


pub(crate) fn drop_strategy(max_n: u32) -> impl Strategy<Value = (u32, u32)> {
    (0..=max_n, 0..=max_n, 0u8..4).prop_map(|(low, high, kind)| {
        match kind {
            0 => (0, 0),
            1 => (low, 0),
            2 => (0, high),
            _ => (low, high)
        }
    })
}

/// Non-exploding terms, so a roll always draws exactly `count` dice.
pub(crate) fn term_strategy() -> impl Strategy<Value = Term> {
    (1..=20u32, 1..=12u32, any::<bool>(), prop::option::of(-20..=20i64))
        .prop_flat_map(|(size, count, negative, modifier)| {
            drop_strategy(count + 1).prop_map(move |(low, high)| {
                let mut builder = Term::builder(size).count(count).dl(low).dh(high);

                if negative {
                    builder = builder.negative();
                }

                if let Some(modifier) = modifier {
                    builder = builder.modifier(modifier);
                }

                builder.build().unwrap()
            })
        })
}

pub(crate) fn script_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1..=20u32, 1..30)
}
