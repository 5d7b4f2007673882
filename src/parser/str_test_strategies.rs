use proptest::prelude::*;


/// One summand of a notation string.
#[derive(Debug, Clone)]
pub(crate) enum Item {
    Number(u32),
    Dice(String)
}


pub(crate) fn simple_number_strategy() -> impl Strategy<Value = u32> {
    1u32..=1000
}

/// Dice in the order they render: count, face size, `dl`, `dh`, `e`.
pub(crate) fn dice_strategy() -> impl Strategy<Value = String> {
    (
        1u32..=100,
        1u32..=100,
        prop::option::of(1u32..=5),
        prop::option::of(1u32..=5),
        any::<bool>()
    ).prop_map(|(count, size, low, high, explode)| {
        let mut dice = format!("{count}d{size}");

        if let Some(n) = low {
            dice += &format!("dl{n}");
        }

        if let Some(n) = high {
            dice += &format!("dh{n}");
        }

        if explode {
            dice.push('e');
        }

        dice
    })
}

/// Signed summands in any order, numbers anywhere.
pub(crate) fn items_strategy() -> impl Strategy<Value = Vec<(bool, Item)>> {
    let item = prop_oneof![
        simple_number_strategy().prop_map(Item::Number),
        dice_strategy().prop_map(Item::Dice),
    ];

    prop::collection::vec((any::<bool>(), item), 1..6)
}

pub(crate) fn join_items(items: &[(bool, Item)], spaced: bool) -> String {
    let space = if spaced { " " } else { "" };
    let mut expr = String::new();

    for (i, (negative, item)) in items.iter().enumerate() {
        match (i, negative) {
            (0, true) => expr.push('-'),
            (0, false) => {},
            (_, true) => expr += &format!("{space}-{space}"),
            (_, false) => expr += &format!("{space}+{space}")
        }

        match item {
            Item::Number(n) => expr += &n.to_string(),
            Item::Dice(dice) => expr += dice
        }
    }

    expr
}

/// Notation exactly as a pool renders it: signed dice first, then a non-zero modifier.
pub(crate) fn pool_notation_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec((any::<bool>(), dice_strategy()), 1..5),
        prop::option::of(prop_oneof![-50i64..=-1, 1i64..=50])
    ).prop_map(|(terms, modifier)| {
        let items: Vec<(bool, Item)> = terms.into_iter()
            .map(|(negative, dice)| (negative, Item::Dice(dice)))
            .collect();

        let mut expr = join_items(&items, true);

        match modifier {
            Some(m) if m < 0 => expr += &format!(" - {}", -m),
            Some(m) => expr += &format!(" + {m}"),
            None => {}
        }

        expr
    })
}
