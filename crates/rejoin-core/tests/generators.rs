#![allow(dead_code)]

use proptest::prelude::*;

const ENDINGS: &[&str] = &[
    "", "", ",", ";", ".", "!", "?", ")", ".\"", "?'", "!\u{201d}", ".\u{2019}", "\"",
];

/// A short paragraph with a random leading case and ending.
pub fn arb_paragraph() -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        "[a-z]{1,8}( [a-z]{1,8}){0,4}",
        prop::sample::select(ENDINGS),
    )
        .prop_map(|(upper, body, end)| {
            let mut chars = body.chars();
            let first = chars.next().unwrap_or('x');
            let first = if upper {
                first.to_ascii_uppercase()
            } else {
                first
            };
            format!("{first}{}{end}", chars.as_str())
        })
}

pub fn arb_book() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_paragraph(), 0..12)
}

#[derive(Debug, Clone)]
pub enum Op {
    Accept,
    AcceptEdited(String),
    Skip,
    Back,
}

pub fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Accept),
        1 => "[a-z]{1,6}( [a-z]{1,6}){0,3}".prop_map(Op::AcceptEdited),
        2 => Just(Op::Skip),
        2 => Just(Op::Back),
    ]
}

pub fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 0..24)
}
