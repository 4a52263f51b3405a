//! The fortune probability table.
//!
//! For each odds tier and tension, three thresholds split a d100 draw in
//! `0..=99`: below A is an exceptional yes, `[A, B)` yes, `[B, C)` no and
//! `C` or above an exceptional no. Tension 5 is the baseline; each step
//! away shifts the thresholds by the tier's step.

use std::sync::LazyLock;

use loom_core::model::{FortuneOutcome, OddsTier, Tension};
use loom_core::rng::DeterministicRng;
use serde::Serialize;

/// Thresholds over a d100 draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Upper bound (exclusive) of an exceptional yes.
    pub a: i32,
    /// Upper bound (exclusive) of a yes.
    pub b: i32,
    /// Upper bound (exclusive) of a no.
    pub c: i32,
}

impl Thresholds {
    /// Maps a draw in `0..=99` to an outcome.
    #[must_use]
    pub fn outcome(self, roll: i32) -> FortuneOutcome {
        if roll < self.a {
            FortuneOutcome::ExceptionalYes
        } else if roll < self.b {
            FortuneOutcome::Yes
        } else if roll < self.c {
            FortuneOutcome::No
        } else {
            FortuneOutcome::ExceptionalNo
        }
    }

    /// Percent chance of each outcome.
    #[must_use]
    pub fn chances(self) -> Chances {
        Chances {
            exceptional_yes: self.a,
            yes: self.b - self.a,
            no: self.c - self.b,
            exceptional_no: 100 - self.c,
        }
    }
}

/// Percent chance of each outcome, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chances {
    /// Exceptional yes.
    pub exceptional_yes: i32,
    /// Yes.
    pub yes: i32,
    /// No.
    pub no: i32,
    /// Exceptional no.
    pub exceptional_no: i32,
}

// (A, B, C) at tension 5, per tier in `OddsTier::ALL` order.
const BASELINE: [(i32, i32, i32); 7] = [
    (1, 5, 65),
    (3, 15, 80),
    (5, 30, 85),
    (10, 50, 90),
    (15, 70, 95),
    (20, 85, 97),
    (30, 95, 99),
];

// Shift per tension step above 5.
const STEP: [(i32, i32, i32); 7] = [
    (1, 3, -4),
    (1, 4, -4),
    (1, 5, -4),
    (2, 5, -3),
    (2, 5, -2),
    (2, 4, -1),
    (2, 3, -1),
];

fn compute(tier: OddsTier, tension: i32) -> Thresholds {
    let (a0, b0, c0) = BASELINE[tier.index()];
    let (da, db, dc) = STEP[tier.index()];
    let steps = tension - Tension::NEUTRAL.get();
    let a = (a0 + da * steps).clamp(0, 99);
    let b = (b0 + db * steps).min(99).max(a + 1);
    let c = (c0 + dc * steps).min(100).max(b + 1);
    Thresholds { a, b, c }
}

static TABLE: LazyLock<[[Thresholds; 9]; 7]> = LazyLock::new(|| {
    OddsTier::ALL.map(|tier| {
        std::array::from_fn(|column| {
            compute(tier, Tension::MIN + i32::try_from(column).unwrap_or_default())
        })
    })
});

/// Thresholds for `tier` at `tension`.
#[must_use]
pub fn thresholds(tier: OddsTier, tension: Tension) -> Thresholds {
    let column = usize::try_from(tension.get() - Tension::MIN).unwrap_or_default();
    TABLE[tier.index()][column]
}

/// Rolls the question: clamps `tension` into range, draws once from
/// `0..=99` and maps the draw through the table.
pub fn compute_result(tier: OddsTier, tension: i32, rng: &mut dyn DeterministicRng) -> FortuneOutcome {
    let thresholds = thresholds(tier, Tension::clamped(tension));
    let roll = i32::try_from(rng.next_u32_range(0, 99)).unwrap_or(i32::MAX);
    thresholds.outcome(roll)
}
