//! Plurality decisions and tie-breaks.

use std::collections::BTreeMap;

use loom_core::model::TieBreakingMethod;
use loom_core::rng::DeterministicRng;

/// Picks the tension delta with the most votes: yes escalates (+1),
/// suggest-modification holds (0), no eases (−1). A tie, or no votes at
/// all, falls back to `ai_delta`. The result is not clamped.
#[must_use]
pub fn resolve_tension_vote(yes: usize, suggest: usize, no: usize, ai_delta: i32) -> i32 {
    let counts = [(1, yes), (0, suggest), (-1, no)];
    let top = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
    if top == 0 {
        return ai_delta;
    }
    let mut leaders = counts.iter().filter(|(_, count)| *count == top);
    match (leaders.next(), leaders.next()) {
        (Some((delta, _)), None) => *delta,
        _ => ai_delta,
    }
}

/// Chooses the winning interpretation index among `votes` (−1 is a custom
/// text). Returns `None` if nobody voted.
///
/// A single leader always wins. Tied leaders are sorted ascending and one
/// is drawn uniformly, whatever the method.
pub fn oracle_tie_break(
    votes: impl IntoIterator<Item = i32>,
    _method: TieBreakingMethod,
    rng: &mut dyn DeterministicRng,
) -> Option<i32> {
    let mut tally: BTreeMap<i32, usize> = BTreeMap::new();
    for index in votes {
        *tally.entry(index).or_default() += 1;
    }
    let top = tally.values().copied().max()?;
    let tied: Vec<i32> = tally
        .into_iter()
        .filter(|(_, count)| *count == top)
        .map(|(index, _)| index)
        .collect();
    if let [winner] = tied.as_slice() {
        return Some(*winner);
    }

    let last = u32::try_from(tied.len() - 1).unwrap_or(u32::MAX);
    let pick = rng.next_u32_range(0, last) as usize;
    tied.get(pick).copied().or_else(|| tied.first().copied())
}
