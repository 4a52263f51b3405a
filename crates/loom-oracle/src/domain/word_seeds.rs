//! Built-in word seed tables.

use loom_core::model::WordPair;
use loom_core::rng::DeterministicRng;

/// A themed list of action and descriptor words.
#[derive(Debug)]
pub struct WordSeedTable {
    /// Theme name.
    pub category: &'static str,
    /// Verbs.
    pub actions: &'static [&'static str],
    /// Nouns and adjectives.
    pub descriptors: &'static [&'static str],
}

/// Tables every game draws from.
pub static BUILTIN_TABLES: [WordSeedTable; 5] = [
    WordSeedTable {
        category: "general",
        actions: &[
            "abandon", "betray", "claim", "deceive", "destroy", "empower", "expose", "flee",
            "forge", "hide", "protect", "reclaim", "reveal", "sacrifice", "surrender",
            "transform", "unite", "unravel",
        ],
        descriptors: &[
            "ancient", "authority", "desire", "dreams", "forgotten", "identity", "justice",
            "legacy", "light", "loyalty", "memory", "power", "shadow", "silence", "truth",
            "trust", "weakness",
        ],
    },
    WordSeedTable {
        category: "fantasy",
        actions: &[
            "banish", "commune", "conjure", "curse", "enchant", "invoke", "quest", "shatter",
            "summon", "traverse",
        ],
        descriptors: &[
            "arcane", "ancient", "blessed", "cursed", "fey", "mystical", "omen", "prophecy",
            "ritual", "sacred",
        ],
    },
    WordSeedTable {
        category: "sci-fi",
        actions: &[
            "calculate", "escape", "hack", "override", "replicate", "scan", "transmit", "upload",
        ],
        descriptors: &[
            "alien", "digital", "encrypted", "neural", "protocol", "quantum", "synthetic", "void",
        ],
    },
    WordSeedTable {
        category: "horror",
        actions: &["consume", "corrupt", "escape", "haunt", "hunt", "unbury", "witness"],
        descriptors: &[
            "abyssal", "creeping", "profane", "rotten", "twisted", "visceral", "wretched",
        ],
    },
    WordSeedTable {
        category: "noir",
        actions: &[
            "blackmail", "double-cross", "investigate", "obsess", "pursue", "seduce", "silence",
        ],
        descriptors: &[
            "corrupt", "desperate", "gritty", "obsessed", "shadowed", "smoky", "tarnished",
        ],
    },
];

fn pick<'a>(words: &[&'a str], rng: &mut dyn DeterministicRng) -> &'a str {
    let last = u32::try_from(words.len().saturating_sub(1)).unwrap_or(u32::MAX);
    let index = usize::try_from(rng.next_u32_range(0, last)).unwrap_or_default();
    words.get(index).or_else(|| words.first()).copied().unwrap_or_default()
}

/// Draws an action and a descriptor from `tables`, each uniformly over the
/// words of every table.
pub fn random_pair(tables: &[WordSeedTable], rng: &mut dyn DeterministicRng) -> WordPair {
    let actions: Vec<&str> = tables.iter().flat_map(|t| t.actions.iter().copied()).collect();
    let descriptors: Vec<&str> = tables
        .iter()
        .flat_map(|t| t.descriptors.iter().copied())
        .collect();
    let action = pick(&actions, rng);
    let descriptor = pick(&descriptors, rng);
    WordPair {
        action: action.to_owned(),
        descriptor: descriptor.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use loom_test_support::{MockRng, SequenceRng};

    use super::*;

    #[test]
    fn test_first_draw_is_first_word() {
        let pair = random_pair(&BUILTIN_TABLES, &mut MockRng);
        assert_eq!(pair.action, "abandon");
        assert_eq!(pair.descriptor, "ancient");
    }

    #[test]
    fn test_draws_span_every_table() {
        // 18 general + 10 fantasy + 8 sci-fi + 7 horror actions precede noir.
        let mut rng = SequenceRng::new(vec![43, 0]);
        let pair = random_pair(&BUILTIN_TABLES, &mut rng);
        assert_eq!(pair.action, "blackmail");
    }

    #[test]
    fn test_every_table_has_words() {
        for table in &BUILTIN_TABLES {
            assert!(!table.actions.is_empty(), "{}", table.category);
            assert!(!table.descriptors.is_empty(), "{}", table.category);
        }
    }
}
