//! Majority arithmetic.

/// Number of yes votes a proposal must exceed.
#[must_use]
pub fn threshold(participants: usize) -> usize {
    participants / 2
}

/// Returns `true` once `yes` is a strict majority of `participants`.
#[must_use]
pub fn is_approved(yes: usize, participants: usize) -> bool {
    yes.saturating_mul(2) > participants
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_single_participant_passes_alone() {
        assert!(is_approved(1, 1));
    }

    #[test]
    fn test_two_participants_need_both() {
        assert!(!is_approved(1, 2));
        assert!(is_approved(2, 2));
    }

    #[test]
    fn test_three_participants_need_two() {
        assert!(!is_approved(1, 3));
        assert!(is_approved(2, 3));
        assert_eq!(threshold(3), 1);
    }

    #[test]
    fn test_no_votes_never_pass() {
        assert!(!is_approved(0, 0));
        assert!(!is_approved(0, 4));
    }

    proptest! {
        #[test]
        fn prop_approval_matches_threshold(
            (n, yes) in (1usize..64).prop_flat_map(|n| (Just(n), 0..=n))
        ) {
            prop_assert_eq!(is_approved(yes, n), yes > threshold(n));
        }
    }
}
