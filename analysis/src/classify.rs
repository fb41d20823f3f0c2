//! The hybrid centipawn-loss/positional-context move classifier.
//!
//! Reproduces the decision tree verbatim: cpl thresholds first, then
//! positional context when both evaluations are known, in the exact order
//! specified (first match wins).

use crate::types::MoveClassification;

/// Classify one move.
///
/// `cpl` is the centipawn loss (always known). `eval_before`/`eval_after`
/// are centipawn evaluations from the moving player's perspective; `None`
/// skips the positional branches but the cpl-only branches still apply.
pub fn classify(cpl: i32, eval_before: Option<i32>, eval_after: Option<i32>) -> MoveClassification {
    use MoveClassification::*;

    let abs_cpl = cpl.abs();

    if abs_cpl <= 10 {
        return Best;
    }
    if abs_cpl <= 25 {
        return Excellent;
    }
    if abs_cpl <= 50 {
        return Good;
    }

    if let (Some(before), Some(after)) = (eval_before, eval_after) {
        let b = before as f64 / 100.0;
        let a = after as f64 / 100.0;

        if b > 1.5 && a < -1.5 {
            return Blunder;
        }
        if b.abs() < 0.5 && a < -2.0 {
            return Blunder;
        }
        if (0.5..=1.5).contains(&b) && a < -2.0 {
            return Blunder;
        }
    }

    if abs_cpl >= 300 {
        return Blunder;
    }

    if let (Some(before), Some(after)) = (eval_before, eval_after) {
        let b = before as f64 / 100.0;
        let a = after as f64 / 100.0;

        if b > 2.0 && (-0.5..=0.5).contains(&a) {
            return Mistake;
        }
        if b > 2.5 && a > 0.5 && a < 1.5 {
            return Mistake;
        }
    }

    if (150..300).contains(&abs_cpl) {
        return Mistake;
    }

    if abs_cpl > 50 && abs_cpl < 150 {
        return match eval_after {
            Some(after) if (after as f64 / 100.0) > -1.0 => Inaccuracy,
            _ => Mistake,
        };
    }

    Good
}

#[cfg(test)]
mod tests {
    use super::*;
    use MoveClassification::*;

    #[test]
    fn s1_classification_thresholds() {
        assert_eq!(classify(5, None, None), Best);
        assert_eq!(classify(40, None, None), Good);
        assert_eq!(classify(80, Some(20), Some(100)), Inaccuracy);
        assert_eq!(classify(200, Some(260), Some(80)), Mistake);
        assert_eq!(classify(350, Some(0), Some(-350)), Blunder);
    }

    #[test]
    fn winning_to_losing_is_blunder_even_under_300() {
        assert_eq!(classify(60, Some(200), Some(-200)), Blunder);
    }

    #[test]
    fn equal_to_losing_is_blunder() {
        assert_eq!(classify(60, Some(10), Some(-250)), Blunder);
    }

    #[test]
    fn missing_evaluations_still_use_numeric_branches() {
        assert_eq!(classify(320, None, None), Blunder);
        assert_eq!(classify(200, None, None), Mistake);
    }

    #[test]
    fn inaccuracy_vs_mistake_boundary_on_eval_after() {
        assert_eq!(classify(100, Some(0), Some(-50)), Inaccuracy);
        assert_eq!(classify(100, Some(0), Some(-150)), Mistake);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The classifier is total: every combination of cpl and optional
        /// evaluations maps to exactly one tag, never panics.
        #[test]
        fn classify_is_total(
            cpl in -20_000i32..20_000,
            before in proptest::option::of(-20_000i32..20_000),
            after in proptest::option::of(-20_000i32..20_000),
        ) {
            let _ = classify(cpl, before, after);
        }

        /// Testable property: |cpl| <= 10 always yields `best`, regardless
        /// of the positional context — the cpl-only branch always wins
        /// first in the evaluation order.
        #[test]
        fn tiny_cpl_is_always_best(
            cpl in -10i32..=10,
            before in proptest::option::of(-20_000i32..20_000),
            after in proptest::option::of(-20_000i32..20_000),
        ) {
            prop_assert_eq!(classify(cpl, before, after), MoveClassification::Best);
        }

        /// `|cpl| >= 300` is always at least a blunder, whatever the
        /// (possibly missing) positional context says.
        #[test]
        fn huge_cpl_is_always_blunder(
            cpl in prop_oneof![300i32..20_000, -20_000i32..=-300],
            before in proptest::option::of(-20_000i32..20_000),
            after in proptest::option::of(-20_000i32..20_000),
        ) {
            prop_assert_eq!(classify(cpl, before, after), MoveClassification::Blunder);
        }
    }
}
