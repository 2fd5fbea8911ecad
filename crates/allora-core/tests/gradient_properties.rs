// crates/allora-core/tests/gradient_properties.rs
//
// Property tests for the regret-to-weight gradient and the decimal helpers.

use allora_core::math::{ema, gradient, quantile_of_descending};
use allora_core::Decimal;
use proptest::prelude::*;

/// Decimal in [lo, hi] with three fractional digits.
fn decimal_in(lo: i64, hi: i64) -> impl Strategy<Value = Decimal> {
    (lo * 1000..=hi * 1000).prop_map(|milli| Decimal::new(milli, 3))
}

proptest! {
    /// Property: the gradient is finite and non-negative on the working domain.
    #[test]
    fn prop_gradient_well_defined(p in decimal_in(1, 10), x in decimal_in(0, 10)) {
        let g = gradient(p, x);
        prop_assert!(g.is_ok(), "gradient({}, {}) failed: {:?}", p, x, g);
        prop_assert!(g.unwrap() >= Decimal::ZERO);
    }

    /// Property: the gradient is non-decreasing in x for x >= 0.
    #[test]
    fn prop_gradient_monotonic(p in decimal_in(1, 10), x in decimal_in(0, 8), step in decimal_in(0, 2)) {
        let step = step + Decimal::new(1, 1);
        let lo = gradient(p, x).unwrap();
        let hi = gradient(p, x + step).unwrap();
        prop_assert!(hi >= lo, "gradient({}, {}) = {} > gradient({}, {}) = {}", p, x, lo, p, x + step, hi);
    }

    /// Property: negative arguments with fractional exponents never fail,
    /// and stay between zero and the value at the origin.
    #[test]
    fn prop_gradient_negative_domain(p in decimal_in(1, 10), x in decimal_in(-60, 0)) {
        let g = gradient(p, x);
        prop_assert!(g.is_ok(), "gradient({}, {}) failed: {:?}", p, x, g);
        let g = g.unwrap();
        let at_origin = gradient(p, Decimal::ZERO).unwrap();
        prop_assert!(g >= Decimal::ZERO && g <= at_origin, "gradient({}, {}) = {}", p, x, g);
    }

    /// Property: an EMA stays between its two inputs.
    #[test]
    fn prop_ema_is_convex_combination(
        alpha in (0i64..=1000).prop_map(|m| Decimal::new(m, 3)),
        current in decimal_in(-50, 50),
        previous in decimal_in(-50, 50),
    ) {
        let v = ema(alpha, current, previous).unwrap();
        let (lo, hi) = if current < previous { (current, previous) } else { (previous, current) };
        prop_assert!(v >= lo && v <= hi);
    }

    /// Property: an interpolated quantile lies within the score range.
    #[test]
    fn prop_quantile_within_range(
        mut scores in prop::collection::vec(decimal_in(-5, 5), 1..20),
        q in (0i64..=100).prop_map(|c| Decimal::new(c, 2)),
    ) {
        scores.sort_by(|a, b| b.cmp(a));
        let v = quantile_of_descending(&scores, q).unwrap();
        prop_assert!(v <= scores[0] && v >= scores[scores.len() - 1]);
    }
}
