//! Order book walking for fill simulation.
//!
//! [`simulate_fill`] consumes levels in the order given until a target size
//! is filled or the book is exhausted. Levels must already be sorted
//! best-first by the feed; this module does not verify ordering.

use rust_decimal::Decimal;

use crate::types::{FillResult, OrderBookLevel};

/// Walks `levels` in order, consuming quantity until `target_quantity` is
/// filled or the levels run out.
///
/// Returns the volume-weighted average price, the quantity actually filled,
/// the number of levels touched, and the total cost. An empty book or a
/// non-positive target produces the all-zero result.
///
/// # Example
///
/// ```
/// use pm_arb_core::{simulate_fill, OrderBookLevel, Venue};
/// use rust_decimal_macros::dec;
///
/// let asks = vec![
///     OrderBookLevel::new(dec!(0.50), dec!(10), Venue::Polymarket),
///     OrderBookLevel::new(dec!(0.60), dec!(10), Venue::Polymarket),
/// ];
/// let fill = simulate_fill(&asks, dec!(15));
/// assert_eq!(fill.filled_quantity, dec!(15));
/// assert_eq!(fill.total_cost, dec!(8.0));
/// assert_eq!(fill.levels_used, 2);
/// ```
#[must_use]
pub fn simulate_fill(levels: &[OrderBookLevel], target_quantity: Decimal) -> FillResult {
    if levels.is_empty() || target_quantity <= Decimal::ZERO {
        return FillResult::empty();
    }

    let mut filled = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    let mut levels_used = 0usize;

    for level in levels {
        if filled >= target_quantity {
            break;
        }
        let remaining = target_quantity - filled;
        let take = level.quantity.min(remaining);
        if take <= Decimal::ZERO {
            continue;
        }
        total_cost += take * level.price;
        filled += take;
        levels_used += 1;
    }

    let avg_price = if filled > Decimal::ZERO {
        total_cost / filled
    } else {
        Decimal::ZERO
    };

    FillResult {
        avg_price,
        filled_quantity: filled,
        levels_used,
        total_cost,
    }
}

/// Sums the quantity available at prices satisfying `price_limit`.
///
/// For the buy side a level qualifies while `price <= price_limit`; for the
/// sell side while `price >= price_limit`. The walk stops at the first
/// violating level, which is correct only for sorted input.
#[must_use]
pub fn available_quantity_at(
    levels: &[OrderBookLevel],
    price_limit: Decimal,
    is_buy_side: bool,
) -> Decimal {
    let mut total = Decimal::ZERO;
    for level in levels {
        let within = if is_buy_side {
            level.price <= price_limit
        } else {
            level.price >= price_limit
        };
        if !within {
            break;
        }
        total += level.quantity;
    }
    total
}

/// Relative deviation of an execution price from a reference mid price.
///
/// Returns 0 when the reference is 0.
#[must_use]
pub fn slippage(mid_price: Decimal, exec_price: Decimal) -> Decimal {
    if mid_price == Decimal::ZERO {
        return Decimal::ZERO;
    }
    (exec_price - mid_price).abs() / mid_price
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Venue;
    use rust_decimal_macros::dec;

    fn asks(levels: &[(Decimal, Decimal)]) -> Vec<OrderBookLevel> {
        levels
            .iter()
            .map(|(p, q)| OrderBookLevel::new(*p, *q, Venue::Polymarket))
            .collect()
    }

    // ==================== simulate_fill Tests ====================

    #[test]
    fn fill_spans_two_levels() {
        let levels = asks(&[(dec!(0.50), dec!(10)), (dec!(0.60), dec!(10))]);
        let fill = simulate_fill(&levels, dec!(15));

        assert_eq!(fill.filled_quantity, dec!(15));
        assert_eq!(fill.total_cost, dec!(8.0)); // 10 * 0.50 + 5 * 0.60
        assert_eq!(fill.levels_used, 2);
        // 8 / 15 = 0.5333...
        assert!((fill.avg_price - dec!(0.5333)).abs() < dec!(0.0001));
    }

    #[test]
    fn fill_single_level_exact() {
        let levels = asks(&[(dec!(0.45), dec!(20))]);
        let fill = simulate_fill(&levels, dec!(20));

        assert_eq!(fill.filled_quantity, dec!(20));
        assert_eq!(fill.avg_price, dec!(0.45));
        assert_eq!(fill.levels_used, 1);
    }

    #[test]
    fn fill_partial_when_book_exhausted() {
        let levels = asks(&[(dec!(0.50), dec!(10)), (dec!(0.55), dec!(5))]);
        let fill = simulate_fill(&levels, dec!(100));

        assert_eq!(fill.filled_quantity, dec!(15));
        assert_eq!(fill.total_cost, dec!(7.75));
        assert_eq!(fill.levels_used, 2);
    }

    #[test]
    fn fill_empty_book_is_zero() {
        let fill = simulate_fill(&[], dec!(10));
        assert!(fill.is_empty());
        assert_eq!(fill.avg_price, Decimal::ZERO);
    }

    #[test]
    fn fill_zero_target_is_zero() {
        let levels = asks(&[(dec!(0.50), dec!(10))]);
        assert!(simulate_fill(&levels, Decimal::ZERO).is_empty());
        assert!(simulate_fill(&levels, dec!(-5)).is_empty());
    }

    #[test]
    fn fill_skips_zero_quantity_levels() {
        let levels = asks(&[(dec!(0.50), Decimal::ZERO), (dec!(0.52), dec!(10))]);
        let fill = simulate_fill(&levels, dec!(10));

        assert_eq!(fill.filled_quantity, dec!(10));
        assert_eq!(fill.avg_price, dec!(0.52));
        assert_eq!(fill.levels_used, 1);
    }

    #[test]
    fn fill_never_exceeds_target() {
        let levels = asks(&[(dec!(0.50), dec!(1000))]);
        let fill = simulate_fill(&levels, dec!(7));
        assert_eq!(fill.filled_quantity, dec!(7));
        assert_eq!(fill.total_cost, dec!(3.50));
    }

    // ==================== available_quantity_at Tests ====================

    #[test]
    fn available_buy_side_respects_limit() {
        let levels = asks(&[
            (dec!(0.50), dec!(10)),
            (dec!(0.52), dec!(20)),
            (dec!(0.55), dec!(30)),
        ]);
        assert_eq!(available_quantity_at(&levels, dec!(0.52), true), dec!(30));
    }

    #[test]
    fn available_sell_side_respects_limit() {
        // Bids sorted descending.
        let levels = asks(&[
            (dec!(0.48), dec!(10)),
            (dec!(0.46), dec!(20)),
            (dec!(0.44), dec!(30)),
        ]);
        assert_eq!(available_quantity_at(&levels, dec!(0.46), false), dec!(30));
    }

    #[test]
    fn available_stops_at_first_violation() {
        // Unsorted input: the level behind the violation is never counted.
        let levels = asks(&[
            (dec!(0.50), dec!(10)),
            (dec!(0.60), dec!(20)),
            (dec!(0.50), dec!(30)),
        ]);
        assert_eq!(available_quantity_at(&levels, dec!(0.55), true), dec!(10));
    }

    #[test]
    fn available_empty_book_is_zero() {
        assert_eq!(available_quantity_at(&[], dec!(0.50), true), Decimal::ZERO);
    }

    // ==================== slippage Tests ====================

    #[test]
    fn slippage_basic() {
        assert_eq!(slippage(dec!(0.50), dec!(0.55)), dec!(0.10));
    }

    #[test]
    fn slippage_is_symmetric() {
        assert_eq!(slippage(dec!(0.50), dec!(0.45)), dec!(0.10));
    }

    #[test]
    fn slippage_zero_mid_is_zero() {
        assert_eq!(slippage(Decimal::ZERO, dec!(0.55)), Decimal::ZERO);
    }

    #[test]
    fn slippage_exact_fill_is_zero() {
        assert_eq!(slippage(dec!(0.42), dec!(0.42)), Decimal::ZERO);
    }
}
