//! Composite depth scoring for order book liquidity.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::types::OrderBookLevel;

/// Scores liquidity quality for filling `target_quantity`, from 0 to 100.
///
/// Walks levels until the cumulative quantity covers the target, then sums
/// three independently capped terms:
///
/// - fillability: `min(50, cumulative / target * 50)`
/// - tightness: `max(0, 30 - max_deviation_from_first_level * 300)`
/// - breadth: `min(20, levels_seen * 2)`
///
/// An empty book or non-positive target scores 0.
#[must_use]
pub fn depth_score(levels: &[OrderBookLevel], target_quantity: Decimal) -> u32 {
    if levels.is_empty() || target_quantity <= Decimal::ZERO {
        return 0;
    }

    let first_price = levels[0].price;
    let mut cumulative = Decimal::ZERO;
    let mut max_deviation = Decimal::ZERO;
    let mut levels_seen = 0u32;

    for level in levels {
        levels_seen += 1;
        cumulative += level.quantity;
        let deviation = (level.price - first_price).abs();
        if deviation > max_deviation {
            max_deviation = deviation;
        }
        if cumulative >= target_quantity {
            break;
        }
    }

    let fillability = (cumulative / target_quantity * dec!(50)).min(dec!(50));
    let tightness = (dec!(30) - max_deviation * dec!(300)).max(Decimal::ZERO);
    let breadth = (Decimal::from(levels_seen) * dec!(2)).min(dec!(20));

    (fillability + tightness + breadth)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}
