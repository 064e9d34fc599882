//! Position sizing: Kelly criterion and liquidity/risk-bounded sizing.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Default Kelly fraction (quarter Kelly).
pub const DEFAULT_KELLY_FRACTION: Decimal = dec!(0.25);

/// Fractional Kelly bet size for a binary payoff.
///
/// With `b = win_payoff / loss_portion`, the full Kelly bet is
/// `(b * p - (1 - p)) / b`; the result is `max(0, kelly * kelly_fraction)`.
/// Returns 0 when `win_prob <= 0` or `win_payoff <= 0`.
///
/// # Example
///
/// ```
/// use pm_arb_core::kelly_size;
/// use rust_decimal_macros::dec;
///
/// let size = kelly_size(dec!(0.6), dec!(1), dec!(1), dec!(0.25));
/// assert_eq!(size, dec!(0.05));
/// ```
#[must_use]
pub fn kelly_size(
    win_prob: Decimal,
    win_payoff: Decimal,
    loss_portion: Decimal,
    kelly_fraction: Decimal,
) -> Decimal {
    if win_prob <= Decimal::ZERO || win_payoff <= Decimal::ZERO || loss_portion <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let b = win_payoff / loss_portion;
    let kelly_bet = (b * win_prob - (Decimal::ONE - win_prob)) / b;
    (kelly_bet * kelly_fraction).max(Decimal::ZERO)
}

/// Quarter-Kelly size with even loss exposure.
#[must_use]
pub fn quarter_kelly(win_prob: Decimal, win_payoff: Decimal) -> Decimal {
    kelly_size(win_prob, win_payoff, Decimal::ONE, DEFAULT_KELLY_FRACTION)
}

/// Position size bounded by available liquidity and scaled by risk.
///
/// Starts from `min(available_liquidity, max_size)`, scales down by the
/// risk score (never below a 0.1 floor), boosts by 1.2 when the profit
/// percentage clears 2%, and returns 0 when the result falls below
/// `min_size`. The returned size is rounded to two decimals.
#[must_use]
pub fn size_by_liquidity_and_risk(
    available_liquidity: Decimal,
    max_size: Decimal,
    min_size: Decimal,
    profit_percent: Decimal,
    risk_score: u32,
) -> Decimal {
    let mut size = available_liquidity.min(max_size);

    let risk_multiplier =
        (Decimal::ONE - Decimal::from(risk_score) / dec!(100)).max(dec!(0.1));
    size *= risk_multiplier;

    if profit_percent > dec!(0.02) {
        size *= dec!(1.2);
    }

    if size < min_size {
        return Decimal::ZERO;
    }
    size.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
