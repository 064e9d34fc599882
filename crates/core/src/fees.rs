//! Venue fee models.
//!
//! Two fee shapes exist in practice: a flat maker/taker rate on notional
//! (Kalshi-style), and a price-symmetric nonlinear curve that peaks at the
//! 0.5 mid price and vanishes toward 0 and 1 (Polymarket-style), where
//! makers pay nothing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Default flat taker rate (0.7% of notional).
pub const DEFAULT_FLAT_TAKER_RATE: Decimal = dec!(0.007);

/// Default flat maker rate (makers trade free by default).
pub const DEFAULT_FLAT_MAKER_RATE: Decimal = dec!(0);

/// Default base fee for the nonlinear curve.
pub const DEFAULT_NONLINEAR_BASE_FEE: Decimal = dec!(0.02);

/// Fee model for a single venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum VenueFees {
    /// Flat percentage of notional, split by maker/taker.
    Flat {
        maker_rate: Decimal,
        taker_rate: Decimal,
    },
    /// `fee_per_share = base_fee * discount * min(price, 1 - price)`.
    ///
    /// Symmetric around 0.5 and maximal there. Makers pay zero.
    Nonlinear { base_fee: Decimal, discount: Decimal },
}

impl VenueFees {
    /// Flat model with explicit maker and taker rates.
    #[must_use]
    pub fn flat(maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self::Flat {
            maker_rate,
            taker_rate,
        }
    }

    /// Nonlinear model with no discount applied.
    #[must_use]
    pub fn nonlinear(base_fee: Decimal) -> Self {
        Self::Nonlinear {
            base_fee,
            discount: Decimal::ONE,
        }
    }

    /// Nonlinear model with a discount multiplier on the base fee.
    #[must_use]
    pub fn nonlinear_with_discount(base_fee: Decimal, discount: Decimal) -> Self {
        Self::Nonlinear { base_fee, discount }
    }

    /// Fee charged per share at the given execution price, for a taker.
    ///
    /// For the flat model this is `price * taker_rate`; for the nonlinear
    /// model it is the symmetric curve value.
    #[must_use]
    pub fn fee_per_share(&self, price: Decimal) -> Decimal {
        match self {
            Self::Flat { taker_rate, .. } => price * taker_rate,
            Self::Nonlinear { base_fee, discount } => {
                base_fee * discount * price.min(Decimal::ONE - price)
            }
        }
    }

    /// Total fee for a fill of `quantity` shares at `price`.
    #[must_use]
    pub fn fee(&self, price: Decimal, quantity: Decimal, is_maker: bool) -> Decimal {
        match self {
            Self::Flat {
                maker_rate,
                taker_rate,
            } => {
                let rate = if is_maker { *maker_rate } else { *taker_rate };
                price * quantity * rate
            }
            Self::Nonlinear { .. } => {
                if is_maker {
                    Decimal::ZERO
                } else {
                    self.fee_per_share(price) * quantity
                }
            }
        }
    }

    /// Effective taker fee rate at a price, as a fraction of notional.
    ///
    /// Defined only for prices strictly inside (0, 1); 0 elsewhere.
    #[must_use]
    pub fn fee_rate(&self, price: Decimal) -> Decimal {
        if price <= Decimal::ZERO || price >= Decimal::ONE {
            return Decimal::ZERO;
        }
        self.fee_per_share(price) / price
    }
}
