//! Opportunity and leg types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pm_arb_core::{Action, RiskGate, Side, Venue};

/// The arbitrage strategy that produced an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbKind {
    /// YES ask + NO ask on one venue summing below $1.
    SameVenueBinary,
    /// YES on one venue + NO on the other summing below $1.
    CrossVenueBinary,
    /// Buy YES cheap on one venue, sell YES rich on the other.
    CrossVenueSameSideYes,
    /// Buy NO cheap on one venue, sell NO rich on the other.
    CrossVenueSameSideNo,
}

impl ArbKind {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SameVenueBinary => "same_venue_binary",
            Self::CrossVenueBinary => "cross_venue_binary",
            Self::CrossVenueSameSideYes => "cross_venue_same_side_yes",
            Self::CrossVenueSameSideNo => "cross_venue_same_side_no",
        }
    }
}

impl std::fmt::Display for ArbKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dedup key: at most one active opportunity exists per market pair and
/// `(kind, venue, side)`. The same shape on two different markets is two
/// independent opportunities.
pub type Signature = (String, ArbKind, Venue, Side);

/// One executed-on-paper side of an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageLeg {
    pub venue: Venue,
    pub market_id: String,
    pub side: Side,
    pub action: Action,
    /// Volume-weighted average price from the simulated fill.
    pub avg_fill_price: Decimal,
    /// Shares the book could actually supply, at most the sized target.
    pub filled_quantity: Decimal,
    /// Dollars paid (buy) or received (sell) for the fill.
    pub cost: Decimal,
    /// Venue fee for this leg.
    pub fees: Decimal,
    /// Book levels consumed by the fill.
    pub levels_consumed: usize,
}

/// A detected, profit-positive arbitrage opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    /// Detector-scoped monotonic id, stable across refreshes.
    pub id: String,
    pub kind: ArbKind,
    pub legs: [ArbitrageLeg; 2],
    /// Payout minus cost, before fees.
    pub gross_profit: Decimal,
    pub total_fees: Decimal,
    /// Gross profit minus fees.
    pub net_profit: Decimal,
    /// Net profit over total cost, as a fraction.
    pub profit_percentage: Decimal,
    /// `profit_percentage` expressed in percent.
    pub roi: Decimal,
    /// Matched quantity across both legs.
    pub max_quantity: Decimal,
    /// Capital outlay across buy legs.
    pub total_cost: Decimal,
    /// Expected proceeds if the position settles.
    pub estimated_payout: Decimal,
    /// Worst per-leg deviation from the quoted top of book.
    pub slippage: Decimal,
    /// Minimum of the two legs' depth scores.
    pub depth_score: u32,
    pub latency_risk: u32,
    pub detected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_executable: bool,
    /// First failing risk gate when not executable.
    pub reason: Option<RiskGate>,
}

impl ArbitrageOpportunity {
    /// Dedup signature: the first leg's market, plus the strategy kind and
    /// the first leg's venue and side.
    #[must_use]
    pub fn signature(&self) -> Signature {
        (
            self.legs[0].market_id.clone(),
            self.kind,
            self.legs[0].venue,
            self.legs[0].side,
        )
    }

    /// Returns true once `now` reaches the expiry timestamp.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
