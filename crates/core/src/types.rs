//! Shared types for binary prediction-market arbitrage calculations.
//!
//! These types are deliberately venue-agnostic: the calculation functions in
//! this crate never look at a clock, never log, and never touch I/O.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Venue Identifiers
// =============================================================================

/// Identifies which venue a level, leg, or fill belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Polymarket CLOB.
    Polymarket,
    /// Kalshi prediction market.
    Kalshi,
}

impl Venue {
    /// Returns the other venue.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Polymarket => Self::Kalshi,
            Self::Kalshi => Self::Polymarket,
        }
    }

    /// Returns the display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polymarket => "Polymarket",
            Self::Kalshi => "Kalshi",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Outcome Sides
// =============================================================================

/// One of the two complementary outcomes of a binary market.
///
/// In an efficient market YES and NO prices sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Returns the display string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a leg: take liquidity from the asks (buy) or the bids (sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Returns the display string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Order Book Levels
// =============================================================================

/// A single price level of an order book side.
///
/// The feed supplies levels already sorted best-first: bids descending by
/// price, asks ascending. Prices are strictly inside (0, 1). Neither
/// property is verified here; they are preconditions of the feed adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// Price per share in dollars, strictly inside (0, 1).
    pub price: Decimal,
    /// Shares available at this price.
    pub quantity: Decimal,
    /// Venue this level belongs to.
    pub venue: Venue,
}

impl OrderBookLevel {
    /// Creates a new level.
    #[must_use]
    pub fn new(price: Decimal, quantity: Decimal, venue: Venue) -> Self {
        Self {
            price,
            quantity,
            venue,
        }
    }
}

// =============================================================================
// Fill Simulation Result
// =============================================================================

/// Result of walking a book side to fill a target quantity.
///
/// A partial fill is a normal outcome, reported via
/// `filled_quantity < target`; there is no error path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    /// Volume-weighted average fill price (0 when nothing filled).
    pub avg_price: Decimal,
    /// Shares actually filled, never more than the target.
    pub filled_quantity: Decimal,
    /// Number of levels consumed (the last one possibly partially).
    pub levels_used: usize,
    /// Total dollars paid (or received, for a sell walk).
    pub total_cost: Decimal,
}

impl FillResult {
    /// The all-zero result for an empty book or zero target.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            avg_price: Decimal::ZERO,
            filled_quantity: Decimal::ZERO,
            levels_used: 0,
            total_cost: Decimal::ZERO,
        }
    }

    /// Returns true if nothing was filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filled_quantity == Decimal::ZERO
    }
}
