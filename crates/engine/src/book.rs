//! Per-venue and per-pair order book state.
//!
//! The feed pushes YES (and optionally NO) snapshots. When NO levels are
//! absent they are derived from YES via the price complement: buying YES at
//! `p` and selling NO at `1 - p` are economically equivalent, so a YES bid
//! becomes a NO ask and a YES ask becomes a NO bid. The mapping preserves
//! best-first ordering on both sides.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pm_arb_core::{Action, OrderBookLevel, Side, Venue};

/// Raw `(price, quantity)` levels for one token, already sorted best-first
/// by the feed (bids descending, asks ascending).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

impl BookSnapshot {
    /// Creates a snapshot from sorted levels.
    #[must_use]
    pub fn new(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> Self {
        Self { bids, asks }
    }
}

/// Both outcome books of one venue for one market pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueBook {
    pub yes_bids: Vec<OrderBookLevel>,
    pub yes_asks: Vec<OrderBookLevel>,
    pub no_bids: Vec<OrderBookLevel>,
    pub no_asks: Vec<OrderBookLevel>,
    pub last_update: DateTime<Utc>,
}

impl VenueBook {
    /// Builds a venue book from feed snapshots, deriving the NO side from
    /// YES when the feed does not supply it.
    #[must_use]
    pub fn from_snapshots(
        venue: Venue,
        yes: &BookSnapshot,
        no: Option<&BookSnapshot>,
        now: DateTime<Utc>,
    ) -> Self {
        let yes_bids = to_levels(&yes.bids, venue);
        let yes_asks = to_levels(&yes.asks, venue);

        let (no_bids, no_asks) = match no {
            Some(no) => (to_levels(&no.bids, venue), to_levels(&no.asks, venue)),
            None => derive_complement(&yes_bids, &yes_asks),
        };

        Self {
            yes_bids,
            yes_asks,
            no_bids,
            no_asks,
            last_update: now,
        }
    }

    /// Levels consumed by a leg on `side` with `action`.
    #[must_use]
    pub fn levels(&self, side: Side, action: Action) -> &[OrderBookLevel] {
        match (side, action) {
            (Side::Yes, Action::Buy) => &self.yes_asks,
            (Side::Yes, Action::Sell) => &self.yes_bids,
            (Side::No, Action::Buy) => &self.no_asks,
            (Side::No, Action::Sell) => &self.no_bids,
        }
    }

    /// Best (first) level for a side/action, if any.
    #[must_use]
    pub fn best(&self, side: Side, action: Action) -> Option<&OrderBookLevel> {
        self.levels(side, action).first()
    }

    /// Book age relative to `now`, in milliseconds (clamped at zero).
    #[must_use]
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_update).num_milliseconds().max(0)
    }
}

/// All venue books for one tracked market pair.
///
/// Entries are created on first update and mutated in place; they are never
/// deleted for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct MarketBook {
    books: HashMap<Venue, VenueBook>,
}

impl MarketBook {
    /// Creates an empty pair entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces one venue's book.
    pub fn insert(&mut self, venue: Venue, book: VenueBook) {
        self.books.insert(venue, book);
    }

    /// Returns one venue's book, if seen.
    #[must_use]
    pub fn venue(&self, venue: Venue) -> Option<&VenueBook> {
        self.books.get(&venue)
    }

    /// Venues with a stored book.
    pub fn venues(&self) -> impl Iterator<Item = Venue> + '_ {
        self.books.keys().copied()
    }
}

fn to_levels(raw: &[(Decimal, Decimal)], venue: Venue) -> Vec<OrderBookLevel> {
    raw.iter()
        .map(|(price, quantity)| OrderBookLevel::new(*price, *quantity, venue))
        .collect()
}

/// Derives `(no_bids, no_asks)` from YES levels via `p -> 1 - p`.
///
/// YES asks (ascending) map to NO bids (descending) and YES bids
/// (descending) map to NO asks (ascending), so sortedness is preserved.
#[must_use]
pub fn derive_complement(
    yes_bids: &[OrderBookLevel],
    yes_asks: &[OrderBookLevel],
) -> (Vec<OrderBookLevel>, Vec<OrderBookLevel>) {
    let flip = |levels: &[OrderBookLevel]| {
        levels
            .iter()
            .map(|l| OrderBookLevel::new(Decimal::ONE - l.price, l.quantity, l.venue))
            .collect::<Vec<_>>()
    };
    (flip(yes_asks), flip(yes_bids))
}
