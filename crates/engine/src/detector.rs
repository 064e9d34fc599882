//! The opportunity detector: book ingestion, strategy evaluation, and the
//! opportunity lifecycle.
//!
//! Every book update triggers one detection pass over the affected pair.
//! A pass evaluates up to five candidates (same-venue on each venue,
//! cross-venue binary, and cross-venue same-side for YES and NO), registers
//! the qualifying ones, and sweeps expired entries. Events are collected
//! during the pass and emitted only after the state lock is released, so
//! subscribers may call back into the detector's read accessors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use pm_arb_core::{
    depth_score, execution_risk, latency_risk, simulate_fill, size_by_liquidity_and_risk,
    slippage, Action, FillResult, RiskGate, Side, Venue,
};

use crate::book::{BookSnapshot, MarketBook, VenueBook};
use crate::clock::{Clock, SystemClock};
use crate::config::{ArbitrageConfig, ConfigError};
use crate::events::{ArbEvent, EventBus, ListenerHandle};
use crate::opportunity::{ArbKind, ArbitrageLeg, ArbitrageOpportunity};
use crate::registry::{OpportunityRegistry, UpsertOutcome};

// =============================================================================
// Detector
// =============================================================================

/// Book state and the opportunity registry, guarded together: a detection
/// pass reads books and mutates the registry under one write lock.
#[derive(Debug, Default)]
struct DetectorState {
    books: HashMap<String, MarketBook>,
    registry: OpportunityRegistry,
}

/// Counters and registry summary returned by [`OpportunityDetector::get_stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub tracked_pairs: usize,
    pub active_opportunities: usize,
    pub executable_opportunities: usize,
    pub detection_passes: u64,
    pub opportunities_detected: u64,
    pub opportunities_expired: u64,
    pub opportunities_executed: u64,
    pub best_net_profit: Option<Decimal>,
}

/// Cross-venue arbitrage detector for binary prediction markets.
///
/// Thread-safe: `&self` everywhere, one `RwLock` over the mutable state.
/// Listener callbacks run on the updating thread, after the lock is
/// dropped.
pub struct OpportunityDetector {
    config: ArbitrageConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<DetectorState>,
    events: EventBus,
    next_id: AtomicU64,
    passes: AtomicU64,
    detected_total: AtomicU64,
    expired_total: AtomicU64,
    executed_total: AtomicU64,
}

impl Default for OpportunityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl OpportunityDetector {
    /// Creates a detector with the default configuration and wall-clock
    /// time.
    #[must_use]
    pub fn new() -> Self {
        Self::build(ArbitrageConfig::default(), Arc::new(SystemClock))
    }

    /// Creates a detector with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration invariant the config violates.
    pub fn with_config(config: ArbitrageConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_clock(config, Arc::new(SystemClock))
    }

    /// Like [`with_config`](Self::with_config), with an injected time
    /// source. Tests pass a [`crate::ManualClock`] to drive expiry and
    /// staleness deterministically.
    ///
    /// # Errors
    ///
    /// Returns the first configuration invariant the config violates.
    pub fn with_config_and_clock(
        config: ArbitrageConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: ArbitrageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: RwLock::new(DetectorState::default()),
            events: EventBus::new(),
            next_id: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            detected_total: AtomicU64::new(0),
            expired_total: AtomicU64::new(0),
            executed_total: AtomicU64::new(0),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ArbitrageConfig {
        &self.config
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Stores one venue's book for a pair and runs a detection pass.
    ///
    /// When `no` is absent the NO book is derived from the YES levels via
    /// the price complement. Lifecycle events fire before the closing
    /// `market_update`.
    pub fn update_market_book(
        &self,
        pair_id: &str,
        venue: Venue,
        yes: &BookSnapshot,
        no: Option<&BookSnapshot>,
    ) {
        let now = self.clock.now();
        let mut events = Vec::new();
        {
            let mut state = self.state.write();
            let book = VenueBook::from_snapshots(venue, yes, no, now);
            state
                .books
                .entry(pair_id.to_string())
                .or_default()
                .insert(venue, book);
            self.run_detection(&mut state, pair_id, now, &mut events);
        }

        events.push(ArbEvent::MarketUpdate {
            pair_id: pair_id.to_string(),
            venue,
        });
        for event in &events {
            self.events.emit(event);
        }
    }

    /// Runs a detection pass over one pair's stored books and returns the
    /// opportunities registered by it (refreshed entries included).
    ///
    /// Expired entries are swept even when the pair is unknown.
    pub fn detect_arbitrage(&self, pair_id: &str) -> Vec<ArbitrageOpportunity> {
        let now = self.clock.now();
        let mut events = Vec::new();
        let registered = {
            let mut state = self.state.write();
            self.run_detection(&mut state, pair_id, now, &mut events)
        };

        for event in &events {
            self.events.emit(event);
        }
        registered
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All registered opportunities, in no particular order.
    #[must_use]
    pub fn get_active_opportunities(&self) -> Vec<ArbitrageOpportunity> {
        self.state.read().registry.active()
    }

    /// The executable opportunity with the highest net profit, if any.
    #[must_use]
    pub fn get_best_opportunity(&self) -> Option<ArbitrageOpportunity> {
        self.state.read().registry.best_executable().cloned()
    }

    /// Removes an opportunity that was acted upon and emits
    /// `opportunity_executed`. Returns `None` for an unknown or already
    /// removed id.
    pub fn mark_executed(&self, id: &str) -> Option<ArbitrageOpportunity> {
        let removed = self.state.write().registry.remove(id);
        if let Some(opp) = &removed {
            self.executed_total.fetch_add(1, Ordering::Relaxed);
            info!(id, kind = %opp.kind, net_profit = %opp.net_profit, "opportunity executed");
            self.events.emit(&ArbEvent::OpportunityExecuted(opp.clone()));
        }
        removed
    }

    /// Counters and registry summary.
    #[must_use]
    pub fn get_stats(&self) -> DetectorStats {
        let state = self.state.read();
        DetectorStats {
            tracked_pairs: state.books.len(),
            active_opportunities: state.registry.len(),
            executable_opportunities: state.registry.executable_count(),
            detection_passes: self.passes.load(Ordering::Relaxed),
            opportunities_detected: self.detected_total.load(Ordering::Relaxed),
            opportunities_expired: self.expired_total.load(Ordering::Relaxed),
            opportunities_executed: self.executed_total.load(Ordering::Relaxed),
            best_net_profit: state.registry.best_net_profit(),
        }
    }

    /// Subscribes a listener to lifecycle events.
    pub fn on_event(
        &self,
        callback: impl Fn(&ArbEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.events.subscribe(Arc::new(callback))
    }

    /// Unsubscribes a listener. Returns false for an unknown handle.
    pub fn off_event(&self, handle: ListenerHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    // =========================================================================
    // Detection pass
    // =========================================================================

    fn run_detection(
        &self,
        state: &mut DetectorState,
        pair_id: &str,
        now: DateTime<Utc>,
        events: &mut Vec<ArbEvent>,
    ) -> Vec<ArbitrageOpportunity> {
        self.passes.fetch_add(1, Ordering::Relaxed);

        let mut candidates = Vec::new();
        if let Some(market) = state.books.get(pair_id) {
            for venue in [Venue::Polymarket, Venue::Kalshi] {
                if let Some(book) = market.venue(venue) {
                    candidates.extend(self.same_venue_binary(pair_id, venue, book, now));
                }
            }
            if let (Some(polymarket), Some(kalshi)) = (
                market.venue(Venue::Polymarket),
                market.venue(Venue::Kalshi),
            ) {
                candidates.extend(self.cross_venue_binary(pair_id, polymarket, kalshi, now));
                for side in [Side::Yes, Side::No] {
                    candidates.extend(
                        self.cross_venue_same_side(pair_id, side, polymarket, kalshi, now),
                    );
                }
            }
        }

        let mut registered = Vec::new();
        for candidate in candidates {
            if !candidate.is_executable || candidate.net_profit <= Decimal::ZERO {
                debug!(
                    pair_id,
                    kind = %candidate.kind,
                    reason = candidate.reason.map(RiskGate::as_str),
                    "candidate rejected"
                );
                continue;
            }

            let signature = candidate.signature();
            let outcome = state.registry.upsert(candidate, || self.allocate_id());
            if let Some(stored) = state.registry.get_by_signature(&signature) {
                if outcome == UpsertOutcome::Inserted {
                    self.detected_total.fetch_add(1, Ordering::Relaxed);
                    info!(
                        pair_id,
                        id = %stored.id,
                        kind = %stored.kind,
                        net_profit = %stored.net_profit,
                        "arbitrage opportunity detected"
                    );
                    events.push(ArbEvent::OpportunityDetected(stored.clone()));
                } else {
                    debug!(pair_id, id = %stored.id, "opportunity refreshed");
                }
                registered.push(stored.clone());
            }
        }

        for expired in state.registry.sweep(now) {
            self.expired_total.fetch_add(1, Ordering::Relaxed);
            debug!(id = %expired.id, kind = %expired.kind, "opportunity expired");
            events.push(ArbEvent::OpportunityExpired(expired));
        }

        registered
    }

    fn allocate_id(&self) -> String {
        format!("opp-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    // =========================================================================
    // Strategies
    // =========================================================================

    /// YES ask + NO ask on one venue summing below $1.
    fn same_venue_binary(
        &self,
        pair_id: &str,
        venue: Venue,
        book: &VenueBook,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        let yes_ask = book.best(Side::Yes, Action::Buy)?;
        let no_ask = book.best(Side::No, Action::Buy)?;
        let top_cost = yes_ask.price + no_ask.price;
        if top_cost >= Decimal::ONE {
            trace!(pair_id, venue = %venue, %top_cost, "no same-venue spread");
            return None;
        }

        let spread_percent = (Decimal::ONE - top_cost) / top_cost;
        let size = self.sized(yes_ask.quantity.min(no_ask.quantity), spread_percent)?;

        let first = leg(venue, book, Side::Yes, Action::Buy, yes_ask.price, size);
        let second = leg(venue, book, Side::No, Action::Buy, no_ask.price, size);
        self.build_candidate(
            pair_id,
            ArbKind::SameVenueBinary,
            first,
            second,
            book.age_ms(now),
            now,
        )
    }

    /// YES on one venue + NO on the other summing below $1.
    ///
    /// Both pairings are priced and the strictly better positive one wins.
    /// A tie means neither direction dominates, so nothing is reported.
    fn cross_venue_binary(
        &self,
        pair_id: &str,
        polymarket: &VenueBook,
        kalshi: &VenueBook,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        let quote = |book: &VenueBook, side: Side| {
            book.best(side, Action::Buy).map(|l| (l.price, l.quantity))
        };
        let pairing = |yes: Option<(Decimal, Decimal)>, no: Option<(Decimal, Decimal)>| {
            match (yes, no) {
                (Some(y), Some(n)) => Some((Decimal::ONE - (y.0 + n.0), y, n)),
                _ => None,
            }
        };

        // Pairing A buys YES on Polymarket, pairing B buys YES on Kalshi.
        let pairing_a = pairing(quote(polymarket, Side::Yes), quote(kalshi, Side::No));
        let pairing_b = pairing(quote(kalshi, Side::Yes), quote(polymarket, Side::No));

        let (chosen, yes_on_polymarket) = match (pairing_a, pairing_b) {
            (Some(a), Some(b)) if a.0 > b.0 && a.0 > Decimal::ZERO => (a, true),
            (Some(a), Some(b)) if b.0 > a.0 && b.0 > Decimal::ZERO => (b, false),
            (Some(a), None) if a.0 > Decimal::ZERO => (a, true),
            (None, Some(b)) if b.0 > Decimal::ZERO => (b, false),
            _ => {
                trace!(pair_id, "no cross-venue binary spread");
                return None;
            }
        };
        let (spread, (yes_price, yes_quantity), (no_price, no_quantity)) = chosen;
        let (yes_venue, yes_book, no_venue, no_book) = if yes_on_polymarket {
            (Venue::Polymarket, polymarket, Venue::Kalshi, kalshi)
        } else {
            (Venue::Kalshi, kalshi, Venue::Polymarket, polymarket)
        };

        let spread_percent = spread / (yes_price + no_price);
        let size = self.sized(yes_quantity.min(no_quantity), spread_percent)?;

        let first = leg(yes_venue, yes_book, Side::Yes, Action::Buy, yes_price, size);
        let second = leg(no_venue, no_book, Side::No, Action::Buy, no_price, size);
        let age_ms = yes_book.age_ms(now).max(no_book.age_ms(now));
        self.build_candidate(pair_id, ArbKind::CrossVenueBinary, first, second, age_ms, now)
    }

    /// Buy one outcome cheap on one venue, sell it rich on the other.
    ///
    /// Runs once per side. Of the two directions the larger positive
    /// spread wins; an exact tie resolves to buying on Kalshi.
    fn cross_venue_same_side(
        &self,
        pair_id: &str,
        side: Side,
        polymarket: &VenueBook,
        kalshi: &VenueBook,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        let quote = |book: &VenueBook, action: Action| {
            book.best(side, action).map(|l| (l.price, l.quantity))
        };
        let direction = |buy: Option<(Decimal, Decimal)>, sell: Option<(Decimal, Decimal)>| {
            match (buy, sell) {
                (Some(ask), Some(bid)) => Some((bid.0 - ask.0, ask, bid)),
                _ => None,
            }
        };

        let buy_polymarket = direction(
            quote(polymarket, Action::Buy),
            quote(kalshi, Action::Sell),
        );
        let buy_kalshi = direction(quote(kalshi, Action::Buy), quote(polymarket, Action::Sell));

        let (chosen, buy_on_polymarket) = match (buy_polymarket, buy_kalshi) {
            (Some(a), Some(b)) if a.0 > b.0 && a.0 > Decimal::ZERO => (a, true),
            (_, Some(b)) if b.0 > Decimal::ZERO => (b, false),
            (Some(a), None) if a.0 > Decimal::ZERO => (a, true),
            _ => {
                trace!(pair_id, side = %side, "no same-side spread");
                return None;
            }
        };
        let (spread, (ask_price, ask_quantity), (bid_price, bid_quantity)) = chosen;
        let (buy_venue, buy_book, sell_venue, sell_book) = if buy_on_polymarket {
            (Venue::Polymarket, polymarket, Venue::Kalshi, kalshi)
        } else {
            (Venue::Kalshi, kalshi, Venue::Polymarket, polymarket)
        };

        let spread_percent = spread / ask_price;
        let size = self.sized(ask_quantity.min(bid_quantity), spread_percent)?;

        let first = leg(buy_venue, buy_book, side, Action::Buy, ask_price, size);
        let second = leg(sell_venue, sell_book, side, Action::Sell, bid_price, size);
        let kind = match side {
            Side::Yes => ArbKind::CrossVenueSameSideYes,
            Side::No => ArbKind::CrossVenueSameSideNo,
        };
        let age_ms = buy_book.age_ms(now).max(sell_book.age_ms(now));
        self.build_candidate(pair_id, kind, first, second, age_ms, now)
    }

    // =========================================================================
    // Candidate assembly
    // =========================================================================

    /// Position size from top-of-book liquidity, or `None` when it falls
    /// below the minimum. Risk scales sizing only after an opportunity has
    /// been scored, so the pre-score risk input here is zero.
    fn sized(&self, top_of_book_quantity: Decimal, spread_percent: Decimal) -> Option<Decimal> {
        let size = size_by_liquidity_and_risk(
            top_of_book_quantity,
            self.config.max_position_size,
            self.config.min_position_size,
            spread_percent,
            0,
        );
        (size > Decimal::ZERO).then_some(size)
    }

    /// Prices both legs, applies the profitability floors and risk gates,
    /// and assembles the opportunity. `None` means the candidate failed a
    /// profitability floor; risk-gated candidates are still returned, with
    /// `is_executable` false and the failing gate recorded.
    fn build_candidate(
        &self,
        pair_id: &str,
        kind: ArbKind,
        first: LegInput,
        second: LegInput,
        age_max_ms: i64,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        if first.fill.is_empty() || second.fill.is_empty() {
            return None;
        }
        let matched = first.fill.filled_quantity.min(second.fill.filled_quantity);

        // Two buy legs settle at $1 per matched share; a buy/sell pair
        // nets the sale proceeds against the purchase cost.
        let (total_cost, estimated_payout) = if second.action == Action::Sell {
            (first.fill.total_cost, second.fill.total_cost)
        } else {
            (first.fill.total_cost + second.fill.total_cost, matched)
        };
        let gross_profit = estimated_payout - total_cost;

        let leg_fee = |input: &LegInput| {
            self.config
                .fees
                .for_venue(input.venue)
                .fee(input.fill.avg_price, input.fill.filled_quantity, false)
        };
        let first_fees = leg_fee(&first);
        let second_fees = leg_fee(&second);
        let total_fees = first_fees + second_fees;
        let net_profit = gross_profit - total_fees;
        let profit_percentage = if total_cost > Decimal::ZERO {
            net_profit / total_cost
        } else {
            Decimal::ZERO
        };

        if profit_percentage < self.config.min_net_profit_percent
            || net_profit < self.config.min_net_profit_absolute
        {
            debug!(
                pair_id,
                kind = %kind,
                %net_profit,
                %profit_percentage,
                "candidate below profitability floors"
            );
            return None;
        }

        let worst_slippage = slippage(first.quote_price, first.fill.avg_price)
            .max(slippage(second.quote_price, second.fill.avg_price));
        let depth = first.depth.min(second.depth);
        let latency = latency_risk(age_max_ms, self.config.max_latency_ms);

        let mut risk = execution_risk(depth, latency, worst_slippage, profit_percentage);
        // Configured floors can be stricter than the built-in gates.
        if risk.is_executable {
            if depth < self.config.min_depth_score {
                risk.is_executable = false;
                risk.reason = Some(RiskGate::InsufficientLiquidity);
            } else if worst_slippage > self.config.max_slippage_percent {
                risk.is_executable = false;
                risk.reason = Some(RiskGate::SlippageTooHigh);
            }
        }

        let into_leg = |input: LegInput, fees: Decimal| ArbitrageLeg {
            venue: input.venue,
            market_id: pair_id.to_string(),
            side: input.side,
            action: input.action,
            avg_fill_price: input.fill.avg_price,
            filled_quantity: input.fill.filled_quantity,
            cost: input.fill.total_cost,
            fees,
            levels_consumed: input.fill.levels_used,
        };

        Some(ArbitrageOpportunity {
            id: String::new(), // assigned at registration
            kind,
            legs: [into_leg(first, first_fees), into_leg(second, second_fees)],
            gross_profit,
            total_fees,
            net_profit,
            profit_percentage,
            roi: profit_percentage * dec!(100),
            max_quantity: matched,
            total_cost,
            estimated_payout,
            slippage: worst_slippage,
            depth_score: depth,
            latency_risk: latency,
            detected_at: now,
            expires_at: now + Duration::milliseconds(self.config.opportunity_validity_ms),
            is_executable: risk.is_executable,
            reason: risk.reason,
        })
    }
}

impl std::fmt::Debug for OpportunityDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpportunityDetector")
            .field("config", &self.config)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// One side of a candidate, priced against a book.
struct LegInput {
    venue: Venue,
    side: Side,
    action: Action,
    /// Top-of-book price the strategy quoted; the slippage reference.
    quote_price: Decimal,
    fill: FillResult,
    depth: u32,
}

fn leg(
    venue: Venue,
    book: &VenueBook,
    side: Side,
    action: Action,
    quote_price: Decimal,
    size: Decimal,
) -> LegInput {
    let levels = book.levels(side, action);
    LegInput {
        venue,
        side,
        action,
        quote_price,
        fill: simulate_fill(levels, size),
        depth: depth_score(levels, size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::clock::ManualClock;

    fn book(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> BookSnapshot {
        BookSnapshot::new(bids.to_vec(), asks.to_vec())
    }

    /// One venue priced so that YES ask 0.45 + NO ask 0.50 = 0.95.
    fn push_same_venue_arb(detector: &OpportunityDetector, pair_id: &str) {
        detector.update_market_book(
            pair_id,
            Venue::Kalshi,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            Some(&book(&[(dec!(0.45), dec!(100))], &[(dec!(0.50), dec!(100))])),
        );
    }

    // ==================== Same-Venue Binary Tests ====================

    #[test]
    fn same_venue_binary_detected() {
        let detector = OpportunityDetector::new();
        push_same_venue_arb(&detector, "pair-1");

        let active = detector.get_active_opportunities();
        assert_eq!(active.len(), 1);
        let opp = &active[0];
        assert_eq!(opp.kind, ArbKind::SameVenueBinary);
        assert_eq!(opp.id, "opp-1");

        // Fills 100 shares per leg: cost 45 + 50 = 95, payout 100.
        assert_eq!(opp.max_quantity, dec!(100));
        assert_eq!(opp.total_cost, dec!(95));
        assert_eq!(opp.estimated_payout, dec!(100));
        assert_eq!(opp.gross_profit, dec!(5));
        // Kalshi flat taker 0.7%: 0.315 + 0.35.
        assert_eq!(opp.total_fees, dec!(0.665));
        assert_eq!(opp.net_profit, dec!(4.335));
        assert!(opp.is_executable);
        assert_eq!(opp.reason, None);
        assert_eq!(opp.slippage, Decimal::ZERO);
        assert_eq!(opp.latency_risk, 0);
        assert_eq!(opp.depth_score, 74);
    }

    #[test]
    fn no_opportunity_when_asks_sum_above_one() {
        let detector = OpportunityDetector::new();
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.50), dec!(100))], &[(dec!(0.55), dec!(100))]),
            Some(&book(&[(dec!(0.45), dec!(100))], &[(dec!(0.50), dec!(100))])),
        );
        assert!(detector.get_active_opportunities().is_empty());
    }

    #[test]
    fn thin_book_is_sized_out() {
        // Top-of-book quantity below the minimum position size.
        let config = ArbitrageConfig::default().with_position_bounds(dec!(50), dec!(1000));
        let detector = OpportunityDetector::with_config(config).unwrap();
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.40), dec!(5))], &[(dec!(0.45), dec!(5))]),
            Some(&book(&[(dec!(0.45), dec!(5))], &[(dec!(0.50), dec!(5))])),
        );
        assert!(detector.get_active_opportunities().is_empty());
    }

    // ==================== Cross-Venue Binary Tests ====================

    #[test]
    fn cross_venue_binary_detected() {
        let detector = OpportunityDetector::new();
        // Polymarket YES ask 0.45, Kalshi NO ask 0.53: cost 0.98.
        // Every other pairing and same-side direction is unprofitable.
        detector.update_market_book(
            "pair-1",
            Venue::Polymarket,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            Some(&book(&[(dec!(0.48), dec!(100))], &[(dec!(0.58), dec!(100))])),
        );
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.44), dec!(100))], &[(dec!(0.48), dec!(100))]),
            Some(&book(&[(dec!(0.46), dec!(100))], &[(dec!(0.53), dec!(100))])),
        );

        let active = detector.get_active_opportunities();
        assert_eq!(active.len(), 1);
        let opp = &active[0];
        assert_eq!(opp.kind, ArbKind::CrossVenueBinary);
        assert_eq!(opp.legs[0].venue, Venue::Polymarket);
        assert_eq!(opp.legs[0].side, Side::Yes);
        assert_eq!(opp.legs[1].venue, Venue::Kalshi);
        assert_eq!(opp.legs[1].side, Side::No);

        assert_eq!(opp.total_cost, dec!(98));
        assert_eq!(opp.gross_profit, dec!(2));
        // Polymarket nonlinear at 0.45: 0.02 * 0.45 * 100 = 0.9;
        // Kalshi flat taker: 0.53 * 0.007 * 100 = 0.371.
        assert_eq!(opp.total_fees, dec!(1.271));
        assert_eq!(opp.net_profit, dec!(0.729));
        assert!(opp.is_executable);
    }

    #[test]
    fn cross_venue_tie_reports_nothing() {
        // Both pairings price at 0.90: neither direction dominates. The
        // same-side spreads are all negative, so the pass yields nothing.
        let detector = OpportunityDetector::new();
        detector.update_market_book(
            "pair-1",
            Venue::Polymarket,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            Some(&book(&[(dec!(0.40), dec!(100))], &[(dec!(0.58), dec!(100))])),
        );
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            Some(&book(&[(dec!(0.40), dec!(100))], &[(dec!(0.58), dec!(100))])),
        );

        // 0.45 + 0.58 = 1.03 on both venues and both pairings: no arb at
        // all; additionally pairing profits tie at -0.03.
        assert!(detector.get_active_opportunities().is_empty());
    }

    // ==================== Same-Side Tests ====================

    #[test]
    fn same_side_yes_detected() {
        let detector = OpportunityDetector::new();
        // Buy YES at 0.45 on Polymarket, sell YES at 0.55 on Kalshi.
        detector.update_market_book(
            "pair-1",
            Venue::Polymarket,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            None,
        );
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.55), dec!(100))], &[(dec!(0.60), dec!(100))]),
            None,
        );

        let active = detector.get_active_opportunities();
        let opp = active
            .iter()
            .find(|o| o.kind == ArbKind::CrossVenueSameSideYes)
            .expect("same-side YES opportunity");

        assert_eq!(opp.legs[0].action, Action::Buy);
        assert_eq!(opp.legs[0].venue, Venue::Polymarket);
        assert_eq!(opp.legs[1].action, Action::Sell);
        assert_eq!(opp.legs[1].venue, Venue::Kalshi);

        // Buy 100 @ 0.45 = 45, sell 100 @ 0.55 = 55.
        assert_eq!(opp.total_cost, dec!(45));
        assert_eq!(opp.estimated_payout, dec!(55));
        assert_eq!(opp.gross_profit, dec!(10));
        // Polymarket nonlinear 0.9 + Kalshi flat 0.385.
        assert_eq!(opp.net_profit, dec!(8.715));
    }

    #[test]
    fn derived_no_books_mirror_same_side_yes() {
        // With NO books derived from YES, the complementary NO trade is
        // the same economics and is detected alongside the YES one.
        let detector = OpportunityDetector::new();
        detector.update_market_book(
            "pair-1",
            Venue::Polymarket,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            None,
        );
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.55), dec!(100))], &[(dec!(0.60), dec!(100))]),
            None,
        );

        let kinds: Vec<ArbKind> = detector
            .get_active_opportunities()
            .iter()
            .map(|o| o.kind)
            .collect();
        assert!(kinds.contains(&ArbKind::CrossVenueSameSideYes));
        assert!(kinds.contains(&ArbKind::CrossVenueSameSideNo));
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn refresh_keeps_id_and_registry_size() {
        let detector = OpportunityDetector::new();
        push_same_venue_arb(&detector, "pair-1");
        let first_id = detector.get_active_opportunities()[0].id.clone();

        push_same_venue_arb(&detector, "pair-1");

        let active = detector.get_active_opportunities();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first_id);
        assert_eq!(detector.get_stats().opportunities_detected, 1);
    }

    #[test]
    fn expiry_sweep_is_deterministic() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let detector = OpportunityDetector::with_config_and_clock(
            ArbitrageConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();

        push_same_venue_arb(&detector, "pair-1");
        assert_eq!(detector.get_active_opportunities().len(), 1);

        // Remove the arb from the books so a later pass cannot refresh it.
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.50), dec!(100))], &[(dec!(0.55), dec!(100))]),
            Some(&book(&[(dec!(0.45), dec!(100))], &[(dec!(0.50), dec!(100))])),
        );
        assert_eq!(detector.get_active_opportunities().len(), 1);

        // One millisecond before expiry: still live.
        clock.advance(Duration::milliseconds(
            detector.config().opportunity_validity_ms - 1,
        ));
        detector.detect_arbitrage("pair-1");
        assert_eq!(detector.get_active_opportunities().len(), 1);

        clock.advance(Duration::milliseconds(1));
        detector.detect_arbitrage("pair-1");
        assert!(detector.get_active_opportunities().is_empty());
        assert_eq!(detector.get_stats().opportunities_expired, 1);
    }

    #[test]
    fn persistent_arb_refreshes_past_expiry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let detector = OpportunityDetector::with_config_and_clock(
            ArbitrageConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();

        push_same_venue_arb(&detector, "pair-1");
        clock.advance(Duration::milliseconds(60_000));

        // A fresh update re-detects the still-present arb: the refresh
        // runs before the sweep, renewing the validity window.
        push_same_venue_arb(&detector, "pair-1");
        let active = detector.get_active_opportunities();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "opp-1");
        assert_eq!(detector.get_stats().opportunities_expired, 0);
    }

    #[test]
    fn stale_book_gates_cross_venue_candidates() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let detector = OpportunityDetector::with_config_and_clock(
            ArbitrageConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();

        detector.update_market_book(
            "pair-1",
            Venue::Polymarket,
            &book(&[(dec!(0.40), dec!(100))], &[(dec!(0.45), dec!(100))]),
            Some(&book(&[(dec!(0.48), dec!(100))], &[(dec!(0.58), dec!(100))])),
        );
        // Polymarket's book is now 4.5s old: latency 90 trips the
        // staleness gate for any leg touching it.
        clock.advance(Duration::milliseconds(4_500));
        detector.update_market_book(
            "pair-1",
            Venue::Kalshi,
            &book(&[(dec!(0.44), dec!(100))], &[(dec!(0.48), dec!(100))]),
            Some(&book(&[(dec!(0.46), dec!(100))], &[(dec!(0.53), dec!(100))])),
        );

        assert!(detector.get_active_opportunities().is_empty());
    }

    #[test]
    fn mark_executed_removes_and_counts() {
        let detector = OpportunityDetector::new();
        push_same_venue_arb(&detector, "pair-1");
        let id = detector.get_active_opportunities()[0].id.clone();

        let executed = detector.mark_executed(&id).unwrap();
        assert_eq!(executed.id, id);
        assert!(detector.get_active_opportunities().is_empty());
        assert!(detector.mark_executed(&id).is_none());
        assert_eq!(detector.get_stats().opportunities_executed, 1);
    }

    #[test]
    fn best_opportunity_is_highest_executable_net() {
        let detector = OpportunityDetector::new();
        push_same_venue_arb(&detector, "pair-1");
        // A second pair with a wider spread: YES 0.40 + NO 0.50.
        detector.update_market_book(
            "pair-2",
            Venue::Kalshi,
            &book(&[(dec!(0.35), dec!(100))], &[(dec!(0.40), dec!(100))]),
            Some(&book(&[(dec!(0.45), dec!(100))], &[(dec!(0.50), dec!(100))])),
        );

        let best = detector.get_best_opportunity().unwrap();
        assert_eq!(best.legs[0].market_id, "pair-2");
        assert!(best.net_profit > dec!(4.335));
    }

    // ==================== Event Tests ====================

    #[test]
    fn market_update_is_emitted_last() {
        let detector = OpportunityDetector::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        detector.on_event(move |event| {
            let label = match event {
                ArbEvent::MarketUpdate { .. } => "update",
                ArbEvent::OpportunityDetected(_) => "detected",
                ArbEvent::OpportunityExpired(_) => "expired",
                ArbEvent::OpportunityExecuted(_) => "executed",
            };
            sink.lock().unwrap().push(label);
        });

        push_same_venue_arb(&detector, "pair-1");
        assert_eq!(*log.lock().unwrap(), vec!["detected", "update"]);
    }

    #[test]
    fn refresh_emits_no_detected_event() {
        let detector = OpportunityDetector::new();
        let detected = Arc::new(Mutex::new(0u32));
        let sink = Arc::clone(&detected);
        detector.on_event(move |event| {
            if matches!(event, ArbEvent::OpportunityDetected(_)) {
                *sink.lock().unwrap() += 1;
            }
        });

        push_same_venue_arb(&detector, "pair-1");
        push_same_venue_arb(&detector, "pair-1");
        assert_eq!(*detected.lock().unwrap(), 1);
    }

    #[test]
    fn off_event_stops_delivery() {
        let detector = OpportunityDetector::new();
        let seen = Arc::new(Mutex::new(0u32));
        let sink = Arc::clone(&seen);
        let handle = detector.on_event(move |_| *sink.lock().unwrap() += 1);

        assert!(detector.off_event(handle));
        assert!(!detector.off_event(handle));
        push_same_venue_arb(&detector, "pair-1");
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    // ==================== Stats and Config Tests ====================

    #[test]
    fn stats_reflect_registry_and_counters() {
        let detector = OpportunityDetector::new();
        push_same_venue_arb(&detector, "pair-1");

        let stats = detector.get_stats();
        assert_eq!(stats.tracked_pairs, 1);
        assert_eq!(stats.active_opportunities, 1);
        assert_eq!(stats.executable_opportunities, 1);
        assert_eq!(stats.detection_passes, 1);
        assert_eq!(stats.opportunities_detected, 1);
        assert_eq!(stats.best_net_profit, Some(dec!(4.335)));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = ArbitrageConfig::default().with_validity_ms(0);
        assert!(OpportunityDetector::with_config(config).is_err());
    }
}
