//! Arbitrage opportunity detection engine for binary prediction markets.
//!
//! This crate turns streamed order books from Kalshi and Polymarket into a
//! live registry of arbitrage opportunities, with lifecycle events for
//! detection, expiry, and execution.
//!
//! # Overview
//!
//! When the same event is priced inconsistently, opposing positions lock
//! in profit:
//!
//! ```text
//! Polymarket: YES ask $0.45
//! Kalshi:     NO  ask $0.53
//!
//! Buy both:
//!   Total cost:        $0.98
//!   Guaranteed payout: $1.00
//!   Gross profit:      $0.02 per share (2.04%)
//! ```
//!
//! The detector evaluates three strategies on every book update:
//! same-venue binary (YES + NO on one venue below $1), cross-venue binary
//! (YES and NO split across venues), and cross-venue same-side (buy one
//! outcome cheap, sell it rich elsewhere). Candidates are sized against
//! book depth, priced with simulated fills and venue fees, and gated on
//! depth, staleness, and slippage before registration.
//!
//! # Modules
//!
//! - [`book`]: Per-venue order book state and the NO-side complement
//! - [`clock`]: Injected time source
//! - [`config`]: Thresholds, sizing bounds, and fee settings
//! - [`detector`]: The detection engine
//! - [`events`]: Lifecycle events and listener handles
//! - [`opportunity`]: Opportunity and leg types
//! - [`registry`]: Active-opportunity registry with signature dedup
//!
//! # Example
//!
//! ```ignore
//! use pm_arb_engine::{ArbitrageConfig, BookSnapshot, OpportunityDetector};
//! use pm_arb_core::Venue;
//! use rust_decimal_macros::dec;
//!
//! let detector = OpportunityDetector::with_config(ArbitrageConfig::load()?)?;
//! detector.on_event(|event| println!("{event:?}"));
//!
//! let yes = BookSnapshot::new(
//!     vec![(dec!(0.44), dec!(250))],
//!     vec![(dec!(0.45), dec!(250))],
//! );
//! detector.update_market_book("btc-100k-dec", Venue::Polymarket, &yes, None);
//!
//! if let Some(best) = detector.get_best_opportunity() {
//!     println!("best: {} nets ${}", best.kind, best.net_profit);
//! }
//! ```

pub mod book;
pub mod clock;
pub mod config;
pub mod detector;
pub mod events;
pub mod opportunity;
pub mod registry;

pub use book::{derive_complement, BookSnapshot, MarketBook, VenueBook};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ArbitrageConfig, ConfigError, FeeSettings};
pub use detector::{DetectorStats, OpportunityDetector};
pub use events::{ArbEvent, ListenerHandle};
pub use opportunity::{ArbKind, ArbitrageLeg, ArbitrageOpportunity, Signature};
pub use registry::{OpportunityRegistry, UpsertOutcome};
