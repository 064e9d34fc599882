//! Pure arbitrage math for binary prediction markets.
//!
//! Everything in this crate is side-effect free: no clocks, no logging, no
//! I/O, no interior state. Malformed or insufficient input degrades to a
//! zeroed result or `None`-like outcome, never an error.
//!
//! # Modules
//!
//! - [`types`]: venues, sides, order book levels, fill results
//! - [`fill`]: order book walking and slippage
//! - [`fees`]: flat and nonlinear venue fee curves
//! - [`depth`]: 0-100 composite liquidity score
//! - [`risk`]: latency risk and the executability gate
//! - [`sizing`]: Kelly criterion and liquidity/risk-bounded sizing
//!
//! # Example
//!
//! ```
//! use pm_arb_core::{simulate_fill, OrderBookLevel, Venue};
//! use rust_decimal_macros::dec;
//!
//! let asks = vec![
//!     OrderBookLevel::new(dec!(0.45), dec!(100), Venue::Kalshi),
//!     OrderBookLevel::new(dec!(0.47), dec!(200), Venue::Kalshi),
//! ];
//! let fill = simulate_fill(&asks, dec!(150));
//! assert_eq!(fill.filled_quantity, dec!(150));
//! ```

pub mod depth;
pub mod fees;
pub mod fill;
pub mod risk;
pub mod sizing;
pub mod types;

pub use depth::depth_score;
pub use fees::{
    VenueFees, DEFAULT_FLAT_MAKER_RATE, DEFAULT_FLAT_TAKER_RATE, DEFAULT_NONLINEAR_BASE_FEE,
};
pub use fill::{available_quantity_at, simulate_fill, slippage};
pub use risk::{execution_risk, latency_risk, ExecutionRisk, RiskGate};
pub use sizing::{kelly_size, quarter_kelly, size_by_liquidity_and_risk, DEFAULT_KELLY_FRACTION};
pub use types::{Action, FillResult, OrderBookLevel, Side, Venue};
