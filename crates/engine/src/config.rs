//! Detector configuration.
//!
//! Every default is documented on the constant that carries it. Derived
//! invariants are checked once, at construction time, never at first use.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pm_arb_core::VenueFees;

// =============================================================================
// Defaults
// =============================================================================

/// Default minimum net profit relative to cost (0.5%).
pub const DEFAULT_MIN_NET_PROFIT_PERCENT: Decimal = dec!(0.005);

/// Default minimum net profit in dollars.
pub const DEFAULT_MIN_NET_PROFIT_ABSOLUTE: Decimal = dec!(0.01);

/// Default maximum tolerated slippage (5%).
pub const DEFAULT_MAX_SLIPPAGE_PERCENT: Decimal = dec!(0.05);

/// Default minimum depth score.
pub const DEFAULT_MIN_DEPTH_SCORE: u32 = 20;

/// Default book-age limit used by the latency risk scale.
pub const DEFAULT_MAX_LATENCY_MS: i64 = 5_000;

/// Default maximum position size in shares.
pub const DEFAULT_MAX_POSITION_SIZE: Decimal = dec!(1000);

/// Default minimum position size in shares.
pub const DEFAULT_MIN_POSITION_SIZE: Decimal = dec!(10);

/// Default opportunity validity window.
pub const DEFAULT_OPPORTUNITY_VALIDITY_MS: i64 = 30_000;

// =============================================================================
// Configuration
// =============================================================================

/// Fee models for both venues.
///
/// Sub-objects merge independently: overriding one venue's fees leaves the
/// other at its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSettings {
    pub polymarket: VenueFees,
    pub kalshi: VenueFees,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            polymarket: VenueFees::nonlinear(pm_arb_core::DEFAULT_NONLINEAR_BASE_FEE),
            kalshi: VenueFees::flat(
                pm_arb_core::DEFAULT_FLAT_MAKER_RATE,
                pm_arb_core::DEFAULT_FLAT_TAKER_RATE,
            ),
        }
    }
}

impl FeeSettings {
    /// Fee model for one venue.
    #[must_use]
    pub fn for_venue(&self, venue: pm_arb_core::Venue) -> &VenueFees {
        match venue {
            pm_arb_core::Venue::Polymarket => &self.polymarket,
            pm_arb_core::Venue::Kalshi => &self.kalshi,
        }
    }
}

/// Profitability, risk, and sizing thresholds for the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    /// Relative profitability floor: `net_profit / total_cost`.
    pub min_net_profit_percent: Decimal,
    /// Absolute profitability floor in dollars.
    pub min_net_profit_absolute: Decimal,
    /// Slippage ceiling used by the risk gate.
    pub max_slippage_percent: Decimal,
    /// Depth score floor used by the risk gate.
    pub min_depth_score: u32,
    /// Book-age limit scaling the latency risk.
    pub max_latency_ms: i64,
    /// Largest position the sizer will propose, in shares.
    pub max_position_size: Decimal,
    /// Smallest position worth trading, in shares.
    pub min_position_size: Decimal,
    /// Lifetime of a registered opportunity.
    pub opportunity_validity_ms: i64,
    /// Per-venue fee models.
    pub fees: FeeSettings,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_net_profit_percent: DEFAULT_MIN_NET_PROFIT_PERCENT,
            min_net_profit_absolute: DEFAULT_MIN_NET_PROFIT_ABSOLUTE,
            max_slippage_percent: DEFAULT_MAX_SLIPPAGE_PERCENT,
            min_depth_score: DEFAULT_MIN_DEPTH_SCORE,
            max_latency_ms: DEFAULT_MAX_LATENCY_MS,
            max_position_size: DEFAULT_MAX_POSITION_SIZE,
            min_position_size: DEFAULT_MIN_POSITION_SIZE,
            opportunity_validity_ms: DEFAULT_OPPORTUNITY_VALIDITY_MS,
            fees: FeeSettings::default(),
        }
    }
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_position_size {min} exceeds max_position_size {max}")]
    PositionBounds { min: Decimal, max: Decimal },

    #[error("opportunity_validity_ms must be positive, got {0}")]
    NonPositiveValidity(i64),

    #[error("max_latency_ms must be positive, got {0}")]
    NonPositiveLatencyLimit(i64),

    #[error("{field} must be non-negative, got {value}")]
    NegativeThreshold { field: &'static str, value: Decimal },

    #[error("failed to load configuration")]
    Load(#[from] figment::Error),
}

impl ArbitrageConfig {
    /// Creates a relaxed configuration useful in tests: tiny thresholds so
    /// small synthetic books qualify.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            min_net_profit_percent: dec!(0.0001),
            min_net_profit_absolute: dec!(0.0001),
            min_position_size: dec!(1),
            ..Self::default()
        }
    }

    /// Sets the relative profitability floor.
    #[must_use]
    pub fn with_min_net_profit_percent(mut self, value: Decimal) -> Self {
        self.min_net_profit_percent = value;
        self
    }

    /// Sets the absolute profitability floor.
    #[must_use]
    pub fn with_min_net_profit_absolute(mut self, value: Decimal) -> Self {
        self.min_net_profit_absolute = value;
        self
    }

    /// Sets the position size bounds.
    #[must_use]
    pub fn with_position_bounds(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_position_size = min;
        self.max_position_size = max;
        self
    }

    /// Sets the opportunity validity window.
    #[must_use]
    pub fn with_validity_ms(mut self, validity_ms: i64) -> Self {
        self.opportunity_validity_ms = validity_ms;
        self
    }

    /// Sets the book-age limit.
    #[must_use]
    pub fn with_max_latency_ms(mut self, limit_ms: i64) -> Self {
        self.max_latency_ms = limit_ms;
        self
    }

    /// Overrides one venue's fee model, leaving the other untouched.
    #[must_use]
    pub fn with_venue_fees(mut self, venue: pm_arb_core::Venue, fees: VenueFees) -> Self {
        match venue {
            pm_arb_core::Venue::Polymarket => self.fees.polymarket = fees,
            pm_arb_core::Venue::Kalshi => self.fees.kalshi = fees,
        }
        self
    }

    /// Checks derived invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_position_size > self.max_position_size {
            return Err(ConfigError::PositionBounds {
                min: self.min_position_size,
                max: self.max_position_size,
            });
        }
        if self.opportunity_validity_ms <= 0 {
            return Err(ConfigError::NonPositiveValidity(self.opportunity_validity_ms));
        }
        if self.max_latency_ms <= 0 {
            return Err(ConfigError::NonPositiveLatencyLimit(self.max_latency_ms));
        }
        for (field, value) in [
            ("min_net_profit_percent", self.min_net_profit_percent),
            ("min_net_profit_absolute", self.min_net_profit_absolute),
            ("max_slippage_percent", self.max_slippage_percent),
        ] {
            if value < Decimal::ZERO {
                return Err(ConfigError::NegativeThreshold { field, value });
            }
        }
        Ok(())
    }

    /// Loads configuration by merging `config/Arbitrage.toml` and `ARB_`
    /// prefixed environment variables over the defaults, then validates.
    ///
    /// # Errors
    ///
    /// Returns an error if sources cannot be read or the merged
    /// configuration violates an invariant.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Figment::new())
    }

    /// Like [`load`](Self::load), but layering a profile file
    /// (`config/Arbitrage.<profile>.toml`) over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if sources cannot be read or the merged
    /// configuration violates an invariant.
    pub fn load_with_profile(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Figment::new().merge(Toml::file(format!(
            "config/Arbitrage.{profile}.toml"
        ))))
    }

    fn load_from(overlay: Figment) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::file("config/Arbitrage.toml"))
            .merge(overlay)
            .merge(Env::prefixed("ARB_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }
}
