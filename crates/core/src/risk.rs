//! Execution risk estimation.
//!
//! Blends depth, staleness, slippage, and profit margin into a single
//! 0-100 risk score and gates executability with a fixed-priority check.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Reason an opportunity is not executable.
///
/// Variants are listed in gate priority order: the first failing gate wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskGate {
    RiskTooHigh,
    InsufficientLiquidity,
    DataTooStale,
    SlippageTooHigh,
}

impl RiskGate {
    /// Returns the display string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RiskTooHigh => "risk too high",
            Self::InsufficientLiquidity => "insufficient liquidity",
            Self::DataTooStale => "data too stale",
            Self::SlippageTooHigh => "slippage too high",
        }
    }
}

impl std::fmt::Display for RiskGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the execution risk blend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRisk {
    /// Blended risk score, 0 (safe) to 100 (untradeable).
    pub risk_score: u32,
    /// Whether the opportunity passes every gate.
    pub is_executable: bool,
    /// First failing gate, when not executable.
    pub reason: Option<RiskGate>,
}

/// Staleness risk from book age, 0-100.
///
/// `min(100, round(100 * age_max_ms / age_limit_ms))`. Callers pass the
/// larger of the two venues' ages. A non-positive limit maps to 100.
#[must_use]
pub fn latency_risk(age_max_ms: i64, age_limit_ms: i64) -> u32 {
    if age_limit_ms <= 0 {
        return 100;
    }
    let age = age_max_ms.max(0);
    let scaled = Decimal::from(age) * dec!(100) / Decimal::from(age_limit_ms);
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(100)
        .min(100)
}

/// Blends the four risk inputs and applies the executability gates.
///
/// Weights: depth risk (`100 - depth_score`) 0.3, latency 0.3, slippage
/// (`min(100, slippage * 1000)`) 0.2, margin 0.2 where the margin risk is
/// 80 below 0.5%, 50 below 1%, and 20 otherwise.
///
/// Gates fire in fixed priority: score > 70, depth < 20, latency > 80,
/// slippage > 5%.
#[must_use]
pub fn execution_risk(
    depth_score: u32,
    latency_risk: u32,
    slippage: Decimal,
    profit_margin: Decimal,
) -> ExecutionRisk {
    let depth_risk = Decimal::from(100u32.saturating_sub(depth_score));
    let slippage_risk = (slippage * dec!(1000)).min(dec!(100));
    let margin_risk = if profit_margin < dec!(0.005) {
        dec!(80)
    } else if profit_margin < dec!(0.01) {
        dec!(50)
    } else {
        dec!(20)
    };

    let blended = depth_risk * dec!(0.3)
        + Decimal::from(latency_risk) * dec!(0.3)
        + slippage_risk * dec!(0.2)
        + margin_risk * dec!(0.2);
    let risk_score = blended
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(100);

    let reason = if risk_score > 70 {
        Some(RiskGate::RiskTooHigh)
    } else if depth_score < 20 {
        Some(RiskGate::InsufficientLiquidity)
    } else if latency_risk > 80 {
        Some(RiskGate::DataTooStale)
    } else if slippage > dec!(0.05) {
        Some(RiskGate::SlippageTooHigh)
    } else {
        None
    };

    ExecutionRisk {
        risk_score,
        is_executable: reason.is_none(),
        reason,
    }
}
