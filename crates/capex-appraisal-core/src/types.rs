use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions (payback periods)
pub type Years = Decimal;

/// Longest project horizon accepted by the engine.
pub const MAX_PROJECT_YEARS: u32 = 50;

/// Why a financial metric has no answer for a given cash-flow series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Cash flows are all non-negative or all non-positive
    NoSignChange,
    /// Root finder hit its iteration cap or left the valid rate domain
    NotConverged,
    /// Cumulative cash flow never turns non-negative within the horizon
    NeverRecovered,
    /// Denominator investment is zero
    ZeroInvestment,
}

impl std::fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UndefinedReason::NoSignChange => "cash flows never change sign",
            UndefinedReason::NotConverged => "solver did not converge",
            UndefinedReason::NeverRecovered => "investment not recovered within the horizon",
            UndefinedReason::ZeroInvestment => "initial investment is zero",
        };
        f.write_str(text)
    }
}

/// A metric that either has a value or is tagged with the rule that made it
/// undefined. Callers render the latter as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric<T> {
    Defined { value: T },
    Undefined { reason: UndefinedReason },
}

impl<T: Copy> Metric<T> {
    pub fn defined(value: T) -> Self {
        Metric::Defined { value }
    }

    pub fn undefined(reason: UndefinedReason) -> Self {
        Metric::Undefined { reason }
    }

    pub fn value(&self) -> Option<T> {
        match self {
            Metric::Defined { value } => Some(*value),
            Metric::Undefined { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Metric::Defined { .. } => None,
            Metric::Undefined { reason } => Some(*reason),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Defined { .. })
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metric_serializes_with_status_tag() {
        let defined: Metric<Decimal> = Metric::defined(dec!(0.125));
        let json = serde_json::to_value(&defined).unwrap();
        assert_eq!(json["status"], "defined");
        assert_eq!(json["value"], "0.125");

        let undefined: Metric<Decimal> = Metric::undefined(UndefinedReason::NoSignChange);
        let json = serde_json::to_value(&undefined).unwrap();
        assert_eq!(json["status"], "undefined");
        assert_eq!(json["reason"], "no_sign_change");
    }

    #[test]
    fn test_metric_accessors() {
        let m: Metric<Decimal> = Metric::undefined(UndefinedReason::ZeroInvestment);
        assert!(!m.is_defined());
        assert_eq!(m.value(), None);
        assert_eq!(m.reason(), Some(UndefinedReason::ZeroInvestment));
    }
}
