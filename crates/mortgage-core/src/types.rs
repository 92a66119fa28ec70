use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Annual interest rates as percentages (4.5 = 4.5%), as entered by borrowers.
pub type Percent = Decimal;

/// Periodic rates expressed as decimals (0.00375 = 0.375% per month).
pub type Rate = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Round a monetary amount to the cent, half away from zero.
pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an annual percentage into a monthly decimal rate.
pub fn monthly_rate(annual: Percent) -> Rate {
    annual / Decimal::from(1200)
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
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004999)), dec!(1.00));
        assert_eq!(round_money(dec!(1520.0566)), dec!(1520.06));
    }

    #[test]
    fn test_monthly_rate() {
        assert_eq!(monthly_rate(dec!(4.5)), dec!(0.00375));
        assert_eq!(monthly_rate(Decimal::ZERO), Decimal::ZERO);
    }
}
