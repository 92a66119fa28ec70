use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::MortgageError;
use crate::types::{round_money, Money, Rate};
use crate::MortgageResult;

/// Below this monthly rate the loan is treated as interest-free.
const ZERO_RATE_THRESHOLD: Decimal = dec!(0.0001);

/// Below this monthly rate `(1+r)^n - 1` is replaced by its linearization.
const LINEAR_RATE_THRESHOLD: Decimal = dec!(0.001);

/// Level monthly payment amortizing `principal` over `total_months` at `monthly_rate`.
///
/// Three regimes:
/// - `r < 0.0001`: straight division, no interest component
/// - `0.0001 <= r < 0.001`: `P * (1 + r*n) / n`
/// - otherwise the annuity form `P * r / (1 - (1+r)^-n)`
///
/// The result is rounded to the cent. Rates whose growth factor does not fit
/// in a `Decimal` are rejected rather than overflowing.
pub fn payment(principal: Money, monthly_rate: Rate, total_months: u32) -> MortgageResult<Money> {
    if total_months == 0 {
        return Err(MortgageError::invalid(
            "total_months",
            "Number of months must be > 0",
        ));
    }

    let n = Decimal::from(total_months);

    let raw = if monthly_rate < ZERO_RATE_THRESHOLD {
        principal / n
    } else if monthly_rate < LINEAR_RATE_THRESHOLD {
        principal * (Decimal::ONE + monthly_rate * n) / n
    } else {
        let factor = (Decimal::ONE + monthly_rate)
            .checked_powu(u64::from(total_months))
            .ok_or_else(|| {
                MortgageError::invalid(
                    "monthly_rate",
                    format!("(1 + {monthly_rate})^{total_months} overflows"),
                )
            })?;
        let annuity_factor = Decimal::ONE - Decimal::ONE / factor;
        if annuity_factor.is_zero() {
            principal / n
        } else {
            principal
                .checked_mul(monthly_rate)
                .and_then(|interest| interest.checked_div(annuity_factor))
                .ok_or_else(|| {
                    MortgageError::invalid("principal", "Monthly payment overflows")
                })?
        }
    };

    Ok(round_money(raw))
}

/// Present value of a stream of end-of-month amounts; `flows[0]` falls due in month 1.
pub fn present_value(monthly_rate: Rate, flows: &[Money]) -> MortgageResult<Money> {
    if monthly_rate <= dec!(-1) {
        return Err(MortgageError::invalid(
            "monthly_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let one_plus_r = Decimal::ONE + monthly_rate;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for cf in flows {
        discount = match discount.checked_mul(one_plus_r) {
            Some(d) => d,
            // Later flows discount to zero at 28 digits.
            None => break,
        };
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| {
                MortgageError::invalid("monthly_rate", "Present value overflows at this rate")
            })?;
    }

    Ok(result)
}
