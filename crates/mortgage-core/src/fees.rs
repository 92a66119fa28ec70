//! Loan fees and annual percentage rate.
//!
//! One-time fees reduce the net proceeds of the loan, recurring fees are
//! charged monthly against the outstanding balance, and early repayment fees
//! are charged on each applied overpayment. The APR is the annualized rate
//! equating the present value of every payment and fee to the net proceeds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageError;
use crate::time_value::present_value;
use crate::types::{monthly_rate, round_money, Money, Percent, Rate};
use crate::MortgageResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Relative tolerance on the present-value residual.
const APR_TOLERANCE: Decimal = dec!(0.0001);

const MAX_APR_ITERATIONS: u32 = 100;

const APR_INITIAL_GUESS: Percent = dec!(5);

/// First adjustment of the monthly rate guess (6% annual).
const APR_INITIAL_STEP: Rate = dec!(0.005);

const APR_STEP_DECAY: Decimal = dec!(0.9);

/// Doublings of the step allowed while looking for a sign change.
const MAX_APR_BRACKETS: u32 = 20;

const APR_RATE_FLOOR: Rate = dec!(-0.99);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a fee amount is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeType {
    #[default]
    Fixed,
    /// `amount` is a percentage of the relevant base (principal, balance or overpayment).
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub amount: Money,
    #[serde(rename = "type", default)]
    pub fee_type: FeeType,
}

/// When the administrative fee is charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeTiming {
    #[default]
    Recurring,
    /// Charged once at origination alongside the origination fee.
    OneTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalCosts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origination_fee: Option<Fee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_insurance: Option<Fee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_repayment_fee: Option<Fee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrative_fee: Option<Fee>,
    #[serde(default)]
    pub administrative_fee_timing: FeeTiming,
}

/// Result of the APR search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AprEstimate {
    /// Annual percentage rate (5.25 = 5.25%).
    pub apr: Percent,
    pub iterations: u32,
    pub converged: bool,
    /// Present value of the cash flows minus net proceeds at the reported rate.
    pub residual: Money,
}

// ---------------------------------------------------------------------------
// Fee application
// ---------------------------------------------------------------------------

impl Fee {
    /// Charge against a one-off base such as the principal or an overpayment.
    fn on_amount(&self, base: Money) -> Money {
        match self.fee_type {
            FeeType::Fixed => self.amount,
            FeeType::Percentage => base * self.amount / dec!(100),
        }
    }

    /// Monthly charge against an outstanding balance; percentages are annual.
    fn monthly_on_balance(&self, balance: Money) -> Money {
        match self.fee_type {
            FeeType::Fixed => self.amount,
            FeeType::Percentage => balance * self.amount / dec!(100) / dec!(12),
        }
    }
}

impl AdditionalCosts {
    pub fn is_empty(&self) -> bool {
        self.origination_fee.is_none()
            && self.loan_insurance.is_none()
            && self.early_repayment_fee.is_none()
            && self.administrative_fee.is_none()
    }

    pub fn validate(&self) -> MortgageResult<()> {
        let fees = [
            ("originationFee", &self.origination_fee),
            ("loanInsurance", &self.loan_insurance),
            ("earlyRepaymentFee", &self.early_repayment_fee),
            ("administrativeFee", &self.administrative_fee),
        ];
        for (field, fee) in fees {
            if let Some(fee) = fee {
                if fee.amount < Decimal::ZERO {
                    return Err(MortgageError::invalid(field, "Fee amount cannot be negative"));
                }
                if fee.fee_type == FeeType::Percentage && fee.amount > dec!(100) {
                    return Err(MortgageError::invalid(
                        field,
                        "Percentage fee cannot exceed 100%",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Fees paid once at origination.
pub fn one_time_fees(principal: Money, costs: &AdditionalCosts) -> Money {
    let origination = costs
        .origination_fee
        .as_ref()
        .map_or(Decimal::ZERO, |f| f.on_amount(principal));
    let administrative = match costs.administrative_fee_timing {
        FeeTiming::OneTime => costs
            .administrative_fee
            .as_ref()
            .map_or(Decimal::ZERO, |f| f.on_amount(principal)),
        FeeTiming::Recurring => Decimal::ZERO,
    };
    round_money(origination + administrative)
}

/// Fees charged in a month whose pre-payment balance is `balance`.
pub fn recurring_fees(balance: Money, costs: &AdditionalCosts) -> Money {
    let insurance = costs
        .loan_insurance
        .as_ref()
        .map_or(Decimal::ZERO, |f| f.monthly_on_balance(balance));
    let administrative = match costs.administrative_fee_timing {
        FeeTiming::Recurring => costs
            .administrative_fee
            .as_ref()
            .map_or(Decimal::ZERO, |f| f.monthly_on_balance(balance)),
        FeeTiming::OneTime => Decimal::ZERO,
    };
    round_money(insurance + administrative)
}

/// Fee charged on a single applied overpayment.
pub fn early_repayment_fee(applied: Money, costs: &AdditionalCosts) -> Money {
    costs
        .early_repayment_fee
        .as_ref()
        .map_or(Decimal::ZERO, |f| round_money(f.on_amount(applied)))
}

// ---------------------------------------------------------------------------
// APR
// ---------------------------------------------------------------------------

/// Annual percentage rate of a loan.
///
/// `cash_flows[m-1]` is everything the borrower pays in month `m` (installment,
/// overpayment and fees). Searches the monthly rate `g` where the present value
/// of the flows equals `principal - one_time_fees`, starting from 5% annual.
///
/// The decaying steps reach at most `step / (1 - decay)` from where they start,
/// so the search first walks out by that reach, doubling the step, until the
/// residual changes sign. It then steps toward the sign of the residual with a
/// step that shrinks by 10% per iteration.
pub fn calculate_apr(
    principal: Money,
    one_time_fees: Money,
    cash_flows: &[Money],
) -> MortgageResult<AprEstimate> {
    if cash_flows.is_empty() {
        return Err(MortgageError::invalid(
            "cash_flows",
            "APR requires at least one payment",
        ));
    }

    let net_proceeds = principal - one_time_fees;
    if net_proceeds <= Decimal::ZERO {
        return Err(MortgageError::invalid(
            "one_time_fees",
            "One-time fees consume the entire principal",
        ));
    }

    let converged = |residual: Decimal| (residual / net_proceeds).abs() < APR_TOLERANCE;

    let mut rate = monthly_rate(APR_INITIAL_GUESS);
    let mut step = APR_INITIAL_STEP;
    let mut residual = present_value(rate, cash_flows)? - net_proceeds;
    let mut brackets = 0;

    while brackets < MAX_APR_BRACKETS && !converged(residual) {
        let reach = step / (Decimal::ONE - APR_STEP_DECAY);
        let trial = if residual > Decimal::ZERO {
            rate + reach
        } else {
            (rate - reach).max(APR_RATE_FLOOR)
        };
        let trial_residual = present_value(trial, cash_flows)? - net_proceeds;
        brackets += 1;

        if converged(trial_residual) {
            return Ok(AprEstimate {
                apr: annualize(trial),
                iterations: brackets,
                converged: true,
                residual: trial_residual,
            });
        }
        if trial_residual.is_sign_positive() != residual.is_sign_positive()
            || trial == APR_RATE_FLOOR
        {
            break;
        }
        rate = trial;
        residual = trial_residual;
        step *= dec!(2);
    }

    for i in 0..MAX_APR_ITERATIONS {
        if i > 0 {
            residual = present_value(rate, cash_flows)? - net_proceeds;
        }

        if converged(residual) {
            return Ok(AprEstimate {
                apr: annualize(rate),
                iterations: brackets + i + 1,
                converged: true,
                residual,
            });
        }

        // Discounted flows worth more than the proceeds: the rate is too low.
        if residual > Decimal::ZERO {
            rate += step;
        } else {
            rate -= step;
        }
        if rate < APR_RATE_FLOOR {
            rate = APR_RATE_FLOOR;
        }
        step *= APR_STEP_DECAY;
    }

    Ok(AprEstimate {
        apr: annualize(rate),
        iterations: brackets + MAX_APR_ITERATIONS,
        converged: false,
        residual,
    })
}

fn annualize(monthly: Rate) -> Percent {
    (monthly * dec!(1200)).round_dp(2)
}
