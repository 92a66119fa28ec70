//! Overpayment strategy search.
//!
//! Builds a fixed family of candidate overpayment plans bounded by the
//! borrower's budget, runs each through the full scenario pipeline, and ranks
//! them against the no-overpayment baseline. Interest savings are discounted
//! at 5% a year so that early money is not credited at face value.

use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MortgageError;
use crate::loan::{LoanDetails, OverpaymentDetails, OverpaymentEffect, OverpaymentFrequency};
use crate::scenario::{run_scenario, CalculationResults};
use crate::time_value::present_value;
use crate::types::{monthly_rate, round_money, with_metadata, ComputationOutput, Money, Percent};
use crate::MortgageResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Annual rate used to discount interest savings.
const PV_DISCOUNT_RATE: Percent = dec!(5);

/// One-time payments below this amount are scored down as noise.
const NOISE_THRESHOLD: Money = dec!(100);

const NOISE_PENALTY: Decimal = dec!(0.1);

/// Weight of the log-scaled bonus for recurring monthly plans.
const MONTHLY_BONUS_WEIGHT: Decimal = dec!(0.1);

/// Share of the monthly budget paid in each third of the baseline term.
const GRADUATED_STAGES: [Decimal; 3] = [dec!(0.5), dec!(0.75), dec!(1)];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the search optimizes for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptimizationStrategy {
    #[default]
    MaximizeInterestSavings,
    MinimizeTime,
    /// Savings per unit of money overpaid, adjusted for term reduction.
    Balanced,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationParameters {
    /// Most the borrower can add to each monthly payment.
    #[serde(default)]
    pub max_monthly_overpayment: Money,
    /// Most the borrower can pay as a single lump sum.
    #[serde(default)]
    pub max_one_time_overpayment: Money,
    #[serde(default)]
    pub strategy: OptimizationStrategy,
    /// Fee charged on the value the optimization delivers (1 = 1%).
    #[serde(default)]
    pub fee_percentage: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationInput {
    pub loan: LoanDetails,
    #[serde(default)]
    pub parameters: OptimizationParameters,
}

/// Shape of a candidate plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    LumpSum,
    MonthlyFixed,
    Combined,
    Graduated,
    Quarterly,
}

/// One evaluated candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverpaymentStrategy {
    pub kind: StrategyKind,
    pub description: String,
    pub overpayments: Vec<OverpaymentDetails>,
    /// Overpayments actually applied, after capping at the balance.
    pub total_overpaid: Money,
    /// Present value of the monthly interest reductions.
    pub interest_saved: Money,
    pub nominal_interest_saved: Money,
    pub term_reduction_months: u32,
    pub new_term_months: u32,
    pub effectiveness_ratio: Decimal,
}

/// Cumulative interest at the end of a year, with and without the chosen plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestComparison {
    pub year: u32,
    pub baseline_cumulative_interest: Money,
    pub optimized_cumulative_interest: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub strategy: OptimizationStrategy,
    pub best: OverpaymentStrategy,
    pub optimized_overpayments: Vec<OverpaymentDetails>,
    pub interest_saved: Money,
    /// Months by which the chosen plan shortens the loan.
    pub time_or_payment_saved: u32,
    pub optimization_value: Money,
    pub optimization_fee: Money,
    pub baseline_total_interest: Money,
    pub optimized_total_interest: Money,
    pub baseline_term_months: u32,
    pub optimized_term_months: u32,
    /// Every candidate, best first under the chosen strategy.
    pub candidates: Vec<OverpaymentStrategy>,
    pub interest_comparison: Vec<InterestComparison>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Finds the overpayment plan that best serves `input.parameters.strategy`.
pub fn optimize_overpayments(
    input: &OptimizationInput,
) -> MortgageResult<ComputationOutput<OptimizationResult>> {
    let start = Instant::now();
    let params = &input.parameters;
    validate_parameters(params)?;

    let baseline_loan = input.loan.with_overpayments(Vec::new());
    let (baseline, mut warnings) = run_scenario(&baseline_loan, &[])?;

    let plans = candidate_plans(params, baseline.actual_term_months);
    if plans.is_empty() {
        return Err(MortgageError::invalid(
            "parameters",
            "No candidate strategies: both overpayment budgets are zero",
        ));
    }

    let mut candidates = Vec::with_capacity(plans.len());
    for (kind, description, overpayments) in plans {
        let loan = input.loan.with_overpayments(overpayments.clone());
        let (results, _) = run_scenario(&loan, &[])?;
        let candidate = evaluate(kind, description, overpayments, &baseline, &results)?;
        log::debug!(
            "{:?}: overpaid {}, saved {} (pv), {} months, ratio {}",
            candidate.kind,
            candidate.total_overpaid,
            candidate.interest_saved,
            candidate.term_reduction_months,
            candidate.effectiveness_ratio
        );
        candidates.push((candidate, results));
    }

    // Stable sort: equal scores keep generation order.
    candidates.sort_by(|(a, _), (b, _)| score(b, params.strategy).cmp(&score(a, params.strategy)));

    let (best, optimized) = candidates
        .first()
        .cloned()
        .ok_or_else(|| MortgageError::invalid("parameters", "No candidate strategies"))?;

    if best.interest_saved <= Decimal::ZERO {
        warnings.push("No candidate reduces the interest paid".to_string());
    }

    let optimization_value = best.interest_saved.max(Decimal::ZERO);
    let optimization_fee = round_money(optimization_value * params.fee_percentage / dec!(100));

    let result = OptimizationResult {
        strategy: params.strategy,
        optimized_overpayments: best.overpayments.clone(),
        interest_saved: best.interest_saved,
        time_or_payment_saved: best.term_reduction_months,
        optimization_value,
        optimization_fee,
        baseline_total_interest: baseline.total_interest,
        optimized_total_interest: optimized.total_interest,
        baseline_term_months: baseline.actual_term_months,
        optimized_term_months: optimized.actual_term_months,
        interest_comparison: interest_comparison(&baseline, &optimized),
        candidates: candidates.into_iter().map(|(c, _)| c).collect(),
        best,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Candidate overpayment plans ranked against a no-overpayment baseline",
        &serde_json::json!({
            "strategy": params.strategy,
            "max_monthly_overpayment": params.max_monthly_overpayment.to_string(),
            "max_one_time_overpayment": params.max_one_time_overpayment.to_string(),
            "pv_discount_rate_pct": PV_DISCOUNT_RATE.to_string(),
            "candidate_effect": "reduce term",
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

fn validate_parameters(params: &OptimizationParameters) -> MortgageResult<()> {
    if params.max_monthly_overpayment < Decimal::ZERO {
        return Err(MortgageError::invalid(
            "maxMonthlyOverpayment",
            "Budget cannot be negative",
        ));
    }
    if params.max_one_time_overpayment < Decimal::ZERO {
        return Err(MortgageError::invalid(
            "maxOneTimeOverpayment",
            "Budget cannot be negative",
        ));
    }
    if params.fee_percentage < Decimal::ZERO || params.fee_percentage > dec!(100) {
        return Err(MortgageError::invalid(
            "feePercentage",
            "Fee percentage must be between 0 and 100",
        ));
    }
    Ok(())
}

type Plan = (StrategyKind, String, Vec<OverpaymentDetails>);

/// Candidate plans in ranking-tiebreak order. A kind whose budget is zero is skipped.
fn candidate_plans(params: &OptimizationParameters, baseline_months: u32) -> Vec<Plan> {
    let monthly = params.max_monthly_overpayment;
    let lump = params.max_one_time_overpayment;
    let effect = OverpaymentEffect::ReduceTerm;
    let mut plans: Vec<Plan> = Vec::new();

    let lump_sum = OverpaymentDetails::one_time(lump, 1, effect);
    let monthly_fixed =
        OverpaymentDetails::recurring(monthly, OverpaymentFrequency::Monthly, 1, None, effect);

    if lump > Decimal::ZERO {
        plans.push((
            StrategyKind::LumpSum,
            format!("Lump sum of {lump} in month 1"),
            vec![lump_sum.clone()],
        ));
    }
    if monthly > Decimal::ZERO {
        plans.push((
            StrategyKind::MonthlyFixed,
            format!("{monthly} every month"),
            vec![monthly_fixed.clone()],
        ));
    }
    if lump > Decimal::ZERO && monthly > Decimal::ZERO {
        plans.push((
            StrategyKind::Combined,
            format!("Lump sum of {lump} in month 1 plus {monthly} every month"),
            vec![lump_sum, monthly_fixed],
        ));
    }
    if monthly > Decimal::ZERO {
        let stage = (baseline_months / 3).max(1);
        let stages = GRADUATED_STAGES
            .iter()
            .enumerate()
            .map(|(i, share)| {
                let i = i as u32;
                let end = (i < 2).then(|| stage * (i + 1));
                OverpaymentDetails::recurring(
                    round_money(monthly * share),
                    OverpaymentFrequency::Monthly,
                    stage * i + 1,
                    end,
                    effect,
                )
            })
            .collect();
        plans.push((
            StrategyKind::Graduated,
            format!("Monthly overpayment rising from 50% to 100% of {monthly} in three stages"),
            stages,
        ));
    }
    if lump > Decimal::ZERO {
        let quarterly = round_money(lump / dec!(4));
        plans.push((
            StrategyKind::Quarterly,
            format!("{quarterly} every quarter"),
            vec![OverpaymentDetails::recurring(
                quarterly,
                OverpaymentFrequency::Quarterly,
                3,
                None,
                effect,
            )],
        ));
    }
    plans
}

fn evaluate(
    kind: StrategyKind,
    description: String,
    overpayments: Vec<OverpaymentDetails>,
    baseline: &CalculationResults,
    results: &CalculationResults,
) -> MortgageResult<OverpaymentStrategy> {
    let total_overpaid: Money = results.overpayments.iter().map(|e| e.applied).sum();

    let interest_diff: Vec<Money> = baseline
        .schedule
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let paid = results
                .schedule
                .get(i)
                .map_or(Decimal::ZERO, |e| e.interest_payment);
            base.interest_payment - paid
        })
        .collect();
    let interest_saved = round_money(present_value(monthly_rate(PV_DISCOUNT_RATE), &interest_diff)?);

    let term_reduction_months = baseline
        .actual_term_months
        .saturating_sub(results.actual_term_months);

    let effectiveness_ratio = if total_overpaid > Decimal::ZERO {
        let term_factor = Decimal::from(term_reduction_months)
            / Decimal::from(baseline.actual_term_months.max(1));
        let mut ratio = interest_saved / total_overpaid * (Decimal::ONE + term_factor);

        if matches!(kind, StrategyKind::MonthlyFixed | StrategyKind::Graduated) {
            let months_paid = Decimal::from(results.overpayments.len() as u32);
            let growth = (Decimal::ONE + months_paid / dec!(12))
                .checked_ln()
                .unwrap_or(Decimal::ZERO);
            ratio *= Decimal::ONE + MONTHLY_BONUS_WEIGHT * growth;
        }

        let small_one_time = overpayments
            .iter()
            .any(|o| o.frequency == OverpaymentFrequency::OneTime && o.amount < NOISE_THRESHOLD);
        if small_one_time {
            ratio *= NOISE_PENALTY;
        }
        ratio.round_dp(4)
    } else {
        Decimal::ZERO
    };

    Ok(OverpaymentStrategy {
        kind,
        description,
        overpayments,
        total_overpaid,
        interest_saved,
        nominal_interest_saved: baseline.total_interest - results.total_interest,
        term_reduction_months,
        new_term_months: results.actual_term_months,
        effectiveness_ratio,
    })
}

/// The quantity a strategy ranks by, higher is better.
fn score(candidate: &OverpaymentStrategy, strategy: OptimizationStrategy) -> Decimal {
    match strategy {
        OptimizationStrategy::MaximizeInterestSavings => candidate.interest_saved,
        OptimizationStrategy::MinimizeTime => Decimal::from(candidate.term_reduction_months),
        OptimizationStrategy::Balanced => candidate.effectiveness_ratio,
    }
}

// ---------------------------------------------------------------------------
// Comparison series
// ---------------------------------------------------------------------------

fn interest_comparison(
    baseline: &CalculationResults,
    optimized: &CalculationResults,
) -> Vec<InterestComparison> {
    let base: Vec<Money> = baseline
        .yearly_data
        .iter()
        .map(|y| y.cumulative_interest)
        .collect();
    let opt: Vec<Money> = optimized
        .yearly_data
        .iter()
        .map(|y| y.cumulative_interest)
        .collect();
    let years = base.len().max(opt.len());

    (0..years)
        .map(|i| InterestComparison {
            year: i as u32 + 1,
            baseline_cumulative_interest: padded(&base, i),
            optimized_cumulative_interest: padded(&opt, i),
        })
        .collect()
}

/// `series[i]`, or its last value once the series has ended.
fn padded(series: &[Money], i: usize) -> Money {
    series
        .get(i)
        .or_else(|| series.last())
        .copied()
        .unwrap_or(Decimal::ZERO)
}
