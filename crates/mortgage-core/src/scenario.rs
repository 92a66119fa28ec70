//! Scenario composition: base schedule, then rate changes, then overpayments,
//! then totals. The order is fixed; each stage consumes the previous stage's
//! schedule.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{
    apply_rate_change, generate_schedule, months_to_payoff, perform_overpayments,
    OverpaymentEvent, ScheduleEntry, ScheduleTerms,
};
use crate::fees::{
    calculate_apr, early_repayment_fee, one_time_fees, recurring_fees, AdditionalCosts,
};
use crate::loan::{LoanDetails, RateChange};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::MortgageResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A loan plus the rate changes to splice into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInput {
    #[serde(flatten)]
    pub loan: LoanDetails,
    #[serde(default)]
    pub rate_changes: Vec<RateChange>,
}

/// Twelve consecutive schedule entries summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySummary {
    pub year: u32,
    pub principal: Money,
    pub interest: Money,
    /// Installments plus overpayments.
    pub payment: Money,
    pub overpayment: Money,
    pub fees: Money,
    /// Balance after the last month of the year.
    pub balance: Money,
    /// Interest paid from the first month through the end of this year.
    pub cumulative_interest: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResults {
    /// Installment of the first month.
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub schedule: Vec<ScheduleEntry>,
    pub yearly_data: Vec<YearlySummary>,
    /// Contractual term in years.
    pub original_term: u32,
    /// Months until the balance reaches zero, in years.
    pub actual_term: Years,
    pub actual_term_months: u32,
    pub one_time_fees: Money,
    pub recurring_fees: Money,
    pub early_repayment_fees: Money,
    /// Principal, interest and every fee.
    pub total_cost: Money,
    pub apr: Percent,
    pub overpayments: Vec<OverpaymentEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
}

/// Same loan and rate changes with and without the overpayment plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverpaymentImpact {
    pub baseline_total_interest: Money,
    pub scenario_total_interest: Money,
    pub interest_saved: Money,
    pub baseline_term_months: u32,
    pub scenario_term_months: u32,
    pub months_saved: u32,
    pub total_overpaid: Money,
    pub baseline_monthly_payment: Money,
    /// Installment in the month after the last overpayment.
    pub post_overpayment_monthly_payment: Money,
    pub baseline_total_cost: Money,
    pub scenario_total_cost: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Full calculation for one loan: schedule, totals, fees and APR.
pub fn calculate_loan(
    input: &ScenarioInput,
) -> MortgageResult<ComputationOutput<CalculationResults>> {
    let start = Instant::now();
    let (results, warnings) = run_scenario(&input.loan, &input.rate_changes)?;
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Amortization schedule with rate changes and overpayments",
        &serde_json::json!({
            "principal": input.loan.principal.to_string(),
            "loan_term_years": input.loan.loan_term,
            "repayment_model": input.loan.repayment_model,
            "rate_periods": input.loan.interest_rate_periods.len(),
            "rate_changes": input.rate_changes.len(),
            "overpayment_plans": input.loan.overpayment_plans.len(),
            "rounding": "half-up to the cent at every monetary step",
        }),
        warnings,
        elapsed,
        results,
    ))
}

/// What the overpayment plans of `input` are worth against the same loan without them.
pub fn compare_overpayments(
    input: &ScenarioInput,
) -> MortgageResult<ComputationOutput<OverpaymentImpact>> {
    let start = Instant::now();

    let baseline_loan = input.loan.with_overpayments(Vec::new());
    let (baseline, _) = run_scenario(&baseline_loan, &input.rate_changes)?;
    let (scenario, warnings) = run_scenario(&input.loan, &input.rate_changes)?;

    let post_overpayment_monthly_payment = scenario
        .overpayments
        .last()
        .and_then(|e| scenario.schedule.get(e.month as usize))
        .map_or(scenario.monthly_payment, |e| e.monthly_payment);

    let impact = OverpaymentImpact {
        baseline_total_interest: baseline.total_interest,
        scenario_total_interest: scenario.total_interest,
        interest_saved: baseline.total_interest - scenario.total_interest,
        baseline_term_months: baseline.actual_term_months,
        scenario_term_months: scenario.actual_term_months,
        months_saved: baseline
            .actual_term_months
            .saturating_sub(scenario.actual_term_months),
        total_overpaid: scenario.overpayments.iter().map(|e| e.applied).sum(),
        baseline_monthly_payment: baseline.monthly_payment,
        post_overpayment_monthly_payment,
        baseline_total_cost: baseline.total_cost,
        scenario_total_cost: scenario.total_cost,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Overpayment impact versus no-overpayment baseline",
        &serde_json::json!({
            "overpayment_plans": input.loan.overpayment_plans.len(),
            "rate_changes": input.rate_changes.len(),
        }),
        warnings,
        elapsed,
        impact,
    ))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs the four stages and returns the results with any caller-facing warnings.
pub(crate) fn run_scenario(
    loan: &LoanDetails,
    rate_changes: &[RateChange],
) -> MortgageResult<(CalculationResults, Vec<String>)> {
    let mut warnings: Vec<String> = Vec::new();
    loan.validate()?;

    let mut terms = ScheduleTerms::from_loan(loan)?;
    let mut schedule = generate_schedule(loan.principal, loan.total_months(), &terms)?;
    log::debug!(
        "base schedule: {} months at {} rate period(s)",
        schedule.len(),
        terms.rate_periods().len()
    );

    let mut changes = rate_changes.to_vec();
    changes.sort_by_key(|c| c.month);
    for change in &changes {
        let spliced = apply_rate_change(&schedule, change, &terms)?;
        if spliced.schedule.len() > schedule.len() {
            warnings.push(format!(
                "Rate change at month {} extends the schedule from {} to {} months",
                change.month,
                schedule.len(),
                spliced.schedule.len()
            ));
        }
        log::debug!(
            "rate change at month {} to {}%: {} -> {} months",
            change.month,
            change.new_rate,
            schedule.len(),
            spliced.schedule.len()
        );
        schedule = spliced.schedule;
        terms = spliced.terms;
    }

    let outcome = perform_overpayments(&schedule, &loan.overpayment_plans, &terms)?;
    for event in outcome.events.iter().filter(|e| e.applied < e.requested) {
        warnings.push(format!(
            "Overpayment of {} in month {} capped at the outstanding balance ({})",
            event.requested, event.month, event.applied
        ));
    }
    log::debug!(
        "{} overpayment event(s), schedule now {} months",
        outcome.events.len(),
        outcome.schedule.len()
    );

    let costs = loan.additional_costs.clone().unwrap_or_default();
    let results = finalize(loan, outcome.schedule, outcome.events, &costs, &mut warnings)?;
    Ok((results, warnings))
}

fn finalize(
    loan: &LoanDetails,
    schedule: Vec<ScheduleEntry>,
    events: Vec<OverpaymentEvent>,
    costs: &AdditionalCosts,
    warnings: &mut Vec<String>,
) -> MortgageResult<CalculationResults> {
    let has_costs = !costs.is_empty();

    let mut opening = loan.principal;
    let schedule: Vec<ScheduleEntry> = schedule
        .into_iter()
        .map(|mut entry| {
            if has_costs {
                entry.fees = Some(recurring_fees(opening, costs));
            }
            opening = entry.balance;
            entry
        })
        .collect();

    let early_fee_by_month: Vec<(u32, Money)> = events
        .iter()
        .map(|e| (e.month, early_repayment_fee(e.applied, costs)))
        .collect();

    let cash_flows: Vec<Money> = schedule
        .iter()
        .map(|e| {
            let early: Money = early_fee_by_month
                .iter()
                .filter(|(m, _)| *m == e.payment_number)
                .map(|(_, fee)| *fee)
                .sum();
            e.monthly_payment + e.overpayment_amount + e.fees.unwrap_or_default() + early
        })
        .collect();

    let total_interest: Money = schedule.iter().map(|e| e.interest_payment).sum();
    let recurring: Money = schedule.iter().filter_map(|e| e.fees).sum();
    let early_repayment: Money = early_fee_by_month.iter().map(|(_, fee)| *fee).sum();
    let one_time = one_time_fees(loan.principal, costs);
    let total_cost = loan.principal + total_interest + one_time + recurring + early_repayment;

    let apr = calculate_apr(loan.principal, one_time, &cash_flows)?;
    if !apr.converged {
        warnings.push(format!(
            "APR search stopped after {} iterations (residual {})",
            apr.iterations,
            apr.residual.round_dp(2)
        ));
    }

    let payoff_months = months_to_payoff(&schedule);
    let payoff_date = schedule
        .get(payoff_months.saturating_sub(1))
        .and_then(|e| e.payment_date);

    Ok(CalculationResults {
        monthly_payment: schedule
            .first()
            .map_or(Decimal::ZERO, |e| e.monthly_payment),
        total_interest,
        yearly_data: aggregate_by_year(&schedule),
        original_term: loan.loan_term,
        actual_term: Decimal::from(payoff_months as u32) / dec!(12),
        actual_term_months: payoff_months as u32,
        one_time_fees: one_time,
        recurring_fees: recurring,
        early_repayment_fees: early_repayment,
        total_cost,
        apr: apr.apr,
        overpayments: events,
        payoff_date,
        schedule,
    })
}

/// Sums a schedule into 12-month buckets; a trailing partial year gets its own bucket.
pub fn aggregate_by_year(schedule: &[ScheduleEntry]) -> Vec<YearlySummary> {
    schedule
        .chunks(12)
        .enumerate()
        .map(|(i, months)| {
            let mut year = YearlySummary {
                year: i as u32 + 1,
                principal: Decimal::ZERO,
                interest: Decimal::ZERO,
                payment: Decimal::ZERO,
                overpayment: Decimal::ZERO,
                fees: Decimal::ZERO,
                balance: Decimal::ZERO,
                cumulative_interest: Decimal::ZERO,
            };
            for e in months {
                year.principal += e.principal_payment + e.overpayment_amount;
                year.interest += e.interest_payment;
                year.payment += e.monthly_payment + e.overpayment_amount;
                year.overpayment += e.overpayment_amount;
                year.fees += e.fees.unwrap_or_default();
            }
            if let Some(last) = months.last() {
                year.balance = last.balance;
                year.cumulative_interest = last.total_interest;
            }
            year
        })
        .collect()
}
