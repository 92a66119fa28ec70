//! Compact loan calculation for agent tool calls: a flat input, headline
//! figures and a schedule summary instead of the full month-by-month table.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::ScheduleEntry;
use crate::fees::AdditionalCosts;
use crate::loan::{InterestRatePeriod, LoanDetails, OverpaymentDetails, RepaymentModel};
use crate::scenario::{run_scenario, YearlySummary};
use crate::types::{Money, Percent, Years};
use crate::MortgageResult;

pub const LOAN_TOOL_NAME: &str = "calculate_mortgage";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanToolInput {
    pub principal: Money,
    pub interest_rate_periods: Vec<InterestRatePeriod>,
    /// Term in years.
    pub loan_term: u32,
    #[serde(default)]
    pub overpayment_plans: Vec<OverpaymentDetails>,
    #[serde(default)]
    pub additional_costs: Option<AdditionalCosts>,
    #[serde(default)]
    pub repayment_model: RepaymentModel,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub number_of_payments: u32,
    pub first_payment: Money,
    pub last_payment: Money,
    pub final_balance: Money,
    pub total_paid: Money,
    pub total_overpaid: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub yearly: Vec<YearlySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanToolOutput {
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_cost: Money,
    pub apr: Percent,
    pub actual_term: Years,
    pub schedule_summary: ScheduleSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<&LoanToolInput> for LoanDetails {
    fn from(input: &LoanToolInput) -> Self {
        LoanDetails {
            principal: input.principal,
            interest_rate_periods: input.interest_rate_periods.clone(),
            loan_term: input.loan_term,
            repayment_model: input.repayment_model,
            overpayment_plans: input.overpayment_plans.clone(),
            start_date: input.start_date,
            additional_costs: input.additional_costs.clone(),
            name: None,
        }
    }
}

/// Runs the full calculation and condenses it for a tool response.
pub fn run_loan_tool(input: &LoanToolInput) -> MortgageResult<LoanToolOutput> {
    let loan = LoanDetails::from(input);
    let (results, warnings) = run_scenario(&loan, &[])?;

    let schedule_summary = summarize(&results.schedule, results.payoff_date, results.yearly_data);

    Ok(LoanToolOutput {
        monthly_payment: results.monthly_payment,
        total_interest: results.total_interest,
        total_cost: results.total_cost,
        apr: results.apr,
        actual_term: results.actual_term,
        schedule_summary,
        warnings,
    })
}

fn summarize(
    schedule: &[ScheduleEntry],
    payoff_date: Option<NaiveDate>,
    yearly: Vec<YearlySummary>,
) -> ScheduleSummary {
    let first = schedule.first();
    let last = schedule.last();
    ScheduleSummary {
        number_of_payments: schedule.len() as u32,
        first_payment: first.map_or(Decimal::ZERO, |e| e.monthly_payment),
        last_payment: last.map_or(Decimal::ZERO, |e| e.monthly_payment),
        final_balance: last.map_or(Decimal::ZERO, |e| e.balance),
        total_paid: last.map_or(Decimal::ZERO, |e| e.total_payment),
        total_overpaid: schedule.iter().map(|e| e.overpayment_amount).sum(),
        payoff_date,
        yearly,
    }
}

/// Tool definition in the name / description / JSON-schema form agent runtimes expect.
pub fn loan_tool_definition() -> serde_json::Value {
    // Decimals travel as strings so no precision is lost in transit.
    let decimal = serde_json::json!({ "type": "string", "pattern": "^-?[0-9]+(\\.[0-9]+)?$" });
    let fee = serde_json::json!({
        "type": "object",
        "properties": {
            "amount": decimal,
            "type": { "type": "string", "enum": ["fixed", "percentage"] }
        },
        "required": ["amount"]
    });

    serde_json::json!({
        "name": LOAN_TOOL_NAME,
        "description": "Calculate a mortgage: monthly payment, total interest, total cost, APR \
                        and payoff term, with optional rate periods, overpayments and fees.",
        "input_schema": {
            "type": "object",
            "properties": {
                "principal": decimal,
                "interestRatePeriods": {
                    "type": "array",
                    "minItems": 1,
                    "description": "Annual rates in percent; the first period must start at month 1",
                    "items": {
                        "type": "object",
                        "properties": {
                            "startMonth": { "type": "integer", "minimum": 1 },
                            "interestRate": decimal
                        },
                        "required": ["startMonth", "interestRate"]
                    }
                },
                "loanTerm": { "type": "integer", "minimum": 1, "maximum": 50, "description": "Term in years" },
                "repaymentModel": {
                    "type": "string",
                    "enum": ["equalInstallments", "decreasingInstallments"]
                },
                "startDate": { "type": "string", "format": "date" },
                "overpaymentPlans": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "amount": decimal,
                            "startMonth": { "type": "integer", "minimum": 1 },
                            "startDate": { "type": "string", "format": "date" },
                            "endMonth": { "type": "integer", "minimum": 1 },
                            "endDate": { "type": "string", "format": "date" },
                            "isRecurring": { "type": "boolean" },
                            "frequency": {
                                "type": "string",
                                "enum": ["one-time", "monthly", "quarterly", "annual"]
                            },
                            "effect": { "type": "string", "enum": ["reduceTerm", "reducePayment"] }
                        },
                        "required": ["amount"]
                    }
                },
                "additionalCosts": {
                    "type": "object",
                    "properties": {
                        "originationFee": fee,
                        "loanInsurance": fee,
                        "earlyRepaymentFee": fee,
                        "administrativeFee": fee,
                        "administrativeFeeTiming": { "type": "string", "enum": ["recurring", "oneTime"] }
                    }
                }
            },
            "required": ["principal", "interestRatePeriods", "loanTerm"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> LoanToolInput {
        serde_json::from_value(serde_json::json!({
            "principal": "200000",
            "interestRatePeriods": [{"startMonth": 1, "interestRate": "3.5"}],
            "loanTerm": 15
        }))
        .unwrap()
    }

    #[test]
    fn test_tool_headline_figures() {
        let out = run_loan_tool(&input()).unwrap();
        assert_eq!(out.monthly_payment, dec!(1429.77));
        assert_eq!(out.actual_term, dec!(15));
        assert_eq!(out.schedule_summary.number_of_payments, 180);
        assert_eq!(out.schedule_summary.final_balance, Decimal::ZERO);
        assert_eq!(out.schedule_summary.yearly.len(), 15);
        assert_eq!(out.total_cost, dec!(200000) + out.total_interest);
    }

    #[test]
    fn test_tool_summary_counts_overpayments() {
        let mut tool = input();
        tool.overpayment_plans = vec![OverpaymentDetails::one_time(
            dec!(20000),
            12,
            Default::default(),
        )];
        let out = run_loan_tool(&tool).unwrap();
        assert_eq!(out.schedule_summary.total_overpaid, dec!(20000));
        assert!(out.schedule_summary.number_of_payments < 180);
    }

    #[test]
    fn test_definition_names_required_fields() {
        let def = loan_tool_definition();
        assert_eq!(def["name"], LOAN_TOOL_NAME);
        let required = def["input_schema"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        assert!(def["input_schema"]["properties"]["additionalCosts"]["properties"]["loanInsurance"]
            .is_object());
    }
}
