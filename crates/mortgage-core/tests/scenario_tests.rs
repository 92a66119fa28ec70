use chrono::NaiveDate;
use mortgage_core::fees::{AdditionalCosts, Fee, FeeTiming, FeeType};
use mortgage_core::loan::{
    InterestRatePeriod, LoanDetails, OverpaymentDetails, OverpaymentEffect, OverpaymentFrequency,
    RateChange, RepaymentModel,
};
use mortgage_core::scenario::{aggregate_by_year, calculate_loan, compare_overpayments, ScenarioInput};
use mortgage_core::MortgageError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn scenario(loan: LoanDetails, rate_changes: Vec<RateChange>) -> ScenarioInput {
    ScenarioInput { loan, rate_changes }
}

// ===========================================================================
// Input boundary
// ===========================================================================

#[test]
fn test_scenario_from_json() {
    let json = r#"{
        "principal": "300000",
        "interestRatePeriods": [{"startMonth": 1, "interestRate": "4.5"}],
        "loanTerm": 30,
        "startDate": "2025-01-01",
        "rateChanges": [{"month": 60, "newRate": "3.9"}]
    }"#;
    let input: ScenarioInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.rate_changes.len(), 1);

    let out = calculate_loan(&input).unwrap();
    let r = &out.result;
    assert_eq!(r.monthly_payment, dec!(1520.06));
    assert!(r.schedule[60].monthly_payment < r.schedule[59].monthly_payment);
    assert_eq!(r.payoff_date, NaiveDate::from_ymd_opt(2055, 1, 1));
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_results_serialize_camel_case() {
    let out = calculate_loan(&scenario(
        LoanDetails::fixed_rate(dec!(100000), dec!(5), 10),
        Vec::new(),
    ))
    .unwrap();
    let value = serde_json::to_value(&out).unwrap();
    assert!(value["result"]["monthlyPayment"].is_string());
    assert!(value["result"]["schedule"][0]["paymentNumber"].is_number());
    assert!(value["result"]["yearlyData"][0]["cumulativeInterest"].is_string());
}

#[test]
fn test_invalid_loan_is_rejected() {
    let mut loan = LoanDetails::fixed_rate(dec!(100000), dec!(5), 10);
    loan.interest_rate_periods[0].start_month = 2;
    let err = calculate_loan(&scenario(loan, Vec::new())).unwrap_err();
    assert!(matches!(err, MortgageError::InvalidInput { .. }));
}

#[test]
fn test_rate_change_outside_schedule_is_rejected() {
    let loan = LoanDetails::fixed_rate(dec!(100000), dec!(5), 10);
    let change = RateChange {
        month: 120,
        new_rate: dec!(4),
        remaining_term_years: None,
    };
    let err = calculate_loan(&scenario(loan, vec![change])).unwrap_err();
    assert!(matches!(err, MortgageError::InvalidRateChangeMonth { month: 120, .. }));
}

// ===========================================================================
// Composition order
// ===========================================================================

#[test]
fn test_rate_change_then_overpayment() {
    let mut loan = LoanDetails::fixed_rate(dec!(250000), dec!(5), 25);
    loan.overpayment_plans = vec![OverpaymentDetails::recurring(
        dec!(300),
        OverpaymentFrequency::Monthly,
        1,
        None,
        OverpaymentEffect::ReduceTerm,
    )];
    let with_change = calculate_loan(&scenario(
        loan.clone(),
        vec![RateChange {
            month: 24,
            new_rate: dec!(3),
            remaining_term_years: None,
        }],
    ))
    .unwrap()
    .result;
    let without_change = calculate_loan(&scenario(loan, Vec::new())).unwrap().result;

    assert!(with_change.total_interest < without_change.total_interest);
    assert!(with_change.actual_term_months < 300);
    assert!(with_change.overpayments.iter().all(|e| e.requested == dec!(300)));
}

#[test]
fn test_remaining_term_override_extends_schedule() {
    let loan = LoanDetails::fixed_rate(dec!(200000), dec!(5), 20);
    let out = calculate_loan(&scenario(
        loan,
        vec![RateChange {
            month: 60,
            new_rate: dec!(5),
            remaining_term_years: Some(dec!(25)),
        }],
    ))
    .unwrap();
    assert_eq!(out.result.schedule.len(), 60 + 300);
    assert_eq!(out.result.actual_term, dec!(30));
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_stepped_rate_periods_with_decreasing_model() {
    let loan = LoanDetails {
        interest_rate_periods: vec![
            InterestRatePeriod { start_month: 1, interest_rate: dec!(2.5) },
            InterestRatePeriod { start_month: 61, interest_rate: dec!(5.5) },
        ],
        repayment_model: RepaymentModel::DecreasingInstallments,
        ..LoanDetails::fixed_rate(dec!(180000), dec!(0), 15)
    };
    let r = calculate_loan(&scenario(loan, Vec::new())).unwrap().result;
    assert_eq!(r.schedule[0].principal_payment, dec!(1000));
    assert_eq!(r.schedule[60].principal_payment, dec!(1000));
    assert!(r.schedule[60].interest_payment > r.schedule[59].interest_payment);
    assert_eq!(r.schedule.last().unwrap().balance, Decimal::ZERO);
}

// ===========================================================================
// Totals and fees
// ===========================================================================

#[test]
fn test_yearly_aggregation_matches_schedule() {
    let mut loan = LoanDetails::fixed_rate(dec!(120000), dec!(4), 10);
    loan.overpayment_plans = vec![OverpaymentDetails::one_time(
        dec!(5000),
        18,
        OverpaymentEffect::ReducePayment,
    )];
    let r = calculate_loan(&scenario(loan, Vec::new())).unwrap().result;
    assert_eq!(aggregate_by_year(&r.schedule), r.yearly_data);

    let second = &r.yearly_data[1];
    assert_eq!(second.overpayment, dec!(5000));
    let principal: Decimal = r.yearly_data.iter().map(|y| y.principal).sum();
    assert_eq!(principal, dec!(120000));
}

#[test]
fn test_total_cost_includes_every_fee() {
    let mut loan = LoanDetails::fixed_rate(dec!(150000), dec!(4.2), 20);
    loan.overpayment_plans = vec![OverpaymentDetails::one_time(
        dec!(10000),
        36,
        OverpaymentEffect::ReduceTerm,
    )];
    loan.additional_costs = Some(AdditionalCosts {
        origination_fee: Some(Fee { amount: dec!(1500), fee_type: FeeType::Fixed }),
        loan_insurance: Some(Fee { amount: dec!(0.12), fee_type: FeeType::Percentage }),
        early_repayment_fee: Some(Fee { amount: dec!(2), fee_type: FeeType::Percentage }),
        administrative_fee: Some(Fee { amount: dec!(250), fee_type: FeeType::Fixed }),
        administrative_fee_timing: FeeTiming::OneTime,
    });
    let r = calculate_loan(&scenario(loan, Vec::new())).unwrap().result;

    assert_eq!(r.one_time_fees, dec!(1750));
    assert_eq!(r.early_repayment_fees, dec!(200));
    // 0.12% a year on the opening balance, charged monthly
    assert_eq!(r.schedule[0].fees, Some(dec!(15)));
    assert_eq!(
        r.total_cost,
        dec!(150000) + r.total_interest + r.one_time_fees + r.recurring_fees + r.early_repayment_fees
    );
    assert!(r.apr > dec!(4.2));
}

#[test]
fn test_apr_matches_nominal_rate_without_fees() {
    let r = calculate_loan(&scenario(
        LoanDetails::fixed_rate(dec!(200000), dec!(3.5), 15),
        Vec::new(),
    ))
    .unwrap()
    .result;
    assert!((r.apr - dec!(3.5)).abs() <= dec!(0.02), "apr = {}", r.apr);
    assert_eq!(r.recurring_fees, Decimal::ZERO);
    assert!(r.schedule.iter().all(|e| e.fees.is_none()));
}

#[test]
fn test_actual_term_is_months_over_twelve() {
    let mut loan = LoanDetails::fixed_rate(dec!(100000), dec!(5), 10);
    loan.overpayment_plans = vec![OverpaymentDetails::one_time(
        dec!(3000),
        1,
        OverpaymentEffect::ReduceTerm,
    )];
    let r = calculate_loan(&scenario(loan, Vec::new())).unwrap().result;
    assert!(r.actual_term_months < 120);
    assert_eq!(r.actual_term, Decimal::from(r.actual_term_months) / dec!(12));
}

// ===========================================================================
// Extreme rates
// ===========================================================================

#[test]
fn test_two_hundred_percent_loan_is_computed() {
    let out = calculate_loan(&scenario(
        LoanDetails::fixed_rate(dec!(1000000), dec!(200), 30),
        Vec::new(),
    ))
    .unwrap();
    let r = &out.result;
    assert_eq!(r.monthly_payment, dec!(166666.67));
    assert_eq!(r.schedule.len(), 360);
    assert_eq!(r.schedule.last().unwrap().balance, Decimal::ZERO);
}

#[test]
fn test_unrepresentable_rate_is_an_input_error() {
    let err = calculate_loan(&scenario(
        LoanDetails::fixed_rate(dec!(1000000), dec!(200), 50),
        Vec::new(),
    ))
    .unwrap_err();
    assert!(matches!(err, MortgageError::InvalidInput { .. }));
}

#[test]
fn test_apr_of_high_rate_loan() {
    let out = calculate_loan(&scenario(
        LoanDetails::fixed_rate(dec!(100000), dec!(80), 10),
        Vec::new(),
    ))
    .unwrap();
    assert!((out.result.apr - dec!(80)).abs() <= dec!(0.05), "apr = {}", out.result.apr);
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
}

// ===========================================================================
// Overpayment impact
// ===========================================================================

#[test]
fn test_compare_reduce_payment_plan() {
    let mut loan = LoanDetails::fixed_rate(dec!(300000), dec!(4.5), 30);
    loan.overpayment_plans = vec![OverpaymentDetails::one_time(
        dec!(50000),
        60,
        OverpaymentEffect::ReducePayment,
    )];
    let impact = compare_overpayments(&scenario(loan, Vec::new())).unwrap().result;

    assert_eq!(impact.months_saved, 0);
    assert_eq!(impact.scenario_term_months, 360);
    assert_eq!(impact.total_overpaid, dec!(50000));
    assert!(impact.post_overpayment_monthly_payment < impact.baseline_monthly_payment);
    assert!(impact.interest_saved > Decimal::ZERO);
}

#[test]
fn test_compare_without_plans_is_neutral() {
    let impact = compare_overpayments(&scenario(
        LoanDetails::fixed_rate(dec!(100000), dec!(6), 15),
        Vec::new(),
    ))
    .unwrap()
    .result;
    assert_eq!(impact.interest_saved, Decimal::ZERO);
    assert_eq!(impact.months_saved, 0);
    assert_eq!(impact.baseline_total_cost, impact.scenario_total_cost);
}
