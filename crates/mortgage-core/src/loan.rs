use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MortgageError;
use crate::fees::AdditionalCosts;
use crate::types::{Money, Percent, Years};
use crate::MortgageResult;

/// How each installment is split between principal and interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepaymentModel {
    /// Annuity: level payment, recast whenever the rate changes.
    #[default]
    EqualInstallments,
    /// Constant principal portion, interest on the outstanding balance.
    DecreasingInstallments,
}

/// Annual rate in force from `start_month` until the next period starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRatePeriod {
    pub start_month: u32,
    pub interest_rate: Percent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverpaymentFrequency {
    #[default]
    #[serde(alias = "oneTime")]
    OneTime,
    Monthly,
    Quarterly,
    Annual,
}

/// What the loan does with the money saved by an overpayment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverpaymentEffect {
    /// Same payment, fewer months.
    #[default]
    ReduceTerm,
    /// Same number of months, smaller payment.
    ReducePayment,
}

/// A declared overpayment rule. Either `start_month` or `start_date` must be set;
/// dates are converted to payment numbers relative to the loan start date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverpaymentDetails {
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency: OverpaymentFrequency,
    #[serde(default)]
    pub effect: OverpaymentEffect,
}

impl OverpaymentDetails {
    pub fn one_time(amount: Money, month: u32, effect: OverpaymentEffect) -> Self {
        OverpaymentDetails {
            amount,
            start_month: Some(month),
            start_date: None,
            end_month: None,
            end_date: None,
            is_recurring: false,
            frequency: OverpaymentFrequency::OneTime,
            effect,
        }
    }

    pub fn recurring(
        amount: Money,
        frequency: OverpaymentFrequency,
        start_month: u32,
        end_month: Option<u32>,
        effect: OverpaymentEffect,
    ) -> Self {
        OverpaymentDetails {
            amount,
            start_month: Some(start_month),
            start_date: None,
            end_month,
            end_date: None,
            is_recurring: true,
            frequency,
            effect,
        }
    }
}

/// A mid-term change of the interest rate, effective from the month after `month`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateChange {
    pub month: u32,
    pub new_rate: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_term_years: Option<Years>,
}

/// Everything the engine needs to know about a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetails {
    pub principal: Money,
    pub interest_rate_periods: Vec<InterestRatePeriod>,
    /// Term in whole years.
    pub loan_term: u32,
    #[serde(default)]
    pub repayment_model: RepaymentModel,
    #[serde(default)]
    pub overpayment_plans: Vec<OverpaymentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_costs: Option<AdditionalCosts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LoanDetails {
    /// Single-rate loan with equal installments and nothing else attached.
    pub fn fixed_rate(principal: Money, annual_rate: Percent, loan_term: u32) -> Self {
        LoanDetails {
            principal,
            interest_rate_periods: vec![InterestRatePeriod {
                start_month: 1,
                interest_rate: annual_rate,
            }],
            loan_term,
            repayment_model: RepaymentModel::EqualInstallments,
            overpayment_plans: Vec::new(),
            start_date: None,
            additional_costs: None,
            name: None,
        }
    }

    pub fn total_months(&self) -> u32 {
        self.loan_term.saturating_mul(12)
    }

    /// The same loan with its overpayment plans replaced.
    pub fn with_overpayments(&self, plans: Vec<OverpaymentDetails>) -> Self {
        LoanDetails {
            overpayment_plans: plans,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> MortgageResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(MortgageError::invalid(
                "principal",
                "Principal must be positive",
            ));
        }
        if self.loan_term == 0 {
            return Err(MortgageError::invalid(
                "loanTerm",
                "Loan term must be at least 1 year",
            ));
        }
        validate_rate_periods(&self.interest_rate_periods)?;
        if let Some(costs) = &self.additional_costs {
            costs.validate()?;
        }
        Ok(())
    }
}

/// Checks a rate-period list: non-empty, covering month 1, distinct start months,
/// no negative rates. Order is not required.
pub fn validate_rate_periods(periods: &[InterestRatePeriod]) -> MortgageResult<()> {
    if periods.is_empty() {
        return Err(MortgageError::invalid(
            "interestRatePeriods",
            "At least one interest rate period is required",
        ));
    }

    let mut starts: Vec<u32> = Vec::with_capacity(periods.len());
    for p in periods {
        if p.start_month == 0 {
            return Err(MortgageError::invalid(
                "interestRatePeriods",
                "Start months are 1-based",
            ));
        }
        if p.interest_rate < Decimal::ZERO {
            return Err(MortgageError::invalid(
                "interestRatePeriods",
                format!("Negative rate {} from month {}", p.interest_rate, p.start_month),
            ));
        }
        if starts.contains(&p.start_month) {
            return Err(MortgageError::invalid(
                "interestRatePeriods",
                format!("Duplicate period starting at month {}", p.start_month),
            ));
        }
        starts.push(p.start_month);
    }

    if !starts.contains(&1) {
        return Err(MortgageError::invalid(
            "interestRatePeriods",
            "Rate periods must cover month 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_rate_loan_is_valid() {
        let loan = LoanDetails::fixed_rate(dec!(300000), dec!(4.5), 30);
        assert!(loan.validate().is_ok());
        assert_eq!(loan.total_months(), 360);
    }

    #[test]
    fn test_rejects_non_positive_principal() {
        let loan = LoanDetails::fixed_rate(Decimal::ZERO, dec!(4.5), 30);
        assert!(matches!(
            loan.validate(),
            Err(MortgageError::InvalidInput { ref field, .. }) if field == "principal"
        ));
    }

    #[test]
    fn test_rejects_zero_term() {
        let loan = LoanDetails::fixed_rate(dec!(1000), dec!(4.5), 0);
        assert!(loan.validate().is_err());
    }

    #[test]
    fn test_rate_periods_must_start_at_month_one() {
        let periods = vec![InterestRatePeriod {
            start_month: 13,
            interest_rate: dec!(4),
        }];
        assert!(validate_rate_periods(&periods).is_err());
    }

    #[test]
    fn test_rate_periods_reject_duplicates_and_negatives() {
        let dup = vec![
            InterestRatePeriod { start_month: 1, interest_rate: dec!(4) },
            InterestRatePeriod { start_month: 1, interest_rate: dec!(5) },
        ];
        assert!(validate_rate_periods(&dup).is_err());

        let neg = vec![InterestRatePeriod { start_month: 1, interest_rate: dec!(-1) }];
        assert!(validate_rate_periods(&neg).is_err());
    }

    #[test]
    fn test_deserialize_camel_case_loan() {
        let json = r#"{
            "principal": "250000",
            "interestRatePeriods": [{"startMonth": 1, "interestRate": "5.5"}],
            "loanTerm": 25,
            "repaymentModel": "decreasingInstallments",
            "overpaymentPlans": [
                {"amount": "200", "startMonth": 6, "endMonth": 18,
                 "isRecurring": true, "frequency": "monthly", "effect": "reducePayment"}
            ],
            "startDate": "2024-01-15"
        }"#;
        let loan: LoanDetails = serde_json::from_str(json).unwrap();
        assert_eq!(loan.repayment_model, RepaymentModel::DecreasingInstallments);
        assert_eq!(loan.overpayment_plans[0].frequency, OverpaymentFrequency::Monthly);
        assert_eq!(loan.overpayment_plans[0].effect, OverpaymentEffect::ReducePayment);
        assert_eq!(loan.start_date, NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn test_one_time_frequency_accepts_both_spellings() {
        let a: OverpaymentFrequency = serde_json::from_str(r#""one-time""#).unwrap();
        let b: OverpaymentFrequency = serde_json::from_str(r#""oneTime""#).unwrap();
        assert_eq!(a, OverpaymentFrequency::OneTime);
        assert_eq!(b, OverpaymentFrequency::OneTime);
    }
}
