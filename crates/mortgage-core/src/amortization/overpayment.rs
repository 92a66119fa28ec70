use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::schedule::{amortize, Installments};
use super::{with_running_totals, ScheduleEntry, ScheduleTerms};
use crate::error::MortgageError;
use crate::loan::{OverpaymentDetails, OverpaymentEffect, OverpaymentFrequency};
use crate::types::{round_money, Money};
use crate::MortgageResult;

/// An overpayment rule with its calendar dates turned into payment numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOverpayment {
    pub amount: Money,
    pub start_month: u32,
    pub end_month: Option<u32>,
    pub is_recurring: bool,
    pub frequency: OverpaymentFrequency,
    pub effect: OverpaymentEffect,
}

/// One overpayment actually applied to a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverpaymentEvent {
    pub month: u32,
    /// Sum of every rule firing in the month.
    pub requested: Money,
    /// Requested amount capped at the outstanding balance.
    pub applied: Money,
    pub effect: OverpaymentEffect,
}

#[derive(Debug, Clone)]
pub struct OverpaymentOutcome {
    pub schedule: Vec<ScheduleEntry>,
    pub events: Vec<OverpaymentEvent>,
}

/// Whole calendar months from `from` to `to`, ignoring the day of month.
pub fn month_offset(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

/// Payment number falling in the calendar month of `date`; dates on or before
/// the loan start map to the first payment.
fn payment_number_at(loan_start: NaiveDate, date: NaiveDate) -> u32 {
    u32::try_from(month_offset(loan_start, date).max(1)).unwrap_or(u32::MAX)
}

impl OverpaymentDetails {
    pub fn resolve(&self, loan_start: Option<NaiveDate>) -> MortgageResult<ResolvedOverpayment> {
        if self.amount <= Decimal::ZERO {
            return Err(MortgageError::invalid(
                "overpayment.amount",
                "Overpayment amount must be positive",
            ));
        }

        let start_month = match (self.start_month, self.start_date, loan_start) {
            (Some(0), _, _) => {
                return Err(MortgageError::invalid(
                    "overpayment.startMonth",
                    "Start month is 1-based",
                ))
            }
            (Some(month), _, _) => month,
            (None, Some(date), Some(anchor)) => payment_number_at(anchor, date),
            (None, Some(_), None) => {
                return Err(MortgageError::DateError(
                    "Overpayment start date given but the loan has no start date".into(),
                ))
            }
            (None, None, _) => {
                return Err(MortgageError::invalid(
                    "overpayment.startMonth",
                    "Either startMonth or startDate is required",
                ))
            }
        };

        let end_month = match (self.end_month, self.end_date, loan_start) {
            (Some(month), _, _) => Some(month),
            (None, Some(date), Some(anchor)) => Some(payment_number_at(anchor, date)),
            (None, Some(_), None) => {
                return Err(MortgageError::DateError(
                    "Overpayment end date given but the loan has no start date".into(),
                ))
            }
            (None, None, _) => None,
        };

        Ok(ResolvedOverpayment {
            amount: self.amount,
            start_month,
            end_month,
            is_recurring: self.is_recurring,
            frequency: self.frequency,
            effect: self.effect,
        })
    }
}

impl ResolvedOverpayment {
    /// Whether this rule pays in `month`.
    pub fn applies(&self, month: u32) -> bool {
        if month < self.start_month {
            return false;
        }
        if self.end_month.is_some_and(|end| month > end) {
            return false;
        }
        if !self.is_recurring {
            return month == self.start_month;
        }

        let elapsed = month - self.start_month;
        match self.frequency {
            OverpaymentFrequency::OneTime => elapsed == 0,
            OverpaymentFrequency::Monthly => true,
            OverpaymentFrequency::Quarterly => elapsed % 3 == 0,
            OverpaymentFrequency::Annual => elapsed % 12 == 0,
        }
    }
}

/// Whether `overpayment` fires in `month` of a loan starting on `loan_start`.
pub fn applies(
    overpayment: &OverpaymentDetails,
    month: u32,
    loan_start: Option<NaiveDate>,
) -> MortgageResult<bool> {
    Ok(overpayment.resolve(loan_start)?.applies(month))
}

/// Pays `amount` off the balance after payment `month` and re-amortizes what follows.
///
/// `ReduceTerm` keeps the later installments and lets the loan end sooner;
/// `ReducePayment` keeps the end date and recasts the installment.
pub fn apply_overpayment(
    schedule: &[ScheduleEntry],
    amount: Money,
    month: u32,
    terms: &ScheduleTerms,
    effect: OverpaymentEffect,
) -> MortgageResult<Vec<ScheduleEntry>> {
    apply_capped(schedule, amount, month, terms, effect).map(|(entries, _)| entries)
}

fn apply_capped(
    schedule: &[ScheduleEntry],
    amount: Money,
    month: u32,
    terms: &ScheduleTerms,
    effect: OverpaymentEffect,
) -> MortgageResult<(Vec<ScheduleEntry>, Money)> {
    if month == 0 || month as usize > schedule.len() {
        return Err(MortgageError::InvalidPaymentNumber {
            month,
            schedule_len: schedule.len(),
        });
    }

    let idx = month as usize - 1;
    let outstanding = schedule[idx].balance;
    let applied = round_money(amount.min(outstanding));
    if outstanding <= Decimal::ZERO || applied <= Decimal::ZERO {
        return Ok((schedule.to_vec(), Decimal::ZERO));
    }

    let mut entries = schedule[..=idx].to_vec();
    let remaining = {
        let target = &mut entries[idx];
        target.is_overpayment = true;
        target.overpayment_amount += applied;
        target.balance -= applied;
        target.balance
    };

    let previous_tail = &schedule[idx + 1..];
    if remaining > Decimal::ZERO && !previous_tail.is_empty() {
        let months = previous_tail.len() as u32;
        let tail = match effect {
            OverpaymentEffect::ReduceTerm => amortize(
                remaining,
                month,
                months,
                terms,
                Installments::Keep(previous_tail),
            )?,
            OverpaymentEffect::ReducePayment => {
                amortize(remaining, month, months, terms, Installments::Recast)?
            }
        };
        entries.extend(tail);
    }

    Ok((with_running_totals(entries), applied))
}

/// Applies every overpayment rule to `schedule` in one forward pass.
///
/// Rules firing in the same month are summed; the effect comes from the
/// largest of them, the earliest declared winning ties. The scan stops at the
/// first month whose balance is already zero.
pub fn perform_overpayments(
    schedule: &[ScheduleEntry],
    plans: &[OverpaymentDetails],
    terms: &ScheduleTerms,
) -> MortgageResult<OverpaymentOutcome> {
    let rules = plans
        .iter()
        .map(|p| p.resolve(terms.start_date))
        .collect::<MortgageResult<Vec<_>>>()?;

    let mut current = schedule.to_vec();
    let mut events = Vec::new();
    if rules.is_empty() {
        return Ok(OverpaymentOutcome {
            schedule: current,
            events,
        });
    }

    let mut month: u32 = 1;
    while (month as usize) <= current.len() {
        if current[month as usize - 1].balance <= Decimal::ZERO {
            break;
        }

        let mut requested = Decimal::ZERO;
        let mut dominant: Option<&ResolvedOverpayment> = None;
        for rule in rules.iter().filter(|r| r.applies(month)) {
            requested += rule.amount;
            if dominant.map_or(true, |d| rule.amount > d.amount) {
                dominant = Some(rule);
            }
        }

        if let Some(rule) = dominant {
            let (next, applied) = apply_capped(&current, requested, month, terms, rule.effect)?;
            if applied > Decimal::ZERO {
                events.push(OverpaymentEvent {
                    month,
                    requested,
                    applied,
                    effect: rule.effect,
                });
            }
            current = next;
        }
        month += 1;
    }

    Ok(OverpaymentOutcome {
        schedule: current,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::{generate_schedule, months_to_payoff};
    use crate::loan::{InterestRatePeriod, RepaymentModel};
    use rust_decimal_macros::dec;

    fn terms(model: RepaymentModel) -> ScheduleTerms {
        ScheduleTerms::new(
            &[InterestRatePeriod { start_month: 1, interest_rate: dec!(5) }],
            model,
            NaiveDate::from_ymd_opt(2024, 1, 1),
        )
        .unwrap()
    }

    fn base(model: RepaymentModel) -> Vec<ScheduleEntry> {
        generate_schedule(dec!(200000), 240, &terms(model)).unwrap()
    }

    #[test]
    fn test_monthly_window_is_inclusive() {
        let rule = OverpaymentDetails::recurring(
            dec!(100),
            OverpaymentFrequency::Monthly,
            6,
            Some(18),
            OverpaymentEffect::ReduceTerm,
        )
        .resolve(None)
        .unwrap();
        let firing: Vec<u32> = (1..=40).filter(|m| rule.applies(*m)).collect();
        assert_eq!(firing, (6..=18).collect::<Vec<u32>>());
    }

    #[test]
    fn test_quarterly_and_annual_cadence() {
        let quarterly = OverpaymentDetails::recurring(
            dec!(500),
            OverpaymentFrequency::Quarterly,
            2,
            None,
            OverpaymentEffect::ReduceTerm,
        )
        .resolve(None)
        .unwrap();
        let q: Vec<u32> = (1..=12).filter(|m| quarterly.applies(*m)).collect();
        assert_eq!(q, vec![2, 5, 8, 11]);

        let annual = OverpaymentDetails::recurring(
            dec!(500),
            OverpaymentFrequency::Annual,
            12,
            Some(40),
            OverpaymentEffect::ReduceTerm,
        )
        .resolve(None)
        .unwrap();
        let a: Vec<u32> = (1..=60).filter(|m| annual.applies(*m)).collect();
        assert_eq!(a, vec![12, 24, 36]);
    }

    #[test]
    fn test_non_recurring_fires_once() {
        let mut details = OverpaymentDetails::recurring(
            dec!(500),
            OverpaymentFrequency::Monthly,
            3,
            None,
            OverpaymentEffect::ReduceTerm,
        );
        details.is_recurring = false;
        assert!(applies(&details, 3, None).unwrap());
        assert!(!applies(&details, 4, None).unwrap());
    }

    #[test]
    fn test_start_date_resolves_to_payment_number() {
        let details = OverpaymentDetails {
            amount: dec!(1000),
            start_month: None,
            start_date: NaiveDate::from_ymd_opt(2024, 7, 10),
            end_month: None,
            end_date: None,
            is_recurring: false,
            frequency: OverpaymentFrequency::OneTime,
            effect: OverpaymentEffect::ReduceTerm,
        };
        let loan_start = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(details.resolve(loan_start).unwrap().start_month, 6);
        assert!(details.resolve(None).is_err());
    }

    #[test]
    fn test_no_plans_is_identity() {
        let schedule = base(RepaymentModel::EqualInstallments);
        let outcome =
            perform_overpayments(&schedule, &[], &terms(RepaymentModel::EqualInstallments)).unwrap();
        assert_eq!(outcome.schedule, schedule);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_reduce_term_shortens_schedule() {
        let t = terms(RepaymentModel::EqualInstallments);
        let schedule = base(RepaymentModel::EqualInstallments);
        let after =
            apply_overpayment(&schedule, dec!(20000), 12, &t, OverpaymentEffect::ReduceTerm)
                .unwrap();

        assert!(after.len() < schedule.len());
        assert!(after[11].is_overpayment);
        assert_eq!(after[11].overpayment_amount, dec!(20000));
        assert_eq!(after[11].balance, schedule[11].balance - dec!(20000));
        assert_eq!(after[12].monthly_payment, schedule[12].monthly_payment);
        assert_eq!(after.last().unwrap().balance, Decimal::ZERO);
        // untouched head
        assert_eq!(after[..11], schedule[..11]);
    }

    #[test]
    fn test_reduce_payment_keeps_length() {
        let t = terms(RepaymentModel::EqualInstallments);
        let schedule = base(RepaymentModel::EqualInstallments);
        let after =
            apply_overpayment(&schedule, dec!(20000), 12, &t, OverpaymentEffect::ReducePayment)
                .unwrap();

        assert_eq!(after.len(), schedule.len());
        assert!(after[12].monthly_payment < schedule[12].monthly_payment);
        assert_eq!(after.last().unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_decreasing_reduce_term_keeps_principal_portion() {
        let t = terms(RepaymentModel::DecreasingInstallments);
        let schedule = base(RepaymentModel::DecreasingInstallments);
        let after =
            apply_overpayment(&schedule, dec!(30000), 24, &t, OverpaymentEffect::ReduceTerm)
                .unwrap();
        assert_eq!(after[24].principal_payment, schedule[24].principal_payment);
        assert!(after[24].interest_payment < schedule[24].interest_payment);
        assert!(after.len() < schedule.len());
    }

    #[test]
    fn test_overpayment_capped_at_balance() {
        let t = terms(RepaymentModel::EqualInstallments);
        let schedule = base(RepaymentModel::EqualInstallments);
        let after =
            apply_overpayment(&schedule, dec!(1000000), 100, &t, OverpaymentEffect::ReduceTerm)
                .unwrap();
        assert_eq!(after.len(), 100);
        assert_eq!(after[99].overpayment_amount, schedule[99].balance);
        assert_eq!(after[99].balance, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_payment_number() {
        let t = terms(RepaymentModel::EqualInstallments);
        let schedule = base(RepaymentModel::EqualInstallments);
        for month in [0, 241] {
            let err = apply_overpayment(&schedule, dec!(10), month, &t, OverpaymentEffect::ReduceTerm)
                .unwrap_err();
            assert!(matches!(err, MortgageError::InvalidPaymentNumber { .. }));
        }
    }

    #[test]
    fn test_same_month_rules_sum_and_largest_picks_effect() {
        let t = terms(RepaymentModel::EqualInstallments);
        let schedule = base(RepaymentModel::EqualInstallments);
        let plans = vec![
            OverpaymentDetails::one_time(dec!(1000), 6, OverpaymentEffect::ReduceTerm),
            OverpaymentDetails::one_time(dec!(4000), 6, OverpaymentEffect::ReducePayment),
        ];
        let outcome = perform_overpayments(&schedule, &plans, &t).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].applied, dec!(5000));
        assert_eq!(outcome.events[0].effect, OverpaymentEffect::ReducePayment);
        assert_eq!(outcome.schedule.len(), schedule.len());
    }

    #[test]
    fn test_monthly_plan_pays_off_early() {
        let t = terms(RepaymentModel::EqualInstallments);
        let schedule = base(RepaymentModel::EqualInstallments);
        let plans = vec![OverpaymentDetails::recurring(
            dec!(500),
            OverpaymentFrequency::Monthly,
            1,
            None,
            OverpaymentEffect::ReduceTerm,
        )];
        let outcome = perform_overpayments(&schedule, &plans, &t).unwrap();
        assert!(months_to_payoff(&outcome.schedule) < 240);
        let overpaid: Decimal = outcome.events.iter().map(|e| e.applied).sum();
        let principal: Decimal = outcome
            .schedule
            .iter()
            .map(|e| e.principal_payment + e.overpayment_amount)
            .sum();
        assert_eq!(principal, dec!(200000));
        assert!(overpaid > Decimal::ZERO);
    }
}
