//! Month-by-month amortization: base schedule generation, overpayment
//! re-amortization and rate-change splicing.
//!
//! Every operation takes a schedule by reference and returns a new one.

pub mod overpayment;
pub mod rate_change;
pub mod schedule;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::loan::{validate_rate_periods, InterestRatePeriod, LoanDetails, RepaymentModel};
use crate::types::{Money, Percent};
use crate::MortgageResult;

pub use overpayment::{
    applies, apply_overpayment, perform_overpayments, OverpaymentEvent, OverpaymentOutcome,
    ResolvedOverpayment,
};
pub use rate_change::{apply_rate_change, SplicedSchedule};
pub use schedule::{generate_schedule, MAX_SCHEDULE_MONTHS};

/// One month of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// 1-based payment number.
    pub payment_number: u32,
    pub monthly_payment: Money,
    pub principal_payment: Money,
    pub interest_payment: Money,
    /// Outstanding balance after this month's payment and any overpayment.
    pub balance: Money,
    pub is_overpayment: bool,
    pub overpayment_amount: Money,
    /// Running sum of interest up to and including this month.
    pub total_interest: Money,
    /// Running sum of installments and overpayments up to and including this month.
    pub total_payment: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
}

/// The parts of a loan that govern how a balance amortizes: the rate timeline,
/// the repayment model and the calendar anchor. Rate changes produce new terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleTerms {
    /// Sorted ascending by start month; the first period starts at month 1.
    rate_periods: Vec<InterestRatePeriod>,
    pub repayment_model: RepaymentModel,
    pub start_date: Option<NaiveDate>,
}

impl ScheduleTerms {
    pub fn new(
        rate_periods: &[InterestRatePeriod],
        repayment_model: RepaymentModel,
        start_date: Option<NaiveDate>,
    ) -> MortgageResult<Self> {
        validate_rate_periods(rate_periods)?;
        let mut sorted = rate_periods.to_vec();
        sorted.sort_by_key(|p| p.start_month);
        Ok(ScheduleTerms {
            rate_periods: sorted,
            repayment_model,
            start_date,
        })
    }

    pub fn from_loan(loan: &LoanDetails) -> MortgageResult<Self> {
        Self::new(
            &loan.interest_rate_periods,
            loan.repayment_model,
            loan.start_date,
        )
    }

    pub fn rate_periods(&self) -> &[InterestRatePeriod] {
        &self.rate_periods
    }

    pub fn cursor(&self) -> RateCursor<'_> {
        RateCursor {
            periods: &self.rate_periods,
            idx: 0,
        }
    }

    /// Terms where `rate` applies from `first_month` onward, replacing every
    /// period that started at or after it.
    pub fn with_rate_from(&self, first_month: u32, rate: Percent) -> Self {
        let mut periods: Vec<InterestRatePeriod> = self
            .rate_periods
            .iter()
            .filter(|p| p.start_month < first_month)
            .cloned()
            .collect();
        periods.push(InterestRatePeriod {
            start_month: first_month.max(1),
            interest_rate: rate,
        });
        ScheduleTerms {
            rate_periods: periods,
            repayment_model: self.repayment_model,
            start_date: self.start_date,
        }
    }

    /// Calendar date of payment `payment_number`, one month apart from the start date.
    pub fn payment_date(&self, payment_number: u32) -> Option<NaiveDate> {
        self.start_date
            .and_then(|d| d.checked_add_months(Months::new(payment_number)))
    }
}

/// Rate lookup that walks the sorted periods forward as months increase.
pub struct RateCursor<'a> {
    periods: &'a [InterestRatePeriod],
    idx: usize,
}

impl RateCursor<'_> {
    /// Annual rate governing `month`: the last period with `start_month <= month`.
    pub fn rate_at(&mut self, month: u32) -> Percent {
        if self.periods.is_empty() {
            return Decimal::ZERO;
        }
        if self.periods[self.idx].start_month > month {
            self.idx = 0;
        }
        while self.idx + 1 < self.periods.len() && self.periods[self.idx + 1].start_month <= month
        {
            self.idx += 1;
        }
        self.periods[self.idx].interest_rate
    }
}

/// Recomputes the cumulative interest and payment columns.
pub fn with_running_totals(entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
    entries
        .into_iter()
        .scan(
            (Decimal::ZERO, Decimal::ZERO),
            |(interest, paid), mut entry| {
                *interest += entry.interest_payment;
                *paid += entry.monthly_payment + entry.overpayment_amount;
                entry.total_interest = *interest;
                entry.total_payment = *paid;
                Some(entry)
            },
        )
        .collect()
}

/// Number of months until the balance first reaches zero, or the schedule length.
pub fn months_to_payoff(schedule: &[ScheduleEntry]) -> usize {
    schedule
        .iter()
        .position(|e| e.balance <= Decimal::ZERO)
        .map_or(schedule.len(), |idx| idx + 1)
}
