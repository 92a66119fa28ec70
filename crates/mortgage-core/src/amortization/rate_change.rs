use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::schedule::{amortize, Installments};
use super::{with_running_totals, ScheduleEntry, ScheduleTerms};
use crate::error::MortgageError;
use crate::loan::RateChange;
use crate::MortgageResult;

/// A schedule after a rate change, with the terms later passes must amortize under.
#[derive(Debug, Clone)]
pub struct SplicedSchedule {
    pub schedule: Vec<ScheduleEntry>,
    pub terms: ScheduleTerms,
}

/// Re-amortizes everything after payment `change.month` at `change.new_rate`.
///
/// Payments up to and including `change.month` are kept. The remaining balance
/// is spread over `remaining_term_years` when given, otherwise over the months
/// the schedule had left.
pub fn apply_rate_change(
    schedule: &[ScheduleEntry],
    change: &RateChange,
    terms: &ScheduleTerms,
) -> MortgageResult<SplicedSchedule> {
    let len = schedule.len();
    if change.month == 0 || change.month as usize >= len {
        return Err(MortgageError::InvalidRateChangeMonth {
            month: change.month,
            schedule_len: len,
        });
    }
    if change.new_rate < Decimal::ZERO {
        return Err(MortgageError::invalid(
            "rateChange.newRate",
            "Interest rate cannot be negative",
        ));
    }

    let remaining_months = match change.remaining_term_years {
        Some(years) => years_to_months(years)?,
        None => (len - change.month as usize) as u32,
    };

    let new_terms = terms.with_rate_from(change.month + 1, change.new_rate);
    let head = &schedule[..change.month as usize];
    let balance = head[head.len() - 1].balance;

    if balance <= Decimal::ZERO {
        return Ok(SplicedSchedule {
            schedule: head.to_vec(),
            terms: new_terms,
        });
    }

    let tail = amortize(
        balance,
        change.month,
        remaining_months,
        &new_terms,
        Installments::Recast,
    )?;

    let mut entries = head.to_vec();
    entries.extend(tail);

    Ok(SplicedSchedule {
        schedule: with_running_totals(entries),
        terms: new_terms,
    })
}

fn years_to_months(years: Decimal) -> MortgageResult<u32> {
    if years <= Decimal::ZERO {
        return Err(MortgageError::invalid(
            "rateChange.remainingTermYears",
            "Remaining term must be positive",
        ));
    }
    (years * dec!(12))
        .round()
        .to_u32()
        .filter(|m| *m > 0)
        .ok_or_else(|| {
            MortgageError::invalid(
                "rateChange.remainingTermYears",
                format!("{years} years is not a usable term"),
            )
        })
}
