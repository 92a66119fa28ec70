use rust_decimal::Decimal;

use super::{with_running_totals, ScheduleEntry, ScheduleTerms};
use crate::error::MortgageError;
use crate::loan::RepaymentModel;
use crate::time_value::payment;
use crate::types::{monthly_rate, round_money, Money};
use crate::MortgageResult;

/// Longest schedule the engine will produce (50 years).
pub const MAX_SCHEDULE_MONTHS: u32 = 600;

/// How installments after the first month are sized.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Installments<'a> {
    /// Equal installments: recast every month from the balance and months left.
    /// Decreasing installments: balance / months, fixed for the run.
    Recast,
    /// Reuse the installment of the schedule being replaced, month for month:
    /// the full payment for equal installments, the principal portion for
    /// decreasing ones. Paying a smaller balance this way ends the loan early.
    Keep(&'a [ScheduleEntry]),
}

/// Full schedule for `principal` over `months` under `terms`.
///
/// Fails with `ScheduleTooLong` above 600 months instead of truncating.
pub fn generate_schedule(
    principal: Money,
    months: u32,
    terms: &ScheduleTerms,
) -> MortgageResult<Vec<ScheduleEntry>> {
    if principal <= Decimal::ZERO {
        return Err(MortgageError::invalid(
            "principal",
            "Principal must be positive",
        ));
    }
    let entries = amortize(principal, 0, months, terms, Installments::Recast)?;
    Ok(with_running_totals(entries))
}

/// Amortizes `opening_balance` over payments `offset + 1 ..= offset + months`.
///
/// Running totals are left at zero; callers fold them once the schedule is
/// assembled. Stops early when the balance reaches zero.
pub(crate) fn amortize(
    opening_balance: Money,
    offset: u32,
    months: u32,
    terms: &ScheduleTerms,
    installments: Installments<'_>,
) -> MortgageResult<Vec<ScheduleEntry>> {
    if months == 0 {
        return Err(MortgageError::invalid(
            "months",
            "Schedule must span at least one month",
        ));
    }
    let last_month = offset.saturating_add(months);
    if last_month > MAX_SCHEDULE_MONTHS {
        return Err(MortgageError::ScheduleTooLong {
            months: last_month,
            limit: MAX_SCHEDULE_MONTHS,
        });
    }

    let fixed_principal = round_money(opening_balance / Decimal::from(months));
    let mut cursor = terms.cursor();
    let mut balance = opening_balance;
    let mut entries = Vec::with_capacity(months as usize);

    for step in 1..=months {
        let month = offset + step;
        let rate = monthly_rate(cursor.rate_at(month));
        let interest = round_money(balance * rate);

        let scheduled_principal = match (terms.repayment_model, installments) {
            (RepaymentModel::EqualInstallments, Installments::Recast) => {
                payment(balance, rate, months - step + 1)? - interest
            }
            (RepaymentModel::DecreasingInstallments, Installments::Recast) => fixed_principal,
            (RepaymentModel::EqualInstallments, Installments::Keep(previous)) => previous
                .get(step as usize - 1)
                .map_or(balance, |e| e.monthly_payment - interest),
            (RepaymentModel::DecreasingInstallments, Installments::Keep(previous)) => previous
                .get(step as usize - 1)
                .map_or(balance, |e| e.principal_payment),
        };

        let principal_payment = if scheduled_principal > balance || step == months {
            balance
        } else {
            scheduled_principal.max(Decimal::ZERO)
        };
        balance -= principal_payment;

        entries.push(ScheduleEntry {
            payment_number: month,
            monthly_payment: principal_payment + interest,
            principal_payment,
            interest_payment: interest,
            balance,
            is_overpayment: false,
            overpayment_amount: Decimal::ZERO,
            total_interest: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            fees: None,
            payment_date: terms.payment_date(month),
        });

        if balance.is_zero() {
            break;
        }
    }

    Ok(entries)
}
