use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::loan::{LoanAggregate, LoanInstallment, LoanTerm};
use crate::schedule::{self, ScheduledInstallment};
use crate::types::{InstallmentStatus, LoanId, TermId};

/// a requested mid-tenure revision of rate/tenure/EMI
#[derive(Debug, Clone)]
pub struct TermChange {
    pub effective_from: NaiveDate,
    pub rate: Rate,
    pub tenure_months: u32,
    /// operator-pinned EMI; when None the EMI comes from the formula
    pub emi: Option<Money>,
    pub reason: String,
}

/// turn calculator rows into stored installments for one schedule generation
pub(crate) fn materialize_run(
    loan_id: LoanId,
    generation: u32,
    rows: Vec<ScheduledInstallment>,
) -> Vec<LoanInstallment> {
    rows.into_iter()
        .map(|row| LoanInstallment {
            id: Uuid::new_v4(),
            loan_id,
            generation,
            number: row.number,
            due_date: row.due_date,
            emi: row.emi,
            principal_component: row.principal_component,
            interest_component: row.interest_component,
            status: InstallmentStatus::Pending,
            paid_date: None,
            paid_amount: None,
        })
        .collect()
}

/// apply a term change: close the open term at `effective_from - 1 day`,
/// snapshot outstanding, drop pending installments due on or after the change
/// point, and regenerate the remaining run as the next schedule generation.
///
/// Changes are forward-only; an `effective_from` on or before the open term's
/// start fails with `TermOverlap` and leaves state untouched. All fallible work
/// happens before the first mutation, so the change commits atomically under
/// the caller's per-loan lock.
pub fn apply_term_change(aggregate: &mut LoanAggregate, change: TermChange) -> Result<TermId> {
    if !aggregate.loan.is_active() {
        return Err(LoanError::LoanNotActive {
            status: aggregate.loan.status,
        });
    }

    let current = aggregate
        .current_term()
        .ok_or_else(|| LoanError::InvalidLoanInput {
            message: "loan has no current term".to_string(),
        })?;

    // equality would close the open term with an end before its start
    if change.effective_from <= current.effective_from {
        return Err(LoanError::TermOverlap {
            effective_from: change.effective_from,
            current_term_start: current.effective_from,
        });
    }

    let loan_id = aggregate.loan.id;
    let due_day = aggregate.loan.due_day;
    let outstanding_at_change = aggregate.loan.outstanding;
    let generation = aggregate.current_generation() + 1;

    // regenerate before mutating anything
    let first_due = schedule::next_due_after(change.effective_from, due_day);
    let rows = match change.emi {
        Some(emi) => schedule::compute_schedule_with_emi(
            outstanding_at_change,
            change.rate,
            change.tenure_months,
            emi,
            first_due,
            due_day,
        )?,
        None => schedule::compute_schedule(
            outstanding_at_change,
            change.rate,
            change.tenure_months,
            first_due,
            due_day,
        )?,
    };
    let new_emi = rows.first().map(|r| r.emi).unwrap_or(Money::ZERO);
    let new_end_date = rows.last().map(|r| r.due_date).unwrap_or(first_due);
    let run = materialize_run(loan_id, generation, rows);

    // close the open term; paid history stays under its own generation
    if let Some(term) = aggregate.current_term_mut() {
        term.effective_to = Some(change.effective_from - Duration::days(1));
    }
    aggregate
        .installments
        .retain(|i| i.is_paid() || i.due_date < change.effective_from);
    aggregate.installments.extend(run);

    let term_id = Uuid::new_v4();
    aggregate.terms.push(LoanTerm {
        id: term_id,
        loan_id,
        generation,
        effective_from: change.effective_from,
        effective_to: None,
        rate: change.rate,
        tenure_months: change.tenure_months,
        emi: new_emi,
        outstanding_at_change,
        reason: change.reason.clone(),
    });

    aggregate.loan.rate = change.rate;
    aggregate.loan.tenure_months = change.tenure_months;
    aggregate.loan.emi = new_emi;
    aggregate.loan.end_date = new_end_date;

    aggregate.events.emit(Event::TermChanged {
        loan_id,
        term_id,
        effective_from: change.effective_from,
        new_rate: change.rate,
        new_tenure_months: change.tenure_months,
        new_emi: new_emi,
        outstanding_at_change,
        generation,
        reason: change.reason,
    });

    Ok(term_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{date, seeded_aggregate, settle_scheduled};
    use rust_decimal_macros::dec;

    #[test]
    fn test_backdated_change_rejected_and_state_unchanged() {
        let mut agg = seeded_aggregate(100_000, dec!(10), 12);
        let terms_before = agg.terms.len();
        let installments_before = agg.installments.len();

        let result = apply_term_change(
            &mut agg,
            TermChange {
                effective_from: date(2023, 12, 1),
                rate: Rate::from_percentage(dec!(8)),
                tenure_months: 12,
                emi: None,
                reason: "backdated".to_string(),
            },
        );

        assert!(matches!(result, Err(LoanError::TermOverlap { .. })));
        assert_eq!(agg.terms.len(), terms_before);
        assert_eq!(agg.installments.len(), installments_before);
        assert!(agg.current_term().unwrap().is_current());
    }

    #[test]
    fn test_change_on_term_start_date_rejected() {
        let mut agg = seeded_aggregate(100_000, dec!(10), 12);
        let term_start = agg.current_term().unwrap().effective_from;

        let result = apply_term_change(
            &mut agg,
            TermChange {
                effective_from: term_start,
                rate: Rate::from_percentage(dec!(8)),
                tenure_months: 12,
                emi: None,
                reason: "same day".to_string(),
            },
        );

        assert!(matches!(result, Err(LoanError::TermOverlap { .. })));
        assert_eq!(agg.terms.len(), 1);
        // no closed term may end before it starts
        assert!(agg
            .terms
            .iter()
            .all(|t| t.effective_to.map_or(true, |to| to >= t.effective_from)));
    }

    #[test]
    fn test_term_change_partitions_time_and_bumps_generation() {
        let mut agg = seeded_aggregate(1_200_000, dec!(10), 12);
        settle_scheduled(&mut agg, 5);
        let outstanding_after_five = agg.loan.outstanding;

        apply_term_change(
            &mut agg,
            TermChange {
                effective_from: date(2024, 6, 20),
                rate: Rate::from_percentage(dec!(8)),
                tenure_months: 7,
                emi: None,
                reason: "rate cut".to_string(),
            },
        )
        .unwrap();

        // closed term ends the day before the new one starts
        let closed = agg.terms.iter().find(|t| t.generation == 1).unwrap();
        let current = agg.current_term().unwrap();
        assert_eq!(closed.effective_to, Some(date(2024, 6, 19)));
        assert_eq!(current.effective_from, date(2024, 6, 20));
        assert_eq!(current.generation, 2);

        // snapshot matches what settlement produced
        assert_eq!(current.outstanding_at_change, outstanding_after_five);

        // paid history immutable, future pending rows regenerated
        let paid: Vec<_> = agg.installments.iter().filter(|i| i.is_paid()).collect();
        assert_eq!(paid.len(), 5);
        assert!(paid.iter().all(|i| i.generation == 1));
        let pending: Vec<_> = agg.installments.iter().filter(|i| i.is_pending()).collect();
        assert_eq!(pending.len(), 7);
        assert!(pending.iter().all(|i| i.generation == 2));
        assert_eq!(pending[0].due_date, date(2024, 7, 5));

        // regenerated run amortizes the snapshot fully
        let regenerated_principal = pending
            .iter()
            .map(|i| i.principal_component)
            .fold(Money::ZERO, |acc, x| acc + x);
        assert_eq!(regenerated_principal, outstanding_after_five);

        // loan header follows the new term
        assert_eq!(agg.loan.rate, Rate::from_percentage(dec!(8)));
        assert_eq!(agg.loan.tenure_months, 7);
        assert_eq!(agg.loan.end_date, date(2025, 1, 5));
    }

    #[test]
    fn test_pinned_emi_carries_into_term() {
        let mut agg = seeded_aggregate(120_000, dec!(12), 12);
        let pinned = Money::from_major(12_000);

        apply_term_change(
            &mut agg,
            TermChange {
                effective_from: date(2024, 3, 10),
                rate: Rate::from_percentage(dec!(12)),
                tenure_months: 12,
                emi: Some(pinned),
                reason: "pinned emi".to_string(),
            },
        )
        .unwrap();

        assert_eq!(agg.current_term().unwrap().emi, pinned);
        assert_eq!(agg.loan.emi, pinned);
        let pending: Vec<_> = agg.installments.iter().filter(|i| i.is_pending()).collect();
        assert!(pending[..pending.len() - 1].iter().all(|i| i.emi == pinned));
    }

    #[test]
    fn test_bad_parameters_propagate_without_mutation() {
        let mut agg = seeded_aggregate(100_000, dec!(10), 12);
        let terms_before = agg.terms.len();

        let result = apply_term_change(
            &mut agg,
            TermChange {
                effective_from: date(2024, 3, 1),
                rate: Rate::from_percentage(dec!(-2)),
                tenure_months: 12,
                emi: None,
                reason: "bad rate".to_string(),
            },
        );

        assert!(matches!(result, Err(LoanError::InvalidInterestRate { .. })));
        assert_eq!(agg.terms.len(), terms_before);
        assert!(agg.current_term().unwrap().effective_to.is_none());
    }
}
