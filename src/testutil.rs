//! shared fixtures for module tests

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::loan::{Loan, LoanAggregate, LoanTerm};
use crate::reconcile::materialize_run;
use crate::schedule;
use crate::types::{InstallmentStatus, LoanCategory, LoanStatus};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// aggregate with a freshly generated generation-1 schedule: start 2024-01-05,
/// due day 5, first EMI 2024-02-05
pub fn seeded_aggregate(principal: i64, rate_pct: Decimal, tenure: u32) -> LoanAggregate {
    let loan_id = Uuid::new_v4();
    let principal = Money::from_major(principal);
    let rate = Rate::from_percentage(rate_pct);
    let start = date(2024, 1, 5);
    let rows = schedule::compute_schedule(principal, rate, tenure, date(2024, 2, 5), 5).unwrap();
    let emi = rows[0].emi;
    let end = rows.last().unwrap().due_date;

    let mut agg = LoanAggregate::new(Loan {
        id: loan_id,
        name: "test loan".to_string(),
        category: LoanCategory::Home,
        lender: Some("bank".to_string()),
        masked_account_number: None,
        principal,
        outstanding: principal,
        rate,
        tenure_months: tenure,
        emi,
        due_day: 5,
        start_date: start,
        end_date: end,
        status: LoanStatus::Active,
        linked_account: None,
        is_existing_loan: false,
        create_transaction: false,
        affect_balance: false,
    });
    agg.terms.push(LoanTerm {
        id: Uuid::new_v4(),
        loan_id,
        generation: 1,
        effective_from: start,
        effective_to: None,
        rate,
        tenure_months: tenure,
        emi,
        outstanding_at_change: principal,
        reason: "origination".to_string(),
    });
    agg.installments = materialize_run(loan_id, 1, rows);
    agg
}

/// mark the first `count` installments paid and walk outstanding down by
/// their scheduled principal components
pub fn settle_scheduled(agg: &mut LoanAggregate, count: usize) {
    for idx in 0..count {
        let (id, principal_part, due) = {
            let row = &agg.installments[idx];
            (row.id, row.principal_component, row.due_date)
        };
        let row = agg.installment_mut(id).unwrap();
        row.status = InstallmentStatus::Paid;
        row.paid_date = Some(due);
        row.paid_amount = Some(row.emi);
        agg.apply_outstanding_delta(-principal_part, due).unwrap();
    }
}
