use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// one row of a generated amortization schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub emi: Money,
    pub principal_component: Money,
    pub interest_component: Money,
    pub outstanding_after: Money,
}

/// generate a full reducing-balance EMI schedule.
///
/// `first_due` is the due date of installment 1; subsequent installments fall
/// one calendar month later on `due_day`, clamped to the end of shorter months
/// (due day 31 becomes the 30th in a 30-day month, the 28th/29th in February).
/// The final installment's principal component is forced to the remaining
/// outstanding so the schedule amortizes to exactly zero.
pub fn compute_schedule(
    principal: Money,
    annual_rate: Rate,
    tenure_months: u32,
    first_due: NaiveDate,
    due_day: u32,
) -> Result<Vec<ScheduledInstallment>> {
    validate_inputs(principal, annual_rate, tenure_months)?;
    let emi = emi_amount(principal, annual_rate, tenure_months);
    walk_schedule(principal, annual_rate, tenure_months, emi, first_due, due_day)
}

/// generate a schedule with a pinned EMI instead of the formula value.
/// Used by term changes that carry an operator-supplied EMI; the run ends
/// early if the pinned EMI repays the principal before the tenure is up.
pub fn compute_schedule_with_emi(
    principal: Money,
    annual_rate: Rate,
    tenure_months: u32,
    emi: Money,
    first_due: NaiveDate,
    due_day: u32,
) -> Result<Vec<ScheduledInstallment>> {
    validate_inputs(principal, annual_rate, tenure_months)?;

    let first_interest = Money::from_decimal(principal.as_decimal() * annual_rate.monthly());
    if emi <= first_interest {
        return Err(LoanError::InvalidScheduleInput {
            message: format!(
                "emi {} does not cover first month's interest {}",
                emi, first_interest
            ),
        });
    }

    walk_schedule(principal, annual_rate, tenure_months, emi, first_due, due_day)
}

/// standard reducing-balance EMI, rounded half-up to the currency unit.
/// EMI = P * r * (1+r)^n / ((1+r)^n - 1); straight-line when r is zero.
pub fn emi_amount(principal: Money, annual_rate: Rate, tenure_months: u32) -> Money {
    if tenure_months == 0 {
        return principal;
    }

    let r = annual_rate.monthly();
    if r.is_zero() {
        return principal / Decimal::from(tenure_months);
    }

    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + r;
    for _ in 0..tenure_months {
        compound *= base;
    }

    let numerator = principal.as_decimal() * r * compound;
    let denominator = compound - Decimal::ONE;

    Money::from_decimal(numerator / denominator)
}

fn validate_inputs(principal: Money, annual_rate: Rate, tenure_months: u32) -> Result<()> {
    if !principal.is_positive() {
        return Err(LoanError::InvalidScheduleInput {
            message: format!("principal must be positive, got {}", principal),
        });
    }
    if annual_rate.is_negative() {
        return Err(LoanError::InvalidInterestRate { rate: annual_rate });
    }
    if tenure_months == 0 {
        return Err(LoanError::InvalidScheduleInput {
            message: "tenure must be at least one month".to_string(),
        });
    }
    Ok(())
}

fn walk_schedule(
    principal: Money,
    annual_rate: Rate,
    tenure_months: u32,
    emi: Money,
    first_due: NaiveDate,
    due_day: u32,
) -> Result<Vec<ScheduledInstallment>> {
    let r = annual_rate.monthly();
    let mut rows = Vec::with_capacity(tenure_months as usize);
    let mut outstanding = principal;

    for i in 1..=tenure_months {
        let due_date = add_months_on_day(first_due, i - 1, due_day);
        let interest = Money::from_decimal(outstanding.as_decimal() * r);
        let principal_part = emi - interest;

        let is_last = i == tenure_months || principal_part >= outstanding;
        if is_last {
            // final installment absorbs rounding drift: principal is exactly
            // the remaining outstanding, the EMI adjusts with it
            rows.push(ScheduledInstallment {
                number: i,
                due_date,
                emi: outstanding + interest,
                principal_component: outstanding,
                interest_component: interest,
                outstanding_after: Money::ZERO,
            });
            break;
        }

        outstanding -= principal_part;
        rows.push(ScheduledInstallment {
            number: i,
            due_date,
            emi,
            principal_component: principal_part,
            interest_component: interest,
            outstanding_after: outstanding,
        });
    }

    Ok(rows)
}

/// due date `months` calendar months after `from`, on `due_day` clamped to
/// the target month's length
pub fn add_months_on_day(from: NaiveDate, months: u32, due_day: u32) -> NaiveDate {
    let zero_based = from.year() * 12 + from.month() as i32 - 1 + months as i32;
    let year = zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    clamped_date(year, month, due_day)
}

/// first due date on `due_day` strictly after `after`
pub fn next_due_after(after: NaiveDate, due_day: u32) -> NaiveDate {
    let same_month = clamped_date(after.year(), after.month(), due_day);
    if same_month > after {
        same_month
    } else {
        add_months_on_day(same_month, 1, due_day)
    }
}

fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(year, month));
    // month is always 1..=12 and day clamped to the month's length
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped date is valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
