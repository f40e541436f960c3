use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loan::{Loan, LoanInstallment};
use crate::types::{
    InstallmentId, InstallmentStatus, LoanCategory, LoanId, LoanStatus, LoanSummary,
};

/// serializable snapshot of a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub name: String,
    pub category: LoanCategory,
    pub lender: Option<String>,
    pub masked_account_number: Option<String>,
    pub principal: Money,
    pub outstanding: Money,
    pub rate: Rate,
    pub tenure_months: u32,
    pub emi: Money,
    pub due_day: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LoanStatus,
    /// repaid fraction of principal; None for legacy loans
    pub progress: Option<Decimal>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            name: loan.name.clone(),
            category: loan.category,
            lender: loan.lender.clone(),
            masked_account_number: loan.masked_account_number.clone(),
            principal: loan.principal,
            outstanding: loan.outstanding,
            rate: loan.rate,
            tenure_months: loan.tenure_months,
            emi: loan.emi,
            due_day: loan.due_day,
            start_date: loan.start_date,
            end_date: loan.end_date,
            status: loan.status,
            progress: loan.progress_fraction(),
        }
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}

/// installment as seen by callers, with overdue derived from today's date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentView {
    pub id: InstallmentId,
    pub generation: u32,
    pub number: u32,
    pub due_date: NaiveDate,
    pub emi: Money,
    pub principal_component: Money,
    pub interest_component: Money,
    pub status: InstallmentStatus,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Money>,
}

impl InstallmentView {
    pub fn from_installment(installment: &LoanInstallment, today: NaiveDate) -> Self {
        Self {
            id: installment.id,
            generation: installment.generation,
            number: installment.number,
            due_date: installment.due_date,
            emi: installment.emi,
            principal_component: installment.principal_component,
            interest_component: installment.interest_component,
            status: installment.effective_status(today),
            paid_date: installment.paid_date,
            paid_amount: installment.paid_amount,
        }
    }
}

/// serializable book-level summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryView {
    pub summary: LoanSummary,
    pub as_of: NaiveDate,
}

impl SummaryView {
    pub fn new(summary: LoanSummary, as_of: NaiveDate) -> Self {
        Self { summary, as_of }
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}
