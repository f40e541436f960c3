use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;
/// unique identifier for a loan term
pub type TermId = Uuid;
/// unique identifier for a scheduled installment
pub type InstallmentId = Uuid;
/// unique identifier for a recorded payment
pub type PaymentId = Uuid;
/// identifier of an account in the external ledger
pub type AccountId = Uuid;

/// loan product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanCategory {
    Home,
    Personal,
    CreditCard,
    ItemEmi,
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// loan open and repaying
    Active,
    /// outstanding reached zero or all installments paid
    Closed,
    /// marked defaulted by operator action, terminal
    Defaulted,
}

/// installment status as seen by callers. `Overdue` is derived on read:
/// a pending installment whose due date is strictly before today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

/// kind of monetary event recorded against a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    /// settlement of a scheduled EMI
    Emi,
    /// out-of-schedule principal payment
    Prepayment,
    /// partial payment not settling a full installment
    Partial,
}

/// cross-loan aggregate returned by the supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub active_loans: u32,
    pub total_outstanding: Money,
    /// EMI amounts of pending installments due in the current calendar month
    pub emi_due_this_month: Money,
    /// earliest pending installment across all active loans
    pub next_emi_due: Option<UpcomingEmi>,
}

/// next EMI falling due across the book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpcomingEmi {
    pub loan_id: LoanId,
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// mask a raw account number down to its last four digits
pub fn mask_account_number(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail: String = digits.iter().rev().take(4).rev().collect();
    format!("XXXX{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_account_number() {
        assert_eq!(mask_account_number("1234 5678 9012"), "XXXX9012");
        assert_eq!(mask_account_number("42"), "XXXX42");
    }
}
