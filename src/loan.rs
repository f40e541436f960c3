use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::events::EventStore;
use crate::types::{
    AccountId, InstallmentId, InstallmentStatus, LoanCategory, LoanId, LoanStatus, PaymentId,
    PaymentKind, TermId,
};

/// a tracked loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub name: String,
    pub category: LoanCategory,
    pub lender: Option<String>,
    pub masked_account_number: Option<String>,

    /// principal at origination; zero for legacy loans onboarded without
    /// original-amount data (progress tracking disabled, not an error)
    pub principal: Money,
    pub outstanding: Money,

    pub rate: Rate,
    pub tenure_months: u32,
    pub emi: Money,
    /// EMI due day-of-month, 1-31, clamped to shorter months
    pub due_day: u32,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LoanStatus,

    pub linked_account: Option<AccountId>,
    pub is_existing_loan: bool,
    /// settlement appends a debit to the Transaction Journal
    pub create_transaction: bool,
    /// settlement debits the linked account in the Account Ledger
    pub affect_balance: bool,
}

impl Loan {
    /// legacy loans carry no origination principal
    pub fn is_legacy(&self) -> bool {
        self.principal.is_zero()
    }

    /// repaid fraction of principal; None when progress tracking is disabled
    pub fn progress_fraction(&self) -> Option<Decimal> {
        if self.is_legacy() {
            return None;
        }
        let repaid = self.principal - self.outstanding;
        Some(repaid.as_decimal() / self.principal.as_decimal())
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// one interest/EMI/tenure regime in a loan's history.
/// Terms partition time: a closed term's effective_to is the day before the
/// next term's effective_from. Exactly one term per loan is open
/// (effective_to == None).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerm {
    pub id: TermId,
    pub loan_id: LoanId,
    /// schedule generation this term produced
    pub generation: u32,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub rate: Rate,
    /// months remaining at term start
    pub tenure_months: u32,
    pub emi: Money,
    /// outstanding principal captured the moment this term began
    pub outstanding_at_change: Money,
    pub reason: String,
}

impl LoanTerm {
    pub fn is_current(&self) -> bool {
        self.effective_to.is_none()
    }
}

/// one scheduled EMI. `status` only ever stores Pending or Paid; overdue is
/// derived on read from the due date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInstallment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
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

impl LoanInstallment {
    pub fn is_pending(&self) -> bool {
        self.status == InstallmentStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    /// status as seen by callers: pending past its due date reads as overdue
    pub fn effective_status(&self, today: NaiveDate) -> InstallmentStatus {
        if self.is_pending() && self.due_date < today {
            InstallmentStatus::Overdue
        } else {
            self.status
        }
    }
}

/// an append-only monetary event against a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub date: NaiveDate,
    pub amount: Money,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub kind: PaymentKind,
    /// set when this payment settles a scheduled installment
    pub installment_id: Option<InstallmentId>,
    pub account_id: Option<AccountId>,
    pub notes: Option<String>,
}

/// loan plus its child collections and pending events
#[derive(Debug)]
pub struct LoanAggregate {
    pub loan: Loan,
    pub terms: Vec<LoanTerm>,
    pub installments: Vec<LoanInstallment>,
    pub payments: Vec<LoanPayment>,
    pub events: EventStore,
}

impl LoanAggregate {
    pub fn new(loan: Loan) -> Self {
        Self {
            loan,
            terms: Vec::new(),
            installments: Vec::new(),
            payments: Vec::new(),
            events: EventStore::new(),
        }
    }

    /// the open term, found by query rather than a cached pointer
    pub fn current_term(&self) -> Option<&LoanTerm> {
        self.terms.iter().find(|t| t.is_current())
    }

    pub fn current_term_mut(&mut self) -> Option<&mut LoanTerm> {
        self.terms.iter_mut().find(|t| t.is_current())
    }

    /// generation of the open term; 0 before any term exists
    pub fn current_generation(&self) -> u32 {
        self.current_term().map(|t| t.generation).unwrap_or(0)
    }

    pub fn installment(&self, id: InstallmentId) -> Option<&LoanInstallment> {
        self.installments.iter().find(|i| i.id == id)
    }

    pub fn installment_mut(&mut self, id: InstallmentId) -> Option<&mut LoanInstallment> {
        self.installments.iter_mut().find(|i| i.id == id)
    }

    /// earliest pending installment by due date
    pub fn next_pending(&self) -> Option<&LoanInstallment> {
        self.installments
            .iter()
            .filter(|i| i.is_pending())
            .min_by_key(|i| (i.due_date, i.number))
    }

    pub fn all_installments_paid(&self) -> bool {
        !self.installments.is_empty() && self.installments.iter().all(|i| i.is_paid())
    }

    pub fn new_installment_id() -> InstallmentId {
        Uuid::new_v4()
    }
}
