use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{InstallmentId, LoanId, LoanStatus, PaymentId, PaymentKind, TermId};

/// all events emitted by loan operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanCreated {
        loan_id: LoanId,
        principal: Money,
        outstanding: Money,
        rate: Rate,
        tenure_months: u32,
        is_existing_loan: bool,
    },
    LoanClosed {
        loan_id: LoanId,
        closed_on: NaiveDate,
    },
    LoanDefaulted {
        loan_id: LoanId,
        defaulted_on: NaiveDate,
        reason: String,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        on: NaiveDate,
    },

    // balance events
    OutstandingAdjusted {
        loan_id: LoanId,
        delta: Money,
        new_outstanding: Money,
    },

    // term events
    TermChanged {
        loan_id: LoanId,
        term_id: TermId,
        effective_from: NaiveDate,
        new_rate: Rate,
        new_tenure_months: u32,
        new_emi: Money,
        outstanding_at_change: Money,
        generation: u32,
        reason: String,
    },

    // installment events
    InstallmentSettled {
        loan_id: LoanId,
        installment_id: InstallmentId,
        installment_number: u32,
        paid_date: NaiveDate,
        paid_amount: Money,
        principal_component: Money,
        interest_component: Money,
    },

    // payment events
    PaymentRecorded {
        loan_id: LoanId,
        payment_id: PaymentId,
        kind: PaymentKind,
        amount: Money,
        principal_paid: Money,
        interest_paid: Money,
        date: NaiveDate,
    },

    // collaborator events
    CollaboratorCallFailed {
        loan_id: LoanId,
        collaborator: String,
        message: String,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
