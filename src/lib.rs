pub mod book;
pub mod collaborators;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod loan;
pub mod payments;
pub mod reconcile;
pub mod schedule;
pub mod settlement;
pub mod store;
pub mod types;
pub mod views;

#[cfg(test)]
mod testutil;

// re-export key types
pub use book::{ExistingLoan, LoanBook, NewLoan};
pub use collaborators::{
    AccountLedger, CollaboratorError, Direction, JournalEntry, TransactionJournal,
};
pub use decimal::{Money, Rate};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use loan::{Loan, LoanAggregate, LoanInstallment, LoanPayment, LoanTerm};
pub use payments::AdHocPayment;
pub use reconcile::TermChange;
pub use schedule::ScheduledInstallment;
pub use settlement::{CollaboratorWarning, SettlementOutcome, SettlementRequest, SideEffects};
pub use store::LoanStore;
pub use types::{
    AccountId, InstallmentId, InstallmentStatus, LoanCategory, LoanId, LoanStatus, LoanSummary,
    PaymentId, PaymentKind, TermId, UpcomingEmi,
};
pub use views::{InstallmentView, LoanView, SummaryView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
