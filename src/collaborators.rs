use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{AccountId, LoanId};

/// failure from an external bookkeeping service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CollaboratorError {
    pub message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// direction of a journal entry from the account's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Debit,
    Credit,
}

/// immutable transaction record appended to the Transaction Journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub account_id: Option<AccountId>,
    pub source_loan_id: LoanId,
    pub amount: Money,
    pub direction: Direction,
    pub date: NaiveDate,
    pub memo: String,
}

/// external service holding account balances. The core instructs it but does
/// not own it; a debit is a negative delta.
pub trait AccountLedger: Send + Sync {
    fn adjust_balance(&self, account_id: AccountId, delta: Money)
        -> Result<(), CollaboratorError>;
}

/// external append-only transaction journal
pub trait TransactionJournal: Send + Sync {
    fn append(&self, entry: JournalEntry) -> Result<(), CollaboratorError>;
}

/// in-memory ledger double that records every adjustment
#[derive(Debug, Default)]
pub struct RecordingLedger {
    adjustments: Mutex<Vec<(AccountId, Money)>>,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adjustments(&self) -> Vec<(AccountId, Money)> {
        self.adjustments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AccountLedger for RecordingLedger {
    fn adjust_balance(
        &self,
        account_id: AccountId,
        delta: Money,
    ) -> Result<(), CollaboratorError> {
        self.adjustments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((account_id, delta));
        Ok(())
    }
}

/// in-memory journal double that records every appended entry
#[derive(Debug, Default)]
pub struct RecordingJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl RecordingJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl TransactionJournal for RecordingJournal {
    fn append(&self, entry: JournalEntry) -> Result<(), CollaboratorError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
        Ok(())
    }
}

/// ledger double that always fails, for exercising partial-success paths
#[derive(Debug, Default)]
pub struct FailingLedger;

impl AccountLedger for FailingLedger {
    fn adjust_balance(&self, _: AccountId, _: Money) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new("ledger unavailable"))
    }
}

/// journal double that always fails
#[derive(Debug, Default)]
pub struct FailingJournal;

impl TransactionJournal for FailingJournal {
    fn append(&self, _: JournalEntry) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new("journal unavailable"))
    }
}
