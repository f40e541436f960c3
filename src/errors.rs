use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::LoanStatus;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid schedule input: {message}")]
    InvalidScheduleInput {
        message: String,
    },

    #[error("term overlap: change effective {effective_from} must follow current term start {current_term_start}")]
    TermOverlap {
        effective_from: NaiveDate,
        current_term_start: NaiveDate,
    },

    #[error("installment already settled: {installment_id}")]
    AlreadySettled {
        installment_id: Uuid,
    },

    #[error("outstanding bounds violation: {attempted} outside [0, {principal}]")]
    OutstandingBoundsViolation {
        attempted: Money,
        principal: Money,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("installment not found: {id}")]
    InstallmentNotFound {
        id: Uuid,
    },

    #[error("loan not active: current status is {status:?}")]
    LoanNotActive {
        status: LoanStatus,
    },

    #[error("invalid loan input: {message}")]
    InvalidLoanInput {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("collaborator unavailable: {collaborator}: {message}")]
    CollaboratorUnavailable {
        collaborator: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;
