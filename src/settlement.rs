use chrono::NaiveDate;
use uuid::Uuid;

use crate::collaborators::{AccountLedger, Direction, JournalEntry, TransactionJournal};
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::loan::{LoanAggregate, LoanInstallment, LoanPayment};
use crate::types::{AccountId, InstallmentId, InstallmentStatus, LoanStatus, PaymentKind};

/// request to settle one scheduled installment
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub installment_id: InstallmentId,
    pub paid_date: NaiveDate,
    pub paid_amount: Money,
    /// account to debit; falls back to the loan's linked account
    pub account_id: Option<AccountId>,
}

/// a collaborator call that failed after the core mutation committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorWarning {
    pub collaborator: String,
    pub message: String,
}

impl CollaboratorWarning {
    /// for callers that treat a failed bookkeeping side effect as a hard error
    pub fn into_error(self) -> LoanError {
        LoanError::CollaboratorUnavailable {
            collaborator: self.collaborator,
            message: self.message,
        }
    }
}

/// collaborator instructions produced by a settlement. The caller issues
/// them once the per-loan lock has dropped, so a slow or re-entrant
/// collaborator never blocks other operations on the loan.
#[derive(Debug, Clone, Default)]
pub struct SideEffects {
    /// (account, delta) for the Account Ledger; a debit is negative
    pub ledger_debit: Option<(AccountId, Money)>,
    pub journal_entry: Option<JournalEntry>,
}

impl SideEffects {
    pub fn is_empty(&self) -> bool {
        self.ledger_debit.is_none() && self.journal_entry.is_none()
    }

    /// issue the instructions best-effort. Failures come back as warnings,
    /// never as errors; the core never retries.
    pub fn dispatch(
        self,
        ledger: Option<&dyn AccountLedger>,
        journal: Option<&dyn TransactionJournal>,
    ) -> Vec<CollaboratorWarning> {
        let mut warnings = Vec::new();

        if let (Some((account_id, delta)), Some(ledger)) = (self.ledger_debit, ledger) {
            if let Err(e) = ledger.adjust_balance(account_id, delta) {
                warnings.push(CollaboratorWarning {
                    collaborator: "account-ledger".to_string(),
                    message: e.message,
                });
            }
        }

        if let (Some(entry), Some(journal)) = (self.journal_entry, journal) {
            if let Err(e) = journal.append(entry) {
                warnings.push(CollaboratorWarning {
                    collaborator: "transaction-journal".to_string(),
                    message: e.message,
                });
            }
        }

        warnings
    }
}

/// result of a settlement, including best-effort side-effect failures
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub installment: LoanInstallment,
    pub outstanding: Money,
    pub loan_status: LoanStatus,
    pub warnings: Vec<CollaboratorWarning>,
}

impl SettlementOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// settle a pending (or overdue) installment.
///
/// Outstanding is reduced by the installment's SCHEDULED principal component,
/// never by a value derived from `paid_amount`; a paid amount differing from
/// the nominal EMI is recorded but not reconciled here. Re-settling is
/// rejected with `AlreadySettled`, not treated as success. Ledger and journal
/// instructions are returned as `SideEffects` for the caller to dispatch
/// after the per-loan lock drops; they never roll back the core mutation.
pub fn settle_installment(
    aggregate: &mut LoanAggregate,
    request: SettlementRequest,
) -> Result<(SettlementOutcome, SideEffects)> {
    if !aggregate.loan.is_active() {
        return Err(LoanError::LoanNotActive {
            status: aggregate.loan.status,
        });
    }
    if !request.paid_amount.is_positive() {
        return Err(LoanError::InvalidPaymentAmount {
            amount: request.paid_amount,
        });
    }

    let (principal_component, interest_component) = {
        let installment = aggregate
            .installment(request.installment_id)
            .ok_or(LoanError::InstallmentNotFound {
                id: request.installment_id,
            })?;
        if installment.is_paid() {
            return Err(LoanError::AlreadySettled {
                installment_id: request.installment_id,
            });
        }
        (installment.principal_component, installment.interest_component)
    };

    // fallible core mutation first, so a bounds violation settles nothing
    let outstanding =
        aggregate.apply_outstanding_delta(-principal_component, request.paid_date)?;

    let settled = {
        let installment = aggregate
            .installment_mut(request.installment_id)
            .ok_or(LoanError::InstallmentNotFound {
                id: request.installment_id,
            })?;
        installment.status = InstallmentStatus::Paid;
        installment.paid_date = Some(request.paid_date);
        installment.paid_amount = Some(request.paid_amount);
        installment.clone()
    };

    // supervisor rule: all installments paid also closes the loan
    if aggregate.loan.status == LoanStatus::Active && aggregate.all_installments_paid() {
        aggregate.close(request.paid_date);
    }

    let loan_id = aggregate.loan.id;
    aggregate.payments.push(LoanPayment {
        id: Uuid::new_v4(),
        loan_id,
        date: request.paid_date,
        amount: request.paid_amount,
        principal_paid: principal_component,
        interest_paid: interest_component,
        kind: PaymentKind::Emi,
        installment_id: Some(request.installment_id),
        account_id: request.account_id.or(aggregate.loan.linked_account),
        notes: None,
    });

    aggregate.events.emit(Event::InstallmentSettled {
        loan_id,
        installment_id: settled.id,
        installment_number: settled.number,
        paid_date: request.paid_date,
        paid_amount: request.paid_amount,
        principal_component,
        interest_component,
    });

    // collaborator instructions, gated by the loan's flags
    let account = request.account_id.or(aggregate.loan.linked_account);
    let mut effects = SideEffects::default();
    if aggregate.loan.affect_balance {
        if let Some(account_id) = account {
            effects.ledger_debit = Some((account_id, -request.paid_amount));
        }
    }
    if aggregate.loan.create_transaction {
        effects.journal_entry = Some(JournalEntry {
            account_id: account,
            source_loan_id: loan_id,
            amount: request.paid_amount,
            direction: Direction::Debit,
            date: request.paid_date,
            memo: format!("EMI {} - {}", settled.number, aggregate.loan.name),
        });
    }

    Ok((
        SettlementOutcome {
            installment: settled,
            outstanding,
            loan_status: aggregate.loan.status,
            warnings: Vec::new(),
        },
        effects,
    ))
}
