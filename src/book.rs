use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use uuid::Uuid;

use crate::collaborators::{AccountLedger, TransactionJournal};
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::loan::{Loan, LoanAggregate, LoanPayment, LoanTerm};
use crate::payments::{self, AdHocPayment};
use crate::reconcile::{self, TermChange};
use crate::schedule;
use crate::settlement::{self, SettlementOutcome, SettlementRequest};
use crate::store::LoanStore;
use crate::types::{
    mask_account_number, AccountId, InstallmentId, LoanCategory, LoanId, LoanStatus, LoanSummary,
    PaymentId, TermId, UpcomingEmi,
};
use crate::views::{InstallmentView, LoanView, SummaryView};

/// parameters for onboarding a loan mid-life: the operator supplies the
/// current outstanding and the next EMI date; the schedule amortizes the
/// outstanding over the remaining tenure, not the original principal
#[derive(Debug, Clone)]
pub struct ExistingLoan {
    pub outstanding: Money,
    pub next_emi_date: NaiveDate,
}

/// parameters for creating a loan
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub name: String,
    pub category: LoanCategory,
    pub lender: Option<String>,
    /// raw account number; only the masked form is stored
    pub account_number: Option<String>,
    /// zero is allowed only when onboarding a legacy loan with no
    /// origination data
    pub principal: Money,
    pub rate: Rate,
    /// tenure from origination, or months remaining for existing loans
    pub tenure_months: u32,
    pub due_day: u32,
    pub start_date: NaiveDate,
    pub linked_account: Option<AccountId>,
    pub create_transaction: bool,
    pub affect_balance: bool,
    pub existing: Option<ExistingLoan>,
}

/// the loan book: owns the record store and orchestrates creation, status
/// transitions, settlement, term changes, and summary aggregation
pub struct LoanBook {
    store: LoanStore,
    ledger: Option<Arc<dyn AccountLedger>>,
    journal: Option<Arc<dyn TransactionJournal>>,
}

impl Default for LoanBook {
    fn default() -> Self {
        Self::new()
    }
}

impl LoanBook {
    pub fn new() -> Self {
        Self {
            store: LoanStore::new(),
            ledger: None,
            journal: None,
        }
    }

    /// wire the external Account Ledger collaborator
    pub fn with_ledger(mut self, ledger: Arc<dyn AccountLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// wire the external Transaction Journal collaborator
    pub fn with_journal(mut self, journal: Arc<dyn TransactionJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// create a loan and synthesize its first term and installment run
    pub fn create_loan(&self, new: NewLoan) -> Result<LoanId> {
        if !(1..=31).contains(&new.due_day) {
            return Err(LoanError::InvalidLoanInput {
                message: format!("due day must be 1-31, got {}", new.due_day),
            });
        }
        if new.name.trim().is_empty() {
            return Err(LoanError::InvalidLoanInput {
                message: "loan name must not be empty".to_string(),
            });
        }
        if new.principal.is_negative() {
            return Err(LoanError::InvalidLoanInput {
                message: format!("principal must not be negative, got {}", new.principal),
            });
        }
        if new.principal.is_zero() && new.existing.is_none() {
            return Err(LoanError::InvalidLoanInput {
                message: "principal 0 is only allowed when onboarding an existing loan"
                    .to_string(),
            });
        }
        if let Some(existing) = &new.existing {
            if !new.principal.is_zero() && existing.outstanding > new.principal {
                return Err(LoanError::InvalidLoanInput {
                    message: format!(
                        "outstanding {} exceeds principal {}",
                        existing.outstanding, new.principal
                    ),
                });
            }
        }

        // existing loans amortize the supplied outstanding from the supplied
        // next EMI date; new loans amortize the principal from the start date
        let (amortize, first_due, outstanding) = match &new.existing {
            Some(existing) => (
                existing.outstanding,
                existing.next_emi_date,
                existing.outstanding,
            ),
            None => (
                new.principal,
                schedule::next_due_after(new.start_date, new.due_day),
                new.principal,
            ),
        };

        let rows = schedule::compute_schedule(
            amortize,
            new.rate,
            new.tenure_months,
            first_due,
            new.due_day,
        )?;
        let emi = rows[0].emi;
        let end_date = rows.last().map(|r| r.due_date).unwrap_or(first_due);

        let loan_id = Uuid::new_v4();
        let loan = Loan {
            id: loan_id,
            name: new.name,
            category: new.category,
            lender: new.lender,
            masked_account_number: new.account_number.as_deref().map(mask_account_number),
            principal: new.principal,
            outstanding,
            rate: new.rate,
            tenure_months: new.tenure_months,
            emi,
            due_day: new.due_day,
            start_date: new.start_date,
            end_date,
            status: LoanStatus::Active,
            linked_account: new.linked_account,
            is_existing_loan: new.existing.is_some(),
            create_transaction: new.create_transaction,
            affect_balance: new.affect_balance,
        };

        let mut aggregate = LoanAggregate::new(loan);
        aggregate.terms.push(LoanTerm {
            id: Uuid::new_v4(),
            loan_id,
            generation: 1,
            effective_from: new.start_date,
            effective_to: None,
            rate: new.rate,
            tenure_months: new.tenure_months,
            emi,
            outstanding_at_change: outstanding,
            reason: "origination".to_string(),
        });
        aggregate.installments = reconcile::materialize_run(loan_id, 1, rows);
        aggregate.events.emit(Event::LoanCreated {
            loan_id,
            principal: aggregate.loan.principal,
            outstanding,
            rate: aggregate.loan.rate,
            tenure_months: aggregate.loan.tenure_months,
            is_existing_loan: aggregate.loan.is_existing_loan,
        });

        Ok(self.store.insert(aggregate))
    }

    pub fn get_loan(&self, id: LoanId) -> Result<Loan> {
        self.store.with_loan(id, |agg| Ok(agg.loan.clone()))
    }

    /// serializable snapshot with derived progress
    pub fn loan_view(&self, id: LoanId) -> Result<LoanView> {
        self.store.with_loan(id, |agg| Ok(LoanView::from_loan(&agg.loan)))
    }

    pub fn list_loans(&self) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .store
            .loan_ids()
            .into_iter()
            .filter_map(|id| self.store.with_loan(id, |agg| Ok(agg.loan.clone())).ok())
            .collect();
        loans.sort_by(|a, b| (a.start_date, a.name.clone()).cmp(&(b.start_date, b.name.clone())));
        loans
    }

    pub fn delete_loan(&self, id: LoanId) -> Result<()> {
        self.store.remove(id)
    }

    /// installments in due order, with overdue derived from today
    pub fn list_installments(
        &self,
        id: LoanId,
        time: &SafeTimeProvider,
    ) -> Result<Vec<InstallmentView>> {
        let today = time.now().date_naive();
        self.store.with_loan(id, |agg| {
            let mut views: Vec<InstallmentView> = agg
                .installments
                .iter()
                .map(|i| InstallmentView::from_installment(i, today))
                .collect();
            views.sort_by_key(|v| (v.due_date, v.number));
            Ok(views)
        })
    }

    pub fn list_terms(&self, id: LoanId) -> Result<Vec<LoanTerm>> {
        self.store.with_loan(id, |agg| {
            let mut terms = agg.terms.clone();
            terms.sort_by_key(|t| t.effective_from);
            Ok(terms)
        })
    }

    pub fn list_payments(&self, id: LoanId) -> Result<Vec<LoanPayment>> {
        self.store.with_loan(id, |agg| Ok(agg.payments.clone()))
    }

    /// settle a scheduled installment, instructing collaborators per the
    /// loan's flags; collaborator failures surface as warnings on the outcome
    pub fn settle_installment(
        &self,
        loan_id: LoanId,
        installment_id: InstallmentId,
        paid_date: NaiveDate,
        paid_amount: Money,
        account_id: Option<AccountId>,
    ) -> Result<SettlementOutcome> {
        let (mut outcome, effects) = self.store.with_loan(loan_id, |agg| {
            settlement::settle_installment(
                agg,
                SettlementRequest {
                    installment_id,
                    paid_date,
                    paid_amount,
                    account_id,
                },
            )
        })?;

        // ledger/journal calls run after the per-loan lock drops, so a slow
        // or re-entrant collaborator cannot block other operations on the loan
        let warnings = effects.dispatch(self.ledger.as_deref(), self.journal.as_deref());
        if !warnings.is_empty() {
            // re-lock briefly to record the failures; if the loan raced a
            // delete the warnings still reach the caller
            let _ = self.store.with_loan(loan_id, |agg| {
                for warning in &warnings {
                    agg.events.emit(Event::CollaboratorCallFailed {
                        loan_id,
                        collaborator: warning.collaborator.clone(),
                        message: warning.message.clone(),
                    });
                }
                Ok(())
            });
            outcome.warnings = warnings;
        }
        Ok(outcome)
    }

    /// revise rate/tenure/EMI from a date forward, regenerating the
    /// remaining schedule
    pub fn apply_term_change(&self, loan_id: LoanId, change: TermChange) -> Result<TermId> {
        self.store
            .with_loan(loan_id, |agg| reconcile::apply_term_change(agg, change))
    }

    /// record a prepayment / partial payment / off-schedule EMI payment
    pub fn record_payment(&self, loan_id: LoanId, payment: AdHocPayment) -> Result<PaymentId> {
        self.store
            .with_loan(loan_id, |agg| payments::record_payment(agg, payment))
            .map(|p| p.id)
    }

    /// explicit operator action; terminal
    pub fn mark_defaulted(
        &self,
        loan_id: LoanId,
        reason: impl Into<String>,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let today = time.now().date_naive();
        let reason = reason.into();
        self.store.with_loan(loan_id, |agg| {
            if !agg.loan.is_active() {
                return Err(LoanError::LoanNotActive {
                    status: agg.loan.status,
                });
            }
            let old_status = agg.loan.status;
            agg.loan.status = LoanStatus::Defaulted;
            agg.events.emit(Event::StatusChanged {
                loan_id,
                old_status,
                new_status: LoanStatus::Defaulted,
                on: today,
            });
            agg.events.emit(Event::LoanDefaulted {
                loan_id,
                defaulted_on: today,
                reason,
            });
            Ok(())
        })
    }

    /// aggregate across all loans: active count, total outstanding, EMI due
    /// in the current calendar month, and the next EMI falling due
    pub fn loan_summary(&self, time: &SafeTimeProvider) -> LoanSummary {
        let today = time.now().date_naive();
        let mut summary = LoanSummary {
            active_loans: 0,
            total_outstanding: Money::ZERO,
            emi_due_this_month: Money::ZERO,
            next_emi_due: None,
        };

        for id in self.store.loan_ids() {
            let partial = self.store.with_loan(id, |agg| {
                if !agg.loan.is_active() {
                    return Ok(None);
                }
                let due_this_month = agg
                    .installments
                    .iter()
                    .filter(|i| {
                        i.is_pending()
                            && i.due_date.year() == today.year()
                            && i.due_date.month() == today.month()
                    })
                    .map(|i| i.emi)
                    .fold(Money::ZERO, |acc, x| acc + x);
                let next = agg.next_pending().map(|i| UpcomingEmi {
                    loan_id: agg.loan.id,
                    due_date: i.due_date,
                    amount: i.emi,
                });
                Ok(Some((agg.loan.outstanding, due_this_month, next)))
            });

            if let Ok(Some((outstanding, due_this_month, next))) = partial {
                summary.active_loans += 1;
                summary.total_outstanding += outstanding;
                summary.emi_due_this_month += due_this_month;
                if let Some(upcoming) = next {
                    let is_earlier = summary
                        .next_emi_due
                        .map(|cur| upcoming.due_date < cur.due_date)
                        .unwrap_or(true);
                    if is_earlier {
                        summary.next_emi_due = Some(upcoming);
                    }
                }
            }
        }

        summary
    }

    /// summary stamped with the as-of date, for serialization
    pub fn summary_view(&self, time: &SafeTimeProvider) -> SummaryView {
        SummaryView::new(self.loan_summary(time), time.now().date_naive())
    }

    /// drain events collected for one loan
    pub fn take_events(&self, loan_id: LoanId) -> Result<Vec<Event>> {
        self.store.with_loan(loan_id, |agg| Ok(agg.events.take_events()))
    }
}
