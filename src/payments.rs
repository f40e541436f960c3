use chrono::NaiveDate;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::loan::{LoanAggregate, LoanPayment};
use crate::types::{AccountId, PaymentKind};

/// an out-of-schedule payment to record against a loan
#[derive(Debug, Clone)]
pub struct AdHocPayment {
    pub date: NaiveDate,
    pub amount: Money,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub kind: PaymentKind,
    pub account_id: Option<AccountId>,
    pub notes: Option<String>,
}

/// record a prepayment, partial payment, or off-schedule EMI payment.
///
/// Prepayments and partial payments reduce outstanding by `principal_paid`
/// through the store's authorized delta path. EMI-kind records are audit
/// only; scheduled settlement owns that principal reduction. This never
/// touches the installment schedule: a caller wanting the prepayment to
/// shorten tenure or lower the EMI invokes a term change separately.
pub fn record_payment(aggregate: &mut LoanAggregate, payment: AdHocPayment) -> Result<LoanPayment> {
    if !aggregate.loan.is_active() {
        return Err(LoanError::LoanNotActive {
            status: aggregate.loan.status,
        });
    }
    if !payment.amount.is_positive() {
        return Err(LoanError::InvalidPaymentAmount {
            amount: payment.amount,
        });
    }
    // split must reassemble to the amount within one minor unit
    let split = payment.principal_paid + payment.interest_paid;
    if (split - payment.amount).abs() > Money::from_minor(1) {
        return Err(LoanError::InvalidPaymentAmount {
            amount: payment.amount,
        });
    }

    if matches!(payment.kind, PaymentKind::Prepayment | PaymentKind::Partial)
        && payment.principal_paid.is_positive()
    {
        aggregate.apply_outstanding_delta(-payment.principal_paid, payment.date)?;
    }

    let record = LoanPayment {
        id: Uuid::new_v4(),
        loan_id: aggregate.loan.id,
        date: payment.date,
        amount: payment.amount,
        principal_paid: payment.principal_paid,
        interest_paid: payment.interest_paid,
        kind: payment.kind,
        installment_id: None,
        account_id: payment.account_id,
        notes: payment.notes,
    };

    aggregate.events.emit(Event::PaymentRecorded {
        loan_id: record.loan_id,
        payment_id: record.id,
        kind: record.kind,
        amount: record.amount,
        principal_paid: record.principal_paid,
        interest_paid: record.interest_paid,
        date: record.date,
    });

    aggregate.payments.push(record.clone());
    Ok(record)
}
