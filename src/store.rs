use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::NaiveDate;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::loan::LoanAggregate;
use crate::types::{LoanId, LoanStatus};

impl LoanAggregate {
    /// the single authorized way to mutate `Loan.outstanding`.
    ///
    /// Rejects any delta that would push outstanding outside [0, principal].
    /// Legacy loans (principal 0) only enforce the zero floor, since no
    /// origination amount exists to bound against. Driving outstanding to
    /// zero closes the loan.
    pub fn apply_outstanding_delta(&mut self, delta: Money, today: NaiveDate) -> Result<Money> {
        let attempted = self.loan.outstanding + delta;

        if attempted.is_negative() || (!self.loan.is_legacy() && attempted > self.loan.principal) {
            return Err(LoanError::OutstandingBoundsViolation {
                attempted,
                principal: self.loan.principal,
            });
        }

        self.loan.outstanding = attempted;
        self.events.emit(Event::OutstandingAdjusted {
            loan_id: self.loan.id,
            delta,
            new_outstanding: attempted,
        });

        if attempted.is_zero() && self.loan.status == LoanStatus::Active {
            self.close(today);
        }

        Ok(attempted)
    }

    /// transition to closed and record it
    pub fn close(&mut self, today: NaiveDate) {
        let old_status = self.loan.status;
        self.loan.status = LoanStatus::Closed;
        self.events.emit(Event::StatusChanged {
            loan_id: self.loan.id,
            old_status,
            new_status: LoanStatus::Closed,
            on: today,
        });
        self.events.emit(Event::LoanClosed {
            loan_id: self.loan.id,
            closed_on: today,
        });
    }
}

/// registry of loan aggregates. Each loan sits behind its own mutex so
/// concurrent mutations to one loan serialize while different loans
/// proceed in parallel.
#[derive(Debug, Default)]
pub struct LoanStore {
    loans: RwLock<HashMap<LoanId, Arc<Mutex<LoanAggregate>>>>,
}

impl LoanStore {
    pub fn new() -> Self {
        Self {
            loans: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, aggregate: LoanAggregate) -> LoanId {
        let id = aggregate.loan.id;
        self.loans
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(Mutex::new(aggregate)));
        id
    }

    pub fn remove(&self, id: LoanId) -> Result<()> {
        self.loans
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .map(|_| ())
            .ok_or(LoanError::LoanNotFound { id })
    }

    pub fn contains(&self, id: LoanId) -> bool {
        self.loans
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id)
    }

    pub fn loan_ids(&self) -> Vec<LoanId> {
        self.loans
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }

    /// run `f` with exclusive access to one loan. The registry lock is
    /// released before the per-loan mutex is taken, so loans never block
    /// each other.
    pub fn with_loan<R>(
        &self,
        id: LoanId,
        f: impl FnOnce(&mut LoanAggregate) -> Result<R>,
    ) -> Result<R> {
        let entry = {
            let map = self.loans.read().unwrap_or_else(|e| e.into_inner());
            map.get(&id).cloned().ok_or(LoanError::LoanNotFound { id })?
        };
        let mut aggregate = entry.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::loan::Loan;
    use crate::types::LoanCategory;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn aggregate(principal: i64, outstanding: i64) -> LoanAggregate {
        LoanAggregate::new(Loan {
            id: Uuid::new_v4(),
            name: "test loan".to_string(),
            category: LoanCategory::Personal,
            lender: None,
            masked_account_number: None,
            principal: Money::from_major(principal),
            outstanding: Money::from_major(outstanding),
            rate: Rate::from_percentage(dec!(10)),
            tenure_months: 12,
            emi: Money::from_major(100),
            due_day: 5,
            start_date: date(2024, 1, 5),
            end_date: date(2025, 1, 5),
            status: LoanStatus::Active,
            linked_account: None,
            is_existing_loan: false,
            create_transaction: false,
            affect_balance: false,
        })
    }

    #[test]
    fn test_delta_rejected_outside_bounds() {
        let mut agg = aggregate(1000, 500);
        let today = date(2024, 6, 1);

        assert!(matches!(
            agg.apply_outstanding_delta(Money::from_major(-600), today),
            Err(LoanError::OutstandingBoundsViolation { .. })
        ));
        assert!(matches!(
            agg.apply_outstanding_delta(Money::from_major(600), today),
            Err(LoanError::OutstandingBoundsViolation { .. })
        ));
        // rejected deltas leave state untouched
        assert_eq!(agg.loan.outstanding, Money::from_major(500));
        assert_eq!(agg.loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_zero_outstanding_closes_loan() {
        let mut agg = aggregate(1000, 200);
        let new = agg
            .apply_outstanding_delta(Money::from_major(-200), date(2024, 6, 1))
            .unwrap();
        assert_eq!(new, Money::ZERO);
        assert_eq!(agg.loan.status, LoanStatus::Closed);

        let events = agg.events.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::LoanClosed { .. })));
    }

    #[test]
    fn test_legacy_loan_skips_upper_bound() {
        let mut agg = aggregate(0, 500);
        // corrections upward are allowed when no principal is recorded
        agg.apply_outstanding_delta(Money::from_major(100), date(2024, 6, 1))
            .unwrap();
        assert_eq!(agg.loan.outstanding, Money::from_major(600));
        // the zero floor still holds
        assert!(matches!(
            agg.apply_outstanding_delta(Money::from_major(-700), date(2024, 6, 1)),
            Err(LoanError::OutstandingBoundsViolation { .. })
        ));
    }

    #[test]
    fn test_store_lookup_and_remove() {
        let store = LoanStore::new();
        let id = store.insert(aggregate(1000, 1000));

        assert!(store.contains(id));
        let outstanding = store.with_loan(id, |agg| Ok(agg.loan.outstanding)).unwrap();
        assert_eq!(outstanding, Money::from_major(1000));

        store.remove(id).unwrap();
        assert!(!store.contains(id));
        assert!(matches!(
            store.with_loan(id, |agg| Ok(agg.loan.outstanding)),
            Err(LoanError::LoanNotFound { .. })
        ));
    }

    #[test]
    fn test_concurrent_deltas_serialize_per_loan() {
        let store = Arc::new(LoanStore::new());
        let id = store.insert(aggregate(1000, 1000));
        let today = date(2024, 6, 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .with_loan(id, |agg| {
                                agg.apply_outstanding_delta(Money::from_major(-1), today)
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 8 * 25 deltas of -1: no lost updates
        let outstanding = store.with_loan(id, |agg| Ok(agg.loan.outstanding)).unwrap();
        assert_eq!(outstanding, Money::from_major(800));
    }
}
