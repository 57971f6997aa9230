use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::LedgerResult;
use crate::ledger::{Amount, Budget, Ledger, Score};
use crate::request::{LedgerRequest, Outcome};
use crate::snapshot::LedgerSnapshot;

/// Cloneable handle for hosts that call the ledger from several threads.
///
/// Each mutation holds the write lock across its check and its update,
/// so concurrent allocations are validated against the current balance.
/// Reads hand back owned copies taken under the read lock.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    pub fn initialize_treasury(&self, amount: Amount, sender: &str) -> LedgerResult<bool> {
        self.inner.write().initialize_treasury(amount, sender)
    }

    pub fn allocate_budget(
        &self,
        project: &str,
        amount: Amount,
        initial_score: Score,
        sender: &str,
    ) -> LedgerResult<bool> {
        self.inner
            .write()
            .allocate_budget(project, amount, initial_score, sender)
    }

    pub fn get_project_budget(&self, project: &str) -> Option<Budget> {
        self.inner.read().get_project_budget(project).copied()
    }

    pub fn get_treasury_balance(&self) -> Amount {
        self.inner.read().get_treasury_balance()
    }

    pub fn total_allocations(&self) -> Amount {
        self.inner.read().total_allocations()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.read().snapshot()
    }

    pub fn execute(&self, request: &LedgerRequest) -> Outcome {
        // reads share the lock; only mutations take it exclusively
        if !request.is_mutation() {
            if let Some(outcome) = self.inner.read().query(request) {
                return outcome;
            }
        }
        self.inner.write().execute(request)
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_allocations_never_overdraw() {
        let shared = SharedLedger::new(Ledger::new("owner"));
        shared.initialize_treasury(1_000, "owner").unwrap();

        let accepted: usize = thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let shared = shared.clone();
                    scope.spawn(move || {
                        shared
                            .allocate_budget(&format!("project-{i}"), 100, i, "owner")
                            .is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().ok())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(accepted, 10);
        assert_eq!(shared.get_treasury_balance(), 0);
        assert_eq!(shared.total_allocations(), 1_000);
        assert!(shared.snapshot().verify().is_ok());
    }

    #[test]
    fn readers_see_whole_allocations() {
        let shared = SharedLedger::new(Ledger::new("owner"));
        shared.initialize_treasury(10_000, "owner").unwrap();

        thread::scope(|scope| {
            let writer = shared.clone();
            scope.spawn(move || {
                for i in 0..100 {
                    writer
                        .allocate_budget(&format!("p{i}"), 100, 0, "owner")
                        .unwrap();
                }
            });
            for _ in 0..4 {
                let reader = shared.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let snapshot = reader.snapshot();
                        assert_eq!(snapshot.treasury_balance + snapshot.total_allocations, 10_000);
                    }
                });
            }
        });
    }

    #[test]
    fn execute_routes_reads_and_writes() {
        let shared = SharedLedger::from(Ledger::new("owner"));
        let outcome = shared.execute(&LedgerRequest::InitializeTreasury {
            amount: 700,
            sender: "owner".into(),
        });
        assert!(!outcome.is_error());
        assert_eq!(
            shared.execute(&LedgerRequest::GetTreasuryBalance),
            Outcome::Value(crate::request::ReturnValue::Balance(700))
        );
        assert_eq!(shared.get_project_budget("missing"), None);

        let rejected = shared.execute(&LedgerRequest::AllocateBudget {
            project: "p".into(),
            amount: 100,
            initial_score: 5,
            sender: "outsider".into(),
        });
        assert_eq!(rejected, Outcome::Error("ERR-NOT-AUTHORIZED".into()));
        assert_eq!(
            shared.execute(&LedgerRequest::GetProjectBudget {
                project: "p".into()
            }),
            Outcome::Value(crate::request::ReturnValue::Budget(None))
        );
        assert_eq!(shared.get_treasury_balance(), 700);
    }
}
