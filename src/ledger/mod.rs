use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{LedgerConfig, TreasuryPolicy};
use crate::error::{LedgerError, LedgerResult};

pub type Principal = String;
pub type ProjectId = String;
pub type Amount = u64;
pub type Score = i64;

/// Funds allocated to a single project.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Budget {
    pub balance: Amount,
    /// Caller-supplied and never interpreted by the ledger.
    pub performance_score: Score,
}

/// Treasury plus the budgets carved out of it.
///
/// Only the owner given at construction may mutate the ledger. Every
/// successful allocation moves exactly `amount` out of the treasury and
/// adds the same `amount` to the allocation counter.
#[derive(Clone, Debug)]
pub struct Ledger {
    pub(crate) config: LedgerConfig,
    pub(crate) treasury_balance: Amount,
    pub(crate) total_allocations: Amount,
    pub(crate) budgets: BTreeMap<ProjectId, Budget>,
    pub(crate) initialized: bool,
}

impl Ledger {
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self::with_config(LedgerConfig::new(owner))
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            treasury_balance: 0,
            total_allocations: 0,
            budgets: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn owner(&self) -> &Principal {
        &self.config.owner
    }

    fn authorize(&self, sender: &str) -> LedgerResult<()> {
        if sender != self.config.owner {
            return Err(LedgerError::NotAuthorized {
                sender: sender.to_string(),
            });
        }
        Ok(())
    }

    /// Sets the treasury to `amount`, replacing whatever it held.
    ///
    /// Under [`TreasuryPolicy::Once`] only the first successful call is
    /// accepted.
    pub fn initialize_treasury(&mut self, amount: Amount, sender: &str) -> LedgerResult<bool> {
        self.authorize(sender).map_err(rejected("initialize_treasury"))?;
        if self.initialized && self.config.treasury_policy == TreasuryPolicy::Once {
            return Err(LedgerError::AlreadyInitialized).map_err(rejected("initialize_treasury"));
        }

        self.treasury_balance = amount;
        self.initialized = true;
        info!(amount, "treasury initialized");
        Ok(true)
    }

    /// Moves `amount` from the treasury into `project`, replacing any
    /// budget the project already had.
    pub fn allocate_budget(
        &mut self,
        project: &str,
        amount: Amount,
        initial_score: Score,
        sender: &str,
    ) -> LedgerResult<bool> {
        self.authorize(sender).map_err(rejected("allocate_budget"))?;
        let insufficient = || LedgerError::InvalidAmount {
            requested: amount,
            available: self.treasury_balance,
        };
        if amount > self.treasury_balance {
            return Err(insufficient()).map_err(rejected("allocate_budget"));
        }
        let total = self
            .total_allocations
            .checked_add(amount)
            .ok_or_else(insufficient)
            .map_err(rejected("allocate_budget"))?;

        self.budgets.insert(
            project.to_string(),
            Budget {
                balance: amount,
                performance_score: initial_score,
            },
        );
        self.treasury_balance -= amount;
        self.total_allocations = total;
        info!(
            project,
            amount,
            score = initial_score,
            treasury = self.treasury_balance,
            "budget allocated"
        );
        Ok(true)
    }

    pub fn get_project_budget(&self, project: &str) -> Option<&Budget> {
        self.budgets.get(project)
    }

    pub fn get_treasury_balance(&self) -> Amount {
        self.treasury_balance
    }

    pub fn total_allocations(&self) -> Amount {
        self.total_allocations
    }

    pub fn budgets(&self) -> impl Iterator<Item = (&ProjectId, &Budget)> {
        self.budgets.iter()
    }
}

fn rejected(op: &'static str) -> impl Fn(LedgerError) -> LedgerError {
    move |err| {
        warn!(op, code = err.code(), "{err}");
        err
    }
}
