//! Serializable ledger snapshots committed to by a SHA-256 state root.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{LedgerConfig, TreasuryPolicy};
use crate::ledger::{Amount, Budget, Ledger, Principal, ProjectId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("state root mismatch: recorded {recorded}, computed {computed}")]
    RootMismatch { recorded: String, computed: String },
    #[error("budgets hold {held} but only {allocated} was ever allocated")]
    Inconsistent { held: u128, allocated: Amount },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub owner: Principal,
    pub treasury_policy: TreasuryPolicy,
    pub initialized: bool,
    pub treasury_balance: Amount,
    pub total_allocations: Amount,
    pub budgets: BTreeMap<ProjectId, Budget>,
    #[serde(with = "serde_root")]
    pub state_root: [u8; 32],
}

impl LedgerSnapshot {
    pub fn compute_root(&self) -> [u8; 32] {
        compute_state_root(
            &self.owner,
            self.treasury_policy,
            self.initialized,
            self.treasury_balance,
            self.total_allocations,
            &self.budgets,
        )
    }

    /// Checks the recorded root and that budgets never exceed what was
    /// allocated in total. Overwritten budgets leave the counter ahead.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        let computed = self.compute_root();
        if computed != self.state_root {
            return Err(SnapshotError::RootMismatch {
                recorded: hex::encode(self.state_root),
                computed: hex::encode(computed),
            });
        }
        let held: u128 = self.budgets.values().map(|b| b.balance as u128).sum();
        if held > self.total_allocations as u128 {
            return Err(SnapshotError::Inconsistent {
                held,
                allocated: self.total_allocations,
            });
        }
        Ok(())
    }
}

impl Ledger {
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            owner: self.config.owner.clone(),
            treasury_policy: self.config.treasury_policy,
            initialized: self.initialized,
            treasury_balance: self.treasury_balance,
            total_allocations: self.total_allocations,
            budgets: self.budgets.clone(),
            state_root: self.state_root(),
        }
    }

    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(
            &self.config.owner,
            self.config.treasury_policy,
            self.initialized,
            self.treasury_balance,
            self.total_allocations,
            &self.budgets,
        )
    }

    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, SnapshotError> {
        snapshot.verify()?;
        Ok(Self {
            config: LedgerConfig {
                owner: snapshot.owner,
                treasury_policy: snapshot.treasury_policy,
            },
            treasury_balance: snapshot.treasury_balance,
            total_allocations: snapshot.total_allocations,
            budgets: snapshot.budgets,
            initialized: snapshot.initialized,
        })
    }
}

fn compute_state_root(
    owner: &str,
    policy: TreasuryPolicy,
    initialized: bool,
    treasury_balance: Amount,
    total_allocations: Amount,
    budgets: &BTreeMap<ProjectId, Budget>,
) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::with_capacity(budgets.len() + 1);
    let mut hasher = Sha256::new();
    hasher.update(b"treasury");
    hasher.update((owner.len() as u64).to_le_bytes());
    hasher.update(owner.as_bytes());
    hasher.update([policy as u8, initialized as u8]);
    hasher.update(treasury_balance.to_le_bytes());
    hasher.update(total_allocations.to_le_bytes());
    leaves.push(hasher.finalize().into());
    for (project, budget) in budgets {
        let mut hasher = Sha256::new();
        hasher.update(b"budget");
        hasher.update((project.len() as u64).to_le_bytes());
        hasher.update(project.as_bytes());
        hasher.update(budget.balance.to_le_bytes());
        hasher.update(budget.performance_score.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            // odd tail is paired with itself
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

mod serde_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded.trim()).map_err(D::Error::custom)?;
        bytes.try_into().map_err(|b: Vec<u8>| {
            D::Error::custom(format!("state root must be 32 bytes, got {}", b.len()))
        })
    }
}
