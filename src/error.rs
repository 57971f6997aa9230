use thiserror::Error;

use crate::ledger::{Amount, Principal};

/// Rejections returned by the allocation ledger.
///
/// Every variant is caller-correctable and leaves the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The sender of a mutating call is not the ledger owner.
    #[error("sender {sender} is not authorized to mutate the ledger")]
    NotAuthorized { sender: Principal },

    /// The allocation cannot be covered by the treasury.
    #[error("invalid amount {requested}: treasury holds {available}")]
    InvalidAmount { requested: Amount, available: Amount },

    /// The treasury was already initialized under a one-time policy.
    #[error("treasury already initialized")]
    AlreadyInitialized,
}

impl LedgerError {
    /// Stable wire code, as surfaced in request outcomes.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotAuthorized { .. } => "ERR-NOT-AUTHORIZED",
            LedgerError::InvalidAmount { .. } => "ERR-INVALID-AMOUNT",
            LedgerError::AlreadyInitialized => "ERR-ALREADY-INITIALIZED",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
