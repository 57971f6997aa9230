//! Owner-controlled treasury ledger.
//!
//! The [`ledger`] module holds the state machine: a single treasury whose
//! funds the owner moves into per-project budgets, each tagged with a
//! performance score. Around it sit the pieces a host needs to drive it:
//!
//! * [`config`]: owner identity and the treasury re-initialization policy.
//! * [`shared`]: a lock-serialized handle for multi-threaded hosts.
//! * [`snapshot`]: serializable state with a SHA-256 state root.
//! * [`request`]: JSON request/outcome envelopes.

pub mod config;
pub mod ledger;
pub mod request;
pub mod shared;
pub mod snapshot;

mod error;

pub use config::{LedgerConfig, TreasuryPolicy};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Amount, Budget, Ledger, Principal, ProjectId, Score};
pub use request::{LedgerRequest, Outcome, ReturnValue};
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, SnapshotError};
