use serde::{Deserialize, Serialize};

use crate::ledger::Principal;

/// How `initialize_treasury` treats repeated calls.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryPolicy {
    /// Every call overwrites the treasury balance with the new amount.
    #[default]
    Repeatable,
    /// Only the first successful call takes effect.
    Once,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    pub owner: Principal,
    #[serde(default)]
    pub treasury_policy: TreasuryPolicy,
}

impl LedgerConfig {
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self {
            owner: owner.into(),
            treasury_policy: TreasuryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TreasuryPolicy) -> Self {
        self.treasury_policy = policy;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_repeatable() {
        let config = LedgerConfig::from_json(r#"{"owner":"ST1234"}"#).unwrap();
        assert_eq!(config.owner, "ST1234");
        assert_eq!(config.treasury_policy, TreasuryPolicy::Repeatable);
    }

    #[test]
    fn policy_parses_snake_case() {
        let config =
            LedgerConfig::from_json(r#"{"owner":"ST1234","treasury_policy":"once"}"#).unwrap();
        assert_eq!(config.treasury_policy, TreasuryPolicy::Once);
    }

    #[test]
    fn missing_owner_is_rejected() {
        assert!(LedgerConfig::from_json(r#"{"treasury_policy":"once"}"#).is_err());
    }
}
