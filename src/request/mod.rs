use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerResult;
use crate::ledger::{Amount, Budget, Ledger, Principal, ProjectId, Score};

/// A single call against the ledger, as carried over the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerRequest {
    InitializeTreasury {
        amount: Amount,
        sender: Principal,
    },
    AllocateBudget {
        project: ProjectId,
        amount: Amount,
        initial_score: Score,
        sender: Principal,
    },
    GetProjectBudget {
        project: ProjectId,
    },
    GetTreasuryBalance,
}

impl LedgerRequest {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            LedgerRequest::InitializeTreasury { .. } | LedgerRequest::AllocateBudget { .. }
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReturnValue {
    Accepted(bool),
    Budget(Option<Budget>),
    Balance(Amount),
}

/// `{"value": ...}` on success, `{"error": "<code>"}` on rejection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Value(ReturnValue),
    Error(String),
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

impl From<LedgerResult<bool>> for Outcome {
    fn from(result: LedgerResult<bool>) -> Self {
        match result {
            Ok(flag) => Outcome::Value(ReturnValue::Accepted(flag)),
            Err(err) => Outcome::Error(err.code().to_string()),
        }
    }
}

impl Ledger {
    pub fn execute(&mut self, request: &LedgerRequest) -> Outcome {
        debug!(?request, "executing request");
        match request {
            LedgerRequest::InitializeTreasury { amount, sender } => {
                self.initialize_treasury(*amount, sender).into()
            }
            LedgerRequest::AllocateBudget {
                project,
                amount,
                initial_score,
                sender,
            } => self
                .allocate_budget(project, *amount, *initial_score, sender)
                .into(),
            LedgerRequest::GetProjectBudget { project } => Outcome::Value(ReturnValue::Budget(
                self.get_project_budget(project).copied(),
            )),
            LedgerRequest::GetTreasuryBalance => {
                Outcome::Value(ReturnValue::Balance(self.get_treasury_balance()))
            }
        }
    }

    /// Answers read-only requests; `None` for anything that mutates.
    pub fn query(&self, request: &LedgerRequest) -> Option<Outcome> {
        let value = match request {
            LedgerRequest::GetProjectBudget { project } => {
                ReturnValue::Budget(self.get_project_budget(project).copied())
            }
            LedgerRequest::GetTreasuryBalance => ReturnValue::Balance(self.get_treasury_balance()),
            _ => return None,
        };
        Some(Outcome::Value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> LedgerRequest {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn requests_decode_from_tagged_json() {
        assert_eq!(
            parse(r#"{"op":"initialize_treasury","amount":1000,"sender":"ST1234"}"#),
            LedgerRequest::InitializeTreasury {
                amount: 1_000,
                sender: "ST1234".into()
            }
        );
        assert_eq!(
            parse(r#"{"op":"get_treasury_balance"}"#),
            LedgerRequest::GetTreasuryBalance
        );
        assert!(serde_json::from_str::<LedgerRequest>(
            r#"{"op":"initialize_treasury","amount":-5,"sender":"ST1234"}"#
        )
        .is_err());
    }

    #[test]
    fn outcomes_use_value_or_error_shape() {
        let mut ledger = Ledger::new("ST1234");
        let script = [
            r#"{"op":"initialize_treasury","amount":1000,"sender":"ST5678"}"#,
            r#"{"op":"initialize_treasury","amount":1000,"sender":"ST1234"}"#,
            r#"{"op":"allocate_budget","project":"ST9999","amount":1500,"initial_score":80,"sender":"ST1234"}"#,
            r#"{"op":"allocate_budget","project":"ST9999","amount":500,"initial_score":80,"sender":"ST1234"}"#,
            r#"{"op":"get_project_budget","project":"ST9999"}"#,
            r#"{"op":"get_project_budget","project":"nobody"}"#,
            r#"{"op":"get_treasury_balance"}"#,
        ];
        let rendered: Vec<String> = script
            .iter()
            .map(|line| serde_json::to_string(&ledger.execute(&parse(line))).unwrap())
            .collect();
        assert_eq!(
            rendered,
            vec![
                r#"{"error":"ERR-NOT-AUTHORIZED"}"#,
                r#"{"value":true}"#,
                r#"{"error":"ERR-INVALID-AMOUNT"}"#,
                r#"{"value":true}"#,
                r#"{"value":{"balance":500,"performance_score":80}}"#,
                r#"{"value":null}"#,
                r#"{"value":500}"#,
            ]
        );
    }

    #[test]
    fn outcomes_decode_back() {
        let outcome: Outcome = serde_json::from_str(r#"{"value":null}"#).unwrap();
        assert_eq!(outcome, Outcome::Value(ReturnValue::Budget(None)));
        let outcome: Outcome = serde_json::from_str(r#"{"value":42}"#).unwrap();
        assert_eq!(outcome, Outcome::Value(ReturnValue::Balance(42)));
        let outcome: Outcome = serde_json::from_str(r#"{"error":"ERR-INVALID-AMOUNT"}"#).unwrap();
        assert!(outcome.is_error());
    }

    #[test]
    fn query_refuses_mutations() {
        let ledger = Ledger::new("ST1234");
        let request = LedgerRequest::InitializeTreasury {
            amount: 1,
            sender: "ST1234".into(),
        };
        assert!(request.is_mutation());
        assert!(ledger.query(&request).is_none());
        assert_eq!(ledger.get_treasury_balance(), 0);
    }
}
