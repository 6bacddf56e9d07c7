//! Violations: immutable records of a broken contract.

use crate::contract::{ContractId, ContractKind};
use crate::witness::compute_witness_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A concrete violation of a contract.
///
/// Carries the contract tag, the plaintiff (the object under contract), the
/// offending evidence, and optionally the violation that caused this one.
/// Cause chains are singly linked with the oldest cause innermost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{contract} violated by {plaintiff}: {description}")]
pub struct Violation {
    /// Deterministic ID over (contract, plaintiff, evidence).
    pub witness_id: String,

    pub contract: ContractId,

    pub description: String,

    /// Name of the object under contract.
    pub plaintiff: String,

    pub evidence: Value,

    #[source]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<Violation>>,
}

impl Violation {
    pub fn new(
        contract: ContractId,
        description: impl Into<String>,
        plaintiff: impl Into<String>,
        evidence: Value,
    ) -> Self {
        let plaintiff = plaintiff.into();
        let witness_id = compute_witness_id(&contract.name, contract.kind, &plaintiff, &evidence);
        Self {
            witness_id,
            contract,
            description: description.into(),
            plaintiff,
            evidence,
            cause: None,
        }
    }

    /// Attach `cause` as the innermost link of this violation's chain.
    ///
    /// If this violation already has a cause, the new cause is appended
    /// beneath the existing root so that no diagnostic link is lost.
    pub fn caused_by(mut self, cause: Violation) -> Self {
        let innermost = match self.cause.take() {
            Some(existing) => (*existing).caused_by(cause),
            None => cause,
        };
        self.cause = Some(Box::new(innermost));
        self
    }

    pub fn kind(&self) -> ContractKind {
        self.contract.kind
    }

    pub fn is_obligation(&self) -> bool {
        self.kind() == ContractKind::Obligation
    }

    pub fn is_guarantee(&self) -> bool {
        self.kind() == ContractKind::Guarantee
    }

    /// Iterate the chain starting with `self`, ending at the root cause.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// The innermost (oldest) cause, or `self` when there is none.
    pub fn root_cause(&self) -> &Violation {
        self.chain().last().unwrap_or(self)
    }

    /// Number of links in the chain, including `self`.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Whether any link in the chain was raised by the named contract.
    pub fn involves(&self, contract_name: &str) -> bool {
        self.chain().any(|link| link.contract.name == contract_name)
    }
}

/// Iterator over a violation's cause chain.
pub struct Chain<'a> {
    next: Option<&'a Violation>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Violation;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause.as_deref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    fn link(name: &str, plaintiff: &str) -> Violation {
        Violation::new(
            ContractId::obligation(name),
            format!("{name} failed"),
            plaintiff,
            json!({"at": plaintiff}),
        )
    }

    #[test]
    fn chain_walks_outermost_to_root() {
        let violation = link("outer", "pipeline")
            .caused_by(link("middle", "stage_1"))
            .caused_by(link("root", "input"));

        let names: Vec<&str> = violation
            .chain()
            .map(|v| v.contract.name.as_str())
            .collect();
        assert_eq!(names, vec!["outer", "middle", "root"]);
        assert_eq!(violation.root_cause().contract.name, "root");
        assert_eq!(violation.depth(), 3);
        assert!(violation.involves("middle"));
        assert!(!violation.involves("elsewhere"));
    }

    #[test]
    fn error_source_is_the_cause() {
        let violation = link("outer", "a").caused_by(link("inner", "b"));
        let source = violation.source().expect("cause should be the source");
        assert_eq!(
            source.to_string(),
            "obligation inner violated by b: inner failed"
        );
    }

    #[test]
    fn witness_id_ignores_the_cause() {
        let bare = link("outer", "a");
        let caused = link("outer", "a").caused_by(link("inner", "b"));
        assert_eq!(bare.witness_id, caused.witness_id);
        assert_ne!(bare, caused);
    }

    #[test]
    fn json_surface_is_camel_case_and_omits_missing_cause() {
        let violation = Violation::new(
            ContractId::guarantee("output_must_not_be_pending"),
            "operation output must not be pending",
            "map",
            json!({"variant": "pending"}),
        );
        let value = serde_json::to_value(&violation).expect("violation should serialize");
        assert!(value.get("cause").is_none());
        insta::assert_json_snapshot!(value, { ".witnessId" => "[witness]" }, @r###"
        {
          "contract": {
            "kind": "guarantee",
            "name": "output_must_not_be_pending"
          },
          "description": "operation output must not be pending",
          "evidence": {
            "variant": "pending"
          },
          "plaintiff": "map",
          "witnessId": "[witness]"
        }
        "###);
    }
}
