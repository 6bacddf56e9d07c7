//! Contract registry surface.
//!
//! Every crate that raises violations publishes the contracts it can raise
//! as a `CONTRACTS` table of [`ContractDescriptor`]s. The tables are merged
//! into one deterministic JSON document for tooling and documentation.

use crate::contract::{ContractId, ContractKind};
use serde::Serialize;
use serde_json::{Value, json};

pub const CONTRACT_REGISTRY_SCHEMA: u64 = 1;
pub const CONTRACT_REGISTRY_KIND: &str = "termflow.contract_registry.v1";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractDescriptor {
    pub name: &'static str,
    pub kind: ContractKind,
    pub description: &'static str,
}

impl ContractDescriptor {
    pub const fn obligation(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ContractKind::Obligation,
            description,
        }
    }

    pub const fn guarantee(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ContractKind::Guarantee,
            description,
        }
    }

    pub fn id(&self) -> ContractId {
        ContractId::new(self.name, self.kind)
    }
}

/// Merge descriptor tables, ordered by kind then name. Duplicates (same
/// name and kind) collapse to the first occurrence.
pub fn merge_registries(tables: &[&[ContractDescriptor]]) -> Vec<ContractDescriptor> {
    let mut merged: Vec<ContractDescriptor> = Vec::new();
    for descriptor in tables.iter().flat_map(|table| table.iter()) {
        if !merged
            .iter()
            .any(|seen| seen.name == descriptor.name && seen.kind == descriptor.kind)
        {
            merged.push(*descriptor);
        }
    }
    merged.sort_by(|a, b| (a.kind, a.name).cmp(&(b.kind, b.name)));
    merged
}

pub fn lookup<'a>(registry: &'a [ContractDescriptor], name: &str) -> Option<&'a ContractDescriptor> {
    registry.iter().find(|descriptor| descriptor.name == name)
}

pub fn contract_registry_json(registry: &[ContractDescriptor]) -> Value {
    json!({
        "schema": CONTRACT_REGISTRY_SCHEMA,
        "registryKind": CONTRACT_REGISTRY_KIND,
        "contracts": registry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &[ContractDescriptor] = &[
        ContractDescriptor::guarantee("b_guarantee", "b"),
        ContractDescriptor::obligation("z_obligation", "z"),
    ];
    const SECOND: &[ContractDescriptor] = &[
        ContractDescriptor::obligation("a_obligation", "a"),
        ContractDescriptor::obligation("z_obligation", "duplicate"),
    ];

    #[test]
    fn merge_orders_obligations_first_and_drops_duplicates() {
        let merged = merge_registries(&[FIRST, SECOND]);
        let names: Vec<&str> = merged.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a_obligation", "z_obligation", "b_guarantee"]);
        assert_eq!(
            lookup(&merged, "z_obligation").map(|d| d.description),
            Some("z")
        );
    }

    #[test]
    fn registry_json_is_deterministic() {
        let merged = merge_registries(&[SECOND, FIRST]);
        let first = contract_registry_json(&merged);
        let second = contract_registry_json(&merge_registries(&[FIRST, SECOND]));
        assert_eq!(first["contracts"].as_array().map(Vec::len), Some(3));
        assert_eq!(
            first.get("registryKind").and_then(Value::as_str),
            Some(CONTRACT_REGISTRY_KIND)
        );
        assert_eq!(first["contracts"][0]["name"], "a_obligation");
        assert_eq!(first["contracts"][2]["kind"], "guarantee");
        // Merge order only affects which duplicate wins.
        assert_ne!(first, second);
    }
}
