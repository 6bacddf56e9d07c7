use crate::support::{EXIT_REJECTED, print_json_or_exit};
use termflow_contract::{
    ContractDescriptor, ContractKind, contract_registry_json, lookup_contract, merge_registries,
};

/// Every contract the termflow crates can raise, ordered by kind then name.
pub fn registry() -> Vec<ContractDescriptor> {
    merge_registries(&[
        termflow_term::CONTRACTS,
        termflow_pipeline::CONTRACTS,
        termflow_harness::CONTRACTS,
    ])
}

pub fn run(name: Option<&str>, json_output: bool) {
    let registry = registry();

    if let Some(name) = name {
        let Some(descriptor) = lookup_contract(&registry, name) else {
            eprintln!("error: unknown contract: {name}");
            std::process::exit(EXIT_REJECTED);
        };
        if json_output {
            print_json_or_exit(&serde_json::json!(descriptor), "contract");
        } else {
            println!("{} {}: {}", descriptor.kind, descriptor.name, descriptor.description);
        }
        return;
    }

    let payload = contract_registry_json(&registry);
    if json_output {
        print_json_or_exit(&payload, "contract-registry");
        return;
    }

    let count = |kind: ContractKind| registry.iter().filter(|d| d.kind == kind).count();
    println!("termflow contract-registry");
    println!("  Obligations: {}", count(ContractKind::Obligation));
    println!("  Guarantees: {}", count(ContractKind::Guarantee));
    for descriptor in &registry {
        println!("  - {} {}: {}", descriptor.kind, descriptor.name, descriptor.description);
    }
}
