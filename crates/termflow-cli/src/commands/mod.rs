pub mod await_check;
pub mod contract_registry;
pub mod eval;
