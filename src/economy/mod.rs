//! Economy layer - resource ledger and passive production

pub mod ledger;
pub mod production;

pub use ledger::{Cost, ResourceLedger};
pub use production::{
    production_rates, tick_production, ProductionResult, ProductionRule, ProductionSource,
    ProductionState,
};
