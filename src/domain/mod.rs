//! Domain layer: entities, value objects and the repository ports both
//! engines depend on.

pub mod ledger;
pub mod money;
pub mod payment;
pub mod ports;
