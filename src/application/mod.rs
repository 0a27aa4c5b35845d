//! Application layer: the payment lifecycle engine, the account ledger engine
//! and the settlement orchestrator that composes the two. Services are
//! stateless and parameterized by injected store handles, so test doubles
//! slot in without process-wide singletons.

pub mod ledger;
pub mod payments;
pub mod settlement;
