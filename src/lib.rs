//! Core engines for the payment hub: the payment lifecycle state machine and
//! the append-only account ledger, behind repository ports so storage backends
//! and the (external) HTTP boundary stay swappable.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
