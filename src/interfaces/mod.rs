//! Wire-facing types for the (external) boundary layer.

pub mod response;
