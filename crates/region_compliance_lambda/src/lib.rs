//! AWS-oriented adapters and handlers for the region usage Config rule.
//!
//! This crate owns runtime integration details (Lambda handler wiring, EC2
//! inventory and AWS Config evaluation adapters). Contract and verdict
//! primitives live in `region_compliance_core`.

pub mod adapters;
pub mod handlers;
pub mod settings;
