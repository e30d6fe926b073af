//! Region usage compliance domain primitives.
//!
//! This crate owns the AWS Config rule contract and the deterministic verdict
//! logic. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod error;
pub mod verdict;
