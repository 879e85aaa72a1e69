//! CLI command implementations
//!
//! Each module contains the command definitions and execution logic
//! for one group of operations.

pub mod account;
pub mod approvers;
pub mod export;
pub mod proposals;
pub mod vote;
