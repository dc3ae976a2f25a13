//! Shared helpers for the newsdesk crates: logging setup, runtime directory checks
//! and small wire types.

pub mod env;
pub mod types;
pub mod utils;
