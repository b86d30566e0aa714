//! Operator console for the WeylGov governance contract.
//!
//! Reads come back from the ledger as hybrid positional/named records and are
//! normalized by [`decode`]; [`report`] lays them out, [`guard`] decides whether
//! a mutating call is redundant and [`workflow`] strings the steps together.

pub mod amount;
pub mod collector;
pub mod config;
pub mod decode;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod names;
pub mod receipt;
pub mod report;
pub mod session;
pub mod workflow;

pub use error::{ConsoleError, Result};
