//! Familyfolio Core - family portfolio aggregation and holdings analysis.
//!
//! This crate holds the computational core of the Familyfolio apps: it rolls
//! family members' mutual-fund holdings up into a consolidated family view and
//! scores each holding's health with a time-bounded result cache. It performs
//! no I/O; fetching holdings and presenting results is left to the host.

pub mod analysis;
pub mod constants;
pub mod errors;
pub mod family;
pub mod holdings;
pub mod utils;

// Re-export common types from the domain modules
pub use analysis::*;
pub use family::*;
pub use holdings::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
