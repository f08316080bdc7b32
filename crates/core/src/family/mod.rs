//! Family portfolio aggregation.
//!
//! Rolls individual members' fund holdings up into a consolidated family view
//! with value-weighted returns, XIRR and asset allocation. Only linked members
//! count towards family totals.

mod family_calculator;
mod family_model;
mod family_service;
mod family_traits;

pub use family_calculator::*;
pub use family_model::*;
pub use family_service::*;
pub use family_traits::*;

#[cfg(test)]
mod family_service_tests;
