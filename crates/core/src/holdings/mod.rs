//! Holdings module - the fund position model shared by aggregation and analysis.

mod holdings_model;


pub use holdings_model::{AssetClass, FundMetrics, Holding, NewHolding};
