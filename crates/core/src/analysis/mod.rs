//! Holdings health analysis.
//!
//! Classifies each holding into a health status from its returns, scores it
//! on four components and rolls the results into a portfolio summary with
//! recommendations.
//!
//! - **Models** (`model.rs`) - Status, scores, summary, result and config types
//! - **Scoring** (`scoring.rs`) - Pure, deterministic scoring functions
//! - **Traits** (`traits.rs`) - The analyzer contract
//! - **Service** (`service.rs`) - Cached analyzer with per-subject single flight

pub mod model;
pub mod scoring;
pub mod service;
pub mod traits;

pub use model::{
    AnalysisConfig, AnalysisResult, AnalysisSummary, DataQuality, HealthTrend, HoldingAnalysis,
    HoldingHealthStatus, HoldingScores, StatusConfig,
};
pub use service::HoldingsAnalyzer;
pub use traits::HoldingsAnalyzerTrait;
