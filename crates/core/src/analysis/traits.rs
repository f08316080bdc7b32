//! Holdings analyzer traits.

use async_trait::async_trait;

use super::model::{AnalysisConfig, AnalysisResult, HoldingAnalysis, StatusConfig};
use crate::errors::Result;
use crate::holdings::Holding;

/// Trait defining the contract for holdings analysis.
#[async_trait]
pub trait HoldingsAnalyzerTrait: Send + Sync {
    /// Analyzes `holdings` for `subject_id`, serving a cached result when one
    /// is still within its time-to-live and `force_refresh` is false.
    ///
    /// Concurrent requests for the same subject share one computation; a
    /// request that arrives while another is computing waits for its result.
    async fn analyze(
        &self,
        subject_id: &str,
        holdings: &[Holding],
        force_refresh: bool,
    ) -> Result<AnalysisResult>;

    /// Returns the cached result for a subject without recomputing.
    /// `is_stale` is set when the entry is past its time-to-live.
    async fn get_cached_analysis(&self, subject_id: &str) -> Option<AnalysisResult>;

    /// Drops the cached result for a subject. Returns whether one existed.
    async fn clear_cache(&self, subject_id: &str) -> bool;

    async fn clear_all(&self);

    /// Scores a single holding outside any portfolio context. Not cached.
    fn analyze_holding(&self, holding: &Holding) -> HoldingAnalysis;

    /// Display configuration for every status, best first.
    fn status_config(&self) -> Vec<StatusConfig>;

    async fn get_config(&self) -> AnalysisConfig;

    /// Replaces the configuration. Cached entries are kept and judged against
    /// the new time-to-live from now on.
    async fn update_config(&self, config: AnalysisConfig) -> Result<()>;
}
