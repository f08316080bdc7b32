//! Holdings analyzer service.
//!
//! Wraps the pure scoring functions with a per-subject result cache. Readers
//! of a fresh entry never wait; a recompute runs outside the cache lock and
//! swaps its result in when done, so the previous entry stays readable until
//! then. At most one recompute per subject is in flight.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::errors::{Result, ValidationError};
use crate::holdings::Holding;
use crate::utils::time_utils::strictly_after;
use crate::utils::{Clock, SystemClock};

use super::model::{
    AnalysisConfig, AnalysisResult, HoldingAnalysis, HoldingHealthStatus, StatusConfig,
};
use super::scoring;
use super::traits::HoldingsAnalyzerTrait;

/// Cache entry for an analysis result.
struct CachedAnalysis {
    result: AnalysisResult,
    cached_at: DateTime<Utc>,
    /// Commit sequence number, unique across subjects
    generation: u64,
}

impl CachedAnalysis {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at < ttl
    }
}

/// Service for scoring holdings and caching the result per subject.
pub struct HoldingsAnalyzer {
    /// Current configuration
    config: RwLock<AnalysisConfig>,

    /// Latest result per subject
    cache: RwLock<HashMap<String, CachedAnalysis>>,

    /// Per-subject gates serialising recomputes
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,

    /// Next commit sequence number
    next_generation: AtomicU64,

    clock: Arc<dyn Clock>,
}

impl Default for HoldingsAnalyzer {
    fn default() -> Self {
        Self::build(AnalysisConfig::default(), Arc::new(SystemClock))
    }
}

impl HoldingsAnalyzer {
    /// Creates an analyzer using the wall clock.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an analyzer reading time from `clock` (for testing).
    pub fn with_clock(config: AnalysisConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: AnalysisConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: RwLock::new(config),
            cache: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            clock,
        }
    }

    fn validate_subject(subject_id: &str) -> Result<&str> {
        let trimmed = subject_id.trim();
        debug_assert!(!trimmed.is_empty(), "analyze called without a subject id");
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("subject_id".to_string()).into());
        }
        Ok(trimmed)
    }

    /// Gate for a subject, created on first use.
    fn gate(&self, subject_id: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| {
            warn!("Analyzer gate map mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        Arc::clone(
            gates
                .entry(subject_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Forgets gates nobody is holding or waiting on.
    fn prune_gates(&self, subject_id: Option<&str>) {
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| {
            warn!("Analyzer gate map mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        match subject_id {
            Some(id) => {
                if gates.get(id).is_some_and(|g| Arc::strong_count(g) == 1) {
                    gates.remove(id);
                }
            }
            None => gates.retain(|_, g| Arc::strong_count(g) > 1),
        }
    }

    async fn commit(&self, result: &AnalysisResult) {
        let mut cache = self.cache.write().await;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        cache.insert(
            result.subject_id.clone(),
            CachedAnalysis {
                result: result.clone(),
                cached_at: result.analyzed_at,
                generation,
            },
        );
    }
}

#[async_trait]
impl HoldingsAnalyzerTrait for HoldingsAnalyzer {
    async fn analyze(
        &self,
        subject_id: &str,
        holdings: &[Holding],
        force_refresh: bool,
    ) -> Result<AnalysisResult> {
        let subject_id = Self::validate_subject(subject_id)?;
        let requested_at = self.clock.now();
        let ttl = self.config.read().await.ttl();

        // Generation of the entry seen on arrival; forced requests never reuse it.
        let seen_generation = {
            let cache = self.cache.read().await;
            match cache.get(subject_id) {
                Some(entry) if !force_refresh && entry.is_fresh(requested_at, ttl) => {
                    debug!("Analysis cache hit for {}", subject_id);
                    return Ok(entry.result.clone());
                }
                Some(entry) => Some(entry.generation),
                None => None,
            }
        };

        let gate = self.gate(subject_id);
        let _in_flight = gate.lock().await;

        // Another request may have finished while we waited on the gate.
        let previous_at = {
            let cache = self.cache.read().await;
            match cache.get(subject_id) {
                Some(entry) if Some(entry.generation) != seen_generation => {
                    debug!("Reusing analysis committed while waiting for {}", subject_id);
                    return Ok(entry.result.clone());
                }
                Some(entry) if !force_refresh && entry.is_fresh(self.clock.now(), ttl) => {
                    debug!("Analysis cache hit for {} after wait", subject_id);
                    return Ok(entry.result.clone());
                }
                Some(entry) => Some(entry.cached_at),
                None => None,
            }
        };

        debug!(
            "Recomputing analysis for {} ({} holdings, forced: {})",
            subject_id,
            holdings.len(),
            force_refresh
        );
        let analyzed_at = strictly_after(self.clock.now(), previous_at);
        let result = scoring::build_analysis(subject_id, holdings, analyzed_at);
        self.commit(&result).await;

        info!(
            "Analysis for {} completed: {} holdings, health score {:.2}",
            subject_id, result.summary.total_holdings, result.summary.portfolio_health_score
        );
        Ok(result)
    }

    async fn get_cached_analysis(&self, subject_id: &str) -> Option<AnalysisResult> {
        let ttl = self.config.read().await.ttl();
        let now = self.clock.now();
        let cache = self.cache.read().await;
        cache.get(subject_id.trim()).map(|entry| {
            let mut result = entry.result.clone();
            result.is_stale = !entry.is_fresh(now, ttl);
            result
        })
    }

    async fn clear_cache(&self, subject_id: &str) -> bool {
        let subject_id = subject_id.trim();
        let removed = self.cache.write().await.remove(subject_id).is_some();
        self.prune_gates(Some(subject_id));
        if removed {
            debug!("Cleared cached analysis for {}", subject_id);
        }
        removed
    }

    async fn clear_all(&self) {
        let mut cache = self.cache.write().await;
        let count = cache.len();
        cache.clear();
        drop(cache);
        self.prune_gates(None);
        debug!("Cleared {} cached analyses", count);
    }

    fn analyze_holding(&self, holding: &Holding) -> HoldingAnalysis {
        scoring::analyze_holding(holding)
    }

    fn status_config(&self) -> Vec<StatusConfig> {
        HoldingHealthStatus::ALL
            .iter()
            .map(HoldingHealthStatus::config)
            .collect()
    }

    async fn get_config(&self) -> AnalysisConfig {
        self.config.read().await.clone()
    }

    async fn update_config(&self, config: AnalysisConfig) -> Result<()> {
        config.validate()?;
        info!("Analysis cache TTL set to {}s", config.cache_ttl_secs);
        *self.config.write().await = config;
        Ok(())
    }
}
