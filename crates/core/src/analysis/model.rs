//! Holdings analysis domain models.
//!
//! - Health status per holding and its display configuration
//! - Component scores and the per-holding analysis
//! - Portfolio-level summary and the cached analysis result
//! - Analyzer configuration

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{DEFAULT_ANALYSIS_TTL_SECS, MAX_ANALYSIS_TTL_SECS};
use crate::errors::{Error, Result, ValidationError};
use crate::holdings::AssetClass;

// =============================================================================
// Health Status
// =============================================================================

/// Performance status of a holding, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingHealthStatus {
    InForm,
    OnTrack,
    OffTrack,
    OutOfForm,
}

impl HoldingHealthStatus {
    pub const ALL: [HoldingHealthStatus; 4] = [
        HoldingHealthStatus::InForm,
        HoldingHealthStatus::OnTrack,
        HoldingHealthStatus::OffTrack,
        HoldingHealthStatus::OutOfForm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingHealthStatus::InForm => "in_form",
            HoldingHealthStatus::OnTrack => "on_track",
            HoldingHealthStatus::OffTrack => "off_track",
            HoldingHealthStatus::OutOfForm => "out_of_form",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HoldingHealthStatus::InForm => "In-form",
            HoldingHealthStatus::OnTrack => "On-track",
            HoldingHealthStatus::OffTrack => "Off-track",
            HoldingHealthStatus::OutOfForm => "Out-of-form",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HoldingHealthStatus::InForm => "Performing great",
            HoldingHealthStatus::OnTrack => "Performing good",
            HoldingHealthStatus::OffTrack => "Don't invest further",
            HoldingHealthStatus::OutOfForm => "Exit now",
        }
    }

    pub fn action_hint(&self) -> &'static str {
        match self {
            HoldingHealthStatus::InForm => "Continue investing",
            HoldingHealthStatus::OnTrack => "Hold / invest more",
            HoldingHealthStatus::OffTrack => "Review and monitor",
            HoldingHealthStatus::OutOfForm => "Consider exiting",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            HoldingHealthStatus::InForm => "double_up",
            HoldingHealthStatus::OnTrack => "up",
            HoldingHealthStatus::OffTrack => "down",
            HoldingHealthStatus::OutOfForm => "double_down",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            HoldingHealthStatus::InForm => "green",
            HoldingHealthStatus::OnTrack => "light_green",
            HoldingHealthStatus::OffTrack => "light_red",
            HoldingHealthStatus::OutOfForm => "red",
        }
    }

    /// Whether holdings in this status count towards `actionRequiredCount`.
    pub fn requires_action(&self) -> bool {
        matches!(
            self,
            HoldingHealthStatus::OffTrack | HoldingHealthStatus::OutOfForm
        )
    }

    pub fn config(&self) -> StatusConfig {
        StatusConfig {
            status: *self,
            label: self.label().to_string(),
            description: self.description().to_string(),
            action_hint: self.action_hint().to_string(),
            icon: self.icon().to_string(),
            color: self.color().to_string(),
        }
    }
}

impl FromStr for HoldingHealthStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "inform" => Ok(HoldingHealthStatus::InForm),
            "ontrack" => Ok(HoldingHealthStatus::OnTrack),
            "offtrack" => Ok(HoldingHealthStatus::OffTrack),
            "outofform" => Ok(HoldingHealthStatus::OutOfForm),
            _ => Err(ValidationError::InvalidInput(format!("unknown holding status '{}'", s)).into()),
        }
    }
}

impl std::fmt::Display for HoldingHealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Display configuration for one status, for UI badges and legends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusConfig {
    pub status: HoldingHealthStatus,
    pub label: String,
    pub description: String,
    pub action_hint: String,
    pub icon: String,
    pub color: String,
}

// =============================================================================
// Scores
// =============================================================================

/// Component scores for a holding, each in [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HoldingScores {
    pub returns_score: f64,
    pub risk_score: f64,
    pub consistency_score: f64,
    pub momentum_score: f64,
    /// Mean of the four component scores
    pub overall_score: f64,
}

// =============================================================================
// Holding Analysis
// =============================================================================

/// Scored snapshot of one holding. Produced fresh on every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingAnalysis {
    pub holding_id: String,
    pub fund_code: String,
    pub fund_name: String,
    pub category: String,
    pub asset_class: AssetClass,
    pub status: HoldingHealthStatus,
    pub status_label: String,
    pub status_description: String,
    pub action_hint: String,
    pub scores: HoldingScores,
    pub insights: Vec<String>,
    pub invested_value: Decimal,
    pub current_value: Decimal,
    pub absolute_gain: Decimal,
    pub absolute_gain_percent: Decimal,
    /// 1-based rank by overall score, ties in input order
    pub rank_in_portfolio: u32,
}

// =============================================================================
// Summary
// =============================================================================

/// Coarse portfolio health signal; not a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTrend {
    Improving,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_holdings: u32,
    pub in_form_count: u32,
    pub on_track_count: u32,
    pub off_track_count: u32,
    pub out_of_form_count: u32,
    /// Mean overall score, 0 when there are no holdings
    pub portfolio_health_score: f64,
    pub health_trend: HealthTrend,
    pub top_performer: Option<String>,
    pub worst_performer: Option<String>,
    /// Off-track plus out-of-form holdings
    pub action_required_count: u32,
}

/// How much of the input carried fund statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    /// Every holding has metrics (or there are no holdings)
    Good,
    Partial,
    /// No holding has metrics; scores rest on returns alone
    Limited,
}

// =============================================================================
// Analysis Result
// =============================================================================

/// Portfolio-level analysis output. Always replaced as a whole, never patched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub subject_id: String,
    pub holdings: Vec<HoldingAnalysis>,
    pub summary: AnalysisSummary,
    pub recommendations: Vec<String>,
    pub data_quality: DataQuality,
    pub analyzed_at: DateTime<Utc>,

    /// True when served from cache past its time-to-live
    #[serde(default)]
    pub is_stale: bool,
}

impl AnalysisResult {
    /// Analyses ordered by rank.
    pub fn ranked(&self) -> Vec<&HoldingAnalysis> {
        let mut ranked: Vec<&HoldingAnalysis> = self.holdings.iter().collect();
        ranked.sort_by_key(|a| a.rank_in_portfolio);
        ranked
    }

    pub fn holdings_by_status(&self, status: HoldingHealthStatus) -> Vec<&HoldingAnalysis> {
        self.holdings.iter().filter(|a| a.status == status).collect()
    }
}

// =============================================================================
// Analysis Config
// =============================================================================

/// Analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Seconds a cached analysis is served without recomputation (default: 300)
    pub cache_ttl_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_ANALYSIS_TTL_SECS,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(Error::InvalidConfig(
                "cacheTtlSecs must be greater than zero".to_string(),
            ));
        }
        if self.cache_ttl_secs > MAX_ANALYSIS_TTL_SECS {
            return Err(Error::InvalidConfig(format!(
                "cacheTtlSecs must be at most {}",
                MAX_ANALYSIS_TTL_SECS
            )));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs.min(MAX_ANALYSIS_TTL_SECS) as i64)
    }
}
