//! Deterministic holding scoring.
//!
//! A holding's returns percentage fixes its status band and a base score
//! inside that band. Fund metrics, when present, nudge the four component
//! scores around the base. Missing metrics leave a component at the base.

use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::constants::{
    HEALTH_TREND_IMPROVING_SCORE, IN_FORM_CEILING, IN_FORM_THRESHOLD, OFF_TRACK_THRESHOLD,
    ON_TRACK_THRESHOLD, OUT_OF_FORM_FLOOR, REFERENCE_VOLATILITY,
};
use crate::holdings::{FundMetrics, Holding};
use crate::utils::decimal_utils::{clamp_score, to_f64};

use super::model::{
    AnalysisResult, AnalysisSummary, DataQuality, HealthTrend, HoldingAnalysis,
    HoldingHealthStatus, HoldingScores,
};

/// Maps a returns percentage to its status. Lower bounds are inclusive.
pub fn classify(returns_percentage: Decimal) -> HoldingHealthStatus {
    if returns_percentage >= IN_FORM_THRESHOLD {
        HoldingHealthStatus::InForm
    } else if returns_percentage >= ON_TRACK_THRESHOLD {
        HoldingHealthStatus::OnTrack
    } else if returns_percentage >= OFF_TRACK_THRESHOLD {
        HoldingHealthStatus::OffTrack
    } else {
        HoldingHealthStatus::OutOfForm
    }
}

/// Returns-percentage range and score range of a status band.
fn band(status: HoldingHealthStatus) -> ((Decimal, Decimal), (Decimal, Decimal)) {
    match status {
        HoldingHealthStatus::InForm => ((IN_FORM_THRESHOLD, IN_FORM_CEILING), (dec!(80), dec!(95))),
        HoldingHealthStatus::OnTrack => ((ON_TRACK_THRESHOLD, IN_FORM_THRESHOLD), (dec!(55), dec!(75))),
        HoldingHealthStatus::OffTrack => ((OFF_TRACK_THRESHOLD, ON_TRACK_THRESHOLD), (dec!(30), dec!(50))),
        HoldingHealthStatus::OutOfForm => ((OUT_OF_FORM_FLOOR, OFF_TRACK_THRESHOLD), (dec!(10), dec!(25))),
    }
}

/// Base score: linear interpolation of the returns percentage inside its band,
/// clamped to the band's score range.
pub fn base_score(returns_percentage: Decimal) -> f64 {
    let ((r_lo, r_hi), (s_lo, s_hi)) = band(classify(returns_percentage));
    let position = (returns_percentage - r_lo) / (r_hi - r_lo);
    let score = (s_lo + position * (s_hi - s_lo)).clamp(s_lo, s_hi);
    clamp_score(to_f64(score))
}

fn returns_adjustment(metrics: &FundMetrics) -> f64 {
    metrics
        .category_alpha()
        .map(|alpha| alpha.clamp(-10.0, 10.0))
        .unwrap_or(0.0)
}

fn risk_adjustment(metrics: &FundMetrics) -> f64 {
    metrics
        .volatility
        .map(|vol| (REFERENCE_VOLATILITY - vol).clamp(-15.0, 15.0))
        .unwrap_or(0.0)
}

fn consistency_adjustment(metrics: &FundMetrics) -> f64 {
    match (metrics.return_1y, metrics.return_3y) {
        (Some(r1y), Some(r3y)) => (5.0 - (r1y - r3y).abs() / 2.0).clamp(-10.0, 10.0),
        _ => 0.0,
    }
}

/// Compounds a period return (percent) to a yearly figure.
fn annualise(period_return: f64, periods_per_year: i32) -> f64 {
    ((1.0 + period_return / 100.0).powi(periods_per_year) - 1.0) * 100.0
}

fn momentum_adjustment(metrics: &FundMetrics) -> f64 {
    let recent = metrics
        .return_3m
        .map(|r| annualise(r, 4))
        .or_else(|| metrics.return_6m.map(|r| annualise(r, 2)));
    match (recent, metrics.return_1y) {
        (Some(recent), Some(r1y)) => ((recent - r1y) / 2.0).clamp(-20.0, 20.0),
        _ => 0.0,
    }
}

/// Component scores around `base`. Without metrics every component equals the base.
pub fn component_scores(base: f64, metrics: Option<&FundMetrics>) -> HoldingScores {
    let (returns, risk, consistency, momentum) = match metrics {
        Some(m) => (
            returns_adjustment(m),
            risk_adjustment(m),
            consistency_adjustment(m),
            momentum_adjustment(m),
        ),
        None => (0.0, 0.0, 0.0, 0.0),
    };

    let returns_score = clamp_score(base + returns);
    let risk_score = clamp_score(base + risk);
    let consistency_score = clamp_score(base + consistency);
    let momentum_score = clamp_score(base + momentum);

    HoldingScores {
        returns_score,
        risk_score,
        consistency_score,
        momentum_score,
        overall_score: clamp_score(
            (returns_score + risk_score + consistency_score + momentum_score) / 4.0,
        ),
    }
}

/// Status-specific observations, plus a benchmark line when category data exists.
pub fn insights(status: HoldingHealthStatus, category: &str, metrics: Option<&FundMetrics>) -> Vec<String> {
    let lines: [&str; 3] = match status {
        HoldingHealthStatus::InForm => [
            "Outperforming category average",
            "Strong momentum in recent months",
            "Consistent returns over time",
        ],
        HoldingHealthStatus::OnTrack => [
            "Meeting category benchmarks",
            "Stable performance",
            "Good risk-adjusted returns",
        ],
        HoldingHealthStatus::OffTrack => [
            "Below category average returns",
            "Consider reviewing allocation",
            "Monitor for improvement",
        ],
        HoldingHealthStatus::OutOfForm => [
            "Significantly underperforming",
            "High risk relative to returns",
            "Consider switching to better alternatives",
        ],
    };

    let mut insights: Vec<String> = lines.iter().map(|s| s.to_string()).collect();

    if let Some(alpha) = metrics.and_then(FundMetrics::category_alpha) {
        let category = if category.trim().is_empty() {
            "category"
        } else {
            category.trim()
        };
        let line = if alpha > 0.0 {
            format!("Beats {} average by {:.2}% over 1 year", category, alpha)
        } else if alpha < 0.0 {
            format!("Trails {} average by {:.2}% over 1 year", category, -alpha)
        } else {
            format!("In line with {} average over 1 year", category)
        };
        insights.push(line);
    }

    insights
}

/// Scores one holding. Rank is left at 1; [`assign_ranks`] sets it in context.
pub fn analyze_holding(holding: &Holding) -> HoldingAnalysis {
    let returns_percentage = holding.returns_percentage();
    let status = classify(returns_percentage);
    let metrics = holding.metrics.as_ref();
    let scores = component_scores(base_score(returns_percentage), metrics);

    HoldingAnalysis {
        holding_id: holding.id.clone(),
        fund_code: holding.fund_code.clone(),
        fund_name: holding.fund_name.clone(),
        category: holding.category.clone(),
        asset_class: holding.asset_class,
        status,
        status_label: status.label().to_string(),
        status_description: status.description().to_string(),
        action_hint: status.action_hint().to_string(),
        scores,
        insights: insights(status, &holding.category, metrics),
        invested_value: holding.invested_amount(),
        current_value: holding.current_value(),
        absolute_gain: holding.returns(),
        absolute_gain_percent: returns_percentage,
        rank_in_portfolio: 1,
    }
}

/// Sets 1-based ranks by overall score descending. Ties keep input order.
pub fn assign_ranks(analyses: &mut [HoldingAnalysis]) {
    let mut order: Vec<usize> = (0..analyses.len()).collect();
    // sort_by is stable, so equal scores stay in input order
    order.sort_by(|&a, &b| {
        analyses[b]
            .scores
            .overall_score
            .total_cmp(&analyses[a].scores.overall_score)
    });
    for (rank, idx) in order.into_iter().enumerate() {
        analyses[idx].rank_in_portfolio = rank as u32 + 1;
    }
}

pub fn summarize(analyses: &[HoldingAnalysis]) -> AnalysisSummary {
    let count = |status: HoldingHealthStatus| {
        analyses.iter().filter(|a| a.status == status).count() as u32
    };
    let in_form_count = count(HoldingHealthStatus::InForm);
    let on_track_count = count(HoldingHealthStatus::OnTrack);
    let off_track_count = count(HoldingHealthStatus::OffTrack);
    let out_of_form_count = count(HoldingHealthStatus::OutOfForm);

    let portfolio_health_score = if analyses.is_empty() {
        0.0
    } else {
        let total: f64 = analyses.iter().map(|a| a.scores.overall_score).sum();
        clamp_score(total / analyses.len() as f64)
    };

    let by_rank = |rank: u32| {
        analyses
            .iter()
            .find(|a| a.rank_in_portfolio == rank)
            .map(|a| a.fund_name.clone())
    };

    AnalysisSummary {
        total_holdings: analyses.len() as u32,
        in_form_count,
        on_track_count,
        off_track_count,
        out_of_form_count,
        portfolio_health_score,
        health_trend: if portfolio_health_score >= HEALTH_TREND_IMPROVING_SCORE {
            HealthTrend::Improving
        } else {
            HealthTrend::Stable
        },
        top_performer: by_rank(1),
        worst_performer: by_rank(analyses.len() as u32),
        action_required_count: analyses
            .iter()
            .filter(|a| a.status.requires_action())
            .count() as u32,
    }
}

/// Ordered recommendation lines derived from status counts.
pub fn recommendations(summary: &AnalysisSummary) -> Vec<String> {
    let mut recommendations = Vec::new();

    if summary.out_of_form_count > 0 {
        recommendations.push(format!(
            "review {} underperforming holding(s)",
            summary.out_of_form_count
        ));
    }
    if summary.off_track_count > 0 {
        recommendations.push(format!(
            "monitor {} off-track holding(s)",
            summary.off_track_count
        ));
    }
    if summary.in_form_count > 0 {
        recommendations.push(format!(
            "continue SIPs in {} top-performing holding(s)",
            summary.in_form_count
        ));
    }
    if recommendations.is_empty() {
        recommendations.push("portfolio is well-balanced".to_string());
    }

    recommendations
}

pub fn data_quality(holdings: &[Holding]) -> DataQuality {
    let with_metrics = holdings.iter().filter(|h| h.has_metrics()).count();
    if with_metrics == holdings.len() {
        DataQuality::Good
    } else if with_metrics == 0 {
        DataQuality::Limited
    } else {
        DataQuality::Partial
    }
}

/// Full analysis of a holdings list, stamped with `analyzed_at`.
pub fn build_analysis(
    subject_id: &str,
    holdings: &[Holding],
    analyzed_at: DateTime<Utc>,
) -> AnalysisResult {
    let mut analyses: Vec<HoldingAnalysis> = holdings.iter().map(analyze_holding).collect();
    assign_ranks(&mut analyses);
    let summary = summarize(&analyses);
    let recommendations = recommendations(&summary);

    debug!(
        "Scored {} holdings for {}: health {:.2}, {} need action",
        summary.total_holdings, subject_id, summary.portfolio_health_score, summary.action_required_count
    );

    AnalysisResult {
        subject_id: subject_id.to_string(),
        holdings: analyses,
        summary,
        recommendations,
        data_quality: data_quality(holdings),
        analyzed_at,
        is_stale: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdings::AssetClass;
    use chrono::TimeZone;

    fn holding(id: &str, invested: Decimal, value: Decimal) -> Holding {
        Holding::new(
            id,
            format!("code-{}", id),
            format!("Fund {}", id),
            "Mid Cap",
            AssetClass::Equity,
            dec!(1),
            invested,
            value,
        )
    }

    // ==================== Banding ====================

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(dec!(15)), HoldingHealthStatus::InForm);
        assert_eq!(classify(dec!(14.9999)), HoldingHealthStatus::OnTrack);
        assert_eq!(classify(dec!(8)), HoldingHealthStatus::OnTrack);
        assert_eq!(classify(dec!(7.99)), HoldingHealthStatus::OffTrack);
        assert_eq!(classify(dec!(0)), HoldingHealthStatus::OffTrack);
        assert_eq!(classify(dec!(-0.01)), HoldingHealthStatus::OutOfForm);
    }

    #[test]
    fn test_base_score_interpolates_within_band() {
        assert_eq!(base_score(dec!(15)), 80.0);
        assert_eq!(base_score(dec!(30)), 87.5);
        assert_eq!(base_score(dec!(120)), 95.0);
        assert_eq!(base_score(dec!(8)), 55.0);
        assert_eq!(base_score(dec!(0)), 30.0);
        assert_eq!(base_score(dec!(4)), 40.0);
        assert_eq!(base_score(dec!(-15)), 17.5);
        assert_eq!(base_score(dec!(-90)), 10.0);
    }

    // ==================== Components ====================

    #[test]
    fn test_components_equal_base_without_metrics() {
        let scores = component_scores(62.0, None);
        assert_eq!(scores.returns_score, 62.0);
        assert_eq!(scores.momentum_score, 62.0);
        assert_eq!(scores.overall_score, 62.0);
    }

    #[test]
    fn test_components_follow_metrics() {
        let metrics = FundMetrics {
            return_1y: Some(20.0),
            return_3y: Some(16.0),
            return_3m: Some(3.0),
            category_avg_return_1y: Some(17.0),
            volatility: Some(12.0),
            ..Default::default()
        };
        let scores = component_scores(80.0, Some(&metrics));

        // alpha 3, volatility 3 under reference, 1y/3y gap 4
        assert_eq!(scores.returns_score, 83.0);
        assert_eq!(scores.risk_score, 83.0);
        assert_eq!(scores.consistency_score, 83.0);
        // 3% a quarter compounds to about 12.55% a year, 7.45 below the 1y return
        assert_eq!(scores.momentum_score, 76.28);
        assert_eq!(scores.overall_score, 81.32);
    }

    #[test]
    fn test_components_are_clamped() {
        let metrics = FundMetrics {
            return_1y: Some(10.0),
            return_3y: Some(-60.0),
            category_avg_return_1y: Some(-40.0),
            volatility: Some(80.0),
            return_6m: Some(40.0),
            ..Default::default()
        };
        let high = component_scores(95.0, Some(&metrics));
        assert_eq!(high.returns_score, 100.0);
        assert_eq!(high.risk_score, 80.0);
        assert_eq!(high.consistency_score, 85.0);
        assert_eq!(high.momentum_score, 100.0);

        let low = component_scores(5.0, Some(&metrics));
        assert_eq!(low.risk_score, 0.0);
        assert!(low.overall_score >= 0.0 && low.overall_score <= 100.0);
    }

    // ==================== Insights ====================

    #[test]
    fn test_insights_with_benchmark_line() {
        let metrics = FundMetrics {
            return_1y: Some(12.0),
            category_avg_return_1y: Some(14.5),
            ..Default::default()
        };
        let lines = insights(HoldingHealthStatus::OffTrack, "Mid Cap", Some(&metrics));

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Below category average returns");
        assert_eq!(lines[3], "Trails Mid Cap average by 2.50% over 1 year");

        assert_eq!(insights(HoldingHealthStatus::InForm, "Mid Cap", None).len(), 3);
    }

    // ==================== Ranking and summary ====================

    #[test]
    fn test_scenario_inform_holding() {
        let analysis = analyze_holding(&holding("a", dec!(50000), dec!(65000)));

        assert_eq!(analysis.absolute_gain_percent, dec!(30));
        assert_eq!(analysis.status, HoldingHealthStatus::InForm);
        assert!(analysis.scores.overall_score >= 80.0);
        assert_eq!(analysis.status_label, "In-form");
        assert_eq!(analysis.rank_in_portfolio, 1);
    }

    #[test]
    fn test_ranks_ties_keep_input_order() {
        let holdings = vec![
            holding("a", dec!(100), dec!(104)),
            holding("b", dec!(100), dec!(130)),
            holding("c", dec!(100), dec!(104)),
            holding("d", dec!(100), dec!(80)),
        ];
        let mut analyses: Vec<HoldingAnalysis> = holdings.iter().map(analyze_holding).collect();
        assign_ranks(&mut analyses);

        let ranks: Vec<u32> = analyses.iter().map(|a| a.rank_in_portfolio).collect();
        assert_eq!(ranks, vec![2, 1, 3, 4]);

        let summary = summarize(&analyses);
        assert_eq!(summary.top_performer.as_deref(), Some("Fund b"));
        assert_eq!(summary.worst_performer.as_deref(), Some("Fund d"));
        assert_eq!(summary.in_form_count, 1);
        assert_eq!(summary.off_track_count, 2);
        assert_eq!(summary.out_of_form_count, 1);
        assert_eq!(summary.action_required_count, 3);
    }

    #[test]
    fn test_recommendation_order() {
        let holdings = vec![
            holding("a", dec!(100), dec!(120)),
            holding("b", dec!(100), dec!(90)),
            holding("c", dec!(100), dec!(103)),
            holding("d", dec!(100), dec!(95)),
        ];
        let result = build_analysis("client-1", &holdings, Utc::now());

        assert_eq!(
            result.recommendations,
            vec![
                "review 2 underperforming holding(s)",
                "monitor 1 off-track holding(s)",
                "continue SIPs in 1 top-performing holding(s)",
            ]
        );
    }

    #[test]
    fn test_only_on_track_is_well_balanced() {
        let result = build_analysis("c", &[holding("a", dec!(100), dec!(110))], Utc::now());
        assert_eq!(result.recommendations, vec!["portfolio is well-balanced"]);
        assert_eq!(result.summary.on_track_count, 1);
    }

    #[test]
    fn test_empty_holdings() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let result = build_analysis("client-1", &[], at);

        assert_eq!(result.summary.total_holdings, 0);
        assert_eq!(result.summary.portfolio_health_score, 0.0);
        assert_eq!(result.summary.health_trend, HealthTrend::Stable);
        assert!(result.summary.top_performer.is_none());
        assert!(result.summary.worst_performer.is_none());
        assert_eq!(result.recommendations, vec!["portfolio is well-balanced"]);
        assert_eq!(result.data_quality, DataQuality::Good);
        assert_eq!(result.analyzed_at, at);
    }

    #[test]
    fn test_health_trend_and_data_quality() {
        let with_metrics = holding("a", dec!(100), dec!(140)).with_metrics(FundMetrics {
            return_1y: Some(40.0),
            ..Default::default()
        });
        let without = holding("b", dec!(100), dec!(125));

        let result = build_analysis("c", &[with_metrics.clone(), without.clone()], Utc::now());
        assert_eq!(result.summary.health_trend, HealthTrend::Improving);
        assert_eq!(result.data_quality, DataQuality::Partial);
        assert_eq!(data_quality(&[without]), DataQuality::Limited);
        assert_eq!(data_quality(&[with_metrics]), DataQuality::Good);

        let poor = build_analysis("c", &[holding("x", dec!(100), dec!(90))], Utc::now());
        assert_eq!(poor.summary.health_trend, HealthTrend::Stable);
    }

    #[test]
    fn test_negative_inputs_do_not_poison_results() {
        let broken = Holding::new("bad", "0", "Broken", "", AssetClass::Other, dec!(-10), dec!(5), dec!(-2));
        let result = build_analysis("c", &[broken], Utc::now());

        let analysis = &result.holdings[0];
        assert_eq!(analysis.invested_value, Decimal::ZERO);
        assert_eq!(analysis.absolute_gain_percent, Decimal::ZERO);
        assert_eq!(analysis.status, HoldingHealthStatus::OffTrack);
        assert_eq!(analysis.scores.overall_score, 30.0);
    }
}
