use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Returns percentage at or above which a holding is in form
pub const IN_FORM_THRESHOLD: Decimal = dec!(15);

/// Returns percentage at or above which a holding is on track
pub const ON_TRACK_THRESHOLD: Decimal = dec!(8);

/// Returns percentage at or above which a holding is off track (below is out of form)
pub const OFF_TRACK_THRESHOLD: Decimal = dec!(0);

/// Returns percentage where the in-form score band tops out
pub const IN_FORM_CEILING: Decimal = dec!(45);

/// Returns percentage where the out-of-form score band bottoms out
pub const OUT_OF_FORM_FLOOR: Decimal = dec!(-30);

/// Default time-to-live of a cached analysis, in seconds
pub const DEFAULT_ANALYSIS_TTL_SECS: u64 = 300;

/// Portfolio health score at or above which the trend reads "improving"
pub const HEALTH_TREND_IMPROVING_SCORE: f64 = 60.0;

/// Reference annualised volatility (percent) for the risk score
pub const REFERENCE_VOLATILITY: f64 = 15.0;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Decimal precision of member contribution percentages
pub const CONTRIBUTION_DECIMAL_PRECISION: u32 = 8;

/// Upper bound for a configured analysis time-to-live (one day)
pub const MAX_ANALYSIS_TTL_SECS: u64 = 86_400;
