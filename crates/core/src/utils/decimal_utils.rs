use log::warn;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// `part / whole × 100`, or zero when `whole` is not positive.
///
/// A ratio too large for `Decimal` saturates at `Decimal::MAX` (or `MIN` for a
/// negative `part`) instead of panicking.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match part
        .checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
    {
        Some(percentage) => percentage,
        None => {
            warn!("Percentage of {} over {} overflows, saturating", part, whole);
            if part.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        }
    }
}

/// `a × b` for a holding's derived amount, saturating on overflow.
pub fn saturating_product(a: Decimal, b: Decimal, field: &str, holding_id: &str) -> Decimal {
    a.checked_mul(b).unwrap_or_else(|| {
        warn!(
            "Holding {}: {} overflows ({} × {}), saturating",
            holding_id, field, a, b
        );
        a.saturating_mul(b)
    })
}

/// Clamps a negative quantity to zero, logging what was dropped.
pub fn clamp_non_negative(value: Decimal, field: &str, holding_id: &str) -> Decimal {
    if value.is_sign_negative() && !value.is_zero() {
        warn!(
            "Holding {}: negative {} ({}) clamped to 0",
            holding_id, field, value
        );
        Decimal::ZERO
    } else {
        value
    }
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Rounds a score to display precision and pins it to [0, 100].
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    (score.clamp(0.0, 100.0) * 100.0).round() / 100.0
}
