use std::fmt;
use std::str::FromStr;

use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, ValidationError};
use crate::utils::decimal_utils::{clamp_non_negative, percentage_of, saturating_product};

/// Coarse fund category used for allocation roll-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Debt,
    Hybrid,
    Gold,
    #[default]
    Other,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Equity,
        AssetClass::Debt,
        AssetClass::Hybrid,
        AssetClass::Gold,
        AssetClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Debt => "debt",
            AssetClass::Hybrid => "hybrid",
            AssetClass::Gold => "gold",
            AssetClass::Other => "other",
        }
    }

    /// Parses an upstream label, mapping anything unrecognised to `Other`.
    ///
    /// Use this at the boundary where backend data is mapped into holdings;
    /// unknown labels are logged so malformed feeds stay visible.
    pub fn from_label(label: &str) -> Self {
        match label.parse() {
            Ok(asset_class) => asset_class,
            Err(_) => {
                warn!("Unknown asset class '{}', treating as other", label);
                AssetClass::Other
            }
        }
    }
}

impl FromStr for AssetClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" => Ok(AssetClass::Equity),
            "debt" => Ok(AssetClass::Debt),
            "hybrid" => Ok(AssetClass::Hybrid),
            "gold" => Ok(AssetClass::Gold),
            "other" => Ok(AssetClass::Other),
            _ => Err(ValidationError::InvalidInput(format!("unknown asset class '{}'", s)).into()),
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional fund statistics supplied by the upstream fund-data feed.
///
/// Returns and volatility are percentages (e.g. `12.5` for 12.5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_1y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_3y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_6m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_3m: Option<f64>,
    /// Average one-year return of the fund's category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_avg_return_1y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_ratio: Option<f64>,
}

impl FundMetrics {
    /// Category-relative one-year alpha, when both sides are known.
    pub fn category_alpha(&self) -> Option<f64> {
        match (self.return_1y, self.category_avg_return_1y) {
            (Some(fund), Some(category)) => Some(fund - category),
            _ => None,
        }
    }
}

/// Raw position data as recorded upstream. Derived values are not accepted
/// from callers; they are always recomputed when a [`Holding`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHolding {
    pub id: String,
    pub fund_code: String,
    pub fund_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub asset_class: AssetClass,
    pub units: Decimal,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    #[serde(default)]
    pub active_sips: u32,
    #[serde(default)]
    pub metrics: Option<FundMetrics>,
}

/// One fund position.
///
/// Quantities are only reachable through constructors and setters so the
/// derived amounts can never drift from `units`, `average_cost` and
/// `current_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "NewHolding")]
pub struct Holding {
    pub id: String,
    pub fund_code: String,
    pub fund_name: String,
    pub category: String,
    pub asset_class: AssetClass,
    units: Decimal,
    average_cost: Decimal,
    current_price: Decimal,
    invested_amount: Decimal,
    current_value: Decimal,
    returns: Decimal,
    returns_percentage: Decimal,
    pub active_sips: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FundMetrics>,
}

impl From<NewHolding> for Holding {
    fn from(new: NewHolding) -> Self {
        let mut holding = Holding {
            units: clamp_non_negative(new.units, "units", &new.id),
            average_cost: clamp_non_negative(new.average_cost, "average cost", &new.id),
            current_price: clamp_non_negative(new.current_price, "current price", &new.id),
            id: new.id,
            fund_code: new.fund_code,
            fund_name: new.fund_name,
            category: new.category,
            asset_class: new.asset_class,
            invested_amount: Decimal::ZERO,
            current_value: Decimal::ZERO,
            returns: Decimal::ZERO,
            returns_percentage: Decimal::ZERO,
            active_sips: new.active_sips,
            metrics: new.metrics,
        };
        holding.rederive();
        holding
    }
}

impl Holding {
    /// Builds a holding from units and per-unit prices. Negative inputs are clamped to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        fund_code: impl Into<String>,
        fund_name: impl Into<String>,
        category: impl Into<String>,
        asset_class: AssetClass,
        units: Decimal,
        average_cost: Decimal,
        current_price: Decimal,
    ) -> Self {
        NewHolding {
            id: id.into(),
            fund_code: fund_code.into(),
            fund_name: fund_name.into(),
            category: category.into(),
            asset_class,
            units,
            average_cost,
            current_price,
            active_sips: 0,
            metrics: None,
        }
        .into()
    }

    pub fn with_active_sips(mut self, active_sips: u32) -> Self {
        self.active_sips = active_sips;
        self
    }

    pub fn with_metrics(mut self, metrics: FundMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn rederive(&mut self) {
        self.invested_amount =
            saturating_product(self.units, self.average_cost, "invested amount", &self.id);
        self.current_value =
            saturating_product(self.units, self.current_price, "current value", &self.id);
        // Both sides are non-negative, so the difference always fits.
        self.returns = self.current_value - self.invested_amount;
        self.returns_percentage = percentage_of(self.returns, self.invested_amount);
    }

    /// Applies a price refresh.
    pub fn set_current_price(&mut self, price: Decimal) {
        self.current_price = clamp_non_negative(price, "current price", &self.id);
        self.rederive();
    }

    /// Applies a unit change (purchase, redemption) with the resulting average cost.
    pub fn set_position(&mut self, units: Decimal, average_cost: Decimal) {
        self.units = clamp_non_negative(units, "units", &self.id);
        self.average_cost = clamp_non_negative(average_cost, "average cost", &self.id);
        self.rederive();
    }

    /// Zeroes the position out while keeping its identity.
    pub fn zero_out(&mut self) {
        self.units = Decimal::ZERO;
        self.rederive();
    }

    pub fn units(&self) -> Decimal {
        self.units
    }

    pub fn average_cost(&self) -> Decimal {
        self.average_cost
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }

    /// `units × average_cost`
    pub fn invested_amount(&self) -> Decimal {
        self.invested_amount
    }

    /// `units × current_price`
    pub fn current_value(&self) -> Decimal {
        self.current_value
    }

    /// `current_value − invested_amount`
    pub fn returns(&self) -> Decimal {
        self.returns
    }

    /// `returns / invested_amount × 100`, zero when nothing is invested.
    pub fn returns_percentage(&self) -> Decimal {
        self.returns_percentage
    }

    pub fn has_metrics(&self) -> bool {
        self.metrics.is_some()
    }
}
