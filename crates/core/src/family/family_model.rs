use std::fmt;
use std::str::FromStr;

use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DISPLAY_DECIMAL_PRECISION;
use crate::errors::{Error, ValidationError};
use crate::holdings::{AssetClass, Holding};
use crate::utils::decimal_utils::percentage_of;

/// How a family member relates to the head of the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    #[serde(rename = "SELF")]
    Myself,
    Spouse,
    Child,
    Parent,
    Sibling,
    Other,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Myself => "SELF",
            Relationship::Spouse => "SPOUSE",
            Relationship::Child => "CHILD",
            Relationship::Parent => "PARENT",
            Relationship::Sibling => "SIBLING",
            Relationship::Other => "OTHER",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Relationship::Myself => "Self",
            Relationship::Spouse => "Spouse",
            Relationship::Child => "Child",
            Relationship::Parent => "Parent",
            Relationship::Sibling => "Sibling",
            Relationship::Other => "Other",
        }
    }

    /// Maps an upstream role string, falling back to `Other` for unknown roles.
    pub fn from_role(role: &str) -> Self {
        match role.parse() {
            Ok(relationship) => relationship,
            Err(_) => {
                warn!("Unknown family role '{}', treating as other", role);
                Relationship::Other
            }
        }
    }
}

impl FromStr for Relationship {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELF" | "MYSELF" => Ok(Relationship::Myself),
            "SPOUSE" => Ok(Relationship::Spouse),
            "CHILD" => Ok(Relationship::Child),
            "PARENT" => Ok(Relationship::Parent),
            "SIBLING" => Ok(Relationship::Sibling),
            "OTHER" => Ok(Relationship::Other),
            _ => Err(ValidationError::InvalidInput(format!("unknown relationship '{}'", s)).into()),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Input for registering a family member with the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFamilyMember {
    /// Stable id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub is_linked: bool,
    /// Defaults to `relationship == Myself`
    #[serde(default)]
    pub is_head: Option<bool>,
    /// Upstream-computed XIRR (percent)
    #[serde(default)]
    pub xirr: Option<Decimal>,
}

impl NewFamilyMember {
    pub fn new(name: impl Into<String>, relationship: Relationship) -> Self {
        Self {
            id: None,
            name: name.into(),
            relationship,
            is_linked: false,
            is_head: None,
            xirr: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn linked(mut self, is_linked: bool) -> Self {
        self.is_linked = is_linked;
        self
    }

    pub fn with_xirr(mut self, xirr: Decimal) -> Self {
        self.xirr = Some(xirr);
        self
    }
}

/// A person owning zero or more holdings, with roll-up figures derived from them.
///
/// Roll-up fields are never edited directly; the aggregator recomputes them
/// from the member's holdings on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub id: String,
    pub name: String,
    pub relationship: Relationship,
    /// Whether the member contributes to family totals
    pub is_linked: bool,
    pub is_head: bool,
    pub portfolio_value: Decimal,
    pub invested_amount: Decimal,
    pub returns: Decimal,
    pub returns_percentage: Decimal,
    pub xirr: Decimal,
    /// Share of the family portfolio value (0-100); 0 for unlinked members
    pub contribution: Decimal,
    pub holdings_count: u32,
    #[serde(rename = "activeSIPs")]
    pub active_sips: u32,
}

impl FamilyMember {
    /// Two-letter initials for avatar display.
    pub fn initials(&self) -> String {
        let mut parts = self.name.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(first), Some(last)) => first
                .chars()
                .take(1)
                .chain(last.chars().take(1))
                .collect::<String>()
                .to_uppercase(),
            (Some(only), None) => only.chars().take(2).collect::<String>().to_uppercase(),
            _ => String::new(),
        }
    }
}

/// Consolidated family view. Totals cover linked members only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FamilyPortfolio {
    pub members: Vec<FamilyMember>,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_returns: Decimal,
    pub returns_percentage: Decimal,
    #[serde(rename = "familyXIRR")]
    pub family_xirr: Decimal,
}

impl FamilyPortfolio {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn linked_members(&self) -> Vec<&FamilyMember> {
        self.members.iter().filter(|m| m.is_linked).collect()
    }

    pub fn unlinked_members(&self) -> Vec<&FamilyMember> {
        self.members.iter().filter(|m| !m.is_linked).collect()
    }

    pub fn member(&self, member_id: &str) -> Option<&FamilyMember> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

/// Value held per asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetAllocation {
    pub equity: Decimal,
    pub debt: Decimal,
    pub hybrid: Decimal,
    pub gold: Decimal,
    pub other: Decimal,
}

/// One asset class slice of an allocation, for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub asset_class: AssetClass,
    pub value: Decimal,
    /// Percentage of the allocation total (0-100)
    pub percentage: Decimal,
}

impl AssetAllocation {
    /// Sums current values of `holdings` by asset class.
    pub fn from_holdings<'a>(holdings: impl IntoIterator<Item = &'a Holding>) -> Self {
        let mut allocation = Self::default();
        for holding in holdings {
            let slot = allocation.value_mut(holding.asset_class);
            *slot = slot.saturating_add(holding.current_value());
        }
        allocation
    }

    pub fn value(&self, asset_class: AssetClass) -> Decimal {
        match asset_class {
            AssetClass::Equity => self.equity,
            AssetClass::Debt => self.debt,
            AssetClass::Hybrid => self.hybrid,
            AssetClass::Gold => self.gold,
            AssetClass::Other => self.other,
        }
    }

    fn value_mut(&mut self, asset_class: AssetClass) -> &mut Decimal {
        match asset_class {
            AssetClass::Equity => &mut self.equity,
            AssetClass::Debt => &mut self.debt,
            AssetClass::Hybrid => &mut self.hybrid,
            AssetClass::Gold => &mut self.gold,
            AssetClass::Other => &mut self.other,
        }
    }

    /// Adds another allocation into this one.
    pub fn merge(&mut self, other: &AssetAllocation) {
        for asset_class in AssetClass::ALL {
            let slot = self.value_mut(asset_class);
            *slot = slot.saturating_add(other.value(asset_class));
        }
    }

    pub fn total(&self) -> Decimal {
        [self.debt, self.hybrid, self.gold, self.other]
            .iter()
            .fold(self.equity, |acc, v| acc.saturating_add(*v))
    }

    /// Share of the total held in `asset_class` (0-100), 0 when empty.
    pub fn percentage(&self, asset_class: AssetClass) -> Decimal {
        percentage_of(self.value(asset_class), self.total())
    }

    /// Non-empty slices sorted by value descending.
    pub fn breakdown(&self) -> Vec<AllocationSlice> {
        let total = self.total();
        let mut slices: Vec<AllocationSlice> = AssetClass::ALL
            .iter()
            .filter(|asset_class| self.value(**asset_class) > Decimal::ZERO)
            .map(|asset_class| AllocationSlice {
                asset_class: *asset_class,
                value: self.value(*asset_class),
                percentage: percentage_of(self.value(*asset_class), total)
                    .round_dp(DISPLAY_DECIMAL_PRECISION),
            })
            .collect();

        slices.sort_by(|a, b| b.value.cmp(&a.value));
        slices
    }
}

/// Single-member portfolio view consumed by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub member_id: String,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_returns: Decimal,
    pub returns_percentage: Decimal,
    pub xirr: Decimal,
    pub asset_allocation: AssetAllocation,
    pub holdings: Vec<Holding>,
    #[serde(rename = "activeSIPs")]
    pub active_sips: u32,
}

impl Portfolio {
    pub fn empty(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            total_value: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            total_returns: Decimal::ZERO,
            returns_percentage: Decimal::ZERO,
            xirr: Decimal::ZERO,
            asset_allocation: AssetAllocation::default(),
            holdings: Vec::new(),
            active_sips: 0,
        }
    }

    /// Share of value in equity, handy for risk summaries.
    pub fn equity_share(&self) -> Decimal {
        self.asset_allocation
            .percentage(AssetClass::Equity)
            .round_dp(DISPLAY_DECIMAL_PRECISION)
    }
}
