//! Pure roll-up of member holdings into member and family figures.
//!
//! Nothing here touches aggregator state; the same inputs always produce the
//! same output.

use std::collections::HashMap;

use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::constants::CONTRIBUTION_DECIMAL_PRECISION;
use crate::holdings::Holding;
use crate::utils::decimal_utils::percentage_of;

use super::family_model::{
    AssetAllocation, FamilyMember, FamilyPortfolio, Portfolio, Relationship,
};

/// Identity and settings of a member, independent of their holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub id: String,
    pub name: String,
    pub relationship: Relationship,
    pub is_linked: bool,
    pub is_head: bool,
    /// Upstream XIRR; the member's returns percentage stands in when absent
    pub xirr: Option<Decimal>,
}

/// Invested, current and returns totals over a set of holdings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Totals {
    invested: Decimal,
    value: Decimal,
    active_sips: u32,
}

impl Totals {
    fn of(holdings: &[Holding]) -> Self {
        holdings.iter().fold(Totals::default(), |mut acc, h| {
            acc.invested = acc.invested.saturating_add(h.invested_amount());
            acc.value = acc.value.saturating_add(h.current_value());
            acc.active_sips = acc.active_sips.saturating_add(h.active_sips);
            acc
        })
    }

    fn returns(&self) -> Decimal {
        self.value - self.invested
    }

    fn returns_percentage(&self) -> Decimal {
        percentage_of(self.returns(), self.invested)
    }
}

fn member_xirr(profile: &MemberProfile, totals: &Totals) -> Decimal {
    profile.xirr.unwrap_or_else(|| totals.returns_percentage())
}

/// Computes a member's roll-up fields from their holdings. Contribution is
/// left at zero; it depends on the rest of the family.
pub fn calculate_member(profile: &MemberProfile, holdings: &[Holding]) -> FamilyMember {
    let totals = Totals::of(holdings);

    FamilyMember {
        id: profile.id.clone(),
        name: profile.name.clone(),
        relationship: profile.relationship,
        is_linked: profile.is_linked,
        is_head: profile.is_head,
        portfolio_value: totals.value,
        invested_amount: totals.invested,
        returns: totals.returns(),
        returns_percentage: totals.returns_percentage(),
        xirr: member_xirr(profile, &totals),
        contribution: Decimal::ZERO,
        holdings_count: holdings.len() as u32,
        active_sips: totals.active_sips,
    }
}

/// Single-member view with asset allocation and the holdings themselves.
pub fn calculate_member_portfolio(profile: &MemberProfile, holdings: &[Holding]) -> Portfolio {
    let totals = Totals::of(holdings);

    Portfolio {
        member_id: profile.id.clone(),
        total_value: totals.value,
        total_invested: totals.invested,
        total_returns: totals.returns(),
        returns_percentage: totals.returns_percentage(),
        xirr: member_xirr(profile, &totals),
        asset_allocation: AssetAllocation::from_holdings(holdings),
        holdings: holdings.to_vec(),
        active_sips: totals.active_sips,
    }
}

/// Rebuilds the whole family view from profiles and holdings.
///
/// Members appear in profile order. Totals, XIRR and contributions only count
/// linked members.
pub fn calculate_family_portfolio(
    profiles: &[MemberProfile],
    holdings: &HashMap<String, Vec<Holding>>,
) -> FamilyPortfolio {
    let mut members: Vec<FamilyMember> = profiles
        .iter()
        .map(|profile| {
            let member_holdings = holdings
                .get(&profile.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            calculate_member(profile, member_holdings)
        })
        .collect();

    let mut total_value = Decimal::ZERO;
    let mut total_invested = Decimal::ZERO;
    let mut weighted_xirr = Decimal::ZERO;
    for member in members.iter().filter(|m| m.is_linked) {
        total_value = total_value.saturating_add(member.portfolio_value);
        total_invested = total_invested.saturating_add(member.invested_amount);
        weighted_xirr =
            weighted_xirr.saturating_add(member.xirr.saturating_mul(member.portfolio_value));
    }

    let family_xirr = if total_value > Decimal::ZERO {
        weighted_xirr.checked_div(total_value).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    assign_contributions(&mut members, total_value);

    let total_returns = total_value - total_invested;
    debug!(
        "Family recalculated: {} members, total value {}, XIRR {}",
        members.len(),
        total_value,
        family_xirr
    );

    FamilyPortfolio {
        members,
        total_value,
        total_invested,
        total_returns,
        returns_percentage: percentage_of(total_returns, total_invested),
        family_xirr,
    }
}

/// Sets each linked member's share of `total_value`. The rounding residual goes
/// to the largest linked member so linked shares add up to exactly 100.
fn assign_contributions(members: &mut [FamilyMember], total_value: Decimal) {
    for member in members.iter_mut() {
        member.contribution = if member.is_linked {
            percentage_of(member.portfolio_value, total_value)
                .round_dp(CONTRIBUTION_DECIMAL_PRECISION)
        } else {
            Decimal::ZERO
        };
    }

    if total_value <= Decimal::ZERO {
        return;
    }

    let assigned: Decimal = members
        .iter()
        .filter(|m| m.is_linked)
        .map(|m| m.contribution)
        .sum();
    let residual = dec!(100) - assigned;
    if residual.is_zero() {
        return;
    }

    // First of the largest wins so the result does not depend on sort stability.
    let mut largest: Option<usize> = None;
    for (idx, member) in members.iter().enumerate() {
        if !member.is_linked {
            continue;
        }
        match largest {
            Some(best) if members[best].portfolio_value >= member.portfolio_value => {}
            _ => largest = Some(idx),
        }
    }

    if let Some(idx) = largest {
        members[idx].contribution += residual;
    }
}
