//! Family aggregator service.
//!
//! Owns the member registry and each member's holdings, and keeps the derived
//! [`FamilyPortfolio`] in step with them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::{Error, Result, ValidationError};
use crate::holdings::Holding;

use super::family_calculator::{
    calculate_family_portfolio, calculate_member_portfolio, MemberProfile,
};
use super::family_model::{
    AssetAllocation, FamilyMember, FamilyPortfolio, NewFamilyMember, Portfolio, Relationship,
};
use super::family_traits::FamilyAggregatorTrait;

#[derive(Default)]
struct FamilyState {
    /// Members in registration order
    profiles: Vec<MemberProfile>,
    holdings: HashMap<String, Vec<Holding>>,
    /// Last committed family view
    portfolio: FamilyPortfolio,
}

impl FamilyState {
    fn profile_index(&self, member_id: &str) -> Result<usize> {
        self.profiles
            .iter()
            .position(|p| p.id == member_id)
            .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))
    }

    fn member_holdings(&self, member_id: &str) -> &[Holding] {
        self.holdings
            .get(member_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn recompute(&mut self) -> FamilyPortfolio {
        self.portfolio = calculate_family_portfolio(&self.profiles, &self.holdings);
        self.portfolio.clone()
    }

    /// Replaces a member's holdings and relinks them according to whether the
    /// set is empty.
    fn replace_holdings(&mut self, idx: usize, holdings: Vec<Holding>) {
        let profile = &mut self.profiles[idx];
        profile.is_linked = !holdings.is_empty();
        self.holdings.insert(profile.id.clone(), holdings);
    }
}

/// In-memory aggregator for one family.
///
/// All state sits behind a single mutex; every operation is short and
/// CPU-bound, so callers on async runtimes can use it directly.
pub struct FamilyAggregator {
    state: Mutex<FamilyState>,
}

impl Default for FamilyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FamilyAggregator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FamilyState::default()),
        }
    }

    /// Lock the family state, recovering from poison if necessary.
    fn lock_state(&self) -> MutexGuard<'_, FamilyState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Family state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Runs `f` against a member's current holdings and commits the returned set.
    fn modify_holdings<F>(&self, member_id: &str, f: F) -> Result<FamilyPortfolio>
    where
        F: FnOnce(&[Holding]) -> Result<Vec<Holding>>,
    {
        let mut state = self.lock_state();
        let idx = state.profile_index(member_id)?;
        let updated = f(state.member_holdings(member_id))?;
        state.replace_holdings(idx, updated);
        Ok(state.recompute())
    }

    fn pick_member<F>(&self, better: F) -> Option<FamilyMember>
    where
        F: Fn(&FamilyMember, &FamilyMember) -> bool,
    {
        let state = self.lock_state();
        let mut best: Option<&FamilyMember> = None;
        for member in state.portfolio.members.iter().filter(|m| m.is_linked) {
            match best {
                Some(current) if !better(member, current) => {}
                _ => best = Some(member),
            }
        }
        best.cloned()
    }
}

impl FamilyAggregatorTrait for FamilyAggregator {
    fn add_member(&self, member: NewFamilyMember) -> Result<FamilyMember> {
        if member.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }

        let id = member
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut state = self.lock_state();
        if state.profiles.iter().any(|p| p.id == id) {
            return Err(Error::DuplicateMember(id));
        }

        state.profiles.push(MemberProfile {
            id: id.clone(),
            name: member.name,
            is_head: member
                .is_head
                .unwrap_or(member.relationship == Relationship::Myself),
            relationship: member.relationship,
            is_linked: member.is_linked,
            xirr: member.xirr,
        });
        state.holdings.insert(id.clone(), Vec::new());
        let portfolio = state.recompute();

        info!("Added family member {} ({} members)", id, state.profiles.len());
        portfolio
            .member(&id)
            .cloned()
            .ok_or_else(|| Error::Unexpected(format!("member {} missing after recompute", id)))
    }

    fn remove_member(&self, member_id: &str) -> Result<()> {
        let mut state = self.lock_state();
        let idx = state.profile_index(member_id)?;
        state.profiles.remove(idx);
        state.holdings.remove(member_id);
        state.recompute();

        info!("Removed family member {}", member_id);
        Ok(())
    }

    fn set_holdings(&self, member_id: &str, holdings: Vec<Holding>) -> Result<FamilyPortfolio> {
        debug!("Setting {} holdings for member {}", holdings.len(), member_id);
        self.modify_holdings(member_id, |_| Ok(holdings))
    }

    fn add_holding(&self, member_id: &str, holding: Holding) -> Result<FamilyPortfolio> {
        self.modify_holdings(member_id, |current| {
            if current.iter().any(|h| h.id == holding.id) {
                return Err(Error::duplicate_holding(member_id, &holding.id));
            }
            let mut updated = current.to_vec();
            updated.push(holding);
            Ok(updated)
        })
    }

    fn remove_holding(&self, member_id: &str, holding_id: &str) -> Result<FamilyPortfolio> {
        self.modify_holdings(member_id, |current| {
            if !current.iter().any(|h| h.id == holding_id) {
                return Err(Error::holding_not_found(member_id, holding_id));
            }
            Ok(current
                .iter()
                .filter(|h| h.id != holding_id)
                .cloned()
                .collect())
        })
    }

    fn update_holding(&self, member_id: &str, holding: Holding) -> Result<FamilyPortfolio> {
        self.modify_holdings(member_id, |current| {
            let pos = current
                .iter()
                .position(|h| h.id == holding.id)
                .ok_or_else(|| Error::holding_not_found(member_id, &holding.id))?;
            let mut updated = current.to_vec();
            updated[pos] = holding;
            Ok(updated)
        })
    }

    fn toggle_member_link(&self, member_id: &str) -> Result<FamilyPortfolio> {
        let mut state = self.lock_state();
        let idx = state.profile_index(member_id)?;
        let profile = &mut state.profiles[idx];
        profile.is_linked = !profile.is_linked;
        info!(
            "Member {} is now {}",
            member_id,
            if profile.is_linked { "linked" } else { "unlinked" }
        );
        Ok(state.recompute())
    }

    fn set_member_xirr(&self, member_id: &str, xirr: Option<Decimal>) -> Result<FamilyPortfolio> {
        let mut state = self.lock_state();
        let idx = state.profile_index(member_id)?;
        state.profiles[idx].xirr = xirr;
        Ok(state.recompute())
    }

    fn family_portfolio(&self) -> FamilyPortfolio {
        self.lock_state().portfolio.clone()
    }

    fn recalculate_family_portfolio(&self) -> FamilyPortfolio {
        let state = self.lock_state();
        calculate_family_portfolio(&state.profiles, &state.holdings)
    }

    fn member(&self, member_id: &str) -> Result<FamilyMember> {
        self.lock_state()
            .portfolio
            .member(member_id)
            .cloned()
            .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))
    }

    fn members(&self) -> Vec<FamilyMember> {
        self.lock_state().portfolio.members.clone()
    }

    fn linked_members(&self) -> Vec<FamilyMember> {
        self.lock_state()
            .portfolio
            .linked_members()
            .into_iter()
            .cloned()
            .collect()
    }

    fn unlinked_members(&self) -> Vec<FamilyMember> {
        self.lock_state()
            .portfolio
            .unlinked_members()
            .into_iter()
            .cloned()
            .collect()
    }

    fn holdings(&self, member_id: &str) -> Result<Vec<Holding>> {
        let state = self.lock_state();
        state.profile_index(member_id)?;
        Ok(state.member_holdings(member_id).to_vec())
    }

    fn member_portfolio(&self, member_id: &str) -> Result<Portfolio> {
        let state = self.lock_state();
        let idx = state.profile_index(member_id)?;
        Ok(calculate_member_portfolio(
            &state.profiles[idx],
            state.member_holdings(member_id),
        ))
    }

    fn family_asset_allocation(&self) -> AssetAllocation {
        let state = self.lock_state();
        let mut allocation = AssetAllocation::default();
        for profile in state.profiles.iter().filter(|p| p.is_linked) {
            allocation.merge(&AssetAllocation::from_holdings(
                state.member_holdings(&profile.id),
            ));
        }
        allocation
    }

    fn top_contributor(&self) -> Option<FamilyMember> {
        self.pick_member(|candidate, current| candidate.contribution > current.contribution)
            .filter(|m| m.portfolio_value > Decimal::ZERO)
    }

    fn best_performer(&self) -> Option<FamilyMember> {
        self.pick_member(|candidate, current| candidate.xirr > current.xirr)
    }

    fn total_active_sips(&self) -> u32 {
        self.lock_state()
            .portfolio
            .linked_members()
            .iter()
            .map(|m| m.active_sips)
            .sum()
    }

    fn total_holdings(&self) -> u32 {
        self.lock_state()
            .portfolio
            .linked_members()
            .iter()
            .map(|m| m.holdings_count)
            .sum()
    }
}
