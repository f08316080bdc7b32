//! Family aggregator traits.

use rust_decimal::Decimal;

use super::family_model::{AssetAllocation, FamilyMember, FamilyPortfolio, NewFamilyMember, Portfolio};
use crate::errors::Result;
use crate::holdings::Holding;

/// Contract for maintaining family members, their holdings and the derived
/// family view.
///
/// Every successful mutation recomputes the whole [`FamilyPortfolio`]. A failed
/// mutation leaves the aggregator untouched.
pub trait FamilyAggregatorTrait: Send + Sync {
    /// Registers a member. Fails with `DuplicateMember` if the id is taken.
    fn add_member(&self, member: NewFamilyMember) -> Result<FamilyMember>;

    /// Removes a member together with their holdings.
    fn remove_member(&self, member_id: &str) -> Result<()>;

    /// Replaces a member's holding set. An empty set unlinks the member.
    fn set_holdings(&self, member_id: &str, holdings: Vec<Holding>) -> Result<FamilyPortfolio>;

    fn add_holding(&self, member_id: &str, holding: Holding) -> Result<FamilyPortfolio>;

    fn remove_holding(&self, member_id: &str, holding_id: &str) -> Result<FamilyPortfolio>;

    /// Replaces the holding with the same id.
    fn update_holding(&self, member_id: &str, holding: Holding) -> Result<FamilyPortfolio>;

    /// Flips whether the member counts towards family totals.
    fn toggle_member_link(&self, member_id: &str) -> Result<FamilyPortfolio>;

    /// Sets or clears the upstream XIRR for a member.
    fn set_member_xirr(&self, member_id: &str, xirr: Option<Decimal>) -> Result<FamilyPortfolio>;

    /// Last committed family view.
    fn family_portfolio(&self) -> FamilyPortfolio;

    /// Fresh computation over current state. Does not replace the committed view.
    fn recalculate_family_portfolio(&self) -> FamilyPortfolio;

    fn member(&self, member_id: &str) -> Result<FamilyMember>;

    fn members(&self) -> Vec<FamilyMember>;

    fn linked_members(&self) -> Vec<FamilyMember>;

    fn unlinked_members(&self) -> Vec<FamilyMember>;

    fn holdings(&self, member_id: &str) -> Result<Vec<Holding>>;

    /// Single-member view.
    fn member_portfolio(&self, member_id: &str) -> Result<Portfolio>;

    /// Asset class totals across linked members.
    fn family_asset_allocation(&self) -> AssetAllocation;

    /// Linked member with the largest contribution.
    fn top_contributor(&self) -> Option<FamilyMember>;

    /// Linked member with the highest XIRR.
    fn best_performer(&self) -> Option<FamilyMember>;

    fn total_active_sips(&self) -> u32;

    fn total_holdings(&self) -> u32;
}
