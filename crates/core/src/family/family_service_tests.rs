//! Unit tests for the family aggregator.

use super::*;
use crate::errors::Error;
use crate::holdings::{AssetClass, Holding};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

/// Holding whose invested and current amounts equal `invested` and `value`.
fn holding(id: &str, asset_class: AssetClass, invested: Decimal, value: Decimal) -> Holding {
    Holding::new(
        id,
        format!("code-{}", id),
        format!("Fund {}", id),
        "Large Cap",
        asset_class,
        dec!(100),
        invested / dec!(100),
        value / dec!(100),
    )
}

fn equity(id: &str, invested: Decimal, value: Decimal) -> Holding {
    holding(id, AssetClass::Equity, invested, value)
}

fn family_with(members: &[(&str, Relationship)]) -> FamilyAggregator {
    let aggregator = FamilyAggregator::new();
    for (id, relationship) in members {
        aggregator
            .add_member(NewFamilyMember::new(id.to_uppercase(), *relationship).with_id(*id))
            .unwrap();
    }
    aggregator
}

// ============================================================================
// Member registry
// ============================================================================

#[test]
fn test_add_member_defaults() {
    let aggregator = FamilyAggregator::new();
    let me = aggregator
        .add_member(NewFamilyMember::new("Rahul Sharma", Relationship::Myself))
        .unwrap();
    let spouse = aggregator
        .add_member(NewFamilyMember::new("Priya Sharma", Relationship::Spouse).with_id("spouse"))
        .unwrap();

    assert!(!me.id.is_empty());
    assert!(me.is_head);
    assert!(!me.is_linked);
    assert_eq!(spouse.id, "spouse");
    assert!(!spouse.is_head);
    assert_eq!(aggregator.members().len(), 2);
    assert_eq!(aggregator.members()[0].name, "Rahul Sharma");
}

#[test]
fn test_add_member_rejects_duplicates_and_blank_names() {
    let aggregator = family_with(&[("me", Relationship::Myself)]);

    let err = aggregator
        .add_member(NewFamilyMember::new("Again", Relationship::Other).with_id("me"))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateMember(id) if id == "me"));

    let err = aggregator
        .add_member(NewFamilyMember::new("  ", Relationship::Child))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(aggregator.members().len(), 1);
}

#[test]
fn test_remove_member_drops_holdings_and_totals() {
    let aggregator = family_with(&[("me", Relationship::Myself), ("dad", Relationship::Parent)]);
    aggregator
        .set_holdings("dad", vec![equity("h1", dec!(1000), dec!(1500))])
        .unwrap();
    assert_eq!(aggregator.family_portfolio().total_value, dec!(1500));

    aggregator.remove_member("dad").unwrap();

    assert_eq!(aggregator.family_portfolio().total_value, Decimal::ZERO);
    assert!(matches!(aggregator.holdings("dad"), Err(Error::MemberNotFound(_))));
    assert!(matches!(aggregator.remove_member("dad"), Err(Error::MemberNotFound(_))));
}

// ============================================================================
// Holdings mutators
// ============================================================================

#[test]
fn test_set_holdings_links_and_unlinks() {
    let aggregator = family_with(&[("me", Relationship::Myself)]);

    let family = aggregator
        .set_holdings("me", vec![equity("h1", dec!(1000), dec!(1100))])
        .unwrap();
    assert!(family.members[0].is_linked);
    assert_eq!(family.total_value, dec!(1100));

    let family = aggregator.set_holdings("me", Vec::new()).unwrap();
    let me = &family.members[0];
    assert!(!me.is_linked);
    assert_eq!(me.portfolio_value, Decimal::ZERO);
    assert_eq!(me.returns_percentage, Decimal::ZERO);
    assert_eq!(me.holdings_count, 0);
    assert_eq!(family.total_value, Decimal::ZERO);
}

#[test]
fn test_scenario_two_members_weighted_xirr() {
    let aggregator = family_with(&[("me", Relationship::Myself), ("wife", Relationship::Spouse)]);
    aggregator
        .set_holdings("me", vec![equity("a", dec!(90909.0909), dec!(100000))])
        .unwrap();
    aggregator
        .set_holdings("wife", vec![equity("b", dec!(41666.6667), dec!(50000))])
        .unwrap();
    aggregator.set_member_xirr("me", Some(dec!(10))).unwrap();
    let family = aggregator.set_member_xirr("wife", Some(dec!(20))).unwrap();

    assert_eq!(family.total_value, dec!(150000));
    assert_eq!(family.family_xirr.round_dp(4), dec!(13.3333));
    assert_eq!(family.members[0].contribution, dec!(66.66666667));
    assert_eq!(family.members[1].contribution, dec!(33.33333333));
}

#[test]
fn test_xirr_falls_back_to_returns_percentage() {
    let aggregator = family_with(&[("me", Relationship::Myself), ("wife", Relationship::Spouse)]);
    aggregator
        .set_holdings("me", vec![equity("a", dec!(100000), dec!(110000))])
        .unwrap();
    let family = aggregator
        .set_holdings("wife", vec![equity("b", dec!(50000), dec!(60000))])
        .unwrap();

    // 110k at 10% and 60k at 20%
    assert_eq!(family.members[0].xirr, dec!(10));
    assert_eq!(family.members[1].xirr, dec!(20));
    assert_eq!(
        family.family_xirr,
        (dec!(10) * dec!(110000) + dec!(20) * dec!(60000)) / dec!(170000)
    );

    let family = aggregator.set_member_xirr("me", Some(dec!(12))).unwrap();
    assert_eq!(family.members[0].xirr, dec!(12));
    let family = aggregator.set_member_xirr("me", None).unwrap();
    assert_eq!(family.members[0].xirr, dec!(10));
}

#[test]
fn test_add_update_remove_holding() {
    let aggregator = family_with(&[("me", Relationship::Myself)]);
    aggregator.add_holding("me", equity("h1", dec!(1000), dec!(1200))).unwrap();
    let family = aggregator
        .add_holding("me", equity("h2", dec!(500), dec!(400)))
        .unwrap();
    assert_eq!(family.total_value, dec!(1600));
    assert!(family.members[0].is_linked);

    let family = aggregator
        .update_holding("me", equity("h2", dec!(500), dec!(800)))
        .unwrap();
    assert_eq!(family.total_value, dec!(2000));
    assert_eq!(aggregator.holdings("me").unwrap()[1].current_value(), dec!(800));

    aggregator.remove_holding("me", "h1").unwrap();
    let family = aggregator.remove_holding("me", "h2").unwrap();
    assert_eq!(family.total_value, Decimal::ZERO);
    assert!(!family.members[0].is_linked);
}

#[test]
fn test_failed_mutations_leave_state_untouched() {
    let aggregator = family_with(&[("me", Relationship::Myself)]);
    aggregator.add_holding("me", equity("h1", dec!(1000), dec!(1200))).unwrap();
    let before = aggregator.family_portfolio();

    let err = aggregator
        .add_holding("me", equity("h1", dec!(1), dec!(1)))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateHolding { .. }));

    let err = aggregator
        .update_holding("me", equity("missing", dec!(1), dec!(1)))
        .unwrap_err();
    assert!(matches!(err, Error::HoldingNotFound { ref holding_id, .. } if holding_id == "missing"));

    let err = aggregator.remove_holding("me", "missing").unwrap_err();
    assert!(matches!(err, Error::HoldingNotFound { .. }));

    let err = aggregator
        .set_holdings("nobody", vec![equity("x", dec!(1), dec!(1))])
        .unwrap_err();
    assert!(matches!(err, Error::MemberNotFound(_)));
    assert!(matches!(aggregator.toggle_member_link("nobody"), Err(Error::MemberNotFound(_))));

    assert_eq!(aggregator.family_portfolio(), before);
    assert_eq!(aggregator.holdings("me").unwrap().len(), 1);
}

// ============================================================================
// Linking and recomputation
// ============================================================================

#[test]
fn test_toggle_link_excludes_member_from_totals() {
    let aggregator = family_with(&[("me", Relationship::Myself), ("son", Relationship::Child)]);
    aggregator.set_holdings("me", vec![equity("a", dec!(100), dec!(300))]).unwrap();
    aggregator.set_holdings("son", vec![equity("b", dec!(100), dec!(100))]).unwrap();
    assert_eq!(aggregator.family_portfolio().total_value, dec!(400));

    let family = aggregator.toggle_member_link("son").unwrap();
    assert_eq!(family.total_value, dec!(300));
    assert_eq!(family.members[0].contribution, dec!(100));
    assert_eq!(family.members[1].contribution, Decimal::ZERO);
    assert_eq!(family.members[1].portfolio_value, dec!(100));
    assert_eq!(aggregator.unlinked_members().len(), 1);
    assert_eq!(aggregator.linked_members()[0].id, "me");

    let family = aggregator.toggle_member_link("son").unwrap();
    assert_eq!(family.total_value, dec!(400));
    assert_eq!(family.members[1].contribution, dec!(25));
}

#[test]
fn test_recalculate_is_idempotent_and_matches_snapshot() {
    let aggregator = family_with(&[("me", Relationship::Myself), ("mom", Relationship::Parent)]);
    aggregator.set_holdings("me", vec![equity("a", dec!(700), dec!(1000))]).unwrap();
    aggregator.set_holdings("mom", vec![equity("b", dec!(300), dec!(200))]).unwrap();

    let first = aggregator.recalculate_family_portfolio();
    let second = aggregator.recalculate_family_portfolio();

    assert_eq!(first, second);
    assert_eq!(first, aggregator.family_portfolio());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_no_linked_members_yields_zero_family() {
    let aggregator = family_with(&[("me", Relationship::Myself)]);
    let family = aggregator.family_portfolio();

    assert_eq!(family.total_value, Decimal::ZERO);
    assert_eq!(family.total_invested, Decimal::ZERO);
    assert_eq!(family.returns_percentage, Decimal::ZERO);
    assert_eq!(family.family_xirr, Decimal::ZERO);
    assert!(aggregator.top_contributor().is_none());
    assert!(aggregator.best_performer().is_none());
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_member_portfolio_and_family_allocation() {
    let aggregator = family_with(&[
        ("me", Relationship::Myself),
        ("wife", Relationship::Spouse),
        ("bro", Relationship::Sibling),
    ]);
    aggregator
        .set_holdings(
            "me",
            vec![
                equity("a", dec!(500), dec!(600)).with_active_sips(2),
                holding("b", AssetClass::Debt, dec!(400), dec!(400)),
            ],
        )
        .unwrap();
    aggregator
        .set_holdings(
            "wife",
            vec![holding("c", AssetClass::Gold, dec!(150), dec!(200)).with_active_sips(1)],
        )
        .unwrap();
    aggregator
        .set_holdings("bro", vec![holding("d", AssetClass::Hybrid, dec!(50), dec!(50))])
        .unwrap();
    aggregator.toggle_member_link("bro").unwrap();

    let portfolio = aggregator.member_portfolio("me").unwrap();
    assert_eq!(portfolio.total_value, dec!(1000));
    assert_eq!(portfolio.asset_allocation.equity, dec!(600));
    assert_eq!(portfolio.asset_allocation.debt, dec!(400));
    assert_eq!(portfolio.active_sips, 2);
    assert_eq!(portfolio.holdings.len(), 2);

    let allocation = aggregator.family_asset_allocation();
    assert_eq!(allocation.total(), dec!(1200));
    assert_eq!(allocation.gold, dec!(200));
    assert_eq!(allocation.hybrid, Decimal::ZERO);
    assert_eq!(allocation.breakdown()[0].asset_class, AssetClass::Equity);
    assert_eq!(allocation.percentage(AssetClass::Equity), dec!(50));

    assert_eq!(aggregator.total_active_sips(), 3);
    assert_eq!(aggregator.total_holdings(), 3);
    assert!(matches!(aggregator.member_portfolio("ghost"), Err(Error::MemberNotFound(_))));
}

#[test]
fn test_top_contributor_and_best_performer() {
    let aggregator = family_with(&[("me", Relationship::Myself), ("dad", Relationship::Parent)]);
    aggregator.set_holdings("me", vec![equity("a", dec!(1000), dec!(1100))]).unwrap();
    aggregator.set_holdings("dad", vec![equity("b", dec!(200), dec!(300))]).unwrap();

    assert_eq!(aggregator.top_contributor().unwrap().id, "me");
    assert_eq!(aggregator.best_performer().unwrap().id, "dad");
    assert_eq!(aggregator.member("dad").unwrap().returns_percentage, dec!(50));
}

#[test]
fn test_shared_across_threads() {
    let aggregator = Arc::new(family_with(&[
        ("a", Relationship::Myself),
        ("b", Relationship::Spouse),
    ]));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let aggregator = Arc::clone(&aggregator);
            std::thread::spawn(move || {
                let member = if i % 2 == 0 { "a" } else { "b" };
                aggregator
                    .add_holding(member, equity(&format!("h{}", i), dec!(100), dec!(100)))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let family = aggregator.family_portfolio();
    assert_eq!(family.total_value, dec!(800));
    assert_eq!(aggregator.total_holdings(), 8);
    let sum: Decimal = family.members.iter().map(|m| m.contribution).sum();
    assert_eq!(sum, dec!(100));
}
