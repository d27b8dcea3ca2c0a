use std::collections::BTreeSet;

use proptest::prelude::*;
use recon_map::{
    ColumnProfile, FallbackError, FallbackVerdict, HeaderMatcher, JsonRuleStore, RuleStore,
};
use recon_model::{InferredType, LearnedMapping, MatcherOptions, Provenance, RuleSet};
use recon_standards::{VariationTable, builtin_schema};

fn matcher() -> HeaderMatcher {
    HeaderMatcher::new(
        builtin_schema(),
        VariationTable::builtin(),
        MatcherOptions::default(),
    )
}

fn profiles(columns: &[(&str, InferredType)]) -> Vec<ColumnProfile> {
    columns
        .iter()
        .map(|(name, ty)| ColumnProfile::new(*name, *ty))
        .collect()
}

fn target_of<'a>(suggestions: &'a [recon_model::MappingSuggestion], column: &str) -> Option<&'a str> {
    suggestions
        .iter()
        .find(|s| s.source_column == column)
        .and_then(|s| s.target.as_deref())
}

#[test]
fn order_no_maps_to_order_id() {
    let suggestions = matcher().match_columns(&profiles(&[("Order No", InferredType::String)]));
    assert_eq!(suggestions.len(), 1);
    let s = &suggestions[0];
    assert_eq!(s.target.as_deref(), Some("order_id"));
    assert_eq!(s.provenance, Provenance::Heuristic);
    assert!(s.confidence >= 0.9);
    assert_eq!(s.matched_variation.as_deref(), Some("Order No"));
    assert!(s.explain().contains("Variation match"));
}

#[test]
fn competing_columns_claim_total_once() {
    let suggestions = matcher().match_columns(&profiles(&[
        ("Total", InferredType::Numeric),
        ("Grand Total", InferredType::Numeric),
    ]));
    let holders: Vec<_> = suggestions
        .iter()
        .filter(|s| s.target.as_deref() == Some("total_amount"))
        .collect();
    assert_eq!(holders.len(), 1);
    let loser = suggestions
        .iter()
        .find(|s| s.source_column != holders[0].source_column)
        .unwrap();
    assert_ne!(loser.target.as_deref(), Some("total_amount"));
}

#[test]
fn typical_export_maps_cleanly() {
    let suggestions = matcher().match_columns(&profiles(&[
        ("Order No", InferredType::String),
        ("OrderDate", InferredType::Date),
        ("E-mail", InferredType::String),
        ("Phone #", InferredType::String),
        ("ZIP/Postal", InferredType::Numeric),
        ("Qty", InferredType::Numeric),
        ("Unit Price", InferredType::Numeric),
        ("GSTIN", InferredType::String),
    ]));
    assert_eq!(target_of(&suggestions, "OrderDate"), Some("order_date"));
    assert_eq!(target_of(&suggestions, "E-mail"), Some("email"));
    assert_eq!(target_of(&suggestions, "Phone #"), Some("phone"));
    assert_eq!(target_of(&suggestions, "ZIP/Postal"), Some("postal_code"));
    assert_eq!(target_of(&suggestions, "Qty"), Some("quantity"));
    assert_eq!(target_of(&suggestions, "Unit Price"), Some("unit_price"));
    assert_eq!(target_of(&suggestions, "GSTIN"), Some("tax_id"));
}

#[test]
fn suggestions_sorted_by_confidence() {
    let suggestions = matcher().match_columns(&profiles(&[
        ("zzz", InferredType::String),
        ("Order No", InferredType::String),
        ("Qty", InferredType::Numeric),
    ]));
    assert!(
        suggestions
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence)
    );
    assert_eq!(target_of(&suggestions, "zzz"), None);
}

#[test]
fn learned_mapping_round_trips_through_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = JsonRuleStore::new(dir.path().join("mapping_rules.json"));
    store
        .promote_mapping("Buyer Ref", "customer_name", 1.0)
        .expect("promote");

    let matcher = matcher().with_store(&store);
    let suggestions = matcher.match_columns(&profiles(&[("buyer ref", InferredType::String)]));
    assert_eq!(suggestions[0].target.as_deref(), Some("customer_name"));
    assert_eq!(suggestions[0].provenance, Provenance::Learned);
}

#[test]
fn learned_target_already_claimed_falls_through() {
    let mut rules = RuleSet::default();
    rules.upsert_mapping(LearnedMapping::new("A Ref", "order_id"));
    rules.upsert_mapping(LearnedMapping::new("B Ref", "order_id"));
    let suggestions = matcher()
        .with_rules(rules)
        .match_columns(&profiles(&[
            ("A Ref", InferredType::String),
            ("B Ref", InferredType::String),
        ]));
    let learned: Vec<_> = suggestions
        .iter()
        .filter(|s| s.provenance == Provenance::Learned)
        .collect();
    assert_eq!(learned.len(), 1);
    assert_eq!(learned[0].source_column, "A Ref");
    assert_ne!(target_of(&suggestions, "B Ref"), Some("order_id"));
}

#[test]
fn kept_column_is_promoted() {
    let mut rules = RuleSet::default();
    rules
        .column_promotions
        .insert("Coupon Code".into(), "coupon_code".into());
    let options = MatcherOptions::default();
    let suggestions = matcher()
        .with_rules(rules)
        .match_columns(&profiles(&[("Coupon Code", InferredType::String)]));
    assert_eq!(suggestions[0].target.as_deref(), Some("coupon_code"));
    assert_eq!(suggestions[0].provenance, Provenance::Promoted);
    assert_eq!(suggestions[0].confidence, options.promoted_confidence);
}

#[test]
fn kept_output_name_is_claimed_once() {
    let mut rules = RuleSet::default();
    rules.column_promotions.insert("Coupon".into(), "promo".into());
    rules.column_promotions.insert("Voucher".into(), "promo".into());
    rules.column_promotions.insert("Misc".into(), "email".into());
    let suggestions = matcher().with_rules(rules).match_columns(&profiles(&[
        ("Voucher", InferredType::String),
        ("Coupon", InferredType::String),
        ("Email", InferredType::String),
        ("Misc", InferredType::String),
    ]));

    let promo: Vec<&str> = suggestions
        .iter()
        .filter(|s| s.target.as_deref() == Some("promo"))
        .map(|s| s.source_column.as_str())
        .collect();
    assert_eq!(promo, ["Coupon"]);
    let emails = suggestions
        .iter()
        .filter(|s| s.target.as_deref() == Some("email"))
        .count();
    assert_eq!(emails, 1);
    assert_ne!(target_of(&suggestions, "Voucher"), Some("promo"));
}

#[test]
fn fallback_answers_low_confidence_columns() {
    let fallback = |header: &str, candidates: &[String]| -> Result<FallbackVerdict, FallbackError> {
        if header == "Buyer" {
            assert!(candidates.iter().any(|c| c == "customer_name"));
            Ok(FallbackVerdict {
                suggested: Some("Customer_Name".to_string()),
                confidence: 0.66,
            })
        } else {
            Ok(FallbackVerdict::unmapped())
        }
    };
    let suggestions = matcher()
        .with_fallback(Box::new(fallback))
        .match_columns(&profiles(&[
            ("Buyer", InferredType::String),
            ("Xyzzy", InferredType::String),
        ]));
    let buyer = suggestions.iter().find(|s| s.source_column == "Buyer").unwrap();
    assert_eq!(buyer.target.as_deref(), Some("customer_name"));
    assert_eq!(buyer.provenance, Provenance::Fallback);
    assert!((buyer.confidence - 0.66).abs() < 1e-6);
    let other = suggestions.iter().find(|s| s.source_column == "Xyzzy").unwrap();
    assert_eq!(other.target, None);
}

#[test]
fn fallback_errors_degrade_to_unmapped() {
    let failing = |_: &str, _: &[String]| -> Result<FallbackVerdict, FallbackError> {
        Err(FallbackError::Malformed("garbage".into()))
    };
    let suggestions = matcher()
        .with_fallback(Box::new(failing))
        .match_columns(&profiles(&[("Xyzzy", InferredType::String)]));
    assert_eq!(suggestions[0].target, None);
    assert_eq!(suggestions[0].confidence, 0.0);
    assert_eq!(suggestions[0].provenance, Provenance::Fallback);
}

#[test]
fn fallback_cannot_steal_claimed_field() {
    let greedy = |_: &str, _: &[String]| -> Result<FallbackVerdict, FallbackError> {
        Ok(FallbackVerdict {
            suggested: Some("order_id".to_string()),
            confidence: 0.9,
        })
    };
    let suggestions = matcher()
        .with_fallback(Box::new(greedy))
        .match_columns(&profiles(&[
            ("Order No", InferredType::String),
            ("Xyzzy", InferredType::String),
        ]));
    assert_eq!(target_of(&suggestions, "Order No"), Some("order_id"));
    assert_eq!(target_of(&suggestions, "Xyzzy"), None);
}

const HEADER_POOL: &[&str] = &[
    "Order No", "OrderID", "order_ref", "Total", "Grand Total", "amount", "Qty", "QTY",
    "Phone #", "mobile", "contact", "Email", "E-mail", "Ship Addr", "Bill Addr", "Cust ID",
    "Customer", "name", "City", "State/Province", "zip", "pin", "SKU", "Item", "price",
    "Coupon Code", "Notes", "misc", "date", "Tax%", "gst", "GSTIN",
];

fn type_strategy() -> impl Strategy<Value = InferredType> {
    prop_oneof![
        Just(InferredType::Date),
        Just(InferredType::Numeric),
        Just(InferredType::String),
        Just(InferredType::Empty),
    ]
}

const KEPT_OUTPUTS: &[&str] = &["promo", "notes_raw", "email", "order_id"];

fn kept_strategy() -> impl Strategy<Value = Vec<(&'static str, &'static str)>> {
    proptest::collection::vec(
        (
            proptest::sample::select(HEADER_POOL),
            proptest::sample::select(KEPT_OUTPUTS),
        ),
        0..8,
    )
}

proptest! {
    #[test]
    fn accepted_targets_are_unique_and_deterministic(
        columns in proptest::collection::vec(
            (proptest::sample::select(HEADER_POOL), type_strategy()),
            1..16,
        ),
        kept in kept_strategy(),
    ) {
        let profiles: Vec<ColumnProfile> = columns
            .iter()
            .map(|(name, ty)| ColumnProfile::new(*name, *ty))
            .collect();
        let mut rules = RuleSet::default();
        for (column, output) in &kept {
            rules.column_promotions.insert(column.to_string(), output.to_string());
        }
        let matcher = matcher().with_rules(rules);
        let first = matcher.match_columns(&profiles);
        let second = matcher.match_columns(&profiles);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), profiles.len());

        let mut seen = BTreeSet::new();
        for suggestion in &first {
            prop_assert!((0.0..=1.0).contains(&suggestion.confidence));
            if let Some(target) = &suggestion.target {
                prop_assert!(seen.insert(target.clone()), "duplicate target {}", target);
            }
        }
    }
}
