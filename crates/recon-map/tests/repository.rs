use std::fs;
use std::sync::Arc;
use std::thread;

use recon_map::{JsonRuleStore, RuleStore, StoreError};
use recon_model::{CleaningRule, RULE_TYPE_CURRENT_DATE, RuleSet};

fn cleaning_rule(rule_type: &str, column: &str, replacement: &str) -> CleaningRule {
    CleaningRule {
        rule_type: rule_type.to_string(),
        target_column: column.to_string(),
        pattern: None,
        replacement: replacement.to_string(),
        description: "test".to_string(),
        confidence: 0.9,
        created_at: "2025-08-09T00:00:00Z".to_string(),
    }
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = JsonRuleStore::new(dir.path().join("absent.json"));
    assert_eq!(store.load(), RuleSet::default());
}

#[test]
fn corrupt_file_loads_defaults_but_refuses_writes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rules.json");
    fs::write(&path, "{ not json").expect("write");
    let store = JsonRuleStore::new(&path);
    assert!(store.load().is_empty());
    let err = store.promote_column("a", "b").unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
    assert_eq!(fs::read_to_string(&path).expect("read"), "{ not json");
}

#[test]
fn writes_persist_and_use_original_keys() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("mapping_rules.json");
    let store = JsonRuleStore::new(&path);
    store.promote_mapping("Cust Ref", "customer_id", 0.8).expect("mapping");
    store
        .save_default_value("order_date", "", RULE_TYPE_CURRENT_DATE)
        .expect("default");
    store
        .promote_cleaning_rule(cleaning_rule("phone_format_fix", "phone", "+91-"))
        .expect("rule");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(json["mappings"][0]["source_column"], "Cust Ref");
    assert_eq!(json["mappings"][0]["learned"], true);
    assert_eq!(json["cleaning_rules"][0]["type"], "phone_format_fix");
    assert_eq!(json["default_values"]["order_date"]["rule_type"], "current_date");
    assert!(json["updated_at"].is_string());
    assert!(!path.with_file_name("mapping_rules.json.lock").exists());

    let reopened = JsonRuleStore::new(&path).load();
    assert_eq!(reopened.mappings.len(), 1);
    assert!(reopened.default_values.contains_key("order_date"));
}

#[test]
fn repromotion_supersedes_and_rules_dedupe() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = JsonRuleStore::new(dir.path().join("rules.json"));
    store.promote_mapping("Cust Ref", "customer_id", 1.0).expect("first");
    store.promote_mapping("cust ref", "customer_name", 1.0).expect("second");
    store
        .promote_cleaning_rule(cleaning_rule("postal_xx_pattern", "postal_code", "00"))
        .expect("rule");
    store
        .promote_cleaning_rule(cleaning_rule("postal_xx_pattern", "postal_code", "01"))
        .expect("rule again");

    let rules = store.load();
    assert_eq!(rules.mappings.len(), 1);
    assert_eq!(rules.mappings[0].target_column, "customer_name");
    assert_eq!(rules.cleaning_rules.len(), 1);
    assert_eq!(rules.cleaning_rules[0].replacement, "01");
}

#[test]
fn concurrent_updates_are_not_lost() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rules.json");
    let shared = Arc::new(JsonRuleStore::new(&path));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&shared);
            thread::spawn(move || {
                store
                    .promote_column(&format!("extra_{i}"), &format!("kept_{i}"))
                    .expect("promote");
            })
        })
        .collect();
    // A second store object on the same file contends through the lock file.
    let other = JsonRuleStore::new(&path);
    other.promote_mapping("Ref", "order_id", 1.0).expect("promote mapping");
    for handle in handles {
        handle.join().expect("join");
    }

    let rules = JsonRuleStore::new(&path).load();
    assert_eq!(rules.column_promotions.len(), 8);
    assert_eq!(rules.mappings.len(), 1);
}
