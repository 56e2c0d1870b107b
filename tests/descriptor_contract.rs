//! Policy Descriptor Tests
//!
//! Tests for descriptor invariants of every registered policy:
//! - Names are unique and match the descriptor
//! - Every threshold has finite bounds ordered by direction
//! - Policies that emit anomalies declare thresholds
//! - Descriptors serialize with a stable shape

use std::collections::BTreeSet;

use tabsight::policy::{PolicyError, PolicyRegistry};

// =============================================================================
// Helper Functions
// =============================================================================

fn registry() -> PolicyRegistry {
    PolicyRegistry::with_builtins()
}

// =============================================================================
// Descriptor Tests
// =============================================================================

/// Registered names are unique and each descriptor reports its own name.
#[test]
fn test_names_match() {
    let registry = registry();
    let names = registry.list_policies();
    let unique: BTreeSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());

    for name in &names {
        let d = registry.describe_policy(name).unwrap();
        assert_eq!(&d.name, name);
        assert!(!d.version.is_empty());
        assert!(!d.description.is_empty());
    }
}

/// Bounds are finite and never equal.
#[test]
fn test_thresholds_well_formed() {
    let registry = registry();
    for name in registry.list_policies() {
        let d = registry.describe_policy(&name).unwrap();
        for (key, t) in &d.severity_thresholds {
            assert!(t.warning.is_finite() && t.critical.is_finite(), "{}:{}", name, key);
            assert_ne!(t.warning, t.critical, "{}:{}", name, key);
        }
    }
}

/// Anomaly-emitting policies describe what they emit and declare thresholds.
#[test]
fn test_emitting_policies_declare_thresholds() {
    let registry = registry();
    for name in registry.list_policies() {
        let d = registry.describe_policy(&name).unwrap();
        if d.emits_anomalies {
            assert!(!d.severity_thresholds.is_empty(), "{}", name);
            assert!(!d.anomalies_emitted.is_empty(), "{}", name);
            assert!(d.emits_anomalies_normalized, "{}", name);
        }
    }
}

/// Required and optional roles never overlap.
#[test]
fn test_roles_disjoint() {
    let registry = registry();
    for name in registry.list_policies() {
        let d = registry.describe_policy(&name).unwrap();
        for role in &d.required_roles {
            assert!(!d.optional_roles.contains(role), "{}: {}", name, role);
        }
    }
}

/// Descriptors serialize with every contract field.
#[test]
fn test_descriptor_json_fields() {
    let d = registry().describe_policy("orders_v1").unwrap();
    let v = serde_json::to_value(&d).unwrap();
    for field in [
        "name",
        "version",
        "description",
        "required_roles",
        "optional_roles",
        "supports",
        "expected_metrics",
        "coverage_behavior",
        "anomalies_emitted",
        "severity_thresholds",
        "emits_anomalies",
        "emits_anomalies_normalized",
    ] {
        assert!(v.get(field).is_some(), "missing {}", field);
    }
    assert_eq!(v["required_roles"], serde_json::json!(["customer", "product", "amount"]));
    assert_eq!(v["severity_thresholds"]["customer_revenue_share_top1"]["critical"], 0.4);
}

/// Unknown names list what is available.
#[test]
fn test_unknown_policy_lists_available() {
    let err = registry().describe_policy("returns_v1").unwrap_err();
    match err {
        PolicyError::UnknownPolicy { name, available } => {
            assert_eq!(name, "returns_v1");
            assert!(available.contains(&"orders_v1".to_string()));
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// Versioned names group by their base.
#[test]
fn test_policy_versions() {
    let registry = registry();
    assert_eq!(registry.list_policy_versions("sales"), vec!["sales_v1"]);
    assert_eq!(registry.list_policy_versions("generic_tabular"), vec!["generic_tabular"]);
}
