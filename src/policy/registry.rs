//! Policy registry and auto-selection
//!
//! The registry is built once at startup and only read afterwards. Selection
//! scores every registered policy against the table's columns:
//!
//! ```text
//! score    = 3 x |requires resolved| + |optional resolved|
//! eligible = no required role missing
//! ```
//!
//! The eligible candidate with the highest score wins; on equal scores the
//! first registered wins. With no eligible candidate the generic fallback is
//! used.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::roles::{ResolvedRoles, Role, RoleHints};

use super::descriptor::{Capabilities, PolicyDescriptor, SeverityThresholds};
use super::errors::{PolicyError, PolicyResult};
use super::generic::{GenericDefinition, GenericOptions, GENERIC_POLICY_NAME};
use super::orders::OrdersDefinition;
use super::sales::SalesDefinition;
use super::traits::{Policy, PolicyDefinition};

/// Literal policy name requesting auto-selection
pub const AUTO_POLICY: &str = "auto";

/// Policy used when no candidate is eligible
pub const FALLBACK_POLICY: &str = GENERIC_POLICY_NAME;

/// Weight of each resolved required role in the selection score
const REQUIRED_WEIGHT: u32 = 3;

/// Explicit policy or auto-selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PolicyChoice {
    #[default]
    Auto,
    Named(String),
}

impl PolicyChoice {
    /// `"auto"` (any case, surrounding whitespace ignored) selects automatically
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case(AUTO_POLICY) {
            PolicyChoice::Auto
        } else {
            PolicyChoice::Named(trimmed.to_string())
        }
    }

    /// `auto` or the requested policy name
    pub fn name(&self) -> &str {
        match self {
            PolicyChoice::Auto => AUTO_POLICY,
            PolicyChoice::Named(name) => name,
        }
    }
}

/// Selection record of one candidate policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTrace {
    pub name: String,
    pub capabilities: Capabilities,
    pub resolved_roles: ResolvedRoles,
    pub missing_required_roles: Vec<Role>,
    pub eligible: bool,
    pub score: u32,
    pub reasons: Vec<String>,
}

/// How a run's policy was chosen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionTrace {
    /// `auto` or `explicit`
    pub mode: String,
    pub selected: String,
    /// One entry per registered policy, in registration order (auto mode only)
    pub candidates: Vec<CandidateTrace>,
}

impl SelectionTrace {
    pub fn explicit(name: impl Into<String>) -> Self {
        Self {
            mode: "explicit".to_string(),
            selected: name.into(),
            candidates: Vec::new(),
        }
    }
}

/// Registry of policy definitions, kept in registration order
#[derive(Default)]
pub struct PolicyRegistry {
    policies: Vec<Box<dyn PolicyDefinition>>,
}

impl PolicyRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in policies: generic, orders, sales
    pub fn with_builtins() -> Self {
        Self::with_generic_options(GenericOptions::default())
    }

    /// Built-in policies, with custom knobs for the generic fallback
    pub fn with_generic_options(options: GenericOptions) -> Self {
        let mut registry = Self::new();
        registry.policies.push(Box::new(GenericDefinition::new(options)));
        registry.policies.push(Box::new(OrdersDefinition));
        registry.policies.push(Box::new(SalesDefinition));
        registry
    }

    /// Registers a policy. Names must be non-empty and unique.
    pub fn register(&mut self, policy: Box<dyn PolicyDefinition>) -> PolicyResult<()> {
        let name = policy.name().trim();
        if name.is_empty() {
            return Err(PolicyError::EmptyName);
        }
        if self.policies.iter().any(|p| p.name() == name) {
            return Err(PolicyError::DuplicatePolicy(name.to_string()));
        }
        self.policies.push(policy);
        Ok(())
    }

    /// Looks up a policy by name
    pub fn get(&self, name: &str) -> PolicyResult<&dyn PolicyDefinition> {
        self.policies
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
            .ok_or_else(|| PolicyError::UnknownPolicy {
                name: name.to_string(),
                available: self.list_policies(),
            })
    }

    /// Registered names, sorted
    pub fn list_policies(&self) -> Vec<String> {
        self.policies
            .iter()
            .map(|p| p.name().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Registered names, in registration order
    pub fn registration_order(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Registered names sharing `base` (the part before the last `_v`), sorted
    pub fn list_policy_versions(&self, base: &str) -> Vec<String> {
        self.list_policies()
            .into_iter()
            .filter(|name| policy_base(name) == base)
            .collect()
    }

    pub fn describe_policy(&self, name: &str) -> PolicyResult<PolicyDescriptor> {
        Ok(self.get(name)?.describe())
    }

    /// Severity thresholds owned by `name`
    pub fn thresholds_for(&self, name: &str) -> PolicyResult<SeverityThresholds> {
        Ok(self.get(name)?.describe().severity_thresholds)
    }

    /// Creates a single-run instance of `name`
    pub fn instantiate(&self, name: &str, hints: &RoleHints) -> PolicyResult<Policy> {
        Ok(self.get(name)?.instantiate(hints))
    }

    /// Scores every registered policy against `columns` and picks one
    pub fn auto_select_policy(&self, columns: &[String], hints: &RoleHints) -> SelectionTrace {
        let mut candidates = Vec::with_capacity(self.policies.len());
        let mut best: Option<(usize, u32)> = None;

        for (i, policy) in self.policies.iter().enumerate() {
            let capabilities = policy.capabilities();
            let resolution = policy.resolve(columns, hints);
            let missing = resolution.missing(&capabilities.requires);

            let required_hits = (capabilities.requires.len() - missing.len()) as u32;
            let optional_hits = capabilities
                .optional
                .iter()
                .filter(|r| resolution.resolved.contains(**r))
                .count() as u32;
            let score = REQUIRED_WEIGHT * required_hits + optional_hits;
            let eligible = missing.is_empty();

            if eligible && best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }

            candidates.push(CandidateTrace {
                name: policy.name().to_string(),
                capabilities,
                resolved_roles: resolution.resolved,
                missing_required_roles: missing,
                eligible,
                score,
                reasons: resolution.reasons,
            });
        }

        let selected = best
            .map(|(i, _)| candidates[i].name.clone())
            .unwrap_or_else(|| FALLBACK_POLICY.to_string());

        SelectionTrace {
            mode: AUTO_POLICY.to_string(),
            selected,
            candidates,
        }
    }

    /// Resolves a choice into a registered policy name plus its trace
    pub fn select(
        &self,
        choice: &PolicyChoice,
        columns: &[String],
        hints: &RoleHints,
    ) -> PolicyResult<SelectionTrace> {
        let trace = match choice {
            PolicyChoice::Auto => self.auto_select_policy(columns, hints),
            PolicyChoice::Named(name) => SelectionTrace::explicit(name.clone()),
        };
        self.get(&trace.selected)?;
        Ok(trace)
    }
}

fn policy_base(name: &str) -> &str {
    match name.rfind("_v") {
        Some(i) => &name[..i],
        None => name,
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("policies", &self.registration_order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_order() {
        let registry = PolicyRegistry::with_builtins();
        assert_eq!(
            registry.registration_order(),
            vec!["generic_tabular", "orders_v1", "sales_v1"]
        );
        assert_eq!(
            registry.list_policies(),
            vec!["generic_tabular", "orders_v1", "sales_v1"]
        );
    }

    struct Named(&'static str);

    impl PolicyDefinition for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::new(&[], &[], &[])
        }

        fn describe(&self) -> PolicyDescriptor {
            GenericDefinition::default().describe()
        }

        fn instantiate(&self, hints: &RoleHints) -> Policy {
            GenericDefinition::default().instantiate(hints)
        }
    }

    #[test]
    fn test_register_rejects_duplicates_and_empty() {
        let mut registry = PolicyRegistry::with_builtins();
        assert!(matches!(
            registry.register(Box::new(OrdersDefinition)),
            Err(PolicyError::DuplicatePolicy(_))
        ));
        assert!(matches!(
            registry.register(Box::new(Named("  "))),
            Err(PolicyError::EmptyName)
        ));
        registry.register(Box::new(Named("returns_v1"))).unwrap();
        assert_eq!(registry.registration_order().last(), Some(&"returns_v1"));
    }

    #[test]
    fn test_unknown_policy() {
        let registry = PolicyRegistry::with_builtins();
        let err = registry.describe_policy("returns_v9").unwrap_err();
        assert!(err.to_string().contains("generic_tabular, orders_v1, sales_v1"));
    }

    #[test]
    fn test_versions() {
        let registry = PolicyRegistry::with_builtins();
        assert_eq!(registry.list_policy_versions("orders"), vec!["orders_v1"]);
        assert!(registry.list_policy_versions("returns").is_empty());
        assert_eq!(policy_base("generic_tabular"), "generic_tabular");
    }

    #[test]
    fn test_auto_selects_orders() {
        let registry = PolicyRegistry::with_builtins();
        let trace = registry.auto_select_policy(&cols(&["customer_id", "product", "amount"]), &RoleHints::new());
        assert_eq!(trace.selected, "orders_v1");
        assert_eq!(trace.candidates.len(), 3);
        let orders = &trace.candidates[1];
        assert!(orders.eligible);
        assert_eq!(orders.score, 9);
        let sales = &trace.candidates[2];
        assert!(sales.eligible);
        assert_eq!(sales.score, 6);
    }

    #[test]
    fn test_auto_falls_back_to_generic() {
        let registry = PolicyRegistry::with_builtins();
        let trace = registry.auto_select_policy(&cols(&["foo", "bar"]), &RoleHints::new());
        assert_eq!(trace.selected, "generic_tabular");
    }

    #[test]
    fn test_generic_scores_zero() {
        let registry = PolicyRegistry::with_builtins();
        let trace = registry.auto_select_policy(&cols(&["category", "sales"]), &RoleHints::new());
        assert_eq!(trace.candidates[0].score, 0);
        assert!(trace.candidates[0].eligible);
        assert_eq!(trace.selected, "sales_v1");
    }

    #[test]
    fn test_explicit_choice() {
        let registry = PolicyRegistry::with_builtins();
        let trace = registry
            .select(&PolicyChoice::parse("sales_v1"), &[], &RoleHints::new())
            .unwrap();
        assert_eq!(trace.mode, "explicit");
        assert!(trace.candidates.is_empty());
        assert!(registry
            .select(&PolicyChoice::parse("nope"), &[], &RoleHints::new())
            .is_err());
        assert_eq!(PolicyChoice::parse(" AUTO "), PolicyChoice::Auto);
    }

    #[test]
    fn test_thresholds_for() {
        let registry = PolicyRegistry::with_builtins();
        let t = registry.thresholds_for("sales_v1").unwrap();
        assert_eq!(t["sales_trend_change"].critical, -0.25);
    }
}
