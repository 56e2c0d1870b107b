//! Semantic roles

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller role hints: role name to candidate column names, in priority order.
///
/// Keys are raw role names, matched the way `Role::from_str` parses them.
/// Names that do not parse as a `Role` are ignored.
pub type RoleHints = BTreeMap<String, Vec<String>>;

/// Rewrites hint keys to `Role::as_str()`.
///
/// Keys that spell the same role (`"Customer"`, `" customer "`) are merged in
/// key order, keeping the first occurrence of each candidate. Fails on the
/// first key that is not a role.
pub fn normalize_hints(hints: &RoleHints) -> Result<RoleHints, String> {
    let mut out = RoleHints::new();
    for (key, candidates) in hints {
        let role: Role = key.parse()?;
        let merged = out.entry(role.as_str().to_string()).or_default();
        for c in candidates {
            if !merged.contains(c) {
                merged.push(c.clone());
            }
        }
    }
    Ok(out)
}

/// Hint candidates for `role`, whatever the casing of their key
pub fn hints_for<'h>(role: Role, hints: &'h RoleHints) -> impl Iterator<Item = &'h str> {
    hints
        .iter()
        .filter(move |(key, _)| key.parse::<Role>().map_or(false, |r| r == role))
        .flat_map(|(_, candidates)| candidates.iter().map(String::as_str))
}

/// Semantic label assigned to a physical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Amount,
    Customer,
    Date,
    OrderId,
    Product,
    Profit,
    Region,
    Units,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Amount,
        Role::Customer,
        Role::Date,
        Role::OrderId,
        Role::Product,
        Role::Profit,
        Role::Region,
        Role::Units,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Amount => "amount",
            Role::Customer => "customer",
            Role::Date => "date",
            Role::OrderId => "order_id",
            Role::Product => "product",
            Role::Profit => "profit",
            Role::Region => "region",
            Role::Units => "units",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        assert_eq!("amount".parse::<Role>().unwrap(), Role::Amount);
        assert_eq!("Order_ID".parse::<Role>().unwrap(), Role::OrderId);
        assert!("colour".parse::<Role>().is_err());
    }

    #[test]
    fn test_ordering_is_alphabetical() {
        let mut names: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);
    }

    #[test]
    fn test_normalize_hints_merges_spellings() {
        let mut hints = RoleHints::new();
        hints.insert(" Customer ".into(), vec!["buyer_ref".into()]);
        hints.insert("customer".into(), vec!["client".into(), "buyer_ref".into()]);
        hints.insert("AMOUNT".into(), vec!["total_usd".into()]);

        let normalized = normalize_hints(&hints).unwrap();
        assert_eq!(normalized.keys().collect::<Vec<_>>(), vec!["amount", "customer"]);
        assert_eq!(normalized["customer"], vec!["buyer_ref".to_string(), "client".to_string()]);

        hints.insert("colour".into(), vec!["x".into()]);
        assert!(normalize_hints(&hints).is_err());
    }

    #[test]
    fn test_hints_for_ignores_key_casing() {
        let mut hints = RoleHints::new();
        hints.insert("Customer".into(), vec!["buyer_ref".into()]);
        hints.insert("colour".into(), vec!["x".into()]);
        assert_eq!(hints_for(Role::Customer, &hints).collect::<Vec<_>>(), vec!["buyer_ref"]);
        assert_eq!(hints_for(Role::Amount, &hints).count(), 0);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Role::OrderId).unwrap(), "\"order_id\"");
    }
}
