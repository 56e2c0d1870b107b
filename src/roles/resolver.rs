//! Role resolver and resolved-role map

use std::collections::BTreeMap;

use serde::Serialize;

use super::role::{hints_for, Role, RoleHints};

/// Case-insensitive index over physical column names.
///
/// Keys are trimmed and lowercased. When two columns collide, the first one
/// in table order wins.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    columns: Vec<String>,
    by_lower: BTreeMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(columns: &[String]) -> Self {
        let mut by_lower = BTreeMap::new();
        for (i, c) in columns.iter().enumerate() {
            by_lower.entry(c.trim().to_lowercase()).or_insert(i);
        }
        Self {
            columns: columns.to_vec(),
            by_lower,
        }
    }

    /// Physical name of the column matching `name`, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_lower
            .get(&name.trim().to_lowercase())
            .map(|&i| self.columns[i].as_str())
    }

    /// First candidate present in the table
    pub fn find_first<'c, I>(&self, candidates: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'c str>,
    {
        candidates.into_iter().find_map(|c| self.get(c))
    }

    /// All column names, in table order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Ordered synonym lists, one per role
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: Vec<(Role, Vec<&'static str>)>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the synonym list for `role`
    pub fn with(mut self, role: Role, synonyms: &[&'static str]) -> Self {
        self.entries.retain(|(r, _)| *r != role);
        self.entries.push((role, synonyms.to_vec()));
        self
    }

    /// Synonyms for `role`, in priority order
    pub fn synonyms(&self, role: Role) -> &[&'static str] {
        self.entries
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, s)| s.as_slice())
            .unwrap_or(&[])
    }

    /// Roles with a synonym list, in insertion order
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.entries.iter().map(|(r, _)| *r)
    }
}

/// Role to physical column map, iterated in role order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedRoles(BTreeMap<Role, String>);

impl ResolvedRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: Role, column: impl Into<String>) {
        self.0.insert(role, column.into());
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.0.get(&role).map(String::as_str)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains_key(&role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.0.iter().map(|(r, c)| (*r, c.as_str()))
    }
}

impl FromIterator<(Role, String)> for ResolvedRoles {
    fn from_iter<T: IntoIterator<Item = (Role, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of resolving a set of roles
#[derive(Debug, Clone, Default)]
pub struct RoleResolution {
    /// Roles that resolved
    pub resolved: ResolvedRoles,
    /// `Resolved <role> -> <column>` per resolved role, in request order
    pub reasons: Vec<String>,
}

impl RoleResolution {
    /// Requested roles from `roles` that did not resolve, in order
    pub fn missing(&self, roles: &[Role]) -> Vec<Role> {
        roles
            .iter()
            .copied()
            .filter(|r| !self.resolved.contains(*r))
            .collect()
    }
}

/// Resolves roles against a table's columns
#[derive(Debug, Clone)]
pub struct RoleResolver<'a> {
    synonyms: &'a SynonymTable,
}

impl<'a> RoleResolver<'a> {
    pub fn new(synonyms: &'a SynonymTable) -> Self {
        Self { synonyms }
    }

    /// Candidates for `role`: hints first, then synonyms
    pub fn candidates<'h>(&'h self, role: Role, hints: &'h RoleHints) -> Vec<&'h str> {
        let mut out: Vec<&str> = hints_for(role, hints).collect();
        out.extend(self.synonyms.synonyms(role).iter().copied());
        out
    }

    /// Resolves `roles` in order. Roles without any match are left out.
    pub fn resolve(&self, columns: &[String], hints: &RoleHints, roles: &[Role]) -> RoleResolution {
        let index = ColumnIndex::new(columns);
        let mut resolution = RoleResolution::default();

        for &role in roles {
            let candidates = self.candidates(role, hints);
            if let Some(col) = index.find_first(candidates) {
                resolution
                    .reasons
                    .push(format!("Resolved {} -> {}", role, col));
                resolution.resolved.insert(role, col.to_string());
            }
        }

        resolution
    }
}
