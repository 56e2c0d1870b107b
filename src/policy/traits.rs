//! Policy shapes
//!
//! A policy comes in one of two shapes:
//!
//! - grouping-plan: infers column roles heuristically and emits `GroupBySpec`s
//!   the engine plans and executes
//! - query-list: resolves semantic roles and emits `(section, query)` pairs
//!
//! `Policy` is the tagged union the engine dispatches on.

use crate::planner::{Expr, GroupBySpec, QuerySpec};
use crate::roles::{ResolvedRoles, RoleHints, RoleResolution, RoleResolver, SynonymTable};
use crate::store::Store;

use super::descriptor::{Capabilities, PolicyDescriptor};
use super::errors::{PolicyError, PolicyResult};

/// Registered, immutable policy definition
pub trait PolicyDefinition: Send + Sync {
    /// Unique policy name
    fn name(&self) -> &str;

    /// Semantic version
    fn version(&self) -> &str;

    /// Declared roles and features
    fn capabilities(&self) -> Capabilities;

    /// Self-describing contract
    fn describe(&self) -> PolicyDescriptor;

    /// Ordered synonym lists used for role resolution
    fn synonyms(&self) -> SynonymTable {
        SynonymTable::new()
    }

    /// Resolves every declared role against `columns`
    fn resolve(&self, columns: &[String], hints: &RoleHints) -> RoleResolution {
        let synonyms = self.synonyms();
        RoleResolver::new(&synonyms).resolve(columns, hints, &self.capabilities().all_roles())
    }

    /// Creates a fresh, single-run policy instance
    fn instantiate(&self, hints: &RoleHints) -> Policy;
}

/// Time dimension chosen for a grouping plan
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDimension {
    /// Group label (e.g. `year`)
    pub label: String,
    /// Bucket expression
    pub expr: Expr,
}

/// Heuristic column roles of one dataset. Derived once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRoles {
    pub time: Option<TimeDimension>,
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
    pub boolean: Vec<String>,
    pub identifier: Vec<String>,
}

/// Output of a grouping-plan policy
#[derive(Debug, Clone)]
pub struct GroupingPlan {
    pub roles: ColumnRoles,
    pub groupbys: Vec<GroupBySpec>,
    pub warnings: Vec<String>,
}

/// Policy that emits a grouping plan
pub trait GroupingPlanPolicy {
    fn name(&self) -> &str;

    /// Classifies columns into roles, with warnings for what is missing
    fn infer_roles(&self, columns: &[String]) -> (ColumnRoles, Vec<String>);

    /// Builds the group-bys for the inferred roles
    fn plan_groupbys(&self, roles: &ColumnRoles) -> (Vec<GroupBySpec>, Vec<String>);

    fn build_plan(&self, columns: &[String]) -> GroupingPlan {
        let (roles, mut warnings) = self.infer_roles(columns);
        let (groupbys, plan_warnings) = self.plan_groupbys(&roles);
        warnings.extend(plan_warnings);
        GroupingPlan {
            roles,
            groupbys,
            warnings,
        }
    }
}

/// One named query of a query-list policy
#[derive(Debug, Clone, PartialEq)]
pub struct SectionQuery {
    pub section: String,
    pub query: QuerySpec,
}

impl SectionQuery {
    pub fn new(section: impl Into<String>, query: impl Into<QuerySpec>) -> Self {
        Self {
            section: section.into(),
            query: query.into(),
        }
    }
}

/// Policy that emits a list of section queries
pub trait QueryListPolicy {
    fn name(&self) -> &str;

    /// Builds the queries for the store's primary table.
    ///
    /// Populates `resolved_roles` before failing on missing required roles.
    fn build_queries(&mut self, store: &dyn Store) -> PolicyResult<Vec<SectionQuery>>;

    /// Roles resolved by the last `build_queries` call (best-effort on failure)
    fn resolved_roles(&self) -> &ResolvedRoles;
}

/// Resolves a query-list policy's roles against the store's primary table.
///
/// `resolved` is overwritten before the required roles are checked, so the
/// caller keeps the partial map when resolution fails. Returns the table name.
pub(crate) fn resolve_against_store(
    policy: &str,
    store: &dyn Store,
    synonyms: &SynonymTable,
    hints: &RoleHints,
    capabilities: &Capabilities,
    resolved: &mut ResolvedRoles,
) -> PolicyResult<String> {
    let table = store.primary_table()?;
    let columns: Vec<String> = store
        .columns(&table)?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let resolution =
        RoleResolver::new(synonyms).resolve(&columns, hints, &capabilities.all_roles());
    *resolved = resolution.resolved.clone();

    let missing = resolution.missing(&capabilities.requires);
    if !missing.is_empty() {
        return Err(PolicyError::MissingRequiredRoles {
            policy: policy.to_string(),
            missing,
            available: columns,
        });
    }

    Ok(table)
}

/// A single-run policy instance
pub enum Policy {
    GroupingPlan(Box<dyn GroupingPlanPolicy>),
    QueryList(Box<dyn QueryListPolicy>),
}

impl Policy {
    pub fn name(&self) -> &str {
        match self {
            Policy::GroupingPlan(p) => p.name(),
            Policy::QueryList(p) => p.name(),
        }
    }

    /// `grouping_plan` or `query_list`
    pub fn shape(&self) -> &'static str {
        match self {
            Policy::GroupingPlan(_) => "grouping_plan",
            Policy::QueryList(_) => "query_list",
        }
    }
}

impl std::fmt::Debug for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policy")
            .field("name", &self.name())
            .field("shape", &self.shape())
            .finish()
    }
}
