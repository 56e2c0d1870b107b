//! Policy subsystem for tabsight
//!
//! A policy decides which metrics are computed for a domain. Policies are
//! registered once in a `PolicyRegistry` and instantiated per run.
//!
//! # Shapes
//!
//! - `Policy::GroupingPlan`: heuristic roles plus group-by specs
//!   (`generic_tabular`)
//! - `Policy::QueryList`: resolved roles plus `(section, query)` pairs
//!   (`orders_v1`, `sales_v1`)
//!
//! Every policy describes itself through a `PolicyDescriptor`, including the
//! severity thresholds its interpreter consumes.

mod descriptor;
mod errors;
mod generic;
mod orders;
mod registry;
mod sales;
mod traits;

pub use descriptor::{thresholds, Capabilities, PolicyDescriptor, SeverityThresholds, Threshold};
pub use errors::{PolicyError, PolicyResult};
pub use generic::{
    GenericDefinition, GenericOptions, GenericTabularPolicy, TopNScope, GENERIC_POLICY_NAME,
};
pub use orders::{OrdersDefinition, OrdersPolicyV1, ORDERS_POLICY_NAME};
pub use registry::{
    CandidateTrace, PolicyChoice, PolicyRegistry, SelectionTrace, AUTO_POLICY, FALLBACK_POLICY,
};
pub use sales::{SalesDefinition, SalesPolicyV1, SALES_POLICY_NAME};
pub use traits::{
    ColumnRoles, GroupingPlan, GroupingPlanPolicy, Policy, PolicyDefinition, QueryListPolicy,
    SectionQuery, TimeDimension,
};
