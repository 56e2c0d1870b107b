//! Role resolution
//!
//! Maps physical column names to semantic roles. For each role the resolver
//! tries caller hints first, then the policy's ordered synonym list, matching
//! case-insensitively. The first candidate present in the table wins.
//!
//! Resolution depends only on (columns, hints): ties are broken by candidate
//! order, never alphabetically.

mod resolver;
mod role;

pub use resolver::{ColumnIndex, ResolvedRoles, RoleResolution, RoleResolver, SynonymTable};
pub use role::{hints_for, normalize_hints, Role, RoleHints};
