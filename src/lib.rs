//! tabsight - deterministic, policy-driven analysis of tabular datasets
//!
//! A run reads one table from a relational store, resolves semantic column
//! roles, executes the aggregate queries of one analysis policy and turns the
//! resulting metric rows into findings and normalized anomalies.

pub mod anomaly;
pub mod cli;
pub mod engine;
pub mod errors;
pub mod interpret;
pub mod observability;
pub mod pipeline;
pub mod planner;
pub mod policy;
pub mod profile;
pub mod roles;
pub mod store;
