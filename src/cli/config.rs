//! Run configuration
//!
//! A single JSON file, loaded once per command:
//!
//! ```json
//! {
//!   "db_path": "data.sqlite",
//!   "output_dir": "runs/run1",
//!   "table": null,
//!   "policy": "auto",
//!   "roles": {"amount": ["total_usd"]},
//!   "profile": true,
//!   "generic": {"top_n_per_time": 10, "apply_topn_to": "cat+region"}
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::AnalysisRequest;
use crate::observability::{log_event_with_fields, Event};
use crate::policy::{GenericOptions, PolicyChoice, AUTO_POLICY};
use crate::roles::{normalize_hints, RoleHints};

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database holding the dataset (required)
    pub db_path: String,

    /// Artifact directory (required)
    pub output_dir: String,

    /// Table to analyze (default: first user table by name)
    #[serde(default)]
    pub table: Option<String>,

    /// Policy name or "auto"
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Role name to candidate columns, in priority order
    #[serde(default)]
    pub roles: RoleHints,

    /// Compute the store-backed data profile
    #[serde(default = "default_profile")]
    pub profile: bool,

    /// Knobs of the generic policy
    #[serde(default)]
    pub generic: GenericOptions,
}

fn default_policy() -> String {
    AUTO_POLICY.to_string()
}

fn default_profile() -> bool {
    true
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config = Self::from_json(&content)?;

        let path_str = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("config", path_str.as_str()),
                ("db_path", config.db_path.as_str()),
                ("policy", config.policy.as_str()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> CliResult<Self> {
        let mut config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        config.roles = normalize_hints(&config.roles)
            .map_err(|e| CliError::config_error(format!("Invalid roles entry: {}", e)))?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.db_path.trim().is_empty() {
            return Err(CliError::config_error("db_path must not be empty"));
        }

        if self.output_dir.trim().is_empty() {
            return Err(CliError::config_error("output_dir must not be empty"));
        }

        if self.policy.trim().is_empty() {
            return Err(CliError::config_error(
                "policy must be a policy name or 'auto'",
            ));
        }

        if self.table.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(CliError::config_error("table must not be empty when set"));
        }

        if self.generic.top_n_per_time == 0 {
            return Err(CliError::config_error("generic.top_n_per_time must be > 0"));
        }

        if self.generic.max_rows_per_groupby == 0 {
            return Err(CliError::config_error(
                "generic.max_rows_per_groupby must be > 0",
            ));
        }

        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        Path::new(&self.db_path)
    }

    pub fn output_path(&self) -> &Path {
        Path::new(&self.output_dir)
    }

    /// Engine request built from the policy and role hints
    pub fn analysis_request(&self) -> AnalysisRequest {
        AnalysisRequest {
            policy: PolicyChoice::parse(&self.policy),
            hints: self.roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TopNScope;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_json(r#"{"db_path": "d.sqlite", "output_dir": "out"}"#).unwrap();
        assert_eq!(config.policy, "auto");
        assert!(config.profile);
        assert!(config.table.is_none());
        assert!(config.roles.is_empty());
        assert_eq!(config.generic, GenericOptions::default());
        assert_eq!(config.analysis_request().policy, PolicyChoice::Auto);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            r#"{
                "db_path": "d.sqlite",
                "output_dir": "out",
                "table": "orders",
                "policy": "orders_v1",
                "roles": {"amount": ["total_usd"]},
                "profile": false,
                "generic": {"top_n_per_time": 5, "apply_topn_to": "cat_only"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.table.as_deref(), Some("orders"));
        assert!(!config.profile);
        assert_eq!(config.generic.top_n_per_time, 5);
        assert_eq!(config.generic.max_rows_per_groupby, 250);
        assert_eq!(config.generic.apply_topn_to, TopNScope::CatOnly);

        let request = config.analysis_request();
        assert_eq!(request.policy, PolicyChoice::Named("orders_v1".into()));
        assert_eq!(request.hints["amount"], vec!["total_usd".to_string()]);
    }

    #[test]
    fn test_role_hint_keys_normalized() {
        use crate::policy::PolicyRegistry;

        let columns: Vec<String> = ["buyer_ref", "product", "amount"].iter().map(|s| s.to_string()).collect();
        for key in ["customer", "Customer", " customer "] {
            let json = format!(
                r#"{{"db_path": "d", "output_dir": "out", "roles": {{"{}": ["buyer_ref"]}}}}"#,
                key
            );
            let config = Config::from_json(&json).unwrap();
            assert_eq!(config.roles.keys().collect::<Vec<_>>(), vec!["customer"]);

            let request = config.analysis_request();
            let trace = PolicyRegistry::with_builtins().auto_select_policy(&columns, &request.hints);
            assert_eq!(trace.selected, "orders_v1", "key {:?}", key);
        }
    }

    #[test]
    fn test_missing_required_field() {
        let err = Config::from_json(r#"{"db_path": "d.sqlite"}"#).unwrap_err();
        assert_eq!(err.code_str(), "TABSIGHT_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_rejects_invalid_values() {
        for bad in [
            r#"{"db_path": "", "output_dir": "out"}"#,
            r#"{"db_path": "d", "output_dir": " "}"#,
            r#"{"db_path": "d", "output_dir": "out", "policy": ""}"#,
            r#"{"db_path": "d", "output_dir": "out", "generic": {"top_n_per_time": 0}}"#,
            r#"{"db_path": "d", "output_dir": "out", "generic": {"max_rows_per_groupby": 0}}"#,
            r#"{"db_path": "d", "output_dir": "out", "generic": {"apply_topn_to": "everything"}}"#,
            r#"{"db_path": "d", "output_dir": "out", "roles": {"colour": ["c"]}}"#,
        ] {
            assert!(Config::from_json(bad).is_err(), "accepted: {}", bad);
        }
    }
}
