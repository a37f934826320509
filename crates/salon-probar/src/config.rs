//! Suite configuration
//!
//! Environment profiles and the named timeout table. Nothing here is global:
//! a [`SuiteConfig`] is loaded once per run and the selected
//! [`Environment`] travels inside a [`RunContext`](crate::RunContext).
//!
//! ```yaml
//! default_env: staging
//! environments:
//!   staging:
//!     base_url: https://my-staging.example.com
//!     app_origin: https://app-staging.example.com
//!     api_gateway: https://api-gateway-staging.example.com
//!     business_id: abc
//!     branch_id: def
//! timeouts:
//!   ELEMENT_VISIBLE: 15000
//! ```

use crate::result::{SalonError, SalonResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the staff password
pub const PASSWORD_ENV_VAR: &str = "SALON_STAFF_PASSWORD";

/// Environment variable overriding the staff e-mail
pub const EMAIL_ENV_VAR: &str = "SALON_STAFF_EMAIL";

/// Environment variable selecting the environment by name
pub const ENV_NAME_VAR: &str = "SALON_ENV";

/// Environment used when nothing else selects one
pub const DEFAULT_ENV_NAME: &str = "dev";

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// One deployment of the product under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Profile name (`dev`, `prod`, ...)
    #[serde(default)]
    pub name: String,
    /// Staff web app URL
    pub base_url: String,
    /// Origin sent with gateway requests
    pub app_origin: String,
    /// API gateway root
    pub api_gateway: String,
    /// Business identifier
    pub business_id: String,
    /// Branch identifier
    pub branch_id: String,
    /// Staff login e-mail
    #[serde(default)]
    pub staff_email: String,
    /// Staff login password; usually supplied through [`PASSWORD_ENV_VAR`]
    #[serde(default, skip_serializing)]
    pub staff_password: String,
    /// OAuth token endpoint
    #[serde(default)]
    pub token_url: Option<String>,
}

impl Environment {
    /// GraphQL endpoint behind the gateway
    #[must_use]
    pub fn graphql_url(&self) -> String {
        format!("{}/api-facade/graphql", self.api_gateway.trim_end_matches('/'))
    }

    /// REST endpoint behind the gateway
    #[must_use]
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_gateway.trim_end_matches('/'))
    }

    /// `business|branch|` security context header value
    #[must_use]
    pub fn security_context(&self) -> String {
        format!("{}|{}|", self.business_id, self.branch_id)
    }

    /// Apply credential overrides from `lookup` (normally `std::env::var`)
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(PASSWORD_ENV_VAR) {
            self.staff_password = password;
        }
        if let Some(email) = lookup(EMAIL_ENV_VAR) {
            self.staff_email = email;
        }
        self
    }

    /// One-line description without credentials
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "name={} | base_url={} | api_gateway={} | origin={} | business_id={} | branch_id={}",
            self.name,
            self.base_url,
            self.api_gateway,
            self.app_origin,
            self.business_id,
            self.branch_id
        )
    }

    /// Development profile
    #[must_use]
    pub fn dev() -> Self {
        Self {
            name: "dev".to_string(),
            base_url: "https://my-dev.phorest.com".to_string(),
            app_origin: "https://app-dev.phorest.com".to_string(),
            api_gateway: "https://api-gateway-dev.phorest.com".to_string(),
            business_id: "okZVIi6pKyOe7LwzTTiWwg".to_string(),
            branch_id: "ooPWjXsoYnvR1X9k7qmkIg".to_string(),
            staff_email: String::new(),
            staff_password: String::new(),
            token_url: None,
        }
    }

    /// Production profile
    #[must_use]
    pub fn prod() -> Self {
        Self {
            name: "prod".to_string(),
            base_url: "https://my.phorest.com".to_string(),
            app_origin: "https://my.phorest.com".to_string(),
            api_gateway: "https://api-gateway-eu.phorest.com".to_string(),
            business_id: "GIqneoR8AJg9t-2F23_vJw".to_string(),
            branch_id: "SgvKUxC4FKNUPUYw2mF9AQ".to_string(),
            staff_email: String::new(),
            staff_password: String::new(),
            token_url: None,
        }
    }
}

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Named timeout table with per-run overrides.
///
/// Keys are upper-case names (`ELEMENT_VISIBLE`); unknown names fall back to
/// `DEFAULT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeouts {
    table: BTreeMap<String, u64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        let table = [
            ("DEFAULT", 10_000),
            ("SHORT", 5_000),
            ("LONG", 30_000),
            ("VERY_LONG", 60_000),
            ("ELEMENT_VISIBLE", 10_000),
            ("ELEMENT_ENABLED", 10_000),
            ("PAGE_LOAD", 30_000),
            ("API_CALL", 30_000),
            ("NAVIGATION", 15_000),
            ("WAIT_FOR", 10_000),
        ]
        .into_iter()
        .map(|(name, ms)| (name.to_string(), ms))
        .collect();
        Self { table }
    }
}

impl Timeouts {
    /// Timeout in milliseconds for `name`, falling back to `DEFAULT`
    #[must_use]
    pub fn ms(&self, name: &str) -> u64 {
        self.table
            .get(name)
            .or_else(|| self.table.get("DEFAULT"))
            .copied()
            .unwrap_or(10_000)
    }

    /// Timeout for `name` as Duration
    #[must_use]
    pub fn get(&self, name: &str) -> Duration {
        Duration::from_millis(self.ms(name))
    }

    /// Override one entry
    pub fn set(&mut self, name: impl Into<String>, ms: u64) {
        let _ = self.table.insert(name.into(), ms);
    }

    fn merge(&mut self, other: Self) {
        self.table.extend(other.table);
    }
}

// =============================================================================
// SUITE CONFIG
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    default_env: Option<String>,
    #[serde(default)]
    environments: BTreeMap<String, Environment>,
    #[serde(default)]
    timeouts: Option<Timeouts>,
}

/// Known environments plus the timeout table
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    default_env: String,
    environments: BTreeMap<String, Environment>,
    timeouts: Timeouts,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SuiteConfig {
    /// Built-in `dev` and `prod` profiles with default timeouts
    #[must_use]
    pub fn builtin() -> Self {
        let environments = [Environment::dev(), Environment::prod()]
            .into_iter()
            .map(|env| (env.name.clone(), env))
            .collect();
        Self {
            default_env: DEFAULT_ENV_NAME.to_string(),
            environments,
            timeouts: Timeouts::default(),
        }
    }

    /// Built-ins overlaid with the YAML document `yaml`
    pub fn from_yaml_str(yaml: &str) -> SalonResult<Self> {
        let file: ConfigFile = serde_yaml_ng::from_str(yaml)?;
        let mut config = Self::builtin();

        for (name, mut env) in file.environments {
            env.name.clone_from(&name);
            let _ = config.environments.insert(name, env);
        }
        if let Some(timeouts) = file.timeouts {
            config.timeouts.merge(timeouts);
        }
        if let Some(default_env) = file.default_env {
            config.default_env = default_env;
        }
        if !config.environments.contains_key(&config.default_env) {
            return Err(config.unknown_env(&config.default_env));
        }
        Ok(config)
    }

    /// Built-ins overlaid with the YAML file at `path`
    pub fn load(path: impl AsRef<Path>) -> SalonResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Environment called `name`, with credential overrides applied
    pub fn environment(&self, name: &str) -> SalonResult<Environment> {
        self.environments
            .get(name)
            .cloned()
            .map(|env| env.with_overrides(|key| std::env::var(key).ok()))
            .ok_or_else(|| self.unknown_env(name))
    }

    /// Resolve the environment: explicit name, then [`ENV_NAME_VAR`], then the file default
    pub fn select(&self, explicit: Option<&str>) -> SalonResult<Environment> {
        let from_var = std::env::var(ENV_NAME_VAR).ok();
        let name = explicit
            .or(from_var.as_deref())
            .unwrap_or(self.default_env.as_str());
        self.environment(name)
    }

    /// Names of all known environments, sorted
    #[must_use]
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    /// Default environment name
    #[must_use]
    pub fn default_env(&self) -> &str {
        &self.default_env
    }

    /// Timeout table
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    fn unknown_env(&self, name: &str) -> SalonError {
        SalonError::config(format!(
            "unknown env '{name}'. Use one of: {}",
            self.environment_names().join(", ")
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    mod environment_tests {
        use super::*;

        #[test]
        fn test_graphql_url() {
            let env = Environment::dev();
            assert_eq!(
                env.graphql_url(),
                "https://api-gateway-dev.phorest.com/api-facade/graphql"
            );
        }

        #[test]
        fn test_rest_url_trims_trailing_slash() {
            let mut env = Environment::prod();
            env.api_gateway.push('/');
            assert_eq!(
                env.rest_url("/memento/rest/business"),
                "https://api-gateway-eu.phorest.com/memento/rest/business"
            );
        }

        #[test]
        fn test_security_context() {
            let env = Environment::dev();
            assert_eq!(
                env.security_context(),
                "okZVIi6pKyOe7LwzTTiWwg|ooPWjXsoYnvR1X9k7qmkIg|"
            );
        }

        #[test]
        fn test_overrides() {
            let env = Environment::dev().with_overrides(|key| match key {
                PASSWORD_ENV_VAR => Some("s3cret".to_string()),
                EMAIL_ENV_VAR => Some("owner@example.com".to_string()),
                _ => None,
            });
            assert_eq!(env.staff_password, "s3cret");
            assert_eq!(env.staff_email, "owner@example.com");
        }

        #[test]
        fn test_banner_has_no_password() {
            let env = Environment::dev().with_overrides(|_| Some("hunter2".to_string()));
            assert!(!env.banner().contains("hunter2"));
            assert!(env.banner().starts_with("name=dev"));
        }
    }

    mod timeout_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let t = Timeouts::default();
            assert_eq!(t.ms("ELEMENT_VISIBLE"), 10_000);
            assert_eq!(t.ms("NAVIGATION"), 15_000);
            assert_eq!(t.get("VERY_LONG"), Duration::from_secs(60));
        }

        #[test]
        fn test_unknown_falls_back_to_default() {
            let mut t = Timeouts::default();
            assert_eq!(t.ms("NOPE"), 10_000);
            t.set("DEFAULT", 7_000);
            assert_eq!(t.ms("NOPE"), 7_000);
        }
    }

    mod suite_config_tests {
        use super::*;

        #[test]
        fn test_builtin_names() {
            let config = SuiteConfig::builtin();
            assert_eq!(config.environment_names(), vec!["dev", "prod"]);
            assert_eq!(config.default_env(), "dev");
        }

        #[test]
        fn test_unknown_env_lists_known() {
            let err = SuiteConfig::builtin().environment("qa").unwrap_err();
            assert_eq!(
                err.to_string(),
                "Configuration error: unknown env 'qa'. Use one of: dev, prod"
            );
        }

        #[test]
        fn test_yaml_overlay() {
            let yaml = r"
default_env: staging
environments:
  staging:
    base_url: https://my-staging.example.com
    app_origin: https://app-staging.example.com
    api_gateway: https://gw-staging.example.com
    business_id: biz
    branch_id: br
    headed: false
timeouts:
  ELEMENT_VISIBLE: 15000
";
            let config = SuiteConfig::from_yaml_str(yaml).unwrap();
            assert_eq!(config.environment_names(), vec!["dev", "prod", "staging"]);
            let env = config.environment("staging").unwrap();
            assert_eq!(env.name, "staging");
            assert_eq!(env.base_url, "https://my-staging.example.com");
            assert_eq!(config.timeouts().ms("ELEMENT_VISIBLE"), 15_000);
            assert_eq!(config.timeouts().ms("SHORT"), 5_000);
            assert_eq!(config.default_env(), "staging");
        }

        #[test]
        fn test_yaml_unknown_default_rejected() {
            let err = SuiteConfig::from_yaml_str("default_env: nowhere\n").unwrap_err();
            assert!(matches!(err, SalonError::Config { .. }));
        }

        #[test]
        fn test_malformed_yaml() {
            let err = SuiteConfig::from_yaml_str("environments: [1, 2").unwrap_err();
            assert!(matches!(err, SalonError::Yaml(_)));
        }

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "timeouts:\n  SHORT: 1234").unwrap();
            let config = SuiteConfig::load(file.path()).unwrap();
            assert_eq!(config.timeouts().ms("SHORT"), 1234);
        }

        #[test]
        fn test_select_explicit_wins() {
            let env = SuiteConfig::builtin().select(Some("prod")).unwrap();
            assert_eq!(env.name, "prod");
        }
    }
}
