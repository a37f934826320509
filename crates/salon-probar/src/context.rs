//! Run Context
//!
//! Per-run value carrying the selected environment, the bearer token and the
//! application instance id. Every gateway call receives it explicitly.

use crate::config::{Environment, Timeouts};
use uuid::Uuid;

/// Application id sent with every gateway request
pub const APPLICATION_ID: &str = "my-phorest";

/// Characters of the token shown in logs
const TOKEN_PREVIEW_CHARS: usize = 12;

/// Environment, credentials and identity for one run
#[derive(Clone)]
pub struct RunContext {
    env: Environment,
    token: String,
    instance_id: String,
    timeouts: Timeouts,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("env", &self.env.name)
            .field("token", &self.token_preview())
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Create a context with a fresh random instance id
    pub fn new(env: Environment, token: impl Into<String>) -> Self {
        Self {
            env,
            token: token.into(),
            instance_id: Uuid::new_v4().to_string(),
            timeouts: Timeouts::default(),
        }
    }

    /// Use a fixed instance id (e.g. `freeze-client-membership-script`)
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Use a custom timeout table
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Selected environment
    #[must_use]
    pub const fn env(&self) -> &Environment {
        &self.env
    }

    /// Bearer token
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Application instance id
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Timeout table
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Token prefix safe to log
    #[must_use]
    pub fn token_preview(&self) -> String {
        let prefix: String = self.token.chars().take(TOKEN_PREVIEW_CHARS).collect();
        format!("{prefix}...")
    }

    /// Header set for GraphQL calls
    #[must_use]
    pub fn graphql_headers(&self) -> Vec<(&'static str, String)> {
        let origin = self.env.app_origin.trim_end_matches('/');
        vec![
            ("Authorization", format!("Bearer {}", self.token)),
            ("Content-Type", "application/json".to_string()),
            ("x-memento-security-context", self.env.security_context()),
            ("x-phorest-application-id", APPLICATION_ID.to_string()),
            (
                "x-phorest-application-instance-id",
                self.instance_id.clone(),
            ),
            ("apollographql-client-name", APPLICATION_ID.to_string()),
            ("Origin", origin.to_string()),
            ("Referer", format!("{origin}/")),
        ]
    }

    /// Header set for REST calls with a vendor media type; `accept`
    /// defaults to `content_type`
    #[must_use]
    pub fn rest_headers(&self, content_type: &str, accept: Option<&str>) -> Vec<(&'static str, String)> {
        let origin = self.env.app_origin.trim_end_matches('/');
        vec![
            ("Authorization", format!("Bearer {}", self.token)),
            ("Content-Type", content_type.to_string()),
            ("Accept", accept.unwrap_or(content_type).to_string()),
            ("Origin", origin.to_string()),
            ("Referer", format!("{origin}/")),
        ]
    }
}
