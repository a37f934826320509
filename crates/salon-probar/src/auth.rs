//! Access tokens
//!
//! A run obtains its bearer token either from the token endpoint with the
//! staff credentials, or from the local storage of a logged-in page.

use crate::driver::PageDriver;
use crate::result::{SalonError, SalonResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Local storage key holding the staff app's token
pub const LOCAL_STORAGE_KEY: &str = "access-token";

/// Characters of the token shown in debug logs
const LOG_PREVIEW_CHARS: usize = 60;

/// Body of the token endpoint request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenRequest<'a> {
    /// Always `basic`
    pub grant_type: &'static str,
    /// Always `user`
    pub client_type: &'static str,
    /// Staff e-mail
    pub username: &'a str,
    /// Staff password
    pub password: &'a str,
}

impl<'a> TokenRequest<'a> {
    /// Password grant for a staff user
    #[must_use]
    pub const fn staff(username: &'a str, password: &'a str) -> Self {
        Self {
            grant_type: "basic",
            client_type: "user",
            username,
            password,
        }
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token
    pub access_token: String,
}

/// Read the token the staff app stored after login.
///
/// # Errors
///
/// - driver errors, unchanged
/// - [`SalonError::MissingField`] when no non-empty token is stored
pub async fn token_from_local_storage<D>(driver: &mut D) -> SalonResult<String>
where
    D: PageDriver + ?Sized,
{
    let script = format!("localStorage.getItem('{LOCAL_STORAGE_KEY}')");
    match driver.evaluate(&script).await? {
        Value::String(token) if !token.is_empty() => {
            let preview: String = token.chars().take(LOG_PREVIEW_CHARS).collect();
            debug!(token = %preview, "access token read from localStorage");
            Ok(token)
        }
        _ => Err(SalonError::missing_field("localStorage", LOCAL_STORAGE_KEY)),
    }
}

#[cfg(feature = "http")]
pub use http::fetch_token;

#[cfg(feature = "http")]
mod http {
    use super::{TokenRequest, TokenResponse};
    use crate::config::{Environment, PASSWORD_ENV_VAR};
    use crate::result::{SalonError, SalonResult};
    use tracing::info;

    const OPERATION: &str = "token";

    /// Exchange the environment's staff credentials for a token.
    ///
    /// # Errors
    ///
    /// - [`SalonError::Config`] when `token_url` or credentials are missing
    /// - [`SalonError::Transport`] / [`SalonError::Http`] on gateway failure
    /// - [`SalonError::MissingField`] when the response has no `access_token`
    pub async fn fetch_token(client: &reqwest::Client, env: &Environment) -> SalonResult<String> {
        let url = env
            .token_url
            .as_deref()
            .ok_or_else(|| SalonError::config(format!("environment '{}' has no token_url", env.name)))?;
        if env.staff_email.is_empty() || env.staff_password.is_empty() {
            return Err(SalonError::config(format!(
                "staff credentials missing for '{}'; set staff_email and {PASSWORD_ENV_VAR}",
                env.name
            )));
        }

        let transport = |e: reqwest::Error| SalonError::Transport {
            operation: OPERATION.to_string(),
            message: e.to_string(),
        };

        let response = client
            .post(url)
            .json(&TokenRequest::staff(&env.staff_email, &env.staff_password))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SalonError::http(OPERATION, status.as_u16(), &body));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SalonError::missing_field(OPERATION, format!("access_token ({e})")))?;
        info!(env = %env.name, "access token issued");
        Ok(body.access_token)
    }
}
