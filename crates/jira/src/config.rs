//! Environment-sourced configuration for the Jira client.

use std::env;

use crate::error::{Error, Result};

/// Names of the environment variables that must be present.
const REQUIRED_VARS: [&str; 3] = ["JIRA_BASE_URL", "JIRA_EMAIL", "JIRA_API_TOKEN"];

/// Jira connection settings. Immutable after load.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Jira Cloud base URL without a trailing slash,
    /// e.g. `https://your-domain.atlassian.net`.
    pub base_url: String,
    /// Account email used for basic auth.
    pub email: String,
    /// API token used for basic auth.
    pub api_token: String,
    /// Project key used when a surface does not supply one.
    pub default_project: Option<String>,
    /// Custom field id for story points (e.g. `customfield_10016`).
    /// When set, catalog discovery is skipped.
    pub story_points_field_id: Option<String>,
}

impl JiraConfig {
    /// Load configuration from the environment, with `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] naming every required variable that
    /// is unset or blank.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let base_url = read_var("JIRA_BASE_URL");
        let email = read_var("JIRA_EMAIL");
        let api_token = read_var("JIRA_API_TOKEN");

        let values = [&base_url, &email, &api_token];
        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .zip(values)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::ConfigMissing { keys: missing });
        }

        Ok(Self {
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            email: email.unwrap_or_default(),
            api_token: api_token.unwrap_or_default(),
            default_project: read_var("JIRA_DEFAULT_PROJECT"),
            story_points_field_id: read_var("JIRA_STORY_POINTS_FIELD_ID"),
        })
    }
}

/// Read an environment variable, treating blank values as unset.
fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
