//! Error types for the Jira client and aggregator.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the Jira client and story-point aggregator.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more required configuration values are absent.
    #[error("missing required environment variables: {}", keys.join(", "))]
    ConfigMissing {
        /// Names of the missing variables.
        keys: Vec<String>,
    },

    /// Jira returned a non-success HTTP status.
    #[error("Jira API request failed ({status}): {body}")]
    RequestFailed {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Raw response body text.
        body: String,
    },

    /// Transport-level failure (connect, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body was not the JSON the endpoint is documented to return.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Caller supplied an empty or missing required argument.
    #[error("{0}")]
    Validation(String),

    /// User search returned no results.
    #[error("could not find a Jira user matching '{query}'")]
    UserNotFound {
        /// The query that matched nothing.
        query: String,
    },

    /// The target status is not reachable from the issue's current status.
    #[error("cannot transition {issue_key} to '{target}'; available: {available}")]
    NoMatchingTransition {
        /// Issue being transitioned.
        issue_key: String,
        /// Requested destination status.
        target: String,
        /// Comma-separated destination names offered by Jira, or "none".
        available: String,
    },

    /// The story-points field id could not be discovered or configured.
    #[error("unable to determine the story points field id; set JIRA_STORY_POINTS_FIELD_ID")]
    FieldNotFound,
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
