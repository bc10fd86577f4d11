//! Jira Cloud REST API v3 client and story-point aggregation.
//!
//! This crate is the shared substrate for thin presentation surfaces (CLI,
//! MCP tool server, dashboard):
//! - [`JiraClient`]: typed operations over the REST API — identity check,
//!   issue fetch, JQL search, issue creation, assignment, field updates,
//!   workflow transitions, user and custom-field resolution
//! - [`aggregate`]: per-assignee story-point rollups over a paginated JQL
//!   search
//!
//! The library never prints or renders errors; every failure surfaces as a
//! structured [`Error`] for the calling surface to present.
//!
//! # Example
//!
//! ```no_run
//! use jira::{JiraClient, aggregate};
//!
//! # async fn example() -> jira::Result<()> {
//! let client = JiraClient::from_env()?;
//!
//! let me = client.get_myself().await?;
//!
//! let report = aggregate::story_points_by_sprint(&client, "45", Some("PROJ"), 1000).await?;
//! for member in &report.members {
//!     println!("{}: {}", member.account_id, member.totals.story_points);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `JIRA_BASE_URL`: Jira instance URL (e.g., `https://your-domain.atlassian.net`)
//! - `JIRA_EMAIL`: User email for authentication
//! - `JIRA_API_TOKEN`: Jira API token
//! - `JIRA_DEFAULT_PROJECT`: Default project key (optional)
//! - `JIRA_STORY_POINTS_FIELD_ID`: Story-points custom field id (optional,
//!   skips catalog discovery)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use aggregate::{story_points_by_jql, story_points_by_sprint, StoryPointReport};
pub use client::JiraClient;
pub use config::JiraConfig;
pub use error::{Error, Result};
pub use models::{Issue, NewIssue, SearchPage, User};
