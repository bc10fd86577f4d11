//! HTTP client for the Jira Cloud REST API v3.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::config::JiraConfig;
use crate::error::{Error, Result};
use crate::models::{
    adf_paragraph, CreatedIssue, Field, NewIssue, SearchPage, TransitionsPage, User,
};

/// Fixed timeout applied uniformly to every outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for a single Jira Cloud tenant.
///
/// Operations map one-to-one onto REST endpoints; any response with a status
/// of 400 or above becomes [`Error::RequestFailed`] carrying the status and
/// raw body. Nothing is retried and nothing is logged above `debug`.
#[derive(Debug)]
pub struct JiraClient {
    http: reqwest::Client,
    config: JiraConfig,
    /// Outcome of story-points field discovery, memoized for the lifetime of
    /// this client. `Some(None)` records a completed attempt that found
    /// nothing, so a fruitless catalog scan is not repeated.
    story_points_field: OnceCell<Option<String>>,
}

impl JiraClient {
    /// Create a client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: JiraConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            config,
            story_points_field: OnceCell::new(),
        })
    }

    /// Create a client from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if required variables are absent.
    pub fn from_env() -> Result<Self> {
        Self::new(JiraConfig::from_env()?)
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Attach credentials, send, and normalize non-success statuses.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RequestFailed { status, body });
        }
        Ok(response)
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Fetch the profile of the authenticated user.
    #[instrument(skip(self))]
    pub async fn get_myself(&self) -> Result<User> {
        let response = self.send(self.http.get(self.url("/rest/api/3/myself"))).await?;
        Ok(response.json().await?)
    }

    // =========================================================================
    // Issue Operations
    // =========================================================================

    /// Fetch an issue with rendered fields, as raw JSON for passthrough to a
    /// presentation surface.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn get_issue(&self, issue_key: &str) -> Result<Value> {
        let response = self
            .send(
                self.http
                    .get(self.url(&format!("/rest/api/3/issue/{issue_key}")))
                    .query(&[("expand", "renderedFields")]),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Run a JQL search returning a single page of issues.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        jql: &str,
        max_results: usize,
        start_at: usize,
        fields: Option<&str>,
    ) -> Result<SearchPage> {
        let mut params = vec![
            ("jql", jql.to_string()),
            ("maxResults", max_results.to_string()),
            ("startAt", start_at.to_string()),
        ];
        if let Some(fields) = fields {
            params.push(("fields", fields.to_string()));
        }

        let response = self
            .send(
                self.http
                    .get(self.url("/rest/api/3/search/jql"))
                    .query(&params),
            )
            .await?;
        let page: SearchPage = response.json().await?;
        debug!(issues = page.issues.len(), "search page received");
        Ok(page)
    }

    /// List tasks in a project, newest first, optionally filtered by status.
    pub async fn list_tasks(
        &self,
        project_key: &str,
        status: Option<&str>,
        limit: usize,
        start_at: usize,
    ) -> Result<SearchPage> {
        let jql = build_list_tasks_jql(project_key, status);
        self.search(&jql, limit, start_at, Some("summary,status,assignee,duedate"))
            .await
    }

    /// Create an issue.
    ///
    /// The description, if any, is wrapped in a single-paragraph ADF
    /// document. An assignee email is resolved to an account id first;
    /// story points go through field-id resolution.
    #[instrument(skip(self, new_issue), fields(project = %new_issue.project_key))]
    pub async fn create_issue(&self, new_issue: &NewIssue) -> Result<CreatedIssue> {
        let mut fields = serde_json::Map::new();
        fields.insert("project".to_string(), json!({"key": new_issue.project_key}));
        fields.insert("summary".to_string(), json!(new_issue.summary));
        fields.insert("issuetype".to_string(), json!({"name": new_issue.issue_type}));

        if let Some(description) = &new_issue.description {
            fields.insert("description".to_string(), adf_paragraph(description));
        }

        if let Some(email) = &new_issue.assignee_email {
            let account_id = self
                .find_account_id(email)
                .await?
                .ok_or_else(|| Error::UserNotFound {
                    query: email.clone(),
                })?;
            fields.insert("assignee".to_string(), json!({"accountId": account_id}));
        }

        if let Some(points) = new_issue.story_points {
            let field_id = self.story_points_field_id().await?;
            fields.insert(field_id, json!(points));
        }

        if let Some(priority) = &new_issue.priority {
            fields.insert("priority".to_string(), json!({"name": priority}));
        }

        let response = self
            .send(
                self.http
                    .post(self.url("/rest/api/3/issue"))
                    .json(&json!({ "fields": fields })),
            )
            .await?;
        let created: CreatedIssue = response.json().await?;
        debug!(key = %created.key, "issue created");
        Ok(created)
    }

    /// Assign an issue to the user matching `email`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank email, [`Error::UserNotFound`] when
    /// the search yields no match.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn assign_issue(&self, issue_key: &str, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(Error::Validation(
                "an email must be provided to assign an issue".to_string(),
            ));
        }

        let account_id = self
            .find_account_id(email)
            .await?
            .ok_or_else(|| Error::UserNotFound {
                query: email.to_string(),
            })?;

        self.send(
            self.http
                .put(self.url(&format!("/rest/api/3/issue/{issue_key}/assignee")))
                .json(&json!({ "accountId": account_id })),
        )
        .await?;
        Ok(())
    }

    /// Set the story-point estimate on an issue.
    pub async fn set_story_points(&self, issue_key: &str, story_points: f64) -> Result<()> {
        let field_id = self.story_points_field_id().await?;
        let mut fields = serde_json::Map::new();
        fields.insert(field_id, json!(story_points));
        self.update_issue_fields(issue_key, Value::Object(fields))
            .await
    }

    /// Set the priority on an issue.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a blank priority name.
    pub async fn set_priority(&self, issue_key: &str, priority: &str) -> Result<()> {
        if priority.trim().is_empty() {
            return Err(Error::Validation("priority is required".to_string()));
        }
        self.update_issue_fields(issue_key, json!({ "priority": { "name": priority } }))
            .await
    }

    /// Move an issue to the desired workflow status.
    ///
    /// Selects the first available transition whose destination name matches
    /// `target_status` case-insensitively (both sides trimmed).
    ///
    /// # Errors
    ///
    /// [`Error::NoMatchingTransition`] listing the available destinations
    /// when none match.
    #[instrument(skip(self), fields(issue_key = %issue_key, target = %target_status))]
    pub async fn transition_issue(&self, issue_key: &str, target_status: &str) -> Result<Value> {
        if issue_key.trim().is_empty() {
            return Err(Error::Validation("issue_key is required".to_string()));
        }
        if target_status.trim().is_empty() {
            return Err(Error::Validation("target_status is required".to_string()));
        }

        let path = format!("/rest/api/3/issue/{issue_key}/transitions");
        let page: TransitionsPage = self
            .send(self.http.get(self.url(&path)))
            .await?
            .json()
            .await?;

        let target = target_status.trim().to_lowercase();
        let chosen = page.transitions.iter().find(|transition| {
            transition
                .to
                .as_ref()
                .and_then(|to| to.name.as_deref())
                .is_some_and(|name| name.trim().to_lowercase() == target)
        });

        let Some(chosen) = chosen else {
            let available = page
                .transitions
                .iter()
                .map(crate::models::Transition::to_name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::NoMatchingTransition {
                issue_key: issue_key.to_string(),
                target: target_status.to_string(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available
                },
            });
        };

        debug!(transition_id = %chosen.id, "applying transition");
        let response = self
            .send(
                self.http
                    .post(self.url(&path))
                    .json(&json!({ "transition": { "id": chosen.id } })),
            )
            .await?;

        // Jira answers 204 with an empty body on success
        let text = response.text().await?;
        if text.is_empty() {
            Ok(json!({ "status": "ok" }))
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    // =========================================================================
    // User and Field Resolution
    // =========================================================================

    /// Resolve a free-text query (typically an email) to an account id.
    ///
    /// Returns `Ok(None)` when the search matches nobody; callers decide
    /// whether that is an error.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn find_account_id(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .send(
                self.http
                    .get(self.url("/rest/api/3/user/search"))
                    .query(&[("query", query), ("maxResults", "2")]),
            )
            .await?;
        let users: Vec<User> = response.json().await?;
        Ok(users.into_iter().next().and_then(|user| user.account_id))
    }

    /// The story-points custom field id, from configuration or discovered
    /// from the tenant field catalog.
    ///
    /// Discovery runs at most once per client instance; a completed attempt
    /// that found nothing is not repeated. A transport or HTTP failure during
    /// discovery leaves the memo unset so a later call can try again.
    ///
    /// # Errors
    ///
    /// [`Error::FieldNotFound`] when nothing is configured and the catalog
    /// has no field whose name contains "story point".
    pub async fn story_points_field_id(&self) -> Result<String> {
        if let Some(id) = &self.config.story_points_field_id {
            return Ok(id.clone());
        }

        let discovered = self
            .story_points_field
            .get_or_try_init(|| self.discover_story_points_field())
            .await?;
        discovered.clone().ok_or(Error::FieldNotFound)
    }

    /// Scan the field catalog for the first field named like "story point".
    async fn discover_story_points_field(&self) -> Result<Option<String>> {
        let response = self.send(self.http.get(self.url("/rest/api/3/field"))).await?;
        let fields: Vec<Field> = response.json().await?;

        let id = fields
            .iter()
            .find(|field| {
                field
                    .name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains("story point"))
            })
            .and_then(|field| field.id.clone());
        debug!(?id, "story points field discovery finished");
        Ok(id)
    }

    async fn update_issue_fields(&self, issue_key: &str, fields: Value) -> Result<()> {
        self.send(
            self.http
                .put(self.url(&format!("/rest/api/3/issue/{issue_key}")))
                .json(&json!({ "fields": fields })),
        )
        .await?;
        Ok(())
    }
}

/// Build the JQL used by [`JiraClient::list_tasks`].
fn build_list_tasks_jql(project_key: &str, status: Option<&str>) -> String {
    let mut parts = vec![format!("project = \"{project_key}\"")];
    if let Some(status) = status {
        parts.push(format!("status = \"{status}\""));
    }
    format!("{} ORDER BY created DESC", parts.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JiraConfig {
        JiraConfig {
            base_url: "https://example.atlassian.net".to_string(),
            email: "dev@example.com".to_string(),
            api_token: "token".to_string(),
            default_project: None,
            story_points_field_id: None,
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(JiraClient::new(test_config()).is_ok());
    }

    #[test]
    fn test_list_tasks_jql_without_status() {
        assert_eq!(
            build_list_tasks_jql("PROJ", None),
            "project = \"PROJ\" ORDER BY created DESC"
        );
    }

    #[test]
    fn test_list_tasks_jql_with_status() {
        assert_eq!(
            build_list_tasks_jql("PROJ", Some("In Progress")),
            "project = \"PROJ\" AND status = \"In Progress\" ORDER BY created DESC"
        );
    }

    #[tokio::test]
    async fn test_configured_field_id_skips_discovery() {
        let mut config = test_config();
        config.story_points_field_id = Some("customfield_10016".to_string());
        // base_url points nowhere routable; a catalog request would fail
        let client = JiraClient::new(config).unwrap();
        let id = client.story_points_field_id().await.unwrap();
        assert_eq!(id, "customfield_10016");
    }
}
