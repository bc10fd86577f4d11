//! Wire types for the Jira Cloud REST API v3.
//!
//! Only the fields this crate interprets are modeled explicitly; everything
//! else an issue carries (status, duedate, tenant custom fields) lands in the
//! flattened [`IssueFields::custom`] map and passes through untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

/// A Jira user, as returned by `/myself`, `/user/search`, and issue
/// assignee fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque stable identifier, distinct from email and display name.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// An issue as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    /// Project-scoped key, e.g. `PROJ-123`.
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// Issue fields requested by this crate, plus a passthrough map for the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub assignee: Option<User>,
    /// Everything else, keyed by field id (e.g. `customfield_10016`).
    #[serde(flatten)]
    pub custom: HashMap<String, Value>,
}

impl IssueFields {
    /// The story-point estimate under `field_id`, if it is a genuine JSON
    /// number. Strings, booleans, and null all mean "unestimated".
    #[must_use]
    pub fn estimate(&self, field_id: &str) -> Option<&Number> {
        match self.custom.get(field_id) {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }
    }
}

/// One page of a JQL search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub start_at: Option<u64>,
    #[serde(default)]
    pub max_results: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Response of `GET /issue/{key}/transitions`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionsPage {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// A workflow transition currently available on an issue.
#[derive(Debug, Clone, Deserialize)]
pub struct Transition {
    pub id: String,
    /// Destination status. Jira omits it for some screen-less transitions.
    #[serde(default)]
    pub to: Option<TransitionTo>,
}

/// Destination status of a transition.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionTo {
    #[serde(default)]
    pub name: Option<String>,
}

impl Transition {
    /// Destination status name, or `"Unknown"` when Jira omitted it.
    #[must_use]
    pub fn to_name(&self) -> &str {
        self.to
            .as_ref()
            .and_then(|to| to.name.as_deref())
            .unwrap_or("Unknown")
    }
}

/// An entry in the tenant field catalog (`GET /field`).
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of `POST /issue`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

/// Parameters for creating an issue.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub project_key: String,
    pub summary: String,
    /// Issue type name, defaults to `"Task"`.
    pub issue_type: String,
    /// Plain-text description, rendered as a single ADF paragraph.
    pub description: Option<String>,
    /// Resolved to an account id via user search before submission.
    pub assignee_email: Option<String>,
    pub story_points: Option<f64>,
    pub priority: Option<String>,
}

impl NewIssue {
    /// Create parameters for a `Task` with no optional fields set.
    #[must_use]
    pub fn new(project_key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            summary: summary.into(),
            issue_type: "Task".to_string(),
            description: None,
            assignee_email: None,
            story_points: None,
            priority: None,
        }
    }
}

/// Wrap plain text in the Atlassian Document Format shape Jira Cloud expects
/// for description fields: one document, one paragraph, one text run.
#[must_use]
pub fn adf_paragraph(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [
            {
                "type": "paragraph",
                "content": [
                    {
                        "type": "text",
                        "text": text,
                    }
                ],
            }
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adf_paragraph_shape() {
        let doc = adf_paragraph("Fix bug");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["content"][0]["type"], "paragraph");
        assert_eq!(doc["content"][0]["content"][0]["type"], "text");
        assert_eq!(doc["content"][0]["content"][0]["text"], "Fix bug");
        // Exactly one paragraph with exactly one text run
        assert_eq!(doc["content"].as_array().unwrap().len(), 1);
        assert_eq!(
            doc["content"][0]["content"].as_array().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_estimate_accepts_only_numbers() {
        let fields: IssueFields = serde_json::from_value(json!({
            "summary": "Numeric",
            "customfield_10016": 5,
        }))
        .unwrap();
        assert_eq!(
            fields.estimate("customfield_10016").and_then(Number::as_f64),
            Some(5.0)
        );

        let string_valued: IssueFields = serde_json::from_value(json!({
            "customfield_10016": "5",
        }))
        .unwrap();
        assert!(string_valued.estimate("customfield_10016").is_none());

        let null_valued: IssueFields = serde_json::from_value(json!({
            "customfield_10016": null,
        }))
        .unwrap();
        assert!(null_valued.estimate("customfield_10016").is_none());

        let absent = IssueFields::default();
        assert!(absent.estimate("customfield_10016").is_none());
    }

    #[test]
    fn test_estimate_preserves_integer_representation() {
        let fields: IssueFields = serde_json::from_value(json!({
            "customfield_10016": 3,
        }))
        .unwrap();
        let n = fields.estimate("customfield_10016").unwrap();
        assert!(n.is_u64());
        assert_eq!(n.to_string(), "3");
    }

    #[test]
    fn test_search_page_tolerates_missing_fields() {
        let page: SearchPage = serde_json::from_value(json!({
            "issues": [{"key": "PROJ-1"}],
        }))
        .unwrap();
        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.issues[0].key, "PROJ-1");
        assert!(page.total.is_none());
    }

    #[test]
    fn test_transition_to_name_fallback() {
        let t: Transition = serde_json::from_value(json!({"id": "31"})).unwrap();
        assert_eq!(t.to_name(), "Unknown");

        let t: Transition =
            serde_json::from_value(json!({"id": "31", "to": {"name": "Done"}})).unwrap();
        assert_eq!(t.to_name(), "Done");
    }
}
