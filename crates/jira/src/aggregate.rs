//! Per-assignee story-point rollups over a JQL search.
//!
//! The aggregator drives [`JiraClient::search`] through a strictly sequential
//! pagination loop, classifies each issue by assignee and estimate, and
//! produces a [`StoryPointReport`] whose JSON shape matches what the CLI, MCP,
//! and dashboard surfaces render.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Number;
use tracing::debug;

use crate::client::JiraClient;
use crate::error::{Error, Result};

/// Largest page requested from the search endpoint.
const PAGE_SIZE: usize = 100;

/// An issue's contribution to a rollup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRef {
    pub key: String,
    pub summary: Option<String>,
    /// The estimate exactly as Jira returned it (integer or float), `null`
    /// when unestimated.
    pub story_points: Option<Number>,
}

/// Running totals for one assignee bucket.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollup {
    /// Sum of numeric estimates.
    pub story_points: f64,
    /// Every issue routed to this bucket, estimated or not.
    pub issue_count: u64,
    /// Issues with no numeric estimate.
    pub unestimated_count: u64,
    /// Contributing issues in encounter order.
    pub issues: Vec<IssueRef>,
}

impl Rollup {
    fn add(&mut self, entry: IssueRef) {
        self.issue_count += 1;
        match entry.story_points.as_ref().and_then(Number::as_f64) {
            Some(points) => self.story_points += points,
            None => self.unestimated_count += 1,
        }
        self.issues.push(entry);
    }
}

/// A rollup with the assignee's identity attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRollup {
    pub account_id: String,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    #[serde(flatten)]
    pub totals: Rollup,
}

/// Result of a story-point aggregation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPointReport {
    /// The JQL the scan actually ran.
    pub jql: String,
    /// Every issue scanned, assigned or not.
    pub total_issues: u64,
    /// Sorted descending by point sum; equal sums keep first-seen order.
    pub members: Vec<MemberRollup>,
    /// Present only when the unassigned bucket accumulated anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassigned: Option<Rollup>,
    /// Echo of the sprint identifier, for the sprint entry point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint: Option<String>,
    /// Echo of the project scope, for the sprint entry point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// Aggregate story points per assignee for issues matching `jql`, scanning
/// at most `max_results` issues.
///
/// # Errors
///
/// [`Error::Validation`] for blank JQL; field resolution and search errors
/// propagate unchanged.
pub async fn story_points_by_jql(
    client: &JiraClient,
    jql: &str,
    max_results: usize,
) -> Result<StoryPointReport> {
    if jql.trim().is_empty() {
        return Err(Error::Validation("JQL must be provided".to_string()));
    }

    let field_id = client.story_points_field_id().await?;
    let fields = format!("summary,assignee,{field_id}");

    let mut members: Vec<MemberRollup> = Vec::new();
    let mut member_index: HashMap<String, usize> = HashMap::new();
    let mut unassigned = Rollup::default();
    let mut total_issues: u64 = 0;

    let mut start_at = 0;
    let mut remaining = max_results;
    while remaining > 0 {
        let batch_size = remaining.min(PAGE_SIZE);
        let page = client.search(jql, batch_size, start_at, Some(&fields)).await?;
        let returned = page.issues.len();
        total_issues += returned as u64;
        debug!(start_at, batch_size, returned, "aggregation page scanned");

        for issue in page.issues {
            let entry = IssueRef {
                key: issue.key,
                summary: issue.fields.summary.clone(),
                story_points: issue.fields.estimate(&field_id).cloned(),
            };

            match issue
                .fields
                .assignee
                .as_ref()
                .and_then(|assignee| assignee.account_id.clone())
            {
                Some(account_id) => {
                    let index = *member_index.entry(account_id.clone()).or_insert_with(|| {
                        let assignee = issue.fields.assignee.as_ref();
                        members.push(MemberRollup {
                            account_id,
                            display_name: assignee.and_then(|a| a.display_name.clone()),
                            email_address: assignee.and_then(|a| a.email_address.clone()),
                            totals: Rollup::default(),
                        });
                        members.len() - 1
                    });
                    members[index].totals.add(entry);
                }
                None => unassigned.add(entry),
            }
        }

        // Short page means the result set is exhausted
        if returned < batch_size {
            break;
        }
        start_at += returned;
        remaining = remaining.saturating_sub(returned);
    }

    // sort_by is stable, so equal sums retain discovery order
    members.sort_by(|a, b| {
        b.totals
            .story_points
            .partial_cmp(&a.totals.story_points)
            .unwrap_or(Ordering::Equal)
    });

    Ok(StoryPointReport {
        jql: jql.to_string(),
        total_issues,
        members,
        unassigned: (unassigned.issue_count > 0 || unassigned.story_points != 0.0)
            .then_some(unassigned),
        sprint: None,
        project: None,
    })
}

/// Aggregate story points per assignee for a sprint, optionally scoped to a
/// project.
///
/// `sprint` accepts a numeric sprint id, a full JQL clause such as
/// `sprint in openSprints()`, or a sprint name.
///
/// # Errors
///
/// [`Error::Validation`] for a blank sprint identifier.
pub async fn story_points_by_sprint(
    client: &JiraClient,
    sprint: &str,
    project_key: Option<&str>,
    max_results: usize,
) -> Result<StoryPointReport> {
    let sprint = sprint.trim();
    if sprint.is_empty() {
        return Err(Error::Validation(
            "sprint identifier must be provided".to_string(),
        ));
    }

    let clause = sprint_clause(sprint);
    let jql = match project_key {
        Some(project) => format!("{clause} AND project = \"{project}\""),
        None => clause,
    };

    let mut report = story_points_by_jql(client, &jql, max_results).await?;
    report.sprint = Some(sprint.to_string());
    report.project = project_key.map(str::to_string);
    Ok(report)
}

/// Turn a sprint identifier into a JQL clause.
///
/// Full `sprint =` / `sprint in` clauses pass through verbatim, all-digit
/// input becomes a bare id comparison, anything else a quoted name with
/// embedded quotes escaped.
fn sprint_clause(sprint: &str) -> String {
    let lower = sprint.to_lowercase();
    if lower.starts_with("sprint =") || lower.starts_with("sprint in") {
        sprint.to_string()
    } else if sprint.chars().all(|c| c.is_ascii_digit()) {
        format!("sprint = {sprint}")
    } else {
        format!("sprint = \"{}\"", sprint.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sprint_clause_numeric_id() {
        assert_eq!(sprint_clause("45"), "sprint = 45");
    }

    #[test]
    fn test_sprint_clause_name_is_quoted() {
        assert_eq!(sprint_clause("Sprint 1"), "sprint = \"Sprint 1\"");
    }

    #[test]
    fn test_sprint_clause_full_clause_passes_through() {
        assert_eq!(
            sprint_clause("sprint in openSprints()"),
            "sprint in openSprints()"
        );
        assert_eq!(sprint_clause("Sprint = 7"), "Sprint = 7");
    }

    #[test]
    fn test_sprint_clause_escapes_embedded_quotes() {
        assert_eq!(
            sprint_clause("Sprint \"Q3\""),
            "sprint = \"Sprint \\\"Q3\\\"\""
        );
    }

    #[test]
    fn test_rollup_accumulation() {
        let mut rollup = Rollup::default();
        rollup.add(IssueRef {
            key: "PROJ-1".to_string(),
            summary: Some("Estimated".to_string()),
            story_points: Some(Number::from(5)),
        });
        rollup.add(IssueRef {
            key: "PROJ-2".to_string(),
            summary: Some("Unestimated".to_string()),
            story_points: None,
        });

        assert_eq!(rollup.issue_count, 2);
        assert_eq!(rollup.unestimated_count, 1);
        assert!((rollup.story_points - 5.0).abs() < f64::EPSILON);
        assert_eq!(rollup.issues.len(), 2);
    }

    #[test]
    fn test_report_serializes_camel_case_and_flattens_totals() {
        let report = StoryPointReport {
            jql: "project = PROJ".to_string(),
            total_issues: 1,
            members: vec![MemberRollup {
                account_id: "abc".to_string(),
                display_name: Some("Ada".to_string()),
                email_address: None,
                totals: Rollup {
                    story_points: 3.0,
                    issue_count: 1,
                    unestimated_count: 0,
                    issues: vec![IssueRef {
                        key: "PROJ-1".to_string(),
                        summary: None,
                        story_points: Some(Number::from(3)),
                    }],
                },
            }],
            unassigned: None,
            sprint: None,
            project: None,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["totalIssues"], 1);
        assert_eq!(value["members"][0]["accountId"], "abc");
        assert_eq!(value["members"][0]["storyPoints"], 3.0);
        assert_eq!(value["members"][0]["issueCount"], 1);
        assert_eq!(value["members"][0]["issues"][0]["storyPoints"], json!(3));
        // absent buckets are omitted entirely
        assert!(value.get("unassigned").is_none());
        assert!(value.get("sprint").is_none());
    }
}
