use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// Fields requested from the search endpoint for every issue.
pub const SEARCH_FIELDS: &[&str] = &["id", "priority", "summary", "progress", "status", "issuetype"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueType {
    pub id: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub issue_type: Option<IssueType>,
}

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("jira request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("jira returned HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode jira response: {source}; body: {body}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },
    #[error("invalid jira base url '{0}'")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub http: Client,
    metrics: Arc<Metrics>,
}

impl JiraClient {
    #[cfg(test)]
    pub(crate) fn new(base_url: String, username: String, api_token: String) -> Result<Self, JiraError> {
        Self::new_with_metrics(base_url, username, api_token, None, Arc::new(Metrics::new()))
    }

    pub fn new_with_metrics(
        base_url: String,
        username: String,
        api_token: String,
        timeout: Option<Duration>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, JiraError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let normalized_base_url = normalize_base_url(&base_url)?;
        Ok(Self {
            base_url: normalized_base_url,
            username,
            api_token,
            http,
            metrics,
        })
    }

    /// Link that opens `key` in the Jira web UI.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    /// Runs a single JQL search page. Results keep the tracker's ordering.
    pub fn search_issues(&self, jql: &str, max_results: usize) -> Result<Vec<Issue>, JiraError> {
        let url = format!("{}/rest/api/3/search/jql", self.base_url);
        let payload = SearchRequest {
            expand: "names",
            fields: SEARCH_FIELDS,
            max_results,
            jql,
        };

        self.metrics.inc_search_request();
        tracing::debug!(%url, max_results, "jira search");
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::warn!(%status, "jira search rejected");
            return Err(JiraError::Http {
                status,
                body: truncate_body(&body),
            });
        }

        let body = response.text()?;
        let payload: SearchResponse = serde_json::from_str(&body).map_err(|source| {
            let short_body = truncate_body(&body);
            tracing::warn!(body = %short_body, "failed decoding jira search response");
            JiraError::Decode {
                source,
                body: short_body,
            }
        })?;

        let issues: Vec<Issue> = payload.issues.into_iter().map(Issue::from).collect();
        tracing::debug!(count = issues.len(), "jira search returned issues");
        Ok(issues)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, JiraError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JiraError::InvalidBaseUrl(raw.to_string()));
    }

    let candidate = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed =
        reqwest::Url::parse(&candidate).map_err(|_| JiraError::InvalidBaseUrl(raw.to_string()))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(JiraError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 1000;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    expand: &'static str,
    fields: &'static [&'static str],
    #[serde(rename = "maxResults")]
    max_results: usize,
    jql: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    key: String,
    #[serde(default)]
    fields: SearchFields,
}

#[derive(Debug, Default, Deserialize)]
struct SearchFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    issuetype: Option<IssueTypeObj>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueTypeObj {
    id: Option<String>,
    icon_url: Option<String>,
}

impl From<SearchIssue> for Issue {
    fn from(issue: SearchIssue) -> Self {
        let fields = issue.fields;
        Self {
            key: issue.key,
            summary: fields.summary.unwrap_or_default(),
            issue_type: fields.issuetype.and_then(|t| {
                t.id.map(|id| IssueType {
                    id,
                    icon_url: t.icon_url,
                })
            }),
        }
    }
}
