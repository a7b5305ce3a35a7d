use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EjiraError, Result};
use crate::jira::types::{
    CreatedIssue, EditMeta, NewIssue, RemoteComment, RemoteIssue, RemoteProject, RemoteUser,
    SearchResponse,
};
use crate::jira::Tracker;

const PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    api_root: String,
    user: String,
    token: String,
}

impl JiraClient {
    pub fn new(config: &Config) -> Result<Self> {
        let token = std::env::var(&config.jira.token_env)
            .map_err(|_| EjiraError::Config(format!("{} not set", config.jira.token_env)))?;
        Ok(Self::with_credentials(
            config.api_root(),
            &config.jira.user,
            &token,
        ))
    }

    pub fn with_credentials(api_root: impl Into<String>, user: &str, token: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            user: user.to_string(),
            token: token.to_string(),
        }
    }

    /// Authenticated REST call relative to the API root. Returns `None` for
    /// empty responses (204 and friends).
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = format!("{}{}", self.api_root, path);
        debug!("{method} {url}");

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(EjiraError::Jira {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let value = self
            .call(method, path, body)
            .await?
            .ok_or_else(|| EjiraError::EmptyResponse(path.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Joins `errorMessages` and `errors` from a JIRA error body, falling back to
/// the raw text.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let mut parts: Vec<String> = value["errorMessages"]
        .as_array()
        .map(|msgs| {
            msgs.iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    if let Some(errors) = value["errors"].as_object() {
        for (field, msg) in errors {
            parts.push(format!("{field}: {}", msg.as_str().unwrap_or_default()));
        }
    }

    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}

impl Tracker for JiraClient {
    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue> {
        info!(
            "creating {} in {}: {}",
            issue.issue_type, issue.project, issue.summary
        );
        let body = serde_json::json!({ "fields": issue.to_fields() });
        let created: CreatedIssue = self.call_json(Method::POST, "/issue", Some(&body)).await?;
        info!("created {}", created.key);
        Ok(created)
    }

    async fn update_fields(&self, key: &str, fields: Value) -> Result<()> {
        info!("updating {key}");
        let body = serde_json::json!({ "fields": fields });
        self.call(Method::PUT, &format!("/issue/{key}"), Some(&body))
            .await?;
        Ok(())
    }

    async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RemoteIssue> {
        info!("fetching {key}");
        let path = format!("/issue/{key}?fields={}", fields.join(","));
        self.call_json(Method::GET, &path, None).await
    }

    async fn search(
        &self,
        jql: &str,
        fields: &[&str],
        limit: Option<usize>,
    ) -> Result<Vec<RemoteIssue>> {
        info!("searching: {jql}");
        let mut issues = Vec::new();

        loop {
            let page_size = limit
                .map(|l| l.saturating_sub(issues.len()).min(PAGE_SIZE))
                .unwrap_or(PAGE_SIZE);
            if page_size == 0 {
                break;
            }

            let body = serde_json::json!({
                "jql": jql,
                "startAt": issues.len(),
                "maxResults": page_size,
                "fields": fields,
                "validateQuery": "warn",
            });
            let page: SearchResponse = self.call_json(Method::POST, "/search", Some(&body)).await?;
            let received = page.issues.len();
            issues.extend(page.issues);

            if received == 0 || issues.len() >= page.total {
                break;
            }
        }

        info!("found {} issues", issues.len());
        Ok(issues)
    }

    async fn get_project(&self, key: &str) -> Result<RemoteProject> {
        info!("fetching project {key}");
        self.call_json(Method::GET, &format!("/project/{key}"), None)
            .await
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<RemoteComment> {
        info!("adding comment to {key}");
        let payload = serde_json::json!({ "body": body });
        self.call_json(Method::POST, &format!("/issue/{key}/comment"), Some(&payload))
            .await
    }

    async fn get_comment(&self, key: &str, comment_id: &str) -> Result<RemoteComment> {
        self.call_json(
            Method::GET,
            &format!("/issue/{key}/comment/{comment_id}"),
            None,
        )
        .await
    }

    async fn edit_comment(
        &self,
        key: &str,
        comment_id: &str,
        body: &str,
    ) -> Result<RemoteComment> {
        info!("editing comment {comment_id} on {key}");
        let payload = serde_json::json!({ "body": body });
        self.call_json(
            Method::PUT,
            &format!("/issue/{key}/comment/{comment_id}"),
            Some(&payload),
        )
        .await
    }

    async fn delete_comment(&self, key: &str, comment_id: &str) -> Result<()> {
        info!("deleting comment {comment_id} on {key}");
        self.call(
            Method::DELETE,
            &format!("/issue/{key}/comment/{comment_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn edit_meta(&self, key: &str) -> Result<EditMeta> {
        self.call_json(Method::GET, &format!("/issue/{key}/editmeta"), None)
            .await
    }

    async fn myself(&self) -> Result<RemoteUser> {
        self.call_json(Method::GET, "/myself", None).await
    }
}
