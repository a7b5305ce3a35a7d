pub mod client;
pub mod mock;
pub mod types;

use serde_json::Value;

use crate::error::Result;
use crate::jira::types::{
  CreatedIssue, EditMeta, NewIssue, RemoteComment, RemoteIssue, RemoteProject, RemoteUser,
};

pub use client::JiraClient;
pub use mock::MockTracker;

/// Fields requested by a shallow sweep.
pub const SHALLOW_FIELDS: &[&str] = &["status", "assignee", "resolution"];

/// Fields requested when an issue is mirrored in full.
pub const FULL_FIELDS: &[&str] = &[
  "summary",
  "description",
  "status",
  "resolution",
  "assignee",
  "priority",
  "issuetype",
  "duedate",
  "parent",
  "project",
  "comment",
  "timetracking",
];

/// Operations the sync layer needs from the issue tracker.
///
/// Every call is awaited before the next one is issued; failures are returned
/// as-is and abort the calling action.
#[allow(async_fn_in_trait)]
pub trait Tracker {
  async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue>;

  /// `PUT /issue/{key}` with a partial `fields` object.
  async fn update_fields(&self, key: &str, fields: Value) -> Result<()>;

  async fn update_summary_description(
    &self,
    key: &str,
    summary: &str,
    description: &str,
  ) -> Result<()> {
    self
      .update_fields(
        key,
        serde_json::json!({ "summary": summary, "description": description }),
      )
      .await
  }

  async fn set_issue_type(&self, key: &str, issue_type: &str) -> Result<()> {
    self
      .update_fields(key, serde_json::json!({ "issuetype": { "name": issue_type } }))
      .await
  }

  async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RemoteIssue>;

  /// JQL search. `limit` caps the number of issues returned, otherwise every
  /// page is fetched.
  async fn search(&self, jql: &str, fields: &[&str], limit: Option<usize>)
    -> Result<Vec<RemoteIssue>>;

  async fn get_project(&self, key: &str) -> Result<RemoteProject>;

  async fn add_comment(&self, key: &str, body: &str) -> Result<RemoteComment>;

  async fn get_comment(&self, key: &str, comment_id: &str) -> Result<RemoteComment>;

  async fn edit_comment(&self, key: &str, comment_id: &str, body: &str)
    -> Result<RemoteComment>;

  async fn delete_comment(&self, key: &str, comment_id: &str) -> Result<()>;

  async fn edit_meta(&self, key: &str) -> Result<EditMeta>;

  async fn myself(&self) -> Result<RemoteUser>;
}
