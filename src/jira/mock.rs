//! In-memory tracker used by the test-suite.
//!
//! Supports the JQL subset the sync layer issues: `AND`-joined clauses of
//! `project = X`, `resolution = Unresolved`, `resolution is not EMPTY`,
//! `key in (A, B)`, `issuetype = T` and `issuetype != T`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{EjiraError, Result};
use crate::jira::types::{
  CreatedIssue, EditMeta, IssueFields, Named, NewIssue, RemoteComment, RemoteIssue,
  RemoteProject, RemoteUser,
};
use crate::jira::Tracker;

#[derive(Default)]
struct MockState {
  issues: BTreeMap<String, RemoteIssue>,
  projects: BTreeMap<String, RemoteProject>,
  edit_meta: BTreeMap<String, EditMeta>,
  next_comment_id: u64,
  calls: Vec<String>,
}

pub struct MockTracker {
  me: RemoteUser,
  state: Mutex<MockState>,
}

impl Default for MockTracker {
  fn default() -> Self {
    Self::new("alice")
  }
}

impl MockTracker {
  pub fn new(user: &str) -> Self {
    Self {
      me: RemoteUser {
        name: Some(user.to_string()),
        account_id: None,
        display_name: Some(user.to_string()),
      },
      state: Mutex::new(MockState {
        next_comment_id: 10000,
        ..Default::default()
      }),
    }
  }

  pub fn add_project(&self, key: &str, name: &str) {
    self.lock().projects.insert(
      key.to_string(),
      RemoteProject {
        id: String::new(),
        key: key.to_string(),
        name: name.to_string(),
        description: None,
        lead: None,
      },
    );
  }

  /// Registers an issue with status `To Do`, unresolved.
  pub fn add_issue(&self, key: &str, issue_type: &str, summary: &str) -> RemoteIssue {
    let project = key.rsplit_once('-').map(|(p, _)| p).unwrap_or(key);
    let issue = RemoteIssue {
      id: String::new(),
      key: key.to_string(),
      self_url: String::new(),
      fields: IssueFields {
        summary: Some(summary.to_string()),
        description: Some(String::new()),
        status: Some(Named::new("To Do")),
        issuetype: Some(Named::new(issue_type)),
        project: Some(crate::jira::types::KeyRef {
          key: project.to_string(),
        }),
        comment: Some(Default::default()),
        ..Default::default()
      },
    };
    self.lock().issues.insert(key.to_string(), issue.clone());
    issue
  }

  pub fn upsert_issue(&self, issue: RemoteIssue) {
    self.lock().issues.insert(issue.key.clone(), issue);
  }

  pub fn issue(&self, key: &str) -> Option<RemoteIssue> {
    self.lock().issues.get(key).cloned()
  }

  pub fn resolve(&self, key: &str, status: &str) {
    if let Some(issue) = self.lock().issues.get_mut(key) {
      issue.fields.status = Some(Named::new(status));
      issue.fields.resolution = Some(Named::new("Done"));
    }
  }

  pub fn set_status(&self, key: &str, status: &str) {
    if let Some(issue) = self.lock().issues.get_mut(key) {
      issue.fields.status = Some(Named::new(status));
    }
  }

  pub fn remove_issue(&self, key: &str) {
    self.lock().issues.remove(key);
  }

  pub fn set_edit_meta(&self, key: &str, meta: EditMeta) {
    self.lock().edit_meta.insert(key.to_string(), meta);
  }

  pub fn calls(&self) -> Vec<String> {
    self.lock().calls.clone()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn not_found(what: &str) -> EjiraError {
    EjiraError::Jira {
      status: 404,
      message: format!("{what} does not exist"),
    }
  }
}

fn merge_fields(fields: &IssueFields, patch: &Value) -> Result<IssueFields> {
  let mut current = serde_json::to_value(fields)?;
  if let (Some(target), Some(patch)) = (current.as_object_mut(), patch.as_object()) {
    for (k, v) in patch {
      let mut v = v.clone();
      if k == "assignee" {
        if let Some(user) = v.as_object_mut() {
          if let Some(name) = user.get("name").cloned() {
            user.entry("displayName").or_insert(name);
          }
        }
      }
      if v.is_null() {
        target.remove(k);
      } else {
        target.insert(k.clone(), v);
      }
    }
  }
  Ok(serde_json::from_value(current)?)
}

fn select_fields(issue: &RemoteIssue, fields: &[&str]) -> Result<RemoteIssue> {
  let all = serde_json::to_value(&issue.fields)?;
  let mut selected = serde_json::Map::new();
  if let Some(obj) = all.as_object() {
    for (k, v) in obj {
      if fields.contains(&k.as_str()) {
        selected.insert(k.clone(), v.clone());
      }
    }
  }
  Ok(RemoteIssue {
    id: issue.id.clone(),
    key: issue.key.clone(),
    self_url: issue.self_url.clone(),
    fields: serde_json::from_value(Value::Object(selected))?,
  })
}

fn clause_matches(issue: &RemoteIssue, clause: &str) -> bool {
  let clause = clause.trim();
  let lower = clause.to_lowercase();

  if lower == "resolution = unresolved" {
    return !issue.is_resolved();
  }
  if lower == "resolution is not empty" {
    return issue.is_resolved();
  }
  if let Some(rest) = lower.strip_prefix("key in") {
    let keys = rest.trim().trim_start_matches('(').trim_end_matches(')');
    return keys
      .split(',')
      .any(|k| k.trim().eq_ignore_ascii_case(&issue.key));
  }
  if let Some((field, value)) = clause.split_once("!=") {
    return !field_equals(issue, field.trim(), value.trim());
  }
  if let Some((field, value)) = clause.split_once('=') {
    return field_equals(issue, field.trim(), value.trim());
  }
  false
}

fn field_equals(issue: &RemoteIssue, field: &str, value: &str) -> bool {
  let value = value.trim_matches('"');
  match field.to_lowercase().as_str() {
    "project" => issue.project_key().eq_ignore_ascii_case(value),
    "issuetype" => issue
      .issue_type()
      .is_some_and(|t| t.eq_ignore_ascii_case(value)),
    "status" => issue
      .status_name()
      .is_some_and(|s| s.eq_ignore_ascii_case(value)),
    _ => false,
  }
}

impl Tracker for MockTracker {
  async fn create_issue(&self, req: &NewIssue) -> Result<CreatedIssue> {
    let mut state = self.lock();
    state
      .calls
      .push(format!("create {} {}", req.project, req.issue_type));

    let prefix = format!("{}-", req.project);
    let next = state
      .issues
      .keys()
      .filter_map(|k| k.strip_prefix(&prefix))
      .filter_map(|n| n.parse::<u64>().ok())
      .max()
      .unwrap_or(0)
      + 1;
    let key = format!("{}{next}", prefix);

    let mut fields: IssueFields = serde_json::from_value(req.to_fields())?;
    fields.status = Some(Named::new("To Do"));
    fields.comment = Some(Default::default());

    state.issues.insert(
      key.clone(),
      RemoteIssue {
        id: next.to_string(),
        key: key.clone(),
        self_url: String::new(),
        fields,
      },
    );

    Ok(CreatedIssue {
      id: next.to_string(),
      key,
      self_url: String::new(),
    })
  }

  async fn update_fields(&self, key: &str, fields: Value) -> Result<()> {
    let mut state = self.lock();
    state.calls.push(format!("update {key}"));
    let issue = state
      .issues
      .get_mut(key)
      .ok_or_else(|| Self::not_found(key))?;
    issue.fields = merge_fields(&issue.fields, &fields)?;
    Ok(())
  }

  async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RemoteIssue> {
    let mut state = self.lock();
    state.calls.push(format!("get {key}"));
    let issue = state.issues.get(key).ok_or_else(|| Self::not_found(key))?;
    select_fields(issue, fields)
  }

  async fn search(
    &self,
    jql: &str,
    fields: &[&str],
    limit: Option<usize>,
  ) -> Result<Vec<RemoteIssue>> {
    let mut state = self.lock();
    state.calls.push(format!("search {jql}"));
    let clauses: Vec<&str> = jql.split(" AND ").collect();
    state
      .issues
      .values()
      .filter(|issue| clauses.iter().all(|c| clause_matches(issue, c)))
      .take(limit.unwrap_or(usize::MAX))
      .map(|issue| select_fields(issue, fields))
      .collect()
  }

  async fn get_project(&self, key: &str) -> Result<RemoteProject> {
    let mut state = self.lock();
    state.calls.push(format!("project {key}"));
    state
      .projects
      .get(key)
      .cloned()
      .ok_or_else(|| Self::not_found(key))
  }

  async fn add_comment(&self, key: &str, body: &str) -> Result<RemoteComment> {
    let mut state = self.lock();
    state.calls.push(format!("comment {key}"));
    state.next_comment_id += 1;
    let comment = RemoteComment {
      id: state.next_comment_id.to_string(),
      body: body.to_string(),
      author: Some(self.me.clone()),
      created: Some("2024-01-01T09:00:00.000+0000".into()),
    };
    let issue = state
      .issues
      .get_mut(key)
      .ok_or_else(|| Self::not_found(key))?;
    issue
      .fields
      .comment
      .get_or_insert_with(Default::default)
      .comments
      .push(comment.clone());
    Ok(comment)
  }

  async fn get_comment(&self, key: &str, comment_id: &str) -> Result<RemoteComment> {
    let state = self.lock();
    state
      .issues
      .get(key)
      .and_then(|i| i.fields.comment.as_ref())
      .and_then(|page| page.comments.iter().find(|c| c.id == comment_id))
      .cloned()
      .ok_or_else(|| Self::not_found(&format!("comment {comment_id}")))
  }

  async fn edit_comment(
    &self,
    key: &str,
    comment_id: &str,
    body: &str,
  ) -> Result<RemoteComment> {
    let mut state = self.lock();
    state.calls.push(format!("edit-comment {key}/{comment_id}"));
    let comment = state
      .issues
      .get_mut(key)
      .and_then(|i| i.fields.comment.as_mut())
      .and_then(|page| page.comments.iter_mut().find(|c| c.id == comment_id))
      .ok_or_else(|| Self::not_found(&format!("comment {comment_id}")))?;
    comment.body = body.to_string();
    Ok(comment.clone())
  }

  async fn delete_comment(&self, key: &str, comment_id: &str) -> Result<()> {
    let mut state = self.lock();
    state.calls.push(format!("delete-comment {key}/{comment_id}"));
    let page = state
      .issues
      .get_mut(key)
      .and_then(|i| i.fields.comment.as_mut())
      .ok_or_else(|| Self::not_found(key))?;
    let before = page.comments.len();
    page.comments.retain(|c| c.id != comment_id);
    if page.comments.len() == before {
      return Err(Self::not_found(&format!("comment {comment_id}")));
    }
    Ok(())
  }

  async fn edit_meta(&self, key: &str) -> Result<EditMeta> {
    let state = self.lock();
    state
      .edit_meta
      .get(key)
      .cloned()
      .ok_or_else(|| Self::not_found(key))
  }

  async fn myself(&self) -> Result<RemoteUser> {
    Ok(self.me.clone())
  }
}
