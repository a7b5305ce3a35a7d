use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Named {
  pub name: String,
}

impl Named {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub account_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
}

impl RemoteUser {
  pub fn label(&self) -> Option<&str> {
    self
      .display_name
      .as_deref()
      .or(self.name.as_deref())
      .or(self.account_id.as_deref())
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeyRef {
  pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeTracking {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub original_estimate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteComment {
  pub id: String,
  #[serde(default)]
  pub body: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<RemoteUser>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created: Option<String>,
}

impl RemoteComment {
  pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
    let raw = self.created.as_deref()?;
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
      .or_else(|_| DateTime::parse_from_rfc3339(raw))
      .ok()
  }

  /// Heading title for the comment: author and creation date.
  pub fn title(&self) -> String {
    let author = self
      .author
      .as_ref()
      .and_then(|a| a.label())
      .unwrap_or("Anonymous");
    match self.created_at() {
      Some(ts) => format!("{author} ({})", ts.format("%Y-%m-%d %H:%M")),
      None => author.to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommentPage {
  #[serde(default)]
  pub comments: Vec<RemoteComment>,
}

/// The `fields` object of an issue. Every field is optional since searches
/// only return the fields that were asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssueFields {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<Named>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolution: Option<Named>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignee: Option<RemoteUser>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority: Option<Named>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub issuetype: Option<Named>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duedate: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent: Option<KeyRef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project: Option<KeyRef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<CommentPage>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timetracking: Option<TimeTracking>,
  /// Server specific `customfield_*` values.
  #[serde(flatten)]
  pub custom: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteIssue {
  #[serde(default)]
  pub id: String,
  pub key: String,
  #[serde(rename = "self", default)]
  pub self_url: String,
  #[serde(default)]
  pub fields: IssueFields,
}

impl RemoteIssue {
  pub fn is_resolved(&self) -> bool {
    self.fields.resolution.is_some()
  }

  pub fn status_name(&self) -> Option<&str> {
    self.fields.status.as_ref().map(|s| s.name.as_str())
  }

  pub fn issue_type(&self) -> Option<&str> {
    self.fields.issuetype.as_ref().map(|t| t.name.as_str())
  }

  /// Project key, from the `project` field or the key prefix.
  pub fn project_key(&self) -> &str {
    match &self.fields.project {
      Some(p) => &p.key,
      None => self
        .key
        .rsplit_once('-')
        .map(|(project, _)| project)
        .unwrap_or(&self.key),
    }
  }

  pub fn custom_str(&self, field_id: &str) -> Option<&str> {
    self
      .fields
      .custom
      .get(field_id)
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteProject {
  #[serde(default)]
  pub id: String,
  pub key: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lead: Option<RemoteUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreatedIssue {
  #[serde(default)]
  pub id: String,
  pub key: String,
  #[serde(rename = "self", default)]
  pub self_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
  #[serde(default)]
  pub start_at: usize,
  #[serde(default)]
  pub max_results: usize,
  #[serde(default)]
  pub total: usize,
  #[serde(default)]
  pub issues: Vec<RemoteIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldMeta {
  pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditMeta {
  #[serde(default)]
  pub fields: BTreeMap<String, FieldMeta>,
}

impl EditMeta {
  /// Field ID whose display name matches `name`.
  pub fn field_named(&self, name: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|(_, meta)| meta.name.eq_ignore_ascii_case(name))
      .map(|(id, _)| id.as_str())
  }
}

/// Issue creation request.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
  pub project: String,
  pub issue_type: String,
  pub summary: String,
  pub description: String,
  pub extra: serde_json::Map<String, Value>,
}

impl NewIssue {
  pub fn to_fields(&self) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert("project".into(), serde_json::json!({ "key": self.project }));
    fields.insert(
      "issuetype".into(),
      serde_json::json!({ "name": self.issue_type }),
    );
    fields.insert("summary".into(), Value::String(self.summary.clone()));
    fields.insert(
      "description".into(),
      Value::String(self.description.clone()),
    );
    for (k, v) in &self.extra {
      fields.insert(k.clone(), v.clone());
    }
    Value::Object(fields)
  }
}
