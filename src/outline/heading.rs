use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EjiraError, Result};

pub const PROP_ID: &str = "ID";
pub const PROP_URL: &str = "URL";
pub const PROP_TYPE: &str = "TYPE";
pub const PROP_ISSUETYPE: &str = "ISSUETYPE";
pub const PROP_CATEGORY: &str = "CATEGORY";
pub const PROP_EFFORT: &str = "EFFORT";

/// Title of the subheading that holds an issue's comments.
pub const COMMENTS_HEADING: &str = "Comments";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
  Issue,
  Project,
  Comment,
}

impl ItemKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ItemKind::Issue => "ejira-issue",
      ItemKind::Project => "ejira-project",
      ItemKind::Comment => "ejira-comment",
    }
  }
}

impl std::str::FromStr for ItemKind {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "ejira-issue" => Ok(ItemKind::Issue),
      "ejira-project" => Ok(ItemKind::Project),
      "ejira-comment" => Ok(ItemKind::Comment),
      _ => Err(format!("unknown item type: {s}")),
    }
  }
}

impl std::fmt::Display for ItemKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Remote status mirrored on an issue heading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemStatus {
  pub name: String,
  #[serde(default)]
  pub resolved: bool,
}

/// `ISSUE-KEY/COMMENT-ID`, the ID of a comment heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentId {
  pub issue_key: String,
  pub comment_id: String,
}

impl CommentId {
  pub fn new(issue_key: &str, comment_id: &str) -> Self {
    Self {
      issue_key: issue_key.to_string(),
      comment_id: comment_id.to_string(),
    }
  }
}

impl std::str::FromStr for CommentId {
  type Err = EjiraError;

  fn from_str(s: &str) -> Result<Self> {
    match s.split_once('/') {
      Some((issue, id)) if !issue.is_empty() && !id.is_empty() => Ok(Self::new(issue, id)),
      _ => Err(EjiraError::Precondition(format!(
        "not a comment id (expected KEY/ID): {s}"
      ))),
    }
  }
}

impl std::fmt::Display for CommentId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.issue_key, self.comment_id)
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Heading {
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<ItemStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority: Option<char>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignee: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deadline: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub properties: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub body: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<Heading>,
}

impl Heading {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Default::default()
    }
  }

  pub fn id(&self) -> Option<&str> {
    self.property(PROP_ID)
  }

  pub fn kind(&self) -> Option<ItemKind> {
    self.property(PROP_TYPE).and_then(|t| t.parse().ok())
  }

  pub fn property(&self, name: &str) -> Option<&str> {
    self.properties.get(name).map(String::as_str)
  }

  pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
    self.properties.insert(name.to_string(), value.into());
  }

  pub fn remove_property(&mut self, name: &str) -> Option<String> {
    self.properties.remove(name)
  }

  /// Stamps ID and TYPE, the two properties that make a heading an item.
  pub fn link(&mut self, id: &str, kind: ItemKind) {
    self.set_property(PROP_ID, id);
    self.set_property(PROP_TYPE, kind.as_str());
  }

  pub fn is_item(&self) -> bool {
    self.id().is_some() && self.kind().is_some()
  }

  pub fn is_unresolved_issue(&self) -> bool {
    self.kind() == Some(ItemKind::Issue) && !self.status.as_ref().is_some_and(|s| s.resolved)
  }

  /// The heading's own text plus the text of plain (non-item) subheadings,
  /// skipping subheadings whose title is in `excluded`.
  pub fn body_excluding(&self, excluded: &[&str]) -> String {
    let mut out = self.body.trim_end().to_string();
    for child in &self.children {
      if child.is_item() || excluded.contains(&child.title.as_str()) {
        continue;
      }
      child.render_plain(1, excluded, &mut out);
    }
    out.trim().to_string()
  }

  fn render_plain(&self, depth: usize, excluded: &[&str], out: &mut String) {
    if !out.is_empty() {
      out.push_str("\n\n");
    }
    let _ = write!(out, "{} {}", "*".repeat(depth), self.title);
    let body = self.body.trim();
    if !body.is_empty() {
      out.push('\n');
      out.push_str(body);
    }
    for child in &self.children {
      if child.is_item() || excluded.contains(&child.title.as_str()) {
        continue;
      }
      child.render_plain(depth + 1, excluded, out);
    }
  }

  pub fn child_by_title(&self, title: &str) -> Option<&Heading> {
    self.children.iter().find(|c| c.title == title)
  }

  /// Human readable dump of the subtree rooted here.
  pub fn render(&self, level: usize) -> String {
    let mut out = String::new();
    self.render_into(level, &mut out);
    out
  }

  fn render_into(&self, level: usize, out: &mut String) {
    let _ = write!(out, "{} ", "*".repeat(level.max(1)));
    if let Some(status) = &self.status {
      let _ = write!(out, "{} ", status.name.to_uppercase().replace(' ', "_"));
    }
    if let Some(p) = self.priority {
      let _ = write!(out, "[#{p}] ");
    }
    out.push_str(&self.title);
    if let Some(assignee) = &self.assignee {
      let _ = write!(out, " ({assignee})");
    }
    out.push('\n');
    if let Some(deadline) = self.deadline {
      let _ = writeln!(out, "DEADLINE: <{}>", deadline.format("%Y-%m-%d %a"));
    }
    for (k, v) in &self.properties {
      let _ = writeln!(out, ":{k}: {v}");
    }
    if !self.body.trim().is_empty() {
      out.push_str(self.body.trim_end());
      out.push('\n');
    }
    for child in &self.children {
      child.render_into(level + 1, out);
    }
  }
}
