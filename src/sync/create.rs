use serde_json::Value;
use tracing::info;

use crate::error::{EjiraError, Result};
use crate::jira::types::NewIssue;
use crate::jira::Tracker;
use crate::markup;
use crate::outline::heading::{PROP_CATEGORY, PROP_ISSUETYPE, PROP_URL};
use crate::outline::{HeadingRef, ItemKind, Location, COMMENTS_HEADING};
use crate::sync::Bridge;

/// Result of promoting a heading to a story.
#[derive(Debug, Clone, PartialEq)]
pub struct Promoted {
  pub key: String,
  pub subtasks: Vec<String>,
}

impl<T: Tracker> Bridge<'_, T> {
  /// Creates a remote issue from a heading without an ID, stamps the heading
  /// and refreshes it. `issue_type` defaults to the configured task type.
  pub async fn create_from_heading(
    &mut self,
    target: &HeadingRef,
    issue_type: Option<&str>,
  ) -> Result<String> {
    let loc = self.mirror.resolve(target)?;
    let issue_type = issue_type
      .unwrap_or(&self.config.issue_types.task)
      .to_string();
    let key = self.create_remote(&loc, &issue_type).await?;
    self.pull_issue(&key).await?;
    Ok(key)
  }

  pub async fn promote_task(&mut self, target: &HeadingRef) -> Result<String> {
    self.create_from_heading(target, None).await
  }

  /// The heading must sit below an issue heading, which becomes the parent.
  pub async fn promote_subtask(&mut self, target: &HeadingRef) -> Result<String> {
    let subtask = self.config.issue_types.subtask.clone();
    self.create_from_heading(target, Some(&subtask)).await
  }

  /// Creates a story from the heading and a subtask from each of its plain
  /// child headings.
  pub async fn promote_story(&mut self, target: &HeadingRef) -> Result<Promoted> {
    let loc = self.mirror.resolve(target)?;
    let story_type = self.config.issue_types.story.clone();
    let subtask_type = self.config.issue_types.subtask.clone();

    let key = self.create_remote(&loc, &story_type).await?;

    let mut subtasks = Vec::new();
    let mut cursor = self
      .mirror
      .outline(&loc.project)
      .and_then(|o| o.first_child(&loc.path));

    while let Some(path) = cursor {
      let child = Location {
        project: loc.project.clone(),
        path,
      };
      let eligible = self
        .mirror
        .heading(&child)
        .is_some_and(|h| !h.is_item() && h.title != COMMENTS_HEADING);
      if eligible {
        subtasks.push(self.create_remote(&child, &subtask_type).await?);
      }
      cursor = self
        .mirror
        .outline(&child.project)
        .and_then(|o| o.next_sibling(&child.path));
    }

    self.pull_issue(&key).await?;
    for subtask in &subtasks {
      self.pull_issue(subtask).await?;
    }

    info!("promoted {key} with {} subtask(s)", subtasks.len());
    Ok(Promoted { key, subtasks })
  }

  /// Creates the remote issue for the heading at `loc` and stamps the
  /// heading with its ID. Only the heading's own body becomes the
  /// description. The heading is not refreshed.
  async fn create_remote(&mut self, loc: &Location, issue_type: &str) -> Result<String> {
    let heading = self
      .mirror
      .heading(loc)
      .ok_or_else(|| EjiraError::Mirror(format!("no heading at {loc:?}")))?;
    if let Some(id) = heading.id() {
      return Err(EjiraError::Precondition(format!(
        "heading is already linked to {id}"
      )));
    }

    let summary = heading.title.trim().to_string();
    if summary.is_empty() {
      return Err(EjiraError::Precondition("heading has no title".into()));
    }
    let body = heading.body.trim().to_string();
    let deadline = heading.deadline;
    let priority = heading
      .priority
      .and_then(|p| self.config.priority_name(p))
      .map(str::to_string);

    let project = self
      .mirror
      .enclosing(loc, ItemKind::Project)
      .and_then(|p| self.mirror.heading(&p))
      .and_then(|h| h.id())
      .map(str::to_string)
      .ok_or_else(|| {
        EjiraError::Precondition("heading is not below a project heading".into())
      })?;
    let parent = self
      .mirror
      .enclosing(loc, ItemKind::Issue)
      .and_then(|p| self.mirror.heading(&p))
      .and_then(|h| {
        h.id()
          .map(|id| (id.to_string(), h.property(PROP_ISSUETYPE).map(str::to_string)))
      });

    let types = &self.config.issue_types;
    let mut extra = serde_json::Map::new();

    if issue_type == types.subtask {
      let (parent_key, _) = parent.ok_or_else(|| {
        EjiraError::Precondition("a subtask must be created below an issue heading".into())
      })?;
      extra.insert("parent".into(), serde_json::json!({ "key": parent_key }));
    } else if let Some((parent_key, Some(parent_type))) = &parent {
      if *parent_type == types.epic {
        if let Some(field) = &self.config.fields.epic_link {
          extra.insert(field.clone(), Value::String(parent_key.clone()));
        }
      }
    }
    if issue_type == types.epic {
      if let Some(field) = &self.config.fields.epic_name {
        extra.insert(field.clone(), Value::String(summary.clone()));
      }
    }
    if let Some(deadline) = deadline {
      extra.insert("duedate".into(), Value::String(deadline.to_string()));
    }
    if let Some(priority) = priority {
      extra.insert("priority".into(), serde_json::json!({ "name": priority }));
    }

    let created = self
      .tracker
      .create_issue(&NewIssue {
        project: project.clone(),
        issue_type: issue_type.to_string(),
        summary,
        description: markup::to_jira(&body),
        extra,
      })
      .await?;

    let url = self.config.browse_url(&created.key);
    let heading = self
      .mirror
      .heading_mut(loc)
      .ok_or_else(|| EjiraError::Mirror(format!("no heading at {loc:?}")))?;
    heading.link(&created.key, ItemKind::Issue);
    heading.set_property(PROP_URL, url);
    heading.set_property(PROP_ISSUETYPE, issue_type);
    heading.set_property(PROP_CATEGORY, project);

    info!("heading linked to {}", created.key);
    Ok(created.key)
  }
}
