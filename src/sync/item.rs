use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EjiraError, Result};
use crate::jira::types::{RemoteComment, RemoteIssue};
use crate::jira::Tracker;
use crate::markup;
use crate::outline::heading::{PROP_CATEGORY, PROP_EFFORT, PROP_ISSUETYPE, PROP_URL};
use crate::outline::{
  CommentId, Heading, ItemKind, ItemStatus, Location, COMMENTS_HEADING,
};
use crate::sync::Bridge;

/// Epic > story > subtask, with one level of slack.
const MAX_PARENT_DEPTH: usize = 4;

/// Overwrites `heading` with the full remote state of `issue`.
///
/// Plain subheadings are dropped since they were pushed as part of the
/// description; item children (subtasks) are kept and the `Comments`
/// subheading is rebuilt from the remote comment list.
pub fn apply_issue(heading: &mut Heading, issue: &RemoteIssue, config: &Config) {
  let fields = &issue.fields;
  let project = issue.project_key().to_string();

  heading.title = fields.summary.clone().unwrap_or_default();
  heading.link(&issue.key, ItemKind::Issue);
  apply_status(heading, issue);
  heading.priority = fields
    .priority
    .as_ref()
    .and_then(|p| config.priority_letter(&p.name));
  heading.deadline = fields.duedate;

  heading.set_property(PROP_URL, config.browse_url(&issue.key));
  heading.set_property(PROP_CATEGORY, project);
  match issue.issue_type() {
    Some(t) => heading.set_property(PROP_ISSUETYPE, t),
    None => {
      heading.remove_property(PROP_ISSUETYPE);
    }
  }
  match fields
    .timetracking
    .as_ref()
    .and_then(|t| t.original_estimate.as_deref())
  {
    Some(estimate) => heading.set_property(PROP_EFFORT, estimate),
    None => {
      heading.remove_property(PROP_EFFORT);
    }
  }

  // Plain subheadings are local notes and survive a pull.
  heading.body = markup::from_jira(fields.description.as_deref().unwrap_or_default());

  let comments = fields
    .comment
    .as_ref()
    .map(|page| page.comments.as_slice())
    .unwrap_or_default();
  let existing = heading
    .children
    .iter()
    .position(|c| c.title == COMMENTS_HEADING && !c.is_item());

  if comments.is_empty() {
    if let Some(index) = existing {
      heading.children.remove(index);
    }
    return;
  }

  let mut section = Heading::new(COMMENTS_HEADING);
  section.children = comments
    .iter()
    .map(|c| comment_heading(&issue.key, c))
    .collect();
  match existing {
    Some(index) => heading.children[index] = section,
    None => heading.children.push(section),
  }
}

/// Status and assignee only, the fields a shallow sweep carries.
pub fn apply_status(heading: &mut Heading, issue: &RemoteIssue) {
  let fields = &issue.fields;
  if let Some(status) = &fields.status {
    heading.status = Some(ItemStatus {
      name: status.name.clone(),
      resolved: issue.is_resolved(),
    });
  }
  heading.assignee = fields
    .assignee
    .as_ref()
    .and_then(|a| a.label())
    .map(str::to_string);
}

pub fn comment_heading(issue_key: &str, comment: &RemoteComment) -> Heading {
  let mut heading = Heading::new(comment.title());
  heading.link(
    &CommentId::new(issue_key, &comment.id).to_string(),
    ItemKind::Comment,
  );
  heading.body = markup::from_jira(&comment.body);
  heading
}

impl<T: Tracker> Bridge<'_, T> {
  pub async fn fetch_issue(&self, key: &str) -> Result<RemoteIssue> {
    let fields = self.full_fields();
    self.tracker.get_issue(key, &fields).await
  }

  /// Fetches one issue in full and mirrors it.
  pub async fn pull_issue(&mut self, key: &str) -> Result<Location> {
    let issue = self.fetch_issue(key).await?;
    self.upsert_issue(&issue).await
  }

  /// Pulls a single item, whatever its kind.
  pub async fn pull(&mut self, id: &str) -> Result<Location> {
    match self.kind_of(id) {
      ItemKind::Issue => self.pull_issue(id).await,
      ItemKind::Project => self.update_project_heading(id).await,
      ItemKind::Comment => self.pull_comment(&id.parse()?).await,
    }
  }

  /// Pushes the local state of a single item.
  pub async fn push(&mut self, id: &str) -> Result<()> {
    match self.kind_of(id) {
      ItemKind::Issue => self.push_issue(id).await,
      ItemKind::Comment => self.edit_comment(id).await,
      ItemKind::Project => Err(EjiraError::Precondition(format!(
        "projects cannot be pushed: {id}"
      ))),
    }
  }

  async fn push_issue(&mut self, key: &str) -> Result<()> {
    let loc = self
      .mirror
      .locate(key)
      .ok_or_else(|| EjiraError::NotFound(key.to_string()))?;
    let heading = self
      .mirror
      .heading(&loc)
      .ok_or_else(|| EjiraError::NotFound(key.to_string()))?;

    let summary = heading.title.trim().to_string();
    if summary.is_empty() {
      return Err(EjiraError::Precondition(format!("{key} has an empty title")));
    }
    let description = markup::to_jira(heading.body.trim());

    info!("pushing {key}");
    self
      .tracker
      .update_summary_description(key, &summary, &description)
      .await?;
    self.pull_issue(key).await?;
    Ok(())
  }

  /// Writes a full remote issue into the mirror, creating or moving its
  /// heading as needed. Missing parents (epic, parent issue) are fetched and
  /// mirrored first.
  pub async fn upsert_issue(&mut self, issue: &RemoteIssue) -> Result<Location> {
    let mut missing: Vec<RemoteIssue> = Vec::new();
    let mut next = self.parent_key(issue);

    while let Some(key) = next {
      let seen = key == issue.key || missing.iter().any(|m| m.key == key);
      if seen || self.mirror.locate(&key).is_some() || missing.len() >= MAX_PARENT_DEPTH {
        break;
      }
      debug!("{} needs parent {key}", issue.key);
      let parent = self.fetch_issue(&key).await?;
      next = self.parent_key(&parent);
      missing.push(parent);
    }

    for parent in missing.iter().rev() {
      self.ensure_project(parent.project_key()).await?;
      self.place(parent)?;
    }

    self.ensure_project(issue.project_key()).await?;
    self.place(issue)
  }

  /// Shallow variant of [`Self::upsert_issue`]: patches status and assignee
  /// of a mirrored issue, and falls back to a full pull for issues that are
  /// not mirrored yet.
  pub async fn upsert_shallow(&mut self, issue: &RemoteIssue) -> Result<Location> {
    let Some(loc) = self.mirror.locate(&issue.key) else {
      return self.pull_issue(&issue.key).await;
    };
    let heading = self
      .mirror
      .heading_mut(&loc)
      .ok_or_else(|| EjiraError::NotFound(issue.key.clone()))?;
    apply_status(heading, issue);
    Ok(loc)
  }

  pub async fn ensure_project(&mut self, key: &str) -> Result<Location> {
    match self.mirror.locate(key) {
      Some(loc) => Ok(loc),
      None => self.update_project_heading(key).await,
    }
  }

  /// Refreshes (or creates) the top-level heading of a project.
  pub async fn update_project_heading(&mut self, key: &str) -> Result<Location> {
    let project = self.tracker.get_project(key).await?;

    let loc = match self.mirror.locate(key) {
      Some(loc) => loc,
      None => {
        info!("adding project heading for {key}");
        self.mirror.insert_top(key, Heading::new(&project.name))
      }
    };

    let heading = self
      .mirror
      .heading_mut(&loc)
      .ok_or_else(|| EjiraError::NotFound(key.to_string()))?;
    heading.title = project.name.clone();
    heading.link(key, ItemKind::Project);
    heading.set_property(PROP_CATEGORY, key);
    heading.set_property(PROP_URL, self.config.browse_url(key));
    heading.body = markup::from_jira(project.description.as_deref().unwrap_or_default());
    Ok(loc)
  }

  fn parent_key(&self, issue: &RemoteIssue) -> Option<String> {
    if let Some(parent) = &issue.fields.parent {
      return Some(parent.key.clone());
    }
    let epic_field = self.config.fields.epic_link.as_deref()?;
    issue.custom_str(epic_field).map(str::to_string)
  }

  /// Puts the heading for `issue` under its parent (or the project heading)
  /// and applies the remote fields.
  fn place(&mut self, issue: &RemoteIssue) -> Result<Location> {
    let project = issue.project_key();
    let project_loc = self
      .mirror
      .locate(project)
      .ok_or_else(|| EjiraError::Mirror(format!("project {project} is not mirrored")))?;
    let parent_loc = self
      .parent_key(issue)
      .and_then(|key| self.mirror.locate(&key))
      .unwrap_or(project_loc);

    let loc = match self.mirror.locate(&issue.key) {
      Some(existing) if self.mirror.parent(&existing).as_ref() == Some(&parent_loc) => existing,
      Some(existing) => {
        info!("moving {} under {:?}", issue.key, self.mirror.heading(&parent_loc).and_then(Heading::id));
        self.mirror.move_heading(&existing, &parent_loc)?
      }
      None => {
        debug!("adding heading for {}", issue.key);
        let mut heading = Heading::new(issue.fields.summary.clone().unwrap_or_default());
        heading.link(&issue.key, ItemKind::Issue);
        self.mirror.insert(&parent_loc, heading)?
      }
    };

    let heading = self
      .mirror
      .heading_mut(&loc)
      .ok_or_else(|| EjiraError::NotFound(issue.key.clone()))?;
    apply_issue(heading, issue, self.config);
    Ok(loc)
  }
}
