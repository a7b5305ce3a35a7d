use tracing::info;

use crate::error::{EjiraError, Result};
use crate::jira::types::RemoteComment;
use crate::jira::Tracker;
use crate::markup;
use crate::outline::{CommentId, Heading, Location, COMMENTS_HEADING};
use crate::sync::item::comment_heading;
use crate::sync::Bridge;

impl<T: Tracker> Bridge<'_, T> {
  /// Adds a comment remotely and mirrors it under the issue's `Comments`
  /// subheading.
  pub async fn add_comment(&mut self, issue_key: &str, body: &str) -> Result<CommentId> {
    self.require_issue(issue_key, "comment on")?;
    let comment = self
      .tracker
      .add_comment(issue_key, &markup::to_jira(body))
      .await?;
    let id = CommentId::new(issue_key, &comment.id);
    info!("added comment {id}");

    if self.mirror.locate(issue_key).is_some() {
      self.place_comment(issue_key, &comment)?;
    } else {
      self.pull_issue(issue_key).await?;
    }
    Ok(id)
  }

  pub async fn pull_comment(&mut self, id: &CommentId) -> Result<Location> {
    let comment = self
      .tracker
      .get_comment(&id.issue_key, &id.comment_id)
      .await?;
    if self.mirror.locate(&id.issue_key).is_none() {
      self.pull_issue(&id.issue_key).await?;
    }
    self.place_comment(&id.issue_key, &comment)
  }

  /// Pushes the local body of a comment heading.
  pub async fn edit_comment(&mut self, id: &str) -> Result<()> {
    let comment_id: CommentId = id.parse()?;
    let loc = self
      .mirror
      .locate(id)
      .ok_or_else(|| EjiraError::NotFound(id.to_string()))?;
    let body = self
      .mirror
      .heading(&loc)
      .map(|h| markup::to_jira(&h.body_excluding(&[])))
      .unwrap_or_default();

    let comment = self
      .tracker
      .edit_comment(&comment_id.issue_key, &comment_id.comment_id, &body)
      .await?;
    self.place_comment(&comment_id.issue_key, &comment)?;
    Ok(())
  }

  /// Deletes the comment remotely, then drops its heading.
  pub async fn delete_comment(&mut self, id: &str) -> Result<()> {
    let comment_id: CommentId = id.parse()?;
    self
      .tracker
      .delete_comment(&comment_id.issue_key, &comment_id.comment_id)
      .await?;

    if let Some(loc) = self.mirror.locate(id) {
      self.mirror.remove(&loc);
      info!("removed comment heading {id}");
    }
    Ok(())
  }

  fn place_comment(&mut self, issue_key: &str, comment: &RemoteComment) -> Result<Location> {
    let fresh = comment_heading(issue_key, comment);
    let id = CommentId::new(issue_key, &comment.id).to_string();

    if let Some(loc) = self.mirror.locate(&id) {
      let heading = self
        .mirror
        .heading_mut(&loc)
        .ok_or_else(|| EjiraError::NotFound(id.clone()))?;
      heading.title = fresh.title;
      heading.body = fresh.body;
      return Ok(loc);
    }

    let issue_loc = self
      .mirror
      .locate(issue_key)
      .ok_or_else(|| EjiraError::NotFound(issue_key.to_string()))?;
    let section = self
      .mirror
      .outline(&issue_loc.project)
      .and_then(|o| o.child_by_title(Some(&issue_loc.path), COMMENTS_HEADING));
    let section = match section {
      Some(path) => Location {
        project: issue_loc.project.clone(),
        path,
      },
      None => self
        .mirror
        .insert(&issue_loc, Heading::new(COMMENTS_HEADING))?,
    };
    self.mirror.insert(&section, fresh)
  }
}
