pub mod comment;
pub mod create;
pub mod discover;
pub mod fields;
pub mod focus;
pub mod item;
pub mod project;

use crate::config::Config;
use crate::error::{EjiraError, Result};
use crate::jira::{Tracker, FULL_FIELDS};
use crate::outline::{CommentId, Heading, ItemKind, Mirror};

pub use create::Promoted;
pub use discover::DiscoveredFields;
pub use fields::Assignee;
pub use focus::{Focus, FocusTarget};
pub use project::SweepReport;

/// Binds the local mirror to a tracker for the duration of one action.
pub struct Bridge<'a, T: Tracker> {
  pub config: &'a Config,
  pub tracker: &'a T,
  pub mirror: &'a mut Mirror,
}

impl<'a, T: Tracker> Bridge<'a, T> {
  pub fn new(config: &'a Config, tracker: &'a T, mirror: &'a mut Mirror) -> Self {
    Self {
      config,
      tracker,
      mirror,
    }
  }

  /// Full field list, including the configured custom fields.
  fn full_fields(&self) -> Vec<&'a str> {
    let mut fields = FULL_FIELDS.to_vec();
    let config: &'a Config = self.config;
    let mapping = &config.fields;
    for custom in [&mapping.epic_link, &mapping.epic_name, &mapping.sprint]
      .into_iter()
      .flatten()
    {
      fields.push(custom.as_str());
    }
    fields
  }

  /// Kind of the item `id` names: taken from the mirror when the heading is
  /// known, otherwise inferred from the shape of the ID.
  pub fn kind_of(&self, id: &str) -> ItemKind {
    if let Some(kind) = self
      .mirror
      .locate(id)
      .and_then(|loc| self.mirror.heading(&loc).and_then(Heading::kind))
    {
      return kind;
    }
    if id.parse::<CommentId>().is_ok() {
      ItemKind::Comment
    } else if id.contains('-') {
      ItemKind::Issue
    } else {
      ItemKind::Project
    }
  }

  fn require_issue(&self, id: &str, action: &str) -> Result<()> {
    match self.kind_of(id) {
      ItemKind::Issue => Ok(()),
      ItemKind::Comment => Err(EjiraError::Precondition(format!(
        "cannot {action} a comment: {id}"
      ))),
      ItemKind::Project => Err(EjiraError::Precondition(format!(
        "cannot {action} a project: {id}"
      ))),
    }
  }
}
