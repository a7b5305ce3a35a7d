//! Narrowing the view to one issue and moving headings between issues.
//! Both are local operations, the tracker is never contacted.

use tracing::info;

use crate::error::{EjiraError, Result};
use crate::outline::{Heading, HeadingRef, ItemKind, Location, Mirror};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
  /// An issue key.
  Key(String),
  /// The issue enclosing the given heading (the heading itself if it is one).
  UnderCursor(HeadingRef),
  /// The clocked-in issue.
  Active,
}

/// The subtree the view is narrowed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
  pub key: String,
  pub location: Location,
  pub heading: Heading,
}

pub fn focus(mirror: &Mirror, target: &FocusTarget, session: &mut Session) -> Result<Focus> {
  let location = match target {
    FocusTarget::Key(key) => mirror
      .locate(key)
      .ok_or_else(|| EjiraError::NotFound(key.clone()))?,
    FocusTarget::Active => {
      let key = session
        .clocked()
        .ok_or_else(|| EjiraError::Precondition("no issue is clocked in".into()))?;
      mirror
        .locate(key)
        .ok_or_else(|| EjiraError::NotFound(key.to_string()))?
    }
    FocusTarget::UnderCursor(at) => {
      let loc = mirror.resolve(at)?;
      let is_issue = mirror.heading(&loc).and_then(Heading::kind) == Some(ItemKind::Issue);
      if is_issue {
        loc
      } else {
        mirror
          .enclosing(&loc, ItemKind::Issue)
          .ok_or_else(|| EjiraError::NotFound(format!("no issue around {at}")))?
      }
    }
  };

  let heading = mirror
    .heading(&location)
    .cloned()
    .ok_or_else(|| EjiraError::Mirror(format!("no heading at {location:?}")))?;
  let key = heading
    .id()
    .map(str::to_string)
    .ok_or_else(|| EjiraError::Mirror(format!("heading at {location:?} has no ID")))?;

  session.narrow(&key)?;
  info!("narrowed to {key}");
  Ok(Focus {
    key,
    location,
    heading,
  })
}

pub fn widen(session: &mut Session) -> Result<()> {
  session.widen()?;
  info!("widened");
  Ok(())
}

/// Moves the heading `source` to be the last child of the issue `issue_key`.
pub fn refile(mirror: &mut Mirror, source: &HeadingRef, issue_key: &str) -> Result<Location> {
  let target = mirror
    .locate(issue_key)
    .ok_or_else(|| EjiraError::NotFound(issue_key.to_string()))?;
  if mirror.heading(&target).and_then(Heading::kind) != Some(ItemKind::Issue) {
    return Err(EjiraError::Precondition(format!(
      "{issue_key} is not an issue heading"
    )));
  }

  let from = mirror.resolve(source)?;
  if from.project == target.project
    && (from.path == target.path || from.path.is_ancestor_of(&target.path))
  {
    return Err(EjiraError::Precondition(format!(
      "cannot refile {source} below itself"
    )));
  }

  let moved = mirror.move_heading(&from, &target)?;
  info!("refiled {source} under {issue_key}");
  Ok(moved)
}
