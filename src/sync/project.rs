use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::error::Result;
use crate::jira::types::RemoteIssue;
use crate::jira::{Tracker, SHALLOW_FIELDS};
use crate::outline::heading::PROP_CATEGORY;
use crate::sync::Bridge;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepReport {
  /// Unresolved issues written to the mirror.
  pub updated: Vec<String>,
  /// Locally open issues found resolved remotely.
  pub resolved: Vec<String>,
  /// Issues that had no heading before the sweep.
  pub created: Vec<String>,
}

impl std::fmt::Display for SweepReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "updated={}, resolved={}, created={}",
      self.updated.len(),
      self.resolved.len(),
      self.created.len()
    )
  }
}

impl<T: Tracker> Bridge<'_, T> {
  /// Reconciles the mirror of `project` with the tracker.
  ///
  /// 1. Every issue unresolved remotely is upserted.
  /// 2. Every issue still unresolved in the mirror is looked up among the
  ///    resolved issues and upserted when found.
  ///
  /// With `shallow` only status and assignee are fetched and patched, and an
  /// existing project heading is left as it is.
  /// An issue deleted remotely while open locally is left untouched.
  pub async fn sync_project(&mut self, project: &str, shallow: bool) -> Result<SweepReport> {
    info!("syncing {project} ({})", if shallow { "shallow" } else { "full" });
    if shallow {
      self.ensure_project(project).await?;
    } else {
      self.update_project_heading(project).await?;
    }

    let fields = if shallow {
      SHALLOW_FIELDS.to_vec()
    } else {
      self.full_fields()
    };
    let mut report = SweepReport::default();

    let jql = format!("project = {project} AND resolution = Unresolved");
    let open = self.tracker.search(&jql, &fields, None).await?;
    for issue in &open {
      if self.upsert_by_mode(issue, shallow).await? {
        report.created.push(issue.key.clone());
      }
      report.updated.push(issue.key.clone());
    }

    let fetched: BTreeSet<&str> = open.iter().map(|i| i.key.as_str()).collect();
    let stale: Vec<String> = self
      .local_unresolved(project)
      .into_iter()
      .filter(|key| !fetched.contains(key.as_str()))
      .collect();

    if !stale.is_empty() {
      let jql = format!(
        "key in ({}) AND resolution is not EMPTY",
        stale.join(", ")
      );
      let done = self.tracker.search(&jql, &fields, None).await?;
      for issue in &done {
        self.upsert_by_mode(issue, shallow).await?;
        report.resolved.push(issue.key.clone());
      }

      let left: Vec<&String> = stale
        .iter()
        .filter(|key| !report.resolved.contains(*key))
        .collect();
      if !left.is_empty() {
        warn!("open locally but not found on the server: {left:?}");
      }
    }

    info!("{project}: {report}");
    Ok(report)
  }

  /// Sweeps every configured project.
  pub async fn sync_all(&mut self, shallow: bool) -> Result<Vec<(String, SweepReport)>> {
    let mut reports = Vec::new();
    for project in self.config.projects.clone() {
      let report = self.sync_project(&project, shallow).await?;
      reports.push((project, report));
    }
    Ok(reports)
  }

  /// Returns whether the issue was new to the mirror.
  async fn upsert_by_mode(&mut self, issue: &RemoteIssue, shallow: bool) -> Result<bool> {
    let is_new = self.mirror.locate(&issue.key).is_none();
    if shallow {
      self.upsert_shallow(issue).await?;
    } else {
      self.upsert_issue(issue).await?;
    }
    Ok(is_new)
  }

  /// Keys of issue headings of `project` not marked resolved. Issues can
  /// sit in another project's outline when their epic lives there.
  pub fn local_unresolved(&self, project: &str) -> Vec<String> {
    self
      .mirror
      .projects()
      .filter_map(|p| self.mirror.outline(p))
      .flat_map(|outline| outline.walk())
      .filter(|(_, h)| h.is_unresolved_issue() && h.property(PROP_CATEGORY) == Some(project))
      .filter_map(|(_, h)| h.id().map(str::to_string))
      .collect()
  }
}
