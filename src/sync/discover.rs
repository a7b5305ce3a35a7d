//! Finding the server specific IDs of the custom fields ejira relies on.

use tracing::{info, warn};

use crate::config::{FieldMapping, IssueTypeNames};
use crate::error::Result;
use crate::jira::types::EditMeta;
use crate::jira::Tracker;

const EPIC_LINK: &str = "Epic Link";
const EPIC_NAME: &str = "Epic Name";
const SPRINT: &str = "Sprint";

/// Custom field IDs found on the server; `None` when a field was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFields {
  pub epic_link: Option<String>,
  pub epic_name: Option<String>,
  pub sprint: Option<String>,
}

impl DiscoveredFields {
  /// Copies the fields that were found into `mapping`, leaving the others as
  /// they are.
  pub fn apply(&self, mapping: &mut FieldMapping) {
    if let Some(id) = &self.epic_link {
      mapping.epic_link = Some(id.clone());
    }
    if let Some(id) = &self.epic_name {
      mapping.epic_name = Some(id.clone());
    }
    if let Some(id) = &self.sprint {
      mapping.sprint = Some(id.clone());
    }
  }

  pub fn is_complete(&self) -> bool {
    self.epic_link.is_some() && self.epic_name.is_some() && self.sprint.is_some()
  }
}

impl std::fmt::Display for DiscoveredFields {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "not found".into());
    writeln!(f, "{EPIC_LINK}: {}", show(&self.epic_link))?;
    writeln!(f, "{EPIC_NAME}: {}", show(&self.epic_name))?;
    write!(f, "{SPRINT}: {}", show(&self.sprint))
  }
}

/// Samples one epic and one non-epic issue of `project` and reads their edit
/// metadata. The epic carries `Epic Name`, other issues carry `Epic Link` and
/// `Sprint`.
pub async fn discover_fields<T: Tracker>(
  tracker: &T,
  project: &str,
  types: &IssueTypeNames,
) -> Result<DiscoveredFields> {
  let mut found = DiscoveredFields::default();

  let epic_jql = format!("project = {project} AND issuetype = \"{}\"", types.epic);
  match sample_meta(tracker, &epic_jql).await? {
    Some(meta) => {
      found.epic_name = meta.field_named(EPIC_NAME).map(str::to_string);
    }
    None => warn!("{project} has no epic to sample"),
  }

  let other_jql = format!("project = {project} AND issuetype != \"{}\"", types.epic);
  match sample_meta(tracker, &other_jql).await? {
    Some(meta) => {
      found.epic_link = meta.field_named(EPIC_LINK).map(str::to_string);
      found.sprint = meta.field_named(SPRINT).map(str::to_string);
    }
    None => warn!("{project} has no non-epic issue to sample"),
  }

  info!(
    "discovered fields in {project}: epic link={:?}, epic name={:?}, sprint={:?}",
    found.epic_link, found.epic_name, found.sprint
  );
  Ok(found)
}

async fn sample_meta<T: Tracker>(tracker: &T, jql: &str) -> Result<Option<EditMeta>> {
  let sample = tracker.search(jql, &["issuetype"], Some(1)).await?;
  match sample.first() {
    Some(issue) => Ok(Some(tracker.edit_meta(&issue.key).await?)),
    None => Ok(None),
  }
}
