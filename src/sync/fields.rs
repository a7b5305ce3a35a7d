use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{EjiraError, Result};
use crate::jira::Tracker;
use crate::outline::Location;
use crate::sync::Bridge;

/// Assignee argument of [`Bridge::set_assignee`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignee {
  Me,
  Nobody,
  User(String),
}

impl std::str::FromStr for Assignee {
  type Err = EjiraError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim() {
      "" => Err(EjiraError::Precondition("empty assignee".into())),
      "me" => Ok(Assignee::Me),
      "none" | "nobody" => Ok(Assignee::Nobody),
      user => Ok(Assignee::User(user.to_string())),
    }
  }
}

impl<T: Tracker> Bridge<'_, T> {
  pub async fn set_deadline(&mut self, key: &str, deadline: Option<NaiveDate>) -> Result<Location> {
    self.require_issue(key, "set a deadline on")?;
    let value = match deadline {
      Some(date) => Value::String(date.to_string()),
      None => Value::Null,
    };
    self.edit_and_refresh(key, json!({ "duedate": value })).await
  }

  /// `letter` is the outline priority cookie, mapped through the configured
  /// priority table.
  pub async fn set_priority(&mut self, key: &str, letter: char) -> Result<Location> {
    self.require_issue(key, "set the priority of")?;
    let letter = letter.to_ascii_uppercase();
    let name = self
      .config
      .priority_name(letter)
      .ok_or_else(|| EjiraError::Precondition(format!("unknown priority [#{letter}]")))?
      .to_string();
    self
      .edit_and_refresh(key, json!({ "priority": { "name": name } }))
      .await
  }

  pub async fn set_assignee(&mut self, key: &str, assignee: &Assignee) -> Result<Location> {
    self.require_issue(key, "assign")?;
    let value = match assignee {
      Assignee::Nobody => Value::Null,
      Assignee::User(name) => json!({ "name": name }),
      Assignee::Me => {
        let me = self.tracker.myself().await?;
        match (me.name, me.account_id) {
          (Some(name), _) => json!({ "name": name }),
          (None, Some(id)) => json!({ "accountId": id }),
          (None, None) => {
            return Err(EjiraError::Precondition(
              "current user has neither a name nor an account id".into(),
            ))
          }
        }
      }
    };
    self.edit_and_refresh(key, json!({ "assignee": value })).await
  }

  pub async fn set_issue_type(&mut self, id: &str, issue_type: &str) -> Result<Location> {
    self.require_issue(id, "change the type of")?;
    info!("setting type of {id} to {issue_type}");
    self.tracker.set_issue_type(id, issue_type).await?;
    self.pull_issue(id).await
  }

  /// Links the issue to an epic through the configured epic link field.
  pub async fn set_epic(&mut self, key: &str, epic_key: &str) -> Result<Location> {
    self.require_issue(key, "set the epic of")?;
    self.require_issue(epic_key, "use as an epic")?;
    let field = self
      .config
      .fields
      .epic_link
      .clone()
      .ok_or_else(|| {
        EjiraError::Config("the epic link field is not configured, run discover-fields".into())
      })?;

    let mut fields = serde_json::Map::new();
    fields.insert(field, Value::String(epic_key.to_string()));
    self.edit_and_refresh(key, Value::Object(fields)).await
  }

  async fn edit_and_refresh(&mut self, key: &str, fields: Value) -> Result<Location> {
    info!("updating {key}");
    debug!("{key} <- {fields}");
    self.tracker.update_fields(key, fields).await?;
    self.pull_issue(key).await
  }
}
