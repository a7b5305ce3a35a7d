use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EjiraError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub jira: JiraSettings,
    pub projects: Vec<String>,
    #[serde(default = "default_mirror_dir")]
    pub mirror_dir: PathBuf,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    #[serde(default)]
    pub fields: FieldMapping,
    #[serde(default = "default_priorities")]
    pub priorities: Vec<PriorityMapping>,
    #[serde(default)]
    pub issue_types: IssueTypeNames,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraSettings {
    pub url: String,
    pub user: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Server specific custom field IDs. These differ per installation and are
/// filled in by `ejira discover-fields --write`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldMapping {
    #[serde(default)]
    pub epic_link: Option<String>,
    #[serde(default)]
    pub epic_name: Option<String>,
    #[serde(default)]
    pub sprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityMapping {
    pub name: String,
    pub letter: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTypeNames {
    #[serde(default = "default_task_type")]
    pub task: String,
    #[serde(default = "default_story_type")]
    pub story: String,
    #[serde(default = "default_epic_type")]
    pub epic: String,
    #[serde(default = "default_subtask_type")]
    pub subtask: String,
}

impl Default for IssueTypeNames {
    fn default() -> Self {
        Self {
            task: default_task_type(),
            story: default_story_type(),
            epic: default_epic_type(),
            subtask: default_subtask_type(),
        }
    }
}

fn default_token_env() -> String {
    "JIRA_TOKEN".to_string()
}
fn default_task_type() -> String {
    "Task".to_string()
}
fn default_story_type() -> String {
    "Story".to_string()
}
fn default_epic_type() -> String {
    "Epic".to_string()
}
fn default_subtask_type() -> String {
    "Sub-task".to_string()
}
fn default_priorities() -> Vec<PriorityMapping> {
    [
        ("Highest", 'A'),
        ("High", 'B'),
        ("Medium", 'C'),
        ("Low", 'D'),
        ("Lowest", 'E'),
    ]
    .into_iter()
    .map(|(name, letter)| PriorityMapping {
        name: name.to_string(),
        letter,
    })
    .collect()
}
fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
fn default_mirror_dir() -> PathBuf {
    home_dir().join(".ejira").join("mirror")
}
fn default_session_file() -> PathBuf {
    home_dir().join(".ejira").join("session.yaml")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EjiraError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.jira.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EjiraError::Config(format!(
                "jira.url must be an http(s) url: {url:?}"
            )));
        }
        for key in &self.projects {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
            if !valid {
                return Err(EjiraError::Config(format!("invalid project key: {key}")));
            }
        }
        let mut letters: Vec<char> = self.priorities.iter().map(|p| p.letter).collect();
        letters.sort_unstable();
        letters.dedup();
        if letters.len() != self.priorities.len() {
            return Err(EjiraError::Config("priority letters must be unique".into()));
        }
        Ok(())
    }

    pub fn priority_letter(&self, name: &str) -> Option<char> {
        self.priorities
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.letter)
    }

    pub fn priority_name(&self, letter: char) -> Option<&str> {
        let letter = letter.to_ascii_uppercase();
        self.priorities
            .iter()
            .find(|p| p.letter == letter)
            .map(|p| p.name.as_str())
    }

    /// Root of the REST API, e.g. `https://jira.example.com/rest/api/2`.
    pub fn api_root(&self) -> String {
        format!("{}/rest/api/2", self.jira.url.trim_end_matches('/'))
    }

    /// Browser URL stored in the URL property of an issue heading.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.jira.url.trim_end_matches('/'))
    }
}
