use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionFile {
    /// Issue currently clocked in, the "active" issue.
    #[serde(default)]
    pub clocked: Option<String>,
    #[serde(default)]
    pub clocked_since: Option<DateTime<Utc>>,
    /// Issue the view is narrowed to.
    #[serde(default)]
    pub narrowed: Option<String>,
}

/// Per-user state that outlives a single command.
pub struct Session {
    path: PathBuf,
    state: SessionFile,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        let state = if content.trim().is_empty() {
            SessionFile::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(&self.state)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn clocked(&self) -> Option<&str> {
        self.state.clocked.as_deref()
    }

    pub fn narrowed(&self) -> Option<&str> {
        self.state.narrowed.as_deref()
    }

    pub fn clock_in(&mut self, key: &str) -> Result<()> {
        if let Some(previous) = &self.state.clocked {
            info!("clocking out of {previous}");
        }
        info!("clocking in to {key}");
        self.state.clocked = Some(key.to_string());
        self.state.clocked_since = Some(Utc::now());
        self.save()
    }

    /// Returns the issue that was clocked in, if any.
    pub fn clock_out(&mut self) -> Result<Option<String>> {
        let previous = self.state.clocked.take();
        self.state.clocked_since = None;
        if let Some(key) = &previous {
            info!("clocking out of {key}");
        }
        self.save()?;
        Ok(previous)
    }

    pub fn narrow(&mut self, key: &str) -> Result<()> {
        self.state.narrowed = Some(key.to_string());
        self.save()
    }

    pub fn widen(&mut self) -> Result<()> {
        self.state.narrowed = None;
        self.save()
    }
}
