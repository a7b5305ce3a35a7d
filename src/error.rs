use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EjiraError {
  #[error("config error: {0}")]
  Config(String),

  #[error("config file not found: {0}")]
  ConfigNotFound(PathBuf),

  #[error("jira error ({status}): {message}")]
  Jira { status: u16, message: String },

  #[error("empty response from {0}")]
  EmptyResponse(String),

  #[error("no such item: {0}")]
  NotFound(String),

  #[error("{0}")]
  Precondition(String),

  #[error("mirror error: {0}")]
  Mirror(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("yaml error: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EjiraError>;
