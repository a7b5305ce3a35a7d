pub mod config;
pub mod error;
pub mod jira;
pub mod markup;
pub mod outline;
pub mod session;
pub mod sync;
