use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use ejira_sync::config::Config;
use ejira_sync::error::{EjiraError, Result};
use ejira_sync::jira::JiraClient;
use ejira_sync::outline::{Heading, HeadingRef, Mirror};
use ejira_sync::session::Session;
use ejira_sync::sync::discover::discover_fields;
use ejira_sync::sync::{focus, Assignee, Bridge, FocusTarget};

#[derive(Parser)]
#[command(name = "ejira", about = "Mirror JIRA projects into outline files")]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Path to config file
  #[arg(short, long, default_value = "ejira.yaml")]
  config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
  #[command(flatten)]
  Remote(RemoteCommand),
  /// Narrow to an issue: by key, around a heading, or the clocked-in issue
  Focus {
    key: Option<String>,
    /// Heading (ID or PARENT>Title) whose enclosing issue to focus
    #[arg(long, conflicts_with = "key")]
    at: Option<String>,
  },
  /// Clear the narrowing
  Widen,
  /// Mark an issue as the active one
  ClockIn { key: String },
  ClockOut,
  /// Move a heading below another issue
  Refile { heading: String, key: String },
  /// Add a plain heading below an item
  AddHeading {
    parent: String,
    title: String,
    #[arg(long, default_value = "")]
    body: String,
  },
  /// Look up the IDs of the Epic Link, Epic Name and Sprint fields
  DiscoverFields {
    /// Project to sample, defaults to the first configured project
    project: Option<String>,
    /// Store the IDs found in the config file
    #[arg(long)]
    write: bool,
  },
}

/// Commands that talk to the server.
#[derive(Subcommand)]
enum RemoteCommand {
  /// Reconcile one project, or every configured project, with the server
  Sync {
    /// Project key
    project: Option<String>,
    /// Only refresh status and assignee of mirrored issues
    #[arg(long)]
    shallow: bool,
  },
  /// Refresh a single issue, project or comment (KEY/ID) from the server
  Pull { id: String },
  /// Send the local title and body of an issue or comment to the server
  Push { id: String },
  /// Comment on an issue
  AddComment { key: String, body: String },
  /// Push the local body of a comment (KEY/ID)
  EditComment { id: String },
  /// Delete a comment (KEY/ID)
  DeleteComment { id: String },
  /// Create an issue from a heading (ID or PARENT>Title)
  Create {
    heading: String,
    /// Issue type, defaults to the configured task type
    #[arg(long = "type")]
    issue_type: Option<String>,
  },
  /// Create a task from a heading
  PromoteTask { heading: String },
  /// Create a story from a heading and subtasks from its subheadings
  PromoteStory { heading: String },
  /// Create a subtask of the enclosing issue from a heading
  PromoteSubtask { heading: String },
  /// Set or clear (with no date) the due date of an issue
  SetDeadline {
    key: String,
    /// YYYY-MM-DD
    date: Option<NaiveDate>,
  },
  /// Set the priority of an issue by its letter (A-E)
  SetPriority { key: String, letter: char },
  /// Assign an issue: `me`, `nobody` or a user name
  SetAssignee { key: String, assignee: String },
  /// Change the issue type
  SetType { key: String, issue_type: String },
  /// Link an issue to an epic
  SetEpic { key: String, epic: String },
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();

  if let Err(e) = run(cli).await {
    error!("{e}");
    std::process::exit(1);
  }
}

async fn run(cli: Cli) -> Result<()> {
  let config = Config::load(&cli.config)?;

  match cli.command {
    Commands::Focus { key, at } => {
      let target = match (key, at) {
        (Some(key), _) => FocusTarget::Key(key),
        (None, Some(at)) => FocusTarget::UnderCursor(at.parse()?),
        (None, None) => FocusTarget::Active,
      };
      cmd_focus(&config, &target)
    }
    Commands::Widen => {
      let mut session = Session::load(&config.session_file)?;
      focus::widen(&mut session)
    }
    Commands::ClockIn { key } => cmd_clock_in(&config, &key),
    Commands::ClockOut => {
      let mut session = Session::load(&config.session_file)?;
      match session.clock_out()? {
        Some(key) => println!("Clocked out of {key}"),
        None => println!("Nothing was clocked in."),
      }
      Ok(())
    }
    Commands::Refile { heading, key } => {
      let mut mirror = Mirror::load(&config.mirror_dir)?;
      focus::refile(&mut mirror, &heading.parse()?, &key)?;
      mirror.save()
    }
    Commands::AddHeading {
      parent,
      title,
      body,
    } => cmd_add_heading(&config, &parent, &title, &body),
    Commands::DiscoverFields { project, write } => {
      cmd_discover(&config, &cli.config, project, write).await
    }
    Commands::Remote(command) => cmd_remote(&config, command).await,
  }
}

/// Runs a remote command and writes the mirror back afterwards.
async fn cmd_remote(config: &Config, command: RemoteCommand) -> Result<()> {
  let client = JiraClient::new(config)?;
  let mut mirror = Mirror::load(&config.mirror_dir)?;
  let mut bridge = Bridge::new(config, &client, &mut mirror);

  let outcome = remote_action(&mut bridge, command).await;
  // Whatever was mirrored before a failure is kept.
  mirror.save()?;
  outcome
}

async fn remote_action(bridge: &mut Bridge<'_, JiraClient>, command: RemoteCommand) -> Result<()> {
  match command {
    RemoteCommand::Sync { project, shallow } => {
      let reports = match project {
        Some(project) => vec![(project.clone(), bridge.sync_project(&project, shallow).await?)],
        None => bridge.sync_all(shallow).await?,
      };
      for (project, report) in reports {
        println!("{project}: {report}");
      }
    }
    RemoteCommand::Pull { id } => {
      bridge.pull(&id).await?;
      println!("Pulled {id}");
    }
    RemoteCommand::Push { id } => {
      bridge.push(&id).await?;
      println!("Pushed {id}");
    }
    RemoteCommand::AddComment { key, body } => {
      let id = bridge.add_comment(&key, &body).await?;
      println!("Added comment {id}");
    }
    RemoteCommand::EditComment { id } => {
      bridge.edit_comment(&id).await?;
      println!("Updated comment {id}");
    }
    RemoteCommand::DeleteComment { id } => {
      bridge.delete_comment(&id).await?;
      println!("Deleted comment {id}");
    }
    RemoteCommand::Create {
      heading,
      issue_type,
    } => {
      let key = bridge
        .create_from_heading(&heading.parse()?, issue_type.as_deref())
        .await?;
      println!("Created {key}");
    }
    RemoteCommand::PromoteTask { heading } => {
      let key = bridge.promote_task(&heading.parse()?).await?;
      println!("Created {key}");
    }
    RemoteCommand::PromoteSubtask { heading } => {
      let key = bridge.promote_subtask(&heading.parse()?).await?;
      println!("Created {key}");
    }
    RemoteCommand::PromoteStory { heading } => {
      let promoted = bridge.promote_story(&heading.parse()?).await?;
      println!("Created {}", promoted.key);
      for subtask in &promoted.subtasks {
        println!("  {subtask}");
      }
    }
    RemoteCommand::SetDeadline { key, date } => {
      bridge.set_deadline(&key, date).await?;
    }
    RemoteCommand::SetPriority { key, letter } => {
      bridge.set_priority(&key, letter).await?;
    }
    RemoteCommand::SetAssignee { key, assignee } => {
      let assignee: Assignee = assignee.parse()?;
      bridge.set_assignee(&key, &assignee).await?;
    }
    RemoteCommand::SetType { key, issue_type } => {
      bridge.set_issue_type(&key, &issue_type).await?;
    }
    RemoteCommand::SetEpic { key, epic } => {
      bridge.set_epic(&key, &epic).await?;
    }
  }
  Ok(())
}

fn cmd_focus(config: &Config, target: &FocusTarget) -> Result<()> {
  let mirror = Mirror::load(&config.mirror_dir)?;
  let mut session = Session::load(&config.session_file)?;
  let focus = focus::focus(&mirror, target, &mut session)?;

  print!("{}", focus.heading.render(focus.location.path.level()));
  Ok(())
}

fn cmd_clock_in(config: &Config, key: &str) -> Result<()> {
  let mirror = Mirror::load(&config.mirror_dir)?;
  if mirror.locate(key).is_none() {
    warn!("{key} is not mirrored yet, run `ejira pull {key}`");
  }
  let mut session = Session::load(&config.session_file)?;
  session.clock_in(key)?;
  println!("Clocked in to {key}");
  Ok(())
}

fn cmd_add_heading(config: &Config, parent: &str, title: &str, body: &str) -> Result<()> {
  let mut mirror = Mirror::load(&config.mirror_dir)?;
  let parent_loc = mirror.resolve(&HeadingRef::Id(parent.to_string()))?;

  let mut heading = Heading::new(title);
  heading.body = body.to_string();
  mirror.insert(&parent_loc, heading)?;
  mirror.save()?;

  println!("Added {parent}>{title}");
  Ok(())
}

async fn cmd_discover(
  config: &Config,
  config_path: &std::path::Path,
  project: Option<String>,
  write: bool,
) -> Result<()> {
  let project = project
    .or_else(|| config.projects.first().cloned())
    .ok_or_else(|| EjiraError::Config("no project configured".into()))?;
  let client = JiraClient::new(config)?;
  let found = discover_fields(&client, &project, &config.issue_types).await?;

  println!("{found}");
  if write {
    let mut updated = config.clone();
    found.apply(&mut updated.fields);
    updated.save(config_path)?;
    info!("field IDs written to {}", config_path.display());
  }
  Ok(())
}
