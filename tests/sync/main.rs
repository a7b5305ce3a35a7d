use ejira_sync::config::Config;
use ejira_sync::error::EjiraError;
use ejira_sync::jira::types::RemoteIssue;
use ejira_sync::jira::{MockTracker, Tracker};
use ejira_sync::outline::{Heading, HeadingRef, ItemKind, Location, Mirror, COMMENTS_HEADING};
use ejira_sync::sync::{Assignee, Bridge};
use tempfile::TempDir;

const EPIC_LINK: &str = "customfield_10014";

fn config(dir: &TempDir) -> Config {
  let mut config: Config = serde_yaml::from_str(
    "jira: {url: 'https://jira.example.com', user: alice}\nprojects: [ABC]\n",
  )
  .unwrap();
  config.mirror_dir = dir.path().join("mirror");
  config.session_file = dir.path().join("session.yaml");
  config.fields.epic_link = Some(EPIC_LINK.into());
  config
}

fn tracker() -> MockTracker {
  let mock = MockTracker::default();
  mock.add_project("ABC", "Alpha");
  mock.add_project("XYZ", "Xylophone");
  mock.add_project("PROJ", "Projects");
  mock
}

fn with_epic(mut issue: RemoteIssue, epic: &str) -> RemoteIssue {
  issue
    .fields
    .custom
    .insert(EPIC_LINK.into(), serde_json::json!(epic));
  issue
}

fn heading<'m>(mirror: &'m Mirror, id: &str) -> &'m Heading {
  let loc = mirror.locate(id).unwrap_or_else(|| panic!("{id} is not mirrored"));
  mirror.heading(&loc).unwrap()
}

fn is_resolved(mirror: &Mirror, id: &str) -> bool {
  heading(mirror, id).status.as_ref().unwrap().resolved
}

fn parent_id(mirror: &Mirror, id: &str) -> Option<String> {
  let loc = mirror.locate(id)?;
  let parent = mirror.parent(&loc)?;
  mirror.heading(&parent)?.id().map(str::to_string)
}

fn add_plain(mirror: &mut Mirror, parent: &str, title: &str, body: &str) -> Location {
  let parent = mirror.locate(parent).unwrap();
  let mut heading = Heading::new(title);
  heading.body = body.into();
  mirror.insert(&parent, heading).unwrap()
}

// --- sweep ---

#[tokio::test]
async fn sync_twice_changes_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Fix login");
  mock.add_issue("ABC-2", "Epic", "Accounts");
  let child = mock.add_issue("ABC-3", "Story", "Signup");
  mock.upsert_issue(with_epic(child, "ABC-2"));
  mock.add_issue("ABC-4", "Task", "Done already");
  mock.resolve("ABC-4", "Done");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.sync_project("ABC", false).await.unwrap();
  let first = mirror.outline("ABC").unwrap().clone();

  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  let report = bridge.sync_project("ABC", false).await.unwrap();
  assert_eq!(mirror.outline("ABC").unwrap(), &first);
  assert!(report.created.is_empty());
  assert!(report.resolved.is_empty());
}

#[tokio::test]
async fn sync_mirrors_every_unresolved_issue() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Fix login");
  mock.add_issue("ABC-2", "Epic", "Accounts");
  let child = mock.add_issue("ABC-3", "Story", "Signup");
  mock.upsert_issue(with_epic(child, "ABC-2"));
  mock.add_issue("XYZ-1", "Task", "Elsewhere");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  let report = bridge.sync_project("ABC", false).await.unwrap();

  assert_eq!(report.updated, vec!["ABC-1", "ABC-2", "ABC-3"]);
  assert_eq!(report.created, vec!["ABC-1", "ABC-2", "ABC-3"]);
  for key in ["ABC-1", "ABC-2", "ABC-3"] {
    assert!(!is_resolved(&mirror, key));
  }
  assert!(mirror.locate("XYZ-1").is_none());

  assert_eq!(parent_id(&mirror, "ABC-1").as_deref(), Some("ABC"));
  assert_eq!(parent_id(&mirror, "ABC-3").as_deref(), Some("ABC-2"));
  let project = heading(&mirror, "ABC");
  assert_eq!(project.title, "Alpha");
  assert_eq!(project.kind(), Some(ItemKind::Project));
}

#[tokio::test]
async fn issue_resolved_remotely_is_resolved_after_sync() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Fix login");
  mock.add_issue("ABC-2", "Task", "Fix logout");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  mock.resolve("ABC-2", "Closed");
  let report = Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  assert_eq!(report.resolved, vec!["ABC-2"]);
  assert!(!is_resolved(&mirror, "ABC-1"));
  assert!(is_resolved(&mirror, "ABC-2"));
  assert_eq!(heading(&mirror, "ABC-2").status.as_ref().unwrap().name, "Closed");
}

#[tokio::test]
async fn no_second_query_when_nothing_is_stale() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Fix login");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  let searches: Vec<String> = mock
    .calls()
    .into_iter()
    .filter(|c| c.starts_with("search"))
    .collect();
  assert_eq!(searches, vec!["search project = ABC AND resolution = Unresolved"]);
}

#[tokio::test]
async fn shallow_sync_only_touches_status_and_assignee() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Fix login");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();
  let before = heading(&mirror, "ABC-1").clone();

  let mut changed = mock.issue("ABC-1").unwrap();
  changed.fields.summary = Some("Renamed".into());
  changed.fields.description = Some("New text".into());
  mock.upsert_issue(changed);
  mock.set_status("ABC-1", "In Progress");
  mock.add_issue("ABC-2", "Task", "New one");
  mock.add_project("ABC", "Renamed project");
  let calls_before = mock.calls().len();

  let report = Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", true)
    .await
    .unwrap();
  assert_eq!(report.created, vec!["ABC-2"]);

  // The project heading is neither fetched nor rewritten.
  assert_eq!(heading(&mirror, "ABC").title, "Alpha");
  assert!(!mock.calls()[calls_before..].contains(&"project ABC".to_string()));

  let after = heading(&mirror, "ABC-1");
  assert_eq!(after.status.as_ref().unwrap().name, "In Progress");
  assert_eq!(after.title, before.title);
  assert_eq!(after.body, before.body);
  assert_eq!(after.properties, before.properties);

  // Missing headings are pulled in full.
  assert_eq!(heading(&mirror, "ABC-2").title, "New one");
}

#[tokio::test]
async fn sync_all_covers_every_configured_project() {
  let dir = tempfile::tempdir().unwrap();
  let mut config = config(&dir);
  config.projects = vec!["ABC".into(), "XYZ".into()];
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Alpha task");
  mock.add_issue("XYZ-1", "Task", "Xylophone task");
  mock.add_issue("PROJ-1", "Task", "Not configured");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let reports = Bridge::new(&config, &mock, &mut mirror)
    .sync_all(false)
    .await
    .unwrap();

  let projects: Vec<_> = reports.iter().map(|(p, _)| p.as_str()).collect();
  assert_eq!(projects, vec!["ABC", "XYZ"]);
  assert_eq!(reports[0].1.created, vec!["ABC-1"]);
  assert_eq!(reports[1].1.created, vec!["XYZ-1"]);
  assert_eq!(parent_id(&mirror, "XYZ-1").as_deref(), Some("XYZ"));
  assert!(mirror.locate("PROJ-1").is_none());
}

// --- ABC scenario ---

#[tokio::test]
async fn abc_scenario() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");
  mock.add_issue("ABC-2", "Task", "two");
  mock.resolve("ABC-2", "Done");
  mock.add_issue("ABC-3", "Task", "three");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  // ABC-3 disappears from the server while still open locally.
  mock.remove_issue("ABC-3");
  let report = Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  assert_eq!(report.updated, vec!["ABC-1"]);
  assert!(report.resolved.is_empty());
  assert!(!is_resolved(&mirror, "ABC-1"));
  // Deleted remotely: left as it was.
  assert!(!is_resolved(&mirror, "ABC-3"));
  // Resolved before it was ever mirrored: not fetched by either pass.
  assert!(mirror.locate("ABC-2").is_none());
  assert!(mock
    .calls()
    .contains(&"search key in (ABC-3) AND resolution is not EMPTY".to_string()));
}

#[tokio::test]
async fn abc_scenario_with_abc2_open_locally() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");
  mock.add_issue("ABC-2", "Task", "two");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  mock.resolve("ABC-2", "Done");
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();

  assert!(!is_resolved(&mirror, "ABC-1"));
  assert!(is_resolved(&mirror, "ABC-2"));
}

// --- single items ---

#[tokio::test]
async fn create_then_pull_keeps_title_and_body() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .update_project_heading("ABC")
    .await
    .unwrap();
  add_plain(&mut mirror, "ABC", "Write docs", "Cover /setup/ and =config=.");

  let key = Bridge::new(&config, &mock, &mut mirror)
    .create_from_heading(&"ABC>Write docs".parse().unwrap(), None)
    .await
    .unwrap();
  assert_eq!(key, "ABC-1");

  let remote = mock.issue("ABC-1").unwrap();
  assert_eq!(remote.fields.summary.as_deref(), Some("Write docs"));
  assert_eq!(remote.issue_type(), Some("Task"));

  Bridge::new(&config, &mock, &mut mirror)
    .pull("ABC-1")
    .await
    .unwrap();
  let pulled = heading(&mirror, "ABC-1");
  assert_eq!(pulled.title, "Write docs");
  assert_eq!(pulled.body, "Cover /setup/ and =config=.");
  assert_eq!(pulled.kind(), Some(ItemKind::Issue));
  assert_eq!(parent_id(&mirror, "ABC-1").as_deref(), Some("ABC"));
}

#[tokio::test]
async fn create_refuses_linked_heading() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.pull("ABC-1").await.unwrap();
  let err = bridge
    .create_from_heading(&HeadingRef::Id("ABC-1".into()), None)
    .await
    .unwrap_err();
  assert!(matches!(err, EjiraError::Precondition(_)));
}

#[tokio::test]
async fn subtask_is_created_under_enclosing_issue() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  for n in 1..=10 {
    mock.add_issue(&format!("PROJ-{n}"), "Story", &format!("Story {n}"));
  }

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .pull("PROJ-10")
    .await
    .unwrap();
  add_plain(&mut mirror, "PROJ-10", "Child", "");

  let key = Bridge::new(&config, &mock, &mut mirror)
    .promote_subtask(&"PROJ-10>Child".parse().unwrap())
    .await
    .unwrap();

  assert_eq!(key, "PROJ-11");
  let remote = mock.issue(&key).unwrap();
  assert_eq!(remote.fields.parent.as_ref().unwrap().key, "PROJ-10");
  assert_eq!(remote.issue_type(), Some("Sub-task"));
  assert_eq!(parent_id(&mirror, &key).as_deref(), Some("PROJ-10"));
  assert_eq!(heading(&mirror, &key).title, "Child");
}

#[tokio::test]
async fn plain_child_survives_sync_and_can_be_promoted() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Story", "Login");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();
  add_plain(&mut mirror, "ABC-1", "Child", "Check the cookie.");
  {
    let loc = mirror.locate("ABC-1").unwrap();
    mirror.heading_mut(&loc).unwrap().body = "Story text".into();
  }

  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.push("ABC-1").await.unwrap();
  bridge.sync_project("ABC", false).await.unwrap();

  let remote = mock.issue("ABC-1").unwrap();
  assert_eq!(remote.fields.description.as_deref(), Some("Story text"));
  let child = heading(&mirror, "ABC-1").child_by_title("Child").unwrap();
  assert_eq!(child.body, "Check the cookie.");

  let key = Bridge::new(&config, &mock, &mut mirror)
    .promote_subtask(&"ABC-1>Child".parse().unwrap())
    .await
    .unwrap();
  assert_eq!(parent_id(&mirror, &key).as_deref(), Some("ABC-1"));
  assert_eq!(
    mock.issue(&key).unwrap().fields.description.as_deref(),
    Some("Check the cookie.")
  );
}

#[tokio::test]
async fn subtask_needs_an_enclosing_issue() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .update_project_heading("ABC")
    .await
    .unwrap();
  add_plain(&mut mirror, "ABC", "Orphan", "");

  let err = Bridge::new(&config, &mock, &mut mirror)
    .promote_subtask(&"ABC>Orphan".parse().unwrap())
    .await
    .unwrap_err();
  assert!(matches!(err, EjiraError::Precondition(_)));
  assert!(mock.issue("ABC-1").is_none());
}

#[tokio::test]
async fn task_below_epic_gets_epic_link() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Epic", "Accounts");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .pull("ABC-1")
    .await
    .unwrap();
  add_plain(&mut mirror, "ABC-1", "Password reset", "");

  let key = Bridge::new(&config, &mock, &mut mirror)
    .promote_task(&"ABC-1>Password reset".parse().unwrap())
    .await
    .unwrap();

  let remote = mock.issue(&key).unwrap();
  assert_eq!(remote.custom_str(EPIC_LINK), Some("ABC-1"));
  assert_eq!(parent_id(&mirror, &key).as_deref(), Some("ABC-1"));
}

#[tokio::test]
async fn promote_story_creates_subtasks_from_subheadings() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .update_project_heading("ABC")
    .await
    .unwrap();
  let story = add_plain(&mut mirror, "ABC", "Login page", "As a user I log in.");
  for title in ["Form", "Validation"] {
    let mut sub = Heading::new(title);
    sub.body = format!("{title} details");
    mirror.insert(&story, sub).unwrap();
  }

  let promoted = Bridge::new(&config, &mock, &mut mirror)
    .promote_story(&"ABC>Login page".parse().unwrap())
    .await
    .unwrap();

  assert_eq!(promoted.key, "ABC-1");
  assert_eq!(promoted.subtasks, vec!["ABC-2", "ABC-3"]);

  let remote = mock.issue("ABC-1").unwrap();
  assert_eq!(remote.issue_type(), Some("Story"));
  assert_eq!(remote.fields.description.as_deref(), Some("As a user I log in."));
  for key in &promoted.subtasks {
    let sub = mock.issue(key).unwrap();
    assert_eq!(sub.fields.parent.as_ref().unwrap().key, "ABC-1");
    assert_eq!(parent_id(&mirror, key).as_deref(), Some("ABC-1"));
  }

  let story = heading(&mirror, "ABC-1");
  let titles: Vec<&str> = story.children.iter().map(|c| c.title.as_str()).collect();
  assert_eq!(titles, vec!["Form", "Validation"]);
  assert_eq!(heading(&mirror, "ABC-2").body, "Form details");
}

#[tokio::test]
async fn push_sends_title_and_body() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "Old title");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .pull("ABC-1")
    .await
    .unwrap();
  {
    let loc = mirror.locate("ABC-1").unwrap();
    let heading = mirror.heading_mut(&loc).unwrap();
    heading.title = "New title".into();
    heading.body = "Now with /emphasis/.".into();
  }

  Bridge::new(&config, &mock, &mut mirror)
    .push("ABC-1")
    .await
    .unwrap();

  let remote = mock.issue("ABC-1").unwrap();
  assert_eq!(remote.fields.summary.as_deref(), Some("New title"));
  assert_eq!(remote.fields.description.as_deref(), Some("Now with _emphasis_."));
  assert_eq!(heading(&mirror, "ABC-1").body, "Now with /emphasis/.");
}

#[tokio::test]
async fn pushing_a_project_fails() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.pull("ABC").await.unwrap();
  assert!(matches!(
    bridge.push("ABC").await,
    Err(EjiraError::Precondition(_))
  ));
}

#[tokio::test]
async fn pull_fetches_epic_from_other_project() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("XYZ-1", "Epic", "Shared epic");
  let issue = mock.add_issue("ABC-5", "Story", "Uses it");
  mock.upsert_issue(with_epic(issue, "XYZ-1"));

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.pull("ABC-5").await.unwrap();
  assert_eq!(bridge.local_unresolved("ABC"), vec!["ABC-5"]);

  assert_eq!(parent_id(&mirror, "ABC-5").as_deref(), Some("XYZ-1"));
  assert_eq!(parent_id(&mirror, "XYZ-1").as_deref(), Some("XYZ"));
  assert!(mirror.locate("ABC").is_some());
}

// --- field edits ---

#[tokio::test]
async fn field_edits_refresh_the_heading() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");
  mock.add_issue("ABC-2", "Epic", "epic");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.pull("ABC-2").await.unwrap();

  let date = chrono::NaiveDate::from_ymd_opt(2024, 7, 1);
  bridge.set_deadline("ABC-1", date).await.unwrap();
  bridge.set_priority("ABC-1", 'a').await.unwrap();
  bridge.set_assignee("ABC-1", &Assignee::Me).await.unwrap();
  bridge.set_issue_type("ABC-1", "Bug").await.unwrap();
  bridge.set_epic("ABC-1", "ABC-2").await.unwrap();

  let h = heading(&mirror, "ABC-1");
  assert_eq!(h.deadline, date);
  assert_eq!(h.priority, Some('A'));
  assert_eq!(h.assignee.as_deref(), Some("alice"));
  assert_eq!(h.property("ISSUETYPE"), Some("Bug"));
  assert_eq!(parent_id(&mirror, "ABC-1").as_deref(), Some("ABC-2"));

  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.set_deadline("ABC-1", None).await.unwrap();
  bridge.set_assignee("ABC-1", &Assignee::Nobody).await.unwrap();
  let h = heading(&mirror, "ABC-1");
  assert_eq!(h.deadline, None);
  assert_eq!(h.assignee, None);
}

#[tokio::test]
async fn unknown_priority_letter_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let err = Bridge::new(&config, &mock, &mut mirror)
    .set_priority("ABC-1", 'Z')
    .await
    .unwrap_err();
  assert!(matches!(err, EjiraError::Precondition(_)));
  assert!(mock.calls().iter().all(|c| !c.starts_with("update")));
}

#[tokio::test]
async fn set_epic_needs_configured_field() {
  let dir = tempfile::tempdir().unwrap();
  let mut config = config(&dir);
  config.fields.epic_link = None;
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");
  mock.add_issue("ABC-2", "Epic", "epic");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let err = Bridge::new(&config, &mock, &mut mirror)
    .set_epic("ABC-1", "ABC-2")
    .await
    .unwrap_err();
  assert!(matches!(err, EjiraError::Config(_)));
}

// --- comments ---

#[tokio::test]
async fn add_and_delete_comment() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.pull("ABC-1").await.unwrap();

  let id = bridge.add_comment("ABC-1", "Looks /good/").await.unwrap();
  assert_eq!(id.to_string(), "ABC-1/10001");

  let remote = mock.issue("ABC-1").unwrap();
  assert_eq!(remote.fields.comment.unwrap().comments[0].body, "Looks _good_");

  let comment = heading(&mirror, "ABC-1/10001");
  assert_eq!(comment.kind(), Some(ItemKind::Comment));
  assert_eq!(comment.body, "Looks /good/");
  assert_eq!(comment.title, "alice (2024-01-01 09:00)");
  let section = heading(&mirror, "ABC-1").child_by_title(COMMENTS_HEADING).unwrap();
  assert_eq!(section.children.len(), 1);

  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.delete_comment("ABC-1/10001").await.unwrap();
  assert!(mirror.locate("ABC-1/10001").is_none());
  let remote = mock.issue("ABC-1").unwrap();
  assert!(remote.fields.comment.unwrap().comments.is_empty());
}

#[tokio::test]
async fn edited_comment_is_pushed_and_survives_pull() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let id = Bridge::new(&config, &mock, &mut mirror)
    .add_comment("ABC-1", "first")
    .await
    .unwrap()
    .to_string();
  {
    let loc = mirror.locate(&id).unwrap();
    mirror.heading_mut(&loc).unwrap().body = "second".into();
  }

  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  bridge.push(&id).await.unwrap();
  bridge.pull("ABC-1").await.unwrap();

  assert_eq!(heading(&mirror, &id).body, "second");
  let remote = mock.issue("ABC-1").unwrap();
  assert_eq!(remote.fields.comment.unwrap().comments[0].body, "second");
}

#[tokio::test]
async fn pull_refreshes_a_single_comment() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let id = Bridge::new(&config, &mock, &mut mirror)
    .add_comment("ABC-1", "first")
    .await
    .unwrap()
    .to_string();
  assert_eq!(id, "ABC-1/10001");

  mock.edit_comment("ABC-1", "10001", "edited remotely").await.unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .pull(&id)
    .await
    .unwrap();

  assert_eq!(heading(&mirror, &id).body, "edited remotely");
  assert_eq!(heading(&mirror, &id).kind(), Some(ItemKind::Comment));
}

#[tokio::test]
async fn pulling_a_comment_mirrors_its_issue() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");
  mock.add_comment("ABC-1", "hello").await.unwrap();

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .pull("ABC-1/10001")
    .await
    .unwrap();

  assert_eq!(heading(&mirror, "ABC-1").title, "one");
  assert_eq!(heading(&mirror, "ABC-1/10001").body, "hello");
  let loc = mirror.locate("ABC-1/10001").unwrap();
  let section = mirror.parent(&loc).unwrap();
  assert_eq!(mirror.heading(&section).unwrap().title, COMMENTS_HEADING);
  assert_eq!(
    mirror.enclosing(&loc, ItemKind::Issue),
    mirror.locate("ABC-1")
  );
}

#[tokio::test]
async fn setting_type_of_a_comment_fails() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  let mut bridge = Bridge::new(&config, &mock, &mut mirror);
  let id = bridge.add_comment("ABC-1", "hello").await.unwrap();

  let err = bridge
    .set_issue_type(&id.to_string(), "Bug")
    .await
    .unwrap_err();
  assert!(matches!(err, EjiraError::Precondition(_)));
  assert!(mock.calls().iter().all(|c| !c.starts_with("update")));
}

// --- persistence ---

#[tokio::test]
async fn mirror_survives_save_and_load() {
  let dir = tempfile::tempdir().unwrap();
  let config = config(&dir);
  let mock = tracker();
  mock.add_issue("ABC-1", "Task", "one");
  mock.add_issue("ABC-2", "Task", "two");

  let mut mirror = Mirror::load(&config.mirror_dir).unwrap();
  Bridge::new(&config, &mock, &mut mirror)
    .sync_project("ABC", false)
    .await
    .unwrap();
  mirror.save().unwrap();

  let mut reloaded = Mirror::load(&config.mirror_dir).unwrap();
  assert_eq!(reloaded.outline("ABC"), mirror.outline("ABC"));

  mock.resolve("ABC-1", "Done");
  Bridge::new(&config, &mock, &mut reloaded)
    .sync_project("ABC", false)
    .await
    .unwrap();
  assert!(is_resolved(&reloaded, "ABC-1"));
}
