use rusqlite::Connection;
use taskpulse_core::db::migrations::latest_version;
use taskpulse_core::db::open_db_in_memory;
use taskpulse_core::{
    RepoError, SqliteTaskRepository, Task, TaskListQuery, TaskRepository, TaskStatus,
};
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let task = Task::new("write report", 1_700_000_000_000);
    let id = repo.create_task(&task).unwrap();

    let loaded = repo.get_task(id, false).unwrap().unwrap();
    assert_eq!(loaded.id, task.id);
    assert_eq!(loaded.title, "write report");
    assert_eq!(loaded.assigned_date, 1_700_000_000_000);
    assert_eq!(loaded.status, TaskStatus::NotStarted);
    assert!(!loaded.reminder_enabled);
    assert_eq!(loaded.reminder_time, task.assigned_date);
    assert!(!loaded.is_deleted);
}

#[test]
fn save_task_persists_all_editable_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let mut task = Task::new("draft", 1_000);
    repo.create_task(&task).unwrap();

    task.title = "final title".to_string();
    task.content = "detailed description".to_string();
    task.assigned_date = 2_000;
    task.status = TaskStatus::InProgress;
    task.reminder_enabled = true;
    task.reminder_time = 1_500;
    repo.save_task(&task).unwrap();

    let loaded = repo.get_task(task.id, false).unwrap().unwrap();
    assert_eq!(loaded.title, "final title");
    assert_eq!(loaded.content, "detailed description");
    assert_eq!(loaded.assigned_date, 2_000);
    assert_eq!(loaded.status, TaskStatus::InProgress);
    assert!(loaded.reminder_enabled);
    assert_eq!(loaded.reminder_time, 1_500);
}

#[test]
fn save_unknown_task_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let task = Task::new("missing", 0);
    let err = repo.save_task(&task).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == task.id));
}

#[test]
fn soft_delete_hides_task_from_default_reads_and_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let task = Task::new("obsolete", 0);
    repo.create_task(&task).unwrap();

    repo.soft_delete_task(task.id).unwrap();
    repo.soft_delete_task(task.id).unwrap();

    assert!(repo.get_task(task.id, false).unwrap().is_none());
    let tombstone = repo.get_task(task.id, true).unwrap().unwrap();
    assert!(tombstone.is_deleted);
}

#[test]
fn remove_task_hard_deletes_the_row() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let task = Task::new("temporary", 0);
    repo.create_task(&task).unwrap();
    repo.remove_task(task.id).unwrap();

    assert!(repo.get_task(task.id, true).unwrap().is_none());
    let err = repo.remove_task(task.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == task.id));
}

#[test]
fn list_excludes_deleted_by_default_and_can_include_them() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let task_a = Task::new("active", 0);
    let task_b = Task::new("deleted later", 0);
    repo.create_task(&task_a).unwrap();
    repo.create_task(&task_b).unwrap();
    repo.soft_delete_task(task_b.id).unwrap();

    let visible = repo.list_tasks(&TaskListQuery::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, task_a.id);

    let include_deleted = TaskListQuery {
        include_deleted: true,
        ..TaskListQuery::default()
    };
    let all = repo.list_tasks(&include_deleted).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn list_filters_by_status() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let mut started = Task::new("started", 0);
    started.status = TaskStatus::InProgress;
    let fresh = Task::new("fresh", 0);
    repo.create_task(&started).unwrap();
    repo.create_task(&fresh).unwrap();

    let query = TaskListQuery {
        status: Some(TaskStatus::InProgress),
        ..TaskListQuery::default()
    };
    let result = repo.list_tasks(&query).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, started.id);
}

#[test]
fn list_pagination_with_limit_and_offset_is_stable() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();

    let task_a = task_with_fixed_id("00000000-0000-4000-8000-000000000001", "a");
    let task_b = task_with_fixed_id("00000000-0000-4000-8000-000000000002", "b");
    let task_c = task_with_fixed_id("00000000-0000-4000-8000-000000000003", "c");
    repo.create_task(&task_c).unwrap();
    repo.create_task(&task_a).unwrap();
    repo.create_task(&task_b).unwrap();

    conn.execute("UPDATE tasks SET updated_at = 1234567890000;", [])
        .unwrap();

    let repo = SqliteTaskRepository::try_new(&mut conn).unwrap();
    let query = TaskListQuery {
        limit: Some(2),
        offset: 1,
        ..TaskListQuery::default()
    };
    let page = repo.list_tasks(&query).unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, task_b.id);
    assert_eq!(page[1].id, task_c.id);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match SqliteTaskRepository::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_tables() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteTaskRepository::try_new(&mut conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("tasks"))
    ));
}

fn task_with_fixed_id(id: &str, title: &str) -> Task {
    Task::with_id(Uuid::parse_str(id).unwrap(), title, 0)
}
