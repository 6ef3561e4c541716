//! SQLite-based task store.

use super::{StoreError, TaskStore};
use crate::task::{
    apply_direct_update, now_string, Priority, Subtask, SubtaskId, SubtaskPatch, Task, TaskDetail,
    TaskFilter, TaskId, TaskPatch,
};
use crate::user::{normalize_email, User, UserId, UserSettings};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_settings (
    user_id TEXT PRIMARY KEY NOT NULL,
    theme TEXT NOT NULL DEFAULT 'light',
    notifications_enabled INTEGER NOT NULL DEFAULT 1,
    default_view TEXT NOT NULL DEFAULT 'calendar',
    first_day_of_week TEXT NOT NULL DEFAULT 'monday',
    date_format TEXT NOT NULL DEFAULT '24-hour',
    language TEXT NOT NULL DEFAULT 'en-US',
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    notes TEXT,
    date TEXT NOT NULL,
    start_time TEXT,
    end_time TEXT,
    color TEXT,
    icon TEXT,
    is_all_day INTEGER NOT NULL DEFAULT 0,
    is_anytime INTEGER NOT NULL DEFAULT 0,
    repeat TEXT,
    completed INTEGER NOT NULL DEFAULT 0,
    category TEXT,
    priority TEXT NOT NULL DEFAULT 'medium',
    progress INTEGER NOT NULL DEFAULT 0,
    due_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_user_date ON tasks(user_id, date, start_time);

CREATE TABLE IF NOT EXISTS subtasks (
    id TEXT PRIMARY KEY NOT NULL,
    task_id TEXT NOT NULL,
    title TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id);
"#;

const TASK_COLUMNS: &str = "id, user_id, title, notes, date, start_time, end_time, color, icon,
     is_all_day, is_anytime, repeat, completed, category, priority, progress, due_date,
     created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Open (or create) the database file and apply the schema.
    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            tracing::debug!("Opened task database at {}", db_path.display());
            Ok::<_, StoreError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(14)?;
    let progress: i64 = row.get(15)?;
    Ok(Task {
        id: TaskId::from_uuid(uuid_at(row, 0)?),
        user_id: UserId::from_uuid(uuid_at(row, 1)?),
        title: row.get(2)?,
        notes: row.get(3)?,
        date: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        color: row.get(7)?,
        icon: row.get(8)?,
        is_all_day: row.get(9)?,
        is_anytime: row.get(10)?,
        repeat: row.get(11)?,
        completed: row.get(12)?,
        category: row.get(13)?,
        priority: Priority::parse(&priority),
        progress: progress.clamp(0, 100) as u8,
        due_date: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn parse_subtask(row: &Row<'_>) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: SubtaskId::from_uuid(uuid_at(row, 0)?),
        task_id: TaskId::from_uuid(uuid_at(row, 1)?),
        title: row.get(2)?,
        completed: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn parse_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::from_uuid(uuid_at(row, 0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn load_task(conn: &Connection, id: TaskId) -> Result<Option<Task>, StoreError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], parse_task)
        .optional()?)
}

fn load_subtasks(conn: &Connection, task_id: TaskId) -> Result<Vec<Subtask>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, title, completed, created_at, updated_at
         FROM subtasks WHERE task_id = ?1 ORDER BY rowid",
    )?;
    let subtasks = stmt
        .query_map(params![task_id.to_string()], parse_subtask)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subtasks)
}

fn load_subtask(conn: &Connection, id: SubtaskId) -> Result<Option<Subtask>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, task_id, title, completed, created_at, updated_at
             FROM subtasks WHERE id = ?1",
            params![id.to_string()],
            parse_subtask,
        )
        .optional()?)
}

fn load_detail(conn: &Connection, id: TaskId) -> Result<Option<TaskDetail>, StoreError> {
    match load_task(conn, id)? {
        Some(task) => {
            let subtasks = load_subtasks(conn, id)?;
            Ok(Some(TaskDetail { task, subtasks }))
        }
        None => Ok(None),
    }
}

fn write_task(conn: &Connection, task: &Task) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE tasks SET title = ?2, notes = ?3, date = ?4, start_time = ?5, end_time = ?6,
                color = ?7, icon = ?8, is_all_day = ?9, is_anytime = ?10, repeat = ?11,
                completed = ?12, category = ?13, priority = ?14, progress = ?15, due_date = ?16,
                updated_at = ?17
         WHERE id = ?1",
        params![
            task.id.to_string(),
            task.title,
            task.notes,
            task.date,
            task.start_time,
            task.end_time,
            task.color,
            task.icon,
            task.is_all_day,
            task.is_anytime,
            task.repeat,
            task.completed,
            task.category,
            task.priority.as_str(),
            task.progress as i64,
            task.due_date,
            task.updated_at,
        ],
    )?;
    Ok(())
}

/// Recompute progress and completion for `task_id` from its stored subtasks.
fn reconcile_task(conn: &Connection, task_id: TaskId) -> Result<(), StoreError> {
    let Some(mut task) = load_task(conn, task_id)? else {
        return Ok(());
    };
    let subtasks = load_subtasks(conn, task_id)?;
    task.apply_reconciliation(&subtasks);
    task.touch();
    conn.execute(
        "UPDATE tasks SET progress = ?2, completed = ?3, updated_at = ?4 WHERE id = ?1",
        params![task_id.to_string(), task.progress as i64, task.completed, task.updated_at],
    )?;
    Ok(())
}

fn email_taken(conn: &Connection, email: &str, except: UserId) -> Result<bool, StoreError> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE email = ?1 AND id != ?2",
            params![email, except.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskDetail>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            load_detail(&conn, id)
        })
        .await?
    }

    async fn get_subtask(&self, id: SubtaskId) -> Result<Option<Subtask>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            load_subtask(&conn, id)
        })
        .await?
    }

    async fn list_tasks(&self, user_id: UserId, filter: &TaskFilter) -> Result<Vec<TaskDetail>, StoreError> {
        let conn = self.conn.clone();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let sql = format!(
                "SELECT {} FROM tasks
                 WHERE user_id = ?1
                   AND (?2 IS NULL OR date = ?2)
                   AND (?3 IS NULL OR completed = ?3)
                 ORDER BY date, start_time, created_at
                 LIMIT ?4 OFFSET ?5",
                TASK_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(
                    params![
                        user_id.to_string(),
                        filter.date,
                        filter.completed,
                        filter.limit as i64,
                        filter.skip as i64
                    ],
                    parse_task,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            tasks
                .into_iter()
                .map(|task| {
                    let subtasks = load_subtasks(&conn, task.id)?;
                    Ok::<_, StoreError>(TaskDetail { task, subtasks })
                })
                .collect()
        })
        .await?
    }

    async fn create_task(&self, task: Task) -> Result<TaskDetail, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let sql = format!(
                "INSERT INTO tasks ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                TASK_COLUMNS
            );
            conn.execute(
                &sql,
                params![
                    task.id.to_string(),
                    task.user_id.to_string(),
                    task.title,
                    task.notes,
                    task.date,
                    task.start_time,
                    task.end_time,
                    task.color,
                    task.icon,
                    task.is_all_day,
                    task.is_anytime,
                    task.repeat,
                    task.completed,
                    task.category,
                    task.priority.as_str(),
                    task.progress as i64,
                    task.due_date,
                    task.created_at,
                    task.updated_at,
                ],
            )?;
            Ok(TaskDetail {
                task,
                subtasks: Vec::new(),
            })
        })
        .await?
    }

    async fn create_subtask(&self, subtask: Subtask) -> Result<Option<Subtask>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            if load_task(&tx, subtask.task_id)?.is_none() {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO subtasks (id, task_id, title, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    subtask.id.to_string(),
                    subtask.task_id.to_string(),
                    subtask.title,
                    subtask.completed,
                    subtask.created_at,
                    subtask.updated_at,
                ],
            )?;
            reconcile_task(&tx, subtask.task_id)?;
            tx.commit()?;
            Ok(Some(subtask))
        })
        .await?
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<TaskDetail>, StoreError> {
        let conn = self.conn.clone();
        let patch = patch.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let Some(mut task) = load_task(&tx, id)? else {
                return Ok(None);
            };
            let subtasks = load_subtasks(&tx, id)?;
            apply_direct_update(&mut task, &patch, &subtasks);
            write_task(&tx, &task)?;
            tx.commit()?;
            Ok(Some(TaskDetail { task, subtasks }))
        })
        .await?
    }

    async fn update_subtask(&self, id: SubtaskId, patch: &SubtaskPatch) -> Result<Option<Subtask>, StoreError> {
        let conn = self.conn.clone();
        let patch = patch.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let Some(mut subtask) = load_subtask(&tx, id)? else {
                return Ok(None);
            };
            patch.apply(&mut subtask);
            tx.execute(
                "UPDATE subtasks SET title = ?2, completed = ?3, updated_at = ?4 WHERE id = ?1",
                params![id.to_string(), subtask.title, subtask.completed, subtask.updated_at],
            )?;
            reconcile_task(&tx, subtask.task_id)?;
            tx.commit()?;
            Ok(Some(subtask))
        })
        .await?
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
            Ok(rows > 0)
        })
        .await?
    }

    async fn delete_subtask(&self, id: SubtaskId) -> Result<bool, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let Some(subtask) = load_subtask(&tx, id)? else {
                return Ok(false);
            };
            tx.execute("DELETE FROM subtasks WHERE id = ?1", params![id.to_string()])?;
            reconcile_task(&tx, subtask.task_id)?;
            tx.commit()?;
            Ok(true)
        })
        .await?
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            if email_taken(&tx, &user.email, user.id)? {
                return Err(StoreError::DuplicateEmail);
            }
            let sql = format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", USER_COLUMNS);
            tx.execute(
                &sql,
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            let settings = UserSettings::default();
            tx.execute(
                "INSERT INTO user_settings
                    (user_id, theme, notifications_enabled, default_view, first_day_of_week, date_format, language)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    settings.theme,
                    settings.notifications_enabled,
                    settings.default_view,
                    settings.first_day_of_week,
                    settings.date_format,
                    settings.language,
                ],
            )?;
            tx.commit()?;
            Ok(user)
        })
        .await?
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
            Ok(conn.query_row(&sql, params![id.to_string()], parse_user).optional()?)
        })
        .await?
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.clone();
        let email = normalize_email(email);

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
            Ok(conn.query_row(&sql, params![email], parse_user).optional()?)
        })
        .await?
    }

    async fn update_user(&self, mut user: User) -> Result<Option<User>, StoreError> {
        let conn = self.conn.clone();
        user.email = normalize_email(&user.email);
        user.updated_at = now_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            if email_taken(&tx, &user.email, user.id)? {
                return Err(StoreError::DuplicateEmail);
            }
            let rows = tx.execute(
                "UPDATE users SET name = ?2, email = ?3, password_hash = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok((rows > 0).then_some(user))
        })
        .await?
    }

    async fn get_user_settings(&self, id: UserId) -> Result<Option<UserSettings>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            Ok(conn
                .query_row(
                    "SELECT theme, notifications_enabled, default_view, first_day_of_week, date_format, language
                     FROM user_settings WHERE user_id = ?1",
                    params![id.to_string()],
                    |row| {
                        Ok(UserSettings {
                            theme: row.get(0)?,
                            notifications_enabled: row.get(1)?,
                            default_view: row.get(2)?,
                            first_day_of_week: row.get(3)?,
                            date_format: row.get(4)?,
                            language: row.get(5)?,
                        })
                    },
                )
                .optional()?)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteTaskStore::open(dir.path().join("nested").join("tasks.db"))
            .await
            .expect("Failed to open store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_subtask_changes_reconcile_task() {
        let (_dir, store) = open_store().await;
        contract::subtask_changes_reconcile_task(&store).await;
    }

    #[tokio::test]
    async fn test_direct_update_recomputes_progress() {
        let (_dir, store) = open_store().await;
        contract::direct_update_recomputes_progress(&store).await;
    }

    #[tokio::test]
    async fn test_direct_update_follows_subtask_completion() {
        let (_dir, store) = open_store().await;
        contract::direct_update_follows_subtask_completion(&store).await;
    }

    #[tokio::test]
    async fn test_deleting_task_cascades() {
        let (_dir, store) = open_store().await;
        contract::deleting_task_cascades(&store).await;
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (_dir, store) = open_store().await;
        contract::list_filters_and_pages(&store).await;
    }

    #[tokio::test]
    async fn test_users_and_settings() {
        let (_dir, store) = open_store().await;
        contract::users_and_settings(&store).await;
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("tasks.db");

        let task_id = {
            let store = SqliteTaskStore::open(path.clone()).await.expect("Failed to open store");
            let user = contract::seed_user(&store, "persist@example.com").await;
            contract::seed_task(&store, &user, "Water plants", "2024-07-01").await.id
        };

        let store = SqliteTaskStore::open(path).await.expect("Failed to reopen store");
        assert!(store.is_persistent());
        let detail = store
            .get_task(task_id)
            .await
            .expect("Failed to get task")
            .expect("Task not found");
        assert_eq!(detail.task.title, "Water plants");
    }
}
