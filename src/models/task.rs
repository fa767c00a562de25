use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::user::UserRef;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Nobody has touched the task yet.
    #[default]
    Pending,
    InProgress,
    /// Every checklist item is done, or an explicit status write said so.
    Completed,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

/// One checklist entry of a task.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    pub fn new(text: impl Into<String>, completed: bool) -> Self {
        Self {
            text: text.into(),
            completed,
        }
    }
}

/// A task as held by the task store and returned by the API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    /// Assignee user ids, de-duplicated, in assignment order.
    pub assigned_to: Vec<Uuid>,
    pub attachments: Vec<String>,
    pub todo_checklist: Vec<TodoItem>,
    /// Percentage of checklist items done, 0..=100.
    pub progress: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assigned_to.contains(&user_id)
    }

    pub fn completed_todo_count(&self) -> usize {
        self.todo_checklist.iter().filter(|item| item.completed).count()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.due_date < now
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    priority: TaskPriority,
    status: TaskStatus,
    due_date: DateTime<Utc>,
    assigned_to: Vec<Uuid>,
    attachments: Vec<String>,
    todo_checklist: Json<Vec<TodoItem>>,
    progress: i32,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            priority: row.priority,
            status: row.status,
            due_date: row.due_date,
            assigned_to: row.assigned_to,
            attachments: row.attachments,
            todo_checklist: row.todo_checklist.0,
            progress: row.progress,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Payload for `POST /api/tasks`.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub due_date: DateTime<Utc>,

    #[validate(length(min = 1, message = "At least one assignee is required"))]
    pub assigned_to: Vec<Uuid>,

    #[serde(default)]
    pub attachments: Vec<String>,

    #[serde(default)]
    pub todo_checklist: Vec<TodoItem>,
}

/// Payload for `PUT /api/tasks/{id}`. Absent fields are left untouched.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub due_date: Option<DateTime<Utc>>,

    pub assigned_to: Option<Vec<Uuid>>,

    pub attachments: Option<Vec<String>>,

    pub todo_checklist: Option<Vec<TodoItem>>,

    pub status: Option<TaskStatus>,
}

/// Payload for `PUT /api/tasks/{id}/status`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatusUpdate {
    pub status: TaskStatus,
}

/// Payload for `PUT /api/tasks/{id}/todo`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistUpdate {
    pub todo_checklist: Vec<TodoItem>,
}

/// Query parameters for `GET /api/tasks`.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

/// Task list entry with its number of checked checklist items.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    #[serde(flatten)]
    pub task: Task,
    pub completed_todo_count: usize,
}

impl From<Task> for TaskListItem {
    fn from(task: Task) -> Self {
        let completed_todo_count = task.completed_todo_count();
        Self {
            task,
            completed_todo_count,
        }
    }
}

/// Per-status counts over everything the caller can see, regardless of filter.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub all: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<TaskListItem>,
    pub status_summary: StatusSummary,
}

/// A single task with its assignees resolved to user references.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub assignees: Vec<UserRef>,
}

const TASK_COLUMNS: &str = "id, title, description, priority, status, due_date, assigned_to, \
     attachments, todo_checklist, progress, created_by, created_at, updated_at";

impl Task {
    pub async fn insert(pool: &PgPool, task: &Task) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks (id, title, description, priority, status, due_date, assigned_to, \
                                attachments, todo_checklist, progress, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.due_date)
            .bind(&task.assigned_to)
            .bind(&task.attachments)
            .bind(Json(&task.todo_checklist))
            .bind(task.progress)
            .bind(task.created_by)
            .fetch_one(pool)
            .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Task::from))
    }

    /// Writes every mutable column back in a single statement. Concurrent writers to
    /// the same task resolve last-write-wins.
    pub async fn save(pool: &PgPool, task: &Task) -> Result<Task, AppError> {
        let sql = format!(
            "UPDATE tasks SET \
                title = $2, description = $3, priority = $4, status = $5, due_date = $6, \
                assigned_to = $7, attachments = $8, todo_checklist = $9, progress = $10, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.due_date)
            .bind(&task.assigned_to)
            .bind(&task.attachments)
            .bind(Json(&task.todo_checklist))
            .bind(task.progress)
            .fetch_optional(pool)
            .await?
            .ok_or_else(AppError::task_not_found)?;

        Ok(row.into())
    }

    /// Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists tasks, newest first. `assignee` restricts the listing to tasks that
    /// user is assigned to; `status` filters by status.
    pub async fn list(
        pool: &PgPool,
        assignee: Option<Uuid>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, AppError> {
        let mut sql = format!("SELECT {} FROM tasks", TASK_COLUMNS);
        let mut conditions: Vec<String> = Vec::new();
        let mut param_count = 1;

        if assignee.is_some() {
            conditions.push(format!("${} = ANY(assigned_to)", param_count));
            param_count += 1;
        }
        if status.is_some() {
            conditions.push(format!("status = ${}", param_count));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query_builder = sqlx::query_as::<_, TaskRow>(&sql);
        if let Some(user_id) = assignee {
            query_builder = query_builder.bind(user_id);
        }
        if let Some(status) = status {
            query_builder = query_builder.bind(status);
        }

        let rows = query_builder.fetch_all(pool).await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    pub async fn status_summary(
        pool: &PgPool,
        assignee: Option<Uuid>,
    ) -> Result<StatusSummary, AppError> {
        let summary = sqlx::query_as::<_, StatusSummary>(
            "SELECT COUNT(*) AS \"all\", \
                    COUNT(*) FILTER (WHERE status = 'pending') AS pending_tasks, \
                    COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress_tasks, \
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed_tasks \
             FROM tasks \
             WHERE ($1::uuid IS NULL OR $1 = ANY(assigned_to))",
        )
        .bind(assignee)
        .fetch_one(pool)
        .await?;

        Ok(summary)
    }
}
