use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::lifecycle::{authorize, Action};
use crate::models::{TaskPriority, TaskStatus, TodoItem, User, UserTaskCounts};
use crate::reports::spreadsheet::{column, Cell, Column, Table};

const TASK_COLUMNS: &[Column] = &[
    column("Task ID", 38.0),
    column("Title", 30.0),
    column("Description", 50.0),
    column("Priority", 12.0),
    column("Status", 14.0),
    column("Due Date", 14.0),
    column("Progress (%)", 12.0),
    column("Checklist (done/total)", 20.0),
    column("Assigned To", 40.0),
];

const USER_COLUMNS: &[Column] = &[
    column("User Name", 28.0),
    column("Email", 36.0),
    column("Role", 10.0),
    column("Total Assigned Tasks", 20.0),
    column("Pending Tasks", 16.0),
    column("In Progress Tasks", 18.0),
    column("Completed Tasks", 18.0),
];

/// A task flattened for export, assignees already rendered as `name (email)`.
#[derive(Debug, Clone, FromRow)]
pub struct TaskExportRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub progress: i32,
    pub todo_checklist: Json<Vec<TodoItem>>,
    pub assignees: Vec<String>,
}

impl TaskExportRow {
    /// All tasks, newest first, in a single statement.
    pub async fn fetch_all(pool: &PgPool) -> Result<Vec<TaskExportRow>, AppError> {
        let rows = sqlx::query_as::<_, TaskExportRow>(
            "SELECT t.id, t.title, t.description, t.priority, t.status, t.due_date, t.progress, \
                    t.todo_checklist, \
                    ARRAY( \
                        SELECT u.name || ' (' || u.email || ')' \
                        FROM users u \
                        WHERE u.id = ANY(t.assigned_to) \
                        ORDER BY array_position(t.assigned_to, u.id) \
                    ) AS assignees \
             FROM tasks t \
             ORDER BY t.created_at DESC",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    fn cells(&self) -> Vec<Cell> {
        let checklist = &self.todo_checklist.0;
        let done = checklist.iter().filter(|item| item.completed).count();

        vec![
            Cell::from(self.id.to_string()),
            Cell::from(self.title.as_str()),
            Cell::from(self.description.as_deref().unwrap_or("")),
            Cell::from(self.priority.label()),
            Cell::from(self.status.label()),
            Cell::from(self.due_date.format("%Y-%m-%d").to_string()),
            Cell::from(self.progress),
            Cell::from(format!("{}/{}", done, checklist.len())),
            Cell::from(self.assignees.join(", ")),
        ]
    }
}

fn user_cells(user: &UserTaskCounts) -> Vec<Cell> {
    vec![
        Cell::from(user.name.as_str()),
        Cell::from(user.email.as_str()),
        Cell::from(user.role.as_str()),
        Cell::from(user.total_tasks),
        Cell::from(user.pending_tasks),
        Cell::from(user.in_progress_tasks),
        Cell::from(user.completed_tasks),
    ]
}

pub fn tasks_table(rows: &[TaskExportRow]) -> Table {
    Table {
        sheet_name: "Tasks Report",
        columns: TASK_COLUMNS,
        rows: rows.iter().map(TaskExportRow::cells).collect(),
    }
}

pub fn users_table(users: &[UserTaskCounts]) -> Table {
    Table {
        sheet_name: "Users Report",
        columns: USER_COLUMNS,
        rows: users.iter().map(user_cells).collect(),
    }
}

/// Admin-only snapshot of every task.
pub async fn export_tasks(pool: &PgPool, actor: &AuthenticatedUser) -> Result<Table, AppError> {
    authorize(actor, Action::ExportReports, None)?;
    let rows = TaskExportRow::fetch_all(pool).await?;
    Ok(tasks_table(&rows))
}

/// Admin-only snapshot of every user with per-status task counts.
pub async fn export_users(pool: &PgPool, actor: &AuthenticatedUser) -> Result<Table, AppError> {
    authorize(actor, Action::ExportReports, None)?;
    let users = User::list_with_task_counts(pool, None).await?;
    Ok(users_table(&users))
}
