use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::lifecycle::{authorize, Action};
use crate::models::{Task, TaskPriority, TaskStatus, User};

const RECENT_TASKS: usize = 10;

/// Which tasks a dashboard covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardScope {
    /// Every task in the store. Admin only.
    All,
    /// Tasks the given user is assigned to.
    AssignedTo(Uuid),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDistribution {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub all: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PriorityLevels {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub task_distribution: TaskDistribution,
    pub task_priority_levels: PriorityLevels,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentTask {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Task> for RecentTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub statistics: Statistics,
    pub charts: Charts,
    pub recent_tasks: Vec<RecentTask>,
}

/// Aggregates a task snapshot. `tasks` must be ordered newest first.
pub fn summarize(tasks: &[Task], total_users: Option<i64>, now: DateTime<Utc>) -> DashboardData {
    let mut distribution = TaskDistribution {
        all: tasks.len(),
        ..Default::default()
    };
    let mut priorities = PriorityLevels::default();
    let mut overdue = 0;

    for task in tasks {
        match task.status {
            TaskStatus::Pending => distribution.pending += 1,
            TaskStatus::InProgress => distribution.in_progress += 1,
            TaskStatus::Completed => distribution.completed += 1,
        }
        match task.priority {
            TaskPriority::Low => priorities.low += 1,
            TaskPriority::Medium => priorities.medium += 1,
            TaskPriority::High => priorities.high += 1,
        }
        if task.is_overdue(now) {
            overdue += 1;
        }
    }

    DashboardData {
        statistics: Statistics {
            total_tasks: distribution.all,
            pending_tasks: distribution.pending,
            in_progress_tasks: distribution.in_progress,
            completed_tasks: distribution.completed,
            overdue_tasks: overdue,
            total_users,
        },
        charts: Charts {
            task_distribution: distribution,
            task_priority_levels: priorities,
        },
        recent_tasks: tasks.iter().take(RECENT_TASKS).map(RecentTask::from).collect(),
    }
}

/// Builds the dashboard for `scope`. Counts come from one listing query, so all
/// figures describe the same snapshot.
pub async fn dashboard_summary(
    pool: &PgPool,
    actor: &AuthenticatedUser,
    scope: DashboardScope,
) -> Result<DashboardData, AppError> {
    let (assignee, total_users) = match scope {
        DashboardScope::All => {
            authorize(actor, Action::ViewAdminDashboard, None)?;
            (None, Some(User::count(pool).await?))
        }
        DashboardScope::AssignedTo(user_id) => {
            if user_id != actor.id {
                authorize(actor, Action::ViewAdminDashboard, None)?;
            }
            (Some(user_id), None)
        }
    };

    let tasks = Task::list(pool, assignee, None).await?;
    Ok(summarize(&tasks, total_users, Utc::now()))
}
