//! Task lifecycle rules: who may do what to a task, and how checklist progress and
//! status move together.
//!
//! Everything here is pure. Route handlers load a task, run one of the `apply_*`
//! functions against the caller, and write the result back to the task store.

use std::fmt;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{CreateTaskInput, Task, TaskStatus, TodoItem, UpdateTaskInput};

/// Every operation that needs an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateTask,
    DeleteTask,
    /// Title, description, priority, due date, attachments.
    EditTaskDetails,
    ReassignTask,
    UpdateStatus,
    UpdateChecklist,
    ViewTask,
    ViewAllTasks,
    ViewAdminDashboard,
    ViewUsers,
    ExportReports,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Action::CreateTask => "create tasks",
            Action::DeleteTask => "delete tasks",
            Action::EditTaskDetails => "edit task details",
            Action::ReassignTask => "reassign tasks",
            Action::UpdateStatus => "update the status of this task",
            Action::UpdateChecklist => "update the checklist of this task",
            Action::ViewTask => "view this task",
            Action::ViewAllTasks => "view all tasks",
            Action::ViewAdminDashboard => "view the admin dashboard",
            Action::ViewUsers => "view users",
            Action::ExportReports => "export reports",
        };
        f.write_str(text)
    }
}

/// The single authorization predicate. Admins may do everything; members may only
/// view, update the status of, or work the checklist of tasks they are assigned to.
pub fn can_perform(actor: &AuthenticatedUser, action: Action, task: Option<&Task>) -> bool {
    if actor.is_admin() {
        return true;
    }
    match action {
        Action::ViewTask | Action::UpdateStatus | Action::UpdateChecklist => {
            task.map_or(false, |task| task.is_assigned_to(actor.id))
        }
        Action::CreateTask
        | Action::DeleteTask
        | Action::EditTaskDetails
        | Action::ReassignTask
        | Action::ViewAllTasks
        | Action::ViewAdminDashboard
        | Action::ViewUsers
        | Action::ExportReports => false,
    }
}

pub fn authorize(
    actor: &AuthenticatedUser,
    action: Action,
    task: Option<&Task>,
) -> Result<(), AppError> {
    if can_perform(actor, action, task) {
        Ok(())
    } else {
        Err(AppError::forbidden(action))
    }
}

/// `round(100 * done / total)`, or 0 for an empty checklist.
pub fn compute_progress(items: &[TodoItem]) -> i32 {
    if items.is_empty() {
        return 0;
    }
    let done = items.iter().filter(|item| item.completed).count();
    (done as f64 * 100.0 / items.len() as f64).round() as i32
}

/// Trims item texts and rejects blank ones.
fn normalize_checklist(items: Vec<TodoItem>) -> Result<Vec<TodoItem>, AppError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let text = item.text.trim();
            if text.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "Checklist item {} has no text",
                    index + 1
                )));
            }
            Ok(TodoItem::new(text, item.completed))
        })
        .collect()
}

/// Trimmed task title; a blank title is a validation error.
fn normalize_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::ValidationError("Task title is required".into()));
    }
    Ok(title.to_string())
}

/// Blank descriptions are stored as none.
fn normalize_description(description: &str) -> Option<String> {
    Some(description.to_string()).filter(|d| !d.trim().is_empty())
}

/// Removes repeated ids, keeping first occurrences in order. Fails on an empty list.
pub fn normalize_assignees(ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
    let mut unique: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    if unique.is_empty() {
        return Err(AppError::ValidationError(
            "At least one assignee is required".into(),
        ));
    }
    Ok(unique)
}

fn set_status(task: &mut Task, status: TaskStatus) {
    if status == TaskStatus::Completed {
        for item in &mut task.todo_checklist {
            item.completed = true;
        }
        task.progress = 100;
    } else {
        task.progress = compute_progress(&task.todo_checklist);
    }
    task.status = status;
}

fn set_checklist(task: &mut Task, items: Vec<TodoItem>) {
    task.progress = compute_progress(&items);
    task.todo_checklist = items;
    task.status = if task.progress == 100 {
        TaskStatus::Completed
    } else {
        TaskStatus::InProgress
    };
}

/// Builds a new task for an admin. Assignee existence is checked by the caller
/// against the identity store.
pub fn new_task(actor: &AuthenticatedUser, input: CreateTaskInput) -> Result<Task, AppError> {
    authorize(actor, Action::CreateTask, None)?;

    let title = normalize_title(&input.title)?;
    let assigned_to = normalize_assignees(&input.assigned_to)?;
    // A new task starts at zero progress, so nothing on its checklist is done yet.
    let todo_checklist = normalize_checklist(input.todo_checklist)?
        .into_iter()
        .map(|item| TodoItem::new(item.text, false))
        .collect();

    let now = Utc::now();
    Ok(Task {
        id: Uuid::new_v4(),
        title,
        description: input.description.as_deref().and_then(normalize_description),
        priority: input.priority.unwrap_or_default(),
        status: TaskStatus::Pending,
        due_date: input.due_date,
        assigned_to,
        attachments: input.attachments,
        todo_checklist,
        progress: 0,
        created_by: actor.id,
        created_at: now,
        updated_at: now,
    })
}

/// Explicit status write. `completed` checks off the whole checklist; any other
/// status keeps the checklist and recomputes progress from it.
pub fn apply_status(
    actor: &AuthenticatedUser,
    task: &mut Task,
    status: TaskStatus,
) -> Result<(), AppError> {
    authorize(actor, Action::UpdateStatus, Some(task))?;
    set_status(task, status);
    task.updated_at = Utc::now();
    Ok(())
}

/// Replaces the checklist and derives status from the new progress: 100 means
/// `completed`, anything less means `in_progress`.
pub fn apply_checklist(
    actor: &AuthenticatedUser,
    task: &mut Task,
    items: Vec<TodoItem>,
) -> Result<(), AppError> {
    authorize(actor, Action::UpdateChecklist, Some(task))?;
    let items = normalize_checklist(items)?;
    set_checklist(task, items);
    task.updated_at = Utc::now();
    Ok(())
}

/// Which detail fields of `input` would actually change `task`.
fn changed_details(task: &Task, input: &UpdateTaskInput) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if matches!(&input.title, Some(title) if title.trim() != task.title) {
        changed.push("title");
    }
    if matches!(&input.description, Some(d) if normalize_description(d) != task.description) {
        changed.push("description");
    }
    if matches!(input.priority, Some(priority) if priority != task.priority) {
        changed.push("priority");
    }
    if matches!(input.due_date, Some(due) if due != task.due_date) {
        changed.push("dueDate");
    }
    if matches!(&input.attachments, Some(attachments) if *attachments != task.attachments) {
        changed.push("attachments");
    }
    changed
}

fn reassigns(task: &Task, input: &UpdateTaskInput) -> bool {
    match &input.assigned_to {
        Some(ids) => normalize_assignees(ids).map_or(true, |ids| ids != task.assigned_to),
        None => false,
    }
}

/// General task update.
///
/// Admins may change any field. Other callers must be assignees and may only touch
/// the checklist and status; sending another field with a different value fails with
/// `Forbidden`. A new checklist is applied first, then an explicit status, so the
/// explicit status wins for this call.
///
/// Returns the assignee list to verify against the identity store when the update
/// reassigns the task.
pub fn apply_update(
    actor: &AuthenticatedUser,
    task: &mut Task,
    input: UpdateTaskInput,
) -> Result<Option<Vec<Uuid>>, AppError> {
    if !actor.is_admin() {
        authorize(actor, Action::ViewTask, Some(task))?;
    }
    if !changed_details(task, &input).is_empty() {
        authorize(actor, Action::EditTaskDetails, Some(task))?;
    }
    if reassigns(task, &input) {
        authorize(actor, Action::ReassignTask, Some(task))?;
    }

    let title = input.title.as_deref().map(normalize_title).transpose()?;

    let mut reassigned = None;
    if let Some(ids) = &input.assigned_to {
        let ids = normalize_assignees(ids)?;
        if ids != task.assigned_to {
            reassigned = Some(ids.clone());
        }
        task.assigned_to = ids;
    }
    if let Some(title) = title {
        task.title = title;
    }
    if let Some(description) = input.description {
        task.description = normalize_description(&description);
    }
    if let Some(priority) = input.priority {
        task.priority = priority;
    }
    if let Some(due_date) = input.due_date {
        task.due_date = due_date;
    }
    if let Some(attachments) = input.attachments {
        task.attachments = attachments;
    }
    if let Some(items) = input.todo_checklist {
        apply_checklist(actor, task, items)?;
    }
    if let Some(status) = input.status {
        apply_status(actor, task, status)?;
    }

    task.updated_at = Utc::now();
    Ok(reassigned)
}

/// Fails with `InvalidAssignee` for the first id the identity store did not resolve.
pub fn ensure_assignees_exist(missing: &[Uuid]) -> Result<(), AppError> {
    match missing.first() {
        Some(id) => Err(AppError::invalid_assignee(*id)),
        None => Ok(()),
    }
}

/// Admins see everything; members only what they are assigned to.
pub fn visible_assignee_scope(actor: &AuthenticatedUser) -> Option<Uuid> {
    if can_perform(actor, Action::ViewAllTasks, None) {
        None
    } else {
        Some(actor.id)
    }
}
