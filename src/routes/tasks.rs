use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::info;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    lifecycle::{self, authorize, Action},
    models::{
        ChecklistUpdate, CreateTaskInput, StatusUpdate, Task, TaskDetail, TaskListItem,
        TaskListResponse, TaskQuery, UpdateTaskInput, User,
    },
    reports::{dashboard_summary, DashboardScope},
};

async fn load_task(pool: &PgPool, id: Uuid) -> Result<Task, AppError> {
    Task::find_by_id(pool, id)
        .await?
        .ok_or_else(AppError::task_not_found)
}

async fn ensure_users_exist(pool: &PgPool, ids: &[Uuid]) -> Result<(), AppError> {
    let missing = User::missing_ids(pool, ids).await?;
    lifecycle::ensure_assignees_exist(&missing)
}

/// Lists the tasks visible to the caller, newest first.
///
/// Admins see every task; members see only tasks they are assigned to.
///
/// ## Query Parameters:
/// - `status` (optional): `pending`, `in_progress` or `completed`.
///
/// ## Responses:
/// - `200 OK`: `{tasks, statusSummary}`. Each task carries `completedTodoCount`;
///   `statusSummary` counts the caller's whole scope and ignores the filter.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    query: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let scope = lifecycle::visible_assignee_scope(&user);

    let tasks = Task::list(pool.get_ref(), scope, query.status).await?;
    let status_summary = Task::status_summary(pool.get_ref(), scope).await?;

    Ok(HttpResponse::Ok().json(TaskListResponse {
        tasks: tasks.into_iter().map(TaskListItem::from).collect(),
        status_summary,
    }))
}

/// Dashboard over every task, with the total user count. Admin only.
#[get("/dashboard-data")]
pub async fn get_dashboard_data(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let data = dashboard_summary(pool.get_ref(), &user, DashboardScope::All).await?;
    Ok(HttpResponse::Ok().json(data))
}

/// Dashboard over the tasks assigned to the caller.
#[get("/user-dashboard-data")]
pub async fn get_user_dashboard_data(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let data = dashboard_summary(pool.get_ref(), &user, DashboardScope::AssignedTo(user.id)).await?;
    Ok(HttpResponse::Ok().json(data))
}

/// Returns one task with its assignees resolved.
///
/// ## Responses:
/// - `200 OK`: The task plus `assignees: [{_id, name, email, profileImageUrl}]`.
/// - `403 Forbidden`: The caller is a member not assigned to the task.
/// - `404 Not Found`: No such task.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = load_task(pool.get_ref(), task_id.into_inner()).await?;
    authorize(&user, Action::ViewTask, Some(&task))?;

    let assignees = User::find_refs(pool.get_ref(), &task.assigned_to).await?;
    Ok(HttpResponse::Ok().json(TaskDetail { task, assignees }))
}

/// Creates a task. Admin only.
///
/// ## Request Body:
/// `title`, `dueDate` and a non-empty `assignedTo` are required; `description`,
/// `priority` (default `medium`), `attachments` and `todoChecklist` are optional.
/// The task starts `pending` with zero progress.
///
/// ## Responses:
/// - `201 Created`: The stored task.
/// - `400 Bad Request`: Invalid input or an assignee that does not exist.
/// - `403 Forbidden`: The caller is not an admin.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    payload: web::Json<CreateTaskInput>,
) -> Result<impl Responder, AppError> {
    authorize(&user, Action::CreateTask, None)?;
    payload.validate()?;

    let task = lifecycle::new_task(&user, payload.into_inner())?;
    ensure_users_exist(pool.get_ref(), &task.assigned_to).await?;

    let task = Task::insert(pool.get_ref(), &task).await?;
    info!("User {} created task {}", user.id, task.id);
    Ok(HttpResponse::Created().json(task))
}

/// General update. Admins may change any field; assignees only the checklist and
/// status. When both are given the explicit status is applied last.
///
/// ## Responses:
/// - `200 OK`: The updated task.
/// - `400 Bad Request`: Invalid input or an assignee that does not exist.
/// - `403 Forbidden`: Not assigned, or a member changing a detail field.
/// - `404 Not Found`: No such task.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    payload: web::Json<UpdateTaskInput>,
) -> Result<impl Responder, AppError> {
    payload.validate()?;
    let mut task = load_task(pool.get_ref(), task_id.into_inner()).await?;

    if let Some(assignees) = lifecycle::apply_update(&user, &mut task, payload.into_inner())? {
        ensure_users_exist(pool.get_ref(), &assignees).await?;
    }

    let task = Task::save(pool.get_ref(), &task).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task. Admin only.
///
/// ## Responses:
/// - `204 No Content`: Deleted.
/// - `403 Forbidden`: The caller is not an admin.
/// - `404 Not Found`: No such task.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    authorize(&user, Action::DeleteTask, None)?;

    let task_id = task_id.into_inner();
    if !Task::delete(pool.get_ref(), task_id).await? {
        return Err(AppError::task_not_found());
    }

    info!("User {} deleted task {}", user.id, task_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Sets the status. `completed` also checks off the whole checklist.
#[put("/{id}/status")]
pub async fn update_task_status(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    payload: web::Json<StatusUpdate>,
) -> Result<impl Responder, AppError> {
    let mut task = load_task(pool.get_ref(), task_id.into_inner()).await?;
    lifecycle::apply_status(&user, &mut task, payload.status)?;

    let task = Task::save(pool.get_ref(), &task).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces the checklist; progress and status follow from it.
#[put("/{id}/todo")]
pub async fn update_task_checklist(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    payload: web::Json<ChecklistUpdate>,
) -> Result<impl Responder, AppError> {
    let mut task = load_task(pool.get_ref(), task_id.into_inner()).await?;
    lifecycle::apply_checklist(&user, &mut task, payload.into_inner().todo_checklist)?;

    let task = Task::save(pool.get_ref(), &task).await?;
    Ok(HttpResponse::Ok().json(task))
}
