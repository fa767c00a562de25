use actix_web::{get, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    lifecycle::{authorize, Action},
    models::{Role, User, UserProfile},
};

/// Lists every member together with per-status counts of their assigned tasks.
/// Admin only.
#[get("")]
pub async fn get_users(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    authorize(&user, Action::ViewUsers, None)?;
    let users = User::list_with_task_counts(pool.get_ref(), Some(Role::Member)).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/{id}")]
pub async fn get_user_by_id(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    authorize(&user, Action::ViewUsers, None)?;
    let found = User::find_by_id(pool.get_ref(), user_id.into_inner())
        .await?
        .ok_or_else(AppError::user_not_found)?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&found)))
}
