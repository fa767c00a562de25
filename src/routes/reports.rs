use actix_web::{get, http::header, web, HttpResponse};
use sqlx::PgPool;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    reports::{export_tasks, export_users, Table, XLSX_CONTENT_TYPE},
};

async fn xlsx_download(table: Table, file_name: &str) -> Result<HttpResponse, AppError> {
    let bytes = web::block(move || table.to_xlsx()).await??;
    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(bytes))
}

/// Every task as a spreadsheet download. Admin only.
#[get("/export/tasks")]
pub async fn export_tasks_report(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let table = export_tasks(pool.get_ref(), &user).await?;
    xlsx_download(table, "tasks_report.xlsx").await
}

/// Every user with task counts as a spreadsheet download. Admin only.
#[get("/export/users")]
pub async fn export_users_report(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let table = export_users(pool.get_ref(), &user).await?;
    xlsx_download(table, "users_report.xlsx").await
}
