pub mod auth;
pub mod health;
pub mod reports;
pub mod tasks;
pub mod users;

use actix_cors::Cors;
use actix_web::{http::header, web};

use crate::error::AppError;

/// Registers every `/api` route. Expects to be mounted under a scope wrapped with
/// [`AuthMiddleware`](crate::auth::AuthMiddleware).
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::get_profile)
            .service(auth::update_profile)
            .service(auth::upload_image),
    )
    .service(
        // The fixed dashboard paths go before `/{id}`.
        web::scope("/tasks")
            .service(tasks::get_dashboard_data)
            .service(tasks::get_user_dashboard_data)
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task)
            .service(tasks::update_task_status)
            .service(tasks::update_task_checklist),
    )
    .service(
        web::scope("/users")
            .service(users::get_users)
            .service(users::get_user_by_id),
    )
    .service(
        web::scope("/reports")
            .service(reports::export_tasks_report)
            .service(reports::export_users_report),
    );
}

/// CORS policy: only `client_url` when configured, any origin otherwise.
pub fn cors(client_url: Option<&str>) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .max_age(3600);

    match client_url {
        Some(origin) => cors.allowed_origin(origin),
        None => cors.allow_any_origin(),
    }
}
