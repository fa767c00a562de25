use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

/// Health check endpoint
///
/// Returns the service status, version and current timestamp. When a database pool is
/// registered, also reports whether it answers a trivial query.
#[get("/health")]
pub async fn health(pool: Option<web::Data<PgPool>>) -> impl Responder {
    let database = match pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
            Ok(_) => "up",
            Err(err) => {
                log::warn!("Health check could not reach the database: {}", err);
                "down"
            }
        },
        None => "unconfigured",
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "timestamp": Utc::now()
    }))
}
