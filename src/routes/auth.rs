use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    auth::{AuthService, AuthenticatedUser, LoginRequest, RegisterRequest, UpdateProfileRequest},
    config::Config,
    error::AppError,
    uploads,
};

/// Registers a new user.
///
/// ## Request Body:
/// `name`, `email`, `password` (at least 6 characters), optional `profileImageUrl` and
/// `adminInviteToken`. A matching invite token creates an admin; a non-matching one is
/// rejected.
///
/// ## Responses:
/// - `201 Created`: `{_id, name, email, role, profileImageUrl, token}`.
/// - `400 Bad Request`: Invalid input.
/// - `403 Forbidden`: Wrong admin invite token.
/// - `409 Conflict`: Email already registered (case-insensitive).
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    auth: web::Data<AuthService>,
    payload: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let response = auth.register(pool.get_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// Logs a user in.
///
/// ## Responses:
/// - `200 OK`: `{_id, name, email, role, profileImageUrl, token}`.
/// - `401 Unauthorized`: Unknown email or wrong password, with the same body for both.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    auth: web::Data<AuthService>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = auth.login(pool.get_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/profile")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let profile = auth.profile(pool.get_ref(), user.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Updates the caller's name, email, password or profile image. Every field is
/// optional. The response carries a new token.
#[put("/profile")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    let response = auth
        .update_profile(pool.get_ref(), user.id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Stores a profile image sent as the multipart field `image`. No token is needed, so
/// the image can be uploaded before registering.
///
/// ## Responses:
/// - `200 OK`: `{"imageUrl": "<scheme>://<host>/uploads/<file>"}`.
/// - `400 Bad Request`: No file, a file that is not jpg/jpeg/png, or a file over the limit.
#[post("/upload-image")]
pub async fn upload_image(
    config: web::Data<Config>,
    payload: Multipart,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let file_name =
        uploads::save_image(payload, &config.upload_dir, config.max_upload_bytes).await?;

    let connection = req.connection_info();
    let image_url = format!(
        "{}://{}/uploads/{}",
        connection.scheme(),
        connection.host(),
        file_name
    );
    Ok(HttpResponse::Ok().json(json!({ "imageUrl": image_url })))
}
