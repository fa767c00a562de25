//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Variants follow HTTP status classes; the domain failures of the auth service and the
//! task lifecycle (duplicate email, bad invite token, forbidden mutation, ...) are built
//! through the constructor functions on `AppError` so that every call site reports the
//! same message.
//!
//! `AppError` implements `actix_web::error::ResponseError`. Internal and database
//! failures are logged in full and surfaced to the client as a generic 500 body.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use uuid::Uuid;
use validator::ValidationErrors;

const UNIQUE_VIOLATION: &str = "23505";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, expired or otherwise invalid credentials (HTTP 401).
    Unauthorized(String),
    /// Malformed request that could not be interpreted (HTTP 400).
    BadRequest(String),
    /// Authenticated, but the role or assignment does not allow the action (HTTP 403).
    Forbidden(String),
    /// Requested resource does not exist (HTTP 404).
    NotFound(String),
    /// Write would violate a uniqueness rule (HTTP 409).
    Conflict(String),
    /// Unexpected server-side failure (HTTP 500). The message is logged, never returned.
    InternalServerError(String),
    /// Failure reported by the store (HTTP 500). The message is logged, never returned.
    DatabaseError(String),
    /// Input failed field validation (HTTP 400).
    ValidationError(String),
}

impl AppError {
    pub fn duplicate_email() -> Self {
        AppError::Conflict("Email already registered".into())
    }

    pub fn invalid_invite() -> Self {
        AppError::Forbidden("Invalid admin invite token".into())
    }

    /// Same message for unknown email and wrong password.
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized("Invalid email or password".into())
    }

    pub fn weak_password() -> Self {
        AppError::ValidationError("Password must be at least 6 characters long".into())
    }

    pub fn invalid_assignee(user_id: Uuid) -> Self {
        AppError::ValidationError(format!("Assignee {} does not exist", user_id))
    }

    pub fn forbidden(action: impl fmt::Display) -> Self {
        AppError::Forbidden(format!("Not allowed to {}", action))
    }

    pub fn task_not_found() -> Self {
        AppError::NotFound("Task not found".into())
    }

    pub fn user_not_found() -> Self {
        AppError::NotFound("User not found".into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into JSON `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                log::error!("{}", self);
                "Internal server error"
            }
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ValidationError(msg) => msg.as_str(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// `RowNotFound` becomes a 404, a unique violation (the only unique index is the
/// lower-cased email) becomes a duplicate-email conflict, anything else is a 500.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::duplicate_email()
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> AppError {
        AppError::DatabaseError(error.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {:?}", error.kind()))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(error: actix_web::error::BlockingError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::BadRequest(format!("Invalid upload: {}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(error: rust_xlsxwriter::XlsxError) -> AppError {
        AppError::InternalServerError(format!("Failed to build spreadsheet: {}", error))
    }
}
