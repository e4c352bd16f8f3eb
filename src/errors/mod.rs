use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use validator::ValidationErrors;

use crate::db;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    fn message(&self) -> &str {
        match self {
            AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::DatabaseError(msg) => msg,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::DatabaseError(msg) = self {
            error!("request failed on the store: {}", msg);
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.message().to_owned(),
        })
    }
}

impl From<db::Error> for AppError {
    fn from(err: db::Error) -> Self {
        match err {
            db::Error::UniqueViolation(msg) | db::Error::ForeignKeyViolation(msg) => {
                AppError::Conflict(msg)
            }
            db::Error::RowNotFound => AppError::NotFound("Resource not found".to_owned()),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub fn department_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Department does not exist with ID: {}", id))
}

pub fn employee_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Employee does not exist with ID: {}", id))
}

/// Turns a unique violation raised while saving a department into a
/// conflict naming the offending department name.
pub fn department_name_taken(name: &str) -> impl FnOnce(db::Error) -> AppError + '_ {
    move |err| match err {
        db::Error::UniqueViolation(_) => {
            AppError::Conflict(format!("Department name already exists: {}", name))
        }
        other => other.into(),
    }
}
