use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::db::StoreError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Validation { message: String, fields: Vec<String> },
    NotFound(String),
    DatabaseError { context: String, details: String },
    StorageError { context: String, details: String },
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
}

impl ErrorResponse<'_> {
    fn message(error: &str) -> ErrorResponse<'_> {
        ErrorResponse { error, details: None, fields: None }
    }
}

impl AppError {
    /// Wraps a record store failure, keeping `NotFound` as a 404.
    pub fn database(context: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::DatabaseError {
                context: context.to_string(),
                details: other.to_string(),
            },
        }
    }

    /// Wraps a blob store failure, keeping `NotFound` and `InvalidId` as a 404.
    pub fn storage(context: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::InvalidId(id) => AppError::NotFound(format!("No image with id {}", id)),
            other => AppError::StorageError {
                context: context.to_string(),
                details: other.to_string(),
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Validation { message, fields } => {
                write!(f, "Bad Request: {} ({})", message, fields.join(", "))
            }
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::DatabaseError { context, details } => {
                write!(f, "Database Error: {}: {}", context, details)
            }
            AppError::StorageError { context, details } => {
                write!(f, "Storage Error: {}: {}", context, details)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError { .. } | AppError::StorageError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(ErrorResponse::message(msg)),
            AppError::Validation { message, fields } => HttpResponse::BadRequest().json(ErrorResponse {
                error: message,
                details: None,
                fields: Some(fields),
            }),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse::message(msg)),
            AppError::DatabaseError { context, details } | AppError::StorageError { context, details } => {
                log::error!("{}", self);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: context,
                    details: Some(details),
                    fields: None,
                })
            }
        }
    }
}
