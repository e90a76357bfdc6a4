use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

pub type AppResult<T> = Result<T, AppError>;

/// Why a coupon cannot be applied right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    CouponInactive,
    CouponNotStarted,
    CouponExpired,
    CouponExhausted,
}

impl CouponRejection {
    pub fn as_tag(&self) -> &'static str {
        match self {
            CouponRejection::CouponInactive => "coupon_inactive",
            CouponRejection::CouponNotStarted => "coupon_not_started",
            CouponRejection::CouponExpired => "coupon_expired",
            CouponRejection::CouponExhausted => "coupon_exhausted",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CouponRejection::CouponInactive => "Coupon is no longer active",
            CouponRejection::CouponNotStarted => "Coupon is not valid yet",
            CouponRejection::CouponExpired => "Coupon has expired",
            CouponRejection::CouponExhausted => "Coupon has reached its usage limit",
        }
    }
}

impl std::fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Coupon rejected: {0}")]
    CouponRejected(CouponRejection),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Machine readable category carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::CouponRejected(reason) => reason.as_tag(),
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, message, details) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, msg.clone(), None)
            }
            AppError::JwtError(err) => {
                log::warn!("Token rejected: {err}");
                (StatusCode::UNAUTHORIZED, "Invalid access token".to_string(), None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                (StatusCode::FORBIDDEN, "Permission denied".to_string(), None)
            }
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            AppError::InsufficientPoints {
                required,
                available,
            } => (
                StatusCode::BAD_REQUEST,
                format!("Insufficient points: need {} more", required - available),
                Some(json!({
                    "required": required,
                    "available": available,
                    "shortfall": required - available,
                })),
            ),
            AppError::InvalidState(msg) => {
                log::warn!("Invalid state: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            AppError::CouponRejected(reason) => {
                (StatusCode::BAD_REQUEST, reason.message().to_string(), None)
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": error
        }))
    }
}
