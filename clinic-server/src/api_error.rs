use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use common::service_error::{NON_FIELD_ERRORS, ServiceError};
use common::utils::get_logger;
use serde_json::json;
use slog::error;
use std::fmt;

/// 业务错误到 HTTP 响应的转换.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServiceError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match &self.0 {
            ServiceError::Validation(errors) => json!(errors),
            ServiceError::PermissionDenied(msg) | ServiceError::Authentication(msg) => {
                json!({ "error": msg })
            }
            ServiceError::NotFound(_) => json!({ "detail": "Not found." }),
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                error!(get_logger(), "request failed: {}", self.0);
                json!({ "detail": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

// 请求体无法解析时返回 400
pub(crate) fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match &err {
        JsonPayloadError::ContentType => "Unsupported media type, expected application/json.".to_string(),
        other => format!("JSON parse error - {}", other),
    };
    ApiError(ServiceError::field(NON_FIELD_ERRORS, message)).into()
}

pub(crate) fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError(ServiceError::field(NON_FIELD_ERRORS, format!("Invalid query - {}", err))).into()
}

// 非数字 id 的路径视为不存在
pub(crate) fn path_error_handler(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError(ServiceError::NotFound("path")).into()
}
