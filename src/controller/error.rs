use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum BaseError {
    ParamInvalid(Option<String>),
    NotFound(Option<String>),
    InternalServerError(Option<String>),
}

impl IntoResponse for BaseError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            BaseError::ParamInvalid(msg) => (
                StatusCode::BAD_REQUEST,
                msg.unwrap_or("request params invalid".to_string()),
            ),
            BaseError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                msg.unwrap_or("data not found".to_string()),
            ),
            BaseError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.unwrap_or("internal server error".to_string()),
            ),
        };
        let body = Json(json!({
            "error": error_message,
        }));
        (status, body).into_response()
    }
}
