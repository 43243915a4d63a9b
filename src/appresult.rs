use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};

use crate::{error::ChatError, res::ApiResponse};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        self.0
            .downcast_ref::<ChatError>()
            .map(ChatError::status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self.0, "request failed");
        }

        let message = match self.0.downcast_ref::<ChatError>() {
            Some(ChatError::TransientStore(_)) => "service temporarily unavailable".to_owned(),
            Some(err) => err.to_string(),
            None => "internal server error".to_owned(),
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_keep_their_status() {
        let err = AppError::from(ChatError::AlreadyMember);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = AppError::from(ChatError::Unauthorized("not a member"));
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn foreign_errors_are_internal() {
        let err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
