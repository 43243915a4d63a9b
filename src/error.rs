use axum::http::StatusCode;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(thiserror::Error, Debug)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("already a member of this room")]
    AlreadyMember,
    #[error("room is full ({max_members} members)")]
    CapacityExceeded { max_members: i64 },
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    TransientStore(sqlx::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        use ChatError::*;
        match self {
            Validation(_) | Protocol(_) | Transport(_) => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            AlreadyMember | CapacityExceeded { .. } | Conflict(_) => StatusCode::CONFLICT,
            Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("record"),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_owned())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Self::NotFound("referenced record")
            }
            err => Self::TransientStore(err),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
