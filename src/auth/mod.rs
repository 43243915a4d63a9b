use axum::{extract::FromRequestParts, http::request::Parts, routing::get, Router};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{appresult::AppError, error::{ChatError, ChatResult}, session::USER_ID, AppState};

mod clients;
mod lockin;
mod login;
mod logout;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

/// Resolves the authenticated user id stored in the session.
pub async fn identity(session: &Session) -> ChatResult<Uuid> {
    session
        .get::<Uuid>(USER_ID)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "session store failed");
            ChatError::Unauthorized("session unavailable")
        })?
        .ok_or(ChatError::Unauthorized("not logged in"))
}

/// Extractor for routes that require a logged-in user.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| ChatError::Unauthorized("no session"))?;

        Ok(CurrentUser(identity(&session).await?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn empty_session_is_unauthorized() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let err = identity(&session).await.unwrap_err();
        assert!(matches!(err, ChatError::Unauthorized("not logged in")));
    }

    #[tokio::test]
    async fn logged_in_session_resolves_user() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let user_id = Uuid::now_v7();
        session.insert(USER_ID, user_id).await.unwrap();

        assert_eq!(identity(&session).await.unwrap(), user_id);
    }
}
